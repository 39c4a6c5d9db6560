use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use atelier::config::AtelierConfig;
use atelier::io::{
    CollaboratorError, Collaborators, Coordinates, GenerateRequest, GenerationService,
    HierarchyService, ImageInsertion, ImageRequest, ImageService, JobQueue, MapRequest,
    MapService, Result as CollaboratorResult, UploadService, UploadedFile,
};
use atelier::preview::{HostMessage, InboundEvent, SandboxMessage};
use atelier::store::{DocumentStore, ImageRecord, VirtualTree};
use atelier::{Command, Effect, NoticeLevel, Session, store_options};

/// In-process collaborator that records every call it receives.
#[derive(Clone, Default)]
struct Fake {
    calls: Arc<Mutex<Vec<String>>>,
    failing_pages: Vec<String>,
}

impl Fake {
    fn failing(pages: &[&str]) -> Self {
        Self {
            failing_pages: pages.iter().map(|p| p.to_string()).collect(),
            ..Self::default()
        }
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl GenerationService for Fake {
    fn generate(&self, request: &GenerateRequest) -> CollaboratorResult<String> {
        self.record(format!("generate {}", request.page_path));
        if self.failing_pages.contains(&request.page_path) {
            return Err(CollaboratorError::Unavailable("generator down".to_string()));
        }
        Ok(format!(
            "<main><p>{} says {}</p></main>",
            request.page_path, request.prompt
        ))
    }
}

impl ImageService for Fake {
    fn add_images(&self, request: &ImageRequest) -> CollaboratorResult<ImageInsertion> {
        self.record(format!("images {}", request.page_path));
        Ok(ImageInsertion {
            code: "<main><img src=\"https://img.test/cat.jpg\" alt=\"cat\"></main>".to_string(),
            images: vec![ImageRecord {
                url: "https://img.test/cat.jpg".to_string(),
                source: "stock".to_string(),
                query: request.queries.join(" "),
                attribution: "Photographer".to_string(),
            }],
        })
    }
}

impl MapService for Fake {
    fn geocode(&self, address: &str) -> CollaboratorResult<Coordinates> {
        self.record(format!("geocode {address}"));
        Ok(Coordinates {
            lat: 51.52,
            lng: -0.16,
        })
    }

    fn add_map(&self, request: &MapRequest) -> CollaboratorResult<String> {
        self.record(format!("map {},{}", request.lat, request.lng));
        Ok("<main><div class=\"map-container\" id=\"map\"></div></main>".to_string())
    }
}

impl UploadService for Fake {
    fn upload(&self, file: &UploadedFile) -> CollaboratorResult<()> {
        self.record(format!("upload {}", file.file_name));
        Ok(())
    }
}

impl HierarchyService for Fake {
    fn update_hierarchy(&self, tree: &VirtualTree) -> CollaboratorResult<()> {
        self.record(format!("hierarchy {}", tree.pages().len()));
        Ok(())
    }
}

fn session_with(fake: &Fake) -> Session {
    let config = AtelierConfig::default();
    let mut store = DocumentStore::new(store_options(&config));
    store
        .create_page("index.html", "<main><h1>Home</h1></main>", None)
        .unwrap();
    store
        .create_page("about.html", "<main><h1>About</h1></main>", None)
        .unwrap();
    store
        .create_page("blog/post.html", "<main><h1>Post</h1></main>", None)
        .unwrap();
    Session::new(
        &config,
        store,
        Collaborators::uniform(fake.clone()),
        JobQueue::inline(),
    )
}

fn code(session: &Session, page: &str) -> String {
    session.store().current(page).unwrap().code.clone()
}

fn notices(effects: &[Effect], level: NoticeLevel) -> Vec<String> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Notice(notice) if notice.level == level => Some(notice.message.clone()),
            _ => None,
        })
        .collect()
}

fn renders(effects: &[Effect]) -> Vec<&str> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Send(HostMessage::Render { html }) => Some(html.as_str()),
            _ => None,
        })
        .collect()
}

fn ms(start: Instant, millis: u64) -> Instant {
    start + Duration::from_millis(millis)
}

#[test]
fn request_applies_to_active_page() {
    let fake = Fake::default();
    let mut session = session_with(&fake);
    let now = Instant::now();

    session
        .handle(Command::SwitchPage { page: "about.html".into() }, now)
        .unwrap();
    session
        .handle(Command::SubmitIntent { prompt: "Make it blue".into() }, now)
        .unwrap();
    session.poll_jobs(now);

    assert_eq!(fake.calls(), ["generate about.html"]);
    assert!(code(&session, "about.html").contains("about.html says Make it blue"));
    assert_eq!(session.store().history("about.html").unwrap().len(), 2);
    assert_eq!(session.store().history("index.html").unwrap().len(), 1);
}

#[test]
fn apply_to_all_runs_in_page_order() {
    let fake = Fake::default();
    let mut session = session_with(&fake);
    let now = Instant::now();

    let effects = session
        .handle(
            Command::SubmitIntent {
                prompt: "Use a serif font on all pages".into(),
            },
            now,
        )
        .unwrap();
    assert_eq!(notices(&effects, NoticeLevel::Info), ["Applying to 3 pages"]);
    session.poll_jobs(now);

    assert_eq!(
        fake.calls(),
        [
            "generate about.html",
            "generate blog/post.html",
            "generate index.html"
        ]
    );
    for page in ["about.html", "blog/post.html", "index.html"] {
        assert!(code(&session, page).contains(&format!("{page} says")), "{page}");
    }
    assert!(!session.has_pending_jobs());
}

#[test]
fn failed_page_does_not_stop_the_batch() {
    let fake = Fake::failing(&["blog/post.html"]);
    let mut session = session_with(&fake);
    let now = Instant::now();

    session
        .handle(
            Command::SubmitIntent {
                prompt: "Add a contact form on every page".into(),
            },
            now,
        )
        .unwrap();
    let effects = session.poll_jobs(now);

    let errors = notices(&effects, NoticeLevel::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("blog/post.html"));
    assert!(code(&session, "about.html").contains("about.html says"));
    assert!(code(&session, "index.html").contains("index.html says"));
    assert_eq!(session.store().history("blog/post.html").unwrap().len(), 1);
}

#[test]
fn late_response_lands_on_its_own_page() {
    let fake = Fake::default();
    let mut session = session_with(&fake);
    let now = Instant::now();

    session
        .handle(Command::SwitchPage { page: "about.html".into() }, now)
        .unwrap();
    session
        .handle(Command::SubmitIntent { prompt: "Add a quote".into() }, now)
        .unwrap();
    session
        .handle(Command::SwitchPage { page: "index.html".into() }, now)
        .unwrap();
    session.poll_jobs(now);

    assert!(code(&session, "about.html").contains("about.html says Add a quote"));
    assert!(!code(&session, "index.html").contains("says"));
    assert_eq!(session.store().active().unwrap().as_str(), "index.html");
}

#[test]
fn response_follows_a_page_renamed_in_flight() {
    let fake = Fake::default();
    let mut session = session_with(&fake);
    let now = Instant::now();

    session
        .handle(Command::SwitchPage { page: "about.html".into() }, now)
        .unwrap();
    session
        .handle(Command::SubmitIntent { prompt: "Add a quote".into() }, now)
        .unwrap();
    let effects = session
        .handle(
            Command::RenamePath {
                from: "about.html".into(),
                to: "story.html".into(),
            },
            now,
        )
        .unwrap();
    assert!(
        effects
            .iter()
            .any(|effect| matches!(effect, Effect::ActivePageChanged(page) if page.as_str() == "story.html"))
    );

    session.poll_jobs(now);
    assert!(code(&session, "story.html").contains("about.html says Add a quote"));
    assert!(!session.store().contains("about.html"));
}

#[test]
fn address_with_map_goes_to_map_collaborator() {
    let fake = Fake::default();
    let mut session = session_with(&fake);
    let now = Instant::now();

    session
        .handle(
            Command::SubmitIntent {
                prompt: "Show a map of 221 Baker Street".into(),
            },
            now,
        )
        .unwrap();
    session.poll_jobs(now);

    assert_eq!(
        fake.calls(),
        ["geocode Show a map of 221 Baker Street", "map 51.52,-0.16"]
    );
    assert!(code(&session, "index.html").contains("map-container"));
}

#[test]
fn images_are_committed_and_recorded() {
    let fake = Fake::default();
    let mut session = session_with(&fake);
    let now = Instant::now();

    session
        .handle(
            Command::AddImages {
                page: "about.html".into(),
                queries: vec!["cat".into()],
                uploads: Vec::new(),
            },
            now,
        )
        .unwrap();
    session.poll_jobs(now);

    assert!(code(&session, "about.html").contains("https://img.test/cat.jpg"));
    let images = session.store().images("about.html");
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].query, "cat");
}

#[test]
fn commits_to_active_page_render_after_quiet_period() {
    let fake = Fake::default();
    let mut session = session_with(&fake);
    let start = Instant::now();

    for (i, word) in ["one", "two", "three"].into_iter().enumerate() {
        let effects = session
            .handle(
                Command::Commit {
                    page: "index.html".into(),
                    code: format!("<main><p>{word}</p></main>"),
                    theme: None,
                },
                ms(start, i as u64 * 50),
            )
            .unwrap();
        assert!(renders(&effects).is_empty());
    }

    assert!(session.tick(ms(start, 150)).is_empty());
    let effects = session.tick(ms(start, 250));
    let html = renders(&effects);
    assert_eq!(html.len(), 1);
    assert!(html[0].contains("three"));
    assert!(session.tick(ms(start, 1_000)).is_empty());
    assert_eq!(session.store().history("index.html").unwrap().len(), 4);
}

#[test]
fn commit_to_background_page_does_not_render() {
    let fake = Fake::default();
    let mut session = session_with(&fake);
    let start = Instant::now();

    session
        .handle(
            Command::Commit {
                page: "about.html".into(),
                code: "<main><p>quiet</p></main>".into(),
                theme: None,
            },
            start,
        )
        .unwrap();
    assert!(renders(&session.tick(ms(start, 1_000))).is_empty());
}

#[test]
fn hierarchy_changes_are_persisted_once_settled() {
    let fake = Fake::default();
    let mut session = session_with(&fake);
    let start = Instant::now();

    session
        .handle(
            Command::CreatePage {
                page: "blog/second.html".into(),
                code: None,
                theme: None,
            },
            start,
        )
        .unwrap();
    session
        .handle(
            Command::MovePath {
                source: "about.html".into(),
                target_folder: "blog".into(),
            },
            ms(start, 100),
        )
        .unwrap();

    let early = session.tick(ms(start, 400));
    assert!(!early.iter().any(|e| matches!(e, Effect::PersistHierarchy(_))));

    let effects = session.tick(ms(start, 700));
    let tree = effects
        .iter()
        .find_map(|effect| match effect {
            Effect::PersistHierarchy(tree) => Some(tree.clone()),
            _ => None,
        })
        .expect("hierarchy persisted");
    assert_eq!(
        tree.pages(),
        ["blog/about.html", "blog/post.html", "blog/second.html", "index.html"]
    );
    session.poll_jobs(ms(start, 700));
    assert_eq!(fake.calls(), ["hierarchy 4"]);
    assert!(code(&session, "blog/second.html").contains("Second"));
}

#[test]
fn history_boundaries_are_reported() {
    let fake = Fake::default();
    let mut session = session_with(&fake);
    let now = Instant::now();

    let effects = session
        .handle(Command::Undo { page: "index.html".into() }, now)
        .unwrap();
    assert_eq!(
        notices(&effects, NoticeLevel::Info),
        ["Nothing to undo on index.html"]
    );

    session
        .handle(
            Command::Commit {
                page: "index.html".into(),
                code: "<main><p>edited</p></main>".into(),
                theme: None,
            },
            now,
        )
        .unwrap();
    assert!(
        session
            .handle(Command::Undo { page: "index.html".into() }, now)
            .unwrap()
            .is_empty()
    );
    assert!(code(&session, "index.html").contains("Home"));
    session
        .handle(Command::Redo { page: "index.html".into() }, now)
        .unwrap();
    assert!(code(&session, "index.html").contains("edited"));
    session
        .handle(Command::Reset { page: "index.html".into() }, now)
        .unwrap();
    assert!(code(&session, "index.html").contains("Home"));
}

#[test]
fn deleting_active_page_switches_and_renders() {
    let fake = Fake::default();
    let mut session = session_with(&fake);
    let now = Instant::now();

    session
        .handle(Command::SwitchPage { page: "about.html".into() }, now)
        .unwrap();
    let effects = session
        .handle(Command::DeletePage { page: "about.html".into() }, now)
        .unwrap();

    assert!(
        effects
            .iter()
            .any(|effect| matches!(effect, Effect::ActivePageChanged(page) if page.as_str() == "blog/post.html"))
    );
    assert_eq!(renders(&effects).len(), 1);
    assert!(session.handle(Command::DeletePage { page: "index.html".into() }, now).is_err());
}

#[test]
fn sandbox_messages_flow_through_the_session() {
    let fake = Fake::default();
    let mut session = session_with(&fake);
    let start = Instant::now();

    let navigation = SandboxMessage::Navigation {
        href: "about.html".into(),
    };
    let effects = session
        .handle(
            Command::Inbound(InboundEvent::from_message("null", &navigation)),
            start,
        )
        .unwrap();
    assert_eq!(renders(&effects).len(), 1);
    assert_eq!(session.store().active().unwrap().as_str(), "about.html");

    let edit = SandboxMessage::UpdateHtml {
        html: "<html><body><main><p>dragged</p></main></body></html>".into(),
        page: Some("about.html".into()),
    };
    session
        .handle(Command::Inbound(InboundEvent::from_message("null", &edit)), start)
        .unwrap();
    assert!(code(&session, "about.html").contains("dragged"));
    assert_eq!(renders(&session.tick(ms(start, 200))).len(), 1);

    let foreign = session
        .handle(
            Command::Inbound(InboundEvent::from_message("https://evil.test", &edit)),
            start,
        )
        .unwrap();
    assert!(foreign.is_empty());

    let drop = SandboxMessage::FileDrop {
        file_name: "notes.txt".into(),
        file_content: "hello".into(),
    };
    session
        .handle(Command::Inbound(InboundEvent::from_message("null", &drop)), start)
        .unwrap();
    let effects = session.poll_jobs(start);
    assert_eq!(notices(&effects, NoticeLevel::Info), ["Uploaded notes.txt"]);
    assert_eq!(fake.calls(), ["upload notes.txt"]);
}

#[test]
fn offline_collaborators_report_errors() {
    let config = AtelierConfig::default();
    let mut store = DocumentStore::new(store_options(&config));
    store.create_page("index.html", "<p>Home</p>", None).unwrap();
    let mut session = Session::new(
        &config,
        store,
        Collaborators::offline(),
        JobQueue::inline(),
    );
    let now = Instant::now();

    session
        .handle(Command::SubmitIntent { prompt: "Make it pop".into() }, now)
        .unwrap();
    let effects = session.poll_jobs(now);
    assert_eq!(notices(&effects, NoticeLevel::Error).len(), 1);
    assert_eq!(session.store().history("index.html").unwrap().len(), 1);
}

#[test]
fn edited_session_survives_save_and_load() {
    let fake = Fake::default();
    let mut session = session_with(&fake);
    let now = Instant::now();
    session
        .handle(Command::SwitchPage { page: "about.html".into() }, now)
        .unwrap();
    session
        .handle(Command::SubmitIntent { prompt: "Add a quote".into() }, now)
        .unwrap();
    session.poll_jobs(now);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let store = session.into_store();
    store.save(&path).unwrap();

    let restored = DocumentStore::load(&path, store_options(&AtelierConfig::default())).unwrap();
    assert_eq!(restored.active().unwrap().as_str(), "about.html");
    assert_eq!(restored.history("about.html").unwrap().len(), 2);
    assert_eq!(
        restored.current("about.html").unwrap().code,
        store.current("about.html").unwrap().code
    );
}
