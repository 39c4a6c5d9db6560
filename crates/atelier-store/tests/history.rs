use atelier_store::{DocumentStore, HistoryStep, StoreError, StoreOptions};

fn code(store: &DocumentStore, path: &str) -> String {
    store.current(path).expect("page exists").code.clone()
}

fn seeded(pages: &[&str]) -> DocumentStore {
    let mut store = DocumentStore::new(StoreOptions::default());
    for page in pages {
        store
            .create_page(page, &format!("<main>{page}</main>"), None)
            .unwrap();
    }
    store
}

#[test]
fn undo_redo_round_trip() {
    let mut store = seeded(&["index.html"]);
    let origin = code(&store, "index.html");

    let k = 4;
    for i in 0..k {
        store
            .commit("index.html", &format!("<main>edit {i}</main>"), None)
            .unwrap();
    }
    let latest = code(&store, "index.html");

    for _ in 0..k {
        assert!(matches!(store.undo("index.html").unwrap(), HistoryStep::Applied(_)));
    }
    assert_eq!(code(&store, "index.html"), origin);
    assert_eq!(store.undo("index.html").unwrap(), HistoryStep::Unchanged);

    for _ in 0..k {
        store.redo("index.html").unwrap();
    }
    assert_eq!(code(&store, "index.html"), latest);
    assert_eq!(store.redo("index.html").unwrap(), HistoryStep::Unchanged);
}

#[test]
fn commit_after_undo_truncates_branch() {
    let mut store = seeded(&["index.html"]);
    store.commit("index.html", "<main>B</main>", None).unwrap();
    store.commit("index.html", "<main>C</main>", None).unwrap();
    assert_eq!(store.history("index.html").unwrap().cursor(), 2);

    store.undo("index.html").unwrap();
    assert!(code(&store, "index.html").contains("<main>B</main>"));

    store.commit("index.html", "<main>D</main>", None).unwrap();
    let history = store.history("index.html").unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history.cursor(), 2);
    assert!(history.current().code.contains("<main>D</main>"));
    assert_eq!(store.redo("index.html").unwrap(), HistoryStep::Unchanged);
}

#[test]
fn single_page_scenario() {
    let mut store = seeded(&["index.html"]);
    let s0 = code(&store, "index.html");

    store.commit("index.html", "<main>S1</main>", None).unwrap();
    assert_eq!(store.history("index.html").unwrap().len(), 2);
    assert_eq!(store.history("index.html").unwrap().cursor(), 1);

    store.undo("index.html").unwrap();
    assert_eq!(code(&store, "index.html"), s0);
    assert_eq!(store.history("index.html").unwrap().cursor(), 0);

    store.commit("index.html", "<main>S2</main>", None).unwrap();
    let history = store.history("index.html").unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history.entries()[0].code, s0);
    assert!(history.entries()[1].code.contains("S2"));
    assert_eq!(store.redo("index.html").unwrap(), HistoryStep::Unchanged);
}

#[test]
fn reset_restores_creation_snapshot() {
    let mut store = seeded(&["index.html"]);
    let origin = code(&store, "index.html");
    store.commit("index.html", "<main>1</main>", None).unwrap();
    store.commit("index.html", "<main>2</main>", None).unwrap();

    assert!(matches!(store.reset("index.html").unwrap(), HistoryStep::Applied(_)));
    assert_eq!(code(&store, "index.html"), origin);
    assert_eq!(store.history("index.html").unwrap().len(), 1);
    assert_eq!(store.reset("index.html").unwrap(), HistoryStep::Unchanged);
}

#[test]
fn identical_commit_after_undo_still_truncates_branch() {
    let mut store = seeded(&["index.html"]);
    store.commit("index.html", "<main>B</main>", None).unwrap();
    store.commit("index.html", "<main>C</main>", None).unwrap();
    store.undo("index.html").unwrap();
    let current = code(&store, "index.html");

    let outcome = store.commit("index.html", &current, None).unwrap();
    assert!(!outcome.recorded);
    let history = store.history("index.html").unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history.cursor(), 1);
    assert_eq!(store.redo("index.html").unwrap(), HistoryStep::Unchanged);
    assert!(code(&store, "index.html").contains("<main>B</main>"));
}

#[test]
fn restoring_with_smaller_limit_keeps_current_code() {
    let mut store = seeded(&["index.html"]);
    for edit in ["B", "C", "D"] {
        store
            .commit("index.html", &format!("<main>{edit}</main>"), None)
            .unwrap();
    }
    for _ in 0..3 {
        store.undo("index.html").unwrap();
    }
    let current = code(&store, "index.html");

    let options = StoreOptions {
        history_limit: Some(2),
        ..StoreOptions::default()
    };
    let restored = DocumentStore::restore(store.snapshot(), options);
    let history = restored.history("index.html").unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(code(&restored, "index.html"), current);
    assert!(current.contains("<main>index.html</main>"));
}

#[test]
fn history_limit_still_allows_reset() {
    let options = StoreOptions {
        history_limit: Some(3),
        ..StoreOptions::default()
    };
    let mut store = DocumentStore::new(options);
    store.create_page("index.html", "<main>origin</main>", None).unwrap();
    for i in 0..10 {
        store
            .commit("index.html", &format!("<main>{i}</main>"), None)
            .unwrap();
    }
    assert_eq!(store.history("index.html").unwrap().len(), 3);

    store.reset("index.html").unwrap();
    assert!(code(&store, "index.html").contains("origin"));
}

#[test]
fn pages_keep_independent_histories() {
    let mut store = seeded(&["index.html", "about.html"]);
    store.commit("about.html", "<main>new about</main>", None).unwrap();
    assert_eq!(store.history("index.html").unwrap().len(), 1);
    assert_eq!(store.history("about.html").unwrap().len(), 2);
    assert_eq!(store.undo("index.html").unwrap(), HistoryStep::Unchanged);
}

#[test]
fn protected_pages_cannot_be_deleted() {
    let mut store = seeded(&["index.html"]);
    assert!(matches!(
        store.delete_page("index.html"),
        Err(StoreError::ProtectedPage { .. })
    ));

    store.create_page("about.html", "<main>about</main>", None).unwrap();
    assert!(matches!(
        store.delete_page("index.html"),
        Err(StoreError::ProtectedPage { .. })
    ));
    assert_eq!(store.page_count(), 2);

    let mut lone = seeded(&["about.html"]);
    assert!(matches!(
        lone.delete_page("about.html"),
        Err(StoreError::ProtectedPage { .. })
    ));
    assert_eq!(lone.page_count(), 1);
}

#[test]
fn deleting_active_page_selects_first_remaining() {
    let mut store = seeded(&["index.html", "b.html", "a.html"]);
    store.set_active("b.html").unwrap();

    let deleted = store.delete_page("b.html").unwrap();
    assert_eq!(deleted.active_changed.as_ref().map(|p| p.as_str()), Some("a.html"));
    assert_eq!(store.active().map(|p| p.as_str()), Some("a.html"));

    let deleted = store.delete_page("a.html").unwrap();
    assert_eq!(deleted.active_changed.as_ref().map(|p| p.as_str()), Some("index.html"));
}

#[test]
fn duplicate_page_is_refused() {
    let mut store = seeded(&["index.html"]);
    assert!(matches!(
        store.create_page("index.html", "<main>x</main>", None),
        Err(StoreError::AlreadyExists { .. })
    ));
    assert_eq!(store.history("index.html").unwrap().len(), 1);
}

#[test]
fn invalid_paths_are_refused() {
    let mut store = seeded(&["index.html"]);
    assert!(matches!(
        store.create_page("../escape.html", "<main>x</main>", None),
        Err(StoreError::InvalidPath(_))
    ));
    assert!(matches!(
        store.create_page("notes.txt", "<main>x</main>", None),
        Err(StoreError::InvalidPath(_))
    ));
}
