//! Editor session: owns the document store and drives the preview and the
//! collaborators from explicit commands.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use atelier_config::AtelierConfig;
use atelier_html::{Fallback, NormalizeOptions, page_display_name};
use atelier_io::{
    CollaboratorError, Collaborators, GenerateRequest, ImageInsertion, ImageRequest, JobId,
    JobQueue, MapRequest, UploadedFile,
};
use atelier_preview::{
    HostMessage, InboundEvent, OriginPolicy, PreviewRenderer, SyncChannel, SyncEffect,
};
use atelier_store::{
    DocumentStore, HistoryStep, MoveRejection, PagePath, Relocation, StoreError, StoreOptions, VirtualTree,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::debounce::Debouncer;
use crate::intent::{Intent, IntentPolicy, Route, Scope};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("no page is active")]
    NoActivePage,
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// One user or sandbox action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Commit {
        page: String,
        code: String,
        theme: Option<String>,
    },
    Undo {
        page: String,
    },
    Redo {
        page: String,
    },
    Reset {
        page: String,
    },
    /// A page without `code` starts from a heading named after it.
    CreatePage {
        page: String,
        code: Option<String>,
        theme: Option<String>,
    },
    DeletePage {
        page: String,
    },
    MovePath {
        source: String,
        target_folder: String,
    },
    RenamePath {
        from: String,
        to: String,
    },
    SwitchPage {
        page: String,
    },
    /// Natural-language request for the active page, or for every page
    /// when the intent policy says so.
    SubmitIntent {
        prompt: String,
    },
    AddImages {
        page: String,
        queries: Vec<String>,
        uploads: Vec<UploadedFile>,
    },
    /// File dropped on the editor chrome.
    Upload(UploadedFile),
    Inbound(InboundEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// User-visible message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// What the host has to carry out.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Post to the sandbox frame.
    Send(HostMessage),
    ActivePageChanged(PagePath),
    Notice(Notice),
    /// The hierarchy settled after a burst of changes and was handed to the
    /// hierarchy collaborator.
    PersistHierarchy(VirtualTree),
}

/// Result of a background collaborator call.
#[derive(Debug)]
pub enum JobOutput {
    Code(std::result::Result<String, CollaboratorError>),
    Images(std::result::Result<ImageInsertion, CollaboratorError>),
    Uploaded(std::result::Result<(), CollaboratorError>),
    HierarchySaved(std::result::Result<(), CollaboratorError>),
}

/// What an outstanding job was submitted for.
#[derive(Debug)]
enum Request {
    Edit {
        target: PagePath,
        intent: Intent,
        /// Pages still to receive the same request, in page order.
        remaining: VecDeque<PagePath>,
    },
    Images {
        target: PagePath,
    },
    Upload {
        file_name: String,
    },
    Hierarchy,
}

pub fn normalize_options(config: &AtelierConfig) -> NormalizeOptions {
    NormalizeOptions {
        site_label: config.site.label.clone(),
        footer_notice: config.site.footer_notice.clone(),
        ..NormalizeOptions::default()
    }
}

pub fn store_options(config: &AtelierConfig) -> StoreOptions {
    StoreOptions {
        root_page: config.site.root_page.clone(),
        default_theme: config.site.default_theme.clone(),
        history_limit: config.history.limit,
        normalize: normalize_options(config),
    }
}

pub fn preview_renderer(config: &AtelierConfig) -> PreviewRenderer {
    PreviewRenderer::new(normalize_options(config), config.preview.host_origin.clone())
}

/// Markup of a page created without code.
pub fn starter_page(page: &str) -> String {
    format!("<main><h1>{}</h1></main>", page_display_name(page))
}

#[derive(Debug)]
pub struct Session {
    store: DocumentStore,
    renderer: PreviewRenderer,
    channel: SyncChannel,
    intent: IntentPolicy,
    collaborators: Collaborators,
    jobs: JobQueue<JobOutput>,
    requests: HashMap<JobId, Request>,
    render: Debouncer<()>,
    hierarchy: Debouncer<VirtualTree>,
}

impl Session {
    pub fn new(
        config: &AtelierConfig,
        store: DocumentStore,
        collaborators: Collaborators,
        jobs: JobQueue<JobOutput>,
    ) -> Self {
        Self {
            store,
            renderer: preview_renderer(config),
            channel: SyncChannel::new(OriginPolicy::new(
                config.preview.allowed_origins.iter().cloned(),
            )),
            intent: IntentPolicy::new(&config.intent),
            collaborators,
            jobs,
            requests: HashMap::new(),
            render: Debouncer::from_millis(config.preview.render_debounce_ms),
            hierarchy: Debouncer::from_millis(config.hierarchy.persist_debounce_ms),
        }
    }

    /// Session with the configured collaborators on worker threads.
    pub fn from_config(config: &AtelierConfig, store: DocumentStore) -> Self {
        Self::new(
            config,
            store,
            Collaborators::from_config(&config.collaborators),
            JobQueue::threaded(),
        )
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn into_store(self) -> DocumentStore {
        self.store
    }

    pub fn has_pending_jobs(&self) -> bool {
        self.jobs.has_pending()
    }

    /// Sandbox document for `page` as it currently stands.
    pub fn render_page(&self, page: &str) -> Option<String> {
        let code = &self.store.current(page)?.code;
        let pages = self.store.pages();
        let pages: Vec<&str> = pages.iter().map(|page| page.as_str()).collect();
        Some(self.renderer.render(code, &pages, page))
    }

    pub fn render_active(&self) -> Option<String> {
        self.render_page(self.store.active()?.as_str())
    }

    pub fn handle(&mut self, command: Command, now: Instant) -> Result<Vec<Effect>> {
        let mut effects = Vec::new();
        match command {
            Command::Commit { page, code, theme } => {
                let outcome = self.store.commit(&page, &code, theme.as_deref())?;
                let page = PagePath::parse(&page).map_err(StoreError::from)?;
                effects.extend(fallback_notice(&page, outcome.fallback));
                if outcome.recorded {
                    self.code_changed(&page, now);
                }
            }
            Command::Undo { page } => {
                let step = self.store.undo(&page)?;
                effects.extend(self.history_step(&page, step, "undo", now));
            }
            Command::Redo { page } => {
                let step = self.store.redo(&page)?;
                effects.extend(self.history_step(&page, step, "redo", now));
            }
            Command::Reset { page } => {
                let step = self.store.reset(&page)?;
                effects.extend(self.history_step(&page, step, "discard", now));
            }
            Command::CreatePage { page, code, theme } => {
                let code = code.unwrap_or_else(|| starter_page(&page));
                let fallback = self.store.create_page(&page, &code, theme.as_deref())?;
                let page = PagePath::parse(&page).map_err(StoreError::from)?;
                effects.extend(fallback_notice(&page, fallback));
                self.hierarchy_changed(now);
                if self.store.page_count() == 1 {
                    effects.extend(self.activate(page));
                }
            }
            Command::DeletePage { page } => {
                let deleted = self.store.delete_page(&page)?;
                self.hierarchy_changed(now);
                if let Some(active) = deleted.active_changed {
                    effects.extend(self.activate(active));
                }
            }
            Command::MovePath {
                source,
                target_folder,
            } => {
                let relocation = self.store.move_path(&source, &target_folder)?;
                effects.extend(self.relocated(relocation, now));
            }
            Command::RenamePath { from, to } => {
                let relocation = self.store.rename_path(&from, &to)?;
                effects.extend(self.relocated(relocation, now));
            }
            Command::SwitchPage { page } => {
                let previous = self.store.active().cloned();
                let page = self.store.set_active(&page)?;
                if previous.as_ref() != Some(&page) {
                    effects.extend(self.activate(page));
                }
            }
            Command::SubmitIntent { prompt } => {
                let intent = self.intent.classify(&prompt);
                let mut targets: VecDeque<PagePath> = match intent.scope {
                    Scope::ActivePage => {
                        let active = self.store.active().cloned().ok_or(SessionError::NoActivePage)?;
                        VecDeque::from([active])
                    }
                    Scope::AllPages => self.store.pages().into_iter().cloned().collect(),
                };
                let Some(first) = targets.pop_front() else {
                    return Err(SessionError::NoActivePage);
                };
                if !targets.is_empty() {
                    info!(pages = targets.len() + 1, "applying request to every page");
                    effects.push(Effect::Notice(Notice::info(format!(
                        "Applying to {} pages",
                        targets.len() + 1
                    ))));
                }
                self.submit_edit(first, intent, targets);
            }
            Command::AddImages {
                page,
                queries,
                uploads,
            } => {
                let target = PagePath::parse(&page).map_err(StoreError::from)?;
                let entry = self
                    .store
                    .current(&page)
                    .ok_or_else(|| StoreError::NotFound { path: page.clone() })?;
                let request = ImageRequest {
                    current_code: entry.code.clone(),
                    page_path: page.clone(),
                    queries,
                    uploaded_files: uploads,
                    site_theme: entry.theme.clone(),
                };
                let images = self.collaborators.images.clone();
                let id = self.jobs.submit(format!("images {page}"), move || {
                    JobOutput::Images(images.add_images(&request))
                });
                self.requests.insert(id, Request::Images { target });
            }
            Command::Upload(file) => self.submit_upload(file),
            Command::Inbound(event) => {
                for effect in self.channel.dispatch(&mut self.store, event) {
                    effects.extend(self.sync_effect(effect, now));
                }
            }
        }
        Ok(effects)
    }

    /// Release debounced work whose quiet period is over.
    pub fn tick(&mut self, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.render.poll(now).is_some()
            && let Some(html) = self.render_active()
        {
            effects.push(Effect::Send(HostMessage::Render { html }));
        }
        if let Some(tree) = self.hierarchy.poll(now) {
            let hierarchy = self.collaborators.hierarchy.clone();
            let snapshot = tree.clone();
            let id = self.jobs.submit("hierarchy", move || {
                JobOutput::HierarchySaved(hierarchy.update_hierarchy(&snapshot))
            });
            self.requests.insert(id, Request::Hierarchy);
            effects.push(Effect::PersistHierarchy(tree));
        }
        effects
    }

    /// Apply every finished collaborator call. Each finished edit resolves
    /// into at most one commit on the page it was requested for.
    pub fn poll_jobs(&mut self, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();
        loop {
            let done = self.jobs.poll();
            if done.is_empty() {
                break;
            }
            for job in done {
                let Some(request) = self.requests.remove(&job.id) else {
                    warn!(id = %job.id, "finished job has no request");
                    continue;
                };
                effects.extend(self.complete(request, job.output, now));
            }
        }
        effects
    }

    fn complete(&mut self, request: Request, output: JobOutput, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();
        match (request, output) {
            (
                Request::Edit {
                    target,
                    intent,
                    mut remaining,
                },
                JobOutput::Code(result),
            ) => {
                match result {
                    Ok(code) => effects.extend(self.apply_response(&target, &code, now)),
                    Err(error) => {
                        warn!(page = %target, %error, "edit request failed");
                        effects.push(Effect::Notice(Notice::error(format!(
                            "Could not update {target}: {error}"
                        ))));
                    }
                }
                while let Some(next) = remaining.pop_front() {
                    if self.store.contains(next.as_str()) {
                        self.submit_edit(next, intent, remaining);
                        break;
                    }
                    debug!(page = %next, "skipping page removed during batch");
                }
            }
            (Request::Images { target }, JobOutput::Images(result)) => match result {
                Ok(insertion) => {
                    effects.extend(self.apply_response(&target, &insertion.code, now));
                    if let Err(error) = self.store.append_images(target.as_str(), insertion.images) {
                        warn!(page = %target, %error, "image records dropped");
                    }
                }
                Err(error) => {
                    warn!(page = %target, %error, "image request failed");
                    effects.push(Effect::Notice(Notice::error(format!(
                        "Could not add images to {target}: {error}"
                    ))));
                }
            },
            (Request::Upload { file_name }, JobOutput::Uploaded(result)) => match result {
                Ok(()) => {
                    info!(%file_name, "file uploaded");
                    effects.push(Effect::Notice(Notice::info(format!("Uploaded {file_name}"))));
                }
                Err(error) => {
                    warn!(%file_name, %error, "upload failed");
                    effects.push(Effect::Notice(Notice::error(format!(
                        "Could not upload {file_name}: {error}"
                    ))));
                }
            },
            (Request::Hierarchy, JobOutput::HierarchySaved(result)) => match result {
                Ok(()) => debug!("hierarchy persisted"),
                Err(CollaboratorError::Unavailable(reason)) => {
                    debug!(%reason, "hierarchy not persisted");
                }
                Err(error) => {
                    warn!(%error, "hierarchy not persisted");
                    effects.push(Effect::Notice(Notice::warning(format!(
                        "Could not save the page hierarchy: {error}"
                    ))));
                }
            },
            (request, output) => {
                warn!(?request, ?output, "job output does not match its request");
            }
        }
        effects
    }

    /// Commit collaborator markup to the page it was requested for, which
    /// need not be the active page any more.
    fn apply_response(&mut self, target: &PagePath, code: &str, now: Instant) -> Vec<Effect> {
        match self.store.commit(target.as_str(), code, None) {
            Ok(outcome) => {
                info!(page = %target, recorded = outcome.recorded, "collaborator response applied");
                if outcome.recorded {
                    self.code_changed(target, now);
                }
                fallback_notice(target, outcome.fallback).into_iter().collect()
            }
            Err(error) => {
                warn!(page = %target, %error, "collaborator response dropped");
                vec![Effect::Notice(Notice::warning(format!(
                    "Response for {target} was dropped: {error}"
                )))]
            }
        }
    }

    fn submit_edit(&mut self, target: PagePath, intent: Intent, remaining: VecDeque<PagePath>) {
        let current_code = self
            .store
            .current(target.as_str())
            .map(|entry| entry.code.clone())
            .unwrap_or_default();
        let label = format!("edit {target}");
        debug!(page = %target, remaining = remaining.len(), "submitting edit request");

        let id = match &intent.route {
            Route::Generate => {
                let request = GenerateRequest {
                    prompt: intent.prompt.clone(),
                    current_code,
                    existing_pages: self.store.pages().iter().map(|p| p.to_string()).collect(),
                    page_path: target.to_string(),
                };
                let generation = self.collaborators.generation.clone();
                self.jobs
                    .submit(label, move || JobOutput::Code(generation.generate(&request)))
            }
            Route::Map { address } => {
                let maps = self.collaborators.maps.clone();
                let address = address.clone();
                let description = intent.prompt.clone();
                self.jobs.submit(label, move || {
                    JobOutput::Code(maps.geocode(&address).and_then(|at| {
                        maps.add_map(&MapRequest::at(current_code, description, at))
                    }))
                })
            }
        };
        self.requests.insert(
            id,
            Request::Edit {
                target,
                intent,
                remaining,
            },
        );
    }

    fn submit_upload(&mut self, file: UploadedFile) {
        let uploads = self.collaborators.uploads.clone();
        let file_name = file.file_name.clone();
        let id = self
            .jobs
            .submit(format!("upload {file_name}"), move || JobOutput::Uploaded(uploads.upload(&file)));
        self.requests.insert(id, Request::Upload { file_name });
    }

    fn sync_effect(&mut self, effect: SyncEffect, now: Instant) -> Vec<Effect> {
        match effect {
            SyncEffect::ActivePageChanged(page) => self.activate(page),
            SyncEffect::PageNotFound { href, fallback } => {
                let message = match fallback {
                    Some(page) => format!("Page {href} not found, showing {page}"),
                    None => format!("Page {href} not found"),
                };
                vec![Effect::Notice(Notice::warning(message))]
            }
            SyncEffect::Committed { page, outcome } => {
                if outcome.recorded {
                    self.code_changed(&page, now);
                }
                fallback_notice(&page, outcome.fallback).into_iter().collect()
            }
            SyncEffect::CommitRefused { page, reason } => {
                vec![Effect::Notice(Notice::error(format!(
                    "Edit of {page} was refused: {reason}"
                )))]
            }
            SyncEffect::Upload {
                file_name,
                file_content,
            } => {
                self.submit_upload(UploadedFile {
                    file_name,
                    text_content: file_content,
                });
                Vec::new()
            }
        }
    }

    fn history_step(&mut self, page: &str, step: HistoryStep, action: &str, now: Instant) -> Vec<Effect> {
        match step {
            HistoryStep::Applied(_) => {
                if let Ok(page) = PagePath::parse(page) {
                    self.code_changed(&page, now);
                }
                Vec::new()
            }
            HistoryStep::Unchanged => {
                vec![Effect::Notice(Notice::info(format!("Nothing to {action} on {page}")))]
            }
        }
    }

    fn relocated(&mut self, relocation: Relocation, now: Instant) -> Vec<Effect> {
        match relocation {
            Relocation::Moved { renamed, active } => {
                self.retarget(&renamed);
                self.hierarchy_changed(now);
                match active {
                    Some(active) => self.activate(active),
                    None => Vec::new(),
                }
            }
            Relocation::Skipped(reason) => {
                debug!(?reason, "move skipped");
                vec![Effect::Notice(Notice::info(skipped_message(reason)))]
            }
        }
    }

    /// Keep outstanding requests pointed at pages that were renamed while
    /// they were in flight.
    fn retarget(&mut self, renamed: &[(PagePath, PagePath)]) {
        let rename = |path: &mut PagePath| {
            if let Some((_, to)) = renamed.iter().find(|(from, _)| from == path) {
                *path = to.clone();
            }
        };
        for request in self.requests.values_mut() {
            match request {
                Request::Edit {
                    target, remaining, ..
                } => {
                    rename(target);
                    remaining.iter_mut().for_each(|path| rename(path));
                }
                Request::Images { target } => rename(target),
                Request::Upload { .. } | Request::Hierarchy => {}
            }
        }
    }

    /// Show `page` right away, dropping any pending re-render.
    fn activate(&mut self, page: PagePath) -> Vec<Effect> {
        self.render.cancel();
        let mut effects = vec![Effect::ActivePageChanged(page.clone())];
        if let Some(html) = self.render_page(page.as_str()) {
            effects.push(Effect::Send(HostMessage::Render { html }));
        }
        effects
    }

    fn code_changed(&mut self, page: &PagePath, now: Instant) {
        if self.store.active() == Some(page) {
            self.render.push((), now);
        }
    }

    /// The page list changed: the navigation bar and the persisted hierarchy
    /// both follow.
    fn hierarchy_changed(&mut self, now: Instant) {
        self.hierarchy.push(self.store.tree(), now);
        if self.store.active().is_some() {
            self.render.push((), now);
        }
    }
}

fn skipped_message(reason: MoveRejection) -> &'static str {
    match reason {
        MoveRejection::SelfMove => "Nothing moved: source and target are the same",
        MoveRejection::IntoDescendant => "A folder cannot be moved into itself",
        MoveRejection::UnknownSource => "Nothing to move at that path",
        MoveRejection::NotAFolder => "Pages can only be moved into folders",
        MoveRejection::AlreadyThere => "Already in that folder",
    }
}

fn fallback_notice(page: &PagePath, fallback: Option<Fallback>) -> Option<Effect> {
    let message = match fallback? {
        Fallback::LastKnownGood => {
            format!("Markup for {page} could not be repaired; the last valid version was kept")
        }
        Fallback::ErrorPage => {
            format!("Markup for {page} could not be repaired; an error page was substituted")
        }
    };
    Some(Effect::Notice(Notice::warning(message)))
}
