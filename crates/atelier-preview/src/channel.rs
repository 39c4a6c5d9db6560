//! Single inbound handler for messages posted by the sandbox.

use atelier_store::{Committed, DocumentStore, PAGE_SUFFIX, PagePath};
use tracing::{debug, info, warn};
use url::Url;

use crate::artifacts::strip_editor_artifacts;
use crate::protocol::{InboundEvent, OriginPolicy, SandboxMessage};

/// Host used to resolve relative links; never dereferenced.
const SANDBOX_HOST: &str = "sandbox.invalid";

/// What the host has to do after an inbound message was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEffect {
    ActivePageChanged(PagePath),
    /// A link named no known page; `fallback` became active instead.
    PageNotFound {
        href: String,
        fallback: Option<PagePath>,
    },
    Committed {
        page: PagePath,
        outcome: Committed,
    },
    /// An edit arrived for a page that cannot take it. Nothing changed.
    CommitRefused {
        page: String,
        reason: String,
    },
    /// A file dropped on the preview, for the upload collaborator.
    Upload {
        file_name: String,
        file_content: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct SyncChannel {
    policy: OriginPolicy,
}

impl SyncChannel {
    pub fn new(policy: OriginPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &OriginPolicy {
        &self.policy
    }

    /// Validate and apply one inbound event. Events from foreign origins
    /// and malformed payloads are dropped without effects.
    pub fn dispatch(&self, store: &mut DocumentStore, event: InboundEvent) -> Vec<SyncEffect> {
        if !self.policy.allows(&event.origin) {
            debug!(origin = %event.origin, "dropped message from foreign origin");
            return Vec::new();
        }
        let message = match SandboxMessage::decode(&event.data) {
            Ok(message) => message,
            Err(error) => {
                warn!(origin = %event.origin, ?error, "dropped malformed sandbox message");
                return Vec::new();
            }
        };
        debug!(origin = %event.origin, kind = message.kind(), "sandbox message");

        match message {
            SandboxMessage::Navigation { href } => navigate(store, href),
            SandboxMessage::UpdateHtml { html, page } => update_html(store, &html, page),
            SandboxMessage::FileDrop {
                file_name,
                file_content,
            } => vec![SyncEffect::Upload {
                file_name,
                file_content,
            }],
        }
    }
}

fn navigate(store: &mut DocumentStore, href: String) -> Vec<SyncEffect> {
    let previous = store.active().cloned();
    let target = link_candidates(previous.as_ref(), &href)
        .into_iter()
        .find(|candidate| store.contains(candidate));

    let mut effects = Vec::new();
    let next = match target {
        Some(candidate) => store.set_active(&candidate).ok(),
        None => {
            let first = store.first_page().map(|page| page.to_string());
            let fallback = first.and_then(|page| store.set_active(&page).ok());
            info!(%href, fallback = ?fallback, "link names no known page");
            effects.push(SyncEffect::PageNotFound {
                href,
                fallback: fallback.clone(),
            });
            fallback
        }
    };

    if let Some(page) = next
        && previous.as_ref() != Some(&page)
    {
        effects.push(SyncEffect::ActivePageChanged(page));
    }
    effects
}

fn update_html(store: &mut DocumentStore, html: &str, page: Option<String>) -> Vec<SyncEffect> {
    let Some(target) = page.or_else(|| store.active().map(|p| p.to_string())) else {
        return vec![SyncEffect::CommitRefused {
            page: String::new(),
            reason: "no active page".to_string(),
        }];
    };

    let page = match PagePath::parse(&target) {
        Ok(page) => page,
        Err(error) => return vec![refused(target, error)],
    };
    let cleaned = strip_editor_artifacts(html);
    match store.commit(page.as_str(), &cleaned, None) {
        Ok(outcome) => vec![SyncEffect::Committed { page, outcome }],
        Err(error) => vec![refused(target, error)],
    }
}

fn refused(page: String, error: impl std::fmt::Display) -> SyncEffect {
    warn!(%page, %error, "refused sandbox edit");
    SyncEffect::CommitRefused {
        page,
        reason: error.to_string(),
    }
}

/// Page paths a link may name, most specific first.
fn link_candidates(active: Option<&PagePath>, href: &str) -> Vec<String> {
    let mut candidates = Vec::new();

    let resolved = Url::parse(&format!("https://{SANDBOX_HOST}/"))
        .and_then(|base| base.join(active.map(PagePath::as_str).unwrap_or("")))
        .and_then(|base| base.join(href));
    if let Ok(url) = resolved
        && url.host_str() == Some(SANDBOX_HOST)
    {
        let path = url.path().trim_start_matches('/');
        let decoded = urlencoding::decode(path)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| path.to_string());
        candidates.push(decoded);
    }

    let raw = href
        .split(['#', '?'])
        .next()
        .unwrap_or("")
        .trim_start_matches("./")
        .trim_start_matches('/');
    candidates.push(raw.to_string());

    let mut suffixed: Vec<String> = candidates
        .iter()
        .filter(|candidate| !candidate.is_empty() && !candidate.ends_with(PAGE_SUFFIX))
        .map(|candidate| format!("{}{PAGE_SUFFIX}", candidate.trim_end_matches('/')))
        .collect();
    candidates.append(&mut suffixed);
    candidates.retain(|candidate| !candidate.is_empty());
    candidates.dedup();
    candidates
}
