//! The single owner of every page, its history and its auxiliary records.

use std::collections::BTreeMap;

use atelier_html::{Fallback, NormalizeOptions, Normalizer};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::history::{History, HistoryEntry};
use crate::path::{PagePath, validate_folder};
use crate::tree::{MovePlan, MoveRejection, VirtualTree};

/// Image metadata attached to a page by the image collaborator.
/// Carried verbatim; never interpreted by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub url: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub attribution: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub history: History,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageRecord>,
}

#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Page that can never be deleted.
    pub root_page: String,
    /// Theme of pages created without one.
    pub default_theme: String,
    pub history_limit: Option<usize>,
    pub normalize: NormalizeOptions,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            root_page: "index.html".to_string(),
            default_theme: "modern".to_string(),
            history_limit: None,
            normalize: NormalizeOptions::default(),
        }
    }
}

/// Result of an edit-commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Committed {
    /// False when the normalized result equals the current entry and no
    /// history entry was added.
    pub recorded: bool,
    pub fallback: Option<Fallback>,
}

/// Result of undo, redo and reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryStep {
    Applied(HistoryEntry),
    /// Already at the boundary; nothing changed.
    Unchanged,
}

/// Result of a rename or move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relocation {
    Moved {
        /// Every page path rewritten, old to new.
        renamed: Vec<(PagePath, PagePath)>,
        /// New active page when the active page was among the renamed.
        active: Option<PagePath>,
    },
    Skipped(MoveRejection),
}

/// Result of a page deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deleted {
    /// Fallback active page when the deleted page was active.
    pub active_changed: Option<PagePath>,
}

#[derive(Debug, Clone)]
pub struct DocumentStore {
    pub(crate) pages: BTreeMap<PagePath, PageRecord>,
    pub(crate) active: Option<PagePath>,
    pub(crate) options: StoreOptions,
    pub(crate) normalizer: Normalizer,
}

impl DocumentStore {
    pub fn new(options: StoreOptions) -> Self {
        let normalizer = Normalizer::new(options.normalize.clone());
        Self {
            pages: BTreeMap::new(),
            active: None,
            options,
            normalizer,
        }
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Page paths in lexical order.
    pub fn pages(&self) -> Vec<&PagePath> {
        self.pages.keys().collect()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn contains(&self, path: &str) -> bool {
        PagePath::parse(path)
            .map(|path| self.pages.contains_key(&path))
            .unwrap_or(false)
    }

    /// First page in lexical order, the deterministic fallback page.
    pub fn first_page(&self) -> Option<&PagePath> {
        self.pages.keys().next()
    }

    pub fn active(&self) -> Option<&PagePath> {
        self.active.as_ref()
    }

    pub fn set_active(&mut self, path: &str) -> Result<PagePath> {
        let path = self.existing(path)?;
        if self.active.as_ref() != Some(&path) {
            debug!(%path, "active page changed");
            self.active = Some(path.clone());
        }
        Ok(path)
    }

    pub fn current(&self, path: &str) -> Option<&HistoryEntry> {
        self.record(path).map(|record| record.history.current())
    }

    pub fn history(&self, path: &str) -> Option<&History> {
        self.record(path).map(|record| &record.history)
    }

    pub fn images(&self, path: &str) -> &[ImageRecord] {
        self.record(path)
            .map(|record| record.images.as_slice())
            .unwrap_or(&[])
    }

    pub fn append_images(&mut self, path: &str, images: Vec<ImageRecord>) -> Result<()> {
        let path = self.existing(path)?;
        if let Some(record) = self.pages.get_mut(&path) {
            record.images.extend(images);
        }
        Ok(())
    }

    /// Normalize `code` and record it as the page's next history entry.
    /// A `theme` of `None` keeps the page's current theme.
    pub fn commit(&mut self, path: &str, code: &str, theme: Option<&str>) -> Result<Committed> {
        let path = self.existing(path)?;
        let normalized = self.normalizer.normalize(code, path.as_str());
        let Some(record) = self.pages.get_mut(&path) else {
            return Err(StoreError::NotFound {
                path: path.to_string(),
            });
        };
        let theme = theme
            .map(str::to_string)
            .unwrap_or_else(|| record.history.current().theme.clone());
        let recorded = record
            .history
            .push(HistoryEntry::new(normalized.html, theme));
        if recorded {
            debug!(%path, cursor = record.history.cursor(), "committed");
        } else {
            debug!(%path, "commit matches current entry");
        }
        Ok(Committed {
            recorded,
            fallback: normalized.fallback,
        })
    }

    pub fn undo(&mut self, path: &str) -> Result<HistoryStep> {
        self.step(path, |history| history.undo().cloned())
    }

    pub fn redo(&mut self, path: &str) -> Result<HistoryStep> {
        self.step(path, |history| history.redo().cloned())
    }

    /// Restore the creation snapshot, discarding every edit.
    pub fn reset(&mut self, path: &str) -> Result<HistoryStep> {
        self.step(path, |history| {
            history.reset().then(|| history.current().clone())
        })
    }

    fn step<F>(&mut self, path: &str, apply: F) -> Result<HistoryStep>
    where
        F: FnOnce(&mut History) -> Option<HistoryEntry>,
    {
        let path = self.existing(path)?;
        let Some(record) = self.pages.get_mut(&path) else {
            return Err(StoreError::NotFound {
                path: path.to_string(),
            });
        };
        match apply(&mut record.history) {
            Some(entry) => {
                self.normalizer.remember(path.as_str(), &entry.code);
                debug!(%path, cursor = record.history.cursor(), "history step");
                Ok(HistoryStep::Applied(entry))
            }
            None => Ok(HistoryStep::Unchanged),
        }
    }

    /// Add a page with a singleton history. The first page becomes active.
    pub fn create_page(
        &mut self,
        path: &str,
        initial_code: &str,
        theme: Option<&str>,
    ) -> Result<Option<Fallback>> {
        let path = PagePath::parse(path)?;
        if self.pages.contains_key(&path) {
            return Err(StoreError::AlreadyExists {
                path: path.to_string(),
            });
        }
        let normalized = self.normalizer.normalize(initial_code, path.as_str());
        let theme = theme.unwrap_or(self.options.default_theme.as_str()).to_string();
        let history = History::with_limit(
            HistoryEntry::new(normalized.html, theme),
            self.options.history_limit,
        );
        self.pages.insert(
            path.clone(),
            PageRecord {
                history,
                images: Vec::new(),
            },
        );
        if self.active.is_none() {
            self.active = Some(path.clone());
        }
        info!(%path, "page created");
        Ok(normalized.fallback)
    }

    pub fn delete_page(&mut self, path: &str) -> Result<Deleted> {
        let path = self.existing(path)?;
        if self.pages.len() <= 1 || path.as_str() == self.options.root_page {
            warn!(%path, "refusing to delete protected page");
            return Err(StoreError::ProtectedPage {
                path: path.to_string(),
            });
        }

        self.pages.remove(&path);
        self.normalizer.forget(path.as_str());
        info!(%path, "page deleted");

        let active_changed = if self.active.as_ref() == Some(&path) {
            self.active = self.first_page().cloned();
            self.active.clone()
        } else {
            None
        };
        Ok(Deleted { active_changed })
    }

    /// Rename a page (`old` is a page path) or a folder (`old` is a folder
    /// path; every page below it is rewritten). Histories and image records
    /// move with their pages.
    pub fn rename_path(&mut self, old: &str, new: &str) -> Result<Relocation> {
        if old == new {
            return Ok(Relocation::Skipped(MoveRejection::SelfMove));
        }

        let renamed = match PagePath::parse(old) {
            Ok(page) => {
                if !self.pages.contains_key(&page) {
                    return Err(StoreError::NotFound {
                        path: page.to_string(),
                    });
                }
                let target = PagePath::parse(new)?;
                vec![(page, target)]
            }
            Err(_) => self.plan_folder_rename(old, new)?,
        };

        for (_, to) in &renamed {
            let moving = renamed.iter().any(|(from, _)| from == to);
            if self.pages.contains_key(to) && !moving {
                return Err(StoreError::AlreadyExists {
                    path: to.to_string(),
                });
            }
        }

        let mut records = Vec::with_capacity(renamed.len());
        for (from, to) in &renamed {
            if let Some(record) = self.pages.remove(from) {
                records.push((to.clone(), record));
            }
            self.normalizer.rename(from.as_str(), to.as_str());
        }
        self.pages.extend(records);

        let mut active = None;
        if let Some(current) = &self.active
            && let Some((_, to)) = renamed.iter().find(|(from, _)| from == current)
        {
            active = Some(to.clone());
        }
        if active.is_some() {
            self.active = active.clone();
        }

        info!(from = old, to = new, pages = renamed.len(), "path renamed");
        Ok(Relocation::Moved { renamed, active })
    }

    fn plan_folder_rename(&self, old: &str, new: &str) -> Result<Vec<(PagePath, PagePath)>> {
        let old = validate_folder(old)?;
        let affected: Vec<&PagePath> = self
            .pages
            .keys()
            .filter(|path| !old.is_empty() && path.is_under(&old))
            .collect();
        if affected.is_empty() {
            return Err(StoreError::NotFound { path: old });
        }

        let new = validate_folder(new)?;
        if new.len() > old.len() && new.starts_with(&old) && new.as_bytes()[old.len()] == b'/' {
            return Err(StoreError::InvalidMove { from: old, to: new });
        }
        // Folders never merge: an existing folder at `new` occupies it.
        if !new.is_empty()
            && self
                .pages
                .keys()
                .any(|path| path.is_under(&new) && !path.is_under(&old))
        {
            return Err(StoreError::AlreadyExists { path: new });
        }

        affected
            .into_iter()
            .map(|path| -> Result<(PagePath, PagePath)> {
                Ok((path.clone(), path.rebase(&old, &new)?))
            })
            .collect()
    }

    /// Move a page or folder into `target_folder` (empty for the root).
    /// Self-moves and moves into an own descendant are skipped.
    pub fn move_path(&mut self, source: &str, target_folder: &str) -> Result<Relocation> {
        let target_folder = validate_folder(target_folder)?;
        match self.tree().plan_move(source, &target_folder) {
            MovePlan::Move { from, to } => self.rename_path(&from, &to),
            MovePlan::NoOp(MoveRejection::UnknownSource) => Err(StoreError::NotFound {
                path: source.to_string(),
            }),
            MovePlan::NoOp(reason) => {
                warn!(source, target = %target_folder, ?reason, "move skipped");
                Ok(Relocation::Skipped(reason))
            }
        }
    }

    /// Read-only `{path -> code}` snapshot for export.
    pub fn export(&self) -> BTreeMap<String, String> {
        self.pages
            .iter()
            .map(|(path, record)| (path.to_string(), record.history.current().code.clone()))
            .collect()
    }

    pub fn tree(&self) -> VirtualTree {
        VirtualTree::build(self.pages.keys())
    }

    fn record(&self, path: &str) -> Option<&PageRecord> {
        let path = PagePath::parse(path).ok()?;
        self.pages.get(&path)
    }

    fn existing(&self, path: &str) -> Result<PagePath> {
        let path = PagePath::parse(path)?;
        if self.pages.contains_key(&path) {
            Ok(path)
        } else {
            Err(StoreError::NotFound {
                path: path.to_string(),
            })
        }
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new(StoreOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> DocumentStore {
        let mut store = DocumentStore::default();
        store.create_page("index.html", "<main>home</main>", None).unwrap();
        store
    }

    #[test]
    fn first_page_becomes_active() {
        let store = store();
        assert_eq!(store.active().map(|p| p.as_str()), Some("index.html"));
        assert_eq!(store.current("index.html").unwrap().theme, "modern");
    }

    #[test]
    fn commit_on_unknown_page_fails() {
        let mut store = store();
        assert!(matches!(
            store.commit("missing.html", "<p>x</p>", None),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn garbage_commit_keeps_history_clean() {
        let mut store = store();
        let outcome = store.commit("index.html", "   ", None).unwrap();
        assert!(!outcome.recorded);
        assert_eq!(outcome.fallback, Some(Fallback::LastKnownGood));
        assert_eq!(store.history("index.html").unwrap().len(), 1);
    }

    #[test]
    fn commit_keeps_theme_unless_given() {
        let mut store = store();
        store.commit("index.html", "<main>a</main>", None).unwrap();
        assert_eq!(store.current("index.html").unwrap().theme, "modern");
        store
            .commit("index.html", "<main>b</main>", Some("dark"))
            .unwrap();
        assert_eq!(store.current("index.html").unwrap().theme, "dark");
    }

    #[test]
    fn images_follow_their_page() {
        let mut store = store();
        store.create_page("shop.html", "<main>shop</main>", None).unwrap();
        let image = ImageRecord {
            url: "https://img.example/rose.jpg".to_string(),
            source: "unsplash".to_string(),
            query: "rose".to_string(),
            attribution: "Photo by A".to_string(),
        };
        store.append_images("shop.html", vec![image.clone()]).unwrap();
        store.rename_path("shop.html", "store/shop.html").unwrap();
        assert!(store.images("shop.html").is_empty());
        assert_eq!(store.images("store/shop.html"), &[image]);
    }

    #[test]
    fn export_lists_current_code() {
        let store = store();
        let export = store.export();
        assert_eq!(export.len(), 1);
        assert!(export["index.html"].contains("home"));
    }
}
