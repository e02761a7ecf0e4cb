//! Buffered theme/id -> file icon lookup.
//!
//! # Responsibility
//! - Accept single icon files and bundle files as registrations.
//! - Buffer changes and rebuild the lookup table on the next read.
//!
//! # Invariants
//! - Pending changes are last-write-wins per key (`(theme, id)` or bundle
//!   path).
//! - The table is rebuilt from registrations in order; later
//!   registrations override earlier ones per `(theme, id)`.
//! - A themed lookup falls back to the unthemed `""` bucket only when the
//!   themed entry is absent or empty.

pub mod bundle;

use crate::logging::log_value;
use bundle::{parse_bundle, ThemeMap};
use indexmap::{IndexMap, IndexSet};
use log::{debug, warn};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use bundle::BundleError;

/// Theme of the fallback bucket.
pub const DEFAULT_THEME: &str = "";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IconError {
    #[error("icon file `{}` does not exist", .0.display())]
    MissingFile(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum RegistrationKey {
    Single { theme: String, id: String },
    Bundle(PathBuf),
}

#[derive(Debug, Clone)]
enum Change {
    Add(PathBuf),
    Remove,
}

#[derive(Debug, Default)]
struct StoreState {
    pending: IndexMap<RegistrationKey, Change>,
    singles: HashMap<RegistrationKey, PathBuf>,
    bundles: HashMap<RegistrationKey, ThemeMap>,
    /// Live registrations, oldest first.
    order: IndexSet<RegistrationKey>,
    table: ThemeMap,
}

impl StoreState {
    fn push(&mut self, key: RegistrationKey, change: Change) {
        self.pending.shift_remove(&key);
        self.pending.insert(key, change);
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut self.pending);
        let changes = pending.len();
        for (key, change) in pending {
            match change {
                Change::Remove => {
                    let removed = self.singles.remove(&key).is_some()
                        || self.bundles.remove(&key).is_some();
                    if removed {
                        self.order.shift_remove(&key);
                    }
                }
                Change::Add(path) => {
                    if !self.register(&key, &path) {
                        continue;
                    }
                    self.order.shift_remove(&key);
                    self.order.insert(key);
                }
            }
        }

        self.table.clear();
        for key in &self.order {
            match key {
                RegistrationKey::Single { theme, id } => {
                    if let Some(path) = self.singles.get(key) {
                        self.table
                            .entry(theme.clone())
                            .or_default()
                            .insert(id.clone(), path.clone());
                    }
                }
                RegistrationKey::Bundle(_) => {
                    let Some(themes) = self.bundles.get(key) else {
                        continue;
                    };
                    for (theme, icons) in themes {
                        let target = self.table.entry(theme.clone()).or_default();
                        target.extend(icons.iter().map(|(id, path)| (id.clone(), path.clone())));
                    }
                }
            }
        }
        debug!(
            "event=icon_flush module=icon status=ok changes={} registrations={}",
            changes,
            self.order.len()
        );
    }

    fn register(&mut self, key: &RegistrationKey, path: &Path) -> bool {
        match key {
            RegistrationKey::Single { .. } => match path.canonicalize() {
                Ok(canonical) if canonical.is_file() => {
                    self.singles.insert(key.clone(), canonical);
                    true
                }
                _ => {
                    warn!(
                        "event=icon_flush module=icon status=skipped reason=missing_file path={}",
                        log_value(&path.display().to_string())
                    );
                    false
                }
            },
            RegistrationKey::Bundle(_) => {
                let themes = parse_bundle(path).unwrap_or_else(|err| {
                    warn!(
                        "event=icon_bundle_parse module=icon status=error path={} reason={}",
                        log_value(&path.display().to_string()),
                        log_value(&err.to_string())
                    );
                    ThemeMap::new()
                });
                self.bundles.insert(key.clone(), themes);
                true
            }
        }
    }
}

/// Icon lookup table fed by buffered registrations.
#[derive(Debug, Default)]
pub struct IconStore {
    state: RefCell<StoreState>,
}

impl IconStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `file` for `(theme, id)`. The file must exist now.
    pub fn add_icon(&mut self, theme: &str, id: &str, file: &Path) -> Result<(), IconError> {
        if !file.is_file() {
            return Err(IconError::MissingFile(file.to_path_buf()));
        }
        self.state.get_mut().push(
            RegistrationKey::Single {
                theme: theme.to_string(),
                id: id.to_string(),
            },
            Change::Add(file.to_path_buf()),
        );
        Ok(())
    }

    pub fn remove_icon(&mut self, theme: &str, id: &str) {
        self.state.get_mut().push(
            RegistrationKey::Single {
                theme: theme.to_string(),
                id: id.to_string(),
            },
            Change::Remove,
        );
    }

    /// Registers a bundle file. The file is parsed on the next read.
    pub fn add_icon_configuration(&mut self, file: &Path) -> Result<(), IconError> {
        if !file.is_file() {
            return Err(IconError::MissingFile(file.to_path_buf()));
        }
        self.state.get_mut().push(
            RegistrationKey::Bundle(file.to_path_buf()),
            Change::Add(file.to_path_buf()),
        );
        Ok(())
    }

    pub fn remove_icon_configuration(&mut self, file: &Path) {
        self.state
            .get_mut()
            .push(RegistrationKey::Bundle(file.to_path_buf()), Change::Remove);
    }

    /// Resolved file for `(theme, id)`, falling back to the default theme.
    pub fn icon(&self, theme: &str, id: &str) -> Option<PathBuf> {
        let mut state = self.state.borrow_mut();
        state.flush();
        let lookup = |theme: &str| {
            state
                .table
                .get(theme)
                .and_then(|icons| icons.get(id))
                .filter(|path| !path.as_os_str().is_empty())
                .cloned()
        };
        lookup(theme).or_else(|| lookup(DEFAULT_THEME))
    }

    pub fn icon_themes(&self) -> Vec<String> {
        let mut state = self.state.borrow_mut();
        state.flush();
        state.table.keys().cloned().collect()
    }

    pub fn icon_ids(&self, theme: &str) -> Vec<String> {
        let mut state = self.state.borrow_mut();
        state.flush();
        state
            .table
            .get(theme)
            .map(|icons| icons.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether registrations are waiting for the next read.
    pub fn has_pending_changes(&self) -> bool {
        !self.state.borrow().pending.is_empty()
    }
}
