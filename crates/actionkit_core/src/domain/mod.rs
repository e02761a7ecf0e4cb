//! Action domain: registered extensions and every view derived from them.
//!
//! # Responsibility
//! - Own the extension registry, icon store, and override layers.
//! - Serve catalog and composed layouts from generation-keyed caches.
//! - Persist and restore composed layouts across extension changes.
//!
//! # Invariants
//! - Any registry mutation invalidates the catalog and composed layouts,
//!   including layouts supplied through `set_layouts` or restore.
//! - A composition failure leaves empty layouts plus the error, never a
//!   partial forest. Such layouts are never saved.
//!
//! # See also
//! - `compose` for root collection and routine anchors.
//! - `codec` for the saved document format.

pub mod catalog;
pub mod codec;
pub mod compose;
mod memo;
pub mod overrides;
pub mod registry;
mod sorter;

use crate::config::EngineConfig;
use crate::icon::{IconError, IconStore};
use crate::logging::log_value;
use crate::model::{ExtensionRecord, ObjectInfo};
use catalog::Catalog;
use codec::{RestoreError, SaveError};
use compose::{ComposeError, ComposedLayout, LayoutTree};
use log::{info, warn};
use memo::Memo;
use overrides::{IconOverrides, IconReference, Overrides, ShortcutOverrides};
use registry::{ExtensionRegistry, RegistryError};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug)]
struct Composition {
    layout: Arc<ComposedLayout>,
    error: Option<ComposeError>,
}

impl Composition {
    fn from_result(result: Result<ComposedLayout, ComposeError>) -> Self {
        match result {
            Ok(layout) => Self {
                layout: Arc::new(layout),
                error: None,
            },
            Err(err) => {
                warn!(
                    "event=layout_compose module=domain status=error reason={}",
                    log_value(&err.to_string())
                );
                Self {
                    layout: Arc::new(ComposedLayout::empty()),
                    error: Some(err),
                }
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct ActionDomain {
    registry: ExtensionRegistry,
    catalog: Memo<Catalog>,
    layouts: Memo<Composition>,
    icons: IconStore,
    overrides: Overrides,
}

impl ActionDomain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Domain with the configured icon bundles registered.
    pub fn with_config(config: &EngineConfig) -> Result<Self, IconError> {
        let mut domain = Self::new();
        for bundle in &config.icons.bundles {
            domain.add_icon_configuration(bundle)?;
        }
        Ok(domain)
    }

    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    pub fn add_extension(
        &mut self,
        record: impl Into<Arc<ExtensionRecord>>,
    ) -> Result<(), RegistryError> {
        self.registry.add(record.into())
    }

    pub fn remove_extension(&mut self, hash: &str) -> Option<Arc<ExtensionRecord>> {
        self.registry.remove(hash)
    }

    /// Registered records in registration order.
    pub fn extensions(&self) -> impl Iterator<Item = &Arc<ExtensionRecord>> + '_ {
        self.registry.extensions()
    }

    pub fn object_ids(&self) -> Vec<String> {
        self.registry.object_ids()
    }

    pub fn object_info(&self, id: &str) -> Option<&ObjectInfo> {
        self.registry.object(id)
    }

    pub fn catalog(&self) -> Arc<Catalog> {
        self.catalog
            .get_or_build(self.registry.generation(), || {
                Catalog::build(self.registry.objects())
            })
    }

    fn composition(&self) -> Arc<Composition> {
        self.layouts.get_or_build(self.registry.generation(), || {
            let composition = Composition::from_result(compose::compose(&self.registry));
            info!(
                "event=layout_compose module=domain status={} roots={}",
                if composition.error.is_some() { "error" } else { "ok" },
                composition.layout.roots().len()
            );
            composition
        })
    }

    pub fn layouts(&self) -> Arc<ComposedLayout> {
        Arc::clone(&self.composition().layout)
    }

    /// Error of the composition currently served by `layouts`.
    pub fn last_layout_error(&self) -> Option<ComposeError> {
        self.composition().error.clone()
    }

    /// Replaces the composed layouts with consumer-edited trees.
    pub fn set_layouts(&mut self, trees: &[LayoutTree]) -> Result<(), ComposeError> {
        let result = compose::compose_trees(&self.registry, trees);
        let outcome = result.as_ref().map(|_| ()).map_err(Clone::clone);
        self.layouts
            .set(self.registry.generation(), Composition::from_result(result));
        outcome
    }

    /// Drops any supplied layouts; the next read composes from scratch.
    pub fn reset_layouts(&mut self) {
        self.layouts.invalidate();
    }

    /// Saves the composed layouts. Refused while a composition error is
    /// served, so the failed extensions are not marked as applied.
    pub fn save_layouts(&self) -> Result<Vec<u8>, SaveError> {
        let composition = self.composition();
        if let Some(err) = &composition.error {
            warn!(
                "event=layout_save module=domain status=error reason={}",
                log_value(&err.to_string())
            );
            return Err(SaveError::Unavailable(err.clone()));
        }
        Ok(codec::save(&self.registry, &composition.layout)?)
    }

    /// Restores saved layouts. Unreadable data keeps the current layouts; a
    /// composition failure leaves them empty.
    pub fn restore_layouts(&mut self, data: &[u8]) -> Result<(), RestoreError> {
        match codec::restore(data, &self.registry) {
            Ok(layout) => {
                self.layouts
                    .set(self.registry.generation(), Composition::from_result(Ok(layout)));
                Ok(())
            }
            Err(RestoreError::Compose(err)) => {
                self.layouts.set(
                    self.registry.generation(),
                    Composition::from_result(Err(err.clone())),
                );
                Err(RestoreError::Compose(err))
            }
            Err(err) => {
                warn!(
                    "event=layout_restore module=domain status=error reason={}",
                    log_value(&err.to_string())
                );
                Err(err)
            }
        }
    }

    pub fn icons(&self) -> &IconStore {
        &self.icons
    }

    pub fn add_icon(&mut self, theme: &str, id: &str, file: &Path) -> Result<(), IconError> {
        self.icons.add_icon(theme, id, file)
    }

    pub fn remove_icon(&mut self, theme: &str, id: &str) {
        self.icons.remove_icon(theme, id);
    }

    pub fn add_icon_configuration(&mut self, file: &Path) -> Result<(), IconError> {
        self.icons.add_icon_configuration(file)
    }

    pub fn remove_icon_configuration(&mut self, file: &Path) {
        self.icons.remove_icon_configuration(file);
    }

    pub fn icon(&self, theme: &str, id: &str) -> Option<PathBuf> {
        self.icons.icon(theme, id)
    }

    pub fn icon_themes(&self) -> Vec<String> {
        self.icons.icon_themes()
    }

    pub fn icon_ids(&self, theme: &str) -> Vec<String> {
        self.icons.icon_ids(theme)
    }

    /// `None` drops the override for `id`.
    pub fn set_shortcuts(&mut self, id: &str, shortcuts: Option<Vec<String>>) {
        self.overrides.set_shortcuts(id, shortcuts);
    }

    pub fn shortcuts(&self, id: &str) -> Option<&[String]> {
        self.overrides.shortcuts(id)
    }

    /// Override when present, else the declared shortcuts.
    pub fn effective_shortcuts(&self, id: &str) -> Vec<String> {
        match self.overrides.shortcuts(id) {
            Some(shortcuts) => shortcuts.to_vec(),
            None => self
                .registry
                .object(id)
                .map(|object| object.shortcuts.clone())
                .unwrap_or_default(),
        }
    }

    pub fn reset_shortcuts(&mut self) {
        self.overrides.shortcuts.clear();
    }

    pub fn shortcut_overrides(&self) -> &ShortcutOverrides {
        &self.overrides.shortcuts
    }

    pub fn set_shortcut_overrides(&mut self, shortcuts: ShortcutOverrides) {
        self.overrides.shortcuts = shortcuts;
    }

    /// `None` drops the override. File references must exist.
    pub fn set_icon_override(
        &mut self,
        id: &str,
        icon: Option<IconReference>,
    ) -> Result<(), IconError> {
        if let Some(IconReference::File(path)) = &icon {
            if !path.is_file() {
                return Err(IconError::MissingFile(path.clone()));
            }
        }
        self.overrides.set_icon(id, icon);
        Ok(())
    }

    pub fn icon_override(&self, id: &str) -> Option<&IconReference> {
        self.overrides.icon(id)
    }

    pub fn reset_icon_overrides(&mut self) {
        self.overrides.icons.clear();
    }

    pub fn icon_overrides(&self) -> &IconOverrides {
        &self.overrides.icons
    }

    /// Replaces every icon override; file references that do not exist are
    /// dropped.
    pub fn set_icon_overrides(&mut self, icons: IconOverrides) {
        self.overrides.icons = icons
            .into_iter()
            .filter(|(id, icon)| {
                let keep = icon.is_available();
                if !keep {
                    warn!(
                        "event=icon_override module=domain status=skipped reason=unavailable id={}",
                        log_value(id)
                    );
                }
                keep
            })
            .collect();
    }

    pub fn overrides(&self) -> &Overrides {
        &self.overrides
    }
}
