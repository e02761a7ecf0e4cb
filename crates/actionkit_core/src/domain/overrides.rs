//! Per-object shortcut and icon override layers.
//!
//! Both layers are last-write-wins maps keyed by object id and are
//! independent of the composed layout.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Icon named either by file or by icon id in the active theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "value", rename_all = "snake_case")]
pub enum IconReference {
    File(PathBuf),
    Theme(String),
}

pub type ShortcutOverrides = IndexMap<String, Vec<String>>;
pub type IconOverrides = IndexMap<String, IconReference>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overrides {
    #[serde(default)]
    pub shortcuts: ShortcutOverrides,
    #[serde(default)]
    pub icons: IconOverrides,
}

impl Overrides {
    /// `None` drops the override for `id`.
    pub fn set_shortcuts(&mut self, id: &str, shortcuts: Option<Vec<String>>) {
        match shortcuts {
            Some(shortcuts) => {
                self.shortcuts.insert(id.to_string(), shortcuts);
            }
            None => {
                self.shortcuts.shift_remove(id);
            }
        }
    }

    pub fn shortcuts(&self, id: &str) -> Option<&[String]> {
        self.shortcuts.get(id).map(Vec::as_slice)
    }

    /// `None` drops the override for `id`.
    pub fn set_icon(&mut self, id: &str, icon: Option<IconReference>) {
        match icon {
            Some(icon) => {
                self.icons.insert(id.to_string(), icon);
            }
            None => {
                self.icons.shift_remove(id);
            }
        }
    }

    pub fn icon(&self, id: &str) -> Option<&IconReference> {
        self.icons.get(id)
    }
}

impl IconReference {
    /// Whether the reference can be used right now.
    pub fn is_available(&self) -> bool {
        match self {
            Self::File(path) => path.is_file(),
            Self::Theme(id) => !id.is_empty(),
        }
    }
}
