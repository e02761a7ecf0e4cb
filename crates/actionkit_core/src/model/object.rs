//! Compiled object declarations.
//!
//! # Responsibility
//! - Describe one action, group, or menu contributed by an extension.
//! - Encode the closed `type x mode` set as one tagged variant.
//!
//! # Invariants
//! - `id` is non-empty and unique across every registered extension.
//! - `categories` is non-empty once compilation finishes.

use serde::{Deserialize, Serialize};

/// Coarse object type, as seen by layouts and catalog consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    Action,
    Group,
    Menu,
}

/// How an object is materialized by a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectMode {
    /// Inlined at every declaration site.
    Plain,
    /// Built once and shared by reference.
    Unique,
    /// Built once as a top-level container (menu bar, tool bar).
    TopLevel,
    /// Action backed by a custom widget.
    Widget,
}

/// Closed set of valid `type x mode` combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Action,
    WidgetAction,
    PlainGroup,
    UniqueGroup,
    PlainMenu,
    UniqueMenu,
    TopLevelMenu,
}

impl ObjectKind {
    pub fn object_type(self) -> ObjectType {
        match self {
            Self::Action | Self::WidgetAction => ObjectType::Action,
            Self::PlainGroup | Self::UniqueGroup => ObjectType::Group,
            Self::PlainMenu | Self::UniqueMenu | Self::TopLevelMenu => ObjectType::Menu,
        }
    }

    pub fn mode(self) -> ObjectMode {
        match self {
            Self::Action | Self::PlainGroup | Self::PlainMenu => ObjectMode::Plain,
            Self::WidgetAction => ObjectMode::Widget,
            Self::UniqueGroup | Self::UniqueMenu => ObjectMode::Unique,
            Self::TopLevelMenu => ObjectMode::TopLevel,
        }
    }

    /// Whether the object is a shared (non-Plain) menu or group.
    pub fn is_standalone(self) -> bool {
        match self {
            Self::UniqueGroup | Self::UniqueMenu | Self::TopLevelMenu => true,
            Self::Action | Self::WidgetAction | Self::PlainGroup | Self::PlainMenu => false,
        }
    }
}

/// One compiled object declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Globally unique object id, e.g. `file.open`.
    pub id: String,
    pub kind: ObjectKind,
    /// Untranslated label.
    pub text: String,
    /// Untranslated command class, empty when undeclared.
    pub command_class: String,
    /// Shortcut tokens in declaration order.
    pub shortcuts: Vec<String>,
    /// Category path from catalog root to this object.
    pub categories: Vec<String>,
}

impl ObjectInfo {
    pub fn object_type(&self) -> ObjectType {
        self.kind.object_type()
    }

    pub fn mode(&self) -> ObjectMode {
        self.kind.mode()
    }

    pub fn is_standalone(&self) -> bool {
        self.kind.is_standalone()
    }
}
