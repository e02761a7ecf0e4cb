//! Flattened layout entries and build routines stored in compiled records.

use serde::{Deserialize, Serialize};

/// Kind of one layout entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayoutKind {
    Action,
    Group,
    Menu,
    /// Menu whose children are spliced into the parent instead of a submenu.
    ExpandedMenu,
    Separator,
    Stretch,
}

impl LayoutKind {
    /// Separator and stretch entries carry no identity.
    pub fn is_spacer(self) -> bool {
        matches!(self, Self::Separator | Self::Stretch)
    }

    /// Element tag used by descriptor and persisted layout documents.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Action => "action",
            Self::Group => "group",
            Self::Menu | Self::ExpandedMenu => "menu",
            Self::Separator => "separator",
            Self::Stretch => "stretch",
        }
    }
}

/// One entry of a record's layout arena.
///
/// `children` are indexes into the owning record's entry list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutEntry {
    pub kind: LayoutKind,
    /// Object id; `None` for separators and stretches.
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<usize>,
}

impl LayoutEntry {
    pub fn spacer(kind: LayoutKind) -> Self {
        Self {
            kind,
            id: None,
            children: Vec::new(),
        }
    }

    pub fn object(kind: LayoutKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: Some(id.into()),
            children: Vec::new(),
        }
    }
}

/// Insertion rule of a build routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Anchor {
    First,
    Last,
    Before,
    After,
}

impl Anchor {
    /// Parses a descriptor anchor token. An absent token means `After`.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "first" | "front" => Some(Self::First),
            "last" | "back" => Some(Self::Last),
            "before" => Some(Self::Before),
            "" | "after" => Some(Self::After),
            _ => None,
        }
    }

    pub fn needs_relative(self) -> bool {
        matches!(self, Self::Before | Self::After)
    }
}

/// Patch that grafts items into another object's children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRoutine {
    pub parent: String,
    pub anchor: Anchor,
    /// Sibling id, present iff the anchor is `Before` or `After`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_to: Option<String>,
    /// Indexes of the inserted item entries in the record arena.
    pub items: Vec<usize>,
}
