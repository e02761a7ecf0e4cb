//! Immutable compiled extension records.
//!
//! # Responsibility
//! - Hold one extension's objects, flattened layout forest, and build routines.
//! - Provide the JSON interchange form exchanged between compiler and registry.
//!
//! # Invariants
//! - Identity and equality are the content hash only.
//! - Every child, root, and routine item index points inside `entries`.
//! - The entry graph is acyclic (entries may be shared, never self-nested).

use crate::model::layout::{BuildRoutine, LayoutEntry, LayoutKind};
use crate::model::object::ObjectInfo;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Errors from loading a compiled record.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("invalid record json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("record hash must not be empty")]
    EmptyHash,
    #[error("layout entry index {index} out of range (entries={len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("layout entry {0} is nested inside itself")]
    CyclicEntries(usize),
}

/// One compiled extension descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionRecord {
    hash: String,
    version: String,
    objects: Vec<ObjectInfo>,
    entries: Vec<LayoutEntry>,
    layout_roots: Vec<usize>,
    routines: Vec<BuildRoutine>,
}

impl ExtensionRecord {
    pub(crate) fn new(
        hash: String,
        version: String,
        objects: Vec<ObjectInfo>,
        entries: Vec<LayoutEntry>,
        layout_roots: Vec<usize>,
        routines: Vec<BuildRoutine>,
    ) -> Self {
        Self {
            hash,
            version,
            objects,
            entries,
            layout_roots,
            routines,
        }
    }

    /// Lowercase hex SHA-256 of the raw descriptor bytes.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn objects(&self) -> &[ObjectInfo] {
        &self.objects
    }

    pub fn object(&self, id: &str) -> Option<&ObjectInfo> {
        self.objects.iter().find(|object| object.id == id)
    }

    /// Raw entry arena.
    pub fn entries(&self) -> &[LayoutEntry] {
        &self.entries
    }

    pub fn layout_count(&self) -> usize {
        self.layout_roots.len()
    }

    /// Declared layout trees in declaration order.
    pub fn layouts(&self) -> impl Iterator<Item = LayoutView<'_>> + '_ {
        self.layout_roots
            .iter()
            .map(move |&index| LayoutView::new(self, index))
    }

    pub fn routines(&self) -> &[BuildRoutine] {
        &self.routines
    }

    /// Item subtrees of one routine of this record.
    pub fn routine_items<'a>(
        &'a self,
        routine: &'a BuildRoutine,
    ) -> impl Iterator<Item = LayoutView<'a>> + 'a {
        routine
            .items
            .iter()
            .map(move |&index| LayoutView::new(self, index))
    }

    /// Serializes the record into its interchange form.
    pub fn to_json(&self) -> Result<String, RecordError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Loads and validates a record from its interchange form.
    pub fn from_json(json: &str) -> Result<Self, RecordError> {
        let record: Self = serde_json::from_str(json)?;
        record.validate()?;
        Ok(record)
    }

    fn validate(&self) -> Result<(), RecordError> {
        if self.hash.trim().is_empty() {
            return Err(RecordError::EmptyHash);
        }
        let len = self.entries.len();
        let check = |index: usize| {
            if index < len {
                Ok(())
            } else {
                Err(RecordError::IndexOutOfRange { index, len })
            }
        };
        for &index in &self.layout_roots {
            check(index)?;
        }
        for routine in &self.routines {
            for &index in &routine.items {
                check(index)?;
            }
        }
        for entry in &self.entries {
            for &index in &entry.children {
                check(index)?;
            }
        }

        // 0 = unvisited, 1 = on stack, 2 = done
        let mut state = vec![0u8; len];
        for start in 0..len {
            if state[start] != 0 {
                continue;
            }
            let mut stack = vec![(start, 0usize)];
            state[start] = 1;
            while let Some(top) = stack.last_mut() {
                let (index, next) = *top;
                if let Some(&child) = self.entries[index].children.get(next) {
                    top.1 += 1;
                    match state[child] {
                        0 => {
                            state[child] = 1;
                            stack.push((child, 0));
                        }
                        1 => return Err(RecordError::CyclicEntries(child)),
                        _ => {}
                    }
                } else {
                    state[index] = 2;
                    stack.pop();
                }
            }
        }
        Ok(())
    }
}

impl PartialEq for ExtensionRecord {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for ExtensionRecord {}

impl Hash for ExtensionRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

/// Borrowed view of one entry inside a record.
#[derive(Debug, Clone, Copy)]
pub struct LayoutView<'a> {
    record: &'a ExtensionRecord,
    index: usize,
}

impl<'a> LayoutView<'a> {
    fn new(record: &'a ExtensionRecord, index: usize) -> Self {
        Self { record, index }
    }

    fn entry(&self) -> &'a LayoutEntry {
        &self.record.entries[self.index]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn kind(&self) -> LayoutKind {
        self.entry().kind
    }

    pub fn id(&self) -> Option<&'a str> {
        self.entry().id.as_deref()
    }

    pub fn child_count(&self) -> usize {
        self.entry().children.len()
    }

    pub fn children(&self) -> impl Iterator<Item = LayoutView<'a>> + 'a {
        let record = self.record;
        self.entry()
            .children
            .iter()
            .map(move |&index| LayoutView::new(record, index))
    }
}
