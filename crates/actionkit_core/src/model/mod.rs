//! Compiled extension data model.
//!
//! # Responsibility
//! - Define the immutable unit produced by the descriptor compiler.
//! - Keep layouts flattened into index-addressed arenas.
//!
//! # Invariants
//! - Records never change after compilation.
//! - Separator and stretch entries carry no id.

pub mod layout;
pub mod object;
pub mod record;

pub use layout::{Anchor, BuildRoutine, LayoutEntry, LayoutKind};
pub use object::{ObjectInfo, ObjectKind, ObjectMode, ObjectType};
pub use record::{ExtensionRecord, LayoutView, RecordError};
