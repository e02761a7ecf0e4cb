//! Extension and layout composition engine.
//! Compiles extension descriptors and merges them into catalogs, ordered
//! layout forests, and icon lookups.

pub mod compiler;
pub mod config;
pub mod domain;
pub mod icon;
pub mod logging;
pub mod model;

pub use compiler::{
    compile, compile_file, compile_str, CompileError, CompileErrorKind, CompileOptions,
};
pub use config::{CompilerConfig, ConfigError, EngineConfig, IconsConfig, LoggingConfig};
pub use domain::catalog::Catalog;
pub use domain::codec::{RestoreError, SaveError};
pub use domain::compose::{
    ComposeError, ComposedLayout, LayoutNode, LayoutRef, LayoutTree, NodeId,
};
pub use domain::overrides::{IconReference, Overrides};
pub use domain::registry::{ExtensionRegistry, RegistryError};
pub use domain::ActionDomain;
pub use icon::{IconError, IconStore};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::{
    Anchor, BuildRoutine, ExtensionRecord, LayoutEntry, LayoutKind, ObjectInfo, ObjectKind,
    ObjectMode, ObjectType, RecordError,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
