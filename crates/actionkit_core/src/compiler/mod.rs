//! Extension descriptor compiler.
//!
//! # Responsibility
//! - Turn one `actionExtension` descriptor into an immutable `ExtensionRecord`.
//! - Expand variables, infer labels and categories, merge repeated layout
//!   declarations by sequence key.
//!
//! # Invariants
//! - Compilation either yields a complete record or a typed error; it never
//!   terminates the process.
//! - The record hash is computed over the raw descriptor bytes.

pub mod expr;
mod parser;
pub mod text;
pub mod xml;

use crate::config::CompilerConfig;
use crate::logging::log_value;
use crate::model::ExtensionRecord;
use log::{info, warn};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use expr::{expand, Variables};
pub use xml::{XmlElement, XmlError};

/// Root tag of an extension descriptor.
pub const DESCRIPTOR_ROOT_TAG: &str = "actionExtension";

/// Error category of a compile failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileErrorKind {
    /// Bad root tag, missing required id or attribute, bad structure.
    MalformedDescriptor,
    /// Same id declared twice in one descriptor.
    DuplicateDeclaration,
    /// An id nested inside its own layout subtree.
    RecursiveLayoutChain,
    /// Descriptor file could not be read.
    Unreadable,
}

/// Descriptor compile errors. Each aborts compilation of that descriptor.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("failed to read descriptor `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Xml(#[from] XmlError),
    #[error("unknown root element tag `{0}`")]
    UnknownRootTag(String),
    #[error("duplicated version value `{current}`, the previous one is `{previous}`")]
    DuplicateVersion { previous: String, current: String },
    #[error("duplicated parser config elements")]
    DuplicateParserConfig,
    #[error("{context} element `{tag}` doesn't have an `id` field")]
    MissingId { context: &'static str, tag: String },
    #[error("unknown {context} object tag `{tag}`")]
    UnknownObjectTag { context: &'static str, tag: String },
    #[error("{context} element `{id}` has tag `{tag}` inconsistent with its declaration `{declared}`")]
    InconsistentTag {
        context: &'static str,
        id: String,
        tag: String,
        declared: String,
    },
    #[error("{context} element `{name}` shouldn't have children")]
    UnexpectedChildren { context: &'static str, name: String },
    #[error("recursive chain in layout: {}", .chain.join(", "))]
    RecursiveLayoutChain { chain: Vec<String> },
    #[error("layout element `{0}` has multiple defined structures while it's not plain")]
    ConflictingStructure(String),
    #[error("unknown build routine element tag `{0}`")]
    UnknownRoutineTag(String),
    #[error("build routine doesn't have a parent")]
    MissingRoutineParent,
    #[error("unknown build routine anchor `{0}`")]
    UnknownAnchor(String),
    #[error("build routine with anchor `{0}` must have a relative sibling")]
    MissingRelativeSibling(String),
    #[error("empty build routine for parent `{0}`")]
    EmptyRoutine(String),
    #[error("duplicated object id `{0}`")]
    DuplicateObjectId(String),
}

impl CompileError {
    pub fn kind(&self) -> CompileErrorKind {
        match self {
            Self::Io { .. } => CompileErrorKind::Unreadable,
            Self::DuplicateObjectId(_) => CompileErrorKind::DuplicateDeclaration,
            Self::RecursiveLayoutChain { .. } => CompileErrorKind::RecursiveLayoutChain,
            Self::Xml(_)
            | Self::UnknownRootTag(_)
            | Self::DuplicateVersion { .. }
            | Self::DuplicateParserConfig
            | Self::MissingId { .. }
            | Self::UnknownObjectTag { .. }
            | Self::InconsistentTag { .. }
            | Self::UnexpectedChildren { .. }
            | Self::ConflictingStructure(_)
            | Self::UnknownRoutineTag(_)
            | Self::MissingRoutineParent
            | Self::UnknownAnchor(_)
            | Self::MissingRelativeSibling(_)
            | Self::EmptyRoutine(_) => CompileErrorKind::MalformedDescriptor,
        }
    }
}

/// Per-descriptor compile input.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Name used in diagnostics only.
    pub file_name: String,
    /// External variables, seeded before the descriptor's own `vars`.
    pub variables: Variables,
    /// `;` separated fallback for `parserConfig/defaultCategory`.
    pub default_category: String,
}

impl CompileOptions {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            variables: Variables::new(),
            default_category: String::new(),
        }
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    pub fn with_default_category(mut self, category: impl Into<String>) -> Self {
        self.default_category = category.into();
        self
    }
}

impl From<&CompilerConfig> for CompileOptions {
    fn from(config: &CompilerConfig) -> Self {
        Self {
            file_name: config.file_name.clone(),
            variables: config
                .vars
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            default_category: config.default_category.clone(),
        }
    }
}

/// Compiles raw descriptor bytes.
pub fn compile(data: &[u8], options: &CompileOptions) -> Result<ExtensionRecord, CompileError> {
    match parser::DescriptorParser::new(options).parse(data) {
        Ok(record) => {
            info!(
                "event=descriptor_compile module=compiler status=ok file={} hash={} objects={} layouts={} routines={}",
                log_value(&options.file_name),
                record.hash(),
                record.objects().len(),
                record.layout_count(),
                record.routines().len()
            );
            Ok(record)
        }
        Err(err) => {
            warn!(
                "event=descriptor_compile module=compiler status=error file={} reason={}",
                log_value(&options.file_name),
                log_value(&err.to_string())
            );
            Err(err)
        }
    }
}

/// Compiles descriptor text.
pub fn compile_str(text: &str, options: &CompileOptions) -> Result<ExtensionRecord, CompileError> {
    compile(text.as_bytes(), options)
}

/// Reads and compiles a descriptor file. An empty file name in `options`
/// defaults to `path`.
pub fn compile_file(path: &Path, options: &CompileOptions) -> Result<ExtensionRecord, CompileError> {
    let data = std::fs::read(path).map_err(|source| CompileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if options.file_name.is_empty() {
        let mut options = options.clone();
        options.file_name = path.display().to_string();
        return compile(&data, &options);
    }
    compile(&data, options)
}
