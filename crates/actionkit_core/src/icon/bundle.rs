//! `iconConfiguration` bundle parser.
//!
//! ```xml
//! <iconConfiguration>
//!   <parserConfig>
//!     <baseDirectory>${root}/icons</baseDirectory>
//!     <vars><var key="root" value="/opt/app"/></vars>
//!   </parserConfig>
//!   <icons theme="dark">
//!     <icon id="open" file=":/open.svg"/>
//!   </icons>
//! </iconConfiguration>
//! ```

use crate::compiler::expr::{expand, Variables};
use crate::compiler::xml::{parse_document, XmlElement, XmlError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const BUNDLE_ROOT_TAG: &str = "iconConfiguration";
/// Prefix marking a file relative to the bundle's base directory.
const BASE_PREFIX: &str = ":/";

/// theme -> icon id -> file.
pub type ThemeMap = BTreeMap<String, BTreeMap<String, PathBuf>>;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("failed to read icon configuration `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Xml(#[from] XmlError),
    #[error("unknown root element tag `{0}`")]
    UnknownRootTag(String),
    #[error("duplicated parser config elements")]
    DuplicateParserConfig,
}

pub fn parse_bundle(path: &Path) -> Result<ThemeMap, BundleError> {
    let data = std::fs::read(path).map_err(|source| BundleError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let bundle_dir = path.parent().unwrap_or_else(|| Path::new(""));
    parse_bundle_data(&data, bundle_dir)
}

/// Parses bundle bytes; `bundle_dir` is the default base directory.
pub fn parse_bundle_data(data: &[u8], bundle_dir: &Path) -> Result<ThemeMap, BundleError> {
    let root = parse_document(data)?;
    if root.name != BUNDLE_ROOT_TAG {
        return Err(BundleError::UnknownRootTag(root.name));
    }

    let mut variables = Variables::new();
    let mut base_dir = bundle_dir.to_path_buf();
    let mut has_parser_config = false;
    for item in root.children.iter().filter(|item| item.name == "parserConfig") {
        if has_parser_config {
            return Err(BundleError::DuplicateParserConfig);
        }
        has_parser_config = true;
        if let Some(dir) = parse_parser_config(item, &mut variables) {
            base_dir = dir;
        }
    }

    let mut themes = ThemeMap::new();
    for icons in root.children.iter().filter(|item| item.name == "icons") {
        let theme_map = themes.entry(icons.attr("theme").to_string()).or_default();
        let mut stack: Vec<&XmlElement> = icons.children.iter().rev().collect();
        while let Some(element) = stack.pop() {
            let id = expand(element.attr("id"), &variables);
            let file = expand(element.attr("file"), &variables);
            if !id.is_empty() && !file.is_empty() {
                theme_map.insert(id, resolve_file(&base_dir, &file));
            }
            stack.extend(element.children.iter().rev());
        }
    }
    Ok(themes)
}

/// Applies `vars` first so `baseDirectory` may reference them.
fn parse_parser_config(element: &XmlElement, variables: &mut Variables) -> Option<PathBuf> {
    for var in element
        .children
        .iter()
        .filter(|item| item.name == "vars")
        .flat_map(|item| item.children.iter())
    {
        let key = expand(var.attr("key"), variables);
        let value = expand(var.attr("value"), variables);
        if !key.is_empty() {
            variables.insert(key, value);
        }
    }
    element
        .children
        .iter()
        .filter(|item| item.name == "baseDirectory")
        .last()
        .map(|item| PathBuf::from(expand(&item.text, variables)))
}

fn resolve_file(base_dir: &Path, file: &str) -> PathBuf {
    match file.strip_prefix(BASE_PREFIX) {
        Some(relative) => base_dir.join(relative),
        None if Path::new(file).is_relative() => base_dir.join(file),
        None => PathBuf::from(file),
    }
}
