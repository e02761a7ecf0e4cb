//! `actionDomain` persistence of composed layouts.
//!
//! # Invariants
//! - The saved document lists every registered extension hash as applied.
//! - A shared node's children are written at its first occurrence only.
//! - Restore replays build routines only from extensions whose hash is not
//!   listed as applied.

use crate::compiler::xml::{parse_document, write_document, XmlElement, XmlError};
use crate::domain::compose::{
    ComposeError, ComposedLayout, ForestBuilder, LayoutNode, LayoutRef, LayoutTree, NodeId,
};
use crate::domain::registry::ExtensionRegistry;
use crate::logging::log_value;
use crate::model::LayoutKind;
use log::{debug, info, warn};
use std::collections::HashSet;
use thiserror::Error;

pub const DOMAIN_ROOT_TAG: &str = "actionDomain";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RestoreError {
    #[error(transparent)]
    Xml(#[from] XmlError),
    #[error("unknown root element tag `{0}`")]
    UnknownRootTag(String),
    #[error(transparent)]
    Compose(#[from] ComposeError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveError {
    #[error(transparent)]
    Xml(#[from] XmlError),
    #[error("composed layouts are unavailable: {0}")]
    Unavailable(ComposeError),
}

/// Writes `layout` together with the hashes of every registered extension.
pub fn save(registry: &ExtensionRegistry, layout: &ComposedLayout) -> Result<Vec<u8>, XmlError> {
    let mut extensions = XmlElement::new("extensions");
    for record in registry.extensions() {
        extensions
            .children
            .push(XmlElement::new("extension").with_attr("hash", record.hash()));
    }

    let mut written = HashSet::new();
    let mut layouts = XmlElement::new("layouts");
    for root in layout.root_refs() {
        layouts
            .children
            .push(node_element(layout, root, &mut written));
    }

    let root = XmlElement::new(DOMAIN_ROOT_TAG)
        .with_child(extensions)
        .with_child(layouts);
    write_document(&root)
}

fn node_element(
    layout: &ComposedLayout,
    reference: LayoutRef,
    written: &mut HashSet<NodeId>,
) -> XmlElement {
    let mut element = XmlElement::new(reference.kind.tag());
    let entry = layout.node(reference.node);
    if let Some(id) = entry.and_then(LayoutNode::id) {
        element = element.with_attr("id", id);
    }
    if reference.kind == LayoutKind::ExpandedMenu {
        element = element.with_attr("flat", "true");
    }
    let Some(entry) = entry else {
        return element;
    };
    if layout.is_canonical(reference.node) && !written.insert(reference.node) {
        return element;
    }
    for &child in entry.children() {
        element.children.push(node_element(layout, child, written));
    }
    element
}

fn element_tree(element: &XmlElement) -> Option<LayoutTree> {
    let kind = match element.name.as_str() {
        "separator" => return Some(LayoutTree::separator()),
        "stretch" => return Some(LayoutTree::stretch()),
        "action" => LayoutKind::Action,
        "group" => LayoutKind::Group,
        "menu" if element.attr("flat") == "true" => LayoutKind::ExpandedMenu,
        "menu" => LayoutKind::Menu,
        other => {
            debug!(
                "event=layout_restore module=codec status=skipped reason=unknown_tag tag={}",
                log_value(other)
            );
            return None;
        }
    };
    let id = element.attr("id");
    if id.is_empty() {
        return None;
    }
    Some(
        LayoutTree::new(kind, id)
            .with_children(element.children.iter().filter_map(element_tree).collect()),
    )
}

/// Rebuilds a composed forest from saved data and replays routines of
/// extensions registered after the save.
pub(crate) fn restore(
    data: &[u8],
    registry: &ExtensionRegistry,
) -> Result<ComposedLayout, RestoreError> {
    let root = parse_document(data)?;
    if root.name != DOMAIN_ROOT_TAG {
        warn!(
            "event=layout_restore module=codec status=error reason=unknown_root tag={}",
            log_value(&root.name)
        );
        return Err(RestoreError::UnknownRootTag(root.name));
    }

    let mut applied: HashSet<&str> = HashSet::new();
    let mut trees = Vec::new();
    for section in &root.children {
        match section.name.as_str() {
            "extensions" => applied.extend(
                section
                    .children
                    .iter()
                    .map(|extension| extension.attr("hash"))
                    .filter(|hash| !hash.is_empty()),
            ),
            "layouts" => trees.extend(section.children.iter().filter_map(element_tree)),
            _ => {}
        }
    }

    let mut builder = ForestBuilder::new(registry);
    for tree in &trees {
        builder.add_root(tree)?;
    }
    let fresh: Vec<_> = registry
        .extensions()
        .filter(|record| !applied.contains(record.hash()))
        .collect();
    builder.apply_routines(fresh.iter().map(|record| record.as_ref()));
    let layout = builder.finish()?;

    info!(
        "event=layout_restore module=codec status=ok roots={} replayed={}",
        layout.roots().len(),
        fresh.len()
    );
    Ok(layout)
}
