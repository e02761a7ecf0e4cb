//! Composed layout forest and the rules that build it.
//!
//! # Responsibility
//! - Collect the first standalone nodes of every registered layout as roots.
//! - Splice build routine items into their parents by anchor.
//! - Materialize consumer-edited or restored trees into the same arena.
//!
//! # Invariants
//! - Arena slots `SEPARATOR_NODE` and `STRETCH_NODE` are the only spacer
//!   nodes; every spacer reference points at them.
//! - A standalone object has exactly one canonical node, shared by every
//!   reference. Plain objects get one node per occurrence.
//! - Every reference carries its own `LayoutKind`, so one shared menu may be
//!   expanded at one site and a submenu at another.
//! - References to unknown ids are pruned with their subtree.
//! - Roots are ordered so nested standalone nodes precede their containers.

use crate::domain::registry::ExtensionRegistry;
use crate::domain::sorter::dependency_order;
use crate::logging::log_value;
use crate::model::{
    Anchor, BuildRoutine, ExtensionRecord, LayoutKind, LayoutView, ObjectInfo, ObjectType,
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

/// Index of a node in a `ComposedLayout` arena.
pub type NodeId = usize;

pub const SEPARATOR_NODE: NodeId = 0;
pub const STRETCH_NODE: NodeId = 1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    #[error("recursive chain among standalone layouts: {}", .ids.join(", "))]
    CycleInStandaloneGraph { ids: Vec<String> },
    #[error("duplicated layout root id `{0}`")]
    DuplicateRoot(String),
}

/// One reference to an arena node, with the kind used at that site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutRef {
    pub node: NodeId,
    pub kind: LayoutKind,
}

impl LayoutRef {
    fn separator() -> Self {
        Self {
            node: SEPARATOR_NODE,
            kind: LayoutKind::Separator,
        }
    }

    fn stretch() -> Self {
        Self {
            node: STRETCH_NODE,
            kind: LayoutKind::Stretch,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutNode {
    kind: LayoutKind,
    id: Option<String>,
    children: Vec<LayoutRef>,
}

impl LayoutNode {
    /// Kind at the reference that created the node.
    pub fn kind(&self) -> LayoutKind {
        self.kind
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn children(&self) -> &[LayoutRef] {
        &self.children
    }

    pub fn child_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.iter().map(|child| child.node)
    }
}

/// Owned nested layout value, used to hand consumer edits back to the
/// domain and to compare forests structurally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutTree {
    pub kind: LayoutKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<LayoutTree>,
}

impl LayoutTree {
    pub fn new(kind: LayoutKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: Some(id.into()),
            children: Vec::new(),
        }
    }

    pub fn separator() -> Self {
        Self::spacer(LayoutKind::Separator)
    }

    pub fn stretch() -> Self {
        Self::spacer(LayoutKind::Stretch)
    }

    fn spacer(kind: LayoutKind) -> Self {
        Self {
            kind,
            id: None,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<LayoutTree>) -> Self {
        self.children = children;
        self
    }

    /// Ids of the direct children, spacers included as `None`.
    pub fn child_ids(&self) -> Vec<Option<&str>> {
        self.children.iter().map(|child| child.id.as_deref()).collect()
    }
}

/// Arena forest produced by composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedLayout {
    nodes: Vec<LayoutNode>,
    roots: Vec<NodeId>,
    /// Kind of each root at its top-level reference.
    root_kinds: HashMap<NodeId, LayoutKind>,
    canonical: HashMap<String, NodeId>,
    occurrences: HashMap<String, Vec<NodeId>>,
}

impl Default for ComposedLayout {
    fn default() -> Self {
        Self::empty()
    }
}

impl ComposedLayout {
    /// Forest with only the reserved spacer slots.
    pub fn empty() -> Self {
        let spacer = |kind| LayoutNode {
            kind,
            id: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![spacer(LayoutKind::Separator), spacer(LayoutKind::Stretch)],
            roots: Vec::new(),
            root_kinds: HashMap::new(),
            canonical: HashMap::new(),
            occurrences: HashMap::new(),
        }
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Roots as references, each with its top-level kind.
    pub fn root_refs(&self) -> Vec<LayoutRef> {
        self.roots
            .iter()
            .filter_map(|&root| self.reference(root))
            .collect()
    }

    pub fn root_ids(&self) -> Vec<&str> {
        self.roots
            .iter()
            .filter_map(|&root| self.nodes.get(root).and_then(LayoutNode::id))
            .collect()
    }

    pub fn node(&self, node: NodeId) -> Option<&LayoutNode> {
        self.nodes.get(node)
    }

    /// Canonical node of a standalone object, else its first occurrence.
    pub fn find(&self, object_id: &str) -> Option<NodeId> {
        self.canonical
            .get(object_id)
            .copied()
            .or_else(|| self.occurrences(object_id).first().copied())
    }

    /// Every node carrying `object_id`.
    pub fn occurrences(&self, object_id: &str) -> &[NodeId] {
        self.occurrences
            .get(object_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether `node` is the shared node of a standalone object.
    pub fn is_canonical(&self, node: NodeId) -> bool {
        self.nodes
            .get(node)
            .and_then(LayoutNode::id)
            .and_then(|id| self.canonical.get(id))
            == Some(&node)
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn to_trees(&self) -> Vec<LayoutTree> {
        self.root_refs()
            .into_iter()
            .filter_map(|root| self.reference_tree(root))
            .collect()
    }

    /// Nested copy of `node`, using its root kind when it is a root.
    /// Shared nodes are expanded at each reference.
    pub fn tree(&self, node: NodeId) -> Option<LayoutTree> {
        self.reference_tree(self.reference(node)?)
    }

    /// Nested copy of the subtree behind one reference.
    pub fn reference_tree(&self, reference: LayoutRef) -> Option<LayoutTree> {
        let entry = self.nodes.get(reference.node)?;
        Some(LayoutTree {
            kind: reference.kind,
            id: entry.id.clone(),
            children: entry
                .children
                .iter()
                .filter_map(|&child| self.reference_tree(child))
                .collect(),
        })
    }

    fn reference(&self, node: NodeId) -> Option<LayoutRef> {
        let entry = self.nodes.get(node)?;
        let kind = self.root_kinds.get(&node).copied().unwrap_or(entry.kind);
        Some(LayoutRef { node, kind })
    }
}

/// Read access shared by compiled record views and owned trees.
trait LayoutSource: Sized {
    fn kind(&self) -> LayoutKind;
    fn id(&self) -> Option<&str>;
    fn child_sources(&self) -> Vec<Self>;
}

impl LayoutSource for LayoutView<'_> {
    fn kind(&self) -> LayoutKind {
        LayoutView::kind(self)
    }

    fn id(&self) -> Option<&str> {
        LayoutView::id(self)
    }

    fn child_sources(&self) -> Vec<Self> {
        self.children().collect()
    }
}

impl LayoutSource for &LayoutTree {
    fn kind(&self) -> LayoutKind {
        self.kind
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn child_sources(&self) -> Vec<Self> {
        let tree = *self;
        tree.children.iter().collect()
    }
}

fn kind_matches(kind: LayoutKind, object_type: ObjectType) -> bool {
    matches!(
        (kind, object_type),
        (LayoutKind::Action, ObjectType::Action)
            | (LayoutKind::Group, ObjectType::Group)
            | (LayoutKind::Menu | LayoutKind::ExpandedMenu, ObjectType::Menu)
    )
}

/// Incremental arena construction against the registry's object table.
pub(crate) struct ForestBuilder<'r> {
    registry: &'r ExtensionRegistry,
    layout: ComposedLayout,
}

impl<'r> ForestBuilder<'r> {
    pub(crate) fn new(registry: &'r ExtensionRegistry) -> Self {
        Self {
            registry,
            layout: ComposedLayout::empty(),
        }
    }

    fn push_node(&mut self, kind: LayoutKind, object: &ObjectInfo) -> NodeId {
        let node = self.layout.nodes.len();
        self.layout.nodes.push(LayoutNode {
            kind,
            id: Some(object.id.clone()),
            children: Vec::new(),
        });
        if object.is_standalone() {
            self.layout.canonical.insert(object.id.clone(), node);
        }
        self.layout
            .occurrences
            .entry(object.id.clone())
            .or_default()
            .push(node);
        node
    }

    fn materialize<S: LayoutSource>(&mut self, source: S) -> Option<LayoutRef> {
        let kind = source.kind();
        match kind {
            LayoutKind::Separator => return Some(LayoutRef::separator()),
            LayoutKind::Stretch => return Some(LayoutRef::stretch()),
            _ => {}
        }

        let id = source.id()?;
        let registry = self.registry;
        let Some(object) = registry.object(id) else {
            debug!(
                "event=layout_prune module=compose status=skipped reason=unknown_id id={}",
                log_value(id)
            );
            return None;
        };
        if !kind_matches(kind, object.object_type()) {
            debug!(
                "event=layout_prune module=compose status=skipped reason=type_mismatch id={} kind={:?}",
                log_value(id),
                kind
            );
            return None;
        }

        if object.is_standalone() {
            if let Some(&node) = self.layout.canonical.get(id) {
                if self.layout.nodes[node].children.is_empty() {
                    let children = self.materialize_children(&source);
                    self.layout.nodes[node].children = children;
                }
                return Some(LayoutRef { node, kind });
            }
        }

        let node = self.push_node(kind, object);
        let children = self.materialize_children(&source);
        self.layout.nodes[node].children = children;
        Some(LayoutRef { node, kind })
    }

    fn materialize_children<S: LayoutSource>(&mut self, source: &S) -> Vec<LayoutRef> {
        source
            .child_sources()
            .into_iter()
            .filter_map(|child| self.materialize(child))
            .collect()
    }

    /// Adds every first standalone node of `layout` as a root. Roots that
    /// are already present are merged into the existing node.
    pub(crate) fn add_declared_layout(&mut self, layout: LayoutView<'_>) {
        let mut queue = VecDeque::from([layout]);
        let mut standalone = Vec::new();
        while let Some(view) = queue.pop_front() {
            let Some(object) = view.id().and_then(|id| self.registry.object(id)) else {
                continue;
            };
            if object.is_standalone() {
                standalone.push(view);
                continue;
            }
            queue.extend(view.children());
        }

        for view in standalone {
            let Some(root) = self.materialize(view) else {
                continue;
            };
            if self.layout.roots.contains(&root.node) {
                debug!(
                    "event=layout_root_merge module=compose status=skipped id={}",
                    log_value(view.id().unwrap_or_default())
                );
                continue;
            }
            self.push_root(root);
        }
    }

    fn push_root(&mut self, root: LayoutRef) {
        self.layout.roots.push(root.node);
        self.layout.root_kinds.insert(root.node, root.kind);
    }

    /// Adds one consumer-supplied root. Unknown and non-standalone roots
    /// are dropped.
    pub(crate) fn add_root(&mut self, tree: &LayoutTree) -> Result<(), ComposeError> {
        let id = tree.id.as_deref().unwrap_or_default();
        let standalone = self
            .registry
            .object(id)
            .is_some_and(ObjectInfo::is_standalone);
        if !standalone {
            debug!(
                "event=layout_root_drop module=compose status=skipped id={}",
                log_value(id)
            );
            return Ok(());
        }
        let Some(root) = self.materialize(tree) else {
            return Ok(());
        };
        if self.layout.roots.contains(&root.node) {
            return Err(ComposeError::DuplicateRoot(id.to_string()));
        }
        self.push_root(root);
        Ok(())
    }

    pub(crate) fn apply_routines<'a>(
        &mut self,
        records: impl IntoIterator<Item = &'a ExtensionRecord>,
    ) {
        for record in records {
            for routine in record.routines() {
                self.apply_routine(record, routine);
            }
        }
    }

    fn apply_routine(&mut self, record: &ExtensionRecord, routine: &BuildRoutine) {
        let registry = self.registry;
        let Some(parent) = registry.object(&routine.parent) else {
            debug!(
                "event=routine_apply module=compose status=skipped reason=unknown_parent parent={}",
                log_value(&routine.parent)
            );
            return;
        };
        if parent.object_type() == ObjectType::Action {
            debug!(
                "event=routine_apply module=compose status=skipped reason=action_parent parent={}",
                log_value(&routine.parent)
            );
            return;
        }

        let targets: Vec<NodeId> = if parent.is_standalone() {
            self.layout
                .canonical
                .get(&parent.id)
                .copied()
                .into_iter()
                .collect()
        } else {
            self.layout.occurrences(&parent.id).to_vec()
        };

        for target in targets {
            let Some(position) = self.anchor_position(target, routine) else {
                debug!(
                    "event=routine_apply module=compose status=skipped reason=missing_anchor parent={} relative_to={}",
                    log_value(&routine.parent),
                    log_value(routine.relative_to.as_deref().unwrap_or_default())
                );
                continue;
            };
            let items: Vec<LayoutRef> = record
                .routine_items(routine)
                .filter_map(|item| self.materialize(item))
                .collect();
            self.layout.nodes[target]
                .children
                .splice(position..position, items);
        }
    }

    fn anchor_position(&self, target: NodeId, routine: &BuildRoutine) -> Option<usize> {
        let children = &self.layout.nodes[target].children;
        let sibling = || {
            let relative_to = routine.relative_to.as_deref()?;
            children
                .iter()
                .position(|child| self.layout.nodes[child.node].id() == Some(relative_to))
        };
        match routine.anchor {
            Anchor::First => Some(0),
            Anchor::Last => Some(children.len()),
            Anchor::Before => sibling(),
            Anchor::After => sibling().map(|index| index + 1),
        }
    }

    /// Orders roots by dependency, failing on a standalone cycle.
    pub(crate) fn finish(mut self) -> Result<ComposedLayout, ComposeError> {
        self.layout.roots = dependency_order(&self.layout)?;
        Ok(self.layout)
    }
}

/// Composes every registered layout and routine.
pub(crate) fn compose(registry: &ExtensionRegistry) -> Result<ComposedLayout, ComposeError> {
    let mut builder = ForestBuilder::new(registry);
    for record in registry.extensions() {
        for layout in record.layouts() {
            builder.add_declared_layout(layout);
        }
    }
    builder.apply_routines(registry.extensions().map(|record| record.as_ref()));
    builder.finish()
}

/// Materializes consumer-edited trees against the registry.
pub(crate) fn compose_trees(
    registry: &ExtensionRegistry,
    trees: &[LayoutTree],
) -> Result<ComposedLayout, ComposeError> {
    let mut builder = ForestBuilder::new(registry);
    for tree in trees {
        builder.add_root(tree)?;
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::{compose, ComposeError, LayoutRef, LayoutTree, SEPARATOR_NODE};
    use crate::compiler::{compile_str, CompileOptions};
    use crate::domain::registry::ExtensionRegistry;
    use crate::model::LayoutKind;
    use std::sync::Arc;

    fn registry(descriptors: &[&str]) -> ExtensionRegistry {
        let mut registry = ExtensionRegistry::new();
        for text in descriptors {
            let record = compile_str(text, &CompileOptions::new("test.xml")).expect("descriptor");
            registry.add(Arc::new(record)).expect("registration");
        }
        registry
    }

    #[test]
    fn plain_chain_folds_into_first_standalone() {
        let registry = registry(&[r#"<actionExtension>
            <objects><group id="outer" mode="plain"/></objects>
            <layouts>
                <group id="outer"><menu id="file"><action id="open"/><separator/></menu></group>
            </layouts>
        </actionExtension>"#]);

        let layout = compose(&registry).expect("composition");
        assert_eq!(layout.root_ids(), vec!["file"]);
        let file = layout.node(layout.roots()[0]).expect("root node");
        assert_eq!(file.children()[1].node, SEPARATOR_NODE);
    }

    #[test]
    fn shared_menu_keeps_the_kind_of_each_reference() {
        let registry = registry(&[r#"<actionExtension>
            <objects><toolBar id="tb"/></objects>
            <layouts>
                <menuBar id="main"><menu id="file"><action id="open"/></menu></menuBar>
                <toolBar id="tb"><menu id="file" flat="true"/></toolBar>
            </layouts>
        </actionExtension>"#]);

        let layout = compose(&registry).expect("composition");
        let file = layout.find("file").expect("file node");
        let main = layout.node(layout.find("main").expect("main")).expect("main node");
        let tb = layout.node(layout.find("tb").expect("tb")).expect("tb node");
        let reference = |kind| LayoutRef { node: file, kind };
        assert_eq!(main.children()[0], reference(LayoutKind::Menu));
        assert_eq!(tb.children()[0], reference(LayoutKind::ExpandedMenu));
        assert!(layout.tree(usize::MAX).is_none());
    }

    #[test]
    fn plain_parent_receives_routine_at_every_occurrence() {
        let registry = registry(&[
            r#"<actionExtension>
                <objects><group id="recent" mode="plain"/></objects>
                <layouts>
                    <menu id="file"><group id="recent"><action id="one"/></group></menu>
                    <menu id="edit"><group id="recent"/></menu>
                </layouts>
            </actionExtension>"#,
            r#"<actionExtension><buildRoutines>
                <buildRoutine parent="recent" anchor="first"><action id="clear"/></buildRoutine>
            </buildRoutines></actionExtension>"#,
        ]);

        let layout = compose(&registry).expect("composition");
        let trees = layout.to_trees();
        assert_eq!(trees[0].children[0].child_ids(), vec![Some("clear"), Some("one")]);
        assert_eq!(trees[1].children[0].child_ids(), vec![Some("clear"), Some("one")]);
        assert_eq!(layout.occurrences("recent").len(), 2);
    }

    #[test]
    fn self_nesting_standalone_is_a_cycle() {
        let registry = registry(&[
            r#"<actionExtension><layouts><menu id="file"><action id="open"/></menu></layouts></actionExtension>"#,
        ]);

        let err = super::compose_trees(
            &registry,
            &[LayoutTree::new(LayoutKind::Menu, "file")
                .with_children(vec![LayoutTree::new(LayoutKind::Menu, "file")])],
        )
        .expect_err("self reference");
        assert!(matches!(err, ComposeError::CycleInStandaloneGraph { ids } if ids == vec!["file"]));
    }

    #[test]
    fn duplicate_consumer_root_is_rejected() {
        let registry = registry(&[
            r#"<actionExtension><layouts><menu id="file"><action id="open"/></menu></layouts></actionExtension>"#,
        ]);
        let file = LayoutTree::new(LayoutKind::Menu, "file");
        let err = super::compose_trees(&registry, &[file.clone(), file]).expect_err("duplicate");
        assert_eq!(err, ComposeError::DuplicateRoot("file".to_string()));
    }
}
