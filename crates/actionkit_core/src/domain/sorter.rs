//! Dependency order of standalone roots.
//!
//! # Invariants
//! - A standalone node nested (through plain nodes) inside another
//!   standalone node is emitted before it.
//! - Among ready nodes the one earliest in the current root order goes
//!   first, so an order that is already valid is returned unchanged.

use crate::domain::compose::{ComposeError, ComposedLayout, NodeId};
use indexmap::IndexSet;
use log::warn;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

/// Returns the roots of `layout` reordered by dependency.
pub(crate) fn dependency_order(layout: &ComposedLayout) -> Result<Vec<NodeId>, ComposeError> {
    // Positions: roots first, then standalone nodes discovered while walking.
    let mut nodes: IndexSet<NodeId> = layout.roots().iter().copied().collect();
    let mut dependents: Vec<Vec<usize>> = Vec::new();
    let mut in_degree: Vec<usize> = Vec::new();
    let mut edges: HashSet<(usize, usize)> = HashSet::new();

    let mut position = 0;
    while position < nodes.len() {
        let container = nodes[position];
        for nested in nested_standalone(layout, container) {
            let (dependency, _) = nodes.insert_full(nested);
            if edges.insert((dependency, position)) {
                grow(&mut dependents, &mut in_degree, nodes.len());
                dependents[dependency].push(position);
                in_degree[position] += 1;
            }
        }
        position += 1;
    }
    grow(&mut dependents, &mut in_degree, nodes.len());

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(position, _)| Reverse(position))
        .collect();
    let mut sorted = Vec::with_capacity(nodes.len());
    while let Some(Reverse(position)) = ready.pop() {
        sorted.push(position);
        for &dependent in &dependents[position] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }

    if sorted.len() < nodes.len() {
        let sorted: HashSet<usize> = sorted.into_iter().collect();
        let ids: Vec<String> = (0..nodes.len())
            .filter(|position| !sorted.contains(position))
            .filter_map(|position| layout.node(nodes[position]).and_then(|node| node.id()))
            .map(str::to_string)
            .collect();
        warn!(
            "event=layout_sort module=sorter status=error reason=cycle nodes={}",
            ids.len()
        );
        return Err(ComposeError::CycleInStandaloneGraph { ids });
    }

    let root_count = layout.roots().len();
    Ok(sorted
        .into_iter()
        .filter(|&position| position < root_count)
        .map(|position| nodes[position])
        .collect())
}

fn grow(dependents: &mut Vec<Vec<usize>>, in_degree: &mut Vec<usize>, len: usize) {
    if dependents.len() < len {
        dependents.resize_with(len, Vec::new);
        in_degree.resize(len, 0);
    }
}

/// Standalone nodes reachable from `container` without crossing another
/// standalone node.
fn nested_standalone(layout: &ComposedLayout, container: NodeId) -> Vec<NodeId> {
    let mut found = Vec::new();
    let mut stack = reversed_children(layout, container);
    while let Some(node) = stack.pop() {
        if layout.is_canonical(node) {
            found.push(node);
            continue;
        }
        stack.extend(reversed_children(layout, node));
    }
    found
}

fn reversed_children(layout: &ComposedLayout, node: NodeId) -> Vec<NodeId> {
    let mut children: Vec<NodeId> = layout
        .node(node)
        .map(|node| node.child_nodes().collect())
        .unwrap_or_default();
    children.reverse();
    children
}
