//! Category tree derived from registered objects' category paths.

use crate::model::ObjectInfo;
use indexmap::IndexMap;

/// One catalog node. The root has an empty name; a node carries an object id
/// when some object's category path ends there.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    name: String,
    id: Option<String>,
    children: IndexMap<String, Catalog>,
}

impl Catalog {
    /// Builds the full tree; children keep first-insertion order.
    pub fn build<'a>(objects: impl IntoIterator<Item = &'a ObjectInfo>) -> Self {
        let mut root = Catalog::default();
        for object in objects {
            let mut node = &mut root;
            for segment in &object.categories {
                node = node
                    .children
                    .entry(segment.clone())
                    .or_insert_with(|| Catalog {
                        name: segment.clone(),
                        ..Catalog::default()
                    });
            }
            node.id = Some(object.id.clone());
        }
        root
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn children(&self) -> impl Iterator<Item = &Catalog> + '_ {
        self.children.values()
    }

    pub fn child(&self, name: &str) -> Option<&Catalog> {
        self.children.get(name)
    }

    pub fn index_of_child(&self, name: &str) -> Option<usize> {
        self.children.get_index_of(name)
    }

    /// Node reached by walking `path` from this node.
    pub fn find<S: AsRef<str>>(&self, path: &[S]) -> Option<&Catalog> {
        path.iter()
            .try_fold(self, |node, segment| node.child(segment.as_ref()))
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.id.is_none()
    }
}
