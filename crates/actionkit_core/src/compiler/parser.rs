//! `actionExtension` document parser.

use crate::compiler::expr::{expand, Variables};
use crate::compiler::text::{fix_categories, id_to_text, is_digits, parse_string_list, simplify_text};
use crate::compiler::xml::{parse_document, XmlElement};
use crate::compiler::{CompileError, CompileOptions, DESCRIPTOR_ROOT_TAG};
use crate::model::{
    Anchor, BuildRoutine, ExtensionRecord, LayoutEntry, LayoutKind, ObjectInfo, ObjectKind,
    ObjectType,
};
use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

const OBJECT_CONTEXT: &str = "object";
const LAYOUT_CONTEXT: &str = "layout";
const ROUTINE_CONTEXT: &str = "routine";

/// Single-use parser state for one descriptor.
pub(crate) struct DescriptorParser {
    variables: Variables,
    default_category: Vec<String>,
    /// Objects in declaration order.
    objects: IndexMap<String, ObjectInfo>,
    /// id -> tag of the element that declared it.
    tags: HashMap<String, String>,
    /// id -> (sequence key -> entry index), both in first-seen order.
    sequences: HashMap<String, IndexMap<String, usize>>,
    entries: Vec<LayoutEntry>,
    separator: Option<usize>,
    stretch: Option<usize>,
}

impl DescriptorParser {
    pub(crate) fn new(options: &CompileOptions) -> Self {
        let variables = options.variables.clone();
        let default_category = category_path(&expand(&options.default_category, &variables));
        Self {
            variables,
            default_category,
            objects: IndexMap::new(),
            tags: HashMap::new(),
            sequences: HashMap::new(),
            entries: Vec::new(),
            separator: None,
            stretch: None,
        }
    }

    pub(crate) fn parse(mut self, data: &[u8]) -> Result<ExtensionRecord, CompileError> {
        let root = parse_document(data)?;
        if root.name != DESCRIPTOR_ROOT_TAG {
            return Err(CompileError::UnknownRootTag(root.name));
        }

        let mut object_elements = Vec::new();
        let mut layout_elements = Vec::new();
        let mut routine_elements = Vec::new();
        let mut version: Option<String> = None;
        let mut has_parser_config = false;

        for item in &root.children {
            match item.name.as_str() {
                "objects" => object_elements.extend(item.children.iter()),
                "layouts" => layout_elements.extend(item.children.iter()),
                "buildRoutines" => routine_elements.extend(item.children.iter()),
                "version" => {
                    if let Some(previous) = version {
                        return Err(CompileError::DuplicateVersion {
                            previous,
                            current: item.text.clone(),
                        });
                    }
                    version = Some(item.text.clone());
                }
                "parserConfig" => {
                    if has_parser_config {
                        return Err(CompileError::DuplicateParserConfig);
                    }
                    self.parse_parser_config(item);
                    has_parser_config = true;
                }
                _ => {}
            }
        }

        for item in object_elements {
            let object = self.parse_object(item)?;
            if self.objects.contains_key(&object.id) {
                return Err(CompileError::DuplicateObjectId(object.id));
            }
            self.tags.insert(object.id.clone(), item.name.clone());
            self.objects.insert(object.id.clone(), object);
        }

        let mut layout_roots = Vec::with_capacity(layout_elements.len());
        for item in layout_elements {
            let categories = self.default_category.clone();
            let mut path = Vec::new();
            layout_roots.push(self.parse_layout(item, &categories, &mut path)?);
        }

        let mut routines = Vec::with_capacity(routine_elements.len());
        for item in routine_elements {
            routines.push(self.parse_routine(item)?);
        }

        for object in self.objects.values_mut() {
            if object.categories.is_empty() {
                object.categories = self.default_category.clone();
                object.categories.push(simplify_text(&object.text));
            }
        }

        Ok(ExtensionRecord::new(
            hex::encode(Sha256::digest(data)),
            version.unwrap_or_default(),
            self.objects.into_values().collect(),
            self.entries,
            layout_roots,
            routines,
        ))
    }

    fn resolve(&self, value: &str) -> String {
        expand(value, &self.variables)
    }

    fn parse_parser_config(&mut self, element: &XmlElement) {
        for item in &element.children {
            match item.name.as_str() {
                "defaultCategory" => {
                    self.default_category = category_path(&self.resolve(&item.text));
                }
                "vars" => {
                    for var in &item.children {
                        let key = self.resolve(var.attr("key"));
                        let value = self.resolve(var.attr("value"));
                        if !key.is_empty() {
                            self.variables.insert(key, value);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn determine_kind(
        &self,
        element: &XmlElement,
        context: &'static str,
    ) -> Result<ObjectKind, CompileError> {
        let mode = self.resolve(element.attr("mode"));
        let kind = match element.name.as_str() {
            "action" if mode == "widget" => ObjectKind::WidgetAction,
            "action" => ObjectKind::Action,
            "widget" => ObjectKind::WidgetAction,
            "group" if mode == "plain" => ObjectKind::PlainGroup,
            "group" => ObjectKind::UniqueGroup,
            "menuBar" | "toolBar" => ObjectKind::TopLevelMenu,
            "menu" if mode == "plain" => ObjectKind::PlainMenu,
            "menu" if mode == "top" => ObjectKind::TopLevelMenu,
            "menu" => ObjectKind::UniqueMenu,
            other => {
                return Err(CompileError::UnknownObjectTag {
                    context,
                    tag: other.to_string(),
                })
            }
        };
        Ok(kind)
    }

    fn required_id(
        &self,
        element: &XmlElement,
        context: &'static str,
    ) -> Result<String, CompileError> {
        let id = self.resolve(element.attr("id"));
        if id.is_empty() {
            return Err(CompileError::MissingId {
                context,
                tag: element.name.clone(),
            });
        }
        Ok(id)
    }

    fn parse_object(&self, element: &XmlElement) -> Result<ObjectInfo, CompileError> {
        let id = self.required_id(element, OBJECT_CONTEXT)?;
        let kind = self.determine_kind(element, OBJECT_CONTEXT)?;

        let text = match self.resolve(element.attr("text")) {
            text if text.is_empty() => id_to_text(&id),
            text => text,
        };
        let command_class = self.resolve(element.attr("class"));

        let shortcuts = self.first_non_empty(element, &["shortcuts", "shortcut"]);
        let shortcuts = if shortcuts.is_empty() {
            Vec::new()
        } else {
            parse_string_list(&shortcuts)
        };

        let categories = self.first_non_empty(element, &["categories", "category"]);
        let categories = if categories.is_empty() {
            Vec::new()
        } else {
            fix_categories(parse_string_list(&categories), &text)
        };

        if !element.children.is_empty() {
            return Err(CompileError::UnexpectedChildren {
                context: OBJECT_CONTEXT,
                name: element.name.clone(),
            });
        }

        Ok(ObjectInfo {
            id,
            kind,
            text,
            command_class,
            shortcuts,
            categories,
        })
    }

    fn first_non_empty(&self, element: &XmlElement, keys: &[&str]) -> String {
        keys.iter()
            .map(|key| self.resolve(element.attr(key)))
            .find(|value| !value.is_empty())
            .unwrap_or_default()
    }

    /// Returns the id, kind, and category path of the object named by a
    /// layout or routine element, declaring it on first sight.
    fn find_or_insert_object(
        &mut self,
        element: &XmlElement,
        inherited: &[String],
        context: &'static str,
    ) -> Result<(String, ObjectKind, Vec<String>), CompileError> {
        let id = self.required_id(element, context)?;
        let explicit_category = self.resolve(element.attr("_cat"));
        let default_path = |text: &str| {
            let mut path = inherited.to_vec();
            path.push(if explicit_category.is_empty() {
                simplify_text(text)
            } else {
                explicit_category.clone()
            });
            path
        };

        if let Some(declared) = self.tags.get(&id) {
            if *declared != element.name {
                return Err(CompileError::InconsistentTag {
                    context,
                    id,
                    tag: element.name.clone(),
                    declared: declared.clone(),
                });
            }
        }
        if let Some(object) = self.objects.get_mut(&id) {
            if object.categories.is_empty() {
                object.categories = default_path(&object.text);
            }
            return Ok((id, object.kind, object.categories.clone()));
        }

        let kind = self.determine_kind(element, context)?;
        let text = id_to_text(&id);
        let categories = default_path(&text);
        self.tags.insert(id.clone(), element.name.clone());
        self.objects.insert(
            id.clone(),
            ObjectInfo {
                id: id.clone(),
                kind,
                text,
                command_class: String::new(),
                shortcuts: Vec::new(),
                categories: categories.clone(),
            },
        );
        Ok((id, kind, categories))
    }

    fn spacer_entry(&mut self, kind: LayoutKind) -> usize {
        let slot = match kind {
            LayoutKind::Separator => &mut self.separator,
            _ => &mut self.stretch,
        };
        if let Some(index) = *slot {
            return index;
        }
        let index = self.entries.len();
        self.entries.push(LayoutEntry::spacer(kind));
        *slot = Some(index);
        index
    }

    fn container_kind(&self, kind: ObjectKind, element: &XmlElement) -> LayoutKind {
        match kind.object_type() {
            ObjectType::Action => LayoutKind::Action,
            ObjectType::Group => LayoutKind::Group,
            ObjectType::Menu if self.resolve(element.attr("flat")) == "true" => {
                LayoutKind::ExpandedMenu
            }
            ObjectType::Menu => LayoutKind::Menu,
        }
    }

    fn parse_layout(
        &mut self,
        element: &XmlElement,
        categories: &[String],
        path: &mut Vec<String>,
    ) -> Result<usize, CompileError> {
        if let Some(kind) = spacer_kind(&element.name) {
            ensure_no_children(element, LAYOUT_CONTEXT)?;
            return Ok(self.spacer_entry(kind));
        }

        let (id, kind, object_categories) =
            self.find_or_insert_object(element, categories, LAYOUT_CONTEXT)?;
        if path.contains(&id) {
            let mut chain = path.clone();
            chain.push(id);
            return Err(CompileError::RecursiveLayoutChain { chain });
        }

        let layout_kind = self.container_kind(kind, element);
        let entry_index = self.entries.len();
        if layout_kind == LayoutKind::Action {
            if !element.children.is_empty() {
                return Err(CompileError::UnexpectedChildren {
                    context: LAYOUT_CONTEXT,
                    name: id,
                });
            }
            self.entries.push(LayoutEntry::object(layout_kind, id));
            return Ok(entry_index);
        }

        let sequence = self.sequence_key(&id, element);
        let sequences = self.sequences.entry(id.clone()).or_default();
        if let Some(&existing) = sequences.get(&sequence) {
            let mut entry = self.entries[existing].clone();
            entry.kind = layout_kind;
            self.entries.push(entry);
            return Ok(entry_index);
        }
        if !sequences.is_empty() && kind.is_standalone() {
            if !element.children.is_empty() {
                return Err(CompileError::ConflictingStructure(id));
            }
            self.entries.push(LayoutEntry::object(layout_kind, id));
            return Ok(entry_index);
        }
        sequences.insert(sequence, entry_index);
        self.entries
            .push(LayoutEntry::object(layout_kind, id.clone()));

        if element.children.is_empty() {
            return Ok(entry_index);
        }

        path.push(id);
        let mut children = Vec::with_capacity(element.children.len());
        for child in &element.children {
            children.push(self.parse_layout(child, &object_categories, path)?);
        }
        path.pop();

        self.entries[entry_index].children = children;
        Ok(entry_index)
    }

    /// Sequence key of one menu/group declaration.
    ///
    /// A childless reference without `_seq` reuses the first sequence. A
    /// numeric `_seq` that is not yet known becomes the next positional key.
    fn sequence_key(&self, id: &str, element: &XmlElement) -> String {
        let known = self.sequences.get(id);
        let positional = known.map_or(0, IndexMap::len).to_string();
        match element.attr_opt("_seq") {
            None => match known.and_then(|seqs| seqs.keys().next()) {
                Some(first) if element.children.is_empty() => first.clone(),
                _ => positional,
            },
            Some(raw) => {
                let specified = self.resolve(raw);
                let is_known = known.is_some_and(|seqs| seqs.contains_key(&specified));
                if !is_known && is_digits(&specified) {
                    positional
                } else {
                    specified
                }
            }
        }
    }

    fn parse_routine(&mut self, element: &XmlElement) -> Result<BuildRoutine, CompileError> {
        if element.name != "buildRoutine" {
            return Err(CompileError::UnknownRoutineTag(element.name.clone()));
        }

        let parent = self.resolve(element.attr("parent"));
        if parent.is_empty() {
            return Err(CompileError::MissingRoutineParent);
        }

        let anchor_token = self.resolve(element.attr("anchor"));
        let anchor = Anchor::parse(&anchor_token)
            .ok_or_else(|| CompileError::UnknownAnchor(anchor_token.clone()))?;
        let relative_to = self.resolve(element.attr("relativeTo"));
        if anchor.needs_relative() && relative_to.is_empty() {
            let token = if anchor_token.is_empty() {
                "after".to_string()
            } else {
                anchor_token
            };
            return Err(CompileError::MissingRelativeSibling(token));
        }

        if element.children.is_empty() {
            return Err(CompileError::EmptyRoutine(parent));
        }

        let default_category = self.default_category.clone();
        let mut items = Vec::with_capacity(element.children.len());
        for item in &element.children {
            if let Some(kind) = spacer_kind(&item.name) {
                ensure_no_children(item, ROUTINE_CONTEXT)?;
                items.push(self.spacer_entry(kind));
                continue;
            }

            let (id, kind, _) = self.find_or_insert_object(item, &default_category, ROUTINE_CONTEXT)?;
            if !item.children.is_empty() {
                return Err(CompileError::UnexpectedChildren {
                    context: ROUTINE_CONTEXT,
                    name: item.name.clone(),
                });
            }
            let layout_kind = self.container_kind(kind, item);

            let declared = self.sequences.get(&id).and_then(|seqs| match item.attr_opt("_seq") {
                None => seqs.values().next().copied(),
                Some(raw) => seqs.get(&self.resolve(raw)).copied(),
            });
            let entry = match declared {
                Some(existing) => {
                    let mut entry = self.entries[existing].clone();
                    entry.kind = layout_kind;
                    entry
                }
                None => LayoutEntry::object(layout_kind, id),
            };
            items.push(self.entries.len());
            self.entries.push(entry);
        }

        Ok(BuildRoutine {
            parent,
            anchor,
            relative_to: anchor.needs_relative().then_some(relative_to),
            items,
        })
    }
}

fn category_path(value: &str) -> Vec<String> {
    parse_string_list(value)
        .into_iter()
        .filter(|segment| !segment.is_empty())
        .collect()
}

fn spacer_kind(tag: &str) -> Option<LayoutKind> {
    match tag {
        "separator" => Some(LayoutKind::Separator),
        "stretch" => Some(LayoutKind::Stretch),
        _ => None,
    }
}

fn ensure_no_children(element: &XmlElement, context: &'static str) -> Result<(), CompileError> {
    if element.children.is_empty() {
        Ok(())
    } else {
        Err(CompileError::UnexpectedChildren {
            context,
            name: element.name.clone(),
        })
    }
}
