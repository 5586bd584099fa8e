//! Document
//!
//! Owns a node arena, the file table that encoded provenance refers to, and
//! the node type registry. Every attribute write that carries position data
//! goes through here so decoded paths always live in this document's table.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use doxi_source::{LexicalPaths, Location, PathProvider, SourceError, SourceMap};

use crate::attributes::{AttrValue, NodeType, TypeRegistry};
use crate::config::Config;
use crate::files::FileTable;
use crate::node::{NAME_ATTRIBUTE, Node};
use crate::provenance::Provenance;
use crate::tree::DomTree;
use crate::{ConfigError, DomError, DomResult, NodeId};

#[derive(Debug)]
pub struct Document {
    tree: DomTree,
    root: NodeId,
    files: FileTable,
    registry: TypeRegistry,
    config: Config,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Document resolving paths against the process working directory
    pub fn with_config(config: Config) -> Self {
        Self::with_paths(config, Arc::new(LexicalPaths::current()))
    }

    pub fn with_paths(config: Config, paths: Arc<dyn PathProvider>) -> Self {
        let registry = TypeRegistry::new();
        let files = FileTable::new(paths, config.base_dir.as_deref());

        let mut tree = DomTree::new();
        let root = tree.insert(Node::new(registry.document()));

        tracing::debug!(base_dir = %files.base_dir().display(), "created document");

        Self {
            tree,
            root,
            files,
            registry,
            config,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    /// Structural edits through the tree keep the indexes in sync
    pub fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.tree
    }

    pub fn files(&self) -> &FileTable {
        &self.files
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn register_type(&mut self, node_type: Arc<NodeType>) -> Result<(), ConfigError> {
        self.registry.register(node_type)
    }

    pub fn node_type(&self, tag_name: &str) -> Option<&Arc<NodeType>> {
        self.registry.get(tag_name)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn base_dir(&self) -> &Path {
        self.files.base_dir()
    }

    /// Move the base directory. File ids stay the same; every table entry
    /// and every decoded provenance path is re-relativized.
    pub fn set_base_dir(&mut self, dir: impl AsRef<Path>) -> DomResult<()> {
        let old = self.files.set_base_dir(dir.as_ref());
        let files = &self.files;

        for node in self.tree.iter_mut() {
            for (_, provenance) in node.entity.provenance_mut() {
                provenance.map_paths(|path| files.rebase(&old, path))?;
            }
        }

        self.config.base_dir = Some(self.files.base_dir().to_path_buf());
        Ok(())
    }

    // ----------------------------------------------------------------------
    // Nodes
    // ----------------------------------------------------------------------

    /// Detached node of the registered type `tag_name`
    pub fn create_node(&mut self, tag_name: &str) -> DomResult<NodeId> {
        let node_type = self
            .registry
            .get(tag_name)
            .cloned()
            .ok_or_else(|| DomError::UnknownType(tag_name.to_string()))?;
        Ok(self.create_node_of(&node_type))
    }

    pub fn create_node_of(&mut self, node_type: &Arc<NodeType>) -> NodeId {
        self.tree.insert(Node::new(node_type))
    }

    pub fn node(&self, id: NodeId) -> DomResult<&Node> {
        self.tree.node(id)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        self.tree.append_child(parent, child)
    }

    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) -> DomResult<NodeId> {
        self.tree.insert_before(parent, child, reference)
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        self.tree.remove_child(parent, child)
    }

    pub fn replace_child(&mut self, parent: NodeId, new_child: NodeId, old_child: NodeId) -> DomResult<NodeId> {
        self.tree.replace_child(parent, new_child, old_child)
    }

    /// Detach `id` from its parent
    pub fn remove(&mut self, id: NodeId) -> DomResult<bool> {
        self.tree.remove(id)
    }

    pub fn clone_node(&mut self, id: NodeId, deep: bool) -> DomResult<NodeId> {
        self.tree.clone_node(id, deep)
    }

    /// Change the tag of a node, refiling it in its parent's tag index
    pub fn set_tag_name(&mut self, id: NodeId, tag_name: &str) -> DomResult<()> {
        self.tree.node_mut(id)?.tag_name = tag_name.to_string();
        self.tree.resync(id)
    }

    // ----------------------------------------------------------------------
    // Attributes
    // ----------------------------------------------------------------------

    pub fn get_attribute(&self, id: NodeId, name: &str) -> DomResult<&AttrValue> {
        Ok(self.tree.node(id)?.get_attribute(name))
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<AttrValue>) -> DomResult<()> {
        self.tree.node_mut(id)?.entity.set_attribute(name, value);
        self.changed(id, name)
    }

    /// Set a value together with where it came from. Decoded paths are
    /// registered in the file table.
    pub fn set_attribute_at(
        &mut self,
        id: NodeId,
        name: &str,
        value: impl Into<AttrValue>,
        provenance: impl Into<Provenance>,
    ) -> DomResult<()> {
        self.tree.node(id)?;
        let provenance = fixup(&mut self.files, provenance.into())?;
        self.tree.node_mut(id)?.entity.set_attribute_at(name, value, provenance)?;
        self.changed(id, name)
    }

    /// `None` removes the attribute
    pub fn set_or_remove_attribute(&mut self, id: NodeId, name: &str, value: Option<AttrValue>) -> DomResult<()> {
        self.tree.node_mut(id)?.entity.set_or_remove_attribute(name, value);
        self.changed(id, name)
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> DomResult<Option<AttrValue>> {
        let removed = self.tree.node_mut(id)?.entity.remove_attribute(name);
        self.changed(id, name)?;
        Ok(removed)
    }

    pub fn rename_attribute(&mut self, id: NodeId, from: &str, to: &str) -> DomResult<bool> {
        let moved = self.tree.node_mut(id)?.entity.rename_attribute(from, to);
        if from == NAME_ATTRIBUTE || to == NAME_ATTRIBUTE {
            self.tree.resync(id)?;
        }
        Ok(moved)
    }

    /// Append elements to a composite attribute
    pub fn append_attribute(
        &mut self,
        id: NodeId,
        name: &str,
        value: impl Into<AttrValue>,
        provenance: Option<Provenance>,
    ) -> DomResult<()> {
        self.tree.node(id)?;
        let provenance = provenance.map(|p| fixup(&mut self.files, p)).transpose()?;
        let node = self.tree.node_mut(id)?;
        node.entity.append_attribute(name, value, provenance, &self.files)?;
        self.changed(id, name)
    }

    fn changed(&mut self, id: NodeId, name: &str) -> DomResult<()> {
        if name == NAME_ATTRIBUTE {
            self.tree.resync(id)?;
        }
        Ok(())
    }

    // ----------------------------------------------------------------------
    // Provenance
    // ----------------------------------------------------------------------

    /// Decoded provenance of an attribute, paths relative to the base
    /// directory. Stored encoded data is left as it is.
    pub fn attribute_provenance(&self, id: NodeId, name: &str) -> DomResult<Option<Provenance>> {
        let node = self.tree.node(id)?;
        let Some(provenance) = node.provenance(name) else {
            return Ok(None);
        };
        let descriptor = node.entity.descriptor(name);
        provenance.materialize(name, &descriptor.form, node.get_attribute(name), &self.files)
    }

    /// Decode stored provenance in place
    pub fn decode_attribute(&mut self, id: NodeId, name: &str) -> DomResult<()> {
        let decoded = self.attribute_provenance(id, name)?;
        self.tree.node_mut(id)?.entity.set_provenance(name, decoded);
        Ok(())
    }

    /// Location of the start of the value
    pub fn attribute_location(&self, id: NodeId, name: &str) -> DomResult<Option<Location>> {
        Ok(match self.attribute_provenance(id, name)? {
            Some(Provenance::Location(location)) => Some(location),
            Some(Provenance::Locations(locations)) => locations.into_iter().next().flatten(),
            Some(Provenance::Sources(sources)) => sources.at(0),
            _ => None,
        })
    }

    /// One location per composite element; a scalar yields one entry
    pub fn attribute_locations(&self, id: NodeId, name: &str) -> DomResult<Vec<Option<Location>>> {
        Ok(match self.attribute_provenance(id, name)? {
            Some(Provenance::Locations(locations)) => locations,
            Some(Provenance::Location(location)) => vec![Some(location)],
            Some(Provenance::Sources(sources)) => vec![sources.at(0)],
            _ => Vec::new(),
        })
    }

    /// Source map of a multiline attribute
    pub fn attribute_sources(&self, id: NodeId, name: &str) -> DomResult<Option<SourceMap>> {
        Ok(match self.attribute_provenance(id, name)? {
            Some(Provenance::Sources(sources)) => Some(sources),
            _ => None,
        })
    }

    /// Wire form of the provenance, using this document's file ids
    pub fn attribute_src(&self, id: NodeId, name: &str) -> DomResult<Option<String>> {
        self.tree
            .node(id)?
            .provenance(name)
            .map(|p| p.to_src(&self.files))
            .transpose()
    }

    /// Replace `length` bytes at `offset` in a multiline value. The source
    /// map follows the edit.
    pub fn replace_attribute_text(
        &mut self,
        id: NodeId,
        name: &str,
        offset: usize,
        length: usize,
        text: &str,
    ) -> DomResult<()> {
        self.edit_text(id, name, offset, length, Some(text))
    }

    pub fn erase_attribute_text(&mut self, id: NodeId, name: &str, offset: usize, length: usize) -> DomResult<()> {
        self.edit_text(id, name, offset, length, None)
    }

    fn edit_text(
        &mut self,
        id: NodeId,
        name: &str,
        offset: usize,
        length: usize,
        replacement: Option<&str>,
    ) -> DomResult<()> {
        let node = self.tree.node(id)?;
        if !node.entity.descriptor(name).is_multiline() {
            return Err(DomError::position(name, "text edits need a multiline attribute"));
        }
        let Some(value) = node.get_attribute(name).as_str() else {
            return Err(DomError::position(name, "value is not text"));
        };
        let value = value.to_string();

        match self.attribute_provenance(id, name)? {
            Some(Provenance::Sources(mut sources)) => {
                match replacement {
                    Some(text) => sources.replace(offset, length, text)?,
                    None => sources.erase(offset, length)?,
                }
                let text = sources.text().to_string();
                self.tree.node_mut(id)?.entity.set_attribute_at(name, text, sources)?;
            }
            _ => {
                let end = offset
                    .checked_add(length)
                    .filter(|&end| end <= value.len() && value.is_char_boundary(offset) && value.is_char_boundary(end))
                    .ok_or(SourceError::InvalidRange {
                        offset,
                        end: offset.saturating_add(length),
                        length: value.len(),
                    })?;

                let mut value = value;
                value.replace_range(offset..end, replacement.unwrap_or_default());
                self.tree.node_mut(id)?.entity.set_attribute(name, value);
            }
        }

        tracing::trace!(?id, name, offset, length, "edited attribute text");
        Ok(())
    }

    // ----------------------------------------------------------------------
    // File table
    // ----------------------------------------------------------------------

    /// Id of `path` in the file table, registering it when new
    pub fn file_index(&mut self, path: impl AsRef<Path>) -> u32 {
        self.files.file_index(path.as_ref())
    }

    pub fn file(&self, id: u32) -> Option<&Path> {
        self.files.file(id)
    }

    pub fn encode_locations(&mut self, locations: &[Option<Location>]) -> String {
        self.files.encode_locations(locations)
    }

    pub fn decode_locations(&self, src: &str) -> DomResult<Vec<Option<Location>>> {
        self.files.decode_locations(src)
    }

    /// Copy of `location` with an absolute file path
    pub fn resolve_location(&self, location: &Location) -> Location {
        self.files.resolve_location(location)
    }

    // ----------------------------------------------------------------------
    // Adoption
    // ----------------------------------------------------------------------

    /// Move the subtree at `node` out of `source` into this document. The
    /// subtree is detached from its old parent and comes back detached here;
    /// provenance is re-expressed against this document's file table.
    /// Returns the id of the subtree root in this document.
    pub fn adopt(&mut self, source: &mut Document, node: NodeId) -> DomResult<NodeId> {
        if node == source.root {
            return Err(DomError::HierarchyRequest);
        }
        source.tree.node(node)?;

        let mut order = vec![node];
        order.extend(source.tree.descendants(node));

        // Everything that can fail happens before the source is touched
        let mut remapped = Vec::with_capacity(order.len());
        for &old in &order {
            let current = source.tree.node(old)?;
            let mut entries = Vec::new();

            for name in current.entity.provenance_names() {
                let form = &current.entity.descriptor(name).form;
                let decoded = match current.provenance(name) {
                    Some(p) => p.materialize(name, form, current.get_attribute(name), &source.files)?,
                    None => None,
                };
                let decoded = match decoded {
                    Some(mut p) => {
                        p.map_paths(|path| source.files.resolve_file(path))?;
                        Some(fixup(&mut self.files, p)?)
                    }
                    None => None,
                };
                entries.push((name.to_string(), decoded));
            }
            remapped.push(entries);
        }

        source.tree.remove(node)?;

        let mut ids = HashMap::with_capacity(order.len());
        let mut children = Vec::with_capacity(order.len());
        for (&old, entries) in order.iter().zip(remapped) {
            let mut taken = source.tree.take(old).ok_or(DomError::NotFound(old))?;
            for (name, provenance) in entries {
                taken.entity.set_provenance(&name, provenance);
            }

            children.push(std::mem::take(&mut taken.children));

            let mut fresh = Node::from_entity(taken.entity);
            fresh.tag_name = taken.tag_name;
            ids.insert(old, self.tree.insert(fresh));
        }

        for (old, kids) in order.iter().zip(children) {
            let parent = ids[old];
            for kid in kids {
                self.tree.append_child(parent, ids[&kid])?;
            }
        }

        tracing::debug!(nodes = order.len(), "adopted subtree");
        Ok(ids[&node])
    }
}

/// Register the decoded paths of `provenance` in `files`, rewriting them to
/// their table form
fn fixup(files: &mut FileTable, mut provenance: Provenance) -> DomResult<Provenance> {
    match &mut provenance {
        Provenance::Encoded(_) => {}
        Provenance::Location(location) => files.fixup_location(location),
        Provenance::Locations(locations) => {
            for location in locations.iter_mut().flatten() {
                files.fixup_location(location);
            }
        }
        Provenance::Sources(sources) => sources.detach(|path| table_path(files, path))?,
    }
    Ok(provenance)
}

fn table_path(files: &mut FileTable, path: &Path) -> PathBuf {
    let id = files.file_index(path);
    files.file(id).map_or_else(|| path.to_path_buf(), Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::NodeTypeBuilder;
    use crate::child_index::Which;

    fn document() -> Document {
        let config = Config {
            base_dir: Some(PathBuf::from("/work/proj")),
            ..Config::default()
        };
        let mut doc = Document::with_paths(config, Arc::new(LexicalPaths::new("/work")));

        let class = NodeTypeBuilder::new("class")
            .extends(doc.registry().node())
            .attribute("alias[|]", AttrValue::Null)
            .attribute("description...", AttrValue::Null)
            .attribute("access", "public")
            .build()
            .unwrap();
        doc.register_type(class).unwrap();
        doc
    }

    #[test]
    fn test_root_is_document_node() {
        let doc = document();
        assert_eq!(doc.root(), NodeId::ROOT);
        assert_eq!(doc.node(doc.root()).unwrap().tag_name(), "doxi");
        assert_eq!(doc.base_dir(), Path::new("/work/proj"));
    }

    #[test]
    fn test_create_unknown_type() {
        let mut doc = document();
        assert_eq!(doc.create_node("widget").unwrap_err(), DomError::UnknownType("widget".into()));
    }

    #[test]
    fn test_name_change_reindexes() {
        let mut doc = document();
        let root = doc.root();
        let a = doc.create_node("class").unwrap();
        let b = doc.create_node("class").unwrap();
        doc.append_child(root, a).unwrap();
        doc.append_child(root, b).unwrap();

        doc.set_attribute(a, "name", "Foo").unwrap();
        doc.set_attribute(b, "name", "Foo").unwrap();
        assert_eq!(doc.tree().children_named(root, "Foo").count(), 2);

        doc.rename_attribute(a, "name", "label").unwrap();
        assert_eq!(doc.tree().child_named(root, "Foo", Which::First), Some(b));

        doc.set_tag_name(b, "struct").unwrap();
        assert_eq!(doc.tree().child_tagged(root, "struct", Which::Last), Some(b));
        assert_eq!(doc.tree().children_tagged(root, "class").count(), 1);
    }

    #[test]
    fn test_composite_location_is_replicated() {
        let mut doc = document();
        let node = doc.create_node("class").unwrap();

        doc.set_attribute_at(node, "alias", "foo|bar", Location::new("/work/proj/Foo.js", 123, 42))
            .unwrap();

        assert_eq!(doc.attribute_src(node, "alias").unwrap().as_deref(), Some("0:123:42|0:123:46"));
        let locations = doc.attribute_locations(node, "alias").unwrap();
        assert_eq!(locations[1], Some(Location::new("Foo.js", 123, 46)));
        assert_eq!(
            doc.resolve_location(&Location::new("Foo.js", 1, 1)).file,
            Some(PathBuf::from("/work/proj/Foo.js"))
        );
    }

    #[test]
    fn test_base_dir_rebases_decoded_paths() {
        let mut doc = document();
        let node = doc.create_node("class").unwrap();
        doc.set_attribute_at(node, "access", "private", Location::new("/work/proj/lib/A.js", 3, 1))
            .unwrap();

        doc.set_base_dir("/work/proj/lib").unwrap();

        assert_eq!(doc.file(0), Some(Path::new("A.js")));
        assert_eq!(
            doc.attribute_location(node, "access").unwrap(),
            Some(Location::new("A.js", 3, 1))
        );
        assert_eq!(doc.attribute_src(node, "access").unwrap().as_deref(), Some("0:3:1"));
    }

    #[test]
    fn test_text_edit_without_sources() {
        let mut doc = document();
        let node = doc.create_node("class").unwrap();
        doc.set_attribute(node, "description", "hello world").unwrap();

        doc.replace_attribute_text(node, "description", 0, 5, "goodbye").unwrap();
        assert_eq!(doc.get_attribute(node, "description").unwrap().as_str(), Some("goodbye world"));

        doc.erase_attribute_text(node, "description", 7, 6).unwrap();
        assert_eq!(doc.get_attribute(node, "description").unwrap().as_str(), Some("goodbye"));

        assert!(matches!(
            doc.erase_attribute_text(node, "description", 5, 10),
            Err(DomError::Source(SourceError::InvalidRange { .. }))
        ));
        assert!(matches!(
            doc.erase_attribute_text(node, "access", 0, 1),
            Err(DomError::InvalidPosition { .. })
        ));
    }

    #[test]
    fn test_text_edit_moves_sources() {
        let mut doc = document();
        let node = doc.create_node("class").unwrap();
        doc.set_attribute_at(node, "description", "one\ntwo", Location::new("Foo.js", 10, 4))
            .unwrap();

        doc.erase_attribute_text(node, "description", 0, 4).unwrap();

        assert_eq!(doc.get_attribute(node, "description").unwrap().as_str(), Some("two"));
        assert_eq!(
            doc.attribute_location(node, "description").unwrap(),
            Some(Location::new("Foo.js", 11, 4))
        );
    }

    #[test]
    fn test_adopt_moves_subtree() {
        let mut source = Document::with_paths(
            Config {
                base_dir: Some(PathBuf::from("/work/a")),
                ..Config::default()
            },
            Arc::new(LexicalPaths::new("/work")),
        );
        let parent = source.create_node("node").unwrap();
        let child = source.create_node("node").unwrap();
        source.append_child(source.root(), parent).unwrap();
        source.append_child(parent, child).unwrap();
        source.set_attribute_at(child, "name", "inner", Location::new("/work/a/x.js", 2, 5)).unwrap();

        let mut doc = document();
        doc.file_index("/work/proj/first.js");
        let adopted = doc.adopt(&mut source, parent).unwrap();

        assert!(source.tree().children(source.root()).is_empty());
        assert_eq!(source.tree().len(), 1);

        let kids = doc.tree().children(adopted).to_vec();
        assert_eq!(kids.len(), 1);
        assert_eq!(doc.tree().parent(adopted), None);
        assert_eq!(doc.node(kids[0]).unwrap().name(), Some("inner"));
        assert_eq!(
            doc.attribute_location(kids[0], "name").unwrap(),
            Some(Location::new("../a/x.js", 2, 5))
        );
        assert_eq!(doc.attribute_src(kids[0], "name").unwrap().as_deref(), Some("1:2:5"));

        assert_eq!(doc.adopt(&mut source, NodeId::ROOT).unwrap_err(), DomError::HierarchyRequest);
    }
}
