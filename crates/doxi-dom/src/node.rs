//! DOM Node
//!
//! A node is an [`Entity`] plus its place in the tree. Link records for the
//! three sibling lists live on the child; the lists and indexes over the
//! children live on the parent.

use std::sync::Arc;

use crate::attributes::{AttrValue, NodeType};
use crate::child_index::{ChildIndex, IndexKind};
use crate::entity::Entity;
use crate::list::{LinkKind, Links, List};
use crate::provenance::Provenance;
use crate::NodeId;

/// Attribute the by-name index is keyed on
pub const NAME_ATTRIBUTE: &str = "name";

#[derive(Debug)]
pub struct Node {
    pub(crate) entity: Entity,
    pub(crate) tag_name: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    /// Position among the parent's children, valid while attached
    pub(crate) child_index: usize,
    /// Indexed by [`LinkKind`]
    pub(crate) links: [Links; 3],
    /// Key each index currently files this node under, by [`IndexKind`]
    pub(crate) index_keys: [Option<String>; 2],
    pub(crate) siblings: List,
    pub(crate) indexes: [ChildIndex; 2],
}

impl Node {
    /// A detached node of type `node_type`
    pub fn new(node_type: &Arc<NodeType>) -> Self {
        Self::from_entity(Entity::new(node_type))
    }

    pub(crate) fn from_entity(entity: Entity) -> Self {
        let tag_name = entity.node_type().tag_name().to_string();
        Self {
            entity,
            tag_name,
            parent: None,
            children: Vec::new(),
            child_index: 0,
            links: [Links::default(); 3],
            index_keys: [None, None],
            siblings: List::new(),
            indexes: [ChildIndex::new(), ChildIndex::new()],
        }
    }

    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    /// Process-unique entity id
    pub fn id(&self) -> u64 {
        self.entity.id()
    }

    pub fn node_type(&self) -> &Arc<NodeType> {
        self.entity.node_type()
    }

    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    /// The `name` attribute, when it holds a string
    pub fn name(&self) -> Option<&str> {
        self.entity.get_attribute(NAME_ATTRIBUTE).as_str()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Position among the parent's children
    pub fn child_index(&self) -> Option<usize> {
        self.parent.map(|_| self.child_index)
    }

    pub fn links(&self, kind: LinkKind) -> &Links {
        &self.links[kind as usize]
    }

    pub fn get_attribute(&self, name: &str) -> &AttrValue {
        self.entity.get_attribute(name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.entity.has_attribute(name)
    }

    /// Stored provenance, possibly still encoded
    pub fn provenance(&self, name: &str) -> Option<&Provenance> {
        self.entity.provenance(name)
    }

    pub(crate) fn index_key(&self, kind: IndexKind) -> Option<String> {
        match kind {
            IndexKind::Name => self.name().map(str::to_string),
            IndexKind::Tag => Some(self.tag_name.clone()),
        }
    }

    /// Detached copy with a new entity id and no children
    pub(crate) fn shallow_clone(&self) -> Self {
        let mut node = Self::from_entity(self.entity.clone());
        node.tag_name = self.tag_name.clone();
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::TypeRegistry;

    #[test]
    fn test_new_node_is_detached() {
        let registry = TypeRegistry::new();
        let node = Node::new(registry.node());

        assert_eq!(node.tag_name(), "node");
        assert_eq!(node.parent(), None);
        assert_eq!(node.child_index(), None);
        assert_eq!(node.name(), None);
        assert!(!node.has_children());
        assert_eq!(node.index_key(IndexKind::Tag).as_deref(), Some("node"));
        assert_eq!(node.index_key(IndexKind::Name), None);
    }

    #[test]
    fn test_shallow_clone() {
        let registry = TypeRegistry::new();
        let mut node = Node::new(registry.node());
        node.entity.set_attribute(NAME_ATTRIBUTE, "foo");
        node.tag_name = "renamed".into();

        let copy = node.shallow_clone();
        assert_ne!(copy.id(), node.id());
        assert_eq!(copy.name(), Some("foo"));
        assert_eq!(copy.tag_name(), "renamed");
    }
}
