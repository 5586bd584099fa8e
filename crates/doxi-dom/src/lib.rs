//! Doxi DOM - Document Object Model
//!
//! Arena tree of documentation nodes. Each node keeps its children in
//! insertion order plus two secondary indexes (by `name` and by tag), and
//! every attribute value can carry the source position it was extracted
//! from.

mod attributes;
mod child_index;
mod config;
mod document;
mod entity;
mod files;
mod list;
mod node;
mod operations;
mod provenance;
mod serialize;
mod tree;

pub use attributes::{
    AttrForm, AttrValue, AttributeDescriptor, DEFAULT_SEPARATOR, DOCUMENT_TAG, NodeType, NodeTypeBuilder,
    TypeRegistry,
};
pub use child_index::{ChildIndex, IndexKind, IndexSlots, Which};
pub use config::Config;
pub use document::Document;
pub use entity::Entity;
pub use files::FileTable;
pub use list::{LinkKind, LinkRead, LinkSlots, Links, List, ListIter, ListTag};
pub use node::{NAME_ATTRIBUTE, Node};
pub use operations::{ConfigError, DomError, DomResult};
pub use provenance::{Provenance, pad, replicate};
pub use serialize::{FORMAT_VERSION, SerializedDocument, SerializedNode};
pub use tree::{ArenaView, DomTree, TreeObserver};

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root node ID
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}
