//! DOM Errors
//!
//! Usage errors raised by tree and attribute operations, and configuration
//! errors raised while declaring node types.

use std::path::PathBuf;

use doxi_source::SourceError;

use crate::NodeId;

/// Result type for DOM operations
pub type DomResult<T> = Result<T, DomError>;

/// DOM operation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomError {
    #[error("Cannot add a node to itself")]
    SelfInsertion,

    #[error("Cannot insert a node before itself")]
    InsertBeforeSelf,

    #[error("Cannot replace a node with itself")]
    SelfReplacement,

    #[error("Node is not a child")]
    NotAChild,

    /// Inserting a node into its own subtree
    #[error("Hierarchy request error")]
    HierarchyRequest,

    #[error("Node not found: {0:?}")]
    NotFound(NodeId),

    #[error("Node is already linked into a list")]
    AlreadyLinked,

    #[error("Reference node is not a member of this list")]
    InvalidReference,

    #[error("Cannot remove item; not a member of this list")]
    NotAMember,

    #[error("Attribute {0:?} is not composite")]
    NotComposite(String),

    #[error("Position does not fit attribute {name:?}: {reason}")]
    InvalidPosition { name: String, reason: &'static str },

    #[error("File {0:?} is not in the document file table")]
    UnregisteredFile(PathBuf),

    #[error("Unknown node type {0:?}")]
    UnknownType(String),

    #[error("Invalid serialized form: {0}")]
    Serialization(String),

    #[error(transparent)]
    Source(#[from] SourceError),
}

impl DomError {
    pub(crate) fn position(name: &str, reason: &'static str) -> Self {
        Self::InvalidPosition {
            name: name.to_string(),
            reason,
        }
    }
}

/// Node type declaration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Attribute {name:?} is defined twice on {tag:?}")]
    DuplicateAttribute { tag: String, name: String },

    #[error("Malformed attribute name {0:?}")]
    MalformedName(String),

    #[error("Unknown base type {0:?}")]
    UnknownBase(String),

    #[error("Node type {0:?} is already registered")]
    DuplicateType(String),

    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}
