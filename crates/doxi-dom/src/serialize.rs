//! Serialized Form
//!
//! The interchange shape of a document. A node becomes a record holding its
//! `tagName`, every non-default attribute (composites joined back with their
//! separator), an optional `src` record of encoded positions keyed by
//! attribute name, and its children under `items`.
//!
//! Attribute names `tagName`, `src` and `items` are taken by the record
//! itself and do not survive a round trip.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::attributes::{AttrValue, DOCUMENT_TAG};
use crate::document::Document;
use crate::files::FileTable;
use crate::provenance::Provenance;
use crate::{DomError, DomResult, NodeId};

/// Version written to and expected in serialized documents
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedNode {
    #[serde(rename = "tagName")]
    pub tag_name: String,

    #[serde(flatten)]
    pub attributes: BTreeMap<String, AttrValue>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub src: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<SerializedNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedDocument {
    pub version: u32,
    /// Base-relative paths; `src` file ids index into this list
    pub files: Vec<String>,
    pub root: SerializedNode,
}

impl Document {
    /// Serialize `id` and its subtree. `src` ids refer to this document's
    /// file table.
    pub fn serialize_node(&self, id: NodeId) -> DomResult<SerializedNode> {
        let node = self.node(id)?;
        let mut attributes = BTreeMap::new();
        let mut src = BTreeMap::new();

        for (name, value) in node.entity().data() {
            let descriptor = node.entity().descriptor(name);
            if *value == descriptor.default {
                continue;
            }
            attributes.insert(name.clone(), descriptor.flatten(value));

            if self.config().emit_sources {
                if let Some(provenance) = node.provenance(name) {
                    src.insert(name.clone(), provenance.to_src(self.files())?);
                }
            }
        }

        let items = node
            .children()
            .iter()
            .map(|&child| self.serialize_node(child))
            .collect::<DomResult<Vec<_>>>()?;

        Ok(SerializedNode {
            tag_name: node.tag_name().to_string(),
            attributes,
            src,
            items,
        })
    }

    pub fn serialize(&self) -> DomResult<SerializedDocument> {
        let paths = self.files().paths();
        Ok(SerializedDocument {
            version: FORMAT_VERSION,
            files: self.files().files().iter().map(|f| paths.slashify(f)).collect(),
            root: self.serialize_node(self.root())?,
        })
    }

    pub fn to_json(&self) -> DomResult<String> {
        let data = self.serialize()?;
        serde_json::to_string_pretty(&data).map_err(|e| DomError::Serialization(e.to_string()))
    }

    /// Build a detached subtree from `data`. Encoded positions in `data`
    /// must use this document's file ids.
    pub fn import_node(&mut self, data: &SerializedNode) -> DomResult<NodeId> {
        let id = self.create_node(&data.tag_name)?;
        self.import_into(id, data, None)?;
        Ok(id)
    }

    /// Load a serialized document under this document's root. Types must
    /// already be registered. When the file table is still empty the stored
    /// file ids are kept and positions stay encoded; otherwise they are
    /// decoded and re-registered here.
    pub fn load(&mut self, data: &SerializedDocument) -> DomResult<()> {
        if data.version != FORMAT_VERSION {
            return Err(DomError::Serialization(format!("unsupported version {}", data.version)));
        }
        if data.root.tag_name != DOCUMENT_TAG {
            return Err(DomError::Serialization(format!(
                "root must be {DOCUMENT_TAG:?}, found {:?}",
                data.root.tag_name
            )));
        }

        let remap = if self.files().is_empty() {
            for (i, file) in data.files.iter().enumerate() {
                if self.file_index(Path::new(file)) as usize != i {
                    return Err(DomError::Serialization(format!("duplicate file {file:?}")));
                }
            }
            None
        } else {
            let mut table = FileTable::new(Arc::clone(self.files().paths()), Some(self.base_dir()));
            for file in &data.files {
                table.file_index(Path::new(file));
            }
            Some(table)
        };

        let root = self.root();
        self.import_into(root, &data.root, remap.as_ref())?;

        tracing::debug!(files = data.files.len(), nodes = self.tree().len(), "loaded document");
        Ok(())
    }

    pub fn from_json(&mut self, json: &str) -> DomResult<()> {
        let data: SerializedDocument =
            serde_json::from_str(json).map_err(|e| DomError::Serialization(e.to_string()))?;
        self.load(&data)
    }

    // `remap` holds the file table the encoded positions were written
    // against, when it is not this document's
    fn import_into(&mut self, id: NodeId, data: &SerializedNode, remap: Option<&FileTable>) -> DomResult<()> {
        for (name, value) in &data.attributes {
            let Some(src) = data.src.get(name) else {
                self.set_attribute(id, name, value.clone())?;
                continue;
            };

            let encoded = Provenance::Encoded(src.clone());
            match remap {
                None => self.set_attribute_at(id, name, value.clone(), encoded)?,
                Some(table) => {
                    let node = self.node(id)?;
                    let descriptor = node.entity().descriptor(name);
                    let coerced = descriptor.coerce(value.clone());
                    match encoded.materialize(name, &descriptor.form, &coerced, table)? {
                        Some(decoded) => self.set_attribute_at(id, name, coerced, decoded)?,
                        None => self.set_attribute(id, name, coerced)?,
                    }
                }
            }
        }

        for item in &data.items {
            let child = self.create_node(&item.tag_name)?;
            self.import_into(child, item, remap)?;
            self.append_child(id, child)?;
        }
        Ok(())
    }
}
