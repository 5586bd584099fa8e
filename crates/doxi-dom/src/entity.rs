//! Entity
//!
//! The attribute-bearing part of a node. Only values that were explicitly
//! set are stored; reads fall back to the declared default of the entity's
//! [`NodeType`]. Provenance lives in a shadow map keyed like the values and
//! always moves with them.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use doxi_source::DELIMITER;

use crate::attributes::{AttrForm, AttrValue, AttributeDescriptor, NodeType};
use crate::files::FileTable;
use crate::provenance::Provenance;
use crate::{DomError, DomResult};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug)]
pub struct Entity {
    id: u64,
    node_type: Arc<NodeType>,
    data: BTreeMap<String, AttrValue>,
    provenance: BTreeMap<String, Provenance>,
}

impl Entity {
    pub fn new(node_type: &Arc<NodeType>) -> Self {
        Self {
            id: next_id(),
            node_type: Arc::clone(node_type),
            data: BTreeMap::new(),
            provenance: BTreeMap::new(),
        }
    }

    /// Process-unique, assigned at construction
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn node_type(&self) -> &Arc<NodeType> {
        &self.node_type
    }

    pub fn descriptor(&self, name: &str) -> &AttributeDescriptor {
        self.node_type.descriptor(name)
    }

    /// Own values only
    pub fn data(&self) -> &BTreeMap<String, AttrValue> {
        &self.data
    }

    /// Own value, else the declared default, else `Null`
    pub fn get_attribute(&self, name: &str) -> &AttrValue {
        self.data
            .get(name)
            .unwrap_or(&self.node_type.descriptor(name).default)
    }

    /// True if a value was set on this entity, even one equal to the default
    pub fn has_attribute(&self, name: &str) -> bool {
        self.data.contains_key(name)
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    /// Store `value` without position data. Stale provenance is dropped.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<AttrValue>) {
        let value = self.node_type.descriptor(name).coerce(value.into());
        self.provenance.remove(name);
        self.data.insert(name.to_string(), value);
    }

    /// Store `value` with where it came from
    pub fn set_attribute_at(
        &mut self,
        name: &str,
        value: impl Into<AttrValue>,
        provenance: impl Into<Provenance>,
    ) -> DomResult<()> {
        let descriptor = self.node_type.descriptor(name);
        let value = descriptor.coerce(value.into());
        let provenance = provenance.into().conform(name, &descriptor.form, &value)?;

        match provenance {
            Some(provenance) => self.provenance.insert(name.to_string(), provenance),
            None => self.provenance.remove(name),
        };
        self.data.insert(name.to_string(), value);
        Ok(())
    }

    /// `None` removes the attribute; `Some(Null)` is stored
    pub fn set_or_remove_attribute(&mut self, name: &str, value: Option<AttrValue>) {
        match value {
            Some(value) => self.set_attribute(name, value),
            None => {
                self.remove_attribute(name);
            }
        }
    }

    /// Drop the value and its provenance. Returns the removed value.
    pub fn remove_attribute(&mut self, name: &str) -> Option<AttrValue> {
        self.provenance.remove(name);
        self.data.remove(name)
    }

    /// Move a value and its provenance to another name. Returns false when
    /// there was nothing to move. The provenance is reshaped for the form of
    /// `to` and dropped when it cannot describe the moved value.
    pub fn rename_attribute(&mut self, from: &str, to: &str) -> bool {
        if from == to {
            return self.has_attribute(from);
        }

        let value = self.data.remove(from);
        let provenance = self.provenance.remove(from);

        self.data.remove(to);
        self.provenance.remove(to);

        let moved = value.is_some() || provenance.is_some();

        let node_type = Arc::clone(&self.node_type);
        let descriptor = node_type.descriptor(to);

        let Some(value) = value else {
            return moved;
        };
        let value = descriptor.coerce(value);

        if let Some(provenance) = provenance {
            match provenance.conform(to, &descriptor.form, &value) {
                Ok(Some(provenance)) => {
                    self.provenance.insert(to.to_string(), provenance);
                }
                Ok(None) => {}
                Err(err) => tracing::debug!(from, to, %err, "dropped provenance on rename"),
            }
        }
        self.data.insert(to.to_string(), value);

        moved
    }

    pub fn provenance(&self, name: &str) -> Option<&Provenance> {
        self.provenance.get(name)
    }

    /// Names of attributes that carry provenance
    pub fn provenance_names(&self) -> impl Iterator<Item = &str> {
        self.provenance.keys().map(String::as_str)
    }

    pub(crate) fn provenance_mut(&mut self) -> impl Iterator<Item = (&str, &mut Provenance)> {
        self.provenance.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn set_provenance(&mut self, name: &str, provenance: Option<Provenance>) {
        match provenance {
            Some(provenance) => self.provenance.insert(name.to_string(), provenance),
            None => self.provenance.remove(name),
        };
    }

    /// Append elements to a composite attribute, joining the provenance of
    /// both parts in call order. Encoded provenance on both sides stays
    /// encoded; any other mix is decoded through `files` and concatenated.
    pub fn append_attribute(
        &mut self,
        name: &str,
        value: impl Into<AttrValue>,
        provenance: Option<Provenance>,
        files: &FileTable,
    ) -> DomResult<()> {
        let node_type = Arc::clone(&self.node_type);
        let descriptor = node_type.descriptor(name);
        if !descriptor.is_composite() {
            return Err(DomError::NotComposite(name.to_string()));
        }
        let form = &descriptor.form;

        let added_items = elements(descriptor.coerce(value.into()));
        let mut items = elements(descriptor.coerce(self.get_attribute(name).clone()));

        let added = AttrValue::List(added_items.clone());
        let existing = AttrValue::List(items.clone());

        let added_provenance = match provenance {
            Some(provenance) => provenance.conform(name, form, &added)?,
            None => None,
        };
        let existing_provenance = self.provenance.get(name).cloned();

        let joined = match (existing_provenance, added_provenance) {
            (None, None) => None,
            (Some(Provenance::Encoded(a)), Some(Provenance::Encoded(b))) => {
                Some(Provenance::Encoded(format!("{a}{DELIMITER}{b}")))
            }
            (before, after) => {
                let mut locations = locations_of(before, name, form, &existing, files)?;
                locations.extend(locations_of(after, name, form, &added, files)?);
                Some(Provenance::Locations(locations))
            }
        };

        items.extend(added_items);

        self.data.insert(name.to_string(), AttrValue::List(items));
        self.set_provenance(name, joined);
        Ok(())
    }
}

fn locations_of(
    provenance: Option<Provenance>,
    name: &str,
    form: &AttrForm,
    value: &AttrValue,
    files: &FileTable,
) -> DomResult<Vec<Option<doxi_source::Location>>> {
    match provenance {
        Some(provenance) => provenance.into_locations(name, form, value, files),
        None => Ok(vec![None; value.as_list().map_or(0, <[String]>::len)]),
    }
}

/// Composite elements of a coerced value
fn elements(value: AttrValue) -> Vec<String> {
    match value {
        AttrValue::List(items) => items,
        AttrValue::Null => Vec::new(),
        AttrValue::Str(s) => vec![s],
        AttrValue::Bool(b) => vec![b.to_string()],
        AttrValue::Int(n) => vec![n.to_string()],
    }
}

impl Clone for Entity {
    /// The clone is a new entity with its own id and a copy of the data
    fn clone(&self) -> Self {
        Self {
            id: next_id(),
            node_type: Arc::clone(&self.node_type),
            data: self.data.clone(),
            provenance: self.provenance.clone(),
        }
    }
}
