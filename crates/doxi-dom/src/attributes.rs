//! Node Types and Attributes
//!
//! Attribute declarations per node type. A declaration name may carry its
//! form as a suffix:
//! - `summary...` is multiline (provenance is a source map)
//! - `alias[|]` is composite with separator `|`
//! - `tags[]` is composite with the default separator `,`
//!
//! A type's table is copied from its base when the type is built, so lookups
//! never walk a chain.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Tag name of the document root
pub const DOCUMENT_TAG: &str = "doxi";

/// Separator for composite attributes declared with empty brackets
pub const DEFAULT_SEPARATOR: &str = ",";

/// Attribute value
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<String>),
}

impl AttrValue {
    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            AttrValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Str(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Str(s)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        AttrValue::Int(n)
    }
}

impl From<Vec<String>> for AttrValue {
    fn from(items: Vec<String>) -> Self {
        AttrValue::List(items)
    }
}

impl From<Vec<&str>> for AttrValue {
    fn from(items: Vec<&str>) -> Self {
        AttrValue::List(items.into_iter().map(str::to_string).collect())
    }
}

/// How an attribute stores its value and provenance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrForm {
    /// One value, one location
    Scalar,
    /// A list of strings, one location per element
    Composite { separator: String },
    /// Text whose provenance is a source map
    Multiline,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDescriptor {
    pub name: String,
    pub default: AttrValue,
    pub form: AttrForm,
}

/// Descriptor returned for names no type declares
pub static UNKNOWN: LazyLock<AttributeDescriptor> = LazyLock::new(|| AttributeDescriptor {
    name: String::new(),
    default: AttrValue::Null,
    form: AttrForm::Scalar,
});

impl AttributeDescriptor {
    /// Parse a declaration such as `alias[|]` or `summary...`
    pub fn parse(decl: &str, default: AttrValue) -> Result<Self, ConfigError> {
        let malformed = || ConfigError::MalformedName(decl.to_string());

        let (name, form) = if let Some(name) = decl.strip_suffix("...") {
            (name, AttrForm::Multiline)
        } else if let Some(head) = decl.strip_suffix(']') {
            let (name, separator) = head.split_once('[').ok_or_else(malformed)?;
            if separator.contains(['[', ']']) {
                return Err(malformed());
            }
            let separator = if separator.is_empty() { DEFAULT_SEPARATOR } else { separator };
            (
                name,
                AttrForm::Composite {
                    separator: separator.to_string(),
                },
            )
        } else {
            (decl, AttrForm::Scalar)
        };

        if name.is_empty() || name.contains(['[', ']', '.']) {
            return Err(malformed());
        }

        Ok(Self {
            name: name.to_string(),
            default,
            form,
        })
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.form, AttrForm::Composite { .. })
    }

    pub fn is_multiline(&self) -> bool {
        matches!(self.form, AttrForm::Multiline)
    }

    pub fn separator(&self) -> Option<&str> {
        match &self.form {
            AttrForm::Composite { separator } => Some(separator),
            _ => None,
        }
    }

    /// Normalize a value for storage: composite strings are split on the
    /// separator, dropping the empty tail left by a trailing separator
    pub fn coerce(&self, value: AttrValue) -> AttrValue {
        match (&self.form, value) {
            (AttrForm::Composite { separator }, AttrValue::Str(s)) => AttrValue::List(split_composite(&s, separator)),
            (_, value) => value,
        }
    }

    /// Value in its serialized form; composites are joined back together
    pub fn flatten(&self, value: &AttrValue) -> AttrValue {
        match (&self.form, value) {
            (AttrForm::Composite { separator }, AttrValue::List(items)) => AttrValue::Str(items.join(separator)),
            (_, value) => value.clone(),
        }
    }
}

pub(crate) fn split_composite(s: &str, separator: &str) -> Vec<String> {
    let mut items: Vec<String> = s.split(separator).map(str::to_string).collect();
    if items.len() > 1 && items.last().is_some_and(String::is_empty) {
        items.pop();
    }
    items
}

/// A node type: tag name plus its full attribute table
#[derive(Debug)]
pub struct NodeType {
    tag_name: String,
    base: Option<Arc<NodeType>>,
    attributes: HashMap<String, Arc<AttributeDescriptor>>,
    /// Declaration order, base attributes first
    order: Vec<String>,
}

impl NodeType {
    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    pub fn base(&self) -> Option<&Arc<NodeType>> {
        self.base.as_ref()
    }

    /// Declared descriptor, if any
    pub fn lookup(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.get(name).map(Arc::as_ref)
    }

    /// Declared descriptor, or the shared unknown one
    pub fn descriptor(&self, name: &str) -> &AttributeDescriptor {
        self.lookup(name).unwrap_or(&*UNKNOWN)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &AttributeDescriptor> {
        self.order.iter().filter_map(|name| self.lookup(name))
    }

    /// True if this type is `tag_name` or derives from it
    pub fn is_a(&self, tag_name: &str) -> bool {
        let mut current = Some(self);
        while let Some(ty) = current {
            if ty.tag_name == tag_name {
                return true;
            }
            current = ty.base.as_deref();
        }
        false
    }
}

/// Declares a [`NodeType`]
#[derive(Debug)]
pub struct NodeTypeBuilder {
    tag_name: String,
    base: Option<Arc<NodeType>>,
    declarations: Vec<(String, AttrValue)>,
}

impl NodeTypeBuilder {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            base: None,
            declarations: Vec::new(),
        }
    }

    pub fn extends(mut self, base: &Arc<NodeType>) -> Self {
        self.base = Some(Arc::clone(base));
        self
    }

    pub fn attribute(mut self, decl: &str, default: impl Into<AttrValue>) -> Self {
        self.declarations.push((decl.to_string(), default.into()));
        self
    }

    /// Copy the base table, then add this type's own declarations on top.
    /// Redeclaring a base attribute shadows it; declaring a name twice on
    /// the same type is an error.
    pub fn build(self) -> Result<Arc<NodeType>, ConfigError> {
        let (mut attributes, mut order) = match &self.base {
            Some(base) => (base.attributes.clone(), base.order.clone()),
            None => (HashMap::new(), Vec::new()),
        };

        let mut own: Vec<String> = Vec::with_capacity(self.declarations.len());

        for (decl, default) in self.declarations {
            let descriptor = AttributeDescriptor::parse(&decl, default)?;
            let name = descriptor.name.clone();

            if own.contains(&name) {
                return Err(ConfigError::DuplicateAttribute {
                    tag: self.tag_name,
                    name,
                });
            }

            if attributes.insert(name.clone(), Arc::new(descriptor)).is_none() {
                order.push(name.clone());
            }
            own.push(name);
        }

        tracing::debug!(tag = %self.tag_name, attributes = order.len(), "built node type");

        Ok(Arc::new(NodeType {
            tag_name: self.tag_name,
            base: self.base,
            attributes,
            order,
        }))
    }
}

/// Tag name to node type table
#[derive(Debug)]
pub struct TypeRegistry {
    types: HashMap<String, Arc<NodeType>>,
    node: Arc<NodeType>,
    document: Arc<NodeType>,
}

impl TypeRegistry {
    /// Registry holding the base `node` type and the `doxi` document type
    pub fn new() -> Self {
        let node = Arc::new(NodeType {
            tag_name: "node".to_string(),
            base: None,
            attributes: HashMap::from([(
                "name".to_string(),
                Arc::new(AttributeDescriptor {
                    name: "name".to_string(),
                    default: AttrValue::Null,
                    form: AttrForm::Scalar,
                }),
            )]),
            order: vec!["name".to_string()],
        });

        let doxi = Arc::new(NodeType {
            tag_name: DOCUMENT_TAG.to_string(),
            base: Some(Arc::clone(&node)),
            attributes: node.attributes.clone(),
            order: node.order.clone(),
        });

        let mut types = HashMap::new();
        types.insert(node.tag_name.clone(), Arc::clone(&node));
        types.insert(doxi.tag_name.clone(), Arc::clone(&doxi));

        Self {
            types,
            node,
            document: doxi,
        }
    }

    /// The root type every other type should extend
    pub fn node(&self) -> &Arc<NodeType> {
        &self.node
    }

    /// Type of document root nodes
    pub fn document(&self) -> &Arc<NodeType> {
        &self.document
    }

    pub fn register(&mut self, ty: Arc<NodeType>) -> Result<(), ConfigError> {
        if self.types.contains_key(ty.tag_name()) {
            return Err(ConfigError::DuplicateType(ty.tag_name().to_string()));
        }

        tracing::debug!(tag = %ty.tag_name(), "registered node type");
        self.types.insert(ty.tag_name().to_string(), ty);
        Ok(())
    }

    pub fn get(&self, tag_name: &str) -> Option<&Arc<NodeType>> {
        self.types.get(tag_name)
    }

    /// Builder for a type extending the registered `base`
    pub fn derive(&self, tag_name: impl Into<String>, base: &str) -> Result<NodeTypeBuilder, ConfigError> {
        let base = self
            .types
            .get(base)
            .ok_or_else(|| ConfigError::UnknownBase(base.to_string()))?;
        Ok(NodeTypeBuilder::new(tag_name).extends(base))
    }

    pub fn contains(&self, tag_name: &str) -> bool {
        self.types.contains_key(tag_name)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
