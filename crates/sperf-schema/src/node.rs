//! # Schema Nodes
//!
//! A [`SchemaNode`] is an immutable view over one fragment of a schema
//! document plus its resolution context: the owning node (`parent`), the
//! root whose definitions table governs `$ref` resolution (`context`), an
//! optional `name`, and `required` metadata propagated from the owning
//! object.
//!
//! ## Design
//!
//! Nodes live in a [`SchemaArena`] and refer to each other by [`NodeId`]
//! handles, so parent and context links are back-references without
//! ownership. The arena owns the raw documents; a node stores its JSON
//! Pointer into its document and the [`Keywords`] parsed from the fragment
//! at construction.
//!
//! Children are created on demand. Asking for the same child twice (same
//! fragment, parent, name, and metadata) returns the same handle.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sperf_core::{pointer, regularize_name, CanonicalizationError, ModelConfig, SchemaDigest, SchemaError};

use crate::keywords::Keywords;

static NULL: Value = Value::Null;

/// Handle of a node in a [`SchemaArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    /// The arena index.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Identity of origin: which fragment, resolved against which context.
///
/// Two nodes with equal origins wrap the same fragment of the same document
/// and resolve references identically, whatever their names or parents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Origin {
    /// The context root.
    pub context: NodeId,
    /// JSON Pointer of the fragment in the context's document.
    pub pointer: String,
}

impl Origin {
    /// `#`-prefixed pointer, the form used in error messages.
    pub fn fragment(&self) -> String {
        pointer::to_fragment(&self.pointer)
    }
}

/// Annotations propagated from the owning node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NodeMetadata {
    /// The owning object lists this property in `required`.
    pub required: bool,
}

/// One schema fragment with its resolution context.
#[derive(Debug, Clone)]
pub struct SchemaNode {
    id: NodeId,
    document: usize,
    pointer: String,
    parent: Option<NodeId>,
    context: NodeId,
    name: Option<String>,
    module: Option<String>,
    metadata: NodeMetadata,
    keywords: Keywords,
}

impl SchemaNode {
    /// This node's handle.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// JSON Pointer of the fragment within its document.
    pub fn pointer(&self) -> &str {
        &self.pointer
    }

    /// `#`-prefixed pointer for diagnostics.
    pub fn path(&self) -> String {
        pointer::to_fragment(&self.pointer)
    }

    /// Owning node; `None` for a root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// The root holding the definitions table this node resolves against.
    pub fn context(&self) -> NodeId {
        self.context
    }

    /// Assigned name (property or definition name), if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Module qualifier inherited from the context.
    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    /// Propagated annotations.
    pub fn metadata(&self) -> NodeMetadata {
        self.metadata
    }

    /// Parsed keywords.
    pub fn keywords(&self) -> &Keywords {
        &self.keywords
    }

    /// Identity of origin.
    pub fn origin(&self) -> Origin {
        Origin {
            context: self.context,
            pointer: self.pointer.clone(),
        }
    }

    /// Exactly one node per document is its own context.
    pub fn is_root(&self) -> bool {
        self.context == self.id
    }

    /// The fragment carries `$ref`.
    pub fn is_reference(&self) -> bool {
        self.keywords.reference.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct NodeKey {
    document: usize,
    pointer: String,
    parent: Option<NodeId>,
    name: Option<String>,
    metadata: NodeMetadata,
}

/// Owner of schema documents and every node created over them.
#[derive(Debug)]
pub struct SchemaArena {
    config: ModelConfig,
    documents: Vec<Value>,
    nodes: Vec<SchemaNode>,
    index: HashMap<NodeKey, NodeId>,
}

impl SchemaArena {
    /// An empty arena.
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            documents: Vec::new(),
            nodes: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// The configuration nodes are interpreted with.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Number of nodes created so far.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True before any root is added.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Take ownership of a document and wrap it as a root node.
    ///
    /// Fails with `InvalidSchema` when the document is not a JSON object.
    pub fn add_root(&mut self, document: Value) -> Result<NodeId, SchemaError> {
        let keywords = Keywords::parse(&document, "#")?;
        let doc = self.documents.len();
        self.documents.push(document);

        let id = NodeId(self.nodes.len());
        self.nodes.push(SchemaNode {
            id,
            document: doc,
            pointer: String::new(),
            parent: None,
            context: id,
            name: None,
            module: self.config.module.clone(),
            metadata: NodeMetadata::default(),
            keywords,
        });
        Ok(id)
    }

    /// Borrow a node.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this arena.
    pub fn node(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id.0]
    }

    /// The raw fragment a node wraps.
    pub fn fragment(&self, id: NodeId) -> &Value {
        let node = self.node(id);
        self.documents
            .get(node.document)
            .and_then(|doc| doc.pointer(&node.pointer))
            .unwrap_or(&NULL)
    }

    /// The raw document of a context root.
    pub(crate) fn document_of(&self, id: NodeId) -> &Value {
        self.documents.get(self.node(id).document).unwrap_or(&NULL)
    }

    /// Wrap the sub-fragment at `segments` (relative to `parent`) as a child.
    ///
    /// The child inherits the parent's document, context, and module.
    pub fn make_child(
        &mut self,
        parent: NodeId,
        segments: &[&str],
        name: Option<String>,
        metadata: NodeMetadata,
    ) -> Result<NodeId, SchemaError> {
        let owner = self.node(parent);
        let ptr = segments
            .iter()
            .fold(owner.pointer.clone(), |acc, seg| pointer::push(&acc, seg));
        let (document, context, module) = (owner.document, owner.context, owner.module.clone());
        self.insert(document, ptr, Some(parent), context, name, module, metadata)
    }

    /// Wrap the fragment at `ptr` of the context's document, on behalf of
    /// `invoker`. Used by reference resolution.
    pub(crate) fn make_resolved(
        &mut self,
        invoker: NodeId,
        ptr: String,
        name: Option<String>,
    ) -> Result<NodeId, SchemaError> {
        let from = self.node(invoker);
        let (context, module) = (from.context, from.module.clone());
        let document = self.node(context).document;
        self.insert(document, ptr, Some(invoker), context, name, module, NodeMetadata::default())
    }

    /// Re-wrap a node's fragment with a different name and metadata.
    pub fn copy_with(
        &mut self,
        id: NodeId,
        name: Option<String>,
        metadata: NodeMetadata,
    ) -> Result<NodeId, SchemaError> {
        let node = self.node(id);
        if node.is_root() {
            // A root is its own context; a renamed copy would not be.
            return Ok(id);
        }
        let (document, ptr, parent, context, module) = (
            node.document,
            node.pointer.clone(),
            node.parent,
            node.context,
            node.module.clone(),
        );
        self.insert(document, ptr, parent, context, name, module, metadata)
    }

    #[allow(clippy::too_many_arguments)]
    fn insert(
        &mut self,
        document: usize,
        ptr: String,
        parent: Option<NodeId>,
        context: NodeId,
        name: Option<String>,
        module: Option<String>,
        metadata: NodeMetadata,
    ) -> Result<NodeId, SchemaError> {
        let key = NodeKey {
            document,
            pointer: ptr.clone(),
            parent,
            name: name.clone(),
            metadata,
        };
        if let Some(&id) = self.index.get(&key) {
            return Ok(id);
        }

        let path = pointer::to_fragment(&ptr);
        let fragment = self
            .documents
            .get(document)
            .and_then(|doc| doc.pointer(&ptr))
            .ok_or_else(|| SchemaError::invalid(&path, "no fragment at this location"))?;
        let keywords = Keywords::parse(fragment, &path)?;

        let id = NodeId(self.nodes.len());
        self.nodes.push(SchemaNode {
            id,
            document,
            pointer: ptr,
            parent,
            context,
            name,
            module,
            metadata,
            keywords,
        });
        self.index.insert(key, id);
        Ok(id)
    }

    /// Class name of a node.
    ///
    /// The regularized `name` if set; the configured root name for a root;
    /// the regularized last segment of `$ref` for a reference; otherwise
    /// `None`.
    pub fn classname(&self, id: NodeId) -> Option<String> {
        let node = self.node(id);
        if let Some(name) = &node.name {
            Some(regularize_name(name))
        } else if node.is_root() {
            Some(self.config.root_name.clone())
        } else {
            node.keywords
                .reference
                .as_deref()
                .map(|r| regularize_name(r.rsplit('/').next().unwrap_or(r)))
        }
    }

    /// `module.classname` when a module is set.
    pub fn full_classname(&self, id: NodeId) -> Option<String> {
        let classname = self.classname(id)?;
        Some(match self.node(id).module() {
            Some(module) if !module.is_empty() => format!("{module}.{classname}"),
            _ => classname,
        })
    }

    /// Whether the node has a class name.
    pub fn is_named_object(&self, id: NodeId) -> bool {
        self.classname(id).is_some()
    }

    /// Whether the node sits directly in a definitions table of its context.
    pub fn is_definition(&self, id: NodeId) -> bool {
        let segments = pointer::segments(&self.node(id).pointer);
        segments.len() == 2 && self.config.definition_tags.iter().any(|t| *t == segments[0])
    }

    /// Class name for a node that must name a generated object.
    ///
    /// Anonymous fragments are named after the nearest named ancestor plus
    /// their relative location (`Mark_anyOf_0`, `encoding_items`).
    pub fn inline_name(&self, id: NodeId) -> String {
        if let Some(name) = self.classname(id) {
            return name;
        }
        let node = self.node(id);
        let mut ancestor = node.parent;
        while let Some(a) = ancestor {
            if let Some(base) = self.classname(a) {
                let prefix = &self.node(a).pointer;
                let rest = node.pointer.strip_prefix(prefix.as_str()).unwrap_or(&node.pointer);
                let tail = pointer::segments(rest).join("_");
                return regularize_name(&format!("{base}_{tail}"));
            }
            ancestor = self.node(a).parent;
        }
        regularize_name(&pointer::segments(&node.pointer).join("_"))
    }

    /// Definitions of a node, from every definition tag, in document order.
    pub fn all_definitions(&mut self, id: NodeId) -> Result<Vec<(String, NodeId)>, SchemaError> {
        let tags = self.config.definition_tags.clone();
        let path = self.node(id).path();
        let mut defs: Vec<(String, NodeId)> = Vec::new();
        for tag in &tags {
            let names: Vec<String> = match self.fragment(id).get(tag) {
                None => continue,
                Some(Value::Object(table)) => table.keys().cloned().collect(),
                Some(_) => {
                    return Err(SchemaError::invalid(&path, format!("'{tag}' must be an object")))
                }
            };
            for name in names {
                let child = self.make_child(
                    id,
                    &[tag.as_str(), name.as_str()],
                    Some(name.clone()),
                    NodeMetadata::default(),
                )?;
                // A later tag overrides an earlier one for the same name.
                match defs.iter_mut().find(|(n, _)| *n == name) {
                    Some(slot) => slot.1 = child,
                    None => defs.push((name, child)),
                }
            }
        }
        Ok(defs)
    }

    /// Definition nodes keyed by lower-cased name.
    pub fn wrapped_definitions(&mut self, id: NodeId) -> Result<BTreeMap<String, NodeId>, SchemaError> {
        Ok(self
            .all_definitions(id)?
            .into_iter()
            .map(|(name, child)| (name.to_lowercase(), child))
            .collect())
    }

    /// Property nodes of an object fragment, in schema order.
    ///
    /// Each entry is `(json_name, node)`. The node is named after the
    /// property and carries `required` metadata from the owner.
    pub fn property_nodes(&mut self, id: NodeId) -> Result<Vec<(String, NodeId)>, SchemaError> {
        let keywords = self.node(id).keywords.clone();
        let mut out = Vec::with_capacity(keywords.properties.len());
        for name in &keywords.properties {
            let metadata = NodeMetadata {
                required: keywords.requires(name),
            };
            let child =
                self.make_child(id, &["properties", name.as_str()], Some(name.clone()), metadata)?;
            out.push((name.clone(), child));
        }
        Ok(out)
    }

    /// Property nodes keyed by regularized name.
    pub fn wrapped_properties(&mut self, id: NodeId) -> Result<BTreeMap<String, NodeId>, SchemaError> {
        Ok(self
            .property_nodes(id)?
            .into_iter()
            .map(|(name, child)| (regularize_name(&name), child))
            .collect())
    }

    /// Canonical SHA-256 digest of the node's fragment.
    pub fn schema_hash(&self, id: NodeId) -> Result<SchemaDigest, CanonicalizationError> {
        sperf_core::schema_digest(self.fragment(id))
    }
}
