//! # Reference Resolver
//!
//! Turns local `$ref` strings (`#`, `#/definitions/Mark`) into schema nodes.
//!
//! ## Resolution
//!
//! `#` designates the context root. Any other reference walks the
//! context root's raw document segment by segment (object keys, or array
//! indices), unescaping `~1` and `~0`. The resolved fragment is wrapped as a
//! child of the *invoking* node, named after the final segment, with the
//! invoker's context and module: a reference resolves relative to the
//! document that contains it.
//!
//! Resolving the same reference twice from the same node yields the same
//! handle, and from different nodes yields nodes with equal [`Origin`]s.
//!
//! ## Cycles
//!
//! Resolution itself never recurses. Callers that follow references
//! recursively (the object-like predicates, classification of trait-like
//! targets) track the fragments they are inside with a [`ResolutionGuard`],
//! which turns re-entry into `SchemaError::CyclicReference`.

use sperf_core::{pointer, SchemaError};
use tracing::trace;

use crate::node::{NodeId, Origin, SchemaArena};

/// Split a local reference into unescaped path segments.
///
/// `#` has no segments; `#/` has the single empty segment. Empty strings, remote references, and
/// anything not starting with `#` fail with `InvalidReferenceFormat`.
pub fn parse_reference(reference: &str) -> Result<Vec<String>, SchemaError> {
    let invalid = || SchemaError::InvalidReferenceFormat {
        reference: reference.to_string(),
    };
    let rest = reference.strip_prefix('#').ok_or_else(invalid)?;
    match rest {
        "" => Ok(Vec::new()),
        _ if rest.starts_with('/') => Ok(pointer::segments(rest)),
        _ => Err(invalid()),
    }
}

impl SchemaArena {
    /// Resolve `reference` on behalf of the node `from`.
    pub fn resolve(&mut self, reference: &str, from: NodeId) -> Result<NodeId, SchemaError> {
        let segments = parse_reference(reference)?;
        let context = self.node(from).context();
        if segments.is_empty() {
            trace!(reference, "resolved to context root");
            return Ok(context);
        }

        let mut cursor = self.document_of(context);
        let mut ptr = String::new();
        for segment in &segments {
            let next = match cursor {
                serde_json::Value::Object(map) => map.get(segment.as_str()),
                serde_json::Value::Array(list) => {
                    segment.parse::<usize>().ok().and_then(|i| list.get(i))
                }
                _ => None,
            };
            cursor = next.ok_or_else(|| SchemaError::UnresolvedReference {
                reference: reference.to_string(),
                segment: segment.clone(),
            })?;
            ptr = pointer::push(&ptr, segment);
        }

        let name = segments.last().cloned();
        trace!(reference, pointer = %ptr, "resolved reference");
        self.make_resolved(from, ptr, name)
    }

    /// Resolve the node's own `$ref`. Returns `None` when it has none.
    pub fn resolve_ref(&mut self, id: NodeId) -> Result<Option<NodeId>, SchemaError> {
        match self.node(id).keywords().reference.clone() {
            Some(reference) => self.resolve(&reference, id).map(Some),
            None => Ok(None),
        }
    }
}

/// Tracks the fragments currently being expanded by a recursive walk.
#[derive(Debug, Default)]
pub struct ResolutionGuard {
    stack: Vec<Origin>,
}

impl ResolutionGuard {
    /// An empty guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `origin` is being expanded.
    pub fn is_resolving(&self, origin: &Origin) -> bool {
        self.stack.contains(origin)
    }

    /// Mark `origin` as in progress. Fails if it already is.
    pub fn enter(&mut self, origin: Origin) -> Result<(), SchemaError> {
        if self.is_resolving(&origin) {
            let mut chain: Vec<String> = self.stack.iter().map(Origin::fragment).collect();
            chain.push(origin.fragment());
            return Err(SchemaError::CyclicReference {
                reference: origin.fragment(),
                chain,
            });
        }
        self.stack.push(origin);
        Ok(())
    }

    /// Mark `origin` as finished.
    pub fn exit(&mut self, origin: &Origin) {
        if let Some(pos) = self.stack.iter().rposition(|o| o == origin) {
            self.stack.remove(pos);
        }
    }

    /// Number of fragments in progress.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sperf_core::ModelConfig;

    fn arena_with(schema: serde_json::Value) -> (SchemaArena, NodeId) {
        let mut arena = SchemaArena::new(ModelConfig::default());
        let root = arena.add_root(schema).unwrap();
        (arena, root)
    }

    #[test]
    fn test_parse_reference_forms() {
        assert!(parse_reference("#").unwrap().is_empty());
        assert_eq!(parse_reference("#/").unwrap(), vec![""]);
        assert_eq!(
            parse_reference("#/definitions/a~1b~0c").unwrap(),
            vec!["definitions", "a/b~c"]
        );
    }

    #[test]
    fn test_parse_reference_rejects_non_local() {
        for bad in ["", "definitions/A", "other.json#/A", "#A", "http://x/y#/A"] {
            assert!(
                matches!(parse_reference(bad), Err(SchemaError::InvalidReferenceFormat { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_hash_resolves_to_context() {
        let (mut arena, root) = arena_with(json!({"properties": {"self": {"$ref": "#"}}}));
        let prop = arena.wrapped_properties(root).unwrap()["self"];
        assert_eq!(arena.resolve_ref(prop).unwrap(), Some(root));
        assert!(matches!(
            arena.resolve("#/", prop),
            Err(SchemaError::UnresolvedReference { segment, .. }) if segment.is_empty()
        ));
    }

    #[test]
    fn test_slash_designates_empty_key() {
        let (mut arena, root) = arena_with(json!({
            "": {"type": "string"},
            "properties": {"blank": {"$ref": "#/"}}
        }));
        let prop = arena.wrapped_properties(root).unwrap()["blank"];
        let target = arena.resolve_ref(prop).unwrap().unwrap();
        assert_ne!(target, root);
        assert_eq!(arena.node(target).pointer(), "/");
    }

    #[test]
    fn test_resolved_node_is_named_and_inherits_context() {
        let (mut arena, root) = arena_with(json!({
            "definitions": {"Color": {"type": "string"}},
            "properties": {"fill": {"$ref": "#/definitions/Color"}}
        }));
        let fill = arena.wrapped_properties(root).unwrap()["fill"];
        let target = arena.resolve_ref(fill).unwrap().unwrap();
        let node = arena.node(target);
        assert_eq!(node.name(), Some("Color"));
        assert_eq!(node.context(), root);
        assert_eq!(node.parent(), Some(fill));
        assert_eq!(node.pointer(), "/definitions/Color");
        assert!(node.keywords().types.is("string"));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let (mut arena, root) = arena_with(json!({
            "definitions": {"A": {"type": "integer"}},
            "properties": {"x": {"$ref": "#/definitions/A"}, "y": {"$ref": "#/definitions/A"}}
        }));
        let props = arena.wrapped_properties(root).unwrap();
        let from_x = arena.resolve_ref(props["x"]).unwrap().unwrap();
        assert_eq!(arena.resolve_ref(props["x"]).unwrap().unwrap(), from_x);

        let from_y = arena.resolve_ref(props["y"]).unwrap().unwrap();
        assert_eq!(arena.node(from_x).origin(), arena.node(from_y).origin());
    }

    #[test]
    fn test_array_index_segments() {
        let (mut arena, root) = arena_with(json!({
            "anyOf": [{"type": "string"}, {"type": "null"}]
        }));
        let target = arena.resolve("#/anyOf/1", root).unwrap();
        assert!(arena.node(target).keywords().types.is("null"));
        assert_eq!(arena.classname(target).as_deref(), Some("_1"));
    }

    #[test]
    fn test_unresolved_segment_reported() {
        let (mut arena, root) = arena_with(json!({"definitions": {}}));
        let err = arena.resolve("#/definitions/Missing", root).unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnresolvedReference {
                reference: "#/definitions/Missing".into(),
                segment: "Missing".into(),
            }
        );
    }

    #[test]
    fn test_non_object_target_rejected() {
        let (mut arena, root) = arena_with(json!({"definitions": {"N": 3}}));
        let err = arena.resolve("#/definitions/N", root).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidSchema { .. }));
    }

    #[test]
    fn test_guard_detects_reentry() {
        let (_, root) = arena_with(json!({}));
        let a = Origin { context: root, pointer: "/definitions/A".into() };
        let b = Origin { context: root, pointer: "/definitions/B".into() };

        let mut guard = ResolutionGuard::new();
        guard.enter(a.clone()).unwrap();
        guard.enter(b.clone()).unwrap();
        assert!(guard.is_resolving(&a));

        match guard.enter(a.clone()).unwrap_err() {
            SchemaError::CyclicReference { reference, chain } => {
                assert_eq!(reference, "#/definitions/A");
                assert_eq!(chain, vec!["#/definitions/A", "#/definitions/B", "#/definitions/A"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }

        guard.exit(&b);
        guard.exit(&a);
        assert_eq!(guard.depth(), 0);
        guard.enter(a).unwrap();
    }
}
