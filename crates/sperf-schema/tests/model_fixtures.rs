//! Integration test: assemble models from the fixture schemas under
//! `tests/fixtures/` and check classification, merged object shapes,
//! document validation, and agreement with the `jsonschema` crate in
//! draft-04 mode.

use std::path::PathBuf;

use proptest::prelude::*;
use serde_json::{json, Value};
use sperf_core::{MergePolicy, ModelConfig, SchemaError, SperfError};
use sperf_schema::{Category, Model, Outcome};
use sperf_validate::{
    AdditionalProperties, CompositionKind, InstanceType, ObjectRef, Validator, ValidatorKind,
};

/// Find the fixture directory of this crate.
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

fn load(name: &str) -> Value {
    let path = fixtures_dir().join(name);
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    serde_json::from_str(&text).unwrap_or_else(|e| panic!("cannot parse {}: {e}", path.display()))
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn chart() -> Model {
    init_tracing();
    Model::build(load("chart.schema.json"), ModelConfig::default()).expect("chart schema builds")
}

fn draft4(schema: &Value) -> jsonschema::Validator {
    jsonschema::options()
        .with_draft(jsonschema::Draft::Draft4)
        .build(schema)
        .unwrap_or_else(|e| panic!("schema failed to compile: {e}"))
}

/// Named reference as it appears in a property descriptor.
fn named(name: &str) -> Validator {
    Validator::instance_of(InstanceType::Object(ObjectRef::Named(name.into())))
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[test]
fn test_chart_definition_categories() {
    let model = chart();
    let expected = [
        ("Mark", Category::Enum),
        ("Padding", Category::SimpleType),
        ("Opacity", Category::SimpleType),
        ("Color", Category::CompoundType),
        ("Type", Category::Enum),
        ("Field", Category::Object),
        ("Value", Category::Object),
        ("Channel", Category::AnyOfObject),
        ("Encoding", Category::Object),
        ("InlineData", Category::Object),
        ("UrlData", Category::Object),
        ("Data", Category::OneOfObject),
        ("Size", Category::OneOf),
        ("NotNull", Category::Not),
        ("Tags", Category::Array),
        ("Range", Category::Array),
        ("Base", Category::Object),
        ("Layer", Category::AllOfObject),
        ("Config", Category::Object),
        ("Step", Category::SimpleType),
    ];

    let names: Vec<&str> = expected.iter().map(|(n, _)| *n).collect();
    assert_eq!(model.definition_names(), names, "definitions keep document order");

    for (name, category) in expected {
        assert_eq!(model.definition(name).unwrap().category, category, "{name}");
    }
    assert_eq!(model.root.name, "Root");
    assert_eq!(model.root.category, Category::Object);
}

#[test]
fn test_chart_root_properties() {
    let model = chart();
    let root = model.root.outcome.as_object().unwrap();

    assert_eq!(root.property_names()[0], "$schema");
    assert_eq!(root.property("$schema").unwrap().name, "_schema");
    assert!(root.property("mark").unwrap().required);
    assert_eq!(root.additional_properties, AdditionalProperties::Reject);

    let data = &root.property("data").unwrap().validator;
    assert!(data.same_shape(&named("Data")));
    let layer = &root.property("layer").unwrap().validator;
    assert!(layer.same_shape(&Validator::array_of(named("Layer"))));
    let config = &root.property("config").unwrap().validator;
    assert!(config.same_shape(&named("Config")));

    // References to trait-like definitions are transparent.
    assert_eq!(root.property("width").unwrap().validator.category(), "one_of");
    assert_eq!(root.property("background").unwrap().validator.category(), "union");
    assert_eq!(root.property("hidden").unwrap().validator.category(), "not");
    assert!(!root.property("mark").unwrap().validator.allow_undefined);
    assert!(root.property("padding").unwrap().validator.allow_undefined);
}

#[test]
fn test_any_of_object_merge() {
    let model = chart();
    let Outcome::Object(channel) = &model.definition("Channel").unwrap().outcome else {
        panic!("Channel should be an object shape");
    };
    assert_eq!(channel.property_names(), vec!["field", "type", "bin", "value"]);
    assert!(channel.properties.iter().all(|p| !p.required));
    assert_eq!(channel.additional_properties, AdditionalProperties::Reject);

    let composition = channel.composition.as_ref().unwrap();
    assert_eq!(composition.kind, CompositionKind::AnyOf);
    assert_eq!(
        composition.branches,
        vec![ObjectRef::Named("Field".into()), ObjectRef::Named("Value".into())]
    );
}

#[test]
fn test_all_of_object_merge() {
    let model = chart();
    let layer = model.definition("Layer").unwrap().outcome.as_object().unwrap();
    assert_eq!(layer.property_names(), vec!["name", "description", "mark", "encoding"]);
    assert!(layer.property("mark").unwrap().required);
    assert!(!layer.property("name").unwrap().required);

    let composition = layer.composition.as_ref().unwrap();
    assert_eq!(composition.kind, CompositionKind::AllOf);
    assert_eq!(composition.branches[0], ObjectRef::Named("Base".into()));
    assert_eq!(composition.branches[1].name(), "Layer_allOf_1");
}

#[test]
fn test_descriptions_and_base_class() {
    let model = chart();
    let field = model.definition("Field").unwrap().outcome.as_object().unwrap();
    assert_eq!(field.description, "Encode a data field.");
    assert_eq!(field.base_class, "JsonHasTraits");
    match &model.definition("Tags").unwrap().outcome {
        Outcome::Trait(v) => match &v.kind {
            ValidatorKind::Array(c) => assert_eq!(c.max_items, Some(4)),
            other => panic!("expected array, got {other:?}"),
        },
        other => panic!("expected trait, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Document validation
// ---------------------------------------------------------------------------

fn chart_documents() -> Vec<(Value, bool)> {
    vec![
        (json!({"mark": "bar"}), true),
        (
            json!({
                "$schema": "https://example.com/chart.json",
                "mark": "line",
                "data": {"values": [{"a": 1}, {"a": 2}]},
                "encoding": {
                    "x": {"field": "a", "type": "quantitative"},
                    "y": {"value": 3},
                    "color": {"field": "c", "type": "nominal", "bin": false},
                    "opacity": 0.5
                },
                "width": 300,
                "padding": 5,
                "background": null,
                "tags": ["a", "b"],
                "domain": [0, 10],
                "config": {"anything": true},
                "step": 2.5,
                "hidden": "yes"
            }),
            true,
        ),
        (
            json!({
                "mark": "point",
                "width": "container",
                "data": {"url": "data/cars.json"},
                "layer": [
                    {"mark": "area", "name": "bottom"},
                    {"mark": "bar", "encoding": {"y": {"value": "red"}}, "description": "top"}
                ]
            }),
            true,
        ),
        (json!({}), false),
        (json!("chart"), false),
        (json!({"mark": "pie"}), false),
        (json!({"mark": "bar", "extra": 1}), false),
        (json!({"mark": "bar", "encoding": {"x": {"field": "a"}}}), false),
        (
            json!({"mark": "bar", "encoding": {"x": {"field": "a", "type": "ordinal", "value": 1}}}),
            false,
        ),
        (json!({"mark": "bar", "encoding": {"x": {"field": "", "type": "nominal"}}}), false),
        (json!({"mark": "bar", "encoding": {"opacity": 1.5}}), false),
        (json!({"mark": "bar", "encoding": {"size": {"value": 1}}}), false),
        (json!({"mark": "bar", "data": {"values": [{}], "url": "x"}}), false),
        (json!({"mark": "bar", "data": {"values": []}}), false),
        (json!({"mark": "bar", "data": {}}), false),
        (json!({"mark": "bar", "width": -1}), false),
        (json!({"mark": "bar", "width": 2.5}), false),
        (json!({"mark": "bar", "width": "auto"}), true),
        (json!({"mark": "bar", "tags": ["a", "b", "c", "d", "e"]}), false),
        (json!({"mark": "bar", "tags": []}), true),
        (json!({"mark": "bar", "domain": [0, "x"]}), false),
        (json!({"mark": "bar", "domain": [0, 1, "extra"]}), true),
        (json!({"mark": "bar", "layer": [{"name": "no mark"}]}), false),
        (json!({"mark": "bar", "config": []}), false),
        (json!({"mark": "bar", "step": 0}), false),
        (json!({"mark": "bar", "step": 0.75}), false),
        (json!({"mark": "bar", "step": 0.5}), true),
        (json!({"mark": "bar", "background": 3}), false),
        (json!({"mark": "bar", "padding": -1}), false),
        (json!({"mark": "bar", "hidden": null}), false),
    ]
}

#[test]
fn test_chart_documents() {
    let model = chart();
    for (doc, expected) in chart_documents() {
        let result = model.validate(&doc);
        assert_eq!(result.is_ok(), expected, "{doc}: {result:?}");
    }
}

#[test]
fn test_chart_documents_agree_with_draft4() {
    let reference = draft4(&load("chart.schema.json"));
    for (doc, expected) in chart_documents() {
        assert_eq!(reference.is_valid(&doc), expected, "jsonschema disagrees on {doc}");
    }
}

#[test]
fn test_validation_error_locations() {
    let model = chart();
    let cases = [
        (json!({}), "required", "/mark"),
        (json!({"mark": "bar", "extra": 1}), "additionalProperties", "/extra"),
        (json!({"mark": "bar", "encoding": {"opacity": 1.5}}), "maximum", "/encoding/opacity"),
        (json!({"mark": "bar", "tags": ["a", "b", "c", "d", "e"]}), "maxItems", "/tags"),
        (json!({"mark": "bar", "domain": [0, "x"]}), "type", "/domain/1"),
        (json!({"mark": "bar", "data": {"values": [{}], "url": "x"}}), "oneOf", "/data"),
        (json!({"mark": "bar", "layer": [{"name": "n"}]}), "required", "/layer/0/mark"),
        (json!({"mark": "bar", "step": 0.75}), "multipleOf", "/step"),
        (json!({"mark": "bar", "hidden": null}), "not", "/hidden"),
    ];
    for (doc, keyword, path) in cases {
        let err = model.validate(&doc).unwrap_err();
        assert_eq!(err.keyword(), keyword, "{doc}: {err}");
        assert_eq!(err.path(), path, "{doc}: {err}");
    }
}

#[test]
fn test_recursive_schemas() {
    init_tracing();
    let schema = load("recursive.schema.json");
    let model = Model::build(schema.clone(), ModelConfig::default()).unwrap();
    for name in ["Tree", "Dict", "List"] {
        assert_eq!(model.definition(name).unwrap().category, Category::Object, "{name}");
    }

    let reference = draft4(&schema);
    let docs = [
        (json!({"tree": {"label": "root"}}), true),
        (
            json!({"tree": {"label": "a", "children": [{"label": "b", "children": [{"label": "c"}]}]}}),
            true,
        ),
        (json!({"tree": {"label": "a", "children": [{"children": []}]}}), false),
        (json!({"dict": {"a": {"b": {"c": {}}}}}), true),
        (json!({"dict": {"a": {"b": 1}}}), false),
        (json!({"list": {"head": 1, "tail": {"head": 2, "tail": {"head": 3}}}}), true),
        (json!({"list": {"head": 1, "tail": {"head": "2"}}}), false),
        (json!({"list": {"head": 1, "tail": {"head": 2, "next": null}}}), false),
    ];
    for (doc, expected) in docs {
        assert_eq!(model.validate(&doc).is_ok(), expected, "{doc}");
        assert_eq!(reference.is_valid(&doc), expected, "jsonschema disagrees on {doc}");
    }

    let err = model.validate(&json!({"dict": {"a": {"b": 1}}})).unwrap_err();
    assert_eq!(err.path(), "/dict/a/b");
}

#[test]
fn test_union_schemas() {
    init_tracing();
    let schema = load("unions.schema.json");
    let model = Model::build(schema.clone(), ModelConfig::default()).unwrap();
    let expected = [
        ("Item", Category::AnyOfObject),
        ("Shape", Category::OneOfObject),
        ("Layer", Category::Object),
        ("Unit", Category::Object),
    ];
    for (name, category) in expected {
        assert_eq!(model.definition(name).unwrap().category, category, "{name}");
    }

    let reference = draft4(&schema);
    let docs = [
        (json!({"item": {"kind": "a", "x": "s"}}), true),
        // "x" is only constrained by the branch that does not apply.
        (json!({"item": {"kind": "b", "x": 5}}), true),
        (json!({"item": {"kind": "a", "x": 5}}), false),
        (json!({"item": {"kind": "b", "y": "1"}}), false),
        (json!({"item": {"kind": "c"}}), false),
        (json!({"item": "a"}), false),
        (json!({"shape": {"id": "s", "radius": 1}}), true),
        (json!({"shape": {"id": "s", "radius": 1, "side": "wide"}}), true),
        (json!({"shape": {"id": "s", "radius": "r", "side": 2}}), true),
        (json!({"shape": {"radius": 1}}), false),
        (json!({"shape": {"id": "s"}}), false),
        (json!({"shape": {"id": "s", "radius": "r"}}), false),
        (json!({"layer": {"name": "top"}}), true),
        (
            json!({"layer": {"name": "top", "layer": [
                {"mark": "bar"},
                {"name": "inner", "layer": [{"mark": "line"}, {"layer": []}]}
            ]}}),
            true,
        ),
        (json!({"layer": {"layer": [{"name": 3}]}}), false),
        (json!({"layer": {"layer": [{"layer": [{"name": 1}]}]}}), false),
        (json!({"layer": {"layer": [5]}}), false),
    ];
    for (doc, expected) in docs {
        assert_eq!(model.validate(&doc).is_ok(), expected, "{doc}");
        assert_eq!(reference.is_valid(&doc), expected, "jsonschema disagrees on {doc}");
    }

    let err = model.validate(&json!({"item": {"kind": "a", "x": 5}})).unwrap_err();
    assert_eq!(err.keyword(), "anyOf");
    assert_eq!(err.path(), "/item");
    let err = model.validate(&json!({"shape": {"radius": 1}})).unwrap_err();
    assert_eq!(err.keyword(), "required");
    assert_eq!(err.path(), "/shape/id");
}

// ---------------------------------------------------------------------------
// Structural errors and merge policies
// ---------------------------------------------------------------------------

#[test]
fn test_cyclic_all_of_fixture_fails() {
    let err = Model::build(load("cyclic_allof.schema.json"), ModelConfig::default()).unwrap_err();
    match err {
        SperfError::Schema(SchemaError::CyclicReference { reference, chain }) => {
            assert!(reference.starts_with("#/definitions/Loop"), "{reference}");
            assert!(chain.iter().any(|c| c == "#/definitions/Loop"), "{chain:?}");
        }
        other => panic!("expected a cyclic reference, got {other:?}"),
    }
}

#[test]
fn test_conflict_rejected_by_default() {
    let err = Model::build(load("conflict.schema.json"), ModelConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        SperfError::Schema(SchemaError::ConflictingComposition { ref path, ref property })
            if path == "#/definitions/Both" && property == "label"
    ));
}

#[test]
fn test_conflict_policies_from_config_files() {
    init_tracing();
    let last = ModelConfig::from_path(fixtures_dir().join("last_write_wins.yaml")).unwrap();
    assert_eq!(last.merge_policy, MergePolicy::LastWriteWins);
    let first = ModelConfig::from_path(fixtures_dir().join("first_write_wins.json")).unwrap();
    assert_eq!(first.merge_policy, MergePolicy::FirstWriteWins);

    for (config, winner) in [(last, "integer"), (first, "string")] {
        let model = Model::build(load("conflict.schema.json"), config).unwrap();
        assert_eq!(model.root.name, "Conflicts");

        let both = model.definition("Both").unwrap();
        let def = both.outcome.as_object().unwrap();
        assert_eq!(def.property_names(), vec!["label", "count"]);
        let label = def.property("label").unwrap();
        assert!(label.required, "required is the union across allOf branches");
        assert_eq!(label.validator.category(), winner);
    }

    let model = Model::build(
        load("conflict.schema.json"),
        ModelConfig::from_path(fixtures_dir().join("last_write_wins.yaml")).unwrap(),
    )
    .unwrap();
    assert_eq!(model.definition("Both").unwrap().qualified_name, "fixtures.conflict.Both");
}

// ---------------------------------------------------------------------------
// Property-based agreement for trait-like definitions
// ---------------------------------------------------------------------------

const TRAIT_DEFINITIONS: &[&str] = &[
    "Mark", "Padding", "Opacity", "Color", "Type", "Size", "NotNull", "Tags", "Range", "Step",
];

fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        (-5i64..300).prop_map(Value::from),
        (-20i32..20).prop_map(|n| json!(f64::from(n) + 0.5)),
        (-20i32..20).prop_map(|n| json!(f64::from(n) + 0.25)),
        prop::sample::select(vec!["", "a", "bar", "auto", "container", "ordinal"]).prop_map(Value::from),
    ];
    leaf.prop_recursive(2, 8, 5, |inner| prop::collection::vec(inner, 0..6).prop_map(Value::Array))
}

proptest! {
    #[test]
    fn trait_definitions_agree_with_draft4(
        value in arb_value(),
        index in 0..TRAIT_DEFINITIONS.len(),
    ) {
        let name = TRAIT_DEFINITIONS[index];
        let schema = load("chart.schema.json");
        let model = Model::build(schema.clone(), ModelConfig::default()).unwrap();

        let mut by_ref = json!({"$ref": format!("#/definitions/{name}")});
        by_ref["definitions"] = schema["definitions"].clone();
        let reference = draft4(&by_ref);

        prop_assert_eq!(
            model.validate_definition(name, &value).is_ok(),
            reference.is_valid(&value),
            "{} on {}", name, value
        );
    }
}
