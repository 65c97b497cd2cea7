use plugin_union_core::{
    CompiledSchema, Expr, FieldTableHandler, Registry, SchemaError, VariantDecl,
};
use plugin_union_manifest::{ExprSpec, HierarchyManifest, ManifestError};
use serde_json::json;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const PLUGINS_YAML: &str = r#"
variants:
  - name: Source
    fields:
      name:
        required: true
        description: Human readable name
  - name: FileSource
    extends: [Source]
    value: file
    fields:
      path:
        required: true
  - name: HttpSource
    extends: [Source]
    value: http
    fields:
      retries:
        default: 3
  - name: Codec
    discriminator_field: format
  - name: JsonCodec
    extends: [Codec]
    value: json
  - name: HttpJson
    extends: [HttpSource, Codec]
    discriminator_field: type
    value: http-json
unions:
  sources:
    hierarchy: Source
  everything:
    or:
      - hierarchy: Source
      - hierarchy: Codec
  http_codecs:
    and:
      - hierarchy: HttpSource
      - hierarchy: Codec
"#;

fn plugins() -> HierarchyManifest {
    HierarchyManifest::from_yaml_str(PLUGINS_YAML).unwrap()
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

#[test]
fn test_yaml_manifest_parses() {
    let manifest = plugins();
    assert_eq!(manifest.variants.len(), 6);
    assert_eq!(manifest.unions.len(), 3);
    assert_eq!(
        manifest.unions["sources"],
        ExprSpec::Hierarchy("Source".into())
    );
    assert!(matches!(&manifest.unions["everything"], ExprSpec::Or(items) if items.len() == 2));
}

#[test]
fn test_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plugins.yml");

    let manifest = plugins();
    manifest.save(&path).unwrap();
    let loaded = HierarchyManifest::load(&path).unwrap();
    assert_eq!(loaded, manifest);
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = HierarchyManifest::load(dir.path().join("absent.yml")).unwrap_err();
    assert!(matches!(err, ManifestError::IoError(_)));
}

// ---------------------------------------------------------------------------
// Declaration and compilation
// ---------------------------------------------------------------------------

#[test]
fn test_sources_compile_to_tagged_union() {
    let mut registry = Registry::new();
    let declared = plugins().declare_into(&mut registry).unwrap();

    let expr = declared.expr("sources").unwrap().clone();
    let schema = registry.compile(&expr, &mut FieldTableHandler).unwrap();
    let CompiledSchema::TaggedUnion(union) = &schema else {
        panic!("expected tagged union, got {schema:?}");
    };
    assert_eq!(union.discriminator, "type");
    assert_eq!(union.len(), 3);

    let parsed = schema
        .validate(&json!({"type": "http", "name": "api"}))
        .unwrap();
    assert_eq!(parsed.variant, declared.id("HttpSource").unwrap());
    assert_eq!(parsed.fields["retries"], json!(3));
}

#[test]
fn test_everything_compiles_to_union_of_unions() {
    let mut registry = Registry::new();
    let declared = plugins().declare_into(&mut registry).unwrap();

    let expr = declared.expr("everything").unwrap().clone();
    let schema = registry.compile(&expr, &mut FieldTableHandler).unwrap();
    assert_eq!(schema.discriminators(), vec!["format", "type"]);
}

#[test]
fn test_intersection_is_direct() {
    let mut registry = Registry::new();
    let declared = plugins().declare_into(&mut registry).unwrap();

    let expr = declared.expr("http_codecs").unwrap().clone();
    let schema = registry.compile(&expr, &mut FieldTableHandler).unwrap();
    let CompiledSchema::Direct { variant, .. } = schema else {
        panic!("expected a direct schema");
    };
    assert_eq!(variant, declared.id("HttpJson").unwrap());
}

#[test]
fn test_late_manifest_rejected_after_compilation() {
    let mut registry = Registry::new();
    let declared = plugins().declare_into(&mut registry).unwrap();
    let expr = declared.expr("sources").unwrap().clone();
    registry.compile(&expr, &mut FieldTableHandler).unwrap();

    let late = HierarchyManifest::from_json_str(
        r#"{"variants": [{"name": "S3Source", "extends": ["Source"], "value": "s3"}]}"#,
    )
    .unwrap();
    let err = late.declare_into(&mut registry).unwrap_err();
    assert!(matches!(
        err,
        ManifestError::Schema(SchemaError::SchemaAlreadyFinalized { .. })
    ));
}

#[test]
fn test_manifest_extends_existing_registry() {
    let mut registry = Registry::new();
    registry.declare(VariantDecl::new("Shape")).unwrap();

    let manifest = HierarchyManifest::from_json_str(
        r#"{
            "variants": [{"name": "Circle", "extends": ["Shape"], "value": "circle"}],
            "unions": {"shapes": {"hierarchy": "Shape"}}
        }"#,
    )
    .unwrap();
    let declared = manifest.declare_into(&mut registry).unwrap();
    assert_eq!(
        declared.expr("shapes").unwrap(),
        &Expr::Hierarchy(registry.lookup("Shape").unwrap())
    );
    assert!(declared.id("Shape").is_none());
    assert!(declared.id("Circle").is_some());
}

#[test]
fn test_unknown_union_member() {
    let manifest = HierarchyManifest::from_json_str(
        r#"{"variants": [{"name": "A"}], "unions": {"u": {"or": [{"hierarchy": "A"}, {"hierarchy": "B"}]}}}"#,
    )
    .unwrap();
    let err = manifest.declare_into(&mut Registry::new()).unwrap_err();
    assert!(matches!(err, ManifestError::UnknownVariant(name) if name == "B"));
}
