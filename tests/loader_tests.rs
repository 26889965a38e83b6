//! Integration tests for layered configuration loading.
//!
//! Exercises the full pipeline through the public API:
//! - environment classification and environment-specific files
//! - merge precedence across files
//! - environment variable overrides and coercion
//! - required/optional fields, strict mode, and field origins

use configbind::config::{
    ConfigLoader, Configurable, EnvSnapshot, Field, FieldKind, LoaderOptions, Origin, ScalarKind,
    Shape,
};
use configbind::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Database {
    host: String,
    port: u16,
}

impl Configurable for Database {
    fn shape() -> Shape {
        Shape::new()
            .field(Field::string("host"))
            .field(Field::unsigned("port"))
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Server {
    name: String,
    weight: f64,
}

impl Configurable for Server {
    fn shape() -> Shape {
        Shape::new()
            .field(Field::string("name").required())
            .field(Field::float("weight").default(1.0))
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Service {
    name: String,
    debug: bool,
    retries: i64,
    db: Database,
    servers: Vec<Server>,
    labels: BTreeMap<String, String>,
    cache: Option<Database>,
}

impl Configurable for Service {
    fn shape() -> Shape {
        Shape::new()
            .field(Field::string("name").required())
            .field(Field::bool("debug").env("SERVICE_DEBUG"))
            .field(Field::integer("retries").default(3))
            .field(Field::nested::<Database>("db"))
            .field(Field::sequence("servers", FieldKind::record_of::<Server>()))
            .field(Field::map("labels", FieldKind::Scalar(ScalarKind::String)))
            .field(Field::nested::<Database>("cache").optional())
    }
}

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("Failed to write config file");
    path
}

fn loader(environment: &str, prefix: &str, vars: EnvSnapshot) -> ConfigLoader {
    ConfigLoader::with_snapshot(
        LoaderOptions::new().environment(environment).env_prefix(prefix),
        vars,
    )
}

#[test]
fn test_environment_file_and_variable_layering() {
    let temp = TempDir::new().unwrap();
    let base = write(temp.path(), "base.yaml", "db:\n  host: a\n  port: 5432\n");
    write(temp.path(), "base.test.yaml", "db:\n  host: b\n");

    let vars = EnvSnapshot::empty().with("APP_DB_PORT", "9999");
    let (sources, bound) = loader("test", "APP", vars)
        .load_shape(&Shape::new().field(Field::nested::<Database>("db")), &[&base])
        .unwrap();
    assert_eq!(sources.files.len(), 2);

    let db: Database = bound
        .tree
        .pointer("db")
        .map(|tree| serde_json::from_value(tree.to_json()).unwrap())
        .unwrap();
    assert_eq!(db, Database { host: "b".into(), port: 9999 });
}

#[test]
fn test_full_service_load() {
    let temp = TempDir::new().unwrap();
    let base = write(
        temp.path(),
        "service.yml",
        r#"
name: billing
retries: 5
db:
  host: db.internal
  port: "6432"
servers:
  - name: alpha
  - name: beta
    weight: 2
labels:
  team: payments
  tier: 1
"#,
    );
    write(temp.path(), "service.staging.yml", "retries: 7\nlabels:\n  tier: 2\n");

    let vars = EnvSnapshot::empty().with("SERVICE_DEBUG", "yes");
    let service: Service = loader("staging", "SVC", vars).load(&[&base]).unwrap();

    assert_eq!(service.name, "billing");
    assert!(service.debug);
    assert_eq!(service.retries, 7);
    assert_eq!(service.db, Database { host: "db.internal".into(), port: 6432 });
    assert_eq!(
        service.servers,
        vec![
            Server { name: "alpha".into(), weight: 1.0 },
            Server { name: "beta".into(), weight: 2.0 },
        ]
    );
    assert_eq!(service.labels.get("team").map(String::as_str), Some("payments"));
    assert_eq!(service.labels.get("tier").map(String::as_str), Some("2"));
    assert_eq!(service.cache, None);
}

#[test]
fn test_required_field_missing() {
    let temp = TempDir::new().unwrap();
    let base = write(temp.path(), "app.yaml", "retries: 1\n");

    let err = loader("test", "APP", EnvSnapshot::empty())
        .load::<Service, _>(&[&base])
        .unwrap_err();
    match err {
        ConfigError::RequiredFieldMissing { field } => assert_eq!(field, "name"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_required_field_in_sequence_element() {
    let temp = TempDir::new().unwrap();
    let base = write(temp.path(), "app.yaml", "name: x\nservers:\n  - weight: 3\n");

    let err = loader("test", "APP", EnvSnapshot::empty())
        .load::<Service, _>(&[&base])
        .unwrap_err();
    assert_eq!(err.field(), Some("servers.0.name"));
}

#[test]
fn test_required_field_supplied_by_env() {
    let temp = TempDir::new().unwrap();
    let vars = EnvSnapshot::empty().with("APP_NAME", "from-env");
    let service: Service = loader("test", "APP", vars)
        .load(&[temp.path().join("config.yml")])
        .unwrap();

    assert_eq!(service.name, "from-env");
    assert_eq!(service.retries, 3);
    assert_eq!(service.db, Database { host: String::new(), port: 0 });
    assert!(service.servers.is_empty());
}

#[test]
fn test_env_override_beats_file() {
    let temp = TempDir::new().unwrap();
    let base = write(temp.path(), "app.json", r#"{"name": "file", "retries": 2}"#);
    let vars = EnvSnapshot::empty()
        .with("APP_NAME", "env")
        .with("APP_RETRIES", "-4");

    let service: Service = loader("test", "APP", vars).load(&[&base]).unwrap();
    assert_eq!(service.name, "env");
    assert_eq!(service.retries, -4);
}

#[test]
fn test_empty_env_value_is_ignored() {
    let temp = TempDir::new().unwrap();
    let base = write(temp.path(), "app.yaml", "name: file\n");
    let vars = EnvSnapshot::empty().with("APP_NAME", "");

    let service: Service = loader("test", "APP", vars).load(&[&base]).unwrap();
    assert_eq!(service.name, "file");
}

#[test]
fn test_env_type_mismatch() {
    let temp = TempDir::new().unwrap();
    let base = write(temp.path(), "app.yaml", "name: file\n");
    let vars = EnvSnapshot::empty().with("APP_DB_PORT", "not-a-port");

    let err = loader("test", "APP", vars)
        .load::<Service, _>(&[&base])
        .unwrap_err();
    match err {
        ConfigError::TypeMismatch { field, value, .. } => {
            assert_eq!(field, "db.port");
            assert_eq!(value, "not-a-port");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_disabled_prefix_ignores_variables() {
    let temp = TempDir::new().unwrap();
    let base = write(temp.path(), "app.yaml", "name: file\n");
    let vars = EnvSnapshot::empty()
        .with("APP_NAME", "env")
        .with("SERVICE_DEBUG", "true");

    let service: Service = ConfigLoader::with_snapshot(
        LoaderOptions::new().environment("test").disable_env(),
        vars,
    )
    .load(&[&base])
    .unwrap();
    assert_eq!(service.name, "file");
    assert!(!service.debug);
}

#[test]
fn test_example_fallback() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "app.example.yaml", "name: sample\n");
    let requested = temp.path().join("app.yaml");

    let report = loader("test", "APP", EnvSnapshot::empty())
        .load_report::<Service, _>(&[&requested])
        .unwrap();
    assert_eq!(report.config.name, "sample");
    assert_eq!(report.files.len(), 1);

    let err = ConfigLoader::with_snapshot(
        LoaderOptions::new()
            .environment("test")
            .example_fallback(false),
        EnvSnapshot::empty(),
    )
    .load::<Service, _>(&[&requested])
    .unwrap_err();
    assert!(matches!(err, ConfigError::RequiredFieldMissing { .. }));
}

#[test]
fn test_strict_mode_rejects_unknown_keys() {
    let temp = TempDir::new().unwrap();
    let base = write(temp.path(), "app.yaml", "name: x\ndb:\n  hots: typo\n");

    let lenient: Service = loader("test", "APP", EnvSnapshot::empty())
        .load(&[&base])
        .unwrap();
    assert_eq!(lenient.db.host, "");

    let err = ConfigLoader::with_snapshot(
        LoaderOptions::new().environment("test").strict(true),
        EnvSnapshot::empty(),
    )
    .load::<Service, _>(&[&base])
    .unwrap_err();
    match err {
        ConfigError::UnknownKey { path } => assert_eq!(path, "db.hots"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_field_origins() {
    let temp = TempDir::new().unwrap();
    let base = write(temp.path(), "app.yaml", "name: x\ndb:\n  host: h\n");
    let vars = EnvSnapshot::empty().with("SERVICE_DEBUG", "0");

    let report = loader("test", "APP", vars)
        .load_report::<Service, _>(&[&base])
        .unwrap();
    assert_eq!(report.bound.origin("name"), Some(&Origin::File));
    assert_eq!(
        report.bound.origin("debug"),
        Some(&Origin::Env("SERVICE_DEBUG".into()))
    );
    assert_eq!(report.bound.origin("retries"), Some(&Origin::Default));
    assert_eq!(report.bound.origin("db.port"), Some(&Origin::Zero));
}

#[test]
fn test_yaml_merge_keys_and_case_insensitive_lookup() {
    let temp = TempDir::new().unwrap();
    let base = write(
        temp.path(),
        "app.yaml",
        r#"
defaults: &defaults
  host: shared
  port: 1
Name: merged
DB:
  <<: *defaults
  port: 2
"#,
    );

    let service: Service = loader("test", "APP", EnvSnapshot::empty())
        .load(&[&base])
        .unwrap();
    assert_eq!(service.name, "merged");
    assert_eq!(service.db, Database { host: "shared".into(), port: 2 });
}

#[test]
fn test_yaml_float_into_string_field_is_rejected() {
    let temp = TempDir::new().unwrap();
    let base = write(temp.path(), "app.yaml", "name: 1.10\n");

    let err = loader("test", "APP", EnvSnapshot::empty())
        .load::<Service, _>(&[&base])
        .unwrap_err();
    assert_eq!(err.field(), Some("name"));

    let quoted = write(temp.path(), "quoted.yaml", "name: \"1.10\"\n");
    let service: Service = loader("test", "APP", EnvSnapshot::empty())
        .load(&[&quoted])
        .unwrap();
    assert_eq!(service.name, "1.10");
}

#[test]
fn test_unsigned_max_from_environment() {
    #[derive(Debug, Serialize, Deserialize)]
    struct Quota {
        max_bytes: u64,
    }

    impl Configurable for Quota {
        fn shape() -> Shape {
            Shape::new().field(Field::unsigned("max_bytes"))
        }
    }

    let temp = TempDir::new().unwrap();
    let vars = EnvSnapshot::empty().with("APP_MAX_BYTES", "18446744073709551615");
    let quota: Quota = loader("test", "APP", vars)
        .load(&[temp.path().join("quota.yaml")])
        .unwrap();
    assert_eq!(quota.max_bytes, u64::MAX);
}
