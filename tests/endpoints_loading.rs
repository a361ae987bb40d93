//! Integration tests for endpoints file loading across all file formats.

use purgecast::broadcast::registry::Endpoint;
use purgecast::config::sources::parse_endpoints_str;
use purgecast::config::validation::validate;

fn load_demo(name: &str) -> String {
    let path = format!("demo/{name}");
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("failed to read {path}: {e}"))
}

fn expected() -> Vec<Endpoint> {
    vec![
        Endpoint::new("varnish-0.cache.svc.cluster.local", "6081"),
        Endpoint::new("varnish-1.cache.svc.cluster.local", "6081"),
        Endpoint::new("10.20.0.14", "8080"),
    ]
}

#[test]
fn yaml_demo_loads_and_validates() {
    let content = load_demo("endpoints.yaml");
    let file = parse_endpoints_str("yaml", &content, "endpoints.yaml").unwrap();
    validate(&file).unwrap();
    assert_eq!(file.endpoints, expected());
}

#[cfg(feature = "json")]
#[test]
fn json_demo_loads_and_validates() {
    let content = load_demo("endpoints.json");
    let file = parse_endpoints_str("json", &content, "endpoints.json").unwrap();
    validate(&file).unwrap();
    assert_eq!(file.endpoints, expected());
}

#[cfg(feature = "toml")]
#[test]
fn toml_demo_loads_and_validates() {
    let content = load_demo("endpoints.toml");
    let file = parse_endpoints_str("toml", &content, "endpoints.toml").unwrap();
    validate(&file).unwrap();
    assert_eq!(file.endpoints, expected());
}

#[test]
fn unknown_fields_are_rejected() {
    let content = "endpoints:\n  - host: a\n    port: 80\n    weight: 3\n";
    assert!(parse_endpoints_str("yaml", content, "endpoints.yaml").is_err());
}

#[test]
fn missing_endpoints_key_means_no_endpoints() {
    let file = parse_endpoints_str("yaml", "{}\n", "endpoints.yaml").unwrap();
    validate(&file).unwrap();
    assert!(file.endpoints.is_empty());
}

#[test]
fn invalid_entries_are_all_reported() {
    let content = "endpoints:\n  - host: \"\"\n    port: 80\n  - host: b\n    port: 99999\n";
    let file = parse_endpoints_str("yaml", content, "endpoints.yaml").unwrap();
    let errors = validate(&file).unwrap_err();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].entry, "endpoints[0]");
    assert_eq!(errors[1].entry, "endpoints[1]");
}
