// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use std::fs;
use tubedex_catalog::{Catalog, validate_catalog_path};
use tubedex_testkit::{ChannelFaker, catalog_json, temp_catalog_path};

#[test]
fn validate_catalog_path_rejects_uri_forms() {
    assert!(validate_catalog_path("file:channels.json").is_err());
    assert!(validate_catalog_path("https://example.com/channels.json").is_err());
    assert!(validate_catalog_path("channels.json?version=2").is_err());
    assert!(validate_catalog_path("").is_err());
    assert!(validate_catalog_path("/tmp/channels.json").is_ok());
    assert!(validate_catalog_path("relative/channels.json").is_ok());
}

#[test]
fn builtin_catalog_parses_and_validates() -> Result<()> {
    let catalog = Catalog::builtin()?;
    assert!(!catalog.is_empty());
    assert!(
        catalog
            .channels()
            .iter()
            .all(|channel| channel.id.as_str().starts_with("UC"))
    );
    Ok(())
}

#[test]
fn load_round_trips_a_generated_catalog() -> Result<()> {
    let channels = ChannelFaker::new(11).channels(30);
    let (_dir, path) = temp_catalog_path()?;
    fs::write(&path, catalog_json(&channels)?)?;

    let catalog = Catalog::load(&path)?;
    assert_eq!(catalog.channels(), channels.as_slice());
    assert_eq!(catalog.find(&channels[3].id), Some(&channels[3]));
    Ok(())
}

#[test]
fn load_reports_missing_file_with_path() {
    let err = Catalog::load(std::path::Path::new("/nonexistent/channels.json"))
        .err()
        .map(|e| format!("{e:#}"))
        .unwrap_or_default();
    assert!(err.contains("/nonexistent/channels.json"), "got: {err}");
}

#[test]
fn duplicate_ids_are_rejected() {
    let raw = r#"[
        {"id": "UC1", "title": "First", "category": "Tech"},
        {"id": "UC1", "title": "Second", "category": "Tech"}
    ]"#;
    let err = Catalog::from_json(raw)
        .err()
        .map(|e| format!("{e:#}"))
        .unwrap_or_default();
    assert!(err.contains("duplicate channel id UC1"), "got: {err}");
}

#[test]
fn empty_fields_name_the_offending_entry() {
    let missing_title = r#"[{"id": "UC1", "title": "  ", "category": "Tech"}]"#;
    let err = Catalog::from_json(missing_title)
        .err()
        .map(|e| format!("{e:#}"))
        .unwrap_or_default();
    assert!(err.contains("entry 0"), "got: {err}");
    assert!(err.contains("UC1"), "got: {err}");

    let missing_category = r#"[{"id": "UC2", "title": "Ok", "category": ""}]"#;
    let err = Catalog::from_json(missing_category)
        .err()
        .map(|e| format!("{e:#}"))
        .unwrap_or_default();
    assert!(err.contains("empty category"), "got: {err}");
}

#[test]
fn empty_catalog_is_rejected() {
    assert!(Catalog::from_json("[]").is_err());
}

#[test]
fn description_is_optional_in_catalog_files() -> Result<()> {
    let raw = r#"[{"id": "UC1", "title": "No Blurb", "category": "Tech"}]"#;
    let catalog = Catalog::from_json(raw)?;
    assert_eq!(catalog.channels()[0].description, "");
    Ok(())
}

#[test]
fn malformed_json_is_an_error_not_a_panic() {
    assert!(Catalog::from_json("{not json").is_err());
    assert!(Catalog::from_json(r#"{"channels": []}"#).is_err());
}
