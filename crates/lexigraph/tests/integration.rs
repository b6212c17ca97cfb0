//! Black-box tests for the `QueryEngine` facade: every entry point
//! wired through one type against a shared store, the way a caller of
//! this crate (rather than its sub-crates) would actually use it.

use std::sync::Arc;

use chrono::TimeZone;
use lexigraph::prelude::*;
use lexigraph::{query, VersionInfo, VersionStatus};

fn date(y: i32, m: u32, d: u32) -> chrono::DateTime<chrono::Utc> {
    chrono::Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

fn engine() -> QueryEngine {
    let store = Arc::new(TripleStore::new());
    store.add(Triple::new("<GDPR:Art17>", "rdf:type", "<reg:Article>"));
    store.add(Triple::new("<GDPR:Art17>", "<reg:title>", "\"Right to erasure\""));
    store.add(Triple::new("<GDPR:Art6>", "rdf:type", "<reg:Article>"));
    store.add(Triple::new("<GDPR:Art6>", "<reg:title>", "\"Lawfulness of processing\""));
    store.add(Triple::new("<GDPR:Art17>", "<reg:references>", "<GDPR:Art6>"));

    let engine = QueryEngine::new(store);
    engine.temporal_store().add_version(
        "<GDPR:Art17>",
        VersionInfo {
            uri: "<GDPR:Art17>".to_string(),
            version: 1,
            valid_from: date(2018, 5, 25),
            valid_until: None,
            status: VersionStatus::Active,
            meeting_uri: None,
            supersedes_uri: None,
        },
    );
    engine
}

#[test]
fn select_via_string_entry_point_matches_typed_entry_point() {
    let engine = engine();
    let by_string = engine
        .execute_select_str("SELECT ?a WHERE { ?a rdf:type <reg:Article> . }")
        .unwrap();

    let parsed = query::parse("SELECT ?a WHERE { ?a rdf:type <reg:Article> . }").unwrap();
    let by_query = engine.executor().execute_select(&parsed).unwrap();

    assert_eq!(by_string.count, by_query.count);
    assert_eq!(by_string.bindings, by_query.bindings);
}

#[test]
fn construct_entry_point_rewrites_triples() {
    let engine = engine();
    let result = engine
        .execute_construct_str(
            "CONSTRUCT { ?a <reg:isArticle> <true> . } WHERE { ?a rdf:type <reg:Article> . }",
        )
        .unwrap();
    assert_eq!(result.count, 2);
    assert!(result
        .triples
        .iter()
        .all(|t| t.predicate == "<reg:isArticle>" && t.object == "<true>"));
}

#[test]
fn describe_entry_point_follows_incoming_and_outgoing_edges() {
    let engine = engine();
    let result = engine.execute_describe_str("DESCRIBE <GDPR:Art6>").unwrap();
    assert!(result
        .triples
        .iter()
        .any(|t| t.subject == "<GDPR:Art17>" && t.predicate == "<reg:references>"));
}

#[test]
fn as_of_excludes_provisions_not_yet_in_force() {
    let engine = engine();
    let query = query::parse("SELECT ?a WHERE { ?a rdf:type <reg:Article> . }").unwrap();

    let before_gdpr = engine.execute_as_of(&query, date(2015, 1, 1)).unwrap();
    assert_eq!(before_gdpr.count, 1); // Art6 has no recorded history, so it is kept

    let after_gdpr = engine.execute_as_of(&query, date(2020, 1, 1)).unwrap();
    assert_eq!(after_gdpr.count, 2);
}

#[test]
fn provisions_in_force_at_returns_bare_subject_list() {
    let engine = engine();
    let query = query::parse("SELECT ?a WHERE { ?a rdf:type <reg:Article> . }").unwrap();
    let active = engine.provisions_in_force_at(&query, date(2022, 1, 1)).unwrap();
    assert_eq!(active, vec!["<GDPR:Art17>".to_string()]);
}

#[test]
fn get_versions_reflects_store_shared_with_query_path() {
    let engine = engine();
    let versions = engine.get_versions("<GDPR:Art17>");
    assert_eq!(versions.versions.len(), 1);
    assert_eq!(versions.versions[0].status, VersionStatus::Active);
}

#[test]
fn amendments_and_average_adoption_time_default_to_empty_without_data() {
    let engine = engine();
    assert!(engine.amendments_adopted_in_range(date(2000, 1, 1), date(2030, 1, 1)).is_empty());
    let average = engine.average_time_to_adoption();
    assert_eq!(average.sample_size, 0);
    assert_eq!(average.average_days, None);
}

#[test]
fn validate_surfaces_unbound_construct_template_variable() {
    let parsed = query::parse(
        "CONSTRUCT { ?a <reg:title> ?missing . } WHERE { ?a rdf:type <reg:Article> . }",
    )
    .unwrap();
    let errors = query::validate(&parsed);
    assert!(errors.iter().any(|e| e.contains("missing")));
}

#[test]
fn version_constant_matches_cargo_package_version() {
    assert_eq!(lexigraph::VERSION, env!("CARGO_PKG_VERSION"));
}
