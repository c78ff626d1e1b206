use std::io::Write;

use financehub_engine::config::{Settings, DEFAULT_CHUNK_SIZE, DEFAULT_UTC_OFFSET_MINUTES};
use financehub_engine::Engine;

fn toml_file(contents: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::Builder::new()
        .prefix("financehub-")
        .suffix(".toml")
        .tempfile()
        .unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    f.flush().unwrap();
    f
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let s = Settings::load_from("definitely-missing-financehub-config").unwrap();
    assert_eq!(s.collection, "files");
    assert_eq!(s.ingest.chunk_size, DEFAULT_CHUNK_SIZE);
    assert_eq!(s.ingest.utc_offset_minutes, DEFAULT_UTC_OFFSET_MINUTES);
    assert!(s.ingest.rollback_partial_writes);
    assert_eq!(s.query.default_page_size, 10);
}

#[test]
fn file_values_override_defaults() {
    let f = toml_file(
        r#"
collection = "positions"

[ingest]
chunk_size = 250
rollback_partial_writes = false
"#,
    );
    let s = Settings::load_from(f.path().to_str().unwrap()).unwrap();
    assert_eq!(s.collection, "positions");
    assert_eq!(s.ingest.chunk_size, 250);
    assert!(!s.ingest.rollback_partial_writes);
    // Untouched keys keep their defaults.
    assert_eq!(s.ingest.utc_offset_minutes, DEFAULT_UTC_OFFSET_MINUTES);
    assert_eq!(s.query.default_page_size, 10);

    let engine = Engine::in_memory(&s).unwrap();
    assert_eq!(engine.ingestor().options().chunk_size, 250);
}

#[test]
fn invalid_values_are_rejected() {
    let f = toml_file("[ingest]\nchunk_size = 0\n");
    assert!(Settings::load_from(f.path().to_str().unwrap()).is_err());

    let f = toml_file("[ingest]\nutc_offset_minutes = 100000\n");
    assert!(Settings::load_from(f.path().to_str().unwrap()).is_err());
}
