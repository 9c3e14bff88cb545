//! Integration test: drive a session over the sample diagram with a
//! directory-backed store.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::PathBuf;

use meridian_core::{Category, ClassifierConfig, MappingMode, SegmentId};
use meridian_io::{
    ClickOutcome, DirSource, FileStore, LoadOutcome, Session, SessionError, write_export,
};

const DIAGRAM: &str = "assets/diagrams/front.svg";

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .to_path_buf()
}

#[test]
fn auto_map_edit_and_reopen() {
    let store_dir = tempfile::tempdir().unwrap();
    let source = DirSource::new(workspace_root());

    let mut session = Session::new(FileStore::new(store_dir.path()), ClassifierConfig::default());
    let outcome = session.open(&source, DIAGRAM).unwrap();
    assert_eq!(outcome, LoadOutcome::Loaded { repaired: false });
    assert_eq!(session.classification().len(), 22);

    session.auto_map().unwrap();
    assert_eq!(session.mapping().total(), 18);

    // Reassign the pericardium bucket to the liver.
    session.select(Category::Liver);
    assert_eq!(session.click("s11"), ClickOutcome::Added(Category::Liver));
    assert!(session.mapping().get(Category::Pericardium).is_empty());
    // The dashed guide line is neutral and cannot be mapped.
    assert_eq!(session.click("s1"), ClickOutcome::Ignored);

    let mut reopened =
        Session::new(FileStore::new(store_dir.path()), ClassifierConfig::default());
    reopened.open(&source, DIAGRAM).unwrap();
    assert_eq!(
        reopened.mapping().get(Category::Liver),
        [SegmentId::from_index(11)]
    );
    assert_eq!(reopened.mapping().total(), 18);
}

#[test]
fn export_file_imports_into_fresh_store() {
    let source = DirSource::new(workspace_root());
    let out_dir = tempfile::tempdir().unwrap();
    let first_store = tempfile::tempdir().unwrap();

    let mut session = Session::new(FileStore::new(first_store.path()), ClassifierConfig::default());
    session.open(&source, DIAGRAM).unwrap();
    session.auto_map().unwrap();
    let path = write_export(out_dir.path(), DIAGRAM, session.mode(), &session.export().unwrap())
        .unwrap();
    assert_eq!(path.file_name().unwrap(), "front-principal-mapping.json");

    let store_dir = tempfile::tempdir().unwrap();
    let mut fresh = Session::new(FileStore::new(store_dir.path()), ClassifierConfig::default());
    fresh.open(&source, DIAGRAM).unwrap();
    assert!(fresh.mapping().is_empty());
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(!fresh.import(&text).unwrap());
    assert_eq!(fresh.mapping(), session.mapping());
}

#[test]
fn auxiliary_modes_refuse_auto_map() {
    let store_dir = tempfile::tempdir().unwrap();
    let mut session = Session::new(FileStore::new(store_dir.path()), ClassifierConfig::default());
    session
        .open(&DirSource::new(workspace_root()), DIAGRAM)
        .unwrap();
    session.switch_mode(MappingMode::Extraordinary);
    assert!(matches!(session.auto_map(), Err(SessionError::AutoMap(_))));
    assert!(session.mapping().is_empty());
}

#[test]
fn missing_diagram_is_reported() {
    let store_dir = tempfile::tempdir().unwrap();
    let mut session = Session::new(FileStore::new(store_dir.path()), ClassifierConfig::default());
    let err = session
        .open(&DirSource::new(workspace_root()), "assets/diagrams/missing.svg")
        .unwrap_err();
    assert!(matches!(err, SessionError::Fetch(_)));
}
