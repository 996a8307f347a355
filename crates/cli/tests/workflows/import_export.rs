//! Import, export and show

use crate::common::{labelled_records, record, TestEnv, OWNER};
use crate::ltree;
use anyhow::Result;
use lt_core::{Dimension, NodeKind, NodeRecord};

#[test]
fn test_import_then_export_roundtrip() -> Result<()> {
    let env = TestEnv::new()?;
    let file = env.write_records("tree.json", &labelled_records())?;

    let result = ltree!(env, "import", OWNER, &file.to_string_lossy()).assert_success()?;
    assert!(result.contains_stdout("Imported 5 nodes"));

    let result = ltree!(env, "export", OWNER).assert_success()?;
    let exported: Vec<NodeRecord> = serde_json::from_str(&result.stdout)?;
    assert_eq!(exported, labelled_records());
    Ok(())
}

#[test]
fn test_import_rejects_invalid_tree() -> Result<()> {
    let env = TestEnv::new()?;
    let records = vec![record(1, None, NodeKind::Subdivision, Dimension::Root)];
    let file = env.write_records("bad.json", &records)?;

    let result = ltree!(env, "import", OWNER, &file.to_string_lossy()).assert_failure()?;
    assert!(result.contains_stderr("is invalid"));
    assert!(!env.store_path().exists());
    Ok(())
}

#[test]
fn test_import_rejects_dangling_parent() -> Result<()> {
    let env = TestEnv::new()?;
    let records = vec![
        record(1, None, NodeKind::Subdivision, Dimension::Root),
        record(2, Some(9), NodeKind::Unit, Dimension::item_id_others()),
    ];
    let file = env.write_records("dangling.json", &records)?;

    let result = ltree!(env, "import", OWNER, &file.to_string_lossy()).assert_failure()?;
    assert!(result.contains_stderr("do not form a tree"));
    Ok(())
}

#[test]
fn test_show_lists_owners_and_outline() -> Result<()> {
    let env = TestEnv::new()?;

    let result = ltree!(env, "show").assert_success()?;
    assert!(result.contains_stdout("No trees stored"));

    let file = env.write_records("tree.json", &labelled_records())?;
    ltree!(env, "import", OWNER, &file.to_string_lossy()).assert_success()?;

    let result = ltree!(env, "show").assert_success()?;
    assert!(result.contains_stdout(OWNER));
    assert!(result.contains_stdout("(5 nodes)"));

    let result = ltree!(env, "show", OWNER).assert_success()?;
    assert!(result.contains_stdout("Structure valid (5 nodes)"));
    assert!(result.contains_stdout("Custom Attr 0: a"));
    Ok(())
}
