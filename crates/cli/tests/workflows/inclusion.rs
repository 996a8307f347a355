//! Inclusion and clear passes through the CLI

use crate::common::{labelled_records, TestEnv, OWNER};
use crate::ltree;
use anyhow::Result;
use cli_lib::store::FileStore;
use lt_core::{validate, Dimension, OwnerId};

#[test]
fn test_include_replaces_foreign_tree() -> Result<()> {
    let env = TestEnv::new()?;
    let file = env.write_records("tree.json", &labelled_records())?;
    ltree!(env, "import", OWNER, &file.to_string_lossy()).assert_success()?;

    let result = ltree!(env, "include", OWNER, "A1,A2", "A1").assert_success()?;
    assert!(result.contains_stdout("Duplicates:"));

    let tree = FileStore::open(env.store_path())?.tree(&OwnerId::new(OWNER))?;
    assert!(validate(&tree).is_ok());
    assert_eq!(tree.len(), 4);

    let catch_all = tree
        .iter()
        .find(|node| node.dimension == Dimension::item_id_others())
        .unwrap();
    assert!(catch_all.negative);
    for key in ["A1", "A2"] {
        let unit = tree
            .iter()
            .find(|node| node.dimension == Dimension::item_id(key))
            .unwrap();
        assert!(!unit.negative);
        assert_eq!(unit.bid_micros, Some(200_000));
    }
    Ok(())
}

#[test]
fn test_include_extends_existing_inclusion() -> Result<()> {
    let env = TestEnv::new()?;
    ltree!(env, "include", OWNER, "A1").assert_success()?;
    ltree!(env, "include", OWNER, "A1", "A2").assert_success()?;

    let tree = FileStore::open(env.store_path())?.tree(&OwnerId::new(OWNER))?;
    assert_eq!(tree.len(), 4);
    Ok(())
}

#[test]
fn test_clear_asks_for_confirmation() -> Result<()> {
    let env = TestEnv::new()?;
    ltree!(env, "include", OWNER, "A1").assert_success()?;

    let result = ltree!(env, "clear", OWNER).stdin("n\n").assert_success()?;
    assert!(result.contains_stdout("Cancelled"));
    assert!(!FileStore::open(env.store_path())?
        .records(&OwnerId::new(OWNER))
        .is_empty());

    let result = ltree!(env, "clear", OWNER, "-y").assert_success()?;
    assert!(result.contains_stdout("Removed tree (3 nodes)"));
    assert!(FileStore::open(env.store_path())?
        .records(&OwnerId::new(OWNER))
        .is_empty());

    let result = ltree!(env, "clear", OWNER, "-y").assert_success()?;
    assert!(result.contains_stdout("No tree stored"));
    Ok(())
}
