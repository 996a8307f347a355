//! Exclusion passes through the CLI

use crate::common::{labelled_records, TestEnv, OWNER};
use crate::ltree;
use anyhow::Result;
use cli_lib::store::FileStore;
use lt_core::{validate, Dimension, OwnerId, PartitionTree};

fn stored_tree(env: &TestEnv) -> Result<PartitionTree> {
    FileStore::open(env.store_path())?.tree(&OwnerId::new(OWNER))
}

fn find<'t>(tree: &'t PartitionTree, dimension: &Dimension) -> Option<&'t lt_core::PartitionNode> {
    tree.iter().find(|node| &node.dimension == dimension)
}

#[test]
fn test_exclude_bootstraps_empty_store() -> Result<()> {
    let env = TestEnv::new()?;

    let result = ltree!(env, "exclude", OWNER, "--label", "A", "Z1", "Z2").assert_success()?;
    assert!(result.contains_stdout("Applied 1 batches"));

    let tree = stored_tree(&env)?;
    assert!(validate(&tree).is_ok());
    assert!(find(&tree, &Dimension::item_id("Z1")).is_some_and(|node| node.negative));
    assert!(find(&tree, &Dimension::item_id("Z2")).is_some_and(|node| node.negative));
    assert!(tree
        .iter()
        .any(|node| node.dimension.value() == Some("promo") && node.negative));
    Ok(())
}

#[test]
fn test_exclude_twice_is_a_no_op() -> Result<()> {
    let env = TestEnv::new()?;

    ltree!(env, "exclude", OWNER, "--label", "b", "Z1").assert_success()?;
    let before = FileStore::open(env.store_path())?.records(&OwnerId::new(OWNER));

    let result = ltree!(env, "exclude", OWNER, "--label", "b", "Z1").assert_success()?;
    assert!(result.contains_stdout("Already up to date"));

    let after = FileStore::open(env.store_path())?.records(&OwnerId::new(OWNER));
    assert_eq!(before, after);
    Ok(())
}

#[test]
fn test_exclude_converts_existing_tree() -> Result<()> {
    let env = TestEnv::new()?;
    let file = env.write_records("tree.json", &labelled_records())?;
    ltree!(env, "import", OWNER, &file.to_string_lossy()).assert_success()?;

    ltree!(env, "exclude", OWNER, "--label", "a", "X1,X2;X1").assert_success()?;

    let tree = stored_tree(&env)?;
    assert!(validate(&tree).is_ok());
    let catch_all = find(&tree, &Dimension::item_id_others()).unwrap();
    assert_eq!(catch_all.bid_micros, Some(100_000));
    assert!(find(&tree, &Dimension::item_id("X1")).is_some_and(|node| node.negative));
    assert_eq!(
        tree.iter()
            .filter(|node| node.dimension == Dimension::item_id("X1"))
            .count(),
        1
    );
    Ok(())
}

#[test]
fn test_unknown_label_is_skipped() -> Result<()> {
    let env = TestEnv::new()?;

    let result = ltree!(env, "exclude", OWNER, "--label", "Gold", "Z1").assert_success()?;
    assert!(result.contains_stdout("Skipped"));
    assert!(result.contains_stdout("gold"));
    assert!(!env.store_path().exists());
    Ok(())
}

#[test]
fn test_plan_json_does_not_write() -> Result<()> {
    let env = TestEnv::new()?;
    let file = env.write_records("tree.json", &labelled_records())?;
    ltree!(env, "import", OWNER, &file.to_string_lossy()).assert_success()?;

    let result =
        ltree!(env, "plan", "exclude", OWNER, "--label", "a", "X1", "--json").assert_success()?;
    let plan = result.json()?;
    assert_eq!(plan["mode"], "exclusive");
    assert_eq!(plan["replaces_root"], true);
    assert!(plan["report"]["creations"].as_u64().unwrap() > 0);
    assert_eq!(plan["report"]["added"], 1);

    let records = FileStore::open(env.store_path())?.records(&OwnerId::new(OWNER));
    assert_eq!(records, labelled_records());
    Ok(())
}

#[test]
fn test_exclude_requires_ids() -> Result<()> {
    let env = TestEnv::new()?;
    let result = ltree!(env, "exclude", OWNER, "--label", "a").assert_failure()?;
    assert!(result.contains_stderr("required"));
    Ok(())
}
