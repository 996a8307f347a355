//! Config subcommands

use crate::common::TestEnv;
use crate::ltree;
use anyhow::Result;

#[test]
fn test_get_reads_file_and_defaults() -> Result<()> {
    let env = TestEnv::new()?;

    let result = ltree!(env, "config", "get", "executor.max_attempts").assert_success()?;
    assert_eq!(result.stdout.trim(), "3");

    let result = ltree!(env, "config", "get", "planner.allowed_labels").assert_success()?;
    assert_eq!(result.stdout.trim(), "a,b,c");
    Ok(())
}

#[test]
fn test_set_persists() -> Result<()> {
    let env = TestEnv::new()?;

    ltree!(env, "config", "set", "executor.max_attempts", "5").assert_success()?;
    let result = ltree!(env, "config", "get", "executor.max_attempts").assert_success()?;
    assert_eq!(result.stdout.trim(), "5");

    let text = std::fs::read_to_string(env.config_path())?;
    assert!(text.contains("max_attempts = 5"));
    Ok(())
}

#[test]
fn test_set_rejects_invalid_values() -> Result<()> {
    let env = TestEnv::new()?;

    ltree!(env, "config", "set", "executor.max_attempts", "0").assert_failure()?;
    ltree!(env, "config", "set", "planner.label_index", "1").assert_failure()?;
    let result = ltree!(env, "config", "set", "planner.nope", "1").assert_failure()?;
    assert!(result.contains_stderr("Unknown config key"));
    Ok(())
}

#[test]
fn test_path_and_example() -> Result<()> {
    let env = TestEnv::new()?;

    let result = ltree!(env, "config", "path").assert_success()?;
    assert!(result.contains_stdout("config.toml"));

    let result = ltree!(env, "config", "example").assert_success()?;
    assert!(result.contains_stdout("[planner]"));
    assert!(result.contains_stdout("[executor]"));
    Ok(())
}
