use robotctl_config::{ConfigError, ConfigStore};
use tempfile::TempDir;

#[test]
fn set_persist_reload_round_trip() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("robotrc");

    let mut store = ConfigStore::load(&path)?;
    assert!(store.is_empty(), "missing file should load as empty store");

    store.set("login", "username", "robot")?;
    store.set("login", "password", "secret")?;
    store.set("rescue", "k", "v")?;
    store.persist(&path)?;

    let reloaded = ConfigStore::load(&path)?;
    assert_eq!(reloaded.get("rescue", "k"), Some("v"));
    assert_eq!(reloaded.get("login", "username"), Some("robot"));
    assert_eq!(reloaded, store);
    Ok(())
}

#[test]
fn unsetting_last_key_drops_section_after_reload() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("robotrc");

    let mut store = ConfigStore::new();
    store.set("login", "username", "robot")?;
    store.set("rescue", "k", "v")?;
    store.persist(&path)?;

    let mut store = ConfigStore::load(&path)?;
    assert_eq!(store.unset("rescue", "k").as_deref(), Some("v"));
    store.persist(&path)?;

    let reloaded = ConfigStore::load(&path)?;
    assert_eq!(reloaded.sections().collect::<Vec<_>>(), vec!["login"]);
    assert!(!std::fs::read_to_string(&path)?.contains("[rescue]"));
    Ok(())
}

#[test]
fn persist_creates_parent_directories_and_replaces_file() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("nested").join("robotrc");
    std::fs::create_dir_all(dir.path().join("nested"))?;
    std::fs::write(&path, "[old]\nkey = value\n")?;

    let mut store = ConfigStore::new();
    store.set("login", "username", "robot")?;
    store.persist(&path)?;

    assert_eq!(
        std::fs::read_to_string(&path)?,
        "[login]\nusername = robot\n"
    );
    let leftovers = std::fs::read_dir(dir.path().join("nested"))?.count();
    assert_eq!(leftovers, 1, "temp file should have been renamed into place");
    Ok(())
}

#[cfg(unix)]
#[test]
fn persisted_file_is_private() -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new()?;
    let path = dir.path().join("robotrc");
    let mut store = ConfigStore::new();
    store.set("login", "password", "secret")?;
    store.persist(&path)?;

    let mode = std::fs::metadata(&path)?.permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
    Ok(())
}

#[test]
fn malformed_file_reports_its_path() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("robotrc");
    std::fs::write(&path, "[login]\nnot a pair\n")?;

    let err = ConfigStore::load(&path).expect_err("parse should fail");
    assert!(matches!(err, ConfigError::Parse { line: 2, .. }));
    assert!(err.to_string().contains("robotrc:2"));
    Ok(())
}
