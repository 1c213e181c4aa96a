//! JSON persistence of cycle counters between CLI runs
//!
//! The library never persists `CycleState` on its own; the binary opts in
//! with `--state FILE` so that successive `yc next` calls keep advancing.

use std::fs;
use std::path::Path;

use eyre::{Context, Result};
use tracing::debug;

use crate::cycle::CycleState;

/// Read counters from `path`, or start fresh if it does not exist
pub fn load(path: &Path) -> Result<CycleState> {
    debug!(?path, "state_file::load: called");
    if !path.exists() {
        debug!("state_file::load: no state file, starting fresh");
        return Ok(CycleState::new());
    }

    let content = fs::read_to_string(path).context(format!("Failed to read state file {}", path.display()))?;
    let state = serde_json::from_str(&content).context(format!("Failed to parse state file {}", path.display()))?;
    Ok(state)
}

/// Write counters to `path`, creating parent directories as needed
pub fn save(path: &Path, state: &CycleState) -> Result<()> {
    debug!(?path, "state_file::save: called");
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).context("Failed to create state directory")?;
    }

    let content = serde_json::to_string_pretty(state)?;
    fs::write(path, content).context(format!("Failed to write state file {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_fresh_state() {
        let temp = TempDir::new().unwrap();
        let state = load(&temp.path().join("state.json")).unwrap();
        assert_eq!(state, CycleState::new());
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let images = temp.path().join("cats");
        fs::create_dir(&images).unwrap();
        fs::write(images.join("a.png"), "").unwrap();

        let mut state = CycleState::new();
        state.next_image("cats", temp.path()).unwrap();
        state.next_image("cats", temp.path()).unwrap();

        let path = temp.path().join("nested").join("state.json");
        save(&path, &state).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded.peek("cats"), 2);
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state.json");
        fs::write(&path, "{not json").unwrap();
        assert!(load(&path).is_err());
    }
}
