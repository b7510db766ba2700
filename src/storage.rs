// =============================================================================
// Storage — atomic JSON persistence for engine state
// =============================================================================
//
// Grounded directly on `runtime_config.rs`/`policy::config::PolicyConfig`'s
// tmp-then-rename write pattern, generalized to any `Serialize`/`Deserialize`
// payload so open trades, closed-trade history and the macro/GEX caches can
// all be checkpointed the same way across restarts.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{info, warn};

/// Write `value` to `path` as pretty JSON via a tmp file + rename so a crash
/// mid-write never leaves a truncated or partially-written state file.
pub fn save_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    let content = serde_json::to_string_pretty(value).context("failed to serialize state")?;
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, &content)
        .with_context(|| format!("failed to write tmp state to {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("failed to rename tmp state to {}", path.display()))?;
    info!(path = %path.display(), "state saved (atomic)");
    Ok(())
}

/// Load a previously saved state file. Returns `Ok(None)` (not an error) when
/// the file doesn't exist yet, so callers can fall back to a fresh default on
/// first run without special-casing startup.
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Option<T>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read state from {}", path.display()))?;
    match serde_json::from_str(&content) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "state file present but unparsable, ignoring");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        a: i32,
        b: String,
    }

    fn temp_path() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("storage_test_{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn save_then_load_round_trips() {
        let path = temp_path();
        let value = Sample { a: 1, b: "hi".to_string() };
        save_json(&path, &value).unwrap();
        let loaded: Option<Sample> = load_json(&path).unwrap();
        assert_eq!(loaded, Some(value));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn load_missing_file_returns_none() {
        let path = temp_path();
        let loaded: Option<Sample> = load_json(&path).unwrap();
        assert_eq!(loaded, None);
    }

    #[test]
    fn load_corrupt_file_returns_none_not_error() {
        let path = temp_path();
        std::fs::write(&path, "{ not json").unwrap();
        let loaded: Result<Option<Sample>> = load_json(&path);
        assert!(loaded.unwrap().is_none());
        std::fs::remove_file(&path).ok();
    }
}
