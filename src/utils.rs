use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

use crate::error::{AppError, Result};

/// Get data directory from environment variable or use default
pub fn get_data_dir() -> PathBuf {
    std::env::var("B3_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

/// Read a numeric environment variable, falling back to `default` when unset or invalid
pub fn env_or<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, default = %default, "Invalid environment value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

/// Initialize the global tracing subscriber (RUST_LOG, default "info")
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .try_init();
}

/// Serialize `value` as pretty JSON and replace `path` atomically.
///
/// Writes `<path>.tmp` first and renames it over the target, so readers see either the
/// old document or the new one, never a truncated file.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Persistence(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }
    }

    let tmp_path = tmp_path_for(path);
    std::fs::write(&tmp_path, json).map_err(|e| {
        AppError::Persistence(format!("Failed to write {}: {}", tmp_path.display(), e))
    })?;

    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        AppError::Persistence(format!("Failed to replace {}: {}", path.display(), e))
    })
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_json_atomic_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("doc.json");

        write_json_atomic(&path, &vec![1, 2, 3]).unwrap();
        write_json_atomic(&path, &vec![4]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<i32> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, vec![4]);
        assert!(!tmp_path_for(&path).exists());
    }

    #[test]
    fn test_env_or_falls_back_on_garbage() {
        std::env::set_var("B3_TEST_ENV_OR_GARBAGE", "not-a-number");
        assert_eq!(env_or("B3_TEST_ENV_OR_GARBAGE", 7u64), 7);
        std::env::set_var("B3_TEST_ENV_OR_GARBAGE", " 12 ");
        assert_eq!(env_or("B3_TEST_ENV_OR_GARBAGE", 7u64), 12);
        std::env::remove_var("B3_TEST_ENV_OR_GARBAGE");
        assert_eq!(env_or("B3_TEST_ENV_OR_GARBAGE", 7u64), 7);
    }
}
