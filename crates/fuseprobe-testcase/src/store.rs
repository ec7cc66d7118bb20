//! JSON persistence for pipeline artifacts.

use std::fs;
use std::path::Path;

use fuseprobe_common::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::spec::TestCases;

/// Read a JSON document.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let text = fs::read_to_string(path)
        .map_err(|source| StoreError::Io { path: path.to_path_buf(), source })?;
    serde_json::from_str(&text).map_err(|source| StoreError::Json { path: path.to_path_buf(), source })
}

/// Write `value` as pretty JSON, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let io = |source: std::io::Error| StoreError::Io { path: path.to_path_buf(), source };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io)?;
    }
    let text = serde_json::to_string_pretty(value)
        .map_err(|source| StoreError::Json { path: path.to_path_buf(), source })?;
    fs::write(path, text + "\n").map_err(io)
}

pub fn load_test_cases(path: &Path) -> Result<TestCases, StoreError> {
    read_json(path)
}

/// Save `cases`, merged over whatever the file already holds.
///
/// Rules in `cases` replace stored rules of the same name in place; stored
/// rules not in `cases` are kept. Returns the merged map that was written.
pub fn save_test_cases(path: &Path, cases: &TestCases) -> Result<TestCases, StoreError> {
    let mut merged = if path.exists() { load_test_cases(path)? } else { TestCases::new() };
    for (name, case) in cases {
        merged.insert(name.clone(), case.clone());
    }
    write_json(path, &merged)?;
    tracing::debug!(path = %path.display(), rules = merged.len(), "test cases saved");
    Ok(merged)
}

/// Drop `rules` from the test cases stored at `path`.
///
/// A missing file holds nothing to drop. Returns how many rules were removed.
pub fn evict_test_cases(path: &Path, rules: &[&str]) -> Result<usize, StoreError> {
    if !path.exists() {
        return Ok(0);
    }
    let mut cases = load_test_cases(path)?;
    let before = cases.len();
    cases.retain(|name, _| !rules.contains(&name.as_str()));
    let removed = before - cases.len();
    if removed > 0 {
        write_json(path, &cases)?;
        tracing::debug!(path = %path.display(), removed, "stale test cases evicted");
    }
    Ok(removed)
}
