//! Grant list persistence in the assistant's settings file.
//!
//! The grant list lives at `permissions.allow`. Every other key in the file
//! belongs to the user and is preserved on rewrite.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde_json::{Map, Value};
use tracing::debug;

use crate::io::config::write_atomic;

/// Read the grant list. A missing file or missing key is an empty list.
pub fn read_grants(path: &Path) -> Result<Vec<String>> {
    let Some(settings) = read_settings(path)? else {
        return Ok(Vec::new());
    };
    let Some(allow) = settings.get("permissions").and_then(|p| p.get("allow")) else {
        return Ok(Vec::new());
    };
    let list = allow
        .as_array()
        .ok_or_else(|| anyhow!("{}: permissions.allow is not an array", path.display()))?;
    list.iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                anyhow!("{}: permissions.allow holds a non-string", path.display())
            })
        })
        .collect()
}

/// Replace the grant list, keeping the rest of the file intact.
pub fn write_grants(path: &Path, grants: &[String]) -> Result<()> {
    let mut settings = read_settings(path)?.unwrap_or_else(|| Value::Object(Map::new()));
    let root = settings
        .as_object_mut()
        .ok_or_else(|| anyhow!("{}: settings root is not an object", path.display()))?;
    let permissions = root
        .entry("permissions")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| anyhow!("{}: permissions is not an object", path.display()))?;
    permissions.insert(
        "allow".to_string(),
        Value::Array(grants.iter().cloned().map(Value::String).collect()),
    );

    let mut buf = serde_json::to_string_pretty(&settings).context("serialize settings")?;
    buf.push('\n');
    debug!(path = %path.display(), grants = grants.len(), "writing grant list");
    write_atomic(path, &buf)
}

fn read_settings(path: &Path) -> Result<Option<Value>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let value = serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    Ok(Some(value))
}
