//! Property Selection State
//!
//! The selected GA4 property is remembered between runs in a small TOML file
//! at `paths.state_file`.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyState {
    pub property_id: String,
    pub display_name: Option<String>,
    pub selected_at: DateTime<Utc>,
}

impl PropertyState {
    pub fn new(property: &str, display_name: Option<String>) -> Result<Self> {
        Ok(Self {
            property_id: normalize_property_id(property)?,
            display_name,
            selected_at: Utc::now(),
        })
    }

    /// Read the saved selection; a missing file means nothing is selected.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read property state: {}", path.display()))?;
        let state = toml::from_str(&content)
            .with_context(|| format!("Failed to parse property state: {}", path.display()))?;
        Ok(Some(state))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create state directory: {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize property state")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write property state: {}", path.display()))?;

        info!(property_id = %self.property_id, path = %path.display(), "Property selected");
        Ok(())
    }

    /// Remove the saved selection. Returns whether anything was removed.
    pub fn clear(path: &Path) -> Result<bool> {
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(path)
            .with_context(|| format!("Failed to remove property state: {}", path.display()))?;
        Ok(true)
    }
}

/// Accept `123456` or `properties/123456` and return the numeric id.
pub fn normalize_property_id(property: &str) -> Result<String> {
    let id = property.trim();
    let id = id.strip_prefix("properties/").unwrap_or(id);
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        bail!("Invalid property id '{}': expected digits or properties/<digits>", property);
    }
    Ok(id.to_string())
}

/// Pick the active property: an explicit id first, then the saved selection.
pub fn resolve_property(explicit: Option<&str>, state_file: &Path) -> Result<String> {
    if let Some(property) = explicit {
        return normalize_property_id(property);
    }
    match PropertyState::load(state_file)? {
        Some(state) => Ok(state.property_id),
        None => bail!("No property selected. Run `ga4-report select <property>` or pass --property"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_normalize_property_id() {
        assert_eq!(normalize_property_id("123").unwrap(), "123");
        assert_eq!(normalize_property_id(" properties/456 ").unwrap(), "456");
        assert!(normalize_property_id("properties/").is_err());
        assert!(normalize_property_id("abc").is_err());
    }

    #[test]
    fn test_save_load_clear() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("state.toml");

        assert!(PropertyState::load(&path).unwrap().is_none());

        let state = PropertyState::new("properties/42", Some("Shop".to_string())).unwrap();
        state.save(&path).unwrap();
        assert_eq!(PropertyState::load(&path).unwrap(), Some(state));

        assert!(PropertyState::clear(&path).unwrap());
        assert!(!PropertyState::clear(&path).unwrap());
    }

    #[test]
    fn test_resolve_property_prefers_explicit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.toml");

        assert!(resolve_property(None, &path).is_err());
        PropertyState::new("7", None).unwrap().save(&path).unwrap();
        assert_eq!(resolve_property(None, &path).unwrap(), "7");
        assert_eq!(resolve_property(Some("properties/9"), &path).unwrap(), "9");
    }
}
