//! Item definition registry.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use super::item::ItemDef;
use super::DEFINITIONS_VERSION;
use crate::error::{DefinitionError, DefinitionResult};

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ItemsFile {
    v: u32,
    #[serde(default)]
    #[allow(dead_code)]
    source: String,
    #[serde(default)]
    items: Vec<ItemDef>,
}

/// Read-only lookup of item definitions by id and key.
#[derive(Debug, Default)]
pub struct ItemRegistry {
    defs: Vec<ItemDef>,
    by_id: HashMap<u32, usize>,
    by_key: HashMap<String, usize>,
}

impl ItemRegistry {
    /// Builds a registry, applying defaults and validating every definition.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError`] on an invalid field or a duplicate id/key.
    pub fn from_defs(defs: Vec<ItemDef>) -> DefinitionResult<Self> {
        let mut registry = Self {
            defs: Vec::with_capacity(defs.len()),
            by_id: HashMap::with_capacity(defs.len()),
            by_key: HashMap::with_capacity(defs.len()),
        };
        for mut def in defs {
            def.apply_defaults();
            def.validate()?;
            if registry.by_id.contains_key(&def.def_id) {
                return Err(DefinitionError::DuplicateId(def.def_id));
            }
            if registry.by_key.contains_key(&def.key) {
                return Err(DefinitionError::DuplicateKey(def.key));
            }
            let index = registry.defs.len();
            registry.by_id.insert(def.def_id, index);
            registry.by_key.insert(def.key.clone(), index);
            registry.defs.push(def);
        }
        Ok(registry)
    }

    /// Parses a TOML items file.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::Parse`] on malformed TOML and
    /// [`DefinitionError::UnsupportedVersion`] when `v` is not 1.
    pub fn from_toml_str(src: &str) -> DefinitionResult<Self> {
        let file: ItemsFile =
            toml::from_str(src).map_err(|e| DefinitionError::Parse(e.to_string()))?;
        if file.v != DEFINITIONS_VERSION {
            return Err(DefinitionError::UnsupportedVersion(file.v));
        }
        Self::from_defs(file.items)
    }

    /// Loads a TOML items file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::Io`] when the file cannot be read, or any
    /// error of [`ItemRegistry::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> DefinitionResult<Self> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path).map_err(|e| DefinitionError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let registry = Self::from_toml_str(&src)?;
        tracing::info!(
            "Loaded {} item definitions from {}",
            registry.len(),
            path.display()
        );
        Ok(registry)
    }

    /// Looks up a definition by numeric id.
    #[must_use]
    pub fn get(&self, def_id: u32) -> Option<&ItemDef> {
        self.by_id.get(&def_id).map(|&i| &self.defs[i])
    }

    /// Looks up a definition by key.
    #[must_use]
    pub fn get_by_key(&self, key: &str) -> Option<&ItemDef> {
        self.by_key.get(key).map(|&i| &self.defs[i])
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Returns true when no definitions are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// All definitions in load order.
    pub fn iter(&self) -> impl Iterator<Item = &ItemDef> {
        self.defs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::StackMode;
    use crate::model::EquipSlot;

    const ITEMS: &str = r#"
v = 1
source = "test"

[[items]]
def_id = 1
key = "stone"
stack = { mode = "stack", max = 10 }

[[items]]
def_id = 2
key = "helmet"
size = { w = 2, h = 2 }
allowed = { hand = false, equipment_slots = ["head"] }
"#;

    #[test]
    fn test_load_and_lookup() {
        let registry = ItemRegistry::from_toml_str(ITEMS).unwrap();
        assert_eq!(registry.len(), 2);

        let stone = registry.get_by_key("stone").unwrap();
        assert_eq!(stone.def_id, 1);
        assert_eq!(stone.stack.mode, StackMode::Stack);

        let helmet = registry.get(2).unwrap();
        assert!(!helmet.allowed.hand);
        assert!(helmet.allowed.grid);
        assert_eq!(helmet.allowed.equipment_slots, vec![EquipSlot::Head]);

        assert!(registry.get(99).is_none());
        assert!(registry.get_by_key("missing").is_none());
    }

    #[test]
    fn test_duplicate_id() {
        let src = "v = 1\n[[items]]\ndef_id = 1\nkey = \"a\"\n[[items]]\ndef_id = 1\nkey = \"b\"\n";
        assert_eq!(
            ItemRegistry::from_toml_str(src).unwrap_err(),
            DefinitionError::DuplicateId(1)
        );
    }

    #[test]
    fn test_duplicate_key() {
        let src = "v = 1\n[[items]]\ndef_id = 1\nkey = \"a\"\n[[items]]\ndef_id = 2\nkey = \"a\"\n";
        assert_eq!(
            ItemRegistry::from_toml_str(src).unwrap_err(),
            DefinitionError::DuplicateKey("a".into())
        );
    }

    #[test]
    fn test_unsupported_version() {
        assert_eq!(
            ItemRegistry::from_toml_str("v = 2").unwrap_err(),
            DefinitionError::UnsupportedVersion(2)
        );
    }

    #[test]
    fn test_missing_file() {
        let err = ItemRegistry::load("/nonexistent/items.toml").unwrap_err();
        assert!(matches!(err, DefinitionError::Io { .. }));
    }
}
