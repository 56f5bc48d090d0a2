//! Crafting recipes.
//!
//! Recipes reference items by key and are validated against the
//! [`ItemRegistry`] when loaded, so a bad key fails at startup rather than
//! in the middle of a tick.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use super::registry::ItemRegistry;
use super::DEFINITIONS_VERSION;
use crate::error::{DefinitionError, DefinitionResult};

/// One consumed input.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipeInput {
    /// Item key.
    pub item_key: String,
    /// Units consumed per craft.
    pub count: u32,
    /// Weight of this input in the output quality average.
    #[serde(default = "default_quality_weight")]
    pub quality_weight: u32,
}

const fn default_quality_weight() -> u32 {
    1
}

/// One produced output.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipeOutput {
    /// Item key.
    pub item_key: String,
    /// Units produced per craft.
    pub count: u32,
}

/// A crafting recipe.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Recipe {
    /// Unique key.
    pub key: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Items consumed.
    pub inputs: Vec<RecipeInput>,
    /// Items produced.
    pub outputs: Vec<RecipeOutput>,
}

impl Recipe {
    fn validate(&self, items: &ItemRegistry) -> DefinitionResult<()> {
        let invalid = |reason: String| DefinitionError::Invalid {
            key: self.key.clone(),
            reason,
        };
        if self.key.is_empty() {
            return Err(invalid("key is required".into()));
        }
        if self.inputs.is_empty() {
            return Err(invalid("recipe must have at least one input".into()));
        }
        if self.outputs.is_empty() {
            return Err(invalid("recipe must have at least one output".into()));
        }
        let mut total_weight: u64 = 0;
        for input in &self.inputs {
            if input.count == 0 {
                return Err(invalid(format!("input {} has zero count", input.item_key)));
            }
            if items.get_by_key(&input.item_key).is_none() {
                return Err(invalid(format!("unknown input item {}", input.item_key)));
            }
            total_weight += u64::from(input.quality_weight);
        }
        if total_weight == 0 {
            return Err(invalid("total quality weight must be > 0".into()));
        }
        for output in &self.outputs {
            if output.count == 0 {
                return Err(invalid(format!("output {} has zero count", output.item_key)));
            }
            if items.get_by_key(&output.item_key).is_none() {
                return Err(invalid(format!("unknown output item {}", output.item_key)));
            }
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RecipesFile {
    v: u32,
    #[serde(default)]
    recipes: Vec<Recipe>,
}

/// Read-only lookup of recipes by key.
#[derive(Debug, Default)]
pub struct RecipeRegistry {
    recipes: HashMap<String, Recipe>,
}

impl RecipeRegistry {
    /// Builds a registry, validating every recipe against `items`.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError`] on a duplicate key, an unknown item key or
    /// a zero count.
    pub fn from_recipes(recipes: Vec<Recipe>, items: &ItemRegistry) -> DefinitionResult<Self> {
        let mut map = HashMap::with_capacity(recipes.len());
        for recipe in recipes {
            recipe.validate(items)?;
            if map.contains_key(&recipe.key) {
                return Err(DefinitionError::DuplicateKey(recipe.key));
            }
            map.insert(recipe.key.clone(), recipe);
        }
        Ok(Self { recipes: map })
    }

    /// Parses a TOML recipes file.
    ///
    /// # Errors
    ///
    /// See [`RecipeRegistry::from_recipes`]; also fails on malformed TOML or
    /// an unsupported `v`.
    pub fn from_toml_str(src: &str, items: &ItemRegistry) -> DefinitionResult<Self> {
        let file: RecipesFile =
            toml::from_str(src).map_err(|e| DefinitionError::Parse(e.to_string()))?;
        if file.v != DEFINITIONS_VERSION {
            return Err(DefinitionError::UnsupportedVersion(file.v));
        }
        Self::from_recipes(file.recipes, items)
    }

    /// Loads a TOML recipes file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::Io`] when the file cannot be read.
    pub fn load(path: impl AsRef<Path>, items: &ItemRegistry) -> DefinitionResult<Self> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path).map_err(|e| DefinitionError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let registry = Self::from_toml_str(&src, items)?;
        tracing::info!("Loaded {} recipes from {}", registry.len(), path.display());
        Ok(registry)
    }

    /// Looks up a recipe.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Recipe> {
        self.recipes.get(key)
    }

    /// Number of recipes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    /// Returns true when no recipes are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> ItemRegistry {
        ItemRegistry::from_toml_str(
            "v = 1\n[[items]]\ndef_id = 1\nkey = \"log\"\n[[items]]\ndef_id = 2\nkey = \"plank\"\n",
        )
        .unwrap()
    }

    #[test]
    fn test_load_recipe() {
        let src = r#"
v = 1
[[recipes]]
key = "planks"
inputs = [{ item_key = "log", count = 2 }]
outputs = [{ item_key = "plank", count = 4 }]
"#;
        let registry = RecipeRegistry::from_toml_str(src, &items()).unwrap();
        let recipe = registry.get("planks").unwrap();
        assert_eq!(recipe.inputs[0].quality_weight, 1);
        assert_eq!(recipe.outputs[0].count, 4);
    }

    #[test]
    fn test_unknown_item_rejected() {
        let src = r#"
v = 1
[[recipes]]
key = "bad"
inputs = [{ item_key = "iron", count = 1 }]
outputs = [{ item_key = "plank", count = 1 }]
"#;
        assert!(matches!(
            RecipeRegistry::from_toml_str(src, &items()),
            Err(DefinitionError::Invalid { .. })
        ));
    }

    #[test]
    fn test_zero_weight_rejected() {
        let src = r#"
v = 1
[[recipes]]
key = "bad"
inputs = [{ item_key = "log", count = 1, quality_weight = 0 }]
outputs = [{ item_key = "plank", count = 1 }]
"#;
        assert!(RecipeRegistry::from_toml_str(src, &items()).is_err());
    }

    #[test]
    fn test_empty_outputs_rejected() {
        let src = "v = 1\n[[recipes]]\nkey = \"x\"\ninputs = [{ item_key = \"log\", count = 1 }]\noutputs = []\n";
        assert!(RecipeRegistry::from_toml_str(src, &items()).is_err());
    }
}
