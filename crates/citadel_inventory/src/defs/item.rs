//! Item definition schema.

use serde::Deserialize;

use crate::error::{DefinitionError, DefinitionResult};
use crate::model::EquipSlot;

/// Footprint in grid cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Size {
    /// Width.
    pub w: u8,
    /// Height.
    pub h: u8,
}

impl Default for Size {
    fn default() -> Self {
        Self { w: 1, h: 1 }
    }
}

/// Stacking mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackMode {
    /// Every instance is its own item.
    #[default]
    None,
    /// Instances of the same type merge up to `max`.
    Stack,
}

/// Stacking behaviour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StackDef {
    /// Mode.
    pub mode: StackMode,
    /// Maximum quantity per instance.
    pub max: u32,
}

impl Default for StackDef {
    fn default() -> Self {
        Self {
            mode: StackMode::None,
            max: 1,
        }
    }
}

/// Where an item may be placed.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Allowed {
    /// May be held in the hand.
    pub hand: bool,
    /// May be placed in grids.
    pub grid: bool,
    /// Equipment slots the item fits.
    pub equipment_slots: Vec<EquipSlot>,
}

impl Default for Allowed {
    fn default() -> Self {
        Self {
            hand: true,
            grid: true,
            equipment_slots: Vec::new(),
        }
    }
}

/// Allow/deny constraints for items placed inside a nested container.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContentRules {
    /// If non-empty, the item needs at least one of these tags.
    pub allow_tags: Vec<String>,
    /// Any of these tags forbids the item.
    pub deny_tags: Vec<String>,
    /// If non-empty, only these keys are accepted.
    pub allow_item_keys: Vec<String>,
    /// These keys are always rejected.
    pub deny_item_keys: Vec<String>,
}

impl ContentRules {
    /// Checks an item against the rules.
    ///
    /// Order: denied keys, key whitelist, denied tags, tag whitelist.
    /// A non-empty key whitelist decides on its own.
    #[must_use]
    pub fn accepts(&self, item: &ItemDef) -> bool {
        if self.deny_item_keys.iter().any(|k| *k == item.key) {
            return false;
        }
        // A key whitelist is decisive: tag rules are not consulted.
        if !self.allow_item_keys.is_empty() {
            return self.allow_item_keys.iter().any(|k| *k == item.key);
        }
        if item.tags.iter().any(|t| self.deny_tags.contains(t)) {
            return false;
        }
        if !self.allow_tags.is_empty() && !item.tags.iter().any(|t| self.allow_tags.contains(t)) {
            return false;
        }
        true
    }
}

/// Nested inventory capability of a container item.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContainerDef {
    /// Grid size of the nested container.
    pub size: Size,
    /// Content rules.
    #[serde(default)]
    pub rules: ContentRules,
}

/// Resources chosen by nested-inventory state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NestedInventoryVisual {
    /// Resource when the nested container has items.
    pub has_items: String,
    /// Resource when it is empty.
    pub empty: String,
}

/// Visual rules for deriving an item's resource.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Visual {
    /// Nested-inventory driven resource.
    pub nested_inventory: Option<NestedInventoryVisual>,
}

/// A single item definition.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemDef {
    /// Numeric definition id, stored on instances as `type_id`.
    pub def_id: u32,
    /// Unique string key.
    pub key: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Free-form tags used by content rules.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Footprint.
    #[serde(default)]
    pub size: Size,
    /// Stacking.
    #[serde(default)]
    pub stack: StackDef,
    /// Placement permissions.
    #[serde(default)]
    pub allowed: Allowed,
    /// Base resource; defaults to the key.
    #[serde(default)]
    pub resource: String,
    /// Derived resource rules.
    #[serde(default)]
    pub visual: Visual,
    /// Present when the item owns a nested container.
    #[serde(default)]
    pub container: Option<ContainerDef>,
}

impl ItemDef {
    /// Resource for the current nested-container state.
    ///
    /// Falls back to the base resource when no visual rule applies.
    #[must_use]
    pub fn resolve_resource(&self, has_nested_items: bool) -> &str {
        if let Some(nested) = &self.visual.nested_inventory {
            if has_nested_items && !nested.has_items.is_empty() {
                return &nested.has_items;
            }
            if !has_nested_items && !nested.empty.is_empty() {
                return &nested.empty;
            }
        }
        &self.resource
    }

    /// Returns true for stackable definitions.
    #[inline]
    #[must_use]
    pub fn is_stackable(&self) -> bool {
        self.stack.mode == StackMode::Stack
    }

    /// Fills derived defaults.
    pub(crate) fn apply_defaults(&mut self) {
        if self.resource.is_empty() {
            self.resource.clone_from(&self.key);
        }
    }

    /// Checks field ranges.
    pub(crate) fn validate(&self) -> DefinitionResult<()> {
        let invalid = |reason: &str| DefinitionError::Invalid {
            key: self.key.clone(),
            reason: reason.to_string(),
        };
        if self.def_id == 0 {
            return Err(invalid("def_id must be > 0"));
        }
        if self.key.is_empty() {
            return Err(invalid("key is required"));
        }
        if self.size.w == 0 || self.size.h == 0 {
            return Err(invalid("size must be at least 1x1"));
        }
        if self.stack.mode == StackMode::Stack && self.stack.max < 2 {
            return Err(invalid("stack.max must be >= 2 for stackable items"));
        }
        if let Some(container) = &self.container {
            if container.size.w == 0 || container.size.h == 0 {
                return Err(invalid("container.size must be at least 1x1"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(src: &str) -> ItemDef {
        toml::from_str(src).unwrap()
    }

    #[test]
    fn test_defaults() {
        let mut item = def("def_id = 1\nkey = \"stone\"");
        item.apply_defaults();
        assert_eq!(item.size, Size { w: 1, h: 1 });
        assert!(item.allowed.hand);
        assert!(item.allowed.grid);
        assert!(item.allowed.equipment_slots.is_empty());
        assert_eq!(item.resource, "stone");
        assert!(!item.is_stackable());
    }

    #[test]
    fn test_resolve_resource() {
        let mut item = def(
            r#"
def_id = 2
key = "seed_bag"
visual = { nested_inventory = { has_items = "bag_seed_full", empty = "bag_seed" } }
"#,
        );
        item.apply_defaults();
        assert_eq!(item.resolve_resource(true), "bag_seed_full");
        assert_eq!(item.resolve_resource(false), "bag_seed");
    }

    #[test]
    fn test_resolve_resource_partial_visual() {
        let mut item = def(
            r#"
def_id = 2
key = "seed_bag"
visual = { nested_inventory = { has_items = "bag_seed_full" } }
"#,
        );
        item.apply_defaults();
        assert_eq!(item.resolve_resource(false), "seed_bag");
    }

    #[test]
    fn test_content_rule_order() {
        let seed = def("def_id = 3\nkey = \"seed\"\ntags = [\"seed\", \"plant\"]");
        let rules = ContentRules {
            allow_tags: vec!["seed".into()],
            deny_tags: vec!["plant".into()],
            ..ContentRules::default()
        };
        // deny tags checked before allow tags
        assert!(!rules.accepts(&seed));

        let keyed = ContentRules {
            allow_item_keys: vec!["seed".into()],
            deny_item_keys: vec!["seed".into()],
            ..ContentRules::default()
        };
        assert!(!keyed.accepts(&seed));

        let whitelist = ContentRules {
            allow_item_keys: vec!["other".into()],
            allow_tags: vec!["seed".into()],
            ..ContentRules::default()
        };
        assert!(!whitelist.accepts(&seed));

        let by_key = ContentRules {
            allow_item_keys: vec!["seed".into()],
            deny_tags: vec!["plant".into()],
            ..ContentRules::default()
        };
        assert!(by_key.accepts(&seed));
    }

    #[test]
    fn test_validation() {
        let stack = def("def_id = 4\nkey = \"ore\"\nstack = { mode = \"stack\", max = 1 }");
        assert!(matches!(stack.validate(), Err(DefinitionError::Invalid { .. })));

        let zero = def("def_id = 0\nkey = \"ore\"");
        assert!(zero.validate().is_err());

        let size = def("def_id = 5\nkey = \"ore\"\nsize = { w = 0, h = 1 }");
        assert!(size.validate().is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let parsed: Result<ItemDef, _> = toml::from_str("def_id = 1\nkey = \"x\"\nweight = 3");
        assert!(parsed.is_err());
    }
}
