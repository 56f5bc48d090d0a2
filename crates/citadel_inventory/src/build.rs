//! Build sites: construction objects fed with materials from the hand.
//!
//! A site lists required slots, each matched by item key or, when no key is
//! set, by tag. A put moves as many units as the first unfilled matching
//! slot still needs. There is no swap or merge and nothing comes back out;
//! the destination ref is `(site_id, BuildSlot, 0)`.

use citadel_core::{EntityId, WorldPosition};
use serde::{Deserialize, Serialize};

use crate::command::MoveSpec;
use crate::defs::ItemDef;
use crate::error::{InventoryError, InventoryResult};
use crate::model::{ContainerKind, ContainerRef};
use crate::nested::push_closed_ref;
use crate::service::{InventoryService, OperationOutcome, UpdateSet};
use crate::validation::Validator;

/// Units of one key and quality put into a slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutStack {
    /// Item definition key.
    pub item_key: String,
    /// Quality of the units.
    pub quality: u32,
    /// Number of units.
    pub count: u32,
}

/// One material slot of a build site.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequirement {
    /// Exact item key; takes precedence over `item_tag`.
    pub item_key: Option<String>,
    /// Any item carrying this tag.
    pub item_tag: Option<String>,
    /// Units needed in total.
    pub required: u32,
    /// Units already consumed by construction progress.
    pub built: u32,
    /// Units waiting in the slot.
    pub put: Vec<PutStack>,
}

impl BuildRequirement {
    /// Slot filled by a specific item key.
    #[must_use]
    pub fn by_key(item_key: impl Into<String>, required: u32) -> Self {
        Self {
            item_key: Some(item_key.into()),
            required,
            ..Self::default()
        }
    }

    /// Slot filled by any item with a tag.
    #[must_use]
    pub fn by_tag(item_tag: impl Into<String>, required: u32) -> Self {
        Self {
            item_tag: Some(item_tag.into()),
            required,
            ..Self::default()
        }
    }

    /// Units currently put into the slot.
    #[must_use]
    pub fn put_count(&self) -> u32 {
        self.put
            .iter()
            .fold(0u32, |acc, stack| acc.saturating_add(stack.count))
    }

    /// Units the slot still accepts.
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.required
            .saturating_sub(self.put_count().saturating_add(self.built))
    }

    /// Returns true if `def` may fill this slot.
    #[must_use]
    pub fn matches(&self, def: &ItemDef) -> bool {
        match (self.item_key.as_deref(), self.item_tag.as_deref()) {
            (Some(key), _) if !key.is_empty() => key == def.key,
            (_, Some(tag)) if !tag.is_empty() => def.tags.iter().any(|t| t == tag),
            _ => false,
        }
    }

    fn merge_put(&mut self, item_key: &str, quality: u32, count: u32) {
        match self
            .put
            .iter_mut()
            .find(|s| s.item_key == item_key && s.quality == quality)
        {
            Some(stack) => stack.count = stack.count.saturating_add(count),
            None => self.put.push(PutStack {
                item_key: item_key.to_string(),
                quality,
                count,
            }),
        }
    }
}

/// A construction site in the world.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildSite {
    /// Site location, used for the reach check.
    pub position: WorldPosition,
    /// Material slots, filled in order.
    pub requirements: Vec<BuildRequirement>,
}

impl BuildSite {
    /// Creates a site with no requirements.
    #[must_use]
    pub fn new(position: WorldPosition) -> Self {
        Self {
            position,
            requirements: Vec::new(),
        }
    }

    /// Adds a material slot.
    #[must_use]
    pub fn with_requirement(mut self, requirement: BuildRequirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    /// Returns true once every slot is satisfied.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.requirements.iter().all(|r| r.remaining() == 0)
    }
}

impl InventoryService {
    /// Registers a build site and returns the ref moves target to feed it.
    pub fn add_build_site(&mut self, site_id: EntityId, site: BuildSite) -> ContainerRef {
        self.store.add_build_site(site_id, site);
        ContainerRef::new(site_id, ContainerKind::BuildSlot, 0)
    }

    /// Build site state.
    #[must_use]
    pub fn build_site(&self, site_id: EntityId) -> Option<&BuildSite> {
        self.store.build_site(site_id)
    }

    /// Puts units of a held item into the first matching unfilled slot.
    ///
    /// # Errors
    ///
    /// * [`InventoryError::Unsupported`] - source is not a hand
    /// * [`InventoryError::InvalidPlacement`] - position, slot, swap or merge
    ///   requested, or no slot needs the item
    /// * [`InventoryError::NotFound`] - unknown site, hand or item
    /// * [`InventoryError::OutOfRange`] - site beyond reach
    /// * [`InventoryError::VersionMismatch`] - stale hand version
    pub(crate) fn put_into_build_site(
        &mut self,
        player: EntityId,
        spec: &MoveSpec,
    ) -> InventoryResult<OperationOutcome> {
        if spec.src.kind != ContainerKind::Hand {
            return Err(InventoryError::Unsupported(
                "build sites take items from the hand only".into(),
            ));
        }
        if spec.dst_pos.is_some()
            || spec.dst_equip_slot.is_some()
            || spec.allow_swap_or_merge
            || spec.dst.key != 0
        {
            return Err(InventoryError::InvalidPlacement(
                "build put takes no position, slot, swap or merge".into(),
            ));
        }

        let src_h = self.validator.resolve(&self.store, player, &spec.src)?;
        Validator::validate_expected(&self.store, &spec.expected, &[src_h])?;
        let hand = self
            .store
            .get(src_h)
            .ok_or_else(|| InventoryError::Internal("resolved container vanished".into()))?;
        let index = Validator::find_item(hand, spec.item_id)?;
        let item = hand
            .items
            .get(index)
            .ok_or_else(|| InventoryError::Internal("held item vanished".into()))?;
        if item.quantity == 0 {
            return Err(InventoryError::InvalidPlacement("source item is empty".into()));
        }
        let def = self.validator.def_of(item)?;

        let site_id = spec.dst.owner_id;
        let site = self
            .store
            .build_site(site_id)
            .ok_or_else(|| InventoryError::NotFound(format!("build site {site_id}")))?;
        let position = self
            .store
            .character(player)
            .map(|ch| ch.position)
            .ok_or_else(|| InventoryError::NotFound(format!("character {player}")))?;
        if position.distance_sq(site.position) > self.config.pickup_radius_sq() {
            return Err(InventoryError::OutOfRange);
        }

        let (slot, transfer) = site
            .requirements
            .iter()
            .enumerate()
            .find(|(_, r)| r.matches(def) && r.remaining() > 0)
            .map(|(i, r)| (i, item.quantity.min(r.remaining())))
            .ok_or_else(|| {
                InventoryError::InvalidPlacement(format!(
                    "{} is not required by this build site",
                    def.key
                ))
            })?;
        let (key, quality, item_id) = (def.key.clone(), item.quality, item.item_id);
        let emptied = transfer == item.quantity;

        let hand = self.container_mut(src_h)?;
        if emptied {
            hand.take_item(index)
                .ok_or_else(|| InventoryError::Internal("held item vanished".into()))?;
        } else if let Some(held) = hand.items.get_mut(index) {
            held.quantity -= transfer;
        }
        hand.bump_version();

        if let Some(requirement) = self
            .store
            .build_site_mut(site_id)
            .and_then(|s| s.requirements.get_mut(slot))
        {
            requirement.merge_put(&key, quality, transfer);
        }

        let mut closed = Vec::new();
        if emptied {
            push_closed_ref(&self.store, &mut closed, item_id);
            self.store.unlink(player, &ContainerRef::nested(item_id));
        }

        tracing::debug!(
            "Character {} put {} x{} into build site {}",
            player,
            key,
            transfer,
            site_id
        );

        let mut updates = UpdateSet::default();
        updates.insert(src_h);
        let mut outcome = self.finish(player, updates);
        outcome.closed = closed;
        outcome.message = Some(format!("{transfer} {key} put into build site"));
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::ItemRegistry;

    fn defs() -> ItemRegistry {
        ItemRegistry::from_toml_str(
            r#"
v = 1
[[items]]
def_id = 1
key = "log"
tags = ["wood"]

[[items]]
def_id = 2
key = "stone"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_requirement_matching() {
        let defs = defs();
        let log = defs.get_by_key("log").unwrap();
        let stone = defs.get_by_key("stone").unwrap();

        assert!(BuildRequirement::by_key("log", 2).matches(log));
        assert!(!BuildRequirement::by_key("log", 2).matches(stone));
        assert!(BuildRequirement::by_tag("wood", 2).matches(log));
        assert!(!BuildRequirement::by_tag("wood", 2).matches(stone));
        assert!(!BuildRequirement::default().matches(log));
    }

    #[test]
    fn test_remaining_counts_put_and_built() {
        let mut slot = BuildRequirement::by_key("log", 5);
        slot.built = 1;
        slot.merge_put("log", 10, 2);
        slot.merge_put("log", 10, 1);
        slot.merge_put("log", 20, 1);
        assert_eq!(slot.put.len(), 2);
        assert_eq!(slot.put_count(), 4);
        assert_eq!(slot.remaining(), 0);

        let site = BuildSite::new(WorldPosition::default()).with_requirement(slot);
        assert!(site.is_complete());
    }
}
