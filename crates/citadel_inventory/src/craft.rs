//! Crafting against a character's inventory tree.
//!
//! Inputs are searched in a fixed order: root grids, then nested grids,
//! then the hand. Consumption runs on cloned containers and is written
//! back only once every input is satisfied, so a failed craft changes
//! nothing. Output quality is the weighted average of consumed input
//! quality, rounded down.

use citadel_core::{EntityId, Handle};
use std::collections::HashMap;

use crate::defs::Recipe;
use crate::error::{InventoryError, InventoryResult};
use crate::give::OverflowPolicy;
use crate::model::{Container, ContainerKind, HandOffset};
use crate::service::{GrantSummary, InventoryService, OperationOutcome, UpdateSet};
use crate::store::InventoryLink;

/// Containers and weighted-quality sums of a successful consumption.
struct Consumed {
    changed: Vec<(Handle, Container)>,
    weighted: u64,
    weight_sum: u64,
}

impl InventoryService {
    /// Runs one craft of `recipe_key`.
    ///
    /// # Errors
    ///
    /// * [`InventoryError::NotFound`] - unknown recipe
    /// * [`InventoryError::InvalidPlacement`] - missing inputs or quality overflow
    pub fn craft(&mut self, player: EntityId, recipe_key: &str) -> InventoryResult<OperationOutcome> {
        let recipe = self
            .recipes
            .get(recipe_key)
            .cloned()
            .ok_or_else(|| InventoryError::NotFound(format!("recipe {recipe_key}")))?;

        if !self.has_craft_inputs(player, &recipe) {
            return Err(InventoryError::InvalidPlacement("missing craft inputs".into()));
        }
        let consumed = self.consume_craft_inputs(player, &recipe)?;
        let quality = if consumed.weight_sum == 0 {
            0
        } else {
            u32::try_from(consumed.weighted / consumed.weight_sum).unwrap_or(u32::MAX)
        };

        let mut updates = UpdateSet::default();
        for (handle, clone) in consumed.changed {
            if let Some(live) = self.store.get_mut(handle) {
                live.items = clone.items;
                live.hand_offset = clone.hand_offset;
                live.bump_version();
                updates.insert(handle);
            }
        }

        let mut spawned = Vec::new();
        let mut summary = GrantSummary::default();
        for output in &recipe.outputs {
            let grant = self.grant_units(
                player,
                &output.item_key,
                output.count,
                quality,
                OverflowPolicy::DropToWorld,
            )?;
            updates.extend(&grant.updates);
            spawned.extend(grant.spawned);
            summary.granted += grant.summary.granted;
            summary.requested += grant.summary.requested;
            summary.dropped += grant.summary.dropped;
            summary.placed_in_hand |= grant.summary.placed_in_hand;
        }

        tracing::info!(
            "Character {} crafted {} (quality {}, {} dropped)",
            player,
            recipe.key,
            quality,
            summary.dropped
        );

        let mut outcome = self.finish(player, updates);
        outcome.spawned_dropped = spawned;
        outcome.grant = Some(summary);
        outcome.message = Some(format!("crafted {}", recipe.key));
        Ok(outcome)
    }

    /// Returns true if the character holds every input of one craft.
    #[must_use]
    pub fn has_craft_inputs(&self, player: EntityId, recipe: &Recipe) -> bool {
        let mut required: HashMap<&str, u64> = HashMap::new();
        for input in &recipe.inputs {
            *required.entry(input.item_key.as_str()).or_default() += u64::from(input.count);
        }
        let mut held: HashMap<&str, u64> = HashMap::new();
        for link in self.craft_links(player) {
            let Some(container) = self.store.get(link.handle) else {
                continue;
            };
            for item in &container.items {
                let Some(def) = self.items().get(item.type_id) else {
                    continue;
                };
                if let Some((key, _)) = required.get_key_value(def.key.as_str()) {
                    *held.entry(key).or_default() += u64::from(item.quantity);
                }
            }
        }
        required
            .iter()
            .all(|(key, need)| held.get(key).copied().unwrap_or(0) >= *need)
    }

    /// Consumes one craft's inputs on cloned containers.
    fn consume_craft_inputs(&self, player: EntityId, recipe: &Recipe) -> InventoryResult<Consumed> {
        let links = self.craft_links(player);
        let mut clones: Vec<(Handle, Container, bool)> = links
            .iter()
            .filter_map(|l| self.store.get(l.handle).map(|c| (l.handle, c.clone(), false)))
            .collect();
        let overflow = || InventoryError::InvalidPlacement("quality overflow".into());

        let mut weighted: u64 = 0;
        let mut weight_sum: u64 = 0;
        for input in &recipe.inputs {
            let mut remaining = input.count;
            let weight = u64::from(input.quality_weight);
            for (_, container, changed) in &mut clones {
                if remaining == 0 {
                    break;
                }
                let mut idx = 0;
                while idx < container.items.len() && remaining > 0 {
                    let item = &mut container.items[idx];
                    let matches = self
                        .items()
                        .get(item.type_id)
                        .is_some_and(|d| d.key == input.item_key);
                    if !matches {
                        idx += 1;
                        continue;
                    }
                    let take = item.quantity.min(remaining);
                    let term = u64::from(item.quality)
                        .checked_mul(weight)
                        .and_then(|v| v.checked_mul(u64::from(take)))
                        .ok_or_else(overflow)?;
                    weighted = weighted.checked_add(term).ok_or_else(overflow)?;
                    let w = weight.checked_mul(u64::from(take)).ok_or_else(overflow)?;
                    weight_sum = weight_sum.checked_add(w).ok_or_else(overflow)?;

                    if item.quantity == take {
                        container.items.remove(idx);
                    } else {
                        item.quantity -= take;
                        idx += 1;
                    }
                    remaining -= take;
                    *changed = true;
                }
                if *changed && container.kind == ContainerKind::Hand && container.items.is_empty() {
                    container.hand_offset = HandOffset::default();
                }
            }
            if remaining > 0 {
                return Err(InventoryError::InvalidPlacement("missing craft inputs".into()));
            }
        }

        Ok(Consumed {
            changed: clones
                .into_iter()
                .filter(|(_, _, changed)| *changed)
                .map(|(h, c, _)| (h, c))
                .collect(),
            weighted,
            weight_sum,
        })
    }

    /// Root grids, then nested grids, then the hand.
    fn craft_links(&self, player: EntityId) -> Vec<InventoryLink> {
        let links = self.store.links(player);
        let grids = |root: bool| {
            links
                .iter()
                .filter(move |l| {
                    l.reference.kind == ContainerKind::Grid && (l.reference.owner_id == player) == root
                })
                .copied()
        };
        let hand = links.iter().copied().find(|l| {
            l.reference.kind == ContainerKind::Hand
                && l.reference.owner_id == player
                && l.reference.key == 0
        });
        grids(true).chain(grids(false)).chain(hand).collect()
    }
}
