//! # Transactional Move Executor
//!
//! Applies a validated [`PlacementDecision`]. Every check runs before the
//! first write, so a move either commits completely or leaves all
//! containers as they were.
//!
//! ## Version bumps
//!
//! | Operation | same container | different containers |
//! |-----------|----------------|----------------------|
//! | simple    | +1             | src +1, dst +1       |
//! | merge     | +1             | src +1, dst +1       |
//! | swap      | +1             | src +1, dst +1       |
//!
//! Merges always bump the destination and bump the source only when it
//! differs; swaps do the opposite. Either way each touched container moves
//! by exactly one.
//!
//! Moves into a `BuildSlot` take the build-site path instead (see
//! [`crate::build`]).

use citadel_core::{EntityId, Handle};

use crate::command::{HandPos, MoveSpec};
use crate::error::{InventoryError, InventoryResult};
use crate::model::{Container, ContainerKind, EquipSlot, HandOffset, ItemInstance};
use crate::nested::push_closed_ref;
use crate::placement::{self, PlacementDecision};
use crate::service::{InventoryService, OperationOutcome, UpdateSet};
use crate::validation::Validator;

/// Sets the hand cursor offset from the request, or the default.
fn apply_hand_offset(container: &mut Container, hand_pos: Option<HandPos>, default: HandOffset) {
    container.hand_offset = hand_pos.map_or(default, |p| HandOffset {
        x: p.mouse_offset_x,
        y: p.mouse_offset_y,
    });
}

/// Item at `index`, or an internal error if validation and state disagree.
fn item_at(container: &mut Container, index: usize) -> InventoryResult<&mut ItemInstance> {
    container
        .items
        .get_mut(index)
        .ok_or_else(|| InventoryError::Internal(format!("no item at index {index}")))
}

/// Everything the commit step needs, gathered during validation.
struct MovePlan {
    src: Handle,
    dst: Handle,
    src_index: usize,
    item_id: EntityId,
    dst_slot: Option<EquipSlot>,
    decision: PlacementDecision,
}

impl MovePlan {
    fn same_container(&self) -> bool {
        self.src == self.dst
    }
}

impl InventoryService {
    /// Moves, merges or swaps an item.
    ///
    /// # Errors
    ///
    /// * [`InventoryError::NotFound`] - unknown container or item
    /// * [`InventoryError::Forbidden`] - caller may not touch a container
    /// * [`InventoryError::VersionMismatch`] - stale expected version
    /// * [`InventoryError::InvalidPlacement`] - rejected by rules or collision
    /// * [`InventoryError::Unsupported`] - destination kind cannot receive moves
    /// * [`InventoryError::OutOfRange`] - build site beyond reach
    pub fn move_item(
        &mut self,
        player: EntityId,
        spec: &MoveSpec,
    ) -> InventoryResult<OperationOutcome> {
        if spec.dst.kind == ContainerKind::BuildSlot {
            return self.put_into_build_site(player, spec);
        }
        let plan = self.plan_move(player, spec)?;
        let mut updates = UpdateSet::default();
        let mut closed = Vec::new();

        match plan.decision {
            PlacementDecision::Merge {
                target_index,
                merged,
                remaining_in_src,
                ..
            } => {
                let same = plan.same_container();
                let dst = self.container_mut(plan.dst)?;
                item_at(dst, target_index)?.quantity += merged;
                dst.bump_version();

                let src = self.container_mut(plan.src)?;
                if remaining_in_src == 0 {
                    src.take_item(plan.src_index).ok_or_else(|| {
                        InventoryError::Internal("merged item vanished".into())
                    })?;
                } else {
                    item_at(src, plan.src_index)?.quantity = remaining_in_src;
                }
                if !same {
                    src.bump_version();
                }

                updates.insert(plan.src);
                updates.insert(plan.dst);
                if !same && remaining_in_src == 0 {
                    self.reconcile_nested_link(player, plan.item_id, plan.dst);
                    push_closed_ref(&self.store, &mut closed, plan.item_id);
                }
            }
            PlacementDecision::Swap { x, y, swap_index } => {
                let same = plan.same_container();
                let default_offset = self.default_hand_offset();

                let mut swap_item = item_at(self.container_mut(plan.dst)?, swap_index)?.clone();
                let src = self.container_mut(plan.src)?;
                let slot = item_at(src, plan.src_index)?;
                let mut moving = slot.clone();
                swap_item.x = moving.x;
                swap_item.y = moving.y;
                swap_item.equip_slot = moving.equip_slot;
                let swap_id = swap_item.item_id;
                *slot = swap_item;
                if src.kind == ContainerKind::Hand {
                    src.hand_offset = default_offset;
                }
                src.bump_version();

                let dst = self.container_mut(plan.dst)?;
                moving.x = x;
                moving.y = y;
                moving.equip_slot = plan.dst_slot;
                *item_at(dst, swap_index)? = moving;
                if dst.kind == ContainerKind::Hand {
                    apply_hand_offset(dst, spec.hand_pos, default_offset);
                }
                if !same {
                    dst.bump_version();
                }

                updates.insert(plan.src);
                updates.insert(plan.dst);
                if !same {
                    self.reconcile_nested_link(player, plan.item_id, plan.dst);
                    self.reconcile_nested_link(player, swap_id, plan.src);
                    push_closed_ref(&self.store, &mut closed, plan.item_id);
                    push_closed_ref(&self.store, &mut closed, swap_id);
                }
            }
            PlacementDecision::Place { x, y } => {
                let default_offset = self.default_hand_offset();
                if plan.same_container() {
                    let c = self.container_mut(plan.src)?;
                    let item = item_at(c, plan.src_index)?;
                    item.x = x;
                    item.y = y;
                    item.equip_slot = plan.dst_slot;
                    c.bump_version();
                    updates.insert(plan.src);
                } else {
                    let src = self.container_mut(plan.src)?;
                    let mut moving = src.take_item(plan.src_index).ok_or_else(|| {
                        InventoryError::Internal("moved item vanished".into())
                    })?;
                    src.bump_version();

                    let dst = self.container_mut(plan.dst)?;
                    moving.x = x;
                    moving.y = y;
                    moving.equip_slot = plan.dst_slot;
                    dst.items.push(moving);
                    if dst.kind == ContainerKind::Hand {
                        apply_hand_offset(dst, spec.hand_pos, default_offset);
                    }
                    dst.bump_version();

                    updates.insert(plan.src);
                    updates.insert(plan.dst);
                    self.reconcile_nested_link(player, plan.item_id, plan.dst);
                    push_closed_ref(&self.store, &mut closed, plan.item_id);
                }
            }
        }

        let mut outcome = self.finish(player, updates);
        outcome.closed = closed;
        Ok(outcome)
    }

    /// Runs every precondition of a move without writing anything.
    fn plan_move(&self, player: EntityId, spec: &MoveSpec) -> InventoryResult<MovePlan> {
        let src_h = self.validator.resolve(&self.store, player, &spec.src)?;
        let dst_h = self.validator.resolve(&self.store, player, &spec.dst)?;
        Validator::validate_expected(&self.store, &spec.expected, &[src_h, dst_h])?;

        let src = self.resolved(src_h)?;
        let dst = self.resolved(dst_h)?;
        let src_index = Validator::find_item(src, spec.item_id)?;
        let item = src
            .items
            .get(src_index)
            .ok_or_else(|| InventoryError::Internal("found item vanished".into()))?;

        let dst_slot = if dst.kind == ContainerKind::Equipment {
            spec.dst_equip_slot
        } else {
            None
        };
        self.validator
            .validate_item_allowed(&self.store, player, item, dst, dst_slot)?;

        let registry = self.items();
        let decision = match dst.kind {
            ContainerKind::Grid => {
                let (x, y) = match spec.dst_pos {
                    Some(pos) => (pos.x, pos.y),
                    None => placement::find_free_space(dst, item.width, item.height).ok_or_else(
                        || InventoryError::InvalidPlacement("no free space in destination".into()),
                    )?,
                };
                placement::check_grid(registry, dst, item, x, y, spec.allow_swap_or_merge)
            }
            ContainerKind::Hand => {
                placement::check_hand(registry, dst, item, spec.allow_swap_or_merge)
            }
            ContainerKind::Equipment => {
                placement::check_equipment(dst, item, dst_slot, spec.allow_swap_or_merge)
            }
            kind => {
                return Err(InventoryError::Unsupported(format!(
                    "cannot move items into {kind} containers"
                )))
            }
        }
        .ok_or_else(|| InventoryError::InvalidPlacement("cannot place item at destination".into()))?;

        if let PlacementDecision::Swap { x, y, swap_index } = decision {
            let swap_item = dst
                .items
                .get(swap_index)
                .ok_or_else(|| InventoryError::Internal("swap target vanished".into()))?;
            let moving_to = (src_h == dst_h).then_some((x, y));
            if !placement::validate_swap(src, item, swap_item, moving_to) {
                return Err(InventoryError::InvalidPlacement(
                    "swapped item does not fit in source".into(),
                ));
            }
            // the displaced item must be allowed where it lands
            self.validator
                .validate_item_allowed(&self.store, player, swap_item, src, item.equip_slot)?;
        }

        Ok(MovePlan {
            src: src_h,
            dst: dst_h,
            src_index,
            item_id: spec.item_id,
            dst_slot,
            decision,
        })
    }

    fn resolved(&self, handle: Handle) -> InventoryResult<&Container> {
        self.store
            .get(handle)
            .ok_or_else(|| InventoryError::Internal("resolved container vanished".into()))
    }
}
