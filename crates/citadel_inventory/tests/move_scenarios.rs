//! Move, merge and swap scenarios against a live `InventoryService`.

use citadel_core::{EntityId, WorldPosition};
use citadel_inventory::{
    Container, ContainerKind, ContainerRef, EquipSlot, ExpectedVersion, GridPos, HandOffset,
    HandPos, InventoryConfig, InventoryError, InventoryOp, InventoryService, ItemInstance,
    ItemRegistry, MoveSpec, NullPersister, RecipeRegistry, SequentialIdAllocator,
};
use std::sync::Arc;

const PLAYER: EntityId = EntityId(1);
const OTHER: EntityId = EntityId(2);

const ITEMS: &str = r#"
v = 1

[[items]]
def_id = 1
key = "stone"
stack = { mode = "stack", max = 10 }

[[items]]
def_id = 2
key = "sword"
size = { w = 1, h = 3 }
allowed = { equipment_slots = ["right_hand"] }

[[items]]
def_id = 3
key = "seed"
tags = ["seed"]

[[items]]
def_id = 4
key = "seed_bag"
size = { w = 2, h = 2 }
container = { size = { w = 3, h = 3 }, rules = { allow_tags = ["seed"] } }
visual = { nested_inventory = { has_items = "bag_seed_full", empty = "bag_seed" } }

[[items]]
def_id = 5
key = "helmet"
size = { w = 2, h = 2 }
allowed = { equipment_slots = ["head"] }

[[items]]
def_id = 6
key = "anvil"
size = { w = 2, h = 2 }
allowed = { hand = false }

[[items]]
def_id = 7
key = "plank"
size = { w = 3, h = 1 }

[[items]]
def_id = 8
key = "brick"
size = { w = 2, h = 1 }
"#;

fn service() -> InventoryService {
    let items = Arc::new(ItemRegistry::from_toml_str(ITEMS).unwrap());
    let mut svc = InventoryService::new(
        items,
        Arc::new(RecipeRegistry::default()),
        Box::new(SequentialIdAllocator::starting_at(1000)),
        Box::new(NullPersister),
        InventoryConfig::default(),
    );
    svc.spawn_character(PLAYER, WorldPosition::new(0.0, 0.0), 5, 5);
    svc.spawn_character(OTHER, WorldPosition::new(0.0, 0.0), 5, 5);
    svc
}

fn grid() -> ContainerRef {
    ContainerRef::new(PLAYER, ContainerKind::Grid, 0)
}

fn hand() -> ContainerRef {
    ContainerRef::new(PLAYER, ContainerKind::Hand, 0)
}

fn equipment() -> ContainerRef {
    ContainerRef::new(PLAYER, ContainerKind::Equipment, 0)
}

fn item(svc: &InventoryService, id: u64, type_id: u32, x: u8, y: u8, quantity: u32) -> ItemInstance {
    let def = svc.items().get(type_id).unwrap();
    ItemInstance {
        item_id: EntityId(id),
        type_id,
        resource: def.resolve_resource(false).to_string(),
        quality: 10,
        quantity,
        width: def.size.w,
        height: def.size.h,
        x,
        y,
        equip_slot: None,
    }
}

fn spec(src: ContainerRef, dst: ContainerRef, item_id: u64) -> MoveSpec {
    MoveSpec {
        src,
        dst,
        item_id: EntityId(item_id),
        dst_pos: None,
        dst_equip_slot: None,
        hand_pos: None,
        allow_swap_or_merge: false,
        expected: Vec::new(),
    }
}

fn container(svc: &InventoryService, r: &ContainerRef) -> Container {
    svc.store().get_by_ref(r).unwrap().clone()
}

#[test]
fn test_grid_to_hand_then_stale_retry() {
    let mut svc = service();
    let a = item(&svc, 100, 1, 0, 0, 3);
    svc.insert_item(&grid(), a).unwrap();
    assert_eq!(container(&svc, &grid()).version, 1);

    let mut mv = spec(grid(), hand(), 100);
    mv.expected = vec![ExpectedVersion {
        reference: grid(),
        version: 1,
    }];
    let outcome = svc.execute(PLAYER, &InventoryOp::Move(mv.clone())).unwrap();

    assert_eq!(outcome.updated.len(), 2);
    assert_eq!(outcome.updated[0].reference(), grid());
    assert_eq!(outcome.updated[1].reference(), hand());

    let g = container(&svc, &grid());
    let h = container(&svc, &hand());
    assert_eq!(g.version, 2);
    assert!(g.items.is_empty());
    assert_eq!(h.version, 2);
    assert_eq!(h.items.len(), 1);
    assert_eq!(h.items[0].quantity, 3);
    assert_eq!(h.hand_offset, HandOffset { x: 15, y: 15 });

    assert_eq!(
        svc.execute(PLAYER, &InventoryOp::Move(mv)),
        Err(InventoryError::VersionMismatch {
            expected: 1,
            actual: 2
        })
    );
}

#[test]
fn test_reposition_within_grid_bumps_once() {
    let mut svc = service();
    svc.insert_item(&grid(), item(&svc, 100, 2, 0, 0, 1)).unwrap();
    let mut mv = spec(grid(), grid(), 100);
    mv.dst_pos = Some(GridPos { x: 4, y: 2 });
    let outcome = svc.move_item(PLAYER, &mv).unwrap();

    assert_eq!(outcome.updated.len(), 1);
    let g = container(&svc, &grid());
    assert_eq!(g.version, 2);
    assert_eq!((g.items[0].x, g.items[0].y), (4, 2));
    assert!(outcome.closed.is_empty());
}

#[test]
fn test_move_out_of_bounds_changes_nothing() {
    let mut svc = service();
    svc.insert_item(&grid(), item(&svc, 100, 2, 0, 0, 1)).unwrap();
    let mut mv = spec(grid(), grid(), 100);
    mv.dst_pos = Some(GridPos { x: 4, y: 3 });
    assert!(matches!(
        svc.move_item(PLAYER, &mv),
        Err(InventoryError::InvalidPlacement(_))
    ));
    assert_eq!(container(&svc, &grid()).version, 1);
}

#[test]
fn test_merge_into_hand_keeps_remainder() {
    let mut svc = service();
    svc.insert_item(&grid(), item(&svc, 100, 1, 0, 0, 5)).unwrap();
    svc.insert_item(&hand(), item(&svc, 101, 1, 0, 0, 8)).unwrap();

    let mut mv = spec(grid(), hand(), 100);
    mv.allow_swap_or_merge = true;
    svc.move_item(PLAYER, &mv).unwrap();

    let h = container(&svc, &hand());
    let g = container(&svc, &grid());
    assert_eq!(h.items[0].quantity, 10);
    assert_eq!(g.items[0].quantity, 3);
    assert_eq!(h.version, 2);
    assert_eq!(g.version, 2);
}

#[test]
fn test_merge_within_grid_consumes_source() {
    let mut svc = service();
    svc.insert_item(&grid(), item(&svc, 100, 1, 0, 0, 4)).unwrap();
    svc.insert_item(&grid(), item(&svc, 101, 1, 3, 3, 4)).unwrap();

    let mut mv = spec(grid(), grid(), 100);
    mv.dst_pos = Some(GridPos { x: 3, y: 3 });
    mv.allow_swap_or_merge = true;
    svc.move_item(PLAYER, &mv).unwrap();

    let g = container(&svc, &grid());
    assert_eq!(g.version, 2);
    assert_eq!(g.items.len(), 1);
    assert_eq!(g.items[0].item_id, EntityId(101));
    assert_eq!(g.items[0].quantity, 8);
}

#[test]
fn test_collision_without_flag_rejected() {
    let mut svc = service();
    svc.insert_item(&grid(), item(&svc, 100, 1, 0, 0, 4)).unwrap();
    svc.insert_item(&grid(), item(&svc, 101, 2, 3, 0, 1)).unwrap();

    let mut mv = spec(grid(), grid(), 100);
    mv.dst_pos = Some(GridPos { x: 3, y: 1 });
    assert!(svc.move_item(PLAYER, &mv).is_err());
    assert_eq!(container(&svc, &grid()).version, 1);
}

#[test]
fn test_swap_hand_with_grid_item() {
    let mut svc = service();
    svc.insert_item(&grid(), item(&svc, 100, 2, 0, 0, 1)).unwrap();
    svc.insert_item(&hand(), item(&svc, 101, 3, 0, 0, 1)).unwrap();

    // sword from grid into the occupied hand: seed goes to (0,0) in the grid
    let mut mv = spec(grid(), hand(), 100);
    mv.allow_swap_or_merge = true;
    mv.hand_pos = Some(HandPos {
        mouse_offset_x: 3,
        mouse_offset_y: 4,
    });
    svc.move_item(PLAYER, &mv).unwrap();

    let g = container(&svc, &grid());
    let h = container(&svc, &hand());
    assert_eq!(g.items[0].item_id, EntityId(101));
    assert_eq!((g.items[0].x, g.items[0].y), (0, 0));
    assert_eq!(h.items[0].item_id, EntityId(100));
    assert_eq!(h.hand_offset, HandOffset { x: 3, y: 4 });
    assert_eq!(g.version, 2);
    assert_eq!(h.version, 2);
}

#[test]
fn test_swap_rejected_when_occupant_does_not_fit_back() {
    let mut svc = service();
    // 1x1 stone at (0,0), sword 1x3 at (1,0), helmet 2x2 in hand
    svc.insert_item(&grid(), item(&svc, 100, 1, 0, 0, 1)).unwrap();
    svc.insert_item(&grid(), item(&svc, 101, 2, 1, 0, 1)).unwrap();
    svc.insert_item(&hand(), item(&svc, 102, 5, 0, 0, 1)).unwrap();

    let mut mv = spec(grid(), hand(), 100);
    mv.allow_swap_or_merge = true;
    assert!(matches!(
        svc.move_item(PLAYER, &mv),
        Err(InventoryError::InvalidPlacement(_))
    ));
    assert_eq!(container(&svc, &grid()).items.len(), 2);
    assert_eq!(container(&svc, &hand()).items[0].item_id, EntityId(102));
}

#[test]
fn test_equip_and_slot_rules() {
    let mut svc = service();
    svc.insert_item(&grid(), item(&svc, 100, 5, 0, 0, 1)).unwrap();

    let mut wrong = spec(grid(), equipment(), 100);
    wrong.dst_equip_slot = Some(EquipSlot::Chest);
    assert!(svc.move_item(PLAYER, &wrong).is_err());

    let mut right = spec(grid(), equipment(), 100);
    right.dst_equip_slot = Some(EquipSlot::Head);
    svc.move_item(PLAYER, &right).unwrap();
    let eq = container(&svc, &equipment());
    assert_eq!(eq.items[0].equip_slot, Some(EquipSlot::Head));
}

#[test]
fn test_hand_forbidden_item() {
    let mut svc = service();
    svc.insert_item(&grid(), item(&svc, 100, 6, 0, 0, 1)).unwrap();
    assert!(matches!(
        svc.move_item(PLAYER, &spec(grid(), hand(), 100)),
        Err(InventoryError::InvalidPlacement(_))
    ));
}

#[test]
fn test_foreign_container_forbidden() {
    let mut svc = service();
    let theirs = ContainerRef::new(OTHER, ContainerKind::Grid, 0);
    svc.insert_item(&theirs, item(&svc, 100, 1, 0, 0, 1)).unwrap();
    assert_eq!(
        svc.move_item(PLAYER, &spec(theirs, grid(), 100)),
        Err(InventoryError::Forbidden)
    );
}

#[test]
fn test_opened_chest_is_accessible() {
    let mut svc = service();
    let chest_owner = EntityId(500);
    let chest = svc.add_world_container(Container::new(chest_owner, ContainerKind::Grid, 0, 4, 4));
    svc.insert_item(&chest, item(&svc, 100, 1, 0, 0, 2)).unwrap();

    assert_eq!(
        svc.move_item(PLAYER, &spec(chest, grid(), 100)),
        Err(InventoryError::Forbidden)
    );
    svc.execute(PLAYER, &InventoryOp::OpenContainer { reference: chest })
        .unwrap();
    svc.move_item(PLAYER, &spec(chest, grid(), 100)).unwrap();
    assert_eq!(container(&svc, &grid()).items.len(), 1);

    svc.disconnect(PLAYER);
    svc.insert_item(&chest, item(&svc, 101, 1, 0, 0, 2)).unwrap();
    assert_eq!(
        svc.move_item(PLAYER, &spec(chest, grid(), 101)),
        Err(InventoryError::Forbidden)
    );
}

#[test]
fn test_nested_cascade_updates_parent_resource() {
    let mut svc = service();
    svc.insert_item(&grid(), item(&svc, 100, 4, 0, 0, 1)).unwrap();
    svc.insert_item(&grid(), item(&svc, 101, 3, 4, 4, 1)).unwrap();
    let bag = ContainerRef::nested(EntityId(100));
    assert!(svc.store().get_by_ref(&bag).is_some());

    let outcome = svc.move_item(PLAYER, &spec(grid(), bag, 101)).unwrap();

    // grid (source and parent), then the bag
    let refs: Vec<_> = outcome.updated.iter().map(Container::reference).collect();
    assert_eq!(refs, vec![grid(), bag]);
    let g = container(&svc, &grid());
    assert_eq!(g.version, 3);
    assert_eq!(g.find_item(EntityId(100)).unwrap().1.resource, "bag_seed_full");

    // emptying the bag flips it back
    svc.move_item(PLAYER, &spec(bag, grid(), 101)).unwrap();
    let g = container(&svc, &grid());
    assert_eq!(g.find_item(EntityId(100)).unwrap().1.resource, "bag_seed");
}

#[test]
fn test_content_rules_block_non_seed() {
    let mut svc = service();
    svc.insert_item(&grid(), item(&svc, 100, 4, 0, 0, 1)).unwrap();
    svc.insert_item(&grid(), item(&svc, 101, 1, 4, 4, 1)).unwrap();
    let bag = ContainerRef::nested(EntityId(100));
    assert!(matches!(
        svc.move_item(PLAYER, &spec(grid(), bag, 101)),
        Err(InventoryError::InvalidPlacement(_))
    ));
}

#[test]
fn test_moving_bag_to_hand_closes_nested_window() {
    let mut svc = service();
    svc.insert_item(&grid(), item(&svc, 100, 4, 0, 0, 1)).unwrap();
    let outcome = svc.move_item(PLAYER, &spec(grid(), hand(), 100)).unwrap();
    assert_eq!(outcome.closed, vec![ContainerRef::nested(EntityId(100))]);

    // still linked: the hand belongs to the player
    let bag = ContainerRef::nested(EntityId(100));
    assert!(svc.store().character(PLAYER).unwrap().link(&bag).is_some());
}

#[test]
fn test_bag_moved_to_chest_detaches_nested_link() {
    let mut svc = service();
    let chest = svc.add_world_container(Container::new(EntityId(500), ContainerKind::Grid, 0, 4, 4));
    svc.open_container(PLAYER, &chest).unwrap();
    svc.insert_item(&grid(), item(&svc, 100, 4, 0, 0, 1)).unwrap();

    svc.move_item(PLAYER, &spec(grid(), chest, 100)).unwrap();
    let bag = ContainerRef::nested(EntityId(100));
    assert!(svc.store().character(PLAYER).unwrap().link(&bag).is_none());
    assert!(svc.store().get_by_ref(&bag).is_some());
}

#[test]
fn test_unknown_character() {
    let mut svc = service();
    assert!(matches!(
        svc.execute(EntityId(77), &InventoryOp::Move(spec(grid(), hand(), 1))),
        Err(InventoryError::NotFound(_))
    ));
}

fn assert_no_overlap(c: &Container) {
    for (i, a) in c.items.iter().enumerate() {
        for b in c.items.iter().skip(i + 1) {
            assert!(
                !a.overlaps(b.x, b.y, b.width, b.height),
                "items {} and {} overlap",
                a.item_id,
                b.item_id
            );
        }
    }
}

// ============================================================================
// Swaps and self-targets inside one container
// ============================================================================

#[test]
fn test_swap_within_grid_keeps_items_apart() {
    let mut svc = service();
    svc.insert_item(&grid(), item(&svc, 10, 7, 0, 0, 1)).unwrap();
    svc.insert_item(&grid(), item(&svc, 11, 8, 3, 0, 1)).unwrap();

    // plank to (1,0) would cover x 1..4 while the brick lands on x 0..2
    let mut mv = spec(grid(), grid(), 10);
    mv.dst_pos = Some(GridPos { x: 1, y: 0 });
    mv.allow_swap_or_merge = true;
    assert!(matches!(
        svc.move_item(PLAYER, &mv),
        Err(InventoryError::InvalidPlacement(_))
    ));
    let g = container(&svc, &grid());
    assert_eq!(g.version, 1);
    assert_eq!(g.find_item(EntityId(10)).unwrap().1.x, 0);
    assert_eq!(g.find_item(EntityId(11)).unwrap().1.x, 3);

    // plank to (2,0): brick takes (0,0) and the two sit side by side
    mv.dst_pos = Some(GridPos { x: 2, y: 0 });
    let outcome = svc.move_item(PLAYER, &mv).unwrap();
    assert_eq!(outcome.updated.len(), 1);
    let g = container(&svc, &grid());
    assert_eq!(g.version, 2);
    assert_eq!(g.find_item(EntityId(10)).unwrap().1.x, 2);
    assert_eq!(g.find_item(EntityId(11)).unwrap().1.x, 0);
    assert_no_overlap(&g);
}

#[test]
fn test_hand_to_same_hand_keeps_stack() {
    let mut svc = service();
    svc.insert_item(&hand(), item(&svc, 100, 1, 0, 0, 6)).unwrap();

    let mut mv = spec(hand(), hand(), 100);
    mv.allow_swap_or_merge = true;
    svc.move_item(PLAYER, &mv).unwrap();

    let h = container(&svc, &hand());
    assert_eq!(h.items.len(), 1);
    assert_eq!(h.items[0].quantity, 6);
    assert_eq!(h.version, 2);
}

#[test]
fn test_equipment_to_same_slot_keeps_item() {
    let mut svc = service();
    let mut helmet = item(&svc, 100, 5, 0, 0, 1);
    helmet.equip_slot = Some(EquipSlot::Head);
    svc.insert_item(&equipment(), helmet).unwrap();

    let mut mv = spec(equipment(), equipment(), 100);
    mv.dst_equip_slot = Some(EquipSlot::Head);
    mv.allow_swap_or_merge = true;
    svc.move_item(PLAYER, &mv).unwrap();

    let eq = container(&svc, &equipment());
    assert_eq!(eq.items.len(), 1);
    assert_eq!(eq.items[0].item_id, EntityId(100));
    assert_eq!(eq.items[0].equip_slot, Some(EquipSlot::Head));
}

// ============================================================================
// Swapped item must be allowed where it lands
// ============================================================================

#[test]
fn test_swap_cannot_equip_item_into_wrong_slot() {
    let mut svc = service();
    let mut helmet = item(&svc, 100, 5, 0, 0, 1);
    helmet.equip_slot = Some(EquipSlot::Head);
    svc.insert_item(&equipment(), helmet).unwrap();
    svc.insert_item(&grid(), item(&svc, 101, 2, 0, 0, 1)).unwrap();

    // the sword would end up in the head slot
    let mut mv = spec(equipment(), grid(), 100);
    mv.dst_pos = Some(GridPos { x: 0, y: 0 });
    mv.allow_swap_or_merge = true;
    assert!(matches!(
        svc.move_item(PLAYER, &mv),
        Err(InventoryError::InvalidPlacement(_))
    ));
    let eq = container(&svc, &equipment());
    assert_eq!(eq.items[0].item_id, EntityId(100));
    assert_eq!(eq.version, 1);
    assert_eq!(container(&svc, &grid()).version, 1);
}

#[test]
fn test_swap_cannot_put_forbidden_item_in_hand() {
    let mut svc = service();
    svc.insert_item(&grid(), item(&svc, 100, 6, 0, 0, 1)).unwrap();
    svc.insert_item(&hand(), item(&svc, 101, 3, 0, 0, 1)).unwrap();

    let mut mv = spec(hand(), grid(), 101);
    mv.dst_pos = Some(GridPos { x: 0, y: 0 });
    mv.allow_swap_or_merge = true;
    assert!(matches!(
        svc.move_item(PLAYER, &mv),
        Err(InventoryError::InvalidPlacement(_))
    ));
    assert_eq!(container(&svc, &hand()).items[0].item_id, EntityId(101));
}

#[test]
fn test_swap_respects_source_bag_rules() {
    let mut svc = service();
    svc.insert_item(&grid(), item(&svc, 100, 4, 0, 0, 1)).unwrap();
    svc.insert_item(&grid(), item(&svc, 102, 1, 4, 4, 1)).unwrap();
    let bag = ContainerRef::nested(EntityId(100));
    svc.insert_item(&bag, item(&svc, 101, 3, 0, 0, 1)).unwrap();

    // the stone would be swapped into the seed-only bag
    let mut mv = spec(bag, grid(), 101);
    mv.dst_pos = Some(GridPos { x: 4, y: 4 });
    mv.allow_swap_or_merge = true;
    assert!(matches!(
        svc.move_item(PLAYER, &mv),
        Err(InventoryError::InvalidPlacement(_))
    ));
    assert_eq!(container(&svc, &bag).items[0].item_id, EntityId(101));
    assert_eq!(container(&svc, &bag).version, 1);
}

// ============================================================================
// Opening containers
// ============================================================================

#[test]
fn test_cannot_open_another_players_containers() {
    let mut svc = service();
    let theirs = ContainerRef::new(OTHER, ContainerKind::Grid, 0);
    svc.insert_item(&theirs, item(&svc, 40, 1, 0, 0, 1)).unwrap();
    svc.insert_item(&theirs, item(&svc, 41, 4, 2, 2, 1)).unwrap();

    assert_eq!(
        svc.execute(PLAYER, &InventoryOp::OpenContainer { reference: theirs }),
        Err(InventoryError::Forbidden)
    );
    assert_eq!(
        svc.open_container(PLAYER, &ContainerRef::nested(EntityId(41))),
        Err(InventoryError::Forbidden)
    );
    assert_eq!(
        svc.move_item(PLAYER, &spec(theirs, grid(), 40)),
        Err(InventoryError::Forbidden)
    );
    assert!(container(&svc, &grid()).items.is_empty());
    assert!(svc.store().character(PLAYER).unwrap().opened.is_empty());
}

#[test]
fn test_bag_inside_opened_chest_is_reachable_until_closed() {
    let mut svc = service();
    let chest = svc.add_world_container(Container::new(EntityId(500), ContainerKind::Grid, 0, 4, 4));
    svc.insert_item(&grid(), item(&svc, 100, 4, 0, 0, 1)).unwrap();
    let bag = ContainerRef::nested(EntityId(100));
    svc.insert_item(&bag, item(&svc, 101, 3, 0, 0, 1)).unwrap();
    svc.insert_item(&bag, item(&svc, 102, 3, 1, 0, 1)).unwrap();

    // stash the bag in the chest, then close it
    svc.open_container(PLAYER, &chest).unwrap();
    svc.move_item(PLAYER, &spec(grid(), chest, 100)).unwrap();
    let closed = svc.close_container(PLAYER, &chest).unwrap();
    assert_eq!(closed.closed, vec![chest]);

    assert_eq!(svc.open_container(PLAYER, &bag), Err(InventoryError::Forbidden));

    svc.open_container(PLAYER, &chest).unwrap();
    svc.open_container(PLAYER, &bag).unwrap();
    svc.move_item(PLAYER, &spec(bag, grid(), 101)).unwrap();
    assert!(container(&svc, &grid()).find_item(EntityId(101)).is_some());

    let closed = svc.close_container(PLAYER, &chest).unwrap();
    assert!(closed.closed.contains(&chest));
    assert!(closed.closed.contains(&bag));
    assert_eq!(
        svc.move_item(PLAYER, &spec(bag, grid(), 102)),
        Err(InventoryError::Forbidden)
    );
}

#[test]
fn test_opening_another_chest_closes_the_first() {
    let mut svc = service();
    let first = svc.add_world_container(Container::new(EntityId(500), ContainerKind::Grid, 0, 4, 4));
    let second = svc.add_world_container(Container::new(EntityId(501), ContainerKind::Grid, 0, 4, 4));
    svc.insert_item(&first, item(&svc, 100, 1, 0, 0, 1)).unwrap();

    svc.open_container(PLAYER, &first).unwrap();
    let outcome = svc.open_container(PLAYER, &second).unwrap();
    assert_eq!(outcome.closed, vec![first]);
    assert_eq!(
        svc.move_item(PLAYER, &spec(first, grid(), 100)),
        Err(InventoryError::Forbidden)
    );
}
