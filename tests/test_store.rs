use danmaku::assets::{AssetSource, AssetTable, FontId, Sprite, SpriteId, TextureId};
use danmaku::entities::*;
use danmaku::handle::{IdAllocator, InstanceId, ObjectKind, MAX_SEQUENCE};
use danmaku::store::EntityStore;

fn store_with(enemies: usize, bullets: usize) -> EntityStore {
    let mut store = EntityStore::new(1);
    for i in 0..enemies {
        store.create_enemy().object.x = i as f32;
    }
    for i in 0..bullets {
        store.create_bullet().object.x = 100.0 + i as f32;
    }
    store
}

// ── Handles ───────────────────────────────────────────────────────────────────

#[test]
fn handle_carries_kind_and_sequence() {
    let id = InstanceId::new(ObjectKind::Bullet, 42);
    assert_eq!(id.kind(), Some(ObjectKind::Bullet));
    assert_eq!(id.seq(), 42);
    assert!(!id.is_null());
}

#[test]
fn null_handle_has_no_kind() {
    assert!(InstanceId::NULL.is_null());
    assert_eq!(InstanceId::NULL.kind(), None);
    assert_eq!(InstanceId::default(), InstanceId::NULL);
}

#[test]
fn script_form_round_trips_and_maps_minus_one_to_null() {
    let id = InstanceId::new(ObjectKind::Enemy, 7);
    assert_eq!(InstanceId::from_script(id.to_script()), id);
    assert_eq!(InstanceId::NULL.to_script(), -1);
    assert!(InstanceId::from_script(-1).is_null());
    assert!(InstanceId::from_script(i64::MAX).is_null());
}

#[test]
fn handles_strictly_increase_across_kinds() {
    let mut store = EntityStore::new(1);
    let a = store.create_enemy().object.id;
    let b = store.create_bullet().object.id;
    let c = store.create_enemy().object.id;
    assert!(a.seq() < b.seq());
    assert!(b.seq() < c.seq());
    assert_eq!(store.next_sequence(), 3);
}

#[test]
fn spent_allocator_hands_out_null() {
    let mut ids = IdAllocator::starting_at(MAX_SEQUENCE);
    let last = ids.next(ObjectKind::Bullet);
    assert_eq!(last.seq(), MAX_SEQUENCE);
    assert_eq!(last.kind(), Some(ObjectKind::Bullet));

    for kind in [ObjectKind::Enemy, ObjectKind::Bullet, ObjectKind::Boss] {
        assert!(ids.next(kind).is_null());
    }
    assert_eq!(ids.peek(), MAX_SEQUENCE + 1);
}

#[test]
fn null_handle_never_resolves() {
    let mut store = store_with(2, 2);
    store.enemies[0].object.id = InstanceId::NULL;
    store.enemies.sort_by_key(|e| e.object.id);
    assert!(store.find_object(InstanceId::NULL).is_none());
}

// ── Lookup ────────────────────────────────────────────────────────────────────

#[test]
fn find_object_resolves_every_kind() {
    let store = store_with(3, 3);
    for enemy in &store.enemies {
        let found = store.find_object(enemy.object.id).map(|o| o.x);
        assert_eq!(found, Some(enemy.object.x));
    }
    for bullet in &store.bullets {
        let found = store.find_object(bullet.object.id).map(|o| o.x);
        assert_eq!(found, Some(bullet.object.x));
    }
    assert!(store.find_object(InstanceId::player(0)).is_some());
}

#[test]
fn find_object_is_total() {
    let store = store_with(2, 2);
    assert!(store.find_object(InstanceId::NULL).is_none());
    assert!(store.find_object(InstanceId::from_raw(0xF000_0000)).is_none());
    assert!(store.find_object(InstanceId::new(ObjectKind::Boss, 0)).is_none());
    assert!(store.find_object(InstanceId::new(ObjectKind::Enemy, 9_999)).is_none());
    // Only one active player.
    assert!(store.find_object(InstanceId::player(1)).is_none());
    assert!(store.find_object(InstanceId::player(3)).is_none());
}

#[test]
fn wrong_kind_tag_does_not_alias() {
    let store = store_with(1, 0);
    let enemy = store.enemies[0].object.id;
    let as_bullet = InstanceId::new(ObjectKind::Bullet, enemy.seq());
    assert!(store.find_object(as_bullet).is_none());
}

#[test]
fn stale_handle_after_removal() {
    let mut store = store_with(3, 0);
    let victim = store.enemies[1].object.id;
    store.enemies[1].object.mark_dead();
    store.remove_dead();

    assert!(store.find_object(victim).is_none());
    assert_eq!(store.enemies.len(), 2);
    assert!(store.enemies[0].object.id < store.enemies[1].object.id);
}

#[test]
fn find_object_mut_writes_through() {
    let mut store = store_with(0, 2);
    let id = store.bullets[1].object.id;
    if let Some(object) = store.find_object_mut(id) {
        object.spd = 9.0;
    }
    assert_eq!(store.bullets[1].object.spd, 9.0);
}

// ── Creation and removal ──────────────────────────────────────────────────────

#[test]
fn player_bullets_and_pickups_have_no_handles() {
    let mut store = EntityStore::new(1);
    store.create_player_bullet().dmg = 3.0;
    store.create_pickup().kind = PickupKind::Bomb;
    assert_eq!(store.player_bullets.len(), 1);
    assert_eq!(store.pickups[0].homing_target, InstanceId::NULL);
    assert_eq!(store.next_sequence(), 0);
}

#[test]
fn new_bullet_defaults() {
    let mut store = EntityStore::new(1);
    let bullet = store.create_bullet();
    assert_eq!(bullet.lifetime, 0.0);
    assert_eq!(bullet.lifespan, DEFAULT_LIFESPAN);
    assert_eq!(bullet.grazed_by, 0);
    assert!(!bullet.coroutine.is_bound());
    assert_eq!(bullet.shape, BulletShape::Bullet);
}

#[test]
fn remove_dead_keeps_order() {
    let mut store = store_with(0, 6);
    for i in [0, 2, 5] {
        store.bullets[i].object.mark_dead();
    }
    let survivors: Vec<InstanceId> = [1, 3, 4]
        .iter()
        .map(|&i| store.bullets[i].object.id)
        .collect();
    store.remove_dead();
    let ids: Vec<InstanceId> = store.bullets.iter().map(|b| b.object.id).collect();
    assert_eq!(ids, survivors);
}

#[test]
fn clear_keeps_players() {
    let mut store = store_with(2, 2);
    store.create_pickup();
    store.players[0].object.x = 12.0;
    store.clear();
    assert_eq!(store.object_count(), 0);
    assert_eq!(store.players[0].object.x, 12.0);
    assert_eq!(store.active_players().len(), 1);
}

#[test]
fn player_count_is_clamped() {
    assert_eq!(EntityStore::new(0).player_count(), 1);
    assert_eq!(EntityStore::new(9).player_count(), MAX_PLAYERS);
}

// ── Assets ────────────────────────────────────────────────────────────────────

#[test]
fn unknown_asset_names_resolve_to_stubs() {
    let mut assets = AssetTable::new();
    let card = assets.add_sprite(Sprite::new("card", 16, 16));
    let hud = assets.add_font("hud");
    assets.add_texture("bg");

    assert_eq!(assets.find_sprite("card"), card);
    assert_eq!(assets.find_sprite("nope"), SpriteId::STUB);
    assert_eq!(assets.sprite(SpriteId(99)).name, "");
    assert_eq!(assets.find_font("hud"), hud);
    assert_eq!(assets.find_font("nope"), FontId::default());
    assert_eq!(assets.find_texture("nope"), TextureId::default());
    assert_ne!(assets.find_texture("bg"), TextureId::default());
}

#[test]
fn duplicate_script_names_keep_the_first() {
    let mut assets = AssetTable::new();
    assets.add_script("stage", "a = 1");
    assets.add_script("stage", "a = 2");
    assert_eq!(assets.scripts().len(), 1);
    assert_eq!(assets.scripts()[0].source, "a = 1");
}
