use std::rc::Rc;

use danmaku::assets::AssetTable;
use danmaku::config::StageConfig;
use danmaku::entities::*;
use danmaku::events::StageEvent;
use danmaku::handle::InstanceId;
use danmaku::input::InputState;
use danmaku::world::{Spawn, World, PLAYER_STARTING_X, PLAYER_STARTING_Y};

fn make_world() -> World {
    World::new(StageConfig::default(), Rc::new(AssetTable::new())).unwrap()
}

/// A world whose player can be hit right away.
fn vulnerable_world() -> World {
    let mut world = make_world();
    world.store.players[0].iframes = 0.0;
    world
}

fn bullet_on_player(world: &mut World) {
    let player = &world.store.players[0].object;
    let spawn = Spawn {
        x: player.x,
        y: player.y,
        radius: 4.0,
        ..Spawn::default()
    };
    world.spawn_bullet(spawn, BulletShape::Bullet);
}

fn tick_players(world: &mut World, input: InputState, ticks: usize) {
    for _ in 0..ticks {
        world.input[0] = input;
        world.update_players(1.0);
        world.physics_step(1.0);
    }
}

fn count_pickups(world: &World, kind: PickupKind) -> usize {
    world.store.pickups.iter().filter(|p| p.kind == kind).count()
}

// ── Spawn ─────────────────────────────────────────────────────────────────────

#[test]
fn player_starts_at_spawn_point() {
    let world = make_world();
    let player = &world.store.players[0];
    assert_eq!(player.state, PlayerState::Normal);
    assert_eq!(player.object.x, PLAYER_STARTING_X);
    assert_eq!(player.object.y, PLAYER_STARTING_Y);
    assert_eq!(player.iframes, 120.0);
    assert_eq!(world.stats[0].lives, 2);
    assert_eq!(world.stats[0].bombs, 3);
}

// ── Movement ──────────────────────────────────────────────────────────────────

#[test]
fn diagonal_movement_is_normalized() {
    let mut world = make_world();
    world.input[0] = InputState::default().with(InputState::RIGHT).with(InputState::UP);
    world.update_players(1.0);
    let player = &world.store.players[0];
    let expected = 3.75 * std::f32::consts::FRAC_1_SQRT_2;
    assert!((player.hsp - expected).abs() < 1e-3);
    assert!((player.vsp + expected).abs() < 1e-3);
}

#[test]
fn focus_slows_movement() {
    let mut world = make_world();
    world.input[0] = InputState::default().with(InputState::LEFT).with(InputState::FOCUS);
    world.update_players(1.0);
    let player = &world.store.players[0];
    assert!(player.is_focused);
    assert_eq!(player.hsp, -1.6);
}

#[test]
fn settle_clamps_to_playfield() {
    let mut world = make_world();
    world.store.players[0].object.x = -40.0;
    world.store.players[0].object.y = 9_000.0;
    world.settle_players();
    let player = &world.store.players[0];
    assert_eq!(player.object.x, 0.0);
    assert_eq!(player.object.y, PLAY_AREA_H - 1.0);

    let CharacterState::Reimu(reimu) = &player.character;
    assert_eq!(reimu.orb_x, [-24.0, 24.0]);
}

// ── Getting hit ───────────────────────────────────────────────────────────────

#[test]
fn hit_starts_death_and_removes_bullet() {
    let mut world = vulnerable_world();
    bullet_on_player(&mut world);

    world.physics_step(0.2);

    let player = &world.store.players[0];
    assert_eq!(player.state, PlayerState::Dying);
    assert_eq!(player.timer, 15.0);
    assert!(world.store.bullets.is_empty());
    assert!(world.drain_events().contains(&StageEvent::PlayerHit { player: 0 }));
}

#[test]
fn iframes_protect_but_still_graze_once() {
    let mut world = make_world();
    bullet_on_player(&mut world);

    for _ in 0..5 {
        world.physics_step(0.2);
    }

    assert_eq!(world.store.players[0].state, PlayerState::Normal);
    assert_eq!(world.store.bullets.len(), 1);
    assert_eq!(world.stats[0].graze, 1);
    assert_eq!(world.store.bullets[0].grazed_by, 0b1);
}

#[test]
fn death_with_lives_left_drops_power() {
    let mut world = vulnerable_world();
    world.stats[0].power = 20;
    world.hit_player(0);

    tick_players(&mut world, InputState::default(), 14);
    assert_eq!(world.store.players[0].state, PlayerState::Dying);

    tick_players(&mut world, InputState::default(), 1);
    let player = &world.store.players[0];
    assert_eq!(player.state, PlayerState::Appearing);
    assert_eq!(player.timer, 30.0);
    assert_eq!(world.stats[0].lives, 1);
    assert_eq!(world.stats[0].power, 4);
    // 12 power back: one big item worth 8, four small ones.
    assert_eq!(count_pickups(&world, PickupKind::BigPower), 1);
    assert_eq!(count_pickups(&world, PickupKind::Power), 4);
}

#[test]
fn death_without_lives_drops_full_power() {
    let mut world = vulnerable_world();
    world.stats[0].lives = 0;
    world.hit_player(0);

    tick_players(&mut world, InputState::default(), 15);

    let player = &world.store.players[0];
    assert_eq!(player.state, PlayerState::Appearing);
    assert_eq!(player.timer, 30.0);
    assert_eq!(player.iframes, 120.0);
    assert_eq!(world.store.pickups.len(), 1);
    assert_eq!(world.store.pickups[0].kind, PickupKind::FullPower);
}

#[test]
fn appearing_returns_to_normal() {
    let mut world = vulnerable_world();
    world.hit_player(0);
    tick_players(&mut world, InputState::default(), 15);
    tick_players(&mut world, InputState::default(), 30);
    assert_eq!(world.store.players[0].state, PlayerState::Normal);
}

#[test]
fn deathbomb_cancels_death() {
    let mut world = vulnerable_world();
    world.hit_player(0);
    tick_players(&mut world, InputState::default(), 3);
    tick_players(&mut world, InputState::default().with(InputState::BOMB), 1);

    let player = &world.store.players[0];
    assert_eq!(player.state, PlayerState::Normal);
    assert_eq!(world.stats[0].bombs, 2);
    assert_eq!(world.stats[0].lives, 2);
}

#[test]
fn dead_flag_on_player_becomes_a_hit() {
    let mut world = vulnerable_world();
    world.store.players[0].object.mark_dead();
    world.remove_dead();
    let player = &world.store.players[0];
    assert_eq!(player.state, PlayerState::Dying);
    assert!(!player.object.is_dead());
}

// ── Shooting and bombs ────────────────────────────────────────────────────────

#[test]
fn power_40_fires_three_cards_per_cycle() {
    let mut world = make_world();
    world.stats[0].power = 40;
    world.input[0] = InputState::default().with(InputState::FIRE);

    for _ in 0..4 {
        world.update_players(1.0);
    }

    let cards = world
        .store
        .player_bullets
        .iter()
        .filter(|pb| pb.kind == PlayerBulletKind::ReimuCard)
        .count();
    assert_eq!(cards, 3);
}

#[test]
fn fire_queue_keeps_going_after_release() {
    let mut world = make_world();
    world.input[0] = InputState::default().with(InputState::FIRE);
    for _ in 0..4 {
        world.update_players(1.0);
    }
    world.input[0] = InputState::default();
    for _ in 0..28 {
        world.update_players(1.0);
    }
    let cards = world
        .store
        .player_bullets
        .iter()
        .filter(|pb| pb.kind == PlayerBulletKind::ReimuCard)
        .count();
    assert_eq!(cards, 8);
}

#[test]
fn bomb_turns_bullets_into_score() {
    let mut world = make_world();
    for i in 0..5 {
        let spawn = Spawn {
            x: 50.0 + i as f32 * 20.0,
            y: 100.0,
            ..Spawn::default()
        };
        world.spawn_bullet(spawn, BulletShape::Bullet);
    }

    world.input[0] = InputState::default().with(InputState::BOMB);
    world.update_players(1.0);

    assert!(world.store.bullets.is_empty());
    assert_eq!(count_pickups(&world, PickupKind::Score), 5);
    assert_eq!(world.stats[0].bombs, 2);
    assert_eq!(world.store.players[0].bomb_timer, 149.0);

    // Cooldown blocks a second bomb.
    world.update_players(1.0);
    assert_eq!(world.stats[0].bombs, 2);
}

// ── Pickups ───────────────────────────────────────────────────────────────────

#[test]
fn touching_a_pickup_collects_it() {
    let mut world = make_world();
    let (x, y) = (world.store.players[0].object.x, world.store.players[0].object.y);
    world.drop_pickup(x, y, PickupKind::Power);

    world.physics_step(0.2);

    assert!(world.store.pickups.is_empty());
    assert_eq!(world.stats[0].power, 1);
    assert_eq!(world.stats[0].score, 10);
}

#[test]
fn pickups_fall_and_home_above_collection_line() {
    let mut world = make_world();
    world.drop_pickup(100.0, 200.0, PickupKind::Point);
    world.update_pickups(1.0);
    assert!(world.store.pickups[0].vsp > -1.5);

    world.store.players[0].object.y = 50.0;
    world.input[0] = InputState::default();
    world.update_players(1.0);
    assert_eq!(world.store.pickups[0].homing_target, InstanceId::player(0));
}
