use std::rc::Rc;

use danmaku::assets::{AssetTable, SpriteId};
use danmaku::boss::{BOSS_STARTING_X, BOSS_STARTING_Y};
use danmaku::catalog::{BossData, BossKind};
use danmaku::config::StageConfig;
use danmaku::entities::*;
use danmaku::events::StageEvent;
use danmaku::handle::{InstanceId, ObjectKind};
use danmaku::input::FixedInput;
use danmaku::world::{Spawn, World};
use danmaku::Stage;

fn make_world() -> World {
    World::new(StageConfig::default(), Rc::new(AssetTable::new())).unwrap()
}

/// Run the boss machine without scripts.
fn tick_bosses(world: &mut World, ticks: usize) {
    for _ in 0..ticks {
        world.update_bosses(1.0, false, &());
    }
}

fn shoot_boss(world: &mut World, dmg: f32) {
    let boss = &world.store.bosses[0].object;
    let (x, y) = (boss.x, boss.y);
    let pb = world.store.create_player_bullet();
    pb.x = x;
    pb.y = y;
    pb.radius = 4.0;
    pb.dmg = dmg;
}

// ── Creation ──────────────────────────────────────────────────────────────────

#[test]
fn create_boss_waits_before_phase_zero() {
    let mut world = make_world();
    let id = world.create_boss(0);

    assert_eq!(id.kind(), Some(ObjectKind::Boss));
    let boss = &world.store.bosses[0];
    assert_eq!(boss.state, BossState::WaitingStart);
    assert_eq!(boss.phase_index, 0);
    assert_eq!(boss.wait_timer, 60.0);
    assert_eq!(boss.hp, 1500.0);
    assert_eq!((boss.object.x, boss.object.y), (BOSS_STARTING_X, BOSS_STARTING_Y));
    assert!(world
        .drain_events()
        .contains(&StageEvent::BossSpawned { id, boss_index: 0 }));
}

#[test]
fn unknown_boss_index_falls_back_to_zero() {
    let mut world = make_world();
    world.create_boss(99);
    assert_eq!(world.store.bosses[0].boss_index, 0);
}

#[test]
fn boss_becomes_normal_after_60_ticks() {
    let mut world = make_world();
    world.create_boss(0);

    tick_bosses(&mut world, 59);
    assert_eq!(world.store.bosses[0].state, BossState::WaitingStart);

    tick_bosses(&mut world, 1);
    assert_eq!(world.store.bosses[0].state, BossState::Normal);
}

// ── Damage ────────────────────────────────────────────────────────────────────

#[test]
fn damage_ignored_while_waiting() {
    let mut world = make_world();
    world.create_boss(0);
    shoot_boss(&mut world, 100.0);

    world.physics_step(0.2);

    assert_eq!(world.store.bosses[0].hp, 1500.0);
    assert!(world.store.player_bullets.is_empty());
}

#[test]
fn damage_applies_in_normal() {
    let mut world = make_world();
    world.create_boss(0);
    tick_bosses(&mut world, 60);
    shoot_boss(&mut world, 100.0);

    world.physics_step(0.2);

    assert_eq!(world.store.bosses[0].hp, 1400.0);
}

#[test]
fn nonspell_hp_zero_starts_next_phase() {
    let mut world = make_world();
    world.create_boss(0);
    tick_bosses(&mut world, 60);
    world.store.bosses[0].object.x = 100.0;
    shoot_boss(&mut world, 5000.0);

    world.physics_step(0.2);

    let boss = &world.store.bosses[0];
    assert_eq!(boss.phase_index, 1);
    assert_eq!(boss.state, BossState::WaitingStart);
    assert_eq!(boss.hp, 1500.0);
    assert_eq!(boss.timer, 30.0 * 60.0);
    // Glides back towards the start point and decelerates.
    assert!(boss.object.spd > 0.0);
    assert!(boss.object.acc < 0.0);
}

#[test]
fn return_glide_heading_is_wrapped() {
    let mut world = make_world();
    world.create_boss(0);
    tick_bosses(&mut world, 60);
    // Up and right of the start point, so the raw bearing is negative.
    world.store.bosses[0].object.x = BOSS_STARTING_X + 58.0;
    world.store.bosses[0].object.y = BOSS_STARTING_Y - 46.0;

    world.end_boss_phase(0);

    let dir = world.store.bosses[0].object.dir;
    assert!((0.0..360.0).contains(&dir), "{dir}");
    assert!((dir - 218.4).abs() < 0.1, "{dir}");

    tick_bosses(&mut world, 1);
    assert_eq!(world.store.bosses[0].facing, 1.0);
}

// ── Phase end ─────────────────────────────────────────────────────────────────

#[test]
fn timeout_ends_phase() {
    let mut world = make_world();
    world.create_boss(0);
    tick_bosses(&mut world, 60);
    world.store.bosses[0].timer = 1.0;

    tick_bosses(&mut world, 1);

    assert_eq!(world.store.bosses[0].phase_index, 1);
}

#[test]
fn phase_end_converts_bullets_and_homes_pickups() {
    let mut world = make_world();
    world.create_boss(0);
    tick_bosses(&mut world, 60);
    for i in 0..4 {
        let spawn = Spawn {
            x: 40.0 * i as f32,
            y: 200.0,
            ..Spawn::default()
        };
        world.spawn_bullet(spawn, BulletShape::Bullet);
    }
    world.store.bosses[0].timer = 1.0;

    tick_bosses(&mut world, 1);

    assert!(world.store.bullets.is_empty());
    assert_eq!(world.store.pickups.len(), 4);
    assert!(world
        .store
        .pickups
        .iter()
        .all(|p| p.kind == PickupKind::Score && p.homing_target == InstanceId::player(0)));
}

#[test]
fn spellcard_end_waits_and_drops_power() {
    let mut world = make_world();
    world.create_boss(0);
    world.store.bosses[0].phase_index = 1;
    world.start_boss_phase(0);
    tick_bosses(&mut world, 60);
    assert!(world.spellcard_active());

    world.store.bosses[0].timer = 1.0;
    tick_bosses(&mut world, 1);

    let boss = &world.store.bosses[0];
    assert_eq!(boss.state, BossState::WaitingEnd);
    assert_eq!(boss.wait_timer, 60.0);
    assert_eq!(boss.phase_index, 1);
    assert!(!world.spellcard_active());
    let power = world.store.pickups.iter().filter(|p| p.kind == PickupKind::Power).count();
    let big = world.store.pickups.iter().filter(|p| p.kind == PickupKind::BigPower).count();
    assert_eq!((power, big), (4, 1));

    tick_bosses(&mut world, 60);
    let boss = &world.store.bosses[0];
    assert_eq!(boss.phase_index, 2);
    assert_eq!(boss.state, BossState::WaitingStart);
}

#[test]
fn phase_index_only_grows() {
    let mut world = make_world();
    world.create_boss(0);
    let mut last = 0;
    for _ in 0..600 {
        world.update_bosses(1.0, true, &());
        let Some(boss) = world.store.bosses.first() else {
            break;
        };
        assert!(boss.phase_index >= last);
        last = boss.phase_index;
    }
    assert!(world.store.bosses.is_empty());
}

#[test]
fn last_phase_end_removes_boss() {
    let mut world = make_world();
    world.create_boss(0);
    world.store.bosses[0].phase_index = 4;
    world.start_boss_phase(0);
    world.drain_events();

    world.update_bosses(1.0, true, &());

    assert!(world.store.bosses.is_empty());
    let events = world.drain_events();
    assert!(events.contains(&StageEvent::BossDefeated {
        boss_index: 0,
        kind: BossKind::Boss,
    }));
}

#[test]
fn registered_midboss_reports_its_kind() {
    let mut world = make_world();
    let index = world.catalog.push_boss(BossData {
        name: "Daiyousei",
        kind: BossKind::Midboss,
        spr_idle: SpriteId::STUB,
        spr_move_right: SpriteId::STUB,
        spr_move_left: SpriteId::STUB,
        phases: Vec::new(),
    });
    assert_eq!(index, 1);

    world.create_boss(index);
    assert_eq!(world.store.bosses[0].boss_index, 1);
    world.drain_events();

    world.update_bosses(1.0, true, &());

    assert!(world.store.bosses.is_empty());
    assert!(world.drain_events().contains(&StageEvent::BossDefeated {
        boss_index: 1,
        kind: BossKind::Midboss,
    }));
}

#[test]
fn force_end_during_spell_wait_skips_the_wait() {
    let mut world = make_world();
    world.create_boss(0);
    world.store.bosses[0].phase_index = 1;
    world.start_boss_phase(0);
    tick_bosses(&mut world, 60);
    world.store.bosses[0].timer = 1.0;
    tick_bosses(&mut world, 1);
    assert_eq!(world.store.bosses[0].state, BossState::WaitingEnd);
    let drops = world.store.pickups.len();

    world.update_bosses(1.0, true, &());
    assert_eq!(world.store.bosses[0].wait_timer, 0.0);
    assert_eq!(world.store.pickups.len(), drops);

    tick_bosses(&mut world, 1);
    let boss = &world.store.bosses[0];
    assert_eq!(boss.phase_index, 2);
    assert_eq!(boss.state, BossState::WaitingStart);
}

// ── With scripts ──────────────────────────────────────────────────────────────

const PHASE_SCRIPT: &str = r#"
ticks = 0
function Boss0_Phase0(id)
    while true do
        ticks = ticks + 1
        wait(1)
    end
end
"#;

fn stage_with(source: &str) -> Stage {
    let mut assets = AssetTable::new();
    assets.add_script("boss", source);
    Stage::new(StageConfig::default(), Rc::new(assets)).unwrap()
}

#[test]
fn phase_coroutine_bound_when_normal() {
    let mut stage = stage_with(PHASE_SCRIPT);
    let mut input = FixedInput::default();
    stage.world_mut().create_boss(0);

    for _ in 0..59 {
        stage.update(1.0, &mut input);
    }
    assert!(!stage.world().store.bosses[0].coroutine.is_bound());

    stage.update(1.0, &mut input);
    {
        let world = stage.world();
        assert_eq!(world.store.bosses[0].state, BossState::Normal);
        assert!(world.store.bosses[0].coroutine.is_bound());
    }

    for _ in 0..10 {
        stage.update(1.0, &mut input);
    }
    assert_eq!(stage.exec_console("return ticks").unwrap(), vec!["11"]);
}

#[test]
fn force_end_releases_phase_coroutine() {
    let mut stage = stage_with(PHASE_SCRIPT);
    let mut input = FixedInput::default();
    stage.world_mut().create_boss(0);
    for _ in 0..61 {
        stage.update(1.0, &mut input);
    }

    input.force_end_phase = true;
    stage.update(1.0, &mut input);

    let world = stage.world();
    let boss = &world.store.bosses[0];
    assert_eq!(boss.phase_index, 1);
    assert!(!boss.coroutine.is_bound());
}

#[test]
fn spellcard_background_fades_in() {
    let mut stage = stage_with("");
    let mut input = FixedInput::default();
    stage.world_mut().create_boss(0);
    {
        let mut world = stage.world_mut();
        world.store.bosses[0].phase_index = 1;
        world.start_boss_phase(0);
    }

    for _ in 0..15 {
        stage.update(1.0, &mut input);
    }
    assert!((stage.spellcard_bg_alpha() - 0.5).abs() < 1e-3);

    for _ in 0..30 {
        stage.update(1.0, &mut input);
    }
    assert_eq!(stage.spellcard_bg_alpha(), 1.0);
}
