use std::rc::Rc;

use danmaku::assets::{AssetTable, Sprite};
use danmaku::config::StageConfig;
use danmaku::entities::*;
use danmaku::events::StageEvent;
use danmaku::input::{FixedInput, InputState};
use danmaku::world::{PLAYER_STARTING_X, PLAYER_STARTING_Y};
use danmaku::{Stage, StageError};

fn stage_with(source: &str) -> Stage {
    stage_with_config(source, StageConfig::default())
}

fn stage_with_config(source: &str, config: StageConfig) -> Stage {
    let mut assets = AssetTable::new();
    assets.add_sprite(Sprite::new("bullet", 16, 16));
    assets.add_script("test", source);
    Stage::new(config, Rc::new(assets)).unwrap()
}

fn run(stage: &mut Stage, ticks: usize) {
    let mut input = FixedInput::default();
    for _ in 0..ticks {
        stage.update(1.0, &mut input);
    }
}

/// First value of a console expression.
fn eval(stage: &Stage, expr: &str) -> String {
    let values = stage.exec_console(&format!("return {expr}")).unwrap();
    values.into_iter().next().unwrap_or_default()
}

fn eval_num(stage: &Stage, expr: &str) -> f32 {
    eval(stage, expr).parse().unwrap()
}

// ── Coroutines ────────────────────────────────────────────────────────────────

#[test]
fn stage_coroutine_gets_minus_one() {
    let mut stage = stage_with("function Stage0(id) seen = id end");
    assert!(stage.stage_script_running());

    run(&mut stage, 1);

    assert_eq!(eval(&stage, "seen"), "-1");
    assert!(!stage.stage_script_running());
}

#[test]
fn wait_suspends_for_whole_ticks() {
    let mut stage = stage_with(
        r#"
        marks = {}
        function Stage0()
            table.insert(marks, GetTime())
            wait(3)
            table.insert(marks, GetTime())
            wait()
            table.insert(marks, GetTime())
        end
        "#,
    );
    run(&mut stage, 6);
    assert_eq!(eval(&stage, "table.concat(marks, ',')"), "0.0,3.0,4.0");
}

#[test]
fn quarter_subwaits_yield_once_per_tick() {
    let mut stage = stage_with(
        r#"
        steps = 0
        function Stage0()
            while true do
                steps = steps + 1
                _subwait(0.25)
            end
        end
        "#,
    );
    run(&mut stage, 5);
    assert_eq!(eval(&stage, "steps"), "20");
}

#[test]
fn subtick_remainder_is_per_coroutine() {
    let mut stage = stage_with(
        r#"
        a, b = 0, 0
        local function counter(name, t)
            return function()
                while true do
                    _G[name] = _G[name] + 1
                    wait(t)
                end
            end
        end
        function Stage0()
            CreateBullet(100, 100, 0, 0, 0, 4, 0, 0, counter("a", 0.5))
            CreateBullet(120, 100, 0, 0, 0, 4, 0, 0, counter("b", 2))
        end
        "#,
    );
    // Bullets are resumed from the second tick on.
    run(&mut stage, 5);
    assert_eq!(eval(&stage, "a"), "8");
    assert_eq!(eval(&stage, "b"), "2");
}

#[test]
fn spawned_objects_wait_for_next_round() {
    let mut stage = stage_with(
        r#"
        runs = 0
        function Stage0()
            CreateBullet(100, 100, 0, 0, 0, 4, 0, 0, function(id)
                runs = runs + 1
            end)
        end
        "#,
    );
    run(&mut stage, 1);
    assert_eq!(eval(&stage, "runs"), "0");
    assert!(stage.world().store.bullets[0].coroutine.is_bound());

    run(&mut stage, 1);
    assert_eq!(eval(&stage, "runs"), "1");
    // Returned: binding released, bullet stays.
    let world = stage.world();
    assert_eq!(world.store.bullets.len(), 1);
    assert!(!world.store.bullets[0].coroutine.is_bound());
}

#[test]
fn coroutine_receives_own_handle() {
    let mut stage = stage_with(
        r#"
        function Stage0()
            spawned = CreateBullet(100, 100, 0, 0, 0, 4, 0, 0, function(id)
                got = id
            end)
        end
        "#,
    );
    run(&mut stage, 2);
    assert_eq!(eval(&stage, "got == spawned"), "true");
}

#[test]
fn runtime_error_releases_but_keeps_object() {
    let mut stage = stage_with(
        r#"
        function Stage0()
            CreateBullet(100, 100, 0, 0, 0, 4, 0, 0, function(id)
                error("boom")
            end)
        end
        "#,
    );
    run(&mut stage, 2);
    let world = stage.world();
    assert_eq!(world.store.bullets.len(), 1);
    assert!(!world.store.bullets[0].coroutine.is_bound());
}

#[test]
fn bad_host_args_fail_the_coroutine_only() {
    let mut stage = stage_with(
        r#"
        after = false
        function Stage0()
            CreateBullet(1, 2, 3)
            after = true
        end
        "#,
    );
    run(&mut stage, 2);
    assert_eq!(eval(&stage, "after"), "false");
    assert!(!stage.stage_script_running());
    assert!(stage.world().store.bullets.is_empty());
}

#[test]
fn round_resumes_stage_then_bosses_enemies_bullets() {
    let mut stage = stage_with(
        r#"
        order = {}
        local function tag(name)
            return function(id)
                while true do
                    table.insert(order, name)
                    wait(1)
                end
            end
        end
        Boss0_Phase0 = tag("boss")
        Stage0 = tag("stage")
        CreateBullet(100, 100, 0, 0, 0, 4, 0, 0, tag("bullet"))
        CreateEnemy(100, 50, 0, 0, 0, 4, 0, 10, 0, tag("enemy"))
        "#,
    );
    stage.world_mut().create_boss(0);
    run(&mut stage, 60);
    assert!(stage.world().store.bosses[0].coroutine.is_bound());

    stage.exec_console("order = {}").unwrap();
    run(&mut stage, 1);
    assert_eq!(eval(&stage, "table.concat(order, ',')"), "stage,boss,enemy,bullet");
}

#[test]
fn focused_console_zeroes_player_input() {
    let mut stage = stage_with("");
    let mut input = FixedInput::player0(InputState::default().with(InputState::LEFT));
    input.console_focused = true;
    stage.update(1.0, &mut input);
    assert_eq!(stage.world().store.players[0].object.x, PLAYER_STARTING_X);

    input.console_focused = false;
    stage.update(1.0, &mut input);
    assert!(stage.world().store.players[0].object.x < PLAYER_STARTING_X);
}

// ── Host functions ────────────────────────────────────────────────────────────

#[test]
fn console_reports_argument_errors() {
    let stage = stage_with("");
    let err = stage.exec_console("CreateBullet(1)").unwrap_err();
    assert!(matches!(err, StageError::Lua(_)));
    assert!(err.to_string().contains("CreateBullet"), "{err}");

    let err = stage.exec_console("GetX()").unwrap_err();
    assert!(err.to_string().contains("expected 1 args got 0"), "{err}");

    let err = stage.exec_console("GetX('nope')").unwrap_err();
    assert!(err.to_string().contains("bad argument #1"), "{err}");
}

#[test]
fn stale_handles_read_zero_and_ignore_writes() {
    let stage = stage_with("");
    assert_eq!(eval(&stage, "GetX(123456) == 0 and GetSpr(-1) == 0"), "true");
    stage.exec_console("SetX(123456, 5)").unwrap();
}

#[test]
fn accessors_reach_objects() {
    let stage = stage_with("");
    stage
        .exec_console("b = CreateBullet(10, 20, 2, 45, 0.5, 4, FindSprite('bullet'), 0)")
        .unwrap();
    assert_eq!(eval_num(&stage, "GetX(b)"), 10.0);
    assert_eq!(eval_num(&stage, "GetSpd(b)"), 2.0);
    assert_eq!(eval(&stage, "GetSpr(b)"), "1");

    stage.exec_console("SetX(b, 30) SetDir(b, -90) SetSpd(b, 4)").unwrap();
    let world = stage.world();
    let bullet = &world.store.bullets[0].object;
    assert_eq!(bullet.x, 30.0);
    assert_eq!(bullet.dir, 270.0);
    assert_eq!(bullet.spd, 4.0);
}

#[test]
fn set_spd_clamps_negative_to_zero() {
    let stage = stage_with("");
    stage
        .exec_console("b = CreateBullet(10, 20, 2, 45, 0, 4, 0, 0) SetSpd(b, -3)")
        .unwrap();
    assert_eq!(eval_num(&stage, "GetSpd(b)"), 0.0);
    assert_eq!(stage.world().store.bullets[0].object.spd, 0.0);
}

#[test]
fn player_handle_is_reachable() {
    let stage = stage_with("");
    assert_eq!(eval(&stage, "GetTarget(-1)"), "0");
    assert_eq!(eval_num(&stage, "GetY(GetTarget(-1))"), PLAYER_STARTING_Y);
}

#[test]
fn find_sprite_falls_back_to_stub() {
    let stage = stage_with("");
    assert_eq!(eval(&stage, "FindSprite('missing')"), "0");
    assert_eq!(eval(&stage, "FindSprite('bullet')"), "1");
}

#[test]
fn random_is_seeded() {
    let config = StageConfig {
        seed: Some(99),
        ..StageConfig::default()
    };
    let a = stage_with_config("", config.clone());
    let b = stage_with_config("", config);
    let draw = "random(), random(10), random(5, 6)";
    let chunk = format!("return {draw}");
    assert_eq!(a.exec_console(&chunk).unwrap(), b.exec_console(&chunk).unwrap());

    let r = eval_num(&a, "random(5, 6)");
    assert!((5.0..=6.0).contains(&r));
}

#[test]
fn sandbox_hides_file_and_os_access() {
    let stage = stage_with("");
    let values = stage
        .exec_console("return io == nil, os == nil, load == nil, dofile == nil")
        .unwrap();
    assert_eq!(values, vec!["true", "true", "true", "true"]);
}

#[test]
fn console_returns_every_value() {
    let stage = stage_with("");
    let values = stage.exec_console("return 1, 'two', nil").unwrap();
    assert_eq!(values, vec!["1", "two", "nil"]);
}

#[test]
fn kill_and_is_alive() {
    let mut stage = stage_with("");
    stage
        .exec_console("e = CreateEnemy(100, 100, 0, 0, 0, 10, 0, 10, 0)")
        .unwrap();
    assert_eq!(eval(&stage, "IsAlive(e)"), "true");

    stage.exec_console("Kill(e)").unwrap();
    assert_eq!(eval(&stage, "IsAlive(e)"), "false");
    run(&mut stage, 1);
    assert!(stage.world().store.enemies.is_empty());
}

// ── Callbacks ─────────────────────────────────────────────────────────────────

#[test]
fn update_callbacks_run_enemies_first() {
    let mut stage = stage_with(
        r#"
        order = {}
        b = CreateBullet(100, 100, 0, 0, 0, 4, 0, 0)
        e = CreateEnemy(100, 50, 0, 0, 0, 10, 0, 10, 0)
        SetUpdate(b, function(id) table.insert(order, "b") end)
        SetUpdate(e, function(id) table.insert(order, "e") end)
        "#,
    );
    run(&mut stage, 2);
    assert_eq!(eval(&stage, "table.concat(order)"), "ebeb");
}

#[test]
fn failing_update_callback_is_dropped() {
    let mut stage = stage_with(
        r#"
        calls = 0
        b = CreateBullet(100, 100, 0, 0, 0, 4, 0, 0)
        SetUpdate(b, function(id)
            calls = calls + 1
            error("nope")
        end)
        "#,
    );
    run(&mut stage, 3);
    assert_eq!(eval(&stage, "calls"), "1");
    assert_eq!(stage.world().store.bullets.len(), 1);
}

#[test]
fn death_callback_sees_the_enemy() {
    let mut stage = stage_with(
        r#"
        e = CreateEnemy(100, 100, 0, 0, 0, 10, 0, 1, 1, nil, nil, function(id)
            died, died_x = id, GetX(id)
        end)
        "#,
    );
    {
        let mut world = stage.world_mut();
        let pb = world.store.create_player_bullet();
        pb.x = 100.0;
        pb.y = 100.0;
        pb.radius = 4.0;
        pb.dmg = 5.0;
    }

    run(&mut stage, 1);

    assert_eq!(eval(&stage, "died == e"), "true");
    assert_eq!(eval_num(&stage, "died_x"), 100.0);
    assert_eq!(eval(&stage, "IsAlive(e)"), "false");
    let world = stage.world();
    assert!(world.store.enemies.is_empty());
    // Drop table 1 always leaves an item.
    assert_eq!(world.store.pickups.len(), 1);
}

// ── Lasers ────────────────────────────────────────────────────────────────────

#[test]
fn laser_extends_over_its_charge_time() {
    let mut stage = stage_with("l = CreateLazer(192, 100, 10, 270, 0, 100, 8, 0)");
    let id = stage.world().store.bullets[0].object.id;
    assert!(stage.drain_events().contains(&StageEvent::LaserFired { id }));

    run(&mut stage, 5);
    {
        let world = stage.world();
        let laser = world.store.bullets[0].laser().cloned().unwrap();
        assert_eq!(laser.timer, 5.0);
        assert!((laser.length - 50.0).abs() < 1e-3);
        // Origin holds still while charging.
        assert_eq!(world.store.bullets[0].object.y, 100.0);
    }

    run(&mut stage, 6);
    let world = stage.world();
    let bullet = &world.store.bullets[0];
    assert_eq!(bullet.laser().map(|l| l.length), Some(100.0));
    assert!(bullet.object.y > 100.0);
}

#[test]
fn soft_laser_is_harmless_while_charging() {
    let mut stage = stage_with("");
    stage.world_mut().store.players[0].iframes = 0.0;
    // Runs from y 300 down through the player once it has warmed up.
    stage
        .exec_console("CreateSLazer(192, 300, 1, 270, 0, 200, 16, 0)")
        .unwrap();

    run(&mut stage, 1);
    assert_eq!(stage.world().store.players[0].state, PlayerState::Normal);

    {
        let mut world = stage.world_mut();
        if let BulletShape::SoftLaser(laser) = &mut world.store.bullets[0].shape {
            laser.timer = laser.time;
        }
    }
    run(&mut stage, 1);
    assert_eq!(stage.world().store.players[0].state, PlayerState::Dying);
}

#[test]
fn rect_bullet_hits_along_its_length() {
    let mut stage = stage_with("");
    stage.world_mut().store.players[0].iframes = 0.0;
    // 8 wide, 120 long, pointing down; its tip reaches the player.
    stage
        .exec_console("CreateRect(192, 330, 0, 270, 0, 8, 120, 0, 0)")
        .unwrap();

    run(&mut stage, 1);
    assert_eq!(stage.world().store.players[0].state, PlayerState::Dying);
}

// ── Teardown ──────────────────────────────────────────────────────────────────

#[test]
fn clear_drops_objects_and_stage_script() {
    let mut stage = stage_with(
        r#"
        function Stage0()
            while true do
                CreateBullet(100, 100, 0, 0, 0, 4, 0, 0)
                wait(1)
            end
        end
        "#,
    );
    run(&mut stage, 3);
    let before = stage.diagnostics();
    assert_eq!(before.bullets, 3);
    assert!(before.lua_memory > 0);

    stage.clear();

    assert!(!stage.stage_script_running());
    let after = stage.diagnostics();
    assert_eq!(after.bullets, 0);
    assert_eq!(after.next_sequence, before.next_sequence);

    run(&mut stage, 1);
    assert_eq!(stage.diagnostics().bullets, 0);
}
