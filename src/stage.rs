use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use crate::assets::AssetSource;
use crate::config::StageConfig;
use crate::error::StageError;
use crate::events::StageEvent;
use crate::handle::InstanceId;
use crate::input::{InputSource, InputState};
use crate::math;
use crate::script::{CoroutineSpawner, Resume, ScriptBridge, ScriptSlot, CORO_DELTA};
use crate::world::World;

/// Ticks for the spellcard background to fully fade in or out.
const SPELLCARD_FADE_TIME: f32 = 30.0;

/// Counters for the debug overlay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub bosses: usize,
    pub enemies: usize,
    pub bullets: usize,
    pub player_bullets: usize,
    pub pickups: usize,
    pub next_sequence: u32,
    pub lua_memory: usize,
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bosses {} enemies {} bullets {} shots {} pickups {} next id {} lua {} KiB",
            self.bosses,
            self.enemies,
            self.bullets,
            self.player_bullets,
            self.pickups,
            self.next_sequence,
            self.lua_memory / 1024,
        )
    }
}

pub struct Stage {
    world: Rc<RefCell<World>>,
    bridge: ScriptBridge,
    stage_coroutine: ScriptSlot,
    coro_timer: f32,
    spellcard_bg_alpha: f32,
}

impl Stage {
    /// Build the world, start the script runtime, run every script source
    /// once and bind the stage coroutine.
    pub fn new(config: StageConfig, assets: Rc<dyn AssetSource>) -> Result<Self, StageError> {
        let memory_limit = config.script_memory_limit;
        let world = Rc::new(RefCell::new(World::new(config, assets.clone())?));
        let bridge = ScriptBridge::new(world.clone(), memory_limit)?;
        bridge.load_scripts(assets.scripts());

        let mut stage = Self {
            world,
            bridge,
            stage_coroutine: ScriptSlot::default(),
            coro_timer: 0.0,
            spellcard_bg_alpha: 0.0,
        };
        stage.start_stage_script();
        Ok(stage)
    }

    /// (Re)bind the stage coroutine from the configured global.
    pub fn start_stage_script(&mut self) {
        let name = self.world.borrow().config.stage_function.clone();
        self.stage_coroutine = self.bridge.spawn_coroutine(&name);
        if self.stage_coroutine.is_bound() {
            tracing::info!(function = %name, "stage script started");
        }
    }

    pub fn world(&self) -> Ref<'_, World> {
        self.world.borrow()
    }

    pub fn world_mut(&self) -> RefMut<'_, World> {
        self.world.borrow_mut()
    }

    pub fn time(&self) -> f32 {
        self.world.borrow().time
    }

    pub fn spellcard_bg_alpha(&self) -> f32 {
        self.spellcard_bg_alpha
    }

    pub fn drain_events(&self) -> Vec<StageEvent> {
        self.world.borrow_mut().drain_events()
    }

    pub fn stage_script_running(&self) -> bool {
        self.stage_coroutine.is_bound()
    }

    /// Run a console chunk against the live stage.
    pub fn exec_console(&self, chunk: &str) -> Result<Vec<String>, StageError> {
        self.bridge.exec(chunk)
    }

    pub fn diagnostics(&self) -> Diagnostics {
        let world = self.world.borrow();
        let store = &world.store;
        Diagnostics {
            bosses: store.bosses.len(),
            enemies: store.enemies.len(),
            bullets: store.bullets.len(),
            player_bullets: store.player_bullets.len(),
            pickups: store.pickups.len(),
            next_sequence: store.next_sequence(),
            lua_memory: self.bridge.used_memory(),
        }
    }

    /// Drop every object and script binding. Players stay.
    pub fn clear(&mut self) {
        self.stage_coroutine.release();
        self.world.borrow_mut().store.clear();
        self.coro_timer = 0.0;
        self.bridge.expire();
        tracing::debug!("stage cleared");
    }

    // ── Frame ─────────────────────────────────────────────────────────────────

    pub fn update(&mut self, delta: f32, input: &mut dyn InputSource) {
        let force_end = input.force_end_phase();
        {
            let mut world = self.world.borrow_mut();
            let console = input.console_focused();
            for index in 0..world.player_count() {
                world.input[index] = if console {
                    InputState::default()
                } else {
                    input.player_input(index)
                };
            }

            world.update_players(delta);
            world.update_bosses(delta, force_end, &self.bridge);
            world.update_bullets(delta);
            world.update_player_bullets(delta);
            world.update_pickups(delta);
        }

        self.physics(delta);
        self.run_scripts(delta);

        {
            let mut world = self.world.borrow_mut();
            world.remove_dead();
            world.settle_players();
            world.cull(delta);

            let target = if world.spellcard_active() { 1.0 } else { 0.0 };
            self.spellcard_bg_alpha =
                math::approach(self.spellcard_bg_alpha, target, delta / SPELLCARD_FADE_TIME);

            world.time += delta;
        }

        self.bridge.expire();
    }

    fn physics(&mut self, delta: f32) {
        let max_step = self.world.borrow().config.max_substep();
        let steps = (delta / max_step).ceil().max(1.0) as usize;
        let step = delta / steps as f32;

        for _ in 0..steps {
            let killed = self.world.borrow_mut().physics_step(step);
            for id in killed {
                self.run_death_callback(id);
            }
            self.world.borrow_mut().store.remove_dead_enemies();
        }
    }

    // ── Scripts ───────────────────────────────────────────────────────────────

    fn run_scripts(&mut self, delta: f32) {
        self.coro_timer += delta;
        while self.coro_timer >= CORO_DELTA {
            self.coroutine_round();
            self.coro_timer -= CORO_DELTA;
        }

        let callbacks: Vec<InstanceId> = {
            let world = self.world.borrow();
            let enemies = world
                .store
                .enemies
                .iter()
                .filter(|e| e.update_callback.is_bound())
                .map(|e| e.object.id);
            let bullets = world
                .store
                .bullets
                .iter()
                .filter(|b| b.update_callback.is_bound())
                .map(|b| b.object.id);
            enemies.chain(bullets).collect()
        };
        for id in callbacks {
            self.run_update_callback(id);
        }
    }

    /// Resume the stage coroutine, then every boss, enemy and bullet
    /// coroutine. Objects spawned during the round wait for the next one.
    fn coroutine_round(&mut self) {
        let ids: Vec<InstanceId> = {
            let world = self.world.borrow();
            let store = &world.store;
            let bosses = store
                .bosses
                .iter()
                .filter(|b| b.coroutine.is_bound())
                .map(|b| b.object.id);
            let enemies = store
                .enemies
                .iter()
                .filter(|e| e.coroutine.is_bound())
                .map(|e| e.object.id);
            let bullets = store
                .bullets
                .iter()
                .filter(|b| b.coroutine.is_bound())
                .map(|b| b.object.id);
            bosses.chain(enemies).chain(bullets).collect()
        };

        if let Some(thread) = self.bridge.thread(&self.stage_coroutine) {
            match self
                .bridge
                .resume(&thread, InstanceId::NULL, self.stage_coroutine.subtick())
            {
                Resume::Yielded(subtick) => self.stage_coroutine.set_subtick(subtick),
                Resume::Finished | Resume::Failed => self.stage_coroutine.release(),
            }
        }

        for id in ids {
            self.resume_entity(id);
        }
    }

    fn resume_entity(&self, id: InstanceId) {
        let (thread, subtick) = {
            let mut world = self.world.borrow_mut();
            let Some(slot) = world.store.coroutine_slot_mut(id) else {
                return;
            };
            let Some(thread) = self.bridge.thread(slot) else {
                return;
            };
            (thread, slot.subtick())
        };

        let outcome = self.bridge.resume(&thread, id, subtick);

        let mut world = self.world.borrow_mut();
        if let Some(slot) = world.store.coroutine_slot_mut(id) {
            match outcome {
                Resume::Yielded(subtick) => slot.set_subtick(subtick),
                Resume::Finished | Resume::Failed => slot.release(),
            }
        }
    }

    fn run_update_callback(&self, id: InstanceId) {
        let function = {
            let mut world = self.world.borrow_mut();
            world
                .store
                .update_slot_mut(id)
                .and_then(|slot| self.bridge.function(slot))
        };
        let Some(function) = function else {
            return;
        };

        if !self.bridge.call(&function, id) {
            if let Some(slot) = self.world.borrow_mut().store.update_slot_mut(id) {
                slot.release();
            }
        }
    }

    /// The enemy is flagged dead but still in the store while this runs.
    fn run_death_callback(&self, id: InstanceId) {
        let function = {
            let mut world = self.world.borrow_mut();
            world
                .store
                .death_slot_mut(id)
                .and_then(|slot| self.bridge.function(slot))
        };
        if let Some(function) = function {
            self.bridge.call(&function, id);
        }
    }
}
