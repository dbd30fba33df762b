/// Boss phase state machine.
///
/// ```text
/// create ─► WaitingStart ──(60 ticks)──► Normal ──(time out / hp 0)──► end
///               ▲                                                      │
///               └────── next phase ◄── WaitingEnd (spellcards only) ◄──┘
/// ```
///
/// Ending the last phase removes the boss.
use crate::catalog::PhaseKind;
use crate::entities::{Boss, BossState, Object, PickupKind, PLAY_AREA_W};
use crate::events::StageEvent;
use crate::handle::{InstanceId, ObjectKind};
use crate::math;
use crate::script::{CoroutineSpawner, ScriptSlot};
use crate::world::{animate_object, World};

pub const BOSS_STARTING_X: f32 = PLAY_AREA_W / 2.0;
pub const BOSS_STARTING_Y: f32 = 96.0;
pub const BOSS_RADIUS: f32 = 25.0;
pub const BOSS_PHASE_START_TIME: f32 = 60.0;
pub const BOSS_SPELL_END_TIME: f32 = 60.0;

const RETURN_DECELERATION: f32 = 0.05;
const SPELL_DROPS: usize = 5;

/// Name of the global a phase's coroutine is read from.
pub fn phase_function_name(boss_index: usize, phase_index: usize) -> String {
    format!("Boss{boss_index}_Phase{phase_index}")
}

/// Give `object` the speed that, under constant deceleration `acc`, brings
/// it to rest exactly at the target.
pub fn launch_towards_point(object: &mut Object, target_x: f32, target_y: f32, acc: f32) {
    let acc = acc.abs();
    let dist = math::point_distance(object.x, object.y, target_x, target_y);
    object.spd = (dist * acc * 2.0).sqrt();
    object.acc = -acc;
    object.dir = math::angle_wrap(math::point_direction(object.x, object.y, target_x, target_y));
}

impl World {
    /// Spawn a boss at the boss start point and begin its first phase.
    /// Unknown catalog indices fall back to boss 0.
    pub fn create_boss(&mut self, boss_index: usize) -> InstanceId {
        let boss_index = if boss_index < self.catalog.boss_count() {
            boss_index
        } else {
            tracing::warn!(boss_index, "unknown boss, using boss 0");
            0
        };
        let data = self.catalog.boss(boss_index);
        let (name, sprite) = (data.name, data.spr_idle);

        let id = self.store.next_id(ObjectKind::Boss);
        self.store.push_boss(Boss {
            object: Object {
                id,
                x: BOSS_STARTING_X,
                y: BOSS_STARTING_Y,
                radius: BOSS_RADIUS,
                sprite,
                ..Object::default()
            },
            hp: 0.0,
            boss_index,
            phase_index: 0,
            timer: 0.0,
            wait_timer: 0.0,
            state: BossState::WaitingStart,
            facing: 1.0,
            coroutine: ScriptSlot::default(),
        });
        let slot = self.store.bosses.len() - 1;
        self.start_boss_phase(slot);

        tracing::info!(boss = name, %id, "created boss");
        self.emit(StageEvent::BossSpawned { id, boss_index });
        id
    }

    /// Reset hp and time from the catalog and wait before the phase script
    /// starts. Later phases first glide back to the start point.
    pub fn start_boss_phase(&mut self, slot: usize) {
        let boss = &self.store.bosses[slot];
        let (boss_index, phase_index) = (boss.boss_index, boss.phase_index);
        let phase = self.catalog.boss(boss_index).phase(phase_index).clone();

        let boss = &mut self.store.bosses[slot];
        boss.hp = phase.hp;
        boss.timer = phase.time;
        boss.wait_timer = BOSS_PHASE_START_TIME;
        boss.state = BossState::WaitingStart;

        if phase_index > 0 {
            launch_towards_point(
                &mut boss.object,
                BOSS_STARTING_X,
                BOSS_STARTING_Y,
                RETURN_DECELERATION,
            );
        }

        tracing::debug!(boss_index, phase_index, "phase start");
        if phase.kind == PhaseKind::Spellcard {
            self.emit(StageEvent::SpellcardDeclared {
                boss_index,
                phase_index,
            });
        }
    }

    /// Finish the current phase. Returns `false` when it was the last one
    /// and the boss should be removed.
    pub fn end_boss_phase(&mut self, slot: usize) -> bool {
        let cleared: Vec<(f32, f32)> = self
            .store
            .bullets
            .drain(..)
            .map(|b| (b.object.x, b.object.y))
            .collect();
        for (x, y) in cleared {
            self.drop_pickup(x, y, PickupKind::Score);
        }
        self.home_pickups(InstanceId::player(0));

        let boss = &mut self.store.bosses[slot];
        boss.coroutine.release();
        let (boss_index, phase_index) = (boss.boss_index, boss.phase_index);
        let (boss_x, boss_y) = (boss.object.x, boss.object.y);

        let data = self.catalog.boss(boss_index);
        let kind = data.kind;
        let phase_count = data.phase_count();
        let phase_kind = data.phase(phase_index).kind;

        if phase_kind == PhaseKind::Spellcard {
            for i in 0..SPELL_DROPS {
                let pickup = if i == SPELL_DROPS - 1 {
                    PickupKind::BigPower
                } else {
                    PickupKind::Power
                };
                self.scatter_pickup(boss_x, boss_y, pickup);
            }
        }

        tracing::debug!(boss_index, phase_index, "phase end");
        self.emit(StageEvent::PhaseEnded {
            boss_index,
            phase_index,
        });

        if phase_index + 1 < phase_count {
            let boss = &mut self.store.bosses[slot];
            if phase_kind == PhaseKind::Spellcard {
                boss.state = BossState::WaitingEnd;
                boss.wait_timer = BOSS_SPELL_END_TIME;
            } else {
                boss.phase_index += 1;
                self.start_boss_phase(slot);
            }
            true
        } else {
            self.home_pickups(InstanceId::player(0));
            self.emit(StageEvent::BossDefeated { boss_index, kind });
            false
        }
    }

    /// Advance one boss. Returns `false` when the boss should be removed.
    pub fn update_boss(
        &mut self,
        slot: usize,
        delta: f32,
        force_end: bool,
        scripts: &dyn CoroutineSpawner,
    ) -> bool {
        let boss = &mut self.store.bosses[slot];
        let state = boss.state;
        match state {
            BossState::Normal => {
                boss.timer = (boss.timer - delta).max(0.0);
                if boss.timer == 0.0 && !self.end_boss_phase(slot) {
                    return false;
                }
            }
            BossState::WaitingStart => {
                boss.wait_timer = (boss.wait_timer - delta).max(0.0);
                if boss.wait_timer == 0.0 {
                    boss.state = BossState::Normal;
                    let name = phase_function_name(boss.boss_index, boss.phase_index);
                    boss.coroutine = scripts.spawn_coroutine(&name);
                }
            }
            BossState::WaitingEnd => {
                boss.wait_timer = (boss.wait_timer - delta).max(0.0);
                if boss.wait_timer == 0.0 {
                    boss.phase_index += 1;
                    self.start_boss_phase(slot);
                }
            }
        }

        let boss = &mut self.store.bosses[slot];
        if boss.object.spd > 0.01 {
            boss.facing = if (90.0..270.0).contains(&boss.object.dir) {
                1.0
            } else {
                -1.0
            };
        }

        if force_end {
            let waiting_end = self.store.bosses[slot].state == BossState::WaitingEnd;
            if !waiting_end && !self.end_boss_phase(slot) {
                return false;
            }
            let boss = &mut self.store.bosses[slot];
            if boss.state == BossState::WaitingEnd {
                boss.wait_timer = 0.0;
            }
        }

        true
    }

    /// Update every boss, dropping the ones whose last phase ended.
    pub fn update_bosses(&mut self, delta: f32, force_end: bool, scripts: &dyn CoroutineSpawner) {
        let assets = self.assets.clone();
        let mut slot = 0;
        while slot < self.store.bosses.len() {
            if !self.update_boss(slot, delta, force_end, scripts) {
                self.store.bosses.remove(slot);
                continue;
            }
            let object = &mut self.store.bosses[slot].object;
            animate_object(object, assets.sprite(object.sprite), delta);
            slot += 1;
        }
    }

    /// Whether the front boss is in a spellcard that is still running.
    pub fn spellcard_active(&self) -> bool {
        self.store.bosses.first().is_some_and(|boss| {
            let phase = self.catalog.boss(boss.boss_index).phase(boss.phase_index);
            phase.kind == PhaseKind::Spellcard && boss.state != BossState::WaitingEnd
        })
    }
}
