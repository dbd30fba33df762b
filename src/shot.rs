/// Character shot types and bombs.
///
/// Reimu fires in bursts: every 4 ticks one shot of an 8-shot queue goes
/// out, and holding fire refills the queue when it runs dry. Power picks
/// the card and orb tiers; total damage per second scales from 75 at zero
/// power to 150 at full, split two thirds cards, one third orbs.
use crate::catalog::{BombType, ShotType};
use crate::entities::{
    CharacterState, PickupKind, PlayerBullet, PlayerBulletKind, ReimuState, MAX_POWER,
};
use crate::input::InputState;
use crate::math;
use crate::world::World;

const FIRE_INTERVAL: f32 = 4.0;
const FIRE_QUEUE: i32 = 8;

const MIN_DPS: f32 = 75.0;
const MAX_DPS: f32 = 150.0;

const CARD_SPEED: f32 = 16.0;
const ORB_SPEED: f32 = 12.0;
const SHOT_RADIUS: f32 = 12.0;

/// Card tier for a power level.
pub fn card_shot_type(power: i32) -> u8 {
    match power {
        p if p >= 128 => 3,
        p if p >= 32 => 2,
        p if p >= 8 => 1,
        _ => 0,
    }
}

/// Orb tier for a power level.
pub fn orb_shot_type(power: i32) -> u8 {
    match power {
        p if p >= 128 => 3,
        p if p >= 80 => 2,
        p if p >= 48 => 1,
        _ => 0,
    }
}

/// (x offset, heading) of every card in one shot.
fn card_pattern(tier: u8) -> Vec<(f32, f32)> {
    match tier {
        0 => vec![(0.0, 90.0)],
        1 => (0..2).map(|i| (-8.0 + i as f32 * 16.0, 90.0)).collect(),
        2 => (0..3).map(|i| (0.0, 85.0 + i as f32 * 5.0)).collect(),
        _ => (0..4).map(|i| (0.0, 82.5 + i as f32 * 5.0)).collect(),
    }
}

/// Orb headings for the `frame`-th shot of a burst, plus the orb damage
/// divisor (shots per second times orbs per shot).
fn orb_pattern(tier: u8, frame: i32) -> (Vec<f32>, f32) {
    let slow = 60.0 / (FIRE_INTERVAL * 4.0);
    match tier {
        0 if frame % 4 == 0 => (vec![20.0, 160.0], slow * 2.0),
        1 if frame % 4 == 0 => (vec![40.0, 20.0, 140.0, 160.0], slow * 4.0),
        0 | 1 => (Vec::new(), 1.0),
        2 => {
            let off = 45.0 + 15.0 * (frame % 3) as f32;
            (vec![90.0 - off, 90.0 + off], 15.0 * 2.0)
        }
        _ => {
            let off = 30.0 + 15.0 * (frame % 4) as f32;
            (vec![90.0 - off, 90.0 + off], 15.0 * 2.0)
        }
    }
}

impl World {
    pub fn fire_shot_type(&mut self, index: usize, delta: f32) {
        match self.character_data(index).shot_type {
            ShotType::Reimu => self.reimu_shot_type(index, delta),
        }
    }

    pub fn use_bomb(&mut self, index: usize) {
        match self.character_data(index).bomb {
            BombType::Reimu => self.reimu_bomb(),
        }
    }

    fn reimu_state(&mut self, index: usize) -> &mut ReimuState {
        match &mut self.store.players[index].character {
            CharacterState::Reimu(state) => state,
        }
    }

    fn reimu_shot_type(&mut self, index: usize, delta: f32) {
        let fire_held = self.input[index].held(InputState::FIRE);

        self.reimu_state(index).fire_timer += delta;
        while self.reimu_state(index).fire_timer >= FIRE_INTERVAL {
            let state = self.reimu_state(index);
            if state.fire_queue == 0 && fire_held {
                state.fire_queue = FIRE_QUEUE;
            }

            if state.fire_queue > 0 {
                let frame = FIRE_QUEUE - state.fire_queue;
                self.reimu_fire(index, frame);
                self.reimu_state(index).fire_queue -= 1;
            }

            self.reimu_state(index).fire_timer -= FIRE_INTERVAL;
        }
    }

    fn reimu_fire(&mut self, index: usize, frame: i32) {
        let power = self.stats[index].power;
        let (x, y) = {
            let object = &self.store.players[index].object;
            (object.x, object.y)
        };
        let dps = math::lerp(MIN_DPS, MAX_DPS, power as f32 / MAX_POWER as f32);

        let cards = card_pattern(card_shot_type(power));
        let card_dmg = dps * (2.0 / 3.0) / 15.0 / cards.len() as f32;
        let card_sprite = self.sprites.reimu_card;
        for (dx, dir) in cards {
            self.store.player_bullets.push(PlayerBullet {
                x: x + dx,
                y: y - 10.0,
                spd: CARD_SPEED,
                dir,
                radius: SHOT_RADIUS,
                sprite: card_sprite,
                dmg: card_dmg,
                kind: PlayerBulletKind::ReimuCard,
                ..PlayerBullet::default()
            });
        }

        let (orbs, divisor) = orb_pattern(orb_shot_type(power), frame);
        let orb_dmg = dps * (1.0 / 3.0) / divisor;
        let orb_sprite = self.sprites.reimu_orb_shot;
        for dir in orbs {
            self.store.player_bullets.push(PlayerBullet {
                x,
                y,
                spd: ORB_SPEED,
                dir,
                radius: SHOT_RADIUS,
                sprite: orb_sprite,
                dmg: orb_dmg,
                kind: PlayerBulletKind::ReimuOrbShot,
                ..PlayerBullet::default()
            });
        }
    }

    /// Fantasy Seal: every enemy bullet on screen turns into a score item.
    fn reimu_bomb(&mut self) {
        let cleared: Vec<(f32, f32)> = self
            .store
            .bullets
            .drain(..)
            .map(|b| (b.object.x, b.object.y))
            .collect();
        for (x, y) in cleared {
            self.drop_pickup(x, y, PickupKind::Score);
        }
    }
}
