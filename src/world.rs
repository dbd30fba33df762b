/// Everything the simulation mutates, in one place.
///
/// The stage shares a `World` with the script host functions; the update
/// modules (`player`, `boss`, `physics`, `shot`) extend it with `impl`
/// blocks of their own.
use std::rc::Rc;

use rand::SeedableRng;

use crate::assets::{AssetSource, Sprite, SpriteId};
use crate::catalog::{Catalog, CharacterData, CharacterId};
use crate::config::StageConfig;
use crate::entities::{
    BulletShape, DropTable, Laser, Object, Pickup, PickupKind, Player,
    PlayerState, MAX_PLAYERS, PLAY_AREA_H, PLAY_AREA_W,
};
use crate::error::StageError;
use crate::events::StageEvent;
use crate::handle::InstanceId;
use crate::input::InputState;
use crate::math;
use crate::rng::Xorshf96;
use crate::stats::Stats;

pub const PLAYER_STARTING_X: f32 = PLAY_AREA_W / 2.0;
pub const PLAYER_STARTING_Y: f32 = 384.0;
pub const PLAYER_DEATH_TIME: f32 = 15.0;
pub const PLAYER_APPEAR_TIME: f32 = 30.0;
pub const PLAYER_RESPAWN_IFRAMES: f32 = 120.0;
pub const PLAYER_BOMB_TIME: f32 = 150.0;

/// Above this line a player pulls in every pickup.
pub const POINT_OF_COLLECTION: f32 = 96.0;

pub const PICKUP_RADIUS: f32 = 8.0;
const PICKUP_SCATTER: f32 = 50.0;

/// Sprites the simulation itself spawns with.
#[derive(Clone, Copy, Debug)]
pub struct StageSprites {
    pub pickup: SpriteId,
    pub reimu_card: SpriteId,
    pub reimu_orb_shot: SpriteId,
}

/// Initial body of a script-spawned object.
#[derive(Clone, Copy, Debug, Default)]
pub struct Spawn {
    pub x: f32,
    pub y: f32,
    pub spd: f32,
    pub dir: f32,
    pub acc: f32,
    pub radius: f32,
    pub sprite: SpriteId,
    pub flags: u32,
}

impl Spawn {
    fn object(&self, id: InstanceId) -> Object {
        Object {
            id,
            flags: self.flags,
            x: self.x,
            y: self.y,
            spd: self.spd.max(0.0),
            dir: math::angle_wrap(self.dir),
            acc: self.acc,
            radius: self.radius,
            sprite: self.sprite,
            ..Object::default()
        }
    }
}

pub struct World {
    pub store: crate::store::EntityStore,
    pub rng: Xorshf96,
    /// Ticks since the stage started.
    pub time: f32,
    pub input: [InputState; MAX_PLAYERS],
    pub stats: [Stats; MAX_PLAYERS],
    pub characters: [CharacterId; MAX_PLAYERS],
    pub catalog: Catalog,
    pub assets: Rc<dyn AssetSource>,
    pub config: StageConfig,
    pub sprites: StageSprites,
    pub events: Vec<StageEvent>,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("time", &self.time)
            .field("store", &self.store)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// Whether (x, y) lies inside the playfield grown by `margin`.
pub fn in_bounds(x: f32, y: f32, margin: f32) -> bool {
    x >= -margin && x < PLAY_AREA_W + margin && y >= -margin && y < PLAY_AREA_H + margin
}

/// Advance `object`'s animation, wrapping past the last frame back to the
/// sprite's loop frame.
pub fn animate_object(object: &mut Object, sprite: &Sprite, delta: f32) {
    object.frame_index += sprite.anim_spd * delta;
    if object.frame_index as i32 >= sprite.frame_count {
        let span = (sprite.frame_count - sprite.loop_frame).max(1) as f32;
        let loop_frame = sprite.loop_frame as f32;
        object.frame_index = loop_frame + (object.frame_index - loop_frame) % span;
    }
}

impl World {
    pub fn new(config: StageConfig, assets: Rc<dyn AssetSource>) -> Result<Self, StageError> {
        config.validate()?;

        let rng = config.seed.map(Xorshf96::seed_from_u64).unwrap_or_default();
        let catalog = Catalog::new(assets.as_ref());
        let sprites = StageSprites {
            pickup: assets.find_sprite("pickup"),
            reimu_card: assets.find_sprite("reimu_card"),
            reimu_orb_shot: assets.find_sprite("reimu_orb_shot"),
        };

        let mut characters = [CharacterId::default(); MAX_PLAYERS];
        let mut stats: [Stats; MAX_PLAYERS] = Default::default();
        for slot in 0..MAX_PLAYERS {
            characters[slot] = config.character(slot);
            let bombs = catalog.character(characters[slot]).starting_bombs;
            stats[slot] = Stats::new(config.starting_lives, bombs);
        }

        let mut world = Self {
            store: crate::store::EntityStore::new(config.player_count),
            rng,
            time: 0.0,
            input: [InputState::default(); MAX_PLAYERS],
            stats,
            characters,
            catalog,
            assets,
            config,
            sprites,
            events: Vec::new(),
        };
        for index in 0..world.store.player_count() {
            world.reset_player(index, false);
        }
        Ok(world)
    }

    pub fn player_count(&self) -> usize {
        self.store.player_count()
    }

    pub fn character_data(&self, player: usize) -> &CharacterData {
        self.catalog.character(self.characters[player])
    }

    pub fn emit(&mut self, event: StageEvent) {
        self.events.push(event);
    }

    pub fn drain_events(&mut self) -> Vec<StageEvent> {
        std::mem::take(&mut self.events)
    }

    /// Put a player back at the start point. After a death the player
    /// fades in through `Appearing` first.
    pub fn reset_player(&mut self, index: usize, from_death: bool) {
        let data = self.character_data(index);
        let (radius, sprite) = (data.radius, data.spr_idle);

        let player = &mut self.store.players[index];
        *player = Player::default();
        player.object.id = InstanceId::player(index);
        player.object.x = PLAYER_STARTING_X;
        player.object.y = PLAYER_STARTING_Y;
        player.object.radius = radius;
        player.object.sprite = sprite;
        player.facing = 1.0;

        player.iframes = PLAYER_RESPAWN_IFRAMES;
        if from_death {
            player.state = PlayerState::Appearing;
            player.timer = PLAYER_APPEAR_TIME;
        }
    }

    // ── Spawning ──────────────────────────────────────────────────────────────

    pub fn drop_pickup(&mut self, x: f32, y: f32, kind: PickupKind) -> &mut Pickup {
        let sprite = self.sprites.pickup;
        let pickup = self.store.create_pickup();
        pickup.x = x;
        pickup.y = y;
        pickup.vsp = -1.5;
        pickup.radius = PICKUP_RADIUS;
        pickup.sprite = sprite;
        pickup.frame_index = kind.frame();
        pickup.kind = kind;
        pickup
    }

    /// Drop a pickup somewhere within the scatter square around (x, y).
    pub fn scatter_pickup(&mut self, x: f32, y: f32, kind: PickupKind) {
        let px = x + self.rng.range(-PICKUP_SCATTER, PICKUP_SCATTER);
        let py = y + self.rng.range(-PICKUP_SCATTER, PICKUP_SCATTER);
        self.drop_pickup(px, py, kind);
    }

    pub fn home_pickups(&mut self, target: InstanceId) {
        for pickup in &mut self.store.pickups {
            pickup.homing_target = target;
        }
    }

    pub fn spawn_bullet(&mut self, spawn: Spawn, shape: BulletShape) -> InstanceId {
        let bullet = self.store.create_bullet();
        bullet.object = spawn.object(bullet.object.id);
        bullet.shape = shape;
        bullet.object.id
    }

    /// A beam that extends from (x, y) over `target_length / spd` ticks.
    /// A soft laser instead sits as a warning line for that long.
    pub fn spawn_laser(
        &mut self,
        spawn: Spawn,
        target_length: f32,
        thickness: f32,
        soft: bool,
    ) -> InstanceId {
        let spd = spawn.spd.max(0.01);
        let target_length = target_length.max(1.0);
        let laser = Laser {
            length: 0.0,
            target_length,
            thickness,
            time: target_length / spd,
            timer: 0.0,
        };
        let shape = if soft {
            BulletShape::SoftLaser(laser)
        } else {
            BulletShape::Laser(laser)
        };
        let id = self.spawn_bullet(
            Spawn {
                spd,
                acc: 0.0,
                ..spawn
            },
            shape,
        );
        self.emit(StageEvent::LaserFired { id });
        id
    }

    pub fn spawn_enemy(&mut self, spawn: Spawn, hp: f32, drops: DropTable) -> InstanceId {
        let enemy = self.store.create_enemy();
        enemy.object = spawn.object(enemy.object.id);
        enemy.hp = hp;
        enemy.drops = drops;
        enemy.object.id
    }

    /// Position of the enemy or boss nearest to (x, y).
    pub fn closest_target(&self, x: f32, y: f32) -> Option<(f32, f32)> {
        let enemies = self.store.enemies.iter().filter(|e| !e.object.is_dead()).map(|e| &e.object);
        let bosses = self.store.bosses.iter().map(|b| &b.object);
        enemies
            .chain(bosses)
            .map(|o| (math::point_distance(x, y, o.x, o.y), o.x, o.y))
            .filter(|(dist, _, _)| *dist < 1_000_000.0)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, ox, oy)| (ox, oy))
    }

    // ── Rewards ───────────────────────────────────────────────────────────────

    pub fn give_lives(&mut self, player: usize, lives: i32) {
        for _ in 0..self.stats[player].add_lives(lives) {
            self.emit(StageEvent::Extend { player });
        }
    }

    pub fn give_points(&mut self, player: usize, points: i32) {
        for _ in 0..self.stats[player].add_points(points) {
            self.emit(StageEvent::Extend { player });
        }
    }

    pub fn give_power(&mut self, player: usize, power: i32) {
        if self.stats[player].add_power(power) {
            self.emit(StageEvent::PowerUp { player });
        }
    }

    /// Apply what collecting a pickup of `kind` is worth.
    pub fn collect_pickup(&mut self, player: usize, kind: PickupKind) {
        match kind {
            PickupKind::Power => {
                self.give_power(player, 1);
                self.stats[player].add_score(10);
            }
            PickupKind::Point => self.give_points(player, 1),
            PickupKind::BigPower => self.give_power(player, 8),
            PickupKind::Bomb => self.stats[player].add_bombs(1),
            PickupKind::FullPower => self.give_power(player, crate::entities::MAX_POWER),
            PickupKind::ExtraLife => self.give_lives(player, 1),
            PickupKind::Score => self.stats[player].add_score(10),
            PickupKind::Cherry => {}
        }
        self.emit(StageEvent::PickupCollected { player, kind });
    }
}
