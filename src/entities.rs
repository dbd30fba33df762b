/// All stage entity types. Pure data; behaviour lives in the update modules.
use crate::assets::SpriteId;
use crate::handle::InstanceId;
use crate::script::ScriptSlot;

pub const PLAY_AREA_W: f32 = 384.0;
pub const PLAY_AREA_H: f32 = 448.0;

pub const MAX_PLAYERS: usize = 4;
pub const MAX_POWER: i32 = 128;

// ── Object flags ──────────────────────────────────────────────────────────────

pub mod flags {
    /// Set by scripts or collisions; the cleanup pass removes the object.
    pub const DEAD: u32 = 1;
    /// Draw bullets rotated to their heading.
    pub const ROTATE: u32 = 1 << 8;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color {
        r: 255,
        g: 255,
        b: 255,
        a: 255,
    };
}

// ── Shared body ───────────────────────────────────────────────────────────────

/// Position, motion and visual state shared by players, bosses, enemies and
/// enemy bullets.
#[derive(Clone, Debug, PartialEq)]
pub struct Object {
    pub id: InstanceId,
    pub flags: u32,

    pub x: f32,
    pub y: f32,
    /// Never negative.
    pub spd: f32,
    /// Degrees in `[0, 360)` when set through a spawner or script.
    pub dir: f32,
    pub acc: f32,
    pub radius: f32,

    pub sprite: SpriteId,
    pub frame_index: f32,
    pub xscale: f32,
    pub yscale: f32,
    pub angle: f32,
    pub color: Color,
}

impl Default for Object {
    fn default() -> Self {
        Self {
            id: InstanceId::NULL,
            flags: 0,
            x: 0.0,
            y: 0.0,
            spd: 0.0,
            dir: 0.0,
            acc: 0.0,
            radius: 0.0,
            sprite: SpriteId::STUB,
            frame_index: 0.0,
            xscale: 1.0,
            yscale: 1.0,
            angle: 0.0,
            color: Color::WHITE,
        }
    }
}

impl Object {
    pub fn is_dead(&self) -> bool {
        self.flags & flags::DEAD != 0
    }

    pub fn mark_dead(&mut self) {
        self.flags |= flags::DEAD;
    }

    pub fn step(&mut self, delta: f32) {
        crate::math::advance(
            &mut self.x,
            &mut self.y,
            &mut self.spd,
            self.dir,
            self.acc,
            delta,
        );
    }
}

// ── Players ───────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlayerState {
    #[default]
    Normal,
    Dying,
    Appearing,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReimuState {
    pub fire_timer: f32,
    pub fire_queue: i32,
    pub orb_x: [f32; 2],
    pub orb_y: [f32; 2],
}

/// Per-character scratch state, keyed by character.
#[derive(Clone, Debug, PartialEq)]
pub enum CharacterState {
    Reimu(ReimuState),
}

impl Default for CharacterState {
    fn default() -> Self {
        CharacterState::Reimu(ReimuState::default())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Player {
    pub object: Object,
    pub hsp: f32,
    pub vsp: f32,

    pub state: PlayerState,
    pub is_focused: bool,
    pub iframes: f32,
    /// Countdown for `Dying` and `Appearing`.
    pub timer: f32,
    pub bomb_timer: f32,
    pub hitbox_alpha: f32,
    pub facing: f32,

    pub character: CharacterState,
}

// ── Bosses ────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BossState {
    Normal,
    WaitingStart,
    WaitingEnd,
}

#[derive(Debug)]
pub struct Boss {
    pub object: Object,
    pub hp: f32,
    pub boss_index: usize,
    pub phase_index: usize,
    /// Remaining phase time.
    pub timer: f32,
    pub wait_timer: f32,
    pub state: BossState,
    pub facing: f32,

    pub coroutine: ScriptSlot,
}

// ── Enemies ───────────────────────────────────────────────────────────────────

/// What a killed enemy leaves behind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DropTable {
    #[default]
    Nothing,
    /// One power or point item, even odds.
    PowerOrPoint,
    /// Half the time, one power or point item.
    MaybePowerOrPoint,
}

impl DropTable {
    pub fn from_index(index: i64) -> Self {
        match index {
            1 => DropTable::PowerOrPoint,
            2 => DropTable::MaybePowerOrPoint,
            _ => DropTable::Nothing,
        }
    }
}

#[derive(Debug, Default)]
pub struct Enemy {
    pub object: Object,
    pub hp: f32,
    pub drops: DropTable,

    pub coroutine: ScriptSlot,
    pub update_callback: ScriptSlot,
    pub death_callback: ScriptSlot,
}

// ── Enemy projectiles ─────────────────────────────────────────────────────────

/// Beam geometry. `length` grows towards `target_length` once charged.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Laser {
    pub length: f32,
    pub target_length: f32,
    pub thickness: f32,
    /// Ticks the beam takes to reach full length (or to charge).
    pub time: f32,
    pub timer: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum BulletShape {
    #[default]
    Bullet,
    /// Oriented box centred on the bullet, `height` along the heading.
    Rect { width: f32, height: f32 },
    /// Extends from the origin while moving.
    Laser(Laser),
    /// Warning line that stays put and turns lethal once charged.
    SoftLaser(Laser),
}

pub const DEFAULT_LIFESPAN: f32 = 60.0 * 60.0;

#[derive(Debug)]
pub struct Bullet {
    pub object: Object,
    pub shape: BulletShape,

    pub lifetime: f32,
    pub lifespan: f32,
    /// One bit per player slot.
    pub grazed_by: u8,

    pub coroutine: ScriptSlot,
    pub update_callback: ScriptSlot,
}

impl Default for Bullet {
    fn default() -> Self {
        Self {
            object: Object::default(),
            shape: BulletShape::Bullet,
            lifetime: 0.0,
            lifespan: DEFAULT_LIFESPAN,
            grazed_by: 0,
            coroutine: ScriptSlot::default(),
            update_callback: ScriptSlot::default(),
        }
    }
}

impl Bullet {
    pub fn laser(&self) -> Option<&Laser> {
        match &self.shape {
            BulletShape::Laser(l) | BulletShape::SoftLaser(l) => Some(l),
            _ => None,
        }
    }
}

// ── Player projectiles ────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlayerBulletKind {
    /// Spins while flying straight.
    #[default]
    ReimuCard,
    /// Homes on the nearest enemy or boss.
    ReimuOrbShot,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlayerBullet {
    pub x: f32,
    pub y: f32,
    pub spd: f32,
    pub dir: f32,
    pub acc: f32,
    pub radius: f32,
    pub sprite: SpriteId,
    pub frame_index: f32,
    pub dmg: f32,
    pub kind: PlayerBulletKind,
    /// Card spin.
    pub angle: f32,
}

impl PlayerBullet {
    pub fn step(&mut self, delta: f32) {
        crate::math::advance(
            &mut self.x,
            &mut self.y,
            &mut self.spd,
            self.dir,
            self.acc,
            delta,
        );
    }
}

// ── Pickups ───────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PickupKind {
    #[default]
    Power,
    Point,
    BigPower,
    Bomb,
    FullPower,
    ExtraLife,
    Score,
    Cherry,
}

impl PickupKind {
    /// Frame in the shared pickup sprite.
    pub fn frame(self) -> f32 {
        match self {
            PickupKind::Power => 0.0,
            PickupKind::Point => 1.0,
            PickupKind::BigPower => 2.0,
            PickupKind::Bomb => 3.0,
            PickupKind::FullPower => 4.0,
            PickupKind::ExtraLife => 5.0,
            PickupKind::Score => 6.0,
            PickupKind::Cherry => 7.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Pickup {
    pub x: f32,
    pub y: f32,
    pub hsp: f32,
    pub vsp: f32,
    pub radius: f32,
    pub sprite: SpriteId,
    pub frame_index: f32,
    pub kind: PickupKind,
    pub homing_target: InstanceId,
}

impl Default for Pickup {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            hsp: 0.0,
            vsp: 0.0,
            radius: 0.0,
            sprite: SpriteId::STUB,
            frame_index: 0.0,
            kind: PickupKind::Power,
            homing_target: InstanceId::NULL,
        }
    }
}
