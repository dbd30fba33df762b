/// Read-only character and boss tables.
///
/// Built once at stage start; sprite ids are resolved through the asset
/// source at that point. Out-of-range lookups fall back to entry 0.
use serde::Deserialize;

use crate::assets::{AssetSource, SpriteId};

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, Hash)]
pub enum CharacterId {
    #[default]
    Reimu,
}

/// Which shot-type routine drives a character's fire button.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShotType {
    Reimu,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BombType {
    Reimu,
}

#[derive(Clone, Debug)]
pub struct CharacterData {
    pub name: &'static str,
    pub move_spd: f32,
    pub focus_spd: f32,
    /// Hit radius.
    pub radius: f32,
    pub graze_radius: f32,
    /// Ticks after a hit during which a bomb still saves the player.
    pub deathbomb_time: f32,
    pub starting_bombs: i32,
    pub shot_type: ShotType,
    pub bomb: BombType,
    pub spr_idle: SpriteId,
    pub spr_move_right: SpriteId,
    pub spr_move_left: SpriteId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhaseKind {
    Nonspell,
    Spellcard,
}

#[derive(Clone, Debug)]
pub struct PhaseData {
    pub hp: f32,
    /// Time limit in ticks.
    pub time: f32,
    pub kind: PhaseKind,
    pub name: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BossKind {
    Midboss,
    Boss,
}

#[derive(Clone, Debug)]
pub struct BossData {
    pub name: &'static str,
    pub kind: BossKind,
    pub spr_idle: SpriteId,
    pub spr_move_right: SpriteId,
    pub spr_move_left: SpriteId,
    pub phases: Vec<PhaseData>,
}

impl BossData {
    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }

    pub fn phase(&self, index: usize) -> &PhaseData {
        self.phases.get(index).unwrap_or(&self.phases[0])
    }
}

#[derive(Clone, Debug)]
pub struct Catalog {
    characters: Vec<CharacterData>,
    bosses: Vec<BossData>,
}

fn nonspell(time_secs: f32) -> PhaseData {
    PhaseData {
        hp: 1500.0,
        time: time_secs * 60.0,
        kind: PhaseKind::Nonspell,
        name: "",
    }
}

fn spellcard(time_secs: f32, name: &'static str) -> PhaseData {
    PhaseData {
        hp: 1500.0,
        time: time_secs * 60.0,
        kind: PhaseKind::Spellcard,
        name,
    }
}

impl Catalog {
    pub fn new(assets: &dyn AssetSource) -> Self {
        let reimu = CharacterData {
            name: "Reimu Hakurei",
            move_spd: 3.75,
            focus_spd: 1.6,
            radius: 2.0,
            graze_radius: 16.0,
            deathbomb_time: 15.0,
            starting_bombs: 3,
            shot_type: ShotType::Reimu,
            bomb: BombType::Reimu,
            spr_idle: assets.find_sprite("reimu_idle"),
            spr_move_right: assets.find_sprite("reimu_move_right"),
            spr_move_left: assets.find_sprite("reimu_move_left"),
        };

        let cirno = BossData {
            name: "Cirno",
            kind: BossKind::Boss,
            spr_idle: assets.find_sprite("cirno_idle"),
            spr_move_right: assets.find_sprite("cirno_move_right"),
            spr_move_left: assets.find_sprite("cirno_move_left"),
            phases: vec![
                nonspell(25.0),
                spellcard(30.0, "Ice Sign \"Icicle Fall\""),
                nonspell(50.0),
                spellcard(40.0, "Freeze Sign \"Perfect Freeze\""),
                spellcard(33.0, "Snow Sign \"Diamond Blizzard\""),
            ],
        };

        Self {
            characters: vec![reimu],
            bosses: vec![cirno],
        }
    }

    /// Register an extra boss, returning its catalog index.
    /// A boss needs at least one phase; an empty list gets a one-second
    /// non-spell.
    pub fn push_boss(&mut self, mut boss: BossData) -> usize {
        if boss.phases.is_empty() {
            tracing::warn!(boss = boss.name, "boss has no phases");
            boss.phases.push(nonspell(1.0));
        }
        self.bosses.push(boss);
        self.bosses.len() - 1
    }

    pub fn character(&self, id: CharacterId) -> &CharacterData {
        let index = match id {
            CharacterId::Reimu => 0,
        };
        self.characters.get(index).unwrap_or(&self.characters[0])
    }

    pub fn boss(&self, index: usize) -> &BossData {
        self.bosses.get(index).unwrap_or(&self.bosses[0])
    }

    pub fn boss_count(&self) -> usize {
        self.bosses.len()
    }
}
