use std::path::Path;

use serde::Deserialize;

use crate::catalog::CharacterId;
use crate::entities::MAX_PLAYERS;
use crate::error::StageError;

/// Stage start-up settings. Every field has a default, so a RON file only
/// needs to list what it changes:
///
/// ```ron
/// (player_count: 2, seed: Some(7), bounds_margin: 64.0)
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct StageConfig {
    pub player_count: usize,
    /// Character per player slot. Missing slots fall back to Reimu.
    pub characters: Vec<CharacterId>,
    pub starting_lives: i32,
    /// `None` keeps the generator's fixed default state.
    pub seed: Option<u64>,
    /// How far outside the playfield an object may drift before culling.
    pub bounds_margin: f32,
    /// Physics sub-steps per second; one sub-step covers at most
    /// `60 / physics_rate` ticks.
    pub physics_rate: f32,
    /// Byte cap on the script heap.
    pub script_memory_limit: Option<usize>,
    /// Global function bound as the stage coroutine when scripts define it.
    pub stage_function: String,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            player_count: 1,
            characters: vec![CharacterId::Reimu],
            starting_lives: 2,
            seed: None,
            bounds_margin: 50.0,
            physics_rate: 300.0,
            script_memory_limit: None,
            stage_function: "Stage0".to_string(),
        }
    }
}

impl StageConfig {
    pub fn from_ron(text: &str) -> Result<Self, StageError> {
        let config: StageConfig = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, StageError> {
        let text = std::fs::read_to_string(path).map_err(|source| StageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&text)
    }

    pub fn validate(&self) -> Result<(), StageError> {
        if self.player_count == 0 || self.player_count > MAX_PLAYERS {
            return Err(StageError::PlayerCount(self.player_count));
        }
        if !(self.physics_rate > 0.0) {
            return Err(StageError::PhysicsRate(self.physics_rate));
        }
        Ok(())
    }

    pub fn character(&self, slot: usize) -> CharacterId {
        self.characters.get(slot).copied().unwrap_or_default()
    }

    /// Longest physics sub-step, in ticks.
    pub fn max_substep(&self) -> f32 {
        60.0 / self.physics_rate
    }
}
