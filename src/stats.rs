/// Per-player counters and the reward rules that cap them.
use crate::entities::MAX_POWER;

pub const MAX_LIVES: i32 = 8;
pub const MAX_BOMBS: i32 = 8;

/// Point-item totals below 800 that grant an extra life.
const POINT_EXTENDS: [i32; 5] = [50, 125, 200, 300, 450];

/// Power values that count as a level-up.
const POWER_TIERS: [i32; 8] = [8, 16, 32, 48, 64, 80, 96, 128];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub score: i64,
    pub lives: i32,
    pub bombs: i32,
    pub power: i32,
    pub graze: i32,
    pub points: i32,
}

impl Stats {
    pub fn new(lives: i32, bombs: i32) -> Self {
        Self {
            lives,
            bombs,
            ..Self::default()
        }
    }

    pub fn add_score(&mut self, score: i64) {
        self.score += score;
    }

    /// Lives past the cap turn into bombs. Returns how many lives were
    /// actually gained.
    pub fn add_lives(&mut self, lives: i32) -> i32 {
        let mut gained = 0;
        for _ in 0..lives {
            if self.lives < MAX_LIVES {
                self.lives += 1;
                gained += 1;
            } else {
                self.add_bombs(1);
            }
        }
        gained
    }

    pub fn add_bombs(&mut self, bombs: i32) {
        self.bombs = (self.bombs + bombs.max(0)).min(MAX_BOMBS.max(self.bombs));
    }

    /// Returns `true` if a power tier was reached.
    pub fn add_power(&mut self, power: i32) -> bool {
        let mut tier = false;
        for _ in 0..power {
            if self.power >= MAX_POWER {
                break;
            }
            self.power += 1;
            tier |= POWER_TIERS.contains(&self.power);
        }
        tier
    }

    pub fn add_graze(&mut self, graze: i32) {
        self.graze += graze;
    }

    /// Returns the number of extends earned.
    pub fn add_points(&mut self, points: i32) -> i32 {
        let mut extends = 0;
        for _ in 0..points {
            self.points += 1;
            let extend = if self.points >= 800 {
                self.points % 200 == 0
            } else {
                POINT_EXTENDS.contains(&self.points)
            };
            if extend {
                extends += self.add_lives(1);
            }
        }
        extends
    }
}
