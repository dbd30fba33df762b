use crate::catalog::BossKind;
use crate::entities::PickupKind;
use crate::handle::InstanceId;

/// Things that happened during a frame, for sound and effect collaborators.
/// The stage appends; the front-end drains once per frame.
#[derive(Clone, Debug, PartialEq)]
pub enum StageEvent {
    Graze { player: usize },
    PlayerHit { player: usize },
    PlayerRespawned { player: usize },
    BombUsed { player: usize },
    Extend { player: usize },
    PowerUp { player: usize },
    PickupCollected { player: usize, kind: PickupKind },
    EnemyKilled { id: InstanceId },
    BossSpawned { id: InstanceId, boss_index: usize },
    SpellcardDeclared { boss_index: usize, phase_index: usize },
    PhaseEnded { boss_index: usize, phase_index: usize },
    BossDefeated { boss_index: usize, kind: BossKind },
    LaserFired { id: InstanceId },
}
