/// Owns every live gameplay object.
///
/// Players sit in a fixed array and are addressed by slot. Bosses, enemies
/// and bullets carry fresh handles and are appended in handle order, so
/// each collection stays sorted and lookups are a binary search. Player
/// bullets and pickups have no handles.
use crate::entities::{
    Boss, Bullet, Enemy, Object, Pickup, Player, PlayerBullet, MAX_PLAYERS,
};
use crate::handle::{IdAllocator, InstanceId, ObjectKind};
use crate::script::ScriptSlot;

#[derive(Debug)]
pub struct EntityStore {
    ids: IdAllocator,
    player_count: usize,
    pub players: [Player; MAX_PLAYERS],
    pub bosses: Vec<Boss>,
    pub enemies: Vec<Enemy>,
    pub bullets: Vec<Bullet>,
    pub player_bullets: Vec<PlayerBullet>,
    pub pickups: Vec<Pickup>,
}

fn search<T>(items: &[T], id: InstanceId, key: impl Fn(&T) -> InstanceId) -> Option<usize> {
    if id.is_null() {
        return None;
    }
    items.binary_search_by_key(&id, key).ok()
}

impl EntityStore {
    pub fn new(player_count: usize) -> Self {
        Self {
            ids: IdAllocator::default(),
            player_count: player_count.clamp(1, MAX_PLAYERS),
            players: Default::default(),
            bosses: Vec::new(),
            enemies: Vec::new(),
            bullets: Vec::new(),
            player_bullets: Vec::new(),
            pickups: Vec::new(),
        }
    }

    pub fn player_count(&self) -> usize {
        self.player_count
    }

    pub fn next_sequence(&self) -> u32 {
        self.ids.peek()
    }

    pub fn next_id(&mut self, kind: ObjectKind) -> InstanceId {
        self.ids.next(kind)
    }

    // ── Creation ──────────────────────────────────────────────────────────────

    pub fn create_enemy(&mut self) -> &mut Enemy {
        let id = self.ids.next(ObjectKind::Enemy);
        self.enemies.push(Enemy {
            object: Object {
                id,
                ..Object::default()
            },
            ..Enemy::default()
        });
        let last = self.enemies.len() - 1;
        &mut self.enemies[last]
    }

    pub fn create_bullet(&mut self) -> &mut Bullet {
        let id = self.ids.next(ObjectKind::Bullet);
        self.bullets.push(Bullet {
            object: Object {
                id,
                ..Object::default()
            },
            ..Bullet::default()
        });
        let last = self.bullets.len() - 1;
        &mut self.bullets[last]
    }

    pub fn create_player_bullet(&mut self) -> &mut PlayerBullet {
        self.player_bullets.push(PlayerBullet::default());
        let last = self.player_bullets.len() - 1;
        &mut self.player_bullets[last]
    }

    pub fn create_pickup(&mut self) -> &mut Pickup {
        self.pickups.push(Pickup::default());
        let last = self.pickups.len() - 1;
        &mut self.pickups[last]
    }

    /// The boss must already carry a handle from [`EntityStore::next_id`].
    pub fn push_boss(&mut self, boss: Boss) -> &mut Boss {
        debug_assert!(
            boss.object.id.is_null()
                || self.bosses.last().map_or(true, |b| b.object.id < boss.object.id)
        );
        self.bosses.push(boss);
        let last = self.bosses.len() - 1;
        &mut self.bosses[last]
    }

    // ── Lookup ────────────────────────────────────────────────────────────────

    pub fn boss_index(&self, id: InstanceId) -> Option<usize> {
        search(&self.bosses, id, |b| b.object.id)
    }

    pub fn enemy_index(&self, id: InstanceId) -> Option<usize> {
        search(&self.enemies, id, |e| e.object.id)
    }

    pub fn bullet_index(&self, id: InstanceId) -> Option<usize> {
        search(&self.bullets, id, |b| b.object.id)
    }

    fn player_index(&self, id: InstanceId) -> Option<usize> {
        let index = id.seq() as usize;
        (index < self.player_count).then_some(index)
    }

    /// Resolve any handle. Stale, null and never-issued handles give `None`.
    pub fn find_object(&self, id: InstanceId) -> Option<&Object> {
        match id.kind()? {
            ObjectKind::Player => self.player_index(id).map(|i| &self.players[i].object),
            ObjectKind::Boss => self.boss_index(id).map(|i| &self.bosses[i].object),
            ObjectKind::Enemy => self.enemy_index(id).map(|i| &self.enemies[i].object),
            ObjectKind::Bullet => self.bullet_index(id).map(|i| &self.bullets[i].object),
        }
    }

    pub fn find_object_mut(&mut self, id: InstanceId) -> Option<&mut Object> {
        match id.kind()? {
            ObjectKind::Player => {
                let i = self.player_index(id)?;
                Some(&mut self.players[i].object)
            }
            ObjectKind::Boss => {
                let i = self.boss_index(id)?;
                Some(&mut self.bosses[i].object)
            }
            ObjectKind::Enemy => {
                let i = self.enemy_index(id)?;
                Some(&mut self.enemies[i].object)
            }
            ObjectKind::Bullet => {
                let i = self.bullet_index(id)?;
                Some(&mut self.bullets[i].object)
            }
        }
    }

    pub fn find_player(&self, id: InstanceId) -> Option<&Player> {
        if id.kind()? != ObjectKind::Player {
            return None;
        }
        self.player_index(id).map(|i| &self.players[i])
    }

    /// Coroutine binding of a boss, enemy or bullet.
    pub fn coroutine_slot_mut(&mut self, id: InstanceId) -> Option<&mut ScriptSlot> {
        match id.kind()? {
            ObjectKind::Boss => {
                let i = self.boss_index(id)?;
                Some(&mut self.bosses[i].coroutine)
            }
            ObjectKind::Enemy => {
                let i = self.enemy_index(id)?;
                Some(&mut self.enemies[i].coroutine)
            }
            ObjectKind::Bullet => {
                let i = self.bullet_index(id)?;
                Some(&mut self.bullets[i].coroutine)
            }
            ObjectKind::Player => None,
        }
    }

    pub fn update_slot_mut(&mut self, id: InstanceId) -> Option<&mut ScriptSlot> {
        match id.kind()? {
            ObjectKind::Enemy => {
                let i = self.enemy_index(id)?;
                Some(&mut self.enemies[i].update_callback)
            }
            ObjectKind::Bullet => {
                let i = self.bullet_index(id)?;
                Some(&mut self.bullets[i].update_callback)
            }
            _ => None,
        }
    }

    pub fn death_slot_mut(&mut self, id: InstanceId) -> Option<&mut ScriptSlot> {
        let i = self.enemy_index(id)?;
        Some(&mut self.enemies[i].death_callback)
    }

    // ── Removal ───────────────────────────────────────────────────────────────

    /// Drop every dead boss, enemy and bullet. Removal is order-preserving
    /// and releases the script bindings the objects carried.
    pub fn remove_dead(&mut self) {
        self.bosses.retain(|b| !b.object.is_dead());
        self.enemies.retain(|e| !e.object.is_dead());
        self.bullets.retain(|b| !b.object.is_dead());
    }

    pub fn remove_dead_enemies(&mut self) {
        self.enemies.retain(|e| !e.object.is_dead());
    }

    /// Drop everything except the player slots.
    pub fn clear(&mut self) {
        self.bosses.clear();
        self.enemies.clear();
        self.bullets.clear();
        self.player_bullets.clear();
        self.pickups.clear();
    }

    pub fn active_players(&self) -> &[Player] {
        &self.players[..self.player_count]
    }

    pub fn object_count(&self) -> usize {
        self.bosses.len()
            + self.enemies.len()
            + self.bullets.len()
            + self.player_bullets.len()
            + self.pickups.len()
    }
}
