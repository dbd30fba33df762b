/// Per-frame projectile and pickup behaviour, and the fixed-step physics
/// sub-step: integrate every moving body, then resolve collisions.
use crate::entities::{
    BossState, Bullet, BulletShape, DropTable, PickupKind, PlayerBulletKind, PlayerState,
};
use crate::events::StageEvent;
use crate::handle::InstanceId;
use crate::math;
use crate::world::{in_bounds, World};

const CARD_SPIN: f32 = 16.0;

const ORB_STEER_CLAMP: f32 = 12.0;
const ORB_STEER_RATE: f32 = 1.5;
const ORB_MAX_IDLE_SPEED: f32 = 10.0;

const PICKUP_MAGNET_SPEED: f32 = 8.0;
const PICKUP_GRAVITY: f32 = 0.025;
const PICKUP_MAX_FALL: f32 = 2.0;

/// Whether a circle at (x, y) overlaps the bullet's lethal area.
pub fn circle_vs_bullet(x: f32, y: f32, radius: f32, bullet: &Bullet) -> bool {
    let b = &bullet.object;
    match &bullet.shape {
        BulletShape::Bullet => math::circle_vs_circle(x, y, radius, b.x, b.y, b.radius),
        BulletShape::Rect { width, height } => {
            math::circle_vs_rotated_rect(x, y, radius, b.x, b.y, *width, *height, b.dir)
        }
        BulletShape::SoftLaser(laser) if laser.timer < laser.time => false,
        BulletShape::Laser(laser) | BulletShape::SoftLaser(laser) => {
            let cx = b.x + math::lengthdir_x(laser.length / 2.0, b.dir);
            let cy = b.y + math::lengthdir_y(laser.length / 2.0, b.dir);
            math::circle_vs_rotated_rect(x, y, radius, cx, cy, laser.thickness, laser.length, b.dir)
        }
    }
}

impl World {
    // ── Behaviour (once per frame) ────────────────────────────────────────────

    /// Charge and extend lasers.
    pub fn update_bullets(&mut self, delta: f32) {
        for bullet in &mut self.store.bullets {
            let soft = matches!(bullet.shape, BulletShape::SoftLaser(_));
            let (BulletShape::Laser(laser) | BulletShape::SoftLaser(laser)) = &mut bullet.shape
            else {
                continue;
            };
            if laser.timer < laser.time {
                laser.timer += delta;
                laser.length = if soft {
                    0.0
                } else {
                    math::lerp(0.0, laser.target_length, laser.timer / laser.time)
                };
            } else {
                laser.length = laser.target_length;
            }
        }
    }

    pub fn update_player_bullets(&mut self, delta: f32) {
        for i in 0..self.store.player_bullets.len() {
            let (x, y) = {
                let pb = &self.store.player_bullets[i];
                (pb.x, pb.y)
            };
            let target = match self.store.player_bullets[i].kind {
                PlayerBulletKind::ReimuOrbShot => self.closest_target(x, y),
                PlayerBulletKind::ReimuCard => None,
            };

            let pb = &mut self.store.player_bullets[i];
            match pb.kind {
                PlayerBulletKind::ReimuCard => pb.angle += CARD_SPIN * delta,
                PlayerBulletKind::ReimuOrbShot => match target {
                    Some((tx, ty)) => {
                        let dx = (tx - pb.x).clamp(-ORB_STEER_CLAMP, ORB_STEER_CLAMP);
                        let dy = (ty - pb.y).clamp(-ORB_STEER_CLAMP, ORB_STEER_CLAMP);
                        let hsp = math::approach(
                            math::lengthdir_x(pb.spd, pb.dir),
                            dx,
                            ORB_STEER_RATE * delta,
                        );
                        let vsp = math::approach(
                            math::lengthdir_y(pb.spd, pb.dir),
                            dy,
                            ORB_STEER_RATE * delta,
                        );
                        pb.spd = math::point_distance(0.0, 0.0, hsp, vsp);
                        pb.dir = math::point_direction(0.0, 0.0, hsp, vsp);
                    }
                    None => {
                        if pb.spd < ORB_MAX_IDLE_SPEED {
                            pb.spd += delta;
                        }
                    }
                },
            }
        }
    }

    /// Pickups either chase their homing target or drift down.
    pub fn update_pickups(&mut self, delta: f32) {
        for i in 0..self.store.pickups.len() {
            let target_id = self.store.pickups[i].homing_target;
            if target_id.is_null() {
                let pickup = &mut self.store.pickups[i];
                pickup.hsp = 0.0;
                pickup.vsp = (pickup.vsp + PICKUP_GRAVITY * delta).min(PICKUP_MAX_FALL);
                continue;
            }

            let Some(target) = self.store.find_object(target_id) else {
                self.store.pickups[i].homing_target = InstanceId::NULL;
                continue;
            };
            let (tx, ty) = (target.x, target.y);
            let target_dying = self
                .store
                .find_player(target_id)
                .is_some_and(|p| p.state == PlayerState::Dying);

            let pickup = &mut self.store.pickups[i];
            let dir = math::point_direction(pickup.x, pickup.y, tx, ty);
            pickup.hsp = math::lengthdir_x(PICKUP_MAGNET_SPEED, dir);
            pickup.vsp = math::lengthdir_y(PICKUP_MAGNET_SPEED, dir);

            if target_dying {
                pickup.hsp = 0.0;
                pickup.vsp = -1.5;
                pickup.homing_target = InstanceId::NULL;
            }
        }
    }

    // ── Physics sub-step ──────────────────────────────────────────────────────

    /// Integrate and collide for `delta` ticks. Returns the enemies killed
    /// during the step; they are flagged dead but still in the store so
    /// their death callbacks can look them up.
    pub fn physics_step(&mut self, delta: f32) -> Vec<InstanceId> {
        self.integrate(delta);
        self.collide_players();
        self.collide_bosses();
        self.collide_enemies()
    }

    fn integrate(&mut self, delta: f32) {
        let count = self.player_count();
        for player in &mut self.store.players[..count] {
            player.object.x += player.hsp * delta;
            player.object.y += player.vsp * delta;
        }
        for boss in &mut self.store.bosses {
            boss.object.step(delta);
        }
        for enemy in self.store.enemies.iter_mut().filter(|e| !e.object.is_dead()) {
            enemy.object.step(delta);
        }
        for bullet in &mut self.store.bullets {
            let charged = bullet.laser().map_or(true, |l| l.timer >= l.time);
            if charged {
                bullet.object.step(delta);
            }
        }
        for pb in &mut self.store.player_bullets {
            pb.step(delta);
        }
        for pickup in &mut self.store.pickups {
            pickup.x += pickup.hsp * delta;
            pickup.y += pickup.vsp * delta;
        }
    }

    fn collide_players(&mut self) {
        for index in 0..self.player_count() {
            let (graze_radius, radius) = {
                let data = self.character_data(index);
                (data.graze_radius, data.radius)
            };
            let bit = 1u8 << index;

            let mut i = 0;
            while i < self.store.bullets.len() {
                let player = &self.store.players[index];
                let (px, py) = (player.object.x, player.object.y);
                let normal = player.state == PlayerState::Normal;
                let vulnerable = normal && player.iframes == 0.0;

                let bullet = &mut self.store.bullets[i];
                if normal
                    && bullet.grazed_by & bit == 0
                    && circle_vs_bullet(px, py, graze_radius, bullet)
                {
                    bullet.grazed_by |= bit;
                    self.stats[index].add_graze(1);
                    self.emit(StageEvent::Graze { player: index });
                }

                let bullet = &self.store.bullets[i];
                if vulnerable && circle_vs_bullet(px, py, radius, bullet) {
                    self.hit_player(index);
                    self.store.bullets.remove(i);
                    continue;
                }
                i += 1;
            }

            let mut i = 0;
            while i < self.store.pickups.len() {
                let player = &self.store.players[index];
                let pickup = &self.store.pickups[i];
                let touching = math::circle_vs_circle(
                    player.object.x,
                    player.object.y,
                    graze_radius,
                    pickup.x,
                    pickup.y,
                    pickup.radius,
                );
                if touching && player.state == PlayerState::Normal {
                    let kind = self.store.pickups.remove(i).kind;
                    self.collect_pickup(index, kind);
                    continue;
                }
                i += 1;
            }
        }
    }

    fn collide_bosses(&mut self) {
        let mut slot = 0;
        'bosses: while slot < self.store.bosses.len() {
            let mut i = 0;
            while i < self.store.player_bullets.len() {
                let boss = &self.store.bosses[slot];
                let pb = &self.store.player_bullets[i];
                let hit = math::circle_vs_circle(
                    boss.object.x,
                    boss.object.y,
                    boss.object.radius,
                    pb.x,
                    pb.y,
                    pb.radius,
                );
                if !hit {
                    i += 1;
                    continue;
                }

                let dmg = self.store.player_bullets.remove(i).dmg;
                let boss = &mut self.store.bosses[slot];
                if boss.state == BossState::Normal {
                    boss.hp -= dmg;
                    if boss.hp <= 0.0 && !self.end_boss_phase(slot) {
                        self.store.bosses.remove(slot);
                        continue 'bosses;
                    }
                }
            }
            slot += 1;
        }
    }

    fn collide_enemies(&mut self) -> Vec<InstanceId> {
        let mut killed = Vec::new();
        for slot in 0..self.store.enemies.len() {
            if self.store.enemies[slot].object.is_dead() {
                continue;
            }

            let mut i = 0;
            while i < self.store.player_bullets.len() {
                let enemy = &self.store.enemies[slot];
                let pb = &self.store.player_bullets[i];
                let hit = math::circle_vs_circle(
                    enemy.object.x,
                    enemy.object.y,
                    enemy.object.radius,
                    pb.x,
                    pb.y,
                    pb.radius,
                );
                if !hit {
                    i += 1;
                    continue;
                }

                let dmg = self.store.player_bullets.remove(i).dmg;
                let enemy = &mut self.store.enemies[slot];
                enemy.hp -= dmg;
                if enemy.hp <= 0.0 {
                    enemy.object.mark_dead();
                    let (id, x, y, drops) =
                        (enemy.object.id, enemy.object.x, enemy.object.y, enemy.drops);
                    self.roll_drops(x, y, drops);
                    self.emit(StageEvent::EnemyKilled { id });
                    killed.push(id);
                    break;
                }
            }
        }
        killed
    }

    fn roll_drops(&mut self, x: f32, y: f32, drops: DropTable) {
        let roll = match drops {
            DropTable::Nothing => return,
            DropTable::PowerOrPoint => true,
            DropTable::MaybePowerOrPoint => self.rng.range(0.0, 1.0) > 0.5,
        };
        if roll {
            let kind = if self.rng.range(0.0, 1.0) > 0.5 {
                PickupKind::Power
            } else {
                PickupKind::Point
            };
            self.drop_pickup(x, y, kind);
        }
    }

    // ── Late update ───────────────────────────────────────────────────────────

    /// Age bullets and cull everything that expired or left the field.
    pub fn cull(&mut self, delta: f32) {
        let margin = self.config.bounds_margin;
        let inside = |x: f32, y: f32| in_bounds(x, y, margin);

        self.store.bosses.retain(|b| inside(b.object.x, b.object.y));
        self.store.enemies.retain(|e| inside(e.object.x, e.object.y));
        self.store.bullets.retain_mut(|b| {
            if b.lifetime >= b.lifespan || !inside(b.object.x, b.object.y) {
                return false;
            }
            b.lifetime += delta;
            true
        });
        self.store.player_bullets.retain(|pb| inside(pb.x, pb.y));
        self.store.pickups.retain(|p| inside(p.x, p.y));
    }

    /// Turn dead-flagged players into hits and drop dead objects.
    pub fn remove_dead(&mut self) {
        for index in 0..self.player_count() {
            if self.store.players[index].object.is_dead() {
                self.store.players[index].object.flags &= !crate::entities::flags::DEAD;
                self.hit_player(index);
            }
        }
        self.store.remove_dead();
    }

    pub fn is_alive(&self, id: InstanceId) -> bool {
        self.store.find_object(id).is_some_and(|o| !o.is_dead())
    }
}
