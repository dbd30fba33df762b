/// Player control: movement, firing, bombs, death and respawn.
use crate::entities::{CharacterState, PickupKind, PlayerState};
use crate::events::StageEvent;
use crate::input::InputState;
use crate::math;
use crate::world::{
    animate_object, World, PLAYER_BOMB_TIME, PLAYER_DEATH_TIME, PLAYER_RESPAWN_IFRAMES,
    POINT_OF_COLLECTION,
};

/// Power lost on death, and the most of it that is dropped back.
const DEATH_POWER_LOSS: i32 = 16;
const DEATH_POWER_DROP: i32 = 12;

const ORB_OFFSET: f32 = 24.0;

impl World {
    pub fn update_players(&mut self, delta: f32) {
        for index in 0..self.player_count() {
            self.update_player(index, delta);
        }
    }

    pub fn update_player(&mut self, index: usize, delta: f32) {
        let input = self.input[index];

        let player = &mut self.store.players[index];
        player.hsp = 0.0;
        player.vsp = 0.0;
        player.is_focused = false;

        let state = player.state;
        match state {
            PlayerState::Normal => self.update_normal_player(index, input, delta),
            PlayerState::Dying => {
                if self.update_dying_player(index, input, delta) {
                    return;
                }
            }
            PlayerState::Appearing => {
                let player = &mut self.store.players[index];
                player.timer = (player.timer - delta).max(0.0);
                if player.timer == 0.0 {
                    player.state = PlayerState::Normal;
                }
            }
        }

        let player = &mut self.store.players[index];
        player.bomb_timer = (player.bomb_timer - delta).max(0.0);
        let target = if player.is_focused { 1.0 } else { 0.0 };
        player.hitbox_alpha = math::approach(player.hitbox_alpha, target, 0.1 * delta);
    }

    fn update_normal_player(&mut self, index: usize, input: InputState, delta: f32) {
        let (move_spd, focus_spd) = {
            let data = self.character_data(index);
            (data.move_spd, data.focus_spd)
        };

        let (xmove, ymove) = {
            let (x, y) = input.axis();
            math::normalize(x, y)
        };

        let player = &mut self.store.players[index];
        player.is_focused = input.held(InputState::FOCUS);
        let spd = if player.is_focused { focus_spd } else { move_spd };
        player.hsp = xmove * spd;
        player.vsp = ymove * spd;

        self.fire_shot_type(index, delta);

        if input.held(InputState::BOMB) {
            self.try_bomb(index);
        }

        let player = &mut self.store.players[index];
        player.iframes = (player.iframes - delta).max(0.0);

        self.animate_player(index, xmove, delta);

        let player = &self.store.players[index];
        if player.object.y < POINT_OF_COLLECTION {
            let id = player.object.id;
            self.home_pickups(id);
        }
    }

    /// Returns `true` when the player was reset and the rest of the frame's
    /// player update must be skipped.
    fn update_dying_player(&mut self, index: usize, input: InputState, delta: f32) -> bool {
        let deathbomb_time = self.character_data(index).deathbomb_time;

        if input.held(InputState::BOMB) {
            let elapsed = PLAYER_DEATH_TIME - self.store.players[index].timer;
            if elapsed < deathbomb_time && self.try_bomb(index) {
                let player = &mut self.store.players[index];
                player.state = PlayerState::Normal;
                player.iframes = PLAYER_RESPAWN_IFRAMES;
                return false;
            }
        }

        let player = &mut self.store.players[index];
        player.timer = (player.timer - delta).max(0.0);
        if player.timer > 0.0 {
            return false;
        }

        let (x, y) = (player.object.x, player.object.y);
        let stats = &mut self.stats[index];
        if stats.lives > 0 {
            stats.lives -= 1;

            let lost = stats.power.min(DEATH_POWER_LOSS);
            stats.power -= lost;
            let mut drop = lost.min(DEATH_POWER_DROP);
            while drop > 0 {
                let kind = if drop >= 8 {
                    drop -= 8;
                    PickupKind::BigPower
                } else {
                    drop -= 1;
                    PickupKind::Power
                };
                self.scatter_pickup(x, y, kind);
            }
        } else {
            self.drop_pickup(x, y, PickupKind::FullPower);
        }

        self.reset_player(index, true);
        self.emit(StageEvent::PlayerRespawned { player: index });
        true
    }

    /// Spend a bomb if the cooldown allows it.
    fn try_bomb(&mut self, index: usize) -> bool {
        if self.store.players[index].bomb_timer != 0.0 || self.stats[index].bombs <= 0 {
            return false;
        }
        self.use_bomb(index);
        self.stats[index].bombs -= 1;
        self.store.players[index].bomb_timer = PLAYER_BOMB_TIME;
        self.emit(StageEvent::BombUsed { player: index });
        true
    }

    fn animate_player(&mut self, index: usize, xmove: f32, delta: f32) {
        let (idle, right, left) = {
            let data = self.character_data(index);
            (data.spr_idle, data.spr_move_right, data.spr_move_left)
        };
        let assets = self.assets.clone();
        let player = &mut self.store.players[index];
        let object = &mut player.object;

        if xmove != 0.0 {
            let (toward, away) = if xmove > 0.0 { (right, left) } else { (left, right) };
            player.facing = xmove.signum();
            if object.sprite == idle {
                object.sprite = toward;
                object.frame_index = 0.0;
            } else if object.sprite == away {
                object.sprite = toward;
            }
            animate_object(object, assets.sprite(object.sprite), delta);
        } else if object.sprite == idle {
            animate_object(object, assets.sprite(object.sprite), delta);
        } else {
            // Play the lean animation backwards, then settle on idle.
            let sprite = assets.sprite(object.sprite);
            let last_lean = (sprite.loop_frame - 1) as f32;
            if object.frame_index > last_lean {
                object.frame_index = last_lean;
            }
            object.frame_index -= sprite.anim_spd * delta;
            if object.frame_index < 0.0 {
                object.sprite = idle;
                object.frame_index = 0.0;
            }
        }
    }

    /// Hit by a bullet: start the death countdown.
    pub fn hit_player(&mut self, index: usize) {
        let player = &mut self.store.players[index];
        player.state = PlayerState::Dying;
        player.timer = PLAYER_DEATH_TIME;
        self.emit(StageEvent::PlayerHit { player: index });
    }

    /// Late-update bookkeeping: keep players on the field and refresh
    /// character satellites.
    pub fn settle_players(&mut self) {
        let max_x = crate::entities::PLAY_AREA_W - 1.0;
        let max_y = crate::entities::PLAY_AREA_H - 1.0;
        for index in 0..self.player_count() {
            let player = &mut self.store.players[index];
            player.object.x = player.object.x.clamp(0.0, max_x);
            player.object.y = player.object.y.clamp(0.0, max_y);

            let (x, y) = (player.object.x, player.object.y);
            match &mut player.character {
                CharacterState::Reimu(reimu) => {
                    reimu.orb_x = [x - ORB_OFFSET, x + ORB_OFFSET];
                    reimu.orb_y = [y, y];
                }
            }
        }
    }
}
