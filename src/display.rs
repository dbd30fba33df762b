/// Rendering layer: all terminal I/O lives here.
///
/// The 384×448 playfield is scaled onto whatever box of character cells
/// the terminal leaves free after the HUD column. No game logic runs here;
/// this module only reads the stage.

use std::io::Write;

use crossterm::{
    cursor,
    style::{self, Color, Print},
    terminal,
    QueueableCommand,
};
use danmaku::catalog::PhaseKind;
use danmaku::entities::{
    Boss, BossState, Bullet, BulletShape, PickupKind, PlayerState, PLAY_AREA_H, PLAY_AREA_W,
};
use danmaku::math;
use danmaku::world::World;
use danmaku::Stage;

// ── Colour palette ────────────────────────────────────────────────────────────

const C_BORDER: Color = Color::DarkBlue;
const C_SPELL_BORDER: Color = Color::DarkMagenta;
const C_HUD_SCORE: Color = Color::Yellow;
const C_HUD_LIVES: Color = Color::Red;
const C_HUD_BOMBS: Color = Color::Green;
const C_HUD_LABEL: Color = Color::DarkGrey;
const C_PLAYER: Color = Color::White;
const C_HITBOX: Color = Color::Red;
const C_BOSS: Color = Color::Cyan;
const C_ENEMY: Color = Color::Green;
const C_BULLET: Color = Color::Magenta;
const C_LASER: Color = Color::Red;
const C_WARNING: Color = Color::DarkRed;
const C_PLAYER_BULLET: Color = Color::Cyan;
const C_HINT: Color = Color::DarkGrey;

/// Width of the HUD column to the right of the playfield.
const HUD_WIDTH: u16 = 30;

/// Cell box the playfield is drawn into, border included.
#[derive(Clone, Copy, Debug)]
struct Viewport {
    cols: u16,
    rows: u16,
}

impl Viewport {
    fn fit(width: u16, height: u16) -> Self {
        Self {
            cols: width.saturating_sub(HUD_WIDTH).max(12),
            rows: height.saturating_sub(1).max(8),
        }
    }

    /// Cell for a playfield point, or `None` when it is off the field.
    fn cell(&self, x: f32, y: f32) -> Option<(u16, u16)> {
        if !(0.0..PLAY_AREA_W).contains(&x) || !(0.0..PLAY_AREA_H).contains(&y) {
            return None;
        }
        let inner_w = f32::from(self.cols.saturating_sub(2));
        let inner_h = f32::from(self.rows.saturating_sub(2));
        let col = 1 + (x / PLAY_AREA_W * inner_w) as u16;
        let row = 1 + (y / PLAY_AREA_H * inner_h) as u16;
        Some((col, row))
    }

    fn put<W: Write>(
        &self,
        out: &mut W,
        x: f32,
        y: f32,
        glyph: &str,
        color: Color,
    ) -> std::io::Result<()> {
        if let Some((col, row)) = self.cell(x, y) {
            out.queue(cursor::MoveTo(col, row))?;
            out.queue(style::SetForegroundColor(color))?;
            out.queue(Print(glyph))?;
        }
        Ok(())
    }
}

// ── Public entry point ────────────────────────────────────────────────────────

/// Render one complete frame.
pub fn render<W: Write>(out: &mut W, stage: &Stage, paused: bool) -> std::io::Result<()> {
    let (width, height) = terminal::size()?;
    let view = Viewport::fit(width, height);
    let world = stage.world();

    out.queue(terminal::Clear(terminal::ClearType::All))?;

    draw_border(out, view, stage.spellcard_bg_alpha())?;
    for pickup in &world.store.pickups {
        view.put(out, pickup.x, pickup.y, pickup_glyph(pickup.kind), pickup_color(pickup.kind))?;
    }
    for enemy in &world.store.enemies {
        view.put(out, enemy.object.x, enemy.object.y, "W", C_ENEMY)?;
    }
    for boss in &world.store.bosses {
        view.put(out, boss.object.x, boss.object.y, "Ж", C_BOSS)?;
    }
    for pb in &world.store.player_bullets {
        view.put(out, pb.x, pb.y, "¦", C_PLAYER_BULLET)?;
    }
    for bullet in &world.store.bullets {
        draw_bullet(out, view, bullet)?;
    }
    draw_players(out, view, &world)?;
    draw_hud(out, view, &world)?;
    draw_controls_hint(out, view)?;

    if paused {
        draw_paused(out, view)?;
    }

    // Park cursor in a harmless spot and flush
    out.queue(style::ResetColor)?;
    out.queue(cursor::MoveTo(0, height.saturating_sub(1)))?;
    out.flush()?;
    Ok(())
}

// ── Border ────────────────────────────────────────────────────────────────────

fn draw_border<W: Write>(out: &mut W, view: Viewport, spell_alpha: f32) -> std::io::Result<()> {
    let w = view.cols as usize;
    let h = view.rows;

    let color = if spell_alpha > 0.5 { C_SPELL_BORDER } else { C_BORDER };
    out.queue(style::SetForegroundColor(color))?;

    out.queue(cursor::MoveTo(0, 0))?;
    out.queue(Print(format!("┌{}┐", "─".repeat(w.saturating_sub(2)))))?;

    out.queue(cursor::MoveTo(0, h.saturating_sub(1)))?;
    out.queue(Print(format!("└{}┘", "─".repeat(w.saturating_sub(2)))))?;

    for row in 1..h.saturating_sub(1) {
        out.queue(cursor::MoveTo(0, row))?;
        out.queue(Print("│"))?;
        out.queue(cursor::MoveTo(view.cols.saturating_sub(1), row))?;
        out.queue(Print("│"))?;
    }

    Ok(())
}

// ── Entities ──────────────────────────────────────────────────────────────────

fn draw_players<W: Write>(out: &mut W, view: Viewport, world: &World) -> std::io::Result<()> {
    for player in world.store.active_players() {
        let (x, y) = (player.object.x, player.object.y);
        match player.state {
            PlayerState::Dying => view.put(out, x, y, "✶", C_HITBOX)?,
            // Blink while invulnerable.
            _ if player.iframes > 0.0 && (player.iframes as i32 / 4) % 2 == 0 => {}
            _ if player.is_focused => view.put(out, x, y, "◉", C_HITBOX)?,
            _ => view.put(out, x, y, "▲", C_PLAYER)?,
        }
    }
    Ok(())
}

/// Plain bullets are one cell; lasers are traced cell by cell along the beam.
fn draw_bullet<W: Write>(out: &mut W, view: Viewport, bullet: &Bullet) -> std::io::Result<()> {
    let b = &bullet.object;
    let (length, color) = match &bullet.shape {
        BulletShape::Bullet | BulletShape::Rect { .. } => {
            return view.put(out, b.x, b.y, "•", C_BULLET);
        }
        BulletShape::Laser(laser) => (laser.length, C_LASER),
        BulletShape::SoftLaser(laser) if laser.timer < laser.time => {
            (laser.target_length, C_WARNING)
        }
        BulletShape::SoftLaser(laser) => (laser.length.max(laser.target_length), C_LASER),
    };

    let cell_size = PLAY_AREA_H / f32::from(view.rows.max(1));
    let steps = (length / cell_size).ceil().max(1.0) as i32;
    for i in 0..=steps {
        let along = length * i as f32 / steps as f32;
        let x = b.x + math::lengthdir_x(along, b.dir);
        let y = b.y + math::lengthdir_y(along, b.dir);
        view.put(out, x, y, "░", color)?;
    }
    Ok(())
}

fn pickup_glyph(kind: PickupKind) -> &'static str {
    match kind {
        PickupKind::Power => "p",
        PickupKind::Point => "•",
        PickupKind::BigPower => "P",
        PickupKind::Bomb => "B",
        PickupKind::FullPower => "F",
        PickupKind::ExtraLife => "♥",
        PickupKind::Score => "·",
        PickupKind::Cherry => "✿",
    }
}

fn pickup_color(kind: PickupKind) -> Color {
    match kind {
        PickupKind::Power | PickupKind::BigPower | PickupKind::FullPower => Color::Red,
        PickupKind::Point | PickupKind::Score => Color::Blue,
        PickupKind::Bomb => Color::Green,
        PickupKind::ExtraLife => Color::Magenta,
        PickupKind::Cherry => Color::White,
    }
}

// ── HUD (right column) ────────────────────────────────────────────────────────

fn hud_line<W: Write>(
    out: &mut W,
    view: Viewport,
    row: u16,
    label: &str,
    value: String,
    color: Color,
) -> std::io::Result<()> {
    out.queue(cursor::MoveTo(view.cols + 2, row))?;
    out.queue(style::SetForegroundColor(C_HUD_LABEL))?;
    out.queue(Print(format!("{label:<8}")))?;
    out.queue(style::SetForegroundColor(color))?;
    out.queue(Print(value))?;
    Ok(())
}

fn draw_hud<W: Write>(out: &mut W, view: Viewport, world: &World) -> std::io::Result<()> {
    let stats = &world.stats[0];
    hud_line(out, view, 1, "Score", format!("{:>10}", stats.score), C_HUD_SCORE)?;
    hud_line(out, view, 3, "Player", "★".repeat(stats.lives.max(0) as usize), C_HUD_LIVES)?;
    hud_line(out, view, 4, "Bomb", "✦".repeat(stats.bombs.max(0) as usize), C_HUD_BOMBS)?;
    hud_line(out, view, 6, "Power", format!("{:>3}", stats.power), Color::White)?;
    hud_line(out, view, 7, "Graze", format!("{:>3}", stats.graze), Color::White)?;
    hud_line(out, view, 8, "Point", format!("{:>3}", stats.points), Color::White)?;

    if let Some(boss) = world.store.bosses.first() {
        draw_boss_info(out, view, world, boss)?;
    }
    Ok(())
}

fn draw_boss_info<W: Write>(
    out: &mut W,
    view: Viewport,
    world: &World,
    boss: &Boss,
) -> std::io::Result<()> {
    let data = world.catalog.boss(boss.boss_index);
    let phase = data.phase(boss.phase_index);
    let phases_left = data.phase_count().saturating_sub(boss.phase_index + 1);

    hud_line(out, view, 10, "Boss", data.name.to_string(), C_BOSS)?;
    let seconds = (boss.timer / 60.0).ceil() as i32;
    hud_line(out, view, 11, "Time", format!("{seconds:>3}"), Color::White)?;
    hud_line(out, view, 12, "Phases", format!("{phases_left:>3}"), Color::White)?;

    if phase.kind == PhaseKind::Spellcard && boss.state != BossState::WaitingEnd {
        out.queue(cursor::MoveTo(view.cols + 2, 13))?;
        out.queue(style::SetForegroundColor(C_SPELL_BORDER))?;
        out.queue(Print(phase.name))?;
    }

    // HP bar along the top border.
    let full = phase.hp.max(1.0);
    let inner = view.cols.saturating_sub(2) as usize;
    let filled = ((boss.hp.max(0.0) / full) * inner as f32) as usize;
    out.queue(cursor::MoveTo(1, 0))?;
    out.queue(style::SetForegroundColor(Color::Red))?;
    out.queue(Print("━".repeat(filled.min(inner))))?;
    Ok(())
}

// ── Controls hint (last row) ──────────────────────────────────────────────────

fn draw_controls_hint<W: Write>(out: &mut W, view: Viewport) -> std::io::Result<()> {
    out.queue(cursor::MoveTo(1, view.rows))?;
    out.queue(style::SetForegroundColor(C_HINT))?;
    out.queue(Print(
        "Arrows: Move  Z: Shoot  X: Bomb  C/Shift: Focus  P: Pause  B: End phase  Q: Quit",
    ))?;
    Ok(())
}

fn draw_paused<W: Write>(out: &mut W, view: Viewport) -> std::io::Result<()> {
    let msg = "╔ PAUSED ╗";
    let col = (view.cols / 2).saturating_sub(msg.chars().count() as u16 / 2);
    out.queue(cursor::MoveTo(col, view.rows / 2))?;
    out.queue(style::SetForegroundColor(Color::White))?;
    out.queue(Print(msg))?;
    Ok(())
}
