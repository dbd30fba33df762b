mod display;

use std::collections::HashMap;
use std::fs::File;
use std::io::{stdout, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::{mpsc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use crossterm::{
    cursor,
    event::{
        self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
        ModifierKeyCode, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    terminal, ExecutableCommand,
};
use tracing_subscriber::EnvFilter;

use danmaku::assets::{AssetTable, Sprite};
use danmaku::config::StageConfig;
use danmaku::input::{InputSource, InputState};
use danmaku::Stage;

/// One tick per frame at 60 frames per second.
const FRAME: Duration = Duration::from_micros(16_667);

/// A key is considered "held" if its last press/repeat event arrived within
/// this many frames. Covers terminals that don't emit key-release events:
/// the OS key-repeat rate is ≥ 15 Hz, so a window of 8 frames (≈133 ms) is
/// always refreshed before expiry.
const HOLD_WINDOW: u64 = 8;

#[derive(Parser, Debug)]
#[command(name = "danmaku", about = "Terminal harness for the bullet-hell stage core")]
struct Args {
    /// Stage settings in RON; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory of *.lua stage scripts.
    #[arg(long, default_value = "scripts")]
    scripts: PathBuf,

    /// Overrides the seed from the config file.
    #[arg(long)]
    seed: Option<u64>,

    /// Log file; the terminal belongs to the game.
    #[arg(long, default_value = "danmaku.log")]
    log: PathBuf,
}

// ── Held-key input ────────────────────────────────────────────────────────────

/// Returns true if `key` was seen within the last `HOLD_WINDOW` frames.
fn is_held(key_frame: &HashMap<KeyCode, u64>, key: &KeyCode, frame: u64) -> bool {
    key_frame
        .get(key)
        .map(|&last| frame.saturating_sub(last) <= HOLD_WINDOW)
        .unwrap_or(false)
}

fn any_held(key_frame: &HashMap<KeyCode, u64>, keys: &[KeyCode], frame: u64) -> bool {
    keys.iter().any(|key| is_held(key_frame, key, frame))
}

/// Keyboard state for player 0, rebuilt every frame.
#[derive(Default)]
struct KeyboardInput {
    state: InputState,
    force_end: bool,
}

impl KeyboardInput {
    fn sample(&mut self, key_frame: &HashMap<KeyCode, u64>, frame: u64) {
        let bindings: [(u32, &[KeyCode]); 7] = [
            (InputState::RIGHT, &[KeyCode::Right, KeyCode::Char('l')]),
            (InputState::UP, &[KeyCode::Up, KeyCode::Char('k')]),
            (InputState::LEFT, &[KeyCode::Left, KeyCode::Char('h')]),
            (InputState::DOWN, &[KeyCode::Down, KeyCode::Char('j')]),
            (InputState::FIRE, &[KeyCode::Char('z'), KeyCode::Char(' ')]),
            (InputState::BOMB, &[KeyCode::Char('x')]),
            (
                InputState::FOCUS,
                &[
                    KeyCode::Char('c'),
                    KeyCode::Modifier(ModifierKeyCode::LeftShift),
                    KeyCode::Modifier(ModifierKeyCode::RightShift),
                ],
            ),
        ];

        self.state = bindings
            .iter()
            .filter(|(_, keys)| any_held(key_frame, keys, frame))
            .fold(InputState::default(), |state, (bit, _)| state.with(*bit));
    }
}

impl InputSource for KeyboardInput {
    fn player_input(&mut self, player: usize) -> InputState {
        if player == 0 {
            self.state
        } else {
            InputState::default()
        }
    }

    fn force_end_phase(&mut self) -> bool {
        std::mem::take(&mut self.force_end)
    }
}

// ── Set-up ────────────────────────────────────────────────────────────────────

fn init_logging(path: &Path) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Sprite sheet metadata for the built-in characters and bosses.
fn demo_assets(script_dir: &Path) -> anyhow::Result<AssetTable> {
    let mut assets = AssetTable::new();
    assets.add_sprite(Sprite::new("reimu_idle", 32, 48).animated(8, 0.15, 0));
    assets.add_sprite(Sprite::new("reimu_move_left", 32, 48).animated(8, 0.15, 4));
    assets.add_sprite(Sprite::new("reimu_move_right", 32, 48).animated(8, 0.15, 4));
    assets.add_sprite(Sprite::new("reimu_card", 16, 16));
    assets.add_sprite(Sprite::new("reimu_orb_shot", 16, 16));
    assets.add_sprite(Sprite::new("cirno_idle", 64, 64).animated(4, 0.1, 0));
    assets.add_sprite(Sprite::new("cirno_move_left", 64, 64).animated(4, 0.1, 2));
    assets.add_sprite(Sprite::new("cirno_move_right", 64, 64).animated(4, 0.1, 2));
    assets.add_sprite(Sprite::new("pickup", 16, 16));
    assets.add_sprite(Sprite::new("bullet", 16, 16));
    assets.add_sprite(Sprite::new("ball", 32, 32));
    assets.add_sprite(Sprite::new("laser", 16, 16));
    assets.add_sprite(Sprite::new("fairy", 32, 32).animated(4, 0.2, 0));
    assets.add_font("hud");

    let loaded = assets
        .load_script_dir(script_dir)
        .with_context(|| format!("loading scripts from {}", script_dir.display()))?;
    tracing::info!(loaded, dir = %script_dir.display(), "script sources found");
    Ok(assets)
}

fn build_stage(args: &Args) -> anyhow::Result<Stage> {
    let mut config = match &args.config {
        Some(path) => StageConfig::load(path)?,
        None => StageConfig::default(),
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    let assets = demo_assets(&args.scripts)?;
    Ok(Stage::new(config, Rc::new(assets))?)
}

// ── Game loop ─────────────────────────────────────────────────────────────────

/// Input model: a `key_frame` map records the frame of the last
/// press/repeat event for every key, and each frame the stage sees every
/// key that is still "fresh". Terminals with keyboard enhancement send
/// real releases; the rest expire after `HOLD_WINDOW` frames of silence.
fn game_loop<W: Write>(
    out: &mut W,
    stage: &mut Stage,
    rx: &mpsc::Receiver<Event>,
) -> std::io::Result<()> {
    let mut key_frame: HashMap<KeyCode, u64> = HashMap::new();
    let mut input = KeyboardInput::default();
    let mut paused = false;
    let mut frame: u64 = 0;

    loop {
        let frame_start = Instant::now();
        frame += 1;

        // ── Drain all pending input events (non-blocking) ─────────────────────
        while let Ok(Event::Key(KeyEvent { code, kind, modifiers, .. })) = rx.try_recv() {
            match kind {
                KeyEventKind::Press => {
                    key_frame.insert(code, frame);
                    match code {
                        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                            return Ok(());
                        }
                        KeyCode::Char('p') | KeyCode::Char('P') | KeyCode::Esc => {
                            paused = !paused;
                            tracing::info!(paused, "pause toggled");
                        }
                        KeyCode::Char('b') | KeyCode::Char('B') => input.force_end = true,
                        _ => {}
                    }
                }
                KeyEventKind::Repeat => {
                    key_frame.insert(code, frame);
                }
                KeyEventKind::Release => {
                    key_frame.remove(&code);
                }
            }
        }

        if !paused {
            input.sample(&key_frame, frame);
            stage.update(1.0, &mut input);
            for event in stage.drain_events() {
                tracing::debug!(?event, "stage event");
            }
            if frame % 600 == 0 {
                tracing::info!("{}", stage.diagnostics());
            }
        }

        display::render(out, stage, paused)?;

        let elapsed = frame_start.elapsed();
        if elapsed < FRAME {
            std::thread::sleep(FRAME - elapsed);
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log)?;

    let mut stage = build_stage(&args)?;

    let raw_out = stdout();
    let mut out = BufWriter::new(raw_out);

    terminal::enable_raw_mode()?;
    out.execute(terminal::EnterAlternateScreen)?;
    out.execute(cursor::Hide)?;

    // Request key-release (and key-repeat) events from the terminal.
    let keyboard_enhanced = out
        .execute(PushKeyboardEnhancementFlags(
            KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                | KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES,
        ))
        .is_ok();

    // Dedicate a thread exclusively to blocking event reads, sending them
    // through a channel so the game loop never has to block on I/O.
    let (tx, rx) = mpsc::channel::<Event>();
    thread::spawn(move || {
        while let Ok(ev) = event::read() {
            if tx.send(ev).is_err() {
                break;
            }
        }
    });

    let result = game_loop(&mut out, &mut stage, &rx);

    // Always restore the terminal
    if keyboard_enhanced {
        let _ = out.execute(PopKeyboardEnhancementFlags);
    }
    let _ = out.execute(cursor::Show);
    let _ = out.execute(terminal::LeaveAlternateScreen);
    let _ = terminal::disable_raw_mode();

    let world = stage.world();
    tracing::info!(score = world.stats[0].score, time = world.time, "stage closed");
    result.context("terminal i/o")
}
