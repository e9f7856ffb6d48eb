//! Space Invaders Extreme headless runner
//!
//! Drives a session with a simple autopilot at the fixed tick rate, logs a
//! summary and optionally writes the input trace for later replay.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use clap::Parser;

use space_invaders_extreme::consts::{FIELD_WIDTH, TICKS_PER_SECOND};
use space_invaders_extreme::sim::{GameEvent, GamePhase, GameState, Intent, TickInput, tick};
use space_invaders_extreme::{InputTrace, Recorder, Tuning, replay};

#[derive(Parser, Debug)]
#[command(name = "space-invaders-extreme")]
#[command(about = "Run a headless Space Invaders Extreme session with an autopilot")]
struct Cli {
    /// Session seed (defaults to the current time)
    #[arg(long)]
    seed: Option<u64>,
    /// Maximum number of ticks to simulate
    #[arg(long, default_value_t = 60 * 60 * 5)]
    ticks: u64,
    /// JSON balance file; missing fields keep their defaults
    #[arg(long)]
    tuning: Option<PathBuf>,
    /// Start from the classic balance table instead of the default one
    #[arg(long, default_value_t = false)]
    classic: bool,
    /// How many times the autopilot picks Continue before giving up
    #[arg(long, default_value_t = 1)]
    continues: u32,
    /// Write the recorded input trace here
    #[arg(long)]
    trace: Option<PathBuf>,
    /// Replay a trace file instead of playing. The trace's own tuning is
    /// used; with --tuning or --classic the trace must match it.
    #[arg(long, conflicts_with = "trace")]
    replay: Option<PathBuf>,
}

/// Sweeps under the lowest invader and keeps the trigger held
struct Autopilot {
    moving: Option<Intent>,
    continues_left: u32,
}

impl Autopilot {
    fn new(continues: u32) -> Self {
        Self {
            moving: None,
            continues_left: continues,
        }
    }

    fn decide(&mut self, state: &GameState) -> TickInput {
        match state.phase {
            GamePhase::Playing => self.steer(state),
            GamePhase::GameOverMenu => {
                self.moving = None;
                if self.continues_left > 0 {
                    self.continues_left -= 1;
                    TickInput::new([Intent::MenuContinue])
                } else {
                    TickInput::new([Intent::MenuGiveUp])
                }
            }
            GamePhase::Halted => TickInput::default(),
        }
    }

    fn steer(&mut self, state: &GameState) -> TickInput {
        let ship = state.player.rect().center().x;
        let target = state
            .invaders
            .iter()
            .max_by(|a, b| a.pos.y.total_cmp(&b.pos.y))
            .map(|i| i.rect().center().x)
            .unwrap_or(FIELD_WIDTH / 2.0);

        let wanted = if target < ship - state.player.speed {
            Some(Intent::MoveLeftStart)
        } else if target > ship + state.player.speed {
            Some(Intent::MoveRightStart)
        } else {
            None
        };

        let mut intents = Vec::new();
        if wanted != self.moving {
            match self.moving {
                Some(Intent::MoveLeftStart) => intents.push(Intent::MoveLeftEnd),
                Some(Intent::MoveRightStart) => intents.push(Intent::MoveRightEnd),
                _ => {}
            }
            intents.extend(wanted);
            self.moving = wanted;
        }
        intents.push(Intent::FireStart);
        TickInput::new(intents)
    }
}

#[derive(Debug, Default)]
struct RunStats {
    ticks: u64,
    shots: u64,
    explosions: u64,
    hits_taken: u64,
    pickups: u64,
    best_score: u64,
}

impl RunStats {
    fn record(&mut self, events: &[GameEvent], score: u64) {
        for event in events {
            match event {
                GameEvent::PlayerShot => self.shots += 1,
                GameEvent::Explosion { .. } => self.explosions += 1,
                GameEvent::PlayerHit => self.hits_taken += 1,
                GameEvent::PowerUpCollected { .. } => self.pickups += 1,
                GameEvent::InvaderShot => {}
            }
        }
        self.best_score = self.best_score.max(score);
    }
}

fn load_tuning(cli: &Cli) -> Result<Tuning> {
    let base = if cli.classic {
        Tuning::classic()
    } else {
        Tuning::default()
    };
    let Some(path) = &cli.tuning else {
        return Ok(base);
    };
    if cli.classic {
        log::warn!("--classic ignored: fields missing from the tuning file use the default table");
    }
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read tuning file {}", path.display()))?;
    let tuning = Tuning::from_json(&json)
        .with_context(|| format!("invalid tuning file {}", path.display()))?;
    log::info!("Loaded tuning from {}", path.display());
    Ok(tuning)
}

fn default_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn run(cli: &Cli, tuning: Tuning) -> Result<()> {
    let seed = cli.seed.unwrap_or_else(default_seed);
    log::info!("Game initialized with seed: {}", seed);

    let mut recorder = Recorder::new(seed, tuning.clone());
    let mut state = GameState::with_tuning(seed, tuning);
    let mut autopilot = Autopilot::new(cli.continues);
    let mut stats = RunStats::default();

    while stats.ticks < cli.ticks && state.phase != GamePhase::Halted {
        let input = autopilot.decide(&state);
        recorder.record(&input);
        let output = tick(&mut state, &input);
        stats.ticks += 1;
        stats.record(&output.events, output.scene.hud.score);
    }

    log::info!(
        "Stopped after {} ticks ({:.1}s of play), phase {:?}",
        stats.ticks,
        state.time_ticks as f64 / TICKS_PER_SECOND as f64,
        state.phase
    );
    log::info!(
        "Score {} (best {}), chain {}, multiplier {:.1}x, lives {}",
        state.session.score as u64,
        stats.best_score,
        state.session.chain_count,
        state.session.score_multiplier,
        state.player.lives
    );
    log::info!(
        "{} shots, {} explosions, {} hits taken, {} pickups",
        stats.shots,
        stats.explosions,
        stats.hits_taken,
        stats.pickups
    );

    if let Some(path) = &cli.trace {
        let json = recorder.finish().to_json()?;
        fs::write(path, json).with_context(|| format!("failed to write trace {}", path.display()))?;
        log::info!("Trace written to {}", path.display());
    }
    Ok(())
}

fn run_replay(path: &Path, expected: Option<&Tuning>) -> Result<()> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read trace {}", path.display()))?;
    let trace = InputTrace::from_json(&json)?;
    if trace.frame_count == 0 {
        bail!("trace {} contains no ticks", path.display());
    }
    if let Some(tuning) = expected {
        trace
            .check_tuning(tuning)
            .with_context(|| format!("trace {} does not match the requested tuning", path.display()))?;
    }
    let state = replay(&trace)?;
    log::info!(
        "Replay of seed {} ended in phase {:?} with score {}",
        trace.seed,
        state.phase,
        state.session.score as u64
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    log::info!("Space Invaders Extreme (headless) starting...");

    let tuning = load_tuning(&cli)?;
    log::info!("Breach policy: {:?}", tuning.breach_policy);
    match &cli.replay {
        Some(path) => {
            let pinned = cli.tuning.is_some() || cli.classic;
            run_replay(path, pinned.then_some(&tuning))
        }
        None => run(&cli, tuning),
    }
}
