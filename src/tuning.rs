//! Data-driven game balance
//!
//! Every number that earlier iterations of the game disagreed on lives here
//! instead of in the simulation code. Loaded from JSON by the host; the
//! simulation only ever reads it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sim::state::InvaderKind;

/// What happens when an invader breaks through while the player is shielded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BreachPolicy {
    /// Shield prevents the damage, but the wave is still torn down and respawned
    #[default]
    AlwaysReset,
    /// Shield destroys the invader and the session carries on untouched
    ShieldAbsorbs,
}

/// Per-type invader constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InvaderStats {
    pub width: f32,
    pub height: f32,
    pub health: u32,
    /// Horizontal speed (pixels/tick)
    pub x_change: f32,
    /// Vertical drop applied on each wall bounce
    pub y_change: f32,
    /// Inclusive range of ticks between shots, rolled once per invader
    pub fire_rate_min: u64,
    pub fire_rate_max: u64,
}

impl InvaderStats {
    const fn new(size: f32, health: u32, x_change: f32, y_change: f32, fire: (u64, u64)) -> Self {
        Self {
            width: size,
            height: size,
            health,
            x_change,
            y_change,
            fire_rate_min: fire.0,
            fire_rate_max: fire.1,
        }
    }
}

/// Game balance table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub basic: InvaderStats,
    pub fast: InvaderStats,
    pub tough: InvaderStats,
    pub boss: InvaderStats,

    /// Regular (non-boss) invaders die to any single hit regardless of health
    pub one_hit_regulars: bool,

    // === Player ===
    pub player_fire_cooldown: u64,
    pub invader_bullet_damage: u32,
    pub health_restore: u32,
    /// Ticks a WideShot/Laser/Shield pickup lasts
    pub power_up_duration: u32,

    // === Session ===
    pub fever_duration: u32,
    pub chain_reset_time: u64,
    /// Every `chain_step` kills the multiplier grows by `multiplier_step`
    pub chain_step: u32,
    pub multiplier_step: f64,

    // === Spawning ===
    pub drop_chance: f64,
    pub boss_chance: f64,
    pub base_wave_size: usize,
    pub score_per_extra_invader: f64,
    pub max_wave_size: usize,
    /// Score at which Health pickups join the drop table (`None`: never)
    pub health_unlock_score: Option<f64>,

    pub breach_policy: BreachPolicy,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            basic: InvaderStats::new(40.0, 1, 0.8, 10.0, (600, 1500)),
            fast: InvaderStats::new(40.0, 1, 1.5, 10.0, (840, 1680)),
            tough: InvaderStats::new(40.0, 1, 0.4, 10.0, (900, 1800)),
            boss: InvaderStats::new(80.0, 10, 0.1, 5.0, (720, 1200)),
            one_hit_regulars: true,

            player_fire_cooldown: 10,
            invader_bullet_damage: 10,
            health_restore: 50,
            power_up_duration: 300,

            fever_duration: 600,
            chain_reset_time: 120,
            chain_step: 5,
            multiplier_step: 0.5,

            drop_chance: 0.25,
            boss_chance: 0.10,
            base_wave_size: 6,
            score_per_extra_invader: 100.0,
            max_wave_size: 15,
            health_unlock_score: Some(0.0),

            breach_policy: BreachPolicy::AlwaysReset,
        }
    }
}

impl Tuning {
    /// Balance of the earlier iterations: armoured Tough invaders, quick Fast
    /// invaders, bigger drops per bounce, a 20% drop rate and no Health pickups.
    pub fn classic() -> Self {
        Self {
            basic: InvaderStats::new(40.0, 1, 2.0, 30.0, (300, 720)),
            fast: InvaderStats::new(40.0, 1, 4.0, 30.0, (250, 600)),
            tough: InvaderStats::new(40.0, 3, 1.0, 30.0, (500, 1000)),
            boss: InvaderStats::new(80.0, 10, 0.5, 10.0, (240, 540)),
            one_hit_regulars: false,
            drop_chance: 0.20,
            health_unlock_score: None,
            ..Self::default()
        }
    }

    /// Whether Health pickups can drop at the given score
    pub fn health_unlocked(&self, score: f64) -> bool {
        self.health_unlock_score.is_some_and(|unlock| score >= unlock)
    }

    /// Stats row for an invader type
    pub fn stats(&self, kind: InvaderKind) -> &InvaderStats {
        match kind {
            InvaderKind::Basic => &self.basic,
            InvaderKind::Fast => &self.fast,
            InvaderKind::Tough => &self.tough,
            InvaderKind::Boss => &self.boss,
        }
    }

    /// Size of a regular wave at the given score
    pub fn wave_size(&self, score: f64) -> usize {
        // `as` saturates, so a huge quotient just pins to the cap below
        let extra = if self.score_per_extra_invader > 0.0 {
            (score.max(0.0) / self.score_per_extra_invader).floor() as usize
        } else {
            0
        };
        self.base_wave_size
            .saturating_add(extra)
            .min(self.max_wave_size)
    }

    /// Parse and validate a JSON balance file. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json).map_err(TuningError::Parse)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn validate(&self) -> Result<(), TuningError> {
        for kind in InvaderKind::ALL {
            let stats = self.stats(kind);
            if stats.fire_rate_min > stats.fire_rate_max {
                return Err(TuningError::InvalidFireRate {
                    kind,
                    min: stats.fire_rate_min,
                    max: stats.fire_rate_max,
                });
            }
            if stats.width <= 0.0 || stats.height <= 0.0 {
                return Err(TuningError::ZeroDimension { kind });
            }
            if stats.health == 0 {
                return Err(TuningError::ZeroHealth { kind });
            }
        }
        if !(self.multiplier_step >= 0.0 && self.multiplier_step.is_finite()) {
            return Err(TuningError::InvalidMultiplierStep(self.multiplier_step));
        }
        // 0 disables score scaling; anything else must be a sane score step
        let per_extra = self.score_per_extra_invader;
        if !(per_extra == 0.0 || (per_extra >= 1.0 && per_extra.is_finite())) {
            return Err(TuningError::InvalidWaveScaling(per_extra));
        }
        if self.base_wave_size == 0 || self.max_wave_size < self.base_wave_size {
            return Err(TuningError::InvalidWaveSize {
                base: self.base_wave_size,
                max: self.max_wave_size,
            });
        }
        if !(0.0..=1.0).contains(&self.drop_chance) {
            return Err(TuningError::InvalidDropChance(self.drop_chance));
        }
        if !(0.0..=1.0).contains(&self.boss_chance) {
            return Err(TuningError::InvalidProbability(self.boss_chance));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum TuningError {
    Parse(serde_json::Error),
    InvalidFireRate { kind: InvaderKind, min: u64, max: u64 },
    InvalidDropChance(f64),
    InvalidProbability(f64),
    ZeroDimension { kind: InvaderKind },
    ZeroHealth { kind: InvaderKind },
    InvalidMultiplierStep(f64),
    InvalidWaveScaling(f64),
    InvalidWaveSize { base: usize, max: usize },
}

impl fmt::Display for TuningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "tuning parse error: {err}"),
            Self::InvalidFireRate { kind, min, max } => {
                write!(f, "{kind:?} fire rate range is empty: {min}..={max}")
            }
            Self::InvalidDropChance(p) => write!(f, "drop chance out of range: {p}"),
            Self::InvalidProbability(p) => write!(f, "boss chance out of range: {p}"),
            Self::ZeroDimension { kind } => write!(f, "{kind:?} has a non-positive size"),
            Self::ZeroHealth { kind } => write!(f, "{kind:?} starts with zero health"),
            Self::InvalidMultiplierStep(step) => {
                write!(f, "multiplier step must be a non-negative number: {step}")
            }
            Self::InvalidWaveScaling(score) => {
                write!(f, "score per extra invader must be 0 or at least 1: {score}")
            }
            Self::InvalidWaveSize { base, max } => {
                write!(f, "wave sizes need 0 < base <= max, got base {base} max {max}")
            }
        }
    }
}

impl std::error::Error for TuningError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}
