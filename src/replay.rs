//! Input trace recording and playback
//!
//! A session is fully determined by its seed, its tuning and the intents fed
//! to each tick call. A trace records all three, so a run replays under the
//! balance it was played with.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sim::{GameState, Intent, TickInput, tick};
use crate::tuning::{Tuning, TuningError};

/// Intents delivered on one tick call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceFrame {
    /// 0-based index of the tick call
    pub frame: u64,
    pub intents: Vec<Intent>,
}

/// Seed, balance table and every non-empty input, in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputTrace {
    pub seed: u64,
    pub tuning: Tuning,
    /// Number of tick calls in the run (including ones with no input)
    pub frame_count: u64,
    pub frames: Vec<TraceFrame>,
}

impl InputTrace {
    pub fn new(seed: u64, tuning: Tuning) -> Self {
        Self {
            seed,
            tuning,
            frame_count: 0,
            frames: Vec::new(),
        }
    }

    pub fn to_json(&self) -> Result<String, ReplayError> {
        serde_json::to_string_pretty(self).map_err(ReplayError::Parse)
    }

    pub fn from_json(json: &str) -> Result<Self, ReplayError> {
        let trace: InputTrace = serde_json::from_str(json).map_err(ReplayError::Parse)?;
        trace.validate()?;
        Ok(trace)
    }

    /// Reject a trace recorded under a different balance table than `expected`
    pub fn check_tuning(&self, expected: &Tuning) -> Result<(), ReplayError> {
        if self.tuning != *expected {
            return Err(ReplayError::TuningMismatch);
        }
        Ok(())
    }

    /// Frames must be strictly increasing and inside the run
    pub fn validate(&self) -> Result<(), ReplayError> {
        self.tuning.validate().map_err(ReplayError::Tuning)?;
        let mut previous: Option<u64> = None;
        for frame in &self.frames {
            if previous.is_some_and(|p| frame.frame <= p) {
                return Err(ReplayError::FrameOutOfOrder { frame: frame.frame });
            }
            if frame.frame >= self.frame_count {
                return Err(ReplayError::FrameBeyondEnd {
                    frame: frame.frame,
                    frame_count: self.frame_count,
                });
            }
            previous = Some(frame.frame);
        }
        Ok(())
    }
}

/// Captures the input of each tick call as the host drives the session
#[derive(Debug, Clone)]
pub struct Recorder {
    trace: InputTrace,
}

impl Recorder {
    pub fn new(seed: u64, tuning: Tuning) -> Self {
        Self {
            trace: InputTrace::new(seed, tuning),
        }
    }

    pub fn record(&mut self, input: &TickInput) {
        if !input.is_empty() {
            self.trace.frames.push(TraceFrame {
                frame: self.trace.frame_count,
                intents: input.intents.clone(),
            });
        }
        self.trace.frame_count += 1;
    }

    pub fn trace(&self) -> &InputTrace {
        &self.trace
    }

    pub fn finish(self) -> InputTrace {
        self.trace
    }
}

/// Re-run a recorded session from scratch, under the tuning it was recorded
/// with, and return its final state
pub fn replay(trace: &InputTrace) -> Result<GameState, ReplayError> {
    trace.validate()?;
    let mut state = GameState::with_tuning(trace.seed, trace.tuning.clone());
    let mut frames = trace.frames.iter().peekable();
    let empty = TickInput::default();

    for index in 0..trace.frame_count {
        let input = match frames.next_if(|f| f.frame == index) {
            Some(frame) => TickInput::new(frame.intents.clone()),
            None => empty.clone(),
        };
        tick(&mut state, &input);
    }
    log::info!(
        "Replayed {} ticks, score {}",
        trace.frame_count,
        state.session.score as u64
    );
    Ok(state)
}

#[derive(Debug)]
pub enum ReplayError {
    Parse(serde_json::Error),
    /// The recorded balance table fails validation
    Tuning(TuningError),
    /// The trace was recorded under a different balance table
    TuningMismatch,
    FrameOutOfOrder { frame: u64 },
    FrameBeyondEnd { frame: u64, frame_count: u64 },
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "trace parse error: {err}"),
            Self::Tuning(err) => write!(f, "trace tuning is invalid: {err}"),
            Self::TuningMismatch => write!(f, "trace was recorded with a different tuning"),
            Self::FrameOutOfOrder { frame } => write!(f, "trace frame {frame} is out of order"),
            Self::FrameBeyondEnd { frame, frame_count } => {
                write!(f, "trace frame {frame} is past the end of a {frame_count}-tick run")
            }
        }
    }
}

impl std::error::Error for ReplayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Tuning(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scripted_input(frame: u64) -> TickInput {
        match frame % 40 {
            0 => TickInput::new([Intent::MoveLeftStart, Intent::FireStart]),
            15 => TickInput::new([Intent::MoveLeftEnd, Intent::FireStart]),
            20 => TickInput::new([Intent::MoveRightStart]),
            35 => TickInput::new([Intent::MoveRightEnd, Intent::FireStart]),
            _ => TickInput::default(),
        }
    }

    #[test]
    fn test_replay_reproduces_session() {
        let seed = 2024;
        let mut live = GameState::new(seed);
        let mut recorder = Recorder::new(seed, Tuning::default());
        for frame in 0..1_500 {
            let input = scripted_input(frame);
            recorder.record(&input);
            tick(&mut live, &input);
        }

        let trace = recorder.finish();
        assert_eq!(trace.frame_count, 1_500);
        let replayed = replay(&trace).unwrap();
        assert_eq!(replayed.session, live.session);
        assert_eq!(replayed.player.lives, live.player.lives);
        assert_eq!(replayed.player.health, live.player.health);
        assert_eq!(replayed.invaders.len(), live.invaders.len());
        assert_eq!(replayed.time_ticks, live.time_ticks);
    }

    #[test]
    fn test_trace_json_roundtrip_validates() {
        let mut recorder = Recorder::new(1, Tuning::default());
        recorder.record(&TickInput::default());
        recorder.record(&TickInput::new([Intent::FireStart]));
        let json = recorder.trace().to_json().unwrap();
        let trace = InputTrace::from_json(&json).unwrap();
        assert_eq!(trace.frames.len(), 1);
        assert_eq!(trace.frames[0].frame, 1);
    }

    #[test]
    fn test_rejects_malformed_traces() {
        let trace = InputTrace {
            seed: 1,
            tuning: Tuning::default(),
            frame_count: 10,
            frames: vec![
                TraceFrame { frame: 4, intents: vec![Intent::FireStart] },
                TraceFrame { frame: 4, intents: vec![Intent::FireStart] },
            ],
        };
        assert!(matches!(trace.validate(), Err(ReplayError::FrameOutOfOrder { frame: 4 })));

        let trace = InputTrace {
            seed: 1,
            tuning: Tuning::default(),
            frame_count: 3,
            frames: vec![TraceFrame { frame: 3, intents: vec![Intent::Quit] }],
        };
        assert!(matches!(
            replay(&trace),
            Err(ReplayError::FrameBeyondEnd { frame: 3, frame_count: 3 })
        ));
    }

    #[test]
    fn test_classic_trace_replays_under_classic_rules() {
        let seed = 77;
        let mut live = GameState::with_tuning(seed, Tuning::classic());
        let mut recorder = Recorder::new(seed, Tuning::classic());
        for frame in 0..600 {
            let input = scripted_input(frame);
            recorder.record(&input);
            tick(&mut live, &input);
        }

        let json = recorder.finish().to_json().unwrap();
        let trace = InputTrace::from_json(&json).unwrap();
        assert_eq!(trace.tuning, Tuning::classic());
        let replayed = replay(&trace).unwrap();
        assert_eq!(replayed.session, live.session);
        let layout = |s: &GameState| {
            s.invaders
                .iter()
                .map(|i| (i.kind, i.pos.x, i.pos.y))
                .collect::<Vec<_>>()
        };
        assert_eq!(layout(&replayed), layout(&live));
    }

    #[test]
    fn test_trace_rejects_other_tuning() {
        let trace = Recorder::new(5, Tuning::classic()).finish();
        assert!(matches!(
            trace.check_tuning(&Tuning::default()),
            Err(ReplayError::TuningMismatch)
        ));
        assert!(trace.check_tuning(&Tuning::classic()).is_ok());

        let mut broken = trace.clone();
        broken.tuning.drop_chance = 2.0;
        assert!(matches!(broken.validate(), Err(ReplayError::Tuning(_))));
    }
}
