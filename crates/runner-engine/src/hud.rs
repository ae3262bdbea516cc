//! Score display and pause overlay state.
//!
//! Nothing here draws. These types hold what a renderer would show so the
//! simulation can be checked headless.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Length of one half of the score pulse.
pub const PULSE_HALF: Duration = Duration::from_millis(200);
/// Peak scale of the score pulse.
pub const PULSE_SCALE: f32 = 1.2;

/// The "Score: N" label with its pickup pulse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreDisplay {
    text: String,
    /// Time into the current pulse, `None` when at rest.
    pulse: Option<Duration>,
}

impl Default for ScoreDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoreDisplay {
    pub fn new() -> Self {
        Self {
            text: Self::format(0),
            pulse: None,
        }
    }

    fn format(score: u32) -> String {
        format!("Score: {score}")
    }

    /// Show a new score and restart the pulse.
    pub fn set_score(&mut self, score: u32) {
        self.text = Self::format(score);
        self.pulse = Some(Duration::ZERO);
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_pulsing(&self) -> bool {
        self.pulse.is_some()
    }

    pub fn advance(&mut self, dt: Duration) {
        if let Some(t) = self.pulse {
            let t = t + dt;
            self.pulse = (t < PULSE_HALF * 2).then_some(t);
        }
    }

    /// Current scale: up to [`PULSE_SCALE`] and back (yoyo).
    pub fn scale(&self) -> f32 {
        let Some(t) = self.pulse else {
            return 1.0;
        };
        let half = PULSE_HALF.as_secs_f32();
        let t = t.as_secs_f32();
        let phase = if t <= half { t / half } else { 2.0 - t / half };
        1.0 + (PULSE_SCALE - 1.0) * phase.clamp(0.0, 1.0)
    }
}

/// Dimmed overlay shown while paused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PauseOverlay {
    pub dim_alpha: f32,
    pub text: String,
}

impl Default for PauseOverlay {
    fn default() -> Self {
        Self {
            dim_alpha: 0.7,
            text: "PAUSED".into(),
        }
    }
}

/// Label of the pause button for the current state.
pub fn pause_button_label(paused: bool) -> &'static str {
    if paused {
        "RESUME"
    } else {
        "PAUSE"
    }
}
