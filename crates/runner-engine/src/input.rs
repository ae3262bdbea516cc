//! Per-tick control signals.

use serde::{Deserialize, Serialize};

/// Horizontal intent derived from the left/right signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Horizontal {
    Left,
    Right,
    Idle,
}

/// The four discrete controls for one tick. Keyboard and pointer sources
/// both reduce to this.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFrame {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    /// Edge-triggered: set only on the tick the control is pressed.
    pub toggle_pause: bool,
}

impl InputFrame {
    pub const IDLE: Self = Self {
        left: false,
        right: false,
        jump: false,
        toggle_pause: false,
    };

    pub fn jump() -> Self {
        Self {
            jump: true,
            ..Self::IDLE
        }
    }

    pub fn toggle_pause() -> Self {
        Self {
            toggle_pause: true,
            ..Self::IDLE
        }
    }

    /// Left wins when both directions are held.
    pub fn horizontal(&self) -> Horizontal {
        if self.left {
            Horizontal::Left
        } else if self.right {
            Horizontal::Right
        } else {
            Horizontal::Idle
        }
    }
}
