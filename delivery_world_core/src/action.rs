use serde::{Deserialize, Serialize};

use crate::{Orientation, error::EnvError};

/// Actions the agent can take. Indices follow declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    MoveForward,
    MoveBackward,
    MoveLeft,
    MoveRight,
    TurnLeft,
    TurnRight,
    /// Interact with the occupied cell (pickup at a hub, drop-off at an address).
    Actuate,
    NoOp,
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::MoveForward,
        Action::MoveBackward,
        Action::MoveLeft,
        Action::MoveRight,
        Action::TurnLeft,
        Action::TurnRight,
        Action::Actuate,
        Action::NoOp,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Direction of travel for movement actions, relative to `facing`.
    pub fn movement_direction(self, facing: Orientation) -> Option<Orientation> {
        match self {
            Action::MoveForward => Some(facing),
            Action::MoveBackward => Some(facing.rotate_back()),
            Action::MoveLeft => Some(facing.rotate_left()),
            Action::MoveRight => Some(facing.rotate_right()),
            _ => None,
        }
    }

    pub fn is_movement(self) -> bool {
        matches!(
            self,
            Action::MoveForward | Action::MoveBackward | Action::MoveLeft | Action::MoveRight
        )
    }
}

impl TryFrom<usize> for Action {
    type Error = EnvError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Action::ALL
            .get(value)
            .copied()
            .ok_or(EnvError::InvalidAction { value })
    }
}
