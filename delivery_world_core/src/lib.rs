use serde::{Deserialize, Serialize};

pub mod action;
pub mod agent;
pub mod cell;
pub mod config;
pub mod environment;
pub mod error;
pub mod layout;
pub mod map;
pub mod registry;
pub mod representation;
pub mod rules;
pub mod state;

pub use action::Action;
pub use cell::{Cell, HubState};
pub use config::{EnvConfig, RuleConfig, RuleParams, TaskConfig};
pub use environment::{DeliveryEnv, StepResult};
pub use error::{ConfigError, EnvError, InvariantViolation, RegistryError};
pub use state::{AgentState, WorldState};

/// Random source used by reset (and any transition rule that needs one).
pub type EnvRng = rand::rngs::StdRng;

/// Represents a 2D grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub const fn new(row: usize, col: usize) -> Self {
        Position { row, col }
    }

    /// Returns the neighbouring position one step towards `orientation`,
    /// or `None` if that would leave the non-negative quadrant.
    pub fn step(self, orientation: Orientation) -> Option<Position> {
        let (dr, dc) = orientation.delta();
        Some(Position {
            row: self.row.checked_add_signed(dr)?,
            col: self.col.checked_add_signed(dc)?,
        })
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Compass direction the agent is facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    North,
    East,
    South,
    West,
}

impl Orientation {
    pub const ALL: [Orientation; 4] = [
        Orientation::North,
        Orientation::East,
        Orientation::South,
        Orientation::West,
    ];

    /// Row/column delta of one step in this direction. North is row - 1.
    pub fn delta(self) -> (isize, isize) {
        match self {
            Orientation::North => (-1, 0),
            Orientation::East => (0, 1),
            Orientation::South => (1, 0),
            Orientation::West => (0, -1),
        }
    }

    pub fn rotate_left(self) -> Self {
        match self {
            Orientation::North => Orientation::West,
            Orientation::West => Orientation::South,
            Orientation::South => Orientation::East,
            Orientation::East => Orientation::North,
        }
    }

    pub fn rotate_right(self) -> Self {
        match self {
            Orientation::North => Orientation::East,
            Orientation::East => Orientation::South,
            Orientation::South => Orientation::West,
            Orientation::West => Orientation::North,
        }
    }

    pub fn rotate_back(self) -> Self {
        self.rotate_left().rotate_left()
    }
}
