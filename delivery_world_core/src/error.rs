use thiserror::Error;

use crate::{Position, map::GridError};

/// Problems with the static environment description.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("layout is empty")]
    EmptyLayout,

    #[error("inconsistent layout width at row {row}: expected {expected}, found {found}")]
    RaggedLayout {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("unknown layout token '{token}' at {position}")]
    UnknownToken { token: String, position: Position },

    #[error("border cell at {position} must be a wall")]
    OpenBorder { position: Position },

    #[error("layout has {addresses} delivery addresses but {given} demand values were given")]
    DemandCountMismatch { addresses: usize, given: usize },

    #[error("max_capacity must be at least 1")]
    ZeroCapacity,

    #[error("target_count {target} is not reachable: total demand is {total_demand}")]
    InvalidTarget { target: u32, total_demand: u32 },

    #[error("no valid cell to place the agent")]
    NoPlacementCell,

    #[error("unknown {category} rule '{name}'")]
    UnknownRule { category: &'static str, name: String },

    #[error("rule '{rule}' requires parameter '{parameter}'")]
    MissingParameter { rule: String, parameter: String },

    #[error("rule registry: {0}")]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by a [`crate::registry::RuleRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{category} rule '{name}' is already registered")]
    NameConflict { category: &'static str, name: String },

    #[error("{category} rule '{name}' is not registered")]
    NotFound { category: &'static str, name: String },
}

/// A rule drove a counter out of its bounds. Always a programming defect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invariant violated by '{rule}': {detail}")]
pub struct InvariantViolation {
    pub rule: String,
    pub detail: String,
}

impl InvariantViolation {
    pub fn new(rule: impl Into<String>, detail: impl Into<String>) -> Self {
        InvariantViolation {
            rule: rule.into(),
            detail: detail.into(),
        }
    }
}

/// Errors surfaced to callers of [`crate::DeliveryEnv`].
#[derive(Debug, Error)]
pub enum EnvError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid action index {value}")]
    InvalidAction { value: usize },

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),

    #[error("step called before reset")]
    NotReset,

    #[error("episode is over; call reset before stepping again")]
    EpisodeOver,
}

pub type EnvResult<T> = Result<T, EnvError>;
