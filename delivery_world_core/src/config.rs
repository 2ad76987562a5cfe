use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// The demonstration layout: a 7x9 room with one central hub and three
/// delivery addresses.
pub const DEFAULT_LAYOUT: &str = "
WL WL WL WL WL WL WL WL WL
WL FL FL FL FL FL FL DA WL
WL FL WL WL FL WL WL FL WL
WL FL FL FL HB FL FL FL WL
WL FL WL WL FL WL WL FL WL
WL DA FL FL FL FL FL DA WL
WL WL WL WL WL WL WL WL WL
";

/// Named float constants bound into a rule when it is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleParams(BTreeMap<String, f64>);

impl RuleParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: f64) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    pub fn get_or(&self, key: &str, default: f64) -> f64 {
        self.get(key).unwrap_or(default)
    }

    /// Fetches a mandatory parameter of `rule`.
    pub fn require(&self, rule: &str, key: &str) -> Result<f64, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::MissingParameter {
            rule: rule.to_string(),
            parameter: key.to_string(),
        })
    }
}

/// Selects one registered rule by name and supplies its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub name: String,
    #[serde(flatten)]
    pub params: RuleParams,
}

impl RuleConfig {
    pub fn new(name: impl Into<String>) -> Self {
        RuleConfig {
            name: name.into(),
            params: RuleParams::new(),
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: f64) -> Self {
        self.params = self.params.with(key, value);
        self
    }
}

/// Static description of the delivery task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    /// Whitespace-separated layout tokens; required by the `from_layout` reset.
    #[serde(default)]
    pub layout: Option<String>,
    pub max_capacity: u32,
    /// Initial stock of every hub.
    pub hub_stock: u32,
    /// Demand per delivery address in row-major order. A single value is
    /// applied to every address.
    pub address_required: Vec<u32>,
    /// Deliveries needed to end the episode; defaults to the total demand.
    #[serde(default)]
    pub target_count: Option<u32>,
}

impl TaskConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }

    /// Resolves the per-address demand list for `addresses` addresses.
    pub fn demands(&self, addresses: usize) -> Result<Vec<u32>, ConfigError> {
        match self.address_required.as_slice() {
            [single] => Ok(vec![*single; addresses]),
            list if list.len() == addresses => Ok(list.to_vec()),
            list => Err(ConfigError::DemandCountMismatch {
                addresses,
                given: list.len(),
            }),
        }
    }

    /// Resolves `target_count` against the total demand of a built grid.
    pub fn resolve_target(&self, total_demand: u32) -> Result<u32, ConfigError> {
        let target = self.target_count.unwrap_or(total_demand);
        if target == 0 || target > total_demand {
            return Err(ConfigError::InvalidTarget {
                target,
                total_demand,
            });
        }
        Ok(target)
    }
}

impl Default for TaskConfig {
    fn default() -> Self {
        TaskConfig {
            layout: Some(DEFAULT_LAYOUT.to_string()),
            max_capacity: 2,
            hub_stock: 4,
            address_required: vec![1, 2, 1],
            target_count: None,
        }
    }
}

/// Full environment configuration: the task plus the selected rules of each
/// category, in application order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvConfig {
    pub task: TaskConfig,
    pub reset_function: RuleConfig,
    #[serde(default)]
    pub transition_functions: Vec<RuleConfig>,
    #[serde(default)]
    pub reward_functions: Vec<RuleConfig>,
    #[serde(default)]
    pub terminating_functions: Vec<RuleConfig>,
    /// Optional horizon enforced by the environment wrapper.
    #[serde(default)]
    pub max_steps: Option<u32>,
}

impl EnvConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: EnvConfig = serde_yaml::from_str(yaml)?;
        config.task.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        EnvConfig {
            task: TaskConfig::default(),
            reset_function: RuleConfig::new("from_layout"),
            transition_functions: vec![
                RuleConfig::new("move_agent"),
                RuleConfig::new("rotate_agent"),
                RuleConfig::new("reload"),
                RuleConfig::new("unload"),
            ],
            reward_functions: vec![
                RuleConfig::new("finish_deliver_reward")
                    .param("success", 10.0)
                    .param("wasted", -1.5),
                RuleConfig::new("reload_reward")
                    .param("reload", 1.0)
                    .param("emptied", 2.0),
                RuleConfig::new("actuate_on_empty")
                    .param("wasted", -1.5)
                    .param("productive", 0.5)
                    .param("ordinary", -1.0),
                RuleConfig::new("holding_penalty").param("per_item", -0.01),
                RuleConfig::new("terminating_reward").param("reward", 20.0),
                RuleConfig::new("living_reward").param("reward", -0.05),
                RuleConfig::new("bump_into_wall").param("reward", -0.5),
            ],
            terminating_functions: vec![RuleConfig::new("all_delivered")],
            max_steps: Some(500),
        }
    }
}
