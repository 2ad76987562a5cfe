//! Rule categories, their registries, and the rule set an environment is
//! built from.
//!
//! A rule is a boxed closure produced by a registered factory, which binds the
//! rule's configured constants. Transition rules run in order and mutate the
//! state; they also fill in one [`StepOutcome`] that every reward and
//! terminating rule reads instead of re-deriving what happened.

use crate::{
    Action, EnvRng,
    config::{EnvConfig, RuleParams, TaskConfig},
    error::{ConfigError, InvariantViolation, RegistryError},
    registry::RuleRegistry,
    state::WorldState,
};

pub mod reset;
pub mod reward;
pub mod terminating;
pub mod transition;

pub use reset::ResetRule;

pub type TransitionRule = Box<
    dyn Fn(&mut WorldState, Action, &mut EnvRng, &mut StepOutcome) -> Result<(), InvariantViolation>,
>;
pub type RewardRule = Box<dyn Fn(&WorldState, Action, &WorldState, &StepOutcome) -> f64>;
pub type TerminatingRule = Box<dyn Fn(&WorldState, Action, &WorldState, &StepOutcome) -> bool>;

pub type ResetFactory = fn(&TaskConfig, &RuleParams) -> Result<ResetRule, ConfigError>;
pub type TransitionFactory = fn(&RuleContext, &RuleParams) -> Result<TransitionRule, ConfigError>;
pub type RewardFactory = fn(&RuleContext, &RuleParams) -> Result<RewardRule, ConfigError>;
pub type TerminatingFactory = fn(&RuleContext, &RuleParams) -> Result<TerminatingRule, ConfigError>;

/// Per-environment values every non-reset rule may depend on.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub task: &'a TaskConfig,
    pub target_count: u32,
}

/// What happened at a hub during the step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HubInteraction {
    #[default]
    None,
    /// One item moved from the hub to the agent.
    Reloaded,
    /// A reload that drove the hub to `Empty`; reported once per hub.
    Emptied,
    /// ACTUATE on a hub that could not supply (empty hub or full agent).
    Wasted,
}

/// What happened at a delivery address during the step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AddressInteraction {
    #[default]
    None,
    Delivered,
    /// ACTUATE with nothing to drop or nothing left to deliver.
    Wasted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Movement {
    #[default]
    None,
    Moved,
    /// A movement action whose target cell blocks movement.
    Bumped,
    Turned,
}

/// Result of the transition phase, shared read-only with reward and
/// terminating rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    pub action: Action,
    pub hub: HubInteraction,
    pub address: AddressInteraction,
    pub movement: Movement,
}

impl StepOutcome {
    pub fn new(action: Action) -> Self {
        StepOutcome {
            action,
            hub: HubInteraction::None,
            address: AddressInteraction::None,
            movement: Movement::None,
        }
    }

    pub fn reloaded(&self) -> bool {
        matches!(self.hub, HubInteraction::Reloaded | HubInteraction::Emptied)
    }

    pub fn delivered(&self) -> bool {
        self.address == AddressInteraction::Delivered
    }

    /// ACTUATE changed the world.
    pub fn productive(&self) -> bool {
        self.reloaded() || self.delivered()
    }

    /// ACTUATE on an interactive cell that could not act.
    pub fn wasted(&self) -> bool {
        self.hub == HubInteraction::Wasted || self.address == AddressInteraction::Wasted
    }
}

/// One registry per rule category.
pub struct Registries {
    pub reset: RuleRegistry<ResetFactory>,
    pub transition: RuleRegistry<TransitionFactory>,
    pub reward: RuleRegistry<RewardFactory>,
    pub terminating: RuleRegistry<TerminatingFactory>,
}

impl Registries {
    pub fn empty() -> Self {
        Registries {
            reset: RuleRegistry::new("reset"),
            transition: RuleRegistry::new("transition"),
            reward: RuleRegistry::new("reward"),
            terminating: RuleRegistry::new("terminating"),
        }
    }

    /// Registries holding every delivery-domain rule.
    pub fn builtin() -> Result<Self, RegistryError> {
        let mut registries = Self::empty();
        reset::register_builtin(&mut registries.reset)?;
        transition::register_builtin(&mut registries.transition)?;
        reward::register_builtin(&mut registries.reward)?;
        terminating::register_builtin(&mut registries.terminating)?;
        Ok(registries)
    }
}

/// The resolved, ordered rules of one environment.
pub struct RuleSet {
    pub reset: ResetRule,
    pub target_count: u32,
    pub transitions: Vec<(String, TransitionRule)>,
    pub rewards: Vec<(String, RewardRule)>,
    pub terminating: Vec<(String, TerminatingRule)>,
}

impl RuleSet {
    /// Looks up every configured rule name and binds its parameters.
    pub fn from_config(config: &EnvConfig, registries: &Registries) -> Result<Self, ConfigError> {
        config.task.validate()?;

        let reset_factory = lookup(&registries.reset, &config.reset_function.name)?;
        let reset = reset_factory(&config.task, &config.reset_function.params)?;
        let target_count = config.task.resolve_target(reset.template().total_demand())?;

        let context = RuleContext {
            task: &config.task,
            target_count,
        };
        Ok(RuleSet {
            reset,
            target_count,
            transitions: bind(&registries.transition, &config.transition_functions, &context)?,
            rewards: bind(&registries.reward, &config.reward_functions, &context)?,
            terminating: bind(&registries.terminating, &config.terminating_functions, &context)?,
        })
    }
}

fn lookup<'r, F>(registry: &'r RuleRegistry<F>, name: &str) -> Result<&'r F, ConfigError> {
    registry.get(name).map_err(|err| match err {
        RegistryError::NotFound { category, name } => ConfigError::UnknownRule { category, name },
        other => ConfigError::Registry(other),
    })
}

fn bind<R>(
    registry: &RuleRegistry<fn(&RuleContext, &RuleParams) -> Result<R, ConfigError>>,
    selected: &[crate::config::RuleConfig],
    context: &RuleContext,
) -> Result<Vec<(String, R)>, ConfigError> {
    selected
        .iter()
        .map(|rule| {
            let factory = lookup(registry, &rule.name)?;
            Ok((rule.name.clone(), factory(context, &rule.params)?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleConfig;

    #[test]
    fn builtin_registries_cover_default_config() {
        let registries = Registries::builtin().unwrap();
        let rules = RuleSet::from_config(&EnvConfig::default(), &registries).unwrap();
        assert_eq!(rules.target_count, 4);
        let names: Vec<&str> = rules.transitions.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["move_agent", "rotate_agent", "reload", "unload"]);
        assert_eq!(rules.rewards.len(), 7);
        assert_eq!(rules.terminating.len(), 1);
    }

    #[test]
    fn unknown_rule_is_a_config_error() {
        let registries = Registries::builtin().unwrap();
        let mut config = EnvConfig::default();
        config.reward_functions.push(RuleConfig::new("teleport_bonus"));
        match RuleSet::from_config(&config, &registries) {
            Err(ConfigError::UnknownRule { category, name }) => {
                assert_eq!(category, "reward");
                assert_eq!(name, "teleport_bonus");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("unknown rule accepted"),
        }
    }

    #[test]
    fn registering_a_builtin_name_again_conflicts() {
        let mut registries = Registries::builtin().unwrap();
        let factory = *registries.reward.get("living_reward").unwrap();
        assert!(matches!(
            registries.reward.register("living_reward", factory),
            Err(RegistryError::NameConflict { .. })
        ));
    }

    fn constant_one(_: &RuleContext, _: &RuleParams) -> Result<RewardRule, ConfigError> {
        Ok(Box::new(
            |_: &WorldState, _: Action, _: &WorldState, _: &StepOutcome| 1.0,
        ))
    }

    #[test]
    fn custom_rule_can_be_registered_and_selected() {
        let mut registries = Registries::builtin().unwrap();
        registries
            .reward
            .register("constant_one", constant_one)
            .unwrap();
        let mut config = EnvConfig::default();
        config.reward_functions = vec![RuleConfig::new("constant_one")];
        let rules = RuleSet::from_config(&config, &registries).unwrap();
        assert_eq!(rules.rewards[0].0, "constant_one");
    }

    #[test]
    fn unreachable_target_is_rejected() {
        let registries = Registries::builtin().unwrap();
        let mut config = EnvConfig::default();
        config.task.target_count = Some(99);
        assert!(matches!(
            RuleSet::from_config(&config, &registries),
            Err(ConfigError::InvalidTarget { target: 99, .. })
        ));
    }
}
