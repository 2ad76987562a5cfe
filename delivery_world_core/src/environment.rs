use rand::SeedableRng;

use crate::{
    Action, EnvRng,
    config::EnvConfig,
    error::{ConfigError, EnvError, EnvResult},
    representation::{CompactRepresentation, Observation, Representation},
    rules::{Registries, RuleSet, StepOutcome, reward, terminating, transition},
    state::WorldState,
};

/// Outcome of one call to [`DeliveryEnv::step`].
#[derive(Debug, Clone)]
pub struct StepResult<O = Observation> {
    pub observation: O,
    pub reward: f64,
    /// The terminating rules fired.
    pub terminal: bool,
    /// The step horizon was reached first.
    pub truncated: bool,
    pub outcome: StepOutcome,
}

/// Manages one episode at a time over a rule set built from configuration.
///
/// Each environment owns its rules and random source, so any number of them
/// can coexist in one process.
pub struct DeliveryEnv<R: Representation = CompactRepresentation> {
    rules: RuleSet,
    representation: R,
    rng: EnvRng,
    state: Option<WorldState>,
    max_steps: Option<u32>,
    steps: u32,
    done: bool,
}

impl DeliveryEnv {
    /// Builds an environment from `config` using the built-in rules.
    pub fn new(config: &EnvConfig) -> EnvResult<Self> {
        let registries = Registries::builtin().map_err(ConfigError::from)?;
        Self::with_parts(config, &registries, CompactRepresentation)
    }
}

impl<R: Representation> DeliveryEnv<R> {
    pub fn with_parts(
        config: &EnvConfig,
        registries: &Registries,
        representation: R,
    ) -> EnvResult<Self> {
        let rules = RuleSet::from_config(config, registries)?;
        Ok(DeliveryEnv {
            rules,
            representation,
            rng: EnvRng::from_os_rng(),
            state: None,
            max_steps: config.max_steps,
            steps: 0,
            done: false,
        })
    }

    /// Starts a new episode. A seed reseeds the random source; without one
    /// the source continues from where the previous episode left it.
    pub fn reset(&mut self, seed: Option<u64>) -> EnvResult<R::Output> {
        if let Some(seed) = seed {
            self.rng = EnvRng::seed_from_u64(seed);
        }
        let state = self.rules.reset.build(&mut self.rng)?;
        state.check_invariants("reset")?;
        tracing::info!(
            ?seed,
            position = %state.agent.position,
            target_count = self.rules.target_count,
            "episode reset"
        );
        let observation = self.representation.convert(&state);
        self.state = Some(state);
        self.steps = 0;
        self.done = false;
        Ok(observation)
    }

    /// Advances the episode by one action: transitions, then reward, then
    /// termination.
    pub fn step(&mut self, action: Action) -> EnvResult<StepResult<R::Output>> {
        if self.done {
            return Err(EnvError::EpisodeOver);
        }
        let state = self.state.as_mut().ok_or(EnvError::NotReset)?;
        let prev = state.clone();

        let outcome = match transition::apply(state, action, &mut self.rng, &self.rules.transitions)
        {
            Ok(outcome) => outcome,
            Err(violation) => {
                self.done = true;
                return Err(violation.into());
            }
        };
        let reward = reward::evaluate(&prev, action, state, &outcome, &self.rules.rewards);
        let terminal =
            terminating::evaluate(&prev, action, state, &outcome, &self.rules.terminating);

        self.steps += 1;
        let truncated = !terminal && self.max_steps.is_some_and(|max| self.steps >= max);
        self.done = terminal || truncated;

        tracing::debug!(
            step = self.steps,
            ?action,
            hub = ?outcome.hub,
            address = ?outcome.address,
            movement = ?outcome.movement,
            reward,
            terminal,
            truncated,
            "step"
        );

        Ok(StepResult {
            observation: self.representation.convert(state),
            reward,
            terminal,
            truncated,
            outcome,
        })
    }

    /// Like [`step`](Self::step) with a raw action index. An unknown index
    /// leaves the episode untouched.
    pub fn step_index(&mut self, index: usize) -> EnvResult<StepResult<R::Output>> {
        let action = Action::try_from(index)?;
        self.step(action)
    }

    pub fn state(&self) -> Option<&WorldState> {
        self.state.as_ref()
    }

    pub fn target_count(&self) -> u32 {
        self.rules.target_count
    }

    /// Steps taken in the current episode.
    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn is_done(&self) -> bool {
        self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleConfig;

    #[test]
    fn step_before_reset_fails() {
        let mut env = DeliveryEnv::new(&EnvConfig::default()).unwrap();
        assert!(matches!(env.step(Action::NoOp), Err(EnvError::NotReset)));
    }

    #[test]
    fn invalid_index_does_not_advance() {
        let mut env = DeliveryEnv::new(&EnvConfig::default()).unwrap();
        env.reset(Some(3)).unwrap();
        let before = env.state().unwrap().clone();
        assert!(matches!(
            env.step_index(42),
            Err(EnvError::InvalidAction { value: 42 })
        ));
        assert_eq!(env.steps(), 0);
        assert_eq!(env.state().unwrap(), &before);
    }

    #[test]
    fn seeded_reset_is_reproducible() {
        let mut a = DeliveryEnv::new(&EnvConfig::default()).unwrap();
        let mut b = DeliveryEnv::new(&EnvConfig::default()).unwrap();
        assert_eq!(a.reset(Some(9)).unwrap(), b.reset(Some(9)).unwrap());
        for action in [Action::MoveForward, Action::TurnLeft, Action::MoveRight, Action::Actuate] {
            let ra = a.step(action).unwrap();
            let rb = b.step(action).unwrap();
            assert_eq!(ra.observation, rb.observation);
            assert_eq!(ra.reward, rb.reward);
        }
    }

    #[test]
    fn horizon_truncates_and_blocks_further_steps() {
        let mut config = EnvConfig::default();
        config.max_steps = Some(2);
        let mut env = DeliveryEnv::new(&config).unwrap();
        env.reset(Some(1)).unwrap();
        assert!(!env.step(Action::NoOp).unwrap().truncated);
        let last = env.step(Action::NoOp).unwrap();
        assert!(last.truncated);
        assert!(!last.terminal);
        assert!(matches!(env.step(Action::NoOp), Err(EnvError::EpisodeOver)));

        env.reset(None).unwrap();
        assert!(env.step(Action::NoOp).is_ok());
    }

    #[test]
    fn living_reward_only() {
        let mut config = EnvConfig::default();
        config.reward_functions = vec![RuleConfig::new("living_reward").param("reward", -1.0)];
        let mut env = DeliveryEnv::new(&config).unwrap();
        env.reset(Some(0)).unwrap();
        assert_eq!(env.step(Action::NoOp).unwrap().reward, -1.0);
    }
}
