use crate::{
    Action,
    config::RuleParams,
    error::{ConfigError, RegistryError},
    registry::RuleRegistry,
    state::WorldState,
};

use super::{RuleContext, StepOutcome, TerminatingFactory, TerminatingRule};

/// Logical OR over every terminating rule. No rules means never terminal.
pub fn evaluate(
    prev: &WorldState,
    action: Action,
    next: &WorldState,
    outcome: &StepOutcome,
    rules: &[(String, TerminatingRule)],
) -> bool {
    rules.iter().any(|(name, rule)| {
        let terminal = rule(prev, action, next, outcome);
        if terminal {
            tracing::debug!(rule = %name, "episode terminated");
        }
        terminal
    })
}

fn all_delivered(context: &RuleContext, _: &RuleParams) -> Result<TerminatingRule, ConfigError> {
    let target = context.target_count;
    Ok(Box::new(
        move |_: &WorldState, _: Action, next: &WorldState, _: &StepOutcome| {
            next.agent.finished_deliveries == target
        },
    ))
}

/// Every delivery address is satisfied, whatever the configured target.
fn no_pending_addresses(_: &RuleContext, _: &RuleParams) -> Result<TerminatingRule, ConfigError> {
    Ok(Box::new(
        |_: &WorldState, _: Action, next: &WorldState, _: &StepOutcome| next.total_demand() == 0,
    ))
}

pub(crate) fn register_builtin(
    registry: &mut RuleRegistry<TerminatingFactory>,
) -> Result<(), RegistryError> {
    registry.register("all_delivered", all_delivered)?;
    registry.register("no_pending_addresses", no_pending_addresses)?;
    Ok(())
}
