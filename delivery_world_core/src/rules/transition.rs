use crate::{
    Action, EnvRng,
    cell::{Cell, HubState},
    config::RuleParams,
    error::{ConfigError, InvariantViolation, RegistryError},
    registry::RuleRegistry,
    state::WorldState,
};

use super::{
    AddressInteraction, HubInteraction, Movement, RuleContext, StepOutcome, TransitionFactory,
    TransitionRule,
};

/// Runs `rules` in order against `state`, mutating it in place.
///
/// Each rule sees the effects of the rules before it. Invariants are checked
/// after every rule, so a violation names the rule that caused it.
pub fn apply(
    state: &mut WorldState,
    action: Action,
    rng: &mut EnvRng,
    rules: &[(String, TransitionRule)],
) -> Result<StepOutcome, InvariantViolation> {
    let mut outcome = StepOutcome::new(action);
    for (name, rule) in rules {
        let checked = rule(state, action, rng, &mut outcome)
            .and_then(|()| state.check_invariants(name));
        if let Err(violation) = checked {
            tracing::warn!(rule = %name, %violation, "transition rule broke an invariant");
            return Err(violation);
        }
    }
    Ok(outcome)
}

/// One-cell moves relative to the agent's orientation.
fn move_agent(
    state: &mut WorldState,
    action: Action,
    _rng: &mut EnvRng,
    outcome: &mut StepOutcome,
) -> Result<(), InvariantViolation> {
    let Some(direction) = action.movement_direction(state.agent.orientation) else {
        return Ok(());
    };
    let target = state
        .agent
        .position
        .step(direction)
        .filter(|target| state.grid.get(*target).is_some_and(|cell| !cell.blocks_movement()));
    match target {
        Some(target) => {
            state.agent.position = target;
            outcome.movement = Movement::Moved;
        }
        None => outcome.movement = Movement::Bumped,
    }
    Ok(())
}

fn rotate_agent(
    state: &mut WorldState,
    action: Action,
    _rng: &mut EnvRng,
    outcome: &mut StepOutcome,
) -> Result<(), InvariantViolation> {
    let orientation = &mut state.agent.orientation;
    match action {
        Action::TurnLeft => *orientation = orientation.rotate_left(),
        Action::TurnRight => *orientation = orientation.rotate_right(),
        _ => return Ok(()),
    }
    outcome.movement = Movement::Turned;
    Ok(())
}

/// ACTUATE on a hub moves one item into the agent. The reload that takes the
/// last item closes the hub for good.
fn reload(
    state: &mut WorldState,
    action: Action,
    _rng: &mut EnvRng,
    outcome: &mut StepOutcome,
) -> Result<(), InvariantViolation> {
    if action != Action::Actuate {
        return Ok(());
    }
    let position = state.agent.position;
    let (agent, cell) = state.agent_and_cell_mut();
    let Cell::Hub(hub) = cell else {
        return Ok(());
    };
    if !hub.can_supply() || agent.is_full() {
        outcome.hub = HubInteraction::Wasted;
        return Ok(());
    }

    hub.stock = hub.stock.checked_sub(1).ok_or_else(|| {
        InvariantViolation::new("reload", format!("hub stock underflow at {position}"))
    })?;
    agent.capacity += 1;
    outcome.hub = HubInteraction::Reloaded;

    if hub.stock == 0 {
        hub.state = HubState::Empty;
        if !hub.bonus_granted {
            hub.bonus_granted = true;
            outcome.hub = HubInteraction::Emptied;
        }
        tracing::debug!(%position, "hub emptied");
    }
    Ok(())
}

/// ACTUATE on a pending address drops one carried item there.
fn unload(
    state: &mut WorldState,
    action: Action,
    _rng: &mut EnvRng,
    outcome: &mut StepOutcome,
) -> Result<(), InvariantViolation> {
    if action != Action::Actuate {
        return Ok(());
    }
    let position = state.agent.position;
    let (agent, cell) = state.agent_and_cell_mut();
    let Cell::DeliveryAddress(address) = cell else {
        return Ok(());
    };
    if agent.capacity == 0 || address.is_satisfied() {
        outcome.address = AddressInteraction::Wasted;
        return Ok(());
    }

    address.required -= 1;
    agent.capacity = agent.capacity.checked_sub(1).ok_or_else(|| {
        InvariantViolation::new("unload", format!("capacity underflow at {position}"))
    })?;
    agent.finished_deliveries += 1;
    outcome.address = AddressInteraction::Delivered;

    if address.is_satisfied() {
        tracing::debug!(%position, "address satisfied");
    }
    Ok(())
}

macro_rules! stateless_factory {
    ($factory:ident, $rule:ident) => {
        fn $factory(_: &RuleContext, _: &RuleParams) -> Result<TransitionRule, ConfigError> {
            Ok(Box::new($rule))
        }
    };
}

stateless_factory!(move_agent_factory, move_agent);
stateless_factory!(rotate_agent_factory, rotate_agent);
stateless_factory!(reload_factory, reload);
stateless_factory!(unload_factory, unload);

pub(crate) fn register_builtin(
    registry: &mut RuleRegistry<TransitionFactory>,
) -> Result<(), RegistryError> {
    registry.register("move_agent", move_agent_factory)?;
    registry.register("rotate_agent", rotate_agent_factory)?;
    registry.register("reload", reload_factory)?;
    registry.register("unload", unload_factory)?;
    Ok(())
}
