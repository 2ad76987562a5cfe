use crate::{
    Action,
    config::RuleParams,
    error::{ConfigError, RegistryError},
    registry::RuleRegistry,
    state::WorldState,
};

use super::{
    AddressInteraction, HubInteraction, Movement, RewardFactory, RewardRule, RuleContext,
    StepOutcome,
};

/// Sums the output of every reward rule. Terms are not clipped.
pub fn evaluate(
    prev: &WorldState,
    action: Action,
    next: &WorldState,
    outcome: &StepOutcome,
    rules: &[(String, RewardRule)],
) -> f64 {
    rules
        .iter()
        .map(|(name, rule)| {
            let term = rule(prev, action, next, outcome);
            tracing::trace!(rule = %name, term, "reward term");
            term
        })
        .sum()
}

/// `success` for a delivery, `wasted` for ACTUATE on an address that could
/// not take an item.
fn finish_deliver_reward(_: &RuleContext, params: &RuleParams) -> Result<RewardRule, ConfigError> {
    let success = params.require("finish_deliver_reward", "success")?;
    let wasted = params.require("finish_deliver_reward", "wasted")?;
    Ok(Box::new(
        move |_: &WorldState, _: Action, _: &WorldState, outcome: &StepOutcome| {
            match outcome.address {
                AddressInteraction::Delivered => success,
                AddressInteraction::Wasted => wasted,
                AddressInteraction::None => 0.0,
            }
        },
    ))
}

/// `reload` per item taken from a hub, plus `emptied` on the step a hub runs
/// out. The emptied term fires once per hub.
fn reload_reward(_: &RuleContext, params: &RuleParams) -> Result<RewardRule, ConfigError> {
    let reload = params.require("reload_reward", "reload")?;
    let emptied = params.require("reload_reward", "emptied")?;
    Ok(Box::new(
        move |_: &WorldState, _: Action, _: &WorldState, outcome: &StepOutcome| match outcome.hub {
            HubInteraction::Reloaded => reload,
            HubInteraction::Emptied => reload + emptied,
            HubInteraction::Wasted | HubInteraction::None => 0.0,
        },
    ))
}

/// Scores every ACTUATE: `productive` if it moved an item, `wasted` on a hub
/// or address that could not act, `ordinary` on any other cell.
fn actuate_on_empty(_: &RuleContext, params: &RuleParams) -> Result<RewardRule, ConfigError> {
    let wasted = params.require("actuate_on_empty", "wasted")?;
    let productive = params.require("actuate_on_empty", "productive")?;
    let ordinary = params.require("actuate_on_empty", "ordinary")?;
    Ok(Box::new(
        move |prev: &WorldState, action: Action, _: &WorldState, outcome: &StepOutcome| {
            if action != Action::Actuate {
                0.0
            } else if outcome.productive() {
                productive
            } else if outcome.wasted() || prev.agent_cell().is_interactive() {
                wasted
            } else {
                ordinary
            }
        },
    ))
}

/// `per_item` times the carried load, every step. Expected to be negative.
fn holding_penalty(_: &RuleContext, params: &RuleParams) -> Result<RewardRule, ConfigError> {
    let per_item = params.require("holding_penalty", "per_item")?;
    Ok(Box::new(
        move |_: &WorldState, _: Action, next: &WorldState, _: &StepOutcome| {
            per_item * f64::from(next.agent.capacity)
        },
    ))
}

/// `reward` on the step the delivery target is reached.
fn terminating_reward(context: &RuleContext, params: &RuleParams) -> Result<RewardRule, ConfigError> {
    let reward = params.require("terminating_reward", "reward")?;
    let target = context.target_count;
    Ok(Box::new(
        move |prev: &WorldState, _: Action, next: &WorldState, _: &StepOutcome| {
            if prev.agent.finished_deliveries < target && next.agent.finished_deliveries == target {
                reward
            } else {
                0.0
            }
        },
    ))
}

/// Constant `reward` every step, -1 unless configured.
fn living_reward(_: &RuleContext, params: &RuleParams) -> Result<RewardRule, ConfigError> {
    let reward = params.get_or("reward", -1.0);
    Ok(Box::new(
        move |_: &WorldState, _: Action, _: &WorldState, _: &StepOutcome| reward,
    ))
}

/// `reward` when a movement action was blocked, -1 unless configured.
fn bump_into_wall(_: &RuleContext, params: &RuleParams) -> Result<RewardRule, ConfigError> {
    let reward = params.get_or("reward", -1.0);
    Ok(Box::new(
        move |_: &WorldState, _: Action, _: &WorldState, outcome: &StepOutcome| {
            if outcome.movement == Movement::Bumped {
                reward
            } else {
                0.0
            }
        },
    ))
}

pub(crate) fn register_builtin(registry: &mut RuleRegistry<RewardFactory>) -> Result<(), RegistryError> {
    registry.register("finish_deliver_reward", finish_deliver_reward)?;
    registry.register("reload_reward", reload_reward)?;
    registry.register("actuate_on_empty", actuate_on_empty)?;
    registry.register("holding_penalty", holding_penalty)?;
    registry.register("terminating_reward", terminating_reward)?;
    registry.register("living_reward", living_reward)?;
    registry.register("bump_into_wall", bump_into_wall)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Orientation, Position,
        cell::Cell,
        config::TaskConfig,
        map::Grid,
        state::AgentState,
    };

    fn state_on(cell: Cell, capacity: u32, finished: u32) -> WorldState {
        let mut grid = Grid::filled(3, 3, Cell::Wall);
        grid[Position::new(1, 1)] = cell;
        let mut agent = AgentState::new(Position::new(1, 1), Orientation::North, 3);
        agent.capacity = capacity;
        agent.finished_deliveries = finished;
        WorldState::new(grid, agent)
    }

    fn build(
        factory: fn(&RuleContext, &RuleParams) -> Result<RewardRule, ConfigError>,
        params: RuleParams,
    ) -> RewardRule {
        let task = TaskConfig::default();
        let context = RuleContext {
            task: &task,
            target_count: 3,
        };
        factory(&context, &params).unwrap()
    }

    fn outcome(action: Action) -> StepOutcome {
        StepOutcome::new(action)
    }

    #[test]
    fn finish_deliver_reward_scores_outcome() {
        let rule = build(
            finish_deliver_reward,
            RuleParams::new().with("success", 1.0).with("wasted", -1.5),
        );
        let s = state_on(Cell::address(1), 1, 0);
        let mut o = outcome(Action::Actuate);
        o.address = AddressInteraction::Delivered;
        assert_eq!(rule(&s, Action::Actuate, &s, &o), 1.0);
        o.address = AddressInteraction::Wasted;
        assert_eq!(rule(&s, Action::Actuate, &s, &o), -1.5);
        assert_eq!(rule(&s, Action::NoOp, &s, &outcome(Action::NoOp)), 0.0);
    }

    #[test]
    fn reload_reward_adds_emptied_bonus() {
        let rule = build(
            reload_reward,
            RuleParams::new().with("reload", 1.0).with("emptied", 5.0),
        );
        let s = state_on(Cell::hub(1), 0, 0);
        let mut o = outcome(Action::Actuate);
        o.hub = HubInteraction::Reloaded;
        assert_eq!(rule(&s, Action::Actuate, &s, &o), 1.0);
        o.hub = HubInteraction::Emptied;
        assert_eq!(rule(&s, Action::Actuate, &s, &o), 6.0);
        o.hub = HubInteraction::Wasted;
        assert_eq!(rule(&s, Action::Actuate, &s, &o), 0.0);
    }

    #[test]
    fn actuate_on_empty_distinguishes_cells() {
        let rule = build(
            actuate_on_empty,
            RuleParams::new()
                .with("wasted", -2.0)
                .with("productive", 0.5)
                .with("ordinary", -1.0),
        );
        let floor = state_on(Cell::Floor, 0, 0);
        assert_eq!(rule(&floor, Action::Actuate, &floor, &outcome(Action::Actuate)), -1.0);
        assert_eq!(rule(&floor, Action::NoOp, &floor, &outcome(Action::NoOp)), 0.0);

        let hub = state_on(Cell::hub(0), 0, 0);
        let mut o = outcome(Action::Actuate);
        o.hub = HubInteraction::Wasted;
        assert_eq!(rule(&hub, Action::Actuate, &hub, &o), -2.0);
        o.hub = HubInteraction::Reloaded;
        assert_eq!(rule(&hub, Action::Actuate, &hub, &o), 0.5);

        // No transition rule reported anything, but the cell is interactive.
        let address = state_on(Cell::address(0), 0, 0);
        assert_eq!(rule(&address, Action::Actuate, &address, &outcome(Action::Actuate)), -2.0);
    }

    #[test]
    fn holding_penalty_scales_with_load() {
        let rule = build(holding_penalty, RuleParams::new().with("per_item", -0.25));
        let prev = state_on(Cell::Floor, 0, 0);
        let next = state_on(Cell::Floor, 2, 0);
        assert_eq!(rule(&prev, Action::NoOp, &next, &outcome(Action::NoOp)), -0.5);
    }

    #[test]
    fn terminating_reward_fires_on_reaching_target_only() {
        let rule = build(terminating_reward, RuleParams::new().with("reward", 10.0));
        let o = outcome(Action::Actuate);
        let two = state_on(Cell::Floor, 0, 2);
        let three = state_on(Cell::Floor, 0, 3);
        assert_eq!(rule(&two, Action::Actuate, &three, &o), 10.0);
        assert_eq!(rule(&three, Action::NoOp, &three, &o), 0.0);
        assert_eq!(rule(&two, Action::NoOp, &two, &o), 0.0);
    }

    #[test]
    fn bump_into_wall_needs_blocked_move() {
        let rule = build(bump_into_wall, RuleParams::new().with("reward", -1.0));
        let s = state_on(Cell::Floor, 0, 0);
        let mut o = outcome(Action::MoveForward);
        o.movement = Movement::Bumped;
        assert_eq!(rule(&s, Action::MoveForward, &s, &o), -1.0);
        o.movement = Movement::Moved;
        assert_eq!(rule(&s, Action::MoveForward, &s, &o), 0.0);
    }

    #[test]
    fn missing_scale_is_rejected() {
        let task = TaskConfig::default();
        let context = RuleContext {
            task: &task,
            target_count: 1,
        };
        assert!(matches!(
            holding_penalty(&context, &RuleParams::new()),
            Err(ConfigError::MissingParameter { .. })
        ));

        let living = living_reward(&context, &RuleParams::new()).unwrap();
        let s = state_on(Cell::Floor, 0, 0);
        assert_eq!(living(&s, Action::NoOp, &s, &outcome(Action::NoOp)), -1.0);
    }

    #[test]
    fn evaluate_sums_terms() {
        let rules = vec![
            (
                "living_reward".to_string(),
                build(living_reward, RuleParams::new().with("reward", -1.0)),
            ),
            (
                "holding_penalty".to_string(),
                build(holding_penalty, RuleParams::new().with("per_item", -0.5)),
            ),
        ];
        let s = state_on(Cell::Floor, 2, 0);
        assert_eq!(evaluate(&s, Action::NoOp, &s, &outcome(Action::NoOp), &rules), -2.0);
        assert_eq!(evaluate(&s, Action::NoOp, &s, &outcome(Action::NoOp), &[]), 0.0);
    }
}
