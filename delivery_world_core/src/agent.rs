use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap},
};

use rand::{SeedableRng, seq::IndexedRandom};

use crate::{Action, EnvRng, Orientation, Position, cell::Cell, state::WorldState};

/// Chooses the next action from the current world state.
///
/// `&mut self` allows a policy to keep internal state between steps.
pub trait Policy {
    fn act(&mut self, state: &WorldState) -> Action;
}

/// Picks uniformly among all actions.
#[derive(Debug)]
pub struct RandomPolicy {
    rng: EnvRng,
}

impl RandomPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: EnvRng::seed_from_u64(seed),
        }
    }
}

impl Policy for RandomPolicy {
    fn act(&mut self, _state: &WorldState) -> Action {
        *Action::ALL.choose(&mut self.rng).unwrap_or(&Action::NoOp)
    }
}

/// Scripted courier: fetch from the nearest open hub, deliver to the nearest
/// pending address, repeat.
///
/// Only relative moves are used, so the courier never spends a step turning.
#[derive(Debug, Default)]
pub struct CourierPolicy;

impl CourierPolicy {
    pub fn new() -> Self {
        Self
    }

    fn manhattan_distance(a: Position, b: Position) -> usize {
        a.row.abs_diff(b.row) + a.col.abs_diff(b.col)
    }

    /// Relative move that steps from `src` into the adjacent `dst`.
    fn move_towards(src: Position, dst: Position, facing: Orientation) -> Action {
        let Some(direction) = Orientation::ALL
            .into_iter()
            .find(|o| src.step(*o) == Some(dst))
        else {
            tracing::warn!(%src, %dst, "positions are not adjacent");
            return Action::NoOp;
        };
        if direction == facing {
            Action::MoveForward
        } else if direction == facing.rotate_left() {
            Action::MoveLeft
        } else if direction == facing.rotate_right() {
            Action::MoveRight
        } else {
            Action::MoveBackward
        }
    }

    /// A* over cells that do not block movement.
    fn a_star_path(state: &WorldState, start: Position, goal: Position) -> Option<Vec<Position>> {
        #[derive(Clone, Eq, PartialEq)]
        struct PrioritizedItem {
            priority: usize,
            position: Position,
        }

        impl Ord for PrioritizedItem {
            fn cmp(&self, other: &Self) -> Ordering {
                // Reverse ordering for min-heap behavior; position breaks ties
                // so the search is deterministic.
                other
                    .priority
                    .cmp(&self.priority)
                    .then_with(|| other.position.cmp(&self.position))
            }
        }

        impl PartialOrd for PrioritizedItem {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        let mut frontier = BinaryHeap::new();
        let mut came_from: HashMap<Position, Position> = HashMap::new();
        let mut cost_so_far: HashMap<Position, usize> = HashMap::new();

        frontier.push(PrioritizedItem {
            priority: 0,
            position: start,
        });
        cost_so_far.insert(start, 0);

        while let Some(PrioritizedItem {
            position: current, ..
        }) = frontier.pop()
        {
            if current == goal {
                break;
            }
            let current_cost = cost_so_far[&current];
            for neighbor in Self::walkable_neighbors(state, current) {
                let new_cost = current_cost + 1;
                if cost_so_far.get(&neighbor).is_none_or(|&known| new_cost < known) {
                    cost_so_far.insert(neighbor, new_cost);
                    frontier.push(PrioritizedItem {
                        priority: new_cost + Self::manhattan_distance(neighbor, goal),
                        position: neighbor,
                    });
                    came_from.insert(neighbor, current);
                }
            }
        }

        if !cost_so_far.contains_key(&goal) {
            return None;
        }

        let mut path = vec![goal];
        let mut current = goal;
        while current != start {
            current = *came_from.get(&current)?;
            path.push(current);
        }
        path.reverse();
        Some(path)
    }

    fn walkable_neighbors(state: &WorldState, position: Position) -> Vec<Position> {
        Orientation::ALL
            .into_iter()
            .filter_map(|o| position.step(o))
            .filter(|p| state.grid.get(*p).is_some_and(|cell| !cell.blocks_movement()))
            .collect()
    }

    /// Shortest path to whichever target is closest by path length.
    fn plan_to_nearest_target(
        state: &WorldState,
        start: Position,
        targets: &[Position],
    ) -> Option<Vec<Position>> {
        targets
            .iter()
            .filter_map(|target| Self::a_star_path(state, start, *target))
            .min_by_key(Vec::len)
    }
}

impl Policy for CourierPolicy {
    fn act(&mut self, state: &WorldState) -> Action {
        let agent = &state.agent;
        let outstanding = state.total_demand();

        // 1. Interact with the cell underneath when it pays off.
        match state.agent_cell() {
            Cell::DeliveryAddress(address) if !address.is_satisfied() && agent.capacity > 0 => {
                return Action::Actuate;
            }
            Cell::Hub(hub)
                if hub.can_supply() && !agent.is_full() && agent.capacity < outstanding =>
            {
                return Action::Actuate;
            }
            _ => {}
        }

        // 2. Head for the next target: addresses while loaded, hubs otherwise.
        let targets = if agent.capacity > 0 {
            state.pending_addresses()
        } else {
            state.open_hubs()
        };
        match Self::plan_to_nearest_target(state, agent.position, &targets) {
            Some(path) if path.len() > 1 => {
                Self::move_towards(agent.position, path[1], agent.orientation)
            }
            // 3. Nothing reachable left to do.
            _ => Action::NoOp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DeliveryEnv, EnvConfig};

    #[test]
    fn move_towards_uses_relative_moves() {
        let src = Position::new(2, 2);
        let north = Position::new(1, 2);
        let towards = |dst, facing| CourierPolicy::move_towards(src, dst, facing);
        assert_eq!(towards(north, Orientation::North), Action::MoveForward);
        assert_eq!(towards(north, Orientation::East), Action::MoveLeft);
        assert_eq!(towards(north, Orientation::West), Action::MoveRight);
        assert_eq!(towards(north, Orientation::South), Action::MoveBackward);
        assert_eq!(towards(Position::new(4, 4), Orientation::South), Action::NoOp);
    }

    #[test]
    fn courier_finishes_default_task() {
        let config = EnvConfig::default();
        let mut env = DeliveryEnv::new(&config).unwrap();
        let mut policy = CourierPolicy::new();
        for seed in 0..5 {
            env.reset(Some(seed)).unwrap();
            let mut terminal = false;
            while !env.is_done() {
                let action = policy.act(env.state().unwrap());
                terminal = env.step(action).unwrap().terminal;
            }
            assert!(terminal, "seed {seed} did not finish");
            assert_eq!(env.state().unwrap().agent.finished_deliveries, env.target_count());
        }
    }

    #[test]
    fn random_policy_is_seeded() {
        let state = {
            let mut env = DeliveryEnv::new(&EnvConfig::default()).unwrap();
            env.reset(Some(0)).unwrap();
            env.state().unwrap().clone()
        };
        let mut a = RandomPolicy::new(5);
        let mut b = RandomPolicy::new(5);
        let run_a: Vec<Action> = (0..20).map(|_| a.act(&state)).collect();
        let run_b: Vec<Action> = (0..20).map(|_| b.act(&state)).collect();
        assert_eq!(run_a, run_b);
    }
}
