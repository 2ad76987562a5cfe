use serde::{Deserialize, Serialize};

use crate::{
    Orientation, Position,
    cell::{Cell, HubState},
    error::InvariantViolation,
    map::Grid,
};

/// The single mobile agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentState {
    pub position: Position,
    pub orientation: Orientation,
    /// Items currently carried.
    pub capacity: u32,
    pub max_capacity: u32,
    pub finished_deliveries: u32,
}

impl AgentState {
    pub fn new(position: Position, orientation: Orientation, max_capacity: u32) -> Self {
        AgentState {
            position,
            orientation,
            capacity: 0,
            max_capacity,
            finished_deliveries: 0,
        }
    }

    pub fn is_full(&self) -> bool {
        self.capacity >= self.max_capacity
    }
}

/// Grid of cells plus exactly one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldState {
    pub grid: Grid<Cell>,
    pub agent: AgentState,
}

impl WorldState {
    pub fn new(grid: Grid<Cell>, agent: AgentState) -> Self {
        WorldState { grid, agent }
    }

    /// The cell under the agent.
    pub fn agent_cell(&self) -> &Cell {
        &self.grid[self.agent.position]
    }

    /// Splits the borrow so a rule can mutate the agent and its cell together.
    pub fn agent_and_cell_mut(&mut self) -> (&mut AgentState, &mut Cell) {
        let cell = &mut self.grid[self.agent.position];
        (&mut self.agent, cell)
    }

    /// Sum of outstanding demand over every delivery address.
    pub fn total_demand(&self) -> u32 {
        self.grid.iter().map(Cell::counter_if_address).sum()
    }

    pub fn pending_addresses(&self) -> Vec<Position> {
        self.grid
            .find_positions(|cell| matches!(cell, Cell::DeliveryAddress(a) if !a.is_satisfied()))
    }

    pub fn open_hubs(&self) -> Vec<Position> {
        self.grid
            .find_positions(|cell| matches!(cell, Cell::Hub(hub) if hub.can_supply()))
    }

    /// Validates every structural and resource invariant. `rule` names the
    /// last writer so the violation can be traced back to it.
    pub fn check_invariants(&self, rule: &str) -> Result<(), InvariantViolation> {
        let agent = &self.agent;
        if agent.capacity > agent.max_capacity {
            return Err(InvariantViolation::new(
                rule,
                format!(
                    "capacity {} exceeds max_capacity {}",
                    agent.capacity, agent.max_capacity
                ),
            ));
        }
        match self.grid.get(agent.position) {
            None => {
                return Err(InvariantViolation::new(
                    rule,
                    format!("agent position {} is outside the grid", agent.position),
                ));
            }
            Some(cell) if cell.blocks_movement() => {
                return Err(InvariantViolation::new(
                    rule,
                    format!("agent stands inside a wall at {}", agent.position),
                ));
            }
            Some(_) => {}
        }
        for (position, cell) in self.grid.enumerate() {
            if self.grid.is_border(position) && *cell != Cell::Wall {
                return Err(InvariantViolation::new(
                    rule,
                    format!("border cell at {position} is not a wall"),
                ));
            }
            if let Cell::Hub(hub) = cell {
                match (hub.state, hub.stock) {
                    (HubState::Open, 0) => {
                        return Err(InvariantViolation::new(
                            rule,
                            format!("hub at {position} is open with no stock"),
                        ));
                    }
                    (HubState::Empty, stock) if stock > 0 => {
                        return Err(InvariantViolation::new(
                            rule,
                            format!("hub at {position} is empty but holds {stock} items"),
                        ));
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }
}
