use serde::{Deserialize, Serialize};

use crate::{
    Orientation,
    cell::{Cell, HubState},
    state::WorldState,
};

/// Converts a world state into whatever a learner consumes.
pub trait Representation {
    type Output;

    fn convert(&self, state: &WorldState) -> Self::Output;
}

/// Agent fields exposed in an observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentObservation {
    pub row: usize,
    pub col: usize,
    pub orientation: u8,
    pub capacity: u32,
    pub max_capacity: u32,
    pub finished_deliveries: u32,
}

/// Fully observable, flat encoding of the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub shape: (usize, usize),
    /// [`Cell::type_code`] per cell, row-major.
    pub cells: Vec<u8>,
    /// Hub stock or address demand per cell, row-major.
    pub counters: Vec<u32>,
    /// 1 where a hub is still open.
    pub open: Vec<u8>,
    pub agent: AgentObservation,
}

impl Observation {
    /// Flattens into one numeric vector for a network input layer.
    pub fn to_features(&self) -> Vec<f32> {
        let agent = &self.agent;
        self.cells
            .iter()
            .map(|&c| f32::from(c))
            .chain(self.counters.iter().map(|&c| c as f32))
            .chain(self.open.iter().map(|&o| f32::from(o)))
            .chain([
                agent.row as f32,
                agent.col as f32,
                f32::from(agent.orientation),
                agent.capacity as f32,
                agent.max_capacity as f32,
                agent.finished_deliveries as f32,
            ])
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CompactRepresentation;

impl Representation for CompactRepresentation {
    type Output = Observation;

    fn convert(&self, state: &WorldState) -> Observation {
        let grid = &state.grid;
        let agent = &state.agent;
        Observation {
            shape: (grid.height(), grid.width()),
            cells: grid.iter().map(Cell::type_code).collect(),
            counters: grid.iter().map(Cell::counter).collect(),
            open: grid
                .iter()
                .map(|cell| u8::from(matches!(cell, Cell::Hub(hub) if hub.state == HubState::Open)))
                .collect(),
            agent: AgentObservation {
                row: agent.position.row,
                col: agent.position.col,
                orientation: orientation_code(agent.orientation),
                capacity: agent.capacity,
                max_capacity: agent.max_capacity,
                finished_deliveries: agent.finished_deliveries,
            },
        }
    }
}

fn orientation_code(orientation: Orientation) -> u8 {
    match orientation {
        Orientation::North => 0,
        Orientation::East => 1,
        Orientation::South => 2,
        Orientation::West => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Position, map::Grid, state::AgentState};

    #[test]
    fn compact_encoding() {
        let mut grid = Grid::filled(3, 4, Cell::Wall);
        grid[Position::new(1, 1)] = Cell::hub(2);
        grid[Position::new(1, 2)] = Cell::address(3);
        let mut agent = AgentState::new(Position::new(1, 1), Orientation::South, 2);
        agent.capacity = 1;
        let state = WorldState::new(grid, agent);

        let obs = CompactRepresentation.convert(&state);
        assert_eq!(obs.shape, (3, 4));
        assert_eq!(obs.cells[5], 2);
        assert_eq!(obs.cells[6], 3);
        assert_eq!(obs.counters[5], 2);
        assert_eq!(obs.counters[6], 3);
        assert_eq!(obs.open.iter().filter(|&&o| o == 1).count(), 1);
        assert_eq!(obs.agent.orientation, 2);
        assert_eq!(obs.to_features().len(), 12 * 3 + 6);
    }
}
