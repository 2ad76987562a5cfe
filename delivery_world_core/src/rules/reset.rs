use rand::seq::IndexedRandom;

use crate::{
    EnvRng, Orientation, Position,
    cell::Cell,
    config::{RuleParams, TaskConfig},
    error::{ConfigError, RegistryError},
    layout::parse_layout,
    map::Grid,
    registry::RuleRegistry,
    state::{AgentState, WorldState},
};

use super::ResetFactory;

/// Builds the initial state of an episode.
///
/// The grid is fixed when the rule is built; each reset clones it and places
/// the agent uniformly at random on a cell accepted by the spawn predicate.
pub struct ResetRule {
    template: WorldTemplate,
    spawn: fn(&Cell) -> bool,
}

/// The static part of a reset: grid plus agent capacity.
#[derive(Debug, Clone)]
pub struct WorldTemplate {
    pub grid: Grid<Cell>,
    pub max_capacity: u32,
}

impl WorldTemplate {
    pub fn total_demand(&self) -> u32 {
        self.grid.iter().map(Cell::counter_if_address).sum()
    }
}

impl ResetRule {
    /// Fails if no cell of `grid` satisfies `spawn`.
    pub fn new(
        grid: Grid<Cell>,
        max_capacity: u32,
        spawn: fn(&Cell) -> bool,
    ) -> Result<Self, ConfigError> {
        if !grid.iter().any(spawn) {
            return Err(ConfigError::NoPlacementCell);
        }
        Ok(ResetRule {
            template: WorldTemplate { grid, max_capacity },
            spawn,
        })
    }

    pub fn template(&self) -> &WorldTemplate {
        &self.template
    }

    /// Produces a fresh state with a randomly placed and oriented agent.
    pub fn build(&self, rng: &mut EnvRng) -> Result<WorldState, ConfigError> {
        let grid = self.template.grid.clone();
        let candidates = grid.find_positions(self.spawn);
        let position = *candidates.choose(rng).ok_or(ConfigError::NoPlacementCell)?;
        let orientation = *Orientation::ALL
            .choose(rng)
            .ok_or(ConfigError::NoPlacementCell)?;
        let agent = AgentState::new(position, orientation, self.template.max_capacity);
        tracing::info!(%position, ?orientation, candidates = candidates.len(), "agent spawned");
        Ok(WorldState::new(grid, agent))
    }
}

fn is_floor(cell: &Cell) -> bool {
    *cell == Cell::Floor
}

/// Grid taken from `task.layout`.
fn from_layout(task: &TaskConfig, _params: &RuleParams) -> Result<ResetRule, ConfigError> {
    let layout = task.layout.as_deref().ok_or(ConfigError::EmptyLayout)?;
    let grid = parse_layout(layout, task)?;
    ResetRule::new(grid, task.max_capacity, is_floor)
}

/// A fixed 7x9 maze: walled border, a walled room around the hub with
/// openings north and south, and an address in every corner.
fn delivery_maze(task: &TaskConfig, _params: &RuleParams) -> Result<ResetRule, ConfigError> {
    const HEIGHT: usize = 7;
    const WIDTH: usize = 9;
    const HUB: Position = Position::new(3, 4);
    const ADDRESSES: [Position; 4] = [
        Position::new(1, 1),
        Position::new(1, 7),
        Position::new(5, 1),
        Position::new(5, 7),
    ];

    let mut grid = Grid::from_generator(HEIGHT, WIDTH, |p| {
        let border = p.row == 0 || p.col == 0 || p.row == HEIGHT - 1 || p.col == WIDTH - 1;
        let room_wall = (2..=4).contains(&p.row)
            && (2..=6).contains(&p.col)
            && (p.row != 3 || p.col == 2 || p.col == 6)
            && p.col != 4;
        if border || room_wall {
            Cell::Wall
        } else {
            Cell::Floor
        }
    });
    grid.set(HUB, Cell::hub(task.hub_stock))?;
    for (position, required) in ADDRESSES.into_iter().zip(task.demands(ADDRESSES.len())?) {
        grid.set(position, Cell::address(required))?;
    }
    ResetRule::new(grid, task.max_capacity, is_floor)
}

pub(crate) fn register_builtin(registry: &mut RuleRegistry<ResetFactory>) -> Result<(), RegistryError> {
    registry.register("from_layout", from_layout)?;
    registry.register("delivery_maze", delivery_maze)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::layout::render_layout;

    fn task() -> TaskConfig {
        TaskConfig {
            layout: Some("WL WL WL WL\nWL FL HB WL\nWL DA FL WL\nWL WL WL WL".to_string()),
            max_capacity: 2,
            hub_stock: 3,
            address_required: vec![2],
            target_count: None,
        }
    }

    #[test]
    fn agent_spawns_on_floor() {
        let rule = from_layout(&task(), &RuleParams::new()).unwrap();
        let mut rng = EnvRng::seed_from_u64(7);
        for _ in 0..20 {
            let state = rule.build(&mut rng).unwrap();
            assert_eq!(*state.agent_cell(), Cell::Floor);
            assert_eq!(state.agent.capacity, 0);
            assert_eq!(state.agent.max_capacity, 2);
            state.check_invariants("reset").unwrap();
        }
    }

    #[test]
    fn same_seed_same_state() {
        let rule = from_layout(&task(), &RuleParams::new()).unwrap();
        let a = rule.build(&mut EnvRng::seed_from_u64(11)).unwrap();
        let b = rule.build(&mut EnvRng::seed_from_u64(11)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn layout_without_floor_cannot_place_agent() {
        let mut task = task();
        task.layout = Some("WL WL WL\nWL HB WL\nWL WL WL".to_string());
        assert!(matches!(
            from_layout(&task, &RuleParams::new()),
            Err(ConfigError::NoPlacementCell)
        ));
    }

    #[test]
    fn missing_layout_is_rejected() {
        let mut task = task();
        task.layout = None;
        assert!(matches!(
            from_layout(&task, &RuleParams::new()),
            Err(ConfigError::EmptyLayout)
        ));
    }

    #[test]
    fn maze_shape() {
        let mut task = task();
        task.address_required = vec![1, 2, 3, 4];
        let rule = delivery_maze(&task, &RuleParams::new()).unwrap();
        let expected = "\
WL WL WL WL WL WL WL WL WL
WL DA FL FL FL FL FL DA WL
WL FL WL WL FL WL WL FL WL
WL FL WL FL HB FL WL FL WL
WL FL WL WL FL WL WL FL WL
WL DA FL FL FL FL FL DA WL
WL WL WL WL WL WL WL WL WL
";
        assert_eq!(render_layout(&rule.template().grid), expected);
        assert_eq!(rule.template().total_demand(), 10);
    }
}
