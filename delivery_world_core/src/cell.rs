use serde::{Deserialize, Serialize};

/// Lifecycle of a hub. `Empty` is terminal for that cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HubState {
    Open,
    Empty,
}

/// A depletable supply cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hub {
    pub stock: u32,
    pub state: HubState,
    /// Set once the emptied bonus has been reported for this hub.
    pub bonus_granted: bool,
}

impl Hub {
    /// A hub with the given stock. A hub built with no stock starts `Empty`
    /// and never reports an emptied bonus.
    pub fn new(stock: u32) -> Self {
        if stock == 0 {
            Hub {
                stock,
                state: HubState::Empty,
                bonus_granted: true,
            }
        } else {
            Hub {
                stock,
                state: HubState::Open,
                bonus_granted: false,
            }
        }
    }

    /// True when a reload could take an item from this hub.
    pub fn can_supply(&self) -> bool {
        self.state == HubState::Open && self.stock > 0
    }
}

/// A demand cell that is satisfied once `required` reaches zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub required: u32,
}

impl DeliveryAddress {
    pub fn is_satisfied(&self) -> bool {
        self.required == 0
    }
}

/// Represents the type of a cell in the world grid.
///
/// Counters live on each variant instance, so two hubs in the same grid never
/// share stock.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Floor,
    Wall,
    Hub(Hub),
    DeliveryAddress(DeliveryAddress),
}

impl Cell {
    pub fn hub(stock: u32) -> Self {
        Cell::Hub(Hub::new(stock))
    }

    pub fn address(required: u32) -> Self {
        Cell::DeliveryAddress(DeliveryAddress { required })
    }

    /// The agent cannot enter this cell.
    pub fn blocks_movement(&self) -> bool {
        matches!(self, Cell::Wall)
    }

    /// Line of sight stops at this cell.
    pub fn blocks_vision(&self) -> bool {
        matches!(self, Cell::Wall)
    }

    /// Cells that react to ACTUATE.
    pub fn is_interactive(&self) -> bool {
        matches!(self, Cell::Hub(_) | Cell::DeliveryAddress(_))
    }

    /// Stable numeric code used by observation representations.
    pub fn type_code(&self) -> u8 {
        match self {
            Cell::Floor => 0,
            Cell::Wall => 1,
            Cell::Hub(_) => 2,
            Cell::DeliveryAddress(_) => 3,
        }
    }

    /// Outstanding demand if this is a delivery address, zero otherwise.
    pub fn counter_if_address(&self) -> u32 {
        match self {
            Cell::DeliveryAddress(address) => address.required,
            _ => 0,
        }
    }

    /// Per-cell counter: hub stock, address demand, zero otherwise.
    pub fn counter(&self) -> u32 {
        match self {
            Cell::Hub(hub) => hub.stock,
            Cell::DeliveryAddress(address) => address.required,
            Cell::Floor | Cell::Wall => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hub_without_stock_starts_empty() {
        let hub = Hub::new(0);
        assert_eq!(hub.state, HubState::Empty);
        assert!(hub.bonus_granted);
        assert!(!hub.can_supply());

        let hub = Hub::new(3);
        assert_eq!(hub.state, HubState::Open);
        assert!(hub.can_supply());
    }

    #[test]
    fn only_walls_block() {
        assert!(Cell::Wall.blocks_movement());
        assert!(Cell::Wall.blocks_vision());
        for cell in [Cell::Floor, Cell::hub(1), Cell::address(1)] {
            assert!(!cell.blocks_movement());
            assert!(!cell.blocks_vision());
        }
    }

    #[test]
    fn hubs_do_not_share_stock() {
        let mut a = Cell::hub(2);
        let b = Cell::hub(2);
        if let Cell::Hub(hub) = &mut a {
            hub.stock -= 1;
        }
        assert_eq!(a.counter(), 1);
        assert_eq!(b.counter(), 2);
    }
}
