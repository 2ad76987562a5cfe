use crate::{Position, cell::Cell, config::TaskConfig, error::ConfigError, map::Grid};

/// Builds a grid from a whitespace-separated layout string.
///
/// Tokens: `WL` wall, `FL` floor, `HB` hub, `DA` delivery address. Hubs get
/// `task.hub_stock`; addresses take their demand from `task.address_required`
/// in row-major order. Every border cell must be a wall.
pub fn parse_layout(layout: &str, task: &TaskConfig) -> Result<Grid<Cell>, ConfigError> {
    let lines: Vec<&str> = layout
        .trim()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        return Err(ConfigError::EmptyLayout);
    }

    let mut width = 0;
    let mut rows: Vec<Vec<&str>> = Vec::with_capacity(lines.len());
    for (row, line) in lines.iter().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if row == 0 {
            width = tokens.len();
        } else if tokens.len() != width {
            return Err(ConfigError::RaggedLayout {
                row,
                expected: width,
                found: tokens.len(),
            });
        }
        rows.push(tokens);
    }

    let address_count = rows
        .iter()
        .flatten()
        .filter(|token| **token == "DA")
        .count();
    let mut demands = task.demands(address_count)?.into_iter();

    let mut grid = Grid::filled(rows.len(), width, Cell::Wall);
    for (row, tokens) in rows.iter().enumerate() {
        for (col, token) in tokens.iter().enumerate() {
            let position = Position { row, col };
            let cell = match *token {
                "WL" => Cell::Wall,
                "FL" => Cell::Floor,
                "HB" => Cell::hub(task.hub_stock),
                // Counted above, so the iterator cannot run dry here.
                "DA" => Cell::address(demands.next().unwrap_or_default()),
                unknown => {
                    return Err(ConfigError::UnknownToken {
                        token: unknown.to_string(),
                        position,
                    });
                }
            };
            if grid.is_border(position) && cell != Cell::Wall {
                return Err(ConfigError::OpenBorder { position });
            }
            grid.set(position, cell)?;
        }
    }
    Ok(grid)
}

/// Renders a grid back into layout tokens.
pub fn render_layout(grid: &Grid<Cell>) -> String {
    let mut out = String::new();
    for row in 0..grid.height() {
        let tokens: Vec<&str> = (0..grid.width())
            .map(|col| match grid[Position { row, col }] {
                Cell::Wall => "WL",
                Cell::Floor => "FL",
                Cell::Hub(_) => "HB",
                Cell::DeliveryAddress(_) => "DA",
            })
            .collect();
        out.push_str(&tokens.join(" "));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_LAYOUT;

    fn task(required: Vec<u32>) -> TaskConfig {
        TaskConfig {
            layout: None,
            max_capacity: 2,
            hub_stock: 3,
            address_required: required,
            target_count: None,
        }
    }

    #[test]
    fn parses_default_layout() {
        let grid = parse_layout(DEFAULT_LAYOUT, &task(vec![1, 2, 3])).unwrap();
        assert_eq!((grid.height(), grid.width()), (7, 9));
        assert_eq!(grid[Position::new(3, 4)], Cell::hub(3));
        assert_eq!(grid[Position::new(1, 7)], Cell::address(1));
        assert_eq!(grid[Position::new(5, 1)], Cell::address(2));
        assert_eq!(grid[Position::new(5, 7)], Cell::address(3));
        assert_eq!(render_layout(&grid).trim(), DEFAULT_LAYOUT.trim());
    }

    #[test]
    fn empty_layout_is_rejected() {
        assert!(matches!(
            parse_layout("  \n ", &task(vec![1])),
            Err(ConfigError::EmptyLayout)
        ));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let layout = "WL WL WL\nWL FL\nWL WL WL";
        assert!(matches!(
            parse_layout(layout, &task(vec![1])),
            Err(ConfigError::RaggedLayout {
                row: 1,
                expected: 3,
                found: 2
            })
        ));
    }

    #[test]
    fn open_border_reports_position() {
        let layout = "WL WL WL\nFL FL WL\nWL WL WL";
        match parse_layout(layout, &task(vec![1])) {
            Err(ConfigError::OpenBorder { position }) => {
                assert_eq!(position, Position::new(1, 0))
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn unknown_token_is_rejected() {
        let layout = "WL WL WL\nWL XX WL\nWL WL WL";
        assert!(matches!(
            parse_layout(layout, &task(vec![1])),
            Err(ConfigError::UnknownToken { .. })
        ));
    }
}
