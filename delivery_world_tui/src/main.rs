use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use delivery_world_core::{
    Action, Cell, DeliveryEnv, EnvConfig, HubState, Orientation, Position, StepResult,
    agent::{CourierPolicy, Policy, RandomPolicy},
};
use ratatui::{
    crossterm::{
        self,
        event::{self, Event, KeyCode, KeyEventKind},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use std::{
    fs::File,
    io::{self, Stdout},
    path::{Path, PathBuf},
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Watch or play the grid delivery task", long_about = None)]
struct Args {
    /// YAML environment config; the built-in task is used when omitted
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Seed of the first episode; later episodes use seed + n
    #[arg(short, long)]
    seed: Option<u64>,

    /// Who chooses the actions
    #[arg(short, long, value_enum, default_value_t = PolicyKind::Courier)]
    policy: PolicyKind,

    /// Number of episodes to run before exiting
    #[arg(short, long, default_value_t = 1)]
    episodes: u32,

    /// Milliseconds between automatic steps
    #[arg(long, default_value_t = 250)]
    tick_ms: u64,

    /// Log at debug level instead of warn
    #[arg(short, long)]
    verbose: bool,

    /// Write logs here; nothing is logged otherwise, since stderr shares the screen
    #[arg(long, value_name = "LOG_FILE")]
    log_file: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum PolicyKind {
    Courier,
    Random,
    Manual,
}

struct App {
    env: DeliveryEnv,
    /// `None` when the user drives the agent.
    policy: Option<Box<dyn Policy>>,
    seed: Option<u64>,
    episodes: u32,
    /// Zero-based index of the running episode.
    episode: u32,
    last: Option<StepResult>,
    episode_return: f64,
    /// Returns of completed episodes.
    returns: Vec<f64>,
    message: String,
    should_quit: bool,
}

impl App {
    fn new(config: &EnvConfig, args: &Args) -> Result<Self> {
        let env = DeliveryEnv::new(config).context("building environment")?;
        let policy: Option<Box<dyn Policy>> = match args.policy {
            PolicyKind::Courier => Some(Box::new(CourierPolicy::new())),
            PolicyKind::Random => Some(Box::new(RandomPolicy::new(args.seed.unwrap_or(0)))),
            PolicyKind::Manual => None,
        };
        let mut app = App {
            env,
            policy,
            seed: args.seed,
            episodes: args.episodes.max(1),
            episode: 0,
            last: None,
            episode_return: 0.0,
            returns: Vec::new(),
            message: String::new(),
            should_quit: false,
        };
        app.start_episode()?;
        Ok(app)
    }

    fn start_episode(&mut self) -> Result<()> {
        let seed = self.seed.map(|s| s + u64::from(self.episode));
        self.env.reset(seed)?;
        self.last = None;
        self.episode_return = 0.0;
        self.message = format!("episode {} started", self.episode + 1);
        Ok(())
    }

    /// Handles one step of the simulation.
    fn tick(&mut self) -> Result<()> {
        if self.env.is_done() {
            self.returns.push(self.episode_return);
            self.episode += 1;
            if self.episode >= self.episodes {
                self.quit();
                return Ok(());
            }
            return self.start_episode();
        }
        let Some(state) = self.env.state() else {
            return Ok(());
        };
        if let Some(policy) = self.policy.as_mut() {
            let action = policy.act(state);
            self.apply(action);
        }
        Ok(())
    }

    fn apply(&mut self, action: Action) {
        match self.env.step(action) {
            Ok(result) => {
                self.episode_return += result.reward;
                self.message = if result.terminal {
                    "all deliveries made".to_string()
                } else if result.truncated {
                    "step limit reached".to_string()
                } else {
                    format!("{action:?}")
                };
                self.last = Some(result);
            }
            Err(err) => {
                tracing::error!(%err, ?action, "step failed");
                self.message = err.to_string();
            }
        }
    }

    fn on_key(&mut self, code: KeyCode) {
        if matches!(code, KeyCode::Char('q') | KeyCode::Esc) {
            self.quit();
            return;
        }
        if self.policy.is_some() || self.env.is_done() {
            return;
        }
        let action = match code {
            KeyCode::Up => Action::MoveForward,
            KeyCode::Down => Action::MoveBackward,
            KeyCode::Left => Action::MoveLeft,
            KeyCode::Right => Action::MoveRight,
            KeyCode::Char('a') => Action::TurnLeft,
            KeyCode::Char('d') => Action::TurnRight,
            KeyCode::Char(' ') => Action::Actuate,
            KeyCode::Char('n') => Action::NoOp,
            _ => return,
        };
        self.apply(action);
    }

    /// Sets the quit flag.
    fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose, args.log_file.as_deref())?;

    let config = match &args.config {
        Some(path) => EnvConfig::from_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EnvConfig::default(),
    };
    let mut app = App::new(&config, &args)?;

    let mut terminal = setup_terminal()?;
    let tick_rate = Duration::from_millis(args.tick_ms);
    let result = run_app(&mut terminal, &mut app, tick_rate);
    restore_terminal(&mut terminal)?;
    result?;

    for (episode, ret) in app.returns.iter().enumerate() {
        println!("episode {}: return {ret:.2}", episode + 1);
    }
    Ok(())
}

fn init_tracing(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false);
    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating log file {}", path.display()))?;
            builder.with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(io::sink).init(),
    }
    Ok(())
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    tick_rate: Duration,
) -> Result<()> {
    let mut last_tick = Instant::now();

    while !app.should_quit {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key.code);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick()?;
            last_tick = Instant::now();
        }
    }
    Ok(())
}

fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),
            Constraint::Length(8),
            Constraint::Length(2),
        ])
        .split(frame.area());

    render_grid(frame, main_layout[0], app);
    render_status(frame, main_layout[1], app);

    let help = if app.policy.is_some() {
        "q/Esc: quit"
    } else {
        "arrows: move  a/d: turn  space: actuate  n: wait  q/Esc: quit"
    };
    let help_text = Paragraph::new(help)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[2]);
}

fn agent_arrow(orientation: Orientation) -> &'static str {
    match orientation {
        Orientation::North => "^",
        Orientation::East => ">",
        Orientation::South => "v",
        Orientation::West => "<",
    }
}

/// Two columns per cell: a glyph and, for hubs and addresses, the counter.
fn cell_span(cell: &Cell) -> Span<'static> {
    let digit = |n: u32| if n > 9 { "+".to_string() } else { n.to_string() };
    match cell {
        Cell::Floor => Span::raw("  "),
        Cell::Wall => Span::styled("##", Style::default().fg(Color::DarkGray)),
        Cell::Hub(hub) => {
            let color = match hub.state {
                HubState::Open => Color::Cyan,
                HubState::Empty => Color::DarkGray,
            };
            Span::styled(format!("H{}", digit(hub.stock)), Style::default().fg(color))
        }
        Cell::DeliveryAddress(address) => {
            let color = if address.is_satisfied() {
                Color::Green
            } else {
                Color::Yellow
            };
            Span::styled(format!("D{}", digit(address.required)), Style::default().fg(color))
        }
    }
}

fn render_grid(frame: &mut Frame, area: Rect, app: &App) {
    let Some(state) = app.env.state() else {
        return;
    };
    let grid = &state.grid;
    let agent = &state.agent;

    let lines: Vec<Line> = (0..grid.height())
        .map(|row| {
            let spans: Vec<Span> = (0..grid.width())
                .map(|col| {
                    let position = Position::new(row, col);
                    if position == agent.position {
                        Span::styled(
                            format!("{}{}", agent_arrow(agent.orientation), agent.capacity),
                            Style::default().fg(Color::Red).bold(),
                        )
                    } else {
                        cell_span(&grid[position])
                    }
                })
                .collect();
            Line::from(spans)
        })
        .collect();

    let title = format!("Delivery World - episode {}/{}", app.episode + 1, app.episodes);
    let grid_paragraph = Paragraph::new(lines)
        .block(Block::default().title(title).borders(Borders::ALL))
        .alignment(Alignment::Center);
    frame.render_widget(grid_paragraph, area);
}

fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let Some(state) = app.env.state() else {
        return;
    };
    let agent = &state.agent;
    let (reward, terminal, truncated) = app
        .last
        .as_ref()
        .map_or((0.0, false, false), |r| (r.reward, r.terminal, r.truncated));
    let cell = match state.agent_cell() {
        Cell::Floor => "floor".to_string(),
        Cell::Wall => "wall".to_string(),
        Cell::Hub(hub) => format!("hub, stock {} ({:?})", hub.stock, hub.state),
        Cell::DeliveryAddress(address) => format!("address, {} still required", address.required),
    };

    let items = vec![
        ListItem::new(format!(
            "Position {} facing {:?} on {cell}",
            agent.position, agent.orientation
        )),
        ListItem::new(format!("Carrying {}/{}", agent.capacity, agent.max_capacity)),
        ListItem::new(format!(
            "Delivered {}/{}  pending demand {}",
            agent.finished_deliveries,
            app.env.target_count(),
            state.total_demand()
        )),
        ListItem::new(format!(
            "Step {}  reward {reward:.2}  return {:.2}",
            app.env.steps(),
            app.episode_return
        )),
        ListItem::new(format!("Terminal {terminal}  truncated {truncated}")),
        ListItem::new(Line::from(Span::styled(
            app.message.clone(),
            Style::default().fg(Color::Magenta),
        ))),
    ];

    let status = List::new(items).block(Block::default().borders(Borders::ALL).title("Status"));
    frame.render_widget(status, area);
}
