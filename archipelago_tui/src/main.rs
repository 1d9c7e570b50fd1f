use archipelago_core::{
    Position,
    agent::Explorer,
    crossing::CrossingStage,
    environment::{ActionResult, Environment, Tile, load_environment_from_string},
    generator::{GeneratorConfig, generate_archipelago},
    session::run_session,
    world::Cell,
};
use anyhow::{Context, Result};
use clap::Parser;
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use std::{
    fs::File,
    io::{self, Stdout},
    path::PathBuf,
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Map file to load
    #[arg(short, long, value_name = "MAP_FILE", conflicts_with = "seed")]
    map: Option<PathBuf>,

    /// Play a generated archipelago instead of a map file
    #[arg(short, long)]
    seed: Option<u64>,

    /// Milliseconds between simulation steps
    #[arg(long, default_value_t = 250)]
    tick_ms: u64,

    /// End the game as a loss after this many actions
    #[arg(long)]
    max_turns: Option<u64>,

    /// Run the game to completion without drawing anything
    #[arg(long)]
    headless: bool,

    /// Where log output goes while the terminal UI is up
    #[arg(long, value_name = "LOG_FILE", default_value = "archipelago.log")]
    log_file: PathBuf,
}

struct App {
    /// The true game world.
    environment: Environment,
    /// The agent playing it.
    explorer: Explorer,
    /// Flag to control the main loop.
    should_quit: bool,
    /// Flag to control if the game is over.
    game_over: bool,
    last_result: Option<ActionResult>,
}

impl App {
    fn new(environment: Environment) -> Self {
        App {
            environment,
            explorer: Explorer::new(),
            should_quit: false,
            game_over: false,
            last_result: None,
        }
    }

    /// Handles one step of the simulation.
    fn tick(&mut self) -> Result<()> {
        if self.game_over {
            return Ok(());
        }
        let result = self.environment.step(&mut self.explorer)?;
        self.game_over = self.environment.is_over();
        self.last_result = Some(result);
        Ok(())
    }

    /// Sets the quit flag.
    fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut environment = load_environment(&args)?;
    if let Some(max_turns) = args.max_turns {
        environment = environment.with_max_turns(max_turns);
    }

    if args.headless {
        tracing_subscriber::fmt()
            .with_env_filter(default_filter())
            .with_writer(io::stderr)
            .init();
        return run_headless(environment);
    }

    let log_file = File::create(&args.log_file)
        .with_context(|| format!("creating log file {}", args.log_file.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(default_filter())
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();

    // Set up the terminal
    let mut terminal = setup_terminal()?;

    let mut app = App::new(environment);
    let outcome = run_app(&mut terminal, &mut app, Duration::from_millis(args.tick_ms));

    // Restore the terminal even when the loop failed
    restore_terminal(&mut terminal)?;
    outcome
}

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Reads the map named on the command line, or generates one from the seed.
fn load_environment(args: &Args) -> Result<Environment> {
    if let Some(seed) = args.seed {
        let config = GeneratorConfig {
            seed,
            ..GeneratorConfig::default()
        };
        return load_environment_from_string(&generate_archipelago(&config))
            .context("loading generated map");
    }

    // If no map file is provided, use the default map
    let map_file = args
        .map
        .clone()
        .unwrap_or_else(|| PathBuf::from("maps/map01.txt"));
    if !map_file.exists() {
        return Err(anyhow::anyhow!(
            "Map file does not exist: {}",
            map_file.display()
        ));
    }
    let map_string = std::fs::read_to_string(&map_file)
        .with_context(|| format!("reading map file {}", map_file.display()))?;
    load_environment_from_string(&map_string)
        .with_context(|| format!("loading map file {}", map_file.display()))
}

/// Plays the whole game at full speed and reports how it ended.
fn run_headless(mut environment: Environment) -> Result<()> {
    let mut explorer = Explorer::new();
    let turns = run_session(&mut explorer, &mut environment)?;
    match environment.outcome() {
        Some(ActionResult::Win) => println!("won in {turns} turns"),
        Some(ActionResult::Drowned) => println!("drowned after {turns} turns"),
        _ => println!("out of turns after {turns} turns"),
    }
    Ok(())
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the main loop of the TUI application.
fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    tick_rate: Duration,
) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                    _ => {}
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick()?;
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(70), // Maps
            Constraint::Percentage(20), // Inventory and plan
            Constraint::Percentage(10), // Status/help
        ])
        .split(frame.area());

    let maps = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(main_layout[0]);

    render_map(frame, maps[0], &app.environment);
    render_belief(frame, maps[1], &app.explorer);
    render_inventory(frame, main_layout[1], app);

    let status = match app.environment.outcome() {
        Some(ActionResult::Win) => "Gold brought home!",
        Some(ActionResult::Drowned) => "Drowned.",
        _ if app.game_over => "Out of turns.",
        _ => "Exploring...",
    };
    let help_text = Paragraph::new(format!("{status}  Press 'q' or 'Esc' to quit."))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[2]);
}

/// Shows what the game holds and what the explorer intends.
fn render_inventory(frame: &mut Frame, area: Rect, app: &App) {
    let inventory = app.environment.inventory();
    let flag = |held: bool, label: &'static str, color: Color| {
        if held {
            Span::styled(label, Style::default().fg(color).bold())
        } else {
            Span::styled(label, Style::default().fg(Color::DarkGray))
        }
    };

    let mut items = vec![
        ListItem::from(Line::from(vec![
            flag(inventory.gold, "gold ", Color::Yellow),
            flag(inventory.axe, "axe ", Color::Cyan),
            flag(inventory.key, "key ", Color::Magenta),
            flag(inventory.raft, "raft ", Color::Green),
            Span::raw(format!("stones: {}", inventory.stones)),
        ])),
        ListItem::from(Line::from(format!(
            "Pos: ({}, {}) Turns: {}",
            app.environment.position().x,
            app.environment.position().y,
            app.environment.turns()
        ))),
    ];

    let plan = app.explorer.plan();
    let plan_text = match (plan.stage(), plan.route()) {
        (CrossingStage::Idle, _) | (_, None) => "Plan: idle".to_string(),
        (stage, Some(route)) => format!(
            "Plan: {:?} island {} via ({}, {}) stones {} raft {}",
            stage,
            route.target,
            route.home_port.x,
            route.home_port.y,
            route.stones_required,
            route.raft_required
        ),
    };
    items.push(ListItem::from(Line::from(plan_text)));

    if let Some(ActionResult::Failure(reason)) = &app.last_result {
        items.push(ListItem::from(Line::styled(
            format!("Last action failed: {reason}"),
            Style::default().fg(Color::Red),
        )));
    }

    let inventory_widget =
        List::new(items).block(Block::default().borders(Borders::ALL).title("Inventory"));
    frame.render_widget(inventory_widget, area);
}

/// Renders the true map onto the frame.
fn render_map(frame: &mut Frame, area: Rect, environment: &Environment) {
    let terrain = environment.terrain();
    let mut lines: Vec<Line> = Vec::with_capacity(terrain.height());

    for y in 0..terrain.height() as i32 {
        let spans: Vec<Span> = (0..terrain.width() as i32)
            .map(|x| {
                let position = Position::new(x, y);
                let glyph = environment.glyph_at(position).to_string();
                if position == environment.position() {
                    return Span::styled(glyph, Style::default().fg(Color::Red).bold());
                }
                let style = match terrain.get(position) {
                    Some(Tile::Water) => Style::default().fg(Color::Blue),
                    Some(Tile::SteppingStone) | Some(Tile::Stone) => {
                        Style::default().fg(Color::Gray)
                    }
                    Some(Tile::Tree) => Style::default().fg(Color::Green),
                    Some(Tile::Gold) => Style::default().fg(Color::Yellow).bold(),
                    Some(Tile::Wall) => Style::default().fg(Color::DarkGray),
                    _ => Style::default(),
                };
                Span::styled(glyph, style)
            })
            .collect();
        lines.push(Line::from(spans));
    }

    let map_paragraph = Paragraph::new(lines)
        .block(Block::default().title("Archipelago").borders(Borders::ALL))
        .alignment(Alignment::Center);

    frame.render_widget(map_paragraph, area);
}

/// Renders what the explorer believes, in its own frame of reference.
fn render_belief(frame: &mut Frame, area: Rect, explorer: &Explorer) {
    let world = explorer.world();
    let grid = world.grid();
    let agent = explorer.state();
    let origin = grid.origin();
    let mut lines: Vec<Line> = Vec::with_capacity(grid.height());

    for row in 0..grid.height() as i32 {
        let spans: Vec<Span> = (0..grid.width() as i32)
            .map(|column| {
                let position = Position::new(origin.x + column, origin.y + row);
                if position == agent.position {
                    return Span::styled(
                        agent.heading.glyph().to_string(),
                        Style::default().fg(Color::Red).bold(),
                    );
                }
                let cell = world.cell(position);
                let mut style = match cell {
                    Cell::Unknown => Style::default().fg(Color::DarkGray),
                    Cell::Water => Style::default().fg(Color::Blue),
                    Cell::Gold => Style::default().fg(Color::Yellow).bold(),
                    Cell::Tree => Style::default().fg(Color::Green),
                    _ => Style::default(),
                };
                if world.is_visited(position) {
                    style = style.add_modifier(Modifier::DIM);
                }
                Span::styled(cell.glyph().to_string(), style)
            })
            .collect();
        lines.push(Line::from(spans));
    }

    let belief_paragraph = Paragraph::new(lines)
        .block(Block::default().title("Explorer's map").borders(Borders::ALL))
        .alignment(Alignment::Center);

    frame.render_widget(belief_paragraph, area);
}
