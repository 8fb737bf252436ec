use clap::Parser;
use merge_puzzle::board::{Board, BoardEvent};
use merge_puzzle::config::{GameConfig, TileStyle};
use merge_puzzle::grid::Direction;
use merge_puzzle::session::{GameSession, Input, Presenter};
use merge_puzzle::store::{JsonFileScoreStore, MemoryScoreStore, ScoreStore};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// JSON file with game options
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Grid width, overrides the config file
    #[clap(long)]
    width: Option<usize>,

    /// Grid height, overrides the config file
    #[clap(long)]
    height: Option<usize>,

    /// Number of moves that can be undone
    #[clap(short, long)]
    undo: Option<usize>,

    /// Seed for tile spawns, random when omitted
    #[clap(short, long)]
    seed: Option<u64>,

    /// JSON file the best score is kept in
    #[clap(long)]
    scores: Option<PathBuf>,
}

/// Announces lifecycle changes on the terminal.
#[derive(Debug, Default)]
struct TerminalPresenter {
    merges: usize,
}

impl Presenter for TerminalPresenter {
    fn new_game(&mut self) {
        self.merges = 0;
        println!("New game!");
    }

    fn game_over(&mut self) {
        println!("---------------------");
        println!("🎉 GAME OVER! 🎉 Merges made: {}", self.merges);
        println!("Press 'n' for a new game or 'q' to quit.");
        println!("---------------------");
    }

    fn board_event(&mut self, event: &BoardEvent) {
        if let BoardEvent::Merged { .. } = event {
            self.merges += 1;
        }
    }
}

fn load_config(args: &Args) -> merge_puzzle::Result<GameConfig> {
    let mut config = match &args.config {
        Some(path) => GameConfig::from_json_file(path)?,
        None => GameConfig::default(),
    };
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    if let Some(undo) = args.undo {
        config.undo_capacity = undo;
    }
    config.validate()
}

fn open_store(path: Option<&PathBuf>) -> Box<dyn ScoreStore> {
    match path {
        Some(path) => match JsonFileScoreStore::open(path) {
            Ok(store) => Box::new(store),
            Err(err) => {
                log::warn!("Cannot use score file {}: {}", path.display(), err);
                Box::new(MemoryScoreStore::new())
            }
        },
        None => Box::new(MemoryScoreStore::new()),
    }
}

fn paint(style: &TileStyle, content: &str) -> String {
    match (style.background_rgb(), style.text_rgb()) {
        (Some((br, bg, bb)), Some((fr, fg, fb))) => format!(
            "\x1b[48;2;{};{};{}m\x1b[38;2;{};{};{}m{}\x1b[m",
            br, bg, bb, fr, fg, fb, content
        ),
        _ => content.to_string(),
    }
}

fn render(board: &Board, config: &GameConfig) -> String {
    let mut output = String::new();
    for y in 0..board.height() {
        for x in 0..board.width() {
            let cell = match board.tile_at((x, y)) {
                Some(tile) if tile.is_obstacle() => {
                    paint(&config.obstacle_style, &format!("{:^6}", "##"))
                }
                Some(tile) => paint(
                    config.tier_style(tile.tier()),
                    &format!("{:^6}", tile.value().to_string()),
                ),
                None => format!("{:^6}", "."),
            };
            output.push_str(&cell);
        }
        if y + 1 < board.height() {
            output.push('\n');
        }
    }
    output
}

fn parse_input(line: &str) -> Option<Input> {
    match line {
        "w" | "up" => Some(Input::Move(Direction::Up)),
        "s" | "down" => Some(Input::Move(Direction::Down)),
        "a" | "left" => Some(Input::Move(Direction::Left)),
        "d" | "right" => Some(Input::Move(Direction::Right)),
        "u" | "undo" => Some(Input::Undo),
        "r" | "redo" => Some(Input::Redo),
        _ => None,
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid configuration: {}", err);
            std::process::exit(2);
        }
    };
    let seed = args.seed.unwrap_or_else(rand::random);
    let store = open_store(args.scores.as_ref());

    let mut session = match GameSession::new(config, seed, store, TerminalPresenter::default()) {
        Ok(session) => session,
        Err(err) => {
            eprintln!("Failed to start a game: {}", err);
            std::process::exit(1);
        }
    };
    println!("Welcome! Seed: {}", seed);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        println!("---------------------");
        println!(
            "Score: {}, Best: {}, Undo: {}, Redo: {}",
            session.score(),
            session.best_score(),
            session.history().undo_len(),
            session.history().redo_len()
        );
        println!("{}", render(session.board(), session.config()));

        print!("Move (w/a/s/d), 'u' undo, 'r' redo, 'n' new game, 'q' quit: ");
        if io::stdout().flush().is_err() {
            break;
        }

        let Some(Ok(line)) = lines.next() else {
            break;
        };
        let line = line.trim().to_lowercase();

        match line.as_str() {
            "q" | "quit" => {
                println!("Thanks for playing!");
                break;
            }
            "n" | "new" => {
                if let Err(err) = session.new_game() {
                    eprintln!("Failed to start a game: {}", err);
                    break;
                }
            }
            other => match parse_input(other) {
                Some(input) => {
                    if session.is_over() {
                        println!("The game is over, press 'n' to start again.");
                        continue;
                    }
                    match session.handle(input) {
                        Ok(true) => session.settle(),
                        Ok(false) => println!("Nothing changed."),
                        Err(err) => {
                            eprintln!("Error: {}", err);
                            break;
                        }
                    }
                }
                None => println!("Unknown input '{}'.", other),
            },
        }
    }
}
