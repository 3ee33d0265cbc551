use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use owo_colors::OwoColorize;
use pubmed_boards::boards::{load_or_init_with, BoardStore, FileBoardStore};
use pubmed_boards::config::{
    default_config_path, find_config_file, get_config, load_config, Config, LoggingConfig,
};
use pubmed_boards::engine::{stagger_delay, Dashboard, FeedState, LoadMore, QueryFetchEngine};
use pubmed_boards::favorites::{annotate, favorites_engine, FavoriteStore, FileFavorites};
use pubmed_boards::import::import_board;
use pubmed_boards::models::{Article, Board, BoardList};
use pubmed_boards::sources::{LiteratureApi, PubMedClient};
use pubmed_boards::ui;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// PubMed Boards - curated PubMed feeds in the terminal
#[derive(Parser, Debug)]
#[command(name = "pubmed-boards")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Track curated PubMed search feeds and favorite articles", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// User whose boards are loaded (overrides storage.user_id)
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Table if stdout is a terminal, JSON otherwise
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
}

impl OutputFormat {
    fn resolve(self) -> OutputFormat {
        match self {
            OutputFormat::Auto if ui::is_terminal() => OutputFormat::Table,
            OutputFormat::Auto => OutputFormat::Json,
            other => other,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List and edit boards
    #[command(alias = "b")]
    Boards {
        #[command(subcommand)]
        action: Option<BoardAction>,
    },

    /// Fetch every board, staggered, and print the first page(s)
    #[command(alias = "f")]
    Feed {
        /// Pages to load per board
        #[arg(long, short, default_value_t = 1)]
        pages: usize,
    },

    /// Fetch a single board without stagger
    Show {
        /// Board id or label
        board: String,

        /// Pages to load
        #[arg(long, short, default_value_t = 1)]
        pages: usize,
    },

    /// Manage favorite articles
    Favorites {
        #[command(subcommand)]
        action: FavoriteAction,
    },

    /// Add a board from a pubmed.ncbi.nlm.nih.gov search URL
    Import {
        /// PubMed search URL
        url: String,

        /// Board title (generated from the query if omitted)
        #[arg(long, short)]
        title: Option<String>,
    },

    /// Write a default configuration file
    InitConfig {
        /// Destination (defaults to the platform config directory)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum BoardAction {
    /// List boards in display order
    List,

    /// Add a custom board
    Add { label: String, query: String },

    /// Change a board's label and/or query
    Edit {
        id: String,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        query: Option<String>,
    },

    /// Remove a board
    Remove { id: String },

    /// Move a board to a position (0-based)
    Move { id: String, position: usize },
}

#[derive(Subcommand, Debug)]
enum FavoriteAction {
    /// List favorite PMIDs
    List,

    /// Add or remove a PMID
    Toggle { uid: String },

    /// Fetch and print the favorites feed
    Show {
        /// Pages to load
        #[arg(long, short, default_value_t = 1)]
        pages: usize,
    },
}

/// Per-board JSON output
#[derive(Serialize)]
struct FeedOutput<'a> {
    board: &'a Board,
    results: Vec<ArticleOutput<'a>>,
    total_ids: usize,
    has_more: bool,
    error: Option<&'a str>,
}

#[derive(Serialize)]
struct ArticleOutput<'a> {
    #[serde(flatten)]
    article: &'a Article,
    favorite: bool,
    url: String,
}

struct App {
    config: Config,
    user: String,
    output: OutputFormat,
    quiet: bool,
}

impl App {
    fn api(&self) -> Result<Arc<dyn LiteratureApi>> {
        let client = PubMedClient::from_config(&self.config.api)?;
        Ok(Arc::new(client))
    }

    fn board_store(&self) -> FileBoardStore {
        FileBoardStore::new(&self.config.storage.boards_dir)
    }

    fn boards(&self, store: &dyn BoardStore) -> Result<BoardList> {
        load_or_init_with(store, &self.user, self.config.seed_boards())
            .with_context(|| format!("Failed to load boards for {}", self.user))
    }

    fn favorites(&self) -> Result<FileFavorites> {
        Ok(FileFavorites::open(&self.config.storage.favorites_path)?)
    }

    fn print_feed(&self, board: &Board, state: &FeedState, favorites: &dyn FavoriteStore) {
        let rows = annotate(state.results(), favorites);
        match self.output {
            OutputFormat::Json => {
                let output = FeedOutput {
                    board,
                    results: rows
                        .iter()
                        .map(|&(article, favorite)| ArticleOutput {
                            article,
                            favorite,
                            url: article.url(),
                        })
                        .collect(),
                    total_ids: state.total_ids(),
                    has_more: state.has_more(),
                    error: state.error(),
                };
                match serde_json::to_string_pretty(&output) {
                    Ok(json) => println!("{}", json),
                    Err(e) => tracing::error!("Failed to serialize feed: {}", e),
                }
            }
            _ => {
                ui::print_board_header(board);
                if !rows.is_empty() {
                    println!("{}", ui::article_table(&rows));
                }
                ui::print_feed_footer(state);
            }
        }
    }
}

/// Load `pages - 1` further pages, stopping early on exhaustion or failure
async fn load_pages(engine: &QueryFetchEngine, pages: usize) -> FeedState {
    for _ in 1..pages {
        match engine.load_more().await {
            LoadMore::Appended(_) => {}
            LoadMore::Skipped | LoadMore::Stale => break,
            LoadMore::Failed(message) => {
                tracing::warn!("Stopped paging: {}", message);
                break;
            }
        }
    }
    engine.snapshot()
}

fn find_board<'a>(boards: &'a BoardList, key: &str) -> Option<&'a Board> {
    boards
        .get(key)
        .or_else(|| boards.iter().find(|b| b.label.eq_ignore_ascii_case(key)))
}

fn load_app_config(cli: &Cli) -> Result<Config> {
    let config = if let Some(path) = &cli.config {
        load_config(path).with_context(|| format!("Failed to load {}", path.display()))?
    } else if let Some(path) = find_config_file() {
        load_config(&path).with_context(|| format!("Failed to load {}", path.display()))?
    } else {
        get_config()?
    };
    Ok(config)
}

fn init_tracing(verbose: u8, quiet: bool, logging: &LoggingConfig) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => logging.level.as_str(),
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pubmed_boards={}", level)));
    let registry = tracing_subscriber::registry().with(filter);

    if logging.is_json() {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_app_config(&cli)?;
    init_tracing(cli.verbose, cli.quiet, &config.logging);

    let app = App {
        user: cli.user.clone().unwrap_or_else(|| config.storage.user_id.clone()),
        config,
        output: cli.output.resolve(),
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Boards { action } => {
            let store = app.board_store();
            let mut boards = app.boards(&store)?;

            let changed = match action.unwrap_or(BoardAction::List) {
                BoardAction::List => false,
                BoardAction::Add { label, query } => {
                    let board = boards.add_custom(label, query, None);
                    println!("{} Added board {}", "✓".green().bold(), board.id);
                    true
                }
                BoardAction::Edit { id, label, query } => {
                    let current = boards
                        .get(&id)
                        .cloned()
                        .ok_or_else(|| anyhow!("No board with id {}", id))?;
                    boards.edit(
                        &id,
                        label.unwrap_or(current.label),
                        query.unwrap_or(current.query),
                    );
                    true
                }
                BoardAction::Remove { id } => {
                    boards
                        .remove(&id)
                        .ok_or_else(|| anyhow!("No board with id {}", id))?;
                    true
                }
                BoardAction::Move { id, position } => {
                    let from = boards
                        .position(&id)
                        .ok_or_else(|| anyhow!("No board with id {}", id))?;
                    if !boards.move_board(from, position) {
                        return Err(anyhow!(
                            "Position {} is out of range (0..{})",
                            position,
                            boards.len()
                        ));
                    }
                    true
                }
            };

            if changed {
                store.save(&app.user, &boards)?;
            }

            match app.output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&boards)?),
                _ => {
                    let mut table = comfy_table::Table::new();
                    table.load_preset(comfy_table::presets::UTF8_FULL);
                    table.set_header(vec!["#", "Id", "Board", "Starts after", "Query"]);
                    for (index, board) in boards.iter().enumerate() {
                        table.add_row(vec![
                            index.to_string(),
                            board.id.clone(),
                            format!("{} {}", ui::board_icon(board.icon()), board.label),
                            format!("{:.1}s", stagger_delay(index).as_secs_f64()),
                            ui::truncate_with_ellipsis(&board.query, 60),
                        ]);
                    }
                    println!("{table}");
                }
            }
        }

        Commands::Feed { pages } => {
            let boards = app.boards(&app.board_store())?;
            let favorites = app.favorites()?;
            let api = app.api()?;

            let spinner = ui::Spinner::new(
                &format!("Fetching {} boards", boards.len()),
                app.quiet || app.output == OutputFormat::Json,
            );
            let dashboard = Dashboard::mount(api, boards.as_slice());
            dashboard.settled().await;
            spinner.set_message("Loading more pages");

            let mut states = Vec::with_capacity(dashboard.feeds().len());
            for feed in dashboard.feeds() {
                states.push(load_pages(feed.engine(), pages).await);
            }
            spinner.finish();

            for (feed, state) in dashboard.feeds().iter().zip(&states) {
                app.print_feed(feed.board(), state, &favorites);
            }
        }

        Commands::Show { board, pages } => {
            let boards = app.boards(&app.board_store())?;
            let board = find_board(&boards, &board)
                .cloned()
                .ok_or_else(|| anyhow!("No board matching {:?}", board))?;
            let favorites = app.favorites()?;

            let spinner = ui::Spinner::new(&format!("Fetching {}", board.label), app.quiet);
            let engine = Dashboard::detail(app.api()?, &board);
            engine.settled().await;
            let state = load_pages(&engine, pages).await;
            spinner.finish();

            app.print_feed(&board, &state, &favorites);
        }

        Commands::Favorites { action } => {
            let favorites = app.favorites()?;
            match action {
                FavoriteAction::List => {
                    let ids = favorites.ids();
                    match app.output {
                        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&ids)?),
                        _ if ids.is_empty() => println!("{}", "No favorites yet".dimmed()),
                        _ => ids.iter().for_each(|id| println!("{}", id)),
                    }
                }
                FavoriteAction::Toggle { uid } => {
                    if uid.is_empty() || !uid.bytes().all(|b| b.is_ascii_digit()) {
                        return Err(anyhow!("Not a PMID: {:?}", uid));
                    }
                    if favorites.toggle(&uid)? {
                        println!("{} {} added to favorites", "★".yellow().bold(), uid);
                    } else {
                        println!("{} {} removed from favorites", "☆".dimmed(), uid);
                    }
                }
                FavoriteAction::Show { pages } => {
                    let spinner = ui::Spinner::new("Fetching favorites", app.quiet);
                    let engine = favorites_engine(app.api()?, &favorites);
                    engine.settled().await;
                    let state = load_pages(&engine, pages).await;
                    spinner.finish();

                    let board = Board::new("favorites", "Favorites", engine.snapshot().query())
                        .with_icon("favorites");
                    app.print_feed(&board, &state, &favorites);
                }
            }
        }

        Commands::Import { url, title } => {
            let imported = import_board(&url, title.as_deref())?;
            let store = app.board_store();
            let mut boards = app.boards(&store)?;
            let board = imported.add_to(&mut boards).clone();
            store.save(&app.user, &boards)?;

            println!(
                "{} Imported {} {} ({})",
                "✓".green().bold(),
                ui::board_icon(board.icon()),
                board.label.bold(),
                board.id
            );
        }

        Commands::InitConfig { path, force } => {
            let path = path.unwrap_or_else(default_config_path);
            if path.exists() && !force {
                return Err(anyhow!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                ));
            }
            app.config.save(&path)?;
            println!("{} Wrote {}", "✓".green().bold(), path.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["pubmed-boards", "feed"]);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        assert_eq!(cli.output, OutputFormat::Auto);
        assert!(matches!(cli.command, Commands::Feed { pages: 1 }));
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::parse_from(["pubmed-boards", "-vv", "boards"]);
        assert_eq!(cli.verbose, 2);

        let cli = Cli::parse_from(["pubmed-boards", "boards", "--verbose"]);
        assert_eq!(cli.verbose, 1);
    }

    #[test]
    fn test_cli_subcommands() {
        let cli = Cli::parse_from(["pubmed-boards", "show", "vaccine", "--pages", "3"]);
        assert!(matches!(
            cli.command,
            Commands::Show { ref board, pages: 3 } if board == "vaccine"
        ));

        let cli = Cli::parse_from(["pubmed-boards", "favorites", "toggle", "123"]);
        assert!(matches!(
            cli.command,
            Commands::Favorites { action: FavoriteAction::Toggle { ref uid } } if uid == "123"
        ));

        let cli = Cli::parse_from(["pubmed-boards", "boards", "move", "travel", "0"]);
        assert!(matches!(
            cli.command,
            Commands::Boards { action: Some(BoardAction::Move { position: 0, .. }) }
        ));

        let cli =
            Cli::parse_from(["pubmed-boards", "-o", "json", "import", "https://x", "-t", "T"]);
        assert_eq!(cli.output, OutputFormat::Json);
        assert!(matches!(cli.command, Commands::Import { title: Some(_), .. }));
    }

    #[test]
    fn test_output_format_resolve() {
        assert_eq!(OutputFormat::Json.resolve(), OutputFormat::Json);
        assert_eq!(OutputFormat::Table.resolve(), OutputFormat::Table);
    }

    #[test]
    fn test_find_board_by_id_or_label() {
        let boards = BoardList::new(pubmed_boards::models::default_boards());
        assert_eq!(find_board(&boards, "travel").unwrap().id, "travel");
        assert_eq!(find_board(&boards, "pediatric id").unwrap().id, "pediatric");
        assert!(find_board(&boards, "missing").is_none());
    }
}
