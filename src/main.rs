// Copyright 2023 Remi Bernotavicius

use clap::Parser;
use clap::Subcommand;
use database::models::RecipeId;
use database::{ConnectionProvider, DatabaseConfig, RecipeRepository};
use service::RecipeService;
use std::path::PathBuf;

mod database;
mod service;
mod shell;
#[cfg(test)]
mod test_support;

type Error = Box<dyn std::error::Error + Send + Sync + 'static>;
type Result<T> = std::result::Result<T, Error>;

#[derive(Parser, Debug)]
#[command(version, about = "Keep your recipes in a database")]
struct Args {
    /// The SQLite database to use. Defaults to `recipes.sqlite` in the data directory.
    #[arg(long, env = "RECIPES_DATABASE", global = true)]
    database: Option<PathBuf>,

    /// Can be overridden with `RUST_LOG`.
    #[arg(long, default_value_t = log::LevelFilter::Warn, global = true)]
    log_level: log::LevelFilter,

    #[command(subcommand)]
    commands: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Drop and recreate all tables and load the sample data
    Bootstrap,
    /// List recipes by ID
    List,
    /// Show a recipe with its ingredients, steps and categories
    Show { id: i32 },
    /// Run the interactive menu
    Run,
}

/// This is where the database and other user-data lives on-disk. On Linux it should be like:
/// `~/.local/share/recipe_manager/`
fn data_path() -> Result<PathBuf> {
    let dirs = directories::BaseDirs::new().ok_or("failed to get user home directory")?;
    let path = dirs.data_dir().join("recipe_manager");
    std::fs::create_dir_all(&path)?;
    Ok(path)
}

fn run(service: RecipeService) -> Result<()> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    shell::Shell::new(service, stdin.lock(), stdout.lock()).run()
}

fn main() -> Result<()> {
    let args = Args::parse();
    simple_logger::SimpleLogger::new()
        .with_level(args.log_level)
        .env()
        .init()?;

    let path = match args.database {
        Some(path) => path,
        None => data_path()?.join("recipes.sqlite"),
    };
    let provider = ConnectionProvider::new(DatabaseConfig::new(path));
    log::debug!("using database {:?}", provider.config().path);
    let service = RecipeService::new(RecipeRepository::new(provider));

    match args.commands.unwrap_or(Commands::Run) {
        Commands::Bootstrap => {
            service.create_and_populate_tables()?;
            println!("Tables created and populated!");
        }
        Commands::List => {
            for recipe in service.fetch_recipes()? {
                println!("{}: {}", recipe.id, recipe.name);
            }
        }
        Commands::Show { id } => {
            println!("{:#}", service.fetch_recipe_by_id(RecipeId::from(id))?)
        }
        Commands::Run => run(service)?,
    }
    Ok(())
}

#[test]
fn command_line() {
    let args = Args::try_parse_from(["recipe-manager", "--database", "x.sqlite", "show", "3"])
        .unwrap();
    assert_eq!(args.database, Some(PathBuf::from("x.sqlite")));
    assert_eq!(args.log_level, log::LevelFilter::Warn);
    assert!(matches!(args.commands, Some(Commands::Show { id: 3 })));

    let args = Args::try_parse_from(["recipe-manager", "--log-level", "debug"]).unwrap();
    assert_eq!(args.log_level, log::LevelFilter::Debug);
    assert!(args.commands.is_none());
}
