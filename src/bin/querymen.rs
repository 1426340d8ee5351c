use clap::{Parser, Subcommand};
use querymen::config::SchemaConfig;
use querymen::{Middleware, QueryError, RawQuery, Schema, Toggle};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "querymen", version, about = "Turn query strings into query documents", long_about = None)]
struct Cli {
    /// Schema file (TOML)
    #[arg(long, help = "Schema file (TOML). Falls back to QUERYMEN_SCHEMA, then ./querymen.toml.")]
    schema: Option<PathBuf>,
    /// Enable geospatial search
    #[arg(long)]
    near: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Validate and parse a query string, printing the result as JSON")]
    Parse {
        #[arg(help = "URL-encoded query string, e.g. 'q=term&page=2'")]
        query: String,
    },
    #[command(about = "Validate a query string, printing the first error as JSON")]
    Validate {
        #[arg(help = "URL-encoded query string")]
        query: String,
    },
}

// Precedence: CLI > env > ./querymen.toml > built-in defaults
fn schema_path(cli: Option<PathBuf>) -> Option<PathBuf> {
    if cli.is_some() {
        return cli;
    }
    if let Ok(p) = std::env::var("QUERYMEN_SCHEMA") {
        return Some(PathBuf::from(p));
    }
    std::env::current_dir().ok().map(|cur| cur.join("querymen.toml")).filter(|p| p.exists())
}

fn load_schema(path: Option<PathBuf>, near: bool) -> Result<Schema, QueryError> {
    let mut config = match path {
        Some(path) => SchemaConfig::load(&path)?,
        None => SchemaConfig::default(),
    };
    if near {
        config.options.set("near", Toggle::Enabled(true));
    }
    Ok(config.into_schema())
}

fn run(cli: Cli) -> Result<i32, Box<dyn std::error::Error>> {
    let schema = load_schema(schema_path(cli.schema), cli.near)?;
    let middleware = Middleware::new(schema);
    match cli.command {
        Commands::Parse { query } => match middleware.handle(&RawQuery::parse(&query)) {
            Ok(parsed) => {
                println!("{}", serde_json::to_string_pretty(&parsed.to_json())?);
                Ok(0)
            }
            Err(e) => {
                eprintln!("{}", serde_json::to_string_pretty(&e)?);
                Ok(2)
            }
        },
        Commands::Validate { query } => match middleware.validate(&RawQuery::parse(&query)) {
            Ok(()) => {
                println!("ok");
                Ok(0)
            }
            Err(e) => {
                println!("{}", serde_json::to_string_pretty(&e)?);
                Ok(2)
            }
        },
    }
}

fn main() {
    if std::env::var_os("QUERYMEN_LOG_DIR").is_some() {
        let _ = querymen::logger::configure_from_env();
    }
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
