//! tablelink CLI - Resolve join paths and compile query requests to SQL
//!
//! Usage:
//!   tablelink compile --request <request.json> [--links <links.json>] [--dialect <dialect>] [--json]
//!   tablelink path <table> <table>... [--links <links.json>]
//!   tablelink links [--links <links.json>]
//!
//! Without `--links` the catalog configured in tablelink.toml is used.
//!
//! Examples:
//!   tablelink compile --request grid.json --links links.json --dialect tsql
//!   tablelink path enrollment_fact student_dim term_dim
//!   RUST_LOG=tablelink=debug tablelink path enrollment_fact term_dim

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tablelink::catalog::{JsonLinkProvider, LinkProvider, LinkRecord};
use tablelink::compile::{compile, CompileError, CompileOptions};
use tablelink::config::Settings;
use tablelink::graph::JoinGraph;
use tablelink::request::QueryRequest;
use tablelink::sql::Dialect;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tablelink")]
#[command(about = "tablelink - Join-path resolution and SQL assembly over a link catalog")]
#[command(version)]
struct Cli {
    /// JSON file of link rows (overrides the configured catalog)
    #[arg(short = 'l', long = "links", global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a query request to SQL
    Compile {
        /// Path to the request JSON
        #[arg(short, long)]
        request: PathBuf,

        /// SQL dialect to generate (defaults to the configured one)
        #[arg(short, long)]
        dialect: Option<DialectArg>,

        /// Schema for inner FROMs when the request names none
        #[arg(short, long)]
        schema: Option<String>,

        /// Print SQL, output columns and join path as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the join path connecting the given tables
    Path {
        /// Tables that must be connected
        #[arg(required = true)]
        tables: Vec<String>,
    },

    /// Summarise the link catalog
    Links,
}

#[derive(Clone, ValueEnum)]
enum DialectArg {
    Postgres,
    Duckdb,
    Mysql,
    Tsql,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Postgres => Dialect::Postgres,
            DialectArg::Duckdb => Dialect::DuckDb,
            DialectArg::Mysql => Dialect::MySql,
            DialectArg::Tsql => Dialect::TSql,
        }
    }
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let settings = match Settings::load() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let links = match load_links(cli.catalog.as_deref(), &settings) {
        Ok(links) => links,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Compile {
            request,
            dialect,
            schema,
            json,
        } => {
            let mut options = settings.compile_options();
            if let Some(dialect) = dialect {
                options = options.with_dialect(dialect.into());
            }
            if let Some(schema) = &schema {
                options = options.with_schema(schema);
            }
            cmd_compile(&request, &links, &options, json)
        }
        Commands::Path { tables } => cmd_path(&tables, &links),
        Commands::Links => cmd_links(&links),
    }
}

fn load_links(file: Option<&Path>, settings: &Settings) -> Result<Vec<LinkRecord>, String> {
    let loaded = match file {
        Some(path) => JsonLinkProvider::new(path)
            .with_delimiter(&settings.catalog.delimiter)
            .load_links(),
        None => {
            let provider = settings
                .catalog
                .provider()
                .map_err(|e| format!("Configuration error: {}", e))?;
            provider.load_links()
        }
    };
    loaded.map_err(|e| format!("Catalog error: {}", e))
}

fn cmd_compile(file: &Path, links: &[LinkRecord], options: &CompileOptions, json: bool) -> ExitCode {
    let source = match fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let request = match QueryRequest::from_json(&source) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Invalid request '{}': {}", file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    match compile(&request, links, options) {
        Ok(compiled) if json => match serde_json::to_string_pretty(&compiled) {
            Ok(out) => {
                println!("{}", out);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                ExitCode::FAILURE
            }
        },
        Ok(compiled) => {
            println!("{}", compiled.sql);
            ExitCode::SUCCESS
        }
        Err(e) => report(&e),
    }
}

fn cmd_path(tables: &[String], links: &[LinkRecord]) -> ExitCode {
    let path = JoinGraph::build(links)
        .and_then(|graph| graph.resolve_path(tables))
        .map_err(CompileError::from);

    match path {
        Ok(path) if path.is_empty() => {
            println!("No joins needed.");
            ExitCode::SUCCESS
        }
        Ok(path) => {
            for edge in &path {
                println!("{}", edge);
            }
            ExitCode::SUCCESS
        }
        Err(e) => report(&e),
    }
}

fn cmd_links(links: &[LinkRecord]) -> ExitCode {
    let graph = match JoinGraph::build(links) {
        Ok(g) => g,
        Err(e) => return report(&CompileError::from(e)),
    };

    println!("Links: {}", links.len());
    println!("Tables: {}", graph.table_count());
    println!();

    for table in graph.tables() {
        let neighbors: Vec<&str> = graph
            .id(table)
            .map(|id| graph.neighbors(id).map(|n| graph.name(n)).collect())
            .unwrap_or_default();
        println!("  - {} -> {}", table, neighbors.join(", "));
    }

    ExitCode::SUCCESS
}

fn report(error: &CompileError) -> ExitCode {
    eprintln!("Error ({:?}): {}", error.class(), error);
    ExitCode::FAILURE
}
