//! stmtbench — prepared statement cache benchmark CLI
//!
//! # Usage
//!
//! ```bash
//! # Run the four built-in variants against a local sakila database
//! stmtbench --url mysql://localhost:3306/sakila --user root --password 1234
//!
//! # Run a single variant, JSON output
//! stmtbench --variant 'serverSidePrepare=true&clientCache=true&cacheSizeLimit=2048' -f json
//!
//! # Inspect the query and how each variant will treat it
//! stmtbench explain
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use stmtbench::config::VariantEntry;
use stmtbench::parser::Piece;
use stmtbench::prelude::*;

#[derive(Parser)]
#[command(name = "stmtbench")]
#[command(version)]
#[command(about = "Client-side vs server-side prepared statement caching benchmark", long_about = None)]
#[command(after_help = "EXAMPLES:
    stmtbench --url mysql://localhost:3306/sakila --user root
    stmtbench -n 20000 --query actor-lookup
    stmtbench --variant 'useServerPrepStmts=true&cachePrepStmts=false' --format json
    stmtbench variants
    stmtbench status")]
struct Cli {
    /// Config file (default: ./stmtbench.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database URL
    #[arg(long, env = "STMTBENCH_DATABASE_URL", global = true)]
    url: Option<String>,

    /// Database user
    #[arg(long, global = true)]
    user: Option<String>,

    /// Database password
    #[arg(long, env = "STMTBENCH_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    /// Loop iterations per variant
    #[arg(short = 'n', long, global = true)]
    iterations: Option<u32>,

    /// Parameter cycle length (values run 1..=cycle)
    #[arg(long, global = true)]
    cycle: Option<u32>,

    /// Built-in query to benchmark
    #[arg(short, long, value_enum, global = true)]
    query: Option<QueryPreset>,

    /// Custom SQL with exactly one '?' placeholder
    #[arg(long, global = true, conflicts_with = "query")]
    sql: Option<String>,

    /// Variant properties; repeat to run several (replaces configured variants)
    #[arg(long = "variant", value_name = "PROPERTIES", global = true)]
    variants: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    format: OutputFormat,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the benchmark (default)
    Run,
    /// List the variants that would run
    Variants,
    /// Show the query template and which variants can cache it
    Explain,
    /// Print the server's prepared statement count
    Status,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let outcome = match &cli.command {
        None | Some(Commands::Run) => run(&cli).await,
        Some(Commands::Variants) => list_variants(&cli),
        Some(Commands::Explain) => explain(&cli),
        Some(Commands::Status) => status(&cli).await,
    };

    if let Err(e) = outcome {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "stmtbench=info"
    } else {
        "stmtbench=warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Config file first, then flags on top.
fn resolve_config(cli: &Cli) -> anyhow::Result<BenchConfig> {
    let (mut config, _) = BenchConfig::load(cli.config.as_deref())?;

    if let Some(url) = &cli.url {
        config.database.url = url.clone();
    }
    if let Some(user) = &cli.user {
        config.database.user = user.clone();
    }
    if let Some(password) = &cli.password {
        config.database.password = Some(password.clone());
    }
    if let Some(n) = cli.iterations {
        config.benchmark.iterations = n;
    }
    if let Some(cycle) = cli.cycle {
        config.benchmark.cycle = cycle;
    }
    if let Some(query) = cli.query {
        config.benchmark.query = query;
        config.benchmark.sql = None;
    }
    if let Some(sql) = &cli.sql {
        config.benchmark.sql = Some(sql.clone());
    }
    if !cli.variants.is_empty() {
        config.variants = cli
            .variants
            .iter()
            .map(|props| VariantEntry {
                name: None,
                properties: props.clone(),
            })
            .collect();
    }

    Ok(config)
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = resolve_config(cli)?;
    let plan = config.plan()?;
    let variants = config.variants()?;

    if cli.format == OutputFormat::Text {
        println!("{}", "🚀 PREPARED STATEMENT CACHE BENCHMARK".cyan().bold());
        println!("{} {}", "Database:  ".dimmed(), config.database.url);
        println!("{} {}", "Iterations:".dimmed(), plan.iterations);
        println!("{} 1..={}", "Parameters:".dimmed(), plan.cycle.length());
        println!("{} {} chars", "Query:     ".dimmed(), plan.query.sql().len());
        println!("{} {}", "Variants:  ".dimmed(), variants.len());
    }

    let harness = Harness::new(config.factory(), plan, variants);
    let stdout = std::io::stdout();
    let mut sink = ReportSink::new(stdout.lock(), cli.format);

    let outcome = harness.run(&mut sink).await;
    let failed = sink.failures().len();
    let (_results, _out) = sink.finalize()?;

    outcome.context("Benchmark aborted")?;
    if failed > 0 {
        anyhow::bail!("{} variant(s) failed", failed);
    }
    Ok(())
}

fn list_variants(cli: &Cli) -> anyhow::Result<()> {
    let config = resolve_config(cli)?;
    let query = config.query()?;

    println!("{}", "Variants (in run order)".cyan().bold());
    for (i, variant) in config.variants()?.iter().enumerate() {
        let cached = if variant.caches(query.sql()) {
            "cached".green()
        } else {
            "not cached".dimmed()
        };
        println!(
            "  {}. {} {} [{}]",
            i + 1,
            variant.name.white().bold(),
            variant.properties().yellow(),
            cached
        );
    }
    Ok(())
}

fn explain(cli: &Cli) -> anyhow::Result<()> {
    let config = resolve_config(cli)?;
    let query = config.query()?;
    let template = query.template();

    println!("{}", "Query Template".cyan().bold());
    println!("  {} {} chars", "Length:".dimmed(), query.sql().len());
    println!(
        "  {} {}",
        "Placeholders:".dimmed(),
        template.placeholder_count()
    );
    println!();
    for piece in template.pieces() {
        match piece {
            Piece::Text(text) => print!("{}", text.white()),
            Piece::Placeholder => print!("{}", "?".yellow().bold()),
        }
    }
    println!();
    println!();

    println!("{}", "Per variant".cyan().bold());
    for variant in config.variants()? {
        let mode = if variant.server_side_prepare {
            "server prepare"
        } else {
            "client emulation"
        };
        let cache = if !variant.client_cache {
            "cache off".dimmed()
        } else if variant.caches(query.sql()) {
            "cached".green()
        } else {
            format!(
                "too long to cache (limit {})",
                variant.effective_cache_size_limit()
            )
            .red()
        };
        println!("  {} — {}, {}", variant.name.white().bold(), mode, cache);
    }
    Ok(())
}

async fn status(cli: &Cli) -> anyhow::Result<()> {
    let config = resolve_config(cli)?;
    let variant = config
        .variants()?
        .into_iter()
        .next()
        .unwrap_or_else(|| ConfigVariant::new("status", false, false, None));

    let mut conn = config
        .factory()
        .open(&variant)
        .await
        .with_context(|| format!("Could not connect to {}", config.database.url))?;
    let count = probe_server_status(&mut conn).await;
    conn.close().await?;

    println!(
        "{} {}",
        "Server prepared statements:".dimmed(),
        count.to_string().cyan()
    );
    Ok(())
}
