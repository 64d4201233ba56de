//! csv-mysql-loader CLI - load a CSV file into MySQL with typed columns.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use csv_mysql_loader::orchestrator::plan;
use csv_mysql_loader::{
    read_csv, render_table, CommandResult, CommitPolicy, Config, DbKind, LoaderError,
    MemoryTarget, Orchestrator, RunResult,
};
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "csv-mysql-loader")]
#[command(about = "Load a CSV file into a MySQL table with configured column types")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the saved connection profile [default: profile.yaml]
    ///
    /// The profile is YAML with a `Database:` mapping; INI `config.ini`
    /// files are not read.
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the CSV file, run update commands and verify the result
    Run {
        /// CSV file to load (overrides source.path)
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Destination table name
        #[arg(long)]
        table: Option<String>,

        /// Database type: mysql or mariadb
        #[arg(long)]
        db_type: Option<DbKind>,

        /// Database host
        #[arg(long)]
        host: Option<String>,

        /// Database port
        #[arg(long)]
        port: Option<u16>,

        /// Database username
        #[arg(long)]
        username: Option<String>,

        /// Database password
        #[arg(long)]
        password: Option<String>,

        /// Database name
        #[arg(long)]
        database: Option<String>,

        /// Run against an in-memory target instead of the database
        #[arg(long)]
        dry_run: bool,

        /// What to do when an update command fails: commit or rollback
        #[arg(long)]
        on_command_failure: Option<CommitPolicy>,

        /// Rows to show in the before/after previews
        #[arg(long)]
        sample_rows: Option<usize>,

        /// Do not save the connection profile after a successful run
        #[arg(long)]
        no_save_profile: bool,
    },

    /// Show the resolved schema, DDL and update statements without loading
    Plan {
        /// CSV file to plan for (overrides source.path)
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Destination table name
        #[arg(long)]
        table: Option<String>,
    },

    /// Test the database connection
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), LoaderError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format).map_err(LoaderError::Config)?;

    let mut config = match &cli.config {
        Some(path) => {
            let config = Config::load(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => Config::default(),
    };
    if let Some(path) = &cli.profile {
        config.profile.path = path.clone();
    }

    match cli.command {
        Commands::Run {
            csv,
            table,
            db_type,
            host,
            port,
            username,
            password,
            database,
            dry_run,
            on_command_failure,
            sample_rows,
            no_save_profile,
        } => {
            // Apply overrides
            if let Some(table) = table {
                config.table_name = table.trim().to_string();
            }
            let target = &mut config.connection;
            if db_type.is_some() {
                target.db_type = db_type;
            }
            override_field(&mut target.host, host);
            override_field(&mut target.username, username);
            override_field(&mut target.password, password);
            override_field(&mut target.database_name, database);
            if let Some(port) = port {
                target.port = port;
            }
            if let Some(policy) = on_command_failure {
                config.transform.on_command_failure = policy;
            }
            if let Some(rows) = sample_rows {
                config.verify.sample_rows = rows;
            }
            if no_save_profile {
                config.profile.save = false;
            }
            config.validate()?;

            let csv_path = csv_path(csv, &config)?;
            let dataset = read_csv(&csv_path, &config.source)?;

            let orchestrator = if dry_run {
                info!("Dry run: loading into an in-memory target");
                Orchestrator::with_target(config, Arc::new(MemoryTarget::new()))
            } else {
                Orchestrator::new(config).await?
            };

            let outcome = orchestrator.run(&dataset).await;
            orchestrator.close().await;
            let result = outcome?;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                print_run_result(&result, dry_run);
            }
        }

        Commands::Plan { csv, table } => {
            if let Some(table) = table {
                config.table_name = table.trim().to_string();
            }
            let csv_path = csv_path(csv, &config)?;
            let dataset = read_csv(&csv_path, &config.source)?;
            let plan = plan(&config, &dataset)?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                println!("Table: {}\n", plan.table);
                let headers = vec!["column".to_string(), "type".to_string()];
                let rows: Vec<Vec<Option<String>>> = plan
                    .schema
                    .columns
                    .iter()
                    .map(|c| vec![Some(c.name.clone()), Some(c.db_type.to_string())])
                    .collect();
                print!("{}", render_table(&headers, &rows));
                println!("\n{};", plan.ddl);
                if plan.update_statements.is_empty() {
                    println!("\nNo update commands.");
                } else {
                    println!();
                    for statement in &plan.update_statements {
                        println!("{};", statement);
                    }
                }
            }
        }

        Commands::HealthCheck => {
            let orchestrator = Orchestrator::new(config).await?;
            let result = orchestrator.health_check().await?;
            orchestrator.close().await;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  Target ({}): {} ({}ms)",
                    result.db_type,
                    if result.target_connected { "OK" } else { "FAILED" },
                    result.target_latency_ms
                );
                if let Some(ref err) = result.target_error {
                    println!("    Error: {}", err);
                }
                println!(
                    "\n  Overall: {}",
                    if result.healthy { "HEALTHY" } else { "UNHEALTHY" }
                );
            }

            if !result.healthy {
                return Err(LoaderError::connection(
                    "health check failed",
                    "pinging target",
                ));
            }
        }
    }

    Ok(())
}

fn override_field(field: &mut String, value: Option<String>) {
    if let Some(value) = value {
        *field = value;
    }
}

fn csv_path(flag: Option<PathBuf>, config: &Config) -> Result<PathBuf, LoaderError> {
    flag.or_else(|| config.source.path.clone()).ok_or_else(|| {
        LoaderError::Config("no CSV file given (use --csv or source.path)".to_string())
    })
}

fn print_run_result(result: &RunResult, dry_run: bool) {
    println!("Data before transform:");
    print!("{}", result.preview_before.render());

    println!("\nUpdate commands:");
    if result.commands.is_empty() {
        println!("  (none)");
    }
    for outcome in &result.commands {
        match &outcome.result {
            CommandResult::Applied { rows_affected } => {
                println!("  {}: {} rows affected", outcome.command, rows_affected)
            }
            CommandResult::Failed { error } => {
                println!("  {}: FAILED: {}", outcome.command, error)
            }
            CommandResult::Skipped => println!("  {}: skipped", outcome.command),
        }
    }

    if let Some(after) = &result.preview_after {
        println!("\nData after transform:");
        print!("{}", after.render());
    }

    for warning in &result.warnings {
        println!("\nWarning: {}", warning);
    }

    let status_msg = if dry_run { "Dry run completed!" } else { "Load completed!" };
    println!("\n{}", status_msg);
    println!("  Run ID: {}", result.run_id);
    println!("  Status: {:?}", result.status);
    println!("  Table: {}", result.table);
    println!("  Rows: {}", result.rows_loaded);
    println!("  Duration: {:.2}s", result.duration_seconds);
    if result.profile_saved {
        println!("  Connection profile saved");
    }
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}
