//! dynorm CLI - render vendor SQL and run ad-hoc queries through the ORM.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use dynorm::core::sql::split_table_name;
use dynorm::{MicroOrm, OrmConfig, OrmError, PluginRegistry, Record, SqlValue};
use tracing::{debug, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "dynorm")]
#[command(about = "Dialect-aware SQL rendering and querying for five database vendors")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file (used by query and describe)
    #[arg(short, long, default_value = "dynorm.yaml")]
    config: PathBuf,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "warn")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every registered provider name
    Providers,

    /// Render the paging query a provider would run
    Page {
        /// Provider name (e.g. Npgsql, System.Data.SqlClient, sqlite)
        #[arg(short, long)]
        provider: String,

        /// Table or join expression
        #[arg(short, long)]
        table: String,

        /// Select list
        #[arg(long, default_value = "*")]
        columns: String,

        /// ORDER BY expression
        #[arg(long, default_value = "")]
        order_by: String,

        /// WHERE expression
        #[arg(long, default_value = "")]
        filter: String,

        /// 1-based page number
        #[arg(long, default_value = "1")]
        page: u64,

        /// Rows per page
        #[arg(long, default_value = "10")]
        page_size: u64,
    },

    /// Render a SELECT with an optional row cap
    Select {
        #[arg(short, long)]
        provider: String,

        #[arg(short, long)]
        table: String,

        #[arg(long, default_value = "*")]
        columns: String,

        #[arg(long, default_value = "")]
        order_by: String,

        #[arg(long, default_value = "")]
        filter: String,

        /// Maximum number of rows
        #[arg(long)]
        limit: Option<u64>,
    },

    /// Render the catalog query describing a table's columns
    TableInfo {
        #[arg(short, long)]
        provider: String,

        /// Table name, optionally `owner.table`
        #[arg(short, long)]
        table: String,
    },

    /// Show how a provider prefixes a parameter name
    Prefix {
        #[arg(short, long)]
        provider: String,

        /// Raw parameter name
        name: String,
    },

    /// Run a SQL statement against the configured connection
    Query {
        /// SQL text; positional arguments are referenced as @0, @1, ...
        sql: String,

        /// Positional argument values (integers and decimals are bound as numbers)
        args: Vec<String>,
    },

    /// Show the configured table's columns and their parsed defaults
    Describe {
        /// Override the configured table
        #[arg(short, long)]
        table: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_logging(&cli.verbosity, &cli.log_format) {
        eprintln!("Failed to setup logging: {}", e);
        return ExitCode::from(1);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), OrmError> {
    let registry = PluginRegistry::with_builtins();

    match cli.command {
        Commands::Providers => {
            for name in registry.provider_names() {
                if let Some(plugin) = registry.get(name) {
                    println!("{:<34} {}", name, plugin.name());
                }
            }
        }

        Commands::Page {
            provider,
            table,
            columns,
            order_by,
            filter,
            page,
            page_size,
        } => {
            if page_size == 0 {
                return Err(OrmError::Config("--page-size must be at least 1".into()));
            }
            let plugin = registry.require(&provider)?;
            let offset = page.saturating_sub(1).saturating_mul(page_size);
            println!(
                "{}",
                plugin.build_paging_query(&columns, &table, &order_by, &filter, page_size, offset)
            );
        }

        Commands::Select {
            provider,
            table,
            columns,
            order_by,
            filter,
            limit,
        } => {
            let plugin = registry.require(&provider)?;
            println!(
                "{}",
                plugin.build_select(&columns, &table, &filter, &order_by, limit)
            );
        }

        Commands::TableInfo { provider, table } => {
            let plugin = registry.require(&provider)?;
            let (owner, name) = split_table_name(&table);
            println!("{}", plugin.build_table_info_query(owner, name));
        }

        Commands::Prefix { provider, name } => {
            let plugin = registry.require(&provider)?;
            println!("{}", plugin.prefix_parameter_name(&name, None));
        }

        Commands::Query { sql, args } => {
            let config = OrmConfig::load(&cli.config)?;
            let orm = MicroOrm::connect(&config, &registry).await?;
            let args: Vec<SqlValue> = args.iter().map(|a| parse_arg(a)).collect();
            debug!(sql = %sql, args = args.len(), "running ad-hoc query");

            let rows = orm.query(&sql, &args).await;
            orm.close().await;
            print_rows(&rows?)?;
        }

        Commands::Describe { table } => {
            let mut config = OrmConfig::load(&cli.config)?;
            if let Some(table) = table {
                config.table = Some(table);
            }
            if config.table.is_none() {
                return Err(OrmError::Config(
                    "no table configured (set `table` or pass --table)".into(),
                ));
            }

            let orm = MicroOrm::connect(&config, &registry).await?;
            let described = describe(&orm).await;
            orm.close().await;
            println!("{}", serde_json::to_string_pretty(&described?)?);
        }
    }

    Ok(())
}

async fn describe(orm: &MicroOrm) -> Result<serde_json::Value, OrmError> {
    let columns: Vec<serde_json::Value> = orm
        .table_meta_data()
        .await?
        .iter()
        .map(Record::to_json)
        .collect();
    let defaults = orm.new_item().await?;

    Ok(serde_json::json!({
        "provider": orm.plugin().name(),
        "table": orm.statements().table_name(),
        "columns": columns,
        "defaults": defaults.to_json(),
    }))
}

fn print_rows(rows: &[Record]) -> Result<(), OrmError> {
    let json: Vec<serde_json::Value> = rows.iter().map(Record::to_json).collect();
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

/// Command-line arguments arrive as text; bind numbers as numbers so
/// comparisons against numeric columns behave on every vendor.
fn parse_arg(raw: &str) -> SqlValue {
    if let Ok(i) = raw.parse::<i64>() {
        SqlValue::I64(i)
    } else if let Ok(f) = raw.parse::<f64>() {
        SqlValue::F64(f)
    } else if raw.eq_ignore_ascii_case("null") {
        SqlValue::NULL
    } else {
        SqlValue::Text(raw.to_string())
    }
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => return Err(format!("unknown verbosity '{}'", other)),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("unknown log format '{}'", other)),
    }

    Ok(())
}
