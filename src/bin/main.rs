//! pressdb CLI - inspect table schemas and render queries
//!
//! Usage:
//!   pressdb describe <table> [--db <file.sqlite> | --schema <schema.toml>]
//!   pressdb query <table> [--where "col OP value"]... [--select a,b] [--order col:dir]
//!                         [--limit n] [--offset n] [--count] [--prepared]
//!   pressdb cache stats|clear|purge
//!
//! Examples:
//!   pressdb describe posts --schema fixtures/blog.toml
//!   pressdb query posts --schema fixtures/blog.toml --where "status = publish" \
//!       --where "post_type IN post,page" --order ID:desc --limit 10
//!   pressdb query posts --db blog.sqlite --dialect sqlite --where "ID BETWEEN 1,20" --prepared

use clap::{Parser, Subcommand, ValueEnum};
use once_cell::sync::Lazy;
use pressdb::cache::SqliteCache;
use pressdb::config::Settings;
use pressdb::db::SqliteDatabase;
use pressdb::schema::{SchemaCache, SchemaSource, StaticSchema};
use pressdb::sql::{Dialect, QueryBuilder, SortDir};
use pressdb::value::Value;
use regex::Regex;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pressdb")]
#[command(about = "pressdb - schema-aware SQL statement builder")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $PRESSDB_CONFIG, ./pressdb.toml, ~/.config/pressdb/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database to introspect
    #[arg(long, global = true, conflicts_with = "schema")]
    db: Option<PathBuf>,

    /// TOML schema fixture to use instead of a database
    #[arg(long, global = true)]
    schema: Option<PathBuf>,

    /// SQL dialect to render (defaults to [database].dialect)
    #[arg(short, long, global = true)]
    dialect: Option<DialectArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the column descriptors of a table as JSON
    Describe {
        /// Table name (the configured prefix is added if missing)
        table: String,
    },

    /// Render a SELECT statement
    Query {
        /// Table name (the configured prefix is added if missing)
        table: String,

        /// Filter as "column OPERATOR value"; lists are comma-separated
        #[arg(short, long = "where")]
        filters: Vec<String>,

        /// Comma-separated columns to select
        #[arg(short, long, value_delimiter = ',')]
        select: Vec<String>,

        /// Sort as "column" or "column:asc|desc"
        #[arg(short, long)]
        order: Vec<String>,

        #[arg(short, long)]
        limit: Option<u64>,

        #[arg(long)]
        offset: Option<u64>,

        /// Select COUNT(*)
        #[arg(long)]
        count: bool,

        /// Print the %d/%f/%s template and its arguments instead of inline SQL
        #[arg(short, long)]
        prepared: bool,
    },

    /// Manage the SQLite cache
    Cache {
        #[arg(value_enum)]
        action: CacheAction,
    },
}

#[derive(Clone, ValueEnum)]
enum DialectArg {
    Mysql,
    Sqlite,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Mysql => Dialect::MySql,
            DialectArg::Sqlite => Dialect::Sqlite,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum CacheAction {
    /// Show entry counts and size
    Stats,
    /// Remove every entry
    Clear,
    /// Remove expired entries
    Purge,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&settings.logging.level);

    match cli.command {
        Commands::Describe { ref table } => cmd_describe(&cli, &settings, table),
        Commands::Query {
            ref table,
            ref filters,
            ref select,
            ref order,
            limit,
            offset,
            count,
            prepared,
        } => {
            let args = QueryArgs {
                filters,
                select,
                order,
                limit,
                offset,
                count,
                prepared,
            };
            cmd_query(&cli, &settings, table, args)
        }
        Commands::Cache { ref action } => cmd_cache(&settings, action),
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn schema_cache(cli: &Cli, settings: &Settings) -> Result<SchemaCache, String> {
    let source: Arc<dyn SchemaSource> = if let Some(path) = &cli.schema {
        let schema = StaticSchema::from_file(path)
            .map_err(|e| format!("Error reading schema '{}': {}", path.display(), e))?;
        Arc::new(schema)
    } else {
        let path = match &cli.db {
            Some(path) => path.clone(),
            None => settings
                .database_path()
                .map_err(|e| e.to_string())?
                .ok_or("No schema source: pass --db or --schema, or set [database].path")?,
        };
        let db = SqliteDatabase::open(&path)
            .map_err(|e| format!("Error opening database '{}': {}", path.display(), e))?;
        Arc::new(db)
    };

    let store = settings.cache_store().map_err(|e| e.to_string())?;
    Ok(SchemaCache::new(source, store).with_ttl(settings.schema_ttl()))
}

fn cmd_describe(cli: &Cli, settings: &Settings, table: &str) -> ExitCode {
    let schema = match schema_cache(cli, settings) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let table = settings.table_name(table);
    let info = schema.get_table_info(&table);
    if info.is_empty() {
        eprintln!("Table '{}' not found or has no columns", table);
        return ExitCode::FAILURE;
    }

    match serde_json::to_string_pretty(&info.columns()) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error serializing columns: {}", e);
            ExitCode::FAILURE
        }
    }
}

struct QueryArgs<'a> {
    filters: &'a [String],
    select: &'a [String],
    order: &'a [String],
    limit: Option<u64>,
    offset: Option<u64>,
    count: bool,
    prepared: bool,
}

fn cmd_query(cli: &Cli, settings: &Settings, table: &str, args: QueryArgs<'_>) -> ExitCode {
    let schema = match schema_cache(cli, settings) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let dialect = cli
        .dialect
        .clone()
        .map(Dialect::from)
        .unwrap_or(settings.database.dialect);

    let mut query = schema
        .query(&settings.table_name(table))
        .dialect(dialect)
        .column_policy(settings.query.column_policy);

    for raw in args.filters {
        let Some((column, operator, value)) = parse_filter(raw) else {
            eprintln!("Could not parse filter '{}' (expected \"column OPERATOR value\")", raw);
            return ExitCode::FAILURE;
        };
        query = query.filter_op(&column, &operator, value);
    }

    if !args.select.is_empty() {
        query = query.select(args.select);
    }
    for raw in args.order {
        let Some((column, dir)) = parse_order(raw) else {
            eprintln!("Could not parse sort '{}' (expected \"column:asc|desc\")", raw);
            return ExitCode::FAILURE;
        };
        query = query.order_by(column, dir);
    }
    if let Some(n) = args.limit {
        query = query.limit(n);
    }
    if let Some(n) = args.offset {
        query = query.offset(n);
    }
    if args.count {
        query = query.count();
    }

    print_query(&query, args.prepared)
}

fn print_query(query: &QueryBuilder, prepared: bool) -> ExitCode {
    let stmt = match query.render_checked() {
        Ok(stmt) => stmt,
        Err(e) => {
            eprintln!("Query error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    for dropped in query.dropped() {
        eprintln!("-- {}", dropped);
    }

    if prepared {
        println!("{}", stmt.template());
        let args: Vec<Value> = stmt.args().into_iter().map(Value::from).collect();
        match serde_json::to_string(&args) {
            Ok(json) => println!("-- args: {}", json),
            Err(e) => {
                eprintln!("Error serializing arguments: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("{}", stmt.to_sql());
    }
    ExitCode::SUCCESS
}

static FILTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)^\s*(\w+)\s*(?:(not\s+between|not\s+like|not\s+in|between|like|in)\s+|(>=|<=|!=|=|>|<)\s*)(.*?)\s*$",
    )
    .expect("filter pattern is valid")
});

static RANGE_AND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+and\s+").expect("range pattern is valid"));

/// Split `column OPERATOR value` into parts. List operators take a
/// comma-separated value; BETWEEN also accepts `low AND high`.
fn parse_filter(raw: &str) -> Option<(String, String, Value)> {
    let caps = FILTER_RE.captures(raw)?;
    let column = caps[1].to_string();
    let operator = caps.get(2).or_else(|| caps.get(3))?.as_str();
    let operator = operator.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
    let value = caps[4].to_string();

    let value = match operator.as_str() {
        "IN" | "NOT IN" => split_list(&value, ','),
        "BETWEEN" | "NOT BETWEEN" if RANGE_AND_RE.is_match(&value) => Value::List(
            RANGE_AND_RE
                .splitn(&value, 2)
                .map(|s| Value::from(unquote(s)))
                .collect(),
        ),
        "BETWEEN" | "NOT BETWEEN" => split_list(&value, ','),
        _ => Value::from(unquote(&value)),
    };
    Some((column, operator, value))
}

fn split_list(value: &str, sep: char) -> Value {
    Value::List(
        value
            .split(sep)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Value::from(unquote(s)))
            .collect(),
    )
}

fn unquote(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
        .unwrap_or(s)
}

fn parse_order(raw: &str) -> Option<(&str, SortDir)> {
    match raw.split_once(':') {
        Some((column, dir)) => Some((column.trim(), SortDir::parse(dir)?)),
        None => Some((raw.trim(), SortDir::Asc)),
    }
}

fn cmd_cache(settings: &Settings, action: &CacheAction) -> ExitCode {
    let cache = match settings.cache.path.as_deref() {
        Some(path) => pressdb::config::expand_env_vars(path)
            .map_err(|e| e.to_string())
            .and_then(|p| SqliteCache::open_at(p).map_err(|e| e.to_string())),
        None => SqliteCache::open().map_err(|e| e.to_string()),
    };
    let cache = match cache {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error opening cache: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match action {
        CacheAction::Stats => cache.stats().map(|stats| {
            println!("entries:  {}", stats.entry_count);
            println!("expired:  {}", stats.expired_count);
            println!("size:     {} bytes", stats.total_size_bytes);
        }),
        CacheAction::Clear => {
            use pressdb::cache::CacheStore;
            cache.clear().map(|()| println!("Cache cleared"))
        }
        CacheAction::Purge => cache
            .purge_expired()
            .map(|n| println!("Removed {} expired entries", n)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Cache error: {}", e);
            ExitCode::FAILURE
        }
    }
}
