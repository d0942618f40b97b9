use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use rusqlite::{Connection, OpenFlags};
use serde::Serialize;
use tableschema_core::SchemaDefinition;
use tableschema_db::{SchemaCatalog, StoreConfig, ToolConfig, load_schema_file};
use tableschema_sqlite::{
    DatabaseStatus, MigrationPlan, MigrationReport, Migrator, SchemaManager, TableRows, ddl,
    database_status, export_table, import_rows,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "tableschema")]
#[command(about = "Declarative SQLite schemas with versioned upgrades")]
#[command(version)]
struct Cli {
    /// Log debug output from the tableschema crates to stderr.
    #[arg(long, global = true)]
    verbose: bool,
    /// YAML file with store and schema defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create or upgrade a database to a schema revision.
    Open(OpenArgs),
    /// Show what an upgrade would do without changing the database.
    Plan(PlanArgs),
    /// Show stored version, tables, and history of a database.
    Status(StatusArgs),
    /// Print the CREATE TABLE statements of a schema revision.
    Ddl(DdlArgs),
    /// Validate schema files and directories.
    Validate(ValidateArgs),
    /// Write the rows of one table as JSON.
    Export(ExportArgs),
    /// Insert JSON rows into a declared table.
    Import(ImportArgs),
}

/// Where the schema comes from. Flags override the config file.
#[derive(Debug, Args)]
struct SchemaArgs {
    /// Schema document (.json, .yaml, .yml).
    #[arg(long, conflicts_with = "schema_dir")]
    schema: Option<PathBuf>,
    /// Directory of schema documents.
    #[arg(long)]
    schema_dir: Option<PathBuf>,
    /// Database name to pick when the source holds several.
    #[arg(long)]
    name: Option<String>,
    /// Revision to use instead of the latest.
    #[arg(long = "revision")]
    revision: Option<u32>,
}

#[derive(Debug, Args)]
struct StoreArgs {
    /// Database file path.
    #[arg(long)]
    db: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct OpenArgs {
    #[command(flatten)]
    schema: SchemaArgs,
    #[command(flatten)]
    store: StoreArgs,
    /// Print the report as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct PlanArgs {
    #[command(flatten)]
    schema: SchemaArgs,
    #[command(flatten)]
    store: StoreArgs,
    /// Print the plan as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct StatusArgs {
    #[command(flatten)]
    schema: SchemaArgs,
    #[command(flatten)]
    store: StoreArgs,
    /// Print the status as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct DdlArgs {
    #[command(flatten)]
    schema: SchemaArgs,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// Schema files and/or directories of schema files.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct ExportArgs {
    #[command(flatten)]
    store: StoreArgs,
    /// Table to export.
    #[arg(long)]
    table: String,
    /// Output file; stdout when omitted.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ImportArgs {
    #[command(flatten)]
    schema: SchemaArgs,
    #[command(flatten)]
    store: StoreArgs,
    /// JSON file holding one `{ "name", "rows" }` object or an array of them.
    #[arg(long)]
    input: PathBuf,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Command::Open(args) => run_open(&config, args),
        Command::Plan(args) => run_plan(&config, args),
        Command::Status(args) => run_status(&config, args),
        Command::Ddl(args) => run_ddl(&config, args),
        Command::Validate(args) => run_validate(args),
        Command::Export(args) => run_export(&config, args),
        Command::Import(args) => run_import(&config, args),
    });

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("warn,tableschema_core=debug,tableschema_db=debug,tableschema_sqlite=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ToolConfig, String> {
    match path {
        Some(path) => ToolConfig::load(path)
            .map_err(|e| format!("Failed to load config '{}': {e}", path.display())),
        None => Ok(ToolConfig::default()),
    }
}

// ---------------------------------------------------------------------------
// open / plan / status
// ---------------------------------------------------------------------------

fn run_open(config: &ToolConfig, args: OpenArgs) -> Result<(), String> {
    let schema = resolve_schema(config, &args.schema)?;
    let store = store_config(config, &args.store)?;
    let manager = SchemaManager::open_with_config(&store, schema)
        .map_err(|e| format!("Failed to open database: {e}"))?;

    match manager.report() {
        Some(report) if args.json => print_json(report)?,
        Some(report) => print_report(report),
        None if args.json => println!("null"),
        None => println!(
            "Database '{}' is already at version {}.",
            manager.schema().name,
            manager.schema().version()
        ),
    }
    Ok(())
}

fn run_plan(config: &ToolConfig, args: PlanArgs) -> Result<(), String> {
    let schema = resolve_schema(config, &args.schema)?;
    let conn = open_existing(config, &args.store)?;
    let plan = Migrator::new(&schema)
        .plan(&conn)
        .map_err(|e| format!("Failed to plan: {e}"))?;

    if args.json {
        return print_json(&plan);
    }
    let stored = tableschema_sqlite::stored_version(&conn).map_err(|e| e.to_string())?;
    println!(
        "Plan for '{}' (stored version {stored}, declared version {}):",
        schema.name,
        schema.version()
    );
    print_plan(&plan);
    Ok(())
}

fn run_status(config: &ToolConfig, args: StatusArgs) -> Result<(), String> {
    let schema = resolve_schema(config, &args.schema)?;
    let conn = open_existing(config, &args.store)?;
    let status =
        database_status(&conn, &schema).map_err(|e| format!("Failed to read status: {e}"))?;

    if args.json {
        return print_json(&status);
    }
    print_status(&status);
    Ok(())
}

// ---------------------------------------------------------------------------
// ddl / validate
// ---------------------------------------------------------------------------

fn run_ddl(config: &ToolConfig, args: DdlArgs) -> Result<(), String> {
    let schema = resolve_schema(config, &args.schema)?;
    print!("{}", ddl::create_schema_sql(&schema));
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<(), String> {
    let mut files = 0usize;
    let mut catalog = SchemaCatalog::new();

    for input in &args.inputs {
        if input.is_dir() {
            let loaded = SchemaCatalog::from_dir(input)
                .map_err(|e| format!("'{}': {e}", input.display()))?;
            for name in loaded.names() {
                for version in loaded.revisions(name) {
                    if let Some(schema) = loaded.get(name, version) {
                        catalog.insert(schema.clone()).map_err(|e| e.to_string())?;
                        files += 1;
                    }
                }
            }
        } else {
            let schema =
                load_schema_file(input).map_err(|e| format!("'{}': {e}", input.display()))?;
            catalog
                .insert(schema)
                .map_err(|e| format!("'{}': {e}", input.display()))?;
            files += 1;
        }
    }

    for name in catalog.names() {
        let versions: Vec<String> = catalog
            .revisions(name)
            .iter()
            .map(|v| v.to_string())
            .collect();
        println!("  {name}: versions {}", versions.join(", "));
    }
    println!(
        "Validated {files} schema revision(s) for {} database(s).",
        catalog.names().count()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// export / import
// ---------------------------------------------------------------------------

fn run_export(config: &ToolConfig, args: ExportArgs) -> Result<(), String> {
    let conn = open_existing(config, &args.store)?;
    let rows = export_table(&conn, &args.table)
        .map_err(|e| format!("Failed to export '{}': {e}", args.table))?;
    let raw = serde_json::to_string_pretty(&rows)
        .map_err(|e| format!("Failed to serialize rows: {e}"))?;

    match &args.output {
        Some(path) => {
            fs::write(path, raw)
                .map_err(|e| format!("Failed to write '{}': {e}", path.display()))?;
            eprintln!(
                "Exported {} row(s) from '{}' to '{}'.",
                rows.rows.len(),
                args.table,
                path.display()
            );
        }
        None => println!("{raw}"),
    }
    Ok(())
}

fn run_import(config: &ToolConfig, args: ImportArgs) -> Result<(), String> {
    let raw = fs::read_to_string(&args.input)
        .map_err(|e| format!("Failed to read '{}': {e}", args.input.display()))?;
    let tables = parse_table_rows(&raw)
        .map_err(|e| format!("Failed to parse '{}': {e}", args.input.display()))?;

    let schema = resolve_schema(config, &args.schema)?;
    let store = store_config(config, &args.store)?;
    let mut manager = SchemaManager::open_with_config(&store, schema)
        .map_err(|e| format!("Failed to open database: {e}"))?;
    let schema = manager.schema().clone();

    for table in &tables {
        let inserted = import_rows(manager.connection_mut(), &schema, table)
            .map_err(|e| format!("Failed to import into '{}': {e}", table.name))?;
        println!("Imported {inserted} row(s) into '{}'.", table.name);
    }
    Ok(())
}

/// Accepts a single table object or an array of them.
fn parse_table_rows(raw: &str) -> Result<Vec<TableRows>, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    if value.is_array() {
        serde_json::from_value(value)
    } else {
        serde_json::from_value(value).map(|table| vec![table])
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Loads the schema revision named by the flags, falling back to the config.
fn resolve_schema(config: &ToolConfig, args: &SchemaArgs) -> Result<SchemaDefinition, String> {
    let mut source = config.schema.clone();
    if let Some(file) = &args.schema {
        source.file = Some(file.clone());
        source.dir = None;
    }
    if let Some(dir) = &args.schema_dir {
        source.dir = Some(dir.clone());
        source.file = None;
    }
    if args.name.is_some() {
        source.name = args.name.clone();
    }

    let catalog = match (&source.file, &source.dir) {
        (Some(file), None) => SchemaCatalog::from_file(file),
        (None, Some(dir)) => SchemaCatalog::from_dir(dir),
        (Some(file), Some(dir)) => SchemaCatalog::builder()
            .from_dir(dir)
            .from_file(file)
            .build(),
        (None, None) => {
            return Err(
                "No schema source: pass --schema or --schema-dir, or set `schema` in --config"
                    .to_string(),
            );
        }
    }
    .map_err(|e| format!("Failed to load schema: {e}"))?;

    let latest = catalog
        .resolve(source.name.as_deref())
        .map_err(|e| format!("Failed to pick schema: {e}"))?;
    let schema = match args.revision {
        Some(version) => catalog.get(&latest.name, version).ok_or_else(|| {
            format!("Schema '{}' has no revision {version}", latest.name)
        })?,
        None => latest,
    };
    Ok(schema.clone())
}

fn store_config(config: &ToolConfig, args: &StoreArgs) -> Result<StoreConfig, String> {
    let mut store = config.store.clone();
    if let Some(db) = &args.db {
        store.path = Some(db.clone());
        store.in_memory = false;
    }
    store.validate().map_err(|_| {
        "No database: pass --db or set `store.path` in --config".to_string()
    })?;
    Ok(store)
}

/// Opens a database read-only; it must already exist.
fn open_existing(config: &ToolConfig, args: &StoreArgs) -> Result<Connection, String> {
    let store = store_config(config, args)?;
    let path = store
        .path
        .filter(|_| !store.in_memory)
        .ok_or_else(|| "This command needs an on-disk database".to_string())?;
    Connection::open_with_flags(&path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|e| format!("Failed to open database '{}': {e}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let raw =
        serde_json::to_string_pretty(value).map_err(|e| format!("Failed to serialize: {e}"))?;
    println!("{raw}");
    Ok(())
}

fn print_report(report: &MigrationReport) {
    println!(
        "{:?} complete: version {} -> {}.",
        report.kind, report.from_version, report.to_version
    );
    print_names("Created", &report.created);
    print_names("Dropped", &report.dropped);
    for migration in &report.migrated {
        println!(
            "  Migrated: {} ({} row(s), kept {})",
            migration.table,
            migration.rows_copied,
            migration.preserved_columns.join(", ")
        );
    }
}

fn print_plan(plan: &MigrationPlan) {
    if plan.table_count() == 0 {
        println!("  Nothing to do.");
        return;
    }
    print_names("Create", &plan.to_create);
    print_names("Drop", &plan.to_drop);
    print_names("Migrate", &plan.to_migrate);
}

fn print_status(status: &DatabaseStatus) {
    println!("Database: {}", status.database_name);
    println!(
        "  Stored version: {} (declared {}{})",
        status.stored_version,
        status.declared_version,
        if status.is_current() { ", current" } else { "" }
    );
    println!("  Tables:");
    for table in &status.tables {
        println!(
            "    {} [{}] {} row(s)",
            table.name,
            table.columns.join(", "),
            table.row_count
        );
    }
    println!("  History:");
    for entry in &status.history {
        println!(
            "    {} -> {} at {}",
            entry.from_version, entry.to_version, entry.applied_at
        );
    }
}

fn print_names(label: &str, names: &[String]) {
    for name in names {
        println!("  {label}: {name}");
    }
}
