use clap::Parser;
use serde_json::Value;
use shelf::error::{Result, ShelfError};
use shelf::filter::{parse_scalar, FieldFilter};
use shelf::registry::FORMATS;
use shelf::{Collection, CollectionConfig, Entry, Payload, Query};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod args;
use args::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Logs go to stderr; stdout carries only command output.
fn init_tracing(verbose: bool) {
    let default = if verbose { "shelf=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("SHELF_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    match cli.command {
        Commands::List {
            dir,
            filters,
            order_by,
            head,
            tail,
            fields,
        } => handle_list(&dir, &config, &filters, order_by, head, tail, &fields),
        Commands::Count { dir, filters } => handle_count(&dir, &config, &filters),
        Commands::Show { dir, file } => handle_show(&dir, &config, &file),
        Commands::Add { dir, set, path } => handle_add(&dir, &config, &set, path),
        Commands::Delete { dir, file } => handle_delete(&dir, &config, &file),
        Commands::Formats => handle_formats(),
    }
}

fn load_config(cli: &Cli) -> Result<CollectionConfig> {
    let mut config = match &cli.config {
        Some(path) => CollectionConfig::load(path)?,
        None => CollectionConfig::default(),
    };
    if let Some(format) = &cli.format {
        config.format = Some(format.clone());
    }
    if let Some(field) = &cli.body_field {
        config.body_field = Some(field.clone());
    }
    if cli.recursive {
        config.recursive = true;
    }
    Ok(config)
}

fn filtered<'c>(
    collection: &'c Collection<Payload>,
    filters: &[String],
) -> Result<Query<'c, Payload>> {
    let mut query = collection.query();
    for raw in filters {
        let filter: FieldFilter = raw.parse()?;
        query = query.filter_field(filter);
    }
    Ok(query)
}

fn handle_list(
    dir: &Path,
    config: &CollectionConfig,
    filters: &[String],
    order_by: Option<String>,
    head: Option<i64>,
    tail: Option<i64>,
    fields: &[String],
) -> Result<()> {
    let collection: Collection<Payload> = Collection::open(dir, config)?;
    let mut query = filtered(&collection, filters)?;
    if let Some(field) = order_by {
        query = query.order_by(&field);
    }
    if let Some(n) = head {
        query = query.try_head(n)?;
    }
    if let Some(n) = tail {
        query = query.try_tail(n)?;
    }

    for entry in query.iter()? {
        println!("{}", render_line(&collection, &entry, fields));
    }
    Ok(())
}

/// `path<TAB>field<TAB>field...`, or the path and the compact record (without
/// its body) when no fields are requested.
fn render_line(
    collection: &Collection<Payload>,
    entry: &Entry<Payload>,
    fields: &[String],
) -> String {
    let path = collection
        .path_for(entry)
        .map(|p| relative(collection.root(), &p))
        .unwrap_or_default();
    let record = entry.borrow();

    if fields.is_empty() {
        let body_field = collection
            .body_field()
            .unwrap_or(shelf::handlers::DEFAULT_BODY_FIELD);
        let summary: Payload = record
            .iter()
            .filter(|(key, _)| key.as_str() != body_field)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        return format!("{}\t{}", path, Value::Object(summary));
    }

    let mut line = path;
    for field in fields {
        line.push('\t');
        match record.get(field) {
            Some(Value::String(s)) => line.push_str(s),
            Some(other) => line.push_str(&other.to_string()),
            None => {}
        }
    }
    line
}

fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn handle_count(dir: &Path, config: &CollectionConfig, filters: &[String]) -> Result<()> {
    let collection: Collection<Payload> = Collection::open(dir, config)?;
    println!("{}", filtered(&collection, filters)?.count()?);
    Ok(())
}

fn handle_show(dir: &Path, config: &CollectionConfig, file: &Path) -> Result<()> {
    let collection: Collection<Payload> = Collection::open(dir, config)?;
    let entry = collection.get(file)?.ok_or_else(|| {
        ShelfError::MissingPath(format!(
            "no {} record at {}",
            collection.format(),
            file.display()
        ))
    })?;
    let rendered = serde_json::to_string_pretty(&*entry.borrow())?;
    println!("{}", rendered);
    Ok(())
}

fn handle_add(
    dir: &Path,
    config: &CollectionConfig,
    assignments: &[String],
    path: Option<PathBuf>,
) -> Result<()> {
    let mut record = Payload::new();
    for assignment in assignments {
        let (field, raw) = assignment.split_once('=').ok_or_else(|| {
            ShelfError::Validation(format!(
                "invalid assignment '{}': expected field=value",
                assignment
            ))
        })?;
        record.insert(field.trim().to_string(), parse_scalar(raw.trim()));
    }

    let mut collection: Collection<Payload> = Collection::open_or_default(dir, config)?;
    let entry = Entry::new(record);
    let written = match path {
        Some(path) => collection.add_at(&entry, path)?,
        None => collection.add(&entry)?,
    };
    println!("{}", written.display());
    Ok(())
}

fn handle_delete(dir: &Path, config: &CollectionConfig, file: &Path) -> Result<()> {
    let mut collection: Collection<Payload> = Collection::open(dir, config)?;
    collection.delete(file)?;
    println!("Deleted {}", file.display());
    Ok(())
}

fn handle_formats() -> Result<()> {
    for spec in FORMATS {
        println!(
            "{:<10}{:<20}names: {}",
            spec.format.name(),
            spec.format.extensions().join(", "),
            spec.names.join(", ")
        );
    }
    Ok(())
}
