use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use revised::{Database, DatabaseConfig, QueryResult, SchemaSpec};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "rustmemodb-revised")]
#[command(about = "Inspect record types and their synthesized history types")]
struct Cli {
    /// Database configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Declare the models of a JSON file and print every resulting type
    Inspect { path: PathBuf },
    /// Print the field types and the constructor arguments each accepts
    FieldTypes,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Inspect { path } => inspect(&path, load_config(cli.config.as_deref())?),
        Command::FieldTypes => {
            QueryResult::field_types().print();
            println!("Accepted by every type: {}", QueryResult::common_arguments());
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<DatabaseConfig> {
    let Some(path) = path else {
        return Ok(DatabaseConfig::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    DatabaseConfig::from_json(&raw)
        .with_context(|| format!("Failed to parse config {}", path.display()))
}

fn inspect(path: &Path, config: DatabaseConfig) -> Result<()> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let spec = SchemaSpec::from_json(&raw)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    if spec.models.is_empty() {
        return Err(anyhow!("{} declares no models", path.display()));
    }

    let db = Database::with_config(config);
    let models = spec
        .define_all(&db)
        .with_context(|| format!("Failed to declare models from {}", path.display()))?;

    for model in models {
        println!("{} (table {})", model.qualified_name(), model.meta().db_table);
        QueryResult::describe(&model).print();

        if let Some(settings) = model.meta().revised_settings() {
            let history = settings.revision_model()?;
            println!(
                "\n{} (table {}, accessor '{}')",
                history.qualified_name(),
                history.meta().db_table,
                settings.related_name
            );
            QueryResult::describe(history).print();
            if db.admin().is_registered(history) {
                println!("registered with admin site '{}'", db.admin().name());
            }
        }
        println!();
    }
    Ok(())
}
