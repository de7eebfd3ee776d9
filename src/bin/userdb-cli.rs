use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use userdb::{Collection, Record, RecordId, RecordService, RecordStore};

/// Offline maintenance of a userdb data file
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Data file to operate on
    #[clap(short, long, default_value = "data.json")]
    file: PathBuf,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write an empty collection if the file does not exist
    Init,
    /// Print every record
    List,
    /// Append a record given as a JSON object
    Create { record: String },
    /// Shallow-merge a JSON object into the record with this id
    Update { id: String, patch: String },
    /// Remove the record with this id
    Delete { id: String },
}

fn parse_record(text: &str) -> Result<Record, String> {
    serde_json::from_str::<Record>(text)
        .map_err(|e| format!("argument is not a JSON object: {}", e))
}

enum Outcome {
    Initialized { created: bool },
    Collection(Collection),
}

async fn execute(file: &Path, command: Command) -> Result<Outcome, String> {
    let service = RecordService::new(RecordStore::new(file));

    let collection = match command {
        Command::Init => {
            let created = service.store().init_if_missing().map_err(|e| e.to_string())?;
            return Ok(Outcome::Initialized { created });
        }
        Command::List => service.list(),
        Command::Create { record } => service.create(parse_record(&record)?).await,
        Command::Update { id, patch } => {
            service.update(RecordId::parse(&id), parse_record(&patch)?).await
        }
        Command::Delete { id } => service.delete(RecordId::parse(&id)).await,
    }
    .map_err(|e| e.to_string())?;
    Ok(Outcome::Collection(collection))
}

async fn run() -> Result<(), String> {
    let args = Args::parse();
    let display = args.file.display();

    match execute(&args.file, args.command).await? {
        Outcome::Initialized { created: true } => {
            println!("Created empty collection at {}", display)
        }
        Outcome::Initialized { created: false } => println!("{} already exists", display),
        Outcome::Collection(collection) => {
            let output = serde_json::to_string_pretty(&collection).map_err(|e| e.to_string())?;
            println!("{}", output);
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
