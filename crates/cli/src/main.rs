use std::path::PathBuf;

use clap::{Parser, Subcommand};
use drivebucket_config::Settings;
use drivebucket_services::DriveSession;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "drivebucket", version, about = "S3-style buckets on Google Drive")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the folder ID a bucket name resolves to
    Bucket { name: String },
    /// Check whether a key exists in a bucket
    Exists { bucket: String, key: String },
    /// Upload a local file, replacing any file of the same name
    Upload {
        local: PathBuf,
        bucket: String,
        /// Remote name, defaults to the local file name
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        keep_local: bool,
    },
    /// Download a key to a local path
    Download {
        bucket: String,
        key: String,
        dest: PathBuf,
    },
    /// Print the first rows of a CSV key
    ReadCsv {
        bucket: String,
        key: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Create a folder under a parent bucket
    Mkdir { folder: String, parent: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "drivebucket_services=info,drivebucket=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let settings = Settings::load()?;
    let session = DriveSession::connect(settings).await?;
    let storage = session.storage();

    match cli.command {
        Command::Bucket { name } => {
            println!("{}", storage.get_bucket(&name).await?);
        }
        Command::Exists { bucket, key } => {
            let exists = storage.key_exists(&bucket, &key).await?;
            println!("{}", exists);
            if !exists {
                std::process::exit(1);
            }
        }
        Command::Upload {
            local,
            bucket,
            name,
            keep_local,
        } => {
            let remote_name = match name {
                Some(name) => name,
                None => local
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .ok_or_else(|| anyhow::anyhow!("{} has no file name", local.display()))?,
            };
            let id = storage
                .upload_file(&local, &remote_name, &bucket, !keep_local)
                .await?;
            println!("{}", id);
        }
        Command::Download { bucket, key, dest } => {
            let bytes = storage.download_file(&key, &bucket, &dest).await?;
            info!(bytes, dest = %dest.display(), "Download complete");
        }
        Command::ReadCsv { bucket, key, limit } => {
            let table = storage.read_table(&key, &bucket).await?;
            println!("{}", table.columns().join(","));
            for row in table.rows().iter().take(limit) {
                let cells: Vec<&str> = row.iter().map(|c| c.as_deref().unwrap_or("NA")).collect();
                println!("{}", cells.join(","));
            }
            info!(rows = table.len(), shown = limit.min(table.len()), "Read CSV");
        }
        Command::Mkdir { folder, parent } => {
            println!("{}", storage.create_folder(&folder, &parent).await?);
        }
    }

    Ok(())
}
