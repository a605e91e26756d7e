//! Scrubber CLI: strip image metadata and store uploads under time-ordered keys.
//!
//! Configuration comes from the environment (or `.env`): STORAGE_BACKEND,
//! LOCAL_STORAGE_PATH, KEY_PREFIX, REMOVE_EXIF, MAX_FILE_SIZE_MB.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use scrubber_cli::{
    format_size, init_tracing, log_app_error, read_media_file, upload_files, UploadRequest,
};
use scrubber_core::constants::MAX_BATCH_FILES;
use scrubber_core::{
    AnonymousIdentity, AppError, Config, ErrorMetadata, IdentityProvider, StaticIdentity,
};
use scrubber_processing::strip::{jpeg, png};
use scrubber_processing::{strip, ContainerFormat, KeyDeriver, Uploader};
use scrubber_storage::create_storage;

#[derive(Parser)]
#[command(name = "scrubber", about = "Scrubber upload CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Strip metadata from files and store each under a derived key
    Upload {
        /// Files to upload (at most 10); each succeeds or fails on its own
        #[arg(required = true, num_args = 1..=MAX_BATCH_FILES)]
        files: Vec<PathBuf>,
        /// Original key for a single file (defaults to {KEY_PREFIX}/{user-id}/{file name})
        #[arg(long)]
        key: Option<String>,
        /// Id of the user the upload belongs to
        #[arg(long)]
        user_id: Option<String>,
        /// Declared content type (guessed from the extension if omitted)
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Write a metadata-free copy of a JPEG or PNG
    Strip {
        input: PathBuf,
        output: PathBuf,
        /// Declared content type (guessed from the extension if omitted)
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Print the storage key that would be derived for a path
    Key {
        /// Original key, e.g. media/u123/photo.JPG
        path: String,
    },
    /// List the JPEG segments or PNG chunks of a file
    Inspect { file: PathBuf },
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        log_app_error(&err, "Command failed");
        eprintln!("error: {}", err);
        if let Some(action) = err.suggested_action() {
            eprintln!("hint: {}", action);
        }
        std::process::exit(err.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Commands::Upload {
            files,
            key,
            user_id,
            content_type,
        } => {
            let config = load_config()?;

            let identity: Arc<dyn IdentityProvider> = match &user_id {
                Some(id) => Arc::new(StaticIdentity::new(id.clone())),
                None => Arc::new(AnonymousIdentity),
            };
            let storage = create_storage(&config).await?;
            let uploader = Uploader::from_config(&config, storage, identity);

            let request = UploadRequest {
                key,
                key_prefix: config.key_prefix.clone(),
                user_id,
                content_type,
                max_file_size: config.max_file_size_bytes,
            };
            let reports = upload_files(&uploader, files, request).await?;
            println!("{}", serde_json::to_string_pretty(&reports)?);

            let failed = reports.iter().filter(|r| !r.is_ok()).count();
            if failed > 0 {
                return Err(AppError::Storage(format!(
                    "{} of {} uploads failed",
                    failed,
                    reports.len()
                )));
            }
        }
        Commands::Strip {
            input,
            output,
            content_type,
        } => {
            let config = load_config()?;
            let media =
                read_media_file(&input, content_type.as_deref(), config.max_file_size_bytes)
                    .await?;

            let stripped = strip(&media.data, &media.content_type);
            tokio::fs::write(&output, &stripped).await?;

            println!(
                "{} -> {} ({} -> {}, removed {})",
                input.display(),
                output.display(),
                format_size(media.len()),
                format_size(stripped.len()),
                format_size(media.len().saturating_sub(stripped.len()))
            );
        }
        Commands::Key { path } => {
            let key = KeyDeriver::system()
                .derive_storage_key(&path)
                .map_err(|e| AppError::Processing(e.to_string()))?;
            println!("{}", key);
        }
        Commands::Inspect { file } => {
            let data = tokio::fs::read(&file).await?;
            inspect(&data)?;
        }
    }

    Ok(())
}

fn load_config() -> Result<Config, AppError> {
    Config::from_env().map_err(|e| AppError::Config(e.to_string()))
}

fn inspect(data: &[u8]) -> Result<(), AppError> {
    match ContainerFormat::detect(data) {
        Some(ContainerFormat::Jpeg) => {
            let segments =
                jpeg::segments(data).map_err(|e| AppError::InvalidInput(e.to_string()))?;
            println!("JPEG, {} segments", segments.len());
            for segment in segments {
                let flag = if segment.is_app1() { "  [removed]" } else { "" };
                println!(
                    "{:>10}  {:<6} {:>10}{}",
                    segment.offset,
                    segment.name(),
                    segment.bytes.len(),
                    flag
                );
            }
        }
        Some(ContainerFormat::Png) => {
            let chunks = png::chunks(data).map_err(|e| AppError::InvalidInput(e.to_string()))?;
            println!("PNG, {} chunks", chunks.len());
            for chunk in chunks {
                let class = if chunk.is_ancillary() { "ancillary" } else { "critical" };
                let flag = if chunk.is_kept() { "" } else { "  [removed]" };
                println!(
                    "{:>10}  {:<6} {:<9} {:>10}{}",
                    chunk.offset,
                    chunk.type_str(),
                    class,
                    chunk.data_len,
                    flag
                );
            }
        }
        None => println!(
            "Not a JPEG or PNG file ({} bytes); uploads pass it through unchanged",
            data.len()
        ),
    }
    Ok(())
}
