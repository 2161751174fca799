use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use filestore::{
    config::{Credentials, OversizePolicy, Pagination, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE},
    InputEntity, ListQuery, Service, StorageConfig,
};
use serde::Serialize;
use tracing::{error, info, span, Instrument, Level};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser)]
#[command(name = "filestore", version, about = "Upload, list, fetch and remove files in an S3 bucket")]
struct Cli {
    /// `s3://bucket/prefix` or a bare bucket name
    #[arg(long, env = "FILESTORE_BUCKET")]
    bucket: String,

    #[arg(long, env = "FILESTORE_REGION", default_value = "us-east-1")]
    region: String,

    /// S3-compatible endpoint, e.g. http://127.0.0.1:9000
    #[arg(long, env = "FILESTORE_ENDPOINT")]
    endpoint: Option<String>,

    #[arg(long, env = "FILESTORE_ACCESS_KEY_ID", requires = "secret_access_key")]
    access_key_id: Option<String>,

    #[arg(long, env = "FILESTORE_SECRET_ACCESS_KEY", hide_env_values = true, requires = "access_key_id")]
    secret_access_key: Option<String>,

    #[arg(long, env = "FILESTORE_PAGE_DEFAULT", default_value_t = DEFAULT_PAGE_SIZE)]
    page_default: u32,

    #[arg(long, env = "FILESTORE_PAGE_MAX", default_value_t = MAX_PAGE_SIZE)]
    page_max: u32,

    /// Fail `list` calls whose size is out of range instead of clamping
    #[arg(long)]
    reject_oversize: bool,

    /// Reject uploads larger than this many bytes
    #[arg(long, env = "FILESTORE_MAX_UPLOAD_SIZE")]
    max_upload_size: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload files concurrently
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(long, default_value = "")]
        mimetype: String,
    },
    List {
        #[arg(long)]
        size: Option<u32>,

        #[arg(long)]
        page_token: Option<String>,
    },
    Get {
        id: String,
    },
    /// Write the content of an object to a local file
    Download {
        id: String,
        path: PathBuf,
    },
    Remove {
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        ids: Vec<String>,

        /// Remove every object under the configured prefix
        #[arg(long)]
        all: bool,
    },
}

impl Cli {
    fn storage_config(&self) -> Result<StorageConfig, BoxError> {
        let mut config = StorageConfig::from_bucket_uri(&self.bucket, self.region.clone())?;
        config.endpoint = self.endpoint.clone();
        config.credentials = match (&self.access_key_id, &self.secret_access_key) {
            (Some(access_key_id), Some(secret_access_key)) => Some(Credentials {
                access_key_id: access_key_id.clone(),
                secret_access_key: secret_access_key.clone(),
            }),
            _ => None,
        };
        config.pagination = Pagination {
            default: self.page_default,
            max: self.page_max,
            policy: if self.reject_oversize {
                OversizePolicy::Reject
            } else {
                OversizePolicy::Clamp
            },
        };
        config.max_upload_size = self.max_upload_size;

        Ok(config)
    }
}

fn print_json(value: &impl Serialize) -> Result<(), BoxError> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

async fn upload(service: &Service, files: Vec<PathBuf>, mimetype: &str) -> Result<(), BoxError> {
    let total = files.len();
    let results = futures::future::join_all(files.into_iter().map(move |path| async move {
        let entity = InputEntity::from_path(&path)
            .await
            .map_err(|err| format!("failed to open {}: {}", path.display(), err))?
            .with_mimetype(mimetype);

        service.create(entity).await.map_err(BoxError::from)
    }))
    .await;

    let mut failed = 0;
    for result in results {
        match result {
            Ok(entity) => print_json(&entity)?,
            Err(err) => {
                error!(error_message=%err, error_group="upload");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(format!("{} of {} uploads failed", failed, total).into());
    }

    Ok(())
}

async fn list_all_ids(service: &Service) -> Result<Vec<String>, BoxError> {
    let mut ids = Vec::new();
    let mut query = ListQuery::with_size(service.config().pagination.max);

    loop {
        let data = service.list(query.clone()).await?;
        ids.extend(data.items.into_iter().map(|item| item.id));

        match data.next_page_token {
            Some(tok) => query.page_token = Some(tok),
            None => break,
        }
    }

    Ok(ids)
}

async fn remove(service: &Service, ids: Vec<String>) -> Result<(), BoxError> {
    let total = ids.len();
    let results =
        futures::future::join_all(ids.iter().map(|id| service.remove(id))).await;

    let mut failed = 0;
    for result in results {
        match result {
            Ok(entity) => print_json(&entity)?,
            Err(err) => {
                error!(error_message=%err, error_group="remove");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(format!("{} of {} removals failed", failed, total).into());
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<(), BoxError> {
    let config = cli.storage_config()?;
    info!(bucket = %config.bucket, prefix = %config.prefix, region = %config.region, "config");

    let service = Service::connect(config).await?;

    match cli.command {
        Command::Upload { files, mimetype } => upload(&service, files, &mimetype).await,
        Command::List { size, page_token } => {
            let data = service.list(ListQuery { size, page_token }).await?;
            print_json(&data)
        }
        Command::Get { id } => print_json(&service.get(&id).await?),
        Command::Download { id, path } => {
            let bytes = service.download(&id).await?;
            tokio::fs::write(&path, &bytes).await?;
            info!(id = %id, path = %path.display(), size = bytes.len(), "downloaded");
            Ok(())
        }
        Command::Remove { ids, all } => {
            let ids = if all { list_all_ids(&service).await? } else { ids };
            remove(&service, ids).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .json()
        .with_writer(std::io::stderr)
        .init();

    let span = span!(Level::INFO, "main", context = "main");
    let result = async {
        info!("called");
        run(Cli::parse()).await
    }
    .instrument(span)
    .await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error_message=%err, error_group="main");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_storage_config() {
        let cli = Cli::try_parse_from([
            "filestore",
            "--bucket",
            "s3://media/uploads",
            "--region",
            "eu-west-1",
            "--access-key-id",
            "id",
            "--secret-access-key",
            "secret",
            "--reject-oversize",
            "--max-upload-size",
            "1048576",
            "list",
            "--size",
            "5",
        ])
        .unwrap();

        let config = cli.storage_config().unwrap();

        assert_eq!(config.bucket, "media");
        assert_eq!(config.prefix, "uploads/");
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.pagination.policy, OversizePolicy::Reject);
        assert_eq!(config.max_upload_size, Some(1_048_576));
        assert_eq!(
            config.credentials.map(|c| c.access_key_id).as_deref(),
            Some("id")
        );
        assert!(matches!(cli.command, Command::List { size: Some(5), .. }));
    }

    #[test]
    fn test_remove_requires_ids_or_all() {
        let cases = vec![
            (vec!["filestore", "--bucket", "b", "remove"], false),
            (vec!["filestore", "--bucket", "b", "remove", "--all"], true),
            (vec!["filestore", "--bucket", "b", "remove", "k1", "k2"], true),
            (vec!["filestore", "--bucket", "b", "remove", "k1", "--all"], false),
        ];

        for (args, ok) in cases {
            assert_eq!(
                Cli::try_parse_from(&args).is_ok(),
                ok,
                "failed for case: {:?}",
                args
            );
        }
    }
}
