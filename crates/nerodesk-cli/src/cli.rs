//! Command-line arguments.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `NERODESK_CONFIG` | - | JSON store configuration file |
//! | `NERODESK_LOG_LEVEL` | warn | Log level |
//! | `NERODESK_IDENTITY` | - | Acting identity |
//! | `NERODESK_TENANT` | acting identity | Collection owner to address |
//! | `NERODESK_BACKEND` | from config | `memory` or `s3` |
//! | `NERODESK_S3_BUCKET` | nerodesk | Bucket |
//! | `NERODESK_S3_PREFIX` | - | Key prefix |
//! | `NERODESK_S3_REGION` | us-east-1 | Region |
//! | `NERODESK_S3_ENDPOINT` | - | Custom endpoint (MinIO etc.) |
//! | `NERODESK_S3_ALLOW_HTTP` | false | Allow plain HTTP endpoints |
//! | `NERODESK_S3_PATH_STYLE` | false | Force path-style addressing |
//! | `NERODESK_REQUEST_TIMEOUT` | 10s | Per-call object store timeout |
//! | `NERODESK_LOCK_TIMEOUT` | 5s | Per-document lock wait |

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use nerodesk_store::backends::s3::S3BackendConfig;
use nerodesk_store::{BackendConfig, Identity, StoreConfig};

/// Operate a Nerodesk document store.
#[derive(Debug, Parser)]
#[command(name = "nerodesk", version, about = "Nerodesk document store driver")]
pub struct Cli {
    /// JSON configuration file; flags below override it.
    #[arg(long, env = "NERODESK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "NERODESK_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Identity performing the operation.
    #[arg(long, short = 'i', env = "NERODESK_IDENTITY")]
    pub identity: String,

    /// Owner of the collection to address (defaults to the acting identity).
    #[arg(long, short = 't', env = "NERODESK_TENANT")]
    pub tenant: Option<String>,

    /// Storage backend.
    #[arg(long, env = "NERODESK_BACKEND", value_enum)]
    pub backend: Option<BackendChoice>,

    /// S3 bucket.
    #[arg(long, env = "NERODESK_S3_BUCKET")]
    pub bucket: Option<String>,

    /// S3 key prefix.
    #[arg(long, env = "NERODESK_S3_PREFIX")]
    pub prefix: Option<String>,

    /// S3 region.
    #[arg(long, env = "NERODESK_S3_REGION")]
    pub region: Option<String>,

    /// Custom S3 endpoint.
    #[arg(long, env = "NERODESK_S3_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Allow plain HTTP endpoints.
    #[arg(long, env = "NERODESK_S3_ALLOW_HTTP")]
    pub allow_http: bool,

    /// Use path-style instead of virtual-hosted-style requests.
    #[arg(long, env = "NERODESK_S3_PATH_STYLE")]
    pub path_style: bool,

    /// Static access key ID.
    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    pub access_key_id: Option<String>,

    /// Static secret access key.
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub secret_access_key: Option<String>,

    /// Upper bound for each object store call (e.g. "10s").
    #[arg(long, env = "NERODESK_REQUEST_TIMEOUT", value_parser = humantime::parse_duration)]
    pub request_timeout: Option<Duration>,

    /// Upper bound for waiting on a document lock (e.g. "5s").
    #[arg(long, env = "NERODESK_LOCK_TIMEOUT", value_parser = humantime::parse_duration)]
    pub lock_timeout: Option<Duration>,

    #[command(subcommand)]
    pub command: Command,
}

/// Backend selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendChoice {
    /// Process-local; contents vanish when the command exits.
    Memory,
    /// S3 or compatible object storage.
    S3,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write a document from a file ("-" for stdin).
    Put { name: String, file: PathBuf },
    /// Write a document to stdout or a file.
    Get {
        name: String,
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
    /// Write a byte range of a document to stdout.
    Range {
        name: String,
        offset: u64,
        length: u64,
        /// Fail instead of clamping when the range runs past the end.
        #[arg(long)]
        strict: bool,
    },
    /// Delete a document and its attributes.
    Delete { name: String },
    /// Grant an identity read access.
    AddFriend { name: String, friend: String },
    /// Revoke an identity's read access.
    EjectFriend { name: String, friend: String },
    /// Make a document public or private.
    SetVisibility {
        name: String,
        #[arg(action = clap::ArgAction::Set)]
        visible: bool,
    },
    /// Print a document's attributes as JSON.
    Attributes { name: String },
    /// List the collection's documents.
    List,
    /// Upload a file in chunks through the partitioned transfer engine.
    Upload {
        name: String,
        file: PathBuf,
        /// Chunk size in bytes.
        #[arg(long, default_value_t = 5 * 1024 * 1024)]
        chunk_size: usize,
    },
    /// Check that the backend is reachable.
    Health,
}

impl Cli {
    /// Returns the acting identity.
    pub fn acting(&self) -> Identity {
        Identity::new(self.identity.clone())
    }

    /// Returns the addressed collection owner.
    pub fn tenant(&self) -> Identity {
        Identity::new(self.tenant.clone().unwrap_or_else(|| self.identity.clone()))
    }

    /// Loads the configuration file, if any, and applies flag overrides.
    pub async fn store_config(&self) -> anyhow::Result<StoreConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => StoreConfig::default(),
        };

        if let Some(timeout) = self.lock_timeout {
            config.lock_timeout_ms = timeout.as_millis() as u64;
        }

        match self.backend {
            Some(BackendChoice::Memory) => config.backend = BackendConfig::Memory,
            Some(BackendChoice::S3) => {
                if !matches!(config.backend, BackendConfig::S3(_)) {
                    config.backend = BackendConfig::S3(S3BackendConfig::default());
                }
            }
            None => {}
        }

        if let BackendConfig::S3(s3) = &mut config.backend {
            self.apply_s3_overrides(s3);
        }

        Ok(config)
    }

    fn apply_s3_overrides(&self, s3: &mut S3BackendConfig) {
        if let Some(bucket) = &self.bucket {
            s3.bucket = bucket.clone();
        }
        if self.prefix.is_some() {
            s3.prefix = self.prefix.clone();
        }
        if let Some(region) = &self.region {
            s3.region = region.clone();
        }
        if self.endpoint.is_some() {
            s3.endpoint = self.endpoint.clone();
        }
        if self.allow_http {
            s3.allow_http = true;
        }
        if self.path_style {
            s3.virtual_hosted_style_request = false;
        }
        if self.access_key_id.is_some() {
            s3.access_key_id = self.access_key_id.clone();
        }
        if self.secret_access_key.is_some() {
            s3.secret_access_key = self.secret_access_key.clone();
        }
        if let Some(timeout) = self.request_timeout {
            s3.request_timeout_ms = timeout.as_millis() as u64;
        }
    }
}
