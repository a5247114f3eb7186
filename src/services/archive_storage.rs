//! Durable storage for archived recordings.
//!
//! Two backends sit behind the [`ArchiveStorage`] trait:
//!
//! - **S3**: S3-compatible object storage (requires the `s3-storage` feature)
//! - **Filesystem**: a local directory
//!
//! Backends receive a relative key built by [`archive_key`] and apply their
//! own `key_prefix`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Datelike;
use thiserror::Error;
#[cfg(feature = "s3-storage")]
use tracing::error;
use tracing::{debug, info, instrument};

#[cfg(feature = "s3-storage")]
use crate::config::S3StorageConfig;
use crate::{
    config::{ArchiveBackend, FilesystemStorageConfig, StorageConfig},
    models::{ParentCall, Recording},
};

/// Errors that can occur while writing to archive storage.
#[derive(Debug, Error)]
pub enum ArchiveStorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("S3 error: {0}")]
    S3(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type ArchiveStorageResult<T> = Result<T, ArchiveStorageError>;

/// A place archived recordings are written to.
///
/// Implementations are shared by every in-flight record action and must be
/// safe for concurrent use.
#[async_trait]
pub trait ArchiveStorage: Send + Sync {
    /// Store `content` under `key` and return the full location written.
    async fn store(&self, key: &str, content: Bytes) -> ArchiveStorageResult<String>;

    /// Backend name, for logging.
    fn backend_name(&self) -> &'static str;
}

/// Build the archive key for a recording:
/// `{year}/{month}/{day}/{from}_{YYYYMMDDTHH:MM:SS}_UTC.{ext}`.
///
/// Month and day are not zero-padded. Path separators in the caller
/// identifier are replaced so a key always has exactly four segments.
pub fn archive_key(recording: &Recording, call: &ParentCall, ext: &str) -> String {
    let created = recording.date_created;
    let from = call.from.replace(['/', '\\'], "_");
    format!(
        "{}/{}/{}/{}_{}_UTC.{}",
        created.year(),
        created.month(),
        created.day(),
        from,
        created.format("%Y%m%dT%H:%M:%S"),
        ext
    )
}

fn prefixed(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => {
            format!("{}/{}", prefix.trim_end_matches('/'), key)
        }
        _ => key.to_string(),
    }
}

/// Filesystem archive backend.
///
/// Objects are stored as `{path}/{key_prefix}/{key}`, creating intermediate
/// directories as needed.
pub struct FilesystemArchiveStorage {
    config: FilesystemStorageConfig,
}

impl FilesystemArchiveStorage {
    pub fn new(config: FilesystemStorageConfig) -> ArchiveStorageResult<Self> {
        let path = Path::new(&config.path);
        if !path.exists() {
            if !config.create_dir {
                return Err(ArchiveStorageError::Config(format!(
                    "archive directory {} does not exist and create_dir is false",
                    config.path
                )));
            }
            info!(path = %config.path, "Creating archive directory");
            create_dirs(path, config.dir_mode)?;
        }
        Ok(Self { config })
    }

    fn object_path(&self, key: &str) -> PathBuf {
        Path::new(&self.config.path).join(prefixed(self.config.key_prefix.as_deref(), key))
    }
}

fn create_dirs(path: &Path, mode: u32) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        std::fs::DirBuilder::new()
            .recursive(true)
            .mode(mode)
            .create(path)
    }
    #[cfg(not(unix))]
    {
        let _ = mode;
        std::fs::create_dir_all(path)
    }
}

#[async_trait]
impl ArchiveStorage for FilesystemArchiveStorage {
    #[instrument(skip(self, content), fields(size = content.len()))]
    async fn store(&self, key: &str, content: Bytes) -> ArchiveStorageResult<String> {
        let path = self.object_path(key);
        if let Some(parent) = path.parent() {
            let parent = parent.to_path_buf();
            let mode = self.config.dir_mode;
            tokio::task::spawn_blocking(move || create_dirs(&parent, mode))
                .await
                .map_err(|e| ArchiveStorageError::Io(std::io::Error::other(e)))??;
        }

        // Write to a temp file first, then rename so readers never see a partial object
        let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
        temp_name.push(".tmp");
        let temp_path = path.with_file_name(temp_name);

        tokio::fs::write(&temp_path, &content).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(
                &temp_path,
                std::fs::Permissions::from_mode(self.config.file_mode),
            )
            .await?;
        }

        tokio::fs::rename(&temp_path, &path).await?;

        debug!(key, path = %path.display(), "Archived to filesystem");
        Ok(path.to_string_lossy().to_string())
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}

/// S3-compatible object storage backend.
///
/// Works with AWS S3, MinIO, Cloudflare R2 and other S3-compatible services.
#[cfg(feature = "s3-storage")]
pub struct S3ArchiveStorage {
    config: S3StorageConfig,
    client: aws_sdk_s3::Client,
}

#[cfg(feature = "s3-storage")]
impl S3ArchiveStorage {
    pub async fn new(config: S3StorageConfig) -> ArchiveStorageResult<Self> {
        info!(bucket = %config.bucket, "Initializing S3 archive storage");

        let mut sdk_config_builder = aws_config::defaults(aws_config::BehaviorVersion::latest());

        if let Some(region) = &config.region {
            sdk_config_builder = sdk_config_builder.region(aws_config::Region::new(region.clone()));
        }

        if let (Some(access_key), Some(secret_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            let credentials = aws_credential_types::Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                None,
                None,
                "voicemail-sweeper-config",
            );
            sdk_config_builder = sdk_config_builder.credentials_provider(credentials);
        }

        let sdk_config = sdk_config_builder.load().await;

        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }
        if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = aws_sdk_s3::Client::from_conf(s3_config_builder.build());

        Ok(Self { config, client })
    }

    fn object_key(&self, key: &str) -> String {
        prefixed(self.config.key_prefix.as_deref(), key)
    }
}

#[cfg(feature = "s3-storage")]
#[async_trait]
impl ArchiveStorage for S3ArchiveStorage {
    #[instrument(skip(self, content), fields(size = content.len(), bucket = %self.config.bucket))]
    async fn store(&self, key: &str, content: Bytes) -> ArchiveStorageResult<String> {
        let object_key = self.object_key(key);

        let mut request = self
            .client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&object_key)
            .body(aws_sdk_s3::primitives::ByteStream::from(content));

        if let Some(storage_class) = &self.config.storage_class {
            request = request.storage_class(storage_class.as_str().into());
        }

        if let Some(sse) = &self.config.server_side_encryption {
            match sse {
                crate::config::S3ServerSideEncryption::Aes256 => {
                    request = request
                        .server_side_encryption(aws_sdk_s3::types::ServerSideEncryption::Aes256);
                }
                crate::config::S3ServerSideEncryption::Kms { key_id } => {
                    request = request
                        .server_side_encryption(aws_sdk_s3::types::ServerSideEncryption::AwsKms)
                        .ssekms_key_id(key_id);
                }
            }
        }

        request.send().await.map_err(|e| {
            error!(error = %e, key = %object_key, "Failed to upload to S3");
            ArchiveStorageError::S3(e.to_string())
        })?;

        debug!(key = %object_key, bucket = %self.config.bucket, "Archived to S3");
        Ok(format!("s3://{}/{}", self.config.bucket, object_key))
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}

/// Create an archive storage backend from configuration.
pub async fn create_archive_storage(
    config: &StorageConfig,
) -> ArchiveStorageResult<Arc<dyn ArchiveStorage>> {
    match config.backend {
        ArchiveBackend::Filesystem => {
            let fs_config = config.filesystem.clone().ok_or_else(|| {
                ArchiveStorageError::Config(
                    "Filesystem backend requires [storage.filesystem] config".to_string(),
                )
            })?;
            info!(path = %fs_config.path, "Using filesystem archive backend");
            Ok(Arc::new(FilesystemArchiveStorage::new(fs_config)?))
        }
        #[cfg(feature = "s3-storage")]
        ArchiveBackend::S3 => {
            let s3_config = config.s3_or_default();
            info!(bucket = %s3_config.bucket, "Using S3 archive backend");
            Ok(Arc::new(S3ArchiveStorage::new(s3_config).await?))
        }
        #[cfg(not(feature = "s3-storage"))]
        ArchiveBackend::S3 => Err(ArchiveStorageError::Config(
            "S3 archive backend requires the 's3-storage' feature. \
                Rebuild with: cargo build --features s3-storage"
                .to_string(),
        )),
    }
}
