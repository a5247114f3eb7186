//! Archive storage configuration.
//!
//! Archived recordings are written to one of two backends:
//! - **S3**: S3-compatible object storage (default)
//! - **Filesystem**: a local directory, useful for development and tests
//!
//! # Example Configuration
//!
//! ```toml
//! [storage]
//! backend = "s3"
//!
//! [storage.s3]
//! bucket = "voicemail-archives"
//! region = "us-east-1"
//! # Credentials via env vars AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY
//! # or IAM role
//!
//! [storage.filesystem]
//! path = "/var/lib/voicemail-sweeper/archive"
//! ```

use serde::{Deserialize, Serialize};

/// Archive storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Storage backend to use.
    #[serde(default)]
    pub backend: ArchiveBackend,

    /// S3 configuration. Defaults to the `voicemail-archives` bucket with
    /// region and credentials taken from the AWS environment.
    #[serde(default)]
    pub s3: Option<S3StorageConfig>,

    /// Filesystem configuration (required when backend = "filesystem").
    #[serde(default)]
    pub filesystem: Option<FilesystemStorageConfig>,
}

impl StorageConfig {
    /// Validate the storage configuration.
    pub fn validate(&self) -> Result<(), String> {
        match self.backend {
            ArchiveBackend::S3 => match &self.s3 {
                Some(s3) => s3.validate(),
                None => Ok(()),
            },
            ArchiveBackend::Filesystem => match &self.filesystem {
                Some(fs) => fs.validate(),
                None => Err(
                    "Filesystem archive backend requires [storage.filesystem] configuration"
                        .to_string(),
                ),
            },
        }
    }

    /// S3 settings, falling back to defaults when the section is omitted.
    pub fn s3_or_default(&self) -> S3StorageConfig {
        self.s3.clone().unwrap_or_default()
    }
}

/// Archive storage backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum ArchiveBackend {
    /// S3-compatible object storage: AWS S3, MinIO, R2, etc.
    #[default]
    S3,

    /// Local filesystem directory.
    Filesystem,
}

/// S3-compatible object storage configuration.
#[derive(Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct S3StorageConfig {
    /// S3 bucket name.
    /// Default: "voicemail-archives"
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// AWS region (e.g., "us-east-1").
    /// If not specified, uses the AWS environment/profile.
    #[serde(default)]
    pub region: Option<String>,

    /// Custom endpoint URL for S3-compatible services.
    /// Examples:
    /// - MinIO: "http://localhost:9000"
    /// - R2: "https://<account-id>.r2.cloudflarestorage.com"
    #[serde(default)]
    pub endpoint: Option<String>,

    /// AWS access key ID.
    /// If not specified, uses environment variables or IAM role.
    #[serde(default)]
    pub access_key_id: Option<String>,

    /// AWS secret access key.
    /// If not specified, uses environment variables or IAM role.
    #[serde(default)]
    pub secret_access_key: Option<String>,

    /// Use path-style URLs instead of virtual-hosted style.
    /// Required for MinIO and some S3-compatible services.
    #[serde(default)]
    pub force_path_style: bool,

    /// Key prefix for all archived objects.
    /// Example: "voicemail/" stores objects as "voicemail/2024/3/9/..."
    #[serde(default)]
    pub key_prefix: Option<String>,

    /// Storage class for new objects (e.g., "GLACIER_IR", "DEEP_ARCHIVE").
    #[serde(default)]
    pub storage_class: Option<String>,

    /// Enable server-side encryption.
    #[serde(default)]
    pub server_side_encryption: Option<S3ServerSideEncryption>,
}

impl Default for S3StorageConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            region: None,
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            force_path_style: false,
            key_prefix: None,
            storage_class: None,
            server_side_encryption: None,
        }
    }
}

impl std::fmt::Debug for S3StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3StorageConfig")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field(
                "access_key_id",
                &self.access_key_id.as_ref().map(|_| "****"),
            )
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "****"),
            )
            .field("force_path_style", &self.force_path_style)
            .field("key_prefix", &self.key_prefix)
            .field("storage_class", &self.storage_class)
            .field("server_side_encryption", &self.server_side_encryption)
            .finish()
    }
}

fn default_bucket() -> String {
    "voicemail-archives".to_string()
}

impl S3StorageConfig {
    /// Validate S3 configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.bucket.is_empty() {
            return Err("S3 bucket name cannot be empty".to_string());
        }
        if self.access_key_id.is_some() != self.secret_access_key.is_some() {
            return Err(
                "S3 access_key_id and secret_access_key must be set together".to_string(),
            );
        }
        Ok(())
    }
}

/// S3 server-side encryption configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
#[serde(tag = "type", rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
pub enum S3ServerSideEncryption {
    /// Server-side encryption with Amazon S3-managed keys (SSE-S3).
    Aes256,

    /// Server-side encryption with AWS KMS keys (SSE-KMS).
    Kms {
        /// KMS key ID or ARN.
        key_id: String,
    },
}

/// Local filesystem archive configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct FilesystemStorageConfig {
    /// Base directory. Objects are stored as `{path}/{key}`.
    pub path: String,

    /// Key prefix for all archived objects.
    #[serde(default)]
    pub key_prefix: Option<String>,

    /// Create the base directory if it doesn't exist.
    /// Default: true
    #[serde(default = "default_true")]
    pub create_dir: bool,

    /// File permissions (Unix mode) for new files.
    /// Default: 0o600 (owner read/write only)
    #[serde(default = "default_file_mode")]
    pub file_mode: u32,

    /// Directory permissions (Unix mode) for new directories.
    /// Default: 0o700 (owner read/write/execute only)
    #[serde(default = "default_dir_mode")]
    pub dir_mode: u32,
}

impl FilesystemStorageConfig {
    /// Validate filesystem configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.path.is_empty() {
            return Err("Filesystem storage path cannot be empty".to_string());
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_file_mode() -> u32 {
    0o600
}

fn default_dir_mode() -> u32 {
    0o700
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_storage_config() {
        let config: StorageConfig = toml::from_str("").unwrap();
        assert_eq!(config.backend, ArchiveBackend::S3);
        assert!(config.s3.is_none());
        assert!(config.validate().is_ok());
        assert_eq!(config.s3_or_default().bucket, "voicemail-archives");
    }

    #[test]
    fn test_s3_backend() {
        let config: StorageConfig = toml::from_str(
            r#"
            backend = "s3"

            [s3]
            bucket = "my-bucket"
            region = "us-east-1"
            key_prefix = "vm/"
            "#,
        )
        .unwrap();

        let s3 = config.s3.as_ref().unwrap();
        assert_eq!(s3.bucket, "my-bucket");
        assert_eq!(s3.region.as_deref(), Some("us-east-1"));
        assert_eq!(s3.key_prefix.as_deref(), Some("vm/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_s3_half_credentials_rejected() {
        let config = S3StorageConfig {
            access_key_id: Some("AKIA".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_s3_debug_redacts_credentials() {
        let config = S3StorageConfig {
            access_key_id: Some("AKIAEXAMPLE".to_string()),
            secret_access_key: Some("topsecret".to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("AKIAEXAMPLE"));
        assert!(!debug.contains("topsecret"));
    }

    #[test]
    fn test_filesystem_backend_requires_section() {
        let config: StorageConfig = toml::from_str(r#"backend = "filesystem""#).unwrap();
        assert!(config.validate().is_err());

        let config: StorageConfig = toml::from_str(
            r#"
            backend = "filesystem"

            [filesystem]
            path = "/tmp/archive"
            "#,
        )
        .unwrap();
        assert!(config.validate().is_ok());
        let fs = config.filesystem.unwrap();
        assert!(fs.create_dir);
        assert_eq!(fs.file_mode, 0o600);
        assert_eq!(fs.dir_mode, 0o700);
    }

    #[test]
    fn test_sse_kms_parse() {
        let config: S3StorageConfig = toml::from_str(
            r#"
            bucket = "b"
            server_side_encryption = { type = "kms", key_id = "arn:aws:kms:key" }
            "#,
        )
        .unwrap();
        assert!(matches!(
            config.server_side_encryption,
            Some(S3ServerSideEncryption::Kms { .. })
        ));
    }
}
