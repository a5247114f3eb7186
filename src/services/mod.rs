//! External collaborators of the sweep engine: the recordings API and
//! archive storage.

mod archive_storage;
mod recordings_api;

#[cfg(feature = "s3-storage")]
pub use archive_storage::S3ArchiveStorage;
pub use archive_storage::{
    ArchiveStorage, ArchiveStorageError, ArchiveStorageResult, FilesystemArchiveStorage,
    archive_key, create_archive_storage,
};
pub use recordings_api::RecordingsClient;
