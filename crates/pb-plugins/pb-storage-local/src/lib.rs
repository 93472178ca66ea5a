//! # pb-storage-local
//! pinboard/crates/pb-plugins/pb-storage-local/src/lib.rs
//! Local filesystem implementation of `FileStorage`.
//! Features: per-owner namespaces, one file per upload, directory sharding
//! by content hash.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use pb_core::error::{AppError, Result};
use pb_core::models::{new_id, StoredFile};
use pb_core::traits::FileStorage;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;

pub struct LocalFileStorage {
    /// Root directory for all uploads (e.g., "./data/uploads")
    root_path: PathBuf,
    /// Public URL prefix (e.g., "/static/uploads")
    url_prefix: String,
}

impl LocalFileStorage {
    pub fn new(root: PathBuf, url_prefix: impl Into<String>) -> Self {
        Self {
            root_path: root,
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    /// Generates a sharded key: "owner/ab/<upload id>.ext", where "ab" is the
    /// start of the content hash. Every upload gets its own file, so deleting
    /// one image never removes bytes another image still points to.
    fn sharded_key(owner_key: &str, hash: &str, extension: &str) -> String {
        format!("{owner_key}/{}/{}.{extension}", &hash[0..2], new_id())
    }

    /// Resolves a key below the root, refusing anything that could escape it.
    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !safe {
            return Err(AppError::ValidationError(format!("invalid storage key {key:?}")));
        }
        Ok(self.root_path.join(relative))
    }
}

fn io_err(err: std::io::Error) -> AppError {
    AppError::internal(err)
}

fn valid_owner(owner_key: &str) -> bool {
    !owner_key.is_empty()
        && owner_key != "."
        && owner_key != ".."
        && !owner_key.contains(['/', '\\'])
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    /// Saves an upload under a fresh key. Identical bytes uploaded twice are
    /// two files.
    async fn upload(&self, data: Bytes, owner_key: &str, file_name: &str) -> Result<StoredFile> {
        if !valid_owner(owner_key) {
            return Err(AppError::ValidationError(format!(
                "invalid owner key {owner_key:?}"
            )));
        }

        // 1. Sniff the bytes; the declared name is not trusted
        let format = image::guess_format(&data).map_err(|_| {
            AppError::ValidationError(format!("{file_name} is not a recognized image"))
        })?;
        let extension = format.extensions_str().first().copied().unwrap_or("bin");

        // 2. Calculate Hash
        let hash = hex::encode(Sha256::digest(&data));
        let key = Self::sharded_key(owner_key, &hash, extension);
        let target_path = self.resolve(&key)?;

        // 3. Ensure directory exists
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        // 4. Save, never over an existing file
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target_path)
            .await
            .map_err(io_err)?;
        file.write_all(&data).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)?;
        log::debug!("stored {file_name} as {key}");

        Ok(StoredFile {
            url: self.public_url(&key),
            key,
        })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::not_found("File", key))
            }
            Err(err) => Err(io_err(err)),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.url_prefix, key)
    }
}
