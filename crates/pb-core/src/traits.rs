//! # Gateway Traits (Ports)
//!
//! Any backend plugin must implement these traits to be used by the store.
//! Every call either succeeds or returns a descriptive `AppError`; partial
//! success is never reported as success.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

use crate::error::Result;
use crate::models::{Board, BoardPinLink, BoardUpdate, Image, NewBoard, NewImage, StoredFile};

/// Persistence contract for boards.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait BoardRepo: Send + Sync {
    /// Newest first.
    async fn get_by_user_id(&self, user_id: &str) -> Result<Vec<Board>>;
    async fn get_by_id(&self, id: &str) -> Result<Option<Board>>;
    async fn create(&self, board: NewBoard) -> Result<Board>;
    /// Bumps `updated_at`. `NotFound` when the board does not exist.
    async fn update(&self, id: &str, changes: BoardUpdate) -> Result<Board>;
    /// Removes the board and every link that references it.
    /// `NotFound` when the board does not exist.
    async fn delete(&self, id: &str) -> Result<()>;
}

/// Persistence contract for image rows.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait ImageRepo: Send + Sync {
    /// Newest first.
    async fn get_by_user_id(&self, user_id: &str) -> Result<Vec<Image>>;
    /// `Conflict` when the id is taken.
    async fn create(&self, image: NewImage) -> Result<Image>;
    /// Removes the image and every link that references it.
    async fn delete(&self, id: &str) -> Result<()>;
}

/// Persistence contract for the board/image many-to-many relation.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait BoardPinRepo: Send + Sync {
    /// Newest first.
    async fn get_by_board_id(&self, board_id: &str) -> Result<Vec<BoardPinLink>>;
    /// `Conflict` when the pair is already linked.
    async fn create(&self, board_id: &str, image_id: &str) -> Result<BoardPinLink>;
    /// `NotFound` when the pair is not linked.
    async fn delete(&self, board_id: &str, image_id: &str) -> Result<()>;
}

/// File storage contract for uploaded images.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Stores the bytes under the owner's namespace.
    async fn upload(&self, data: Bytes, owner_key: &str, file_name: &str) -> Result<StoredFile>;
    async fn delete(&self, key: &str) -> Result<()>;
    /// Returns the public URL for a stored key. Does not check existence.
    fn public_url(&self, key: &str) -> String;
}

/// The remote backend as seen by the store: one implementation per port.
#[derive(Clone)]
pub struct Gateway {
    pub boards: Arc<dyn BoardRepo>,
    pub images: Arc<dyn ImageRepo>,
    pub board_pins: Arc<dyn BoardPinRepo>,
    pub storage: Arc<dyn FileStorage>,
}

impl Gateway {
    pub fn new(
        boards: Arc<dyn BoardRepo>,
        images: Arc<dyn ImageRepo>,
        board_pins: Arc<dyn BoardPinRepo>,
        storage: Arc<dyn FileStorage>,
    ) -> Self {
        Self {
            boards,
            images,
            board_pins,
            storage,
        }
    }
}
