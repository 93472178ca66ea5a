//! Shared fixtures for the cross-crate tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use pb_core::error::Result;
use pb_core::models::{Board, BoardUpdate, ImageUpload, NewBoard, SessionUser};
use pb_core::traits::{BoardRepo, Gateway};
use pb_gateway_memory::MemoryGateway;
use pb_store::{BoardStore, StoreConfig};

/// Smallest byte string the storage plugins recognise as PNG.
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

pub fn session_user() -> SessionUser {
    SessionUser::new("user-1", "jane.doe@example.com")
}

/// A store over a fresh in-memory backend. The backend handle lets tests
/// inspect or change remote state behind the store's back.
pub fn memory_session() -> (Arc<MemoryGateway>, BoardStore) {
    let backend = MemoryGateway::new();
    let store = BoardStore::new(backend.gateway(), session_user(), StoreConfig::default());
    (backend, store)
}

pub fn png_upload(file_name: &str, title: Option<&str>) -> ImageUpload {
    ImageUpload {
        file_name: file_name.to_string(),
        content_type: "image/png".to_string(),
        data: Bytes::from_static(PNG_BYTES),
        title: title.map(str::to_string),
    }
}

/// Board repository over the in-memory backend that answers listings and
/// updates only after `delay`, keeping a store operation in flight.
pub struct SlowBoards {
    backend: Arc<MemoryGateway>,
    delay: Duration,
}

#[async_trait]
impl BoardRepo for SlowBoards {
    async fn get_by_user_id(&self, user_id: &str) -> Result<Vec<Board>> {
        let boards = BoardRepo::get_by_user_id(self.backend.as_ref(), user_id).await?;
        tokio::time::sleep(self.delay).await;
        Ok(boards)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Board>> {
        self.backend.get_by_id(id).await
    }

    async fn create(&self, board: NewBoard) -> Result<Board> {
        BoardRepo::create(self.backend.as_ref(), board).await
    }

    async fn update(&self, id: &str, changes: BoardUpdate) -> Result<Board> {
        tokio::time::sleep(self.delay).await;
        self.backend.update(id, changes).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        BoardRepo::delete(self.backend.as_ref(), id).await
    }
}

/// Like [`memory_session`], with board listings and updates slowed down.
pub fn slow_session(delay: Duration) -> (Arc<MemoryGateway>, Arc<BoardStore>) {
    let backend = MemoryGateway::new();
    let gateway = Gateway {
        boards: Arc::new(SlowBoards {
            backend: Arc::clone(&backend),
            delay,
        }),
        ..backend.gateway()
    };
    let store = BoardStore::new(gateway, session_user(), StoreConfig::default());
    (backend, Arc::new(store))
}
