//! # pb-gateway-memory
//!
//! In-process implementation of every gateway port, backed by `DashMap`s.
//! Enforces the same constraints a relational backend would: unique
//! board/image pairs, cascading deletes and not-found reporting.
//! Used by tests and local demos; nothing survives the process.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use pb_core::error::{AppError, Result};
use pb_core::models::{
    new_id, Board, BoardPinLink, BoardUpdate, Image, NewBoard, NewImage, StoredFile,
};
use pb_core::traits::{BoardPinRepo, BoardRepo, FileStorage, Gateway, ImageRepo};

const URL_PREFIX: &str = "memory://images";

type PairKey = (String, String);

#[derive(Debug, Default)]
pub struct MemoryGateway {
    boards: DashMap<String, Board>,
    images: DashMap<String, Image>,
    links: DashMap<PairKey, BoardPinLink>,
    files: DashMap<String, Bytes>,
}

impl MemoryGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Wires this backend into every port of a [`Gateway`].
    pub fn gateway(self: &Arc<Self>) -> Gateway {
        Gateway::new(
            Arc::clone(self) as Arc<dyn BoardRepo>,
            Arc::clone(self) as Arc<dyn ImageRepo>,
            Arc::clone(self) as Arc<dyn BoardPinRepo>,
            Arc::clone(self) as Arc<dyn FileStorage>,
        )
    }

    /// Number of stored links for a pair. At most one by construction.
    pub fn link_count(&self, board_id: &str, image_id: &str) -> usize {
        self.links
            .iter()
            .filter(|entry| entry.board_id == board_id && entry.image_id == image_id)
            .count()
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn has_file(&self, key: &str) -> bool {
        self.files.contains_key(key)
    }
}

fn newest_first<T>(mut rows: Vec<T>, created: impl Fn(&T) -> (chrono::DateTime<Utc>, String)) -> Vec<T> {
    rows.sort_by(|a, b| created(b).cmp(&created(a)));
    rows
}

#[async_trait]
impl BoardRepo for MemoryGateway {
    async fn get_by_user_id(&self, user_id: &str) -> Result<Vec<Board>> {
        let rows: Vec<Board> = self
            .boards
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        Ok(newest_first(rows, |b: &Board| (b.created_at, b.id.clone())))
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Board>> {
        Ok(self.boards.get(id).map(|entry| entry.value().clone()))
    }

    async fn create(&self, board: NewBoard) -> Result<Board> {
        let now = Utc::now();
        let row = Board {
            id: new_id(),
            user_id: board.user_id,
            name: board.name,
            description: board.description,
            created_at: now,
            updated_at: now,
        };
        self.boards.insert(row.id.clone(), row.clone());
        Ok(row)
    }

    async fn update(&self, id: &str, changes: BoardUpdate) -> Result<Board> {
        let mut entry = self
            .boards
            .get_mut(id)
            .ok_or_else(|| AppError::not_found("Board", id))?;
        if let Some(name) = changes.name {
            entry.name = name;
        }
        if let Some(description) = changes.description {
            entry.description = description;
        }
        entry.updated_at = Utc::now();
        Ok(entry.value().clone())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.boards
            .remove(id)
            .ok_or_else(|| AppError::not_found("Board", id))?;
        self.links.retain(|(board_id, _), _| board_id != id);
        Ok(())
    }
}

#[async_trait]
impl ImageRepo for MemoryGateway {
    async fn get_by_user_id(&self, user_id: &str) -> Result<Vec<Image>> {
        let rows: Vec<Image> = self
            .images
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        Ok(newest_first(rows, |i: &Image| (i.created_at, i.id.clone())))
    }

    async fn create(&self, image: NewImage) -> Result<Image> {
        match self.images.entry(image.id.clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "image {} already exists",
                image.id
            ))),
            Entry::Vacant(slot) => {
                let row = Image {
                    id: image.id,
                    user_id: image.user_id,
                    filename: image.filename,
                    url: image.url,
                    title: image.title,
                    created_at: Utc::now(),
                };
                slot.insert(row.clone());
                Ok(row)
            }
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.images
            .remove(id)
            .ok_or_else(|| AppError::not_found("Image", id))?;
        self.links.retain(|(_, image_id), _| image_id != id);
        Ok(())
    }
}

#[async_trait]
impl BoardPinRepo for MemoryGateway {
    async fn get_by_board_id(&self, board_id: &str) -> Result<Vec<BoardPinLink>> {
        let rows: Vec<BoardPinLink> = self
            .links
            .iter()
            .filter(|entry| entry.board_id == board_id)
            .map(|entry| entry.value().clone())
            .collect();
        Ok(newest_first(rows, |l: &BoardPinLink| (l.created_at, l.id.clone())))
    }

    async fn create(&self, board_id: &str, image_id: &str) -> Result<BoardPinLink> {
        if !self.boards.contains_key(board_id) {
            return Err(AppError::not_found("Board", board_id));
        }
        if !self.images.contains_key(image_id) {
            return Err(AppError::not_found("Image", image_id));
        }
        match self.links.entry((board_id.to_string(), image_id.to_string())) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "image {image_id} is already saved to board {board_id}"
            ))),
            Entry::Vacant(slot) => {
                let row = BoardPinLink {
                    id: new_id(),
                    board_id: board_id.to_string(),
                    image_id: image_id.to_string(),
                    created_at: Utc::now(),
                };
                slot.insert(row.clone());
                Ok(row)
            }
        }
    }

    async fn delete(&self, board_id: &str, image_id: &str) -> Result<()> {
        self.links
            .remove(&(board_id.to_string(), image_id.to_string()))
            .map(|_| ())
            .ok_or_else(|| AppError::not_found("BoardPin", format!("{board_id}/{image_id}")))
    }
}

#[async_trait]
impl FileStorage for MemoryGateway {
    async fn upload(&self, data: Bytes, owner_key: &str, file_name: &str) -> Result<StoredFile> {
        let key = format!("{owner_key}/{}-{file_name}", new_id());
        self.files.insert(key.clone(), data);
        Ok(StoredFile {
            url: self.public_url(&key),
            key,
        })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.files
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| AppError::not_found("File", key))
    }

    fn public_url(&self, key: &str) -> String {
        format!("{URL_PREFIX}/{key}")
    }
}
