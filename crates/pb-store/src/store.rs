//! # BoardStore
//!
//! Per-session mirror of the signed-in user's boards, images and board-pin
//! links, kept consistent with the gateway.
//!
//! Every mutation follows the same shape: validate, take the per-key locks,
//! call the gateway (bounded by the configured timeout), and only then touch
//! the mirror. Mutations share the sync gate; a full load holds it
//! exclusively so a confirmed mutation is never overwritten by a stale fetch. Pins and pin counts are always rebuilt from the mirrored rows
//! and never adjusted arithmetically.
//!
//! Failures are returned as `Err` and also recorded in a single last-error
//! slot for the UI banner. Nothing is retried.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use pb_core::error::{AppError, Result};
use pb_core::models::{
    new_id, Board, BoardPinLink, BoardSummary, BoardUpdate, Comment, Image, ImageUpload, NewBoard,
    NewImage, Pin, SessionUser,
};
use pb_core::traits::Gateway;
use pb_core::validation;
use serde::Serialize;
use tokio::sync::{RwLock, RwLockReadGuard};

use crate::comments::CommentStore;
use crate::config::StoreConfig;
use crate::join::{join_pins, summarize_board, summarize_boards};
use crate::locks::{board_key, board_name_key, pin_key, KeyGuard, KeyedLocks};

/// Groups operations for error bookkeeping. A success clears the last error
/// only when it was recorded by an operation of the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Load,
    Board,
    Pin,
    Image,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorState {
    pub kind: OperationKind,
    pub message: String,
}

/// Read-only copy of the mirror handed to search and rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub boards: Vec<Board>,
    pub pins: Vec<Pin>,
}

#[derive(Debug, Default)]
struct Mirror {
    boards: Vec<Board>,
    images: Vec<Image>,
    links: Vec<BoardPinLink>,
    pins: Vec<Pin>,
}

impl Mirror {
    fn new(boards: Vec<Board>, images: Vec<Image>, links: Vec<BoardPinLink>) -> Self {
        let mut mirror = Self {
            boards,
            images,
            links,
            pins: Vec::new(),
        };
        mirror.rebuild_pins();
        mirror
    }

    fn rebuild_pins(&mut self) {
        self.pins = join_pins(&self.images, &self.links);
    }

    fn pin(&self, pin_id: &str) -> Option<&Pin> {
        self.pins.iter().find(|pin| pin.id == pin_id)
    }

    fn has_image(&self, image_id: &str) -> bool {
        self.images.iter().any(|image| image.id == image_id)
    }

    fn has_link(&self, board_id: &str, image_id: &str) -> bool {
        self.links
            .iter()
            .any(|link| link.board_id == board_id && link.image_id == image_id)
    }

    /// Newest first, like a fresh load.
    fn insert_image(&mut self, image: Image) {
        self.images.retain(|existing| existing.id != image.id);
        self.images.insert(0, image);
        self.rebuild_pins();
    }

    fn remove_image(&mut self, image_id: &str) {
        self.images.retain(|image| image.id != image_id);
        self.links.retain(|link| link.image_id != image_id);
        self.rebuild_pins();
    }

    fn remove_board(&mut self, board_id: &str) {
        self.boards.retain(|board| board.id != board_id);
        self.links.retain(|link| link.board_id != board_id);
        self.rebuild_pins();
    }

    /// Swaps in the authoritative link list of one board.
    fn replace_board_links(&mut self, board_id: &str, links: Vec<BoardPinLink>) {
        self.links.retain(|link| link.board_id != board_id);
        self.links.extend(links);
        self.rebuild_pins();
    }

    fn push_link(&mut self, link: BoardPinLink) {
        if !self.has_link(&link.board_id, &link.image_id) {
            self.links.push(link);
            self.rebuild_pins();
        }
    }

    fn drop_link(&mut self, board_id: &str, image_id: &str) {
        self.links
            .retain(|link| !(link.board_id == board_id && link.image_id == image_id));
        self.rebuild_pins();
    }
}

/// Counts one pending load; released even if the load future is dropped
/// mid-flight.
struct LoadingFlag<'a>(&'a AtomicUsize);

impl<'a> LoadingFlag<'a> {
    fn raise(pending: &'a AtomicUsize) -> Self {
        pending.fetch_add(1, Ordering::SeqCst);
        Self(pending)
    }
}

impl Drop for LoadingFlag<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct BoardStore {
    gateway: Gateway,
    user: SessionUser,
    config: StoreConfig,
    mirror: RwLock<Mirror>,
    comments: CommentStore,
    locks: KeyedLocks,
    /// Shared by mutations, held exclusively by `load_user_data`.
    sync_gate: RwLock<()>,
    last_error: Mutex<Option<ErrorState>>,
    loading: AtomicUsize,
}

impl BoardStore {
    pub fn new(gateway: Gateway, user: SessionUser, config: StoreConfig) -> Self {
        Self {
            gateway,
            user,
            config,
            mirror: RwLock::new(Mirror::default()),
            comments: CommentStore::new(),
            locks: KeyedLocks::new(),
            sync_gate: RwLock::new(()),
            last_error: Mutex::new(None),
            loading: AtomicUsize::new(0),
        }
    }

    pub fn user(&self) -> &SessionUser {
        &self.user
    }

    // ── Loading ─────────────────────────────────────────────────────────────

    /// Replaces the mirror with the user's boards, images and links.
    /// On failure the previous mirror is kept as-is.
    ///
    /// Waits for in-flight mutations to finish and holds new ones off until
    /// the fetched state is in place.
    pub async fn load_user_data(&self) -> Result<()> {
        let _loading = LoadingFlag::raise(&self.loading);
        let _gate = self.sync_gate.write().await;
        let result = match self.fetch_user_data().await {
            Ok(fresh) => {
                log::info!(
                    "loaded {} boards, {} images, {} links for user {}",
                    fresh.boards.len(),
                    fresh.images.len(),
                    fresh.links.len(),
                    self.user.id
                );
                *self.mirror.write().await = fresh;
                Ok(())
            }
            Err(err) => Err(err),
        };
        self.settle(OperationKind::Load, result)
    }

    async fn fetch_user_data(&self) -> Result<Mirror> {
        let boards = self
            .call("boards.get_by_user_id", self.gateway.boards.get_by_user_id(&self.user.id))
            .await?;
        let images = self
            .call("images.get_by_user_id", self.gateway.images.get_by_user_id(&self.user.id))
            .await?;

        let mut links = Vec::new();
        for board in &boards {
            let board_links = self
                .call(
                    "board_pins.get_by_board_id",
                    self.gateway.board_pins.get_by_board_id(&board.id),
                )
                .await?;
            links.extend(board_links);
        }

        Ok(Mirror::new(boards, images, links))
    }

    /// True while any load is running or waiting to run.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst) > 0
    }

    async fn enter(&self) -> RwLockReadGuard<'_, ()> {
        self.sync_gate.read().await
    }

    /// Locks board-name keys in a fixed order, each distinct key once.
    async fn lock_names(&self, names: &[&str]) -> Vec<KeyGuard> {
        let mut keys: Vec<String> = names.iter().map(|name| board_name_key(name)).collect();
        keys.sort();
        keys.dedup();
        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            guards.push(self.locks.lock(key).await);
        }
        guards
    }

    // ── Boards ──────────────────────────────────────────────────────────────

    /// Validates locally, persists, then appends. Nothing is inserted before
    /// the gateway confirms.
    pub async fn create_board(&self, name: &str, description: Option<&str>) -> Result<Board> {
        let result = self.try_create_board(name, description).await;
        self.settle(OperationKind::Board, result)
    }

    async fn try_create_board(&self, name: &str, description: Option<&str>) -> Result<Board> {
        let name = validation::board_name(name)?;
        let _gate = self.enter().await;
        let _name_lock = self.locks.lock(board_name_key(&name)).await;

        let new_board = NewBoard {
            user_id: self.user.id.clone(),
            name,
            description: validation::description(description),
        };
        let board = self
            .call("boards.create", self.gateway.boards.create(new_board))
            .await?;

        self.mirror.write().await.boards.push(board.clone());
        log::info!("created board {} ({:?})", board.id, board.name);
        Ok(board)
    }

    /// Renames a board and/or edits its description.
    pub async fn update_board(&self, board_id: &str, changes: BoardUpdate) -> Result<Board> {
        let result = self.try_update_board(board_id, changes).await;
        self.settle(OperationKind::Board, result)
    }

    async fn try_update_board(&self, board_id: &str, changes: BoardUpdate) -> Result<Board> {
        let changes = BoardUpdate {
            name: changes
                .name
                .as_deref()
                .map(validation::board_name)
                .transpose()?,
            description: changes
                .description
                .map(|description| validation::description(description.as_deref())),
        };

        let _gate = self.enter().await;
        let _board_lock = self.locks.lock(board_key(board_id)).await;
        // A rename frees the old name and claims the new one.
        let _name_locks = match &changes.name {
            Some(new_name) => {
                let old_name = self
                    .mirror
                    .read()
                    .await
                    .boards
                    .iter()
                    .find(|board| board.id == board_id)
                    .map(|board| board.name.clone());
                let mut names = vec![new_name.as_str()];
                names.extend(old_name.as_deref());
                self.lock_names(&names).await
            }
            None => Vec::new(),
        };

        let board = self
            .call("boards.update", self.gateway.boards.update(board_id, changes))
            .await?;

        let mut mirror = self.mirror.write().await;
        match mirror.boards.iter_mut().find(|existing| existing.id == board.id) {
            Some(existing) => *existing = board.clone(),
            None => mirror.boards.push(board.clone()),
        }
        log::info!("updated board {}", board.id);
        Ok(board)
    }

    /// Deletes the board and every link to it.
    ///
    /// A gateway "not found" still cleans the mirror, since the board is gone
    /// either way, but is reported as an error.
    pub async fn delete_board(&self, board_id: &str) -> Result<()> {
        let result = self.try_delete_board(board_id).await;
        self.settle(OperationKind::Board, result)
    }

    async fn try_delete_board(&self, board_id: &str) -> Result<()> {
        let _gate = self.enter().await;
        let _board_lock = self.locks.lock(board_key(board_id)).await;
        let name = self
            .mirror
            .read()
            .await
            .boards
            .iter()
            .find(|board| board.id == board_id)
            .map(|board| board.name.clone());
        let _name_locks = match &name {
            Some(name) => self.lock_names(&[name.as_str()]).await,
            None => Vec::new(),
        };

        let outcome = self
            .call("boards.delete", self.gateway.boards.delete(board_id))
            .await;
        if matches!(&outcome, Err(err) if !err.is_not_found()) {
            return outcome;
        }
        if outcome.is_err() {
            log::warn!("board {board_id} was already gone remotely");
        }

        self.mirror.write().await.remove_board(board_id);
        log::info!("deleted board {board_id}");
        outcome
    }

    // ── Pins ────────────────────────────────────────────────────────────────

    /// Saves a pin to a board, creating its image row first if this session
    /// has never seen it. Saving to a board it is already on is a no-op.
    ///
    /// After the link is confirmed the board's links are reloaded from the
    /// gateway, so counts reflect the source of truth.
    pub async fn save_pin_to_board(
        &self,
        pin_id: &str,
        board_id: &str,
        image_url: &str,
        title: &str,
    ) -> Result<Pin> {
        let result = self
            .try_save_pin_to_board(pin_id, board_id, image_url, title)
            .await;
        self.settle(OperationKind::Pin, result)
    }

    async fn try_save_pin_to_board(
        &self,
        pin_id: &str,
        board_id: &str,
        image_url: &str,
        title: &str,
    ) -> Result<Pin> {
        let _gate = self.enter().await;
        let _pin_lock = self.locks.lock(pin_key(pin_id)).await;
        let _board_lock = self.locks.lock(board_key(board_id)).await;

        let (image_known, already_linked) = {
            let mirror = self.mirror.read().await;
            (mirror.has_image(pin_id), mirror.has_link(board_id, pin_id))
        };

        if already_linked {
            log::debug!("pin {pin_id} is already on board {board_id}");
            return self.mirrored_pin(pin_id).await;
        }

        if !image_known {
            let new_image = NewImage {
                id: pin_id.to_string(),
                user_id: self.user.id.clone(),
                // External image: nothing in our storage to clean up later.
                filename: String::new(),
                url: image_url.to_string(),
                title: title.to_string(),
            };
            let image = self
                .call("images.create", self.gateway.images.create(new_image))
                .await?;
            self.mirror.write().await.insert_image(image);
        }

        let created = match self
            .call("board_pins.create", self.gateway.board_pins.create(board_id, pin_id))
            .await
        {
            Ok(link) => Some(link),
            Err(err) if err.is_conflict() => {
                log::debug!("pin {pin_id} was already linked to board {board_id} remotely");
                None
            }
            Err(err) => return Err(err),
        };

        match self.reload_board_links(board_id).await {
            Ok(()) => {}
            Err(err) => {
                if let Some(link) = created {
                    self.mirror.write().await.push_link(link);
                }
                return Err(err);
            }
        }

        log::info!("saved pin {pin_id} to board {board_id}");
        self.mirrored_pin(pin_id).await
    }

    /// Removes a pin from a board. The image itself is kept.
    pub async fn remove_pin_from_board(&self, pin_id: &str, board_id: &str) -> Result<()> {
        let result = self.try_remove_pin_from_board(pin_id, board_id).await;
        self.settle(OperationKind::Pin, result)
    }

    async fn try_remove_pin_from_board(&self, pin_id: &str, board_id: &str) -> Result<()> {
        let _gate = self.enter().await;
        let _pin_lock = self.locks.lock(pin_key(pin_id)).await;
        let _board_lock = self.locks.lock(board_key(board_id)).await;

        self.call(
            "board_pins.delete",
            self.gateway.board_pins.delete(board_id, pin_id),
        )
        .await?;

        if let Err(err) = self.reload_board_links(board_id).await {
            self.mirror.write().await.drop_link(board_id, pin_id);
            return Err(err);
        }

        log::info!("removed pin {pin_id} from board {board_id}");
        Ok(())
    }

    async fn reload_board_links(&self, board_id: &str) -> Result<()> {
        let links = self
            .call(
                "board_pins.get_by_board_id",
                self.gateway.board_pins.get_by_board_id(board_id),
            )
            .await?;
        self.mirror
            .write()
            .await
            .replace_board_links(board_id, links);
        Ok(())
    }

    async fn mirrored_pin(&self, pin_id: &str) -> Result<Pin> {
        self.mirror
            .read()
            .await
            .pin(pin_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("Pin", pin_id))
    }

    // ── Images ──────────────────────────────────────────────────────────────

    /// Stores the file, then records it as an image. If the row insert
    /// fails the stored file is deleted again.
    pub async fn upload_image(&self, upload: ImageUpload) -> Result<Pin> {
        let result = self.try_upload_image(upload).await;
        self.settle(OperationKind::Image, result)
    }

    async fn try_upload_image(&self, upload: ImageUpload) -> Result<Pin> {
        validation::image_upload(&upload)?;
        let _gate = self.enter().await;

        let stored = self
            .call(
                "storage.upload",
                self.gateway
                    .storage
                    .upload(upload.data.clone(), &self.user.id, &upload.file_name),
            )
            .await?;

        let title = upload
            .title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .unwrap_or(upload.file_name.as_str())
            .to_string();
        let new_image = NewImage {
            id: new_id(),
            user_id: self.user.id.clone(),
            filename: stored.key.clone(),
            url: stored.url.clone(),
            title,
        };

        let image = match self
            .call("images.create", self.gateway.images.create(new_image))
            .await
        {
            Ok(image) => image,
            Err(err) => {
                if let Err(cleanup) = self
                    .call("storage.delete", self.gateway.storage.delete(&stored.key))
                    .await
                {
                    log::warn!("orphaned upload {}: {cleanup}", stored.key);
                }
                return Err(err);
            }
        };

        let pin_id = image.id.clone();
        self.mirror.write().await.insert_image(image);
        log::info!("uploaded image {pin_id} as {}", stored.key);
        self.mirrored_pin(&pin_id).await
    }

    /// Deletes the image row (and with it every link), then its file.
    /// A failure to delete the file is logged, not reported.
    pub async fn delete_image(&self, image_id: &str) -> Result<()> {
        let result = self.try_delete_image(image_id).await;
        self.settle(OperationKind::Image, result)
    }

    async fn try_delete_image(&self, image_id: &str) -> Result<()> {
        let _gate = self.enter().await;
        let _pin_lock = self.locks.lock(pin_key(image_id)).await;
        let stored_key = self
            .mirror
            .read()
            .await
            .images
            .iter()
            .find(|image| image.id == image_id)
            .map(|image| image.filename.clone())
            .filter(|key| !key.is_empty());

        self.call("images.delete", self.gateway.images.delete(image_id))
            .await?;
        self.mirror.write().await.remove_image(image_id);

        if let Some(key) = stored_key {
            if let Err(err) = self
                .call("storage.delete", self.gateway.storage.delete(&key))
                .await
            {
                log::warn!("image {image_id} deleted but file {key} remains: {err}");
            }
        }
        log::info!("deleted image {image_id}");
        Ok(())
    }

    // ── Comments ────────────────────────────────────────────────────────────

    /// Local only: the comment is not sent to the gateway and is lost when
    /// the store is dropped.
    pub fn add_comment(&self, pin_id: &str, text: &str) -> Comment {
        self.comments.add_comment(pin_id, self.user.handle(), text)
    }

    pub fn comments(&self, pin_id: &str) -> Vec<Comment> {
        self.comments.comments(pin_id)
    }

    // ── Reads ───────────────────────────────────────────────────────────────

    pub async fn boards(&self) -> Vec<BoardSummary> {
        let mirror = self.mirror.read().await;
        summarize_boards(&mirror.boards, &mirror.images, &mirror.links)
    }

    pub async fn board(&self, board_id: &str) -> Option<BoardSummary> {
        let mirror = self.mirror.read().await;
        mirror
            .boards
            .iter()
            .find(|board| board.id == board_id)
            .map(|board| summarize_board(board, &mirror.images, &mirror.links))
    }

    pub async fn pins(&self) -> Vec<Pin> {
        self.mirror.read().await.pins.clone()
    }

    pub async fn pin(&self, pin_id: &str) -> Option<Pin> {
        self.mirror.read().await.pin(pin_id).cloned()
    }

    pub async fn pins_in_board(&self, board_id: &str) -> Vec<Pin> {
        self.mirror
            .read()
            .await
            .pins
            .iter()
            .filter(|pin| pin.board_ids.iter().any(|id| id == board_id))
            .cloned()
            .collect()
    }

    pub async fn snapshot(&self) -> Snapshot {
        let mirror = self.mirror.read().await;
        Snapshot {
            boards: mirror.boards.clone(),
            pins: mirror.pins.clone(),
        }
    }

    // ── Errors ──────────────────────────────────────────────────────────────

    pub fn last_error(&self) -> Option<String> {
        self.error_state().map(|state| state.message)
    }

    pub fn error_state(&self) -> Option<ErrorState> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Clears the banner regardless of which operation set it.
    pub fn dismiss_error(&self) {
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn settle<T>(&self, kind: OperationKind, result: Result<T>) -> Result<T> {
        let mut slot = self.last_error.lock().unwrap_or_else(PoisonError::into_inner);
        match &result {
            Ok(_) => {
                if slot.as_ref().is_some_and(|state| state.kind == kind) {
                    *slot = None;
                }
            }
            Err(err) => {
                log::warn!("{kind:?} operation failed: {err}");
                *slot = Some(ErrorState {
                    kind,
                    message: err.to_string(),
                });
            }
        }
        result
    }

    /// Runs one gateway call under the configured timeout.
    async fn call<T>(&self, what: &str, request: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.config.gateway_timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout(format!(
                "{what} did not complete within {}s",
                self.config.gateway_timeout.as_secs()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;
    use chrono::Utc;
    use pb_core::models::StoredFile;
    use pb_core::traits::{
        BoardRepo, MockBoardPinRepo, MockBoardRepo, MockFileStorage, MockImageRepo,
    };

    struct Mocks {
        boards: MockBoardRepo,
        images: MockImageRepo,
        board_pins: MockBoardPinRepo,
        storage: MockFileStorage,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                boards: MockBoardRepo::new(),
                images: MockImageRepo::new(),
                board_pins: MockBoardPinRepo::new(),
                storage: MockFileStorage::new(),
            }
        }

        fn into_store(self) -> BoardStore {
            let gateway = Gateway::new(
                Arc::new(self.boards),
                Arc::new(self.images),
                Arc::new(self.board_pins),
                Arc::new(self.storage),
            );
            BoardStore::new(gateway, user(), StoreConfig::default())
        }
    }

    fn user() -> SessionUser {
        SessionUser::new("u1", "jane@example.com")
    }

    fn board(id: &str, name: &str) -> Board {
        Board {
            id: id.into(),
            user_id: "u1".into(),
            name: name.into(),
            description: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn image(id: &str) -> Image {
        Image {
            id: id.into(),
            user_id: "u1".into(),
            filename: String::new(),
            url: format!("https://cdn.test/{id}.jpg"),
            title: "Lake".into(),
            created_at: Utc::now(),
        }
    }

    fn link(board_id: &str, image_id: &str) -> BoardPinLink {
        BoardPinLink {
            id: format!("{board_id}:{image_id}"),
            board_id: board_id.into(),
            image_id: image_id.into(),
            created_at: Utc::now(),
        }
    }

    fn expect_single_board(mocks: &mut Mocks) {
        mocks
            .boards
            .expect_get_by_user_id()
            .returning(|_| Ok(vec![board("b1", "Travel")]));
        mocks.images.expect_get_by_user_id().returning(|_| Ok(vec![]));
        mocks
            .board_pins
            .expect_get_by_board_id()
            .returning(|_| Ok(vec![]));
    }

    #[tokio::test]
    async fn test_create_board_failure_leaves_boards_untouched() {
        let mut mocks = Mocks::new();
        expect_single_board(&mut mocks);
        mocks
            .boards
            .expect_create()
            .times(1)
            .returning(|_| Err(AppError::Internal("connection reset".into())));
        let store = mocks.into_store();

        store.load_user_data().await.unwrap();
        let before = store.boards().await;

        let err = store.create_board("Recipes", None).await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(store.boards().await, before);
        assert!(!store.last_error().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_name_never_reaches_gateway() {
        let mut mocks = Mocks::new();
        mocks.boards.expect_create().never();
        let store = mocks.into_store();

        let err = store.create_board("   ", Some("desc")).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert_eq!(store.error_state().unwrap().kind, OperationKind::Board);
        assert!(store.boards().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_mirror() {
        let mut mocks = Mocks::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        mocks.boards.expect_get_by_user_id().returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(vec![board("b1", "Travel")])
            } else {
                Err(AppError::Internal("offline".into()))
            }
        });
        mocks
            .images
            .expect_get_by_user_id()
            .returning(|_| Ok(vec![image("p1")]));
        mocks
            .board_pins
            .expect_get_by_board_id()
            .returning(|_| Ok(vec![link("b1", "p1")]));
        let store = mocks.into_store();

        store.load_user_data().await.unwrap();
        assert!(store.load_user_data().await.is_err());

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.boards().await.len(), 1);
        assert_eq!(store.pins().await[0].board_ids, vec!["b1"]);
        assert_eq!(store.error_state().unwrap().kind, OperationKind::Load);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_success_clears_only_errors_of_its_kind() {
        let mut mocks = Mocks::new();
        mocks
            .boards
            .expect_get_by_user_id()
            .returning(|_| Err(AppError::Internal("offline".into())));
        mocks
            .boards
            .expect_create()
            .returning(|new| Ok(board("b9", &new.name)));
        let store = mocks.into_store();

        store.load_user_data().await.unwrap_err();
        store.create_board("Travel", None).await.unwrap();
        assert_eq!(store.error_state().unwrap().kind, OperationKind::Load);

        store.create_board("", None).await.unwrap_err();
        store.create_board("Decor", None).await.unwrap();
        assert_eq!(store.last_error(), None);
    }

    #[tokio::test]
    async fn test_dismiss_error() {
        let store = Mocks::new().into_store();
        store.create_board("", None).await.unwrap_err();
        store.dismiss_error();
        assert_eq!(store.last_error(), None);
    }

    #[tokio::test]
    async fn test_delete_missing_board_reports_but_cleans_mirror() {
        let mut mocks = Mocks::new();
        expect_single_board(&mut mocks);
        mocks
            .boards
            .expect_delete()
            .returning(|id| Err(AppError::not_found("Board", id)));
        let store = mocks.into_store();

        store.load_user_data().await.unwrap();
        let err = store.delete_board("b1").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(store.boards().await.is_empty());
        assert!(store.last_error().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_remote_conflict_on_save_is_treated_as_linked() {
        let mut mocks = Mocks::new();
        mocks
            .boards
            .expect_get_by_user_id()
            .returning(|_| Ok(vec![board("b1", "Travel")]));
        mocks.images.expect_get_by_user_id().returning(|_| Ok(vec![]));
        // Empty at load time; afterwards the link that already existed remotely.
        let reloads = AtomicUsize::new(0);
        mocks.board_pins.expect_get_by_board_id().returning(move |_| {
            if reloads.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(vec![])
            } else {
                Ok(vec![link("b1", "p1")])
            }
        });
        mocks.images.expect_create().times(1).returning(|new| {
            Ok(Image {
                id: new.id,
                user_id: new.user_id,
                filename: new.filename,
                url: new.url,
                title: new.title,
                created_at: Utc::now(),
            })
        });
        mocks
            .board_pins
            .expect_create()
            .times(1)
            .returning(|_, _| Err(AppError::Conflict("already linked".into())));
        let store = mocks.into_store();
        store.load_user_data().await.unwrap();

        let pin = store
            .save_pin_to_board("p1", "b1", "https://cdn.test/p1.jpg", "Lake")
            .await
            .unwrap();
        assert_eq!(pin.board_ids, vec!["b1"]);
        assert_eq!(store.board("b1").await.unwrap().pin_count, 1);
        assert_eq!(store.last_error(), None);

        // Already mirrored: no further gateway calls.
        let again = store
            .save_pin_to_board("p1", "b1", "https://cdn.test/p1.jpg", "Lake")
            .await
            .unwrap();
        assert_eq!(again.board_ids, vec!["b1"]);
    }

    #[tokio::test]
    async fn test_upload_rolls_back_file_when_row_insert_fails() {
        let mut mocks = Mocks::new();
        mocks.storage.expect_upload().times(1).returning(|_, owner, name| {
            Ok(StoredFile {
                key: format!("{owner}/{name}"),
                url: format!("https://cdn.test/{owner}/{name}"),
            })
        });
        mocks
            .images
            .expect_create()
            .returning(|_| Err(AppError::Internal("insert failed".into())));
        mocks
            .storage
            .expect_delete()
            .withf(|key| key == "u1/cat.png")
            .times(1)
            .returning(|_| Ok(()));
        let store = mocks.into_store();

        let upload = ImageUpload {
            file_name: "cat.png".into(),
            content_type: "image/png".into(),
            data: Bytes::from_static(b"\x89PNG"),
            title: None,
        };
        assert!(store.upload_image(upload).await.is_err());
        assert!(store.pins().await.is_empty());
        assert_eq!(store.error_state().unwrap().kind, OperationKind::Image);
    }

    #[tokio::test]
    async fn test_upload_rejects_unsupported_type_before_storage() {
        let mut mocks = Mocks::new();
        mocks.storage.expect_upload().never();
        let store = mocks.into_store();

        let upload = ImageUpload {
            file_name: "notes.pdf".into(),
            content_type: "application/pdf".into(),
            data: Bytes::from_static(b"%PDF"),
            title: None,
        };
        let err = store.upload_image(upload).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[test]
    fn test_comment_author_is_user_handle() {
        let store = Mocks::new().into_store();
        let comment = store.add_comment("p1", "hello");
        assert_eq!(comment.author, "jane");
        assert_eq!(store.comments("p1").len(), 1);
    }

    struct StalledBoards;

    #[async_trait]
    impl BoardRepo for StalledBoards {
        async fn get_by_user_id(&self, _user_id: &str) -> Result<Vec<Board>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(vec![])
        }
        async fn get_by_id(&self, _id: &str) -> Result<Option<Board>> {
            Ok(None)
        }
        async fn create(&self, new: NewBoard) -> Result<Board> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(board("late", &new.name))
        }
        async fn update(&self, id: &str, _changes: BoardUpdate) -> Result<Board> {
            Err(AppError::not_found("Board", id))
        }
        async fn delete(&self, id: &str) -> Result<()> {
            Err(AppError::not_found("Board", id))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_gateway_times_out() {
        let mocks = Mocks::new();
        let gateway = Gateway::new(
            Arc::new(StalledBoards),
            Arc::new(mocks.images),
            Arc::new(mocks.board_pins),
            Arc::new(mocks.storage),
        );
        let store = BoardStore::new(gateway, user(), StoreConfig::default());

        let err = store.load_user_data().await.unwrap_err();
        assert!(matches!(err, AppError::Timeout(_)));
        assert!(!store.is_loading());

        let err = store.create_board("Travel", None).await.unwrap_err();
        assert!(matches!(err, AppError::Timeout(_)));
        assert!(store.boards().await.is_empty());
    }
}
