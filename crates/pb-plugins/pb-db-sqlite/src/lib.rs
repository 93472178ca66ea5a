//! # pb-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `pb-core` domain models for boards, images and board pins.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use pb_core::error::{AppError, Result};
use pb_core::models::{
    new_id, Board, BoardPinLink, BoardUpdate, Image, NewBoard, NewImage,
};
use pb_core::traits::{BoardPinRepo, BoardRepo, FileStorage, Gateway, ImageRepo};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS boards (
        id          TEXT PRIMARY KEY,
        user_id     TEXT NOT NULL,
        name        TEXT NOT NULL,
        description TEXT,
        created_at  TEXT NOT NULL,
        updated_at  TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS boards_user_id ON boards (user_id)",
    "CREATE TABLE IF NOT EXISTS images (
        id         TEXT PRIMARY KEY,
        user_id    TEXT NOT NULL,
        filename   TEXT NOT NULL,
        url        TEXT NOT NULL,
        title      TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS images_user_id ON images (user_id)",
    "CREATE TABLE IF NOT EXISTS board_pins (
        id         TEXT PRIMARY KEY,
        board_id   TEXT NOT NULL REFERENCES boards (id) ON DELETE CASCADE,
        image_id   TEXT NOT NULL REFERENCES images (id) ON DELETE CASCADE,
        created_at TEXT NOT NULL,
        UNIQUE (board_id, image_id)
    )",
];

/// SQLite-backed relational half of the gateway. File storage is a
/// separate plugin.
pub struct SqliteGateway {
    pool: SqlitePool,
}

impl SqliteGateway {
    /// Connects and creates the tables if needed.
    ///
    /// # Developer Note
    /// Every `:memory:` connection is its own database, so in-memory URLs get
    /// a single, never-recycled connection.
    pub async fn new(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(db_err)?
            .create_if_missing(true)
            .foreign_keys(true);
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");

        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(db_err)?;

        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(db_err)?;
        }
        log::info!("sqlite gateway ready at {url}");
        Ok(Self { pool })
    }

    /// Pairs this database with a storage plugin.
    pub fn gateway(self: &Arc<Self>, storage: Arc<dyn FileStorage>) -> Gateway {
        Gateway::new(
            Arc::clone(self) as Arc<dyn BoardRepo>,
            Arc::clone(self) as Arc<dyn ImageRepo>,
            Arc::clone(self) as Arc<dyn BoardPinRepo>,
            storage,
        )
    }
}

// Helper for error conversion at the plugin boundary
fn db_err(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return AppError::Conflict(db.message().to_string());
        }
    }
    AppError::internal(err)
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

fn board_from_row(row: &SqliteRow) -> Result<Board> {
    Ok(Board {
        id: row.try_get("id").map_err(db_err)?,
        user_id: row.try_get("user_id").map_err(db_err)?,
        name: row.try_get("name").map_err(db_err)?,
        description: row.try_get("description").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        updated_at: row.try_get("updated_at").map_err(db_err)?,
    })
}

fn image_from_row(row: &SqliteRow) -> Result<Image> {
    Ok(Image {
        id: row.try_get("id").map_err(db_err)?,
        user_id: row.try_get("user_id").map_err(db_err)?,
        filename: row.try_get("filename").map_err(db_err)?,
        url: row.try_get("url").map_err(db_err)?,
        title: row.try_get("title").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
    })
}

fn link_from_row(row: &SqliteRow) -> Result<BoardPinLink> {
    Ok(BoardPinLink {
        id: row.try_get("id").map_err(db_err)?,
        board_id: row.try_get("board_id").map_err(db_err)?,
        image_id: row.try_get("image_id").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
    })
}

#[async_trait]
impl BoardRepo for SqliteGateway {
    async fn get_by_user_id(&self, user_id: &str) -> Result<Vec<Board>> {
        sqlx::query("SELECT * FROM boards WHERE user_id = ? ORDER BY created_at DESC, id DESC")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?
            .iter()
            .map(board_from_row)
            .collect()
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Board>> {
        sqlx::query("SELECT * FROM boards WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .as_ref()
            .map(board_from_row)
            .transpose()
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
        sqlx::query("INSERT INTO boards (id, user_id, name, description, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)")
            .bind(&row.id)
            .bind(&row.user_id)
            .bind(&row.name)
            .bind(&row.description)
            .bind(row.created_at)
            .bind(row.updated_at)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row)
    }

    async fn update(&self, id: &str, changes: BoardUpdate) -> Result<Board> {
        let description_set = changes.description.is_some();
        let description = changes.description.flatten();
        let result = sqlx::query(
            "UPDATE boards
             SET name = COALESCE(?, name),
                 description = CASE WHEN ? THEN ? ELSE description END,
                 updated_at = ?
             WHERE id = ?",
        )
        .bind(changes.name)
        .bind(description_set)
        .bind(description)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Board", id));
        }
        BoardRepo::get_by_id(self, id)
            .await?
            .ok_or_else(|| AppError::not_found("Board", id))
    }

    /// Links go with it through `ON DELETE CASCADE`.
    async fn delete(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM boards WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Board", id));
        }
        Ok(())
    }
}

#[async_trait]
impl ImageRepo for SqliteGateway {
    async fn get_by_user_id(&self, user_id: &str) -> Result<Vec<Image>> {
        sqlx::query("SELECT * FROM images WHERE user_id = ? ORDER BY created_at DESC, id DESC")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?
            .iter()
            .map(image_from_row)
            .collect()
    }

    async fn create(&self, image: NewImage) -> Result<Image> {
        let row = Image {
            id: image.id,
            user_id: image.user_id,
            filename: image.filename,
            url: image.url,
            title: image.title,
            created_at: Utc::now(),
        };
        sqlx::query("INSERT INTO images (id, user_id, filename, url, title, created_at) VALUES (?, ?, ?, ?, ?, ?)")
            .bind(&row.id)
            .bind(&row.user_id)
            .bind(&row.filename)
            .bind(&row.url)
            .bind(&row.title)
            .bind(row.created_at)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM images WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Image", id));
        }
        Ok(())
    }
}

#[async_trait]
impl BoardPinRepo for SqliteGateway {
    async fn get_by_board_id(&self, board_id: &str) -> Result<Vec<BoardPinLink>> {
        sqlx::query("SELECT * FROM board_pins WHERE board_id = ? ORDER BY created_at DESC, id DESC")
            .bind(board_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?
            .iter()
            .map(link_from_row)
            .collect()
    }

    async fn create(&self, board_id: &str, image_id: &str) -> Result<BoardPinLink> {
        let row = BoardPinLink {
            id: new_id(),
            board_id: board_id.to_string(),
            image_id: image_id.to_string(),
            created_at: Utc::now(),
        };
        sqlx::query("INSERT INTO board_pins (id, board_id, image_id, created_at) VALUES (?, ?, ?, ?)")
            .bind(&row.id)
            .bind(&row.board_id)
            .bind(&row.image_id)
            .bind(row.created_at)
            .execute(&self.pool)
            .await
            .map_err(|err| {
                if is_foreign_key_violation(&err) {
                    AppError::not_found("Board or Image", format!("{board_id}/{image_id}"))
                } else {
                    db_err(err)
                }
            })?;
        Ok(row)
    }

    async fn delete(&self, board_id: &str, image_id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM board_pins WHERE board_id = ? AND image_id = ?")
            .bind(board_id)
            .bind(image_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(
                "BoardPin",
                format!("{board_id}/{image_id}"),
            ));
        }
        Ok(())
    }
}
