//! Session-only comment threads.
//!
//! Comments live in memory for the lifetime of the store and are never sent
//! to the gateway. Dropping the store drops them.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::Utc;
use pb_core::models::{new_id, Comment};

#[derive(Debug, Default)]
pub struct CommentStore {
    threads: RwLock<HashMap<String, Vec<Comment>>>,
}

impl CommentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends to the pin's thread, creating it on first use.
    pub fn add_comment(&self, pin_id: &str, author: &str, text: &str) -> Comment {
        let comment = Comment {
            id: new_id(),
            pin_id: pin_id.to_string(),
            author: author.to_string(),
            text: text.to_string(),
            created_at: Utc::now(),
        };
        self.threads
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(pin_id.to_string())
            .or_default()
            .push(comment.clone());
        comment
    }

    /// Oldest first.
    pub fn comments(&self, pin_id: &str) -> Vec<Comment> {
        self.threads
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(pin_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn count(&self, pin_id: &str) -> usize {
        self.threads
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(pin_id)
            .map_or(0, Vec::len)
    }
}
