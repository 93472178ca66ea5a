//! # Search
//!
//! Linear, case-insensitive substring search over an in-memory snapshot of
//! boards and pins. Recomputed on every query; there is no index structure
//! to maintain. Fine for the tens-to-hundreds of entities a single user owns.

use pb_core::models::{Board, Pin, SearchKind, SearchResult};

use crate::store::Snapshot;

/// Matches boards by name or description and pins by title.
///
/// The query is trimmed before matching. Results are ordered newest first;
/// entities created at the same instant keep boards-then-pins order.
pub fn search(query: &str, boards: &[Board], pins: &[Pin]) -> Vec<SearchResult> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    let matches = |text: &str| text.to_lowercase().contains(&needle);

    let board_results = boards
        .iter()
        .filter(|board| {
            matches(&board.name) || board.description.as_deref().is_some_and(matches)
        })
        .map(|board| SearchResult {
            kind: SearchKind::Board,
            id: board.id.clone(),
            title: board.name.clone(),
            description: board.description.clone(),
            image_url: None,
            board_name: None,
            created_at: board.created_at,
        });

    let pin_results = pins
        .iter()
        .filter(|pin| matches(&pin.title))
        .map(|pin| SearchResult {
            kind: SearchKind::Pin,
            id: pin.id.clone(),
            title: pin.title.clone(),
            description: None,
            image_url: Some(pin.image_url.clone()),
            board_name: pin.board_ids.first().and_then(|board_id| {
                boards
                    .iter()
                    .find(|board| &board.id == board_id)
                    .map(|board| board.name.clone())
            }),
            created_at: pin.created_at,
        });

    let mut results: Vec<SearchResult> = board_results.chain(pin_results).collect();
    results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    results
}

/// Query state for a search box bound to one store.
#[derive(Debug, Default, Clone)]
pub struct SearchSession {
    query: String,
    results: Vec<SearchResult>,
    is_searching: bool,
}

impl SearchSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    pub fn is_searching(&self) -> bool {
        self.is_searching
    }

    /// Updates the text without running a search.
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn perform_search(&mut self, query: &str, snapshot: &Snapshot) -> &[SearchResult] {
        self.query = query.to_string();
        self.is_searching = true;
        self.results = search(query, &snapshot.boards, &snapshot.pins);
        self.is_searching = false;
        log::debug!("search {:?} matched {} entities", query, self.results.len());
        &self.results
    }

    pub fn clear_search(&mut self) {
        self.query.clear();
        self.results.clear();
        self.is_searching = false;
    }
}
