//! Pure reconstruction of the derived views from the three stored
//! collections. Nothing here touches the network.

use std::collections::{HashMap, HashSet};

use pb_core::models::{Board, BoardPinLink, BoardSummary, Image, Pin};

/// Builds one pin per image, in image order. A pin's `board_ids` lists the
/// boards it is linked to, oldest link first, each board once.
pub fn join_pins(images: &[Image], links: &[BoardPinLink]) -> Vec<Pin> {
    let mut by_image: HashMap<&str, Vec<&BoardPinLink>> = HashMap::new();
    for link in links {
        by_image.entry(link.image_id.as_str()).or_default().push(link);
    }

    images
        .iter()
        .map(|image| {
            let mut board_ids: Vec<String> = Vec::new();
            if let Some(image_links) = by_image.get_mut(image.id.as_str()) {
                image_links.sort_by_key(|link| link.created_at);
                for link in image_links.iter() {
                    if !board_ids.contains(&link.board_id) {
                        board_ids.push(link.board_id.clone());
                    }
                }
            }
            Pin {
                id: image.id.clone(),
                image_url: image.url.clone(),
                title: image.title.clone(),
                board_ids,
                created_at: image.created_at,
            }
        })
        .collect()
}

/// Attaches link-derived counters to each board.
pub fn summarize_boards(
    boards: &[Board],
    images: &[Image],
    links: &[BoardPinLink],
) -> Vec<BoardSummary> {
    boards
        .iter()
        .map(|board| summarize_board(board, images, links))
        .collect()
}

pub fn summarize_board(board: &Board, images: &[Image], links: &[BoardPinLink]) -> BoardSummary {
    let mut board_links: Vec<&BoardPinLink> =
        links.iter().filter(|link| link.board_id == board.id).collect();
    board_links.sort_by_key(|link| link.created_at);
    let mut seen = HashSet::new();
    board_links.retain(|link| seen.insert(link.image_id.as_str()));

    let cover_image = board_links.iter().rev().find_map(|link| {
        images
            .iter()
            .find(|image| image.id == link.image_id)
            .map(|image| image.url.clone())
    });

    BoardSummary {
        board: board.clone(),
        pin_count: board_links.len(),
        cover_image,
    }
}
