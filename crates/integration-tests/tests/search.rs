use integration_tests::memory_session;
use pb_core::models::SearchKind;
use pb_store::SearchSession;

#[tokio::test]
async fn board_names_match_case_insensitively() {
    let (_backend, store) = memory_session();
    let travel = store
        .create_board("Travel Inspiration", Some("Places I want to visit"))
        .await
        .unwrap();
    store
        .create_board("Home Decor", Some("Interior design ideas"))
        .await
        .unwrap();

    let mut search = SearchSession::new();
    let results = search.perform_search("travel", &store.snapshot().await);

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].kind, SearchKind::Board);
    assert_eq!(results[0].id, travel.id);
    assert_eq!(results[0].title, "Travel Inspiration");
}

#[tokio::test]
async fn later_pins_rank_first_and_name_their_board() {
    let (_backend, store) = memory_session();
    let board = store.create_board("Weekend", None).await.unwrap();
    store
        .save_pin_to_board("p1", &board.id, "https://images.test/1.jpg", "Mountain trail")
        .await
        .unwrap();
    store
        .save_pin_to_board("p2", &board.id, "https://images.test/2.jpg", "Mountain lake")
        .await
        .unwrap();

    let mut search = SearchSession::new();
    let results = search.perform_search("MOUNTAIN", &store.snapshot().await);

    let ids: Vec<_> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["p2", "p1"]);
    assert!(results.iter().all(|r| r.kind == SearchKind::Pin));
    assert_eq!(results[0].board_name.as_deref(), Some("Weekend"));
}

#[tokio::test]
async fn blank_queries_return_nothing() {
    let (_backend, store) = memory_session();
    store.create_board("Travel", None).await.unwrap();
    let snapshot = store.snapshot().await;

    let mut search = SearchSession::new();
    assert!(search.perform_search("", &snapshot).is_empty());
    assert!(!search.is_searching());
    assert!(search.perform_search("   ", &snapshot).is_empty());
    assert!(!search.is_searching());
}

#[tokio::test]
async fn results_reflect_the_snapshot_they_were_given() {
    let (_backend, store) = memory_session();
    let board = store.create_board("Travel", None).await.unwrap();
    let stale = store.snapshot().await;
    store.delete_board(&board.id).await.unwrap();

    let mut search = SearchSession::new();
    assert_eq!(search.perform_search("travel", &stale).len(), 1);
    assert!(search
        .perform_search("travel", &store.snapshot().await)
        .is_empty());
}
