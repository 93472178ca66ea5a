//! pinboard/crates/pb-core/src/lib.rs
//!
//! Domain models, gateway ports and error types shared by the store and
//! every backend plugin.

pub mod error;
pub mod models;
pub mod traits;
pub mod validation;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use traits::*;

#[cfg(test)]
mod tests {
    use super::models::*;

    #[test]
    fn test_handle_is_email_local_part() {
        let user = SessionUser::new("u1", "jane.doe@example.com");
        assert_eq!(user.handle(), "jane.doe");
    }

    #[test]
    fn test_handle_falls_back_to_anonymous() {
        assert_eq!(SessionUser::new("u1", "").handle(), "anonymous");
        assert_eq!(SessionUser::new("u1", "@example.com").handle(), "anonymous");
    }

    #[test]
    fn test_new_ids_are_distinct() {
        assert_ne!(new_id(), new_id());
    }

    #[test]
    fn test_search_kind_serializes_lowercase() {
        let json = serde_json::to_string(&SearchKind::Board).unwrap();
        assert_eq!(json, "\"board\"");
    }
}
