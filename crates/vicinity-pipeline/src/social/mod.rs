//! Social ranking over user and event records.
//!
//! - [`FriendRecommender`]: similar users, re-ranked by shared events and distance
//! - [`RsvpSimulator`]: fills each event's RSVP list with nearby, like-minded users
//! - [`PeopleSearch`]: free-text user search with an optional radius

pub mod friends;
pub mod models;
pub mod people;
pub mod rsvp;

pub use friends::{FriendRecommender, Recommendation};
pub use models::{
    ATTENDED, Event, JOINED, Place, Rsvp, UserProfile, attendance, attended_titles, load_events,
    load_users, save_events,
};
pub use people::{DEFAULT_RADIUS_KM, PeopleSearch, PersonMatch, person_text};
pub use rsvp::{RsvpSimulator, SAMPLE_REVIEWS};

use vicinity_core::Result;
use vicinity_vector::{EmbeddingProvider, VectorIndex, embed_batched};

use crate::builder::{DEFAULT_BATCH_SIZE, DEFAULT_CONCURRENCY};

/// Round to four decimal places for output files.
pub(crate) fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Embed `texts` into a fresh index; handle `i` belongs to `texts[i]`.
pub(crate) async fn embed_index(
    embedder: &dyn EmbeddingProvider,
    texts: &[String],
) -> Result<VectorIndex> {
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let vectors = embed_batched(embedder, &refs, DEFAULT_BATCH_SIZE, DEFAULT_CONCURRENCY).await?;
    let mut index = VectorIndex::new();
    index.add(&vectors)?;
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round4() {
        assert_eq!(round4(0.123_456), 0.1235);
        assert_eq!(round4(0.65), 0.65);
        assert_eq!(round4(1.0), 1.0);
    }
}
