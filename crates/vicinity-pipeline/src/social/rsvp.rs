//! Simulated RSVP lists.
//!
//! Every event's text is matched against user profiles and the matches are
//! re-ranked by locale. The ranked users become the event's RSVP list:
//! every fifth one (starting with the first) attended and left a rating and
//! review, the rest joined. Ratings and reviews follow from the rank, so the
//! same inputs always produce the same file.

use std::collections::HashMap;
use std::sync::Arc;

use vicinity_core::{Handle, Result};
use vicinity_vector::{
    EmbeddingProvider, EntityFeatures, HybridScorer, LocaleWeights, ScoringProfile,
};

use super::embed_index;
use super::models::{Event, Rsvp, UserProfile};

/// Users matched per event.
pub const DEFAULT_TOP_K: usize = 50;

/// Every n-th ranked user attended.
pub const ATTEND_EVERY: usize = 5;

/// Reviews handed to attendees in rotation.
pub const SAMPLE_REVIEWS: [&str; 6] = [
    "Amazing event, would attend again!",
    "Had a great time!",
    "Well organized and fun.",
    "Loved the vibe and energy!",
    "Could have been better.",
    "Not what I expected, but still enjoyable.",
];

/// Fills `rsvpList` on events from semantically close, local users.
pub struct RsvpSimulator {
    embedder: Arc<dyn EmbeddingProvider>,
    top_k: usize,
    weights: LocaleWeights,
}

impl RsvpSimulator {
    /// Default weights, fifty users per event.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            top_k: DEFAULT_TOP_K,
            weights: LocaleWeights::default(),
        }
    }

    /// Users matched per event.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Override the locale weights.
    pub fn with_weights(mut self, weights: LocaleWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Replace every event's RSVP list; returns the number of RSVPs written.
    pub async fn simulate(&self, users: &[UserProfile], events: &mut [Event]) -> Result<usize> {
        let mut emails = Vec::new();
        let mut profiles = Vec::new();
        let mut features: HashMap<String, EntityFeatures> = HashMap::new();

        for user in users {
            let Some((email, text)) = user.profile() else {
                continue;
            };
            features.insert(
                email.to_string(),
                EntityFeatures::new().with_locale(user.locale()),
            );
            emails.push(email.to_string());
            profiles.push(text);
        }

        if emails.is_empty() {
            log::warn!("No users with an email and interests; RSVP lists will be empty");
            for event in events.iter_mut() {
                event.rsvp_list.clear();
            }
            return Ok(0);
        }

        let user_index = embed_index(self.embedder.as_ref(), &profiles).await?;
        let event_texts: Vec<String> = events.iter().map(Event::text).collect();
        let event_index = embed_index(self.embedder.as_ref(), &event_texts).await?;

        let scorer =
            HybridScorer::new(ScoringProfile::Locale(self.weights)).with_top_n(self.top_k);

        let mut total = 0;
        for (i, event) in events.iter_mut().enumerate() {
            let Some(query) = event_index.vector(Handle::try_from(i)?) else {
                continue;
            };
            let neighbors = user_index.search(query, self.top_k)?;
            let base = EntityFeatures::new().with_locale(event.locale());
            let ranked = scorer.rank(&event.event_id(), &base, &neighbors, &emails, &features);

            event.rsvp_list = ranked
                .into_iter()
                .enumerate()
                .map(|(rank, c)| assign(rank, c.id))
                .collect();
            total += event.rsvp_list.len();
        }

        log::info!("Simulated {total} RSVPs across {} events", events.len());
        Ok(total)
    }
}

/// Status, rating, and review for the user at `rank`.
fn assign(rank: usize, email: String) -> Rsvp {
    if rank % ATTEND_EVERY != 0 {
        return Rsvp::joined(email);
    }
    let slot = rank / ATTEND_EVERY;
    let rating = 3 + (slot % 3) as u8;
    Rsvp::attended(email, rating, SAMPLE_REVIEWS[slot % SAMPLE_REVIEWS.len()])
}

// ============================================================================
// Tests
// ============================================================================
