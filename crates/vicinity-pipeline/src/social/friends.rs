//! Friend recommendations.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use vicinity_core::{Handle, Result};
use vicinity_vector::{
    EmbeddingProvider, EntityFeatures, HybridScorer, ScoringProfile, SocialWeights,
};

use super::models::{Event, UserProfile, attendance};
use super::{embed_index, round4};

/// Extra neighbors fetched beyond `top_n` so self-matches can be dropped.
pub const DEFAULT_SEARCH_SLACK: usize = 10;

/// One recommended user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// The recommended user.
    pub email: String,
    /// Blended score, rounded to four decimals.
    pub score: f64,
    /// Events both users attended.
    #[serde(rename = "sharedEvents")]
    pub shared_events: Vec<String>,
}

/// Recommends users to each other by profile similarity, co-attendance,
/// and home distance.
pub struct FriendRecommender {
    embedder: Arc<dyn EmbeddingProvider>,
    scorer: HybridScorer,
    search_slack: usize,
}

impl FriendRecommender {
    /// Default weights, ten recommendations per user.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            scorer: HybridScorer::social(),
            search_slack: DEFAULT_SEARCH_SLACK,
        }
    }

    /// Override the social weights.
    pub fn with_weights(mut self, weights: SocialWeights) -> Self {
        self.scorer =
            HybridScorer::new(ScoringProfile::Social(weights)).with_top_n(self.scorer.top_n());
        self
    }

    /// Recommendations per user.
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.scorer = self.scorer.with_top_n(top_n);
        self
    }

    /// Extra neighbors searched per user.
    pub fn with_search_slack(mut self, slack: usize) -> Self {
        self.search_slack = slack;
        self
    }

    /// Email → ranked recommendations for every indexable user.
    pub async fn recommend(
        &self,
        users: &[UserProfile],
        events: &[Event],
    ) -> Result<BTreeMap<String, Vec<Recommendation>>> {
        let mut emails = Vec::new();
        let mut texts = Vec::new();
        let mut features: HashMap<String, EntityFeatures> = HashMap::new();
        let attended = attendance(events);

        for user in users {
            let Some((email, text)) = user.profile() else {
                continue;
            };
            let mut f = EntityFeatures::new();
            if let Some(events) = attended.get(email) {
                f.events = events.clone();
            }
            f.location = user.point();
            features.insert(email.to_string(), f);
            emails.push(email.to_string());
            texts.push(text);
        }

        let mut out = BTreeMap::new();
        if emails.is_empty() {
            log::warn!("No users with an email and interests to recommend");
            return Ok(out);
        }

        let index = embed_index(self.embedder.as_ref(), &texts).await?;
        let empty = EntityFeatures::default();
        let k = self.scorer.top_n() + self.search_slack;

        for (i, email) in emails.iter().enumerate() {
            let handle = Handle::try_from(i)?;
            let Some(query) = index.vector(handle) else {
                continue;
            };
            let neighbors = index.search(query, k)?;
            let base = features.get(email).unwrap_or(&empty);
            let ranked = self.scorer.rank(email, base, &neighbors, &emails, &features);

            let recs = ranked
                .into_iter()
                .map(|c| Recommendation {
                    email: c.id,
                    score: round4(c.final_score),
                    shared_events: c.shared_events,
                })
                .collect();
            out.insert(email.clone(), recs);
        }

        log::info!("Recommended friends for {} users", out.len());
        Ok(out)
    }
}

// ============================================================================
// Tests
// ============================================================================
