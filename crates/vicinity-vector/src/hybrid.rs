//! Hybrid ranking: raw vector similarity blended with structured signals.
//!
//! The scorer takes raw nearest-neighbor hits and re-ranks them with
//! auxiliary features looked up per entity. Two profiles exist:
//!
//! ```text
//! similarity = 1 / (1 + raw_distance)
//!
//! social:  final = 0.5 * similarity + 0.3 * co_attendance + 0.2 * location_bonus
//!          co_attendance  = |shared events| / |base events|   (0 when base has none)
//!          location_bonus = 0.25 within 10 km, 0.10 within 50 km, else 0
//!
//! locale:  final = 0.7 * similarity + 0.3 * locale_boost
//!          locale_boost   = 0.3 same city, 0.1 same state only, else 0
//! ```
//!
//! Scoring is pure: no I/O and no mutation of the feature sources.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::BuildHasher;

use serde::{Deserialize, Serialize};
use vicinity_content::ChunkStore;
use vicinity_core::Handle;

use crate::geo::{GeoPoint, Locale};
use crate::types::Neighbor;

/// Default number of ranked candidates returned.
pub const DEFAULT_TOP_N: usize = 10;

// ============================================================================
// Features
// ============================================================================

/// Structured signals attached to one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityFeatures {
    /// Ids of events the entity attended.
    #[serde(default)]
    pub events: BTreeSet<String>,

    /// Known coordinate.
    #[serde(default)]
    pub location: Option<GeoPoint>,

    /// Normalized city/state.
    #[serde(default)]
    pub locale: Option<Locale>,
}

impl EntityFeatures {
    /// Features with nothing set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the attended events.
    pub fn with_events<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.events = events.into_iter().map(Into::into).collect();
        self
    }

    /// Set the coordinate.
    pub fn with_location(mut self, location: GeoPoint) -> Self {
        self.location = Some(location);
        self
    }

    /// Set the locale.
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = Some(locale);
        self
    }
}

/// Source of per-entity features.
pub trait FeatureLookup {
    /// Features for `id`, if known.
    fn features(&self, id: &str) -> Option<&EntityFeatures>;
}

impl<S: BuildHasher> FeatureLookup for HashMap<String, EntityFeatures, S> {
    fn features(&self, id: &str) -> Option<&EntityFeatures> {
        self.get(id)
    }
}

impl FeatureLookup for BTreeMap<String, EntityFeatures> {
    fn features(&self, id: &str) -> Option<&EntityFeatures> {
        self.get(id)
    }
}

/// Maps index handles to entity ids.
pub trait EntityIds {
    /// The id stored at `handle`.
    fn entity_id(&self, handle: Handle) -> Option<&str>;
}

impl EntityIds for [String] {
    fn entity_id(&self, handle: Handle) -> Option<&str> {
        self.get(handle.index()).map(String::as_str)
    }
}

impl EntityIds for Vec<String> {
    fn entity_id(&self, handle: Handle) -> Option<&str> {
        self.as_slice().entity_id(handle)
    }
}

impl EntityIds for ChunkStore {
    fn entity_id(&self, handle: Handle) -> Option<&str> {
        self.resolve(handle).ok().map(|c| c.id.as_str())
    }
}

// ============================================================================
// Profiles
// ============================================================================

/// Weights and bands for the social profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialWeights {
    /// Weight of the similarity score.
    pub similarity: f64,
    /// Weight of the co-attendance score.
    pub co_attendance: f64,
    /// Weight of the location bonus.
    pub proximity: f64,
    /// Inner distance band in km.
    pub near_km: f64,
    /// Bonus inside the inner band.
    pub near_bonus: f64,
    /// Outer distance band in km.
    pub far_km: f64,
    /// Bonus inside the outer band.
    pub far_bonus: f64,
}

impl Default for SocialWeights {
    fn default() -> Self {
        Self {
            similarity: 0.5,
            co_attendance: 0.3,
            proximity: 0.2,
            near_km: 10.0,
            near_bonus: 0.25,
            far_km: 50.0,
            far_bonus: 0.10,
        }
    }
}

impl SocialWeights {
    fn location_bonus(&self, base: Option<&GeoPoint>, candidate: Option<&GeoPoint>) -> f64 {
        let (Some(a), Some(b)) = (base, candidate) else {
            return 0.0;
        };
        let km = a.distance_km(b);
        if km <= self.near_km {
            self.near_bonus
        } else if km <= self.far_km {
            self.far_bonus
        } else {
            0.0
        }
    }
}

/// Weights for the locale profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocaleWeights {
    /// Weight of the similarity score.
    pub similarity: f64,
    /// Weight of the locale boost.
    pub locale: f64,
    /// Boost for a matching city.
    pub city_boost: f64,
    /// Boost for a matching state with a different city.
    pub state_boost: f64,
}

impl Default for LocaleWeights {
    fn default() -> Self {
        Self {
            similarity: 0.7,
            locale: 0.3,
            city_boost: 0.3,
            state_boost: 0.1,
        }
    }
}

impl LocaleWeights {
    fn locale_boost(&self, base: Option<&Locale>, candidate: Option<&Locale>) -> f64 {
        let (Some(a), Some(b)) = (base, candidate) else {
            return 0.0;
        };
        if a.same_city(b) {
            self.city_boost
        } else if a.same_state(b) {
            self.state_boost
        } else {
            0.0
        }
    }
}

/// How auxiliary signals combine with similarity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "profile", rename_all = "lowercase")]
pub enum ScoringProfile {
    /// Shared history and geographic proximity.
    Social(SocialWeights),
    /// City/state match.
    Locale(LocaleWeights),
}

impl ScoringProfile {
    fn similarity_weight(&self) -> f64 {
        match self {
            Self::Social(w) => w.similarity,
            Self::Locale(w) => w.similarity,
        }
    }
}

// ============================================================================
// Scoring
// ============================================================================

/// One re-ranked candidate.
///
/// Under the locale profile `proximity_bonus` carries the locale boost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    /// Entity id.
    pub id: String,
    /// Index position.
    pub handle: Handle,
    /// Squared Euclidean distance from the query.
    pub raw_distance: f32,
    /// `1 / (1 + raw_distance)`.
    pub similarity_score: f64,
    /// Fraction of the base entity's events the candidate also attended.
    pub co_attendance: f64,
    /// Location bonus (social) or locale boost (locale).
    pub proximity_bonus: f64,
    /// Weighted contribution of everything except similarity.
    pub auxiliary_bonus: f64,
    /// Blended score used for ordering.
    pub final_score: f64,
    /// Events shared with the base entity, sorted.
    pub shared_events: Vec<String>,
}

/// Convert a raw squared distance into a similarity in (0, 1].
pub fn similarity_score(raw_distance: f32) -> f64 {
    1.0 / (1.0 + f64::from(raw_distance.max(0.0)))
}

/// Re-ranks nearest-neighbor hits with auxiliary features.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridScorer {
    profile: ScoringProfile,
    top_n: usize,
}

impl HybridScorer {
    /// Create a scorer for `profile` returning [`DEFAULT_TOP_N`] candidates.
    pub fn new(profile: ScoringProfile) -> Self {
        Self {
            profile,
            top_n: DEFAULT_TOP_N,
        }
    }

    /// Social profile with default weights.
    pub fn social() -> Self {
        Self::new(ScoringProfile::Social(SocialWeights::default()))
    }

    /// Locale profile with default weights.
    pub fn locale() -> Self {
        Self::new(ScoringProfile::Locale(LocaleWeights::default()))
    }

    /// Set how many candidates [`rank`](Self::rank) returns.
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    /// The active profile.
    pub fn profile(&self) -> &ScoringProfile {
        &self.profile
    }

    /// The result cap.
    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// Score and order `neighbors` relative to the base entity.
    ///
    /// Neighbors whose id equals `base_id` or that resolve to no id are
    /// dropped, as are repeat occurrences of an id already seen. The sort
    /// is stable, so equal scores keep neighbor order.
    pub fn rank(
        &self,
        base_id: &str,
        base: &EntityFeatures,
        neighbors: &[Neighbor],
        ids: &dyn EntityIds,
        lookup: &dyn FeatureLookup,
    ) -> Vec<ScoredCandidate> {
        let empty = EntityFeatures::default();
        let mut seen = HashSet::new();

        let mut scored: Vec<ScoredCandidate> = neighbors
            .iter()
            .filter_map(|n| {
                let id = ids.entity_id(n.handle)?;
                if id == base_id || !seen.insert(id) {
                    return None;
                }
                let features = lookup.features(id).unwrap_or(&empty);
                Some(self.score(id, n, base, features))
            })
            .collect();

        scored.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
        scored.truncate(self.top_n);
        scored
    }

    fn score(
        &self,
        id: &str,
        neighbor: &Neighbor,
        base: &EntityFeatures,
        candidate: &EntityFeatures,
    ) -> ScoredCandidate {
        let similarity = similarity_score(neighbor.distance);
        let shared_events: Vec<String> = base.events.intersection(&candidate.events).cloned().collect();
        let co_attendance = if base.events.is_empty() {
            0.0
        } else {
            shared_events.len() as f64 / base.events.len() as f64
        };

        let (proximity_bonus, final_score) = match &self.profile {
            ScoringProfile::Social(w) => {
                let bonus = w.location_bonus(base.location.as_ref(), candidate.location.as_ref());
                let score =
                    w.similarity * similarity + w.co_attendance * co_attendance + w.proximity * bonus;
                (bonus, score)
            }
            ScoringProfile::Locale(w) => {
                let boost = w.locale_boost(base.locale.as_ref(), candidate.locale.as_ref());
                (boost, w.similarity * similarity + w.locale * boost)
            }
        };

        ScoredCandidate {
            id: id.to_string(),
            handle: neighbor.handle,
            raw_distance: neighbor.distance,
            similarity_score: similarity,
            co_attendance,
            proximity_bonus,
            auxiliary_bonus: (final_score - self.profile.similarity_weight() * similarity).max(0.0),
            final_score,
            shared_events,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
