//! Free-text search over user profiles.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use vicinity_core::Result;
use vicinity_vector::{EmbeddingProvider, GeoPoint, VectorIndex, similarity_score};

use super::models::{Event, UserProfile, attended_titles};
use super::{embed_index, round4};

/// Matches farther than this from the search origin are dropped.
pub const DEFAULT_RADIUS_KM: f64 = 50.0;

/// Neighbors fetched per query before the radius filter.
pub const DEFAULT_TOP_K: usize = 50;

/// Attended titles included in the profile text.
const TITLES_IN_TEXT: usize = 5;

#[derive(Debug, Clone)]
struct Person {
    email: String,
    city: String,
    state: String,
    point: Option<GeoPoint>,
    attended: Vec<String>,
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonMatch {
    /// The matching user.
    pub email: String,
    /// Home city as written.
    pub city: String,
    /// Home state as written.
    pub state: String,
    /// Similarity to the query, rounded to four decimals.
    pub score: f64,
    /// Distance from the search origin; unknown without both coordinates.
    pub distance_km: Option<f64>,
    /// Titles of attended events.
    pub attended: Vec<String>,
}

/// Semantic people search with an optional radius filter.
pub struct PeopleSearch {
    embedder: Arc<dyn EmbeddingProvider>,
    index: VectorIndex,
    people: Vec<Person>,
    top_k: usize,
    radius_km: f64,
}

impl PeopleSearch {
    /// Index every user with an email.
    pub async fn build(
        embedder: Arc<dyn EmbeddingProvider>,
        users: &[UserProfile],
        events: &[Event],
    ) -> Result<Self> {
        let titles = attended_titles(events);
        let mut people = Vec::new();
        let mut texts = Vec::new();

        for user in users {
            let Some(email) = user.email.as_deref().filter(|e| !e.is_empty()) else {
                continue;
            };
            let attended = titles.get(email).cloned().unwrap_or_default();
            texts.push(person_text(user, &attended));

            let place = user.location.clone().unwrap_or_default();
            people.push(Person {
                email: email.to_string(),
                point: place.point(),
                city: place.city,
                state: place.state,
                attended,
            });
        }

        let index = embed_index(embedder.as_ref(), &texts).await?;
        log::info!("Indexed {} people", people.len());
        Ok(Self {
            embedder,
            index,
            people,
            top_k: DEFAULT_TOP_K,
            radius_km: DEFAULT_RADIUS_KM,
        })
    }

    /// Neighbors fetched per query.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Radius applied when an origin is given.
    pub fn with_radius_km(mut self, radius_km: f64) -> Self {
        self.radius_km = radius_km;
        self
    }

    /// Number of indexed users.
    pub fn len(&self) -> usize {
        self.people.len()
    }

    /// Whether no users are indexed.
    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    /// Users closest to `query`, best first.
    ///
    /// With an `origin`, users known to live beyond the radius are dropped;
    /// users without a coordinate are kept with an unknown distance.
    pub async fn search(&self, query: &str, origin: Option<GeoPoint>) -> Result<Vec<PersonMatch>> {
        let embedding = self.embedder.embed(query).await?;
        let neighbors = self.index.search(&embedding, self.top_k)?;

        let mut out = Vec::with_capacity(neighbors.len());
        for n in neighbors {
            let Some(person) = self.people.get(n.handle.index()) else {
                continue;
            };
            let distance_km = match (origin, person.point) {
                (Some(o), Some(p)) => Some(o.distance_km(&p)),
                _ => None,
            };
            if distance_km.is_some_and(|d| d > self.radius_km) {
                continue;
            }
            out.push(PersonMatch {
                email: person.email.clone(),
                city: person.city.clone(),
                state: person.state.clone(),
                score: round4(similarity_score(n.distance)),
                distance_km,
                attended: person.attended.clone(),
            });
        }
        Ok(out)
    }
}

/// Embedding text for people search: bio, interests, home, and up to five
/// attended event titles.
pub fn person_text(user: &UserProfile, attended: &[String]) -> String {
    let (city, state) = user
        .location
        .as_ref()
        .map(|p| (p.city.as_str(), p.state.as_str()))
        .unwrap_or_default();
    let events = if attended.is_empty() {
        "None".to_string()
    } else {
        attended
            .iter()
            .take(TITLES_IN_TEXT)
            .filter(|t| !t.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "{}. Interests: {}. Location: {city}, {state}. Attended events: {events}.",
        user.bio,
        user.interests.join(", ")
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use vicinity_core::Error;
    use vicinity_vector::MockEmbeddingProvider;

    fn users() -> Vec<UserProfile> {
        serde_json::from_value(json!([
            {"email": "near@x", "bio": "Jazz fan", "interests": ["jazz"],
             "location": {"city": "Tempe", "state": "AZ", "latitude": 33.4255, "longitude": -111.94}},
            {"email": "far@x", "bio": "Jazz fan", "interests": ["jazz"],
             "location": {"city": "Tucson", "state": "AZ", "latitude": 32.22, "longitude": -110.97}},
            {"email": "nowhere@x", "bio": "Jazz fan", "interests": ["jazz"]},
            {"bio": "anonymous", "interests": ["jazz"]}
        ]))
        .unwrap()
    }

    fn events() -> Vec<Event> {
        serde_json::from_value(json!([
            {"title": "Jazz Night", "rsvpList": [{"email": "near@x", "status": "attended"}]}
        ]))
        .unwrap()
    }

    async fn search() -> PeopleSearch {
        PeopleSearch::build(Arc::new(MockEmbeddingProvider::new(16)), &users(), &events())
            .await
            .unwrap()
    }

    #[test]
    fn test_person_text() {
        let users = users();
        assert_eq!(
            person_text(&users[0], &["Jazz Night".to_string()]),
            "Jazz fan. Interests: jazz. Location: Tempe, AZ. Attended events: Jazz Night."
        );
        assert_eq!(
            person_text(&users[2], &[]),
            "Jazz fan. Interests: jazz. Location: , . Attended events: None."
        );
    }

    #[test]
    fn test_person_text_caps_titles() {
        let titles: Vec<String> = (1..=7).map(|i| format!("E{i}")).collect();
        assert!(
            person_text(&users()[0], &titles).ends_with("Attended events: E1, E2, E3, E4, E5.")
        );
    }

    #[tokio::test]
    async fn test_users_without_email_skipped() {
        assert_eq!(search().await.len(), 3);
    }

    #[tokio::test]
    async fn test_without_origin_everyone_matches() {
        let hits = search().await.search("jazz", None).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert!(hits.iter().all(|h| h.distance_km.is_none()));
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_radius_drops_far_keeps_unknown() {
        let origin = GeoPoint::new(33.4484, -112.074); // Phoenix
        let hits = search().await.search("jazz", Some(origin)).await.unwrap();
        let emails: Vec<&str> = hits.iter().map(|h| h.email.as_str()).collect();

        assert!(emails.contains(&"near@x"));
        assert!(emails.contains(&"nowhere@x"));
        assert!(!emails.contains(&"far@x"));

        let near = hits.iter().find(|h| h.email == "near@x").unwrap();
        assert!(near.distance_km.unwrap() < 20.0);
        assert_eq!(near.attended, vec!["Jazz Night"]);
    }

    #[tokio::test]
    async fn test_empty_people_index() {
        let empty = PeopleSearch::build(Arc::new(MockEmbeddingProvider::new(16)), &[], &[])
            .await
            .unwrap();
        assert!(empty.is_empty());
        assert!(matches!(
            empty.search("anyone", None).await,
            Err(Error::EmptyIndex)
        ));
    }
}
