//! RSVP simulation feeding friend recommendations and people search.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use serde_json::json;
use tempfile::tempdir;
use vicinity_pipeline::social::{
    FriendRecommender, PeopleSearch, RsvpSimulator, UserProfile, load_events, save_events,
};
use vicinity_vector::{EmbeddingProvider, GeoPoint, MockEmbeddingProvider};

fn users() -> Vec<UserProfile> {
    let cities = [
        ("Tempe", 33.4255, -111.94),
        ("Mesa", 33.4152, -111.8315),
        ("Tucson", 32.2226, -110.9747),
    ];
    (0..15)
        .map(|i| {
            let (city, lat, lon) = cities[i % cities.len()];
            serde_json::from_value(json!({
                "email": format!("user{i:02}@example.com"),
                "bio": format!("Resident {i} who likes the outdoors"),
                "interests": ["hiking", if i % 2 == 0 { "jazz" } else { "pottery" }],
                "location": {"city": city, "state": "AZ", "latitude": lat, "longitude": lon}
            }))
            .unwrap()
        })
        .collect()
}

#[tokio::test]
async fn test_simulated_rsvps_drive_recommendations() {
    let dir = tempdir().unwrap();
    let events_path = dir.path().join("events.json");
    let output = dir.path().join("events_with_rsvp.json");
    std::fs::write(
        &events_path,
        json!([
            {"id": "e1", "title": "Desert Hike", "categories": ["outdoors"],
             "location": {"city": "Tempe", "state": "AZ"}},
            {"id": "e2", "title": "Jazz Night", "tags": ["music"],
             "location": {"city": "Mesa", "state": "AZ"}},
            {"title": "Clay Studio", "description": "Wheel throwing",
             "location": {"city": "Tucson", "state": "AZ"}}
        ])
        .to_string(),
    )
    .unwrap();

    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(MockEmbeddingProvider::new(32));
    let users = users();

    let mut events = load_events(&events_path).unwrap();
    let total = RsvpSimulator::new(embedder.clone())
        .with_top_k(10)
        .simulate(&users, &mut events)
        .await
        .unwrap();
    assert_eq!(total, 30);
    save_events(&output, &events).unwrap();

    let events = load_events(&output).unwrap();
    assert!(events.iter().all(|e| e.rsvp_list.len() == 10));

    let recs = FriendRecommender::new(embedder.clone())
        .recommend(&users, &events)
        .await
        .unwrap();
    assert_eq!(recs.len(), users.len());
    for (email, list) in &recs {
        assert!(list.len() <= 10);
        assert!(list.iter().all(|r| &r.email != email));
        assert!(list.windows(2).all(|w| w[0].score >= w[1].score));
    }

    let people = PeopleSearch::build(embedder, &users, &events).await.unwrap();
    let hits = people
        .search("hiking and jazz", Some(GeoPoint::new(33.4255, -111.94)))
        .await
        .unwrap();
    assert!(!hits.is_empty());
    assert!(hits.iter().all(|h| h.city != "Tucson"));
    assert!(hits.iter().all(|h| h.distance_km.is_some_and(|d| d <= 50.0)));
}
