//! User and event records as stored in the social JSON files.
//!
//! Fields the engine does not use are kept in `extra` so a rewritten
//! events file preserves everything it was read with.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};
use vicinity_core::{Result, read_to_string, write_atomic};
use vicinity_vector::{GeoPoint, Locale};

/// RSVP status counted as attendance.
pub const ATTENDED: &str = "attended";

/// RSVP status for registered users who have not attended.
pub const JOINED: &str = "joined";

/// City, state, and optional coordinate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Place {
    /// City name as written.
    #[serde(default)]
    pub city: String,
    /// State name as written.
    #[serde(default)]
    pub state: String,
    /// Latitude in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Longitude in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Unrecognized fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Place {
    /// The coordinate, when both parts are present.
    pub fn point(&self) -> Option<GeoPoint> {
        Some(GeoPoint::new(self.latitude?, self.longitude?))
    }

    /// The normalized city/state.
    pub fn locale(&self) -> Locale {
        Locale::new(&self.city, &self.state)
    }
}

/// A user record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Unique address; users without one are never indexed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Free-text biography.
    #[serde(default)]
    pub bio: String,
    /// Interest tags. Anything other than a list reads as empty.
    #[serde(default, deserialize_with = "string_list")]
    pub interests: Vec<String>,
    /// Home location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Place>,
    /// Unrecognized fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    /// The email and embedding text of an indexable user.
    ///
    /// Users without an email or without interests yield `None`.
    pub fn profile(&self) -> Option<(&str, String)> {
        let email = self.email.as_deref().filter(|e| !e.is_empty())?;
        if self.interests.is_empty() {
            return None;
        }
        Some((
            email,
            format!("{} Interests: {}", self.bio, self.interests.join(", ")),
        ))
    }

    /// The home coordinate, if known.
    pub fn point(&self) -> Option<GeoPoint> {
        self.location.as_ref().and_then(Place::point)
    }

    /// The normalized home locale; empty when unknown.
    pub fn locale(&self) -> Locale {
        self.location.as_ref().map(Place::locale).unwrap_or_default()
    }
}

/// One user's response to an event.
///
/// Every field is optional on read; a response without a status is kept
/// but never counts as attendance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rsvp {
    /// The responding user.
    #[serde(default)]
    pub email: String,
    /// `attended`, `joined`, or anything else the source wrote.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
    /// Rating as written, integer or fractional. Non-numeric values read
    /// as absent.
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub rating: Option<Number>,
    /// Short review text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
}

impl Rsvp {
    /// An RSVP without rating or review.
    pub fn joined(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            status: JOINED.to_string(),
            rating: None,
            review: None,
        }
    }

    /// An attended RSVP with a rating and review.
    pub fn attended(email: impl Into<String>, rating: u8, review: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            status: ATTENDED.to_string(),
            rating: Some(Number::from(rating)),
            review: Some(review.into()),
        }
    }

    /// Whether the status counts as attendance.
    pub fn is_attended(&self) -> bool {
        self.status == ATTENDED && !self.email.is_empty()
    }

    /// The rating as a float.
    pub fn rating(&self) -> Option<f64> {
        self.rating.as_ref().and_then(Number::as_f64)
    }
}

/// An event record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Identifier, string or number; the title stands in when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Title.
    #[serde(default)]
    pub title: String,
    /// Long description.
    #[serde(default)]
    pub description: String,
    /// Category labels.
    #[serde(default, deserialize_with = "string_list")]
    pub categories: Vec<String>,
    /// Free-form tags.
    #[serde(default, deserialize_with = "string_list")]
    pub tags: Vec<String>,
    /// Venue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Place>,
    /// Responses.
    #[serde(default, rename = "rsvpList")]
    pub rsvp_list: Vec<Rsvp>,
    /// Unrecognized fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Event {
    /// The event id, falling back to the title.
    pub fn event_id(&self) -> String {
        match &self.id {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => self.title.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// Embedding text: title, labels, description.
    pub fn text(&self) -> String {
        let labels: Vec<&str> = self
            .categories
            .iter()
            .chain(&self.tags)
            .map(String::as_str)
            .collect();
        format!(
            "{}\nCategories: {}\n{}",
            self.title,
            labels.join(", "),
            self.description
        )
    }

    /// The normalized venue locale; empty when unknown.
    pub fn locale(&self) -> Locale {
        self.location.as_ref().map(Place::locale).unwrap_or_default()
    }
}

fn string_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<Option<Number>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => Some(n),
        Value::String(s) => s.trim().parse::<f64>().ok().and_then(Number::from_f64),
        _ => None,
    })
}

/// Email → ids of events the user attended.
pub fn attendance(events: &[Event]) -> HashMap<String, BTreeSet<String>> {
    let mut map: HashMap<String, BTreeSet<String>> = HashMap::new();
    for event in events {
        let id = event.event_id();
        for rsvp in event.rsvp_list.iter().filter(|r| r.is_attended()) {
            map.entry(rsvp.email.clone()).or_default().insert(id.clone());
        }
    }
    map
}

/// Email → titles of events the user attended, in file order.
pub fn attended_titles(events: &[Event]) -> HashMap<String, Vec<String>> {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for event in events {
        for rsvp in event.rsvp_list.iter().filter(|r| r.is_attended()) {
            map.entry(rsvp.email.clone())
                .or_default()
                .push(event.title.clone());
        }
    }
    map
}

/// Read a JSON array of users.
pub fn load_users(path: &Path) -> Result<Vec<UserProfile>> {
    let users: Vec<UserProfile> = serde_json::from_str(&read_to_string(path)?)?;
    log::debug!("Loaded {} users from {}", users.len(), path.display());
    Ok(users)
}

/// Read a JSON array of events.
pub fn load_events(path: &Path) -> Result<Vec<Event>> {
    let events: Vec<Event> = serde_json::from_str(&read_to_string(path)?)?;
    log::debug!("Loaded {} events from {}", events.len(), path.display());
    Ok(events)
}

/// Write events as a pretty-printed JSON array.
pub fn save_events(path: &Path, events: &[Event]) -> Result<()> {
    write_atomic(path, &serde_json::to_vec_pretty(events)?)
}

// ============================================================================
// Tests
// ============================================================================
