//! KudaGo public events API client and query builder.
//!
//! Any HTTP or parse failure degrades to an empty event list; the tool layer
//! turns that into an apologetic reply instead of an error.

use chrono::{NaiveDate, TimeZone, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info};

use crate::models::activity::ActivityRequest;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

const DEFAULT_FIELDS: &str = "id,title,dates,place,description,images";
const DEFAULT_EXPAND: &str = "images,place,dates";
const DEFAULT_PAGE_SIZE: &str = "10";

/// City slug used when the request names no recognizable city.
pub const DEFAULT_LOCATION: &str = "msk";

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    results: Vec<Event>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub dates: Vec<EventDate>,
    #[serde(default)]
    pub place: Option<Place>,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventDate {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Place {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    #[serde(default)]
    pub image: String,
}

impl Event {
    /// Human-readable summary persisted to the store and shown to the model.
    pub fn summary(&self) -> String {
        let mut lines = vec![format!("Мероприятие: {}", self.title)];
        if let Some(place) = &self.place {
            let mut location = place.title.clone();
            if !place.address.is_empty() {
                if !location.is_empty() {
                    location.push_str(", ");
                }
                location.push_str(&place.address);
            }
            if !location.is_empty() {
                lines.push(format!("Место: {location}"));
            }
        }
        if let Some(start) = self.dates.iter().filter_map(|d| d.start).next() {
            if let Some(dt) = Utc.timestamp_opt(start, 0).single() {
                lines.push(format!("Начало: {}", dt.format("%Y-%m-%d %H:%M")));
            }
        }
        if !self.description.is_empty() {
            lines.push(format!("Описание: {}", strip_tags(&self.description)));
        }
        lines.join("\n")
    }
}

/// Query parameters for one events search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    pub location: String,
    pub categories: Option<String>,
    pub actual_since: Option<i64>,
    pub actual_until: Option<i64>,
}

/// Maps a free-text activity request to KudaGo query parameters: city slug,
/// category slugs, and an epoch-second date window.
pub fn build_event_query(request: &ActivityRequest, now_epoch_secs: i64) -> EventQuery {
    let location = request
        .location_preference
        .as_deref()
        .map(resolve_city_slug)
        .unwrap_or(DEFAULT_LOCATION)
        .to_string();

    let mut words: Vec<&str> = Vec::new();
    if let Some(activity) = request.activity_type.as_deref() {
        words.push(activity);
    }
    words.extend(request.special_requirements.iter().map(String::as_str));

    let mut categories: Vec<&str> = words.iter().filter_map(|w| resolve_category(w)).collect();
    categories.dedup();
    let categories = if categories.is_empty() {
        None
    } else {
        Some(categories.join(","))
    };

    let (actual_since, actual_until) = match request
        .preferred_date
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
    {
        Some(date) => {
            let start = date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp());
            let end = start.map(|s| s + 24 * 60 * 60);
            (start, end)
        }
        None => (Some(now_epoch_secs), None),
    };

    EventQuery {
        location,
        categories,
        actual_since,
        actual_until,
    }
}

fn resolve_city_slug(city: &str) -> &'static str {
    let city = city.to_lowercase();
    if city.contains("моск") {
        "msk"
    } else if city.contains("петербург") || city.contains("спб") {
        "spb"
    } else if city.contains("новосиб") {
        "nsk"
    } else if city.contains("екатеринб") {
        "ekb"
    } else if city.contains("нижн") {
        "nnv"
    } else if city.contains("казан") {
        "kzn"
    } else {
        DEFAULT_LOCATION
    }
}

fn resolve_category(word: &str) -> Option<&'static str> {
    let word = word.to_lowercase();
    if word.contains("театр") {
        Some("theatre")
    } else if word.contains("детск") {
        Some("kids")
    } else if word.contains("музе") {
        Some("museum")
    } else if word.contains("кино") {
        Some("cinema")
    } else if word.contains("концерт") {
        Some("concert")
    } else if word.contains("парк") {
        Some("park")
    } else {
        None
    }
}

fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}

/// HTTP client for the KudaGo public API.
pub struct KudaGoClient {
    client: reqwest::Client,
    base_url: String,
}

impl KudaGoClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(5))
                .timeout(Duration::from_secs(15))
                .build()
                .expect("Failed to build HTTP client"),
            base_url,
        }
    }

    /// Searches events. Any failure is logged and yields an empty list.
    pub async fn search_events(&self, query: &EventQuery) -> Vec<Event> {
        let mut params: Vec<(&str, String)> = vec![
            ("fields", DEFAULT_FIELDS.to_string()),
            ("expand", DEFAULT_EXPAND.to_string()),
            ("lang", "ru".to_string()),
            ("page", "1".to_string()),
            ("page_size", DEFAULT_PAGE_SIZE.to_string()),
            ("location", query.location.clone()),
        ];
        if let Some(categories) = &query.categories {
            params.push(("categories", categories.clone()));
        }
        if let Some(since) = query.actual_since {
            params.push(("actual_since", since.to_string()));
        }
        if let Some(until) = query.actual_until {
            params.push(("actual_until", until.to_string()));
        }

        let request = self
            .client
            .get(format!("{}/events/", self.base_url))
            .query(&params)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/json")
            .header("Accept-Language", "ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7");

        info!("KudaGo request: location={}", query.location);

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                error!("KudaGo request failed: {e}");
                return Vec::new();
            }
        };

        let status = response.status();
        if !status.is_success() {
            error!("KudaGo error: {}", status.as_u16());
            return Vec::new();
        }

        match response.json::<EventsResponse>().await {
            Ok(parsed) => parsed.results,
            Err(e) => {
                error!("KudaGo response parse failed: {e}");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::activity::FamilyMember;

    fn request() -> ActivityRequest {
        ActivityRequest {
            activity_type: Some("театр".into()),
            family_member: Some(FamilyMember {
                role: Some("дочь".into()),
                age: Some(6),
            }),
            preferred_date: Some("2026-09-05".into()),
            needs_time_slot_selection: false,
            budget_constraint: None,
            location_preference: Some("Санкт-Петербург".into()),
            special_requirements: vec!["детский".into()],
        }
    }

    #[test]
    fn test_build_query_maps_categories_and_city() {
        let query = build_event_query(&request(), 0);
        assert_eq!(query.location, "spb");
        assert_eq!(query.categories.as_deref(), Some("theatre,kids"));
    }

    #[test]
    fn test_build_query_date_window_covers_one_day() {
        let query = build_event_query(&request(), 0);
        let since = query.actual_since.unwrap();
        let until = query.actual_until.unwrap();
        assert_eq!(until - since, 24 * 60 * 60);
        // 2026-09-05T00:00:00Z
        assert_eq!(since, 1788566400);
    }

    #[test]
    fn test_build_query_defaults_without_city_or_date() {
        let mut req = request();
        req.location_preference = None;
        req.preferred_date = None;
        let query = build_event_query(&req, 1_700_000_000);
        assert_eq!(query.location, DEFAULT_LOCATION);
        assert_eq!(query.actual_since, Some(1_700_000_000));
        assert_eq!(query.actual_until, None);
    }

    #[test]
    fn test_unknown_category_words_are_skipped() {
        let mut req = request();
        req.activity_type = Some("квест".into());
        req.special_requirements = vec![];
        let query = build_event_query(&req, 0);
        assert!(query.categories.is_none());
    }

    #[test]
    fn test_events_response_parses_expanded_payload() {
        let json = r#"{"count":1,"next":null,"previous":null,"results":[{
            "id":188743,
            "title":"Спектакль «Золушка»",
            "description":"<p>Детский спектакль.</p>",
            "dates":[{"start":1788607200,"end":1788614400}],
            "place":{"title":"ТЮЗ","address":"Пионерская пл., 1"},
            "images":[{"image":"https://kudago.com/media/1.jpg"}]
        }]}"#;
        let parsed: EventsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.results.len(), 1);

        let summary = parsed.results[0].summary();
        assert!(summary.contains("Мероприятие: Спектакль «Золушка»"));
        assert!(summary.contains("Место: ТЮЗ, Пионерская пл., 1"));
        assert!(summary.contains("Описание: Детский спектакль."));
        assert!(!summary.contains("<p>"));
    }
}
