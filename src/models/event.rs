use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::AppError;
use super::validation::{Validate, Validator};
use super::{merge, merge_optional, Patch, Record, RecordId};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: RecordId,
    pub title: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub image_url: Option<String>,
    pub organizer: Option<String>,
    pub event_type: Option<String>,
    pub price: Option<f64>,
    pub featured: bool,
    pub created_by: Option<RecordId>,
    pub created_at: DateTime<Utc>,
}

impl Record for Event {
    fn id(&self) -> RecordId {
        self.id
    }
}

/// Accepts RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM:SS` (read as UTC)
/// and bare dates (midnight UTC).
pub fn parse_event_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn check_date(v: &mut Validator, field: &str, raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    let parsed = parse_event_date(raw);
    v.check(field, parsed.is_some(), "Invalid date format");
    parsed
}

/// Body of `POST /api/events`; `eventDate` is accepted as an alias.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    pub title: String,
    pub description: String,
    #[serde(alias = "eventDate")]
    pub start_date: String,
    pub end_date: Option<String>,
    pub location: String,
    pub organizer: String,
    pub image_url: Option<String>,
    pub event_type: Option<String>,
    pub price: Option<f64>,
    pub featured: Option<bool>,
}

impl Validate for EventRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        v.length("title", &self.title, 3, Some(100))
            .length("description", &self.description, 10, None)
            .length("location", &self.location, 3, None)
            .length("organizer", &self.organizer, 3, None)
            .url("imageUrl", self.image_url.as_deref());
        if let Some(price) = self.price {
            v.non_negative("price", price);
        }

        let start = check_date(&mut v, "startDate", Some(&self.start_date));
        let end = check_date(&mut v, "endDate", self.end_date.as_deref());
        if let (Some(start), Some(end)) = (start, end) {
            v.check("endDate", end >= start, "must not be before startDate");
        }
        v.finish("Invalid event data")
    }
}

/// A validated event ready for storage
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub image_url: Option<String>,
    pub organizer: Option<String>,
    pub event_type: Option<String>,
    pub price: Option<f64>,
    pub featured: bool,
    pub created_by: Option<RecordId>,
}

impl NewEvent {
    pub fn from_request(request: EventRequest, created_by: RecordId) -> Result<Self, AppError> {
        request.validate()?;
        let start_date = parse_event_date(&request.start_date)
            .ok_or_else(|| AppError::internal_error("start date failed to parse after validation"))?;

        Ok(Self {
            title: request.title,
            description: Some(request.description),
            start_date,
            end_date: request.end_date.as_deref().and_then(parse_event_date),
            location: Some(request.location),
            image_url: request.image_url,
            organizer: Some(request.organizer),
            event_type: request.event_type,
            price: request.price,
            featured: request.featured.unwrap_or(false),
            created_by: Some(created_by),
        })
    }

    pub fn into_record(self, id: RecordId, created_at: DateTime<Utc>) -> Event {
        Event {
            id,
            title: self.title,
            description: self.description,
            start_date: self.start_date,
            end_date: self.end_date,
            location: self.location,
            image_url: self.image_url,
            organizer: self.organizer,
            event_type: self.event_type,
            price: self.price,
            featured: self.featured,
            created_by: self.created_by,
            created_at,
        }
    }
}

/// Body of `PATCH /api/events/:id`: the create rules, every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPatchRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "eventDate")]
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub location: Option<String>,
    pub organizer: Option<String>,
    pub image_url: Option<String>,
    pub event_type: Option<String>,
    pub price: Option<f64>,
    pub featured: Option<bool>,
}

impl Validate for EventPatchRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        v.optional_length("title", self.title.as_deref(), 3, Some(100))
            .optional_length("description", self.description.as_deref(), 10, None)
            .optional_length("location", self.location.as_deref(), 3, None)
            .optional_length("organizer", self.organizer.as_deref(), 3, None)
            .url("imageUrl", self.image_url.as_deref());
        if let Some(price) = self.price {
            v.non_negative("price", price);
        }
        check_date(&mut v, "startDate", self.start_date.as_deref());
        check_date(&mut v, "endDate", self.end_date.as_deref());
        v.finish("Invalid event data")
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub image_url: Option<String>,
    pub organizer: Option<String>,
    pub event_type: Option<String>,
    pub price: Option<f64>,
    pub featured: Option<bool>,
}

impl From<EventPatchRequest> for EventPatch {
    fn from(request: EventPatchRequest) -> Self {
        Self {
            title: request.title,
            description: request.description,
            start_date: request.start_date.as_deref().and_then(parse_event_date),
            end_date: request.end_date.as_deref().and_then(parse_event_date),
            location: request.location,
            image_url: request.image_url,
            organizer: request.organizer,
            event_type: request.event_type,
            price: request.price,
            featured: request.featured,
        }
    }
}

impl EventPatch {
    /// The end date must not precede the start once the patch is merged.
    pub fn check_against(&self, event: &Event) -> Result<(), AppError> {
        let start = self.start_date.unwrap_or(event.start_date);
        let end = self.end_date.or(event.end_date);
        let mut v = Validator::new();
        if let Some(end) = end {
            v.check("endDate", end >= start, "must not be before startDate");
        }
        v.finish("Invalid event data")
    }
}

impl Patch<Event> for EventPatch {
    fn apply_to(self, event: &mut Event) {
        merge(&mut event.title, self.title);
        merge_optional(&mut event.description, self.description);
        merge(&mut event.start_date, self.start_date);
        merge_optional(&mut event.end_date, self.end_date);
        merge_optional(&mut event.location, self.location);
        merge_optional(&mut event.image_url, self.image_url);
        merge_optional(&mut event.organizer, self.organizer);
        merge_optional(&mut event.event_type, self.event_type);
        merge_optional(&mut event.price, self.price);
        merge(&mut event.featured, self.featured);
    }
}
