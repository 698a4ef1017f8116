/**
 * Event Routes
 * CRUD API endpoints for events. Attendees are stored as team member ids and
 * resolved against the members collection at read time.
 */
use axum::{
    extract::{Multipart, Path},
    http::StatusCode,
    response::Response,
};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::bson::oid::ObjectId;
use mongodb::Database;
use serde::Serialize;

use crate::db::{self, models::Event, models::ImageAsset, models::TeamMember};
use crate::media;
use crate::routes::{collect_multipart, failure, parse_doc_id, require_db, success, FormData};

const REQUIRED_FIELDS: &[&str] = &["title", "description", "date", "location"];

// ============================================================================
// Request/Response Types
// ============================================================================

/// Resolved attendee embedded in event responses
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub avatar: Option<ImageAsset>,
}

impl From<TeamMember> for AttendeeResponse {
    fn from(member: TeamMember) -> Self {
        Self {
            id: member.id.to_hex(),
            name: member.name,
            email: member.email,
            role: member.role,
            avatar: member.avatar,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub date: String,
    pub location: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub status: String,
    pub image: Option<ImageAsset>,
    pub attendees: Vec<AttendeeResponse>,
    pub registration_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventResponse {
    fn from_event(event: Event, attendees: Vec<AttendeeResponse>) -> Self {
        Self {
            id: event.id.to_hex(),
            title: event.title,
            description: event.description,
            date: event.date,
            location: event.location,
            event_type: event.event_type,
            status: event.status,
            image: event.image,
            attendees,
            registration_link: event.registration_link,
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

// ============================================================================
// Attendee handling
// ============================================================================

/// Attendee ids arrive as a JSON array of hex strings; ids that do not parse
/// are dropped.
fn parse_attendee_ids(form: &FormData) -> Vec<ObjectId> {
    form.json_list("attendees")
        .iter()
        .filter_map(|id| ObjectId::parse_str(id).ok())
        .collect()
}

/// Look up the referenced members in one `$in` query. Dangling references
/// resolve to nothing and are silently omitted.
async fn resolve_attendees(db: &Database, ids: &[ObjectId]) -> Vec<AttendeeResponse> {
    if ids.is_empty() {
        return Vec::new();
    }

    let cursor = match db::team_members(db)
        .find(doc! { "_id": { "$in": ids.to_vec() } })
        .await
    {
        Ok(cursor) => cursor,
        Err(e) => {
            tracing::warn!("failed to resolve event attendees: {}", e);
            return Vec::new();
        }
    };

    match cursor.try_collect::<Vec<TeamMember>>().await {
        Ok(members) => members.into_iter().map(Into::into).collect(),
        Err(e) => {
            tracing::warn!("failed to read attendee cursor: {}", e);
            Vec::new()
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/events - List all events, newest first
pub async fn list_events() -> Response {
    let db = match require_db() {
        Ok(db) => db,
        Err(response) => return response,
    };

    let cursor = match db::events(&db)
        .find(doc! {})
        .sort(doc! { "createdAt": -1 })
        .await
    {
        Ok(cursor) => cursor,
        Err(e) => {
            tracing::error!("failed to list events: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch events");
        }
    };

    let events = match cursor.try_collect::<Vec<Event>>().await {
        Ok(events) => events,
        Err(e) => {
            tracing::error!("failed to read event cursor: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch events");
        }
    };

    let mut data = Vec::with_capacity(events.len());
    for event in events {
        let attendees = resolve_attendees(&db, &event.attendees).await;
        data.push(EventResponse::from_event(event, attendees));
    }

    success(StatusCode::OK, data)
}

/// GET /api/events/{id}
pub async fn get_event(Path(id): Path<String>) -> Response {
    let oid = match parse_doc_id(&id) {
        Ok(oid) => oid,
        Err(response) => return response,
    };
    let db = match require_db() {
        Ok(db) => db,
        Err(response) => return response,
    };

    match db::events(&db).find_one(doc! { "_id": oid }).await {
        Ok(Some(event)) => {
            let attendees = resolve_attendees(&db, &event.attendees).await;
            success(StatusCode::OK, EventResponse::from_event(event, attendees))
        }
        Ok(None) => failure(StatusCode::NOT_FOUND, "Event not found"),
        Err(e) => {
            tracing::error!("failed to fetch event: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch event")
        }
    }
}

/// POST /api/events - Create an event from a multipart form
pub async fn create_event(mut multipart: Multipart) -> Response {
    let form = match collect_multipart(&mut multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    let missing = form.missing(REQUIRED_FIELDS);
    if !missing.is_empty() {
        return failure(
            StatusCode::BAD_REQUEST,
            format!("Missing required fields: {}", missing.join(", ")),
        );
    }

    let db = match require_db() {
        Ok(db) => db,
        Err(response) => return response,
    };

    let image = match form.first_file("image") {
        Some(file) => match media::upload(file.bytes.clone(), &file.filename).await {
            Ok(asset) => Some(asset),
            Err(e) => {
                tracing::error!(filename = %file.filename, error = %e, "event image upload failed");
                return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to upload image");
            }
        },
        None => None,
    };

    let now = Utc::now();
    let event = Event {
        id: ObjectId::new(),
        title: form.text("title").unwrap_or_default().to_string(),
        description: form.text("description").unwrap_or_default().to_string(),
        date: form.text("date").unwrap_or_default().to_string(),
        location: form.text("location").unwrap_or_default().to_string(),
        event_type: form.text("type").unwrap_or_default().to_string(),
        status: form
            .text("status")
            .filter(|s| !s.is_empty())
            .unwrap_or("upcoming")
            .to_string(),
        image,
        attendees: parse_attendee_ids(&form),
        registration_link: form.text("registrationLink").map(str::to_string),
        created_at: now,
        updated_at: now,
    };

    let attendees = resolve_attendees(&db, &event.attendees).await;

    match db::events(&db).insert_one(&event).await {
        Ok(_) => success(StatusCode::CREATED, EventResponse::from_event(event, attendees)),
        Err(e) => {
            tracing::error!("failed to insert event: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create event")
        }
    }
}

/// PUT /api/events/{id}
pub async fn update_event(Path(id): Path<String>, mut multipart: Multipart) -> Response {
    let oid = match parse_doc_id(&id) {
        Ok(oid) => oid,
        Err(response) => return response,
    };
    let db = match require_db() {
        Ok(db) => db,
        Err(response) => return response,
    };

    let mut event = match db::events(&db).find_one(doc! { "_id": oid }).await {
        Ok(Some(event)) => event,
        Ok(None) => return failure(StatusCode::NOT_FOUND, "Event not found"),
        Err(e) => {
            tracing::error!("failed to fetch event: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch event");
        }
    };

    let form = match collect_multipart(&mut multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    if let Some(title) = form.text("title") {
        event.title = title.to_string();
    }
    if let Some(description) = form.text("description") {
        event.description = description.to_string();
    }
    if let Some(date) = form.text("date") {
        event.date = date.to_string();
    }
    if let Some(location) = form.text("location") {
        event.location = location.to_string();
    }
    if let Some(event_type) = form.text("type") {
        event.event_type = event_type.to_string();
    }
    if let Some(status) = form.text("status") {
        event.status = status.to_string();
    }
    if form.text("attendees").is_some() {
        event.attendees = parse_attendee_ids(&form);
    }
    if let Some(link) = form.text("registrationLink") {
        event.registration_link = Some(link.to_string());
    }

    if let Some(file) = form.first_file("image") {
        match media::upload(file.bytes.clone(), &file.filename).await {
            Ok(asset) => {
                if let Some(old) = event.image.replace(asset) {
                    media::destroy_best_effort(&old.asset_id).await;
                }
            }
            Err(e) => {
                tracing::error!(filename = %file.filename, error = %e, "event image upload failed");
                return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to upload image");
            }
        }
    }

    event.updated_at = Utc::now();

    match db::events(&db).replace_one(doc! { "_id": oid }, &event).await {
        Ok(_) => {
            let attendees = resolve_attendees(&db, &event.attendees).await;
            success(StatusCode::OK, EventResponse::from_event(event, attendees))
        }
        Err(e) => {
            tracing::error!("failed to update event: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update event")
        }
    }
}

/// DELETE /api/events/{id}
pub async fn delete_event(Path(id): Path<String>) -> Response {
    let oid = match parse_doc_id(&id) {
        Ok(oid) => oid,
        Err(response) => return response,
    };
    let db = match require_db() {
        Ok(db) => db,
        Err(response) => return response,
    };

    let event = match db::events(&db).find_one(doc! { "_id": oid }).await {
        Ok(Some(event)) => event,
        Ok(None) => return failure(StatusCode::NOT_FOUND, "Event not found"),
        Err(e) => {
            tracing::error!("failed to fetch event: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch event");
        }
    };

    if let Some(image) = &event.image {
        media::destroy_best_effort(&image.asset_id).await;
    }

    match db::events(&db).delete_one(doc! { "_id": oid }).await {
        Ok(_) => success(StatusCode::OK, serde_json::json!({ "message": "Event deleted" })),
        Err(e) => {
            tracing::error!("failed to delete event: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete event")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::FormData;

    #[test]
    fn test_parse_attendee_ids_drops_malformed() {
        let mut form = FormData::default();
        form.fields.insert(
            "attendees".to_string(),
            r#"["5f8d0d55b54764421b7156c3","not-an-id"]"#.to_string(),
        );

        let ids = parse_attendee_ids(&form);
        assert_eq!(ids.len(), 1);
        assert_eq!(ids[0].to_hex(), "5f8d0d55b54764421b7156c3");
    }

    #[test]
    fn test_parse_attendee_ids_absent_field() {
        let form = FormData::default();
        assert!(parse_attendee_ids(&form).is_empty());
    }
}
