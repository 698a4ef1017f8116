/**
 * Team Member Routes
 * CRUD API endpoints for team members
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
use serde::Serialize;

use crate::db::{self, models::ImageAsset, models::SocialLinks, models::TeamMember};
use crate::media;
use crate::routes::{collect_multipart, failure, parse_doc_id, require_db, success};

const REQUIRED_FIELDS: &[&str] = &["name", "email", "role"];

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMemberResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub status: String,
    pub skills: Vec<String>,
    pub bio: Option<String>,
    pub social_links: SocialLinks,
    pub avatar: Option<ImageAsset>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TeamMember> for TeamMemberResponse {
    fn from(member: TeamMember) -> Self {
        Self {
            id: member.id.to_hex(),
            name: member.name,
            email: member.email,
            role: member.role,
            status: member.status,
            skills: member.skills,
            bio: member.bio,
            social_links: member.social_links,
            avatar: member.avatar,
            created_at: member.created_at,
            updated_at: member.updated_at,
        }
    }
}

fn parse_social_links(raw: Option<&str>) -> Option<SocialLinks> {
    raw.and_then(|value| serde_json::from_str(value).ok())
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/team-members - List all members, newest first
pub async fn list_members() -> Response {
    let db = match require_db() {
        Ok(db) => db,
        Err(response) => return response,
    };

    let cursor = match db::team_members(&db)
        .find(doc! {})
        .sort(doc! { "createdAt": -1 })
        .await
    {
        Ok(cursor) => cursor,
        Err(e) => {
            tracing::error!("failed to list team members: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch team members");
        }
    };

    match cursor.try_collect::<Vec<TeamMember>>().await {
        Ok(members) => {
            let data: Vec<TeamMemberResponse> = members.into_iter().map(Into::into).collect();
            success(StatusCode::OK, data)
        }
        Err(e) => {
            tracing::error!("failed to read team member cursor: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch team members")
        }
    }
}

/// GET /api/team-members/{id}
pub async fn get_member(Path(id): Path<String>) -> Response {
    let oid = match parse_doc_id(&id) {
        Ok(oid) => oid,
        Err(response) => return response,
    };
    let db = match require_db() {
        Ok(db) => db,
        Err(response) => return response,
    };

    match db::team_members(&db).find_one(doc! { "_id": oid }).await {
        Ok(Some(member)) => success(StatusCode::OK, TeamMemberResponse::from(member)),
        Ok(None) => failure(StatusCode::NOT_FOUND, "Team member not found"),
        Err(e) => {
            tracing::error!("failed to fetch team member: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch team member")
        }
    }
}

/// POST /api/team-members - Create a member from a multipart form
pub async fn create_member(mut multipart: Multipart) -> Response {
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

    let avatar = match form.first_file("avatar") {
        Some(file) => match media::upload(file.bytes.clone(), &file.filename).await {
            Ok(asset) => Some(asset),
            Err(e) => {
                tracing::error!(filename = %file.filename, error = %e, "avatar upload failed");
                return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to upload avatar");
            }
        },
        None => None,
    };

    let now = Utc::now();
    let member = TeamMember {
        id: ObjectId::new(),
        name: form.text("name").unwrap_or_default().to_string(),
        email: form.text("email").unwrap_or_default().to_string(),
        role: form.text("role").unwrap_or_default().to_string(),
        status: form
            .text("status")
            .filter(|s| !s.is_empty())
            .unwrap_or("active")
            .to_string(),
        skills: form.json_list("skills"),
        bio: form.text("bio").map(str::to_string),
        social_links: parse_social_links(form.text("socialLinks")).unwrap_or_default(),
        avatar,
        created_at: now,
        updated_at: now,
    };

    match db::team_members(&db).insert_one(&member).await {
        Ok(_) => success(StatusCode::CREATED, TeamMemberResponse::from(member)),
        Err(e) => {
            tracing::error!("failed to insert team member: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create team member")
        }
    }
}

/// PUT /api/team-members/{id} - Update a member; a replacement avatar is
/// uploaded before the old asset is deleted.
pub async fn update_member(Path(id): Path<String>, mut multipart: Multipart) -> Response {
    let oid = match parse_doc_id(&id) {
        Ok(oid) => oid,
        Err(response) => return response,
    };
    let db = match require_db() {
        Ok(db) => db,
        Err(response) => return response,
    };

    let mut member = match db::team_members(&db).find_one(doc! { "_id": oid }).await {
        Ok(Some(member)) => member,
        Ok(None) => return failure(StatusCode::NOT_FOUND, "Team member not found"),
        Err(e) => {
            tracing::error!("failed to fetch team member: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch team member");
        }
    };

    let form = match collect_multipart(&mut multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    if let Some(name) = form.text("name") {
        member.name = name.to_string();
    }
    if let Some(email) = form.text("email") {
        member.email = email.to_string();
    }
    if let Some(role) = form.text("role") {
        member.role = role.to_string();
    }
    if let Some(status) = form.text("status") {
        member.status = status.to_string();
    }
    if form.text("skills").is_some() {
        member.skills = form.json_list("skills");
    }
    if let Some(bio) = form.text("bio") {
        member.bio = Some(bio.to_string());
    }
    if let Some(links) = parse_social_links(form.text("socialLinks")) {
        member.social_links = links;
    }

    if let Some(file) = form.first_file("avatar") {
        match media::upload(file.bytes.clone(), &file.filename).await {
            Ok(asset) => {
                if let Some(old) = member.avatar.replace(asset) {
                    media::destroy_best_effort(&old.asset_id).await;
                }
            }
            Err(e) => {
                tracing::error!(filename = %file.filename, error = %e, "avatar upload failed");
                return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to upload avatar");
            }
        }
    }

    member.updated_at = Utc::now();

    match db::team_members(&db).replace_one(doc! { "_id": oid }, &member).await {
        Ok(_) => success(StatusCode::OK, TeamMemberResponse::from(member)),
        Err(e) => {
            tracing::error!("failed to update team member: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update team member")
        }
    }
}

/// DELETE /api/team-members/{id}
pub async fn delete_member(Path(id): Path<String>) -> Response {
    let oid = match parse_doc_id(&id) {
        Ok(oid) => oid,
        Err(response) => return response,
    };
    let db = match require_db() {
        Ok(db) => db,
        Err(response) => return response,
    };

    let member = match db::team_members(&db).find_one(doc! { "_id": oid }).await {
        Ok(Some(member)) => member,
        Ok(None) => return failure(StatusCode::NOT_FOUND, "Team member not found"),
        Err(e) => {
            tracing::error!("failed to fetch team member: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch team member");
        }
    };

    if let Some(avatar) = &member.avatar {
        media::destroy_best_effort(&avatar.asset_id).await;
    }

    match db::team_members(&db).delete_one(doc! { "_id": oid }).await {
        Ok(_) => success(StatusCode::OK, serde_json::json!({ "message": "Team member deleted" })),
        Err(e) => {
            tracing::error!("failed to delete team member: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete team member")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_social_links() {
        let links = parse_social_links(Some(r#"{"github":"https://github.com/x"}"#)).unwrap();
        assert_eq!(links.github.as_deref(), Some("https://github.com/x"));
        assert!(links.linkedin.is_none());
    }

    #[test]
    fn test_parse_social_links_invalid_json_is_none() {
        assert!(parse_social_links(Some("nope")).is_none());
        assert!(parse_social_links(None).is_none());
    }
}
