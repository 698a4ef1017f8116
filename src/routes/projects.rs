/**
 * Project Routes
 * CRUD API endpoints for projects
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

use crate::db::{self, models::ImageAsset, models::Project};
use crate::media;
use crate::routes::{collect_multipart, failure, parse_doc_id, require_db, success};

const REQUIRED_FIELDS: &[&str] = &["name", "description"];

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: String,
    pub progress: i32,
    pub technologies: Vec<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub github_url: Option<String>,
    pub live_url: Option<String>,
    pub image: Option<ImageAsset>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Project> for ProjectResponse {
    fn from(project: Project) -> Self {
        Self {
            id: project.id.to_hex(),
            name: project.name,
            description: project.description,
            status: project.status,
            progress: project.progress,
            technologies: project.technologies,
            start_date: project.start_date,
            end_date: project.end_date,
            github_url: project.github_url,
            live_url: project.live_url,
            image: project.image,
            created_at: project.created_at,
            updated_at: project.updated_at,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/projects - List all projects, newest first
pub async fn list_projects() -> Response {
    let db = match require_db() {
        Ok(db) => db,
        Err(response) => return response,
    };

    let cursor = match db::projects(&db)
        .find(doc! {})
        .sort(doc! { "createdAt": -1 })
        .await
    {
        Ok(cursor) => cursor,
        Err(e) => {
            tracing::error!("failed to list projects: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch projects");
        }
    };

    match cursor.try_collect::<Vec<Project>>().await {
        Ok(projects) => {
            let data: Vec<ProjectResponse> = projects.into_iter().map(Into::into).collect();
            success(StatusCode::OK, data)
        }
        Err(e) => {
            tracing::error!("failed to read project cursor: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch projects")
        }
    }
}

/// GET /api/projects/{id}
pub async fn get_project(Path(id): Path<String>) -> Response {
    let oid = match parse_doc_id(&id) {
        Ok(oid) => oid,
        Err(response) => return response,
    };
    let db = match require_db() {
        Ok(db) => db,
        Err(response) => return response,
    };

    match db::projects(&db).find_one(doc! { "_id": oid }).await {
        Ok(Some(project)) => success(StatusCode::OK, ProjectResponse::from(project)),
        Ok(None) => failure(StatusCode::NOT_FOUND, "Project not found"),
        Err(e) => {
            tracing::error!("failed to fetch project: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch project")
        }
    }
}

/// POST /api/projects - Create a project from a multipart form
pub async fn create_project(mut multipart: Multipart) -> Response {
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

    // A single-asset entity: a failed upload aborts this create.
    let image = match form.first_file("image") {
        Some(file) => match media::upload(file.bytes.clone(), &file.filename).await {
            Ok(asset) => Some(asset),
            Err(e) => {
                tracing::error!(filename = %file.filename, error = %e, "project image upload failed");
                return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to upload image");
            }
        },
        None => None,
    };

    let now = Utc::now();
    let project = Project {
        id: ObjectId::new(),
        name: form.text("name").unwrap_or_default().to_string(),
        description: form.text("description").unwrap_or_default().to_string(),
        status: form
            .text("status")
            .filter(|s| !s.is_empty())
            .unwrap_or("active")
            .to_string(),
        progress: form
            .text("progress")
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(0),
        technologies: form.json_list("technologies"),
        start_date: form.text("startDate").map(str::to_string),
        end_date: form.text("endDate").map(str::to_string),
        github_url: form.text("githubUrl").map(str::to_string),
        live_url: form.text("liveUrl").map(str::to_string),
        image,
        created_at: now,
        updated_at: now,
    };

    match db::projects(&db).insert_one(&project).await {
        Ok(_) => success(StatusCode::CREATED, ProjectResponse::from(project)),
        Err(e) => {
            tracing::error!("failed to insert project: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create project")
        }
    }
}

/// PUT /api/projects/{id} - Update a project. A replacement image is uploaded
/// first; the old asset is deleted only after the new upload succeeds.
/// Field values are applied as given, without re-running create validation.
pub async fn update_project(Path(id): Path<String>, mut multipart: Multipart) -> Response {
    let oid = match parse_doc_id(&id) {
        Ok(oid) => oid,
        Err(response) => return response,
    };
    let db = match require_db() {
        Ok(db) => db,
        Err(response) => return response,
    };

    let mut project = match db::projects(&db).find_one(doc! { "_id": oid }).await {
        Ok(Some(project)) => project,
        Ok(None) => return failure(StatusCode::NOT_FOUND, "Project not found"),
        Err(e) => {
            tracing::error!("failed to fetch project: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch project");
        }
    };

    let form = match collect_multipart(&mut multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    if let Some(name) = form.text("name") {
        project.name = name.to_string();
    }
    if let Some(description) = form.text("description") {
        project.description = description.to_string();
    }
    if let Some(status) = form.text("status") {
        project.status = status.to_string();
    }
    if let Some(progress) = form.text("progress").and_then(|raw| raw.parse().ok()) {
        project.progress = progress;
    }
    if form.text("technologies").is_some() {
        project.technologies = form.json_list("technologies");
    }
    if let Some(start_date) = form.text("startDate") {
        project.start_date = Some(start_date.to_string());
    }
    if let Some(end_date) = form.text("endDate") {
        project.end_date = Some(end_date.to_string());
    }
    if let Some(github_url) = form.text("githubUrl") {
        project.github_url = Some(github_url.to_string());
    }
    if let Some(live_url) = form.text("liveUrl") {
        project.live_url = Some(live_url.to_string());
    }

    if let Some(file) = form.first_file("image") {
        match media::upload(file.bytes.clone(), &file.filename).await {
            Ok(asset) => {
                if let Some(old) = project.image.replace(asset) {
                    media::destroy_best_effort(&old.asset_id).await;
                }
            }
            Err(e) => {
                tracing::error!(filename = %file.filename, error = %e, "project image upload failed");
                return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to upload image");
            }
        }
    }

    project.updated_at = Utc::now();

    match db::projects(&db).replace_one(doc! { "_id": oid }, &project).await {
        Ok(_) => success(StatusCode::OK, ProjectResponse::from(project)),
        Err(e) => {
            tracing::error!("failed to update project: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update project")
        }
    }
}

/// DELETE /api/projects/{id}
pub async fn delete_project(Path(id): Path<String>) -> Response {
    let oid = match parse_doc_id(&id) {
        Ok(oid) => oid,
        Err(response) => return response,
    };
    let db = match require_db() {
        Ok(db) => db,
        Err(response) => return response,
    };

    let project = match db::projects(&db).find_one(doc! { "_id": oid }).await {
        Ok(Some(project)) => project,
        Ok(None) => return failure(StatusCode::NOT_FOUND, "Project not found"),
        Err(e) => {
            tracing::error!("failed to fetch project: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch project");
        }
    };

    if let Some(image) = &project.image {
        media::destroy_best_effort(&image.asset_id).await;
    }

    match db::projects(&db).delete_one(doc! { "_id": oid }).await {
        Ok(_) => success(StatusCode::OK, serde_json::json!({ "message": "Project deleted" })),
        Err(e) => {
            tracing::error!("failed to delete project: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete project")
        }
    }
}
