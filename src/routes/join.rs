/**
 * Join Application Routes
 * CRUD API endpoints for membership applications
 */
use axum::{extract::Path, http::StatusCode, response::Response, Json};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::db::{self, models::JoinApplication};
use crate::routes::{failure, parse_doc_id, require_db, success};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinApplicationResponse {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub specialized_in: String,
    pub year: String,
    pub major: String,
    pub specialization: String,
    pub experience: String,
    pub motivation: String,
    pub portfolio: Option<String>,
    pub availability: String,
    pub agree_terms: bool,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<JoinApplication> for JoinApplicationResponse {
    fn from(application: JoinApplication) -> Self {
        Self {
            id: application.id.to_hex(),
            full_name: application.full_name,
            email: application.email,
            phone: application.phone,
            specialized_in: application.specialized_in,
            year: application.year,
            major: application.major,
            specialization: application.specialization,
            experience: application.experience,
            motivation: application.motivation,
            portfolio: application.portfolio,
            availability: application.availability,
            agree_terms: application.agree_terms,
            status: application.status,
            created_at: application.created_at,
            updated_at: application.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinApplicationPayload {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub specialized_in: Option<String>,
    pub year: Option<String>,
    pub major: Option<String>,
    pub specialization: Option<String>,
    pub experience: Option<String>,
    pub motivation: Option<String>,
    pub portfolio: Option<String>,
    pub availability: Option<String>,
    pub agree_terms: Option<bool>,
    pub status: Option<String>,
}

impl JoinApplicationPayload {
    /// `agreeTerms` must be present and true; every other required field must
    /// be present and non-blank. `portfolio` is optional.
    fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        let checks: [(&'static str, Option<&String>); 10] = [
            ("fullName", self.full_name.as_ref()),
            ("email", self.email.as_ref()),
            ("phone", self.phone.as_ref()),
            ("specializedIn", self.specialized_in.as_ref()),
            ("year", self.year.as_ref()),
            ("major", self.major.as_ref()),
            ("specialization", self.specialization.as_ref()),
            ("experience", self.experience.as_ref()),
            ("motivation", self.motivation.as_ref()),
            ("availability", self.availability.as_ref()),
        ];
        for (name, value) in checks {
            if value.map(|v| v.trim().is_empty()).unwrap_or(true) {
                missing.push(name);
            }
        }
        if self.agree_terms != Some(true) {
            missing.push("agreeTerms");
        }
        missing
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/join-applications - List all applications, oldest first
pub async fn list_applications() -> Response {
    let db = match require_db() {
        Ok(db) => db,
        Err(response) => return response,
    };

    let cursor = match db::join_applications(&db)
        .find(doc! {})
        .sort(doc! { "createdAt": 1 })
        .await
    {
        Ok(cursor) => cursor,
        Err(e) => {
            tracing::error!("failed to list join applications: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch applications");
        }
    };

    match cursor.try_collect::<Vec<JoinApplication>>().await {
        Ok(applications) => {
            let data: Vec<JoinApplicationResponse> =
                applications.into_iter().map(Into::into).collect();
            success(StatusCode::OK, data)
        }
        Err(e) => {
            tracing::error!("failed to read join application cursor: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch applications")
        }
    }
}

/// GET /api/join-applications/{id}
pub async fn get_application(Path(id): Path<String>) -> Response {
    let oid = match parse_doc_id(&id) {
        Ok(oid) => oid,
        Err(response) => return response,
    };
    let db = match require_db() {
        Ok(db) => db,
        Err(response) => return response,
    };

    match db::join_applications(&db).find_one(doc! { "_id": oid }).await {
        Ok(Some(application)) => {
            success(StatusCode::OK, JoinApplicationResponse::from(application))
        }
        Ok(None) => failure(StatusCode::NOT_FOUND, "Application not found"),
        Err(e) => {
            tracing::error!("failed to fetch join application: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch application")
        }
    }
}

/// POST /api/join-applications - Submit an application. One application per
/// email, checked with a lookup (not a storage constraint).
pub async fn create_application(Json(payload): Json<JoinApplicationPayload>) -> Response {
    let missing = payload.missing_required();
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

    let email = payload.email.clone().unwrap_or_default();
    match db::join_applications(&db).find_one(doc! { "email": &email }).await {
        Ok(Some(_)) => {
            return failure(
                StatusCode::BAD_REQUEST,
                "An application with this email already exists",
            );
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!("failed to check for existing application: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to submit application");
        }
    }

    let now = Utc::now();
    let application = JoinApplication {
        id: ObjectId::new(),
        full_name: payload.full_name.unwrap_or_default(),
        email,
        phone: payload.phone.unwrap_or_default(),
        specialized_in: payload.specialized_in.unwrap_or_default(),
        year: payload.year.unwrap_or_default(),
        major: payload.major.unwrap_or_default(),
        specialization: payload.specialization.unwrap_or_default(),
        experience: payload.experience.unwrap_or_default(),
        motivation: payload.motivation.unwrap_or_default(),
        portfolio: payload.portfolio,
        availability: payload.availability.unwrap_or_default(),
        agree_terms: payload.agree_terms.unwrap_or(false),
        status: "pending".to_string(),
        created_at: now,
        updated_at: now,
    };

    match db::join_applications(&db).insert_one(&application).await {
        Ok(_) => success(StatusCode::CREATED, JoinApplicationResponse::from(application)),
        Err(e) => {
            tracing::error!("failed to insert join application: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to submit application")
        }
    }
}

/// PUT /api/join-applications/{id} - Partial update; primarily used by the
/// dashboard to move `status` between pending/accepted/rejected.
pub async fn update_application(
    Path(id): Path<String>,
    Json(payload): Json<JoinApplicationPayload>,
) -> Response {
    let oid = match parse_doc_id(&id) {
        Ok(oid) => oid,
        Err(response) => return response,
    };
    let db = match require_db() {
        Ok(db) => db,
        Err(response) => return response,
    };

    let mut application = match db::join_applications(&db).find_one(doc! { "_id": oid }).await {
        Ok(Some(application)) => application,
        Ok(None) => return failure(StatusCode::NOT_FOUND, "Application not found"),
        Err(e) => {
            tracing::error!("failed to fetch join application: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch application");
        }
    };

    if let Some(full_name) = payload.full_name {
        application.full_name = full_name;
    }
    if let Some(email) = payload.email {
        application.email = email;
    }
    if let Some(phone) = payload.phone {
        application.phone = phone;
    }
    if let Some(specialized_in) = payload.specialized_in {
        application.specialized_in = specialized_in;
    }
    if let Some(year) = payload.year {
        application.year = year;
    }
    if let Some(major) = payload.major {
        application.major = major;
    }
    if let Some(specialization) = payload.specialization {
        application.specialization = specialization;
    }
    if let Some(experience) = payload.experience {
        application.experience = experience;
    }
    if let Some(motivation) = payload.motivation {
        application.motivation = motivation;
    }
    if payload.portfolio.is_some() {
        application.portfolio = payload.portfolio;
    }
    if let Some(availability) = payload.availability {
        application.availability = availability;
    }
    if let Some(agree_terms) = payload.agree_terms {
        application.agree_terms = agree_terms;
    }
    if let Some(status) = payload.status {
        application.status = status;
    }
    application.updated_at = Utc::now();

    match db::join_applications(&db)
        .replace_one(doc! { "_id": oid }, &application)
        .await
    {
        Ok(_) => success(StatusCode::OK, JoinApplicationResponse::from(application)),
        Err(e) => {
            tracing::error!("failed to update join application: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update application")
        }
    }
}

/// DELETE /api/join-applications/{id}
pub async fn delete_application(Path(id): Path<String>) -> Response {
    let oid = match parse_doc_id(&id) {
        Ok(oid) => oid,
        Err(response) => return response,
    };
    let db = match require_db() {
        Ok(db) => db,
        Err(response) => return response,
    };

    match db::join_applications(&db).find_one(doc! { "_id": oid }).await {
        Ok(Some(_)) => {}
        Ok(None) => return failure(StatusCode::NOT_FOUND, "Application not found"),
        Err(e) => {
            tracing::error!("failed to fetch join application: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch application");
        }
    }

    match db::join_applications(&db).delete_one(doc! { "_id": oid }).await {
        Ok(_) => success(StatusCode::OK, serde_json::json!({ "message": "Application deleted" })),
        Err(e) => {
            tracing::error!("failed to delete join application: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete application")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_required_full_payload_passes() {
        let payload: JoinApplicationPayload = serde_json::from_str(
            r#"{
                "fullName": "Sara Mostafa",
                "email": "sara@example.com",
                "phone": "0100000000",
                "specializedIn": "frontend",
                "year": "3",
                "major": "CS",
                "specialization": "web",
                "experience": "2 years",
                "motivation": "I want to build things",
                "availability": "weekends",
                "agreeTerms": true
            }"#,
        )
        .unwrap();
        assert!(payload.missing_required().is_empty());
    }

    #[test]
    fn test_missing_required_reports_each_absent_field() {
        let payload: JoinApplicationPayload =
            serde_json::from_str(r#"{"fullName":"Sara"}"#).unwrap();
        let missing = payload.missing_required();
        assert!(missing.contains(&"email"));
        assert!(missing.contains(&"agreeTerms"));
        assert!(!missing.contains(&"fullName"));
    }

    #[test]
    fn test_agree_terms_false_counts_as_missing() {
        let payload: JoinApplicationPayload =
            serde_json::from_str(r#"{"agreeTerms":false}"#).unwrap();
        assert!(payload.missing_required().contains(&"agreeTerms"));
    }

    #[test]
    fn test_portfolio_is_optional() {
        let payload: JoinApplicationPayload = serde_json::from_str(r#"{}"#).unwrap();
        assert!(!payload.missing_required().contains(&"portfolio"));
    }
}
