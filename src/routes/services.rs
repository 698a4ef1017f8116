/**
 * Service Routes
 * CRUD API endpoints for offered services. Reads merge the legacy `services`
 * collection with the primary `ourservices` collection.
 */
use axum::{
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::bson::oid::ObjectId;
use mongodb::{Collection, Database};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::db::{self, models::Service};
use crate::routes::{failure, parse_doc_id, require_db, success};

const REQUIRED_FIELDS: &[&str] = &["title", "description", "icon", "type"];

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(rename = "price_per_hour")]
    pub price_per_hour: Option<f64>,
    #[serde(rename = "price_per_project")]
    pub price_per_project: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Service> for ServiceResponse {
    fn from(service: Service) -> Self {
        Self {
            id: service.id.to_hex(),
            title: service.title,
            description: service.description,
            icon: service.icon,
            service_type: service.service_type,
            price_per_hour: service.price_per_hour,
            price_per_project: service.price_per_project,
            created_at: service.created_at,
            updated_at: service.updated_at,
        }
    }
}

/// Body for create and update. All fields optional so update can be partial;
/// create enforces its required set separately.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    #[serde(rename = "type")]
    pub service_type: Option<String>,
    #[serde(rename = "price_per_hour")]
    pub price_per_hour: Option<f64>,
    #[serde(rename = "price_per_project")]
    pub price_per_project: Option<f64>,
}

impl ServicePayload {
    fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        let checks: [(&'static str, Option<&String>); 4] = [
            ("title", self.title.as_ref()),
            ("description", self.description.as_ref()),
            ("icon", self.icon.as_ref()),
            ("type", self.service_type.as_ref()),
        ];
        for (name, value) in checks {
            if value.map(|v| v.trim().is_empty()).unwrap_or(true) {
                missing.push(name);
            }
        }
        missing
    }
}

// ============================================================================
// Merge
// ============================================================================

/// Last-write-wins merge keyed by document id: legacy entries are inserted
/// first, primary entries second, so primary overwrites on collision. Output
/// order is insertion order.
fn merge_services(legacy: Vec<Service>, primary: Vec<Service>) -> Vec<Service> {
    let mut order: Vec<ObjectId> = Vec::new();
    let mut by_id: HashMap<ObjectId, Service> = HashMap::new();

    for service in legacy.into_iter().chain(primary) {
        if !by_id.contains_key(&service.id) {
            order.push(service.id);
        }
        by_id.insert(service.id, service);
    }

    order.into_iter().filter_map(|id| by_id.remove(&id)).collect()
}

async fn collect_all(collection: &Collection<Service>) -> Result<Vec<Service>, mongodb::error::Error> {
    collection
        .find(doc! {})
        .sort(doc! { "createdAt": -1 })
        .await?
        .try_collect()
        .await
}

/// Locate a service by id: the primary collection wins, then legacy.
async fn find_service(db: &Database, oid: ObjectId) -> Result<Option<(Collection<Service>, Service)>, mongodb::error::Error> {
    let primary = db::services(db);
    if let Some(service) = primary.find_one(doc! { "_id": oid }).await? {
        return Ok(Some((primary, service)));
    }

    let legacy = db::services_legacy(db);
    if let Some(service) = legacy.find_one(doc! { "_id": oid }).await? {
        return Ok(Some((legacy, service)));
    }

    Ok(None)
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/our-service - Merged listing across both collections
pub async fn list_services() -> Response {
    let db = match require_db() {
        Ok(db) => db,
        Err(response) => return response,
    };

    let legacy = match collect_all(&db::services_legacy(&db)).await {
        Ok(services) => services,
        Err(e) => {
            tracing::error!("failed to read legacy services: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch services");
        }
    };
    let primary = match collect_all(&db::services(&db)).await {
        Ok(services) => services,
        Err(e) => {
            tracing::error!("failed to read services: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch services");
        }
    };

    let data: Vec<ServiceResponse> = merge_services(legacy, primary)
        .into_iter()
        .map(Into::into)
        .collect();
    success(StatusCode::OK, data)
}

/// GET /api/our-service/{id}
///
/// Returns the bare document with no envelope. Existing dashboard callers
/// parse this shape, so it stays unwrapped.
pub async fn get_service(Path(id): Path<String>) -> Response {
    let oid = match parse_doc_id(&id) {
        Ok(oid) => oid,
        Err(response) => return response,
    };
    let db = match require_db() {
        Ok(db) => db,
        Err(response) => return response,
    };

    match find_service(&db, oid).await {
        Ok(Some((_, service))) => {
            (StatusCode::OK, Json(ServiceResponse::from(service))).into_response()
        }
        Ok(None) => failure(StatusCode::NOT_FOUND, "Service not found"),
        Err(e) => {
            tracing::error!("failed to fetch service: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch service")
        }
    }
}

/// POST /api/our-service - Create a service (primary collection)
pub async fn create_service(Json(payload): Json<ServicePayload>) -> Response {
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

    let now = Utc::now();
    let service = Service {
        id: ObjectId::new(),
        title: payload.title.unwrap_or_default(),
        description: payload.description.unwrap_or_default(),
        icon: payload.icon.unwrap_or_default(),
        service_type: payload.service_type.unwrap_or_default(),
        price_per_hour: payload.price_per_hour,
        price_per_project: payload.price_per_project,
        created_at: now,
        updated_at: now,
    };

    match db::services(&db).insert_one(&service).await {
        Ok(_) => success(StatusCode::CREATED, ServiceResponse::from(service)),
        Err(e) => {
            tracing::error!("failed to insert service: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create service")
        }
    }
}

/// PUT /api/our-service/{id} - Update whichever collection holds the service
pub async fn update_service(Path(id): Path<String>, Json(payload): Json<ServicePayload>) -> Response {
    let oid = match parse_doc_id(&id) {
        Ok(oid) => oid,
        Err(response) => return response,
    };
    let db = match require_db() {
        Ok(db) => db,
        Err(response) => return response,
    };

    let (collection, mut service) = match find_service(&db, oid).await {
        Ok(Some(found)) => found,
        Ok(None) => return failure(StatusCode::NOT_FOUND, "Service not found"),
        Err(e) => {
            tracing::error!("failed to fetch service: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch service");
        }
    };

    if let Some(title) = payload.title {
        service.title = title;
    }
    if let Some(description) = payload.description {
        service.description = description;
    }
    if let Some(icon) = payload.icon {
        service.icon = icon;
    }
    if let Some(service_type) = payload.service_type {
        service.service_type = service_type;
    }
    if payload.price_per_hour.is_some() {
        service.price_per_hour = payload.price_per_hour;
    }
    if payload.price_per_project.is_some() {
        service.price_per_project = payload.price_per_project;
    }
    service.updated_at = Utc::now();

    match collection.replace_one(doc! { "_id": oid }, &service).await {
        Ok(_) => success(StatusCode::OK, ServiceResponse::from(service)),
        Err(e) => {
            tracing::error!("failed to update service: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update service")
        }
    }
}

/// DELETE /api/our-service/{id}
pub async fn delete_service(Path(id): Path<String>) -> Response {
    let oid = match parse_doc_id(&id) {
        Ok(oid) => oid,
        Err(response) => return response,
    };
    let db = match require_db() {
        Ok(db) => db,
        Err(response) => return response,
    };

    let (collection, _) = match find_service(&db, oid).await {
        Ok(Some(found)) => found,
        Ok(None) => return failure(StatusCode::NOT_FOUND, "Service not found"),
        Err(e) => {
            tracing::error!("failed to fetch service: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch service");
        }
    };

    match collection.delete_one(doc! { "_id": oid }).await {
        Ok(_) => success(StatusCode::OK, serde_json::json!({ "message": "Service deleted" })),
        Err(e) => {
            tracing::error!("failed to delete service: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete service")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(id: ObjectId, title: &str) -> Service {
        Service {
            id,
            title: title.to_string(),
            description: "d".to_string(),
            icon: "code".to_string(),
            service_type: "development".to_string(),
            price_per_hour: None,
            price_per_project: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_merge_primary_overwrites_legacy_on_collision() {
        let shared = ObjectId::new();
        let legacy = vec![service(shared, "legacy title")];
        let primary = vec![service(shared, "primary title")];

        let merged = merge_services(legacy, primary);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].title, "primary title");
    }

    #[test]
    fn test_merge_preserves_insertion_order() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        let c = ObjectId::new();
        let legacy = vec![service(a, "a"), service(b, "b")];
        let primary = vec![service(c, "c"), service(b, "b2")];

        let merged = merge_services(legacy, primary);
        let titles: Vec<_> = merged.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b2", "c"]);
    }

    #[test]
    fn test_merge_handles_empty_sides() {
        let only = vec![service(ObjectId::new(), "x")];
        assert_eq!(merge_services(Vec::new(), only.clone()).len(), 1);
        assert_eq!(merge_services(only, Vec::new()).len(), 1);
    }

    #[test]
    fn test_payload_missing_required_lists_blank_fields() {
        let payload: ServicePayload = serde_json::from_str(
            r#"{"title":"Web","description":"  ","type":"development"}"#,
        )
        .unwrap();
        assert_eq!(payload.missing_required(), vec!["description", "icon"]);
    }
}
