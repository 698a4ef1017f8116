/**
 * Ticket Routes
 * Spreadsheet import, national-id verification, and the raw sheet view.
 *
 * Verification always reads the live sheet; import writes the tickets
 * collection. The two stay separate on purpose: verification must work even
 * when no import has ever run, and imports never shadow later sheet edits.
 */
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;

use crate::db::{self, models::Ticket};
use crate::routes::{failure, require_db};
use crate::sheets;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(rename = "nationalID", default)]
    pub national_id: String,
}

// ============================================================================
// Conversion helpers
// ============================================================================

/// Build a ticket from one normalized sheet record. Cells are taken as
/// strings exactly as the sheet holds them.
fn ticket_from_record(record: &HashMap<String, String>, now: chrono::DateTime<Utc>) -> Ticket {
    let field = |name: &str| record.get(name).cloned().unwrap_or_default();

    Ticket {
        id: ObjectId::new(),
        national_id: field("nationalID"),
        name: field("name"),
        email: field("email"),
        phone: field("phone"),
        ticket_number: field("ticketNumber"),
        verified: false,
        verified_at: None,
        created_at: now,
        updated_at: now,
    }
}

/// One positional sheet row as the `/api/sheet-data` wire shape.
fn sheet_entry(row: &[String]) -> serde_json::Value {
    let cell = |index: usize| row.get(index).cloned().unwrap_or_default();

    json!({
        "name": cell(sheets::NAME_COLUMN),
        "email": cell(sheets::EMAIL_COLUMN),
        "status": cell(sheets::STATUS_COLUMN),
        "nationalID": cell(sheets::NATIONAL_ID_COLUMN),
        "ticketNumber": cell(sheets::TICKET_NUMBER_COLUMN),
    })
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/verify-ticket - Look the national id up in the live sheet
pub async fn verify_ticket(Json(payload): Json<VerifyRequest>) -> Response {
    if payload.national_id.trim().is_empty() {
        return failure(StatusCode::BAD_REQUEST, "nationalID is required");
    }

    let rows = sheets::fetch_rows().await;
    if rows.len() < 2 {
        tracing::error!("ticket sheet has no data rows");
        return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load ticket data");
    }

    match sheets::find_by_national_id(&rows, &payload.national_id) {
        Some(matched) => (
            StatusCode::OK,
            Json(json!({
                "registered": true,
                "name": matched.name,
                "email": matched.email,
                "ticketNumber": matched.ticket_number,
                "message": "Ticket verified successfully",
            })),
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "registered": false,
                "message": "No ticket found for this national ID",
            })),
        )
            .into_response(),
    }
}

/// POST /api/import/excel - Import every sheet row as a ticket document.
/// The header check is all-or-nothing: a first record missing any required
/// column fails the whole import with zero inserts.
pub async fn import_tickets() -> Response {
    let rows = sheets::fetch_rows().await;
    if rows.len() < 2 {
        return failure(StatusCode::BAD_REQUEST, "No data found in sheet");
    }

    let records = sheets::normalize_rows(&rows);
    let missing = sheets::missing_required_columns(&records[0]);
    if !missing.is_empty() {
        return failure(
            StatusCode::BAD_REQUEST,
            format!("Missing required columns: {}", missing.join(", ")),
        );
    }

    let db = match require_db() {
        Ok(db) => db,
        Err(response) => return response,
    };

    let now = Utc::now();
    let tickets: Vec<Ticket> = records
        .iter()
        .map(|record| ticket_from_record(record, now))
        .collect();
    let count = tickets.len();

    match db::tickets(&db).insert_many(&tickets).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "importedCount": count,
                "message": format!("Imported {} tickets", count),
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to insert imported tickets: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to import tickets")
        }
    }
}

/// GET /api/sheet-data - The sheet as the dashboard's ticket table
pub async fn sheet_data() -> Response {
    let rows = sheets::fetch_rows().await;
    if rows.is_empty() {
        tracing::error!("ticket sheet returned nothing");
        return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load sheet data");
    }

    let tickets: Vec<serde_json::Value> = rows.iter().skip(1).map(|row| sheet_entry(row)).collect();
    let count = tickets.len();

    (
        StatusCode::OK,
        Json(json!({
            "tickets": tickets,
            "count": count,
            "lastUpdated": Utc::now(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_request_missing_field_defaults_empty() {
        let request: VerifyRequest = serde_json::from_str("{}").unwrap();
        assert!(request.national_id.is_empty());

        let request: VerifyRequest =
            serde_json::from_str(r#"{"nationalID":"29901011234567"}"#).unwrap();
        assert_eq!(request.national_id, "29901011234567");
    }

    #[test]
    fn test_ticket_from_record_defaults() {
        let now = Utc::now();
        let mut record = HashMap::new();
        record.insert("nationalID".to_string(), "123".to_string());
        record.insert("name".to_string(), "Sara".to_string());

        let ticket = ticket_from_record(&record, now);
        assert_eq!(ticket.national_id, "123");
        assert_eq!(ticket.name, "Sara");
        assert_eq!(ticket.email, "");
        assert!(!ticket.verified);
        assert!(ticket.verified_at.is_none());
        assert_eq!(ticket.created_at, now);
    }

    #[test]
    fn test_sheet_entry_positional_mapping() {
        let row: Vec<String> = ["Sara", "sara@example.com", "confirmed", "123", "T-9"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let entry = sheet_entry(&row);
        assert_eq!(entry["name"], "Sara");
        assert_eq!(entry["status"], "confirmed");
        assert_eq!(entry["nationalID"], "123");
        assert_eq!(entry["ticketNumber"], "T-9");
    }

    #[test]
    fn test_sheet_entry_short_row() {
        let row: Vec<String> = vec!["Sara".to_string()];
        let entry = sheet_entry(&row);
        assert_eq!(entry["name"], "Sara");
        assert_eq!(entry["ticketNumber"], "");
    }
}
