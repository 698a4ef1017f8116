/**
 * Routes Module
 * API route handlers plus the helpers they share: the response envelope,
 * document-id validation, and multipart form collection.
 */
pub mod blog;
pub mod events;
pub mod health;
pub mod join;
pub mod projects;
pub mod services;
pub mod team;
pub mod tickets;

use axum::extract::Multipart;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use mongodb::bson::oid::ObjectId;
use regex::Regex;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;

lazy_static::lazy_static! {
    /// Well-formed document key: exactly 24 hex characters.
    static ref DOC_ID_REGEX: Regex = Regex::new(r"^[0-9a-fA-F]{24}$").unwrap();
}

/// `{success: true, data}` envelope used by nearly every route.
pub fn success<T: Serialize>(status: StatusCode, data: T) -> Response {
    (status, Json(json!({ "success": true, "data": data }))).into_response()
}

/// `{success: false, error}` envelope.
pub fn failure(status: StatusCode, error: impl Into<String>) -> Response {
    (status, Json(json!({ "success": false, "error": error.into() }))).into_response()
}

/// The shared database handle, or a 503 if startup never connected.
pub fn require_db() -> Result<mongodb::Database, Response> {
    crate::db::get_db()
        .ok_or_else(|| failure(StatusCode::SERVICE_UNAVAILABLE, "Database not available"))
}

/// Validate and parse a path id. Malformed ids are rejected here, before any
/// database access.
pub fn parse_doc_id(id: &str) -> Result<ObjectId, Response> {
    if !DOC_ID_REGEX.is_match(id) {
        return Err(failure(StatusCode::BAD_REQUEST, "Invalid id format"));
    }
    ObjectId::parse_str(id).map_err(|_| failure(StatusCode::BAD_REQUEST, "Invalid id format"))
}

/// One uploaded file from a multipart body.
#[derive(Debug, Clone)]
pub struct FormFile {
    pub field: String,
    pub filename: String,
    pub bytes: Bytes,
}

/// A fully buffered multipart submission: text fields by name, files in
/// submission order.
#[derive(Debug, Default)]
pub struct FormData {
    pub fields: HashMap<String, String>,
    pub files: Vec<FormFile>,
}

impl FormData {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Required fields that are absent or blank.
    pub fn missing(&self, required: &[&'static str]) -> Vec<&'static str> {
        required
            .iter()
            .copied()
            .filter(|name| self.text(name).map(str::trim).unwrap_or("").is_empty())
            .collect()
    }

    pub fn bool_field(&self, name: &str) -> bool {
        matches!(self.text(name), Some("true") | Some("1") | Some("on"))
    }

    /// A field carrying a JSON array of strings (e.g. tags, skills).
    /// Unparseable input yields an empty list.
    pub fn json_list(&self, name: &str) -> Vec<String> {
        self.text(name)
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }

    pub fn files_named<'a, 'b>(
        &'a self,
        name: &'b str,
    ) -> impl Iterator<Item = &'a FormFile> + use<'a, 'b> {
        self.files.iter().filter(move |file| file.field == name)
    }

    pub fn first_file(&self, name: &str) -> Option<&FormFile> {
        self.files_named(name).next()
    }
}

/// Buffer an entire multipart body. Fields with a filename are files,
/// everything else is text.
pub async fn collect_multipart(multipart: &mut Multipart) -> Result<FormData, Response> {
    let mut form = FormData::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("multipart read error: {}", e);
                return Err(failure(StatusCode::BAD_REQUEST, "Invalid multipart data"));
            }
        };

        let name = field.name().unwrap_or_default().to_string();

        if let Some(filename) = field.file_name().map(str::to_string) {
            match field.bytes().await {
                Ok(bytes) => form.files.push(FormFile {
                    field: name,
                    filename,
                    bytes,
                }),
                Err(e) => {
                    tracing::error!("failed to read uploaded file: {}", e);
                    return Err(failure(StatusCode::BAD_REQUEST, "Failed to read file data"));
                }
            }
        } else {
            match field.text().await {
                Ok(value) => {
                    form.fields.insert(name, value);
                }
                Err(e) => {
                    tracing::error!("failed to read form field: {}", e);
                    return Err(failure(StatusCode::BAD_REQUEST, "Invalid multipart data"));
                }
            }
        }
    }

    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_doc_id_accepts_24_hex() {
        assert!(parse_doc_id("5f8d0d55b54764421b7156c3").is_ok());
        assert!(parse_doc_id("5F8D0D55B54764421B7156C3").is_ok());
    }

    #[test]
    fn test_parse_doc_id_rejects_malformed() {
        for bad in ["", "123", "zzzzzzzzzzzzzzzzzzzzzzzz", "5f8d0d55b54764421b7156c", "5f8d0d55b54764421b7156c3a"] {
            assert!(parse_doc_id(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_form_data_missing_lists_blank_and_absent() {
        let mut form = FormData::default();
        form.fields.insert("title".to_string(), "Hello".to_string());
        form.fields.insert("excerpt".to_string(), "   ".to_string());

        let missing = form.missing(&["title", "excerpt", "author"]);
        assert_eq!(missing, vec!["excerpt", "author"]);
    }

    #[test]
    fn test_form_data_bool_field() {
        let mut form = FormData::default();
        form.fields.insert("featured".to_string(), "true".to_string());
        form.fields.insert("published".to_string(), "false".to_string());

        assert!(form.bool_field("featured"));
        assert!(!form.bool_field("published"));
        assert!(!form.bool_field("absent"));
    }

    #[test]
    fn test_form_data_json_list() {
        let mut form = FormData::default();
        form.fields.insert("tags".to_string(), r#"["rust","web"]"#.to_string());
        form.fields.insert("broken".to_string(), "not json".to_string());

        assert_eq!(form.json_list("tags"), vec!["rust", "web"]);
        assert!(form.json_list("broken").is_empty());
        assert!(form.json_list("absent").is_empty());
    }

    #[test]
    fn test_files_named_filters_by_field() {
        let mut form = FormData::default();
        for (field, filename) in [("images", "a.png"), ("cover", "b.png"), ("images", "c.png")] {
            form.files.push(FormFile {
                field: field.to_string(),
                filename: filename.to_string(),
                bytes: Bytes::from_static(b"x"),
            });
        }

        let names: Vec<_> = form.files_named("images").map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["a.png", "c.png"]);
        assert_eq!(form.first_file("cover").unwrap().filename, "b.png");
    }
}
