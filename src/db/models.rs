//! Database Models - structs representing stored documents (mongodb/serde).

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Reference to an externally hosted image: delivery URL plus the asset id
/// needed to delete it from the media host later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAsset {
    pub url: String,
    pub asset_id: String,
}

/// Blog post document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub author: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub published: bool,
    /// Display order is list order.
    #[serde(default)]
    pub images: Vec<ImageAsset>,
    pub read_time: String,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub likes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Project document. `status` and `progress` are stored as given; neither is
/// range-checked server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub description: String,
    #[serde(default = "default_active")]
    pub status: String,
    #[serde(default)]
    pub progress: i32,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub live_url: Option<String>,
    #[serde(default)]
    pub image: Option<ImageAsset>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Social profile links for a team member
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
}

/// Team member document. Email uniqueness is not enforced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(default = "default_active")]
    pub status: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub social_links: SocialLinks,
    #[serde(default)]
    pub avatar: Option<ImageAsset>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Event document. `attendees` holds team member ids; the members themselves
/// are resolved at read time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub description: String,
    pub date: String,
    pub location: String,
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default = "default_upcoming")]
    pub status: String,
    #[serde(default)]
    pub image: Option<ImageAsset>,
    #[serde(default)]
    pub attendees: Vec<ObjectId>,
    #[serde(default)]
    pub registration_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Service document. Lives in two collections: the legacy `services` and the
/// primary `ourservices`; listings merge the two by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub description: String,
    /// Name reference into the frontend icon set.
    pub icon: String,
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(rename = "price_per_hour", default)]
    pub price_per_hour: Option<f64>,
    #[serde(rename = "price_per_project", default)]
    pub price_per_project: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Membership application document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinApplication {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub specialized_in: String,
    pub year: String,
    pub major: String,
    pub specialization: String,
    pub experience: String,
    pub motivation: String,
    #[serde(default)]
    pub portfolio: Option<String>,
    pub availability: String,
    pub agree_terms: bool,
    #[serde(default = "default_pending")]
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Imported ticket holder. `nationalID` is the verification lookup key;
/// uniqueness is not enforced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(rename = "nationalID")]
    pub national_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub ticket_number: String,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> String {
    "active".to_string()
}

fn default_upcoming() -> String {
    "upcoming".to_string()
}

fn default_pending() -> String {
    "pending".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_asset_uses_camel_case_wire_names() {
        let asset = ImageAsset {
            url: "https://img.example.com/a.png".to_string(),
            asset_id: "folder/a".to_string(),
        };
        let json = serde_json::to_value(&asset).unwrap();
        assert_eq!(json["assetId"], "folder/a");
    }

    #[test]
    fn test_ticket_national_id_wire_name() {
        let json = serde_json::json!({
            "_id": ObjectId::new(),
            "nationalID": "29901011234567",
            "name": "Sara",
            "email": "sara@example.com",
            "phone": "0100000000",
            "ticketNumber": "T-001",
            "createdAt": Utc::now(),
            "updatedAt": Utc::now(),
        });
        let ticket: Ticket = serde_json::from_value(json).unwrap();
        assert_eq!(ticket.national_id, "29901011234567");
        assert!(!ticket.verified);
        assert!(ticket.verified_at.is_none());
    }

    #[test]
    fn test_service_price_fields_keep_snake_case() {
        let service = Service {
            id: ObjectId::new(),
            title: "Web Development".to_string(),
            description: "Full stack builds".to_string(),
            icon: "code".to_string(),
            service_type: "development".to_string(),
            price_per_hour: Some(15.0),
            price_per_project: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&service).unwrap();
        assert_eq!(json["price_per_hour"], 15.0);
        assert_eq!(json["type"], "development");
    }
}
