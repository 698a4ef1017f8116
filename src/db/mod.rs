pub mod models;

use mongodb::bson::doc;
use mongodb::{Client, Collection, Database};
use tokio::sync::OnceCell;

use models::{BlogPost, Event, JoinApplication, Project, Service, TeamMember, Ticket};

static DB: OnceCell<Database> = OnceCell::const_new();

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub uri: String,
    pub database: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            uri: std::env::var("MONGODB_URI")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            database: std::env::var("MONGODB_DB").unwrap_or_else(|_| "clubhub".to_string()),
        }
    }
}

pub async fn init_db(config: Option<DbConfig>) -> Result<Database, mongodb::error::Error> {
    let config = config.unwrap_or_default();

    tracing::info!("Connecting to MongoDB...");
    tracing::debug!(
        "MongoDB URI: {}",
        config.uri.replace(
            |c: char| !c.is_ascii_alphanumeric() && c != ':' && c != '/' && c != '@' && c != '.',
            "*"
        )
    );

    let client = Client::with_uri_str(&config.uri).await?;
    let database = client.database(&config.database);

    database.run_command(doc! { "ping": 1 }).await?;

    tracing::info!(database = %config.database, "MongoDB connection established");

    let _ = DB.set(database.clone());

    Ok(database)
}

pub fn get_db() -> Option<Database> {
    DB.get().cloned()
}

pub async fn health_check() -> Result<std::time::Duration, mongodb::error::Error> {
    let db = get_db().ok_or_else(|| {
        mongodb::error::Error::custom("Database handle not initialized".to_string())
    })?;

    let start = std::time::Instant::now();
    db.run_command(doc! { "ping": 1 }).await?;

    Ok(start.elapsed())
}

// Collection names follow the original deployment's ODM convention
// (pluralized, lowercased). `services` is the legacy collection kept for
// reads; writes go to `ourservices`.
pub fn blog_posts(db: &Database) -> Collection<BlogPost> {
    db.collection("blogposts")
}

pub fn projects(db: &Database) -> Collection<Project> {
    db.collection("projects")
}

pub fn team_members(db: &Database) -> Collection<TeamMember> {
    db.collection("teammembers")
}

pub fn events(db: &Database) -> Collection<Event> {
    db.collection("events")
}

pub fn services_legacy(db: &Database) -> Collection<Service> {
    db.collection("services")
}

pub fn services(db: &Database) -> Collection<Service> {
    db.collection("ourservices")
}

pub fn join_applications(db: &Database) -> Collection<JoinApplication> {
    db.collection("joinapplications")
}

pub fn tickets(db: &Database) -> Collection<Ticket> {
    db.collection("tickets")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_config_default_uses_env_or_fallback() {
        let config = DbConfig::default();
        assert!(!config.uri.is_empty());
        assert!(!config.database.is_empty());
    }

    #[test]
    fn test_get_db_none_before_init() {
        let db = get_db();
        assert!(db.is_none());
    }

    #[tokio::test]
    async fn test_health_check_fails_without_db() {
        let result = health_check().await;
        assert!(result.is_err());
    }
}
