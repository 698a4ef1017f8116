/**
 * Blog Routes
 * CRUD API endpoints for blog posts, including multi-image handling
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
use serde::{Deserialize, Serialize};

use crate::db::{self, models::BlogPost, models::ImageAsset};
use crate::media;
use crate::routes::{collect_multipart, failure, parse_doc_id, require_db, success, FormData};

const REQUIRED_FIELDS: &[&str] = &["title", "content", "excerpt", "author", "category"];
const WORDS_PER_MINUTE: usize = 200;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Full blog post response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPostResponse {
    pub id: String,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub author: String,
    pub category: String,
    pub tags: Vec<String>,
    pub featured: bool,
    pub published: bool,
    pub images: Vec<ImageAsset>,
    pub read_time: String,
    pub views: i64,
    pub likes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<BlogPost> for BlogPostResponse {
    fn from(post: BlogPost) -> Self {
        Self {
            id: post.id.to_hex(),
            title: post.title,
            content: post.content,
            excerpt: post.excerpt,
            author: post.author,
            category: post.category,
            tags: post.tags,
            featured: post.featured,
            published: post.published,
            images: post.images,
            read_time: post.read_time,
            views: post.views,
            likes: post.likes,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

/// One entry of the client-supplied keep list on update. Older dashboards
/// send the media host's own `publicId` name for the asset id.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeptImage {
    #[serde(alias = "publicId")]
    pub asset_id: String,
}

// ============================================================================
// Derivation helpers
// ============================================================================

/// Reading time derived once, at creation. ceil(words / 200) with no floor,
/// so empty content renders "0 min read".
fn read_time_for(content: &str) -> String {
    let words = content.split_whitespace().count();
    format!("{} min read", words.div_ceil(WORDS_PER_MINUTE))
}

/// Split the stored image list into (kept, removed) against the keep list.
/// Kept images stay in stored order.
fn reconcile_images(current: Vec<ImageAsset>, kept: &[KeptImage]) -> (Vec<ImageAsset>, Vec<ImageAsset>) {
    let keep_ids: Vec<&str> = kept.iter().map(|image| image.asset_id.as_str()).collect();
    current
        .into_iter()
        .partition(|image| keep_ids.contains(&image.asset_id.as_str()))
}

/// Upload every file under `images`. A failed upload is logged and skipped;
/// the remaining files still go through.
async fn upload_images(form: &FormData) -> Vec<ImageAsset> {
    let mut uploaded = Vec::new();
    for file in form.files_named("images") {
        match media::upload(file.bytes.clone(), &file.filename).await {
            Ok(asset) => uploaded.push(asset),
            Err(e) => {
                tracing::warn!(filename = %file.filename, error = %e, "image upload failed, skipping file");
            }
        }
    }
    uploaded
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/blog - List all posts, newest first
pub async fn list_posts() -> Response {
    let db = match require_db() {
        Ok(db) => db,
        Err(response) => return response,
    };

    let cursor = match db::blog_posts(&db)
        .find(doc! {})
        .sort(doc! { "createdAt": -1 })
        .await
    {
        Ok(cursor) => cursor,
        Err(e) => {
            tracing::error!("failed to list blog posts: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch blog posts");
        }
    };

    match cursor.try_collect::<Vec<BlogPost>>().await {
        Ok(posts) => {
            let data: Vec<BlogPostResponse> = posts.into_iter().map(Into::into).collect();
            success(StatusCode::OK, data)
        }
        Err(e) => {
            tracing::error!("failed to read blog post cursor: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch blog posts")
        }
    }
}

/// GET /api/blog/{id}
pub async fn get_post(Path(id): Path<String>) -> Response {
    let oid = match parse_doc_id(&id) {
        Ok(oid) => oid,
        Err(response) => return response,
    };
    let db = match require_db() {
        Ok(db) => db,
        Err(response) => return response,
    };

    match db::blog_posts(&db).find_one(doc! { "_id": oid }).await {
        Ok(Some(post)) => success(StatusCode::OK, BlogPostResponse::from(post)),
        Ok(None) => failure(StatusCode::NOT_FOUND, "Blog post not found"),
        Err(e) => {
            tracing::error!("failed to fetch blog post: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch blog post")
        }
    }
}

/// POST /api/blog - Create a post from a multipart form
pub async fn create_post(mut multipart: Multipart) -> Response {
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

    let images = upload_images(&form).await;

    let content = form.text("content").unwrap_or_default().to_string();
    let now = Utc::now();
    let post = BlogPost {
        id: ObjectId::new(),
        title: form.text("title").unwrap_or_default().to_string(),
        read_time: read_time_for(&content),
        content,
        excerpt: form.text("excerpt").unwrap_or_default().to_string(),
        author: form.text("author").unwrap_or_default().to_string(),
        category: form.text("category").unwrap_or_default().to_string(),
        tags: form.json_list("tags"),
        featured: form.bool_field("featured"),
        published: form.bool_field("published"),
        images,
        views: 0,
        likes: 0,
        created_at: now,
        updated_at: now,
    };

    match db::blog_posts(&db).insert_one(&post).await {
        Ok(_) => success(StatusCode::CREATED, BlogPostResponse::from(post)),
        Err(e) => {
            tracing::error!("failed to insert blog post: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create blog post")
        }
    }
}

/// PUT /api/blog/{id} - Update a post; image list is reconciled against the
/// client's `existingImages` keep list
pub async fn update_post(Path(id): Path<String>, mut multipart: Multipart) -> Response {
    let oid = match parse_doc_id(&id) {
        Ok(oid) => oid,
        Err(response) => return response,
    };
    let db = match require_db() {
        Ok(db) => db,
        Err(response) => return response,
    };

    let mut post = match db::blog_posts(&db).find_one(doc! { "_id": oid }).await {
        Ok(Some(post)) => post,
        Ok(None) => return failure(StatusCode::NOT_FOUND, "Blog post not found"),
        Err(e) => {
            tracing::error!("failed to fetch blog post: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch blog post");
        }
    };

    let form = match collect_multipart(&mut multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    if let Some(title) = form.text("title") {
        post.title = title.to_string();
    }
    if let Some(content) = form.text("content") {
        post.content = content.to_string();
    }
    if let Some(excerpt) = form.text("excerpt") {
        post.excerpt = excerpt.to_string();
    }
    if let Some(author) = form.text("author") {
        post.author = author.to_string();
    }
    if let Some(category) = form.text("category") {
        post.category = category.to_string();
    }
    if form.text("tags").is_some() {
        post.tags = form.json_list("tags");
    }
    if form.text("featured").is_some() {
        post.featured = form.bool_field("featured");
    }
    if form.text("published").is_some() {
        post.published = form.bool_field("published");
    }

    // When the keep list is present, everything outside it is deleted from
    // the media host and new uploads are appended in upload order.
    if let Some(raw) = form.text("existingImages") {
        let kept: Vec<KeptImage> = serde_json::from_str(raw).unwrap_or_default();
        let (retained, removed) = reconcile_images(std::mem::take(&mut post.images), &kept);
        for image in &removed {
            media::destroy_best_effort(&image.asset_id).await;
        }
        post.images = retained;
    }
    post.images.extend(upload_images(&form).await);

    post.updated_at = Utc::now();

    match db::blog_posts(&db).replace_one(doc! { "_id": oid }, &post).await {
        Ok(_) => success(StatusCode::OK, BlogPostResponse::from(post)),
        Err(e) => {
            tracing::error!("failed to update blog post: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update blog post")
        }
    }
}

/// DELETE /api/blog/{id} - Remove the post and, best effort, its images
pub async fn delete_post(Path(id): Path<String>) -> Response {
    let oid = match parse_doc_id(&id) {
        Ok(oid) => oid,
        Err(response) => return response,
    };
    let db = match require_db() {
        Ok(db) => db,
        Err(response) => return response,
    };

    let post = match db::blog_posts(&db).find_one(doc! { "_id": oid }).await {
        Ok(Some(post)) => post,
        Ok(None) => return failure(StatusCode::NOT_FOUND, "Blog post not found"),
        Err(e) => {
            tracing::error!("failed to fetch blog post: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch blog post");
        }
    };

    for image in &post.images {
        media::destroy_best_effort(&image.asset_id).await;
    }

    match db::blog_posts(&db).delete_one(doc! { "_id": oid }).await {
        Ok(_) => success(StatusCode::OK, serde_json::json!({ "message": "Blog post deleted" })),
        Err(e) => {
            tracing::error!("failed to delete blog post: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete blog post")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(id: &str) -> ImageAsset {
        ImageAsset {
            url: format!("https://img.example.com/{id}.png"),
            asset_id: id.to_string(),
        }
    }

    #[test]
    fn test_read_time_450_words() {
        let content = vec!["word"; 450].join(" ");
        assert_eq!(read_time_for(&content), "3 min read");
    }

    #[test]
    fn test_read_time_exactly_200_words() {
        let content = vec!["word"; 200].join(" ");
        assert_eq!(read_time_for(&content), "1 min read");
    }

    #[test]
    fn test_read_time_201_words_rounds_up() {
        let content = vec!["word"; 201].join(" ");
        assert_eq!(read_time_for(&content), "2 min read");
    }

    #[test]
    fn test_read_time_empty_content_has_no_floor() {
        assert_eq!(read_time_for(""), "0 min read");
        assert_eq!(read_time_for("   "), "0 min read");
    }

    #[test]
    fn test_kept_image_accepts_public_id_alias() {
        let kept: KeptImage = serde_json::from_str(r#"{"publicId":"a"}"#).unwrap();
        assert_eq!(kept.asset_id, "a");
        let kept: KeptImage = serde_json::from_str(r#"{"assetId":"b"}"#).unwrap();
        assert_eq!(kept.asset_id, "b");
    }

    #[test]
    fn test_reconcile_keeps_listed_removes_rest() {
        let current = vec![asset("a"), asset("b")];
        let kept = vec![KeptImage { asset_id: "a".to_string() }];

        let (retained, removed) = reconcile_images(current, &kept);
        assert_eq!(retained, vec![asset("a")]);
        assert_eq!(removed, vec![asset("b")]);
    }

    #[test]
    fn test_reconcile_empty_keep_list_removes_all() {
        let (retained, removed) = reconcile_images(vec![asset("a"), asset("b")], &[]);
        assert!(retained.is_empty());
        assert_eq!(removed.len(), 2);
    }

    #[test]
    fn test_reconcile_preserves_stored_order() {
        let current = vec![asset("c"), asset("a"), asset("b")];
        let kept = vec![
            KeptImage { asset_id: "a".to_string() },
            KeptImage { asset_id: "c".to_string() },
        ];

        let (retained, _) = reconcile_images(current, &kept);
        let ids: Vec<_> = retained.iter().map(|i| i.asset_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);
    }
}
