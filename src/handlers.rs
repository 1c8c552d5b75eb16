use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use tokio::fs;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::auth;
use crate::error::AppError;
use crate::models::{
    AboutSection, AdminUser, ChannelsSection, ContentFile, ContentPost, DownloadsSection,
    FileKind, GallerySection, InfoSection, NotificationKind, RdpVpsSection, ReportSection, Role,
    Session, StatsSection, UserSummary,
};
use crate::AppState;

pub const SESSION_COOKIE: &str = "session_token";
const SESSION_MAX_AGE_SECS: i64 = 86400;

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

fn session_cookie(token: &str, max_age: i64, secure: bool) -> String {
    let mut cookie =
        format!("{SESSION_COOKIE}={token}; HttpOnly; SameSite=Strict; Max-Age={max_age}; Path=/");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Session gate for the mutating surfaces; a missing or expired session is a
/// 403 on these routes.
async fn authed_session(state: &AppState, headers: &HeaderMap) -> Result<Session, AppError> {
    let token = cookie_token(headers).ok_or(AppError::Forbidden)?;
    let storage = state.storage.lock().await;
    auth::find_valid_session(&storage.sessions, &token)?.ok_or(AppError::Forbidden)
}

async fn admin_session(state: &AppState, headers: &HeaderMap) -> Result<Session, AppError> {
    let session = authed_session(state, headers).await?;
    if session.role != Role::Admin {
        return Err(AppError::Forbidden);
    }
    Ok(session)
}

#[derive(Serialize)]
struct SessionUser {
    id: Uuid,
    username: String,
    role: Role,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    username: Option<String>,
    password: Option<String>,
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let (Some(username), Some(password)) = (body.username, body.password) else {
        return Err(AppError::validation("Username and password required"));
    };
    if username.is_empty() || password.is_empty() {
        return Err(AppError::validation("Username and password required"));
    }

    let storage = state.storage.lock().await;
    if state.config.bootstrap_admin {
        auth::ensure_default_admin(&storage.users)?;
    }

    let user = auth::verify_credentials(&storage.users, &username, &password)?
        .ok_or(AppError::InvalidCredentials)?;
    let session = auth::create_session(&storage.sessions, &user)?;
    drop(storage);

    let cookie = session_cookie(&session.token, SESSION_MAX_AGE_SECS, state.config.secure_cookies);
    let body = Json(json!({
        "success": true,
        "user": SessionUser { id: user.id, username: user.username, role: user.role },
    }));
    Ok((AppendHeaders([(header::SET_COOKIE, cookie)]), body).into_response())
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if let Some(token) = cookie_token(&headers) {
        let storage = state.storage.lock().await;
        auth::delete_session(&storage.sessions, &token)?;
    }

    let cookie = session_cookie("", 0, state.config.secure_cookies);
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(json!({ "success": true })),
    )
        .into_response())
}

pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let storage = state.storage.lock().await;
    if state.config.bootstrap_admin {
        auth::ensure_default_admin(&storage.users)?;
    }

    let token = cookie_token(&headers).ok_or(AppError::Unauthenticated)?;
    let session = auth::find_valid_session(&storage.sessions, &token)?
        .ok_or(AppError::Unauthenticated)?;

    Ok(Json(json!({
        "user": SessionUser {
            id: session.user_id,
            username: session.username,
            role: session.role,
        },
    })))
}

/// Pinned posts lead, then newest first.
fn sort_for_listing(posts: &mut [ContentPost]) {
    posts.sort_by(|a, b| b.pinned.cmp(&a.pinned).then(b.created_at.cmp(&a.created_at)));
}

pub async fn list_content(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let storage = state.storage.lock().await;
    let mut posts = storage.content.all()?;
    drop(storage);

    sort_for_listing(&mut posts);
    Ok(Json(json!({ "content": posts })))
}

#[derive(Deserialize)]
pub struct CreateContentRequest {
    title: Option<String>,
    description: Option<String>,
    category: Option<String>,
    tags: Option<Vec<String>>,
    pinned: Option<bool>,
    files: Option<Vec<ContentFile>>,
}

pub async fn create_content(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateContentRequest>,
) -> Result<Json<Value>, AppError> {
    let session = authed_session(&state, &headers).await?;

    let (Some(title), Some(description)) = (body.title, body.description) else {
        return Err(AppError::validation("Title and description required"));
    };
    if title.is_empty() || description.is_empty() {
        return Err(AppError::validation("Title and description required"));
    }

    let now = Utc::now();
    let post = ContentPost {
        id: Uuid::new_v4(),
        title,
        description,
        category: body
            .category
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "General".to_string()),
        author: session.username.clone(),
        created_at: now,
        updated_at: now,
        files: body.files.unwrap_or_default(),
        pinned: body.pinned.unwrap_or(false),
        tags: body.tags.unwrap_or_default(),
    };

    let storage = state.storage.lock().await;
    let mut posts = storage.content.all()?;
    posts.insert(0, post.clone());
    storage.content.save(&posts)?;

    storage.notifications.add(
        NotificationKind::NewContent,
        "New content published",
        format!("\"{}\" has been published by {}", post.title, session.username),
        Some(post.id),
    )?;

    Ok(Json(json!({ "success": true, "post": post })))
}

#[derive(Deserialize)]
pub struct UpdateContentRequest {
    id: Option<Uuid>,
    title: Option<String>,
    description: Option<String>,
    category: Option<String>,
    tags: Option<Vec<String>>,
    pinned: Option<bool>,
    files: Option<Vec<ContentFile>>,
}

pub async fn update_content(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<UpdateContentRequest>,
) -> Result<Json<Value>, AppError> {
    let session = authed_session(&state, &headers).await?;
    let id = body.id.ok_or_else(|| AppError::validation("Id required"))?;

    let storage = state.storage.lock().await;
    let mut posts = storage.content.all()?;
    let post = posts
        .iter_mut()
        .find(|p| p.id == id)
        .ok_or(AppError::NotFound("Content"))?;

    if let Some(title) = body.title {
        post.title = title;
    }
    if let Some(description) = body.description {
        post.description = description;
    }
    if let Some(category) = body.category {
        post.category = category;
    }
    if let Some(tags) = body.tags {
        post.tags = tags;
    }
    if let Some(pinned) = body.pinned {
        post.pinned = pinned;
    }
    if let Some(files) = body.files {
        post.files = files;
    }
    post.updated_at = Utc::now();
    let updated = post.clone();

    storage.content.save(&posts)?;
    storage.notifications.add(
        NotificationKind::UpdateContent,
        "Content updated",
        format!("\"{}\" has been updated by {}", updated.title, session.username),
        Some(id),
    )?;

    Ok(Json(json!({ "success": true, "post": updated })))
}

#[derive(Deserialize)]
pub struct IdQuery {
    id: Option<Uuid>,
}

pub async fn delete_content(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<IdQuery>,
) -> Result<Json<Value>, AppError> {
    let session = authed_session(&state, &headers).await?;
    let id = query.id.ok_or_else(|| AppError::validation("Id required"))?;

    let storage = state.storage.lock().await;
    let removed = storage
        .content
        .delete_by_id(id)?
        .ok_or(AppError::NotFound("Content"))?;

    storage.notifications.add(
        NotificationKind::DeleteContent,
        "Content deleted",
        format!("\"{}\" has been deleted by {}", removed.title, session.username),
        None,
    )?;

    Ok(Json(json!({ "success": true })))
}

pub async fn get_settings(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let storage = state.storage.lock().await;
    let settings = storage.settings.get()?;
    Ok(Json(json!({ "settings": settings })))
}

/// Sections are replaced wholesale: a supplied section overwrites the stored
/// one, omitted sections are untouched.
#[derive(Deserialize)]
pub struct SettingsPatch {
    about: Option<AboutSection>,
    info: Option<InfoSection>,
    channels: Option<ChannelsSection>,
    report: Option<ReportSection>,
    rdpvps: Option<RdpVpsSection>,
    stats: Option<StatsSection>,
    gallery: Option<GallerySection>,
    downloads: Option<DownloadsSection>,
}

pub async fn update_settings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(patch): Json<SettingsPatch>,
) -> Result<Json<Value>, AppError> {
    authed_session(&state, &headers).await?;

    let storage = state.storage.lock().await;
    let mut settings = storage.settings.get()?;
    if let Some(about) = patch.about {
        settings.about = about;
    }
    if let Some(info) = patch.info {
        settings.info = info;
    }
    if let Some(channels) = patch.channels {
        settings.channels = channels;
    }
    if let Some(report) = patch.report {
        settings.report = report;
    }
    if let Some(rdpvps) = patch.rdpvps {
        settings.rdpvps = rdpvps;
    }
    if let Some(stats) = patch.stats {
        settings.stats = stats;
    }
    if let Some(gallery) = patch.gallery {
        settings.gallery = gallery;
    }
    if let Some(downloads) = patch.downloads {
        settings.downloads = downloads;
    }
    storage.settings.save(&settings)?;

    Ok(Json(json!({ "success": true, "settings": settings })))
}

pub async fn list_notifications(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let storage = state.storage.lock().await;
    let notifications = storage.notifications.all()?;
    Ok(Json(json!({ "notifications": notifications })))
}

pub async fn upload_files(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    authed_session(&state, &headers).await?;

    let uploads_dir = PathBuf::from(&state.config.uploads_dir);
    fs::create_dir_all(&uploads_dir).await?;

    let mut stored = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let Some(original_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let declared_mime = field.content_type().map(str::to_string);
        let data = field.bytes().await?;

        let ext = std::path::Path::new(&original_name)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let name = format!("{}{}", Uuid::new_v4(), ext);
        fs::write(uploads_dir.join(&name), &data).await?;

        // The declared type is trusted; only a missing one is guessed from
        // the filename.
        let mime_type = declared_mime.unwrap_or_else(|| {
            mime_guess::from_path(&original_name)
                .first_or_octet_stream()
                .to_string()
        });
        let kind = FileKind::from_mime(&mime_type);

        stored.push(ContentFile {
            id: Uuid::new_v4(),
            path: format!("/uploads/{name}"),
            name,
            original_name,
            kind,
            mime_type,
            size: data.len() as u64,
        });
    }

    if stored.is_empty() {
        return Err(AppError::validation("No files uploaded"));
    }

    Ok(Json(json!({ "success": true, "files": stored })))
}

pub async fn serve_upload(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    if name.contains("..") || name.contains('/') || name.contains('\\') {
        return Err(AppError::NotFound("File"));
    }

    let path = PathBuf::from(&state.config.uploads_dir).join(&name);
    let file = match fs::File::open(&path).await {
        Ok(file) => file,
        Err(_) => return Err(AppError::NotFound("File")),
    };

    let stream = ReaderStream::new(file);
    let body = Body::from_stream(stream);
    let mime_type = mime_guess::from_path(&path).first_or_octet_stream();

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime_type.as_ref())
        .header(header::CACHE_CONTROL, "public, max-age=31536000")
        .body(body)
        .unwrap())
}

pub async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    admin_session(&state, &headers).await?;

    let storage = state.storage.lock().await;
    let users: Vec<UserSummary> = storage.users.all()?.iter().map(UserSummary::from).collect();
    Ok(Json(json!({ "users": users })))
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    username: Option<String>,
    password: Option<String>,
    role: Option<Role>,
}

pub async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateUserRequest>,
) -> Result<Json<Value>, AppError> {
    admin_session(&state, &headers).await?;

    let (Some(username), Some(password)) = (body.username, body.password) else {
        return Err(AppError::validation("Username and password required"));
    };
    if username.is_empty() || password.is_empty() {
        return Err(AppError::validation("Username and password required"));
    }

    let storage = state.storage.lock().await;
    if storage.users.find_by_username(&username)?.is_some() {
        return Err(AppError::UsernameTaken);
    }

    let user = AdminUser {
        id: Uuid::new_v4(),
        username,
        password_hash: auth::hash_password(&password)?,
        role: body.role.unwrap_or(Role::Editor),
        created_at: Utc::now(),
    };
    let mut users = storage.users.all()?;
    users.push(user.clone());
    storage.users.save(&users)?;

    Ok(Json(json!({ "success": true, "user": UserSummary::from(&user) })))
}

pub async fn delete_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<IdQuery>,
) -> Result<Json<Value>, AppError> {
    let session = admin_session(&state, &headers).await?;
    let id = query.id.ok_or_else(|| AppError::validation("User id required"))?;

    if id == session.user_id {
        return Err(AppError::validation("You cannot delete your own account"));
    }

    // Filter semantics: an unknown id still reports success.
    let storage = state.storage.lock().await;
    let users: Vec<AdminUser> = storage
        .users
        .all()?
        .into_iter()
        .filter(|u| u.id != id)
        .collect();
    storage.users.save(&users)?;

    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn post_at(pinned: bool, age_hours: i64) -> ContentPost {
        let created = Utc::now() - Duration::hours(age_hours);
        ContentPost {
            id: Uuid::new_v4(),
            title: format!("post-{age_hours}"),
            description: "d".to_string(),
            category: "General".to_string(),
            author: "editor".to_string(),
            created_at: created,
            updated_at: created,
            files: vec![],
            pinned,
            tags: vec![],
        }
    }

    #[test]
    fn listing_sorts_pinned_first_then_newest() {
        let mut posts = vec![
            post_at(false, 1),
            post_at(true, 48),
            post_at(false, 24),
            post_at(true, 2),
        ];
        sort_for_listing(&mut posts);

        assert!(posts[0].pinned && posts[1].pinned);
        assert_eq!(posts[0].title, "post-2");
        assert_eq!(posts[1].title, "post-48");
        assert_eq!(posts[2].title, "post-1");
        assert_eq!(posts[3].title, "post-24");
    }

    #[test]
    fn cookie_token_is_extracted_from_the_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            "theme=dark; session_token=abc123; other=1".parse().unwrap(),
        );
        assert_eq!(cookie_token(&headers), Some("abc123".to_string()));

        headers.insert(header::COOKIE, "theme=dark".parse().unwrap());
        assert_eq!(cookie_token(&headers), None);
    }

    #[test]
    fn session_cookie_carries_the_expected_attributes() {
        let cookie = session_cookie("tok", 86400, false);
        assert!(cookie.starts_with("session_token=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Max-Age=86400"));
        assert!(!cookie.contains("Secure"));

        let cleared = session_cookie("", 0, true);
        assert!(cleared.contains("Max-Age=0"));
        assert!(cleared.ends_with("; Secure"));
    }
}
