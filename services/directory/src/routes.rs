//! Directory service routes
//!
//! Every mutating handler follows the same shape: load the aggregate,
//! authenticate the caller against it, check permissions before touching
//! anything, apply the whole mutation in memory, then save once.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeSet;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    authz,
    error::{ApiError, AuthError},
    graph,
    models::{
        ANONYMOUS_USERNAME, Bookmark, Category, Document, NewBookmark, NewCategory, Permissions,
        Role, SafeUser, UpdateBookmark, UpdateCategory, User,
    },
    password,
    state::AppState,
    validation,
};

/// Request for user login
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response for user login
#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    /// Token lifetime in seconds
    pub expires_in: u64,
    pub user: SafeUser,
}

/// Filtered aggregate view returned to a caller
#[derive(Serialize)]
pub struct DataResponse {
    pub categories: Vec<Category>,
    pub bookmarks: Vec<Bookmark>,
    pub users: Vec<SafeUser>,
}

/// Request for bulk replacement of categories and bookmarks
#[derive(Deserialize)]
pub struct ReplaceDataRequest {
    pub categories: Vec<Category>,
    pub bookmarks: Vec<Bookmark>,
}

/// Request for bulk cascading category deletion
#[derive(Deserialize)]
pub struct DeleteCategoriesRequest {
    pub ids: Vec<String>,
}

/// User creation payload
#[derive(Deserialize)]
pub struct NewUserRequest {
    pub username: String,
    pub password: String,
    pub roles: BTreeSet<Role>,
    #[serde(default)]
    pub visible_categories: BTreeSet<String>,
}

/// User update payload
#[derive(Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub roles: Option<BTreeSet<Role>>,
    #[serde(default)]
    pub visible_categories: Option<BTreeSet<String>>,
}

/// Create the router for the directory service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/auth/login", post(login))
        .route("/api/data", get(get_data).put(replace_data))
        .route("/api/bookmarks", post(create_bookmark))
        .route(
            "/api/bookmarks/:id",
            put(update_bookmark).delete(delete_bookmark),
        )
        .route(
            "/api/categories",
            post(create_category).delete(delete_categories),
        )
        .route("/api/categories/:id", put(update_category))
        .route("/api/users", post(create_user))
        .route("/api/users/:username", put(update_user).delete(delete_user))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "directory-service"
    }))
}

/// Extract the bearer token from the Authorization header
///
/// An absent header is `Ok(None)`; a header that is present but not a
/// bearer token is invalid credentials, never anonymous.
fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AuthError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(Some)
        .ok_or(AuthError::InvalidToken)
}

/// Authenticate the caller and return an owned copy of their user record
fn require_caller(state: &AppState, headers: &HeaderMap, doc: &Document) -> Result<User, ApiError> {
    let user = authz::authenticate(bearer_token(headers)?, &state.tokens, doc)?;
    Ok(user.clone())
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Login attempt for user: {}", payload.username);

    if payload.username == ANONYMOUS_USERNAME {
        return Err(ApiError::Permission(
            "the anonymous account cannot log in".to_string(),
        ));
    }

    let doc = state.repository.load().await?;
    let user = doc
        .users
        .get(&payload.username)
        .ok_or(AuthError::BadCredentials)?;

    let (Some(hash), Some(salt)) = (&user.password_hash, &user.salt) else {
        return Err(AuthError::BadCredentials.into());
    };
    if !password::verify_password(&payload.password, salt, hash) {
        return Err(AuthError::BadCredentials.into());
    }

    let token = state.tokens.issue(&user.username, &user.roles).map_err(|e| {
        error!("Failed to issue token: {}", e);
        ApiError::Internal
    })?;

    Ok((
        StatusCode::OK,
        Json(LoginResponse {
            token,
            expires_in: state.tokens.expiry_seconds(),
            user: SafeUser::from(user),
        }),
    ))
}

/// Get the caller's filtered view of the aggregate
///
/// Anonymous callers get the reserved public account's view when anonymous
/// browsing is enabled; credentials that are present but invalid still
/// fail with 401.
pub async fn get_data(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let doc = state.repository.load().await?;

    let (caller, anonymous) = match bearer_token(&headers)? {
        Some(token) => (
            authz::authenticate(Some(token), &state.tokens, &doc)?,
            false,
        ),
        None if state.allow_anonymous => (authz::anonymous_user(&doc)?, true),
        None => return Err(AuthError::MissingCredentials.into()),
    };

    let view = authz::resolve_view(caller, &doc);
    let users = if anonymous {
        vec![]
    } else if caller.can_edit_users() {
        doc.users.values().map(SafeUser::from).collect()
    } else {
        vec![SafeUser::from(caller)]
    };

    Ok(Json(DataResponse {
        categories: view.categories,
        bookmarks: view.bookmarks,
        users,
    }))
}

/// Bulk replace the category and bookmark collections
pub async fn replace_data(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ReplaceDataRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut doc = state.repository.load().await?;
    let caller = require_caller(&state, &headers, &doc)?;

    if !caller.can_edit_categories() {
        return Err(ApiError::Permission("insufficient permission".to_string()));
    }

    doc.categories = payload.categories;
    doc.bookmarks = payload.bookmarks;
    state.repository.save(&doc).await?;

    Ok(Json(json!({ "success": true })))
}

/// Create a new bookmark
pub async fn create_bookmark(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<NewBookmark>,
) -> Result<impl IntoResponse, ApiError> {
    let mut doc = state.repository.load().await?;
    let caller = require_caller(&state, &headers, &doc)?;

    if !caller.can_edit_bookmarks() {
        return Err(ApiError::Permission("insufficient permission".to_string()));
    }
    validation::validate_bookmark(&payload.name, &payload.url).map_err(ApiError::Validation)?;

    if doc.category(&payload.category_id).is_none() {
        return Err(ApiError::NotFound("category".to_string()));
    }
    if !caller.can_see(&payload.category_id) {
        return Err(ApiError::Permission(
            "category is not visible to this user".to_string(),
        ));
    }

    let bookmark = Bookmark {
        id: Uuid::new_v4().to_string(),
        name: payload.name,
        url: payload.url,
        category_id: payload.category_id,
        description: payload.description,
        icon: payload.icon,
        sort_order: payload.sort_order,
    };
    doc.bookmarks.push(bookmark.clone());
    state.repository.save(&doc).await?;

    Ok((StatusCode::CREATED, Json(bookmark)))
}

/// Update a bookmark
pub async fn update_bookmark(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<UpdateBookmark>,
) -> Result<impl IntoResponse, ApiError> {
    let mut doc = state.repository.load().await?;
    let caller = require_caller(&state, &headers, &doc)?;

    if !caller.can_edit_bookmarks() {
        return Err(ApiError::Permission("insufficient permission".to_string()));
    }

    let index = doc
        .bookmarks
        .iter()
        .position(|b| b.id == id)
        .ok_or_else(|| ApiError::NotFound("bookmark".to_string()))?;

    // A bookmark outside the caller's view reads as absent
    if !caller.can_see(&doc.bookmarks[index].category_id) {
        return Err(ApiError::NotFound("bookmark".to_string()));
    }

    if let Some(category_id) = &payload.category_id {
        if doc.category(category_id).is_none() {
            return Err(ApiError::NotFound("category".to_string()));
        }
        if !caller.can_see(category_id) {
            return Err(ApiError::Permission(
                "category is not visible to this user".to_string(),
            ));
        }
    }

    let bookmark = &mut doc.bookmarks[index];
    if let Some(name) = payload.name {
        bookmark.name = name;
    }
    if let Some(url) = payload.url {
        bookmark.url = url;
    }
    if let Some(category_id) = payload.category_id {
        bookmark.category_id = category_id;
    }
    if let Some(description) = payload.description {
        bookmark.description = description;
    }
    if let Some(icon) = payload.icon {
        bookmark.icon = icon;
    }
    if let Some(sort_order) = payload.sort_order {
        bookmark.sort_order = Some(sort_order);
    }
    validation::validate_bookmark(&bookmark.name, &bookmark.url).map_err(ApiError::Validation)?;

    let updated = bookmark.clone();
    state.repository.save(&doc).await?;

    Ok((StatusCode::OK, Json(updated)))
}

/// Delete a bookmark
pub async fn delete_bookmark(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let mut doc = state.repository.load().await?;
    let caller = require_caller(&state, &headers, &doc)?;

    if !caller.can_edit_bookmarks() {
        return Err(ApiError::Permission("insufficient permission".to_string()));
    }

    let index = doc
        .bookmarks
        .iter()
        .position(|b| b.id == id)
        .ok_or_else(|| ApiError::NotFound("bookmark".to_string()))?;
    if !caller.can_see(&doc.bookmarks[index].category_id) {
        return Err(ApiError::NotFound("bookmark".to_string()));
    }

    doc.bookmarks.remove(index);
    state.repository.save(&doc).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Create a new category
///
/// The creating user and every admin are granted visibility of the new
/// category.
pub async fn create_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<NewCategory>,
) -> Result<impl IntoResponse, ApiError> {
    let mut doc = state.repository.load().await?;
    let caller = require_caller(&state, &headers, &doc)?;

    if !caller.can_edit_categories() {
        return Err(ApiError::Permission("insufficient permission".to_string()));
    }
    validation::validate_category_name(&payload.name).map_err(ApiError::Validation)?;

    if doc.categories.iter().any(|c| c.name == payload.name) {
        return Err(ApiError::Validation(
            "a category with this name already exists".to_string(),
        ));
    }
    if let Some(parent_id) = &payload.parent_id {
        if doc.category(parent_id).is_none() {
            return Err(ApiError::NotFound("parent category".to_string()));
        }
    }

    let category = Category {
        id: Uuid::new_v4().to_string(),
        name: payload.name,
        parent_id: payload.parent_id,
        sort_order: payload.sort_order,
    };
    doc.categories.push(category.clone());

    for user in doc.users.values_mut() {
        if user.username == caller.username || user.is_admin() {
            user.permissions
                .visible_categories
                .insert(category.id.clone());
        }
    }

    state.repository.save(&doc).await?;

    Ok((StatusCode::CREATED, Json(category)))
}

/// Update a category
///
/// A reparent that would make the category its own ancestor is rejected.
pub async fn update_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<UpdateCategory>,
) -> Result<impl IntoResponse, ApiError> {
    let mut doc = state.repository.load().await?;
    let caller = require_caller(&state, &headers, &doc)?;

    if !caller.can_edit_categories() {
        return Err(ApiError::Permission("insufficient permission".to_string()));
    }

    let index = doc
        .categories
        .iter()
        .position(|c| c.id == id)
        .ok_or_else(|| ApiError::NotFound("category".to_string()))?;
    if !caller.can_see(&id) {
        return Err(ApiError::NotFound("category".to_string()));
    }

    if let Some(name) = &payload.name {
        validation::validate_category_name(name).map_err(ApiError::Validation)?;
        if doc.categories.iter().any(|c| c.name == *name && c.id != id) {
            return Err(ApiError::Validation(
                "a category with this name already exists".to_string(),
            ));
        }
    }
    if let Some(Some(parent_id)) = &payload.parent_id {
        if doc.category(parent_id).is_none() {
            return Err(ApiError::NotFound("parent category".to_string()));
        }
        if graph::would_create_cycle(&id, parent_id, &doc.categories) {
            return Err(ApiError::Validation(
                "a category cannot be moved under itself or its own descendant".to_string(),
            ));
        }
    }

    let category = &mut doc.categories[index];
    if let Some(name) = payload.name {
        category.name = name;
    }
    if let Some(parent_id) = payload.parent_id {
        category.parent_id = parent_id;
    }
    if let Some(sort_order) = payload.sort_order {
        category.sort_order = Some(sort_order);
    }

    let updated = category.clone();
    state.repository.save(&doc).await?;

    Ok((StatusCode::OK, Json(updated)))
}

/// Delete categories by id list, cascading over each subtree
pub async fn delete_categories(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<DeleteCategoriesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut doc = state.repository.load().await?;
    let caller = require_caller(&state, &headers, &doc)?;

    if !caller.can_edit_categories() {
        return Err(ApiError::Permission("insufficient permission".to_string()));
    }
    if payload.ids.is_empty() {
        return Err(ApiError::Validation(
            "at least one category id is required".to_string(),
        ));
    }

    for id in &payload.ids {
        if doc.category(id).is_none() || !caller.can_see(id) {
            return Err(ApiError::NotFound("category".to_string()));
        }
    }

    let targets: BTreeSet<String> = payload.ids.into_iter().collect();
    graph::cascade_delete(&targets, &mut doc);
    state.repository.save(&doc).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Create a new user
pub async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<NewUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut doc = state.repository.load().await?;
    let caller = require_caller(&state, &headers, &doc)?;

    if !caller.can_edit_users() {
        return Err(ApiError::Permission("insufficient permission".to_string()));
    }
    validation::validate_username(&payload.username).map_err(ApiError::Validation)?;
    validation::validate_password(&payload.password).map_err(ApiError::Validation)?;

    if payload.username == ANONYMOUS_USERNAME {
        return Err(ApiError::Validation("this username is reserved".to_string()));
    }
    if doc.users.contains_key(&payload.username) {
        return Err(ApiError::Validation(
            "a user with this username already exists".to_string(),
        ));
    }
    if payload.roles.is_empty() {
        return Err(ApiError::Validation(
            "at least one role is required".to_string(),
        ));
    }

    let salt = password::generate_salt();
    let hash = password::hash_password(&payload.password, &salt);
    let user = User {
        username: payload.username.clone(),
        password_hash: Some(hash),
        salt: Some(salt),
        roles: payload.roles,
        permissions: Permissions {
            visible_categories: payload.visible_categories,
        },
    };
    let safe = SafeUser::from(&user);

    doc.users.insert(payload.username, user);
    state.repository.save(&doc).await?;

    Ok((StatusCode::CREATED, Json(safe)))
}

/// Update a user's password, roles, or visibility set
pub async fn update_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(username): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut doc = state.repository.load().await?;
    let caller = require_caller(&state, &headers, &doc)?;

    if !caller.can_edit_users() {
        return Err(ApiError::Permission("insufficient permission".to_string()));
    }
    if !doc.users.contains_key(&username) {
        return Err(ApiError::NotFound("user".to_string()));
    }

    if let Some(roles) = &payload.roles {
        if roles.is_empty() {
            return Err(ApiError::Validation(
                "at least one role is required".to_string(),
            ));
        }
        if username == ANONYMOUS_USERNAME && roles.contains(&Role::Admin) {
            return Err(ApiError::Validation(
                "the anonymous account cannot hold the admin role".to_string(),
            ));
        }
        let target_is_admin = doc.users[&username].is_admin();
        if target_is_admin && !roles.contains(&Role::Admin) && doc.admin_count() == 1 {
            return Err(ApiError::Conflict(
                "cannot remove the admin role from the last admin".to_string(),
            ));
        }
    }
    if payload.password.is_some() && username == ANONYMOUS_USERNAME {
        return Err(ApiError::Validation(
            "the anonymous account has no password".to_string(),
        ));
    }
    if let Some(pw) = &payload.password {
        validation::validate_password(pw).map_err(ApiError::Validation)?;
    }

    let user = doc
        .users
        .get_mut(&username)
        .ok_or_else(|| ApiError::NotFound("user".to_string()))?;
    if let Some(roles) = payload.roles {
        user.roles = roles;
    }
    if let Some(pw) = payload.password {
        let salt = password::generate_salt();
        user.password_hash = Some(password::hash_password(&pw, &salt));
        user.salt = Some(salt);
    }
    if let Some(visible) = payload.visible_categories {
        user.permissions.visible_categories = visible;
    }

    let safe = SafeUser::from(&*user);
    state.repository.save(&doc).await?;

    Ok((StatusCode::OK, Json(safe)))
}

/// Delete a user
///
/// Self-deletion is rejected first, then deletion of the last remaining
/// admin; the reserved anonymous account can never be deleted.
pub async fn delete_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let mut doc = state.repository.load().await?;
    let caller = require_caller(&state, &headers, &doc)?;

    if !caller.can_edit_users() {
        return Err(ApiError::Permission("insufficient permission".to_string()));
    }
    if !doc.users.contains_key(&username) {
        return Err(ApiError::NotFound("user".to_string()));
    }

    if username == caller.username {
        return Err(ApiError::Conflict(
            "users cannot delete their own account".to_string(),
        ));
    }
    if username == ANONYMOUS_USERNAME {
        return Err(ApiError::Conflict(
            "the anonymous account cannot be deleted".to_string(),
        ));
    }
    if doc.users[&username].is_admin() && doc.admin_count() == 1 {
        return Err(ApiError::Conflict(
            "cannot delete the last admin account".to_string(),
        ));
    }

    doc.users.remove(&username);
    state.repository.save(&doc).await?;

    Ok(StatusCode::NO_CONTENT)
}
