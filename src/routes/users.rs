use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::{AdminUser, AuthUser, create_account, hash_password},
    error::{AppError, Result},
    models::{CreateUserRequest, Role, User},
    state::AppState,
};

#[derive(Serialize)]
pub struct UserView {
    pub id: String,
    pub username: String,
    pub role: String,
    pub banned: bool,
    pub created_at: String,
}

impl From<User> for UserView {
    fn from(u: User) -> Self {
        UserView {
            id: u.id,
            username: u.username,
            role: u.role,
            banned: u.banned,
            created_at: u.created_at,
        }
    }
}

async fn find_user(state: &AppState, id: &str) -> Result<User> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id=?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?;
    user.ok_or(AppError::NotFound)
}

/// Admins manage plain users; only the owner manages admins.
fn can_manage(caller: &User, target: &User) -> bool {
    caller.id != target.id
        && match target.role() {
            Role::Owner => false,
            Role::Admin => caller.role() == Role::Owner,
            Role::User => caller.is_admin(),
        }
}

/// GET /api/users
pub async fn list_users(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserView>>> {
    let users: Vec<User> = sqlx::query_as("SELECT * FROM users ORDER BY created_at, username")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(users.into_iter().map(UserView::from).collect()))
}

/// GET /api/users/me
pub async fn get_me(AuthUser(user): AuthUser) -> Json<UserView> {
    Json(UserView::from(user))
}

/// POST /api/users
pub async fn create_user(
    AdminUser(caller): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserView>)> {
    let role = req.role.unwrap_or(Role::User);
    match role {
        Role::Owner => return Err(AppError::BadRequest("there is only one owner".into())),
        Role::Admin if caller.role() != Role::Owner => return Err(AppError::Forbidden),
        _ => {}
    }

    let user = create_account(&state, &req.username, &req.password, role).await?;
    tracing::info!("{} created {} account '{}'", caller.username, role, user.username);
    Ok((StatusCode::CREATED, Json(UserView::from(user))))
}

/// DELETE /api/users/{id}
pub async fn delete_user(
    AdminUser(caller): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    if caller.id == id {
        return Err(AppError::BadRequest("cannot delete yourself".into()));
    }
    let target = find_user(&state, &id).await?;
    if !can_manage(&caller, &target) {
        return Err(AppError::Forbidden);
    }

    sqlx::query("DELETE FROM users WHERE id=?")
        .bind(&id)
        .execute(&state.db)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct BanRequest {
    pub banned: bool,
}

/// PUT /api/users/{id}/ban
pub async fn set_banned(
    AdminUser(caller): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<BanRequest>,
) -> Result<Json<UserView>> {
    let target = find_user(&state, &id).await?;
    if !can_manage(&caller, &target) {
        return Err(AppError::Forbidden);
    }

    sqlx::query("UPDATE users SET banned=?, updated_at=datetime('now') WHERE id=?")
        .bind(req.banned)
        .bind(&id)
        .execute(&state.db)
        .await?;

    Ok(Json(UserView::from(find_user(&state, &id).await?)))
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub new_password: String,
}

/// PUT /api/users/{id}/password
pub async fn change_password(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<StatusCode> {
    // Users can only change their own password
    if caller.id != id {
        return Err(AppError::Forbidden);
    }
    if req.new_password.len() < 8 {
        return Err(AppError::BadRequest(
            "password must be at least 8 characters".into(),
        ));
    }

    let hash = hash_password(&req.new_password).map_err(|e| AppError::Internal(e.to_string()))?;

    sqlx::query("UPDATE users SET password=?, updated_at=datetime('now') WHERE id=?")
        .bind(&hash)
        .bind(&id)
        .execute(&state.db)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, role: Role) -> User {
        User {
            id: id.into(),
            username: id.into(),
            password: String::new(),
            role: role.to_string(),
            banned: false,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn management_hierarchy() {
        let owner = user("o", Role::Owner);
        let admin = user("a", Role::Admin);
        let other_admin = user("a2", Role::Admin);
        let plain = user("u", Role::User);

        assert!(can_manage(&owner, &admin));
        assert!(can_manage(&admin, &plain));
        assert!(!can_manage(&admin, &other_admin));
        assert!(!can_manage(&admin, &owner));
        assert!(!can_manage(&owner, &owner));
        assert!(!can_manage(&plain, &plain));
    }
}
