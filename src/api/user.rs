use crate::auth::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::model::user::User;
use actix_web::{HttpResponse, web};
use sqlx::MySqlPool;

use super::Page;

const USER_COLUMNS: &str = "id, gym_id, email, full_name, address, district, state_ut, pincode, \
     phone, is_member, is_trainer, is_owner, is_active, is_verified, created_at";

/// List users
#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(
        ("skip" = Option<u32>, Query, description = "Rows to skip"),
        ("limit" = Option<u32>, Query, description = "Page size, at most 100")
    ),
    responses(
        (status = 200, description = "Users ordered by id", body = [User]),
        (status = 403, description = "Caller is not an owner or trainer")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn list_users(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    page: web::Query<Page>,
) -> Result<HttpResponse> {
    auth.require_staff("list users")?;
    let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id LIMIT ? OFFSET ?");
    let users = sqlx::query_as::<_, User>(&sql)
        .bind(page.limit())
        .bind(page.skip())
        .fetch_all(pool.get_ref())
        .await?;
    Ok(HttpResponse::Ok().json(users))
}

/// Get a user profile
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}",
    params(("user_id", Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = User),
        (status = 403, description = "Members may only view themselves"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn get_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    auth.require_self_or_staff(user_id)?;

    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(user_id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(HttpResponse::Ok().json(user))
}

/// Users registered at a gym
#[utoipa::path(
    get,
    path = "/api/v1/gyms/{gym_id}/users",
    params(
        ("gym_id", Path, description = "Gym ID"),
        ("skip" = Option<u32>, Query, description = "Rows to skip"),
        ("limit" = Option<u32>, Query, description = "Page size, at most 100")
    ),
    responses(
        (status = 200, description = "Users of the gym", body = [User]),
        (status = 403, description = "Caller is not an owner or trainer")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn gym_users(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    page: web::Query<Page>,
) -> Result<HttpResponse> {
    auth.require_staff("list gym members")?;
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users WHERE gym_id = ? ORDER BY id LIMIT ? OFFSET ?"
    );
    let users = sqlx::query_as::<_, User>(&sql)
        .bind(path.into_inner())
        .bind(page.limit())
        .bind(page.skip())
        .fetch_all(pool.get_ref())
        .await?;
    Ok(HttpResponse::Ok().json(users))
}
