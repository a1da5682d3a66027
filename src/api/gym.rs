use crate::error::{AppError, Result};
use crate::model::gym::{Gym, generate_gym_code};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;

use super::Page;

const GYM_COLUMNS: &str =
    "id, gym_code, gym_name, address, district, state_ut, pincode, country, created_at";

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateGym {
    #[schema(example = "Iron Temple")]
    pub gym_name: String,
    pub address: Option<String>,
    pub district: Option<String>,
    pub state_ut: Option<String>,
    #[schema(example = "560001")]
    pub pincode: Option<String>,
    #[schema(example = "India")]
    pub country: Option<String>,
}

async fn fetch_gym(id: u64, pool: &MySqlPool) -> Result<Option<Gym>> {
    let sql = format!("SELECT {GYM_COLUMNS} FROM gym WHERE id = ?");
    Ok(sqlx::query_as::<_, Gym>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

/// Register a gym
#[utoipa::path(
    post,
    path = "/api/v1/gyms",
    request_body = CreateGym,
    responses(
        (status = 201, description = "Gym created with a generated code", body = Gym),
        (status = 400, description = "Missing gym name or malformed pincode")
    ),
    tag = "Gym"
)]
pub async fn create_gym(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateGym>,
) -> Result<HttpResponse> {
    let req = payload.into_inner();
    if req.gym_name.trim().is_empty() {
        return Err(AppError::Validation("Gym name must not be empty".into()));
    }
    if let Some(pincode) = &req.pincode {
        if !crate::model::user::is_digits(pincode, 6) {
            return Err(AppError::Validation("Pincode must be 6 digits".into()));
        }
    }

    let gym_code = generate_gym_code();
    let result = sqlx::query(
        r#"
        INSERT INTO gym (gym_code, gym_name, address, district, state_ut, pincode, country)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&gym_code)
    .bind(req.gym_name.trim())
    .bind(&req.address)
    .bind(&req.district)
    .bind(&req.state_ut)
    .bind(&req.pincode)
    .bind(&req.country)
    .execute(pool.get_ref())
    .await?;

    let id = result.last_insert_id();
    info!(gym_id = id, gym_code = %gym_code, "Gym created");
    let gym = fetch_gym(id, pool.get_ref())
        .await?
        .ok_or_else(|| AppError::Upstream("created gym could not be read back".into()))?;
    Ok(HttpResponse::Created().json(gym))
}

/// List gyms
#[utoipa::path(
    get,
    path = "/api/v1/gyms",
    params(
        ("skip" = Option<u32>, Query, description = "Rows to skip"),
        ("limit" = Option<u32>, Query, description = "Page size, at most 100")
    ),
    responses((status = 200, description = "Gyms ordered by id", body = [Gym])),
    tag = "Gym"
)]
pub async fn list_gyms(
    pool: web::Data<MySqlPool>,
    page: web::Query<Page>,
) -> Result<HttpResponse> {
    let sql = format!("SELECT {GYM_COLUMNS} FROM gym ORDER BY id LIMIT ? OFFSET ?");
    let gyms = sqlx::query_as::<_, Gym>(&sql)
        .bind(page.limit())
        .bind(page.skip())
        .fetch_all(pool.get_ref())
        .await?;
    Ok(HttpResponse::Ok().json(gyms))
}

/// Get a gym
#[utoipa::path(
    get,
    path = "/api/v1/gyms/{gym_id}",
    params(("gym_id", Path, description = "Gym ID")),
    responses(
        (status = 200, description = "Gym", body = Gym),
        (status = 404, description = "Gym not found")
    ),
    tag = "Gym"
)]
pub async fn get_gym(pool: web::Data<MySqlPool>, path: web::Path<u64>) -> Result<HttpResponse> {
    let gym = fetch_gym(path.into_inner(), pool.get_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("Gym not found".into()))?;
    Ok(HttpResponse::Ok().json(gym))
}
