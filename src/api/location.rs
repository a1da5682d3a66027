use crate::auth::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::model::location::{Pincode, StateCountry};
use crate::model::user::is_digits;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;

use super::Page;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateStateCountry {
    #[schema(example = "Karnataka")]
    pub state_name: String,
    #[schema(example = "India")]
    pub country_name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePincode {
    #[schema(example = "560001")]
    pub pincode: String,
    pub state_country_id: u64,
}

/// State/country pair
#[utoipa::path(
    post,
    path = "/api/v1/state-country",
    request_body = CreateStateCountry,
    responses(
        (status = 201, description = "Created", body = StateCountry),
        (status = 403, description = "Caller is not an owner or trainer"),
        (status = 409, description = "Pair already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Location"
)]
pub async fn create_state_country(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateStateCountry>,
) -> Result<HttpResponse> {
    auth.require_staff("manage locations")?;
    let state = payload.state_name.trim();
    let country = payload.country_name.trim();
    if state.is_empty() || country.is_empty() {
        return Err(AppError::Validation("State and country names are required".into()));
    }

    let result = sqlx::query("INSERT INTO state_country (state_name, country_name) VALUES (?, ?)")
        .bind(state)
        .bind(country)
        .execute(pool.get_ref())
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => {
                AppError::Conflict("State and country combination already exists".into())
            }
            other => other,
        })?;

    let created = StateCountry {
        id: result.last_insert_id(),
        state_name: state.to_string(),
        country_name: country.to_string(),
    };
    info!(id = created.id, actor = auth.user_id, "State/country created");
    Ok(HttpResponse::Created().json(created))
}

#[utoipa::path(
    get,
    path = "/api/v1/state-country",
    params(
        ("skip" = Option<u32>, Query, description = "Rows to skip"),
        ("limit" = Option<u32>, Query, description = "Page size, at most 100")
    ),
    responses((status = 200, description = "State/country pairs", body = [StateCountry])),
    tag = "Location"
)]
pub async fn list_state_countries(
    pool: web::Data<MySqlPool>,
    page: web::Query<Page>,
) -> Result<HttpResponse> {
    let rows = sqlx::query_as::<_, StateCountry>(
        "SELECT id, state_name, country_name FROM state_country ORDER BY id LIMIT ? OFFSET ?",
    )
    .bind(page.limit())
    .bind(page.skip())
    .fetch_all(pool.get_ref())
    .await?;
    Ok(HttpResponse::Ok().json(rows))
}

#[utoipa::path(
    get,
    path = "/api/v1/state-country/{id}",
    params(("id", Path, description = "State/country ID")),
    responses(
        (status = 200, description = "State/country", body = StateCountry),
        (status = 404, description = "Not found")
    ),
    tag = "Location"
)]
pub async fn get_state_country(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse> {
    let row = sqlx::query_as::<_, StateCountry>(
        "SELECT id, state_name, country_name FROM state_country WHERE id = ?",
    )
    .bind(path.into_inner())
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::NotFound("State/country not found".into()))?;
    Ok(HttpResponse::Ok().json(row))
}

#[utoipa::path(
    delete,
    path = "/api/v1/state-country/{id}",
    params(("id", Path, description = "State/country ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Caller is not an owner or trainer"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Still referenced by pincodes")
    ),
    security(("bearer_auth" = [])),
    tag = "Location"
)]
pub async fn delete_state_country(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse> {
    auth.require_staff("manage locations")?;
    let id = path.into_inner();
    let result = sqlx::query("DELETE FROM state_country WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::NotFound(_) => {
                AppError::Conflict("State/country is still referenced by pincodes".into())
            }
            other => other,
        })?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("State/country not found".into()));
    }
    info!(id, actor = auth.user_id, "State/country deleted");
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    post,
    path = "/api/v1/pincodes",
    request_body = CreatePincode,
    responses(
        (status = 201, description = "Created", body = Pincode),
        (status = 400, description = "Pincode is not 6 digits"),
        (status = 403, description = "Caller is not an owner or trainer"),
        (status = 404, description = "State/country not found"),
        (status = 409, description = "Pincode already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Location"
)]
pub async fn create_pincode(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreatePincode>,
) -> Result<HttpResponse> {
    auth.require_staff("manage locations")?;
    let code = payload.pincode.trim();
    if !is_digits(code, 6) {
        return Err(AppError::Validation("Pincode must be 6 digits".into()));
    }

    let parent_exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM state_country WHERE id = ?)")
            .bind(payload.state_country_id)
            .fetch_one(pool.get_ref())
            .await?;
    if !parent_exists {
        return Err(AppError::NotFound("State/country not found".into()));
    }

    let result = sqlx::query("INSERT INTO pincode (pincode, state_country_id) VALUES (?, ?)")
        .bind(code)
        .bind(payload.state_country_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict("Pincode already exists".into()),
            other => other,
        })?;

    let created = Pincode {
        id: result.last_insert_id(),
        pincode: code.to_string(),
        state_country_id: payload.state_country_id,
    };
    info!(id = created.id, actor = auth.user_id, "Pincode created");
    Ok(HttpResponse::Created().json(created))
}

#[utoipa::path(
    get,
    path = "/api/v1/pincodes",
    params(
        ("skip" = Option<u32>, Query, description = "Rows to skip"),
        ("limit" = Option<u32>, Query, description = "Page size, at most 100")
    ),
    responses((status = 200, description = "Pincodes", body = [Pincode])),
    tag = "Location"
)]
pub async fn list_pincodes(
    pool: web::Data<MySqlPool>,
    page: web::Query<Page>,
) -> Result<HttpResponse> {
    let rows = sqlx::query_as::<_, Pincode>(
        "SELECT id, pincode, state_country_id FROM pincode ORDER BY id LIMIT ? OFFSET ?",
    )
    .bind(page.limit())
    .bind(page.skip())
    .fetch_all(pool.get_ref())
    .await?;
    Ok(HttpResponse::Ok().json(rows))
}

#[utoipa::path(
    get,
    path = "/api/v1/pincodes/{id}",
    params(("id", Path, description = "Pincode row ID")),
    responses(
        (status = 200, description = "Pincode", body = Pincode),
        (status = 404, description = "Not found")
    ),
    tag = "Location"
)]
pub async fn get_pincode(pool: web::Data<MySqlPool>, path: web::Path<u64>) -> Result<HttpResponse> {
    let row = sqlx::query_as::<_, Pincode>(
        "SELECT id, pincode, state_country_id FROM pincode WHERE id = ?",
    )
    .bind(path.into_inner())
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::NotFound("Pincode not found".into()))?;
    Ok(HttpResponse::Ok().json(row))
}

#[utoipa::path(
    get,
    path = "/api/v1/pincodes/code/{pincode}",
    params(("pincode", Path, description = "Six-digit pincode")),
    responses(
        (status = 200, description = "Pincode", body = Pincode),
        (status = 404, description = "Not found")
    ),
    tag = "Location"
)]
pub async fn get_pincode_by_code(
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let row = sqlx::query_as::<_, Pincode>(
        "SELECT id, pincode, state_country_id FROM pincode WHERE pincode = ?",
    )
    .bind(path.into_inner())
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::NotFound("Pincode not found".into()))?;
    Ok(HttpResponse::Ok().json(row))
}

#[utoipa::path(
    delete,
    path = "/api/v1/pincodes/{id}",
    params(("id", Path, description = "Pincode row ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Caller is not an owner or trainer"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Location"
)]
pub async fn delete_pincode(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse> {
    auth.require_staff("manage locations")?;
    let id = path.into_inner();
    let result = sqlx::query("DELETE FROM pincode WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Pincode not found".into()));
    }
    info!(id, actor = auth.user_id, "Pincode deleted");
    Ok(HttpResponse::NoContent().finish())
}
