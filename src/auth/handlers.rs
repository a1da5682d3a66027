use crate::{
    auth::{
        auth::bearer_token,
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        otp::OtpStore,
        password::{hash_password, verify_password},
    },
    config::Config,
    error::{AppError, Result},
    model::role::Roles,
    models::{EmailReq, LoginReqDto, RegisterReq, TokenPair, TokenType, UserSql, VerifyOtpReq},
    notify::{Notifier, deliver_otp},
    utils::{email_cache, email_filter},
};
use actix_web::{HttpRequest, HttpResponse, web};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, info, instrument, warn};

const USER_CREDENTIAL_COLUMNS: &str =
    "id, email, password, is_member, is_trainer, is_owner, is_active, is_verified";

async fn find_user(email: &str, pool: &MySqlPool) -> Result<Option<UserSql>> {
    let sql = format!("SELECT {USER_CREDENTIAL_COLUMNS} FROM users WHERE email = ?");
    Ok(sqlx::query_as::<_, UserSql>(&sql)
        .bind(email)
        .fetch_optional(pool)
        .await?)
}

/// true  => email AVAILABLE
/// false => email TAKEN
pub async fn is_email_available(email: &str, pool: &MySqlPool) -> Result<bool> {
    // cuckoo filter: a miss is definitive
    if !email_filter::might_exist(email) {
        return Ok(true);
    }

    // moka cache: a hit is definitive
    if email_cache::is_taken(email).await {
        return Ok(false);
    }

    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ? LIMIT 1)",
    )
    .bind(email)
    .fetch_one(pool)
    .await?;

    if exists {
        email_cache::mark_taken(email).await;
    }
    Ok(!exists)
}

async fn issue_tokens(
    user_id: u64,
    email: &str,
    roles: Roles,
    pool: &MySqlPool,
    config: &Config,
) -> Result<TokenPair> {
    let access_token = generate_access_token(
        user_id,
        email.to_string(),
        roles,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(|e| AppError::Internal(e.into()))?;

    let (refresh_token, refresh_claims) = generate_refresh_token(
        user_id,
        email.to_string(),
        roles,
        &config.jwt_secret,
        config.refresh_token_ttl,
    )
    .map_err(|e| AppError::Internal(e.into()))?;

    debug!(user_id, jti = %refresh_claims.jti, "Storing refresh token");
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(user_id)
    .bind(&refresh_claims.jti)
    .bind(refresh_claims.exp as i64)
    .execute(pool)
    .await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Register a member account
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "User registered, OTP sent", body = Object, example = json!({
            "message": "User registered. Verify the OTP sent to your email",
            "user_id": 12
        })),
        (status = 400, description = "Invalid registration data"),
        (status = 404, description = "Gym not found"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Auth"
)]
pub async fn register(
    payload: web::Json<RegisterReq>,
    pool: web::Data<MySqlPool>,
    otp: web::Data<OtpStore>,
    notifier: web::Data<dyn Notifier>,
) -> Result<HttpResponse> {
    let req = payload.into_inner();
    req.validate()?;
    let email = req.email.trim().to_lowercase();

    if !is_email_available(&email, pool.get_ref()).await? {
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let gym_exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM gym WHERE id = ?)")
            .bind(req.gym_id)
            .fetch_one(pool.get_ref())
            .await?;
    if !gym_exists {
        return Err(AppError::NotFound("Gym not found".into()));
    }

    let hashed = hash_password(&req.password)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("password hashing failed: {e}")))?;

    let result = sqlx::query(
        r#"
        INSERT INTO users
        (gym_id, email, password, full_name, address, district, state_ut, pincode, phone)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(req.gym_id)
    .bind(&email)
    .bind(&hashed)
    .bind(req.full_name.trim())
    .bind(&req.address)
    .bind(&req.district)
    .bind(&req.state_ut)
    .bind(&req.pincode)
    .bind(&req.phone)
    .execute(pool.get_ref())
    .await
    .map_err(|e| match AppError::from(e) {
        AppError::Conflict(_) => AppError::Conflict("Email already registered".into()),
        other => other,
    })?;

    email_filter::insert(&email);
    email_cache::mark_taken(&email).await;

    let code = otp.issue(&email).await;
    deliver_otp(notifier.get_ref(), &email, &code).await;

    let user_id = result.last_insert_id();
    info!(user_id, gym_id = req.gym_id, "User registered");
    Ok(HttpResponse::Created().json(json!({
        "message": "User registered. Verify the OTP sent to your email",
        "user_id": user_id
    })))
}

async fn unverified_user(email: &str, pool: &MySqlPool) -> Result<UserSql> {
    let user = find_user(email, pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    if user.is_verified {
        return Err(AppError::Validation("User already verified".into()));
    }
    Ok(user)
}

/// Verify the emailed OTP
#[utoipa::path(
    post,
    path = "/api/v1/auth/verify-otp",
    request_body = VerifyOtpReq,
    responses(
        (status = 200, description = "Email verified", body = Object, example = json!({
            "message": "Email verified successfully"
        })),
        (status = 400, description = "Invalid or expired OTP (a new one is sent) or already verified"),
        (status = 404, description = "User not found")
    ),
    tag = "Auth"
)]
pub async fn verify_otp(
    payload: web::Json<VerifyOtpReq>,
    pool: web::Data<MySqlPool>,
    otp: web::Data<OtpStore>,
    notifier: web::Data<dyn Notifier>,
) -> Result<HttpResponse> {
    let email = payload.email.trim().to_lowercase();
    let user = unverified_user(&email, pool.get_ref()).await?;

    if !otp.verify(&email, &payload.otp).await {
        let code = otp.issue(&email).await;
        deliver_otp(notifier.get_ref(), &email, &code).await;
        info!(user_id = user.id, "OTP rejected, new OTP sent");
        return Err(AppError::Validation(
            "Invalid or expired OTP. A new OTP has been sent".into(),
        ));
    }

    sqlx::query("UPDATE users SET is_verified = TRUE WHERE id = ?")
        .bind(user.id)
        .execute(pool.get_ref())
        .await?;

    info!(user_id = user.id, "Email verified");
    Ok(HttpResponse::Ok().json(json!({ "message": "Email verified successfully" })))
}

/// Send a fresh OTP
#[utoipa::path(
    post,
    path = "/api/v1/auth/resend-otp",
    request_body = EmailReq,
    responses(
        (status = 200, description = "OTP sent", body = Object, example = json!({ "message": "OTP sent" })),
        (status = 400, description = "User already verified"),
        (status = 404, description = "User not found")
    ),
    tag = "Auth"
)]
pub async fn resend_otp(
    payload: web::Json<EmailReq>,
    pool: web::Data<MySqlPool>,
    otp: web::Data<OtpStore>,
    notifier: web::Data<dyn Notifier>,
) -> Result<HttpResponse> {
    let email = payload.email.trim().to_lowercase();
    unverified_user(&email, pool.get_ref()).await?;

    let code = otp.issue(&email).await;
    deliver_otp(notifier.get_ref(), &email, &code).await;
    Ok(HttpResponse::Ok().json(json!({ "message": "OTP sent" })))
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Access and refresh tokens", body = TokenPair),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Invalid credentials, unverified or deactivated account")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, otp, notifier, user),
    fields(email = %user.email)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    otp: web::Data<OtpStore>,
    notifier: web::Data<dyn Notifier>,
) -> Result<HttpResponse> {
    info!("Login request received");

    let email = user.email.trim().to_lowercase();
    if email.is_empty() || user.password.is_empty() {
        return Err(AppError::Validation("Email and password are required".into()));
    }

    let Some(db_user) = find_user(&email, pool.get_ref()).await? else {
        info!("Invalid credentials: user not found");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    };

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    if !db_user.is_active {
        info!(user_id = db_user.id, "Login refused: account deactivated");
        return Err(AppError::Unauthorized("Account is deactivated".into()));
    }

    if !db_user.is_verified {
        let code = otp.issue(&email).await;
        deliver_otp(notifier.get_ref(), &email, &code).await;
        info!(user_id = db_user.id, "Login refused: email not verified, OTP re-sent");
        return Err(AppError::Unauthorized(
            "Email not verified. A new OTP has been sent".into(),
        ));
    }

    let tokens = issue_tokens(
        db_user.id,
        &db_user.email,
        db_user.roles(),
        pool.get_ref(),
        &config,
    )
    .await?;

    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(db_user.id)
        .execute(pool.get_ref())
        .await
    {
        // not fatal for the login itself
        warn!(error = %e, "Failed to update last_login_at");
    }

    info!(user_id = db_user.id, "Login successful");
    Ok(HttpResponse::Ok().json(tokens))
}

/// Rotate a refresh token
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Missing, invalid or revoked refresh token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse> {
    let token = bearer_token(&req)
        .ok_or_else(|| AppError::Unauthorized("Missing refresh token".into()))?;
    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Invalid refresh token".into()))?;
    if claims.token_type != TokenType::Refresh {
        return Err(AppError::Unauthorized("Refresh token required".into()));
    }

    let mut tx = pool.begin().await?;
    let record = sqlx::query_as::<_, (u64, u64, bool)>(
        "SELECT id, user_id, revoked FROM refresh_tokens WHERE jti = ? FOR UPDATE",
    )
    .bind(&claims.jti)
    .fetch_optional(&mut *tx)
    .await?;

    let (token_id, user_id) = match record {
        Some((id, user_id, false)) => (id, user_id),
        _ => return Err(AppError::Unauthorized("Refresh token revoked".into())),
    };

    sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = ?")
        .bind(token_id)
        .execute(&mut *tx)
        .await?;

    // roles and status may have changed since the token was issued
    let sql = format!("SELECT {USER_CREDENTIAL_COLUMNS} FROM users WHERE id = ?");
    let user = sqlx::query_as::<_, UserSql>(&sql)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::Unauthorized("Account is deactivated".into()))?;
    tx.commit().await?;

    let tokens = issue_tokens(user.id, &user.email, user.roles(), pool.get_ref(), &config).await?;
    info!(user_id, "Refresh token rotated");
    Ok(HttpResponse::Ok().json(tokens))
}

/// Revoke a refresh token
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses((status = 204, description = "Logged out (idempotent)")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse> {
    let Some(claims) = bearer_token(&req).and_then(|t| verify_token(t, &config.jwt_secret).ok())
    else {
        return Ok(HttpResponse::NoContent().finish());
    };

    // only refresh tokens are revocable
    if claims.token_type == TokenType::Refresh {
        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
            .bind(&claims.jti)
            .execute(pool.get_ref())
            .await?;
        info!(user_id = claims.user_id, "Logged out");
    }

    Ok(HttpResponse::NoContent().finish())
}
