use crate::model::role::Roles;
use crate::models::{Claims, TokenType};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};
use uuid::Uuid;

fn now() -> usize {
    usize::try_from(chrono::Utc::now().timestamp()).unwrap_or_default()
}

fn claims(user_id: u64, email: String, roles: Roles, ttl: usize, token_type: TokenType) -> Claims {
    Claims {
        user_id,
        sub: email,
        is_owner: roles.is_owner,
        is_trainer: roles.is_trainer,
        is_member: roles.is_member,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type,
    }
}

pub fn generate_access_token(
    user_id: u64,
    email: String,
    roles: Roles,
    secret: &str,
    ttl: usize,
) -> Result<String, Error> {
    encode(
        &Header::default(),
        &claims(user_id, email, roles, ttl, TokenType::Access),
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn generate_refresh_token(
    user_id: u64,
    email: String,
    roles: Roles,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), Error> {
    let claims = claims(user_id, email, roles, ttl, TokenType::Refresh);
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok((token, claims))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_jwt_secret_32_bytes_minimum!!";

    #[test]
    fn access_token_carries_roles() {
        let token = generate_access_token(7, "a@b.co".into(), Roles::trainer(), SECRET, 60).unwrap();
        let claims = verify_token(&token, SECRET).unwrap();
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.token_type, TokenType::Access);
        assert!(claims.roles().is_staff());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let (token, _) = generate_refresh_token(7, "a@b.co".into(), Roles::member(), SECRET, 60).unwrap();
        assert!(verify_token(&token, "another_secret_entirely_0123456789").is_err());
    }

    #[test]
    fn refresh_tokens_get_unique_ids() {
        let (_, a) = generate_refresh_token(1, "a@b.co".into(), Roles::member(), SECRET, 60).unwrap();
        let (_, b) = generate_refresh_token(1, "a@b.co".into(), Roles::member(), SECRET, 60).unwrap();
        assert_ne!(a.jti, b.jti);
        assert_eq!(a.token_type, TokenType::Refresh);
    }
}
