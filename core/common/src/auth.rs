// core/common/src/auth.rs
// JWT authentication, roles and password hashing

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use subtle::ConstantTimeEq;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Session revoked")]
    SessionRevoked,
    #[error("Missing authorization header")]
    MissingAuth,
    #[error("Insufficient permissions")]
    InsufficientPermissions,
    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,      // User id
    pub username: String,
    pub role: Role,
    pub jti: String,      // Session id, matched against the session store
    pub exp: usize,
    pub iat: usize,
}

impl Claims {
    pub fn new(user_id: i64, username: String, role: Role, ttl_hours: u64) -> Self {
        let now = chrono::Utc::now().timestamp() as usize;

        Self {
            sub: user_id.to_string(),
            username,
            role,
            jti: Uuid::new_v4().to_string(),
            exp: now + (ttl_hours * 3600) as usize,
            iat: now,
        }
    }

    pub fn user_id(&self) -> Result<i64, AuthError> {
        self.sub.parse().map_err(|_| AuthError::InvalidToken)
    }

    pub fn is_expired(&self) -> bool {
        self.exp < chrono::Utc::now().timestamp() as usize
    }

    /// Seconds until expiry, never zero.
    pub fn remaining_seconds(&self) -> u64 {
        let now = chrono::Utc::now().timestamp() as usize;
        self.exp.saturating_sub(now).max(1) as u64
    }
}

#[derive(Clone)]
pub struct JwtManager {
    secret: String,
    ttl_hours: u64,
}

impl JwtManager {
    pub fn new(secret: String, ttl_hours: u64) -> Self {
        Self { secret, ttl_hours }
    }

    pub fn ttl_hours(&self) -> u64 {
        self.ttl_hours
    }

    /// Issue a token with a fresh session id
    pub fn create_token(&self, user_id: i64, username: &str, role: Role) -> Result<(String, Claims), AuthError> {
        let claims = Claims::new(user_id, username.to_string(), role, self.ttl_hours);

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;

        Ok((token, claims))
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        match decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::default(),
        ) {
            Ok(token_data) => Ok(token_data.claims),
            Err(err) => {
                use jsonwebtoken::errors::ErrorKind;
                match err.kind() {
                    ErrorKind::ExpiredSignature => Err(AuthError::TokenExpired),
                    _ => Err(AuthError::JwtError(err)),
                }
            }
        }
    }

    /// Issue a new token for the same user; the new token carries a new session id
    pub fn refresh_token(&self, token: &str) -> Result<(String, Claims), AuthError> {
        let claims = self.verify_token(token)?;
        self.create_token(claims.user_id()?, &claims.username, claims.role)
    }
}

/// Extract Bearer token from Authorization header
pub fn extract_bearer_token(auth_header: &str) -> Result<String, AuthError> {
    match auth_header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => Err(AuthError::InvalidToken),
    }
}

pub fn session_key(user_id: i64) -> String {
    format!("session:{}", user_id)
}

/// 16 random bytes, hex encoded
pub fn generate_salt() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}

pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compares digests in constant time so the match position does not leak
pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
    let computed = hash_password(password, salt);
    computed.as_bytes().ct_eq(expected_hash.as_bytes()).into()
}
