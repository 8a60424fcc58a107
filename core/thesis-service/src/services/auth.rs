// core/thesis-service/src/services/auth.rs
// Captcha, login with lockout, and the single active session per user

use actix_web::http::StatusCode;
use rand::Rng;
use std::sync::Arc;
use thesis_common::{
    session_key, verify_password, AuthError, CacheStore, Claims, JwtManager, ServiceError,
    ThesisMetrics,
};
use uuid::Uuid;

use crate::models::{CaptchaChallenge, LoginRequest, LoginResponse, TokenResponse, UserProfile};
use crate::repository::UserRepository;

pub const CAPTCHA_TTL_SECONDS: u64 = 300;
pub const CAPTCHA_LENGTH: usize = 4;
pub const MAX_FAILED_LOGINS: i64 = 5;
pub const LOCKOUT_SECONDS: u64 = 900;

// No 0/O or 1/I
const CAPTCHA_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

fn captcha_key(captcha_id: &str) -> String {
    format!("captcha:{}", captcha_id)
}

fn failed_login_key(username: &str) -> String {
    format!("login:fail:{}", username)
}

fn generate_captcha_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CAPTCHA_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..CAPTCHA_CHARSET.len());
            CAPTCHA_CHARSET[idx] as char
        })
        .collect()
}

fn invalid_credentials() -> ServiceError {
    ServiceError::Custom {
        status_code: StatusCode::UNAUTHORIZED,
        error_code: "invalid_credentials".to_string(),
        message: "Invalid username or password".to_string(),
    }
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    cache: Arc<dyn CacheStore>,
    jwt: JwtManager,
    metrics: Option<ThesisMetrics>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        cache: Arc<dyn CacheStore>,
        jwt: JwtManager,
        metrics: Option<ThesisMetrics>,
    ) -> Self {
        Self {
            users,
            cache,
            jwt,
            metrics,
        }
    }

    pub fn jwt(&self) -> &JwtManager {
        &self.jwt
    }

    /// Captchas live only in the cache, so an unreachable cache is a 503 here
    pub async fn issue_captcha(&self) -> Result<CaptchaChallenge, ServiceError> {
        let captcha_id = Uuid::new_v4().to_string();
        let code = generate_captcha_code();

        self.cache
            .set(&captcha_key(&captcha_id), code.clone().into_bytes(), CAPTCHA_TTL_SECONDS)
            .await?;

        Ok(CaptchaChallenge {
            captcha_id,
            code,
            expires_in: CAPTCHA_TTL_SECONDS,
        })
    }

    /// Single use: the challenge is gone after any attempt, right or wrong
    pub async fn verify_captcha(&self, captcha_id: &str, code: &str) -> Result<(), ServiceError> {
        let key = captcha_key(captcha_id);
        let stored = self.cache.get(&key).await?;
        self.cache.delete(&key).await?;

        let matches = stored
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .map(|expected| expected.eq_ignore_ascii_case(code.trim()))
            .unwrap_or(false);

        if !matches {
            return Err(ServiceError::ValidationError(
                "captcha is invalid or expired".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse, ServiceError> {
        self.verify_captcha(&req.captcha_id, &req.captcha_code).await?;

        let username = req.username.trim();
        let fail_key = failed_login_key(username);
        if self.failed_attempts(&fail_key).await >= MAX_FAILED_LOGINS {
            self.record_login("locked");
            tracing::warn!(username = %username, "Login refused, account locked");
            return Err(ServiceError::Custom {
                status_code: StatusCode::LOCKED,
                error_code: "account_locked".to_string(),
                message: "Too many failed logins, try again later".to_string(),
            });
        }

        let user = match self.users.find_by_username(username).await? {
            Some(user) if verify_password(&req.password, &user.salt, &user.password_hash) => user,
            _ => {
                self.count_failure(&fail_key).await;
                self.record_login("invalid_credentials");
                tracing::warn!(username = %username, "Login failed");
                return Err(invalid_credentials());
            }
        };

        if !user.enabled {
            self.record_login("disabled");
            return Err(ServiceError::Custom {
                status_code: StatusCode::FORBIDDEN,
                error_code: "account_disabled".to_string(),
                message: "Account is disabled".to_string(),
            });
        }

        if let Err(e) = self.cache.delete(&fail_key).await {
            tracing::warn!(username = %username, error = %e, "Could not clear failed login counter");
        }

        let (token, claims) = self.jwt.create_token(user.id, &user.username, user.role)?;
        self.store_session(&claims).await;

        self.record_login("success");
        tracing::info!(user_id = user.id, role = %user.role, "User logged in");

        Ok(LoginResponse {
            token: TokenResponse::bearer(token, claims.remaining_seconds()),
            user: UserProfile::from(user),
        })
    }

    /// Revoking needs the session store, so an unreachable cache is a 503
    pub async fn logout(&self, claims: &Claims) -> Result<(), ServiceError> {
        let user_id = claims.user_id()?;
        self.cache.delete(&session_key(user_id)).await?;

        tracing::info!(user_id = user_id, "User logged out");
        Ok(())
    }

    /// Swap a live token for a new one; the old session id stops working
    pub async fn refresh(&self, token: &str) -> Result<TokenResponse, ServiceError> {
        let current = self.jwt.verify_token(token)?;
        check_session(self.cache.as_ref(), &current).await?;

        let (token, claims) = self.jwt.refresh_token(token)?;
        self.store_session(&claims).await;

        Ok(TokenResponse::bearer(token, claims.remaining_seconds()))
    }

    async fn store_session(&self, claims: &Claims) {
        let Ok(user_id) = claims.user_id() else {
            return;
        };
        if let Err(e) = self
            .cache
            .set(
                &session_key(user_id),
                claims.jti.clone().into_bytes(),
                claims.remaining_seconds(),
            )
            .await
        {
            tracing::warn!(user_id = user_id, error = %e, "Could not store session");
        }
    }

    /// Zero when the counter is missing or the cache is down
    async fn failed_attempts(&self, key: &str) -> i64 {
        match self.cache.get(key).await {
            Ok(Some(bytes)) => std::str::from_utf8(&bytes)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            Ok(None) => 0,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read failed login counter");
                0
            }
        }
    }

    async fn count_failure(&self, key: &str) {
        if let Err(e) = self.cache.incr(key, LOCKOUT_SECONDS).await {
            tracing::warn!(error = %e, "Could not count failed login");
        }
    }

    fn record_login(&self, result: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.logins_total.with_label_values(&[result]).inc();
        }
    }
}

/// The token's session id must be the one stored for its user. When the
/// session store cannot answer, a valid JWT is accepted on its own.
pub async fn check_session(cache: &dyn CacheStore, claims: &Claims) -> Result<(), AuthError> {
    let user_id = claims.user_id()?;
    match cache.get(&session_key(user_id)).await {
        Ok(Some(stored)) if stored == claims.jti.as_bytes() => Ok(()),
        Ok(_) => Err(AuthError::SessionRevoked),
        Err(e) => {
            tracing::warn!(user_id = user_id, error = %e, "Session store unreachable, trusting token");
            Ok(())
        }
    }
}
