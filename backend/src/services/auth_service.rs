//! Authentication service.
//!
//! Handles password hashing, credential checks and JWT access tokens. The
//! rest of the crate only ever sees the resulting [`Principal`].

use std::sync::Arc;

use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::role::Role;
use crate::models::user::{Principal, User};
use crate::storage::UserStore;

const ACCESS_TOKEN_TYPE: &str = "access";

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Username
    pub username: String,
    /// Role at the time the token was issued
    pub role: Role,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Token type, always "access" for now
    pub token_type: String,
}

impl Claims {
    pub fn principal(&self) -> Principal {
        Principal::new(self.sub.clone(), self.role)
    }
}

/// Token response
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub token_type: String,
    /// Lifetime of the access token in seconds
    pub expires_in: u64,
}

/// Authentication service
pub struct AuthService {
    users: Arc<dyn UserStore>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expiry_minutes: i64,
    bcrypt_cost: u32,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(users: Arc<dyn UserStore>, config: &Config) -> Self {
        let secret = config.jwt_secret.as_bytes();
        Self {
            users,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_token_expiry_minutes: config.jwt_access_token_expiry_minutes,
            bcrypt_cost: config.bcrypt_cost,
        }
    }

    /// Authenticate user with username and password
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<(User, TokenPair)> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid username or password".to_string()))?;

        if !self.verify_password(password, &user.password_hash)? {
            tracing::info!(username, "Login failed: wrong password");
            return Err(AppError::Authentication(
                "Invalid username or password".to_string(),
            ));
        }

        let tokens = self.generate_token(&user)?;
        tracing::info!(user_id = %user.id, role = %user.role, "User logged in");
        Ok((user, tokens))
    }

    /// Issue an access token for a user
    pub fn generate_token(&self, user: &User) -> Result<TokenPair> {
        let now = Utc::now();
        let exp = now + Duration::minutes(self.access_token_expiry_minutes);

        let claims = Claims {
            sub: user.id.clone(),
            username: user.username.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            token_type: ACCESS_TOKEN_TYPE.to_string(),
        };

        let access_token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token encoding failed: {}", e)))?;

        Ok(TokenPair {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: (self.access_token_expiry_minutes.max(0) as u64) * 60,
        })
    }

    /// Validate an access token and return its claims
    pub fn validate_access_token(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())?;
        if data.claims.token_type != ACCESS_TOKEN_TYPE {
            return Err(AppError::Authentication("Invalid token type".to_string()));
        }
        Ok(data.claims)
    }

    /// Hash a password with the configured bcrypt cost
    pub fn hash_password(&self, password: &str) -> Result<String> {
        hash(password, self.bcrypt_cost)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }

    pub fn verify_password(&self, password: &str, password_hash: &str) -> Result<bool> {
        verify(password, password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
    }
}
