// Authentication service - business logic layer

use chrono::{Duration, Utc};

use crate::auth::{
    error::AuthError,
    models::{AuthResponse, UserResponse},
    password::PasswordService,
    repository::{TokenRepository, UserRepository},
    token::TokenService,
};

/// Authentication service coordinating all auth operations
pub struct AuthService {
    user_repo: UserRepository,
    token_repo: TokenRepository,
    token_service: TokenService,
}

impl AuthService {
    /// Create a new AuthService
    pub fn new(
        user_repo: UserRepository,
        token_repo: TokenRepository,
        token_service: TokenService,
    ) -> Self {
        Self {
            user_repo,
            token_repo,
            token_service,
        }
    }

    /// Register a new user
    pub async fn register(&self, email: &str, password: &str) -> Result<AuthResponse, AuthError> {
        PasswordService::validate_password_strength(password)?;

        if self.user_repo.email_exists(email).await? {
            return Err(AuthError::EmailAlreadyExists);
        }

        let password_hash = PasswordService::hash_password(password)?;
        let user = self.user_repo.create_user(email, &password_hash).await?;

        tracing::info!("Registered user {} ({})", user.email, user.id);
        self.issue_tokens(user).await
    }

    /// Login a user
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AuthError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !PasswordService::verify_password(password, &user.password_hash)? {
            tracing::warn!("Failed login attempt for {}", email);
            return Err(AuthError::InvalidCredentials);
        }

        tracing::info!("User {} logged in", user.id);
        self.issue_tokens(user).await
    }

    /// Rotate a refresh token into a new token pair
    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<AuthResponse, AuthError> {
        // Signature/expiry check first, then the stored-hash check so a
        // token deleted on logout cannot be replayed
        let claims = self.token_service.validate_refresh_token(refresh_token)?;

        let stored = self
            .token_repo
            .verify_refresh_token(refresh_token)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if stored.user_id != claims.sub {
            return Err(AuthError::InvalidToken);
        }

        let user = self
            .user_repo
            .find_by_id(claims.sub)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        self.token_repo.invalidate_token(refresh_token).await?;
        self.issue_tokens(user).await
    }

    /// Get current user information
    pub async fn get_current_user(&self, user_id: i32) -> Result<UserResponse, AuthError> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;
        Ok(user.into())
    }

    async fn issue_tokens(
        &self,
        user: crate::auth::models::User,
    ) -> Result<AuthResponse, AuthError> {
        let (access_token, refresh_token) =
            self.token_service
                .generate_token_pair(user.id, &user.email, user.role)?;

        let expires_at =
            Utc::now() + Duration::seconds(self.token_service.refresh_token_duration());
        self.token_repo
            .store_refresh_token(user.id, &refresh_token, expires_at)
            .await?;

        Ok(AuthResponse {
            access_token,
            refresh_token,
            user: user.into(),
        })
    }
}
