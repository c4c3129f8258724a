//! User service.

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
};
use foodgram_common::{
    AppError, AppResult, IdGenerator, StorageBackend, decode_data_url, generate_storage_key,
};
use foodgram_db::{
    entities::user,
    repositories::{FollowRepository, UserRepository},
};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

#[allow(clippy::unwrap_used)]
static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w.@+-]+$").unwrap());

/// Usernames that would shadow `/users/...` routes.
const RESERVED_USERNAMES: &[&str] = &["me", "subscriptions"];

/// Storage prefix for avatars.
const AVATAR_PREFIX: &str = "users/avatars";

/// Input for registering a new user.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUserInput {
    #[validate(email, length(max = 254))]
    pub email: String,

    #[validate(
        length(min = 1, max = 150),
        regex(path = *USERNAME_RE, message = "Username may contain only letters, digits and @/./+/-/_")
    )]
    pub username: String,

    #[validate(length(min = 1, max = 150))]
    pub first_name: String,

    #[validate(length(min = 1, max = 150))]
    pub last_name: String,

    #[validate(length(min = 1, max = 150))]
    pub password: String,
}

/// A user as seen by a particular viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserView {
    pub user: user::Model,
    /// Whether the viewer follows this user.
    pub is_subscribed: bool,
}

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    follow_repo: FollowRepository,
    storage: Arc<dyn StorageBackend>,
    id_gen: IdGenerator,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub fn new(
        user_repo: UserRepository,
        follow_repo: FollowRepository,
        storage: Arc<dyn StorageBackend>,
    ) -> Self {
        Self {
            user_repo,
            follow_repo,
            storage,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a new user with a fresh access token.
    pub async fn create(&self, input: CreateUserInput) -> AppResult<user::Model> {
        input.validate()?;

        if RESERVED_USERNAMES.contains(&input.username.as_str()) {
            return Err(AppError::Validation(format!(
                "Username \"{}\" is not allowed.",
                input.username
            )));
        }

        if let Some(existing) = self
            .user_repo
            .find_by_username_or_email(&input.username, &input.email)
            .await?
        {
            let field = if existing.username == input.username {
                "username"
            } else {
                "email"
            };
            return Err(AppError::Conflict(format!(
                "A user with that {field} already exists."
            )));
        }

        let password_hash = hash_password(&input.password)?;
        let token = self.id_gen.generate_token();

        let model = user::ActiveModel {
            email: Set(input.email),
            username: Set(input.username),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            password: Set(password_hash),
            avatar: Set(None),
            token: Set(Some(token)),
            created_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };

        let user = self.user_repo.create(model).await?;
        tracing::info!(user_id = user.id, username = %user.username, "Registered user");
        Ok(user)
    }

    /// Get a user by ID.
    pub async fn get(&self, id: i32) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }

    /// Resolve an access token to its user.
    pub async fn authenticate(&self, token: &str) -> AppResult<Option<user::Model>> {
        if token.is_empty() {
            return Ok(None);
        }
        self.user_repo.find_by_token(token).await
    }

    /// One page of users with the total count.
    pub async fn list(&self, offset: u64, limit: u64) -> AppResult<(Vec<user::Model>, u64)> {
        self.user_repo.list(offset, limit).await
    }

    /// Attach `is_subscribed` for `viewer_id` to each user.
    pub async fn views(
        &self,
        viewer_id: Option<i32>,
        users: Vec<user::Model>,
    ) -> AppResult<Vec<UserView>> {
        let followed = match viewer_id {
            Some(viewer_id) => {
                let ids: Vec<i32> = users.iter().map(|u| u.id).collect();
                self.follow_repo.followed_among(viewer_id, &ids).await?
            }
            None => std::collections::HashSet::new(),
        };

        Ok(users
            .into_iter()
            .map(|user| UserView {
                is_subscribed: followed.contains(&user.id),
                user,
            })
            .collect())
    }

    /// Single-user form of [`Self::views`].
    pub async fn view(&self, viewer_id: Option<i32>, user: user::Model) -> AppResult<UserView> {
        let is_subscribed = match viewer_id {
            Some(viewer_id) if viewer_id != user.id => {
                self.follow_repo.is_following(viewer_id, user.id).await?
            }
            _ => false,
        };
        Ok(UserView {
            user,
            is_subscribed,
        })
    }

    /// Replace the avatar from a base64 data URL.
    pub async fn set_avatar(&self, user: user::Model, data_url: &str) -> AppResult<user::Model> {
        let image = decode_data_url(data_url)?;
        let key = generate_storage_key(AVATAR_PREFIX, &image.extension);
        self.storage
            .upload(&key, &image.data, &image.content_type)
            .await?;

        let previous = user.avatar.clone();
        let mut model: user::ActiveModel = user.into();
        model.avatar = Set(Some(key.clone()));
        let updated = match self.user_repo.update(model).await {
            Ok(updated) => updated,
            Err(e) => {
                self.remove_file(&key).await;
                return Err(e);
            }
        };

        if let Some(old) = previous {
            self.remove_file(&old).await;
        }
        Ok(updated)
    }

    /// Clear the avatar.
    pub async fn delete_avatar(&self, user: user::Model) -> AppResult<()> {
        let Some(old) = user.avatar.clone() else {
            return Ok(());
        };

        let mut model: user::ActiveModel = user.into();
        model.avatar = Set(None);
        self.user_repo.update(model).await?;

        self.remove_file(&old).await;
        Ok(())
    }

    async fn remove_file(&self, key: &str) {
        if let Err(e) = self.storage.delete(key).await {
            tracing::warn!(key = %key, error = %e, "Failed to delete avatar file");
        }
    }
}

/// Hash a password using Argon2.
pub(crate) fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}
