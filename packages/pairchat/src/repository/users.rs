//! Account store: argon2-hashed credentials and the user directory.
//!
//! The messaging side never reads these tables; user ids are opaque keys
//! to the message store.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::Row;

use super::ChatRepository;
use crate::error::{ChatError, Result};
use crate::models::{RegisterRequest, User, UserInfo};

/// Hash a password with Argon2id and a random salt.
fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a stored Argon2id hash.
fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn row_to_user(r: &sqlx::sqlite::SqliteRow) -> User {
    User {
        id: r.get("id"),
        username: r.get("username"),
        email: r.get("email"),
        display_name: r.get("display_name"),
        password_hash: r.get("password_hash"),
        created_at: r.get("created_at"),
    }
}

impl ChatRepository {
    /// Create an account. The username doubles as the display name.
    pub async fn register_user(&self, req: &RegisterRequest) -> Result<User> {
        let username = req.username.trim();
        let email = req.email.trim().to_lowercase();
        if username.is_empty() || email.is_empty() || req.password.is_empty() {
            return Err(ChatError::BadRequest(
                "username, email and password are required".into(),
            ));
        }

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            email,
            display_name: username.to_string(),
            password_hash: hash_password(&req.password)?,
            created_at: chrono::Utc::now().timestamp(),
        };

        let result = sqlx::query(
            "INSERT INTO users (id, username, email, display_name, password_hash, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(user),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(ChatError::Conflict(
                "username or email already registered".into(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, username, email, display_name, password_hash, created_at
             FROM users WHERE email = ?",
        )
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(row_to_user))
    }

    /// Check credentials. Unknown email is `NotFound`; a wrong password is
    /// `InvalidCredentials`.
    pub async fn verify_login(&self, email: &str, password: &str) -> Result<User> {
        let user = self
            .get_user_by_email(email)
            .await?
            .ok_or_else(|| ChatError::NotFound("user".into()))?;
        if verify_password(password, &user.password_hash)? {
            Ok(user)
        } else {
            Err(ChatError::InvalidCredentials)
        }
    }

    /// Everyone except `viewer_id`, ordered by display name.
    pub async fn list_other_users(&self, viewer_id: &str) -> Result<Vec<UserInfo>> {
        let rows = sqlx::query(
            "SELECT id, display_name FROM users WHERE id != ? ORDER BY display_name, id",
        )
        .bind(viewer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| UserInfo {
                id: r.get("id"),
                display_name: r.get("display_name"),
            })
            .collect())
    }
}
