//! Email/password authentication providers

use super::UserSession;
use crate::error::{PantryError, Result};
use anyhow::Context;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Shortest password accepted at sign-up
pub const MIN_PASSWORD_LEN: usize = 6;

/// Identity backend used by the session manager
///
/// Failures are returned as [`PantryError::Auth`] carrying a message meant
/// for the user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Authenticate an existing account
    async fn sign_in(&self, email: &str, password: &str) -> Result<UserSession>;

    /// Create an account and sign it in
    async fn sign_up(&self, email: &str, password: &str) -> Result<UserSession>;
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"))
}

/// Check an email address for the `local@domain.tld` shape
///
/// # Examples
///
/// ```
/// use pantrygenie::session::auth::is_valid_email;
///
/// assert!(is_valid_email("cook@example.com"));
/// assert!(!is_valid_email("cook@localhost"));
/// assert!(!is_valid_email("not an email"));
/// ```
pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

/// Accounts stored in SQLite with Argon2id password hashes
pub struct LocalAuthProvider {
    db_path: PathBuf,
}

impl LocalAuthProvider {
    /// Create a provider using the specified database path
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(|e| PantryError::Storage(format!("{:#}", e)))?;
        }

        let provider = Self { db_path };
        provider.init()?;
        Ok(provider)
    }

    fn init(&self) -> Result<()> {
        let conn = self.open()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create tables")
        .map_err(|e| PantryError::Storage(format!("{:#}", e)))?;
        Ok(())
    }

    fn open(&self) -> Result<Connection> {
        Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(|e| PantryError::Storage(format!("{:#}", e)).into())
    }

    fn sign_in_blocking(&self, email: &str, password: &str) -> Result<UserSession> {
        let conn = self.open()?;
        let account: Option<(String, String, String)> = conn
            .query_row(
                "SELECT id, email, password_hash FROM users WHERE email = ?1",
                params![email],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .context("Failed to query account")
            .map_err(|e| PantryError::Storage(format!("{:#}", e)))?;

        let Some((user_id, stored_email, password_hash)) = account else {
            tracing::debug!(email = %email, "Sign-in for unknown account");
            return Err(invalid_credentials());
        };

        verify_password(password, &password_hash)?;
        Ok(UserSession::new(user_id, stored_email))
    }

    fn sign_up_blocking(&self, email: &str, password: &str) -> Result<UserSession> {
        if !is_valid_email(email) {
            return Err(PantryError::Auth("The email address is badly formatted.".to_string()).into());
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(PantryError::Auth(format!(
                "Password should be at least {} characters",
                MIN_PASSWORD_LEN
            ))
            .into());
        }

        let password_hash = hash_password(password)?;
        let user_id = uuid::Uuid::new_v4().to_string();

        let conn = self.open()?;
        let inserted = conn.execute(
            "INSERT INTO users (id, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![user_id, email, password_hash, Utc::now().to_rfc3339()],
        );

        match inserted {
            Ok(_) => Ok(UserSession::new(user_id, email.to_string())),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(PantryError::Auth(
                    "The email address is already in use by another account.".to_string(),
                )
                .into())
            }
            Err(e) => Err(PantryError::Storage(format!("Failed to create account: {}", e)).into()),
        }
    }
}

#[async_trait]
impl AuthProvider for LocalAuthProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<UserSession> {
        let provider = Self {
            db_path: self.db_path.clone(),
        };
        let (email, password) = (email.trim().to_string(), password.to_string());
        tokio::task::spawn_blocking(move || provider.sign_in_blocking(&email, &password))
            .await
            .map_err(|e| PantryError::Auth(format!("Sign-in task failed: {}", e)))?
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<UserSession> {
        let provider = Self {
            db_path: self.db_path.clone(),
        };
        let (email, password) = (email.trim().to_string(), password.to_string());
        tokio::task::spawn_blocking(move || provider.sign_up_blocking(&email, &password))
            .await
            .map_err(|e| PantryError::Auth(format!("Sign-up task failed: {}", e)))?
    }
}

fn invalid_credentials() -> anyhow::Error {
    PantryError::Auth("Invalid email or password.".to_string()).into()
}

/// Hash a password with Argon2id and a random salt
fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PantryError::Auth(format!("Argon2 password hashing failed: {e}")))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, password_hash: &str) -> Result<()> {
    let parsed = PasswordHash::new(password_hash).map_err(|e| {
        tracing::error!("Failed to parse stored password hash: {}", e);
        invalid_credentials()
    })?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| invalid_credentials())
}
