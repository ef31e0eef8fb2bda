//! User accounts and credential verification.
//!
//! Accounts are persisted as JSON to `{data_dir}/users.json`. Passwords are
//! stored as PBKDF2-HMAC-SHA256 digests with a per-user random salt, encoded
//! as `hex(salt)$hex(digest)`.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tokio::fs;
use tokio::sync::RwLock;
use uuid::Uuid;

const PBKDF2_ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;

/// Errors produced by the user store.
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("validation failed: {0}")]
    Validation(String),
    /// An account with this email already exists.
    #[error("email already registered")]
    EmailTaken,
    /// Unknown email or wrong password. One variant for both so that login
    /// attempts cannot enumerate registered addresses.
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// A registered user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Store for user accounts with disk persistence.
#[derive(Debug)]
pub struct UserStore {
    users: RwLock<HashMap<Uuid, User>>,
    storage_path: PathBuf,
}

impl UserStore {
    /// Open the store, loading any existing accounts from disk.
    pub async fn new(data_dir: &PathBuf) -> Result<Self, UserError> {
        let storage_path = data_dir.join("users.json");

        let mut users = HashMap::new();
        if storage_path.exists() {
            let contents = fs::read_to_string(&storage_path).await?;
            let loaded: Vec<User> = serde_json::from_str(&contents)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            tracing::info!("Loaded {} users from {}", loaded.len(), storage_path.display());
            for user in loaded {
                users.insert(user.id, user);
            }
        }

        Ok(Self {
            users: RwLock::new(users),
            storage_path,
        })
    }

    async fn save_to_disk(&self, users: &HashMap<Uuid, User>) -> Result<(), UserError> {
        if let Some(parent) = self.storage_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let all: Vec<&User> = users.values().collect();
        let contents = serde_json::to_string_pretty(&all)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(&self.storage_path, contents).await?;
        Ok(())
    }

    /// Register a new account. Email is trimmed and lowercased before the
    /// duplicate check so `Bob@x` and `bob@x` are the same account.
    pub async fn register(&self, email: &str, password: &str) -> Result<User, UserError> {
        let email = normalize_email(email)?;
        if password.len() < 8 {
            return Err(UserError::Validation(
                "password must be at least 8 characters".to_string(),
            ));
        }

        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == email) {
            return Err(UserError::EmailTaken);
        }

        let user = User {
            id: Uuid::new_v4(),
            email,
            password_hash: hash_password(password),
            created_at: Utc::now(),
        };
        users.insert(user.id, user.clone());
        self.save_to_disk(&users).await?;

        Ok(user)
    }

    /// Verify credentials, returning the matching account.
    pub async fn verify(&self, email: &str, password: &str) -> Result<User, UserError> {
        let email = normalize_email(email).map_err(|_| UserError::InvalidCredentials)?;

        let users = self.users.read().await;
        let user = users.values().find(|u| u.email == email);

        match user {
            Some(user) if verify_password(password, &user.password_hash) => Ok(user.clone()),
            Some(_) => Err(UserError::InvalidCredentials),
            None => {
                // Burn a hash anyway so unknown emails take as long as wrong
                // passwords.
                let _ = verify_password(password, &hash_password("timing-dummy"));
                Err(UserError::InvalidCredentials)
            }
        }
    }

    /// Look up an account by id. Used to confirm a token subject still exists.
    pub async fn get(&self, id: Uuid) -> Option<User> {
        self.users.read().await.get(&id).cloned()
    }
}

fn normalize_email(email: &str) -> Result<String, UserError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(UserError::Validation("a valid email is required".to_string()));
    }
    Ok(email)
}

fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);

    let mut digest = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut digest);

    format!("{}${}", hex::encode(salt), hex::encode(digest))
}

fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, digest_hex)) = stored.split_once('$') else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    let Ok(expected) = hex::decode(digest_hex) else {
        return false;
    };

    let mut digest = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut digest);

    constant_time_eq(&digest, &expected)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
