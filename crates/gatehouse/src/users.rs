//! User directory: the credential collaborator behind the login path.
//!
//! Deliberately thin. The defense core only needs something real to decide
//! about: a phone-keyed record with a salted one-way password hash.

use hearth_common::constants::redis_keys;
use hearth_common::{GateError, UserProfile};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

/// Stored user row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub phone: String,
    pub nickname: Option<String>,
    /// Argon2id PHC string
    pub password_hash: String,
    /// Unix epoch seconds
    pub created_at: i64,
}

impl UserRecord {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            phone: self.phone.clone(),
            nickname: self.nickname.clone(),
            created_at: self.created_at,
        }
    }
}

/// User directory service
#[derive(Default)]
pub struct UserDirectory;

impl UserDirectory {
    pub fn new() -> Self {
        Self
    }

    /// Create a user; refuses an already-registered phone.
    pub async fn create(
        &self,
        redis: &mut redis::aio::ConnectionManager,
        phone: &str,
        password: &str,
        nickname: Option<String>,
    ) -> Result<UserRecord, GateError> {
        if self.find_by_phone(redis, phone).await?.is_some() {
            return Err(GateError::InvalidInput(
                "Phone number already registered".to_string(),
            ));
        }

        let record = UserRecord {
            id: Uuid::new_v4().to_string(),
            phone: phone.to_string(),
            nickname,
            password_hash: hash_password(password)?,
            created_at: chrono::Utc::now().timestamp(),
        };

        self.store(redis, &record).await?;

        tracing::info!(user_id = %record.id, "User registered");

        Ok(record)
    }

    pub async fn find_by_phone(
        &self,
        redis: &mut redis::aio::ConnectionManager,
        phone: &str,
    ) -> Result<Option<UserRecord>, GateError> {
        let key = format!("{}{}", redis_keys::USER_PHONE_PREFIX, phone);
        let raw: Option<String> = redis.get(&key).await.map_err(storage_err)?;
        match raw {
            Some(raw) => {
                let record = serde_json::from_str(&raw)
                    .map_err(|err| GateError::Internal(format!("Corrupt user record: {err}")))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    pub async fn find_by_id(
        &self,
        redis: &mut redis::aio::ConnectionManager,
        user_id: &str,
    ) -> Result<Option<UserRecord>, GateError> {
        let key = format!("{}{}", redis_keys::USER_ID_PREFIX, user_id);
        let phone: Option<String> = redis.get(&key).await.map_err(storage_err)?;
        match phone {
            Some(phone) => self.find_by_phone(redis, &phone).await,
            None => Ok(None),
        }
    }

    /// Compare a candidate password against the stored hash.
    pub fn verify_password(&self, record: &UserRecord, password: &str) -> bool {
        PasswordHash::new(&record.password_hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }

    /// Replace the stored password hash.
    pub async fn change_password(
        &self,
        redis: &mut redis::aio::ConnectionManager,
        record: &UserRecord,
        new_password: &str,
    ) -> Result<(), GateError> {
        let mut updated = record.clone();
        updated.password_hash = hash_password(new_password)?;
        self.store(redis, &updated).await?;

        tracing::info!(user_id = %record.id, "Password updated");

        Ok(())
    }

    async fn store(
        &self,
        redis: &mut redis::aio::ConnectionManager,
        record: &UserRecord,
    ) -> Result<(), GateError> {
        let value = serde_json::to_string(record)
            .map_err(|err| GateError::Internal(err.to_string()))?;

        let phone_key = format!("{}{}", redis_keys::USER_PHONE_PREFIX, record.phone);
        let id_key = format!("{}{}", redis_keys::USER_ID_PREFIX, record.id);

        redis
            .set::<_, _, ()>(&phone_key, &value)
            .await
            .map_err(storage_err)?;
        redis
            .set::<_, _, ()>(&id_key, &record.phone)
            .await
            .map_err(storage_err)?;

        Ok(())
    }
}

fn hash_password(password: &str) -> Result<String, GateError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| GateError::Internal(format!("Failed to hash password: {err}")))
}

fn storage_err(err: redis::RedisError) -> GateError {
    GateError::Storage(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_redis, unique};

    #[tokio::test]
    async fn create_then_find_and_verify() {
        let Some(mut redis) = test_redis().await else {
            return;
        };
        let users = UserDirectory::new();
        let phone = unique("138");

        let created = users
            .create(&mut redis, &phone, "hunter2-but-longer", Some("Mo".to_string()))
            .await
            .unwrap();

        let by_phone = users
            .find_by_phone(&mut redis, &phone)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_phone.id, created.id);

        let by_id = users
            .find_by_id(&mut redis, &created.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_id.phone, phone);

        assert!(users.verify_password(&by_phone, "hunter2-but-longer"));
        assert!(!users.verify_password(&by_phone, "wrong-password"));
        // The stored hash is salted, never the raw password
        assert!(!by_phone.password_hash.contains("hunter2"));
    }

    #[tokio::test]
    async fn duplicate_phone_is_refused() {
        let Some(mut redis) = test_redis().await else {
            return;
        };
        let users = UserDirectory::new();
        let phone = unique("138");

        users
            .create(&mut redis, &phone, "first-password", None)
            .await
            .unwrap();
        let err = users
            .create(&mut redis, &phone, "second-password", None)
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn change_password_invalidates_the_old_one() {
        let Some(mut redis) = test_redis().await else {
            return;
        };
        let users = UserDirectory::new();
        let phone = unique("138");

        let record = users
            .create(&mut redis, &phone, "old-password", None)
            .await
            .unwrap();
        users
            .change_password(&mut redis, &record, "new-password")
            .await
            .unwrap();

        let reloaded = users
            .find_by_phone(&mut redis, &phone)
            .await
            .unwrap()
            .unwrap();
        assert!(!users.verify_password(&reloaded, "old-password"));
        assert!(users.verify_password(&reloaded, "new-password"));
    }
}
