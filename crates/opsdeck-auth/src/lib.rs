use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use thiserror::Error;
use tracing::debug;

use opsdeck_db::Database;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("username already registered")]
    DuplicateUser,
    #[error("user not found")]
    UserNotFound,
    #[error("password mismatch")]
    BadPassword,
    #[error("password hashing failed: {0}")]
    Hash(argon2::password_hash::Error),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Successful verification. Carries the stored role so the caller can attach
/// it to whatever session context it maintains.
#[derive(Debug, Clone)]
pub struct Verified {
    pub username: String,
    pub role: String,
}

/// Persists `(username, password_hash, role)` tuples and answers whether a
/// plaintext password matches a username's stored hash. Hashing is Argon2id
/// with a per-call random salt; plaintext is never stored and never compared
/// directly.
#[derive(Clone)]
pub struct CredentialStore {
    db: Arc<Database>,
    decoy_hash: String,
}

impl CredentialStore {
    pub fn new(db: Arc<Database>) -> Result<Self, CredentialError> {
        // Hashed once at startup, verified against on unknown-username lookups
        // so a miss costs the same as a wrong password.
        let salt = SaltString::generate(&mut OsRng);
        let decoy_hash = Argon2::default()
            .hash_password(b"decoy", &salt)
            .map_err(CredentialError::Hash)?
            .to_string();

        Ok(Self { db, decoy_hash })
    }

    /// Hash `password` with a fresh salt and persist the record. Fails with
    /// `DuplicateUser` when the username is already taken; the UNIQUE
    /// constraint makes this safe against two racing registrations, and the
    /// existing record is never overwritten.
    pub fn register(
        &self,
        username: &str,
        password: &str,
        role: &str,
    ) -> Result<(), CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(CredentialError::Hash)?
            .to_string();

        match self.db.insert_user(username, &password_hash, role) {
            Ok(()) => {
                debug!(username, role, "user registered");
                Ok(())
            }
            Err(e) if is_unique_violation(&e) => Err(CredentialError::DuplicateUser),
            Err(e) => Err(CredentialError::Store(e)),
        }
    }

    /// Check `password` against the stored hash for `username`. Read-only.
    /// `UserNotFound` and `BadPassword` stay distinct here for audit logging;
    /// callers facing an external actor must collapse them into one signal.
    pub fn verify(&self, username: &str, password: &str) -> Result<Verified, CredentialError> {
        let Some(row) = self.db.get_user_by_username(username)? else {
            // Burn a comparable amount of hashing work before reporting the
            // miss, so the two failure modes are not trivially told apart by
            // response time.
            if let Ok(decoy) = PasswordHash::new(&self.decoy_hash) {
                let _ = Argon2::default().verify_password(password.as_bytes(), &decoy);
            }
            return Err(CredentialError::UserNotFound);
        };

        let parsed = PasswordHash::new(&row.password_hash).map_err(CredentialError::Hash)?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(Verified {
                username: row.username,
                role: row.role,
            }),
            Err(argon2::password_hash::Error::Password) => Err(CredentialError::BadPassword),
            Err(e) => Err(CredentialError::Hash(e)),
        }
    }
}

fn is_unique_violation(e: &anyhow::Error) -> bool {
    matches!(
        e.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(f, _))
            if f.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CredentialStore {
        let db = Arc::new(Database::open_in_memory().unwrap());
        CredentialStore::new(db).unwrap()
    }

    #[test]
    fn register_then_verify() {
        let store = store();
        store.register("alice", "Secret123", "analyst").unwrap();

        let verified = store.verify("alice", "Secret123").unwrap();
        assert_eq!(verified.username, "alice");
        assert_eq!(verified.role, "analyst");
    }

    #[test]
    fn wrong_password_is_rejected() {
        let store = store();
        store.register("alice", "Secret123", "analyst").unwrap();

        let err = store.verify("alice", "wrong").unwrap_err();
        assert!(matches!(err, CredentialError::BadPassword));
    }

    #[test]
    fn duplicate_register_keeps_original_record() {
        let store = store();
        store.register("alice", "Secret123", "analyst").unwrap();
        let original = store.db.get_user_by_username("alice").unwrap().unwrap();

        let err = store.register("alice", "Other456", "it_admin").unwrap_err();
        assert!(matches!(err, CredentialError::DuplicateUser));

        let after = store.db.get_user_by_username("alice").unwrap().unwrap();
        assert_eq!(after.password_hash, original.password_hash);
        assert_eq!(after.role, "analyst");

        // The original password still works
        store.verify("alice", "Secret123").unwrap();
    }

    #[test]
    fn unknown_user_fails_without_mutation() {
        let store = store();

        let err = store.verify("nobody", "whatever").unwrap_err();
        assert!(matches!(err, CredentialError::UserNotFound));

        assert!(store.db.get_user_by_username("nobody").unwrap().is_none());
    }

    #[test]
    fn same_password_hashes_differently_per_user() {
        let store = store();
        store.register("alice", "Shared123", "analyst").unwrap();
        store.register("bob", "Shared123", "it_admin").unwrap();

        let alice = store.db.get_user_by_username("alice").unwrap().unwrap();
        let bob = store.db.get_user_by_username("bob").unwrap().unwrap();
        assert_ne!(alice.password_hash, bob.password_hash);

        assert_eq!(store.verify("alice", "Shared123").unwrap().role, "analyst");
        assert_eq!(store.verify("bob", "Shared123").unwrap().role, "it_admin");
    }

    #[test]
    fn plaintext_never_stored() {
        let store = store();
        store.register("alice", "Secret123", "analyst").unwrap();

        let row = store.db.get_user_by_username("alice").unwrap().unwrap();
        assert!(!row.password_hash.contains("Secret123"));
        assert!(row.password_hash.starts_with("$argon2"));
    }
}
