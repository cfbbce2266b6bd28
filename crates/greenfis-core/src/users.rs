//! # Users
//!
//! Staff accounts, roles and password verification.
//!
//! Passwords are never stored. Each account keeps a BLAKE3 derived-key hash
//! salted with the (lowercased) username, and verification compares hashes in
//! constant time.

use crate::closing::CashClosing;
use crate::pos::Sale;
use crate::primitives::{
    MAX_NAME_LEN, MAX_PASSWORD_LEN, MIN_PASSWORD_LEN, Timestamp, required_text,
};
use crate::restock::RestockRequest;
use crate::storage::{Record, Store, TxRead, tables, tx_insert, tx_remove, tx_save};
use crate::transfer::Transfer;
use crate::{Result, StoreError};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

const PASSWORD_CONTEXT: &str = "greenfis 2026-01-01 user password v2";
const HASH_ROUNDS: u32 = 4096;

// =============================================================================
// TYPES
// =============================================================================

/// What a staff member is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Cashier,
    Stocker,
}

impl Role {
    /// Whether this role may ring up sales and close a register.
    #[must_use]
    pub fn can_sell(self) -> bool {
        matches!(self, Self::Admin | Self::Manager | Self::Cashier)
    }
}

/// A stored staff account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    /// Lowercased, unique.
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub password_hash: String,
    pub active: bool,
    pub created_at: Timestamp,
}

impl Record for User {
    const KIND: &'static str = "user";
    const TABLE: redb::TableDefinition<'static, u64, &'static [u8]> = tables::USERS;

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

/// The public face of a [`User`]: everything but the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub active: bool,
    pub created_at: Timestamp,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
            active: user.active,
            created_at: user.created_at,
        }
    }
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self::from(&user)
    }
}

/// Input for [`Store::create_user`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub password: String,
}

/// Partial update for [`Store::update_user`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPatch {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub password: Option<String>,
}

// =============================================================================
// PASSWORDS
// =============================================================================

fn hash_password(username: &str, password: &str) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new_derive_key(PASSWORD_CONTEXT);
    hasher.update(username.as_bytes());
    hasher.update(&[0]);
    hasher.update(password.as_bytes());
    let mut hash = hasher.finalize();
    // Later rounds only see the 32-byte digest, so the cost is flat in the
    // password length.
    let round = blake3::Hasher::new_derive_key(PASSWORD_CONTEXT);
    for _ in 1..HASH_ROUNDS {
        hash = round.clone().update(hash.as_bytes()).finalize();
    }
    hash
}

fn check_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(StoreError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Err(StoreError::validation(format!(
            "password must be at most {MAX_PASSWORD_LEN} bytes"
        )));
    }
    Ok(())
}

fn normalize_username(raw: &str) -> Result<String> {
    let username = raw.trim().to_lowercase();
    if username.is_empty() {
        return Err(StoreError::validation("username is required"));
    }
    if username.chars().count() > MAX_NAME_LEN || username.chars().any(char::is_whitespace) {
        return Err(StoreError::validation(
            "username must be a single word of at most 128 characters",
        ));
    }
    Ok(username)
}

impl User {
    /// Whether `password` matches this account's hash.
    #[must_use]
    pub fn verify_password(&self, password: &str) -> bool {
        let candidate = hash_password(&self.username, password).to_hex();
        candidate
            .as_bytes()
            .ct_eq(self.password_hash.as_bytes())
            .into()
    }
}

// =============================================================================
// OPERATIONS
// =============================================================================

impl Store {
    /// Create a staff account.
    pub fn create_user(&self, input: NewUser, at: Timestamp) -> Result<User> {
        let username = normalize_username(&input.username)?;
        let full_name = required_text("full_name", &input.full_name)?;
        check_password(&input.password)?;

        let txn = self.begin_write()?;
        if txn
            .rows::<User>()?
            .iter()
            .any(|u| u.username == username)
        {
            return Err(StoreError::conflict(format!(
                "username '{username}' is already taken"
            )));
        }

        let password_hash = hash_password(&username, &input.password).to_hex().to_string();
        let user = tx_insert(
            &txn,
            User {
                id: 0,
                username,
                full_name,
                role: input.role,
                password_hash,
                active: true,
                created_at: at,
            },
        )?;
        txn.commit()?;
        Ok(user)
    }

    /// Apply a partial update to an account.
    pub fn update_user(&self, id: u64, patch: UserPatch) -> Result<User> {
        let txn = self.begin_write()?;
        let mut user: User = txn.require(id)?;

        if let Some(full_name) = patch.full_name {
            user.full_name = required_text("full_name", &full_name)?;
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        if let Some(active) = patch.active {
            user.active = active;
        }
        if let Some(password) = patch.password {
            check_password(&password)?;
            user.password_hash = hash_password(&user.username, &password).to_hex().to_string();
        }

        tx_save(&txn, &user)?;
        txn.commit()?;
        Ok(user)
    }

    /// Delete an account that has no history. Accounts with history must be
    /// deactivated instead.
    pub fn delete_user(&self, id: u64) -> Result<()> {
        let txn = self.begin_write()?;
        let _: User = txn.require(id)?;

        let referenced = txn.rows::<Sale>()?.iter().any(|s| s.cashier_id == id)
            || txn.rows::<CashClosing>()?.iter().any(|c| c.cashier_id == id)
            || txn
                .rows::<RestockRequest>()?
                .iter()
                .any(|r| r.requested_by == id)
            || txn.rows::<Transfer>()?.iter().any(|t| t.requested_by == id);
        if referenced {
            return Err(StoreError::conflict(format!(
                "user {id} has recorded activity; deactivate it instead"
            )));
        }

        tx_remove::<User>(&txn, id)?;
        txn.commit()?;
        Ok(())
    }

    /// Look up an account by username (case-insensitive).
    pub fn find_user(&self, username: &str) -> Result<Option<User>> {
        let wanted = username.trim().to_lowercase();
        Ok(self
            .list::<User>()?
            .into_iter()
            .find(|u| u.username == wanted))
    }

    /// Check credentials. Unknown users, wrong passwords and inactive accounts
    /// all produce the same error after the same amount of hashing.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<User> {
        if password.len() > MAX_PASSWORD_LEN {
            return Err(StoreError::InvalidCredentials);
        }
        match self.find_user(username)? {
            Some(user) if user.verify_password(password) && user.active => Ok(user),
            Some(_) => Err(StoreError::InvalidCredentials),
            None => {
                std::hint::black_box(hash_password(username.trim(), password));
                Err(StoreError::InvalidCredentials)
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
