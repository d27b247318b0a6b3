//! User accounts: registration, credential checks, token sessions,
//! profile management and per-user statistics.

use rand::RngCore;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::db::{now_ms, Database};
use crate::error::{unique_violation, FieldError, StoreError, StoreResult};
use crate::models::UserRecord;
use crate::text::{is_valid_email, normalize_optional_text, parse_date};

const SESSION_TTL_MS: i64 = 24 * 60 * 60 * 1000;
const REMEMBERED_SESSION_TTL_MS: i64 = 30 * 24 * 60 * 60 * 1000;
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Deserialize)]
pub struct NewUserInput {
    pub email: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub birth_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdateInput {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub website: Option<String>,
    pub twitter: Option<String>,
    pub github: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SessionRecord {
    pub token: String,
    pub user_id: i64,
    pub created_at: i64,
    pub expires_at: i64,
}

/// Aggregated activity counters shown on the profile page.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserStats {
    pub posts_count: i64,
    pub comments_count: i64,
    pub likes_received: i64,
    pub total_views: i64,
}

#[derive(Clone)]
pub struct AccountsStore {
    db: Database,
}

impl AccountsStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Creates the account, opens a session and stamps `last_activity` in
    /// one transaction; a failure partway leaves no partial state.
    pub fn register(
        &self,
        input: NewUserInput,
        remember: bool,
    ) -> StoreResult<(UserRecord, SessionRecord)> {
        let email = input.email.trim().to_lowercase();
        let username = input.username.trim().to_string();
        validate_new_user(&email, &username, &input)?;

        let salt = generate_salt();
        let digest = hash_password(&input.password, &salt);
        let now = now_ms();

        self.db.with_tx(|tx| {
            let inserted = tx.execute(
                "INSERT INTO users (email, username, password_digest, password_salt, full_name,
                                    phone, gender, birth_date, last_activity, date_joined)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                params![
                    email,
                    username,
                    digest,
                    salt,
                    input.full_name.as_deref().unwrap_or("").trim(),
                    input.phone.as_deref().unwrap_or("").trim(),
                    normalize_optional_text(input.gender.clone()),
                    normalize_optional_text(input.birth_date.clone()),
                    now,
                ],
            );
            if let Err(err) = inserted {
                return Err(map_user_unique_violation(err));
            }

            let user_id = tx.last_insert_rowid();
            let session = issue_session(tx, user_id, remember)?;
            let user = fetch_user(tx, user_id)?.ok_or(StoreError::NotFound("user"))?;
            Ok((user, session))
        })
    }

    /// Verifies credentials and opens a session. A wrong email or password
    /// is indistinguishable to the caller.
    pub fn login(
        &self,
        email: &str,
        password: &str,
        remember: bool,
    ) -> StoreResult<(UserRecord, SessionRecord)> {
        let email = email.trim().to_lowercase();
        self.db.with_tx(|tx| {
            let row = tx
                .query_row(
                    "SELECT id, password_digest, password_salt, is_active
                     FROM users WHERE email = ?1",
                    params![email],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, bool>(3)?,
                        ))
                    },
                )
                .optional()?;

            let Some((user_id, digest, salt, is_active)) = row else {
                return Err(invalid_credentials());
            };
            if !is_active || hash_password(password, &salt) != digest {
                return Err(invalid_credentials());
            }

            tx.execute(
                "UPDATE users SET last_activity = ?1 WHERE id = ?2",
                params![now_ms(), user_id],
            )?;
            let session = issue_session(tx, user_id, remember)?;
            let user = fetch_user(tx, user_id)?.ok_or(StoreError::NotFound("user"))?;
            Ok((user, session))
        })
    }

    pub fn logout(&self, token: &str) -> StoreResult<()> {
        self.db.with_conn(|conn| {
            conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
            Ok(())
        })
    }

    /// Resolves a bearer token to its user. Expired sessions are removed on
    /// sight; deactivated accounts do not resolve.
    pub fn user_for_token(&self, token: &str) -> StoreResult<Option<UserRecord>> {
        self.db.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT user_id, expires_at FROM sessions WHERE token = ?1",
                    params![token],
                    |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
                )
                .optional()?;

            let Some((user_id, expires_at)) = row else {
                return Ok(None);
            };
            if expires_at < now_ms() {
                conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
                return Ok(None);
            }

            let user = fetch_user(conn, user_id)?;
            Ok(user.filter(|user| user.is_active))
        })
    }

    pub fn get_user(&self, user_id: i64) -> StoreResult<UserRecord> {
        self.db
            .with_conn(|conn| fetch_user(conn, user_id))?
            .ok_or(StoreError::NotFound("user"))
    }

    pub fn get_user_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>> {
        self.db.with_conn(|conn| {
            let user = conn
                .query_row(
                    &format!("{USER_SELECT} WHERE username = ?1"),
                    params![username.trim()],
                    row_to_user,
                )
                .optional()?;
            Ok(user)
        })
    }

    pub fn update_profile(
        &self,
        user_id: i64,
        input: ProfileUpdateInput,
    ) -> StoreResult<UserRecord> {
        let mut errors = Vec::new();
        if let Some(gender) = normalize_optional_text(input.gender.clone()) {
            if !matches!(gender.as_str(), "male" | "female" | "other") {
                errors.push(FieldError::new("gender", "choose one of male, female or other"));
            }
        }
        if let Some(birth_date) = normalize_optional_text(input.birth_date.clone()) {
            if parse_date(&birth_date).is_none() {
                errors.push(FieldError::new("birth_date", "enter a date as YYYY-MM-DD"));
            }
        }
        if let Some(phone) = normalize_optional_text(input.phone.clone()) {
            if phone.len() > 20 {
                errors.push(FieldError::new("phone", "phone number is too long"));
            }
        }
        if !errors.is_empty() {
            return Err(StoreError::Validation(errors));
        }

        self.db.with_tx(|tx| {
            let updated = tx.execute(
                "UPDATE users SET
                     full_name = COALESCE(?2, full_name),
                     phone = COALESCE(?3, phone),
                     gender = COALESCE(?4, gender),
                     birth_date = COALESCE(?5, birth_date),
                     bio = COALESCE(?6, bio),
                     avatar = COALESCE(?7, avatar),
                     website = COALESCE(?8, website),
                     twitter = COALESCE(?9, twitter),
                     github = COALESCE(?10, github),
                     last_activity = ?11
                 WHERE id = ?1",
                params![
                    user_id,
                    input.full_name.map(|value| value.trim().to_string()),
                    input.phone.map(|value| value.trim().to_string()),
                    normalize_optional_text(input.gender),
                    normalize_optional_text(input.birth_date),
                    input.bio.map(|value| value.trim().to_string()),
                    normalize_optional_text(input.avatar),
                    normalize_optional_text(input.website),
                    normalize_optional_text(input.twitter),
                    normalize_optional_text(input.github),
                    now_ms(),
                ],
            )?;
            if updated == 0 {
                return Err(StoreError::NotFound("user"));
            }
            fetch_user(tx, user_id)?.ok_or(StoreError::NotFound("user"))
        })
    }

    pub fn change_password(
        &self,
        user_id: i64,
        old_password: &str,
        new_password: &str,
    ) -> StoreResult<()> {
        if new_password.len() < MIN_PASSWORD_LEN {
            return Err(StoreError::invalid(
                "new_password",
                format!("password must be at least {MIN_PASSWORD_LEN} characters"),
            ));
        }

        self.db.with_tx(|tx| {
            let (digest, salt) = fetch_credentials(tx, user_id)?;
            if hash_password(old_password, &salt) != digest {
                return Err(StoreError::invalid("old_password", "current password is incorrect"));
            }

            let new_salt = generate_salt();
            let new_digest = hash_password(new_password, &new_salt);
            tx.execute(
                "UPDATE users SET password_digest = ?2, password_salt = ?3, last_activity = ?4
                 WHERE id = ?1",
                params![user_id, new_digest, new_salt, now_ms()],
            )?;
            Ok(())
        })
    }

    pub fn change_email(&self, user_id: i64, new_email: &str, password: &str) -> StoreResult<()> {
        let new_email = new_email.trim().to_lowercase();
        if !is_valid_email(&new_email) {
            return Err(StoreError::invalid("new_email", "enter a valid email address"));
        }

        self.db.with_tx(|tx| {
            let (digest, salt) = fetch_credentials(tx, user_id)?;
            if hash_password(password, &salt) != digest {
                return Err(StoreError::invalid("password", "current password is incorrect"));
            }

            let updated = tx.execute(
                "UPDATE users SET email = ?2, last_activity = ?3 WHERE id = ?1",
                params![user_id, new_email, now_ms()],
            );
            match updated {
                Ok(0) => Err(StoreError::NotFound("user")),
                Ok(_) => Ok(()),
                Err(err) => Err(map_user_unique_violation(err)),
            }
        })
    }

    /// Soft-deactivation: the row stays, sessions are revoked.
    pub fn deactivate(&self, user_id: i64) -> StoreResult<()> {
        self.db.with_tx(|tx| {
            let updated = tx.execute(
                "UPDATE users SET is_active = 0 WHERE id = ?1",
                params![user_id],
            )?;
            if updated == 0 {
                return Err(StoreError::NotFound("user"));
            }
            tx.execute("DELETE FROM sessions WHERE user_id = ?1", params![user_id])?;
            Ok(())
        })
    }

    /// Flips `profile_public` and returns the new value.
    pub fn toggle_profile_privacy(&self, user_id: i64) -> StoreResult<bool> {
        self.db.with_tx(|tx| {
            let updated = tx.execute(
                "UPDATE users SET profile_public = 1 - profile_public, last_activity = ?2
                 WHERE id = ?1",
                params![user_id, now_ms()],
            )?;
            if updated == 0 {
                return Err(StoreError::NotFound("user"));
            }
            let is_public: bool = tx.query_row(
                "SELECT profile_public FROM users WHERE id = ?1",
                params![user_id],
                |row| row.get(0),
            )?;
            Ok(is_public)
        })
    }

    pub fn touch_last_activity(&self, user_id: i64) -> StoreResult<()> {
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET last_activity = ?2 WHERE id = ?1",
                params![user_id, now_ms()],
            )?;
            Ok(())
        })
    }

    pub fn user_stats(&self, user_id: i64) -> StoreResult<UserStats> {
        self.db.with_conn(|conn| {
            let posts_count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM blogs WHERE author_id = ?1 AND is_deleted = 0",
                params![user_id],
                |row| row.get(0),
            )?;
            let comments_count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM comments WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )?;
            let likes_received: i64 = conn.query_row(
                "SELECT COUNT(*) FROM likes l
                 JOIN blogs b ON b.id = l.blog_id
                 WHERE b.author_id = ?1 AND b.is_deleted = 0",
                params![user_id],
                |row| row.get(0),
            )?;
            let total_views: i64 = conn.query_row(
                "SELECT COALESCE(SUM(views), 0) FROM blogs
                 WHERE author_id = ?1 AND is_deleted = 0 AND is_active = 1",
                params![user_id],
                |row| row.get(0),
            )?;
            Ok(UserStats {
                posts_count,
                comments_count,
                likes_received,
                total_views,
            })
        })
    }
}

const USER_SELECT: &str = "SELECT id, email, username, full_name, phone, gender, birth_date,
        bio, avatar, website, twitter, github, profile_public, is_verified, is_premium,
        is_active, last_activity, date_joined FROM users";

fn fetch_user(conn: &Connection, user_id: i64) -> StoreResult<Option<UserRecord>> {
    let user = conn
        .query_row(&format!("{USER_SELECT} WHERE id = ?1"), params![user_id], row_to_user)
        .optional()?;
    Ok(user)
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: row.get(0)?,
        email: row.get(1)?,
        username: row.get(2)?,
        full_name: row.get(3)?,
        phone: row.get(4)?,
        gender: row.get(5)?,
        birth_date: row.get(6)?,
        bio: row.get(7)?,
        avatar: row.get(8)?,
        website: row.get(9)?,
        twitter: row.get(10)?,
        github: row.get(11)?,
        profile_public: row.get(12)?,
        is_verified: row.get(13)?,
        is_premium: row.get(14)?,
        is_active: row.get(15)?,
        last_activity: row.get(16)?,
        date_joined: row.get(17)?,
    })
}

fn fetch_credentials(conn: &Connection, user_id: i64) -> StoreResult<(String, String)> {
    conn.query_row(
        "SELECT password_digest, password_salt FROM users WHERE id = ?1",
        params![user_id],
        |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
    )
    .optional()?
    .ok_or(StoreError::NotFound("user"))
}

fn issue_session(conn: &Connection, user_id: i64, remember: bool) -> StoreResult<SessionRecord> {
    let now = now_ms();
    let ttl = if remember { REMEMBERED_SESSION_TTL_MS } else { SESSION_TTL_MS };
    let session = SessionRecord {
        token: uuid::Uuid::new_v4().to_string(),
        user_id,
        created_at: now,
        expires_at: now + ttl,
    };
    conn.execute(
        "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
        params![session.token, session.user_id, session.created_at, session.expires_at],
    )?;
    Ok(session)
}

fn validate_new_user(email: &str, username: &str, input: &NewUserInput) -> StoreResult<()> {
    let mut errors = Vec::new();
    if !is_valid_email(email) {
        errors.push(FieldError::new("email", "enter a valid email address"));
    }
    if username.len() < 3 || username.len() > 150 {
        errors.push(FieldError::new("username", "username must be 3-150 characters"));
    } else if !username
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-'))
    {
        errors.push(FieldError::new(
            "username",
            "username may only contain letters, digits and _ . -",
        ));
    }
    if input.password.len() < MIN_PASSWORD_LEN {
        errors.push(FieldError::new(
            "password",
            format!("password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    if let Some(gender) = normalize_optional_text(input.gender.clone()) {
        if !matches!(gender.as_str(), "male" | "female" | "other") {
            errors.push(FieldError::new("gender", "choose one of male, female or other"));
        }
    }
    if let Some(birth_date) = normalize_optional_text(input.birth_date.clone()) {
        if parse_date(&birth_date).is_none() {
            errors.push(FieldError::new("birth_date", "enter a date as YYYY-MM-DD"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(StoreError::Validation(errors))
    }
}

fn map_user_unique_violation(err: rusqlite::Error) -> StoreError {
    match unique_violation(&err).as_deref() {
        Some("users.email") => StoreError::invalid("email", "this email is already in use"),
        Some("users.username") => StoreError::invalid("username", "this username is already taken"),
        _ => StoreError::from(err),
    }
}

fn invalid_credentials() -> StoreError {
    StoreError::invalid("email", "invalid email or password")
}

fn generate_salt() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> AccountsStore {
        AccountsStore::new(Database::open_in_memory().expect("db"))
    }

    fn sample_input(email: &str, username: &str) -> NewUserInput {
        NewUserInput {
            email: email.to_string(),
            username: username.to_string(),
            password: "correct-horse".to_string(),
            full_name: Some("Test User".to_string()),
            phone: None,
            gender: None,
            birth_date: None,
        }
    }

    #[test]
    fn register_then_login_round_trips() {
        let store = store();
        let (user, session) = store
            .register(sample_input("ada@example.com", "ada"), false)
            .expect("register");
        assert_eq!(user.email, "ada@example.com");
        assert!(user.last_activity.is_some());

        let resolved = store
            .user_for_token(&session.token)
            .expect("resolve")
            .expect("session valid");
        assert_eq!(resolved.id, user.id);

        let (again, _) = store
            .login("ada@example.com", "correct-horse", true)
            .expect("login");
        assert_eq!(again.id, user.id);
    }

    #[test]
    fn duplicate_email_is_a_field_error_and_creates_no_row() {
        let store = store();
        store
            .register(sample_input("ada@example.com", "ada"), false)
            .expect("first register");

        let err = store
            .register(sample_input("ada@example.com", "other"), false)
            .expect_err("duplicate email");
        match err {
            StoreError::Validation(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "email");
            },
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(store
            .get_user_by_username("other")
            .expect("lookup")
            .is_none());
    }

    #[test]
    fn weak_password_and_bad_email_report_both_fields() {
        let store = store();
        let mut input = sample_input("nonsense", "ok-name");
        input.password = "short".to_string();
        let err = store.register(input, false).expect_err("invalid");
        match err {
            StoreError::Validation(errors) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert!(fields.contains(&"email"));
                assert!(fields.contains(&"password"));
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn login_rejects_wrong_password_and_deactivated_accounts() {
        let store = store();
        let (user, _) = store
            .register(sample_input("ada@example.com", "ada"), false)
            .expect("register");

        assert!(store.login("ada@example.com", "wrong", false).is_err());

        store.deactivate(user.id).expect("deactivate");
        assert!(store
            .login("ada@example.com", "correct-horse", false)
            .is_err());
    }

    #[test]
    fn logout_revokes_the_token() {
        let store = store();
        let (_, session) = store
            .register(sample_input("ada@example.com", "ada"), false)
            .expect("register");
        store.logout(&session.token).expect("logout");
        assert!(store
            .user_for_token(&session.token)
            .expect("resolve")
            .is_none());
    }

    #[test]
    fn change_password_requires_the_old_one() {
        let store = store();
        let (user, _) = store
            .register(sample_input("ada@example.com", "ada"), false)
            .expect("register");

        assert!(store
            .change_password(user.id, "wrong", "new-password-1")
            .is_err());
        store
            .change_password(user.id, "correct-horse", "new-password-1")
            .expect("change");
        store
            .login("ada@example.com", "new-password-1", false)
            .expect("login with new password");
    }

    #[test]
    fn toggle_privacy_flips_the_flag() {
        let store = store();
        let (user, _) = store
            .register(sample_input("ada@example.com", "ada"), false)
            .expect("register");
        assert!(!store.toggle_profile_privacy(user.id).expect("toggle"));
        assert!(store.toggle_profile_privacy(user.id).expect("toggle"));
    }

    #[test]
    fn update_profile_keeps_unset_fields() {
        let store = store();
        let (user, _) = store
            .register(sample_input("ada@example.com", "ada"), false)
            .expect("register");

        let updated = store
            .update_profile(
                user.id,
                ProfileUpdateInput {
                    bio: Some("Curious engineer.".to_string()),
                    ..Default::default()
                },
            )
            .expect("update");
        assert_eq!(updated.bio, "Curious engineer.");
        assert_eq!(updated.full_name, "Test User");
    }
}
