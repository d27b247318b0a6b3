//! Contact messages and newsletter subscriptions.

use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::db::{now_ms, Database};
use crate::error::{unique_violation, FieldError, StoreError, StoreResult};
use crate::models::{ContactMessageRecord, NewsletterRecord};
use crate::text::is_valid_email;

#[derive(Debug, Clone, Deserialize)]
pub struct NewContactMessageInput {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

/// What a subscribe call did. Duplicate active subscriptions are reported,
/// not treated as storage errors.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscribeOutcome {
    Subscribed,
    Reactivated,
    AlreadySubscribed,
}

#[derive(Clone)]
pub struct ContactStore {
    db: Database,
}

impl ContactStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn create_message(
        &self,
        input: NewContactMessageInput,
    ) -> StoreResult<ContactMessageRecord> {
        let name = input.name.trim().to_string();
        let email = input.email.trim().to_lowercase();
        let subject = input.subject.trim().to_string();
        let message = input.message.trim().to_string();

        let mut errors = Vec::new();
        if name.is_empty() || name.len() > 150 {
            errors.push(FieldError::new("name", "name must be 1-150 characters"));
        }
        if !is_valid_email(&email) {
            errors.push(FieldError::new("email", "enter a valid email address"));
        }
        if subject.is_empty() || subject.len() > 200 {
            errors.push(FieldError::new("subject", "subject must be 1-200 characters"));
        }
        if message.is_empty() {
            errors.push(FieldError::new("message", "message cannot be empty"));
        }
        if !errors.is_empty() {
            return Err(StoreError::Validation(errors));
        }

        self.db.with_conn(|conn| {
            let now = now_ms();
            conn.execute(
                "INSERT INTO contact_messages (name, email, subject, message, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![name, email, subject, message, now],
            )?;
            Ok(ContactMessageRecord {
                id: conn.last_insert_rowid(),
                name: name.clone(),
                email: email.clone(),
                subject: subject.clone(),
                message: message.clone(),
                created_at: now,
            })
        })
    }

    pub fn get_message(&self, id: i64) -> StoreResult<Option<ContactMessageRecord>> {
        self.db.with_conn(|conn| {
            let record = conn
                .query_row(
                    "SELECT id, name, email, subject, message, created_at
                     FROM contact_messages WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok(ContactMessageRecord {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            email: row.get(2)?,
                            subject: row.get(3)?,
                            message: row.get(4)?,
                            created_at: row.get(5)?,
                        })
                    },
                )
                .optional()?;
            Ok(record)
        })
    }

    /// Subscribes an email. An inactive subscription is reactivated; an
    /// active duplicate reports [`SubscribeOutcome::AlreadySubscribed`]
    /// without creating a second row.
    pub fn subscribe(&self, email: &str) -> StoreResult<SubscribeOutcome> {
        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(StoreError::invalid("email", "enter a valid email address"));
        }

        self.db.with_tx(|tx| {
            let existing: Option<(i64, bool)> = tx
                .query_row(
                    "SELECT id, is_active FROM newsletter_subscriptions WHERE email = ?1",
                    params![email],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            if let Some((id, is_active)) = existing {
                if is_active {
                    return Ok(SubscribeOutcome::AlreadySubscribed);
                }
                tx.execute(
                    "UPDATE newsletter_subscriptions SET is_active = 1, subscribed_at = ?2
                     WHERE id = ?1",
                    params![id, now_ms()],
                )?;
                return Ok(SubscribeOutcome::Reactivated);
            }

            let inserted = tx.execute(
                "INSERT INTO newsletter_subscriptions (email, subscribed_at) VALUES (?1, ?2)",
                params![email, now_ms()],
            );
            match inserted {
                Ok(_) => Ok(SubscribeOutcome::Subscribed),
                // Concurrent subscribe of the same address: the row exists.
                Err(err) if unique_violation(&err).is_some() => {
                    Ok(SubscribeOutcome::AlreadySubscribed)
                },
                Err(err) => Err(StoreError::from(err)),
            }
        })
    }

    pub fn get_subscription(&self, email: &str) -> StoreResult<Option<NewsletterRecord>> {
        let email = email.trim().to_lowercase();
        self.db.with_conn(|conn| {
            let record = conn
                .query_row(
                    "SELECT id, email, subscribed_at, is_active
                     FROM newsletter_subscriptions WHERE email = ?1",
                    params![email],
                    |row| {
                        Ok(NewsletterRecord {
                            id: row.get(0)?,
                            email: row.get(1)?,
                            subscribed_at: row.get(2)?,
                            is_active: row.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok(record)
        })
    }

    pub fn unsubscribe(&self, email: &str) -> StoreResult<()> {
        let email = email.trim().to_lowercase();
        self.db.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE newsletter_subscriptions SET is_active = 0 WHERE email = ?1",
                params![email],
            )?;
            if updated == 0 {
                return Err(StoreError::NotFound("subscription"));
            }
            Ok(())
        })
    }
}
