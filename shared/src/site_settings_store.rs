//! Site-wide settings: a single-row table read by the public site-info
//! endpoint and written by the seed tooling.

use rusqlite::{params, OptionalExtension, Row};
use serde::Deserialize;

use crate::db::{now_ms, Database};
use crate::error::{StoreError, StoreResult};
use crate::models::SiteInfoRecord;
use crate::text::{is_valid_email, normalize_optional_text};

#[derive(Debug, Clone, Deserialize)]
pub struct SiteInfoInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub img: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub x: Option<String>,
    #[serde(default)]
    pub instagram: Option<String>,
    #[serde(default)]
    pub telegram: Option<String>,
    #[serde(default)]
    pub github: Option<String>,
}

#[derive(Clone)]
pub struct SiteSettingsStore {
    db: Database,
}

impl SiteSettingsStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// The first (oldest) settings row, mirroring the original's
    /// `get_info` accessor.
    pub fn get_info(&self) -> StoreResult<Option<SiteInfoRecord>> {
        self.db.with_conn(|conn| {
            let record = conn
                .query_row(
                    &format!("{SITE_INFO_SELECT} ORDER BY id LIMIT 1"),
                    [],
                    row_to_site_info,
                )
                .optional()?;
            Ok(record)
        })
    }

    /// Creates the settings row or updates the existing one in place.
    pub fn upsert_info(&self, input: SiteInfoInput) -> StoreResult<SiteInfoRecord> {
        let name = input.name.trim().to_string();
        if name.is_empty() || name.len() > 125 {
            return Err(StoreError::invalid("name", "site name must be 1-125 characters"));
        }
        if let Some(email) = normalize_optional_text(input.email.clone()) {
            if !is_valid_email(&email) {
                return Err(StoreError::invalid("email", "enter a valid email address"));
            }
        }

        self.db.with_tx(|tx| {
            let existing: Option<i64> = tx
                .query_row("SELECT id FROM site_info ORDER BY id LIMIT 1", [], |row| row.get(0))
                .optional()?;
            let now = now_ms();

            let id = match existing {
                Some(id) => {
                    tx.execute(
                        "UPDATE site_info SET name = ?2, description = ?3, img = ?4, phone = ?5,
                                email = ?6, x = ?7, instagram = ?8, telegram = ?9, github = ?10,
                                updated_at = ?11
                         WHERE id = ?1",
                        params![
                            id,
                            name,
                            input.description.as_deref().unwrap_or("").trim(),
                            normalize_optional_text(input.img.clone()),
                            input.phone.as_deref().unwrap_or("").trim(),
                            input.email.as_deref().unwrap_or("").trim().to_lowercase(),
                            normalize_optional_text(input.x.clone()),
                            normalize_optional_text(input.instagram.clone()),
                            normalize_optional_text(input.telegram.clone()),
                            normalize_optional_text(input.github.clone()),
                            now,
                        ],
                    )?;
                    id
                },
                None => {
                    tx.execute(
                        "INSERT INTO site_info (name, description, img, phone, email, x,
                                                instagram, telegram, github, created_at,
                                                updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
                        params![
                            name,
                            input.description.as_deref().unwrap_or("").trim(),
                            normalize_optional_text(input.img.clone()),
                            input.phone.as_deref().unwrap_or("").trim(),
                            input.email.as_deref().unwrap_or("").trim().to_lowercase(),
                            normalize_optional_text(input.x.clone()),
                            normalize_optional_text(input.instagram.clone()),
                            normalize_optional_text(input.telegram.clone()),
                            normalize_optional_text(input.github.clone()),
                            now,
                        ],
                    )?;
                    tx.last_insert_rowid()
                },
            };

            let record = tx
                .query_row(
                    &format!("{SITE_INFO_SELECT} WHERE id = ?1"),
                    params![id],
                    row_to_site_info,
                )
                .optional()?;
            record.ok_or(StoreError::NotFound("site info"))
        })
    }
}

const SITE_INFO_SELECT: &str = "SELECT id, name, description, img, phone, email, x, instagram,
        telegram, github, created_at, updated_at FROM site_info";

fn row_to_site_info(row: &Row<'_>) -> rusqlite::Result<SiteInfoRecord> {
    Ok(SiteInfoRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        img: row.get(3)?,
        phone: row.get(4)?,
        email: row.get(5)?,
        x: row.get(6)?,
        instagram: row.get(7)?,
        telegram: row.get(8)?,
        github: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_creates_then_updates_a_single_row() {
        let store = SiteSettingsStore::new(Database::open_in_memory().expect("db"));
        assert!(store.get_info().expect("empty").is_none());

        let first = store
            .upsert_info(SiteInfoInput {
                name: "ModernBlog".to_string(),
                description: Some("A blog about building things.".to_string()),
                img: None,
                phone: None,
                email: Some("hello@example.com".to_string()),
                x: None,
                instagram: None,
                telegram: None,
                github: Some("https://github.com/example".to_string()),
            })
            .expect("create");

        let second = store
            .upsert_info(SiteInfoInput {
                name: "ModernBlog 2".to_string(),
                description: None,
                img: None,
                phone: None,
                email: None,
                x: None,
                instagram: None,
                telegram: None,
                github: None,
            })
            .expect("update");

        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "ModernBlog 2");
        assert_eq!(
            store.get_info().expect("get").expect("exists").name,
            "ModernBlog 2"
        );
    }
}
