//! Likes, bookmarks and the view counter. Toggles are delete-or-insert
//! pairs guarded by the UNIQUE (user, blog) constraint; a racing duplicate
//! insert is absorbed as "already added" rather than surfaced as an error.

use rusqlite::{params, Connection};
use serde::Serialize;

use crate::db::{now_ms, Database};
use crate::error::{unique_violation, StoreError, StoreResult};

/// Result of a toggle call: whether the row now exists, and the fresh count.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub added: bool,
    pub count: i64,
}

#[derive(Clone)]
pub struct EngagementStore {
    db: Database,
}

impl EngagementStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn toggle_like(&self, user_id: i64, blog_id: i64) -> StoreResult<ToggleOutcome> {
        self.db
            .with_tx(|tx| toggle_pair(tx, "likes", user_id, blog_id))
    }

    pub fn toggle_bookmark(&self, user_id: i64, blog_id: i64) -> StoreResult<ToggleOutcome> {
        self.db
            .with_tx(|tx| toggle_pair(tx, "bookmarks", user_id, blog_id))
    }

    pub fn update_bookmark_notes(
        &self,
        user_id: i64,
        blog_id: i64,
        notes: &str,
    ) -> StoreResult<()> {
        self.db.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE bookmarks SET notes = ?3 WHERE user_id = ?1 AND blog_id = ?2",
                params![user_id, blog_id, notes.trim()],
            )?;
            if updated == 0 {
                return Err(StoreError::NotFound("bookmark"));
            }
            Ok(())
        })
    }

    /// Adds exactly one view and persists nothing else. Callers gate on the
    /// blog being published and active; this method does not.
    pub fn increment_views(&self, blog_id: i64) -> StoreResult<()> {
        self.db.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE blogs SET views = views + 1 WHERE id = ?1",
                params![blog_id],
            )?;
            if updated == 0 {
                return Err(StoreError::NotFound("blog post"));
            }
            Ok(())
        })
    }

    pub fn like_count(&self, blog_id: i64) -> StoreResult<i64> {
        self.db
            .with_conn(|conn| count_pairs(conn, "likes", blog_id))
    }

    pub fn bookmark_count(&self, blog_id: i64) -> StoreResult<i64> {
        self.db
            .with_conn(|conn| count_pairs(conn, "bookmarks", blog_id))
    }

    pub fn user_has_liked(&self, user_id: i64, blog_id: i64) -> StoreResult<bool> {
        self.db
            .with_conn(|conn| pair_exists(conn, "likes", user_id, blog_id))
    }

    pub fn user_has_bookmarked(&self, user_id: i64, blog_id: i64) -> StoreResult<bool> {
        self.db
            .with_conn(|conn| pair_exists(conn, "bookmarks", user_id, blog_id))
    }
}

fn toggle_pair(
    conn: &Connection,
    table: &str,
    user_id: i64,
    blog_id: i64,
) -> StoreResult<ToggleOutcome> {
    let deleted = conn.execute(
        &format!("DELETE FROM {table} WHERE user_id = ?1 AND blog_id = ?2"),
        params![user_id, blog_id],
    )?;

    let added = if deleted > 0 {
        false
    } else {
        let inserted = conn.execute(
            &format!("INSERT INTO {table} (user_id, blog_id, created_at) VALUES (?1, ?2, ?3)"),
            params![user_id, blog_id, now_ms()],
        );
        match inserted {
            Ok(_) => true,
            // Lost the race against a concurrent insert of the same pair:
            // the row exists, which is the state this caller asked for.
            Err(err) if unique_violation(&err).is_some() => true,
            Err(err) => return Err(StoreError::from(err)),
        }
    };

    Ok(ToggleOutcome {
        added,
        count: count_pairs(conn, table, blog_id)?,
    })
}

fn count_pairs(conn: &Connection, table: &str, blog_id: i64) -> StoreResult<i64> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {table} WHERE blog_id = ?1"),
        params![blog_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn pair_exists(conn: &Connection, table: &str, user_id: i64, blog_id: i64) -> StoreResult<bool> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {table} WHERE user_id = ?1 AND blog_id = ?2"),
        params![user_id, blog_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        db: Database,
        store: EngagementStore,
        user_id: i64,
        blog_id: i64,
    }

    fn fixture() -> Fixture {
        let db = Database::open_in_memory().expect("db");
        let (user_id, blog_id) = db
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO users (email, username, password_digest, password_salt,
                                        date_joined)
                     VALUES ('ada@example.com', 'ada', 'x', 'y', 0)",
                    [],
                )?;
                let user_id = conn.last_insert_rowid();
                conn.execute(
                    "INSERT INTO categories (title, slug, created_at, updated_at)
                     VALUES ('Tech', 'tech', 0, 0)",
                    [],
                )?;
                let category_id = conn.last_insert_rowid();
                conn.execute(
                    "INSERT INTO blogs (title, slug, category_id, description, status,
                                        created_at, updated_at)
                     VALUES ('A Test Post Title', 'a-test-post', ?1, 'body', 'published', 0, 0)",
                    params![category_id],
                )?;
                Ok((user_id, conn.last_insert_rowid()))
            })
            .expect("seed");
        Fixture {
            store: EngagementStore::new(db.clone()),
            db,
            user_id,
            blog_id,
        }
    }

    #[test]
    fn toggling_twice_returns_to_the_original_state() {
        let fx = fixture();
        let first = fx.store.toggle_like(fx.user_id, fx.blog_id).expect("add");
        assert!(first.added);
        assert_eq!(first.count, 1);

        let second = fx.store.toggle_like(fx.user_id, fx.blog_id).expect("remove");
        assert!(!second.added);
        assert_eq!(second.count, 0);
        assert!(!fx
            .store
            .user_has_liked(fx.user_id, fx.blog_id)
            .expect("check"));
    }

    #[test]
    fn duplicate_insert_race_is_absorbed_as_added() {
        let fx = fixture();
        // Simulate the concurrent winner having inserted the row already;
        // the raw insert path must report "added", not an error.
        fx.db
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO likes (user_id, blog_id, created_at) VALUES (?1, ?2, 0)",
                    params![fx.user_id, fx.blog_id],
                )?;
                let outcome = toggle_pair(conn, "likes", fx.user_id + 1, fx.blog_id)?;
                assert!(outcome.added);

                let raced = conn.execute(
                    "INSERT INTO likes (user_id, blog_id, created_at) VALUES (?1, ?2, 0)",
                    params![fx.user_id, fx.blog_id],
                );
                let err = raced.expect_err("unique violation");
                assert!(unique_violation(&err).is_some());
                Ok(())
            })
            .expect("race check");
    }

    #[test]
    fn bookmark_notes_require_an_existing_bookmark() {
        let fx = fixture();
        let err = fx
            .store
            .update_bookmark_notes(fx.user_id, fx.blog_id, "read later")
            .expect_err("no bookmark yet");
        assert!(matches!(err, StoreError::NotFound(_)));

        fx.store
            .toggle_bookmark(fx.user_id, fx.blog_id)
            .expect("bookmark");
        fx.store
            .update_bookmark_notes(fx.user_id, fx.blog_id, "read later")
            .expect("notes");
    }

    #[test]
    fn increment_views_adds_exactly_one_and_touches_nothing_else() {
        let fx = fixture();
        let before = fetch_blog_row(&fx);
        fx.store.increment_views(fx.blog_id).expect("increment");
        let after = fetch_blog_row(&fx);

        assert_eq!(after.0, before.0 + 1);
        assert_eq!(after.1, before.1);
        assert_eq!(after.2, before.2);
    }

    /// (views, title, updated_at)
    fn fetch_blog_row(fx: &Fixture) -> (i64, String, i64) {
        fx.db
            .with_conn(|conn| {
                let row = conn.query_row(
                    "SELECT views, title, updated_at FROM blogs WHERE id = ?1",
                    params![fx.blog_id],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, i64>(2)?,
                        ))
                    },
                )?;
                Ok(row)
            })
            .expect("fetch blog row")
    }
}
