//! SQLite handle and schema bootstrap.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{Connection, Transaction};

use crate::error::StoreResult;

/// Soft-delete scoping for reads: the "active objects" vs "all objects"
/// distinction expressed as a query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Only rows with `is_deleted = 0 AND is_active = 1`.
    Active,
    /// Every row, deleted and inactive included.
    All,
}

impl Scope {
    /// SQL predicate fragment for the given table alias.
    pub(crate) fn predicate(self, alias: &str) -> String {
        match self {
            Scope::Active => format!("{alias}.is_deleted = 0 AND {alias}.is_active = 1"),
            Scope::All => "1 = 1".to_string(),
        }
    }
}

/// Cloneable handle over a single SQLite connection. CRUD operations are
/// short; one guarded connection keeps the uniqueness and transaction
/// guarantees in one place.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {}", path.display()))?;
        Self::from_connection(conn)
    }

    /// In-memory database, used by tests and ad-hoc tooling.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("failed to enable WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .context("failed to enable foreign keys")?;
        bootstrap_schema(&conn).context("failed to bootstrap schema")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs a read or single-statement write against the connection.
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> StoreResult<T>) -> StoreResult<T> {
        let guard = self.conn.lock();
        f(&guard)
    }

    /// Runs `f` inside a transaction; commits on `Ok`, rolls back on drop
    /// otherwise so a failure partway leaves no partial state.
    pub fn with_tx<T>(&self, f: impl FnOnce(&Transaction) -> StoreResult<T>) -> StoreResult<T> {
        let mut guard = self.conn.lock();
        let tx = guard
            .transaction()
            .map_err(|err| crate::error::StoreError::from(err))?;
        let out = f(&tx)?;
        tx.commit().map_err(crate::error::StoreError::from)?;
        Ok(out)
    }
}

/// Current wall-clock time in UTC milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn bootstrap_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            username TEXT NOT NULL UNIQUE,
            password_digest TEXT NOT NULL,
            password_salt TEXT NOT NULL,
            full_name TEXT NOT NULL DEFAULT '',
            phone TEXT NOT NULL DEFAULT '',
            gender TEXT,
            birth_date TEXT,
            bio TEXT NOT NULL DEFAULT '',
            avatar TEXT,
            website TEXT,
            twitter TEXT,
            github TEXT,
            profile_public INTEGER NOT NULL DEFAULT 1,
            is_verified INTEGER NOT NULL DEFAULT 0,
            is_premium INTEGER NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1,
            last_activity INTEGER,
            date_joined INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            token TEXT NOT NULL UNIQUE,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at INTEGER NOT NULL,
            expires_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);

        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT '',
            parent_id INTEGER REFERENCES categories(id) ON DELETE CASCADE,
            sort_order INTEGER NOT NULL DEFAULT 0,
            meta_description TEXT NOT NULL DEFAULT '',
            meta_keywords TEXT NOT NULL DEFAULT '',
            is_deleted INTEGER NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_categories_parent_sort
            ON categories(parent_id, sort_order);

        CREATE TABLE IF NOT EXISTS blogs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            category_id INTEGER NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
            author_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
            description TEXT NOT NULL,
            excerpt TEXT NOT NULL DEFAULT '',
            img TEXT,
            status TEXT NOT NULL DEFAULT 'draft',
            views INTEGER NOT NULL DEFAULT 0 CHECK (views >= 0),
            featured INTEGER NOT NULL DEFAULT 0,
            reading_time INTEGER NOT NULL DEFAULT 0,
            published_at INTEGER,
            meta_description TEXT NOT NULL DEFAULT '',
            meta_keywords TEXT NOT NULL DEFAULT '',
            is_deleted INTEGER NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_blogs_created ON blogs(created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_blogs_category ON blogs(category_id, created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_blogs_status ON blogs(status, created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_blogs_author ON blogs(author_id, created_at DESC);

        CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            slug TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT '',
            color TEXT NOT NULL DEFAULT '#6c757d',
            usage_count INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS blog_tags (
            blog_id INTEGER NOT NULL REFERENCES blogs(id) ON DELETE CASCADE,
            tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
            UNIQUE (blog_id, tag_id)
        );
        CREATE INDEX IF NOT EXISTS idx_blog_tags_tag ON blog_tags(tag_id);

        CREATE TABLE IF NOT EXISTS comments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            blog_id INTEGER NOT NULL REFERENCES blogs(id) ON DELETE CASCADE,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            parent_id INTEGER REFERENCES comments(id) ON DELETE CASCADE,
            content TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'approved',
            name TEXT NOT NULL DEFAULT '',
            email TEXT NOT NULL DEFAULT '',
            edited INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_comments_blog ON comments(blog_id, created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_comments_parent ON comments(parent_id);

        CREATE TABLE IF NOT EXISTS likes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            blog_id INTEGER NOT NULL REFERENCES blogs(id) ON DELETE CASCADE,
            created_at INTEGER NOT NULL,
            UNIQUE (user_id, blog_id)
        );
        CREATE INDEX IF NOT EXISTS idx_likes_blog ON likes(blog_id);

        CREATE TABLE IF NOT EXISTS bookmarks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            blog_id INTEGER NOT NULL REFERENCES blogs(id) ON DELETE CASCADE,
            notes TEXT NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL,
            UNIQUE (user_id, blog_id)
        );
        CREATE INDEX IF NOT EXISTS idx_bookmarks_user ON bookmarks(user_id, created_at DESC);

        CREATE TABLE IF NOT EXISTS contact_messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            subject TEXT NOT NULL,
            message TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS newsletter_subscriptions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            subscribed_at INTEGER NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS site_info (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            img TEXT,
            phone TEXT NOT NULL DEFAULT '',
            email TEXT NOT NULL DEFAULT '',
            x TEXT,
            instagram TEXT,
            telegram TEXT,
            github TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        "#,
    )
}
