//! Blog comments: threaded creation, moderation transitions and the
//! depth-capped parent walk.

use std::collections::HashMap;

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::{now_ms, Database};
use crate::error::{StoreError, StoreResult};
use crate::models::{CommentRecord, CommentStatus};
use crate::text::{normalize_optional_text, strip_html_tags};

const CONTENT_MIN_LEN: usize = 10;
const CONTENT_MAX_LEN: usize = 1000;

/// Defensive ceiling for the parent walk. Deeper (or accidentally cyclic)
/// chains are reported as depth 5, not rejected.
pub const MAX_THREAD_DEPTH: i64 = 5;

#[derive(Debug, Clone, Deserialize)]
pub struct NewCommentInput {
    pub blog_id: i64,
    pub user_id: i64,
    pub content: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
    /// Display-name override; filled from the author when blank.
    #[serde(default)]
    pub name: Option<String>,
    /// Display-email override; filled from the author when blank.
    #[serde(default)]
    pub email: Option<String>,
}

/// One comment with its replies, oldest reply first.
#[derive(Debug, Clone, Serialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: CommentRecord,
    pub replies: Vec<CommentNode>,
}

#[derive(Clone)]
pub struct CommentsStore {
    db: Database,
}

impl CommentsStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Persists a comment. The parent, when given, must be a comment on the
    /// same blog. Display name/email are cached from the author's profile at
    /// save time and never re-synced afterwards.
    pub fn create_comment(
        &self,
        input: NewCommentInput,
        default_status: CommentStatus,
    ) -> StoreResult<CommentRecord> {
        let content = strip_html_tags(&input.content).trim().to_string();
        if content.chars().count() < CONTENT_MIN_LEN {
            return Err(StoreError::invalid(
                "content",
                format!("comment must be at least {CONTENT_MIN_LEN} characters"),
            ));
        }
        if content.chars().count() > CONTENT_MAX_LEN {
            return Err(StoreError::invalid(
                "content",
                format!("comment cannot exceed {CONTENT_MAX_LEN} characters"),
            ));
        }

        self.db.with_tx(|tx| {
            let blog_exists: Option<i64> = tx
                .query_row(
                    "SELECT id FROM blogs WHERE id = ?1 AND is_deleted = 0 AND is_active = 1",
                    params![input.blog_id],
                    |row| row.get(0),
                )
                .optional()?;
            if blog_exists.is_none() {
                return Err(StoreError::NotFound("blog post"));
            }

            if let Some(parent_id) = input.parent_id {
                let parent_blog: Option<i64> = tx
                    .query_row(
                        "SELECT blog_id FROM comments WHERE id = ?1",
                        params![parent_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                match parent_blog {
                    None => return Err(StoreError::NotFound("parent comment")),
                    Some(parent_blog) if parent_blog != input.blog_id => {
                        return Err(StoreError::invalid(
                            "parent",
                            "reply must target a comment on the same post",
                        ));
                    },
                    Some(_) => {},
                }
            }

            let (name, email) = cache_display_info(tx, input.user_id, &input)?;
            let now = now_ms();
            tx.execute(
                "INSERT INTO comments (blog_id, user_id, parent_id, content, status, name,
                                       email, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    input.blog_id,
                    input.user_id,
                    input.parent_id,
                    content,
                    default_status.as_str(),
                    name,
                    email,
                    now,
                ],
            )?;
            let id = tx.last_insert_rowid();
            fetch_comment(tx, id)?.ok_or(StoreError::NotFound("comment"))
        })
    }

    pub fn get_comment(&self, comment_id: i64) -> StoreResult<Option<CommentRecord>> {
        self.db.with_conn(|conn| fetch_comment(conn, comment_id))
    }

    /// Depth of the comment in its thread: the number of ancestors, stopped
    /// at [`MAX_THREAD_DEPTH`] so a deep or cyclic chain can never spin.
    pub fn comment_depth(&self, comment_id: i64) -> StoreResult<i64> {
        self.db.with_conn(|conn| {
            let mut depth = 0;
            let mut current: Option<i64> = conn
                .query_row(
                    "SELECT parent_id FROM comments WHERE id = ?1",
                    params![comment_id],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or(StoreError::NotFound("comment"))?;

            while let Some(parent_id) = current {
                depth += 1;
                if depth >= MAX_THREAD_DEPTH {
                    return Ok(MAX_THREAD_DEPTH);
                }
                current = conn
                    .query_row(
                        "SELECT parent_id FROM comments WHERE id = ?1",
                        params![parent_id],
                        |row| row.get(0),
                    )
                    .optional()?
                    .flatten();
            }
            Ok(depth)
        })
    }

    /// Approved comments for a blog as a thread forest: top-level comments
    /// newest first, replies oldest first beneath their parents.
    pub fn list_for_blog(&self, blog_id: i64) -> StoreResult<Vec<CommentNode>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{COMMENT_SELECT} WHERE blog_id = ?1 AND status = 'approved'
                 ORDER BY created_at"
            ))?;
            let comments = stmt
                .query_map(params![blog_id], row_to_comment)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut children: HashMap<i64, Vec<CommentRecord>> = HashMap::new();
            let mut roots = Vec::new();
            for comment in comments {
                match comment.parent_id {
                    Some(parent_id) => children.entry(parent_id).or_default().push(comment),
                    None => roots.push(comment),
                }
            }
            // Top-level: newest first. Replies keep their oldest-first order.
            roots.sort_by(|a, b| b.created_at.cmp(&a.created_at));

            Ok(roots
                .into_iter()
                .map(|root| build_node(root, &mut children))
                .collect())
        })
    }

    /// Moderation transition. `pending` is the only non-terminal state;
    /// anything else rejects further transitions.
    pub fn transition(&self, comment_id: i64, next: CommentStatus) -> StoreResult<CommentRecord> {
        self.db.with_tx(|tx| {
            let current = fetch_comment(tx, comment_id)?.ok_or(StoreError::NotFound("comment"))?;
            validate_transition(current.status, next)?;
            tx.execute(
                "UPDATE comments SET status = ?2, updated_at = ?3 WHERE id = ?1",
                params![comment_id, next.as_str(), now_ms()],
            )?;
            fetch_comment(tx, comment_id)?.ok_or(StoreError::NotFound("comment"))
        })
    }

    /// Author-scoped delete; replies cascade.
    pub fn delete_comment(&self, user_id: i64, comment_id: i64) -> StoreResult<()> {
        self.db.with_tx(|tx| {
            let owner: Option<i64> = tx
                .query_row(
                    "SELECT user_id FROM comments WHERE id = ?1",
                    params![comment_id],
                    |row| row.get(0),
                )
                .optional()?;
            match owner {
                None => Err(StoreError::NotFound("comment")),
                Some(owner) if owner != user_id => Err(StoreError::PermissionDenied("comment")),
                Some(_) => {
                    tx.execute("DELETE FROM comments WHERE id = ?1", params![comment_id])?;
                    Ok(())
                },
            }
        })
    }

    pub fn count_for_blog(&self, blog_id: i64) -> StoreResult<i64> {
        self.db.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM comments WHERE blog_id = ?1",
                params![blog_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }
}

const COMMENT_SELECT: &str = "SELECT id, blog_id, user_id, parent_id, content, status, name,
        email, edited, created_at, updated_at FROM comments";

fn row_to_comment(row: &Row<'_>) -> rusqlite::Result<CommentRecord> {
    let status: String = row.get(5)?;
    let status = CommentStatus::parse(&status).map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            rusqlite::types::Type::Text,
            format!("unknown comment status: {status}").into(),
        )
    })?;
    Ok(CommentRecord {
        id: row.get(0)?,
        blog_id: row.get(1)?,
        user_id: row.get(2)?,
        parent_id: row.get(3)?,
        content: row.get(4)?,
        status,
        name: row.get(6)?,
        email: row.get(7)?,
        edited: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn fetch_comment(conn: &Connection, id: i64) -> StoreResult<Option<CommentRecord>> {
    let comment = conn
        .query_row(&format!("{COMMENT_SELECT} WHERE id = ?1"), params![id], row_to_comment)
        .optional()?;
    Ok(comment)
}

/// Point-in-time cache of the author's display fields. Blank inputs are
/// filled from the user row; later profile edits do not propagate back.
fn cache_display_info(
    conn: &Connection,
    user_id: i64,
    input: &NewCommentInput,
) -> StoreResult<(String, String)> {
    let mut name = normalize_optional_text(input.name.clone()).unwrap_or_default();
    let mut email = normalize_optional_text(input.email.clone()).unwrap_or_default();
    if !name.is_empty() && !email.is_empty() {
        return Ok((name, email));
    }

    let row = conn
        .query_row(
            "SELECT full_name, username, email FROM users WHERE id = ?1",
            params![user_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )
        .optional()?;
    let Some((full_name, username, user_email)) = row else {
        return Err(StoreError::NotFound("user"));
    };

    if name.is_empty() {
        name = if full_name.trim().is_empty() { username } else { full_name };
    }
    if email.is_empty() {
        email = user_email;
    }
    Ok((name, email))
}

fn build_node(comment: CommentRecord, children: &mut HashMap<i64, Vec<CommentRecord>>) -> CommentNode {
    let replies = children
        .remove(&comment.id)
        .unwrap_or_default()
        .into_iter()
        .map(|child| build_node(child, children))
        .collect();
    CommentNode { comment, replies }
}

fn validate_transition(current: CommentStatus, next: CommentStatus) -> StoreResult<()> {
    let allowed = matches!(
        (current, next),
        (
            CommentStatus::Pending,
            CommentStatus::Approved | CommentStatus::Rejected | CommentStatus::Spam
        )
    );
    if allowed {
        Ok(())
    } else {
        Err(StoreError::invalid(
            "status",
            format!("invalid comment transition: {} -> {}", current.as_str(), next.as_str()),
        ))
    }
}
