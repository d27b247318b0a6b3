//! Categories, blog posts and tags: CRUD, slug derivation, publication
//! state and the published list projection the search endpoints consume.

use std::collections::HashMap;

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Deserialize;

use crate::db::{now_ms, Database, Scope};
use crate::error::{unique_violation, FieldError, StoreError, StoreResult};
use crate::models::{BlogListItem, BlogRecord, BlogStatus, CategoryRecord, TagRecord, TagRef};
use crate::text::{derive_excerpt, normalize_optional_text, reading_time_minutes, slugify};

const TITLE_MIN_LEN: usize = 10;
const TITLE_MAX_LEN: usize = 255;
const BODY_MIN_LEN: usize = 100;
const EXCERPT_MAX_LEN: usize = 500;

#[derive(Debug, Clone, Deserialize)]
pub struct NewCategoryInput {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub meta_keywords: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTagInput {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBlogInput {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    pub category_id: i64,
    #[serde(default)]
    pub author_id: Option<i64>,
    pub description: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub img: Option<String>,
    #[serde(default = "default_status")]
    pub status: BlogStatus,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub meta_keywords: Option<String>,
}

fn default_status() -> BlogStatus {
    BlogStatus::Draft
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlogUpdateInput {
    pub title: Option<String>,
    pub category_id: Option<i64>,
    pub description: Option<String>,
    pub excerpt: Option<String>,
    pub img: Option<String>,
    pub status: Option<BlogStatus>,
    pub featured: Option<bool>,
    pub tag_ids: Option<Vec<i64>>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
}

#[derive(Clone)]
pub struct BlogStore {
    db: Database,
}

impl BlogStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    // ---- categories ----

    pub fn create_category(&self, input: NewCategoryInput) -> StoreResult<CategoryRecord> {
        let title = input.title.trim().to_string();
        if title.len() < 3 || title.len() > TITLE_MAX_LEN {
            return Err(StoreError::invalid("title", "title must be 3-255 characters"));
        }
        let slug = resolve_slug(input.slug.clone(), &title)?;
        let now = now_ms();

        self.db.with_tx(|tx| {
            if let Some(parent_id) = input.parent_id {
                let exists: Option<i64> = tx
                    .query_row(
                        "SELECT id FROM categories WHERE id = ?1 AND is_deleted = 0",
                        params![parent_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                if exists.is_none() {
                    return Err(StoreError::invalid("parent", "parent category does not exist"));
                }
            }

            let inserted = tx.execute(
                "INSERT INTO categories (title, slug, description, parent_id, sort_order,
                                         meta_description, meta_keywords, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    title,
                    slug,
                    input.description.as_deref().unwrap_or("").trim(),
                    input.parent_id,
                    input.sort_order,
                    input.meta_description.as_deref().unwrap_or("").trim(),
                    input.meta_keywords.as_deref().unwrap_or("").trim(),
                    now,
                ],
            );
            if let Err(err) = inserted {
                return Err(match unique_violation(&err).as_deref() {
                    Some("categories.slug") => {
                        StoreError::invalid("slug", "a category with this slug already exists")
                    },
                    _ => StoreError::from(err),
                });
            }

            let id = tx.last_insert_rowid();
            fetch_category(tx, id)?.ok_or(StoreError::NotFound("category"))
        })
    }

    pub fn list_categories(&self, scope: Scope) -> StoreResult<Vec<CategoryRecord>> {
        self.db.with_conn(|conn| {
            let sql = format!(
                "{CATEGORY_SELECT} WHERE {} ORDER BY c.sort_order, c.title",
                scope.predicate("c")
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], row_to_category)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    pub fn get_category(&self, category_id: i64) -> StoreResult<Option<CategoryRecord>> {
        self.db.with_conn(|conn| fetch_category(conn, category_id))
    }

    pub fn get_category_by_slug(
        &self,
        slug: &str,
        scope: Scope,
    ) -> StoreResult<Option<CategoryRecord>> {
        self.db.with_conn(|conn| {
            let sql = format!(
                "{CATEGORY_SELECT} WHERE c.slug = ?1 AND {}",
                scope.predicate("c")
            );
            let category = conn.query_row(&sql, params![slug], row_to_category).optional()?;
            Ok(category)
        })
    }

    /// Active blog count in this category.
    pub fn category_blog_count(&self, category_id: i64) -> StoreResult<i64> {
        self.db.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM blogs
                 WHERE category_id = ?1 AND is_deleted = 0 AND is_active = 1",
                params![category_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Total views across this category's active blogs.
    pub fn category_total_views(&self, category_id: i64) -> StoreResult<i64> {
        self.db.with_conn(|conn| {
            let total: i64 = conn.query_row(
                "SELECT COALESCE(SUM(views), 0) FROM blogs
                 WHERE category_id = ?1 AND is_deleted = 0 AND is_active = 1",
                params![category_id],
                |row| row.get(0),
            )?;
            Ok(total)
        })
    }

    // ---- tags ----

    pub fn create_tag(&self, input: NewTagInput) -> StoreResult<TagRecord> {
        let name = input.name.trim().to_string();
        if name.len() < 2 || name.len() > 50 {
            return Err(StoreError::invalid("name", "tag name must be 2-50 characters"));
        }
        let slug = resolve_slug(input.slug.clone(), &name)?;

        self.db.with_tx(|tx| {
            let inserted = tx.execute(
                "INSERT INTO tags (name, slug, description, color, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    name,
                    slug,
                    input.description.as_deref().unwrap_or("").trim(),
                    input.color.as_deref().unwrap_or("#6c757d"),
                    now_ms(),
                ],
            );
            if let Err(err) = inserted {
                return Err(match unique_violation(&err).as_deref() {
                    Some("tags.name") => {
                        StoreError::invalid("name", "a tag with this name already exists")
                    },
                    Some("tags.slug") => {
                        StoreError::invalid("slug", "a tag with this slug already exists")
                    },
                    _ => StoreError::from(err),
                });
            }

            let id = tx.last_insert_rowid();
            fetch_tag(tx, id)?.ok_or(StoreError::NotFound("tag"))
        })
    }

    pub fn get_tag_by_slug(&self, slug: &str) -> StoreResult<Option<TagRecord>> {
        self.db.with_conn(|conn| {
            let tag = conn
                .query_row(&format!("{TAG_SELECT} WHERE slug = ?1"), params![slug], row_to_tag)
                .optional()?;
            Ok(tag)
        })
    }

    pub fn list_tags(&self) -> StoreResult<Vec<TagRecord>> {
        self.db.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("{TAG_SELECT} ORDER BY usage_count DESC, name"))?;
            let rows = stmt.query_map([], row_to_tag)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    /// Recomputes every tag's `usage_count` from the join table. The stored
    /// counter is derived state; this is the reconciliation pass.
    pub fn recount_tag_usage(&self) -> StoreResult<usize> {
        self.db.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE tags SET usage_count = (
                     SELECT COUNT(*) FROM blog_tags bt
                     JOIN blogs b ON b.id = bt.blog_id
                     WHERE bt.tag_id = tags.id AND b.is_deleted = 0 AND b.is_active = 1
                 )",
                [],
            )?;
            tracing::debug!("recounted usage for {updated} tags");
            Ok(updated)
        })
    }

    pub fn tags_for_blog(&self, blog_id: i64) -> StoreResult<Vec<TagRecord>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT t.id, t.name, t.slug, t.description, t.color, t.usage_count, t.created_at
                 FROM blog_tags bt JOIN tags t ON t.id = bt.tag_id
                 WHERE bt.blog_id = ?1 ORDER BY t.name",
            )?;
            let rows = stmt.query_map(params![blog_id], row_to_tag)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    // ---- blogs ----

    pub fn create_blog(&self, input: NewBlogInput) -> StoreResult<BlogRecord> {
        let title = input.title.trim().to_string();
        let description = input.description.trim().to_string();
        let excerpt = normalize_optional_text(input.excerpt.clone()).unwrap_or_default();
        validate_blog_content(&title, &description, &excerpt)?;
        let slug = resolve_slug(input.slug.clone(), &title)?;
        let reading_time = reading_time_minutes(&description);
        let now = now_ms();
        let published_at = match input.status {
            BlogStatus::Published => Some(now),
            _ => None,
        };

        self.db.with_tx(|tx| {
            ensure_category_exists(tx, input.category_id)?;
            ensure_tags_exist(tx, &input.tag_ids)?;

            let inserted = tx.execute(
                "INSERT INTO blogs (title, slug, category_id, author_id, description, excerpt,
                                    img, status, featured, reading_time, published_at,
                                    meta_description, meta_keywords, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)",
                params![
                    title,
                    slug,
                    input.category_id,
                    input.author_id,
                    description,
                    excerpt,
                    normalize_optional_text(input.img.clone()),
                    input.status.as_str(),
                    input.featured,
                    reading_time,
                    published_at,
                    input.meta_description.as_deref().unwrap_or("").trim(),
                    input.meta_keywords.as_deref().unwrap_or("").trim(),
                    now,
                ],
            );
            if let Err(err) = inserted {
                return Err(match unique_violation(&err).as_deref() {
                    Some("blogs.slug") => {
                        StoreError::invalid("slug", "a post with this slug already exists")
                    },
                    _ => StoreError::from(err),
                });
            }

            let blog_id = tx.last_insert_rowid();
            replace_blog_tags(tx, blog_id, &input.tag_ids)?;
            fetch_blog(tx, blog_id)?.ok_or(StoreError::NotFound("blog post"))
        })
    }

    /// Author-scoped update. The slug is stable: it is never rewritten, even
    /// when the title changes. `published_at` is set on the first transition
    /// to published and never overwritten afterwards.
    pub fn update_blog(
        &self,
        author_id: i64,
        slug: &str,
        input: BlogUpdateInput,
    ) -> StoreResult<BlogRecord> {
        self.db.with_tx(|tx| {
            let existing = fetch_blog_by_slug(tx, slug, Scope::All)?
                .filter(|blog| !blog.is_deleted)
                .ok_or(StoreError::NotFound("blog post"))?;
            if existing.author_id != Some(author_id) {
                return Err(StoreError::PermissionDenied("blog post"));
            }

            let title = match normalize_optional_text(input.title) {
                Some(title) => title,
                None => existing.title.clone(),
            };
            let description = match normalize_optional_text(input.description) {
                Some(description) => description,
                None => existing.description.clone(),
            };
            let excerpt = match input.excerpt {
                Some(excerpt) => excerpt.trim().to_string(),
                None => existing.excerpt.clone(),
            };
            validate_blog_content(&title, &description, &excerpt)?;

            let status = input.status.unwrap_or(existing.status);
            let published_at = match (status, existing.published_at) {
                (BlogStatus::Published, None) => Some(now_ms()),
                (_, already_set) => already_set,
            };
            let category_id = input.category_id.unwrap_or(existing.category_id);
            ensure_category_exists(tx, category_id)?;

            let reading_time = if description == existing.description {
                existing.reading_time
            } else {
                reading_time_minutes(&description)
            };

            tx.execute(
                "UPDATE blogs SET title = ?2, category_id = ?3, description = ?4, excerpt = ?5,
                        img = COALESCE(?6, img), status = ?7, featured = ?8, reading_time = ?9,
                        published_at = ?10, meta_description = COALESCE(?11, meta_description),
                        meta_keywords = COALESCE(?12, meta_keywords), updated_at = ?13
                 WHERE id = ?1",
                params![
                    existing.id,
                    title,
                    category_id,
                    description,
                    excerpt,
                    normalize_optional_text(input.img),
                    status.as_str(),
                    input.featured.unwrap_or(existing.featured),
                    reading_time,
                    published_at,
                    input.meta_description.map(|value| value.trim().to_string()),
                    input.meta_keywords.map(|value| value.trim().to_string()),
                    now_ms(),
                ],
            )?;

            if let Some(tag_ids) = input.tag_ids {
                ensure_tags_exist(tx, &tag_ids)?;
                let mut stmt = tx.prepare("SELECT tag_id FROM blog_tags WHERE blog_id = ?1")?;
                let mut affected = stmt
                    .query_map(params![existing.id], |row| row.get::<_, i64>(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                drop(stmt);
                tx.execute("DELETE FROM blog_tags WHERE blog_id = ?1", params![existing.id])?;
                replace_blog_tags(tx, existing.id, &tag_ids)?;
                // Removed tags need their counters refreshed too.
                affected.retain(|tag_id| !tag_ids.contains(tag_id));
                recount_tags(tx, &affected)?;
            }

            fetch_blog(tx, existing.id)?.ok_or(StoreError::NotFound("blog post"))
        })
    }

    /// Author-scoped soft delete.
    pub fn soft_delete_blog(&self, author_id: i64, slug: &str) -> StoreResult<()> {
        self.db.with_tx(|tx| {
            let existing = fetch_blog_by_slug(tx, slug, Scope::All)?
                .filter(|blog| !blog.is_deleted)
                .ok_or(StoreError::NotFound("blog post"))?;
            if existing.author_id != Some(author_id) {
                return Err(StoreError::PermissionDenied("blog post"));
            }
            tx.execute(
                "UPDATE blogs SET is_deleted = 1, is_active = 0, updated_at = ?2 WHERE id = ?1",
                params![existing.id, now_ms()],
            )?;
            recount_tags_of_blog(tx, existing.id)?;
            Ok(())
        })
    }

    pub fn get_blog_by_slug(&self, slug: &str, scope: Scope) -> StoreResult<Option<BlogRecord>> {
        self.db.with_conn(|conn| fetch_blog_by_slug(conn, slug, scope))
    }

    /// The base collection for list/search: every published, active post
    /// with joined category/author display fields, tag refs and the like
    /// count. Ordered newest first; one row per post.
    pub fn list_published(&self) -> StoreResult<Vec<BlogListItem>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT b.id, b.title, b.slug, b.excerpt, b.description,
                        c.title, c.slug, u.username, u.full_name,
                        b.meta_keywords, b.img, b.featured, b.views,
                        (SELECT COUNT(*) FROM likes l WHERE l.blog_id = b.id),
                        b.reading_time, b.created_at, b.published_at
                 FROM blogs b
                 JOIN categories c ON c.id = b.category_id
                 LEFT JOIN users u ON u.id = b.author_id
                 WHERE b.is_deleted = 0 AND b.is_active = 1 AND b.status = 'published'
                 ORDER BY b.created_at DESC",
            )?;
            let mut items = stmt
                .query_map([], row_to_list_item)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut tag_map: HashMap<i64, Vec<TagRef>> = HashMap::new();
            let mut tag_stmt = conn.prepare(
                "SELECT bt.blog_id, t.name, t.slug
                 FROM blog_tags bt JOIN tags t ON t.id = bt.tag_id
                 ORDER BY t.name",
            )?;
            let tag_rows = tag_stmt.query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    TagRef {
                        name: row.get(1)?,
                        slug: row.get(2)?,
                    },
                ))
            })?;
            for tag_row in tag_rows {
                let (blog_id, tag) = tag_row?;
                tag_map.entry(blog_id).or_default().push(tag);
            }

            for item in &mut items {
                if let Some(tags) = tag_map.remove(&item.id) {
                    item.tags = tags;
                }
            }
            Ok(items)
        })
    }

    /// The requesting author's own posts, drafts included. Pre-scoped to the
    /// author so other users' content can never leak through this path.
    pub fn list_by_author(&self, author_id: i64) -> StoreResult<Vec<BlogRecord>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{BLOG_SELECT} WHERE b.author_id = ?1 AND b.is_deleted = 0
                 ORDER BY b.created_at DESC"
            ))?;
            let rows = stmt.query_map(params![author_id], row_to_blog)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    /// Published posts from the same category, excluding the post itself.
    pub fn related_posts(&self, blog_id: i64, limit: usize) -> StoreResult<Vec<BlogRecord>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{BLOG_SELECT} WHERE b.category_id = (SELECT category_id FROM blogs WHERE id = ?1)
                   AND b.id != ?1 AND b.is_deleted = 0 AND b.is_active = 1
                   AND b.status = 'published'
                 ORDER BY b.created_at DESC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![blog_id, limit as i64], row_to_blog)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }
}

const CATEGORY_SELECT: &str = "SELECT c.id, c.title, c.slug, c.description, c.parent_id,
        c.sort_order, c.meta_description, c.meta_keywords, c.is_deleted, c.is_active,
        c.created_at, c.updated_at FROM categories c";

const TAG_SELECT: &str =
    "SELECT id, name, slug, description, color, usage_count, created_at FROM tags";

const BLOG_SELECT: &str = "SELECT b.id, b.title, b.slug, b.category_id, b.author_id,
        b.description, b.excerpt, b.img, b.status, b.views, b.featured, b.reading_time,
        b.published_at, b.meta_description, b.meta_keywords, b.is_deleted, b.is_active,
        b.created_at, b.updated_at FROM blogs b";

fn row_to_category(row: &Row<'_>) -> rusqlite::Result<CategoryRecord> {
    Ok(CategoryRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
        parent_id: row.get(4)?,
        sort_order: row.get(5)?,
        meta_description: row.get(6)?,
        meta_keywords: row.get(7)?,
        is_deleted: row.get(8)?,
        is_active: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn row_to_tag(row: &Row<'_>) -> rusqlite::Result<TagRecord> {
    Ok(TagRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
        color: row.get(4)?,
        usage_count: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn row_to_blog(row: &Row<'_>) -> rusqlite::Result<BlogRecord> {
    let status: String = row.get(8)?;
    let status = BlogStatus::parse(&status).map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            8,
            rusqlite::types::Type::Text,
            format!("unknown blog status: {status}").into(),
        )
    })?;
    Ok(BlogRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        category_id: row.get(3)?,
        author_id: row.get(4)?,
        description: row.get(5)?,
        excerpt: row.get(6)?,
        img: row.get(7)?,
        status,
        views: row.get(9)?,
        featured: row.get(10)?,
        reading_time: row.get(11)?,
        published_at: row.get(12)?,
        meta_description: row.get(13)?,
        meta_keywords: row.get(14)?,
        is_deleted: row.get(15)?,
        is_active: row.get(16)?,
        created_at: row.get(17)?,
        updated_at: row.get(18)?,
    })
}

fn row_to_list_item(row: &Row<'_>) -> rusqlite::Result<BlogListItem> {
    let excerpt: String = row.get(3)?;
    let description: String = row.get(4)?;
    let excerpt = if excerpt.is_empty() { derive_excerpt(&description) } else { excerpt };
    Ok(BlogListItem {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        excerpt,
        description,
        category_title: row.get(5)?,
        category_slug: row.get(6)?,
        tags: Vec::new(),
        author_username: row.get(7)?,
        author_full_name: row.get(8)?,
        meta_keywords: row.get(9)?,
        img: row.get(10)?,
        featured: row.get(11)?,
        views: row.get(12)?,
        like_count: row.get(13)?,
        reading_time: row.get(14)?,
        created_at: row.get(15)?,
        published_at: row.get(16)?,
    })
}

fn fetch_category(conn: &Connection, id: i64) -> StoreResult<Option<CategoryRecord>> {
    let category = conn
        .query_row(&format!("{CATEGORY_SELECT} WHERE c.id = ?1"), params![id], row_to_category)
        .optional()?;
    Ok(category)
}

fn fetch_tag(conn: &Connection, id: i64) -> StoreResult<Option<TagRecord>> {
    let tag = conn
        .query_row(&format!("{TAG_SELECT} WHERE id = ?1"), params![id], row_to_tag)
        .optional()?;
    Ok(tag)
}

fn fetch_blog(conn: &Connection, id: i64) -> StoreResult<Option<BlogRecord>> {
    let blog = conn
        .query_row(&format!("{BLOG_SELECT} WHERE b.id = ?1"), params![id], row_to_blog)
        .optional()?;
    Ok(blog)
}

fn fetch_blog_by_slug(
    conn: &Connection,
    slug: &str,
    scope: Scope,
) -> StoreResult<Option<BlogRecord>> {
    let sql = format!("{BLOG_SELECT} WHERE b.slug = ?1 AND {}", scope.predicate("b"));
    let blog = conn.query_row(&sql, params![slug], row_to_blog).optional()?;
    Ok(blog)
}

fn resolve_slug(explicit: Option<String>, title: &str) -> StoreResult<String> {
    let slug = match normalize_optional_text(explicit) {
        Some(slug) => slugify(&slug),
        None => slugify(title),
    };
    if slug.is_empty() {
        return Err(StoreError::invalid("title", "cannot derive a URL slug from this title"));
    }
    Ok(slug)
}

fn validate_blog_content(title: &str, description: &str, excerpt: &str) -> StoreResult<()> {
    let mut errors = Vec::new();
    if title.len() < TITLE_MIN_LEN || title.len() > TITLE_MAX_LEN {
        errors.push(FieldError::new(
            "title",
            format!("title must be {TITLE_MIN_LEN}-{TITLE_MAX_LEN} characters"),
        ));
    }
    if description.len() < BODY_MIN_LEN {
        errors.push(FieldError::new(
            "description",
            format!("content must be at least {BODY_MIN_LEN} characters"),
        ));
    }
    if excerpt.len() > EXCERPT_MAX_LEN {
        errors.push(FieldError::new(
            "excerpt",
            format!("excerpt cannot exceed {EXCERPT_MAX_LEN} characters"),
        ));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(StoreError::Validation(errors))
    }
}

fn ensure_category_exists(conn: &Connection, category_id: i64) -> StoreResult<()> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT id FROM categories WHERE id = ?1 AND is_deleted = 0 AND is_active = 1",
            params![category_id],
            |row| row.get(0),
        )
        .optional()?;
    if exists.is_none() {
        return Err(StoreError::invalid("category", "select a valid category"));
    }
    Ok(())
}

fn ensure_tags_exist(conn: &Connection, tag_ids: &[i64]) -> StoreResult<()> {
    for tag_id in tag_ids {
        let exists: Option<i64> = conn
            .query_row("SELECT id FROM tags WHERE id = ?1", params![tag_id], |row| row.get(0))
            .optional()?;
        if exists.is_none() {
            return Err(StoreError::invalid("tags", format!("unknown tag id {tag_id}")));
        }
    }
    Ok(())
}

fn replace_blog_tags(conn: &Connection, blog_id: i64, tag_ids: &[i64]) -> StoreResult<()> {
    for tag_id in tag_ids {
        conn.execute(
            "INSERT OR IGNORE INTO blog_tags (blog_id, tag_id) VALUES (?1, ?2)",
            params![blog_id, tag_id],
        )?;
    }
    recount_tags(conn, tag_ids)?;
    Ok(())
}

fn recount_tags(conn: &Connection, tag_ids: &[i64]) -> StoreResult<()> {
    for tag_id in tag_ids {
        conn.execute(
            "UPDATE tags SET usage_count = (
                 SELECT COUNT(*) FROM blog_tags bt
                 JOIN blogs b ON b.id = bt.blog_id
                 WHERE bt.tag_id = tags.id AND b.is_deleted = 0 AND b.is_active = 1
             ) WHERE id = ?1",
            params![tag_id],
        )?;
    }
    Ok(())
}

fn recount_tags_of_blog(conn: &Connection, blog_id: i64) -> StoreResult<()> {
    let mut stmt = conn.prepare("SELECT tag_id FROM blog_tags WHERE blog_id = ?1")?;
    let tag_ids = stmt
        .query_map(params![blog_id], |row| row.get::<_, i64>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    recount_tags(conn, &tag_ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stores() -> (Database, BlogStore) {
        let db = Database::open_in_memory().expect("db");
        (db.clone(), BlogStore::new(db))
    }

    fn category(store: &BlogStore, title: &str) -> CategoryRecord {
        store
            .create_category(NewCategoryInput {
                title: title.to_string(),
                slug: None,
                description: None,
                parent_id: None,
                sort_order: 0,
                meta_description: None,
                meta_keywords: None,
            })
            .expect("category")
    }

    fn blog_input(category_id: i64, title: &str, status: BlogStatus) -> NewBlogInput {
        NewBlogInput {
            title: title.to_string(),
            slug: None,
            category_id,
            author_id: None,
            description: "word ".repeat(60),
            excerpt: None,
            img: None,
            status,
            featured: false,
            tag_ids: Vec::new(),
            meta_description: None,
            meta_keywords: None,
        }
    }

    #[test]
    fn category_slug_is_derived_from_title() {
        let (_, store) = stores();
        let cat = category(&store, "Tech News");
        assert_eq!(cat.slug, "tech-news");
        assert!(cat.is_active);
        assert!(!cat.is_deleted);
    }

    #[test]
    fn blog_slug_is_derived_and_stable_across_updates() {
        let (db, store) = stores();
        let cat = category(&store, "Tech");
        let author = seed_author(&db);

        let mut input = blog_input(cat.id, "Hello World From Rust", BlogStatus::Draft);
        input.author_id = Some(author);
        let blog = store.create_blog(input).expect("create");
        assert_eq!(blog.slug, "hello-world-from-rust");

        let updated = store
            .update_blog(
                author,
                &blog.slug,
                BlogUpdateInput {
                    title: Some("A Completely Different Title".to_string()),
                    ..Default::default()
                },
            )
            .expect("update");
        assert_eq!(updated.slug, "hello-world-from-rust");
        assert_eq!(updated.title, "A Completely Different Title");
    }

    #[test]
    fn duplicate_blog_slug_is_a_validation_error() {
        let (_, store) = stores();
        let cat = category(&store, "Tech");
        store
            .create_blog(blog_input(cat.id, "Hello World Again", BlogStatus::Draft))
            .expect("first");
        let err = store
            .create_blog(blog_input(cat.id, "Hello World Again", BlogStatus::Draft))
            .expect_err("duplicate slug");
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn published_at_is_set_once_and_never_overwritten() {
        let (db, store) = stores();
        let cat = category(&store, "Tech");
        let author = seed_author(&db);

        let mut input = blog_input(cat.id, "Publishing Lifecycle Post", BlogStatus::Draft);
        input.author_id = Some(author);
        let blog = store.create_blog(input).expect("create");
        assert!(blog.published_at.is_none());

        let published = store
            .update_blog(
                author,
                &blog.slug,
                BlogUpdateInput {
                    status: Some(BlogStatus::Published),
                    ..Default::default()
                },
            )
            .expect("publish");
        let first_published_at = published.published_at.expect("published_at set");

        let archived = store
            .update_blog(
                author,
                &blog.slug,
                BlogUpdateInput {
                    status: Some(BlogStatus::Archived),
                    ..Default::default()
                },
            )
            .expect("archive");
        let republished = store
            .update_blog(
                author,
                &archived.slug,
                BlogUpdateInput {
                    status: Some(BlogStatus::Published),
                    ..Default::default()
                },
            )
            .expect("republish");
        assert_eq!(republished.published_at, Some(first_published_at));
    }

    #[test]
    fn update_by_non_author_is_denied() {
        let (db, store) = stores();
        let cat = category(&store, "Tech");
        let author = seed_author(&db);
        let mut input = blog_input(cat.id, "A Post Owned By Author", BlogStatus::Draft);
        input.author_id = Some(author);
        let blog = store.create_blog(input).expect("create");

        let err = store
            .update_blog(author + 1, &blog.slug, BlogUpdateInput::default())
            .expect_err("stranger edit");
        assert!(matches!(err, StoreError::PermissionDenied(_)));
    }

    #[test]
    fn reading_time_is_derived_from_word_count() {
        let (_, store) = stores();
        let cat = category(&store, "Tech");
        let mut input = blog_input(cat.id, "A Post With Many Words", BlogStatus::Draft);
        input.description = "word ".repeat(500);
        let blog = store.create_blog(input).expect("create");
        assert_eq!(blog.reading_time, 3);
    }

    #[test]
    fn get_excerpt_prefers_stored_and_derives_when_blank() {
        let (_, store) = stores();
        let cat = category(&store, "Tech");

        let mut input = blog_input(cat.id, "A Post With Custom Excerpt", BlogStatus::Draft);
        input.excerpt = Some("Hand-written summary.".to_string());
        let blog = store.create_blog(input).expect("create");
        assert_eq!(blog.get_excerpt(), "Hand-written summary.");

        let long_body = "word ".repeat(60);
        let blog = store
            .create_blog(blog_input(cat.id, "A Post Without An Excerpt", BlogStatus::Draft))
            .expect("create");
        let excerpt = blog.get_excerpt();
        assert!(excerpt.ends_with("..."));
        assert_eq!(excerpt.chars().count(), 203);
        assert!(long_body.starts_with(excerpt.trim_end_matches("...")));
    }

    #[test]
    fn tag_usage_recount_matches_join_table() {
        let (db, store) = stores();
        let cat = category(&store, "Tech");
        let tag = store
            .create_tag(NewTagInput {
                name: "rust".to_string(),
                slug: None,
                description: None,
                color: None,
            })
            .expect("tag");

        let mut input = blog_input(cat.id, "A Tagged Published Post", BlogStatus::Published);
        input.tag_ids = vec![tag.id];
        store.create_blog(input).expect("create");

        // Tamper with the stored counter, then reconcile.
        db.with_conn(|conn| {
            conn.execute("UPDATE tags SET usage_count = 99", [])?;
            Ok(())
        })
        .expect("tamper");
        store.recount_tag_usage().expect("recount");

        let tag = store.get_tag_by_slug("rust").expect("get").expect("exists");
        assert_eq!(tag.usage_count, 1);
    }

    #[test]
    fn list_published_excludes_drafts_and_carries_tags() {
        let (_, store) = stores();
        let cat = category(&store, "Tech");
        let tag = store
            .create_tag(NewTagInput {
                name: "rust".to_string(),
                slug: None,
                description: None,
                color: None,
            })
            .expect("tag");

        let mut published = blog_input(cat.id, "A Published Post Title", BlogStatus::Published);
        published.tag_ids = vec![tag.id];
        store.create_blog(published).expect("published");
        store
            .create_blog(blog_input(cat.id, "A Draft Post Title", BlogStatus::Draft))
            .expect("draft");

        let items = store.list_published().expect("list");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].category_slug, "tech");
        assert_eq!(items[0].tags, vec![TagRef {
            name: "rust".to_string(),
            slug: "rust".to_string()
        }]);
        assert!(!items[0].excerpt.is_empty());
    }

    fn seed_author(db: &Database) -> i64 {
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (email, username, password_digest, password_salt, date_joined)
                 VALUES ('author@example.com', 'author', 'x', 'y', 0)",
                [],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .expect("seed author")
    }
}
