//! The list/search helper: narrows and orders a base collection of
//! published posts from free-form request parameters. Pure — no storage
//! access, no side effects.

use std::collections::HashSet;

use serde::Deserialize;

use crate::models::BlogListItem;
use crate::text::parse_date;

/// Raw request parameters. Every axis is optional and combines with the
/// others under AND semantics; malformed values disable their axis instead
/// of erroring.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlogQueryParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
    #[serde(default)]
    pub reading_time_min: Option<String>,
    #[serde(default)]
    pub reading_time_max: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlogSort {
    Newest,
    Oldest,
    Popular,
    Trending,
    ReadingTime,
    Alphabetical,
}

impl BlogSort {
    /// Unrecognized or absent values fall back to newest-first.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("oldest") => BlogSort::Oldest,
            Some("popular") => BlogSort::Popular,
            Some("trending") => BlogSort::Trending,
            Some("reading_time") => BlogSort::ReadingTime,
            Some("alphabetical") => BlogSort::Alphabetical,
            _ => BlogSort::Newest,
        }
    }
}

/// Filters and orders the base collection. Guarantees no duplicate posts in
/// the output even if an upstream join produced them.
pub fn filter_and_sort(items: Vec<BlogListItem>, params: &BlogQueryParams) -> Vec<BlogListItem> {
    let mut items = items;

    if let Some(q) = trimmed(&params.q) {
        let needle = q.to_lowercase();
        items.retain(|item| matches_query(item, &needle));
    }
    if let Some(category) = trimmed(&params.category) {
        items.retain(|item| item.category_slug == category);
    }
    if let Some(tag) = trimmed(&params.tag) {
        items.retain(|item| item.tags.iter().any(|t| t.slug == tag));
    }
    if let Some(author) = trimmed(&params.author) {
        items.retain(|item| item.author_username.as_deref() == Some(author.as_str()));
    }
    if let Some(from_ms) = params.date_from.as_deref().and_then(day_start_ms) {
        items.retain(|item| item.created_at >= from_ms);
    }
    if let Some(end_ms) = params.date_to.as_deref().and_then(day_end_exclusive_ms) {
        items.retain(|item| item.created_at < end_ms);
    }
    if let Some(min) = parse_int(&params.reading_time_min) {
        items.retain(|item| item.reading_time >= min);
    }
    if let Some(max) = parse_int(&params.reading_time_max) {
        items.retain(|item| item.reading_time <= max);
    }

    let mut seen = HashSet::new();
    items.retain(|item| seen.insert(item.id));

    // All sorts are stable, so ties keep the base newest-first order.
    match BlogSort::parse(params.sort.as_deref()) {
        BlogSort::Newest => items.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        BlogSort::Oldest => items.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        BlogSort::Popular => items.sort_by(|a, b| b.views.cmp(&a.views)),
        BlogSort::Trending => items.sort_by(|a, b| {
            b.like_count
                .cmp(&a.like_count)
                .then(b.views.cmp(&a.views))
        }),
        BlogSort::ReadingTime => items.sort_by(|a, b| b.reading_time.cmp(&a.reading_time)),
        BlogSort::Alphabetical => items.sort_by_key(|item| item.title.to_lowercase()),
    }

    items
}

fn matches_query(item: &BlogListItem, needle: &str) -> bool {
    let haystacks = [
        &item.title,
        &item.description,
        &item.excerpt,
        &item.category_title,
        &item.meta_keywords,
    ];
    if haystacks
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
    {
        return true;
    }
    if item
        .tags
        .iter()
        .any(|tag| tag.name.to_lowercase().contains(needle))
    {
        return true;
    }
    [&item.author_username, &item.author_full_name]
        .iter()
        .any(|field| {
            field
                .as_deref()
                .map(|value| value.to_lowercase().contains(needle))
                .unwrap_or(false)
        })
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

fn parse_int(value: &Option<String>) -> Option<i64> {
    value.as_deref().and_then(|value| value.trim().parse().ok())
}

fn day_start_ms(value: &str) -> Option<i64> {
    let date = parse_date(value)?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis())
}

/// Start of the day after `value`, making the `date_to` bound inclusive.
fn day_end_exclusive_ms(value: &str) -> Option<i64> {
    let date = parse_date(value)?.succ_opt()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TagRef;

    fn item(id: i64, title: &str) -> BlogListItem {
        BlogListItem {
            id,
            title: title.to_string(),
            slug: crate::text::slugify(title),
            excerpt: String::new(),
            description: "body text".to_string(),
            category_title: "Tech".to_string(),
            category_slug: "tech".to_string(),
            tags: Vec::new(),
            author_username: Some("ada".to_string()),
            author_full_name: Some("Ada Lovelace".to_string()),
            meta_keywords: String::new(),
            img: None,
            featured: false,
            views: 0,
            like_count: 0,
            reading_time: 1,
            created_at: id * 1_000,
            published_at: Some(id * 1_000),
        }
    }

    fn params() -> BlogQueryParams {
        BlogQueryParams::default()
    }

    #[test]
    fn empty_query_is_no_filter() {
        let items = vec![item(1, "First Post"), item(2, "Second Post")];
        let mut p = params();
        p.q = Some("   ".to_string());
        assert_eq!(filter_and_sort(items, &p).len(), 2);
    }

    #[test]
    fn query_matches_across_fields_case_insensitively() {
        let mut a = item(1, "Intro to Rust");
        a.tags = vec![TagRef {
            name: "WebAssembly".to_string(),
            slug: "webassembly".to_string(),
        }];
        let mut b = item(2, "Gardening Notes");
        b.author_username = Some("grace".to_string());
        b.author_full_name = Some("Grace Hopper".to_string());
        let c = item(3, "Unrelated");

        let mut p = params();
        p.q = Some("rust".to_string());
        let hits = filter_and_sort(vec![a.clone(), b.clone(), c.clone()], &p);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);

        p.q = Some("WEBASSEMBLY".to_string());
        assert_eq!(filter_and_sort(vec![a.clone(), b.clone(), c.clone()], &p).len(), 1);

        p.q = Some("hopper".to_string());
        let hits = filter_and_sort(vec![a, b, c], &p);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 2);
    }

    #[test]
    fn filters_combine_with_and_semantics() {
        let mut a = item(1, "Rust Post");
        a.tags = vec![TagRef {
            name: "rust".to_string(),
            slug: "rust".to_string(),
        }];
        let mut b = item(2, "Rust But Other Author");
        b.tags = a.tags.clone();
        b.author_username = Some("grace".to_string());

        let mut p = params();
        p.tag = Some("rust".to_string());
        p.author = Some("ada".to_string());
        let hits = filter_and_sort(vec![a, b], &p);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);
    }

    #[test]
    fn malformed_dates_are_ignored_not_errors() {
        let items = vec![item(1, "First"), item(2, "Second")];
        let mut p = params();
        p.date_from = Some("not-a-date".to_string());
        p.date_to = Some("2024-13-45".to_string());
        assert_eq!(filter_and_sort(items, &p).len(), 2);
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let day_ms = 24 * 60 * 60 * 1_000;
        let mut a = item(1, "On The Boundary");
        a.created_at = 19_723 * day_ms; // 2024-01-01T00:00:00Z
        let mut b = item(2, "The Day After");
        b.created_at = 19_724 * day_ms + 1;

        let mut p = params();
        p.date_from = Some("2024-01-01".to_string());
        p.date_to = Some("2024-01-01".to_string());
        let hits = filter_and_sort(vec![a, b], &p);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);
    }

    #[test]
    fn non_numeric_reading_time_bounds_are_ignored() {
        let items = vec![item(1, "First"), item(2, "Second")];
        let mut p = params();
        p.reading_time_min = Some("soon".to_string());
        p.reading_time_max = Some("later".to_string());
        assert_eq!(filter_and_sort(items, &p).len(), 2);
    }

    #[test]
    fn reading_time_bounds_are_inclusive() {
        let mut a = item(1, "Short");
        a.reading_time = 2;
        let mut b = item(2, "Medium");
        b.reading_time = 5;
        let mut c = item(3, "Long");
        c.reading_time = 9;

        let mut p = params();
        p.reading_time_min = Some("2".to_string());
        p.reading_time_max = Some("5".to_string());
        let hits = filter_and_sort(vec![a, b, c], &p);
        assert_eq!(hits.iter().map(|i| i.id).collect::<Vec<_>>(), vec![2, 1]);
    }

    #[test]
    fn popular_sort_is_non_increasing_by_views() {
        let mut a = item(1, "A");
        a.views = 5;
        let mut b = item(2, "B");
        b.views = 50;
        let mut c = item(3, "C");
        c.views = 20;

        let mut p = params();
        p.sort = Some("popular".to_string());
        let sorted = filter_and_sort(vec![a, b, c], &p);
        let views: Vec<_> = sorted.iter().map(|i| i.views).collect();
        assert!(views.windows(2).all(|pair| pair[0] >= pair[1]));
    }

    #[test]
    fn trending_sort_breaks_like_ties_on_views() {
        let mut a = item(1, "A");
        a.like_count = 3;
        a.views = 10;
        let mut b = item(2, "B");
        b.like_count = 3;
        b.views = 90;
        let mut c = item(3, "C");
        c.like_count = 7;
        c.views = 1;

        let mut p = params();
        p.sort = Some("trending".to_string());
        let sorted = filter_and_sort(vec![a, b, c], &p);
        assert_eq!(sorted.iter().map(|i| i.id).collect::<Vec<_>>(), vec![3, 2, 1]);
    }

    #[test]
    fn alphabetical_sort_is_case_insensitive_ascending() {
        let items = vec![item(1, "banana"), item(2, "Apple"), item(3, "cherry")];
        let mut p = params();
        p.sort = Some("alphabetical".to_string());
        let sorted = filter_and_sort(items, &p);
        let titles: Vec<_> = sorted.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Apple", "banana", "cherry"]);
    }

    #[test]
    fn unknown_sort_defaults_to_newest() {
        let items = vec![item(1, "Older"), item(2, "Newer")];
        let mut p = params();
        p.sort = Some("definitely-not-a-sort".to_string());
        let sorted = filter_and_sort(items, &p);
        assert_eq!(sorted[0].id, 2);
    }

    #[test]
    fn duplicates_from_upstream_joins_are_removed() {
        let items = vec![item(1, "Doubled"), item(1, "Doubled"), item(2, "Single")];
        let hits = filter_and_sort(items, &params());
        assert_eq!(hits.len(), 2);
    }
}
