//! Text helpers: slugs, excerpts, reading time, input normalization.

const EXCERPT_CHAR_LIMIT: usize = 200;
const WORDS_PER_MINUTE: f64 = 200.0;

/// URL-safe slug derived from a human title.
pub fn slugify(input: &str) -> String {
    slug::slugify(input)
}

/// Trims and drops empty optional inputs.
pub fn normalize_optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
}

/// First 200 characters of the markdown-stripped body plus an ellipsis,
/// or the whole stripped body when it is short enough.
pub fn derive_excerpt(body: &str) -> String {
    let stripped: String = body.chars().filter(|ch| !matches!(ch, '#' | '*' | '`')).collect();
    if stripped.chars().count() > EXCERPT_CHAR_LIMIT {
        let head: String = stripped.chars().take(EXCERPT_CHAR_LIMIT).collect();
        format!("{head}...")
    } else {
        stripped
    }
}

/// Estimated minutes to read the body at ~200 words per minute, never
/// reported as zero.
pub fn reading_time_minutes(body: &str) -> i64 {
    let stripped: String = body
        .chars()
        .filter(|ch| !matches!(ch, '#' | '*' | '`' | '[' | ']' | '(' | ')'))
        .collect();
    let word_count = stripped.split_whitespace().count();
    let minutes = (word_count as f64 / WORDS_PER_MINUTE).round() as i64;
    minutes.max(1)
}

/// Removes `<...>` tag markup. Comments are plain text; anything that
/// looks like markup is dropped before validation.
pub fn strip_html_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for ch in input.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            ch if !in_tag => out.push(ch),
            _ => {},
        }
    }
    out
}

/// Minimal shape check: one `@`, non-empty local part and a dot-separated
/// domain, no whitespace.
pub fn is_valid_email(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && tld.len() >= 2,
        None => false,
    }
}

/// `YYYY-MM-DD` calendar date check for birth dates and filter bounds.
pub fn parse_date(value: &str) -> Option<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}
