const STOP_WORDS: &[&str] = &["the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for"];

pub const SLUG_MAX_LEN: usize = 60;

/// 标题 → 主关键词：小写、去标点、去停用词和过短词，取前 3 个词
pub fn extract_primary_keyword(title: &str) -> String {
    let cleaned: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace())
        .collect();

    cleaned
        .split_whitespace()
        .filter(|w| w.len() > 2 && !STOP_WORDS.contains(w))
        .take(3)
        .collect::<Vec<_>>()
        .join(" ")
}

/// 标题 → URL slug：只含小写字母数字和单个连字符，最长 60，幂等
pub fn generate_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    slug.truncate(SLUG_MAX_LEN);
    slug.trim_end_matches('-').to_string()
}

/// 按字符截断
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
