use std::sync::OnceLock;

use regex::Regex;

struct Patterns {
    strong_stars: Regex,
    strong_underscores: Regex,
    em_stars: Regex,
    em_underscores: Regex,
    blank_runs: Regex,
    tags: Regex,
    article_open: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        strong_stars: Regex::new(r"\*\*(.+?)\*\*").unwrap(),
        strong_underscores: Regex::new(r"(^|[\s>(])__([^_<>\n]+?)__").unwrap(),
        em_stars: Regex::new(r"\*([^*\n]+?)\*").unwrap(),
        em_underscores: Regex::new(r"(^|[\s>(])_([^_<>\n]+?)_").unwrap(),
        blank_runs: Regex::new(r"\n{3,}").unwrap(),
        tags: Regex::new(r"<[^>]*>").unwrap(),
        article_open: Regex::new(r"(?i)<article\b[^>]*>").unwrap(),
    })
}

/// 把模型夹带的 Markdown 强调语法转成 HTML 标签，并压缩多余空行
///
/// 下划线形式只在词边界生效，避免破坏属性值和 URL 里的下划线。
pub fn clean_html(html: &str) -> String {
    let p = patterns();
    let html = p.strong_stars.replace_all(html, "<strong>$1</strong>");
    let html = p.strong_underscores.replace_all(&html, "$1<strong>$2</strong>");
    let html = p.em_stars.replace_all(&html, "<em>$1</em>");
    let html = p.em_underscores.replace_all(&html, "$1<em>$2</em>");
    let html = p.blank_runs.replace_all(&html, "\n\n");
    html.trim().to_string()
}

/// 保证存在 `<article>` 根元素和至少一个 `<h1>`
pub fn ensure_structure(html: &str, title: &str) -> String {
    let p = patterns();
    let mut html = if p.article_open.is_match(html) {
        html.to_string()
    } else {
        format!("<article>\n{}\n</article>", html)
    };

    if !html.to_lowercase().contains("<h1") {
        if let Some(open) = p.article_open.find(&html) {
            let heading = format!("\n<h1>{}</h1>\n", escape_html(title));
            html.insert_str(open.end(), &heading);
        }
    }

    html
}

/// 去掉所有标签，标签位置替换为空格
pub fn strip_tags(html: &str) -> String {
    patterns().tags.replace_all(html, " ").into_owned()
}

/// 去标签后按空白切分计数
pub fn count_words(html: &str) -> usize {
    strip_tags(html).split_whitespace().count()
}

pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
