//! 把模型输出的松散 JSON 统一整理成 Topic / BlogPost
//!
//! 选题逐条降级：缺什么补什么，不整条丢弃。
//! 文章只有 title 与 content_html 是硬性要求，缺失即报错走降级路径。

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use uuid::Uuid;

use super::defaults::{default_meta_description, ARTICLE_DEFAULTS, MAX_TOPICS, TOPIC_DEFAULTS};
use super::models::{BlogPost, BlogPostMeta, Cluster, SeoReport, Topic, TopicStatus};
use super::quality::QualityFlags;
use super::text::{extract_primary_keyword, generate_slug, truncate_chars};
use crate::parser::html::{clean_html, count_words, ensure_structure};
use crate::utils::GenerationError;

pub fn new_topic_id() -> String {
    format!("topic-{}", Uuid::new_v4())
}

/// 选题列表：必须是数组，最多保留 10 条
pub fn normalize_topics(value: &Value) -> Result<Vec<Topic>, GenerationError> {
    let items = value
        .as_array()
        .ok_or_else(|| GenerationError::Validation("选题结果不是数组".to_string()))?;

    Ok(items
        .iter()
        .take(MAX_TOPICS)
        .enumerate()
        .map(|(i, item)| normalize_topic(i, item))
        .collect())
}

pub fn normalize_topic(index: usize, item: &Value) -> Topic {
    let title = non_empty_str(item.get("title"))
        .unwrap_or_else(|| format!("{} {}", TOPIC_DEFAULTS.title_prefix, index + 1));

    let reasoning = non_empty_str(item.get("reasoning"))
        .unwrap_or_else(|| TOPIC_DEFAULTS.reasoning.to_string());

    let cluster = item
        .get("cluster")
        .and_then(Value::as_str)
        .and_then(Cluster::from_label)
        .unwrap_or(TOPIC_DEFAULTS.cluster);

    Topic {
        id: new_topic_id(),
        title,
        score: item.get("score").and_then(score_from).unwrap_or(TOPIC_DEFAULTS.score),
        reasoning,
        cluster,
        keywords: item.get("keywords").map(string_list).unwrap_or_default(),
        status: TopicStatus::Pending,
        blog_post: None,
        generated_at: None,
    }
}

/// 数字或数字字符串，四舍五入后夹到 1..=100；0 与非法值视为缺失
fn score_from(value: &Value) -> Option<u8> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !raw.is_finite() || raw <= 0.0 {
        return None;
    }
    Some(raw.round().clamp(1.0, 100.0) as u8)
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(string_list(&Value::deserialize(deserializer)?))
}

/// 模型返回的文章，字段一律可缺省
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawArticle {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content_html: Option<String>,
    pub featured_image_prompt: Option<String>,
    #[serde(deserialize_with = "lenient_strings")]
    pub inline_image_prompts: Vec<String>,
    #[serde(deserialize_with = "lenient_strings")]
    pub tags: Vec<String>,
    pub meta: Option<RawMeta>,
    pub seo_report: Option<RawSeoReport>,
    #[serde(deserialize_with = "lenient_strings")]
    pub sources: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawMeta {
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub primary_keyword: Option<String>,
    #[serde(deserialize_with = "lenient_strings")]
    pub secondary_keywords: Vec<String>,
}

/// word_count_actual 故意不读取
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawSeoReport {
    pub score: Option<Value>,
    pub readability_level: Option<String>,
    pub keyword_density: Option<Value>,
    #[serde(deserialize_with = "lenient_strings")]
    pub optimization_log: Vec<String>,
}

/// 解析并校验必填字段
pub fn parse_article(value: Value) -> Result<RawArticle, GenerationError> {
    if !value.is_object() {
        return Err(GenerationError::Validation("文章结果不是对象".to_string()));
    }
    let raw: RawArticle = serde_json::from_value(value)?;

    let has = |field: &Option<String>| field.as_deref().map(str::trim).is_some_and(|s| !s.is_empty());
    if !has(&raw.title) || !has(&raw.content_html) {
        return Err(GenerationError::Validation(
            "缺少必填字段: title 或 content_html".to_string(),
        ));
    }
    Ok(raw)
}

/// 成功路径与降级路径共用的整理步骤
pub fn build_article(raw: RawArticle, topic_title: &str, now: DateTime<Utc>) -> BlogPost {
    let title = raw
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| topic_title.to_string());

    let content_html = clean_html(raw.content_html.as_deref().unwrap_or_default());
    let content_html = ensure_structure(&content_html, &title);
    let word_count = count_words(&content_html);

    let slug = raw
        .slug
        .as_deref()
        .map(generate_slug)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| generate_slug(&title));

    let tags: Vec<String> = raw
        .tags
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    let meta = build_meta(raw.meta, &title, topic_title, &tags, now.year());
    let seo_report = build_seo_report(raw.seo_report, word_count);
    let quality_flags = QualityFlags::evaluate(&title, &content_html);

    let sources = if raw.sources.is_empty() {
        ARTICLE_DEFAULTS
            .placeholder_sources
            .iter()
            .map(|s| s.to_string())
            .collect()
    } else {
        raw.sources
    };

    BlogPost {
        title,
        slug,
        content_html,
        featured_image_prompt: raw.featured_image_prompt.unwrap_or_default(),
        inline_image_prompts: raw.inline_image_prompts,
        tags,
        meta,
        seo_report,
        quality_flags,
        sources,
        created_at: now,
        topic_id: new_topic_id(),
        remote_post_id: None,
    }
}

fn build_meta(
    raw: Option<RawMeta>,
    title: &str,
    topic_title: &str,
    tags: &[String],
    year: i32,
) -> BlogPostMeta {
    let raw = raw.unwrap_or_default();
    let filled = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

    BlogPostMeta {
        meta_title: filled(raw.meta_title)
            .unwrap_or_else(|| truncate_chars(title, ARTICLE_DEFAULTS.meta_title_max_chars)),
        meta_description: filled(raw.meta_description)
            .unwrap_or_else(|| default_meta_description(topic_title, year)),
        primary_keyword: filled(raw.primary_keyword)
            .unwrap_or_else(|| extract_primary_keyword(topic_title)),
        secondary_keywords: if raw.secondary_keywords.is_empty() {
            tags.iter()
                .take(ARTICLE_DEFAULTS.secondary_keyword_limit)
                .cloned()
                .collect()
        } else {
            raw.secondary_keywords
        },
    }
}

fn build_seo_report(raw: Option<RawSeoReport>, word_count: usize) -> SeoReport {
    let Some(raw) = raw else {
        return SeoReport {
            score: ARTICLE_DEFAULTS.seo_score,
            readability_level: ARTICLE_DEFAULTS.readability_level.to_string(),
            keyword_density: ARTICLE_DEFAULTS.keyword_density.to_string(),
            word_count_actual: word_count,
            optimization_log: ARTICLE_DEFAULTS
                .optimization_log
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };
    };

    SeoReport {
        score: raw.score.as_ref().and_then(score_from).unwrap_or(ARTICLE_DEFAULTS.seo_score),
        readability_level: raw
            .readability_level
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| ARTICLE_DEFAULTS.readability_level.to_string()),
        keyword_density: match raw.keyword_density {
            Some(Value::String(s)) if !s.trim().is_empty() => s,
            Some(Value::Number(n)) => format!("{}%", n),
            _ => ARTICLE_DEFAULTS.keyword_density.to_string(),
        },
        word_count_actual: word_count,
        optimization_log: raw.optimization_log,
    }
}
