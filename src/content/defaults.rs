//! 模型输出缺字段时使用的默认值，集中声明

use super::models::Cluster;

pub const MAX_TOPICS: usize = 10;

pub struct TopicDefaults {
    pub score: u8,
    pub reasoning: &'static str,
    pub cluster: Cluster,
    /// 标题缺失时为 "Topic {序号}"
    pub title_prefix: &'static str,
}

pub const TOPIC_DEFAULTS: TopicDefaults = TopicDefaults {
    score: 75,
    reasoning: "High-value content opportunity",
    cluster: Cluster::TechNews,
    title_prefix: "Topic",
};

pub struct ArticleDefaults {
    pub seo_score: u8,
    pub readability_level: &'static str,
    pub keyword_density: &'static str,
    pub optimization_log: &'static [&'static str],
    pub placeholder_sources: &'static [&'static str],
    pub meta_title_max_chars: usize,
    pub secondary_keyword_limit: usize,
}

pub const ARTICLE_DEFAULTS: ArticleDefaults = ArticleDefaults {
    seo_score: 92,
    readability_level: "Grade 7 (Conversational)",
    keyword_density: "1.2%",
    optimization_log: &[
        "Professional SEO template used",
        "Anti-AI phrase detection enabled",
        "Sentence variation enforced",
        "Benefit-driven headings required",
        "WIIFM title format enforced",
    ],
    placeholder_sources: &["https://trends.google.com", "https://www.statista.com"],
    meta_title_max_chars: 60,
    secondary_keyword_limit: 5,
};

pub fn default_meta_description(topic: &str, year: i32) -> String {
    format!("Complete guide to {}. Learn strategies and tips for {}.", topic, year)
}
