use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::quality::QualityFlags;

/// 选题分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cluster {
    #[serde(rename = "Shopify Solutions")]
    ShopifySolutions,
    #[serde(rename = "Tech News")]
    TechNews,
}

impl Cluster {
    pub fn label(&self) -> &'static str {
        match self {
            Cluster::ShopifySolutions => "Shopify Solutions",
            Cluster::TechNews => "Tech News",
        }
    }

    /// 宽松匹配模型给出的分类名
    pub fn from_label(label: &str) -> Option<Self> {
        let lower = label.to_lowercase();
        if lower.contains("shopify") || lower.contains("commerce") {
            Some(Cluster::ShopifySolutions)
        } else if lower.contains("tech") {
            Some(Cluster::TechNews)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicStatus {
    Pending,
    Generating,
    Completed,
    Failed,
}

impl TopicStatus {
    /// pending→generating→{completed|failed}，以及手动重试 failed→generating
    pub fn can_transition_to(self, next: TopicStatus) -> bool {
        use TopicStatus::*;
        matches!(
            (self, next),
            (Pending, Generating) | (Generating, Completed) | (Generating, Failed) | (Failed, Generating)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub title: String,
    pub score: u8,
    pub reasoning: String,
    pub cluster: Cluster,
    pub keywords: Vec<String>,
    pub status: TopicStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blog_post: Option<BlogPost>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
}

impl Topic {
    pub fn transition(&mut self, next: TopicStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition { from: self.status, to: next });
        }
        self.status = next;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("选题状态不能从 {from:?} 变为 {to:?}")]
pub struct InvalidTransition {
    pub from: TopicStatus,
    pub to: TopicStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogPostMeta {
    pub meta_title: String,
    pub meta_description: String,
    pub primary_keyword: String,
    #[serde(default)]
    pub secondary_keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeoReport {
    pub score: u8,
    pub readability_level: String,
    pub keyword_density: String,
    /// 始终由本地根据 content_html 重新计算
    pub word_count_actual: usize,
    #[serde(default)]
    pub optimization_log: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogPost {
    pub title: String,
    pub slug: String,
    pub content_html: String,
    #[serde(default)]
    pub featured_image_prompt: String,
    #[serde(default)]
    pub inline_image_prompts: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub meta: BlogPostMeta,
    pub seo_report: SeoReport,
    pub quality_flags: QualityFlags,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "topicId")]
    pub topic_id: String,
    /// 发布成功后由 CMS 适配层写入
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_post_id: Option<u64>,
}

/// 服务边界上的结果：真实生成或本地降级，调用方可以区分
#[derive(Debug, Clone, PartialEq)]
pub enum Generated<T> {
    Fresh(T),
    Fallback { value: T, reason: String },
}

impl<T> Generated<T> {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Generated::Fallback { .. })
    }

    pub fn value(&self) -> &T {
        match self {
            Generated::Fresh(value) | Generated::Fallback { value, .. } => value,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Generated::Fresh(value) | Generated::Fallback { value, .. } => value,
        }
    }

    pub fn fallback_reason(&self) -> Option<&str> {
        match self {
            Generated::Fresh(_) => None,
            Generated::Fallback { reason, .. } => Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic() -> Topic {
        Topic {
            id: "topic-1".into(),
            title: "T".into(),
            score: 50,
            reasoning: String::new(),
            cluster: Cluster::TechNews,
            keywords: vec![],
            status: TopicStatus::Pending,
            blog_post: None,
            generated_at: None,
        }
    }

    #[test]
    fn lifecycle_allows_retry_after_failure() {
        let mut t = topic();
        t.transition(TopicStatus::Generating).unwrap();
        t.transition(TopicStatus::Failed).unwrap();
        t.transition(TopicStatus::Generating).unwrap();
        t.transition(TopicStatus::Completed).unwrap();
        assert_eq!(t.status, TopicStatus::Completed);
    }

    #[test]
    fn lifecycle_rejects_skipping_generation() {
        let mut t = topic();
        let err = t.transition(TopicStatus::Completed).unwrap_err();
        assert_eq!(err.from, TopicStatus::Pending);
        assert_eq!(t.status, TopicStatus::Pending);

        t.transition(TopicStatus::Generating).unwrap();
        t.transition(TopicStatus::Completed).unwrap();
        assert!(t.transition(TopicStatus::Generating).is_err());
    }

    #[test]
    fn cluster_labels_match_loosely() {
        assert_eq!(Cluster::from_label("Shopify Solutions"), Some(Cluster::ShopifySolutions));
        assert_eq!(Cluster::from_label("tech news & AI"), Some(Cluster::TechNews));
        assert_eq!(Cluster::from_label("Gardening"), None);
        assert_eq!(serde_json::to_string(&Cluster::TechNews).unwrap(), "\"Tech News\"");
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&TopicStatus::Pending).unwrap(), "\"pending\"");
    }
}
