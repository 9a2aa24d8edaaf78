pub mod defaults;
pub mod fallback;
pub mod models;
pub mod normalize;
pub mod quality;
pub mod text;

pub use models::{BlogPost, BlogPostMeta, Cluster, Generated, SeoReport, Topic, TopicStatus};
pub use quality::QualityFlags;
pub use text::{extract_primary_keyword, generate_slug};

use chrono::Utc;
use tracing::{error, info, warn};

use crate::config::{GeneratorConfig, PromptConfig};
use crate::llm::{GeminiClient, GenerativeModel, RateLimitedExecutor, RetryPolicy};
use crate::parser::parse_json;
use crate::utils::GenerationError;
use models::InvalidTransition;

const UNTITLED_TOPIC: &str = "Untitled Topic";

/// 选题发现与文章生成
///
/// 对外两个方法都不会失败：模型调用、解析或校验出错时返回本地降级内容，
/// 并通过 [`Generated::Fallback`] 标明。
pub struct ContentService {
    model: Box<dyn GenerativeModel>,
    executor: RateLimitedExecutor,
    prompts: PromptConfig,
}

impl ContentService {
    pub fn new(model: Box<dyn GenerativeModel>, policy: RetryPolicy, prompts: PromptConfig) -> Self {
        Self {
            model,
            executor: RateLimitedExecutor::new(policy),
            prompts,
        }
    }

    pub fn from_config(config: &GeneratorConfig, prompts: PromptConfig) -> Result<Self, GenerationError> {
        let client = GeminiClient::new(config.clone())?;
        Ok(Self::new(Box::new(client), config.retry_policy(), prompts))
    }

    async fn ask(&self, prompt: &str) -> Result<String, GenerationError> {
        self.executor.run(|| self.model.generate(prompt)).await
    }

    pub async fn discover_topics(&self) -> Generated<Vec<Topic>> {
        info!("🔍 开始发现热门选题...");
        match self.try_discover_topics().await {
            Ok(topics) => {
                info!("✅ 发现 {} 个选题", topics.len());
                Generated::Fresh(topics)
            }
            Err(e) => {
                error!("❌ 选题发现失败: {}，使用备用选题", e);
                Generated::Fallback {
                    value: fallback::fallback_topics(),
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn try_discover_topics(&self) -> Result<Vec<Topic>, GenerationError> {
        let response = self.ask(self.prompts.discovery_prompt()).await?;
        let topics = normalize::normalize_topics(&parse_json(&response)?)?;

        if topics.is_empty() {
            return Err(GenerationError::Validation("选题列表为空".to_string()));
        }

        log_topic_mix(&topics);
        Ok(topics)
    }

    pub async fn generate_blog_post(&self, topic_title: &str, word_count: usize) -> Generated<BlogPost> {
        let topic_title = topic_title.trim();
        if topic_title.is_empty() {
            warn!("选题标题为空，直接使用兜底文章");
            return Generated::Fallback {
                value: fallback::fallback_article(UNTITLED_TOPIC, Utc::now()),
                reason: "empty topic title".to_string(),
            };
        }

        info!("🚀 生成文章: {} (目标 {} 词)", topic_title, word_count);
        match self.try_generate_blog_post(topic_title, word_count).await {
            Ok(post) => {
                info!(
                    "✅ 文章生成完成: {} ({} 词, 主关键词: {})",
                    post.title, post.seo_report.word_count_actual, post.meta.primary_keyword
                );
                Generated::Fresh(post)
            }
            Err(e) => {
                error!("❌ 文章生成失败: {}，使用兜底模板", e);
                Generated::Fallback {
                    value: fallback::fallback_article(topic_title, Utc::now()),
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn try_generate_blog_post(
        &self,
        topic_title: &str,
        word_count: usize,
    ) -> Result<BlogPost, GenerationError> {
        let prompt = self.prompts.generation_prompt(topic_title, word_count);
        let response = self.ask(&prompt).await?;
        info!("📝 已收到模型响应，开始解析");

        let raw = normalize::parse_article(parse_json(&response)?)?;
        let post = normalize::build_article(raw, topic_title, Utc::now());

        let actual = post.seo_report.word_count_actual;
        if (actual as f64) < word_count as f64 * 0.85 {
            warn!("⚠️ 字数低于目标: {}/{}", actual, word_count);
        }
        Ok(post)
    }

    /// 驱动选题状态：pending/failed → generating → completed（降级内容记为 failed，文章仍挂上）
    pub async fn generate_for_topic(
        &self,
        topic: &mut Topic,
        word_count: usize,
    ) -> Result<Generated<BlogPost>, InvalidTransition> {
        topic.transition(TopicStatus::Generating)?;

        let mut generated = self.generate_blog_post(&topic.title, word_count).await;
        let post = match &mut generated {
            Generated::Fresh(post) | Generated::Fallback { value: post, .. } => post,
        };
        post.topic_id = topic.id.clone();

        let next = if generated.is_fallback() {
            TopicStatus::Failed
        } else {
            TopicStatus::Completed
        };
        topic.transition(next)?;
        topic.blog_post = Some(generated.value().clone());
        topic.generated_at = Some(Utc::now());

        Ok(generated)
    }
}

fn log_topic_mix(topics: &[Topic]) {
    let shopify = topics
        .iter()
        .filter(|t| t.cluster == Cluster::ShopifySolutions)
        .count();
    let tech = topics.iter().filter(|t| t.cluster == Cluster::TechNews).count();

    info!("📊 选题分布: {} Shopify, {} Tech", shopify, tech);
    if shopify < 3 || tech < 6 {
        warn!("⚠️ 选题分布不理想，期望 4 Shopify / 6 Tech，实际 {} / {}", shopify, tech);
    }
}
