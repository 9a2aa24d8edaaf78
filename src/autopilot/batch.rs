use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::cms::Publisher;
use crate::config::AppConfig;
use crate::content::{ContentService, Topic};

const FALLBACK_NOT_PUBLISHED: &str = "generation fell back to template content";

#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub topics_per_run: usize,
    pub word_count: usize,
    /// 发布时间 HH:MM（UTC，次日）
    pub publish_time: String,
    pub publish_delay: Duration,
    /// 是否发布降级模板内容
    pub publish_fallback: bool,
}

impl BatchSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            topics_per_run: config.autopilot.topics_per_run,
            word_count: config.content.target_word_count,
            publish_time: config.content.publish_time.clone(),
            publish_delay: Duration::from_millis(config.autopilot.publish_delay_ms),
            publish_fallback: config.autopilot.publish_fallback,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
    Published { post_id: u64, url: String },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemResult {
    pub topic_id: String,
    pub title: String,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

impl ItemResult {
    pub fn is_published(&self) -> bool {
        matches!(self.outcome, ItemOutcome::Published { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// 选题来自本地备用列表
    pub fallback_topics: bool,
    pub items: Vec<ItemResult>,
}

impl BatchReport {
    pub fn published(&self) -> usize {
        self.items.iter().filter(|item| item.is_published()).count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.published()
    }
}

/// 一次 AutoPilot 批次：发现选题，按分数取前 N 个，逐个生成并发布
pub struct BatchRunner {
    content: Arc<ContentService>,
    publisher: Arc<dyn Publisher>,
    settings: BatchSettings,
    in_flight: Mutex<()>,
}

impl BatchRunner {
    pub fn new(content: Arc<ContentService>, publisher: Arc<dyn Publisher>, settings: BatchSettings) -> Self {
        Self {
            content,
            publisher,
            settings,
            in_flight: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    /// 单条失败只记录在结果里，不影响后续选题；重叠触发会排队执行
    pub async fn run(&self) -> BatchReport {
        let _guard = self.in_flight.lock().await;
        let started_at = Utc::now();
        info!("🚀 AutoPilot 批次开始");

        let discovered = self.content.discover_topics().await;
        let fallback_topics = discovered.is_fallback();
        if fallback_topics {
            warn!("⚠️ 本批次使用备用选题");
        }

        let topics = select_topics(discovered.into_inner(), self.settings.topics_per_run);
        let mut items = Vec::with_capacity(topics.len());

        for (index, topic) in topics.into_iter().enumerate() {
            if index > 0 && !self.settings.publish_delay.is_zero() {
                tokio::time::sleep(self.settings.publish_delay).await;
            }

            let result = self.process(topic).await;
            match &result.outcome {
                ItemOutcome::Published { post_id, .. } => {
                    info!("✅ [{}] {} -> post {}", index + 1, result.title, post_id)
                }
                ItemOutcome::Failed { error } => {
                    error!("❌ [{}] {} 失败: {}", index + 1, result.title, error)
                }
            }
            items.push(result);
        }

        let report = BatchReport {
            started_at,
            finished_at: Utc::now(),
            fallback_topics,
            items,
        };
        info!(
            "AutoPilot 批次结束: 成功 {}，失败 {}",
            report.published(),
            report.failed()
        );
        report
    }

    async fn process(&self, mut topic: Topic) -> ItemResult {
        let failed = |topic: &Topic, error: String| ItemResult {
            topic_id: topic.id.clone(),
            title: topic.title.clone(),
            outcome: ItemOutcome::Failed { error },
        };

        let generated = match self
            .content
            .generate_for_topic(&mut topic, self.settings.word_count)
            .await
        {
            Ok(generated) => generated,
            Err(e) => return failed(&topic, e.to_string()),
        };

        if let Some(reason) = generated.fallback_reason() {
            if !self.settings.publish_fallback {
                return failed(&topic, format!("{}: {}", FALLBACK_NOT_PUBLISHED, reason));
            }
            warn!("⚠️ 发布降级内容: {}", topic.title);
        }

        let mut article = generated.into_inner();
        match self
            .publisher
            .publish(&mut article, &self.settings.publish_time)
            .await
        {
            Ok(post) => ItemResult {
                topic_id: topic.id.clone(),
                title: topic.title.clone(),
                outcome: ItemOutcome::Published {
                    post_id: post.post_id,
                    url: post.url,
                },
            },
            Err(e) => failed(&topic, e.to_string()),
        }
    }
}

/// 按分数降序取前 `limit` 个，同分保持原顺序
pub fn select_topics(mut topics: Vec<Topic>, limit: usize) -> Vec<Topic> {
    topics.sort_by(|a, b| b.score.cmp(&a.score));
    topics.truncate(limit);
    topics
}
