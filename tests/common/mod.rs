#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use blogpilot::config::PromptConfig;
use blogpilot::content::ContentService;
use blogpilot::llm::{GenerativeModel, RetryPolicy};
use blogpilot::utils::GenerationError;
use serde_json::json;

pub const DISCOVERY_PROMPT: &str = "DISCOVER";

/// 按提示词返回脚本化结果的模型
pub struct FakeModel<F> {
    respond: F,
    calls: Arc<AtomicUsize>,
}

impl<F> FakeModel<F>
where
    F: Fn(&str) -> Result<String, GenerationError> + Send + Sync,
{
    pub fn new(respond: F) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                respond,
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

#[async_trait]
impl<F> GenerativeModel for FakeModel<F>
where
    F: Fn(&str) -> Result<String, GenerationError> + Send + Sync,
{
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.respond)(prompt)
    }
}

pub fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        min_interval: Duration::ZERO,
        max_attempts: 3,
        base_delay: Duration::ZERO,
        quota_wait: Duration::ZERO,
    }
}

pub fn prompts() -> PromptConfig {
    PromptConfig {
        discovery: DISCOVERY_PROMPT.to_string(),
        generation: "WRITE|{topic}|{word_count}".to_string(),
    }
}

/// 从生成提示词中取回选题标题
pub fn topic_of(prompt: &str) -> &str {
    prompt.split('|').nth(1).unwrap_or_default()
}

pub fn service<F>(respond: F) -> (ContentService, Arc<AtomicUsize>)
where
    F: Fn(&str) -> Result<String, GenerationError> + Send + Sync + 'static,
{
    let (model, calls) = FakeModel::new(respond);
    (ContentService::new(Box::new(model), fast_policy(), prompts()), calls)
}

pub fn article_json(title: &str) -> String {
    json!({
        "title": title,
        "slug": "",
        "content_html": format!("<h2>{title}</h2><p>You can ship this in 3 steps. It's simple.</p>"),
        "tags": ["rust", " async "],
        "meta": { "meta_description": "A short description." },
        "seo_report": { "score": 88, "word_count_actual": 5000 }
    })
    .to_string()
}

pub fn server_error() -> GenerationError {
    GenerationError::Api {
        status: 500,
        message: "internal".to_string(),
    }
}
