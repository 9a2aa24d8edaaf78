pub mod prompts;

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use prompts::PromptConfig;

use crate::llm::executor::RetryPolicy;
use crate::utils::BlogPilotResult;

pub const SETTINGS_PATH: &str = "config/settings.toml";
pub const ENV_PREFIX: &str = "BLOGPILOT";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub generator: GeneratorConfig,
    pub wordpress: WordPressConfig,
    pub content: ContentConfig,
    pub autopilot: AutoPilotConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneratorConfig {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub min_request_interval_ms: u64,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub quota_wait_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WordPressConfig {
    pub url: String,
    pub username: String,
    pub app_password: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContentConfig {
    pub target_word_count: usize,
    /// 次日发布时间，HH:MM
    pub publish_time: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AutoPilotConfig {
    /// HH:MM（UTC 每日）或 6 段 cron 表达式
    pub schedule: String,
    pub topics_per_run: usize,
    pub publish_delay_ms: u64,
    pub publish_fallback: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub database_path: String,
}

impl AppConfig {
    pub fn load() -> BlogPilotResult<Self> {
        Self::load_from(Path::new(SETTINGS_PATH))
    }

    /// 默认值 → 配置文件（可缺省）→ `BLOGPILOT_` 环境变量，逐层覆盖
    pub fn load_from(path: &Path) -> BlogPilotResult<Self> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn save(&self, path: &str) -> BlogPilotResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl GeneratorConfig {
    /// 检查 API key 是否已配置
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && self.api_key != "your-gemini-api-key"
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            min_interval: Duration::from_millis(self.min_request_interval_ms),
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_millis(self.base_delay_ms),
            quota_wait: Duration::from_millis(self.quota_wait_ms),
        }
    }
}

impl WordPressConfig {
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty() && !self.username.is_empty() && !self.app_password.is_empty()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            generator: GeneratorConfig {
                api_key: "your-gemini-api-key".to_string(),
                api_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                model: "gemini-2.0-flash".to_string(),
                temperature: 0.7,
                top_p: 0.95,
                top_k: 40,
                max_output_tokens: 8192,
                min_request_interval_ms: 3000,
                max_attempts: 3,
                base_delay_ms: 3000,
                quota_wait_ms: 30_000,
            },
            wordpress: WordPressConfig {
                url: String::new(),
                username: String::new(),
                app_password: String::new(),
            },
            content: ContentConfig {
                target_word_count: 1200,
                publish_time: "09:00".to_string(),
            },
            autopilot: AutoPilotConfig {
                schedule: "09:00".to_string(),
                topics_per_run: 3,
                publish_delay_ms: 5000,
                publish_fallback: true,
            },
            storage: StorageConfig {
                database_path: "./data/blogpilot.db".to_string(),
            },
        }
    }
}
