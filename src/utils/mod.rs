pub mod logger;

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlogPilotError {
    #[error("配置错误: {0}")]
    ConfigError(#[from] config::ConfigError),

    #[error("数据库错误: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("调度器错误: {0}")]
    SchedulerError(#[from] tokio_cron_scheduler::JobSchedulerError),

    #[error("无效的调度表达式 '{0}'，应为 HH:MM 或 6 段 cron 表达式")]
    InvalidSchedule(String),

    #[error("IO错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML 序列化错误: {0}")]
    TomlError(#[from] toml::ser::Error),

    #[error("TOML 解析错误: {0}")]
    TomlParseError(#[from] toml::de::Error),
}

pub type BlogPilotResult<T> = Result<T, BlogPilotError>;

/// 生成式 AI 调用链上的错误
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("AI 接口返回错误 {status}: {message}")]
    Api { status: u16, message: String },

    #[error("网络请求错误: {0}")]
    Network(#[from] reqwest::Error),

    #[error("AI 响应为空")]
    EmptyResponse,

    #[error("JSON 解析错误: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("输出校验失败: {0}")]
    Validation(String),
}

impl GenerationError {
    /// 限流或配额耗尽
    pub fn is_rate_limited(&self) -> bool {
        match self {
            GenerationError::Api { status: 429, .. } => true,
            other => {
                let message = other.to_string().to_lowercase();
                message.contains("429")
                    || message.contains("quota")
                    || message.contains("resource_exhausted")
            }
        }
    }

    /// 服务端建议的重试等待时间，向上取整到秒
    pub fn retry_after(&self) -> Option<Duration> {
        let message = self.to_string();
        retry_hint_patterns().iter().find_map(|re| {
            let secs: f64 = re.captures(&message)?.get(1)?.as_str().parse().ok()?;
            Some(Duration::from_secs(secs.ceil() as u64))
        })
    }
}

fn retry_hint_patterns() -> &'static [Regex; 2] {
    static PATTERNS: OnceLock<[Regex; 2]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r"(?i)retry in ([\d.]+)\s*s").unwrap(),
            Regex::new(r#""retryDelay"\s*:\s*"([\d.]+)s""#).unwrap(),
        ]
    })
}
