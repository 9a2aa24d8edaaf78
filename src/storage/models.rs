use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// AutoPilot 的运行/停止状态，进程重启后据此恢复
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct AutoPilotState {
    pub is_running: bool,
    pub schedule: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BatchRun {
    pub id: i64,
    pub started_at: String,
    pub finished_at: String,
    pub fallback_topics: bool,
    pub published: i64,
    pub failed: i64,
}

/// 批次中单个选题的处理结果
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PublishLogEntry {
    pub id: i64,
    pub run_id: i64,
    pub topic_id: String,
    pub title: String,
    /// published | failed
    pub status: String,
    pub post_id: Option<i64>,
    pub url: Option<String>,
    pub error: Option<String>,
    pub created_at: String,
}
