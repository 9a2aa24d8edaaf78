use std::path::Path;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::autopilot::{BatchReport, ItemOutcome};
use crate::storage::models::{AutoPilotState, BatchRun, PublishLogEntry};
use crate::utils::BlogPilotResult;

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_path: &str) -> BlogPilotResult<Self> {
        if let Some(parent) = Path::new(database_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        info!("数据库连接成功: {}", database_path);
        Ok(Self { pool })
    }

    /// 内存库，单连接保证所有查询看到同一份数据
    pub async fn in_memory() -> BlogPilotResult<Self> {
        let options = "sqlite::memory:".parse::<SqliteConnectOptions>()?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub async fn init_schema(&self) -> BlogPilotResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS autopilot_state (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                is_running INTEGER NOT NULL,
                schedule TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS batch_runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                started_at TEXT NOT NULL,
                finished_at TEXT NOT NULL,
                fallback_topics INTEGER NOT NULL DEFAULT 0,
                published INTEGER NOT NULL DEFAULT 0,
                failed INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS publish_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id INTEGER NOT NULL,
                topic_id TEXT NOT NULL,
                title TEXT NOT NULL,
                status TEXT NOT NULL,
                post_id INTEGER,
                url TEXT,
                error TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (run_id) REFERENCES batch_runs(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("数据库表结构初始化完成");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn save_autopilot_state(&self, is_running: bool, schedule: &str) -> BlogPilotResult<()> {
        sqlx::query(
            r#"
            INSERT INTO autopilot_state (id, is_running, schedule, updated_at)
            VALUES (1, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                is_running = excluded.is_running,
                schedule = excluded.schedule,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(is_running)
        .bind(schedule)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn load_autopilot_state(&self) -> BlogPilotResult<Option<AutoPilotState>> {
        let state = sqlx::query_as::<_, AutoPilotState>(
            "SELECT is_running, schedule, updated_at FROM autopilot_state WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(state)
    }

    /// 保存一次批次及其逐条结果，返回批次 id
    pub async fn record_batch(&self, report: &BatchReport) -> BlogPilotResult<i64> {
        let mut tx = self.pool.begin().await?;

        let run_id = sqlx::query(
            r#"
            INSERT INTO batch_runs (started_at, finished_at, fallback_topics, published, failed)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(report.started_at.to_rfc3339())
        .bind(report.finished_at.to_rfc3339())
        .bind(report.fallback_topics)
        .bind(report.published() as i64)
        .bind(report.failed() as i64)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let created_at = report.finished_at.to_rfc3339();
        for item in &report.items {
            let (status, post_id, url, error) = match &item.outcome {
                ItemOutcome::Published { post_id, url } => {
                    ("published", Some(*post_id as i64), Some(url.as_str()), None)
                }
                ItemOutcome::Failed { error } => ("failed", None, None, Some(error.as_str())),
            };

            sqlx::query(
                r#"
                INSERT INTO publish_log (run_id, topic_id, title, status, post_id, url, error, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(run_id)
            .bind(&item.topic_id)
            .bind(&item.title)
            .bind(status)
            .bind(post_id)
            .bind(url)
            .bind(error)
            .bind(&created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(run_id)
    }

    pub async fn recent_runs(&self, limit: i64) -> BlogPilotResult<Vec<BatchRun>> {
        let runs = sqlx::query_as::<_, BatchRun>(
            r#"
            SELECT id, started_at, finished_at, fallback_topics, published, failed
            FROM batch_runs ORDER BY id DESC LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(runs)
    }

    /// 最近的逐条结果，新的在前
    pub async fn recent_results(&self, limit: i64) -> BlogPilotResult<Vec<PublishLogEntry>> {
        let entries = sqlx::query_as::<_, PublishLogEntry>(
            r#"
            SELECT id, run_id, topic_id, title, status, post_id, url, error, created_at
            FROM publish_log ORDER BY id DESC LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
