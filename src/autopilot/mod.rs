//! AutoPilot：按固定时间（UTC）反复执行选题→生成→发布批次

pub mod batch;

pub use batch::{select_topics, BatchReport, BatchRunner, BatchSettings, ItemOutcome, ItemResult};

use std::future::Future;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use regex::Regex;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::utils::{BlogPilotError, BlogPilotResult};

/// 每次触发时执行的回调，返回的错误只记录日志
pub type JobCallback = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// 把 async 闭包包装成 [`JobCallback`]
pub fn job<F, Fut>(f: F) -> JobCallback
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AutoPilotStatus {
    pub is_running: bool,
    pub schedule: Option<String>,
}

struct ActiveJob {
    id: Uuid,
    schedule: String,
}

/// 同一时刻最多只有一个定时任务
pub struct AutoPilot {
    scheduler: JobScheduler,
    active: Mutex<Option<ActiveJob>>,
}

impl AutoPilot {
    pub async fn new() -> BlogPilotResult<Self> {
        let scheduler = JobScheduler::new().await?;
        scheduler.start().await?;
        info!("任务调度器已启动");
        Ok(Self {
            scheduler,
            active: Mutex::new(None),
        })
    }

    /// 注册定时任务；已有任务会被替换
    pub async fn start(&self, schedule: &str, callback: JobCallback) -> BlogPilotResult<()> {
        let cron = parse_schedule(schedule)?;
        let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
            let callback = Arc::clone(&callback);
            Box::pin(async move {
                info!("⏰ AutoPilot 定时任务触发");
                if let Err(e) = callback().await {
                    error!("❌ AutoPilot 批次执行失败: {:#}", e);
                }
            })
        })
        .map_err(|e| BlogPilotError::InvalidSchedule(format!("{} ({})", schedule, e)))?;

        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            self.scheduler.remove(&previous.id).await?;
            info!("已替换旧的定时任务 ({})", previous.schedule);
        }

        let id = self.scheduler.add(job).await?;
        *active = Some(ActiveJob {
            id,
            schedule: schedule.trim().to_string(),
        });
        info!("✅ AutoPilot 已启动，调度: {} (cron: {}, UTC)", schedule.trim(), cron);
        Ok(())
    }

    /// 停止定时任务，可重复调用
    pub async fn stop(&self) -> BlogPilotResult<()> {
        match self.active.lock().await.take() {
            Some(job) => {
                self.scheduler.remove(&job.id).await?;
                info!("AutoPilot 已停止");
            }
            None => debug!("AutoPilot 未运行，忽略 stop"),
        }
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        self.active.lock().await.is_some()
    }

    pub async fn status(&self) -> AutoPilotStatus {
        let active = self.active.lock().await;
        AutoPilotStatus {
            is_running: active.is_some(),
            schedule: active.as_ref().map(|job| job.schedule.clone()),
        }
    }

    /// 当前任务的下一次触发时间
    pub async fn next_run(&self) -> BlogPilotResult<Option<DateTime<Utc>>> {
        let id = match self.active.lock().await.as_ref() {
            Some(job) => job.id,
            None => return Ok(None),
        };
        let mut scheduler = self.scheduler.clone();
        Ok(scheduler.next_tick_for_job(id).await?)
    }

    pub async fn shutdown(mut self) -> BlogPilotResult<()> {
        self.scheduler.shutdown().await?;
        info!("任务调度器已关闭");
        Ok(())
    }
}

/// `HH:MM` 转为每日 cron（秒 分 时 日 月 周）；6/7 段 cron 原样返回
pub fn parse_schedule(schedule: &str) -> BlogPilotResult<String> {
    static DAILY: OnceLock<Regex> = OnceLock::new();
    let daily = DAILY.get_or_init(|| Regex::new(r"^(\d{1,2}):(\d{2})$").unwrap());

    let schedule = schedule.trim();
    if let Some(caps) = daily.captures(schedule) {
        let hour: u32 = caps[1].parse().unwrap_or(u32::MAX);
        let minute: u32 = caps[2].parse().unwrap_or(u32::MAX);
        if hour < 24 && minute < 60 {
            return Ok(format!("0 {} {} * * *", minute, hour));
        }
        return Err(BlogPilotError::InvalidSchedule(schedule.to_string()));
    }

    match schedule.split_whitespace().count() {
        6 | 7 => Ok(schedule.to_string()),
        _ => Err(BlogPilotError::InvalidSchedule(schedule.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn noop() -> JobCallback {
        job(|| async { Ok::<(), anyhow::Error>(()) })
    }

    #[test]
    fn daily_schedule_to_cron() {
        assert_eq!(parse_schedule("09:00").unwrap(), "0 0 9 * * *");
        assert_eq!(parse_schedule(" 14:30 ").unwrap(), "0 30 14 * * *");
        assert_eq!(parse_schedule("7:05").unwrap(), "0 5 7 * * *");
    }

    #[test]
    fn cron_passthrough_and_rejects() {
        assert_eq!(parse_schedule("0 15 6 * * Mon").unwrap(), "0 15 6 * * Mon");
        assert!(parse_schedule("24:00").is_err());
        assert!(parse_schedule("12:60").is_err());
        assert!(parse_schedule("daily").is_err());
        assert!(parse_schedule("* * * * *").is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn invalid_schedule_keeps_previous_job() {
        let autopilot = AutoPilot::new().await.unwrap();
        autopilot.start("09:00", noop()).await.unwrap();

        assert!(autopilot.start("99:99", noop()).await.is_err());
        assert!(autopilot.start("0 0 99 * * *", noop()).await.is_err());

        let status = autopilot.status().await;
        assert!(status.is_running);
        assert_eq!(status.schedule.as_deref(), Some("09:00"));
        autopilot.shutdown().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn restart_replaces_job() {
        let autopilot = AutoPilot::new().await.unwrap();
        autopilot.start("09:00", noop()).await.unwrap();
        autopilot.start("14:30", noop()).await.unwrap();

        assert_eq!(autopilot.status().await.schedule.as_deref(), Some("14:30"));
        let next = autopilot.next_run().await.unwrap().expect("next tick");
        assert_eq!((next.hour(), next.minute()), (14, 30));
        autopilot.shutdown().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failing_callback_keeps_firing() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let autopilot = AutoPilot::new().await.unwrap();
        autopilot
            .start(
                "* * * * * *",
                job(move || {
                    let counter = Arc::clone(&counter);
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        anyhow::bail!("batch exploded")
                    }
                }),
            )
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(3500)).await;
        assert!(fired.load(Ordering::SeqCst) >= 2);
        assert!(autopilot.is_running().await);
        autopilot.shutdown().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stop_is_idempotent() {
        let autopilot = AutoPilot::new().await.unwrap();
        autopilot.stop().await.unwrap();
        autopilot.start("09:00", noop()).await.unwrap();
        autopilot.stop().await.unwrap();
        autopilot.stop().await.unwrap();
        assert!(!autopilot.is_running().await);
        assert_eq!(autopilot.next_run().await.unwrap(), None);
        autopilot.shutdown().await.unwrap();
    }
}
