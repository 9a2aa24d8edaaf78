use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use blogpilot::autopilot::{self, AutoPilot, BatchReport, BatchRunner, BatchSettings, ItemOutcome};
use blogpilot::cms::WordPressClient;
use blogpilot::config::{prompts::PROMPTS_PATH, AppConfig, PromptConfig, SETTINGS_PATH};
use blogpilot::content::{BlogPost, ContentService};
use blogpilot::storage::Database;
use blogpilot::utils::logger;

#[derive(Parser)]
#[command(name = "blogpilot")]
#[command(about = "AI 选题、文章生成与 WordPress 定时发布", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 初始化配置和数据库
    Init,
    /// 发现热门选题
    Discover,
    /// 为指定选题生成文章
    Generate {
        /// 选题标题
        #[arg(short, long)]
        topic: String,
        /// 目标字数，默认取配置
        #[arg(short, long)]
        words: Option<usize>,
        /// 输出 JSON 文件
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// 生成（或读取）文章并排期发布到 WordPress
    Publish {
        /// 选题标题，与 --input 二选一
        #[arg(short, long, conflicts_with = "input", required_unless_present = "input")]
        topic: Option<String>,
        /// 之前 generate 输出的文章 JSON
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// 特色图片文件
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// 测试 WordPress 连接
    TestConnection,
    /// 列出最近的文章
    Posts {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// 永久删除文章
    Delete {
        post_id: u64,
    },
    /// 启动 AutoPilot，Ctrl+C 退出
    Autopilot {
        /// HH:MM（UTC）或 6 段 cron，默认取配置
        #[arg(short, long)]
        schedule: Option<String>,
    },
    /// 立即执行一次 AutoPilot 批次
    RunOnce,
    /// 查看 AutoPilot 状态
    Status,
    /// 查看最近的发布记录
    History {
        #[arg(short, long, default_value_t = 20)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    logger::init_logger();
    info!("blogpilot 启动");

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => init_command().await?,
        Commands::Discover => discover_command().await?,
        Commands::Generate { topic, words, output } => generate_command(topic, words, output).await?,
        Commands::Publish { topic, input, image } => publish_command(topic, input, image).await?,
        Commands::TestConnection => test_connection_command().await?,
        Commands::Posts { limit } => posts_command(limit).await?,
        Commands::Delete { post_id } => delete_command(post_id).await?,
        Commands::Autopilot { schedule } => autopilot_command(schedule).await?,
        Commands::RunOnce => run_once_command().await?,
        Commands::Status => status_command().await?,
        Commands::History { limit } => history_command(limit).await?,
    }

    Ok(())
}

async fn init_command() -> Result<()> {
    info!("初始化系统...");

    tokio::fs::create_dir_all("config").await?;
    tokio::fs::create_dir_all("data").await?;

    if PathBuf::from(SETTINGS_PATH).exists() {
        info!("配置文件已存在，跳过: {}", SETTINGS_PATH);
    } else {
        AppConfig::default().save(SETTINGS_PATH)?;
        info!("已生成配置文件: {}", SETTINGS_PATH);
    }

    if PathBuf::from(PROMPTS_PATH).exists() {
        info!("提示词配置已存在，跳过: {}", PROMPTS_PATH);
    } else {
        let prompts = toml::to_string_pretty(&PromptConfig::default())?;
        tokio::fs::write(PROMPTS_PATH, prompts).await?;
        info!("已生成提示词配置: {}", PROMPTS_PATH);
    }

    let app_config = AppConfig::load()?;
    open_database(&app_config).await?;

    info!("✅ 系统初始化完成！");
    info!("下一步:");
    info!("  1. 编辑 {} 配置 [generator] api_key 和 [wordpress] 凭据", SETTINGS_PATH);
    info!("  2. 运行 'blogpilot test-connection' 检查 WordPress");
    info!("  3. 运行 'blogpilot run-once' 或 'blogpilot autopilot'");

    Ok(())
}

async fn discover_command() -> Result<()> {
    let app_config = AppConfig::load()?;
    let content = content_service(&app_config)?;

    let discovered = content.discover_topics().await;
    if let Some(reason) = discovered.fallback_reason() {
        warn!("⚠️ 使用备用选题: {}", reason);
    }

    for (i, topic) in discovered.value().iter().enumerate() {
        info!("{:>2}. [{}] {} ({})", i + 1, topic.score, topic.title, topic.cluster.label());
        info!("    {}", topic.reasoning);
        if !topic.keywords.is_empty() {
            info!("    关键词: {}", topic.keywords.join(", "));
        }
    }
    Ok(())
}

async fn generate_command(topic: String, words: Option<usize>, output: Option<PathBuf>) -> Result<()> {
    let app_config = AppConfig::load()?;
    let content = content_service(&app_config)?;
    let word_count = words.unwrap_or(app_config.content.target_word_count);

    let generated = content.generate_blog_post(&topic, word_count).await;
    if let Some(reason) = generated.fallback_reason() {
        warn!("⚠️ 生成失败，已使用兜底模板: {}", reason);
    }
    let post = generated.into_inner();
    log_article(&post);

    if let Some(path) = output {
        tokio::fs::write(&path, serde_json::to_string_pretty(&post)?).await?;
        info!("已写入: {}", path.display());
    }
    Ok(())
}

async fn publish_command(topic: Option<String>, input: Option<PathBuf>, image: Option<PathBuf>) -> Result<()> {
    let app_config = AppConfig::load()?;
    let wordpress = wordpress_client(&app_config)?;

    let mut post: BlogPost = match (input, topic) {
        (Some(path), _) => {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("读取文章失败: {}", path.display()))?;
            serde_json::from_str(&raw)?
        }
        (None, Some(topic)) => {
            let content = content_service(&app_config)?;
            let generated = content
                .generate_blog_post(&topic, app_config.content.target_word_count)
                .await;
            if let Some(reason) = generated.fallback_reason() {
                warn!("⚠️ 生成失败，将发布兜底模板: {}", reason);
            }
            generated.into_inner()
        }
        (None, None) => bail!("需要 --topic 或 --input"),
    };

    let image_data = match image {
        Some(path) => Some(STANDARD.encode(tokio::fs::read(&path).await?)),
        None => None,
    };

    let published = wordpress
        .publish_with_image(&mut post, &app_config.content.publish_time, image_data.as_deref())
        .await?;

    info!("✅ 已排期: {} (post {})", published.title, published.post_id);
    info!("   发布时间: {}", published.publish_date);
    info!("   链接: {}", published.url);
    Ok(())
}

async fn test_connection_command() -> Result<()> {
    let app_config = AppConfig::load()?;
    let wordpress = wordpress_client(&app_config)?;
    let user = wordpress.test_connection().await?;
    info!("用户: {} (id {}, {})", user.name, user.id, user.slug);
    Ok(())
}

async fn posts_command(limit: usize) -> Result<()> {
    let app_config = AppConfig::load()?;
    let wordpress = wordpress_client(&app_config)?;

    let posts = wordpress.get_recent_posts(limit).await?;
    if posts.is_empty() {
        info!("没有文章");
    }
    for post in posts {
        info!("#{} [{}] {} ({})", post.id, post.status, post.title, post.date);
        info!("    {}", post.url);
    }
    Ok(())
}

async fn delete_command(post_id: u64) -> Result<()> {
    let app_config = AppConfig::load()?;
    let wordpress = wordpress_client(&app_config)?;
    wordpress.delete_post(post_id).await?;
    Ok(())
}

async fn autopilot_command(schedule: Option<String>) -> Result<()> {
    let app_config = AppConfig::load()?;
    let schedule = schedule.unwrap_or_else(|| app_config.autopilot.schedule.clone());
    let db = Arc::new(open_database(&app_config).await?);
    let runner = Arc::new(batch_runner(&app_config)?);

    let autopilot = AutoPilot::new().await?;
    let callback = {
        let db = Arc::clone(&db);
        autopilot::job(move || {
            let runner = Arc::clone(&runner);
            let db = Arc::clone(&db);
            async move {
                let report = runner.run().await;
                db.record_batch(&report).await?;
                log_report(&report);
                Ok::<(), anyhow::Error>(())
            }
        })
    };

    autopilot.start(&schedule, callback).await?;
    db.save_autopilot_state(true, &schedule).await?;
    if let Some(next) = autopilot.next_run().await? {
        info!("下一次执行: {} (UTC)", next.format("%Y-%m-%d %H:%M:%S"));
    }

    info!("AutoPilot 运行中，按 Ctrl+C 退出");
    tokio::signal::ctrl_c().await?;

    autopilot.stop().await?;
    db.save_autopilot_state(false, &schedule).await?;
    autopilot.shutdown().await?;
    Ok(())
}

async fn run_once_command() -> Result<()> {
    let app_config = AppConfig::load()?;
    let db = open_database(&app_config).await?;
    let runner = batch_runner(&app_config)?;

    let report = runner.run().await;
    let run_id = db.record_batch(&report).await?;
    log_report(&report);
    info!("批次记录 #{}", run_id);
    Ok(())
}

async fn status_command() -> Result<()> {
    let app_config = AppConfig::load()?;
    let db = open_database(&app_config).await?;

    match db.load_autopilot_state().await? {
        Some(state) => {
            let label = if state.is_running { "运行中" } else { "已停止" };
            info!("AutoPilot: {} (调度 {}, 更新于 {})", label, state.schedule, state.updated_at);
        }
        None => info!("AutoPilot: 从未启动 (默认调度 {})", app_config.autopilot.schedule),
    }

    if let Some(run) = db.recent_runs(1).await?.first() {
        info!(
            "最近批次 #{}: {} 成功 / {} 失败，结束于 {}",
            run.id, run.published, run.failed, run.finished_at
        );
    }

    info!("生成接口: {}", configured(app_config.generator.is_configured()));
    info!("WordPress: {}", configured(app_config.wordpress.is_configured()));
    Ok(())
}

async fn history_command(limit: i64) -> Result<()> {
    let app_config = AppConfig::load()?;
    let db = open_database(&app_config).await?;

    let entries = db.recent_results(limit).await?;
    if entries.is_empty() {
        info!("暂无发布记录");
    }
    for entry in entries {
        match (entry.post_id, entry.error) {
            (Some(post_id), _) => info!(
                "✅ [批次 {}] {} -> post {} {}",
                entry.run_id,
                entry.title,
                post_id,
                entry.url.unwrap_or_default()
            ),
            (None, error) => info!(
                "❌ [批次 {}] {}: {}",
                entry.run_id,
                entry.title,
                error.unwrap_or_default()
            ),
        }
    }
    Ok(())
}

fn content_service(app_config: &AppConfig) -> Result<ContentService> {
    if !app_config.generator.is_configured() {
        warn!("⚠️ API key 未配置，所有生成都会降级为本地模板。请在 {} 中设置 [generator] api_key", SETTINGS_PATH);
    }
    let prompts = PromptConfig::load()?;
    Ok(ContentService::from_config(&app_config.generator, prompts)?)
}

fn wordpress_client(app_config: &AppConfig) -> Result<WordPressClient> {
    if !app_config.wordpress.is_configured() {
        bail!("WordPress 未配置，请在 {} 中设置 [wordpress] url/username/app_password", SETTINGS_PATH);
    }
    Ok(WordPressClient::from_config(&app_config.wordpress)?)
}

fn batch_runner(app_config: &AppConfig) -> Result<BatchRunner> {
    let content = Arc::new(content_service(app_config)?);
    let publisher = Arc::new(wordpress_client(app_config)?);
    Ok(BatchRunner::new(content, publisher, BatchSettings::from_config(app_config)))
}

async fn open_database(app_config: &AppConfig) -> Result<Database> {
    let db = Database::new(&app_config.storage.database_path).await?;
    db.init_schema().await?;
    Ok(db)
}

fn configured(ok: bool) -> &'static str {
    if ok {
        "已配置"
    } else {
        "未配置"
    }
}

fn log_article(post: &BlogPost) {
    info!("标题: {}", post.title);
    info!("Slug: {}", post.slug);
    info!("字数: {}", post.seo_report.word_count_actual);
    info!("主关键词: {}", post.meta.primary_keyword);
    info!("标签: {}", post.tags.join(", "));
    info!("SEO 分数: {}", post.seo_report.score);
}

fn log_report(report: &BatchReport) {
    for item in &report.items {
        match &item.outcome {
            ItemOutcome::Published { post_id, url } => info!("  ✅ {} -> post {} {}", item.title, post_id, url),
            ItemOutcome::Failed { error } => info!("  ❌ {}: {}", item.title, error),
        }
    }
    info!("批次完成: {} 成功, {} 失败", report.published(), report.failed());
}
