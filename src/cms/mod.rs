//! WordPress REST 发布适配层

pub mod error;
pub mod models;

pub use error::{CmsError, Failure, Operation};
pub use models::{ConnectedUser, PostSummary, PublishedPost, UploadedMedia};

use std::sync::OnceLock;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;
use reqwest::{multipart, Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::WordPressConfig;
use crate::content::BlogPost;
use error::classify;
use models::{
    CreatePostPayload, ErrorBody, MediaResponse, PostResponse, SeoMeta, TagResponse, UserResponse,
};

/// 每篇文章最多关联的标签数
pub const MAX_TAGS: usize = 10;

const PUBLISH_STATUS: &str = "future";
const WP_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const UNTITLED_POST: &str = "Untitled";

/// 发布端抽象，批量任务只依赖这个接口
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, article: &mut BlogPost, publish_time: &str) -> Result<PublishedPost, CmsError>;
}

pub struct WordPressClient {
    client: Client,
    site_url: String,
    api_base: String,
    auth_header: String,
}

impl WordPressClient {
    pub fn new(site_url: &str, username: &str, app_password: &str) -> Result<Self, CmsError> {
        let site_url = site_url.trim().trim_end_matches('/').to_string();
        if site_url.is_empty() {
            return Err(CmsError::InvalidConfig("site url is empty".to_string()));
        }

        let token = STANDARD.encode(format!("{}:{}", username.trim(), app_password.trim()));
        let client = Client::builder()
            .build()
            .map_err(|e| CmsError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            client,
            api_base: format!("{}/wp-json/wp/v2", site_url),
            site_url,
            auth_header: format!("Basic {}", token),
        })
    }

    pub fn from_config(config: &WordPressConfig) -> Result<Self, CmsError> {
        Self::new(&config.url, &config.username, &config.app_password)
    }

    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.api_base, path))
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
    }

    async fn send(&self, operation: Operation, request: RequestBuilder) -> Result<Response, CmsError> {
        let response = request.send().await.map_err(|e| {
            classify(
                operation,
                &self.site_url,
                Failure {
                    unreachable: e.is_connect(),
                    message: e.to_string(),
                    ..Failure::default()
                },
            )
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!("WordPress 返回 {}: {}", status, body);
        Err(classify(operation, &self.site_url, failure_from_body(status, &body)))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: Operation,
        request: RequestBuilder,
    ) -> Result<T, CmsError> {
        let response = self.send(operation, request).await?;
        response.json::<T>().await.map_err(|e| CmsError::Remote {
            context: operation.context(),
            message: format!("unexpected response body: {}", e),
        })
    }

    /// 校验凭据，返回当前登录用户
    pub async fn test_connection(&self) -> Result<ConnectedUser, CmsError> {
        let user: UserResponse = self
            .send_json(Operation::Connect, self.request(Method::GET, "/users/me"))
            .await?;

        info!("✅ 已连接 WordPress: {} ({})", self.site_url, user.name);
        Ok(ConnectedUser {
            id: user.id,
            name: user.name,
            slug: user.slug,
        })
    }

    /// 上传 base64 图片（可带 data URI 头），可选设置 alt 文本
    pub async fn upload_image(
        &self,
        image_data: &str,
        filename: &str,
        alt_text: Option<&str>,
    ) -> Result<UploadedMedia, CmsError> {
        let image = decode_image(image_data)?;
        let filename = with_extension(filename, &image.extension);

        let part = multipart::Part::bytes(image.bytes)
            .file_name(filename.clone())
            .mime_str(&image.content_type)
            .map_err(|e| CmsError::InvalidImage(e.to_string()))?;
        let form = multipart::Form::new().part("file", part);

        let media: MediaResponse = self
            .send_json(
                Operation::Upload,
                self.request(Method::POST, "/media").multipart(form),
            )
            .await?;

        if let Some(alt) = alt_text.filter(|a| !a.trim().is_empty()) {
            let request = self
                .request(Method::POST, &format!("/media/{}", media.id))
                .json(&json!({ "alt_text": alt }));
            if let Err(e) = self.send(Operation::Upload, request).await {
                warn!("⚠️ 设置图片 alt 文本失败 (media {}): {}", media.id, e);
            }
        }

        info!("✅ 图片已上传: {} -> media {}", filename, media.id);
        Ok(UploadedMedia {
            id: media.id,
            url: media.source_url,
            title: media
                .title
                .map(|t| t.rendered)
                .filter(|t| !t.is_empty())
                .unwrap_or(filename),
        })
    }

    /// 以定时状态创建文章，发布时间为 UTC 明天 `publish_time`
    pub async fn publish_post(
        &self,
        article: &mut BlogPost,
        publish_time: &str,
        featured_image_id: Option<u64>,
    ) -> Result<PublishedPost, CmsError> {
        let date = scheduled_publish_date(Utc::now(), publish_time)?;

        let payload = CreatePostPayload {
            title: &article.title,
            content: &article.content_html,
            status: PUBLISH_STATUS,
            date_gmt: date.format(WP_DATE_FORMAT).to_string(),
            slug: &article.slug,
            excerpt: &article.meta.meta_description,
            meta: SeoMeta {
                _yoast_wpseo_title: &article.meta.meta_title,
                _yoast_wpseo_metadesc: &article.meta.meta_description,
                _yoast_wpseo_focuskw: &article.meta.primary_keyword,
            },
            featured_media: featured_image_id,
        };

        let post: PostResponse = self
            .send_json(
                Operation::Publish,
                self.request(Method::POST, "/posts").json(&payload),
            )
            .await?;

        if !article.tags.is_empty() {
            let tag_ids = self.resolve_tags(&article.tags).await;
            if !tag_ids.is_empty() {
                let request = self
                    .request(Method::POST, &format!("/posts/{}", post.id))
                    .json(&json!({ "tags": tag_ids }));
                if let Err(e) = self.send(Operation::ResolveTag, request).await {
                    warn!("⚠️ 关联标签失败 (post {}): {}", post.id, e);
                }
            }
        }

        article.remote_post_id = Some(post.id);
        info!("✅ 文章已排期: {} -> post {} @ {}", article.title, post.id, post.date);

        Ok(PublishedPost {
            post_id: post.id,
            url: post.link,
            status: post.status,
            publish_date: post.date,
            title: post
                .title
                .map(|t| t.rendered)
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| article.title.clone()),
        })
    }

    /// 先上传特色图片再发布；图片失败不影响发布
    pub async fn publish_with_image(
        &self,
        article: &mut BlogPost,
        publish_time: &str,
        image_data: Option<&str>,
    ) -> Result<PublishedPost, CmsError> {
        let mut featured = None;
        if let Some(data) = image_data {
            let filename = format!("{}-featured", article.slug);
            match self.upload_image(data, &filename, Some(&article.title)).await {
                Ok(media) => featured = Some(media.id),
                Err(e) => warn!("⚠️ 特色图片上传失败，继续发布: {}", e),
            }
        }
        self.publish_post(article, publish_time, featured).await
    }

    /// 按名称查找或创建标签，单个失败只记录警告
    async fn resolve_tags(&self, tags: &[String]) -> Vec<u64> {
        let mut ids = Vec::new();
        for tag in tags.iter().take(MAX_TAGS) {
            match self.resolve_tag(tag).await {
                Ok(id) => ids.push(id),
                Err(e) => warn!("⚠️ 跳过标签 '{}': {}", tag, e),
            }
        }
        ids
    }

    async fn resolve_tag(&self, name: &str) -> Result<u64, CmsError> {
        let found: Vec<TagResponse> = self
            .send_json(
                Operation::ResolveTag,
                self.request(Method::GET, "/tags")
                    .query(&[("search", name), ("per_page", "1")]),
            )
            .await?;
        if let Some(tag) = found.first() {
            return Ok(tag.id);
        }

        let created: TagResponse = self
            .send_json(
                Operation::ResolveTag,
                self.request(Method::POST, "/tags").json(&json!({ "name": name })),
            )
            .await?;
        Ok(created.id)
    }

    pub async fn get_recent_posts(&self, limit: usize) -> Result<Vec<PostSummary>, CmsError> {
        let posts: Vec<PostResponse> = self
            .send_json(
                Operation::ListPosts,
                self.request(Method::GET, "/posts")
                    .query(&[("per_page", limit.to_string())])
                    .query(&[("_embed", "")]),
            )
            .await?;

        Ok(posts
            .into_iter()
            .map(|post| PostSummary {
                id: post.id,
                title: post
                    .title
                    .map(|t| t.rendered)
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| UNTITLED_POST.to_string()),
                url: post.link,
                date: post.date,
                status: post.status,
                featured_image: post
                    .embedded
                    .and_then(|e| e.featured_media.into_iter().next())
                    .and_then(|m| m.source_url),
            })
            .collect())
    }

    /// 永久删除（跳过回收站）
    pub async fn delete_post(&self, post_id: u64) -> Result<(), CmsError> {
        self.send(
            Operation::DeletePost,
            self.request(Method::DELETE, &format!("/posts/{}", post_id))
                .query(&[("force", "true")]),
        )
        .await?;
        info!("🗑️ 已删除文章 {}", post_id);
        Ok(())
    }
}

#[async_trait]
impl Publisher for WordPressClient {
    async fn publish(&self, article: &mut BlogPost, publish_time: &str) -> Result<PublishedPost, CmsError> {
        self.publish_post(article, publish_time, None).await
    }
}

/// 计算定时发布时间：`now` 所在 UTC 日期的次日 `HH:MM`
pub fn scheduled_publish_date(now: DateTime<Utc>, publish_time: &str) -> Result<NaiveDateTime, CmsError> {
    let time = NaiveTime::parse_from_str(publish_time.trim(), "%H:%M")
        .map_err(|_| CmsError::InvalidPublishTime(publish_time.to_string()))?;
    let tomorrow = now.date_naive() + Duration::days(1);
    Ok(tomorrow.and_time(time))
}

fn failure_from_body(status: StatusCode, body: &str) -> Failure {
    let parsed = serde_json::from_str::<ErrorBody>(body).ok();
    let code = parsed.as_ref().and_then(|b| b.code.clone());
    let message = parsed
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
        .or_else(|| Some(body.trim().to_string()).filter(|m| !m.is_empty()))
        .unwrap_or_else(|| format!("HTTP {}", status));

    Failure {
        status: Some(status.as_u16()),
        code,
        message,
        unreachable: false,
    }
}

struct DecodedImage {
    bytes: Vec<u8>,
    content_type: String,
    extension: String,
}

fn decode_image(data: &str) -> Result<DecodedImage, CmsError> {
    static DATA_URI: OnceLock<Regex> = OnceLock::new();
    let data_uri = DATA_URI.get_or_init(|| Regex::new(r"^data:image/(\w+);").unwrap());

    let (declared, payload) = match data.split_once(',') {
        Some((header, payload)) if header.starts_with("data:") => (
            data_uri
                .captures(header)
                .map(|c| c[1].to_ascii_lowercase()),
            payload,
        ),
        _ => (None, data),
    };

    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| CmsError::InvalidImage(e.to_string()))?;
    if bytes.is_empty() {
        return Err(CmsError::InvalidImage("image is empty".to_string()));
    }

    let subtype = declared
        .or_else(|| sniff_image_type(&bytes).map(str::to_string))
        .unwrap_or_else(|| "png".to_string());

    Ok(DecodedImage {
        bytes,
        content_type: format!("image/{}", subtype),
        extension: subtype,
    })
}

fn sniff_image_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some("png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("jpeg")
    } else if bytes.starts_with(b"GIF8") {
        Some("gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("webp")
    } else {
        None
    }
}

fn with_extension(filename: &str, extension: &str) -> String {
    static IMAGE_EXT: OnceLock<Regex> = OnceLock::new();
    let image_ext = IMAGE_EXT.get_or_init(|| Regex::new(r"(?i)\.(jpg|jpeg|png|gif|webp)$").unwrap());

    let filename = filename.trim();
    let filename = if filename.is_empty() { "image" } else { filename };
    if image_ext.is_match(filename) {
        filename.to_string()
    } else {
        format!("{}.{}", filename, extension)
    }
}
