use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConnectedUser {
    pub id: u64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UploadedMedia {
    pub id: u64,
    pub url: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PublishedPost {
    pub post_id: u64,
    pub url: String,
    pub status: String,
    pub publish_date: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PostSummary {
    pub id: u64,
    pub title: String,
    pub url: String,
    pub date: String,
    pub status: String,
    pub featured_image: Option<String>,
}

/// 创建文章请求体
#[derive(Debug, Serialize)]
pub(crate) struct CreatePostPayload<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub status: &'a str,
    /// UTC 时间，不受站点时区影响
    pub date_gmt: String,
    pub slug: &'a str,
    pub excerpt: &'a str,
    pub meta: SeoMeta<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_media: Option<u64>,
}

/// Yoast SEO 字段
#[derive(Debug, Serialize)]
pub(crate) struct SeoMeta<'a> {
    pub _yoast_wpseo_title: &'a str,
    pub _yoast_wpseo_metadesc: &'a str,
    pub _yoast_wpseo_focuskw: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub code: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Rendered {
    #[serde(default)]
    pub rendered: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserResponse {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MediaResponse {
    pub id: u64,
    #[serde(default)]
    pub source_url: String,
    pub title: Option<Rendered>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PostResponse {
    pub id: u64,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub date: String,
    pub title: Option<Rendered>,
    #[serde(rename = "_embedded")]
    pub embedded: Option<Embedded>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Embedded {
    #[serde(rename = "wp:featuredmedia", default)]
    pub featured_media: Vec<EmbeddedMedia>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EmbeddedMedia {
    pub source_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TagResponse {
    pub id: u64,
}
