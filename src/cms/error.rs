use thiserror::Error;

/// WordPress 适配层错误，Display 文本即给用户的处理建议
#[derive(Error, Debug)]
pub enum CmsError {
    #[error("Authentication failed: Invalid username or application password. Make sure you are using an Application Password from WordPress (Users > Profile > Application Passwords), not your regular login password.")]
    InvalidCredentials,

    #[error("Access forbidden: The user does not have permission to access the REST API. Ensure the user has Administrator or Editor role.")]
    InsufficientRole,

    #[error("Cannot connect to WordPress site at {site}. Please check the URL and ensure your site is accessible.")]
    Unreachable { site: String },

    #[error("REST API authentication error. This may be caused by security plugins (like Wordfence) blocking API access. Please whitelist your server IP or temporarily disable security plugins to test.")]
    SecurityPluginBlocked,

    #[error("Permission denied: You are not allowed to create posts. Ensure your WordPress user has Administrator or Editor role and that Application Passwords are not blocked by security plugins.")]
    CannotCreate,

    #[error("Authentication failed: Invalid credentials or insufficient permissions.")]
    PublishUnauthorized,

    #[error("Access forbidden: REST API may be disabled or blocked by a security plugin (Wordfence, Sucuri, etc.). Check your .htaccess file or contact your hosting provider.")]
    RestApiBlocked,

    #[error("Invalid post data: {0}")]
    InvalidParam(String),

    #[error("Image upload failed: Authentication error. Check your Application Password.")]
    UploadAuth,

    #[error("Image upload failed: File too large. Maximum upload size exceeded.")]
    UploadTooLarge,

    #[error("Image upload failed: WordPress could not process the image. Ensure your WordPress installation supports the image format.")]
    UploadUnprocessable,

    #[error("Invalid image data: {0}")]
    InvalidImage(String),

    #[error("Invalid publish time '{0}', expected HH:MM")]
    InvalidPublishTime(String),

    #[error("Invalid WordPress configuration: {0}")]
    InvalidConfig(String),

    #[error("{context}: {message}")]
    Remote { context: &'static str, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Connect,
    Upload,
    Publish,
    ResolveTag,
    ListPosts,
    DeletePost,
}

impl Operation {
    pub fn context(&self) -> &'static str {
        match self {
            Operation::Connect => "WordPress connection failed",
            Operation::Upload => "Image upload failed",
            Operation::Publish => "Failed to publish post",
            Operation::ResolveTag => "Failed to resolve tag",
            Operation::ListPosts => "Failed to fetch posts",
            Operation::DeletePost => "Failed to delete post",
        }
    }
}

/// 一次失败请求的原始信息
#[derive(Debug, Clone, Default)]
pub struct Failure {
    pub status: Option<u16>,
    /// WordPress 错误体中的 `code`
    pub code: Option<String>,
    pub message: String,
    /// DNS 失败或连接被拒绝
    pub unreachable: bool,
}

/// 按操作类型把失败映射到可操作的错误
pub fn classify(operation: Operation, site_url: &str, failure: Failure) -> CmsError {
    use Operation::*;

    if failure.unreachable {
        return CmsError::Unreachable {
            site: site_url.to_string(),
        };
    }

    let code = failure.code.as_deref();
    match (operation, failure.status) {
        (Connect, Some(401)) => CmsError::InvalidCredentials,
        (Connect, Some(403)) => CmsError::InsufficientRole,
        (Connect, _) if code == Some("rest_authentication_error") => CmsError::SecurityPluginBlocked,

        (Upload, Some(401)) => CmsError::UploadAuth,
        (Upload, Some(403)) => CmsError::InsufficientRole,
        (Upload, Some(413)) => CmsError::UploadTooLarge,
        (Upload, _) if code == Some("rest_upload_unknown_error") => CmsError::UploadUnprocessable,

        (Publish, Some(401)) if code == Some("rest_cannot_create") => CmsError::CannotCreate,
        (Publish, Some(401)) => CmsError::PublishUnauthorized,
        (Publish, Some(403)) => CmsError::RestApiBlocked,
        (Publish, _) if code == Some("rest_invalid_param") => CmsError::InvalidParam(
            if failure.message.is_empty() {
                "Check your content format".to_string()
            } else {
                failure.message
            },
        ),

        _ => CmsError::Remote {
            context: operation.context(),
            message: failure.message,
        },
    }
}
