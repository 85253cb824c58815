use std::fmt;

#[derive(Debug)]
pub enum RentAdminSDKError {
    /// 推送通道/网络层错误（连接失败、异常断开等）
    Transport(String),
    /// 后端语义校验失败（重复键、格式错误等），不自动重试
    Validation(String),
    /// 目标实体已不存在
    NotFound(String),
    /// 删除被拒绝：实体被其他数据引用（"in use"）
    Conflict(String),
    /// JSON 编解码错误
    Json(String),
    /// 配置错误
    Config(String),
    /// 后端返回的其他错误（带状态码语境的通用失败）
    Api(String),
    /// 其他错误
    Other(String),
}

impl fmt::Display for RentAdminSDKError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RentAdminSDKError::Transport(e) => write!(f, "Transport error: {}", e),
            RentAdminSDKError::Validation(e) => write!(f, "Validation error: {}", e),
            RentAdminSDKError::NotFound(e) => write!(f, "Not found: {}", e),
            RentAdminSDKError::Conflict(e) => write!(f, "Conflict: {}", e),
            RentAdminSDKError::Json(e) => write!(f, "JSON error: {}", e),
            RentAdminSDKError::Config(e) => write!(f, "Config error: {}", e),
            RentAdminSDKError::Api(e) => write!(f, "API error: {}", e),
            RentAdminSDKError::Other(e) => write!(f, "Other error: {}", e),
        }
    }
}

impl std::error::Error for RentAdminSDKError {}

impl From<serde_json::Error> for RentAdminSDKError {
    fn from(error: serde_json::Error) -> Self {
        RentAdminSDKError::Json(error.to_string())
    }
}

impl From<reqwest::Error> for RentAdminSDKError {
    fn from(error: reqwest::Error) -> Self {
        RentAdminSDKError::Transport(error.to_string())
    }
}

impl RentAdminSDKError {
    /// 是否为"被引用，禁止删除"冲突（批量删除分桶时使用）
    pub fn is_conflict(&self) -> bool {
        matches!(self, RentAdminSDKError::Conflict(_))
    }

    /// 错误携带的人类可读描述（后端透传的 detail 文本）
    pub fn detail(&self) -> String {
        match self {
            RentAdminSDKError::Transport(e)
            | RentAdminSDKError::Validation(e)
            | RentAdminSDKError::Conflict(e)
            | RentAdminSDKError::NotFound(e)
            | RentAdminSDKError::Json(e)
            | RentAdminSDKError::Config(e)
            | RentAdminSDKError::Api(e)
            | RentAdminSDKError::Other(e) => e.clone(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RentAdminSDKError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_detection_and_detail() {
        let conflict = RentAdminSDKError::Conflict("Owner is in use".to_string());
        assert!(conflict.is_conflict());
        assert_eq!(conflict.detail(), "Owner is in use");

        let api = RentAdminSDKError::Api("HTTP 500".to_string());
        assert!(!api.is_conflict());
        assert_eq!(api.detail(), "HTTP 500");
    }

    #[test]
    fn test_json_error_conversion() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{{").unwrap_err();
        let err: RentAdminSDKError = parse_err.into();
        assert!(matches!(err, RentAdminSDKError::Json(_)));
        assert!(err.to_string().starts_with("JSON error:"));
    }
}
