//! SDK 配置
//!
//! 推送端点与 REST 基址由外部提供（构建器或环境变量），核心代码不写死。

use serde::{Deserialize, Serialize};

use crate::connection::ReconnectConfig;
use crate::error::{RentAdminSDKError, Result};

/// HTTP 客户端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpClientConfig {
    /// 连接超时（秒）
    pub connect_timeout_secs: Option<u64>,
    /// 请求超时（秒）
    pub request_timeout_secs: Option<u64>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: Some(10),
            request_timeout_secs: Some(30),
        }
    }
}

/// RentAdmin SDK 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentAdminConfig {
    /// REST 基址，例如 `http://localhost:8000`
    pub api_base_url: String,
    /// 推送通道基址，例如 `ws://localhost:8000`
    pub ws_base_url: String,
    /// 重连配置
    pub reconnect: ReconnectConfig,
    /// HTTP 客户端配置
    pub http_client_config: HttpClientConfig,
}

impl Default for RentAdminConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            ws_base_url: "ws://localhost:8000".to_string(),
            reconnect: ReconnectConfig::default(),
            http_client_config: HttpClientConfig::default(),
        }
    }
}

impl RentAdminConfig {
    pub fn builder() -> RentAdminConfigBuilder {
        RentAdminConfigBuilder::new()
    }

    /// 从环境变量读取基址（部署环境注入，两个都必须存在）
    pub fn from_env() -> Result<Self> {
        let api_base_url = std::env::var("RENTADMIN_API_BASE_URL")
            .map_err(|_| RentAdminSDKError::Config("缺少 RENTADMIN_API_BASE_URL".to_string()))?;
        let ws_base_url = std::env::var("RENTADMIN_WS_BASE_URL")
            .map_err(|_| RentAdminSDKError::Config("缺少 RENTADMIN_WS_BASE_URL".to_string()))?;
        Ok(Self {
            api_base_url,
            ws_base_url,
            ..Self::default()
        })
    }

    /// 拼接推送通道端点，例如 `ws_endpoint("/api/ws/owners")`
    pub fn ws_endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.ws_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// 配置构建器
pub struct RentAdminConfigBuilder {
    config: RentAdminConfig,
}

impl RentAdminConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RentAdminConfig::default(),
        }
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    pub fn ws_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.ws_base_url = url.into();
        self
    }

    pub fn reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.config.reconnect = reconnect;
        self
    }

    pub fn http_client_config(mut self, config: HttpClientConfig) -> Self {
        self.config.http_client_config = config;
        self
    }

    pub fn build(self) -> RentAdminConfig {
        self.config
    }
}

impl Default for RentAdminConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
