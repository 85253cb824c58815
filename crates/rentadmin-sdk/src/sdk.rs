//! SDK 门面
//!
//! 持有配置、共享 HTTP 客户端与推送传输，按需派生各集合的
//! 同步器与命令通道。视图卸载时对同步器调用 `shutdown()` 即可，
//! 门面本身无连接状态。

use std::sync::Arc;
use tracing::info;

use crate::commands::{build_http_client, CollectionRoutes, CommandChannel};
use crate::config::RentAdminConfig;
use crate::error::Result;
use crate::sync::CollectionSync;
use crate::transport::{PushTransport, WsTransport};
use crate::version::SDK_VERSION;

/// 业主集合的推送通道路径（后端既有路由）
pub const OWNERS_WS_PATH: &str = "/api/ws/owners";

/// RentAdmin 实时数据 SDK
pub struct RentAdminSDK {
    config: RentAdminConfig,
    transport: Arc<dyn PushTransport>,
    http: reqwest::Client,
}

impl RentAdminSDK {
    /// 以默认 WebSocket 传输初始化
    pub fn initialize(config: RentAdminConfig) -> Result<Self> {
        Self::with_transport(config, Arc::new(WsTransport::new()))
    }

    /// 注入自定义传输（测试或特殊网络环境）
    pub fn with_transport(
        config: RentAdminConfig,
        transport: Arc<dyn PushTransport>,
    ) -> Result<Self> {
        let http = build_http_client(&config.http_client_config)?;
        info!(
            "✅ RentAdmin SDK 已初始化 (version: {}, api: {}, ws: {})",
            SDK_VERSION, config.api_base_url, config.ws_base_url
        );
        Ok(Self {
            config,
            transport,
            http,
        })
    }

    pub fn config(&self) -> &RentAdminConfig {
        &self.config
    }

    /// 为指定推送路径派生一个集合同步器（未启动，调用方 `start()`）
    pub fn collection_sync(&self, ws_path: &str) -> CollectionSync {
        CollectionSync::new(
            self.config.ws_endpoint(ws_path),
            self.transport.clone(),
            self.config.reconnect.clone(),
        )
    }

    /// 为指定路由集派生一个命令通道（复用共享 HTTP 客户端）
    pub fn command_channel(&self, routes: CollectionRoutes) -> CommandChannel {
        CommandChannel::new(self.http.clone(), self.config.api_base_url.clone(), routes)
    }

    /// 业主列表同步器
    pub fn owners_sync(&self) -> CollectionSync {
        self.collection_sync(OWNERS_WS_PATH)
    }

    /// 业主命令通道
    pub fn owners(&self) -> CommandChannel {
        self.command_channel(CollectionRoutes::owners())
    }
}
