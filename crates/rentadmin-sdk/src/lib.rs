//! RentAdmin SDK - 租赁管理后台实时数据 SDK
//!
//! 为管理端提供与后端保持一致的本地集合镜像，包括：
//! - 📡 推送通道集合同步：init 快照 + create/update/delete 增量
//! - 🔄 异常断开线性退避重连，重试耗尽后降级并上报
//! - 🔗 REST 命令通道：创建/更新/删除与并发批量删除三分桶
//! - 🔍 搜索投影：大小写不敏感子串过滤，按集合版本记忆化
//! - 📊 实时计数器：仪表盘用，挂接同一条同步事件流
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use rentadmin_sdk::{RentAdminConfig, RentAdminSDK, SearchProjection};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RentAdminConfig::builder()
//!         .api_base_url("http://localhost:8000")
//!         .ws_base_url("ws://localhost:8000")
//!         .build();
//!     let sdk = RentAdminSDK::initialize(config)?;
//!
//!     // 业主列表：实时同步 + 命令通道
//!     let sync = sdk.owners_sync();
//!     sync.start();
//!
//!     let owners = sdk.owners();
//!     owners
//!         .create(serde_json::json!({
//!             "username": "alice",
//!             "password": "secret",
//!             "gender": "Female"
//!         }))
//!         .await?;
//!
//!     // 搜索视图
//!     let collection = sync.collection();
//!     let mut search = SearchProjection::owners();
//!     let visible = search.project(&*collection.read().await, "ali");
//!     println!("匹配 {} 条", visible.len());
//!
//!     // 视图卸载时确定性收尾
//!     sync.shutdown().await;
//!     Ok(())
//! }
//! ```

// 导出核心模块
pub mod commands;
pub mod config;
pub mod connection;
pub mod counter;
pub mod entity;
pub mod error;
pub mod events;
pub mod sdk;
pub mod search;
pub mod sync;
pub mod transport;
pub mod version;

// 重新导出核心类型，方便使用
pub use commands::{
    BulkFailure, BulkResult, CollectionRoutes, CommandChannel, ConfirmDelete, ConfirmPrompt,
    is_in_use_error,
};
pub use config::{HttpClientConfig, RentAdminConfig, RentAdminConfigBuilder};
pub use connection::{ConnectionStatus, ReconnectConfig, ReconnectPolicy};
pub use counter::LiveCounter;
pub use entity::{canonical_id, Collection, CollectionChange, EntityId, Record};
pub use error::{RentAdminSDKError, Result};
pub use events::{init_request, PushEvent, SyncEvent};
pub use sdk::{RentAdminSDK, OWNERS_WS_PATH};
pub use search::{filter_records, SearchProjection};
pub use sync::CollectionSync;
pub use transport::{PushConnection, PushTransport, WsTransport};
pub use version::SDK_VERSION;
