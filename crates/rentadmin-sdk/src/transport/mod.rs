//! 推送通道传输层抽象
//!
//! `CollectionSync` 只依赖这里的两个 trait，不关心底层是 WebSocket 还是
//! 测试用的内存通道。生产实现见 `ws` 子模块。
//!
//! 语义约定：
//! - `recv_text` 返回 `Ok(None)` 表示对端关闭（无论 clean 与否），
//!   返回 `Err` 表示传输错误；两者对同步循环都是"异常断开"
//! - 主动关闭只能通过 `close()`，由 `CollectionSync::shutdown()` 触发

use crate::error::Result;
use async_trait::async_trait;

pub mod ws;

pub use ws::WsTransport;

/// 传输工厂：按端点建立一条推送连接
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// 建立连接；握手失败与网络拒绝都返回 `Transport` 错误，
    /// 对重连策略而言等价于一次异常断开
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn PushConnection>>;
}

/// 一条已建立的推送连接
#[async_trait]
pub trait PushConnection: Send {
    /// 发送一条文本消息（握手请求等）
    async fn send_text(&mut self, text: &str) -> Result<()>;

    /// 等待下一条入站文本消息；`Ok(None)` 表示对端已关闭
    async fn recv_text(&mut self) -> Result<Option<String>>;

    /// 主动关闭（尽力而为，失败不上抛）
    async fn close(&mut self);
}
