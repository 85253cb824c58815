//! WebSocket 传输实现（tokio-tungstenite，rustls）

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use super::{PushConnection, PushTransport};
use crate::error::{RentAdminSDKError, Result};

/// 生产环境默认传输：ws:// 或 wss:// 端点
#[derive(Debug, Clone, Default)]
pub struct WsTransport;

impl WsTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PushTransport for WsTransport {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn PushConnection>> {
        let (stream, _response) = connect_async(endpoint).await.map_err(|e| {
            RentAdminSDKError::Transport(format!("WebSocket 连接失败 ({}): {}", endpoint, e))
        })?;
        debug!("🔌 WebSocket 已连接: {}", endpoint);
        Ok(Box::new(WsConnection { stream }))
    }
}

struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl PushConnection for WsConnection {
    async fn send_text(&mut self, text: &str) -> Result<()> {
        self.stream
            .send(Message::Text(text.to_string()))
            .await
            .map_err(|e| RentAdminSDKError::Transport(format!("WebSocket 发送失败: {}", e)))
    }

    async fn recv_text(&mut self) -> Result<Option<String>> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.to_string())),
                // 控制帧与二进制帧对同步协议无意义，跳过
                Some(Ok(Message::Ping(_)))
                | Some(Ok(Message::Pong(_)))
                | Some(Ok(Message::Binary(_)))
                | Some(Ok(Message::Frame(_))) => continue,
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Err(e)) => {
                    return Err(RentAdminSDKError::Transport(format!(
                        "WebSocket 接收失败: {}",
                        e
                    )))
                }
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}
