//! 实时集合同步器
//!
//! `CollectionSync` 维护一份与服务端一致的本地 `Collection`：
//! 打开推送通道 → 发送 `{"action":"init"}` 请求快照 → 逐条应用
//! init/create/update/delete 事件；异常断开按 `ReconnectConfig`
//! 线性退避重连，重试耗尽后置降级标志并停止调度。
//!
//! 套接字句柄、重连计数都是实例状态，随 `shutdown()` 一起释放；
//! 多个集合可以各自持有同步器互不干扰。挂起的重连定时器由
//! `CancellationToken` 统一取消，销毁后不会有游离的定时器。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::connection::{ConnectionStatus, ReconnectConfig, ReconnectPolicy};
use crate::entity::{Collection, Record};
use crate::events::{init_request, PushEvent, SyncEvent};
use crate::transport::{PushConnection, PushTransport};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// 一轮会话读取循环的退出原因
#[derive(Debug, PartialEq, Eq)]
enum ReadOutcome {
    /// 对端关闭或传输错误，走重连策略
    Abnormal,
    /// 主动 shutdown，不重试
    Shutdown,
}

/// 同步循环内部共享的上下文
#[derive(Clone)]
struct SyncContext {
    endpoint: String,
    transport: Arc<dyn PushTransport>,
    collection: Arc<RwLock<Collection>>,
    status: Arc<RwLock<ConnectionStatus>>,
    degraded: Arc<AtomicBool>,
    /// 最近一次成功打开的时刻（UTC 毫秒时间戳）
    connected_at: Arc<RwLock<Option<i64>>>,
    events: broadcast::Sender<SyncEvent>,
    shutdown: CancellationToken,
}

/// 实时集合同步器
pub struct CollectionSync {
    ctx: SyncContext,
    reconnect: ReconnectConfig,
    task: StdMutex<Option<JoinHandle<()>>>,
}

impl CollectionSync {
    pub fn new(
        endpoint: impl Into<String>,
        transport: Arc<dyn PushTransport>,
        reconnect: ReconnectConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            ctx: SyncContext {
                endpoint: endpoint.into(),
                transport,
                collection: Arc::new(RwLock::new(Collection::new())),
                status: Arc::new(RwLock::new(ConnectionStatus::Disconnected)),
                degraded: Arc::new(AtomicBool::new(false)),
                connected_at: Arc::new(RwLock::new(None)),
                events,
                shutdown: CancellationToken::new(),
            },
            reconnect,
            task: StdMutex::new(None),
        }
    }

    /// 启动同步循环（幂等：重复调用忽略）
    pub fn start(&self) {
        let mut guard = match self.task.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.is_some() {
            warn!("⚠️ 同步循环已在运行，忽略重复 start: {}", self.ctx.endpoint);
            return;
        }
        let ctx = self.ctx.clone();
        let reconnect = self.reconnect.clone();
        info!("📡 启动集合同步: {}", ctx.endpoint);
        *guard = Some(tokio::spawn(Self::run_loop(ctx, reconnect)));
    }

    /// 主动关闭：确定性收尾，不触发重连，并取消挂起的重连定时器
    pub async fn shutdown(&self) {
        self.ctx.shutdown.cancel();
        let handle = match self.task.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        info!("🔌 集合同步已关闭: {}", self.ctx.endpoint);
    }

    /// 当前集合快照（UI 渲染的唯一数据源）
    pub async fn snapshot(&self) -> Vec<Record> {
        self.ctx.collection.read().await.snapshot()
    }

    pub async fn len(&self) -> usize {
        self.ctx.collection.read().await.len()
    }

    /// 共享集合句柄，供搜索投影等派生视图直接读取
    pub fn collection(&self) -> Arc<RwLock<Collection>> {
        self.ctx.collection.clone()
    }

    pub async fn status(&self) -> ConnectionStatus {
        *self.ctx.status.read().await
    }

    /// 实时更新是否已降级（重连耗尽后为 true，下次成功打开时清除）
    pub fn is_degraded(&self) -> bool {
        self.ctx.degraded.load(Ordering::SeqCst)
    }

    /// 最近一次成功打开的时刻（UTC 毫秒时间戳），从未连上为 None
    pub async fn connected_at(&self) -> Option<i64> {
        *self.ctx.connected_at.read().await
    }

    /// 订阅集合变化与连接状态事件
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.ctx.events.subscribe()
    }

    async fn run_loop(ctx: SyncContext, reconnect: ReconnectConfig) {
        let mut policy = ReconnectPolicy::new(reconnect);

        loop {
            Self::set_status(&ctx, ConnectionStatus::Connecting).await;

            let session = tokio::select! {
                _ = ctx.shutdown.cancelled() => {
                    Self::set_status(&ctx, ConnectionStatus::Closed).await;
                    return;
                }
                result = ctx.transport.connect(&ctx.endpoint) => result,
            };

            match session {
                Ok(mut conn) => {
                    // 打开成功：计数归零、清降级标志、请求快照
                    policy.reset();
                    ctx.degraded.store(false, Ordering::SeqCst);
                    *ctx.connected_at.write().await = Some(chrono::Utc::now().timestamp_millis());
                    match conn.send_text(&init_request()).await {
                        Ok(()) => {
                            Self::set_status(&ctx, ConnectionStatus::Open).await;
                            if Self::read_until_close(&ctx, conn.as_mut()).await
                                == ReadOutcome::Shutdown
                            {
                                conn.close().await;
                                Self::set_status(&ctx, ConnectionStatus::Closed).await;
                                return;
                            }
                            debug!("通道异常断开: {}", ctx.endpoint);
                        }
                        Err(e) => warn!("⚠️ 快照握手发送失败: {}", e),
                    }
                }
                // 连接失败与异常断开同样走重连策略
                Err(e) => warn!("⚠️ 连接失败 ({}): {}", ctx.endpoint, e),
            }

            match policy.next_delay() {
                Some(delay) => {
                    Self::set_status(&ctx, ConnectionStatus::Closed).await;
                    info!(
                        "🔄 第 {} 次重连将在 {}ms 后发起: {}",
                        policy.attempt(),
                        delay.as_millis(),
                        ctx.endpoint
                    );
                    tokio::select! {
                        _ = ctx.shutdown.cancelled() => return,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                None => {
                    // 重试耗尽：置降级标志，停止自动重连（终态）
                    ctx.degraded.store(true, Ordering::SeqCst);
                    Self::set_status(&ctx, ConnectionStatus::Offline).await;
                    warn!("⚠️ 重连均失败，实时更新已降级: {}", ctx.endpoint);
                    return;
                }
            }
        }
    }

    async fn read_until_close(ctx: &SyncContext, conn: &mut dyn PushConnection) -> ReadOutcome {
        loop {
            tokio::select! {
                _ = ctx.shutdown.cancelled() => return ReadOutcome::Shutdown,
                received = conn.recv_text() => match received {
                    Ok(Some(text)) => Self::apply_message(ctx, &text).await,
                    Ok(None) => return ReadOutcome::Abnormal,
                    Err(e) => {
                        warn!("⚠️ 接收失败: {}", e);
                        return ReadOutcome::Abnormal;
                    }
                }
            }
        }
    }

    /// 按到达顺序应用一条消息；畸形消息丢弃，绝不中断循环
    async fn apply_message(ctx: &SyncContext, text: &str) {
        let event = match PushEvent::parse(text) {
            Some(event) => event,
            None => {
                debug!("丢弃无法解析的消息: {}", text);
                return;
            }
        };
        let (change, version) = {
            let mut collection = ctx.collection.write().await;
            let change = collection.apply(event);
            (change, collection.version())
        };
        if let Some(change) = change {
            let _ = ctx.events.send(SyncEvent::Collection { version, change });
        }
    }

    async fn set_status(ctx: &SyncContext, new: ConnectionStatus) {
        let old = {
            let mut status = ctx.status.write().await;
            let old = *status;
            *status = new;
            old
        };
        if old != new {
            debug!("连接状态: {} → {} ({})", old, new, ctx.endpoint);
            let _ = ctx.events.send(SyncEvent::StatusChanged { old, new });
        }
    }
}

impl Drop for CollectionSync {
    fn drop(&mut self) {
        // 防游离任务/定时器：未显式 shutdown 时随实例一起取消
        self.ctx.shutdown.cancel();
        if let Ok(mut guard) = self.task.lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
    }
}
