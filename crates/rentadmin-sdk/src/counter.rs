//! 实时计数器（仪表盘用）
//!
//! 不单独开第二条套接字：挂在已有 `CollectionSync` 的事件订阅上，
//! 把集合变化折叠成一个计数。快照置为长度，create +1，delete −1
//! （截断到 0），update 不改变计数。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::entity::CollectionChange;
use crate::events::SyncEvent;
use crate::sync::CollectionSync;

/// 把一条集合变化折叠到当前计数
fn fold_count(current: u64, change: &CollectionChange) -> u64 {
    match change {
        CollectionChange::Snapshot { count } => *count as u64,
        CollectionChange::Created(_) => current + 1,
        CollectionChange::Deleted(_) => current.saturating_sub(1),
        CollectionChange::Updated(_) => current,
    }
}

/// 挂接在集合同步器上的实时计数
pub struct LiveCounter {
    count: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl LiveCounter {
    /// 订阅同步器事件并以当前集合长度为初值
    pub async fn attach(sync: &CollectionSync) -> Self {
        // 订阅必须先于读初值，否则两步之间落地的变化会整条丢失；
        // 由此可能重放的"已计入初值"事件按版本水位跳过
        let events = sync.subscribe();
        let (initial, watermark) = {
            let collection = sync.collection();
            let guard = collection.read().await;
            (guard.len() as u64, guard.version())
        };
        Self::spawn(events, initial, watermark)
    }

    /// 以给定初值与版本水位启动折叠任务
    ///
    /// 版本不高于水位的集合事件已反映在初值里（订阅先于读初值的回声），
    /// 跳过不再折叠，避免同一变化被计两次。
    fn spawn(
        mut events: tokio::sync::broadcast::Receiver<SyncEvent>,
        initial: u64,
        watermark: u64,
    ) -> Self {
        let count = Arc::new(AtomicU64::new(initial));
        let shared = count.clone();

        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(SyncEvent::Collection { version, change }) => {
                        if version <= watermark {
                            continue;
                        }
                        let next = fold_count(shared.load(Ordering::SeqCst), &change);
                        shared.store(next, Ordering::SeqCst);
                    }
                    Ok(SyncEvent::StatusChanged { .. }) => {}
                    // 消费过慢丢了事件：下一次 init 快照会纠正计数
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!("计数器落后 {} 条事件，等待下次快照纠正", skipped);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Self { count, task }
    }

    pub fn get(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }
}

impl Drop for LiveCounter {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{ConnectionStatus, ReconnectConfig};
    use crate::entity::Record;
    use crate::transport::test_helpers::ScriptedTransport;
    use serde_json::json;
    use std::time::Duration;

    fn record(id: &str) -> Record {
        Record::from_value(json!({ "id": id })).unwrap()
    }

    #[test]
    fn test_fold_count_rules() {
        assert_eq!(fold_count(3, &CollectionChange::Snapshot { count: 7 }), 7);
        assert_eq!(fold_count(7, &CollectionChange::Created(record("1"))), 8);

        let deleted = CollectionChange::Deleted("1".to_string());
        assert_eq!(fold_count(8, &deleted), 7);
        // 删除事件不把计数打到负数
        assert_eq!(fold_count(0, &deleted), 0);

        assert_eq!(fold_count(7, &CollectionChange::Updated(record("1"))), 7);
    }

    #[tokio::test]
    async fn test_events_already_in_initial_count_not_refolded() {
        let (tx, rx) = tokio::sync::broadcast::channel(16);
        // 初值 1 已包含版本 1 的新增；同一事件经广播重放不再 +1
        let counter = LiveCounter::spawn(rx, 1, 1);

        tx.send(SyncEvent::Collection {
            version: 1,
            change: CollectionChange::Created(record("1")),
        })
        .unwrap();
        tx.send(SyncEvent::StatusChanged {
            old: ConnectionStatus::Connecting,
            new: ConnectionStatus::Open,
        })
        .unwrap();
        tx.send(SyncEvent::Collection {
            version: 2,
            change: CollectionChange::Created(record("2")),
        })
        .unwrap();

        for _ in 0..500 {
            if counter.get() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(counter.get(), 2);
    }

    #[tokio::test]
    async fn test_counter_follows_sync_events() {
        let transport = ScriptedTransport::new();
        let mut session = transport.push_session();
        let sync = CollectionSync::new(
            "ws://test/api/ws/owners",
            transport.clone(),
            ReconnectConfig::default(),
        );
        let counter = LiveCounter::attach(&sync).await;
        sync.start();

        assert!(session.next_sent().await.is_some());
        session.push(
            json!({ "action": "init", "data": [{ "id": "1" }, { "id": "2" }] }).to_string(),
        );
        session.push(json!({ "action": "create", "data": { "id": "3" } }).to_string());
        session.push(json!({ "action": "delete", "id": "1" }).to_string());
        session.push(json!({ "action": "delete", "id": "2" }).to_string());

        for _ in 0..500 {
            if counter.get() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(counter.get(), 1);

        sync.shutdown().await;
    }
}
