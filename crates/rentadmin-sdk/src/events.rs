//! 推送通道消息解析与同步事件广播
//!
//! 入站消息线格式：
//!
//! ```json
//! { "action": "init" | "create" | "update" | "delete",
//!   "data":   <Entity | [Entity] | null>,
//!   "id":     <id> }
//! ```
//!
//! - `init`: `data` 为全量快照数组
//! - `create`: `data` 为单条实体
//! - `update` / `delete`: 目标 id 取顶层 `id`，缺失时回退 `data.id`
//!   （后端各广播点对两处 id 的使用并不一致，SDK 侧统一按此优先级解析）
//!
//! 无法解析的消息静默丢弃，绝不中断同步循环。

use crate::connection::ConnectionStatus;
use crate::entity::{canonical_id, CollectionChange, EntityId, Record};
use serde_json::Value;

/// 通道打开后立即发送的握手消息，向服务端请求全量快照
pub fn init_request() -> String {
    r#"{"action":"init"}"#.to_string()
}

/// 已解析的推送事件
#[derive(Debug, Clone)]
pub enum PushEvent {
    /// 全量快照（data 为 null 时等价于空数组）
    Init(Vec<Record>),
    /// 单条新增
    Create(Record),
    /// 原位替换（记录已按 `{ ...data, id }` 合并）
    Update(Record),
    /// 按 id 删除
    Delete(EntityId),
}

impl PushEvent {
    /// 解析一条入站文本消息；任何畸形输入返回 None，由调用方丢弃
    pub fn parse(text: &str) -> Option<PushEvent> {
        let msg: Value = serde_json::from_str(text).ok()?;
        let action = msg.get("action")?.as_str()?;

        match action {
            "init" => {
                let records = match msg.get("data") {
                    Some(Value::Array(items)) => items
                        .iter()
                        .filter_map(|item| Record::from_value(item.clone()))
                        .collect(),
                    // data 缺失或为 null：空快照
                    Some(Value::Null) | None => Vec::new(),
                    _ => return None,
                };
                Some(PushEvent::Init(records))
            }
            "create" => {
                let record = Record::from_value(msg.get("data")?.clone())?;
                Some(PushEvent::Create(record))
            }
            "update" => {
                let raw_id = target_id_value(&msg)?;
                let data = msg.get("data").cloned().unwrap_or(Value::Null);
                let record = Record::merged(raw_id, data)?;
                Some(PushEvent::Update(record))
            }
            "delete" => {
                let raw_id = target_id_value(&msg)?;
                Some(PushEvent::Delete(canonical_id(&raw_id)?))
            }
            _ => None,
        }
    }
}

/// 目标 id 解析：顶层 `id` 优先，回退 `data.id`
fn target_id_value(msg: &Value) -> Option<Value> {
    if let Some(id) = msg.get("id") {
        if canonical_id(id).is_some() {
            return Some(id.clone());
        }
    }
    let id = msg.get("data")?.get("id")?;
    canonical_id(id).is_some().then(|| id.clone())
}

/// 同步器对外广播的事件（集合变化 + 连接状态迁移）
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// 集合发生有效变化；`version` 是该变化落地后的集合版本号，
    /// 订阅方可用它识别已计入自身初始状态的事件回声
    Collection {
        version: u64,
        change: CollectionChange,
    },
    /// 连接状态迁移
    StatusChanged {
        old: ConnectionStatus,
        new: ConnectionStatus,
    },
}
