//! 实体与本地集合
//!
//! `Collection` 是服务端列表状态在本地的唯一镜像：
//! - 按 id 去重，任何时刻不存在两条同 id 记录
//! - 保持插入顺序；update 原位替换，不改变位置
//! - 只由推送事件（及 init 快照）修改，命令通道从不直接写入
//!
//! 每次有效修改都会递增 `version`，供搜索投影等派生视图判断是否需要重算。

use serde::{Serialize, Serializer};
use serde_json::Value;

/// 实体 id 的规范化形式
///
/// 后端可能用字符串或数字作为主键，统一折算成字符串比较；
/// 同一实体在 update 事件前后 id 永不变化。
pub type EntityId = String;

/// 从 JSON 值提取规范化 id（字符串或数字，其余类型视为缺失）
pub fn canonical_id(value: &Value) -> Option<EntityId> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// 一条同步记录：稳定 id + 不透明的领域字段载荷
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: EntityId,
    value: Value,
}

impl Record {
    /// 从事件载荷构造记录；载荷必须是带 `id` 字段的 JSON 对象，否则丢弃
    pub fn from_value(value: Value) -> Option<Self> {
        let id = canonical_id(value.as_object()?.get("id")?)?;
        Some(Self { id, value })
    }

    /// 按 update 事件语义构造：载荷整体替换原字段，但 id 强制为事件目标 id
    ///
    /// 对应后端广播的 `{ ...data, id }`：载荷若不是对象则退化为仅含 id 的对象。
    pub fn merged(raw_id: Value, data: Value) -> Option<Self> {
        let id = canonical_id(&raw_id)?;
        let mut map = match data {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        map.insert("id".to_string(), raw_id);
        Some(Self {
            id,
            value: Value::Object(map),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// 读取字符串字段（缺失或非字符串返回 None）
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.value.get(name)?.as_str()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

/// 应用一条推送事件后对集合产生的实际效果
#[derive(Debug, Clone)]
pub enum CollectionChange {
    /// init 快照整体替换
    Snapshot { count: usize },
    /// 新记录追加到末尾
    Created(Record),
    /// 记录原位替换
    Updated(Record),
    /// 记录按序移除
    Deleted(EntityId),
}

/// 本地有序去重集合
#[derive(Debug, Clone, Default)]
pub struct Collection {
    records: Vec<Record>,
    version: u64,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// 有效修改计数；派生视图据此判断数据是否变化
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn snapshot(&self) -> Vec<Record> {
        self.records.clone()
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// init 快照：整体替换，唯一允许"缩小"集合的事件（delete 之外）
    ///
    /// 快照内部也按 id 去重（保留先到者），保证集合不变量不被脏快照破坏。
    pub fn replace_all(&mut self, records: Vec<Record>) -> usize {
        let mut deduped: Vec<Record> = Vec::with_capacity(records.len());
        for record in records {
            if !deduped.iter().any(|r| r.id() == record.id()) {
                deduped.push(record);
            }
        }
        self.records = deduped;
        self.version += 1;
        self.records.len()
    }

    /// create 事件：幂等追加
    ///
    /// 同 id 记录已存在时为 no-op（重复投递、或本地 REST 响应已先行落地的回声）。
    pub fn insert(&mut self, record: Record) -> bool {
        if self.contains(record.id()) {
            return false;
        }
        self.records.push(record);
        self.version += 1;
        true
    }

    /// update 事件：原位替换同 id 记录，位置不变；目标不存在则 no-op，绝不追加
    pub fn update(&mut self, record: Record) -> bool {
        match self.records.iter_mut().find(|r| r.id() == record.id()) {
            Some(slot) => {
                *slot = record;
                self.version += 1;
                true
            }
            None => false,
        }
    }

    /// delete 事件：按 id 移除，其余记录相对顺序不变；目标不存在则 no-op
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.id() != id);
        if self.records.len() != before {
            self.version += 1;
            true
        } else {
            false
        }
    }

    /// 应用一条已解析的推送事件，返回实际效果（no-op 返回 None）
    pub fn apply(&mut self, event: crate::events::PushEvent) -> Option<CollectionChange> {
        use crate::events::PushEvent;
        match event {
            PushEvent::Init(records) => {
                let count = self.replace_all(records);
                Some(CollectionChange::Snapshot { count })
            }
            PushEvent::Create(record) => self
                .insert(record.clone())
                .then_some(CollectionChange::Created(record)),
            PushEvent::Update(record) => self
                .update(record.clone())
                .then_some(CollectionChange::Updated(record)),
            PushEvent::Delete(id) => self.remove(&id).then_some(CollectionChange::Deleted(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, name: &str) -> Record {
        Record::from_value(json!({ "id": id, "userName": name })).unwrap()
    }

    #[test]
    fn test_record_requires_object_with_id() {
        assert!(Record::from_value(json!({ "id": "a", "x": 1 })).is_some());
        assert!(Record::from_value(json!({ "id": 42 })).is_some());
        assert!(Record::from_value(json!({ "x": 1 })).is_none());
        assert!(Record::from_value(json!("just a string")).is_none());
        assert!(Record::from_value(json!({ "id": null })).is_none());
    }

    #[test]
    fn test_numeric_id_canonicalized() {
        let r = Record::from_value(json!({ "id": 7, "userName": "a" })).unwrap();
        assert_eq!(r.id(), "7");
    }

    #[test]
    fn test_create_is_idempotent() {
        // 同一 create 事件投递两次，集合中该 id 只有一条
        let mut c = Collection::new();
        assert!(c.insert(record("1", "Alice")));
        assert!(!c.insert(record("1", "Alice")));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn test_update_preserves_position() {
        let mut c = Collection::new();
        c.insert(record("1", "A"));
        c.insert(record("2", "B"));
        c.insert(record("3", "C"));

        let replaced = Record::merged(json!("2"), json!({ "userName": "B2" })).unwrap();
        assert!(c.update(replaced));

        let names: Vec<_> = c
            .records()
            .iter()
            .map(|r| r.field_str("userName").unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["A", "B2", "C"]);
        assert_eq!(c.records()[1].id(), "2");
    }

    #[test]
    fn test_delete_preserves_order() {
        let mut c = Collection::new();
        c.insert(record("1", "A"));
        c.insert(record("2", "B"));
        c.insert(record("3", "C"));

        assert!(c.remove("2"));
        let ids: Vec<_> = c.records().iter().map(|r| r.id().to_string()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_missing_target_is_noop() {
        let mut c = Collection::new();
        c.insert(record("1", "A"));
        let before = c.snapshot();
        let version = c.version();

        assert!(!c.update(record("99", "X")));
        assert!(!c.remove("99"));
        assert_eq!(c.snapshot(), before);
        // no-op 不推进版本号，派生视图无需重算
        assert_eq!(c.version(), version);
    }

    #[test]
    fn test_snapshot_replaces_wholesale() {
        let mut c = Collection::new();
        c.insert(record("1", "A"));
        c.insert(record("2", "B"));
        c.insert(record("3", "C"));

        c.replace_all(vec![record("8", "X"), record("9", "Y")]);
        let ids: Vec<_> = c.records().iter().map(|r| r.id().to_string()).collect();
        assert_eq!(ids, vec!["8", "9"]);
    }

    #[test]
    fn test_snapshot_dedupes_by_id() {
        let mut c = Collection::new();
        c.replace_all(vec![record("1", "first"), record("1", "second")]);
        assert_eq!(c.len(), 1);
        assert_eq!(c.get("1").unwrap().field_str("userName"), Some("first"));
    }

    #[test]
    fn test_merged_forces_event_target_id() {
        // 载荷自带的 id 被事件目标 id 覆盖
        let r = Record::merged(json!("5"), json!({ "id": "other", "x": 1 })).unwrap();
        assert_eq!(r.id(), "5");
        assert_eq!(r.value().get("id"), Some(&json!("5")));

        // 非对象载荷退化为仅含 id 的对象
        let r = Record::merged(json!(6), json!(null)).unwrap();
        assert_eq!(r.id(), "6");
        assert_eq!(r.value(), &json!({ "id": 6 }));
    }

    #[test]
    fn test_version_bumps_on_effective_mutations() {
        let mut c = Collection::new();
        let v0 = c.version();
        c.insert(record("1", "A"));
        assert!(c.version() > v0);

        let v1 = c.version();
        c.insert(record("1", "A")); // 幂等 no-op
        assert_eq!(c.version(), v1);

        c.remove("1");
        assert!(c.version() > v1);
    }
}
