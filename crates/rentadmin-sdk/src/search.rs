//! 搜索投影
//!
//! 在同步集合上派生大小写不敏感的子串过滤视图。空白查询是恒等投影。
//! 过滤本身是纯函数；`SearchProjection` 额外按（集合版本，规范化查询）
//! 做记忆化，集合与查询都没变时直接复用上次结果。

use crate::entity::{Collection, Record};

/// 纯过滤：任一配置字段（大小写折叠后）包含查询子串即命中
///
/// 缺失或非字符串字段视为不命中，绝不报错。
pub fn filter_records(records: &[Record], fields: &[String], query: &str) -> Vec<Record> {
    let term = query.trim().to_lowercase();
    if term.is_empty() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|record| {
            fields.iter().any(|field| {
                record
                    .field_str(field)
                    .map(|value| value.to_lowercase().contains(&term))
                    .unwrap_or(false)
            })
        })
        .cloned()
        .collect()
}

struct CacheEntry {
    version: u64,
    term: String,
    rows: Vec<Record>,
}

/// 带记忆化的搜索投影
pub struct SearchProjection {
    fields: Vec<String>,
    cache: Option<CacheEntry>,
}

impl SearchProjection {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            cache: None,
        }
    }

    /// 业主列表的默认可检索字段
    pub fn owners() -> Self {
        Self::new(["userName", "userID", "phoneNumber"])
    }

    /// 投影当前集合；仅当集合版本或查询变化时重算
    pub fn project(&mut self, collection: &Collection, query: &str) -> Vec<Record> {
        let term = query.trim().to_lowercase();
        if let Some(cache) = &self.cache {
            if cache.version == collection.version() && cache.term == term {
                return cache.rows.clone();
            }
        }
        let rows = filter_records(collection.records(), &self.fields, query);
        self.cache = Some(CacheEntry {
            version: collection.version(),
            term,
            rows: rows.clone(),
        });
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn owners() -> Collection {
        let mut c = Collection::new();
        for value in [
            json!({ "id": "1", "userName": "Alice", "userID": "alice01", "phoneNumber": "012345" }),
            json!({ "id": "2", "userName": "Bob", "userID": "bob02", "phoneNumber": null }),
            json!({ "id": "3", "userName": "Carol", "userID": "carol03" }),
        ] {
            c.insert(Record::from_value(value).unwrap());
        }
        c
    }

    fn names(rows: &[Record]) -> Vec<String> {
        rows.iter()
            .map(|r| r.field_str("userName").unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_case_insensitive_substring_match() {
        let c = owners();
        let fields = vec!["userName".to_string()];

        assert_eq!(names(&filter_records(c.records(), &fields, "lic")), vec!["Alice"]);
        assert_eq!(names(&filter_records(c.records(), &fields, "ALICE")), vec!["Alice"]);
        assert!(filter_records(c.records(), &fields, "zoe").is_empty());
    }

    #[test]
    fn test_empty_and_whitespace_query_is_identity() {
        let c = owners();
        let fields = vec!["userName".to_string()];

        let all = filter_records(c.records(), &fields, "");
        assert_eq!(names(&all), vec!["Alice", "Bob", "Carol"]);
        let all = filter_records(c.records(), &fields, "   ");
        assert_eq!(names(&all), vec!["Alice", "Bob", "Carol"]);
    }

    #[test]
    fn test_missing_and_null_fields_never_match() {
        let c = owners();
        // Bob 的 phoneNumber 为 null，Carol 缺失该字段；都不命中也不崩
        let fields = vec!["phoneNumber".to_string()];
        assert_eq!(names(&filter_records(c.records(), &fields, "012")), vec!["Alice"]);
    }

    #[test]
    fn test_multi_field_match_preserves_order() {
        let c = owners();
        let mut projection = SearchProjection::owners();
        // "o" 命中 Bob（userName/userID）与 Carol（userName），保持集合顺序
        let rows = projection.project(&c, "o");
        assert_eq!(names(&rows), vec!["Bob", "Carol"]);
    }

    #[test]
    fn test_projection_tracks_collection_changes() {
        let mut c = owners();
        let mut projection = SearchProjection::owners();

        assert_eq!(names(&projection.project(&c, "ali")), vec!["Alice"]);
        // 重复投影（版本与查询都没变）结果一致
        assert_eq!(names(&projection.project(&c, "ali")), vec!["Alice"]);

        c.remove("1");
        assert!(projection.project(&c, "ali").is_empty());

        c.insert(Record::from_value(json!({ "id": "9", "userName": "Alina" })).unwrap());
        assert_eq!(names(&projection.project(&c, "ali")), vec!["Alina"]);
    }
}
