//! REST 命令通道
//!
//! 对后端发起 create/update/delete，并对批量删除的逐条结果分桶。
//! 命令通道从不直接写本地集合：成功的变更由后端广播回推送通道，
//! 经 `CollectionSync` 达成最终一致；`fetch_all` 仅用于手动对账。
//!
//! ## 冲突识别是与后端的明文契约
//!
//! 后端对"被引用禁止删除"只给人类可读的 detail 文本，没有结构化错误码。
//! SDK 侧按子串匹配识别（见 `is_in_use_error`），匹配逻辑集中在这一个
//! 函数里，后端文案变了只改这一处。

use futures::future::join_all;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::HttpClientConfig;
use crate::entity::{EntityId, Record};
use crate::error::{RentAdminSDKError, Result};
use async_trait::async_trait;
use std::time::Duration;

/// 一个集合的 REST 路由集
///
/// update/delete 在请求时追加 `/{id}`。
#[derive(Debug, Clone)]
pub struct CollectionRoutes {
    pub list: String,
    pub create: String,
    pub update: String,
    pub delete: String,
}

impl CollectionRoutes {
    pub fn new(
        list: impl Into<String>,
        create: impl Into<String>,
        update: impl Into<String>,
        delete: impl Into<String>,
    ) -> Self {
        Self {
            list: list.into(),
            create: create.into(),
            update: update.into(),
            delete: delete.into(),
        }
    }

    /// 业主集合（后端既有路由）
    pub fn owners() -> Self {
        Self::new(
            "/api/owners",
            "/api/create-owner",
            "/api/update-owner",
            "/api/delete-owner",
        )
    }
}

/// 批量删除中单条失败的记录
#[derive(Debug, Clone, PartialEq)]
pub struct BulkFailure {
    pub id: EntityId,
    /// 后端透传的 detail 文本
    pub reason: String,
}

/// 批量删除结果三分桶：每个提交的 id 恰好落在一个桶里
#[derive(Debug, Clone, Default)]
pub struct BulkResult {
    /// 删除成功
    pub success: Vec<EntityId>,
    /// 被引用，禁止删除（"in use"）
    pub in_use: Vec<BulkFailure>,
    /// 其他原因失败
    pub failed: Vec<BulkFailure>,
}

impl BulkResult {
    /// 按逐条结果分桶；输入集合与三桶并集严格相等
    pub fn from_outcomes(outcomes: Vec<(EntityId, Result<()>)>) -> Self {
        let mut result = Self::default();
        for (id, outcome) in outcomes {
            match outcome {
                Ok(()) => result.success.push(id),
                Err(e) if e.is_conflict() => result.in_use.push(BulkFailure {
                    id,
                    reason: e.detail(),
                }),
                Err(e) => result.failed.push(BulkFailure {
                    id,
                    reason: e.detail(),
                }),
            }
        }
        result
    }

    pub fn total(&self) -> usize {
        self.success.len() + self.in_use.len() + self.failed.len()
    }

    pub fn is_all_success(&self) -> bool {
        self.in_use.is_empty() && self.failed.is_empty()
    }
}

/// 删除冲突识别：与后端约定的文案子串（脆弱但唯一可用的契约）
pub fn is_in_use_error(detail: &str) -> bool {
    detail.to_lowercase().contains("in use") || detail.contains("cannot be deleted")
}

/// 从后端错误响应体提取 detail 文本
///
/// FastAPI 两种惯用形态都要兼容：
/// `{"detail": "..."}` 与 `{"detail": [{"msg": "..."}]}`。
fn detail_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items
            .first()?
            .get("msg")?
            .as_str()
            .map(|s| s.to_string()),
        _ => None,
    }
}

/// 删除确认能力（显式注入，替代全局确认对话框）
#[async_trait]
pub trait ConfirmDelete: Send + Sync {
    async fn confirm(&self, prompt: &ConfirmPrompt) -> bool;
}

#[derive(Debug, Clone)]
pub struct ConfirmPrompt {
    pub title: String,
    pub message: String,
}

/// 按配置构建 HTTP 客户端（命令通道与 SDK 门面共用）
pub(crate) fn build_http_client(config: &HttpClientConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();

    if let Some(timeout) = config.connect_timeout_secs {
        builder = builder.connect_timeout(Duration::from_secs(timeout));
    }
    if let Some(timeout) = config.request_timeout_secs {
        builder = builder.timeout(Duration::from_secs(timeout));
    }

    builder
        .build()
        .map_err(|e| RentAdminSDKError::Other(format!("创建 HTTP 客户端失败: {}", e)))
}

/// REST 命令通道
pub struct CommandChannel {
    client: reqwest::Client,
    base_url: String,
    routes: CollectionRoutes,
}

impl CommandChannel {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        routes: CollectionRoutes,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            routes,
        }
    }

    pub fn from_config(
        config: &HttpClientConfig,
        base_url: impl Into<String>,
        routes: CollectionRoutes,
    ) -> Result<Self> {
        Ok(Self::new(build_http_client(config)?, base_url, routes))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn item_url(&self, path: &str, id: &str) -> String {
        format!("{}{}/{}", self.base_url, path, id)
    }

    /// 全量拉取（手动对账路径，例如批量删除后的刷新）
    pub async fn fetch_all(&self) -> Result<Vec<Record>> {
        let response = self.client.get(self.url(&self.routes.list)).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_command_error(status.as_u16(), &body));
        }
        let items: Vec<Value> = response.json().await?;
        Ok(items.into_iter().filter_map(Record::from_value).collect())
    }

    /// 创建实体
    ///
    /// 身份字段（如用户名/密码非空）由调用方先行校验，这里不重复；
    /// 后端报重复键/约束冲突时返回 `Validation`，文案原样透传。
    pub async fn create(&self, payload: Value) -> Result<Record> {
        let response = self
            .client
            .post(self.url(&self.routes.create))
            .json(&payload)
            .send()
            .await?;
        let record = self.expect_record(response).await?;
        info!("✅ 已创建实体: {}", record.id());
        Ok(record)
    }

    /// 更新实体
    ///
    /// 只发送调用方 diff 出的变更字段，避免用陈旧空值覆盖并发修改；
    /// 空 diff 时调用方应直接跳过本调用。
    pub async fn update(&self, id: &str, partial: Value) -> Result<Record> {
        let response = self
            .client
            .put(self.item_url(&self.routes.update, id))
            .json(&partial)
            .send()
            .await?;
        let record = self.expect_record(response).await?;
        info!("✅ 已更新实体: {}", id);
        Ok(record)
    }

    /// 删除实体；被引用时返回 `Conflict`，其余失败返回 `Api`
    pub async fn delete(&self, id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.item_url(&self.routes.delete, id))
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            info!("✅ 已删除实体: {}", id);
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        let detail = detail_message(&body).unwrap_or_else(|| format!("HTTP {}", status));
        if is_in_use_error(&detail) {
            Err(RentAdminSDKError::Conflict(detail))
        } else {
            Err(RentAdminSDKError::Api(detail))
        }
    }

    /// 并发批量删除（尽力而为，无整体回滚）
    ///
    /// 所有 delete 同时发出、全部落定后返回，不因首个失败短路；
    /// 分桶结果就是错误报告，永不上抛部分失败。
    pub async fn bulk_delete(&self, ids: &[EntityId]) -> BulkResult {
        let deletes = ids.iter().map(|id| async move {
            let outcome = self.delete(id).await;
            (id.clone(), outcome)
        });
        let result = BulkResult::from_outcomes(join_all(deletes).await);
        if !result.is_all_success() {
            warn!(
                "⚠️ 批量删除: 成功 {} / 被引用 {} / 失败 {}",
                result.success.len(),
                result.in_use.len(),
                result.failed.len()
            );
        }
        result
    }

    /// 先经确认能力再批量删除；拒绝时返回 None，不发任何请求
    pub async fn bulk_delete_confirmed(
        &self,
        ids: &[EntityId],
        prompt: ConfirmPrompt,
        confirm: &dyn ConfirmDelete,
    ) -> Option<BulkResult> {
        if !confirm.confirm(&prompt).await {
            return None;
        }
        Some(self.bulk_delete(ids).await)
    }

    async fn expect_record(&self, response: reqwest::Response) -> Result<Record> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_command_error(status.as_u16(), &body));
        }
        let value: Value = response.json().await?;
        Record::from_value(value)
            .ok_or_else(|| RentAdminSDKError::Json("响应实体缺少 id 字段".to_string()))
    }
}

/// create/update 路径的错误分类
fn classify_command_error(status: u16, body: &str) -> RentAdminSDKError {
    let detail = detail_message(body).unwrap_or_else(|| format!("HTTP {}", status));
    match status {
        404 => RentAdminSDKError::NotFound(detail),
        400 | 409 | 422 => RentAdminSDKError::Validation(detail),
        _ => RentAdminSDKError::Api(detail),
    }
}
