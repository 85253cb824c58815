//! 连接状态与重连策略
//!
//! 状态机：`Connecting → Open`（握手成功）`→ Closed`（异常断开）
//! `→ Connecting`（计划内重试，attempt 未超限）`→ Offline`（重试耗尽，终态）。
//! 主动 `shutdown()` 产生的 `Open → Closed` 是终态，不触发重试。

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 推送通道连接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    /// 未连接（初始）
    Disconnected,
    /// 连接中
    Connecting,
    /// 已连接，快照请求已发出
    Open,
    /// 已断开（等待重连，或主动关闭）
    Closed,
    /// 重试耗尽，实时更新降级（终态）
    Offline,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "未连接"),
            ConnectionStatus::Connecting => write!(f, "连接中"),
            ConnectionStatus::Open => write!(f, "已连接"),
            ConnectionStatus::Closed => write!(f, "已断开"),
            ConnectionStatus::Offline => write!(f, "已离线"),
        }
    }
}

/// 重连配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// 最大重试次数，超过后进入 Offline 终态
    pub max_attempts: u32,
    /// 基础延迟（毫秒）；第 n 次重试等待 `base_delay_ms * n`
    pub base_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 2000,
        }
    }
}

/// 重连退避策略（实例状态，归属单个 CollectionSync，不共享）
#[derive(Debug)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    attempt: u32,
}

impl ReconnectPolicy {
    pub fn new(config: ReconnectConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// 当前已消耗的重试次数
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// 连接成功后归零；下一次异常断开重新从 `base_delay * 1` 开始
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// 异常断开后取下一次重试的等待时长
    ///
    /// 返回 None 表示重试已耗尽，调用方应置降级标志并停止调度。
    /// attempt 不变量：永不超过 max_attempts。
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.config.max_attempts {
            return None;
        }
        self.attempt += 1;
        Some(Duration::from_millis(
            self.config.base_delay_ms * u64::from(self.attempt),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_backoff_sequence() {
        let mut policy = ReconnectPolicy::new(ReconnectConfig {
            max_attempts: 3,
            base_delay_ms: 2000,
        });

        assert_eq!(policy.next_delay(), Some(Duration::from_millis(2000)));
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(4000)));
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(6000)));
        // 耗尽后不再调度，attempt 不越界
        assert_eq!(policy.next_delay(), None);
        assert_eq!(policy.next_delay(), None);
        assert_eq!(policy.attempt(), 3);
    }

    #[test]
    fn test_reset_restarts_from_base_delay() {
        let mut policy = ReconnectPolicy::new(ReconnectConfig::default());
        policy.next_delay();
        policy.next_delay();
        assert_eq!(policy.attempt(), 2);

        // 连接成功后归零，下一次从 base * 1 开始
        policy.reset();
        assert_eq!(policy.attempt(), 0);
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(2000)));
    }
}
