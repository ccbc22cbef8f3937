//! # State Store
//!
//! 对键值存储的类型化封装。所有键名只在这里出现，
//! 其他模块只通过这里的读写方法访问本地状态。

use std::sync::Arc;

use tracing::warn;

use crate::error::StorageResult;
use crate::store::{KeyValueStore, MemoryStore};
use crate::types::ChatSession;

/// 会话列表
pub const KEY_CHAT_SESSIONS: &str = "chatSessions";
/// 已登记的手机号
pub const KEY_PHONE_NUMBER: &str = "phoneNumber";
/// 验证码已通过
pub const KEY_IS_VERIFIED: &str = "isVerified";
/// 匿名试用次数（十进制字符串）
pub const KEY_TRIAL_ATTEMPTS: &str = "trialAttempts";

/// 类型化状态存储
#[derive(Clone)]
pub struct StateStore {
    kv: Arc<dyn KeyValueStore>,
}

impl StateStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// 内存版本，用于测试
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// 底层键值存储
    pub fn raw(&self) -> &Arc<dyn KeyValueStore> {
        &self.kv
    }

    /// 读取会话列表，缺失时返回空列表
    pub async fn load_sessions(&self) -> StorageResult<Vec<ChatSession>> {
        match self.kv.get(KEY_CHAT_SESSIONS).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// 整体写回会话列表
    pub async fn save_sessions(&self, sessions: &[ChatSession]) -> StorageResult<()> {
        let raw = serde_json::to_string(sessions)?;
        self.kv.set(KEY_CHAT_SESSIONS, &raw).await
    }

    /// 读取试用次数，缺失或无法解析时为 0
    pub async fn trial_attempts(&self) -> StorageResult<u32> {
        let raw = self.kv.get(KEY_TRIAL_ATTEMPTS).await?;
        Ok(match raw {
            Some(value) => value.trim().parse().unwrap_or_else(|_| {
                warn!("Ignoring malformed {} value: {:?}", KEY_TRIAL_ATTEMPTS, value);
                0
            }),
            None => 0,
        })
    }

    pub async fn set_trial_attempts(&self, attempts: u32) -> StorageResult<()> {
        self.kv
            .set(KEY_TRIAL_ATTEMPTS, &attempts.to_string())
            .await
    }

    pub async fn reset_trial_attempts(&self) -> StorageResult<()> {
        self.kv.remove(KEY_TRIAL_ATTEMPTS).await
    }

    pub async fn phone_number(&self) -> StorageResult<Option<String>> {
        Ok(self
            .kv
            .get(KEY_PHONE_NUMBER)
            .await?
            .filter(|phone| !phone.is_empty()))
    }

    pub async fn set_phone_number(&self, phone: &str) -> StorageResult<()> {
        self.kv.set(KEY_PHONE_NUMBER, phone).await
    }

    /// 非空即视为已验证
    pub async fn is_verified(&self) -> StorageResult<bool> {
        Ok(self
            .kv
            .get(KEY_IS_VERIFIED)
            .await?
            .is_some_and(|value| !value.is_empty()))
    }

    pub async fn set_verified(&self) -> StorageResult<()> {
        self.kv.set(KEY_IS_VERIFIED, "true").await
    }

    pub async fn clear_verified(&self) -> StorageResult<()> {
        self.kv.remove(KEY_IS_VERIFIED).await
    }

    /// 手机号与验证标记同时存在才算已登录
    pub async fn is_authenticated(&self) -> StorageResult<bool> {
        Ok(self.phone_number().await?.is_some() && self.is_verified().await?)
    }

    /// 退出登录，清除两个认证标记
    pub async fn sign_out(&self) -> StorageResult<()> {
        self.kv.remove(KEY_PHONE_NUMBER).await?;
        self.kv.remove(KEY_IS_VERIFIED).await
    }
}
