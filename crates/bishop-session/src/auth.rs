//! # Auth Flow
//!
//! 手机号登记与验证码确认。没有远程短信服务，验证只在本地完成：
//! 登记手机号会清除验证标记，输入完整的 6 位验证码后置位。

use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::info;

use crate::error::{StorageError, StorageResult};
use crate::state::StateStore;

/// 手机号最短长度
pub const MIN_PHONE_LEN: usize = 5;
/// 验证码位数
pub const CODE_LEN: usize = 6;
/// 重新发送验证码的冷却时间
pub const RESEND_COOLDOWN: Duration = Duration::from_secs(60);

/// 认证错误，前三种以字段级提示的形式展示
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Please enter a valid phone number")]
    InvalidPhone,

    #[error("Please enter the complete verification code")]
    IncompleteCode,

    #[error("No phone number on file")]
    NoPhoneOnFile,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AuthError {
    /// 是否属于输入校验错误
    pub fn is_validation(&self) -> bool {
        matches!(self, AuthError::InvalidPhone | AuthError::IncompleteCode)
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

/// 启动时的落地页
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Landing {
    Chat,
    Login,
}

/// 已登录进入聊天；未登录且额度用完进入登录页；否则以试用身份进入聊天
pub async fn landing(state: &StateStore, threshold: u32) -> StorageResult<Landing> {
    if state.is_authenticated().await? {
        return Ok(Landing::Chat);
    }
    if state.trial_attempts().await? >= threshold {
        return Ok(Landing::Login);
    }
    Ok(Landing::Chat)
}

/// 登录 / 验证流程
#[derive(Clone)]
pub struct AuthFlow {
    state: StateStore,
}

impl AuthFlow {
    pub fn new(state: StateStore) -> Self {
        Self { state }
    }

    /// 登记手机号，并重置验证状态
    pub async fn submit_phone(&self, phone: &str) -> AuthResult<()> {
        let phone = phone.trim();
        if phone.chars().count() < MIN_PHONE_LEN {
            return Err(AuthError::InvalidPhone);
        }

        self.state.set_phone_number(phone).await?;
        self.state.clear_verified().await?;
        info!("Phone number registered, awaiting verification");
        Ok(())
    }

    /// 校验验证码并标记为已验证
    pub async fn submit_code(&self, code: &str) -> AuthResult<()> {
        if self.state.phone_number().await?.is_none() {
            return Err(AuthError::NoPhoneOnFile);
        }

        let code = code.trim();
        if code.len() != CODE_LEN || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(AuthError::IncompleteCode);
        }

        self.state.set_verified().await?;
        info!("Phone number verified");
        Ok(())
    }

    pub async fn has_phone_on_file(&self) -> AuthResult<bool> {
        Ok(self.state.phone_number().await?.is_some())
    }

    pub async fn is_authenticated(&self) -> AuthResult<bool> {
        Ok(self.state.is_authenticated().await?)
    }

    pub async fn sign_out(&self) -> AuthResult<()> {
        self.state.sign_out().await?;
        info!("Signed out");
        Ok(())
    }
}

/// 重新发送验证码的倒计时
#[derive(Debug, Clone)]
pub struct ResendCountdown {
    cooldown: Duration,
    ready_at: Instant,
}

impl ResendCountdown {
    /// 以默认冷却时间开始计时
    pub fn start() -> Self {
        Self::with_cooldown(RESEND_COOLDOWN)
    }

    pub fn with_cooldown(cooldown: Duration) -> Self {
        Self {
            cooldown,
            ready_at: Instant::now() + cooldown,
        }
    }

    /// 剩余秒数（向上取整）
    pub fn remaining_secs(&self) -> u64 {
        let remaining = self.ready_at.saturating_duration_since(Instant::now());
        remaining.as_millis().div_ceil(1000) as u64
    }

    pub fn can_resend(&self) -> bool {
        Instant::now() >= self.ready_at
    }

    /// 倒计时结束时重新开始并返回 true，否则返回 false
    pub fn try_resend(&mut self) -> bool {
        if !self.can_resend() {
            return false;
        }
        self.ready_at = Instant::now() + self.cooldown;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_phone_validation() {
        let state = StateStore::in_memory();
        let flow = AuthFlow::new(state.clone());

        let err = flow.submit_phone("  123 ").await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "Please enter a valid phone number");
        assert_eq!(state.phone_number().await.unwrap(), None);

        flow.submit_phone("+1 555 1234").await.unwrap();
        assert_eq!(
            state.phone_number().await.unwrap().as_deref(),
            Some("+1 555 1234")
        );
    }

    #[tokio::test]
    async fn test_new_phone_resets_verification() {
        let state = StateStore::in_memory();
        let flow = AuthFlow::new(state.clone());

        flow.submit_phone("5551234").await.unwrap();
        flow.submit_code("123456").await.unwrap();
        assert!(flow.is_authenticated().await.unwrap());

        flow.submit_phone("5559876").await.unwrap();
        assert!(!flow.is_authenticated().await.unwrap());
    }

    #[tokio::test]
    async fn test_code_validation() {
        let state = StateStore::in_memory();
        let flow = AuthFlow::new(state.clone());

        assert!(matches!(
            flow.submit_code("123456").await,
            Err(AuthError::NoPhoneOnFile)
        ));

        flow.submit_phone("5551234").await.unwrap();
        assert!(matches!(
            flow.submit_code("12345").await,
            Err(AuthError::IncompleteCode)
        ));
        assert!(matches!(
            flow.submit_code("12a456").await,
            Err(AuthError::IncompleteCode)
        ));
        assert!(!state.is_verified().await.unwrap());

        flow.submit_code("654321").await.unwrap();
        assert!(state.is_authenticated().await.unwrap());

        flow.sign_out().await.unwrap();
        assert!(!flow.has_phone_on_file().await.unwrap());
    }

    #[tokio::test]
    async fn test_landing() {
        let state = StateStore::in_memory();
        assert_eq!(landing(&state, 5).await.unwrap(), Landing::Chat);

        state.set_trial_attempts(5).await.unwrap();
        assert_eq!(landing(&state, 5).await.unwrap(), Landing::Login);

        state.set_phone_number("5551234").await.unwrap();
        state.set_verified().await.unwrap();
        assert_eq!(landing(&state, 5).await.unwrap(), Landing::Chat);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resend_countdown() {
        let mut countdown = ResendCountdown::start();
        assert_eq!(countdown.remaining_secs(), 60);
        assert!(!countdown.try_resend());

        tokio::time::advance(Duration::from_millis(59_500)).await;
        assert_eq!(countdown.remaining_secs(), 1);
        assert!(!countdown.can_resend());

        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(countdown.try_resend());
        assert_eq!(countdown.remaining_secs(), 60);
    }
}
