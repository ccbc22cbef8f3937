//! # Trial Gate
//!
//! 未登录用户的试用额度。计数器持久化在 `trialAttempts` 键，
//! 达到阈值后拒绝发送并要求弹出登录提示。
//!
//! 这只是客户端的软提醒，清空本地状态即可绕过。

use tracing::{debug, info};

use crate::error::StorageResult;
use crate::state::StateStore;

/// 默认试用阈值
pub const DEFAULT_TRIAL_THRESHOLD: u32 = 5;

/// 试用额度闸门
pub struct TrialGate {
    state: StateStore,
    threshold: u32,
    login_prompt: bool,
}

impl TrialGate {
    pub fn new(state: StateStore, threshold: u32) -> Self {
        Self {
            state,
            threshold,
            login_prompt: false,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// 当前计数
    pub async fn attempts(&self) -> StorageResult<u32> {
        self.state.trial_attempts().await
    }

    /// 剩余试用次数；已登录时为 None
    pub async fn remaining(&self) -> StorageResult<Option<u32>> {
        if self.state.is_authenticated().await? {
            return Ok(None);
        }
        Ok(Some(self.threshold.saturating_sub(self.attempts().await?)))
    }

    /// 检查是否允许发送
    ///
    /// 已登录用户直接放行。未登录且计数达到阈值时返回 false 并置位登录提示。
    pub async fn check_attempts(&mut self) -> StorageResult<bool> {
        if self.state.is_authenticated().await? {
            return Ok(true);
        }

        let attempts = self.attempts().await?;
        if attempts >= self.threshold {
            info!(
                "Trial limit reached ({}/{}), prompting sign-in",
                attempts, self.threshold
            );
            self.login_prompt = true;
            return Ok(false);
        }
        Ok(true)
    }

    /// 计数加一；已登录时不计数
    pub async fn increment_attempts(&self) -> StorageResult<()> {
        if self.state.is_authenticated().await? {
            return Ok(());
        }
        let attempts = self.attempts().await? + 1;
        self.state.set_trial_attempts(attempts).await?;
        debug!("Trial attempts now {}/{}", attempts, self.threshold);
        Ok(())
    }

    /// 检查并计数。调用方只需这一个入口，读改写集中在一处完成。
    pub async fn admit(&mut self) -> StorageResult<bool> {
        if !self.check_attempts().await? {
            return Ok(false);
        }
        self.increment_attempts().await?;
        Ok(true)
    }

    pub fn login_prompt_shown(&self) -> bool {
        self.login_prompt
    }

    pub fn dismiss_prompt(&mut self) {
        self.login_prompt = false;
    }

    /// 清零计数
    pub async fn reset(&mut self) -> StorageResult<()> {
        self.login_prompt = false;
        self.state.reset_trial_attempts().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_increment_counts_up() {
        let state = StateStore::in_memory();
        let gate = TrialGate::new(state.clone(), DEFAULT_TRIAL_THRESHOLD);

        for _ in 0..7 {
            gate.increment_attempts().await.unwrap();
        }
        assert_eq!(state.trial_attempts().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_gate_trips_exactly_at_threshold() {
        let state = StateStore::in_memory();
        let mut gate = TrialGate::new(state, 5);

        for n in 0..5 {
            assert!(gate.admit().await.unwrap(), "send {} should pass", n + 1);
            assert!(!gate.login_prompt_shown());
        }
        assert_eq!(gate.attempts().await.unwrap(), 5);
        assert_eq!(gate.remaining().await.unwrap(), Some(0));

        assert!(!gate.admit().await.unwrap());
        assert!(gate.login_prompt_shown());
        // 被拒绝的尝试不计数
        assert_eq!(gate.attempts().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_gate_stays_closed() {
        let state = StateStore::in_memory();
        state.set_trial_attempts(5).await.unwrap();
        let mut gate = TrialGate::new(state, 5);

        for _ in 0..3 {
            assert!(!gate.check_attempts().await.unwrap());
            gate.dismiss_prompt();
        }

        gate.reset().await.unwrap();
        assert!(gate.check_attempts().await.unwrap());
    }

    #[tokio::test]
    async fn test_authenticated_bypasses_gate() {
        let state = StateStore::in_memory();
        state.set_trial_attempts(9).await.unwrap();
        state.set_phone_number("5551234").await.unwrap();
        state.set_verified().await.unwrap();

        let mut gate = TrialGate::new(state.clone(), 5);
        assert!(gate.admit().await.unwrap());
        assert_eq!(state.trial_attempts().await.unwrap(), 9);
        assert_eq!(gate.remaining().await.unwrap(), None);

        state.sign_out().await.unwrap();
        assert!(!gate.admit().await.unwrap());
    }
}
