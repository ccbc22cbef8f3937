//! # Bishop Session
//!
//! Bishop 客户端的本地状态层。
//!
//! ## 功能特性
//!
//! - **键值存储**：字符串键值，内存或单个 JSON 文件，相当于浏览器的 localStorage
//! - **类型化访问**：会话列表、试用次数、手机号与验证标记
//! - **会话模型**：最新在前的会话集合，消息只追加，后端关联 ID 只设置一次
//! - **试用闸门**：未登录用户的发送次数限制
//! - **登录流程**：手机号登记、验证码确认、重新发送倒计时
//!
//! ## 使用示例
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use bishop_session::{JsonFileStore, Message, Service, SessionBook, StateStore, TrialGate};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = JsonFileStore::open("/tmp/bishop/state.json").await?;
//!     let state = StateStore::new(Arc::new(store));
//!
//!     let mut gate = TrialGate::new(state.clone(), 5);
//!     let mut book = SessionBook::load(state).await?;
//!
//!     if gate.admit().await? {
//!         book.create_session(Service::Chat, Some(Message::user("Hello"))).await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod book;
pub mod error;
pub mod gate;
pub mod state;
pub mod store;
pub mod types;

// 重新导出主要类型
pub use auth::{landing, AuthError, AuthFlow, AuthResult, Landing, ResendCountdown};
pub use book::SessionBook;
pub use error::{StorageError, StorageResult};
pub use gate::{TrialGate, DEFAULT_TRIAL_THRESHOLD};
pub use state::StateStore;
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
pub use types::{ChatSession, Message, Role, Service};

/// 版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_file_backed_book_and_gate() {
        use tempfile::TempDir;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.json");

        {
            let state = StateStore::new(Arc::new(JsonFileStore::open(&path).await.unwrap()));
            let mut gate = TrialGate::new(state.clone(), DEFAULT_TRIAL_THRESHOLD);
            let mut book = SessionBook::load(state).await.unwrap();

            assert!(gate.admit().await.unwrap());
            book.create_session(Service::Chat, Some(Message::user("Hello")))
                .await
                .unwrap();
        }

        let state = StateStore::new(Arc::new(JsonFileStore::open(&path).await.unwrap()));
        let book = SessionBook::load(state.clone()).await.unwrap();

        assert_eq!(book.len(), 1);
        assert_eq!(book.sessions()[0].title(), "Hello");
        assert_eq!(state.trial_attempts().await.unwrap(), 1);
    }
}
