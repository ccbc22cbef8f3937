//! # Session Book
//!
//! 会话模型：有序的会话集合（最新在前）加上当前激活的会话。
//!
//! 所有修改都在内存中完成后立即整体写回 [`StateStore`]。
//! 会话从不删除；消息只追加；后端关联 ID 只设置一次。

use tracing::{debug, info, warn};

use crate::error::StorageResult;
use crate::state::StateStore;
use crate::types::{ChatSession, Message, Service};

/// 会话集合
pub struct SessionBook {
    state: StateStore,
    sessions: Vec<ChatSession>,
    active_id: Option<String>,
}

impl SessionBook {
    /// 从状态存储加载会话集合，初始没有激活会话
    pub async fn load(state: StateStore) -> StorageResult<Self> {
        let sessions = state.load_sessions().await?;
        info!("Loaded {} chat sessions", sessions.len());
        Ok(Self {
            state,
            sessions,
            active_id: None,
        })
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    /// 全部会话，最新在前
    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ChatSession> {
        self.sessions.iter().find(|session| session.id() == id)
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    /// 当前激活的会话
    pub fn active(&self) -> Option<&ChatSession> {
        self.active_id.as_deref().and_then(|id| self.get(id))
    }

    /// 激活会话当前的服务，没有激活会话时为默认服务
    pub fn active_service(&self) -> Service {
        self.active().map(ChatSession::service).unwrap_or_default()
    }

    /// 切换激活会话；ID 不存在时返回 false 且不改变状态
    pub fn select(&mut self, id: &str) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.active_id = Some(id.to_string());
        true
    }

    /// 取消激活（侧边栏的 "New Chat"）
    pub fn clear_active(&mut self) {
        self.active_id = None;
    }

    /// 创建会话并设为激活
    pub async fn create_session(
        &mut self,
        service: Service,
        initial: Option<Message>,
    ) -> StorageResult<ChatSession> {
        let session = self.open_session(service, initial);
        self.save().await?;
        Ok(session)
    }

    /// 只在内存中创建并激活会话，调用方负责随后 [`save`](Self::save)
    pub fn open_session(&mut self, service: Service, initial: Option<Message>) -> ChatSession {
        let session = ChatSession::new(self.fresh_id(), service, initial);
        self.sessions.insert(0, session.clone());
        self.active_id = Some(session.id().to_string());

        debug!(
            "Created session {} (service: {}, title: {:?})",
            session.id(),
            session.service(),
            session.title()
        );
        session
    }

    /// 追加消息；会话不存在时静默忽略并返回 false
    pub async fn append_message(&mut self, id: &str, message: Message) -> StorageResult<bool> {
        if !self.push_message(id, message) {
            return Ok(false);
        }
        self.save().await?;
        Ok(true)
    }

    /// 只在内存中追加消息
    pub fn push_message(&mut self, id: &str, message: Message) -> bool {
        match self.get_mut(id) {
            Some(session) => {
                session.push(message);
                true
            }
            None => {
                debug!("push_message: unknown session {}", id);
                false
            }
        }
    }

    /// 记录后端会话 ID，只设置一次
    ///
    /// 相同的值重复到达是无操作；不同的值会被忽略并记一条警告。
    pub async fn set_backend_correlation(
        &mut self,
        id: &str,
        backend_id: &str,
    ) -> StorageResult<bool> {
        let Some(session) = self.get_mut(id) else {
            return Ok(false);
        };
        if !bind_backend(session, backend_id) {
            return Ok(false);
        }
        self.save().await?;
        Ok(true)
    }

    /// 把会话的服务切回普通聊天
    pub async fn reset_service_to_default(&mut self, id: &str) -> StorageResult<bool> {
        let Some(session) = self.get_mut(id) else {
            return Ok(false);
        };
        if session.service().is_default() {
            return Ok(false);
        }
        session.set_service(Service::default());
        self.save().await?;
        Ok(true)
    }

    /// 一次成功回复的全部改动：追加回复、绑定后端 ID、切回普通聊天，最后只写一次
    ///
    /// 写入失败时内存中的改动保留，下一次写入会一并落盘。
    pub async fn record_reply(
        &mut self,
        id: &str,
        reply: Message,
        backend_id: Option<&str>,
    ) -> StorageResult<bool> {
        let Some(session) = self.get_mut(id) else {
            return Ok(false);
        };
        session.push(reply);
        if let Some(backend_id) = backend_id {
            bind_backend(session, backend_id);
        }
        if !session.service().is_default() {
            session.set_service(Service::default());
        }
        self.save().await?;
        Ok(true)
    }

    /// 把整个集合写回存储
    pub async fn save(&self) -> StorageResult<()> {
        self.state.save_sessions(&self.sessions).await
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut ChatSession> {
        self.sessions.iter_mut().find(|session| session.id() == id)
    }

    /// 生成与现有会话不冲突的 ID
    fn fresh_id(&self) -> String {
        loop {
            let id = uuid::Uuid::new_v4().to_string();
            if self.get(&id).is_none() {
                return id;
            }
        }
    }
}

/// 只在尚未绑定时写入；返回是否发生了改动
fn bind_backend(session: &mut ChatSession, backend_id: &str) -> bool {
    let existing = session.backend_session_id().map(str::to_string);
    match existing {
        None => {
            session.set_backend_session_id(backend_id.to_string());
            true
        }
        Some(ref existing) if existing == backend_id => false,
        Some(existing) => {
            warn!(
                "Session {} already bound to backend id {}, ignoring {}",
                session.id(),
                existing,
                backend_id
            );
            false
        }
    }
}
