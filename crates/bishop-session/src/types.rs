//! # Bishop Session Types
//!
//! 定义会话相关的核心类型：消息、服务类型、聊天会话。
//!
//! 序列化格式与网页版 `chatSessions` 保持一致：
//! `{id, title, messages: [{role, content}], service, backendSessionId?, createdAt}`，
//! 其中 `createdAt` 为毫秒时间戳。

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// 没有首条消息时的默认标题
pub const DEFAULT_TITLE: &str = "New Chat";

/// 标题截取的最大字符数
pub const TITLE_MAX_CHARS: usize = 30;

/// 消息角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// 消息结构，创建后内容不可变
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// 创建用户消息
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// 创建助手消息
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// 会话当前绑定的后端能力
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Service {
    /// 普通聊天
    #[default]
    Chat,
    /// 每日灵修
    Devotional,
    /// 经文解释
    ExplainVerse,
}

impl Service {
    pub const ALL: [Service; 3] = [Service::Chat, Service::Devotional, Service::ExplainVerse];

    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Chat => "chat",
            Service::Devotional => "devotional",
            Service::ExplainVerse => "explain-verse",
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Service::Chat)
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Service {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Service::ALL
            .into_iter()
            .find(|service| service.as_str() == s)
            .ok_or_else(|| format!("invalid service: '{s}'"))
    }
}

/// 聊天会话
///
/// 字段只读对外暴露；消息只能追加，`backend_session_id` 只设置一次，
/// 这些约束由 [`crate::SessionBook`] 维护。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    id: String,
    title: String,
    messages: Vec<Message>,
    service: Service,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    backend_session_id: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    created_at: DateTime<Utc>,
}

impl ChatSession {
    /// 创建新会话，标题取自首条消息
    pub fn new(id: impl Into<String>, service: Service, initial: Option<Message>) -> Self {
        let now = Utc::now();
        // 持久化精度为毫秒，这里先截断，保证存取前后相等
        let created_at = Utc
            .timestamp_millis_opt(now.timestamp_millis())
            .single()
            .unwrap_or(now);

        Self {
            id: id.into(),
            title: derive_title(initial.as_ref()),
            messages: initial.into_iter().collect(),
            service,
            backend_session_id: None,
            created_at,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn service(&self) -> Service {
        self.service
    }

    pub fn backend_session_id(&self) -> Option<&str> {
        self.backend_session_id.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// 获取最后一条消息
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub(crate) fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub(crate) fn set_service(&mut self, service: Service) {
        self.service = service;
    }

    pub(crate) fn set_backend_session_id(&mut self, backend_id: String) {
        self.backend_session_id = Some(backend_id);
    }
}

/// 标题 = 首条消息前 30 个字符；没有消息或内容为空时使用默认标题
pub fn derive_title(initial: Option<&Message>) -> String {
    match initial {
        Some(message) if !message.content.is_empty() => {
            message.content.chars().take(TITLE_MAX_CHARS).collect()
        }
        _ => DEFAULT_TITLE.to_string(),
    }
}
