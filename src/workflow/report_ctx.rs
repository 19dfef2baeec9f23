//! 报告处理上下文
//!
//! 封装"谁在请求哪个批次的报告"这一信息，由调用方显式传入

use std::fmt::Display;

use crate::models::{BatchId, ClientId, Role};

/// 已认证的调用方
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: ClientId,
    pub username: String,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn new(user_id: ClientId, username: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            username: username.into(),
            role,
        }
    }
}

/// 入站请求上下文（会话层的结果，可能未认证）
#[derive(Debug, Clone, Default)]
pub struct RequestCtx {
    pub user: Option<AuthenticatedUser>,
}

impl RequestCtx {
    pub fn authenticated(user: AuthenticatedUser) -> Self {
        Self { user: Some(user) }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

/// 报告处理上下文
#[derive(Debug, Clone)]
pub struct ReportCtx {
    /// 发起人
    pub user: AuthenticatedUser,

    /// 目标批次
    pub batch_id: BatchId,
}

impl ReportCtx {
    pub fn new(user: AuthenticatedUser, batch_id: BatchId) -> Self {
        Self { user, batch_id }
    }
}

impl Display for ReportCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[批次 ID#{} 操作人#{}]", self.batch_id, self.user.username)
    }
}
