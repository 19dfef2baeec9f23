use serde::{Deserialize, Serialize};

/// 客户 ID
pub type ClientId = u64;

/// 用户角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Cliente,
    Admin,
    Supervisor,
}

/// 接收质检报告的客户
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// 证件号（用于派生报告加密密钥）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cedula: Option<String>,
    #[serde(default)]
    pub role: Role,
}

impl Client {
    pub fn new(id: ClientId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            first_name: String::new(),
            last_name: String::new(),
            email: None,
            cedula: None,
            role: Role::Cliente,
        }
    }

    /// 全名，为空时退回用户名
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }

    /// 非空证件号
    pub fn identifier(&self) -> Option<&str> {
        self.cedula.as_deref().filter(|c| !c.is_empty())
    }

    /// 非空邮箱
    pub fn email_address(&self) -> Option<&str> {
        self.email.as_deref().filter(|e| !e.trim().is_empty())
    }
}
