//! 邮件传输 - 业务能力层
//!
//! 只负责"发送或报错"，不关心报告内容
//!
//! ## 后端
//! - `smtp` - lettre 异步 SMTP（STARTTLS / TLS / 明文）
//! - `file` - 写入 `.eml` 文件，便于人工检查
//! - `memory` - 保存在内存中，测试和演练用

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{AppError, AppResult, ConfigError, DeliveryError};

/// 一封报告邮件
#[derive(Debug, Clone, PartialEq)]
pub struct ReportEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
    pub attachment_name: String,
    pub attachment: Vec<u8>,
}

impl ReportEmail {
    /// 构建 multipart 邮件：(纯文本 | HTML) + PDF 附件
    pub fn to_message(&self) -> Result<Message, DeliveryError> {
        let from = parse_mailbox(&self.from)?;
        let to = parse_mailbox(&self.to)?;
        let content_type = ContentType::parse("application/pdf")
            .map_err(|e| DeliveryError::Build(e.to_string()))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(self.subject.clone())
            .multipart(
                MultiPart::mixed()
                    .multipart(MultiPart::alternative_plain_html(
                        self.text_body.clone(),
                        self.html_body.clone(),
                    ))
                    .singlepart(
                        Attachment::new(self.attachment_name.clone())
                            .body(self.attachment.clone(), content_type),
                    ),
            )
            .map_err(|e| DeliveryError::Build(e.to_string()))
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, DeliveryError> {
    address
        .parse::<Mailbox>()
        .map_err(|source| DeliveryError::InvalidAddress {
            address: address.to_string(),
            source,
        })
}

/// 邮件传输接口
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// 后端名称（用于日志）
    fn name(&self) -> &'static str;

    async fn send(&self, email: &ReportEmail) -> AppResult<()>;
}

/// 邮件后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailBackend {
    Smtp,
    File,
    Memory,
}

impl FromStr for MailBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "smtp" => Ok(MailBackend::Smtp),
            "file" => Ok(MailBackend::File),
            "memory" => Ok(MailBackend::Memory),
            other => Err(ConfigError::UnknownMailBackend {
                value: other.to_string(),
            }),
        }
    }
}

/// SMTP 连接安全模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    StartTls,
    Tls,
    None,
}

impl FromStr for SmtpSecurity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "starttls" => Ok(SmtpSecurity::StartTls),
            "tls" | "ssl" => Ok(SmtpSecurity::Tls),
            "none" | "plain" => Ok(SmtpSecurity::None),
            other => Err(ConfigError::UnknownSmtpSecurity {
                value: other.to_string(),
            }),
        }
    }
}

// ========== SMTP ==========

/// SMTP 传输
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let security: SmtpSecurity = config.smtp_security.parse()?;
        let host = config.smtp_host.as_str();
        let setup_err = |e: lettre::transport::smtp::Error| ConfigError::SmtpSetup {
            host: host.to_string(),
            message: e.to_string(),
        };

        let builder = match security {
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host).map_err(setup_err)?
            }
            SmtpSecurity::Tls => {
                AsyncSmtpTransport::<Tokio1Executor>::relay(host).map_err(setup_err)?
            }
            SmtpSecurity::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host),
        };

        let mut builder = builder
            .port(config.smtp_port)
            .timeout(Some(Duration::from_secs(config.smtp_timeout_secs)));
        if !config.smtp_username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            ));
        }

        info!(
            "📮 SMTP 传输: {}:{} ({:?})",
            config.smtp_host, config.smtp_port, security
        );
        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn send(&self, email: &ReportEmail) -> AppResult<()> {
        let message = email.to_message()?;
        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::transport(self.name(), e))?;
        Ok(())
    }
}

// ========== 文件 ==========

/// 写入 `.eml` 文件的传输
pub struct FileMailer {
    transport: AsyncFileTransport<Tokio1Executor>,
    dir: PathBuf,
}

impl FileMailer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            transport: AsyncFileTransport::<Tokio1Executor>::new(&dir),
            dir,
        }
    }
}

#[async_trait]
impl MailTransport for FileMailer {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn send(&self, email: &ReportEmail) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::transport(self.name(), e))?;
        let message = email.to_message()?;
        let id = self
            .transport
            .send(message)
            .await
            .map_err(|e| AppError::transport(self.name(), e))?;
        debug!("邮件已写入 {}/{}.eml", self.dir.display(), id);
        Ok(())
    }
}

// ========== 内存 ==========

/// 内存发件箱
#[derive(Default)]
pub struct MemoryMailer {
    outbox: Mutex<Vec<ReportEmail>>,
    fail_with: Option<String>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次发送都失败的传输（用于演练失败路径）
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            outbox: Mutex::new(Vec::new()),
            fail_with: Some(reason.into()),
        }
    }

    pub async fn sent(&self) -> Vec<ReportEmail> {
        self.outbox.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.outbox.lock().await.len()
    }
}

#[async_trait]
impl MailTransport for MemoryMailer {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn send(&self, email: &ReportEmail) -> AppResult<()> {
        if let Some(reason) = &self.fail_with {
            return Err(AppError::transport(self.name(), reason));
        }
        // 与真实后端一致：无法构建的邮件同样报错
        email.to_message()?;
        self.outbox.lock().await.push(email.clone());
        Ok(())
    }
}

/// 按配置创建传输
pub fn transport_from_config(config: &Config) -> Result<Arc<dyn MailTransport>, ConfigError> {
    let backend: MailBackend = config.mail_backend.parse()?;
    let transport: Arc<dyn MailTransport> = match backend {
        MailBackend::Smtp => Arc::new(SmtpMailer::from_config(config)?),
        MailBackend::File => Arc::new(FileMailer::new(&config.mail_spool_dir)),
        MailBackend::Memory => Arc::new(MemoryMailer::new()),
    };
    Ok(transport)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> ReportEmail {
        ReportEmail {
            from: "informes@agro.local".into(),
            to: "juan@example.com".into(),
            subject: "Informe Calidad Lote L-001".into(),
            text_body: "texto".into(),
            html_body: "<p>html</p>".into(),
            attachment_name: "informe_L-001.pdf".into(),
            attachment: vec![1, 2, 3],
        }
    }

    #[test]
    fn builds_multipart_message_with_attachment() {
        let message = email().to_message().unwrap();
        let raw = String::from_utf8_lossy(&message.formatted()).to_string();
        assert!(raw.contains("Subject: Informe Calidad Lote L-001"));
        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("text/html"));
        assert!(raw.contains("informe_L-001.pdf"));
        assert!(raw.contains("application/pdf"));
    }

    #[test]
    fn invalid_recipient_is_reported() {
        let mut bad = email();
        bad.to = "not-an-address".into();
        assert!(matches!(
            bad.to_message(),
            Err(DeliveryError::InvalidAddress { .. })
        ));
    }

    #[tokio::test]
    async fn memory_mailer_records_and_fails_on_demand() {
        let mailer = MemoryMailer::new();
        mailer.send(&email()).await.unwrap();
        assert_eq!(mailer.sent().await, vec![email()]);

        let failing = MemoryMailer::failing("connection refused");
        let err = failing.send(&email()).await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(failing.sent_count().await, 0);
    }

    #[tokio::test]
    async fn file_mailer_writes_eml() {
        let dir = tempfile::tempdir().unwrap();
        let mailer = FileMailer::new(dir.path().join("spool"));
        mailer.send(&email()).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path().join("spool"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("eml"))
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn backend_names_parse() {
        assert_eq!("SMTP".parse::<MailBackend>().unwrap(), MailBackend::Smtp);
        assert_eq!("tls".parse::<SmtpSecurity>().unwrap(), SmtpSecurity::Tls);
        assert!("pigeon".parse::<MailBackend>().is_err());
    }
}
