/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 数据集 TOML 文件
    pub dataset_file: String,
    /// 自定义邮件模板目录（为空则使用内置模板）
    pub template_dir: String,
    /// 发件人地址
    pub from_email: String,
    /// 同时发送的报告数量
    pub max_concurrent_dispatches: usize,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    /// 批量发送时记录的操作人
    pub operator: String,
    // --- 邮件配置 ---
    /// `smtp` | `file` | `memory`
    pub mail_backend: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    /// `starttls` | `tls` | `none`
    pub smtp_security: String,
    pub smtp_timeout_secs: u64,
    /// `file` 后端的输出目录
    pub mail_spool_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset_file: "data/lotes.toml".to_string(),
            template_dir: String::new(),
            from_email: "Control de Calidad <no-reply@agro.local>".to_string(),
            max_concurrent_dispatches: 4,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            operator: "sistema".to_string(),
            mail_backend: "file".to_string(),
            smtp_host: "localhost".to_string(),
            smtp_port: 587,
            smtp_username: String::new(),
            smtp_password: String::new(),
            smtp_security: "starttls".to_string(),
            smtp_timeout_secs: 30,
            mail_spool_dir: "outbox".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            dataset_file: std::env::var("DATASET_FILE").unwrap_or(default.dataset_file),
            template_dir: std::env::var("TEMPLATE_DIR").unwrap_or(default.template_dir),
            from_email: std::env::var("FROM_EMAIL").unwrap_or(default.from_email),
            max_concurrent_dispatches: std::env::var("MAX_CONCURRENT_DISPATCHES").ok().and_then(|v| v.parse().ok()).filter(|n| *n > 0).unwrap_or(default.max_concurrent_dispatches),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            operator: std::env::var("OPERATOR").unwrap_or(default.operator),
            mail_backend: std::env::var("MAIL_BACKEND").unwrap_or(default.mail_backend),
            smtp_host: std::env::var("SMTP_HOST").unwrap_or(default.smtp_host),
            smtp_port: std::env::var("SMTP_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.smtp_port),
            smtp_username: std::env::var("SMTP_USERNAME").unwrap_or(default.smtp_username),
            smtp_password: std::env::var("SMTP_PASSWORD").unwrap_or(default.smtp_password),
            smtp_security: std::env::var("SMTP_SECURITY").unwrap_or(default.smtp_security),
            smtp_timeout_secs: std::env::var("SMTP_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.smtp_timeout_secs),
            mail_spool_dir: std::env::var("MAIL_SPOOL_DIR").unwrap_or(default.mail_spool_dir),
        }
    }

    /// 模板目录（未配置时为 `None`）
    pub fn template_dir(&self) -> Option<&std::path::Path> {
        if self.template_dir.trim().is_empty() {
            None
        } else {
            Some(std::path::Path::new(&self.template_dir))
        }
    }
}
