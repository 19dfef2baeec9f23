//! 报告投递 - 业务能力层
//!
//! 组装邮件（主题、双正文、加密附件），交给传输层发送，
//! 成功后把批次标记为已投递。

use std::sync::Arc;
use tracing::{error, info};

use crate::error::{AppResult, DeliveryError};
use crate::infrastructure::BatchRepository;
use crate::models::{BatchId, Client, QualityBatch};
use crate::services::encryptor::EncryptedPayload;
use crate::services::mail_transport::{MailTransport, ReportEmail};
use crate::services::template_service::{ReportEmailContext, TemplateService};

/// 投递回执
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryReceipt {
    pub batch_id: BatchId,
    pub recipient: String,
    pub subject: String,
    pub attachment_name: String,
    pub transport: &'static str,
}

/// 邮件主题
pub fn report_subject(batch: &QualityBatch) -> String {
    format!("Informe Calidad Lote {}", batch.lot_code)
}

/// 投递器
pub struct DeliveryDispatcher {
    transport: Arc<dyn MailTransport>,
    templates: Arc<TemplateService>,
    store: Arc<dyn BatchRepository>,
    from_email: String,
}

impl DeliveryDispatcher {
    pub fn new(
        transport: Arc<dyn MailTransport>,
        templates: Arc<TemplateService>,
        store: Arc<dyn BatchRepository>,
        from_email: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            templates,
            store,
            from_email: from_email.into(),
        }
    }

    /// 组装邮件，不发送
    pub fn compose(
        &self,
        batch: &QualityBatch,
        client: &Client,
        payload: &EncryptedPayload,
    ) -> AppResult<ReportEmail> {
        let to = client
            .email_address()
            .ok_or(DeliveryError::MissingAddress {
                client_id: client.id,
            })?;

        let bodies = self
            .templates
            .render_bodies(&ReportEmailContext::new(batch, client))?;

        Ok(ReportEmail {
            from: self.from_email.clone(),
            to: to.to_string(),
            subject: report_subject(batch),
            text_body: bodies.text,
            html_body: bodies.html,
            attachment_name: batch.report_filename(),
            attachment: payload.ciphertext.clone(),
        })
    }

    /// 发送并标记已投递；失败时记录日志后原样返回错误，标记保持不变
    pub async fn deliver(
        &self,
        batch: &QualityBatch,
        client: &Client,
        payload: &EncryptedPayload,
    ) -> AppResult<DeliveryReceipt> {
        let email = match self.compose(batch, client, payload) {
            Ok(email) => email,
            Err(e) => {
                error!("❌ 无法组装批次 {} 的报告邮件: {}", batch.lot_code, e);
                return Err(e);
            }
        };

        if let Err(e) = self.transport.send(&email).await {
            error!("❌ 批次 {} 的报告发送失败: {}", batch.lot_code, e);
            return Err(e);
        }

        self.store.mark_delivered(batch.id).await?;
        info!(
            "📧 批次 {} 的报告已发送至 {} (via {})",
            batch.lot_code,
            email.to,
            self.transport.name()
        );

        Ok(DeliveryReceipt {
            batch_id: batch.id,
            recipient: email.to,
            subject: email.subject,
            attachment_name: email.attachment_name,
            transport: self.transport.name(),
        })
    }
}
