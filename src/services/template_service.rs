//! 模板渲染服务 - 业务能力层
//!
//! 用同一个上下文渲染邮件的 HTML 正文和纯文本正文

use serde::Serialize;
use std::path::Path;
use tera::{Context, Tera};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::{Client, QualityBatch};

pub const HTML_TEMPLATE: &str = "control_calidad/email.html";
pub const TEXT_TEMPLATE: &str = "control_calidad/email.txt";

const DEFAULT_HTML: &str = include_str!("../../templates/control_calidad/email.html");
const DEFAULT_TEXT: &str = include_str!("../../templates/control_calidad/email.txt");

/// 邮件模板上下文
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEmailContext {
    pub cliente: String,
    pub codigo_lote: String,
    pub fecha: String,
}

impl ReportEmailContext {
    pub fn new(batch: &QualityBatch, client: &Client) -> Self {
        Self {
            cliente: client.display_name(),
            codigo_lote: batch.lot_code.clone(),
            fecha: batch.processed_on.format("%Y-%m-%d").to_string(),
        }
    }
}

/// 渲染后的两种正文
#[derive(Debug, Clone, PartialEq)]
pub struct EmailBodies {
    pub html: String,
    pub text: String,
}

/// 模板服务
pub struct TemplateService {
    tera: Tera,
}

impl TemplateService {
    /// 使用内置模板
    pub fn new() -> AppResult<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![(HTML_TEMPLATE, DEFAULT_HTML), (TEXT_TEMPLATE, DEFAULT_TEXT)])
            .map_err(|e| AppError::template("builtin", e))?;
        Ok(Self { tera })
    }

    /// 内置模板 + 目录中的同名文件覆盖
    ///
    /// 目录结构与内置模板一致：`<dir>/control_calidad/email.html`
    pub fn with_overrides(dir: Option<&Path>) -> AppResult<Self> {
        let mut service = Self::new()?;
        let Some(dir) = dir else {
            return Ok(service);
        };

        for name in [HTML_TEMPLATE, TEXT_TEMPLATE] {
            let path = dir.join(name);
            if path.is_file() {
                service
                    .tera
                    .add_template_file(&path, Some(name))
                    .map_err(|e| AppError::template(name, e))?;
                info!("📄 使用自定义模板: {}", path.display());
            } else {
                debug!("未找到自定义模板 {}，使用内置版本", path.display());
            }
        }
        Ok(service)
    }

    pub fn render(&self, name: &str, context: &ReportEmailContext) -> AppResult<String> {
        let ctx = Context::from_serialize(context).map_err(|e| AppError::template(name, e))?;
        self.tera
            .render(name, &ctx)
            .map_err(|e| AppError::template(name, e))
    }

    /// 渲染 HTML + 纯文本正文
    pub fn render_bodies(&self, context: &ReportEmailContext) -> AppResult<EmailBodies> {
        Ok(EmailBodies {
            html: self.render(HTML_TEMPLATE, context)?,
            text: self.render(TEXT_TEMPLATE, context)?,
        })
    }
}
