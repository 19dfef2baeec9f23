//! 报告发送接口
//!
//! 把流程结果翻译为状态码 + JSON 响应体

use http::StatusCode;
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::error::{AppError, StoreError};
use crate::models::BatchId;
use crate::workflow::{ReportCtx, ReportFlow, RequestCtx};

pub const MSG_AUTH_REQUIRED: &str = "Autenticación requerida.";
pub const MSG_NOT_FOUND: &str = "Lote no encontrado.";
pub const MSG_SENT: &str = "Informe enviado exitosamente.";
pub const MSG_PIPELINE_FAILED: &str = "Error al procesar el informe.";

/// 接口响应
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// 发送指定批次的报告
///
/// # 状态码
/// - 401: 未认证
/// - 404: 批次不存在
/// - 400: 客户没有证件号
/// - 409: 同一批次正在发送中
/// - 200: 发送成功
/// - 500: 渲染 / 加密 / 投递失败
pub async fn send_report(flow: &ReportFlow, request: &RequestCtx, batch_id: BatchId) -> ApiResponse {
    let Some(user) = request.user.clone() else {
        return ApiResponse::new(StatusCode::UNAUTHORIZED, json!({ "error": MSG_AUTH_REQUIRED }));
    };

    let ctx = ReportCtx::new(user, batch_id);
    match flow.run(&ctx).await {
        Ok(_) => ApiResponse::new(StatusCode::OK, json!({ "mensaje": MSG_SENT })),
        Err(e) => error_response(&ctx, e),
    }
}

fn error_response(ctx: &ReportCtx, err: AppError) -> ApiResponse {
    match err {
        AppError::Store(StoreError::BatchNotFound { .. }) => {
            ApiResponse::new(StatusCode::NOT_FOUND, json!({ "error": MSG_NOT_FOUND }))
        }
        AppError::Precondition(e) => {
            ApiResponse::new(StatusCode::BAD_REQUEST, json!({ "error": e.to_string() }))
        }
        e @ AppError::InFlight { .. } => {
            warn!("{} ⚠️ {}", ctx, e);
            ApiResponse::new(StatusCode::CONFLICT, json!({ "error": e.to_string() }))
        }
        e => {
            error!("{} ❌ 报告流程失败: {}", ctx, e);
            ApiResponse::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": MSG_PIPELINE_FAILED, "detalle": e.to_string() }),
            )
        }
    }
}
