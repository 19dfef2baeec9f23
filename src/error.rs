use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{BatchId, ClientId};

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 数据校验错误（请求层面，可直接返回给调用方）
    #[error("{0}")]
    Validation(#[from] ValidationError),
    /// 前置条件不满足（流水线尚未开始）
    #[error("{0}")]
    Precondition(#[from] PreconditionError),
    /// PDF 渲染错误
    #[error("{0}")]
    Render(#[from] RenderError),
    /// 加密错误
    #[error("{0}")]
    Crypto(#[from] CryptoError),
    /// 邮件投递错误
    #[error("{0}")]
    Delivery(#[from] DeliveryError),
    /// 存储层错误
    #[error("{0}")]
    Store(#[from] StoreError),
    /// 配置错误
    #[error("{0}")]
    Config(#[from] ConfigError),
    /// 同一批次的报告正在另一个请求中发送
    #[error("El informe del lote {batch_id} ya se está enviando.")]
    InFlight { batch_id: BatchId },
}

/// 数据校验错误
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// 四个百分比之和超过 100
    #[error("La suma de porcentajes no puede exceder 100%.")]
    PercentageSumExceeded { total: Decimal },
    /// 百分比超出 [0, 100]
    #[error("El campo {field} debe estar entre 0 y 100 (valor: {value}).")]
    PercentageOutOfRange { field: &'static str, value: Decimal },
    /// 数量低于最小值
    #[error("La cantidad debe ser al menos 0.01 kg (valor: {value}).")]
    QuantityTooSmall { value: Decimal },
    /// 数量超过字段精度
    #[error("La cantidad excede el máximo permitido (valor: {value}).")]
    QuantityTooLarge { value: Decimal },
    /// 小数位数超过字段精度
    #[error("El campo {field} no admite más de {max} decimales (valor: {value}).")]
    TooManyDecimalPlaces {
        field: &'static str,
        value: Decimal,
        max: u32,
    },
    /// 批次编码为空
    #[error("El código de lote no puede estar vacío.")]
    EmptyLotCode,
    /// 批次编码过长
    #[error("El código de lote no puede superar {max} caracteres (longitud: {len}).")]
    LotCodeTooLong { len: usize, max: usize },
    /// 未知谷物类型
    #[error("Tipo de grano desconocido: {code}")]
    UnknownGrainType { code: String },
    /// 缺少必填字段
    #[error("El campo {field} es obligatorio.")]
    MissingField { field: &'static str },
    /// 客户不存在
    #[error("El cliente {client_id} no existe.")]
    UnknownClient { client_id: ClientId },
}

/// 前置条件错误
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PreconditionError {
    /// 客户没有登记证件号（无法派生密钥）
    #[error("El cliente no tiene cédula registrada.")]
    MissingIdentifier { client_id: ClientId },
}

/// PDF 渲染错误
#[derive(Debug, Error)]
pub enum RenderError {
    /// 底层 PDF 库错误
    #[error("Error al generar el PDF: {0}")]
    Pdf(#[from] lopdf::Error),
    /// 写出 PDF 字节失败
    #[error("Error al escribir el PDF: {0}")]
    Io(#[from] std::io::Error),
    /// 邮件模板渲染失败
    #[error("Error al renderizar la plantilla {name}: {source}")]
    Template {
        name: String,
        #[source]
        source: tera::Error,
    },
}

/// 加密错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// 证件号为空
    #[error("Cédula de usuario requerida para encriptar PDF.")]
    EmptyIdentifier,
    /// 密钥材料格式错误
    #[error("Clave de cifrado inválida.")]
    InvalidKey,
    /// 解密失败（密钥错误、数据被篡改或截断）
    #[error("No se pudo descifrar el documento: clave incorrecta o datos alterados.")]
    DecryptionFailed,
}

/// 邮件投递错误
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// 客户没有邮箱
    #[error("El cliente no tiene dirección de correo registrada.")]
    MissingAddress { client_id: ClientId },
    /// 地址格式非法
    #[error("Dirección de correo inválida ({address}): {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },
    /// 构建邮件失败
    #[error("No se pudo construir el mensaje: {0}")]
    Build(String),
    /// 传输层拒绝
    #[error("Error de transporte ({transport}): {message}")]
    Transport {
        transport: &'static str,
        message: String,
    },
}

/// 存储层错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// 批次不存在
    #[error("Lote no encontrado: {batch_id}")]
    BatchNotFound { batch_id: BatchId },
    /// 客户不存在
    #[error("Cliente no encontrado: {client_id}")]
    ClientNotFound { client_id: ClientId },
    /// 快照中批次 ID 重复
    #[error("ID de lote duplicado: {batch_id}")]
    DuplicateBatchId { batch_id: BatchId },
    /// 快照中客户 ID 重复
    #[error("ID de cliente duplicado: {client_id}")]
    DuplicateClientId { client_id: ClientId },
    /// 批次编码重复
    #[error("Ya existe un lote con el código {lot_code}.")]
    DuplicateLotCode { lot_code: String },
}

/// 配置错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// 未知的邮件后端
    #[error("Backend de correo desconocido: {value}")]
    UnknownMailBackend { value: String },
    /// 未知的 SMTP 安全模式
    #[error("Modo de seguridad SMTP desconocido: {value}")]
    UnknownSmtpSecurity { value: String },
    /// 发件人地址非法
    #[error("Remitente inválido: {value}")]
    InvalidFromAddress { value: String },
    /// SMTP 传输构建失败
    #[error("No se pudo configurar SMTP ({host}): {message}")]
    SmtpSetup { host: String, message: String },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建传输层错误
    pub fn transport(transport: &'static str, err: impl std::fmt::Display) -> Self {
        AppError::Delivery(DeliveryError::Transport {
            transport,
            message: err.to_string(),
        })
    }

    /// 创建模板渲染错误
    pub fn template(name: impl Into<String>, source: tera::Error) -> Self {
        AppError::Render(RenderError::Template {
            name: name.into(),
            source,
        })
    }

    /// 是否属于调用方错误（4xx）
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_)
                | AppError::Precondition(_)
                | AppError::InFlight { .. }
                | AppError::Store(StoreError::BatchNotFound { .. })
                | AppError::Store(StoreError::DuplicateLotCode { .. })
        )
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
