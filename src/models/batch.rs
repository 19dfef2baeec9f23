//! 质检批次（LoteProcesado）
//!
//! 百分比规则：
//! - 四个百分比都存在时，总和不得超过 100
//! - 合格率 / 不合格率只缺一个时，保存时按 `100 - 湿度 - 杂质 - 另一项` 补齐（最低为 0）

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;
use crate::models::client::ClientId;
use crate::models::grain::GrainType;

/// 批次 ID
pub type BatchId = u64;

/// 批次编码最大长度
pub const LOT_CODE_MAX_LEN: usize = 50;

/// 数值字段的小数位数
const DECIMAL_PLACES: u32 = 2;

/// 数量字段上限（10 位数字，2 位小数）
const QUANTITY_MAX: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);

/// 质检后的谷物批次
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityBatch {
    pub id: BatchId,
    pub client_id: ClientId,
    pub lot_code: String,
    #[serde(default)]
    pub grain_type: GrainType,
    pub processed_on: NaiveDate,
    pub quantity_kg: Decimal,
    pub humidity: Decimal,
    pub impurities: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub good_grain: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defective_grain: Option<Decimal>,
    #[serde(default)]
    pub notes: String,
    /// 报告是否已成功投递
    #[serde(default)]
    pub delivered: bool,
    pub created_at: DateTime<Utc>,
}

impl QualityBatch {
    /// 由登记请求构建新批次（尚未校验）
    pub fn from_draft(id: BatchId, draft: BatchDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            client_id: draft.client_id,
            lot_code: normalize_lot_code(&draft.lot_code),
            grain_type: draft.grain_type,
            processed_on: draft.processed_on,
            quantity_kg: draft.quantity_kg,
            humidity: draft.humidity,
            impurities: draft.impurities,
            good_grain: draft.good_grain,
            defective_grain: draft.defective_grain,
            notes: draft.notes,
            delivered: false,
            created_at,
        }
    }

    /// 字段级校验 + 百分比总和校验
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_lot_code(&self.lot_code)?;
        validate_quantity(self.quantity_kg)?;
        validate_percentage("humedad", self.humidity)?;
        validate_percentage("impurezas", self.impurities)?;
        if let Some(good) = self.good_grain {
            validate_percentage("grano_bueno", good)?;
        }
        if let Some(defective) = self.defective_grain {
            validate_percentage("grano_defectuoso", defective)?;
        }
        validate_percentage_sum(
            self.humidity,
            self.impurities,
            self.good_grain,
            self.defective_grain,
        )
    }

    /// 保存前的处理：补齐缺失的百分比，统一两位小数
    ///
    /// 只应在 `validate` 通过之后调用，此时所有值至多两位小数，重新定标不会改变数值
    pub fn prepare_for_save(&mut self) {
        self.derive_missing_percentages();
        self.quantity_kg = two_places(self.quantity_kg);
        self.humidity = two_places(self.humidity);
        self.impurities = two_places(self.impurities);
        self.good_grain = self.good_grain.map(two_places);
        self.defective_grain = self.defective_grain.map(two_places);
    }

    /// 合格率与不合格率只缺一项时补齐
    pub fn derive_missing_percentages(&mut self) {
        match (self.good_grain, self.defective_grain) {
            (Some(good), None) => {
                self.defective_grain = Some(complement(self.humidity, self.impurities, good));
            }
            (None, Some(defective)) => {
                self.good_grain = Some(complement(self.humidity, self.impurities, defective));
            }
            _ => {}
        }
    }

    /// 附件文件名
    pub fn report_filename(&self) -> String {
        format!("informe_{}.pdf", self.lot_code)
    }
}

impl std::fmt::Display for QualityBatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Lote {} ({})", self.lot_code, self.grain_type.label())
    }
}

/// `max(0, 100 - h - i - known)`
pub fn complement(humidity: Decimal, impurities: Decimal, known: Decimal) -> Decimal {
    (Decimal::ONE_HUNDRED - humidity - impurities - known).max(Decimal::ZERO)
}

/// 四项都存在时总和不得超过 100
pub fn validate_percentage_sum(
    humidity: Decimal,
    impurities: Decimal,
    good_grain: Option<Decimal>,
    defective_grain: Option<Decimal>,
) -> Result<(), ValidationError> {
    if let (Some(good), Some(defective)) = (good_grain, defective_grain) {
        let total = humidity + impurities + good + defective;
        if total > Decimal::ONE_HUNDRED {
            return Err(ValidationError::PercentageSumExceeded { total });
        }
    }
    Ok(())
}

/// 去除首尾空白并转为大写
pub fn normalize_lot_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

fn validate_lot_code(code: &str) -> Result<(), ValidationError> {
    if code.is_empty() {
        return Err(ValidationError::EmptyLotCode);
    }
    let len = code.chars().count();
    if len > LOT_CODE_MAX_LEN {
        return Err(ValidationError::LotCodeTooLong {
            len,
            max: LOT_CODE_MAX_LEN,
        });
    }
    Ok(())
}

fn validate_quantity(value: Decimal) -> Result<(), ValidationError> {
    validate_places("cantidad_kg", value)?;
    if value < Decimal::new(1, 2) {
        return Err(ValidationError::QuantityTooSmall { value });
    }
    if value >= QUANTITY_MAX {
        return Err(ValidationError::QuantityTooLarge { value });
    }
    Ok(())
}

fn validate_percentage(field: &'static str, value: Decimal) -> Result<(), ValidationError> {
    validate_places(field, value)?;
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(ValidationError::PercentageOutOfRange { field, value });
    }
    Ok(())
}

/// 至多两位小数（尾随零不计）
fn validate_places(field: &'static str, value: Decimal) -> Result<(), ValidationError> {
    if value.normalize().scale() > DECIMAL_PLACES {
        return Err(ValidationError::TooManyDecimalPlaces {
            field,
            value,
            max: DECIMAL_PLACES,
        });
    }
    Ok(())
}

fn two_places(mut value: Decimal) -> Decimal {
    value.rescale(DECIMAL_PLACES);
    value
}

/// 登记请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchDraft {
    pub client_id: ClientId,
    pub lot_code: String,
    #[serde(default)]
    pub grain_type: GrainType,
    pub processed_on: NaiveDate,
    pub quantity_kg: Decimal,
    pub humidity: Decimal,
    pub impurities: Decimal,
    #[serde(default)]
    pub good_grain: Option<Decimal>,
    #[serde(default)]
    pub defective_grain: Option<Decimal>,
    #[serde(default)]
    pub notes: String,
}

/// 更新请求（PUT / PATCH）
///
/// 可空字段使用 `Option<Option<_>>`：外层 `None` 表示未提供，`Some(None)` 表示显式清空。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchPatch {
    #[serde(default)]
    pub client_id: Option<ClientId>,
    #[serde(default)]
    pub lot_code: Option<String>,
    #[serde(default)]
    pub grain_type: Option<GrainType>,
    #[serde(default)]
    pub processed_on: Option<NaiveDate>,
    #[serde(default)]
    pub quantity_kg: Option<Decimal>,
    #[serde(default)]
    pub humidity: Option<Decimal>,
    #[serde(default)]
    pub impurities: Option<Decimal>,
    #[serde(default, deserialize_with = "double_option")]
    pub good_grain: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "double_option")]
    pub defective_grain: Option<Option<Decimal>>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl BatchPatch {
    /// PUT 请求必须提供的字段
    pub fn check_required(&self) -> Result<(), ValidationError> {
        let required: [(&'static str, bool); 6] = [
            ("cliente", self.client_id.is_some()),
            ("codigo_lote", self.lot_code.is_some()),
            ("fecha_procesamiento", self.processed_on.is_some()),
            ("cantidad_kg", self.quantity_kg.is_some()),
            ("humedad", self.humidity.is_some()),
            ("impurezas", self.impurities.is_some()),
        ];
        match required.iter().find(|(_, present)| !present) {
            Some((field, _)) => Err(ValidationError::MissingField { field: *field }),
            None => Ok(()),
        }
    }

    /// 将请求字段合并到已有批次上（`delivered` 只读，不会被修改）
    pub fn apply_to(self, batch: &mut QualityBatch) {
        if let Some(client_id) = self.client_id {
            batch.client_id = client_id;
        }
        if let Some(lot_code) = self.lot_code {
            batch.lot_code = normalize_lot_code(&lot_code);
        }
        if let Some(grain_type) = self.grain_type {
            batch.grain_type = grain_type;
        }
        if let Some(processed_on) = self.processed_on {
            batch.processed_on = processed_on;
        }
        if let Some(quantity) = self.quantity_kg {
            batch.quantity_kg = quantity;
        }
        if let Some(humidity) = self.humidity {
            batch.humidity = humidity;
        }
        if let Some(impurities) = self.impurities {
            batch.impurities = impurities;
        }
        if let Some(good) = self.good_grain {
            batch.good_grain = good;
        }
        if let Some(defective) = self.defective_grain {
            batch.defective_grain = defective;
        }
        if let Some(notes) = self.notes {
            batch.notes = notes;
        }
    }
}

// 区分"字段缺失"与"字段为 null"
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
