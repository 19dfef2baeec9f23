use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// 谷物类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrainType {
    /// 咖啡
    Cafe,
    /// 玉米
    Maiz,
    /// 大米
    Arroz,
    /// 其他
    #[default]
    Otro,
}

impl GrainType {
    /// 存储代码
    pub fn code(self) -> &'static str {
        match self {
            GrainType::Cafe => "cafe",
            GrainType::Maiz => "maiz",
            GrainType::Arroz => "arroz",
            GrainType::Otro => "otro",
        }
    }

    /// 报告中显示的名称
    pub fn label(self) -> &'static str {
        match self {
            GrainType::Cafe => "Café",
            GrainType::Maiz => "Maíz",
            GrainType::Arroz => "Arroz",
            GrainType::Otro => "Otro",
        }
    }

    /// 从存储代码解析
    pub fn from_code(code: &str) -> Result<Self, ValidationError> {
        match code.trim() {
            "cafe" => Ok(GrainType::Cafe),
            "maiz" => Ok(GrainType::Maiz),
            "arroz" => Ok(GrainType::Arroz),
            "otro" => Ok(GrainType::Otro),
            other => Err(ValidationError::UnknownGrainType {
                code: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for GrainType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
