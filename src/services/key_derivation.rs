//! 密钥派生 - 业务能力层
//!
//! `urlsafe_base64(SHA-256(utf8(证件号)))`，同一证件号总是得到同一把密钥，
//! 因此报告无需保存密钥，持有证件号即可解密。
//!
//! ⚠️ 安全提示：证件号长度固定、熵很低，这把密钥可以被穷举。保留该行为只是为了
//! 与既有归档兼容，新部署不应依赖它提供保密性。

use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use sha2::{Digest, Sha256};

use crate::error::CryptoError;

/// 派生出的密钥（url-safe base64 文本，44 字节，即 Fernet 密钥格式）
#[derive(Clone, PartialEq, Eq)]
pub struct DerivedKey(String);

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey(***)")
    }
}

/// 从证件号派生密钥
pub fn derive_key(identifier: &str) -> Result<DerivedKey, CryptoError> {
    if identifier.is_empty() {
        return Err(CryptoError::EmptyIdentifier);
    }
    let digest = Sha256::digest(identifier.as_bytes());
    Ok(DerivedKey(URL_SAFE.encode(digest)))
}
