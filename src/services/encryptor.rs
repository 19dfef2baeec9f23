//! 加密服务 - 业务能力层
//!
//! Fernet 令牌（AES-128-CBC + HMAC-SHA256），与标准 Fernet 工具及既有归档互通。
//! 附件内容就是 url-safe base64 编码的令牌文本。

use fernet::Fernet;

use crate::error::CryptoError;
use crate::services::key_derivation::{derive_key, DerivedKey};

/// 加密结果：密文 + 派生密钥（均不落盘）
#[derive(Debug, Clone)]
pub struct EncryptedPayload {
    pub ciphertext: Vec<u8>,
    pub key: DerivedKey,
}

fn cipher(key: &DerivedKey) -> Result<Fernet, CryptoError> {
    Fernet::new(key.as_str()).ok_or(CryptoError::InvalidKey)
}

/// 用派生密钥加密，返回 Fernet 令牌字节
pub fn encrypt(plaintext: &[u8], key: &DerivedKey) -> Result<Vec<u8>, CryptoError> {
    Ok(cipher(key)?.encrypt(plaintext).into_bytes())
}

/// 解密；密钥错误、令牌被篡改或截断时一律失败
pub fn decrypt(token: &[u8], key: &DerivedKey) -> Result<Vec<u8>, CryptoError> {
    let token = std::str::from_utf8(token).map_err(|_| CryptoError::DecryptionFailed)?;
    cipher(key)?
        .decrypt(token)
        .map_err(|_| CryptoError::DecryptionFailed)
}

/// 派生密钥并加密文档
pub fn encrypt_with_identifier(
    document: &[u8],
    identifier: &str,
) -> Result<EncryptedPayload, CryptoError> {
    let key = derive_key(identifier)?;
    let ciphertext = encrypt(document, &key)?;
    Ok(EncryptedPayload { ciphertext, key })
}
