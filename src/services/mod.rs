pub mod batch_service;
pub mod delivery;
pub mod encryptor;
pub mod key_derivation;
pub mod layout_renderer;
pub mod mail_transport;
pub mod template_service;

pub use batch_service::BatchService;
pub use delivery::{DeliveryDispatcher, DeliveryReceipt};
pub use encryptor::{decrypt, encrypt, encrypt_with_identifier, EncryptedPayload};
pub use key_derivation::{derive_key, DerivedKey};
pub use layout_renderer::{LayoutRenderer, RenderedDocument};
pub use mail_transport::{transport_from_config, MailTransport, MemoryMailer, ReportEmail};
pub use template_service::TemplateService;
