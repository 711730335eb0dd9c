pub mod bulk_import;
pub mod captcha;
pub mod certificate_service;
pub mod event_store;
pub mod template_storage;
pub mod url_signer;

pub use bulk_import::{plan_import, ImportError, ImportPlan, ImportRow, RowError};
pub use captcha::CaptchaService;
pub use certificate_service::{CertificateService, CertificateSource};
pub use event_store::{EventStore, InMemoryStore, StoreStats};
pub use template_storage::{FileStorage, StorageError, StoredFile};
pub use url_signer::{SignedPath, UrlSigner};
