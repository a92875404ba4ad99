//! # Repository Layer
//!
//! Thin wrappers over SeaORM queries, one per aggregate this service writes.

pub mod notification;
pub mod profile;
pub mod signature;
pub mod template;

pub use notification::{InsertOutcome, NotificationDraft, NotificationRepository};
pub use profile::ProfileRepository;
pub use signature::{IssuedOtp, NewSignatureRequest, NewSigner, SignatureRepository};
pub use template::TemplateRepository;
