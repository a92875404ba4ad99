//! # Data Models
//!
//! SeaORM entities for the CRM tables this service reads and writes.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod calendar_event;
pub mod deadline;
pub mod document_template;
pub mod intimation;
pub mod intimation_analysis;
pub mod notification;
pub mod profile;
pub mod requirement;
pub mod signature_request;
pub mod signature_signer;

pub use calendar_event::Entity as CalendarEvent;
pub use deadline::Entity as Deadline;
pub use document_template::Entity as DocumentTemplate;
pub use intimation::Entity as Intimation;
pub use intimation_analysis::Entity as IntimationAnalysis;
pub use notification::Entity as Notification;
pub use profile::Entity as Profile;
pub use requirement::Entity as Requirement;
pub use signature_request::Entity as SignatureRequest;
pub use signature_signer::Entity as SignatureSigner;

/// Status shared by deadlines and calendar events still awaiting action.
pub const STATUS_PENDING: &str = "pending";

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "lexcrm-functions".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
