//! Signature signer entity model
//!
//! One party asked to sign a request. The row carries the signer's public
//! token and the state of the one-time code sent to them.

use super::signature_request::Entity as SignatureRequest;
use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

pub const STATUS_PENDING: &str = "pending";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "signature_signers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub request_id: Uuid,

    pub name: String,

    pub email: String,

    pub cpf: Option<String>,

    #[sea_orm(unique)]
    pub token: String,

    /// One of: pending, signed, cancelled
    pub status: String,

    /// Hex HMAC-SHA256 of the current code, keyed by `otp_salt`
    pub otp_hash: Option<String>,

    pub otp_salt: Option<String>,

    pub otp_expires_at: Option<DateTimeWithTimeZone>,

    pub otp_sent_at: Option<DateTimeWithTimeZone>,

    /// Failed verification attempts against the current code
    pub otp_attempts: i32,

    pub verified_at: Option<DateTimeWithTimeZone>,

    pub signed_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn is_pending(&self) -> bool {
        self.status == STATUS_PENDING
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "SignatureRequest",
        from = "Column::RequestId",
        to = "super::signature_request::Column::Id"
    )]
    Request,
}

impl Related<SignatureRequest> for Entity {
    fn to() -> RelationDef {
        Relation::Request.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
