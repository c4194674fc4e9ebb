//! Remote collaborators: upload gateway, serial directory, connectivity and
//! credentials.
//!
//! The reconciler and pipeline only see the traits defined here, so tests
//! swap in in-memory doubles.

mod connectivity;
mod credentials;
mod error;
mod http;

pub use connectivity::*;
pub use credentials::*;
pub use error::*;
pub use http::*;

use async_trait::async_trait;
use fieldsync_engine::{NewMeterRecord, OldMeterRecord, OwnerSerials};
use serde::{Deserialize, Serialize};

/// Backend acknowledgement of an accepted upload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadAck {
    pub status: u16,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Multipart upload endpoint for meter records.
#[async_trait]
pub trait UploadGateway: Send + Sync {
    /// Create or touch the server-side context of an account. Idempotent.
    async fn create_account_instance(&self, account_id: &str) -> Result<(), GatewayError>;

    async fn upload_old_meter(&self, record: &OldMeterRecord) -> Result<UploadAck, GatewayError>;

    async fn upload_new_meter(&self, record: &NewMeterRecord) -> Result<UploadAck, GatewayError>;
}

/// Authoritative list of unused serial numbers, grouped by owner.
#[async_trait]
pub trait SerialDirectory: Send + Sync {
    async fn fetch_serials(&self) -> Result<Vec<OwnerSerials>, GatewayError>;
}
