// MIT License - Copyright (c) 2026 the hms2mqtt authors

pub mod http;

pub use http::{DeviceRecord, HmsCloudClient};

use crate::error::Result;
use crate::state::{ArmCommand, DeviceSnapshot, HmsId};

/// Cloud operations the adapter consumes from the vendor.
///
/// Implemented by [`HmsCloudClient`] for the real service; the adapter is
/// generic over this trait.
#[allow(async_fn_in_trait)]
pub trait HmsClient: Send + Sync {
    /// Look up the monitoring-profile identifier for this account.
    async fn resolve_identifier(&self) -> Result<HmsId>;

    /// Fetch the current panel snapshot.
    async fn fetch_status(&self, id: &HmsId) -> Result<DeviceSnapshot>;

    /// Push a new arm state. One-way: an accepted push carries no payload.
    async fn push_state(&self, id: &HmsId, command: ArmCommand) -> Result<()>;
}
