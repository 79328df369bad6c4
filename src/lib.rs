// MIT License - Copyright (c) 2026 the hms2mqtt authors
//
//! # hms-cloud-bridge
//!
//! Exposes HMS cloud-managed security panels as host home-automation
//! security-system accessories.
//!
//! The vendor cloud is the only path to these panels; this library polls
//! it over HTTPS and translates between the panel's four-valued status
//! vocabulary and the host's five-valued arm/disarm states. No external
//! dependencies beyond reqwest, serde, tokio, thiserror, and tracing.
//!
//! ## Quick Start
//!
//! ```no_run
//! use hms_cloud_bridge::{HmsCloudClient, HmsConfig, SecurityState, SecurityStateAdapter};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = HmsConfig::builder()
//!         .base_url("https://api.hms.example.com")
//!         .key_id("kid_123")
//!         .api_key("secret")
//!         .device_id("A4DA22112233")
//!         .build();
//!
//!     let client = HmsCloudClient::new(&config)?;
//!     let mut adapter = SecurityStateAdapter::new(client.clone(), "Home Security");
//!
//!     let mut events = adapter.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let record = client.device_health().await?;
//!     adapter.refresh(record.health).await?;
//!     println!("Current state: {}", adapter.current_state()?);
//!
//!     adapter.set_target_state(SecurityState::AwayArm).await?;
//!     Ok(())
//! }
//! ```

pub mod accessory;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod protocol;
pub mod state;

// Re-exports for convenience
pub use accessory::SecurityStateAdapter;
pub use client::{DeviceRecord, HmsClient, HmsCloudClient};
pub use config::{HmsConfig, HmsConfigBuilder};
pub use error::{ApiErrorCode, HmsError, Result};
pub use event::{AccessoryEvent, EventReceiver};
pub use state::{
    ArmCommand, ConnectionState, DeviceHealth, DeviceSnapshot, HmsId, HmsStatus, SecurityState,
};
