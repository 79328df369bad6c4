// MIT License - Copyright (c) 2026 the hms2mqtt authors

use tracing::{debug, warn};

use crate::client::HmsClient;
use crate::error::{HmsError, Result};
use crate::event::{event_channel, AccessoryEvent, EventReceiver, EventSender};
use crate::state::{ConnectionState, DeviceHealth, DeviceSnapshot, HmsId, SecurityState};

/// Exposes one HMS panel as a host security-system accessory.
///
/// Owns the cached monitoring identifier and the latest device snapshot,
/// translating between the vendor's four-valued status and the host's
/// five-valued arm/disarm vocabulary. One instance per physical device;
/// all cache mutation happens in [`refresh`](Self::refresh).
///
/// # Example
///
/// ```no_run
/// use hms_cloud_bridge::{HmsCloudClient, HmsConfig, SecurityState, SecurityStateAdapter};
///
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let config = HmsConfig::builder()
///     .base_url("https://api.hms.example.com")
///     .key_id("kid_123")
///     .api_key("secret")
///     .device_id("A4DA22112233")
///     .build();
///
/// let client = HmsCloudClient::new(&config)?;
/// let mut adapter = SecurityStateAdapter::new(client.clone(), "Home Security");
///
/// let record = client.device_health().await?;
/// adapter.refresh(record.health).await?;
/// println!("Current: {}", adapter.current_state()?);
///
/// adapter.set_target_state(SecurityState::AwayArm).await?;
/// # Ok(())
/// # }
/// ```
pub struct SecurityStateAdapter<C> {
    client: C,
    display_name: String,
    hms_id: Option<HmsId>,
    snapshot: Option<DeviceSnapshot>,
    available: bool,
    event_tx: EventSender,
}

impl<C: HmsClient> SecurityStateAdapter<C> {
    /// Create an adapter for one panel. No cloud calls happen here; the
    /// identifier is resolved lazily on the first connected refresh.
    pub fn new(client: C, display_name: impl Into<String>) -> Self {
        let (event_tx, _) = event_channel(64);
        Self {
            client,
            display_name: display_name.into(),
            hms_id: None,
            snapshot: None,
            available: false,
            event_tx,
        }
    }

    /// Subscribe to accessory events.
    pub fn subscribe(&self) -> EventReceiver {
        self.event_tx.subscribe()
    }

    /// Accessory display name.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Whether the last refresh found the device reachable.
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// The cached monitoring identifier, once resolved.
    pub fn hms_id(&self) -> Option<&HmsId> {
        self.hms_id.as_ref()
    }

    /// Drive one polling cycle.
    ///
    /// A disconnected health report short-circuits: the accessory is marked
    /// unavailable and the cached snapshot stays untouched. Otherwise the
    /// identifier is resolved on first need (and never again), a fresh
    /// snapshot is fetched, and the recomputed current state goes out on
    /// the event channel. Collaborator failures propagate unchanged; retry
    /// policy lives in the transport layer, not here.
    pub async fn refresh(&mut self, health: DeviceHealth) -> Result<()> {
        if health.connection == ConnectionState::Disconnected {
            debug!("{}: device disconnected, marking unavailable", self.display_name);
            self.mark_unavailable();
            return Ok(());
        }

        let id = match &self.hms_id {
            Some(id) => id.clone(),
            None => {
                let id = self.client.resolve_identifier().await?;
                debug!("{}: resolved monitoring id {id}", self.display_name);
                self.hms_id = Some(id.clone());
                id
            }
        };

        let snapshot = self.client.fetch_status(&id).await?;
        debug!("{}: panel status {}", self.display_name, snapshot.status);

        // The snapshot carries its own connectivity flag; a disconnect
        // reported there suppresses translation for this cycle too.
        let connected = snapshot.connection.is_connected();
        self.snapshot = Some(snapshot);
        if !connected {
            self.mark_unavailable();
            return Ok(());
        }

        self.available = true;
        match self.current_state() {
            Ok(current) => {
                let _ = self.event_tx.send(AccessoryEvent::StateRefreshed { current });
            }
            Err(e) => warn!("{}: {e}", self.display_name),
        }
        Ok(())
    }

    fn mark_unavailable(&mut self) {
        self.available = false;
        let _ = self.event_tx.send(AccessoryEvent::NoResponse);
    }

    /// Current host-visible security state, derived from the cached
    /// snapshot. Pure read; named errors when nothing has been fetched yet
    /// or the cached status has no mapping.
    pub fn current_state(&self) -> Result<SecurityState> {
        let snapshot = self.snapshot.as_ref().ok_or(HmsError::StatusPending)?;
        match snapshot.status.to_security_state() {
            Some(state) => {
                debug!("{}: current state {state}", self.display_name);
                Ok(state)
            }
            None => Err(HmsError::UnmappedStatus {
                status: snapshot.status.as_wire_str().to_string(),
            }),
        }
    }

    /// Target state reads mirror current-state reads; the vendor exposes a
    /// single status field.
    pub fn target_state(&self) -> Result<SecurityState> {
        self.current_state()
    }

    /// Request a new panel state.
    ///
    /// One-way: an accepted push returns no payload but emits
    /// [`AccessoryEvent::TargetPushed`]; rejections and transport failures
    /// propagate to the caller. `AlarmTriggered` is not a requestable
    /// target, and pushing before a refresh has resolved the identifier is
    /// an error.
    pub async fn set_target_state(&self, target: SecurityState) -> Result<()> {
        let command = target
            .to_arm_command()
            .ok_or(HmsError::UnsupportedTarget(target))?;
        let id = self.hms_id.as_ref().ok_or(HmsError::IdentifierUnresolved)?;
        debug!("{}: pushing target {target} as \"{command}\"", self.display_name);
        self.client.push_state(id, command).await?;
        let _ = self.event_tx.send(AccessoryEvent::TargetPushed { target });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use tokio::sync::broadcast::error::TryRecvError;

    use super::*;
    use crate::error::ApiErrorCode;
    use crate::state::{ArmCommand, HmsStatus};

    #[derive(Default)]
    struct ClientState {
        resolve_calls: AtomicUsize,
        fetch_calls: AtomicUsize,
        pushes: Mutex<Vec<(HmsId, ArmCommand)>>,
        snapshot: Mutex<Option<DeviceSnapshot>>,
        resolve_errors: Mutex<VecDeque<HmsError>>,
        fetch_errors: Mutex<VecDeque<HmsError>>,
        push_errors: Mutex<VecDeque<HmsError>>,
    }

    /// Scripted stand-in for the cloud client; clones share call counters.
    #[derive(Clone, Default)]
    struct ScriptedClient {
        state: Arc<ClientState>,
    }

    impl ScriptedClient {
        fn with_status(status: HmsStatus) -> Self {
            let client = Self::default();
            client.set_snapshot(ConnectionState::Connected, status);
            client
        }

        fn set_snapshot(&self, connection: ConnectionState, status: HmsStatus) {
            *self.state.snapshot.lock().unwrap() = Some(DeviceSnapshot { connection, status });
        }

        fn resolve_calls(&self) -> usize {
            self.state.resolve_calls.load(Ordering::SeqCst)
        }

        fn fetch_calls(&self) -> usize {
            self.state.fetch_calls.load(Ordering::SeqCst)
        }

        fn pushes(&self) -> Vec<(HmsId, ArmCommand)> {
            self.state.pushes.lock().unwrap().clone()
        }

        fn fail_next_resolve(&self, err: HmsError) {
            self.state.resolve_errors.lock().unwrap().push_back(err);
        }

        fn fail_next_fetch(&self, err: HmsError) {
            self.state.fetch_errors.lock().unwrap().push_back(err);
        }

        fn fail_next_push(&self, err: HmsError) {
            self.state.push_errors.lock().unwrap().push_back(err);
        }
    }

    impl HmsClient for ScriptedClient {
        async fn resolve_identifier(&self) -> Result<HmsId> {
            self.state.resolve_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.state.resolve_errors.lock().unwrap().pop_front() {
                return Err(err);
            }
            Ok(HmsId::new("hms_test"))
        }

        async fn fetch_status(&self, _id: &HmsId) -> Result<DeviceSnapshot> {
            self.state.fetch_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.state.fetch_errors.lock().unwrap().pop_front() {
                return Err(err);
            }
            Ok(self
                .state
                .snapshot
                .lock()
                .unwrap()
                .clone()
                .expect("test fake has no snapshot scripted"))
        }

        async fn push_state(&self, id: &HmsId, command: ArmCommand) -> Result<()> {
            if let Some(err) = self.state.push_errors.lock().unwrap().pop_front() {
                return Err(err);
            }
            self.state.pushes.lock().unwrap().push((id.clone(), command));
            Ok(())
        }
    }

    fn connected() -> DeviceHealth {
        DeviceHealth::new(ConnectionState::Connected)
    }

    fn disconnected() -> DeviceHealth {
        DeviceHealth::new(ConnectionState::Disconnected)
    }

    #[test]
    fn test_new_adapter_has_nothing_cached() {
        let adapter = SecurityStateAdapter::new(ScriptedClient::default(), "Test Panel");
        assert!(!adapter.is_available());
        assert!(adapter.hms_id().is_none());
        assert!(matches!(
            adapter.current_state(),
            Err(HmsError::StatusPending)
        ));
        assert!(matches!(adapter.target_state(), Err(HmsError::StatusPending)));
    }

    #[tokio::test]
    async fn test_disconnected_refresh_short_circuits() {
        let client = ScriptedClient::default();
        let mut adapter = SecurityStateAdapter::new(client.clone(), "Test Panel");
        let mut events = adapter.subscribe();

        adapter.refresh(disconnected()).await.unwrap();

        assert_eq!(client.resolve_calls(), 0);
        assert_eq!(client.fetch_calls(), 0);
        assert!(!adapter.is_available());
        assert!(matches!(
            events.try_recv(),
            Ok(AccessoryEvent::NoResponse)
        ));
    }

    #[tokio::test]
    async fn test_disconnected_refresh_preserves_cached_status() {
        let client = ScriptedClient::with_status(HmsStatus::Home);
        let mut adapter = SecurityStateAdapter::new(client.clone(), "Test Panel");

        adapter.refresh(connected()).await.unwrap();
        assert_eq!(adapter.current_state().unwrap(), SecurityState::StayArm);
        let mut events = adapter.subscribe();

        adapter.refresh(disconnected()).await.unwrap();

        assert!(!adapter.is_available());
        assert!(matches!(
            events.try_recv(),
            Ok(AccessoryEvent::NoResponse)
        ));
        assert_eq!(client.fetch_calls(), 1);
        assert_eq!(adapter.current_state().unwrap(), SecurityState::StayArm);
    }

    #[tokio::test]
    async fn test_refresh_resolves_once_then_reuses_id() {
        let client = ScriptedClient::with_status(HmsStatus::Home);
        let mut adapter = SecurityStateAdapter::new(client.clone(), "Test Panel");

        adapter.refresh(connected()).await.unwrap();
        assert_eq!(client.resolve_calls(), 1);
        assert_eq!(client.fetch_calls(), 1);
        assert_eq!(adapter.hms_id().unwrap().as_str(), "hms_test");
        assert!(adapter.is_available());
        assert_eq!(adapter.current_state().unwrap(), SecurityState::StayArm);

        adapter.refresh(connected()).await.unwrap();
        assert_eq!(client.resolve_calls(), 1);
        assert_eq!(client.fetch_calls(), 2);
    }

    #[tokio::test]
    async fn test_set_target_rejects_alarm_triggered() {
        let client = ScriptedClient::default();
        let adapter = SecurityStateAdapter::new(client.clone(), "Test Panel");

        let err = adapter
            .set_target_state(SecurityState::AlarmTriggered)
            .await
            .unwrap_err();
        assert!(matches!(err, HmsError::UnsupportedTarget(_)));
        assert!(client.pushes().is_empty());
    }

    #[tokio::test]
    async fn test_set_target_requires_resolved_identifier() {
        let client = ScriptedClient::default();
        let adapter = SecurityStateAdapter::new(client.clone(), "Test Panel");

        let err = adapter
            .set_target_state(SecurityState::AwayArm)
            .await
            .unwrap_err();
        assert!(matches!(err, HmsError::IdentifierUnresolved));
        assert!(client.pushes().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_reporting_disconnect_suppresses_translation() {
        let client = ScriptedClient::default();
        client.set_snapshot(ConnectionState::Disconnected, HmsStatus::Home);
        let mut adapter = SecurityStateAdapter::new(client.clone(), "Test Panel");
        let mut events = adapter.subscribe();

        adapter.refresh(connected()).await.unwrap();

        assert!(!adapter.is_available());
        assert!(matches!(
            events.try_recv(),
            Ok(AccessoryEvent::NoResponse)
        ));
    }

    #[tokio::test]
    async fn test_away_arm_then_disarm_pushes_off() {
        let client = ScriptedClient::with_status(HmsStatus::Away);
        let mut adapter = SecurityStateAdapter::new(client.clone(), "Test Panel");
        let mut events = adapter.subscribe();

        adapter.refresh(connected()).await.unwrap();
        assert_eq!(adapter.current_state().unwrap(), SecurityState::AwayArm);
        assert!(matches!(
            events.try_recv(),
            Ok(AccessoryEvent::StateRefreshed {
                current: SecurityState::AwayArm
            })
        ));

        adapter.set_target_state(SecurityState::Disarm).await.unwrap();

        let pushes = client.pushes();
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0].0.as_str(), "hms_test");
        assert_eq!(pushes[0].1, ArmCommand::Off);
        assert!(matches!(
            events.try_recv(),
            Ok(AccessoryEvent::TargetPushed {
                target: SecurityState::Disarm
            })
        ));
    }

    #[tokio::test]
    async fn test_reads_are_pure_between_refreshes() {
        let client = ScriptedClient::with_status(HmsStatus::Home);
        let mut adapter = SecurityStateAdapter::new(client.clone(), "Test Panel");

        adapter.refresh(connected()).await.unwrap();
        assert_eq!(client.fetch_calls(), 1);

        assert_eq!(adapter.current_state().unwrap(), SecurityState::StayArm);
        assert_eq!(adapter.current_state().unwrap(), SecurityState::StayArm);
        assert_eq!(adapter.target_state().unwrap(), SecurityState::StayArm);
        assert_eq!(client.fetch_calls(), 1);
        assert_eq!(client.resolve_calls(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates_and_preserves_snapshot() {
        let client = ScriptedClient::with_status(HmsStatus::Home);
        let mut adapter = SecurityStateAdapter::new(client.clone(), "Test Panel");

        adapter.refresh(connected()).await.unwrap();
        assert_eq!(adapter.current_state().unwrap(), SecurityState::StayArm);

        client.fail_next_fetch(HmsError::Api(ApiErrorCode::ServiceBusy));
        let err = adapter.refresh(connected()).await.unwrap_err();
        assert!(matches!(err, HmsError::Api(ApiErrorCode::ServiceBusy)));

        assert_eq!(adapter.current_state().unwrap(), SecurityState::StayArm);
        assert_eq!(client.resolve_calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_resolution_retries_on_next_refresh() {
        let client = ScriptedClient::with_status(HmsStatus::Disarm);
        let mut adapter = SecurityStateAdapter::new(client.clone(), "Test Panel");

        client.fail_next_resolve(HmsError::Api(ApiErrorCode::ServiceBusy));
        assert!(adapter.refresh(connected()).await.is_err());
        assert!(adapter.hms_id().is_none());
        assert_eq!(client.fetch_calls(), 0);

        adapter.refresh(connected()).await.unwrap();
        assert_eq!(client.resolve_calls(), 2);
        assert!(adapter.hms_id().is_some());
        assert_eq!(adapter.current_state().unwrap(), SecurityState::Disarm);
    }

    #[tokio::test]
    async fn test_push_failure_propagates_without_event() {
        let client = ScriptedClient::with_status(HmsStatus::Home);
        let mut adapter = SecurityStateAdapter::new(client.clone(), "Test Panel");

        adapter.refresh(connected()).await.unwrap();
        let mut events = adapter.subscribe();

        client.fail_next_push(HmsError::Api(ApiErrorCode::DeviceOffline));
        let err = adapter
            .set_target_state(SecurityState::AwayArm)
            .await
            .unwrap_err();
        assert!(matches!(err, HmsError::Api(ApiErrorCode::DeviceOffline)));
        assert!(client.pushes().is_empty());
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_unrecognized_status_is_surfaced_not_translated() {
        let client = ScriptedClient::with_status(HmsStatus::from_wire("vacation"));
        let mut adapter = SecurityStateAdapter::new(client.clone(), "Test Panel");
        let mut events = adapter.subscribe();

        adapter.refresh(connected()).await.unwrap();
        assert!(adapter.is_available());

        match adapter.current_state() {
            Err(HmsError::UnmappedStatus { status }) => assert_eq!(status, "vacation"),
            other => panic!("expected unmapped status error, got {other:?}"),
        }
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    }
}
