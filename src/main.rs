// MIT License - Copyright (c) 2026 the hms2mqtt authors
// MQTT bridge

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use serde::{Deserialize, Serialize};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Mutex;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, warn};

use hms_cloud_bridge::{
    AccessoryEvent, DeviceRecord, HmsCloudClient, HmsConfig, SecurityState, SecurityStateAdapter,
};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "hms2mqtt")]
#[command(about = "Bridge between an HMS cloud security panel and MQTT")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Config {
    hms: HmsToml,
    mqtt: MqttToml,
}

#[derive(Debug, Deserialize)]
struct HmsToml {
    #[serde(default = "default_base_url")]
    base_url: String,
    key_id: String,
    api_key: String,
    device_id: String,
    /// Accessory name override. Optional: when omitted, the nickname
    /// registered with the HMS cloud is used.
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default = "default_refresh_interval")]
    refresh_interval_secs: u64,
    #[serde(default = "default_timeout")]
    timeout_ms: u64,
    #[serde(default = "default_connect_retries")]
    connect_retries: u32,
    #[serde(default = "default_retry_delay")]
    retry_delay_ms: u64,
}

fn default_base_url() -> String {
    "https://api.hms.example.com".to_string()
}
fn default_refresh_interval() -> u64 {
    30
}
fn default_timeout() -> u64 {
    10000
}
fn default_connect_retries() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    10000
}

#[derive(Debug, Deserialize)]
struct MqttToml {
    url: String,
    #[serde(default = "default_client_id")]
    client_id: String,
    #[serde(default = "default_subscribe_topic")]
    subscribe_topic: String,
    #[serde(default = "default_publish_topic")]
    publish_topic: String,
}

fn default_client_id() -> String {
    "hms-bridge".to_string()
}
fn default_subscribe_topic() -> String {
    "hms/cmd".to_string()
}
fn default_publish_topic() -> String {
    "hms".to_string()
}

fn build_hms_config(toml: &HmsToml) -> HmsConfig {
    let mut builder = HmsConfig::builder()
        .base_url(&toml.base_url)
        .key_id(&toml.key_id)
        .api_key(&toml.api_key)
        .device_id(&toml.device_id)
        .timeout_ms(toml.timeout_ms);
    if let Some(name) = &toml.display_name {
        builder = builder.display_name(name);
    }
    builder.build()
}

// ---------------------------------------------------------------------------
// MQTT JSON types
// ---------------------------------------------------------------------------

// Published messages all share the flat {now, op, ...} structure

#[derive(Serialize)]
struct MqttStateMsg {
    now: u64,
    op: String,
    current: String,
    target: String,
}

#[derive(Serialize)]
struct MqttAvailabilityMsg {
    now: u64,
    op: String,
    online: bool,
}

#[derive(Serialize)]
struct MqttTargetMsg {
    now: u64,
    op: String,
    target: String,
}

// CMD_ACK response
#[derive(Serialize)]
struct MqttCmdAck {
    now: u64,
    op: String,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    src: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

// Inbound command (subscribed)
#[derive(Deserialize)]
struct MqttCommand {
    op: String,
    #[serde(default)]
    #[allow(dead_code)]
    op_id: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn now_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

async fn publish_json(client: &AsyncClient, topic: &str, payload: &impl Serialize, retain: bool) {
    match serde_json::to_string(payload) {
        Ok(json) => {
            if let Err(e) = client.publish(topic, QoS::AtLeastOnce, retain, json).await {
                error!("Failed to publish to {topic}: {e}");
            }
        }
        Err(e) => error!("Failed to serialize MQTT payload: {e}"),
    }
}

async fn publish_state(
    client: &AsyncClient,
    topic: &str,
    current: SecurityState,
    target: SecurityState,
) {
    let msg = MqttStateMsg {
        now: now_epoch_ms(),
        op: "STATE".to_string(),
        current: current.as_str().to_string(),
        target: target.as_str().to_string(),
    };
    publish_json(client, topic, &msg, true).await;
}

async fn publish_availability(client: &AsyncClient, topic: &str, online: bool) {
    let msg = MqttAvailabilityMsg {
        now: now_epoch_ms(),
        op: "AVAILABILITY".to_string(),
        online,
    };
    publish_json(client, topic, &msg, true).await;
}

async fn publish_target_pushed(client: &AsyncClient, topic: &str, target: SecurityState) {
    let msg = MqttTargetMsg {
        now: now_epoch_ms(),
        op: "TARGET_PUSHED".to_string(),
        target: target.as_str().to_string(),
    };
    publish_json(client, topic, &msg, false).await;
}

async fn publish_cmd_ack(
    client: &AsyncClient,
    topic: &str,
    success: bool,
    src: Option<serde_json::Value>,
    data: Option<serde_json::Value>,
) {
    let msg = MqttCmdAck {
        now: now_epoch_ms(),
        op: "CMD_ACK".to_string(),
        success,
        src,
        data,
    };
    publish_json(client, topic, &msg, false).await;
}

// ---------------------------------------------------------------------------
// Accessory event → MQTT
// ---------------------------------------------------------------------------

async fn handle_accessory_event(event: AccessoryEvent, client: &AsyncClient, topic: &str) {
    match event {
        AccessoryEvent::StateRefreshed { current } => {
            publish_availability(client, topic, true).await;
            publish_state(client, topic, current, current).await;
        }

        AccessoryEvent::NoResponse => {
            warn!("Device not responding");
            publish_availability(client, topic, false).await;
        }

        AccessoryEvent::TargetPushed { target } => {
            info!("Target state pushed: {target}");
            publish_target_pushed(client, topic, target).await;
        }
    }
}

// ---------------------------------------------------------------------------
// MQTT command handler
// ---------------------------------------------------------------------------

/// Execute an adapter command future and log the result. Returns `true` on success.
async fn exec_adapter_cmd<E: std::fmt::Display>(
    op: &str,
    label: &str,
    fut: impl std::future::Future<Output = std::result::Result<(), E>>,
) -> bool {
    match fut.await {
        Ok(()) => {
            info!("{op} {label}: success");
            true
        }
        Err(e) => {
            error!("{op} {label} failed: {e}");
            false
        }
    }
}

async fn handle_command(
    payload_str: &str,
    cmd: MqttCommand,
    client: &AsyncClient,
    topic: &str,
    adapter: &mut SecurityStateAdapter<HmsCloudClient>,
    hms: &HmsCloudClient,
) {
    // Parse the raw payload as a JSON value for the CMD_ACK src field
    let src_json = serde_json::from_str::<serde_json::Value>(payload_str).ok();

    match cmd.op.as_str() {
        "GET_STATE" => {
            debug!("Command: GET_STATE");
            match adapter.current_state() {
                Ok(current) => {
                    publish_state(client, topic, current, current).await;
                    let data = serde_json::json!({
                        "current": current.as_str(),
                        "target": current.as_str(),
                    });
                    publish_cmd_ack(client, topic, true, src_json, Some(data)).await;
                }
                Err(e) => {
                    warn!("GET_STATE failed: {e}");
                    publish_cmd_ack(client, topic, false, src_json, None).await;
                }
            }
        }

        "SET_STATE" => {
            let target = match cmd.state.as_deref().and_then(SecurityState::from_name) {
                Some(target) => target,
                None => {
                    warn!("SET_STATE: missing or unknown state");
                    publish_cmd_ack(client, topic, false, src_json, None).await;
                    return;
                }
            };
            info!("Command: SET_STATE {target}");
            let label = format!("target {target}");
            let success =
                exec_adapter_cmd("SET_STATE", &label, adapter.set_target_state(target)).await;
            publish_cmd_ack(client, topic, success, src_json, None).await;
        }

        "REFRESH" => {
            info!("Command: REFRESH");
            let success = match hms.device_health().await {
                Ok(record) => {
                    let label = adapter.display_name().to_string();
                    exec_adapter_cmd("REFRESH", &label, adapter.refresh(record.health)).await
                }
                Err(e) => {
                    error!("REFRESH: device health check failed: {e}");
                    false
                }
            };
            publish_cmd_ack(client, topic, success, src_json, None).await;
        }

        "PING" => {
            info!("Command: PING");
            publish_cmd_ack(client, topic, true, src_json, None).await;
        }

        other => {
            warn!("Unknown command: {other}");
            publish_cmd_ack(client, topic, false, src_json, None).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Cloud connection
// ---------------------------------------------------------------------------

/// Build a cloud client and verify it can see the configured device.
///
/// Retries transient failures with exponential backoff. The base delay is
/// `retry_delay_ms` from the config and the maximum number of retries is
/// `connect_retries`. Authentication and configuration errors fail
/// immediately.
async fn connect_cloud(
    config: &HmsConfig,
    max_retries: u32,
    base_delay_ms: u64,
) -> Result<(HmsCloudClient, DeviceRecord)> {
    let client = HmsCloudClient::new(config)?;

    let mut last_error = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay_ms = base_delay_ms * (1 << (attempt - 1).min(4));
            warn!(
                "Connection attempt {} failed, retrying in {:.1}s...",
                attempt,
                delay_ms as f64 / 1000.0
            );
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        match client.device_health().await {
            Ok(record) => return Ok((client, record)),
            Err(e) => {
                if !e.is_retryable() || attempt == max_retries {
                    return Err(e.into());
                }
                warn!("Connection error (attempt {}): {}", attempt + 1, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error
        .map(anyhow::Error::from)
        .unwrap_or_else(|| anyhow::anyhow!("HMS cloud connection failed")))
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity (e.g. RUST_LOG=debug or RUST_LOG=hms_cloud_bridge=trace).
    // Default: info.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // systemd journal already adds timestamps, so omit them when running under systemd
    if std::env::var_os("JOURNAL_STREAM").is_some() {
        tracing_subscriber::fmt().without_time().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let cli = Cli::parse();

    // Load config
    let config_text =
        std::fs::read_to_string(&cli.config).context("Failed to read config file")?;
    let config: Config = toml::from_str(&config_text).context("Failed to parse config file")?;

    let mut hms_toml = config.hms;
    let mut mqtt_client_id = config.mqtt.client_id;
    let mut publish_topic = config.mqtt.publish_topic;
    let mut subscribe_topic = config.mqtt.subscribe_topic;

    let (mut mqtt_host, mut mqtt_port) = parse_mqtt_url(&config.mqtt.url)?;

    let mut sighup = signal(SignalKind::hangup())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    loop {
        // Connect to the HMS cloud and verify the device is registered
        let hms_config = build_hms_config(&hms_toml);
        info!("Connecting to HMS cloud at {}", hms_config.base_url);
        let (hms, record) = connect_cloud(
            &hms_config,
            hms_toml.connect_retries,
            hms_toml.retry_delay_ms,
        )
        .await?;

        let display_name = hms_toml
            .display_name
            .clone()
            .unwrap_or_else(|| record.nickname.clone());
        info!(
            "HMS device \"{display_name}\" found ({})",
            if record.health.connection.is_connected() {
                "online"
            } else {
                "offline"
            }
        );

        let adapter = SecurityStateAdapter::new(hms.clone(), display_name);
        let event_rx = adapter.subscribe();
        let adapter = Arc::new(Mutex::new(adapter));

        // Set up MQTT
        let mut mqtt_opts = MqttOptions::new(&mqtt_client_id, &mqtt_host, mqtt_port);
        mqtt_opts.set_keep_alive(Duration::from_secs(30));
        let (client, mut eventloop) = AsyncClient::new(mqtt_opts, 256);

        // Subscribe to command topic
        client
            .subscribe(&subscribe_topic, QoS::AtLeastOnce)
            .await
            .context("Failed to subscribe to MQTT topic")?;
        info!("MQTT: subscribed to {subscribe_topic}");

        // Initial refresh before the tasks start
        {
            let mut adapter_lock = adapter.lock().await;
            if let Err(e) = adapter_lock.refresh(record.health).await {
                warn!("Initial refresh failed: {e}");
            }
        }

        // Task 1: Accessory event listener
        let client_events = client.clone();
        let topic_events = publish_topic.clone();
        let event_handle = tokio::spawn(async move {
            let mut rx = event_rx;
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        handle_accessory_event(event, &client_events, &topic_events).await;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Event receiver lagged, missed {n} events");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        info!("Event channel closed");
                        break;
                    }
                }
            }
        });

        // Task 2: MQTT event loop (receives messages, handles commands)
        let adapter_cmds = Arc::clone(&adapter);
        let hms_cmds = hms.clone();
        let client_cmds = client.clone();
        let topic_cmds = publish_topic.clone();
        let sub_topic = subscribe_topic.clone();
        let mqtt_handle = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        // (Re)subscribe after every broker connect/reconnect.
                        // rumqttc does not auto-resubscribe, so without this a
                        // broker restart silently drops our subscription and we
                        // stop receiving commands.
                        info!("MQTT: connected, subscribing to {sub_topic}");
                        if let Err(e) = client_cmds.subscribe(&sub_topic, QoS::AtLeastOnce).await {
                            error!("Failed to subscribe to {sub_topic}: {e}");
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(msg))) => {
                        if msg.topic == sub_topic {
                            let payload = String::from_utf8_lossy(&msg.payload);
                            match serde_json::from_str::<MqttCommand>(&payload) {
                                Ok(cmd) => {
                                    if cmd.op == "GET_STATE" {
                                        debug!("MQTT command received: {payload}");
                                    } else {
                                        info!("MQTT command received: {payload}");
                                    }
                                    let mut adapter_lock = adapter_cmds.lock().await;
                                    handle_command(
                                        &payload,
                                        cmd,
                                        &client_cmds,
                                        &topic_cmds,
                                        &mut adapter_lock,
                                        &hms_cmds,
                                    )
                                    .await;
                                }
                                Err(e) => {
                                    warn!("Failed to parse MQTT command: {e}");
                                }
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("MQTT event loop error: {e}");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        // Task 3: Refresh timer, polling device health before each refresh
        let adapter_tick = Arc::clone(&adapter);
        let hms_tick = hms.clone();
        let refresh_interval_secs = hms_toml.refresh_interval_secs;
        let tick_handle = tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(refresh_interval_secs));
            // Skip the first immediate tick (we already ran an initial refresh)
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match hms_tick.device_health().await {
                    Ok(record) => {
                        let mut adapter_lock = adapter_tick.lock().await;
                        if let Err(e) = adapter_lock.refresh(record.health).await {
                            warn!("Refresh failed: {e}");
                        }
                    }
                    Err(e) => warn!("Device health poll failed: {e}"),
                }
            }
        });

        // Wait for a signal
        info!("MQTT bridge running. Send SIGHUP to restart, SIGINT/SIGTERM to stop.");
        let restart = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT, shutting down...");
                false
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                false
            }
            _ = sighup.recv() => {
                info!("Received SIGHUP, reloading config and restarting connections...");
                true
            }
        };

        // Abort tasks
        event_handle.abort();
        mqtt_handle.abort();
        tick_handle.abort();

        if !restart {
            break;
        }

        // Reload config from disk; keep previous config on failure
        info!("Reloading config from {}", cli.config);
        match std::fs::read_to_string(&cli.config)
            .context("Failed to read config file")
            .and_then(|text| {
                toml::from_str::<Config>(&text).context("Failed to parse config file")
            }) {
            Ok(new_config) => match parse_mqtt_url(&new_config.mqtt.url) {
                Ok((new_host, new_port)) => {
                    hms_toml = new_config.hms;
                    mqtt_host = new_host;
                    mqtt_port = new_port;
                    mqtt_client_id = new_config.mqtt.client_id;
                    publish_topic = new_config.mqtt.publish_topic;
                    subscribe_topic = new_config.mqtt.subscribe_topic;
                    info!("Config reloaded successfully");
                }
                Err(e) => warn!("Invalid MQTT URL in new config, keeping previous: {e}"),
            },
            Err(e) => warn!("Failed to reload config, keeping previous: {e}"),
        }

        info!("Reconnecting...");
    }

    info!("Shutdown complete");
    Ok(())
}

/// Parse an MQTT URL like "mqtt://host:port" into (host, port).
fn parse_mqtt_url(url: &str) -> Result<(String, u16)> {
    let stripped = url
        .strip_prefix("mqtt://")
        .or_else(|| url.strip_prefix("tcp://"))
        .unwrap_or(url);

    let (host, port_str) = stripped
        .rsplit_once(':')
        .context("MQTT URL must be in format mqtt://host:port")?;

    let port: u16 = port_str
        .parse()
        .context("Invalid MQTT port number")?;

    Ok((host.to_string(), port))
}
