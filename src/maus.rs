use env_logger;
use futures;
use log;
use std;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::errors::MausError;

const CHANNEL_CAPACITY: usize = 64;

/// Which of the two peers this process plays
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Role {
    Device,
    Controller,
}

impl Role {
    fn name(&self) -> &'static str {
        match self {
            Role::Device => "device",
            Role::Controller => "controller",
        }
    }
}

/// run is the main entry point to start either peer
///
/// It spawns:
/// - the MQTT event loop task, forwarding subscribed messages
/// - the routing task from MQTT to the peer
/// - the peer itself, owning all of its state
/// - the MQTT publish task draining the peer's outbox
/// - for the device: the render sink and the console reader
#[tokio::main]
pub async fn run(role: Role, settings: Settings, debug: bool) -> Result<(), MausError> {
    // log config
    let log_level = match debug {
        true => "debug",
        false => "info",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    log::debug!("Start pumpmaus as {}", role.name());

    let topics = crate::mqtt::TopicMap::new(&settings.device.name)?;
    let state = settings.device.initial_state()?;
    let switch_period = settings.controller.mode_switch_period()?;
    let client_id = settings.mqtt.client_id(role.name());
    let (mqtt_client, event_loop) = crate::mqtt::connect(&settings.mqtt, &client_id)?;
    log::info!(
        "Connecting to {}:{} as {}",
        settings.mqtt.host,
        settings.mqtt.port,
        client_id
    );

    let shutdown = CancellationToken::new();

    // Channels
    let (mqtt_subscribe_tx, mqtt_subscribe_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (inbox_tx, inbox_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (mqtt_publish_tx, mqtt_publish_rx) = mpsc::channel(CHANNEL_CAPACITY);

    let mut handles = std::vec::Vec::new();

    log::debug!("Start task to subscribe to and handle MQTT topics");
    let subscriptions = match role {
        Role::Device => crate::auto::DEVICE_TOPICS.to_vec(),
        Role::Controller => crate::auto::CONTROLLER_TOPICS.to_vec(),
    };
    let c = mqtt_client.clone();
    let t = topics.clone();
    let token = shutdown.clone();
    handles.push(tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = crate::mqtt::subscribe::handle_incoming_messages(
                mqtt_subscribe_tx,
                event_loop,
                c,
                t,
                subscriptions,
            ) => {}
        }
    }));

    log::debug!("Start task to handle MQTT publishing");
    let token = shutdown.clone();
    handles.push(tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = crate::mqtt::publish::publish_messages(mqtt_publish_rx, mqtt_client, topics) => {}
        }
    }));

    match role {
        Role::Device => {
            let (render_tx, render_rx) = mpsc::channel(CHANNEL_CAPACITY);
            let (intent_tx, intent_rx) = mpsc::channel(CHANNEL_CAPACITY);

            log::debug!("Start task to connect MQTT subscribe -> device");
            handles.push(tokio::spawn(crate::auto::run_mqtt_to_device(
                mqtt_subscribe_rx,
                inbox_tx,
            )));

            log::debug!("Start task to write render events");
            handles.push(tokio::spawn(crate::dummy::write_events(render_rx)));

            let (device, snapshots) =
                crate::device::Device::new(state, mqtt_publish_tx, render_tx);
            handles.push(tokio::spawn(device.run(
                inbox_rx,
                intent_rx,
                shutdown.clone(),
            )));

            let _console = crate::console::spawn_reader(intent_tx, snapshots, shutdown.clone());
        }
        Role::Controller => {
            log::debug!("Start task to connect MQTT subscribe -> controller");
            handles.push(tokio::spawn(crate::auto::run_mqtt_to_controller(
                mqtt_subscribe_rx,
                inbox_tx,
            )));

            let controller =
                crate::controller::Controller::new(settings.controller.rule(), mqtt_publish_tx);
            handles.push(tokio::spawn(controller.run(
                inbox_rx,
                switch_period,
                shutdown.clone(),
            )));
        }
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => log::info!("Interrupted"),
        _ = shutdown.cancelled() => {}
    }
    shutdown.cancel();

    // Block on the handles processing
    for result in futures::future::join_all(handles).await {
        if let Err(e) = result {
            log::error!("Task failed: {}", e);
        }
    }
    log::info!("Stopped pumpmaus");
    Ok(())
}
