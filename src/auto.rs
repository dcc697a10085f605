/// auto links the MQTT side to the device and controller tasks
use tokio::sync::mpsc;

use crate::mqtt::{Message, Topic};

/// Topics the device listens to
pub const DEVICE_TOPICS: [Topic; 2] = [Topic::Response, Topic::Mode];

/// Topics the controller listens to
pub const CONTROLLER_TOPICS: [Topic; 1] = [Topic::Sensor];

/// Pass through messages on the accepted topics, drop the rest
pub async fn run_mqtt_to(
    mut mqtt_subscribe_rx: mpsc::Receiver<Message>,
    tx: mpsc::Sender<Message>,
    accepted: &[Topic],
) {
    while let Some(msg) = mqtt_subscribe_rx.recv().await {
        if !accepted.contains(&msg.topic) {
            log::debug!("Not routing message on {:?}", msg.topic);
            continue;
        }
        log::debug!("Message received {:?}", msg);
        if tx.send(msg).await.is_err() {
            log::debug!("Receiver gone, stop routing");
            break;
        }
    }
}

pub async fn run_mqtt_to_device(
    mqtt_subscribe_rx: mpsc::Receiver<Message>,
    device_tx: mpsc::Sender<Message>,
) {
    run_mqtt_to(mqtt_subscribe_rx, device_tx, &DEVICE_TOPICS).await
}

pub async fn run_mqtt_to_controller(
    mqtt_subscribe_rx: mpsc::Receiver<Message>,
    controller_tx: mpsc::Sender<Message>,
) {
    run_mqtt_to(mqtt_subscribe_rx, controller_tx, &CONTROLLER_TOPICS).await
}
