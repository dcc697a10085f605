/// subscribe module accepts incoming MQTT messages and forwards it back to the rest
use rumqttc::{AsyncClient, Event, EventLoop, Packet, QoS};
use tokio::sync::mpsc;

use crate::mqtt::{Message, Topic, TopicMap};

const RECONNECT_DELAY_SECS: u64 = 5;

/// Turn a raw publish into a message, if it is one of ours
fn incoming_message(topics: &TopicMap, publish: &rumqttc::Publish) -> Option<Message> {
    let topic = match topics.topic_from_path(&publish.topic) {
        Some(topic) => topic,
        None => {
            log::debug!("Ignoring message on foreign topic {:?}", publish.topic);
            return None;
        }
    };
    match std::str::from_utf8(&publish.payload) {
        Ok(payload) => Some(Message::new(topic, payload)),
        Err(e) => {
            log::warn!("Invalid UTF-8 in payload on {:?}: {}", publish.topic, e);
            None
        }
    }
}

/// handle incoming messages
///
/// Polls the event loop forever, (re)subscribing on every connection ack. Connection errors
/// are logged and retried after a delay; returns only when nobody listens anymore.
pub async fn handle_incoming_messages(
    tx: mpsc::Sender<Message>,
    mut event_loop: EventLoop,
    mqtt_client: AsyncClient,
    topics: TopicMap,
    subscriptions: Vec<Topic>,
) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                log::info!("Connected to MQTT broker");
                for topic in &subscriptions {
                    let path = topics.path(*topic);
                    log::info!("Subscribing to {}", path);
                    if let Err(e) = mqtt_client.try_subscribe(path, QoS::AtMostOnce) {
                        log::warn!("Could not subscribe: {}", e);
                    }
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                if let Some(message) = incoming_message(&topics, &publish) {
                    log::debug!("Get msg {:?} payload {:?}", message.topic, message.payload);
                    if tx.send(message).await.is_err() {
                        log::debug!("Inbound channel closed, subscriber stopped");
                        return;
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                log::error!("MQTT connection error: {}", e);
                tokio::time::sleep(std::time::Duration::from_secs(RECONNECT_DELAY_SECS)).await;
            }
        }
    }
}
