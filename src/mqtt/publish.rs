/// publish module accepts all outgoing messages and publishes them to MQTT
use rumqttc::{AsyncClient, QoS};
use tokio::sync::mpsc;

use crate::mqtt::{Message, TopicMap};

/// publish_messages drains the outbox; delivery is never confirmed
pub async fn publish_messages(
    mut rx: mpsc::Receiver<Message>,
    mqtt_client: AsyncClient,
    topics: TopicMap,
) {
    while let Some(message) = rx.recv().await {
        let path = topics.path(message.topic);
        log::debug!("Publishing {:?} to {}", message.payload, path);
        if let Err(e) = mqtt_client
            .publish(path, QoS::AtMostOnce, false, message.payload.into_bytes())
            .await
        {
            // the event loop is gone, nothing left to publish to
            log::warn!("Could not publish message: {}", e);
            break;
        }
    }
    log::debug!("Outbox closed, publisher stopped");
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MqttSettings;
    use crate::mqtt::Topic;
    use std::time::Duration;

    fn client() -> (AsyncClient, rumqttc::EventLoop) {
        crate::mqtt::connect(&MqttSettings::default(), "pumpmaus-test").unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_outbox_closes() {
        // the event loop is kept but never polled, requests just queue up
        let (mqtt_client, _event_loop) = client();
        let (tx, rx) = mpsc::channel(8);
        let handle = tokio::spawn(publish_messages(
            rx,
            mqtt_client,
            TopicMap::new("device").unwrap(),
        ));

        tx.send(Message::new(Topic::Sensor, "45")).await.unwrap();
        tx.send(Message::new(Topic::Pump, "on")).await.unwrap();
        drop(tx);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("publisher should stop once the outbox is closed")
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_event_loop_is_gone() {
        let (mqtt_client, event_loop) = client();
        drop(event_loop);
        let (tx, rx) = mpsc::channel(8);
        let handle = tokio::spawn(publish_messages(
            rx,
            mqtt_client,
            TopicMap::new("device").unwrap(),
        ));

        tx.send(Message::new(Topic::Mode, "Manual")).await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("publisher should stop once publishing fails")
            .unwrap();
        assert!(tx.is_closed());
    }
}
