/// controller watches sensor readings and steers the device from the outside
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::models::{Mode, PumpCommand};
use crate::mqtt::{Message, Topic};

/// Decision band of the controller, independent of the device's own thresholds
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DecisionRule {
    pub on_below: f64,
    pub off_above: f64,
}

impl Default for DecisionRule {
    fn default() -> Self {
        Self {
            on_below: 60.0,
            off_above: 90.0,
        }
    }
}

impl DecisionRule {
    pub fn decide(&self, value: f64) -> Option<PumpCommand> {
        if value > self.off_above {
            Some(PumpCommand::Off)
        } else if value < self.on_below {
            Some(PumpCommand::On)
        } else {
            None
        }
    }
}

/// What the controller thinks the device mode is: the last mode it broadcast itself
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct ControllerBelief {
    pub current_mode: Mode,
}

pub struct Controller {
    belief: ControllerBelief,
    rule: DecisionRule,
    outbox: mpsc::Sender<Message>,
}

impl Controller {
    pub fn new(rule: DecisionRule, outbox: mpsc::Sender<Message>) -> Self {
        Self {
            belief: ControllerBelief::default(),
            rule,
            outbox,
        }
    }

    pub fn belief(&self) -> ControllerBelief {
        self.belief
    }

    fn publish(&self, message: Message) {
        if let Err(e) = self.outbox.try_send(message) {
            log::warn!("Dropping outgoing message: {}", e);
        }
    }

    /// Handle one sensor reading, returning the command that went out, if any
    pub fn handle_reading(&mut self, payload: &str) -> Option<PumpCommand> {
        let value = match payload.trim().parse::<f64>() {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Invalid sensor value {:?}: {}", payload, e);
                return None;
            }
        };
        log::info!("Received sensor value: {}", value);

        let command = self.rule.decide(value)?;
        if self.belief.current_mode != Mode::Manual {
            log::debug!("Not sending {:?}, device runs on its own", command);
            return None;
        }
        self.publish(Message::new(Topic::Response, command.as_str()));
        log::info!("Sent command: {}", command.as_str());
        Some(command)
    }

    pub fn switch_mode(&mut self, mode: Mode) {
        self.belief.current_mode = mode;
        self.publish(Message::new(Topic::Mode, mode.as_str()));
        log::info!("Mode changed to: {}", mode);
    }

    /// React to readings and alternate the mode every `switch_period`, starting with Manual
    pub async fn run(
        mut self,
        mut readings: mpsc::Receiver<Message>,
        switch_period: Duration,
        shutdown: CancellationToken,
    ) {
        let mut switcher = tokio::time::interval(switch_period);
        let mut next_mode = Mode::Manual;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    log::info!("Controller shutting down");
                    break;
                }
                Some(message) = readings.recv() => {
                    if message.topic == Topic::Sensor {
                        self.handle_reading(&message.payload);
                    }
                }
                _ = switcher.tick() => {
                    self.switch_mode(next_mode);
                    next_mode = next_mode.toggled();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DeviceEvent, DeviceState, Effect, Intent};

    fn controller() -> (Controller, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(8);
        (Controller::new(DecisionRule::default(), tx), rx)
    }

    #[test]
    fn test_decision_boundaries() {
        let rule = DecisionRule::default();
        assert_eq!(rule.decide(59.9), Some(PumpCommand::On));
        assert_eq!(rule.decide(60.0), None);
        assert_eq!(rule.decide(90.0), None);
        assert_eq!(rule.decide(90.5), Some(PumpCommand::Off));
        assert_eq!(rule.decide(f64::NAN), None);
    }

    #[test]
    fn test_publishes_only_in_manual() {
        let (mut controller, mut rx) = controller();

        assert_eq!(controller.handle_reading("12"), Some(PumpCommand::On));
        assert_eq!(rx.try_recv().unwrap(), Message::new(Topic::Response, "on"));

        controller.switch_mode(Mode::Automatic);
        assert_eq!(rx.try_recv().unwrap(), Message::new(Topic::Mode, "Automatic"));
        assert_eq!(controller.handle_reading("95"), None);
        assert!(rx.try_recv().is_err());

        controller.switch_mode(Mode::Manual);
        rx.try_recv().unwrap();
        assert_eq!(controller.handle_reading(" 95.5 "), Some(PumpCommand::Off));
        assert_eq!(rx.try_recv().unwrap(), Message::new(Topic::Response, "off"));
    }

    #[test]
    fn test_malformed_reading() {
        let (mut controller, mut rx) = controller();
        let before = controller.belief();
        assert_eq!(controller.handle_reading("abc"), None);
        assert_eq!(controller.belief(), before);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_device_and_controller_scenario() {
        let mut device = DeviceState::default();
        let (mut controller, mut rx) = controller();

        let effects = device.process_event(DeviceEvent::Local(Intent::TogglePump));
        assert!(effects.contains(&Effect::Publish(Message::new(Topic::Pump, "on"))));

        let effects = device.process_event(DeviceEvent::Tick { step: 10 });
        assert_eq!(device.sensor_value, 60);
        let reading = effects
            .into_iter()
            .find_map(|effect| match effect {
                Effect::Publish(message) if message.topic == Topic::Sensor => Some(message),
                _ => None,
            })
            .unwrap();
        assert_eq!(reading.payload, "60");

        // 60 is not below 60: no command
        assert_eq!(controller.handle_reading(&reading.payload), None);
        assert!(rx.try_recv().is_err());

        device.process_event(DeviceEvent::Tick { step: 5 });
        assert_eq!(device.sensor_value, 65);
        assert!(device.pump_on);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mode_alternates() {
        let (controller, mut outbox) = controller();
        let (readings_tx, readings_rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(controller.run(
            readings_rx,
            Duration::from_secs(20),
            shutdown.clone(),
        ));

        assert_eq!(outbox.recv().await.unwrap(), Message::new(Topic::Mode, "Manual"));
        readings_tx
            .send(Message::new(Topic::Sensor, "42"))
            .await
            .unwrap();
        assert_eq!(outbox.recv().await.unwrap(), Message::new(Topic::Response, "on"));

        assert_eq!(
            outbox.recv().await.unwrap(),
            Message::new(Topic::Mode, "Automatic")
        );
        readings_tx
            .send(Message::new(Topic::Sensor, "42"))
            .await
            .unwrap();
        assert_eq!(outbox.recv().await.unwrap(), Message::new(Topic::Mode, "Manual"));

        shutdown.cancel();
        handle.await.unwrap();
    }
}
