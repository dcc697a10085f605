/// dummy is just a module to output the device render events by logging them.
use tokio::sync::mpsc;

use crate::models::RenderEvent;

pub fn describe(event: &RenderEvent) -> String {
    match event {
        RenderEvent::Sensor(value) => format!("sensor {}%", value),
        RenderEvent::PumpStatus(true) => "pump on".to_string(),
        RenderEvent::PumpStatus(false) => "pump off".to_string(),
        RenderEvent::BandColor(color) => format!("band {}", color.tag()),
        RenderEvent::Mode(mode) => format!("mode {}", mode),
        RenderEvent::ThresholdInputs {
            enabled,
            thresholds,
        } => format!(
            "thresholds {}/{} ({})",
            thresholds.low,
            thresholds.high,
            match enabled {
                true => "editable",
                false => "locked",
            }
        ),
    }
}

/// write_events is just a dummy receiver writing output
pub async fn write_events(mut rx: mpsc::Receiver<RenderEvent>) {
    while let Some(event) = rx.recv().await {
        log::info!("{}", describe(&event));
    }
}
