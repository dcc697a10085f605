/// console turns lines typed on stdin into device intents
use std::io::BufRead;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::errors::MausError;
use crate::models::{self, DeviceState, Intent, Mode, PumpCommand, Thresholds};

const HELP: &str =
    "commands: mode manual|automatic, pump, thresholds <low> <high>, period <secs>, status, quit";

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Intent(Intent),
    Status,
    Help,
    Quit,
}

/// One line summary of a device snapshot
pub fn status_line(state: &DeviceState) -> String {
    format!(
        "mode {}, sensor {}, pump {}, thresholds {}/{}, period {}s",
        state.mode,
        state.sensor_value,
        PumpCommand::from_state(state.pump_on).as_str(),
        state.thresholds.low,
        state.thresholds.high,
        state.update_period.as_secs()
    )
}

fn parse_threshold(value: &str) -> Result<u8, MausError> {
    value
        .parse::<u8>()
        .map_err(|_| MausError::InvalidThreshold(value.to_string()))
}

/// Parse a single console line; invalid input never reaches the device
pub fn parse_command(line: &str) -> Result<Command, MausError> {
    let words: Vec<&str> = line.split_whitespace().collect();
    match words.as_slice() {
        ["help"] | ["?"] => Ok(Command::Help),
        ["status"] => Ok(Command::Status),
        ["quit"] | ["exit"] => Ok(Command::Quit),
        ["pump"] => Ok(Command::Intent(Intent::TogglePump)),
        ["mode", mode] => match mode.to_lowercase().as_str() {
            "manual" => Ok(Command::Intent(Intent::SelectMode(Mode::Manual))),
            "automatic" | "auto" => Ok(Command::Intent(Intent::SelectMode(Mode::Automatic))),
            _ => Err(MausError::UnknownCommand(line.to_string())),
        },
        ["thresholds", low, high] => {
            let thresholds = Thresholds::new(parse_threshold(low)?, parse_threshold(high)?)?;
            Ok(Command::Intent(Intent::EditThresholds(thresholds)))
        }
        ["period", secs] => {
            let secs = secs
                .parse::<u64>()
                .map_err(|_| MausError::InvalidPeriod(secs.to_string()))?;
            Ok(Command::Intent(Intent::EditPeriod(models::update_period(secs)?)))
        }
        _ => Err(MausError::UnknownCommand(line.to_string())),
    }
}

/// Read stdin on its own thread; stdin reads cannot be cancelled, so the thread is never joined
pub fn spawn_reader(
    tx: mpsc::Sender<Intent>,
    snapshots: watch::Receiver<DeviceState>,
    shutdown: CancellationToken,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        log::info!("{}", HELP);
        for line in std::io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    log::warn!("Could not read from stdin: {}", e);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match parse_command(&line) {
                Ok(Command::Intent(intent)) => {
                    if tx.blocking_send(intent).is_err() {
                        break;
                    }
                }
                Ok(Command::Status) => log::info!("{}", status_line(&snapshots.borrow())),
                Ok(Command::Help) => log::info!("{}", HELP),
                Ok(Command::Quit) => {
                    shutdown.cancel();
                    break;
                }
                Err(e) => log::warn!("{}", e),
            }
        }
        log::debug!("Console reader stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse_command("pump").unwrap(),
            Command::Intent(Intent::TogglePump)
        );
        assert_eq!(
            parse_command("mode Automatic").unwrap(),
            Command::Intent(Intent::SelectMode(Mode::Automatic))
        );
        assert_eq!(
            parse_command("  mode   manual ").unwrap(),
            Command::Intent(Intent::SelectMode(Mode::Manual))
        );
        assert_eq!(
            parse_command("period 5").unwrap(),
            Command::Intent(Intent::EditPeriod(Duration::from_secs(5)))
        );
        assert_eq!(parse_command("quit").unwrap(), Command::Quit);
        assert_eq!(parse_command("?").unwrap(), Command::Help);
        assert_eq!(parse_command("status").unwrap(), Command::Status);
    }

    #[test]
    fn test_status_line() {
        assert_eq!(
            status_line(&DeviceState::default()),
            "mode Manual, sensor 50, pump off, thresholds 30/70, period 3s"
        );
    }

    #[test]
    fn test_thresholds_are_repaired_at_input() {
        assert_eq!(
            parse_command("thresholds 80 50").unwrap(),
            Command::Intent(Intent::EditThresholds(Thresholds { low: 80, high: 81 }))
        );
    }

    #[test]
    fn test_invalid_input_is_rejected() {
        assert!(matches!(
            parse_command("thresholds abc 50"),
            Err(MausError::InvalidThreshold(_))
        ));
        assert!(matches!(
            parse_command("thresholds -1 50"),
            Err(MausError::InvalidThreshold(_))
        ));
        assert!(matches!(
            parse_command("thresholds 10 300"),
            Err(MausError::InvalidThreshold(_))
        ));
        assert!(matches!(
            parse_command("period 0"),
            Err(MausError::InvalidPeriod(_))
        ));
        assert!(matches!(
            parse_command("period soon"),
            Err(MausError::InvalidPeriod(_))
        ));
        assert!(matches!(
            parse_command("mode sideways"),
            Err(MausError::UnknownCommand(_))
        ));
        assert!(matches!(
            parse_command("dance"),
            Err(MausError::UnknownCommand(_))
        ));
    }
}
