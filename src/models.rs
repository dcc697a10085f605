use std::time::Duration;

use rand::Rng;

use crate::errors::MausError;
use crate::mqtt::{Message, Topic};

pub const SENSOR_MAX: u8 = 100;
pub const SENSOR_INITIAL: u8 = 50;

const THRESHOLD_LOW_MAX: u8 = SENSOR_MAX - 1;
const PERIOD_MIN_SECS: u64 = 1;
const PERIOD_MAX_SECS: u64 = 60;
const DEFAULT_PERIOD_SECS: u64 = 3;

// Inclusive ranges for a single sensor step
const RISE_STEP: (u8, u8) = (5, 25);
const FALL_STEP: (u8, u8) = (5, 10);

/// Operating mode of the device
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Manual,
    Automatic,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Manual => "Manual",
            Mode::Automatic => "Automatic",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Mode::Manual => Mode::Automatic,
            Mode::Automatic => Mode::Manual,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Only the exact wire tokens are accepted
impl std::str::FromStr for Mode {
    type Err = MausError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Manual" => Ok(Mode::Manual),
            "Automatic" => Ok(Mode::Automatic),
            _ => Err(MausError::new(format!("unknown mode {:?}", s))),
        }
    }
}

/// Pump actuation directive as it travels over the wire
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PumpCommand {
    On,
    Off,
}

impl PumpCommand {
    pub fn from_state(on: bool) -> Self {
        match on {
            true => PumpCommand::On,
            false => PumpCommand::Off,
        }
    }

    pub fn is_on(&self) -> bool {
        *self == PumpCommand::On
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PumpCommand::On => "on",
            PumpCommand::Off => "off",
        }
    }
}

impl std::str::FromStr for PumpCommand {
    type Err = MausError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on" => Ok(PumpCommand::On),
            "off" => Ok(PumpCommand::Off),
            _ => Err(MausError::new(format!("unknown pump command {:?}", s))),
        }
    }
}

/// Critical band used by the automatic pump logic
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Thresholds {
    pub low: u8,
    pub high: u8,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self { low: 30, high: 70 }
    }
}

impl Thresholds {
    /// Validate user input and repair the ordering if needed
    pub fn new(low: u8, high: u8) -> Result<Self, MausError> {
        if low > THRESHOLD_LOW_MAX {
            return Err(MausError::InvalidThreshold(format!(
                "low threshold {} above {}",
                low, THRESHOLD_LOW_MAX
            )));
        }
        if high > SENSOR_MAX {
            return Err(MausError::InvalidThreshold(format!(
                "high threshold {} above {}",
                high, SENSOR_MAX
            )));
        }
        Ok(Self { low, high }.repaired())
    }

    /// Clamp both bounds into the sensor range, then force `high = low + 1`
    /// whenever the band is empty or inverted
    pub fn repaired(self) -> Self {
        let low = self.low.min(THRESHOLD_LOW_MAX);
        let high = self.high.min(SENSOR_MAX);
        let repaired = if low < high {
            Self { low, high }
        } else {
            Self { low, high: low + 1 }
        };
        if repaired == self {
            return self;
        }
        log::debug!(
            "Repairing thresholds {}/{} -> {}/{}",
            self.low,
            self.high,
            repaired.low,
            repaired.high
        );
        repaired
    }

    /// Hysteresis: switch only outside the band, hold inside it
    pub fn pump_state(&self, value: u8, pump_on: bool) -> bool {
        if value < self.low {
            true
        } else if value > self.high {
            false
        } else {
            pump_on
        }
    }

    pub fn band(&self, value: u8) -> BandColor {
        if value < self.low {
            BandColor::Red
        } else if value > self.high {
            BandColor::Yellow
        } else {
            BandColor::Blue
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BandColor {
    Red,
    Blue,
    Yellow,
}

impl BandColor {
    pub fn tag(&self) -> &'static str {
        match self {
            BandColor::Red => "red",
            BandColor::Blue => "blue",
            BandColor::Yellow => "yellow",
        }
    }
}

/// Validate an update period given in whole seconds
pub fn update_period(secs: u64) -> Result<Duration, MausError> {
    if !(PERIOD_MIN_SECS..=PERIOD_MAX_SECS).contains(&secs) {
        return Err(MausError::InvalidPeriod(format!(
            "{} not in {}..={}",
            secs, PERIOD_MIN_SECS, PERIOD_MAX_SECS
        )));
    }
    Ok(Duration::from_secs(secs))
}

/// Things a local user can ask the device to do
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Intent {
    SelectMode(Mode),
    TogglePump,
    EditThresholds(Thresholds),
    EditPeriod(Duration),
}

/// What the device pushes to whatever renders it
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RenderEvent {
    Sensor(u8),
    PumpStatus(bool),
    BandColor(BandColor),
    Mode(Mode),
    ThresholdInputs { enabled: bool, thresholds: Thresholds },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// Periodic sensor update, `step` is the drawn magnitude
    Tick { step: u8 },
    Inbound(Message),
    Local(Intent),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Publish(Message),
    Render(RenderEvent),
}

/// Authoritative state of the simulated device
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DeviceState {
    pub mode: Mode,
    pub sensor_value: u8,
    pub pump_on: bool,
    /// Band applied by the last automatic tick
    pub thresholds: Thresholds,
    /// Band as currently entered, picked up on the next automatic tick
    pub threshold_input: Thresholds,
    pub update_period: Duration,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self::new(Thresholds::default(), Duration::from_secs(DEFAULT_PERIOD_SECS))
    }
}

impl DeviceState {
    pub fn new(thresholds: Thresholds, update_period: Duration) -> Self {
        Self {
            mode: Mode::Manual,
            sensor_value: SENSOR_INITIAL,
            pump_on: false,
            thresholds,
            threshold_input: thresholds,
            update_period,
        }
    }

    pub fn inputs_enabled(&self) -> bool {
        self.mode == Mode::Automatic
    }

    /// Draw the magnitude of the next sensor step for the current pump state
    pub fn draw_step<R: Rng>(&self, rng: &mut R) -> u8 {
        let (lo, hi) = match self.pump_on {
            true => RISE_STEP,
            false => FALL_STEP,
        };
        rng.gen_range(lo..=hi)
    }

    pub fn process_event(&mut self, event: DeviceEvent) -> Vec<Effect> {
        match event {
            DeviceEvent::Tick { step } => self.tick(step),
            DeviceEvent::Inbound(message) => self.receive(message),
            DeviceEvent::Local(intent) => self.command(intent),
        }
    }

    fn tick(&mut self, step: u8) -> Vec<Effect> {
        self.sensor_value = match self.pump_on {
            true => self.sensor_value.saturating_add(step).min(SENSOR_MAX),
            false => self.sensor_value.saturating_sub(step),
        };
        let mut effects = vec![Effect::Render(RenderEvent::Sensor(self.sensor_value))];

        if self.mode == Mode::Automatic {
            self.thresholds = self.threshold_input;
            self.pump_on = self.thresholds.pump_state(self.sensor_value, self.pump_on);
            effects.push(Effect::Render(RenderEvent::PumpStatus(self.pump_on)));
        }

        effects.push(Effect::Publish(Message::new(
            Topic::Sensor,
            self.sensor_value.to_string(),
        )));
        effects.push(Effect::Render(RenderEvent::BandColor(
            self.thresholds.band(self.sensor_value),
        )));
        effects
    }

    fn receive(&mut self, message: Message) -> Vec<Effect> {
        match message.topic {
            Topic::Response => {
                if self.mode != Mode::Manual {
                    log::debug!("Ignoring pump response {:?} in automatic mode", message.payload);
                    return vec![];
                }
                match message.payload.parse::<PumpCommand>() {
                    Ok(command) => {
                        self.pump_on = command.is_on();
                        vec![Effect::Render(RenderEvent::PumpStatus(self.pump_on))]
                    }
                    Err(e) => {
                        log::debug!("Dropping pump response: {}", e);
                        vec![]
                    }
                }
            }
            Topic::Mode => match message.payload.parse::<Mode>() {
                Ok(mode) => self.enter_mode(mode),
                Err(e) => {
                    log::debug!("Dropping mode broadcast: {}", e);
                    vec![]
                }
            },
            Topic::Sensor | Topic::Pump => {
                log::debug!("Device does not handle {:?} messages", message.topic);
                vec![]
            }
        }
    }

    fn command(&mut self, intent: Intent) -> Vec<Effect> {
        match intent {
            Intent::SelectMode(mode) => {
                let mut effects = self.enter_mode(mode);
                effects.push(Effect::Publish(Message::new(Topic::Mode, mode.as_str())));
                effects
            }
            Intent::TogglePump => {
                self.pump_on = !self.pump_on;
                vec![
                    Effect::Render(RenderEvent::PumpStatus(self.pump_on)),
                    Effect::Publish(Message::new(
                        Topic::Pump,
                        PumpCommand::from_state(self.pump_on).as_str(),
                    )),
                ]
            }
            Intent::EditThresholds(thresholds) => {
                if !self.inputs_enabled() {
                    log::debug!("Threshold inputs are disabled in {} mode", self.mode);
                    return vec![];
                }
                self.threshold_input = thresholds.repaired();
                vec![self.threshold_inputs()]
            }
            Intent::EditPeriod(period) => {
                self.update_period = period;
                vec![]
            }
        }
    }

    fn enter_mode(&mut self, mode: Mode) -> Vec<Effect> {
        if self.mode != mode {
            log::info!("Mode {} -> {}", self.mode, mode);
        }
        self.mode = mode;
        vec![Effect::Render(RenderEvent::Mode(mode)), self.threshold_inputs()]
    }

    fn threshold_inputs(&self) -> Effect {
        Effect::Render(RenderEvent::ThresholdInputs {
            enabled: self.inputs_enabled(),
            thresholds: self.threshold_input,
        })
    }
}
