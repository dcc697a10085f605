use clap::{Parser, Subcommand};

use pumpmaus::config::Settings;
use pumpmaus::errors::MausError;
use pumpmaus::maus::Role;

/// Simulated pump device and its controller, talking over MQTT
#[derive(Parser, Debug)]
#[command(name = "pumpmaus", version)]
struct Cli {
    /// TOML settings file
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// MQTT broker host
    #[arg(long)]
    mqtt_host: Option<String>,

    /// MQTT broker port
    #[arg(long)]
    mqtt_port: Option<u16>,

    /// MQTT client id, derived from role and hostname if left out
    #[arg(long)]
    mqtt_client_id: Option<String>,

    /// Device name, used as topic namespace
    #[arg(long)]
    device_name: Option<String>,

    /// Debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    role: RoleCommand,
}

#[derive(Subcommand, Debug)]
enum RoleCommand {
    /// Run the simulated sensor + pump
    Device {
        /// Sensor update period in seconds
        #[arg(long)]
        period: Option<u64>,
    },
    /// Run the controller steering the device
    Controller {
        /// Seconds between mode switches
        #[arg(long)]
        switch_period: Option<u64>,
    },
}

/// Defaults < file < command line
fn settings(cli: &Cli) -> Result<Settings, MausError> {
    let mut settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };
    if let Some(host) = &cli.mqtt_host {
        settings.mqtt.host = host.clone();
    }
    if let Some(port) = cli.mqtt_port {
        settings.mqtt.port = port;
    }
    if let Some(client_id) = &cli.mqtt_client_id {
        settings.mqtt.client_id = Some(client_id.clone());
    }
    if let Some(name) = &cli.device_name {
        settings.device.name = name.clone();
    }
    match cli.role {
        RoleCommand::Device { period: Some(period) } => {
            settings.device.update_period_secs = period;
        }
        RoleCommand::Controller {
            switch_period: Some(switch_period),
        } => {
            settings.controller.mode_switch_secs = switch_period;
        }
        _ => {}
    }
    Ok(settings)
}

/// START
fn main() {
    let cli = Cli::parse();
    let role = match cli.role {
        RoleCommand::Device { .. } => Role::Device,
        RoleCommand::Controller { .. } => Role::Controller,
    };

    let result = settings(&cli).and_then(|settings| pumpmaus::maus::run(role, settings, cli.debug));
    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
