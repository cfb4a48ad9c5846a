/***************************************/
/*        3rd party libraries          */
/***************************************/
use anyhow::{bail, Context};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/***************************************/
/*       Public data structures        */
/***************************************/
#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub elevator: ElevatorConfig,
    pub hardware: HardwareConfig,
    pub network: NetworkConfig,
}

/// Durations are given in milliseconds.
#[derive(Deserialize, Clone, Debug)]
pub struct ElevatorConfig {
    pub n_floors: u8,
    pub door_open_time: u64,
    pub claim_timeout: u64,
    pub accepted_claim_timeout: u64,
    pub calibration_timeout: u64,
}

#[derive(Deserialize, Clone, Debug)]
pub struct HardwareConfig {
    pub driver_address: String,
    pub poll_period: u64,
}

#[derive(Deserialize, Clone, Debug)]
pub struct NetworkConfig {
    pub msg_port: u16,
    pub peer_port: u16,
}

impl ElevatorConfig {
    pub fn door_open_time(&self) -> Duration {
        Duration::from_millis(self.door_open_time)
    }

    pub fn claim_timeout(&self) -> Duration {
        Duration::from_millis(self.claim_timeout)
    }

    pub fn accepted_claim_timeout(&self) -> Duration {
        Duration::from_millis(self.accepted_claim_timeout)
    }

    pub fn calibration_timeout(&self) -> Duration {
        Duration::from_millis(self.calibration_timeout)
    }
}

impl HardwareConfig {
    pub fn poll_period(&self) -> Duration {
        Duration::from_millis(self.poll_period)
    }
}

/***************************************/
/*             Public API              */
/***************************************/
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
    parse_config(&config_str)
        .with_context(|| format!("Invalid configuration file {}", path.display()))
}

pub fn parse_config(config_str: &str) -> anyhow::Result<Config> {
    let config: Config = toml::from_str(config_str).context("Failed to parse configuration")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> anyhow::Result<()> {
    let elevator = &config.elevator;
    if elevator.n_floors < 2 {
        bail!("n_floors must be at least 2, got {}", elevator.n_floors);
    }

    let durations = [
        ("door_open_time", elevator.door_open_time),
        ("claim_timeout", elevator.claim_timeout),
        ("accepted_claim_timeout", elevator.accepted_claim_timeout),
        ("calibration_timeout", elevator.calibration_timeout),
        ("poll_period", config.hardware.poll_period),
    ];
    for (name, value) in durations {
        if value == 0 {
            bail!("{} must be greater than zero", name);
        }
    }

    Ok(())
}

/***************************************/
/*             Unit tests              */
/***************************************/
