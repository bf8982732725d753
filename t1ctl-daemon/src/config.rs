// Controller configuration: board presets, TOML file, and CLI overrides.
//
// Every option is optional at each layer. Layers are merged with
// `Settings::or`, highest precedence first (CLI, then file), then resolved
// against the board preset and the built-in defaults.

use std::time::Duration;

use clap::{Args, ValueEnum};
use serde::Deserialize;

use t1ctl::rigctl::{DEFAULT_ADDR, DEFAULT_RIG_MODEL, DEFAULT_SERIAL_PORT};
use t1ctl::tuner::SignalingVariant;
use t1ctl::{Error, LineSpec, Result};

/// Single-board computers with known T1 wiring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Board {
    /// Raspberry Pi: tune on 17, acknowledgment input on 27.
    Rpi,
    /// Armbian boards: tune on 17, acknowledgment input on 18.
    Armbian,
    /// Radxa Rock 4 SE: tune on 18, data output on 22, fixed delay.
    Rock4se,
}

/// How the tuner is synchronized before the band code is sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    /// Wait for the tuner's acknowledgment pulse on the data line.
    Handshake,
    /// Wait a fixed 60 ms; the data line is an output.
    FixedDelay,
}

/// Where the rig frequency comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    /// Run `rigctl` for each query.
    Rigctl,
    /// Query a running `rigctld`; restart it when it stops answering.
    Rigctld,
}

/// Wiring for one board.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoardPreset {
    pub chip: &'static str,
    pub tune_pin: u32,
    pub data_pin: u32,
    pub variant: Variant,
}

impl Board {
    pub fn preset(self) -> BoardPreset {
        match self {
            Board::Rpi => BoardPreset {
                chip: "gpiochip0",
                tune_pin: 17,
                data_pin: 27,
                variant: Variant::Handshake,
            },
            Board::Armbian => BoardPreset {
                chip: "gpiochip0",
                tune_pin: 17,
                data_pin: 18,
                variant: Variant::Handshake,
            },
            Board::Rock4se => BoardPreset {
                chip: "gpiochip4",
                tune_pin: 18,
                data_pin: 22,
                variant: Variant::FixedDelay,
            },
        }
    }
}

/// One configuration layer. Used both as CLI flags and as the TOML schema.
#[derive(Args, Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Board preset for chip, pins, and variant.
    #[arg(long, value_enum)]
    pub board: Option<Board>,

    /// GPIO chip name or path (e.g. gpiochip0).
    #[arg(long)]
    pub chip: Option<String>,

    /// Line offset of the tune output.
    #[arg(long)]
    pub tune_pin: Option<u32>,

    /// Line offset of the data line.
    #[arg(long)]
    pub data_pin: Option<u32>,

    /// Synchronization variant.
    #[arg(long, value_enum)]
    pub variant: Option<Variant>,

    /// Frequency source.
    #[arg(long, value_enum)]
    pub source: Option<Source>,

    /// Hamlib rig model number.
    #[arg(long)]
    pub rig_model: Option<String>,

    /// Serial device the rig is on.
    #[arg(long)]
    pub serial_port: Option<String>,

    /// rigctld address (host:port).
    #[arg(long)]
    pub rigctld_addr: Option<String>,

    /// Seconds between frequency polls.
    #[arg(long)]
    pub poll_interval_secs: Option<u64>,

    /// Handshake acknowledgment timeout in milliseconds.
    #[arg(long)]
    pub handshake_timeout_ms: Option<u64>,

    /// Unavailable readings in a row before rigctld is restarted.
    #[arg(long)]
    pub max_consecutive_failures: Option<u32>,

    /// Seconds to wait after killing rigctld and after relaunching it.
    #[arg(long, num_args = 2, value_names = ["KILL", "GRACE"])]
    pub restart_delay_secs: Option<Vec<u64>>,

    /// rigctld query attempts per poll.
    #[arg(long)]
    pub query_attempts: Option<u32>,

    /// Milliseconds between rigctld query attempts.
    #[arg(long)]
    pub query_retry_delay_ms: Option<u64>,

    /// Seconds before a single query attempt is abandoned.
    #[arg(long)]
    pub query_timeout_secs: Option<u64>,

    /// GPIO consumer label shown by gpioinfo.
    #[arg(long)]
    pub consumer: Option<String>,
}

impl Settings {
    /// Parse a TOML configuration file's contents.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::InvalidConfig(format!("config file: {e}")))
    }

    /// Fill every unset option from `lower`.
    pub fn or(self, lower: Settings) -> Settings {
        Settings {
            board: self.board.or(lower.board),
            chip: self.chip.or(lower.chip),
            tune_pin: self.tune_pin.or(lower.tune_pin),
            data_pin: self.data_pin.or(lower.data_pin),
            variant: self.variant.or(lower.variant),
            source: self.source.or(lower.source),
            rig_model: self.rig_model.or(lower.rig_model),
            serial_port: self.serial_port.or(lower.serial_port),
            rigctld_addr: self.rigctld_addr.or(lower.rigctld_addr),
            poll_interval_secs: self.poll_interval_secs.or(lower.poll_interval_secs),
            handshake_timeout_ms: self.handshake_timeout_ms.or(lower.handshake_timeout_ms),
            max_consecutive_failures: self
                .max_consecutive_failures
                .or(lower.max_consecutive_failures),
            restart_delay_secs: self.restart_delay_secs.or(lower.restart_delay_secs),
            query_attempts: self.query_attempts.or(lower.query_attempts),
            query_retry_delay_ms: self.query_retry_delay_ms.or(lower.query_retry_delay_ms),
            query_timeout_secs: self.query_timeout_secs.or(lower.query_timeout_secs),
            consumer: self.consumer.or(lower.consumer),
        }
    }

    /// Apply the board preset and defaults.
    pub fn resolve(self) -> Result<ControllerConfig> {
        let board = self.board.unwrap_or(Board::Armbian);
        let preset = board.preset();

        let (kill_settle, startup_grace) = match self.restart_delay_secs.as_deref() {
            None => (1, 2),
            Some(&[kill, grace]) => (kill, grace),
            Some(other) => {
                return Err(Error::InvalidConfig(format!(
                    "restart_delay_secs needs exactly two values, got {}",
                    other.len()
                )));
            }
        };

        Ok(ControllerConfig {
            board,
            chip: self.chip.unwrap_or_else(|| preset.chip.to_string()),
            tune_pin: self.tune_pin.unwrap_or(preset.tune_pin),
            data_pin: self.data_pin.unwrap_or(preset.data_pin),
            variant: self.variant.unwrap_or(preset.variant),
            source: self.source.unwrap_or(Source::Rigctl),
            rig_model: self
                .rig_model
                .unwrap_or_else(|| DEFAULT_RIG_MODEL.to_string()),
            serial_port: self
                .serial_port
                .unwrap_or_else(|| DEFAULT_SERIAL_PORT.to_string()),
            rigctld_addr: self.rigctld_addr.unwrap_or_else(|| DEFAULT_ADDR.to_string()),
            poll_interval: Duration::from_secs(self.poll_interval_secs.unwrap_or(5)),
            handshake_timeout: Duration::from_millis(self.handshake_timeout_ms.unwrap_or(2000)),
            max_consecutive_failures: self.max_consecutive_failures.unwrap_or(10),
            kill_settle: Duration::from_secs(kill_settle),
            startup_grace: Duration::from_secs(startup_grace),
            query_attempts: self.query_attempts.unwrap_or(3),
            query_retry_delay: Duration::from_millis(self.query_retry_delay_ms.unwrap_or(1000)),
            query_timeout: Duration::from_secs(self.query_timeout_secs.unwrap_or(10)),
            consumer: self
                .consumer
                .unwrap_or_else(|| t1ctl::gpio::DEFAULT_CONSUMER.to_string()),
        })
    }
}

/// Fully resolved controller configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControllerConfig {
    pub board: Board,
    pub chip: String,
    pub tune_pin: u32,
    pub data_pin: u32,
    pub variant: Variant,
    pub source: Source,
    pub rig_model: String,
    pub serial_port: String,
    pub rigctld_addr: String,
    pub poll_interval: Duration,
    pub handshake_timeout: Duration,
    pub max_consecutive_failures: u32,
    pub kill_settle: Duration,
    pub startup_grace: Duration,
    pub query_attempts: u32,
    pub query_retry_delay: Duration,
    pub query_timeout: Duration,
    pub consumer: String,
}

impl ControllerConfig {
    /// Reject inconsistent settings before any hardware is touched.
    pub fn validate(&self) -> Result<()> {
        if self.tune_pin == self.data_pin {
            return Err(Error::InvalidConfig(format!(
                "tune and data must be different lines (both {})",
                self.tune_pin
            )));
        }
        if self.chip.trim().is_empty() {
            return Err(Error::InvalidConfig("chip must not be empty".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::InvalidConfig("poll interval must be positive".into()));
        }
        if self.variant == Variant::Handshake && self.handshake_timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "handshake timeout must be positive".into(),
            ));
        }
        if self.max_consecutive_failures == 0 {
            return Err(Error::InvalidConfig(
                "max_consecutive_failures must be positive".into(),
            ));
        }
        if self.query_attempts == 0 {
            return Err(Error::InvalidConfig("query_attempts must be positive".into()));
        }
        if self.query_timeout.is_zero() {
            return Err(Error::InvalidConfig("query timeout must be positive".into()));
        }
        if self.source == Source::Rigctld {
            self.rigctld_port()?;
        }
        Ok(())
    }

    /// The tune line.
    pub fn tune_line(&self) -> LineSpec {
        LineSpec::output(&self.chip, self.tune_pin)
    }

    /// The data line, an input for the handshake variant and an output for
    /// the fixed-delay variant.
    pub fn data_line(&self) -> LineSpec {
        match self.variant {
            Variant::Handshake => LineSpec::input(&self.chip, self.data_pin),
            Variant::FixedDelay => LineSpec::output(&self.chip, self.data_pin),
        }
    }

    pub fn signaling_variant(&self) -> SignalingVariant {
        match self.variant {
            Variant::Handshake => SignalingVariant::Handshake {
                timeout: self.handshake_timeout,
            },
            Variant::FixedDelay => SignalingVariant::FixedDelay,
        }
    }

    /// TCP port of `rigctld_addr`, passed to a relaunched daemon.
    pub fn rigctld_port(&self) -> Result<u16> {
        self.rigctld_addr
            .rsplit_once(':')
            .and_then(|(_, port)| port.parse().ok())
            .ok_or_else(|| {
                Error::InvalidConfig(format!(
                    "rigctld_addr {:?} is not host:port",
                    self.rigctld_addr
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(settings: Settings) -> ControllerConfig {
        settings.resolve().unwrap()
    }

    #[test]
    fn defaults_use_armbian_preset() {
        let config = resolve(Settings::default());
        assert_eq!(config.board, Board::Armbian);
        assert_eq!(config.chip, "gpiochip0");
        assert_eq!((config.tune_pin, config.data_pin), (17, 18));
        assert_eq!(config.variant, Variant::Handshake);
        assert_eq!(config.source, Source::Rigctl);
        assert_eq!(config.rig_model, "2002");
        assert_eq!(config.serial_port, "/dev/ttyACM0");
        assert_eq!(config.rigctld_addr, "127.0.0.1:4532");
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.handshake_timeout, Duration::from_millis(2000));
        assert_eq!(config.max_consecutive_failures, 10);
        assert_eq!(config.kill_settle, Duration::from_secs(1));
        assert_eq!(config.startup_grace, Duration::from_secs(2));
        assert_eq!(config.query_attempts, 3);
        assert_eq!(config.query_retry_delay, Duration::from_millis(1000));
        assert_eq!(config.query_timeout, Duration::from_secs(10));
        config.validate().unwrap();
    }

    #[test]
    fn board_presets() {
        let rpi = Board::Rpi.preset();
        assert_eq!((rpi.chip, rpi.tune_pin, rpi.data_pin), ("gpiochip0", 17, 27));
        assert_eq!(rpi.variant, Variant::Handshake);

        let rock = resolve(Settings {
            board: Some(Board::Rock4se),
            ..Default::default()
        });
        assert_eq!(rock.chip, "gpiochip4");
        assert_eq!((rock.tune_pin, rock.data_pin), (18, 22));
        assert_eq!(rock.variant, Variant::FixedDelay);
        assert_eq!(rock.signaling_variant(), SignalingVariant::FixedDelay);
        assert_eq!(rock.data_line(), LineSpec::output("gpiochip4", 22));
    }

    #[test]
    fn cli_beats_file_beats_preset() {
        let file = Settings::from_toml(
            r#"
            board = "rpi"
            tune_pin = 5
            data_pin = 6
            source = "rigctld"
            poll_interval_secs = 3
            "#,
        )
        .unwrap();
        let cli = Settings {
            data_pin: Some(7),
            poll_interval_secs: Some(1),
            ..Default::default()
        };

        let config = resolve(cli.or(file));
        assert_eq!(config.board, Board::Rpi);
        assert_eq!(config.tune_pin, 5);
        assert_eq!(config.data_pin, 7);
        assert_eq!(config.source, Source::Rigctld);
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        // Unset everywhere: from the preset.
        assert_eq!(config.chip, "gpiochip0");
        assert_eq!(config.data_line(), LineSpec::input("gpiochip0", 7));
    }

    #[test]
    fn toml_enum_spellings() {
        let settings = Settings::from_toml(
            r#"
            board = "rock4se"
            variant = "handshake"
            restart_delay_secs = [3, 4]
            "#,
        )
        .unwrap();
        let config = resolve(settings);
        assert_eq!(config.variant, Variant::Handshake);
        assert_eq!(config.kill_settle, Duration::from_secs(3));
        assert_eq!(config.startup_grace, Duration::from_secs(4));
        assert_eq!(
            config.signaling_variant(),
            SignalingVariant::Handshake {
                timeout: Duration::from_millis(2000)
            }
        );
    }

    #[test]
    fn toml_rejects_unknown_keys() {
        assert!(matches!(
            Settings::from_toml("tune_pins = 4"),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            Settings::from_toml(r#"board = "pi5""#),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn restart_delay_needs_two_values() {
        let result = Settings {
            restart_delay_secs: Some(vec![1]),
            ..Default::default()
        }
        .resolve();
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let base = resolve(Settings::default());

        let same_pin = ControllerConfig {
            data_pin: base.tune_pin,
            ..base.clone()
        };
        assert!(same_pin.validate().is_err());

        let zero_poll = ControllerConfig {
            poll_interval: Duration::ZERO,
            ..base.clone()
        };
        assert!(zero_poll.validate().is_err());

        let zero_handshake = ControllerConfig {
            handshake_timeout: Duration::ZERO,
            ..base.clone()
        };
        assert!(zero_handshake.validate().is_err());

        let zero_threshold = ControllerConfig {
            max_consecutive_failures: 0,
            ..base.clone()
        };
        assert!(zero_threshold.validate().is_err());

        let bad_addr = ControllerConfig {
            source: Source::Rigctld,
            rigctld_addr: "localhost".into(),
            ..base.clone()
        };
        assert!(bad_addr.validate().is_err());
    }

    #[test]
    fn rigctld_port_parsed_from_addr() {
        let config = ControllerConfig {
            rigctld_addr: "10.0.0.2:4600".into(),
            ..resolve(Settings::default())
        };
        assert_eq!(config.rigctld_port().unwrap(), 4600);
    }
}
