use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use tracing::{info, warn};

use crate::drag::DragConfig;
use crate::notify::DEFAULT_DEBOUNCE;
use crate::placement::PlacementConfig;
use crate::session::EngineConfig;
use crate::snap::DEFAULT_SNAP_THRESHOLD;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub engine: EngineSettings,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            engine: EngineSettings::from_env(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;
    const HOST_VAR: &'static str = "LOAD_PLANNER_API_HOST";
    const PORT_VAR: &'static str = "LOAD_PLANNER_API_PORT";

    fn from_env() -> Self {
        let host_value =
            env_string(Self::HOST_VAR).unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, display_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                warn!(
                    "⚠️ Could not parse {} ('{}'): {}. Using {}.",
                    Self::HOST_VAR,
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (
                    IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = match env_string(Self::PORT_VAR) {
            Some(raw) => parse_port(&raw),
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }
}

fn parse_port(raw: &str) -> u16 {
    match raw.parse::<u16>() {
        Ok(value) if value != 0 => value,
        Ok(_) => {
            warn!(
                "⚠️ {} must not be 0. Using {}.",
                ApiConfig::PORT_VAR,
                ApiConfig::DEFAULT_PORT
            );
            ApiConfig::DEFAULT_PORT
        }
        Err(err) => {
            warn!(
                "⚠️ Could not parse {} ('{}'): {}. Using {}.",
                ApiConfig::PORT_VAR,
                raw,
                err,
                ApiConfig::DEFAULT_PORT
            );
            ApiConfig::DEFAULT_PORT
        }
    }
}

/// Tuning for the interaction engine.
#[derive(Clone, Debug)]
pub struct EngineSettings {
    engine: EngineConfig,
}

impl EngineSettings {
    const GRID_STRIDE_VAR: &'static str = "LOAD_PLANNER_GRID_STRIDE";
    const SNAP_THRESHOLD_VAR: &'static str = "LOAD_PLANNER_SNAP_THRESHOLD";
    const SMOOTHING_VAR: &'static str = "LOAD_PLANNER_DRAG_SMOOTHING";
    const WARNING_MS_VAR: &'static str = "LOAD_PLANNER_WARNING_MS";
    const DEBOUNCE_MS_VAR: &'static str = "LOAD_PLANNER_DEBOUNCE_MS";
    const TICK_MS_VAR: &'static str = "LOAD_PLANNER_TICK_MS";
    const ALLOW_ROTATION_VAR: &'static str = "LOAD_PLANNER_ALLOW_ROTATED_RESTORE";

    fn from_env() -> Self {
        let grid_stride = load_f64_with_warning(
            Self::GRID_STRIDE_VAR,
            PlacementConfig::DEFAULT_GRID_STRIDE,
            |value| value > 0.0,
            "must be greater than 0",
            "Adjusted grid stride changes where restored packages land",
        );

        let snap_threshold = load_f64_with_warning(
            Self::SNAP_THRESHOLD_VAR,
            DEFAULT_SNAP_THRESHOLD,
            |value| value >= 0.0,
            "must not be negative",
            "Adjusted snap threshold changes drag behaviour",
        );

        let smoothing = load_f64_with_warning(
            Self::SMOOTHING_VAR,
            DragConfig::DEFAULT_SMOOTHING,
            |value| value > 0.0 && value <= 1.0,
            "must be in (0, 1]",
            "Adjusted drag smoothing",
        );

        let warning_duration = load_millis(
            Self::WARNING_MS_VAR,
            DragConfig::DEFAULT_WARNING_DURATION,
        );
        let debounce = load_millis(Self::DEBOUNCE_MS_VAR, DEFAULT_DEBOUNCE);
        let tick_interval = load_millis(Self::TICK_MS_VAR, DragConfig::DEFAULT_TICK_INTERVAL);

        let allow_rotation = env_string(Self::ALLOW_ROTATION_VAR)
            .and_then(|raw| parse_bool(&raw, Self::ALLOW_ROTATION_VAR))
            .unwrap_or(PlacementConfig::DEFAULT_ALLOW_ROTATION);

        let placement = PlacementConfig::builder()
            .grid_stride(grid_stride)
            .allow_rotation(allow_rotation)
            .build();

        Self {
            engine: EngineConfig {
                placement,
                drag: DragConfig {
                    snap_threshold,
                    smoothing,
                    tick_interval,
                    warning_duration,
                },
                debounce,
            },
        }
    }

    /// Returns the configured EngineConfig.
    pub fn engine_config(&self) -> EngineConfig {
        self.engine
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!("⚠️ Access to {} failed: {}. Using default value.", name, err);
            None
        }
    }
}

fn parse_bool(raw: &str, var_name: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        other => {
            warn!(
                "⚠️ Could not interpret {} ('{}') as boolean value. Using default value.",
                var_name, other
            );
            None
        }
    }
}

fn load_f64_with_warning(
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    notice: &str,
) -> f64 {
    match env_string(var_name) {
        Some(raw) => parse_f64_setting(var_name, &raw, default, validator, invalid_hint, notice),
        None => default,
    }
}

fn parse_f64_setting(
    var_name: &str,
    raw: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    notice: &str,
) -> f64 {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && validator(value) => {
            let tolerance = (default.abs().max(1.0)) * 1e-9;
            if (value - default).abs() > tolerance {
                info!("⚠️ {} ({} = {}).", notice, var_name, value);
            }
            value
        }
        Ok(_) => {
            warn!(
                "⚠️ {} contains invalid value '{}': {}. Using {}.",
                var_name, raw, invalid_hint, default
            );
            default
        }
        Err(err) => {
            warn!(
                "⚠️ Could not parse {} ('{}') as number: {}. Using {}.",
                var_name, raw, err, default
            );
            default
        }
    }
}

fn load_millis(var_name: &str, default: Duration) -> Duration {
    match env_string(var_name) {
        Some(raw) => parse_millis(var_name, &raw, default),
        None => default,
    }
}

fn parse_millis(var_name: &str, raw: &str, default: Duration) -> Duration {
    match raw.parse::<u64>() {
        Ok(value) => Duration::from_millis(value),
        Err(err) => {
            warn!(
                "⚠️ Could not parse {} ('{}') as milliseconds: {}. Using {} ms.",
                var_name,
                raw,
                err,
                default.as_millis()
            );
            default
        }
    }
}
