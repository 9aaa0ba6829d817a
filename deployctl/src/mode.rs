//! Deployment modes and orchestration request resolution.
//!
//! `resolve` is a pure mapping from a requested mode plus optional port
//! overrides to the concrete compose invocation: which overlay file to use
//! and which environment variables to hand the engine. All port validation
//! happens here or earlier (at argument parsing), never at subprocess time.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// Compose overlay selected in development mode
pub const DEV_COMPOSE_FILE: &str = "docker-compose.dev.yml";
/// Compose overlay selected in production mode
pub const PROD_COMPOSE_FILE: &str = "docker-compose.prod.yml";

/// Errors constructing an orchestration request
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("invalid port '{value}': expected an integer in 1-65535")]
    InvalidPort { value: String },
}

/// Which configuration overlay the stack is brought up with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DeployMode {
    /// Development overlay; port overrides are ignored
    Dev,
    /// Production overlay; port overrides are honored
    Prod,
}

impl DeployMode {
    pub fn compose_file(&self) -> &'static str {
        match self {
            DeployMode::Dev => DEV_COMPOSE_FILE,
            DeployMode::Prod => PROD_COMPOSE_FILE,
        }
    }
}

impl fmt::Display for DeployMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployMode::Dev => write!(f, "dev"),
            DeployMode::Prod => write!(f, "prod"),
        }
    }
}

/// Sub-services whose external port can be overridden per invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Service {
    Api,
    Ui,
}

impl Service {
    /// Environment variable the engine reads for this service's port
    pub fn env_var(&self) -> &'static str {
        match self {
            Service::Api => "EDUAGENT_API_PORT",
            Service::Ui => "EDUAGENT_UI_PORT",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::Api => write!(f, "api"),
            Service::Ui => write!(f, "ui"),
        }
    }
}

/// A validated external-facing port in 1-65535.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PortOverride(u16);

impl PortOverride {
    pub fn new(port: u16) -> Result<Self, RequestError> {
        if port == 0 {
            return Err(RequestError::InvalidPort {
                value: port.to_string(),
            });
        }
        Ok(Self(port))
    }

    pub fn get(&self) -> u16 {
        self.0
    }
}

impl FromStr for PortOverride {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // u16 parsing already rejects non-numeric input and anything > 65535
        let port: u16 = s.parse().map_err(|_| RequestError::InvalidPort {
            value: s.to_string(),
        })?;
        Self::new(port)
    }
}

impl fmt::Display for PortOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The resolved, validated unit of orchestration work.
///
/// Built once per invocation and immutable afterwards. `env` rides only on
/// the spawned engine processes, never on the deployctl environment.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestrationRequest {
    pub mode: DeployMode,
    /// Ordered configuration-file references handed to the engine
    pub compose_files: Vec<String>,
    /// Environment variables exported for the engine invocations
    pub env: BTreeMap<String, String>,
}

impl OrchestrationRequest {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Resolve a mode and its overrides into a concrete orchestration request.
///
/// Overrides are accepted in both modes but only applied in production;
/// in development each supplied override is ignored with a warning.
pub fn resolve(
    mode: DeployMode,
    overrides: &BTreeMap<Service, PortOverride>,
) -> OrchestrationRequest {
    let mut env = BTreeMap::new();
    match mode {
        DeployMode::Dev => {
            for (service, port) in overrides {
                warn!(
                    "ignoring {} port override {} (overrides only apply in production)",
                    service, port
                );
            }
        }
        DeployMode::Prod => {
            for (service, port) in overrides {
                env.insert(service.env_var().to_string(), port.to_string());
            }
        }
    }

    OrchestrationRequest {
        mode,
        compose_files: vec![mode.compose_file().to_string()],
        env,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_boundaries() {
        assert!("0".parse::<PortOverride>().is_err());
        assert!("65536".parse::<PortOverride>().is_err());
        assert!("abc".parse::<PortOverride>().is_err());
        assert_eq!("1".parse::<PortOverride>().unwrap().get(), 1);
        assert_eq!("65535".parse::<PortOverride>().unwrap().get(), 65535);
    }

    #[test]
    fn test_port_error_display() {
        let err = "abc".parse::<PortOverride>().unwrap_err();
        assert!(err.to_string().contains("abc"));
        assert!(err.to_string().contains("1-65535"));
    }

    #[test]
    fn test_dev_selects_dev_overlay_and_ignores_overrides() {
        let mut overrides = BTreeMap::new();
        overrides.insert(Service::Api, PortOverride::new(9000).unwrap());

        let request = resolve(DeployMode::Dev, &overrides);

        assert_eq!(request.compose_files, vec![DEV_COMPOSE_FILE.to_string()]);
        assert!(request.env.is_empty());
    }

    #[test]
    fn test_prod_maps_overrides_to_namespaced_env() {
        let mut overrides = BTreeMap::new();
        overrides.insert(Service::Api, PortOverride::new(9000).unwrap());

        let request = resolve(DeployMode::Prod, &overrides);

        assert_eq!(request.compose_files, vec![PROD_COMPOSE_FILE.to_string()]);
        assert_eq!(
            request.env.get("EDUAGENT_API_PORT"),
            Some(&"9000".to_string())
        );
        assert_eq!(request.env.len(), 1);
    }

    #[test]
    fn test_prod_without_overrides_has_empty_env() {
        let request = resolve(DeployMode::Prod, &BTreeMap::new());
        assert!(request.env.is_empty());
    }

    #[test]
    fn test_service_env_var_names() {
        assert_eq!(Service::Api.env_var(), "EDUAGENT_API_PORT");
        assert_eq!(Service::Ui.env_var(), "EDUAGENT_UI_PORT");
    }

    #[test]
    fn test_request_serializes_to_json() {
        let mut overrides = BTreeMap::new();
        overrides.insert(Service::Ui, PortOverride::new(8080).unwrap());

        let json = resolve(DeployMode::Prod, &overrides).to_json().unwrap();

        assert!(json.contains("\"prod\""));
        assert!(json.contains("docker-compose.prod.yml"));
        assert!(json.contains("\"EDUAGENT_UI_PORT\": \"8080\""));
    }
}
