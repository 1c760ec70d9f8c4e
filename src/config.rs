//! Operator configuration from environment variables

use std::time::Duration;

use crate::cloud::gke::DEFAULT_ENDPOINT;
use crate::error::{Error, Result};
use crate::reconcilers::gke_cluster::DEFAULT_POLL_INTERVAL;

/// Default metrics port
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Runtime configuration of the operator
#[derive(Clone, Debug)]
pub struct OperatorConfig {
    /// GCP project that owns the clusters
    pub project: String,
    /// OAuth bearer token for the Container Engine API
    pub access_token: String,
    /// Container Engine API endpoint
    pub api_endpoint: String,
    /// Port for the metrics/health server
    pub metrics_port: u16,
    /// Interval between cluster status checks while provisioning
    pub poll_interval: Duration,
}

impl OperatorConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| Error::config(format!("{} must be set", key)))
        };

        let metrics_port = match lookup("METRICS_PORT") {
            Some(v) => v
                .parse()
                .map_err(|e| Error::config(format!("Invalid METRICS_PORT '{}': {}", v, e)))?,
            None => DEFAULT_METRICS_PORT,
        };

        let poll_interval = match lookup("CLUSTER_POLL_INTERVAL_SECS") {
            Some(v) => {
                let secs: u64 = v.parse().map_err(|e| {
                    Error::config(format!("Invalid CLUSTER_POLL_INTERVAL_SECS '{}': {}", v, e))
                })?;
                if secs == 0 {
                    return Err(Error::config("CLUSTER_POLL_INTERVAL_SECS must be at least 1"));
                }
                Duration::from_secs(secs)
            }
            None => DEFAULT_POLL_INTERVAL,
        };

        Ok(Self {
            project: required("GCP_PROJECT")?,
            access_token: required("GCP_ACCESS_TOKEN")?,
            api_endpoint: lookup("GKE_API_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            metrics_port,
            poll_interval,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<OperatorConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        OperatorConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_optional_vars_missing() {
        let config = load(&[("GCP_PROJECT", "proj"), ("GCP_ACCESS_TOKEN", "tok")]).unwrap();

        assert_eq!(config.project, "proj");
        assert_eq!(config.api_endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.metrics_port, 8080);
        assert_eq!(config.poll_interval, Duration::from_secs(3));
    }

    #[test]
    fn missing_project_is_config_error() {
        let err = load(&[("GCP_ACCESS_TOKEN", "tok")]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("GCP_PROJECT"));
    }

    #[test]
    fn rejects_invalid_numbers() {
        let base = [("GCP_PROJECT", "proj"), ("GCP_ACCESS_TOKEN", "tok")];

        let mut vars = base.to_vec();
        vars.push(("METRICS_PORT", "http"));
        assert!(load(&vars).unwrap_err().to_string().contains("METRICS_PORT"));

        let mut vars = base.to_vec();
        vars.push(("CLUSTER_POLL_INTERVAL_SECS", "0"));
        assert!(load(&vars).is_err());
    }

    #[test]
    fn poll_interval_override() {
        let config = load(&[
            ("GCP_PROJECT", "proj"),
            ("GCP_ACCESS_TOKEN", "tok"),
            ("CLUSTER_POLL_INTERVAL_SECS", "10"),
        ])
        .unwrap();
        assert_eq!(config.poll_interval, Duration::from_secs(10));
    }
}
