//! Controller settings read from the environment

use anyhow::{bail, Context, Result};
use std::time::Duration;
use vpc_backend::RestConfig;

const DEFAULT_GC_INTERVAL_SECS: u64 = 600;
const DEFAULT_BOOTSTRAP_TIMEOUT_SECS: u64 = 300;

#[derive(Clone, Debug)]
pub struct ControllerConfig {
    /// Name tagged on every backend object this controller creates
    pub cluster_name: String,
    pub backend_url: String,
    pub backend_username: Option<String>,
    pub backend_password: Option<String>,
    /// Accept invalid backend certificates
    pub backend_insecure: bool,
    pub alternate_lb_enabled: bool,
    pub gc_interval: Duration,
    pub bootstrap_timeout: Duration,
    pub json_logs: bool,
}

impl ControllerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &str| get(key).with_context(|| format!("{} must be set", key));
        let flag = |key: &str| -> Result<bool> {
            match get(key) {
                None => Ok(false),
                Some(v) => parse_bool(&v).with_context(|| format!("{} is not a boolean: {:?}", key, v)),
            }
        };
        let secs = |key: &str, default: u64| -> Result<Duration> {
            let value = match get(key) {
                None => default,
                Some(v) => v
                    .parse::<u64>()
                    .with_context(|| format!("{} is not a number of seconds: {:?}", key, v))?,
            };
            if value == 0 {
                bail!("{} must be greater than zero", key);
            }
            Ok(Duration::from_secs(value))
        };

        Ok(Self {
            cluster_name: required("CLUSTER_NAME")?,
            backend_url: required("BACKEND_URL")?,
            backend_username: get("BACKEND_USERNAME"),
            backend_password: get("BACKEND_PASSWORD"),
            backend_insecure: flag("BACKEND_INSECURE")?,
            alternate_lb_enabled: flag("ALTERNATE_LB_ENABLED")?,
            gc_interval: secs("GC_INTERVAL_SECS", DEFAULT_GC_INTERVAL_SECS)?,
            bootstrap_timeout: secs("BOOTSTRAP_TIMEOUT_SECS", DEFAULT_BOOTSTRAP_TIMEOUT_SECS)?,
            json_logs: get("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
        })
    }

    pub fn rest_config(&self) -> RestConfig {
        let config = RestConfig::new(self.backend_url.clone()).with_insecure(self.backend_insecure);
        match &self.backend_username {
            Some(user) => config.with_basic_auth(
                user.clone(),
                self.backend_password.clone().unwrap_or_default(),
            ),
            None => config,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ControllerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ControllerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("CLUSTER_NAME", "c1"), ("BACKEND_URL", "https://backend")]).unwrap();
        assert_eq!(config.cluster_name, "c1");
        assert_eq!(config.gc_interval, Duration::from_secs(600));
        assert_eq!(config.bootstrap_timeout, Duration::from_secs(300));
        assert!(!config.backend_insecure);
        assert!(!config.alternate_lb_enabled);
        assert!(!config.json_logs);
        assert!(config.backend_username.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("CLUSTER_NAME", "c1"),
            ("BACKEND_URL", "https://backend"),
            ("BACKEND_USERNAME", "admin"),
            ("BACKEND_INSECURE", "TRUE"),
            ("ALTERNATE_LB_ENABLED", "1"),
            ("GC_INTERVAL_SECS", "60"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();
        assert_eq!(config.backend_username.as_deref(), Some("admin"));
        assert!(config.backend_insecure);
        assert!(config.alternate_lb_enabled);
        assert_eq!(config.gc_interval, Duration::from_secs(60));
        assert!(config.json_logs);
    }

    #[test]
    fn test_missing_required() {
        let err = load(&[("BACKEND_URL", "https://backend")]).unwrap_err();
        assert!(err.to_string().contains("CLUSTER_NAME"));
    }

    #[test]
    fn test_invalid_values() {
        let base = [("CLUSTER_NAME", "c1"), ("BACKEND_URL", "https://backend")];

        let mut vars = base.to_vec();
        vars.push(("GC_INTERVAL_SECS", "soon"));
        assert!(load(&vars).is_err());

        let mut vars = base.to_vec();
        vars.push(("GC_INTERVAL_SECS", "0"));
        assert!(load(&vars).is_err());

        let mut vars = base.to_vec();
        vars.push(("BACKEND_INSECURE", "maybe"));
        assert!(load(&vars).is_err());
    }
}
