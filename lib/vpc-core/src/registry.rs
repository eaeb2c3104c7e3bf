//! Registry of network configs and the namespaces bound to them

use crate::{CoreError, NetworkConfig, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// NetworkConfigRegistry maps config names to configs and namespaces to
/// config names. Readers share the lock; writers replace single entries.
#[derive(Clone, Default)]
pub struct NetworkConfigRegistry {
    configs: Arc<RwLock<HashMap<String, NetworkConfig>>>,
    // namespace -> config name
    bindings: Arc<RwLock<HashMap<String, String>>>,
}

impl NetworkConfigRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a config
    pub async fn register_config(&self, config: NetworkConfig) {
        let name = config.name.clone();
        let mut configs = self.configs.write().await;
        configs.insert(name.clone(), config);
        info!("Registered network config: {}", name);
    }

    /// Remove a config, returning it if present
    pub async fn remove_config(&self, name: &str) -> Option<NetworkConfig> {
        let mut configs = self.configs.write().await;
        let removed = configs.remove(name);
        if removed.is_some() {
            info!("Removed network config: {}", name);
        }
        removed
    }

    pub async fn get_config(&self, name: &str) -> Result<NetworkConfig> {
        let configs = self.configs.read().await;
        configs
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::NetworkConfigNotFound(name.to_string()))
    }

    /// The single config flagged as default. Zero or several defaults is an error.
    pub async fn default_config(&self) -> Result<NetworkConfig> {
        let configs = self.configs.read().await;
        let mut defaults: Vec<&NetworkConfig> = configs.values().filter(|c| c.is_default).collect();
        match defaults.len() {
            0 => Err(CoreError::NoDefaultNetworkConfig),
            1 => Ok(defaults[0].clone()),
            _ => {
                defaults.sort_by(|a, b| a.name.cmp(&b.name));
                Err(CoreError::MultipleDefaultNetworkConfigs(
                    defaults.iter().map(|c| c.name.clone()).collect(),
                ))
            }
        }
    }

    /// Bind a namespace to a config name. Latest write wins.
    pub async fn bind_namespace(&self, namespace: &str, config_name: &str) {
        let mut bindings = self.bindings.write().await;
        let previous = bindings.insert(namespace.to_string(), config_name.to_string());
        debug!(
            namespace,
            config = config_name,
            previous = previous.as_deref().unwrap_or(""),
            "bound namespace to network config"
        );
    }

    pub async fn unbind_namespace(&self, namespace: &str) {
        let mut bindings = self.bindings.write().await;
        if bindings.remove(namespace).is_some() {
            debug!(namespace, "unbound namespace");
        }
    }

    /// Explicitly bound config name, if any
    pub async fn config_name_for_namespace(&self, namespace: &str) -> Option<String> {
        let bindings = self.bindings.read().await;
        bindings.get(namespace).cloned()
    }

    /// Config for a namespace: its binding if present, else the default
    pub async fn config_for_namespace(&self, namespace: &str) -> Result<NetworkConfig> {
        match self.config_name_for_namespace(namespace).await {
            Some(name) => self.get_config(&name).await,
            None => self.default_config().await,
        }
    }

    /// Namespaces explicitly bound to `config_name`, sorted
    pub async fn namespaces_for_config(&self, config_name: &str) -> Vec<String> {
        let bindings = self.bindings.read().await;
        let mut namespaces: Vec<String> = bindings
            .iter()
            .filter(|(_, c)| c.as_str() == config_name)
            .map(|(ns, _)| ns.clone())
            .collect();
        namespaces.sort();
        namespaces
    }

    pub async fn list_configs(&self) -> Vec<NetworkConfig> {
        let configs = self.configs.read().await;
        configs.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(name: &str, is_default: bool) -> NetworkConfig {
        NetworkConfig {
            name: name.to_string(),
            org: "o".to_string(),
            project: "p".to_string(),
            private_ips: vec!["10.0.0.0/24".to_string()],
            default_subnet_size: 26,
            is_default,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_unbound_namespace_resolves_default() {
        let registry = NetworkConfigRegistry::new();
        registry.register_config(config("default", true)).await;
        registry.register_config(config("tenant", false)).await;

        let resolved = registry.config_for_namespace("ns1").await.unwrap();
        assert_eq!(resolved.name, "default");
    }

    #[tokio::test]
    async fn test_binding_latest_write_wins() {
        let registry = NetworkConfigRegistry::new();
        registry.register_config(config("default", true)).await;
        registry.register_config(config("a", false)).await;
        registry.register_config(config("b", false)).await;

        registry.bind_namespace("ns1", "a").await;
        registry.bind_namespace("ns1", "b").await;

        assert_eq!(registry.config_for_namespace("ns1").await.unwrap().name, "b");
        assert!(registry.namespaces_for_config("a").await.is_empty());
        assert_eq!(registry.namespaces_for_config("b").await, vec!["ns1".to_string()]);

        registry.unbind_namespace("ns1").await;
        assert_eq!(registry.config_for_namespace("ns1").await.unwrap().name, "default");
    }

    #[tokio::test]
    async fn test_default_resolution_fails_loudly() {
        let registry = NetworkConfigRegistry::new();
        registry.register_config(config("a", false)).await;
        assert_eq!(
            registry.default_config().await,
            Err(CoreError::NoDefaultNetworkConfig)
        );

        registry.register_config(config("d1", true)).await;
        registry.register_config(config("d2", true)).await;
        assert_eq!(
            registry.default_config().await,
            Err(CoreError::MultipleDefaultNetworkConfigs(vec![
                "d1".to_string(),
                "d2".to_string()
            ]))
        );
    }

    #[tokio::test]
    async fn test_register_replace_remove() {
        let registry = NetworkConfigRegistry::new();
        registry.register_config(config("a", false)).await;

        let mut replaced = config("a", false);
        replaced.private_ips.push("10.1.0.0/24".to_string());
        registry.register_config(replaced.clone()).await;

        assert_eq!(registry.list_configs().await, vec![replaced.clone()]);
        assert_eq!(registry.remove_config("a").await, Some(replaced));
        assert_eq!(registry.remove_config("a").await, None);
        assert!(registry.list_configs().await.is_empty());
    }

    #[tokio::test]
    async fn test_binding_to_missing_config() {
        let registry = NetworkConfigRegistry::new();
        registry.bind_namespace("ns1", "missing").await;
        assert!(matches!(
            registry.config_for_namespace("ns1").await,
            Err(CoreError::NetworkConfigNotFound(_))
        ));
    }
}
