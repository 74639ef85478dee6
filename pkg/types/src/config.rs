use serde::{Deserialize, Serialize};

use crate::devpod::DevPod;

/// Dev pod controller configuration file (YAML).
///
/// Example `devspace.yaml`:
/// ```yaml
/// namespace: default
/// data-dir: /tmp/k3rs-data
/// dev-pods:
///   - name: api
///     labelSelector:
///       app: api
///     devContainers:
///       - devImage: node:20
///         persistPaths:
///           - path: /app/node_modules
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DevConfigFile {
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default, alias = "data-dir")]
    pub data_dir: Option<String>,
    #[serde(default, alias = "cache-name")]
    pub cache_name: Option<String>,
    #[serde(default, alias = "dev-pods")]
    pub dev_pods: Vec<DevPod>,
}

impl DevConfigFile {
    pub fn dev_pod(&self, name: &str) -> Option<&DevPod> {
        self.dev_pods.iter().find(|p| p.name == name)
    }

    /// Validate every declared dev pod and reject duplicate names.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut seen = std::collections::BTreeSet::new();
        for dev_pod in &self.dev_pods {
            dev_pod.validate()?;
            if !seen.insert(dev_pod.name.as_str()) {
                anyhow::bail!("dev pod '{}' is declared more than once", dev_pod.name);
            }
        }
        Ok(())
    }
}

/// Load a YAML config file, returning the default if the file doesn't exist.
pub fn load_config_file<T: serde::de::DeserializeOwned + Default>(path: &str) -> anyhow::Result<T> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(T::default());
        }
        Err(e) => return Err(e.into()),
    };
    let config: T = serde_yaml::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_default() {
        let cfg: DevConfigFile = load_config_file("/nonexistent/devspace.yaml").unwrap();
        assert!(cfg.dev_pods.is_empty());
        assert!(cfg.namespace.is_none());
    }

    #[test]
    fn test_parse_and_validate() {
        let yaml = r#"
namespace: dev
data-dir: /var/lib/k3rs
dev-pods:
  - name: api
  - name: worker
    imageSelector: worker:latest
"#;
        let cfg: DevConfigFile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.data_dir.as_deref(), Some("/var/lib/k3rs"));
        assert!(cfg.dev_pod("worker").is_some());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_duplicate_dev_pods_rejected() {
        let yaml = r#"
dev-pods:
  - name: api
  - name: api
"#;
        let cfg: DevConfigFile = serde_yaml::from_str(yaml).unwrap();
        assert!(cfg.validate().is_err());
    }
}
