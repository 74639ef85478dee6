use anyhow::{Result, bail};
use std::collections::BTreeMap;

/// Validate a Kubernetes-style resource name.
/// Rules: lowercase `[a-z0-9-]`, max 63 chars, no leading/trailing hyphens.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("name must not be empty");
    }
    if name.len() > 63 {
        bail!("name '{}' exceeds 63 characters (got {})", name, name.len());
    }
    if name.starts_with('-') || name.ends_with('-') {
        bail!("name '{}' must not start or end with a hyphen", name);
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        bail!(
            "name '{}' must contain only lowercase letters, digits, and hyphens [a-z0-9-]",
            name
        );
    }
    Ok(())
}

/// Validate the keys and values of a label selector.
/// Keys may carry a `prefix/` part; values may be empty.
pub fn validate_selector(selector: &BTreeMap<String, String>) -> Result<()> {
    for (key, value) in selector {
        let name = key.rsplit('/').next().unwrap_or_default();
        if name.is_empty() || name.len() > 63 {
            bail!("label key '{}' must have a name of 1-63 characters", key);
        }
        if value.len() > 63 {
            bail!("label value '{}' for '{}' exceeds 63 characters", value, key);
        }
        let valid = |s: &str| {
            s.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        };
        if !valid(name) || !valid(value) {
            bail!("label '{}={}' contains invalid characters", key, value);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        assert!(validate_name("api").is_ok());
        assert!(validate_name("api-deploy-devspace").is_ok());
        assert!(validate_name("worker-2").is_ok());
    }

    #[test]
    fn invalid_names() {
        assert!(validate_name("").is_err());
        assert!(validate_name("Api").is_err());
        assert!(validate_name("api_deploy").is_err());
        assert!(validate_name("-api").is_err());
        assert!(validate_name("api-").is_err());
        assert!(validate_name(&"a".repeat(64)).is_err());
    }

    #[test]
    fn selectors() {
        let ok = BTreeMap::from([
            ("app".to_string(), "api".to_string()),
            ("app.kubernetes.io/part-of".to_string(), "shop_v2".to_string()),
        ]);
        assert!(validate_selector(&ok).is_ok());

        let bad = BTreeMap::from([("app".to_string(), "has space".to_string())]);
        assert!(validate_selector(&bad).is_err());

        let empty_name = BTreeMap::from([("example.com/".to_string(), "x".to_string())]);
        assert!(validate_selector(&empty_name).is_err());
    }
}
