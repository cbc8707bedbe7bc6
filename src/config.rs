//! Configuration loader: merges .env, config.toml and env overrides.

use common::config::DashboardConfig;
use common::Error;
use std::path::Path;

const MAX_DOMINANCE_DEPTH: usize = 1000;

fn parse_positive_usize(raw: &str, env_name: &str) -> Result<usize, Error> {
    let parsed = raw
        .trim()
        .parse::<usize>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer > 0")))?;
    if parsed == 0 {
        return Err(Error::Config(format!("{env_name} must be an integer > 0")));
    }
    Ok(parsed)
}

fn parse_non_negative_u32(raw: &str, env_name: &str) -> Result<u32, Error> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer >= 0")))
}

fn non_empty(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Apply `MINERALS_*` overrides using `lookup` to read variables.
fn apply_env_overrides<F>(config: &mut DashboardConfig, lookup: F) -> Result<(), Error>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(base) = lookup("MINERALS_API_BASE").and_then(non_empty) {
        config.api.base_url = base;
    }
    if let Some(raw) = lookup("MINERALS_MAX_CONCURRENCY") {
        config.ingestion.max_concurrent_requests =
            parse_positive_usize(&raw, "MINERALS_MAX_CONCURRENCY")?;
    }
    if let Some(raw) = lookup("MINERALS_MAX_RETRIES") {
        config.ingestion.max_retries = parse_non_negative_u32(&raw, "MINERALS_MAX_RETRIES")?;
    }
    if let Some(path) = lookup("MINERALS_PROJECTIONS_PATH").and_then(non_empty) {
        config.projections.path = Some(path);
    }
    Ok(())
}

fn validate_config(config: &DashboardConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if config.api.base_url.trim().is_empty() {
        issues.push("api.base_url must not be empty".into());
    }
    if config.api.statistic_type.trim().is_empty() {
        issues.push("api.statistic_type must not be empty".into());
    }
    if config.api.page_limit == 0 {
        issues.push("api.page_limit must be > 0".into());
    }
    if config.api.timeout_secs == 0 {
        issues.push("api.timeout_secs must be > 0".into());
    }

    if config.ingestion.max_concurrent_requests == 0 {
        issues.push("ingestion.max_concurrent_requests must be > 0".into());
    }
    if config.ingestion.retry_base_delay_ms == 0 {
        issues.push("ingestion.retry_base_delay_ms must be > 0".into());
    }

    if config.years.min > config.years.max {
        issues.push(format!(
            "years.min ({}) must be <= years.max ({})",
            config.years.min, config.years.max
        ));
    }

    if !(1..=MAX_DOMINANCE_DEPTH).contains(&config.analytics.dominance_depth) {
        issues.push(format!(
            "analytics.dominance_depth must be between 1 and {MAX_DOMINANCE_DEPTH}"
        ));
    }
    if config.analytics.moderately_concentrated >= config.analytics.highly_concentrated {
        issues.push(
            "analytics.moderately_concentrated must be < analytics.highly_concentrated".into(),
        );
    }
    if config.analytics.highly_concentrated > 10_000 {
        issues.push("analytics.highly_concentrated must be <= 10000".into());
    }

    if !config
        .minerals
        .values()
        .any(|m| !m.no_data && m.commodity.is_some())
    {
        issues.push("minerals must contain at least one mineral with a commodity".into());
    }
    for (name, mineral) in &config.minerals {
        if let Some(other) = &mineral.shared_with {
            if !config.minerals.contains_key(other) {
                issues.push(format!(
                    "minerals.{name}.shared_with references unknown mineral '{other}'"
                ));
            }
        }
    }
    for name in config.projections.mapping.keys() {
        if !config.minerals.contains_key(name) {
            issues.push(format!("projections.mapping references unknown mineral '{name}'"));
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Load dashboard configuration from the environment and an optional
/// config file.
pub fn load_config(config_path: &Path) -> Result<DashboardConfig, Error> {
    // 1. Load .env file from project root or parent directories.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Start with defaults.
    let mut config = DashboardConfig::default();

    // 3. Try loading the config file if it exists.
    if config_path.exists() {
        let contents = std::fs::read_to_string(config_path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", config_path.display(), e))
        })?;
        config = toml::from_str(&contents).map_err(|e| {
            Error::Config(format!("Failed to parse {}: {}", config_path.display(), e))
        })?;
    }

    // 4. Override with environment variables (highest priority).
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;

    validate_config(&config)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&DashboardConfig::default()).is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = DashboardConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("MINERALS_API_BASE", " http://localhost:9000/items "),
                ("MINERALS_MAX_CONCURRENCY", "2"),
                ("MINERALS_MAX_RETRIES", "0"),
                ("MINERALS_PROJECTIONS_PATH", "data/iea.json"),
            ]),
        )
        .unwrap();

        assert_eq!(config.api.base_url, "http://localhost:9000/items");
        assert_eq!(config.ingestion.max_concurrent_requests, 2);
        assert_eq!(config.ingestion.max_retries, 0);
        assert_eq!(config.projections.path.as_deref(), Some("data/iea.json"));
    }

    #[test]
    fn test_env_override_rejects_zero_concurrency() {
        let mut config = DashboardConfig::default();
        let err = apply_env_overrides(&mut config, env(&[("MINERALS_MAX_CONCURRENCY", "0")]))
            .expect_err("zero concurrency");
        assert!(err.to_string().contains("MINERALS_MAX_CONCURRENCY"));
    }

    #[test]
    fn test_blank_env_values_ignored() {
        let mut config = DashboardConfig::default();
        let base = config.api.base_url.clone();
        apply_env_overrides(&mut config, env(&[("MINERALS_API_BASE", "  ")])).unwrap();
        assert_eq!(config.api.base_url, base);
    }

    #[test]
    fn test_validate_collects_all_issues() {
        let mut config = DashboardConfig::default();
        config.api.page_limit = 0;
        config.years.min = 2030;
        config.analytics.moderately_concentrated = 3000;

        let msg = validate_config(&config).unwrap_err().to_string();
        assert!(msg.contains("Invalid config:"));
        assert!(msg.contains("api.page_limit"));
        assert!(msg.contains("years.min"));
        assert!(msg.contains("analytics.moderately_concentrated"));
    }

    #[test]
    fn test_validate_rejects_oversized_dominance_depth() {
        let mut config = DashboardConfig::default();
        config.analytics.dominance_depth = usize::MAX;
        let msg = validate_config(&config).unwrap_err().to_string();
        assert!(msg.contains("analytics.dominance_depth"));

        config.analytics.dominance_depth = MAX_DOMINANCE_DEPTH;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_unknown_references() {
        let mut config = DashboardConfig::default();
        if let Some(niobium) = config.minerals.get_mut("Niobium") {
            niobium.shared_with = Some("Columbium".into());
        }
        config
            .projections
            .mapping
            .insert("Copper".into(), Default::default());

        let msg = validate_config(&config).unwrap_err().to_string();
        assert!(msg.contains("Columbium"));
        assert!(msg.contains("'Copper'"));
    }

    #[test]
    fn test_parse_toml_file() {
        let config: DashboardConfig = toml::from_str(
            r#"
            [ingestion]
            max_concurrent_requests = 3

            [years]
            min = 2018
            max = 2022
            "#,
        )
        .unwrap();

        assert_eq!(config.ingestion.max_concurrent_requests, 3);
        assert_eq!(config.ingestion.max_retries, 3);
        assert_eq!(config.years.min, 2018);
        assert_eq!(config.minerals.len(), 21);
        assert!(validate_config(&config).is_ok());
    }
}
