use anyhow::Context;
use beatbox_shared::SessionConfig;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Reads a JSON session config. Missing fields take their defaults.
pub fn load_config_file(path: &Path) -> Result<SessionConfig, anyhow::Error> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read config {}", path.display()))?;
    let config: SessionConfig = serde_json::from_str(&content)
        .with_context(|| format!("Invalid config {}", path.display()))?;

    tracing::info!("[Config] Loaded {}", path.display());
    Ok(config)
}

pub fn save_config_file(config: &SessionConfig, path: &Path) -> Result<(), anyhow::Error> {
    let json = serde_json::to_string_pretty(config)?;
    let mut file = File::create(path)
        .with_context(|| format!("Could not create {}", path.display()))?;
    file.write_all(json.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use beatbox_shared::DecodePolicy;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{ "user_name": "alice", "relay": { "decode_policy": "disconnect" } }"#)
                .unwrap();
        assert_eq!(config.user_name, "alice");
        assert_eq!(config.relay.address, "127.0.0.1:4242");
        assert_eq!(config.relay.decode_policy, DecodePolicy::Disconnect);
        assert_eq!(config.tempo.base_bpm, 120.0);
    }

    #[test]
    fn test_save_then_load() {
        let path = std::env::temp_dir().join(format!("beatbox-config-{}.json", std::process::id()));
        let mut config = SessionConfig::default().with_user_name("bob");
        config.tempo.base_bpm = 96.0;

        save_config_file(&config, &path).unwrap();
        let loaded = load_config_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_bad_config_is_reported() {
        let path = std::env::temp_dir().join(format!("beatbox-bad-{}.json", std::process::id()));
        std::fs::write(&path, "{ not json").unwrap();
        let err = load_config_file(&path).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert!(err.to_string().contains("Invalid config"));
    }
}
