use shared::{AppConfig, MigrationStrategy};

/// Configuration compiled into the client.
const EMBEDDED_CONFIG: &str = include_str!("../../hierarchy_explorer.toml");

pub const TOAST_DISMISS_MS: u64 = 5000;
pub const TOOLBAR_WIDTH: f64 = 300.0;
pub const QUERY_PLOT_HEIGHT: f64 = 220.0;

pub fn load_config() -> AppConfig {
    let config = parse_config(EMBEDDED_CONFIG);
    zoon::println!(
        "[CONFIG] backend {} | auto-collapse {} (levels {}, cells {})",
        config.backend.base_url,
        config.auto_collapse.enabled,
        config.auto_collapse.max_levels,
        config.auto_collapse.max_cells
    );
    config
}

/// Unreadable or outdated configuration falls back to the defaults.
pub fn parse_config(text: &str) -> AppConfig {
    let config = match AppConfig::from_toml_str(text) {
        Ok(config) => config,
        Err(error) => {
            log::warn!("[CONFIG] Invalid configuration, using defaults: {error}");
            return AppConfig::default();
        }
    };
    match config.app.get_migration_strategy() {
        MigrationStrategy::None => config,
        MigrationStrategy::Recreate => {
            log::warn!(
                "[CONFIG] Unsupported config version '{}', using defaults",
                config.app.version
            );
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_config_matches_defaults() {
        assert_eq!(parse_config(EMBEDDED_CONFIG), AppConfig::default());
    }

    #[test]
    fn unknown_version_is_recreated() {
        let config = parse_config("[app]\nversion = \"0.3.0\"\n\n[auto_collapse]\nenabled = true\n");
        assert!(!config.auto_collapse.enabled);
    }
}
