use std::fs;
use std::path::Path;

use skyfall_meteor::MeteorSettings;
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "config/meteorites.toml";

/// Load settings from an explicit path, falling back to defaults on errors.
pub fn load_settings_from_path(path: &Path) -> MeteorSettings {
    let settings = match fs::read_to_string(path) {
        Ok(contents) => match toml::from_str::<MeteorSettings>(&contents) {
            Ok(settings) => settings,
            Err(err) => {
                warn!("Failed to parse {}: {err}. Using defaults", path.display());
                MeteorSettings::default()
            }
        },
        Err(err) => {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to read {}: {err}. Using defaults", path.display());
            } else {
                warn!(
                    "Meteor config not found at {}. Using defaults",
                    path.display()
                );
            }
            MeteorSettings::default()
        }
    };
    report_suspicious(&settings);
    settings
}

fn report_suspicious(settings: &MeteorSettings) {
    if settings.meteorites.is_empty() {
        warn!("No meteorite types configured");
    }
    for (id, definition) in &settings.meteorites {
        if definition.outer_radius <= 0 {
            warn!(meteorite = %id, "outer_radius must be positive, type will never spawn");
        }
        if definition.enable_inner && definition.inner_radius > definition.outer_radius {
            warn!(meteorite = %id, "inner_radius exceeds outer_radius, outer layer will be empty");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = env::temp_dir().join(format!("skyfall_config_{name}_{timestamp}.toml"));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn missing_file_uses_defaults() {
        let path = env::temp_dir().join("skyfall_config_definitely_missing.toml");
        assert_eq!(load_settings_from_path(&path), MeteorSettings::default());
    }

    #[test]
    fn invalid_file_uses_defaults() {
        let path = temp_file("invalid", "[settings\nspawn_height = ");
        assert_eq!(load_settings_from_path(&path), MeteorSettings::default());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let path = temp_file("partial", "[settings]\nspawn_height = 200\n");
        let settings = load_settings_from_path(&path);
        assert_eq!(settings.settings.spawn_height, 200);
        assert_eq!(settings.settings.cleanup_radius, 8);
        assert!(!settings.random.enabled);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn shipped_config_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_CONFIG_PATH);
        let contents = fs::read_to_string(&path).unwrap();
        let settings = MeteorSettings::from_toml_str(&contents).unwrap();
        assert!(settings.definition("iron").is_some());
        assert!(settings.definition("ancient").is_some());
        assert!(!settings.treasure.items.is_empty());
        assert!(!settings.guardians.types.is_empty());
        let effects = settings.active_effects();
        assert!(effects.trail.is_some());
        assert!(effects.bursts.is_some());
        assert!(effects.shockwave.is_some());
        assert!(effects.radar.is_some());
    }
}
