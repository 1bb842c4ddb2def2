//! Configuration loading and validation

mod schema;

pub use schema::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a YAML file
pub fn load_config(path: &Path) -> Result<StationConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {:?}", path))?;
    let config: StationConfig = serde_yaml::from_str(&contents)
        .with_context(|| format!("failed to parse config: {:?}", path))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;
    use std::io::Write;

    #[test]
    fn test_load_minimal_config() {
        let yaml = r#"
station:
  name: north
"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.station.name, "north");
        assert_eq!(config.station.extension, "wav");
        assert_eq!(config.server.bind, "127.0.0.1:7878");
        assert!(config.audio.device.is_none());
    }

    #[test]
    fn test_load_example_config() {
        let yaml = include_str!("../../station.example.yaml");
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        assert!(load_config(file.path()).is_ok());
    }

    #[test]
    fn test_load_invalid_config() {
        let yaml = r#"
server:
  bind: "nowhere"
"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        assert!(load_config(file.path()).is_err());
    }
}
