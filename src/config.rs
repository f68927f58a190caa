use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{Context, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    pub store: StoreConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    /// Boundary dataset: a GeoJSON FeatureCollection, one feature per region.
    pub geojson: PathBuf,
    /// Feature property carrying the region name, e.g. "COUNTYNAME".
    pub name_property: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_full_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[input]
geojson = "taiwan_counties.geojson"
name_property = "COUNTYNAME"

[store]
path = "visited_areas.json"

[server]
port = 3000
"#
        )
        .unwrap();

        let config = AppConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.input.name_property, "COUNTYNAME");
        assert_eq!(config.store.path, PathBuf::from("visited_areas.json"));
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(AppConfig::load_from_file(Path::new("no_such_config.toml")).is_err());
    }
}
