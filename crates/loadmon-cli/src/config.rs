use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct FleetConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_remote_user")]
    pub remote_user: String,
    #[serde(default = "default_export_dir")]
    pub export_dir: String,
    #[serde(default)]
    pub hosts: Vec<HostEntry>,
}

#[derive(Debug, Deserialize)]
pub struct HostEntry {
    pub alias: String,
    pub address: String,
}

fn default_database_path() -> String {
    "loadmon.db".to_string()
}

fn default_remote_user() -> String {
    "loadmon".to_string()
}

fn default_export_dir() -> String {
    "export".to_string()
}

impl FleetConfig {
    /// Loads the TOML config; the `LOADMON_DB` environment variable
    /// overrides `database_path`.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        if let Ok(db) = std::env::var("LOADMON_DB") {
            config.database_path = db;
        }
        Ok(config)
    }
}
