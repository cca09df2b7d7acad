use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;

use crate::config::connection_config::ConnectionConfig;
use crate::config::dump_options::DumpOptions;
use crate::error::{DumpError, Result};

// Job file representation.
//
// ```json
// {
//   "connection": { "database": "shop", "host": "db.internal", "user": "backup" },
//   "options": { "output_file": "/var/backups/shop.sql", "archive_path": "/var/backups/shop.sql.bz2" }
// }
// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    // Connection parameters for the dump
    pub connection: ConnectionConfig,
    // Options bag, validated separately
    #[serde(default)]
    pub options: Map<String, Value>,
}

impl JobConfig {
    // Load the job from a JSON file.
    pub fn load(file: impl AsRef<Path>) -> Result<Self> {
        let file = file.as_ref();
        let data = std::fs::read_to_string(file).map_err(|e| {
            DumpError::Config(format!(
                "Error reading configuration file {}: {e}",
                file.display()
            ))
        })?;
        Self::parse(&data)
    }

    // Parse the job from JSON text.
    pub fn parse(data: &str) -> Result<Self> {
        let job: JobConfig = serde_json::from_str(data)
            .map_err(|e| DumpError::Config(format!("Invalid configuration: {e}")))?;
        job.connection.validate()?;
        Ok(job)
    }

    // Validate the options bag of the job.
    pub fn dump_options(&self) -> Result<DumpOptions> {
        DumpOptions::from_value(Value::Object(self.options.clone()))
    }
}
