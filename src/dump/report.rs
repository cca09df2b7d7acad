use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::error::Result;

/// Checksum algorithm for produced files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumKind {
    Md5,
    Sha256,
}

impl ChecksumKind {
    pub fn name(&self) -> &'static str {
        match self {
            ChecksumKind::Md5 => "md5",
            ChecksumKind::Sha256 => "sha256",
        }
    }
}

// This is a file produced by a dump run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Path of the file
    pub path: String,
    /// Size in bytes
    pub size: u64,
    /// Hex digest, when requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum_kind: Option<ChecksumKind>,
}

impl Artifact {
    // Inspect a file on disk.
    pub async fn inspect(path: &str, checksum: Option<ChecksumKind>) -> Result<Self> {
        let size = tokio::fs::metadata(path).await?.len();
        let checksum_value = match checksum {
            Some(kind) => Some(file_digest(Path::new(path), kind).await?),
            None => None,
        };
        Ok(Artifact {
            path: path.to_string(),
            size,
            checksum: checksum_value,
            checksum_kind: checksum,
        })
    }
}

// Outcome of a successful dump run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpReport {
    /// Database that was dumped
    pub database: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Files written by the pipeline
    pub artifacts: Vec<Artifact>,
    /// Captured stdout of the pipeline, normally empty
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stdout: String,
}

impl DumpReport {
    /// Wall-clock duration of the run.
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    pub fn get_info(&self) -> String {
        let mut info = format!(
            "\tDump Info:\n\t\t- Database: {}\n\t\t- Started: {}\n\t\t- Finished: {}\n\t\t- Elapsed: {} ms",
            self.database,
            self.started_at.to_rfc3339(),
            self.finished_at.to_rfc3339(),
            self.elapsed().num_milliseconds()
        );
        for artifact in &self.artifacts {
            info.push_str(&format!(
                "\n\t\t- File: {} ({} bytes)",
                artifact.path, artifact.size
            ));
            if let (Some(kind), Some(checksum)) = (artifact.checksum_kind, &artifact.checksum) {
                info.push_str(&format!(" {}: {}", kind.name(), checksum));
            }
        }
        info
    }

    // Save the report as JSON.
    pub async fn save(&self, file: &str) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        tokio::fs::write(file, serialized).await?;
        Ok(())
    }
}

async fn file_digest(path: &Path, kind: ChecksumKind) -> Result<String> {
    let mut file = File::open(path).await?;
    let mut buffer = vec![0u8; 64 * 1024];
    match kind {
        ChecksumKind::Md5 => {
            let mut context = md5::Context::new();
            loop {
                let read = file.read(&mut buffer).await?;
                if read == 0 {
                    break;
                }
                context.consume(&buffer[..read]);
            }
            Ok(format!("{:x}", context.compute()))
        }
        ChecksumKind::Sha256 => {
            let mut hasher = Sha256::new();
            loop {
                let read = file.read(&mut buffer).await?;
                if read == 0 {
                    break;
                }
                hasher.update(&buffer[..read]);
            }
            Ok(format!("{:x}", hasher.finalize()))
        }
    }
}
