//! The dump options bag and its validation.

use clap::ValueEnum;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::dump::archive::{ArchiveTemplate, DEFAULT_ARCHIVE_TEMPLATE};
use crate::error::{DumpError, Result};

/// Dump binary used when none is configured.
pub const DEFAULT_BINARY: &str = "mysqldump";

/// Restricts the dump to structure or to rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DumpMode {
    /// Table definitions, routines and triggers without rows
    Schema,
    /// Rows only, without CREATE statements, triggers or routines
    Data,
}

// This is the raw options bag, as supplied by a caller or a job file.
//
// Every key is optional; defaults are applied by `resolve`. The names used by
// older job files are accepted as aliases.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawDumpOptions {
    #[serde(default, alias = "file")]
    pub output_file: Option<String>,
    #[serde(default, alias = "mysqldump_bin", deserialize_with = "present")]
    pub binary_path: Option<String>,
    #[serde(default, alias = "archive")]
    pub archive_path: Option<String>,
    #[serde(default, alias = "archive_pattern", deserialize_with = "present")]
    pub archive_command_template: Option<String>,
    #[serde(default, alias = "archive_pipe", deserialize_with = "present")]
    pub archive_via_pipe: Option<bool>,
    #[serde(default, alias = "hex_blob", deserialize_with = "present")]
    pub redact_blobs_as_hex: Option<bool>,
    #[serde(default, alias = "defaults_extra_file", deserialize_with = "present")]
    pub defaults_file: Option<String>,
    #[serde(default, alias = "max_allowed_packet", deserialize_with = "present")]
    pub max_packet_size: Option<String>,
    #[serde(default, alias = "dump_type")]
    pub dump_mode: Option<DumpMode>,
    #[serde(default, deserialize_with = "present")]
    pub selected_tables: Option<Vec<String>>,
    #[serde(default, alias = "ignored_tables", deserialize_with = "present")]
    pub excluded_tables: Option<Vec<String>>,
}

// Keys that may be omitted but never set to null.
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

// This is a validated, fully-typed set of dump options.
#[derive(Debug, Clone, PartialEq)]
pub struct DumpOptions {
    /// File the filtered dump is written to
    pub output_file: Option<String>,
    /// Dump binary to invoke
    pub binary_path: String,
    /// Archive produced by the archive command
    pub archive_path: Option<String>,
    /// Archive command with source and destination slots
    pub archive_template: ArchiveTemplate,
    /// Pipe the filtered stream into the archive command instead of a file
    pub archive_via_pipe: bool,
    /// Dump binary columns as hexadecimal literals
    pub redact_blobs_as_hex: bool,
    /// Extra option file passed to the dump binary
    pub defaults_file: Option<String>,
    /// Value for --max_allowed_packet
    pub max_packet_size: Option<String>,
    pub dump_mode: Option<DumpMode>,
    pub selected_tables: Vec<String>,
    pub excluded_tables: Vec<String>,
}

impl RawDumpOptions {
    /// Reads an options bag from a JSON value. Unknown keys and wrongly typed
    /// values are validation errors.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| DumpError::Validation(e.to_string()))
    }

    /// Applies defaults and checks every rule, producing a typed record.
    pub fn resolve(self) -> Result<DumpOptions> {
        let archive_template = match self.archive_command_template.as_deref() {
            Some(template) => ArchiveTemplate::parse(template)?,
            None => ArchiveTemplate::default(),
        };
        let options = DumpOptions {
            output_file: self.output_file,
            binary_path: self
                .binary_path
                .unwrap_or_else(|| DEFAULT_BINARY.to_string()),
            archive_path: self.archive_path,
            archive_template,
            archive_via_pipe: self.archive_via_pipe.unwrap_or(false),
            redact_blobs_as_hex: self.redact_blobs_as_hex.unwrap_or(false),
            defaults_file: self.defaults_file.filter(|v| !v.is_empty()),
            max_packet_size: self.max_packet_size.filter(|v| !v.is_empty()),
            dump_mode: self.dump_mode,
            selected_tables: self.selected_tables.unwrap_or_default(),
            excluded_tables: self.excluded_tables.unwrap_or_default(),
        };
        options.validate()?;
        Ok(options)
    }
}

impl DumpOptions {
    /// Validates a raw JSON options bag in one step.
    pub fn from_value(value: Value) -> Result<Self> {
        RawDumpOptions::from_value(value)?.resolve()
    }

    /// Checks that the record has a sink, then the filesystem state.
    pub fn validate(&self) -> Result<()> {
        let file = self.output_file.as_deref();
        let archive = self.archive_path.as_deref();
        let pipe = self.archive_via_pipe;

        if file.is_none() && archive.is_none() && !pipe {
            return Err(DumpError::Validation(
                "\"file\" option must be set when \"archive\" is not set and \"archive_pipe\" is false."
                    .to_string(),
            ));
        }
        if archive.is_none() && file.is_none() {
            return Err(DumpError::Validation(
                "\"archive\" option must be set when \"file\" is not set.".to_string(),
            ));
        }
        if archive.is_some() && file.is_none() && !pipe {
            return Err(DumpError::Validation(
                "\"file\" option must be set when \"archive\" is set and \"archive_pipe\" is false."
                    .to_string(),
            ));
        }
        if pipe && !self.runs_archive() {
            return Err(DumpError::Validation(
                "\"archive\" option must be set when \"archive_pipe\" is true.".to_string(),
            ));
        }
        if file == Some("") {
            return Err(DumpError::Validation(
                "\"file\" option must not be empty.".to_string(),
            ));
        }
        if archive == Some("") {
            return Err(DumpError::Validation(
                "\"archive\" option must not be empty.".to_string(),
            ));
        }
        self.check_preconditions()
    }

    /// Checks the filesystem state the dump depends on.
    pub fn check_preconditions(&self) -> Result<()> {
        if let Some(file) = &self.output_file {
            let directory = match Path::new(file).parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            if !directory.is_dir() {
                return Err(DumpError::Filesystem(format!(
                    "Directory \"{}\" does not exist for file value of \"{}\".",
                    directory.display(),
                    file
                )));
            }
        }
        if let Some(defaults_file) = &self.defaults_file {
            if !Path::new(defaults_file).exists() {
                return Err(DumpError::Filesystem(format!(
                    "Defaults extra file missing \"{defaults_file}\"."
                )));
            }
        }
        Ok(())
    }

    /// True when the filtered stream is written to `output_file`.
    pub fn writes_output_file(&self) -> bool {
        self.output_file.is_some() && !self.archive_via_pipe
    }

    /// True when the archive command is part of the pipeline.
    pub fn runs_archive(&self) -> bool {
        self.archive_path.is_some() && !self.archive_template.is_empty()
    }
}

impl Default for DumpOptions {
    fn default() -> Self {
        DumpOptions {
            output_file: None,
            binary_path: DEFAULT_BINARY.to_string(),
            archive_path: None,
            archive_template: ArchiveTemplate::default(),
            archive_via_pipe: false,
            redact_blobs_as_hex: false,
            defaults_file: None,
            max_packet_size: None,
            dump_mode: None,
            selected_tables: Vec::new(),
            excluded_tables: Vec::new(),
        }
    }
}
