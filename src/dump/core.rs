use chrono::Utc;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::connection_config::ConnectionConfig;
use crate::config::dump_options::{DumpOptions, RawDumpOptions};
use crate::dump::command::DumpCommand;
use crate::dump::executor::{CommandRunner, ShellRunner};
use crate::dump::report::{Artifact, ChecksumKind, DumpReport};
use crate::error::Result;

// This is the dump orchestrator: validates options, assembles the pipeline
// and runs it.
#[derive(Debug, Clone)]
pub struct MysqlDump<R = ShellRunner> {
    // Connection parameters, fixed for the lifetime of the orchestrator.
    connection: ConnectionConfig,
    runner: R,
    checksum: Option<ChecksumKind>,
}

impl MysqlDump<ShellRunner> {
    // Create a new orchestrator running pipelines through `sh`.
    pub fn new(connection: ConnectionConfig) -> Result<Self> {
        connection.validate()?;
        Ok(MysqlDump {
            connection,
            runner: ShellRunner::new(),
            checksum: None,
        })
    }
}

impl<R: CommandRunner> MysqlDump<R> {
    /// Replaces the runner that executes the assembled script.
    pub fn with_runner<T: CommandRunner>(self, runner: T) -> MysqlDump<T> {
        MysqlDump {
            connection: self.connection,
            runner,
            checksum: self.checksum,
        }
    }

    /// Computes a checksum of every produced file.
    pub fn with_checksum(mut self, checksum: Option<ChecksumKind>) -> Self {
        self.checksum = checksum;
        self
    }

    pub fn connection(&self) -> &ConnectionConfig {
        &self.connection
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Assembles the pipeline without running it.
    pub fn command<'a>(&'a self, options: &'a DumpOptions) -> DumpCommand<'a> {
        DumpCommand::new(&self.connection, options)
    }

    /// Validates the options bag and runs the dump.
    pub async fn run(&self, options: RawDumpOptions) -> Result<bool> {
        let options = options.resolve()?;
        self.dump(&options).await?;
        Ok(true)
    }

    /// Same as `run`, for an options bag held as JSON.
    pub async fn run_value(&self, options: Value) -> Result<bool> {
        self.run(RawDumpOptions::from_value(options)?).await
    }

    /// Runs the dump for validated options and reports the produced files.
    pub async fn dump(&self, options: &DumpOptions) -> Result<DumpReport> {
        options.validate()?;

        let command = self.command(options);
        info!(
            connection = %self.connection.get_masked_connection_string(),
            "Starting dump"
        );
        debug!(script = %command.get_masked_script(), "Dump pipeline");

        let started_at = Utc::now();
        let stdout = match self.runner.run(&command.get_script()).await {
            Ok(stdout) => stdout,
            Err(e) => {
                warn!(database = %self.connection.database, "Dump failed: {e}");
                return Err(e);
            }
        };
        let finished_at = Utc::now();

        let mut artifacts = Vec::new();
        if options.writes_output_file() {
            if let Some(file) = &options.output_file {
                self.collect_artifact(file, &mut artifacts).await?;
            }
        }
        if options.runs_archive() {
            if let Some(archive) = &options.archive_path {
                self.collect_artifact(archive, &mut artifacts).await?;
            }
        }

        let report = DumpReport {
            database: self.connection.database.clone(),
            started_at,
            finished_at,
            artifacts,
            stdout,
        };
        info!(
            database = %report.database,
            elapsed_ms = report.elapsed().num_milliseconds(),
            files = report.artifacts.len(),
            "Dump finished"
        );
        Ok(report)
    }

    async fn collect_artifact(&self, path: &str, artifacts: &mut Vec<Artifact>) -> Result<()> {
        if !Path::new(path).is_file() {
            warn!(path, "Expected dump file was not produced");
            return Ok(());
        }
        artifacts.push(Artifact::inspect(path, self.checksum).await?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::dump_options::DumpMode;
    use crate::dump::archive::ArchiveTemplate;
    use crate::error::DumpError;
    use serde_json::json;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Records scripts instead of running them.
    #[derive(Default)]
    struct RecordingRunner {
        scripts: Mutex<Vec<String>>,
        failure: Option<String>,
    }

    impl RecordingRunner {
        fn failing(stderr: &str) -> Self {
            RecordingRunner {
                scripts: Mutex::new(Vec::new()),
                failure: Some(stderr.to_string()),
            }
        }

        fn scripts(&self) -> Vec<String> {
            self.scripts.lock().unwrap().clone()
        }
    }

    impl CommandRunner for RecordingRunner {
        async fn run(&self, script: &str) -> Result<String> {
            self.scripts.lock().unwrap().push(script.to_string());
            match &self.failure {
                Some(stderr) => Err(DumpError::Execution(stderr.clone())),
                None => Ok(String::new()),
            }
        }
    }

    fn recording(database: &str) -> MysqlDump<RecordingRunner> {
        MysqlDump::new(ConnectionConfig::new(database))
            .unwrap()
            .with_runner(RecordingRunner::default())
    }

    fn path_in(dir: &TempDir, name: &str) -> String {
        dir.path().join(name).display().to_string()
    }

    #[test]
    fn test_empty_database_is_rejected() {
        let err = MysqlDump::new(ConnectionConfig::new("")).unwrap_err();
        assert!(matches!(err, DumpError::Validation(_)));
    }

    #[tokio::test]
    async fn test_runner_receives_file_pipeline() {
        let dir = TempDir::new().unwrap();
        let file = path_in(&dir, "out.sql");
        let dump = recording("shop");

        assert!(dump.run_value(json!({ "output_file": file })).await.unwrap());

        let scripts = dump.runner().scripts();
        assert_eq!(scripts.len(), 1);
        let script = &scripts[0];
        assert!(script.starts_with("'mysqldump'"));
        assert!(script.contains("--single-transaction --routines --triggers 'shop'"));
        assert!(script.ends_with(&format!("> '{file}'")));
        assert_eq!(script.matches("DEFINER=").count(), 1);
    }

    #[tokio::test]
    async fn test_runner_receives_archive_pipeline() {
        let dir = TempDir::new().unwrap();
        let file = path_in(&dir, "out.sql");
        let archive = path_in(&dir, "out.bz2");
        let dump = recording("shop");

        dump.run_value(json!({ "output_file": file, "archive_path": archive }))
            .await
            .unwrap();

        let script = &dump.runner().scripts()[0];
        assert!(script.contains(&format!(
            "> '{file}' && pbzip2 --compress --best -c '{file}' > '{archive}'"
        )));
    }

    #[tokio::test]
    async fn test_invalid_options_never_reach_the_runner() {
        let dir = TempDir::new().unwrap();
        let dump = recording("shop");

        let err = dump.run_value(json!({})).await.unwrap_err();
        assert!(matches!(err, DumpError::Validation(_)));

        let err = dump
            .run_value(json!({ "output_file": path_in(&dir, "missing/out.sql") }))
            .await
            .unwrap_err();
        assert!(matches!(err, DumpError::Filesystem(_)));

        let err = dump
            .run_value(json!({ "output_file": "out.sql", "unknown": true }))
            .await
            .unwrap_err();
        assert!(matches!(err, DumpError::Validation(_)));

        assert!(dump.runner().scripts().is_empty());
    }

    #[tokio::test]
    async fn test_execution_error_is_passed_through() {
        let dir = TempDir::new().unwrap();
        let dump = MysqlDump::new(ConnectionConfig::new("shop"))
            .unwrap()
            .with_runner(RecordingRunner::failing("Access denied for user\n"));
        let err = dump
            .run_value(json!({ "output_file": path_in(&dir, "out.sql") }))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Access denied for user\n");
    }

    #[tokio::test]
    async fn test_dump_checks_preconditions_of_hand_built_options() {
        let dump = recording("shop");
        let options = DumpOptions {
            output_file: Some("/nonexistent-mydump-dir/out.sql".to_string()),
            ..Default::default()
        };
        let err = dump.dump(&options).await.unwrap_err();
        assert!(matches!(err, DumpError::Filesystem(_)));
        assert!(dump.runner().scripts().is_empty());
    }

    #[tokio::test]
    async fn test_dump_rejects_hand_built_options_without_sink() {
        let dump = recording("shop");

        let err = dump.dump(&DumpOptions::default()).await.unwrap_err();
        assert!(matches!(err, DumpError::Validation(_)));

        let options = DumpOptions {
            binary_path: "echo".to_string(),
            archive_via_pipe: true,
            ..Default::default()
        };
        let err = dump.dump(&options).await.unwrap_err();
        assert!(matches!(err, DumpError::Validation(_)));

        assert!(dump.runner().scripts().is_empty());
    }

    #[tokio::test]
    async fn test_shell_dump_strips_definer_and_writes_file() {
        let dir = TempDir::new().unwrap();
        let file = path_in(&dir, "out.sql");
        let dump = MysqlDump::new(ConnectionConfig::new("CREATE DEFINER=`root`@`%` VIEW v"))
            .unwrap()
            .with_checksum(Some(ChecksumKind::Sha256));
        let options = DumpOptions {
            output_file: Some(file.clone()),
            binary_path: "echo".to_string(),
            dump_mode: Some(DumpMode::Schema),
            ..Default::default()
        };

        let report = dump.dump(&options).await.unwrap();

        let written = std::fs::read_to_string(&file).unwrap();
        assert_eq!(
            written,
            "--single-transaction --routines --triggers CREATE  VIEW v --no-data\n"
        );
        assert_eq!(report.artifacts.len(), 1);
        assert_eq!(report.artifacts[0].path, file);
        assert_eq!(report.artifacts[0].size, written.len() as u64);
        assert_eq!(report.artifacts[0].checksum.as_ref().map(String::len), Some(64));
    }

    #[tokio::test]
    async fn test_shell_dump_archives_after_file() {
        let dir = TempDir::new().unwrap();
        let file = path_in(&dir, "out.sql");
        let archive = path_in(&dir, "out copy.sql");
        let dump = MysqlDump::new(ConnectionConfig::new("shop")).unwrap();

        let ok = dump
            .run_value(json!({
                "output_file": file,
                "archive_path": archive,
                "binary_path": "echo",
                "archive_command_template": "cp %1$s %2$s",
            }))
            .await
            .unwrap();

        assert!(ok);
        assert_eq!(
            std::fs::read_to_string(&archive).unwrap(),
            std::fs::read_to_string(&file).unwrap()
        );
    }

    #[tokio::test]
    async fn test_shell_dump_archives_via_pipe() {
        let dir = TempDir::new().unwrap();
        let archive = path_in(&dir, "piped.sql");
        let dump = MysqlDump::new(ConnectionConfig::new("shop")).unwrap();
        let options = RawDumpOptions::from_value(json!({
            "archive_path": archive,
            "archive_via_pipe": true,
            "binary_path": "echo",
            "archive_command_template": "cat > %2$s",
        }))
        .unwrap()
        .resolve()
        .unwrap();

        let report = dump.dump(&options).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(&archive).unwrap(),
            "--single-transaction --routines --triggers shop\n"
        );
        assert_eq!(report.artifacts.len(), 1);
        assert_eq!(report.artifacts[0].path, archive);
    }

    #[tokio::test]
    async fn test_failed_archive_step_reports_its_stderr() {
        let dir = TempDir::new().unwrap();
        let file = path_in(&dir, "out.sql");
        let archive = path_in(&dir, "missing/out.bak");
        let dump = MysqlDump::new(ConnectionConfig::new("shop")).unwrap();
        let options = DumpOptions {
            output_file: Some(file.clone()),
            archive_path: Some(archive),
            binary_path: "echo".to_string(),
            archive_template: ArchiveTemplate::parse("cp %1$s %2$s").unwrap(),
            ..Default::default()
        };

        let err = dump.dump(&options).await.unwrap_err();

        match err {
            DumpError::Execution(stderr) => assert!(stderr.contains("out.bak"), "{stderr}"),
            other => panic!("expected an execution error, got {other:?}"),
        }
        assert!(Path::new(&file).is_file());
    }
}
