use crate::config::connection_config::ConnectionConfig;
use crate::config::dump_options::{DumpMode, DumpOptions};
use crate::dump::shell::escape;

/// Strips `DEFINER=...` up to the next space, pipe or `*`.
pub const DEFINER_FILTER: &str = " | sed 's/DEFINER=[^ |\\*]*//g'";

/// Replaces the password in masked scripts.
pub const PASSWORD_MASK: &str = "*****";

// This is the shell pipeline for one dump: dump binary, DEFINER filter,
// file redirect and archive stage.
#[derive(Debug, Clone, Copy)]
pub struct DumpCommand<'a> {
    connection: &'a ConnectionConfig,
    options: &'a DumpOptions,
}

impl<'a> DumpCommand<'a> {
    pub fn new(connection: &'a ConnectionConfig, options: &'a DumpOptions) -> Self {
        DumpCommand {
            connection,
            options,
        }
    }

    /// Returns the shell script to execute.
    pub fn get_script(&self) -> String {
        self.compose(false)
    }

    /// Returns the script with the password replaced, for logs and dry runs.
    pub fn get_masked_script(&self) -> String {
        self.compose(true)
    }

    fn compose(&self, mask_password: bool) -> String {
        let connection = self.connection;
        let options = self.options;
        let database = escape(&connection.database);

        let mut script = escape(&options.binary_path);

        if let Some(defaults_file) = &options.defaults_file {
            script.push_str(&format!(" --defaults-extra-file={}", escape(defaults_file)));
        }
        if let Some(max_packet_size) = &options.max_packet_size {
            script.push_str(&format!(" --max_allowed_packet={}", escape(max_packet_size)));
        }
        if let Some(host) = connection.get_host() {
            script.push_str(&format!(" --host={}", escape(host)));
        }
        if let Some(port) = connection.get_port() {
            script.push_str(&format!(" --port={port}"));
        }
        if let Some(user) = connection.get_user() {
            script.push_str(&format!(" --user={}", escape(user)));
        }
        if let Some(password) = connection.get_password() {
            let password = if mask_password { PASSWORD_MASK } else { password };
            script.push_str(&format!(" --password={}", escape(password)));
        }

        script.push_str(&format!(" --single-transaction --routines --triggers {database}"));

        match options.dump_mode {
            Some(DumpMode::Schema) => script.push_str(" --no-data"),
            Some(DumpMode::Data) => script.push_str(
                " --no-create-info --no-create-db --skip-triggers --skip-routines",
            ),
            None => {}
        }

        if options.redact_blobs_as_hex {
            script.push_str(" --hex-blob");
        }

        for table in &options.selected_tables {
            script.push(' ');
            script.push_str(&escape(table));
        }
        for table in &options.excluded_tables {
            script.push_str(&format!(" --ignore-table={}.{}", database, escape(table)));
        }

        script.push_str(DEFINER_FILTER);

        if let Some(file) = &options.output_file {
            if !options.archive_via_pipe {
                script.push_str(&format!(" > {}", escape(file)));
            }
        }

        if let Some(archive) = &options.archive_path {
            if !options.archive_template.is_empty() {
                script.push_str(if options.archive_via_pipe { " | " } else { " && " });
                let source = options.output_file.as_deref().unwrap_or_default();
                script.push_str(&options.archive_template.fill(source, archive));
            }
        }

        script
    }
}
