use clap::{CommandFactory, Parser, ValueEnum};
use mydump::{
    ChecksumKind, ConnectionConfig, DumpError, DumpMode, DumpOptions, JobConfig, MysqlDump,
    RawDumpOptions, ShellRunner, logging,
};
use std::process::ExitCode;
use std::time::Duration;
use tracing::info;

// What to do with the assembled pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Action {
    /// Run the dump
    Dump,
    /// Print the pipeline with the password masked, without running it
    Print,
}

// Command line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "mydump",
    version,
    about = "MySQL dump pipeline runner.",
    long_about = None,
)]
struct Args {
    /// Command to execute: dump or print
    #[arg(long, value_enum, default_value_t = Action::Dump)]
    command: Action,

    /// Database name for the command
    #[arg(long)]
    database: Option<String>,

    /// Hostname for the command
    #[arg(long)]
    host: Option<String>,

    /// Port for the command
    #[arg(long)]
    port: Option<u16>,

    /// User name for the command
    #[arg(long)]
    user: Option<String>,

    /// Password of user for the command
    #[arg(long)]
    password: Option<String>,

    /// File the filtered dump is written to
    #[arg(long)]
    output: Option<String>,

    /// Dump binary to invoke
    #[arg(long)]
    mysqldump_bin: Option<String>,

    /// Archive file produced by the archive command
    #[arg(long)]
    archive: Option<String>,

    /// Archive command; %1$s is the dump file, %2$s the archive
    #[arg(long)]
    archive_pattern: Option<String>,

    /// Pipe the dump straight into the archive command
    #[arg(long)]
    archive_pipe: bool,

    /// Dump binary columns as hexadecimal
    #[arg(long)]
    hex_blob: bool,

    /// Option file passed to mysqldump
    #[arg(long)]
    defaults_extra_file: Option<String>,

    /// Value for --max_allowed_packet
    #[arg(long)]
    max_allowed_packet: Option<String>,

    /// Dump only the schema or only the data
    #[arg(long, value_enum)]
    dump_type: Option<DumpMode>,

    /// Table to dump; repeat for several tables
    #[arg(long = "table")]
    tables: Vec<String>,

    /// Table to skip; repeat for several tables
    #[arg(long = "ignore-table")]
    ignore_tables: Vec<String>,

    /// JSON job file with connection and options
    #[arg(
        long,
        conflicts_with_all = [
            "database", "host", "port", "user", "password", "output", "mysqldump_bin",
            "archive", "archive_pattern", "archive_pipe", "hex_blob", "defaults_extra_file",
            "max_allowed_packet", "dump_type", "tables", "ignore_tables",
        ]
    )]
    config: Option<String>,

    /// Seconds after which the dump is killed
    #[arg(long, default_value_t = 3600)]
    timeout: u64,

    /// Checksum to compute for produced files
    #[arg(long, value_enum)]
    checksum: Option<ChecksumKind>,

    /// Write a JSON report of the run to this file
    #[arg(long)]
    report: Option<String>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn connection(&self) -> ConnectionConfig {
        ConnectionConfig {
            database: self.database.clone().unwrap_or_default(),
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone(),
        }
    }

    fn options(&self) -> RawDumpOptions {
        RawDumpOptions {
            output_file: self.output.clone(),
            binary_path: self.mysqldump_bin.clone(),
            archive_path: self.archive.clone(),
            archive_command_template: self.archive_pattern.clone(),
            archive_via_pipe: Some(self.archive_pipe),
            redact_blobs_as_hex: Some(self.hex_blob),
            defaults_file: self.defaults_extra_file.clone(),
            max_packet_size: self.max_allowed_packet.clone(),
            dump_mode: self.dump_type,
            selected_tables: Some(self.tables.clone()),
            excluded_tables: Some(self.ignore_tables.clone()),
        }
    }
}

// Main entry point for the program.
#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(&args.log_level);

    if args.database.is_none() && args.config.is_none() {
        let mut cmd = Args::command();
        let _ = cmd.print_help();
        return ExitCode::SUCCESS;
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error ({} stage): {}", e.stage(), e.to_string().trim_end());
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), DumpError> {
    let (connection, options) = load(&args)?;
    let runner = ShellRunner::new().with_timeout(Duration::from_secs(args.timeout));
    let dump = MysqlDump::new(connection)?
        .with_runner(runner)
        .with_checksum(args.checksum);

    match args.command {
        Action::Print => {
            println!("{}", dump.command(&options).get_masked_script());
        }
        Action::Dump => {
            info!("mydump v{}", env!("CARGO_PKG_VERSION"));
            let report = dump.dump(&options).await?;
            println!("Dump created successfully.");
            println!("{}", report.get_info());
            if let Some(file) = &args.report {
                report.save(file).await?;
                println!("Report saved: {file}");
            }
        }
    }
    Ok(())
}

// Reads connection and options from the job file or from the flags.
fn load(args: &Args) -> Result<(ConnectionConfig, DumpOptions), DumpError> {
    match &args.config {
        Some(config) => {
            info!("Using configuration file: {config}");
            let job = JobConfig::load(config)?;
            let options = job.dump_options()?;
            Ok((job.connection, options))
        }
        None => Ok((args.connection(), args.options().resolve()?)),
    }
}
