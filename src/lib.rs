//! Builds and runs a `mysqldump` shell pipeline: dump, DEFINER filter,
//! file redirect and an optional archive command.
//!
//! ```no_run
//! use mydump::{ConnectionConfig, MysqlDump};
//! use serde_json::json;
//!
//! # async fn example() -> mydump::Result<()> {
//! let dump = MysqlDump::new(ConnectionConfig::new("shop").with_user("backup"))?;
//! dump.run_value(json!({
//!     "output_file": "/var/backups/shop.sql",
//!     "archive_path": "/var/backups/shop.sql.bz2",
//! }))
//! .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dump;
pub mod error;
pub mod logging;

pub use config::connection_config::ConnectionConfig;
pub use config::core::JobConfig;
pub use config::dump_options::{DumpMode, DumpOptions, RawDumpOptions};
pub use dump::command::DumpCommand;
pub use dump::core::MysqlDump;
pub use dump::executor::{CommandRunner, ShellRunner};
pub use dump::report::{Artifact, ChecksumKind, DumpReport};
pub use error::{DumpError, Result};
