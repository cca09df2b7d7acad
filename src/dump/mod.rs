pub mod archive;
pub mod command;
pub mod core;
pub mod executor;
pub mod report;
pub mod shell;
