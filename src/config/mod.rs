pub mod connection_config;
pub mod core;
pub mod dump_options;
