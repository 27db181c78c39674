// tests/integration/main.rs

#[path = "../common/mod.rs"]
mod common;

mod cli_args;
mod output_sinks;
#[cfg(unix)]
mod process_lifecycle;
