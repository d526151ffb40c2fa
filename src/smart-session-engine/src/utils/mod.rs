//! Small deterministic helpers shared by the readers and the CLI.

pub mod units;

pub use units::format_units;
