// Command-line front end for the career risk pipeline: configuration, the
// CSV stats source and report output.

pub mod config;
pub mod csv_provider;
pub mod report;
