// Infrastructure: process-level concerns of the command line front end

pub mod logging;

pub use logging::LoggingConfig;
