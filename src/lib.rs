pub mod cancel;
pub mod chain;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fixes;
pub mod host;
pub mod logging;
pub mod markers;
pub mod model;
pub mod rules;
pub mod syntax;
pub mod util;
