#[cfg(feature = "cli")]
pub mod cli;
pub mod clients;
pub mod engine;
pub mod input;
pub mod model;
pub mod output;
pub mod probe;
pub mod tls;
pub mod util;
