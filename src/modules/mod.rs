pub mod config;
pub mod logger;

pub use config::*;
#[allow(unused_imports)]
pub use logger::*;
