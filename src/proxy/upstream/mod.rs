pub mod client;

pub use client::{ProbeError, UpstreamClient, UpstreamError};
