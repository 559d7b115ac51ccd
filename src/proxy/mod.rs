// proxy 模块 - 推理网关
pub mod common;
pub mod handlers;
pub mod mappers;
pub mod middleware;
pub mod provider;
pub mod server;
pub mod upstream;

pub use server::{build_router, serve, AppState};

#[cfg(test)]
mod tests;
