// OpenAI mapper 模块
// 负责 client ↔ upstream 的 OpenAI 协议归一化

pub mod models;
pub mod request;
pub mod response;
pub mod streaming;

pub use models::*;
pub use request::*;
pub use response::*;
pub use streaming::{create_reasoning_sse_stream, ReasoningState, TransformOptions};
