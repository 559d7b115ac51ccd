// Common 模块 - 公共工具

pub mod directive;
pub mod model_mapping;
