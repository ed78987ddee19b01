//! # madflow-core
//!
//! madflow 流式解码管线的核心库, 提供基础类型定义、错误处理和工具函数.
//!
//! 本 crate 不依赖任何解码或容器逻辑, 供其余 madflow crate 共用.

pub mod crc;
pub mod error;
pub mod flow;
pub mod sample_format;

// 重导出常用类型
pub use error::{MadflowError, MadflowResult};
pub use flow::FlowStatus;
pub use sample_format::{Endian, SampleWidth};
