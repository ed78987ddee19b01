//! # madflow
//!
//! 回调驱动的 MPEG 音频流式解码管线.
//!
//! 解码引擎通过输入回调从有界输入源拉取压缩数据, 解码出的 PCM 帧经过
//! 缩放、交错后写入 WAV 或裸 PCM 输出容器:
//! - **输入**: 读满或读到 EOF 的 [`format::BufferedSource`]
//! - **缩放**: 28 位定点 (或 f32) 到 8/16/24 位, 可选字节序
//! - **输出**: 头部只写一次的 [`format::FrameSink`]
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use madflow::format::io::IoContext;
//! use madflow::format::{BufferedSource, SinkFormat, create_sink};
//! use madflow::pipeline::{PipelineConfig, decode_mp3};
//!
//! let mut source = BufferedSource::open("input.mp3").unwrap();
//! let io = IoContext::open_write("output.wav").unwrap();
//! let mut sink = create_sink(SinkFormat::Wav, io).unwrap();
//! let report = decode_mp3(&mut source, sink.as_mut(), &PipelineConfig::default()).unwrap();
//! println!("{report}");
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `madflow-core` | 流程状态, 错误类型, 采样宽度 |
//! | `madflow-codec` | 解码引擎边界, PCM 帧描述, 采样缩放 |
//! | `madflow-format` | 输入源, 输出容器, ID3v2 探测 |
//! | `madflow-pipeline` | 输入/输出回调与运行驱动 |

/// 核心类型与工具
pub use madflow_core as core;

/// 解码引擎与采样缩放
pub use madflow_codec as codec;

/// 输入输出
pub use madflow_format as format;

/// 解码管线
pub use madflow_pipeline as pipeline;

/// 获取 madflow 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
