//! # madflow-format
//!
//! madflow 的输入输出层.
//!
//! 提供字节源抽象与有界输入源, WAV/裸 PCM 输出容器, 以及 ID3v2 标签头探测.

pub mod id3;
pub mod io;
pub mod sink;
pub mod sink_format;
pub mod sinks;
pub mod source;

pub use id3::{Id3Flags, Id3Header};
pub use io::{IoBackend, IoContext, MemoryBackend};
pub use sink::{FrameSink, PcmSpec};
pub use sink_format::SinkFormat;
pub use sinks::create_sink;
pub use source::BufferedSource;
