//! 输出容器实现模块.

pub mod raw;
pub mod wav;

use madflow_core::MadflowResult;

use crate::io::IoContext;
use crate::sink::FrameSink;
use crate::sink_format::SinkFormat;

/// 按格式创建输出容器
pub fn create_sink(format: SinkFormat, io: IoContext) -> MadflowResult<Box<dyn FrameSink>> {
    match format {
        SinkFormat::Wav => wav::WavSink::create(io),
        SinkFormat::RawPcm => raw::RawPcmSink::create(io),
    }
}
