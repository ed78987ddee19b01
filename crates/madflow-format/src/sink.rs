//! 输出容器 (FrameSink) trait 定义.
//!
//! 定义了将交错 PCM 帧写入输出容器的接口.

use std::fmt;

use madflow_core::{MadflowResult, SampleWidth};

use crate::sink_format::SinkFormat;

/// 输出 PCM 参数, 在写入头部时固定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmSpec {
    /// 声道数
    pub channels: u16,
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 采样宽度
    pub sample_width: SampleWidth,
}

impl PcmSpec {
    /// 每个采样帧 (所有声道各一个采样) 的字节数
    pub fn block_align(&self) -> usize {
        usize::from(self.channels) * self.sample_width.bytes_per_sample()
    }
}

impl fmt::Display for PcmSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hz, {} 声道, {}",
            self.sample_rate, self.channels, self.sample_width
        )
    }
}

/// 输出容器 trait
///
/// 使用流程:
/// 1. 调用一次 `init_header()` 固定输出参数并写入容器头部
/// 2. 循环调用 `write_frame()` 按到达顺序追加交错 PCM 数据
/// 3. 调用 `finalize()` 回填与总长度相关的头部字段
///
/// 重复调用 `init_header()` 必须返回 `HeaderAlreadyWritten` 且不改动已写入的头部,
/// 在 `init_header()` 之前调用 `write_frame()` 必须返回 `HeaderNotWritten`.
pub trait FrameSink: Send {
    /// 获取容器格式
    fn format(&self) -> SinkFormat;

    /// 写入容器头部 (每次运行只允许一次)
    fn init_header(&mut self, spec: PcmSpec) -> MadflowResult<()>;

    /// 追加一段交错 PCM 数据
    fn write_frame(&mut self, data: &[u8]) -> MadflowResult<()>;

    /// 完成输出, 回填长度字段
    fn finalize(&mut self) -> MadflowResult<()>;

    /// 已固定的输出参数 (头部写入前为 None)
    fn spec(&self) -> Option<PcmSpec>;

    /// 已写入的 PCM 数据字节数 (不含头部)
    fn data_written(&self) -> u64;
}
