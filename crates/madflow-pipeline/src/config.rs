//! 管线配置.

use madflow_codec::OutputFormat;
use madflow_codec::engines::mp3::{Mp3EngineOptions, SampleRepr};
use madflow_core::{MadflowError, MadflowResult};
use madflow_format::SinkFormat;

/// 默认输入缓冲区大小, 与 MP3 引擎缓冲区一致
pub const DEFAULT_INPUT_BUFFER_SIZE: usize = 4096;
/// 默认进度日志间隔 (字节)
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 4096;

/// 管线配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// 引擎输入缓冲区大小
    pub input_buffer_size: usize,
    /// 输入回调最大调用次数, 超出后返回 Stop (None 表示不限)
    pub max_input_calls: Option<u64>,
    /// 每送入多少字节输出一条进度日志, 0 表示关闭
    pub progress_interval: u64,
    /// 输出采样格式
    pub output: OutputFormat,
    /// 是否跳过开头的 ID3v2 标签
    pub skip_id3: bool,
    /// 引擎内部采样表示
    pub sample_repr: SampleRepr,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_buffer_size: DEFAULT_INPUT_BUFFER_SIZE,
            max_input_calls: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            output: OutputFormat::default(),
            skip_id3: true,
            sample_repr: SampleRepr::Fixed,
        }
    }
}

impl PipelineConfig {
    /// 检查配置能否用于指定的输出容器
    pub fn validate(&self, sink: SinkFormat) -> MadflowResult<()> {
        if self.input_buffer_size == 0 {
            return Err(MadflowError::InvalidArgument("输入缓冲区大小不能为 0".into()));
        }
        if !sink.supports_endian(self.output.endian) {
            return Err(MadflowError::InvalidArgument(format!(
                "{sink} 输出不支持 {} 字节序",
                self.output.endian
            )));
        }
        Ok(())
    }

    /// 对应的 MP3 引擎选项
    pub fn engine_options(&self) -> Mp3EngineOptions {
        Mp3EngineOptions {
            buffer_size: self.input_buffer_size,
            sample_repr: self.sample_repr,
        }
    }
}
