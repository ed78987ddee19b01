//! 运行报告.

use std::fmt;

use madflow_codec::RunOutcome;
use madflow_core::MadflowError;
use madflow_format::{Id3Header, PcmSpec};

/// 一次解码运行的结果汇总
#[derive(Debug)]
pub struct DecodeReport {
    /// 结束方式
    pub outcome: RunOutcome,
    /// 写入输出容器的帧数
    pub frames_written: u64,
    /// 送入引擎的压缩字节数 (不含跳过的 ID3v2 标签)
    pub bytes_in: u64,
    /// 写出的 PCM 字节数 (不含容器头部)
    pub pcm_bytes_out: u64,
    /// 输入回调调用次数
    pub input_calls: u64,
    /// 引擎报告的可恢复错误数
    pub stream_errors: u64,
    /// 输出参数 (没有写出任何帧时为 None)
    pub spec: Option<PcmSpec>,
    /// 跳过的 ID3v2 标签
    pub id3: Option<Id3Header>,
    /// 第一个导致运行中断的错误
    pub error: Option<MadflowError>,
}

impl DecodeReport {
    /// 运行是否成功 (正常结束或被主动停止, 且没有错误)
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.outcome != RunOutcome::Broken
    }
}

impl fmt::Display for DecodeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} 帧, 输入 {} 字节, 输出 {} 字节, {} 次输入回调",
            self.outcome, self.frames_written, self.bytes_in, self.pcm_bytes_out, self.input_calls
        )?;
        if self.stream_errors > 0 {
            write!(f, ", {} 个码流错误", self.stream_errors)?;
        }
        if let Some(err) = &self.error {
            write!(f, ", 错误: {err}")?;
        }
        Ok(())
    }
}
