//! 解码引擎 trait 定义.
//!
//! 引擎拥有唯一的解码循环, 通过 [`StreamCallbacks`] 向调用方拉取压缩数据、
//! 推送解码结果、报告可恢复错误. 所有回调在同一线程上同步执行.

use std::fmt;

use madflow_core::{FlowStatus, MadflowResult};

use crate::frame::PcmFrame;

/// 输入回调的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFlow {
    /// 已写入缓冲区的字节数, 0 表示流结束
    Filled(usize),
    /// 流程控制 (不提供数据)
    Status(FlowStatus),
}

/// 可恢复的码流错误类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamErrorKind {
    /// 丢失帧同步, 跳过了无法识别的字节
    LostSync,
    /// 帧 CRC 校验失败
    BadCrc,
    /// 帧内容无法解码
    Decode,
}

impl fmt::Display for StreamErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::LostSync => "丢失同步",
            Self::BadCrc => "CRC 校验失败",
            Self::Decode => "解码失败",
        };
        f.write_str(s)
    }
}

/// 报告给错误回调的码流错误
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind} (流偏移 {offset})")]
pub struct StreamError {
    /// 错误类型
    pub kind: StreamErrorKind,
    /// 出错位置在压缩流中的偏移 (字节)
    pub offset: u64,
}

/// 一次运行的结束方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// 输入结束, 已处理完所有完整帧
    Finished,
    /// 回调返回 `Stop`
    Stopped,
    /// 回调返回 `Break`
    Broken,
}

impl RunOutcome {
    /// 由终止性流程状态得到结束方式
    pub fn from_status(status: FlowStatus) -> Option<Self> {
        match status {
            FlowStatus::Stop => Some(Self::Stopped),
            FlowStatus::Break => Some(Self::Broken),
            FlowStatus::Continue | FlowStatus::Ignore => None,
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Finished => "finished",
            Self::Stopped => "stopped",
            Self::Broken => "broken",
        };
        f.write_str(s)
    }
}

/// 默认错误策略: CRC 错误忽略 (仍输出该帧), 其余错误跳过该帧继续
pub fn default_error_policy(err: &StreamError) -> FlowStatus {
    match err.kind {
        StreamErrorKind::BadCrc => FlowStatus::Ignore,
        StreamErrorKind::LostSync | StreamErrorKind::Decode => FlowStatus::Continue,
    }
}

/// 引擎回调集合
pub trait StreamCallbacks {
    /// 向 `buf` 写入压缩数据
    ///
    /// 返回 `Filled(n)` 时 `n` 不得超过 `buf.len()`, `Filled(0)` 表示流结束.
    fn input(&mut self, buf: &mut [u8]) -> InputFlow;

    /// 接收一帧解码后的 PCM
    ///
    /// `frame` 只在本次调用期间有效.
    fn output(&mut self, frame: &PcmFrame<'_>) -> FlowStatus;

    /// 处理可恢复的码流错误
    ///
    /// - `Ignore`: 对 CRC 错误表示仍输出该帧
    /// - `Continue`: 跳过出错的帧
    /// - `Stop` / `Break`: 结束运行
    fn error(&mut self, err: &StreamError) -> FlowStatus {
        default_error_policy(err)
    }
}

/// 解码引擎 trait
///
/// 运行流程:
/// 1. 调用 `input` 补充压缩数据
/// 2. 在内部缓冲区中同步并解码完整的帧, 每帧调用一次 `output`
/// 3. 重复直到输入结束或某个回调返回终止状态
///
/// 回调返回的终止状态反映在 [`RunOutcome`] 中; 只有引擎自身无法继续时
/// (如回调违反约定) 才返回 `Err`.
pub trait DecoderEngine {
    /// 获取引擎名称
    fn name(&self) -> &str;

    /// 运行解码循环直到结束
    fn run(&mut self, callbacks: &mut dyn StreamCallbacks) -> MadflowResult<RunOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_默认错误策略() {
        let err = |kind| StreamError { kind, offset: 0 };
        assert_eq!(
            default_error_policy(&err(StreamErrorKind::BadCrc)),
            FlowStatus::Ignore
        );
        assert_eq!(
            default_error_policy(&err(StreamErrorKind::LostSync)),
            FlowStatus::Continue
        );
        assert_eq!(
            default_error_policy(&err(StreamErrorKind::Decode)),
            FlowStatus::Continue
        );
    }

    #[test]
    fn test_终止状态映射() {
        assert_eq!(RunOutcome::from_status(FlowStatus::Stop), Some(RunOutcome::Stopped));
        assert_eq!(RunOutcome::from_status(FlowStatus::Break), Some(RunOutcome::Broken));
        assert_eq!(RunOutcome::from_status(FlowStatus::Continue), None);
        assert_eq!(RunOutcome::from_status(FlowStatus::Ignore), None);
    }

    #[test]
    fn test_错误信息() {
        let err = StreamError {
            kind: StreamErrorKind::LostSync,
            offset: 42,
        };
        assert_eq!(err.to_string(), "丢失同步 (流偏移 42)");
    }
}
