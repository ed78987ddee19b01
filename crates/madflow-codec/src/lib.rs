//! # madflow-codec
//!
//! madflow 解码侧: 解码引擎边界、PCM 帧描述与采样缩放.
//!
//! 引擎通过 [`StreamCallbacks`] 向调用方拉取压缩数据并推送解码后的 PCM 帧,
//! 调用方通过 [`FlowStatus`](madflow_core::FlowStatus) 控制运行流程.

pub mod engine;
pub mod engines;
pub mod frame;
pub mod scaler;

pub use engine::{
    DecoderEngine, InputFlow, RunOutcome, StreamCallbacks, StreamError, StreamErrorKind,
    default_error_policy,
};
pub use frame::{PcmData, PcmFrame};
pub use scaler::{FIXED_FRAC_BITS, OutputFormat, SampleScaler};
