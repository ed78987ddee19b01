//! 管线上下文: 输入回调与输出回调的状态.
//!
//! 一次运行创建一个 [`PipelineContext`], 由引擎以可变借用持有.
//! 流游标、头部状态与调用计数都是上下文的字段.

use std::collections::HashSet;

use log::{debug, error, warn};
use madflow_codec::{
    InputFlow, PcmData, PcmFrame, SampleScaler, StreamCallbacks, StreamError, default_error_policy,
};
use madflow_core::{FlowStatus, MadflowError, MadflowResult};
use madflow_format::{BufferedSource, FrameSink, PcmSpec};

use crate::config::PipelineConfig;

/// 管线上下文
pub struct PipelineContext<'a> {
    source: &'a mut BufferedSource,
    sink: &'a mut dyn FrameSink,
    scaler: SampleScaler,
    max_input_calls: Option<u64>,
    progress_interval: u64,
    /// 探测 ID3v2 时预读、需要先交给引擎的字节
    pending: Vec<u8>,
    /// 累计送入引擎的字节数
    cursor: u64,
    input_calls: u64,
    /// 已写入的头部参数
    header: Option<PcmSpec>,
    /// 已告警过的 (声道数, 采样率)
    warned_formats: HashSet<(u16, u32)>,
    frames_written: u64,
    pcm_bytes_out: u64,
    stream_errors: u64,
    first_error: Option<MadflowError>,
}

impl<'a> PipelineContext<'a> {
    pub fn new(
        source: &'a mut BufferedSource,
        sink: &'a mut dyn FrameSink,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            source,
            sink,
            scaler: SampleScaler::new(config.output),
            max_input_calls: config.max_input_calls,
            progress_interval: config.progress_interval,
            pending: Vec::new(),
            cursor: 0,
            input_calls: 0,
            header: None,
            warned_formats: HashSet::new(),
            frames_written: 0,
            pcm_bytes_out: 0,
            stream_errors: 0,
            first_error: None,
        }
    }

    /// 设置在读取输入源之前先交给引擎的字节
    pub fn set_pending(&mut self, bytes: Vec<u8>) {
        self.pending = bytes;
    }

    /// 累计送入引擎的字节数
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn input_calls(&self) -> u64 {
        self.input_calls
    }

    pub fn header(&self) -> Option<PcmSpec> {
        self.header
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn pcm_bytes_out(&self) -> u64 {
        self.pcm_bytes_out
    }

    pub fn stream_errors(&self) -> u64 {
        self.stream_errors
    }

    /// 取出第一个记录的错误
    pub fn take_error(&mut self) -> Option<MadflowError> {
        self.first_error.take()
    }

    /// 记录错误并返回 Break
    pub fn record_error(&mut self, err: MadflowError) -> FlowStatus {
        if err.is_contract_violation() {
            error!("调用约定被破坏: {err}");
        } else {
            error!("{err}");
        }
        if self.first_error.is_none() {
            self.first_error = Some(err);
        }
        FlowStatus::Break
    }

    /// 推进流游标, 跨过进度间隔时输出日志
    fn advance(&mut self, n: usize) {
        let before = self.cursor;
        self.cursor += n as u64;
        if self.progress_interval > 0
            && self.cursor / self.progress_interval > before / self.progress_interval
        {
            debug!("已送入引擎 {} 字节", self.cursor);
        }
    }

    fn fill(&mut self, buf: &mut [u8]) -> MadflowResult<usize> {
        let mut filled = 0;
        if !self.pending.is_empty() {
            filled = self.pending.len().min(buf.len());
            buf[..filled].copy_from_slice(&self.pending[..filled]);
            self.pending.drain(..filled);
        }
        if filled < buf.len() {
            filled += self.source.fill(&mut buf[filled..])?;
        }
        Ok(filled)
    }

    /// 固定头部参数, 只在第一帧时写入
    fn commit_header(&mut self, frame: &PcmFrame<'_>) -> MadflowResult<PcmSpec> {
        if let Some(spec) = self.header {
            if (spec.channels != frame.channels || spec.sample_rate != frame.sample_rate)
                && self.warned_formats.insert((frame.channels, frame.sample_rate))
            {
                warn!(
                    "帧格式变为 {} 声道 {} Hz, 输出仍按头部 {spec} 写入",
                    frame.channels, frame.sample_rate
                );
            }
            return Ok(spec);
        }

        let spec = PcmSpec {
            channels: frame.channels,
            sample_rate: frame.sample_rate,
            sample_width: self.scaler.format().width,
        };
        self.sink.init_header(spec)?;
        self.header = Some(spec);
        debug!("输出头部: {spec}, {}", self.scaler.format());
        Ok(spec)
    }

    fn write_frame(&mut self, frame: &PcmFrame<'_>) -> MadflowResult<()> {
        frame.validate()?;
        let spec = self.commit_header(frame)?;

        if let PcmData::Fixed { frac_bits, .. } = frame.data {
            if frac_bits != self.scaler.frac_bits() {
                self.scaler = SampleScaler::with_frac_bits(self.scaler.format(), frac_bits)
                    .map_err(|e| MadflowError::InvalidFrame(e.to_string()))?;
            }
        }

        let channels = usize::from(spec.channels);
        let mut out = vec![0u8; spec.block_align() * frame.length];
        let scaler = self.scaler;
        match frame.data {
            PcmData::Fixed { left, right, .. } => {
                interleave(&scaler, &mut out, channels, frame.length, left, right, |s, v| {
                    s.scale_fixed(v)
                })
            }
            PcmData::Float { left, right } => {
                interleave(&scaler, &mut out, channels, frame.length, left, right, |s, v| {
                    s.scale_float(v)
                })
            }
        }

        self.sink.write_frame(&out)?;
        self.frames_written += 1;
        self.pcm_bytes_out += out.len() as u64;
        Ok(())
    }
}

/// 缩放并交错写入一帧
///
/// 输出声道数以头部为准: 单声道数据写入双声道时左声道复制到两个位置,
/// 双声道数据写入单声道时只保留左声道.
fn interleave<T: Copy>(
    scaler: &SampleScaler,
    out: &mut [u8],
    channels: usize,
    length: usize,
    left: &[T],
    right: Option<&[T]>,
    scale: impl Fn(&SampleScaler, T) -> i32,
) {
    let bps = scaler.format().bytes_per_sample();
    for i in 0..length {
        let offset = i * channels * bps;
        let l = scale(scaler, left[i]);
        scaler.write_sample(&mut out[offset..], l);
        if channels == 2 {
            let r = right.map_or(l, |r| scale(scaler, r[i]));
            scaler.write_sample(&mut out[offset + bps..], r);
        }
    }
}

impl StreamCallbacks for PipelineContext<'_> {
    fn input(&mut self, buf: &mut [u8]) -> InputFlow {
        self.input_calls += 1;
        if self.max_input_calls.is_some_and(|max| self.input_calls > max) {
            debug!("输入回调调用次数达到上限, 停止运行");
            return InputFlow::Status(FlowStatus::Stop);
        }

        match self.fill(buf) {
            Ok(n) => {
                self.advance(n);
                InputFlow::Filled(n)
            }
            Err(e) => InputFlow::Status(self.record_error(e)),
        }
    }

    fn output(&mut self, frame: &PcmFrame<'_>) -> FlowStatus {
        match self.write_frame(frame) {
            Ok(()) => FlowStatus::Continue,
            Err(e) => self.record_error(e),
        }
    }

    fn error(&mut self, err: &StreamError) -> FlowStatus {
        self.stream_errors += 1;
        let status = default_error_policy(err);
        debug!("码流错误: {err}, 处理为 {status}");
        status
    }
}
