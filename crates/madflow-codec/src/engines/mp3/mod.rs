//! MP3 (MPEG 音频 Layer III) 解码引擎.
//!
//! 引擎持有固定容量的输入缓冲区, 每轮先把未消费的数据移到缓冲区开头,
//! 再通过输入回调补满剩余空间, 然后同步并解码缓冲区内所有完整帧.
//! 帧内容交给 symphonia 解码, 结果按配置以 28 位定点或 f32 输出.
//!
//! 输入回调返回 0 字节后, 引擎解码缓冲区中剩余的完整帧, 丢弃末尾不完整的数据并结束.

mod header;

use log::{debug, trace, warn};
use madflow_core::crc::crc16_mpa;
use madflow_core::{FlowStatus, MadflowError, MadflowResult};
use symphonia_bundle_mp3::MpaDecoder as SymMpaDecoder;
use symphonia_core::audio::SampleBuffer;
use symphonia_core::codecs::{
    CODEC_TYPE_MP3, CodecParameters as SymCodecParameters, Decoder as SymDecoderTrait,
    DecoderOptions as SymDecoderOptions,
};
use symphonia_core::formats::Packet as SymPacket;

use crate::engine::{
    DecoderEngine, InputFlow, RunOutcome, StreamCallbacks, StreamError, StreamErrorKind,
};
use crate::frame::{PcmData, PcmFrame};
use crate::scaler::FIXED_FRAC_BITS;

pub use self::header::{ChannelMode, FrameHeader, MpegVersion};
use self::header::HEADER_SIZE;

/// 默认输入缓冲区大小
pub const DEFAULT_BUFFER_SIZE: usize = 4096;
/// Layer III 最大帧长 (MPEG1, 320 kbps, 32 kHz, 含填充)
pub const MAX_FRAME_SIZE: usize = 1441;

/// 引擎输出的采样表示
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleRepr {
    /// 28 位小数的定点
    #[default]
    Fixed,
    /// f32
    Float,
}

/// MP3 引擎选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mp3EngineOptions {
    /// 输入缓冲区大小, 不小于 `MAX_FRAME_SIZE + 4`
    pub buffer_size: usize,
    /// 输出采样表示
    pub sample_repr: SampleRepr,
}

impl Default for Mp3EngineOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            sample_repr: SampleRepr::Fixed,
        }
    }
}

/// 缓冲区扫描结果
#[derive(Debug)]
enum Scan {
    /// 需要更多数据
    NeedMore,
    /// 开头有若干字节无法同步
    Garbage(usize),
    /// 开头是一个完整帧
    Frame(FrameHeader),
    /// 流结束时剩余的不完整数据
    Truncated(usize),
}

/// 解析 `data` 开头的帧头, 没有同步字或帧头无效时返回 None
fn header_at(data: &[u8]) -> Option<FrameHeader> {
    if data.len() < HEADER_SIZE || data[0] != 0xFF || (data[1] & 0xE0) != 0xE0 {
        return None;
    }
    FrameHeader::parse_bytes(data).ok()
}

/// 确认候选帧之后紧跟另一个有效帧头
///
/// 流结束时无法确认, 直接接受. 数据不足时返回 None.
fn confirm_next(data: &[u8], at: usize, header: &FrameHeader, eof: bool) -> Option<bool> {
    let next = at + header.frame_size;
    if next + HEADER_SIZE <= data.len() {
        Some(header_at(&data[next..]).is_some())
    } else if eof {
        Some(true)
    } else {
        None
    }
}

/// 在 `data` 中寻找下一帧
///
/// `synced` 为真时开头的帧头直接接受; 否则 (包括跳过垃圾数据后重新同步)
/// 候选帧之后必须紧跟另一个有效帧头, 不满足的候选按垃圾数据跳过.
fn scan(data: &[u8], eof: bool, synced: bool) -> Scan {
    let mut i = 0;
    while i + HEADER_SIZE <= data.len() {
        if let Some(h) = header_at(&data[i..]) {
            let confirmed = if synced && i == 0 {
                Some(true)
            } else {
                confirm_next(data, i, &h, eof)
            };
            match confirmed {
                Some(true) if i > 0 => return Scan::Garbage(i),
                Some(true) => {
                    if data.len() < h.frame_size {
                        return if eof {
                            Scan::Truncated(data.len())
                        } else {
                            Scan::NeedMore
                        };
                    }
                    return Scan::Frame(h);
                }
                Some(false) => {}
                // 候选之前的字节已确定不是帧头
                None if i > 0 => return Scan::Garbage(i),
                None => return Scan::NeedMore,
            }
        }
        i += 1;
    }
    if eof && !data.is_empty() {
        Scan::Truncated(data.len())
    } else if i > 0 {
        // 保留末尾不足一个帧头的字节
        Scan::Garbage(i)
    } else {
        Scan::NeedMore
    }
}

/// CRC 错误帧的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CrcAction {
    /// 结束运行
    End(RunOutcome),
    /// 跳过该帧
    Skip,
    /// 照常解码输出, `mute` 为真时输出静音
    Keep { mute: bool },
}

/// 跟踪连续的 CRC 错误: 紧跟在错误帧之后的错误帧被静音
#[derive(Debug, Default)]
struct CrcTracker {
    bad_last_frame: bool,
}

impl CrcTracker {
    fn passed(&mut self) {
        self.bad_last_frame = false;
    }

    /// 根据错误回调的返回值决定如何处理出错的帧
    fn failed(&mut self, status: FlowStatus) -> CrcAction {
        let was_bad = self.bad_last_frame;
        self.bad_last_frame = true;
        match status {
            FlowStatus::Stop => CrcAction::End(RunOutcome::Stopped),
            FlowStatus::Break => CrcAction::End(RunOutcome::Broken),
            FlowStatus::Continue => CrcAction::Skip,
            FlowStatus::Ignore => CrcAction::Keep { mute: was_bad },
        }
    }
}

/// 把 symphonia 的平面采样拆成左右声道
fn split_planes(samples: &[f32], frames: usize, channels: usize) -> (&[f32], Option<&[f32]>) {
    let left = &samples[..frames];
    let right = (channels > 1).then(|| &samples[frames..2 * frames]);
    (left, right)
}

/// 单帧解码器, 持有 symphonia 解码器与每声道的采样缓冲
struct FrameDecoder {
    decoder: SymMpaDecoder,
    repr: SampleRepr,
    left_fixed: Vec<i32>,
    right_fixed: Vec<i32>,
    left_float: Vec<f32>,
    right_float: Vec<f32>,
    channels: u16,
    sample_rate: u32,
    length: usize,
    next_ts: u64,
}

impl FrameDecoder {
    fn new(repr: SampleRepr) -> MadflowResult<Self> {
        let sym_params = SymCodecParameters {
            codec: CODEC_TYPE_MP3,
            ..Default::default()
        };
        let decoder = SymMpaDecoder::try_new(&sym_params, &SymDecoderOptions::default())
            .map_err(|e| MadflowError::Codec(format!("symphonia mp3 初始化失败: {e}")))?;
        Ok(Self {
            decoder,
            repr,
            left_fixed: Vec::new(),
            right_fixed: Vec::new(),
            left_float: Vec::new(),
            right_float: Vec::new(),
            channels: 0,
            sample_rate: 0,
            length: 0,
            next_ts: 0,
        })
    }

    /// 解码一帧到内部缓冲, `mute` 为真时输出静音
    fn decode(&mut self, data: &[u8], header: &FrameHeader, mute: bool) -> Result<(), String> {
        let spf = header.samples_per_frame() as u64;
        let packet = SymPacket::new_from_slice(0, self.next_ts, spf, data);
        self.next_ts += spf;

        let decoded = self.decoder.decode(&packet).map_err(|e| e.to_string())?;
        let spec = *decoded.spec();
        let channels = spec.channels.count();
        let frames = decoded.frames();
        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_planar_ref(decoded);
        let samples = sample_buf.samples();

        let (left, right) = split_planes(samples, frames, channels);
        self.store(channels as u16, spec.rate, frames, left, right);
        if mute {
            self.mute();
        }
        Ok(())
    }

    /// 按帧头参数生成一帧静音
    fn silence(&mut self, header: &FrameHeader) {
        let n = header.samples_per_frame();
        let zeros = vec![0.0f32; n];
        let right = (header.channels() == 2).then_some(zeros.as_slice());
        self.store(header.channels(), header.sample_rate, n, &zeros, right);
    }

    fn store(&mut self, channels: u16, sample_rate: u32, n: usize, left: &[f32], right: Option<&[f32]>) {
        self.channels = channels;
        self.sample_rate = sample_rate;
        self.length = n;
        match self.repr {
            SampleRepr::Fixed => {
                fill_fixed(&mut self.left_fixed, left);
                fill_fixed(&mut self.right_fixed, right.unwrap_or_default());
            }
            SampleRepr::Float => {
                self.left_float.clear();
                self.left_float.extend_from_slice(left);
                self.right_float.clear();
                self.right_float.extend_from_slice(right.unwrap_or_default());
            }
        }
    }

    fn mute(&mut self) {
        self.left_fixed.fill(0);
        self.right_fixed.fill(0);
        self.left_float.fill(0.0);
        self.right_float.fill(0.0);
    }

    /// 当前帧的描述
    fn frame(&self) -> PcmFrame<'_> {
        let stereo = self.channels == 2;
        let data = match self.repr {
            SampleRepr::Fixed => PcmData::Fixed {
                frac_bits: FIXED_FRAC_BITS,
                left: &self.left_fixed,
                right: stereo.then_some(self.right_fixed.as_slice()),
            },
            SampleRepr::Float => PcmData::Float {
                left: &self.left_float,
                right: stereo.then_some(self.right_float.as_slice()),
            },
        };
        PcmFrame {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits: 32,
            length: self.length,
            data,
        }
    }
}

/// f32 映射到 28 位定点 (饱和)
fn fill_fixed(dst: &mut Vec<i32>, src: &[f32]) {
    let one = (1u32 << FIXED_FRAC_BITS) as f32;
    dst.clear();
    dst.extend(src.iter().map(|&s| (s * one) as i32));
}

/// MP3 解码引擎
pub struct Mp3Engine {
    options: Mp3EngineOptions,
    /// 输入缓冲区
    buf: Vec<u8>,
    frames: FrameDecoder,
    /// 已输出的帧数
    frames_decoded: u64,
}

impl Mp3Engine {
    /// 使用默认选项创建
    pub fn new() -> MadflowResult<Self> {
        Self::with_options(Mp3EngineOptions::default())
    }

    pub fn with_options(options: Mp3EngineOptions) -> MadflowResult<Self> {
        // 重新同步时需要看到候选帧之后的下一个帧头
        if options.buffer_size < MAX_FRAME_SIZE + HEADER_SIZE {
            return Err(MadflowError::InvalidArgument(format!(
                "引擎缓冲区 {} 字节, 不足以容纳最大帧 {MAX_FRAME_SIZE} 字节及下一帧头",
                options.buffer_size
            )));
        }
        Ok(Self {
            options,
            buf: vec![0u8; options.buffer_size],
            frames: FrameDecoder::new(options.sample_repr)?,
            frames_decoded: 0,
        })
    }

    pub fn options(&self) -> Mp3EngineOptions {
        self.options
    }

    /// 已输出的帧数
    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }
}

impl DecoderEngine for Mp3Engine {
    fn name(&self) -> &str {
        "mp3"
    }

    fn run(&mut self, callbacks: &mut dyn StreamCallbacks) -> MadflowResult<RunOutcome> {
        let capacity = self.buf.len();
        // 未消费数据为 buf[start..end], buf[0] 位于压缩流的 base 处
        let mut start = 0usize;
        let mut end = 0usize;
        let mut base = 0u64;
        let mut eof = false;
        let mut synced = false;
        let mut crc = CrcTracker::default();

        loop {
            if !eof {
                if start > 0 {
                    self.buf.copy_within(start..end, 0);
                    base += start as u64;
                    end -= start;
                    start = 0;
                }
                let room = capacity - end;
                if room == 0 {
                    return Err(MadflowError::Internal(
                        "输入缓冲区已满但没有可解码的帧".into(),
                    ));
                }
                match callbacks.input(&mut self.buf[end..]) {
                    InputFlow::Filled(0) => {
                        debug!("mp3: 输入结束, 缓冲区剩余 {} 字节", end);
                        eof = true;
                    }
                    InputFlow::Filled(n) if n > room => {
                        return Err(MadflowError::BufferOverrun {
                            capacity: room,
                            requested: n,
                        });
                    }
                    InputFlow::Filled(n) => end += n,
                    InputFlow::Status(status) => {
                        if let Some(outcome) = RunOutcome::from_status(status) {
                            debug!("mp3: 输入回调返回 {status}, 结束运行");
                            return Ok(outcome);
                        }
                    }
                }
            }

            loop {
                let offset = base + start as u64;
                let header = match scan(&self.buf[start..end], eof, synced) {
                    Scan::NeedMore => break,
                    Scan::Truncated(n) => {
                        debug!("mp3: 丢弃流末尾不完整数据 {n} 字节");
                        start += n;
                        break;
                    }
                    Scan::Garbage(n) => {
                        start += n;
                        synced = false;
                        let err = StreamError {
                            kind: StreamErrorKind::LostSync,
                            offset,
                        };
                        trace!("mp3: {err}, 跳过 {n} 字节");
                        if let Some(outcome) = RunOutcome::from_status(callbacks.error(&err)) {
                            return Ok(outcome);
                        }
                        continue;
                    }
                    Scan::Frame(h) => {
                        synced = true;
                        h
                    }
                };

                let frame_end = start + header.frame_size;
                let data = &self.buf[start..frame_end];
                start = frame_end;

                let mut mute = false;
                let mut crc_ignored = false;
                if header.has_crc {
                    let expected = u16::from_be_bytes([data[4], data[5]]);
                    let actual = crc16_mpa(&data[2..4], &data[header.side_info_range()]);
                    if expected != actual {
                        let err = StreamError {
                            kind: StreamErrorKind::BadCrc,
                            offset,
                        };
                        debug!("mp3: {err}, 期望 {expected:04X}, 实际 {actual:04X}");
                        match crc.failed(callbacks.error(&err)) {
                            CrcAction::End(outcome) => return Ok(outcome),
                            CrcAction::Skip => continue,
                            CrcAction::Keep { mute: m } => {
                                mute = m;
                                crc_ignored = true;
                            }
                        }
                    } else {
                        crc.passed();
                    }
                } else {
                    crc.passed();
                }

                if let Err(e) = self.frames.decode(data, &header, mute) {
                    if crc_ignored {
                        // 被忽略的 CRC 错误帧仍要输出
                        warn!("mp3: CRC 错误帧无法解码 ({e}), 以静音输出");
                        self.frames.silence(&header);
                    } else {
                        let err = StreamError {
                            kind: StreamErrorKind::Decode,
                            offset,
                        };
                        debug!("mp3: {err}: {e}");
                        if let Some(outcome) = RunOutcome::from_status(callbacks.error(&err)) {
                            return Ok(outcome);
                        }
                        continue;
                    }
                }

                let frame = self.frames.frame();
                trace!(
                    "mp3: 帧 #{} 偏移 {}, {} 声道, {} Hz, {} 采样{}",
                    self.frames_decoded,
                    offset,
                    frame.channels,
                    frame.sample_rate,
                    frame.length,
                    if mute { " (静音)" } else { "" },
                );
                self.frames_decoded += 1;
                if let Some(outcome) = RunOutcome::from_status(callbacks.output(&frame)) {
                    debug!("mp3: 输出回调结束运行 ({outcome})");
                    return Ok(outcome);
                }
            }

            if eof {
                debug!("mp3: 解码完成, 共 {} 帧", self.frames_decoded);
                return Ok(RunOutcome::Finished);
            }
        }
    }
}
