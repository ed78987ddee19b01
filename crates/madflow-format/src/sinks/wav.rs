//! WAV (RIFF WAVE) 输出容器.
//!
//! 将交错 PCM 数据写入标准 WAV 文件.
//!
//! 写入流程:
//! 1. `init_header()` - 写入 RIFF 和 fmt 块, 预留 data 块大小
//! 2. `write_frame()` - 追加 PCM 数据
//! 3. `finalize()` - 回填 RIFF 大小和 data 块大小

use log::{debug, warn};
use madflow_core::{MadflowError, MadflowResult};

use crate::io::IoContext;
use crate::sink::{FrameSink, PcmSpec};
use crate::sink_format::SinkFormat;

/// WAV 音频格式码: PCM 整数
const WAV_FORMAT_PCM: u16 = 0x0001;
/// RIFF 大小字段的文件偏移
const RIFF_SIZE_OFFSET: u64 = 4;
/// data 块大小字段的文件偏移: 12 (RIFF) + 24 (fmt) + 4 (data tag)
const DATA_SIZE_OFFSET: u64 = 40;
/// 头部总长度
const HEADER_SIZE: u64 = 44;

/// WAV 输出容器
pub struct WavSink {
    /// 输出上下文
    io: IoContext,
    /// 已固定的输出参数
    spec: Option<PcmSpec>,
    /// 已写入的数据字节数
    data_written: u64,
    /// 是否已完成回填
    finalized: bool,
}

impl WavSink {
    /// 创建 WAV 输出容器实例 (工厂函数)
    pub fn create(io: IoContext) -> MadflowResult<Box<dyn FrameSink>> {
        Ok(Box::new(Self::new(io)))
    }

    /// 创建 WAV 输出容器
    pub fn new(io: IoContext) -> Self {
        Self {
            io,
            spec: None,
            data_written: 0,
            finalized: false,
        }
    }

    /// 取回输出上下文
    pub fn into_inner(self) -> IoContext {
        self.io
    }
}

impl FrameSink for WavSink {
    fn format(&self) -> SinkFormat {
        SinkFormat::Wav
    }

    fn init_header(&mut self, spec: PcmSpec) -> MadflowResult<()> {
        if let Some(existing) = self.spec {
            warn!("WAV 头部已按 {existing} 写入, 拒绝改写为 {spec}");
            return Err(MadflowError::HeaderAlreadyWritten);
        }
        if spec.channels == 0 || spec.sample_rate == 0 {
            return Err(MadflowError::InvalidArgument(format!(
                "WAV 参数无效: {spec}"
            )));
        }

        let bits_per_sample = spec.sample_width.bits() as u16;
        let block_align = spec.block_align() as u16;
        let byte_rate = spec.sample_rate * u32::from(block_align);

        // RIFF header
        self.io.write_tag(b"RIFF")?;
        self.io.write_u32_le(0)?; // 占位, finalize 中回填
        self.io.write_tag(b"WAVE")?;

        // fmt chunk
        self.io.write_tag(b"fmt ")?;
        self.io.write_u32_le(16)?; // 标准 PCM fmt 块大小
        self.io.write_u16_le(WAV_FORMAT_PCM)?;
        self.io.write_u16_le(spec.channels)?;
        self.io.write_u32_le(spec.sample_rate)?;
        self.io.write_u32_le(byte_rate)?;
        self.io.write_u16_le(block_align)?;
        self.io.write_u16_le(bits_per_sample)?;

        // data chunk header
        self.io.write_tag(b"data")?;
        self.io.write_u32_le(0)?; // 占位, finalize 中回填

        self.spec = Some(spec);
        self.data_written = 0;

        debug!(
            "WAV 写入头部: {} Hz, {} 声道, {} 位",
            spec.sample_rate, spec.channels, bits_per_sample,
        );

        Ok(())
    }

    fn write_frame(&mut self, data: &[u8]) -> MadflowResult<()> {
        if self.spec.is_none() {
            return Err(MadflowError::HeaderNotWritten);
        }
        self.io.write_all(data)?;
        self.data_written += data.len() as u64;
        Ok(())
    }

    fn finalize(&mut self) -> MadflowResult<()> {
        if self.finalized || self.spec.is_none() {
            return Ok(());
        }
        self.finalized = true;

        // RIFF 块要求偶数长度, 奇数时补一个填充字节
        let pad = self.data_written % 2;
        if pad == 1 {
            self.io.write_all(&[0])?;
        }

        if !self.io.is_seekable() {
            debug!("WAV 输出不支持 seek, 无法回填大小字段");
            return self.io.flush();
        }

        let max_data = u64::from(u32::MAX) - (HEADER_SIZE - 8) - pad;
        if self.data_written > max_data {
            warn!(
                "WAV 数据 {} 字节超出 32 位长度字段, 大小字段将被截断",
                self.data_written
            );
        }
        let data_size = self.data_written.min(max_data) as u32;
        let riff_size = (HEADER_SIZE - 8) as u32 + data_size + pad as u32; // 整个文件大小 - 8

        // 回填 RIFF 大小
        self.io.seek(std::io::SeekFrom::Start(RIFF_SIZE_OFFSET))?;
        self.io.write_u32_le(riff_size)?;

        // 回填 data 块大小
        self.io.seek(std::io::SeekFrom::Start(DATA_SIZE_OFFSET))?;
        self.io.write_u32_le(data_size)?;

        self.io.seek(std::io::SeekFrom::End(0))?;
        self.io.flush()?;

        debug!(
            "WAV 写入尾部: riff_size={}, data_size={}",
            riff_size, data_size,
        );

        Ok(())
    }

    fn spec(&self) -> Option<PcmSpec> {
        self.spec
    }

    fn data_written(&self) -> u64 {
        self.data_written
    }
}
