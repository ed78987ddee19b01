//! 裸 PCM 输出容器.
//!
//! 无头部, 按到达顺序直接写出交错 PCM 数据. 字节序由上游决定.

use log::{debug, warn};
use madflow_core::{MadflowError, MadflowResult};

use crate::io::IoContext;
use crate::sink::{FrameSink, PcmSpec};
use crate::sink_format::SinkFormat;

/// 裸 PCM 输出容器
pub struct RawPcmSink {
    io: IoContext,
    spec: Option<PcmSpec>,
    data_written: u64,
    finalized: bool,
}

impl RawPcmSink {
    /// 创建裸 PCM 输出容器实例 (工厂函数)
    pub fn create(io: IoContext) -> MadflowResult<Box<dyn FrameSink>> {
        Ok(Box::new(Self::new(io)))
    }

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

impl FrameSink for RawPcmSink {
    fn format(&self) -> SinkFormat {
        SinkFormat::RawPcm
    }

    fn init_header(&mut self, spec: PcmSpec) -> MadflowResult<()> {
        if let Some(existing) = self.spec {
            warn!("裸 PCM 参数已固定为 {existing}, 拒绝改写为 {spec}");
            return Err(MadflowError::HeaderAlreadyWritten);
        }
        // 没有头部可写, 只记录参数
        debug!("裸 PCM 输出: {spec}");
        self.spec = Some(spec);
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
        if self.finalized {
            return Ok(());
        }
        self.finalized = true;
        self.io.flush()
    }

    fn spec(&self) -> Option<PcmSpec> {
        self.spec
    }

    fn data_written(&self) -> u64 {
        self.data_written
    }
}
