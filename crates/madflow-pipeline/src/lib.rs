//! # madflow-pipeline
//!
//! 回调驱动的流式解码管线.
//!
//! [`run`] 把有界输入源、解码引擎与输出容器连接起来:
//! 引擎通过 [`PipelineContext`] 拉取压缩数据, 解码后的帧经缩放、交错后写入容器.
//! 无论运行以何种方式结束, 输出容器都会被 finalize.

pub mod config;
pub mod context;
pub mod report;

use log::{debug, error, info, warn};
use madflow_codec::engines::mp3::Mp3Engine;
use madflow_codec::{DecoderEngine, RunOutcome};
use madflow_core::MadflowResult;
use madflow_format::id3::{ID3V2_HEADER_SIZE, Id3Header};
use madflow_format::{BufferedSource, FrameSink};

pub use config::PipelineConfig;
pub use context::PipelineContext;
pub use report::DecodeReport;

/// 探测并跳过 ID3v2 标签
///
/// 返回标签头 (如果有) 和需要重新交给引擎的预读字节.
fn skip_id3(source: &mut BufferedSource) -> MadflowResult<(Option<Id3Header>, Vec<u8>)> {
    let mut peek = [0u8; ID3V2_HEADER_SIZE];
    let n = source.fill(&mut peek)?;
    match Id3Header::parse(&peek[..n]) {
        Some(tag) => {
            // v2.4 尾部也不属于音频数据
            let body = tag.skip_len_with_footer() - ID3V2_HEADER_SIZE as u64;
            let skipped = source.discard(body)?;
            if skipped < body {
                warn!("{tag} 超出输入长度, 只跳过了 {} 字节", skipped);
            }
            debug!("跳过 {tag}, 共 {} 字节", ID3V2_HEADER_SIZE as u64 + skipped);
            Ok((Some(tag), Vec::new()))
        }
        None => Ok((None, peek[..n].to_vec())),
    }
}

/// 运行一次解码
///
/// 只有配置无效时返回 `Err`; 运行期间的错误记录在报告的 `error` 字段中.
pub fn run(
    engine: &mut dyn DecoderEngine,
    source: &mut BufferedSource,
    sink: &mut dyn FrameSink,
    config: &PipelineConfig,
) -> MadflowResult<DecodeReport> {
    config.validate(sink.format())?;
    debug!(
        "开始解码: 引擎 {}, 输出 {} ({})",
        engine.name(),
        sink.format(),
        config.output
    );

    let (id3, pending, mut run_error) = if config.skip_id3 {
        match skip_id3(source) {
            Ok((id3, pending)) => (id3, pending, None),
            Err(e) => {
                error!("探测 ID3v2 标签失败: {e}");
                (None, Vec::new(), Some(e))
            }
        }
    } else {
        (None, Vec::new(), None)
    };

    let mut ctx = PipelineContext::new(source, sink, config);
    ctx.set_pending(pending);

    let outcome = if run_error.is_some() {
        RunOutcome::Broken
    } else {
        match engine.run(&mut ctx) {
            Ok(outcome) => outcome,
            Err(e) => {
                ctx.record_error(e);
                RunOutcome::Broken
            }
        }
    };
    if run_error.is_none() {
        run_error = ctx.take_error();
    }

    let mut report = DecodeReport {
        outcome,
        frames_written: ctx.frames_written(),
        bytes_in: ctx.cursor(),
        pcm_bytes_out: ctx.pcm_bytes_out(),
        input_calls: ctx.input_calls(),
        stream_errors: ctx.stream_errors(),
        spec: ctx.header(),
        id3,
        error: run_error,
    };
    drop(ctx);

    if let Err(e) = sink.finalize() {
        warn!("输出 finalize 失败: {e}");
        if report.error.is_none() {
            report.error = Some(e);
        }
    }

    info!("解码结束 {report}");
    Ok(report)
}

/// 使用 MP3 引擎解码
pub fn decode_mp3(
    source: &mut BufferedSource,
    sink: &mut dyn FrameSink,
    config: &PipelineConfig,
) -> MadflowResult<DecodeReport> {
    config.validate(sink.format())?;
    let mut engine = Mp3Engine::with_options(config.engine_options())?;
    run(&mut engine, source, sink, config)
}
