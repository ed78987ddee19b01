//! madflow - MP3 流式解码命令行工具
//!
//! 读取 MPEG 音频 Layer III 码流, 解码后写入 WAV 或裸 PCM.
//! 输入输出均可使用 "-" 表示标准输入/标准输出.

mod logging;

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use log::{error, info, warn};
use serde::Serialize;

use madflow_codec::OutputFormat;
use madflow_codec::engines::mp3::SampleRepr;
use madflow_core::{Endian, SampleWidth};
use madflow_format::id3::{Id3Flags, Id3Header};
use madflow_format::io::StdinBackend;
use madflow_format::{BufferedSource, IoContext, SinkFormat, create_sink};
use madflow_pipeline::{PipelineConfig, decode_mp3};

/// 输出容器
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Wav,
    Raw,
}

impl From<FormatArg> for SinkFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Wav => SinkFormat::Wav,
            FormatArg::Raw => SinkFormat::RawPcm,
        }
    }
}

/// 输出字节序
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EndianArg {
    Little,
    Big,
}

impl From<EndianArg> for Endian {
    fn from(value: EndianArg) -> Self {
        match value {
            EndianArg::Little => Endian::Little,
            EndianArg::Big => Endian::Big,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "madflow", version, about = "MP3 流式解码为 WAV/裸 PCM")]
struct Cli {
    /// 输入文件路径 ("-" 表示标准输入)
    #[arg(short, long)]
    input: String,

    /// 输出文件路径 ("-" 表示标准输出)
    #[arg(short, long)]
    output: Option<String>,

    /// 输出容器 (默认按输出文件扩展名推断)
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// 输出采样位数 (8/16/24)
    #[arg(long, default_value_t = 16)]
    bits: u32,

    /// 输出字节序 (WAV 只支持 little)
    #[arg(long, value_enum, default_value_t = EndianArg::Little)]
    endian: EndianArg,

    /// 引擎输入缓冲区大小 (字节)
    #[arg(long, default_value_t = madflow_pipeline::config::DEFAULT_INPUT_BUFFER_SIZE)]
    buffer_size: usize,

    /// 输入回调最大调用次数
    #[arg(long)]
    max_input_calls: Option<u64>,

    /// 不跳过开头的 ID3v2 标签
    #[arg(long)]
    no_skip_id3: bool,

    /// 引擎以 f32 输出采样 (默认 28 位定点)
    #[arg(long)]
    float: bool,

    /// 只打印 ID3v2 标签头信息 (JSON) 后退出
    #[arg(long)]
    id3: bool,

    /// 覆盖输出文件
    #[arg(short = 'y', long)]
    overwrite: bool,

    /// 日志级别 (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// 由命令行参数构建管线配置
    fn pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        let Some(width) = SampleWidth::from_bits(self.bits) else {
            bail!("不支持的采样位数 {}, 可选 8/16/24", self.bits);
        };
        Ok(PipelineConfig {
            input_buffer_size: self.buffer_size,
            max_input_calls: self.max_input_calls,
            output: OutputFormat::new(width, self.endian.into()),
            skip_id3: !self.no_skip_id3,
            sample_repr: if self.float {
                SampleRepr::Float
            } else {
                SampleRepr::Fixed
            },
            ..Default::default()
        })
    }

    /// 确定输出容器
    fn sink_format(&self, output: &str) -> anyhow::Result<SinkFormat> {
        if let Some(format) = self.format {
            return Ok(format.into());
        }
        if output == "-" {
            return Ok(SinkFormat::RawPcm);
        }
        SinkFormat::from_filename(output)
            .with_context(|| format!("无法从 '{output}' 推断输出格式, 请使用 --format"))
    }
}

// ============================================================
// JSON 输出结构体
// ============================================================

/// ID3v2 探测结果
#[derive(Serialize)]
struct Id3Info {
    present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    flags: Option<Id3FlagsInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag_len: Option<u32>,
    /// 需要跳过的字节数
    skip_len: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    skip_len_with_footer: Option<u64>,
}

#[derive(Serialize)]
struct Id3FlagsInfo {
    unsynchronisation: bool,
    extended_header: bool,
    experimental: bool,
    footer: bool,
}

impl From<Option<Id3Header>> for Id3Info {
    fn from(header: Option<Id3Header>) -> Self {
        match header {
            Some(h) => Self {
                present: true,
                version: Some(h.version()),
                flags: Some(Id3FlagsInfo {
                    unsynchronisation: h.flags.contains(Id3Flags::UNSYNCHRONISATION),
                    extended_header: h.flags.contains(Id3Flags::EXTENDED_HEADER),
                    experimental: h.flags.contains(Id3Flags::EXPERIMENTAL),
                    footer: h.flags.contains(Id3Flags::FOOTER),
                }),
                tag_len: Some(h.tag_len),
                skip_len: h.skip_len(),
                skip_len_with_footer: Some(h.skip_len_with_footer()),
            },
            None => Self {
                present: false,
                version: None,
                flags: None,
                tag_len: None,
                skip_len: 0,
                skip_len_with_footer: None,
            },
        }
    }
}

fn open_input(path: &str) -> anyhow::Result<BufferedSource> {
    if path == "-" {
        return Ok(BufferedSource::stdin());
    }
    BufferedSource::open(path).with_context(|| format!("无法打开输入文件 '{path}'"))
}

/// 打印 ID3v2 标签头信息
fn print_id3(cli: &Cli) -> anyhow::Result<()> {
    let mut io = if cli.input == "-" {
        IoContext::new(Box::new(StdinBackend::new()))
    } else {
        IoContext::open_read(&cli.input)
            .with_context(|| format!("无法打开输入文件 '{}'", cli.input))?
    };
    let header = Id3Header::probe(&mut io).context("读取输入失败")?;
    let info = Id3Info::from(header);
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

/// 执行解码, 返回是否成功
fn decode(cli: &Cli) -> anyhow::Result<bool> {
    let Some(output) = cli.output.as_deref() else {
        bail!("必须指定输出文件 (-o <输出文件>)");
    };
    let config = cli.pipeline_config()?;
    let format = cli.sink_format(output)?;
    config
        .validate(format)
        .with_context(|| format!("输出参数与 {format} 不兼容"))?;

    if output != "-" && !cli.overwrite && Path::new(output).exists() {
        bail!("输出文件已存在 '{output}', 使用 -y 覆盖");
    }

    info!(
        "madflow 版本 {}: {} -> {} ({format}, {})",
        env!("CARGO_PKG_VERSION"),
        cli.input,
        output,
        config.output
    );

    let mut source = open_input(&cli.input)?;
    let io = if output == "-" {
        if format == SinkFormat::Wav {
            warn!("WAV 写入标准输出, 头部大小字段无法回填");
        }
        IoContext::stdout()
    } else {
        IoContext::open_write(output).with_context(|| format!("无法创建输出文件 '{output}'"))?
    };
    let mut sink = create_sink(format, io)?;

    let report = decode_mp3(&mut source, sink.as_mut(), &config)?;
    if let Some(tag) = &report.id3 {
        info!("已跳过 {tag}");
    }
    if let Some(spec) = report.spec {
        info!("输出参数: {spec}");
    }
    info!("{report}");
    if let Some(err) = &report.error {
        error!("解码中断: {err}");
    }
    Ok(report.is_success())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = logging::init("madflow", cli.verbose) {
        eprintln!("警告: 日志初始化失败: {e:#}");
    }

    let result = if cli.id3 {
        print_id3(&cli).map(|()| true)
    } else {
        decode(&cli)
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e:#}");
            eprintln!("错误: {e:#}");
            ExitCode::FAILURE
        }
    }
}
