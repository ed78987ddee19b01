//! 输出容器格式标识符.

use std::fmt;

use madflow_core::Endian;

/// 输出容器格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkFormat {
    /// WAV (RIFF WAVE)
    Wav,
    /// 裸 PCM (无头部)
    RawPcm,
}

impl SinkFormat {
    /// 获取格式的名称
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::RawPcm => "raw",
        }
    }

    /// 获取格式常用的文件扩展名
    pub const fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Wav => &["wav"],
            Self::RawPcm => &["pcm", "raw"],
        }
    }

    /// 从文件名推断格式
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = std::path::Path::new(filename)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();
        [Self::Wav, Self::RawPcm]
            .into_iter()
            .find(|f| f.extensions().contains(&ext.as_str()))
    }

    /// 从名称解析格式 (如命令行参数)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "wav" => Some(Self::Wav),
            "raw" | "pcm" => Some(Self::RawPcm),
            _ => None,
        }
    }

    /// 容器是否支持指定字节序
    pub const fn supports_endian(&self, endian: Endian) -> bool {
        match self {
            Self::Wav => matches!(endian, Endian::Little),
            Self::RawPcm => true,
        }
    }
}

impl fmt::Display for SinkFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_从文件名推断() {
        assert_eq!(SinkFormat::from_filename("out.wav"), Some(SinkFormat::Wav));
        assert_eq!(SinkFormat::from_filename("OUT.WAV"), Some(SinkFormat::Wav));
        assert_eq!(
            SinkFormat::from_filename("dir/out.pcm"),
            Some(SinkFormat::RawPcm)
        );
        assert_eq!(SinkFormat::from_filename("out.raw"), Some(SinkFormat::RawPcm));
        assert_eq!(SinkFormat::from_filename("out.mp3"), None);
        assert_eq!(SinkFormat::from_filename("noext"), None);
    }

    #[test]
    fn test_字节序支持() {
        assert!(SinkFormat::Wav.supports_endian(Endian::Little));
        assert!(!SinkFormat::Wav.supports_endian(Endian::Big));
        assert!(SinkFormat::RawPcm.supports_endian(Endian::Big));
    }
}
