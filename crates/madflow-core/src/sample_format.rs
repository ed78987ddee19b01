//! 输出 PCM 采样宽度与字节序定义.

use std::fmt;

/// 输出 PCM 的采样宽度
///
/// 8 位为无符号偏移码 (WAV 约定), 16/24 位为有符号补码.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SampleWidth {
    /// 无符号 8 位
    U8,
    /// 有符号 16 位
    #[default]
    S16,
    /// 有符号 24 位 (3 字节打包)
    S24,
}

impl SampleWidth {
    /// 有效位数
    pub const fn bits(&self) -> u32 {
        match self {
            Self::U8 => 8,
            Self::S16 => 16,
            Self::S24 => 24,
        }
    }

    /// 每个采样点占用的字节数
    pub const fn bytes_per_sample(&self) -> usize {
        match self {
            Self::U8 => 1,
            Self::S16 => 2,
            Self::S24 => 3,
        }
    }

    /// 从位数构造
    pub const fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            8 => Some(Self::U8),
            16 => Some(Self::S16),
            24 => Some(Self::S24),
            _ => None,
        }
    }
}

impl fmt::Display for SampleWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::U8 => "u8",
            Self::S16 => "s16",
            Self::S24 => "s24",
        };
        write!(f, "{name}")
    }
}

/// 多字节采样的字节序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Endian {
    /// 小端 (WAV 要求)
    #[default]
    Little,
    /// 大端
    Big,
}

impl fmt::Display for Endian {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Little => write!(f, "le"),
            Self::Big => write!(f, "be"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_采样宽度() {
        assert_eq!(SampleWidth::U8.bytes_per_sample(), 1);
        assert_eq!(SampleWidth::S16.bytes_per_sample(), 2);
        assert_eq!(SampleWidth::S24.bytes_per_sample(), 3);
        assert_eq!(SampleWidth::from_bits(24), Some(SampleWidth::S24));
        assert_eq!(SampleWidth::from_bits(32), None);
    }

    #[test]
    fn test_显示名称() {
        assert_eq!(SampleWidth::S16.to_string(), "s16");
        assert_eq!(Endian::Big.to_string(), "be");
    }
}
