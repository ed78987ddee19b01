//! 解码流控状态.
//!
//! 回调通过返回 [`FlowStatus`] 告知解码引擎下一步动作.
//! 数值与引擎 ABI 保持一致, 只在边界处与裸整数互转.

use std::fmt;

/// 回调返回给解码引擎的流控状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum FlowStatus {
    /// 继续解码
    #[default]
    Continue = 0x0000,
    /// 正常结束解码
    Stop = 0x0010,
    /// 中止解码并报告错误
    Break = 0x0011,
    /// 忽略当前帧, 继续解码
    Ignore = 0x0020,
}

impl FlowStatus {
    /// 从引擎 ABI 的裸整数转换, 未知取值返回 `None`
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0x0000 => Some(Self::Continue),
            0x0010 => Some(Self::Stop),
            0x0011 => Some(Self::Break),
            0x0020 => Some(Self::Ignore),
            _ => None,
        }
    }

    /// 转为引擎 ABI 的裸整数
    pub const fn as_raw(self) -> u32 {
        self as u32
    }

    /// 是否结束本次运行 (Stop / Break)
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Stop | Self::Break)
    }
}

impl fmt::Display for FlowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Continue => "continue",
            Self::Stop => "stop",
            Self::Break => "break",
            Self::Ignore => "ignore",
        };
        write!(f, "{name}")
    }
}
