//! 统一错误类型定义.
//!
//! 所有 madflow crate 共用的错误类型, 支持跨模块传播.

use thiserror::Error;

/// madflow 统一错误类型
#[derive(Debug, Error)]
pub enum MadflowError {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 不支持的操作
    #[error("不支持的操作: {0}")]
    Unsupported(String),

    /// 解码引擎错误
    #[error("解码引擎错误: {0}")]
    Codec(String),

    /// 容器格式错误
    #[error("格式错误: {0}")]
    Format(String),

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 输出头部已写入, 不允许再次初始化
    #[error("输出头部已写入, 拒绝重复初始化")]
    HeaderAlreadyWritten,

    /// 输出头部尚未写入就开始写帧
    #[error("输出头部尚未写入")]
    HeaderNotWritten,

    /// PCM 帧描述不满足约定 (声道数, 采样数组长度等)
    #[error("无效 PCM 帧: {0}")]
    InvalidFrame(String),

    /// 缓冲区越界
    #[error("缓冲区越界: 容量 {capacity}, 请求 {requested}")]
    BufferOverrun {
        /// 缓冲区容量
        capacity: usize,
        /// 实际请求的长度
        requested: usize,
    },

    /// 无效数据 (损坏的码流等)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// 内部错误 (不应发生)
    #[error("内部错误: {0}")]
    Internal(String),
}

impl MadflowError {
    /// 是否属于调用约定被破坏 (而非外部数据或 I/O 问题)
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::HeaderAlreadyWritten
                | Self::HeaderNotWritten
                | Self::InvalidFrame(_)
                | Self::BufferOverrun { .. }
                | Self::Internal(_)
        )
    }
}

/// madflow 统一 Result 类型
pub type MadflowResult<T> = Result<T, MadflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_约定违例分类() {
        assert!(MadflowError::HeaderAlreadyWritten.is_contract_violation());
        assert!(
            MadflowError::BufferOverrun {
                capacity: 4,
                requested: 8
            }
            .is_contract_violation()
        );
        let io = MadflowError::from(std::io::Error::other("断开"));
        assert!(!io.is_contract_violation());
    }

    #[test]
    fn test_错误信息() {
        let err = MadflowError::BufferOverrun {
            capacity: 1024,
            requested: 2048,
        };
        assert_eq!(err.to_string(), "缓冲区越界: 容量 1024, 请求 2048");
    }
}
