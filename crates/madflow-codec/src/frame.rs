//! PCM 帧描述.
//!
//! 引擎每解码一帧就构造一个 [`PcmFrame`], 借用引擎内部的采样缓冲区,
//! 只在一次输出回调期间有效.

use madflow_core::{MadflowError, MadflowResult};

/// 每声道的采样数据
#[derive(Debug, Clone, Copy)]
pub enum PcmData<'a> {
    /// 定点采样, `frac_bits` 为小数位数 (满幅为 `1 << frac_bits`)
    Fixed {
        frac_bits: u32,
        left: &'a [i32],
        right: Option<&'a [i32]>,
    },
    /// 浮点采样, 范围 [-1.0, 1.0)
    Float {
        left: &'a [f32],
        right: Option<&'a [f32]>,
    },
}

/// 解码后的一帧 PCM
#[derive(Debug, Clone, Copy)]
pub struct PcmFrame<'a> {
    /// 声道数 (1 或 2)
    pub channels: u16,
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 内部采样位宽
    pub bits: u32,
    /// 本帧每声道采样数
    pub length: usize,
    /// 采样数据
    pub data: PcmData<'a>,
}

impl<'a> PcmFrame<'a> {
    /// 检查描述的一致性
    ///
    /// 声道数必须为 1 或 2, 双声道必须带右声道数据, 每个声道至少有 `length` 个采样.
    pub fn validate(&self) -> MadflowResult<()> {
        if self.channels != 1 && self.channels != 2 {
            return Err(MadflowError::InvalidFrame(format!(
                "不支持的声道数: {}",
                self.channels
            )));
        }
        if self.sample_rate == 0 {
            return Err(MadflowError::InvalidFrame("采样率为 0".into()));
        }
        let (left_len, right_len) = match &self.data {
            PcmData::Fixed { left, right, .. } => (left.len(), right.map(<[i32]>::len)),
            PcmData::Float { left, right } => (left.len(), right.map(<[f32]>::len)),
        };
        if left_len < self.length {
            return Err(MadflowError::InvalidFrame(format!(
                "左声道只有 {left_len} 个采样, 帧长度为 {}",
                self.length
            )));
        }
        if self.channels == 2 {
            match right_len {
                None => {
                    return Err(MadflowError::InvalidFrame("双声道帧缺少右声道".into()));
                }
                Some(n) if n < self.length => {
                    return Err(MadflowError::InvalidFrame(format!(
                        "右声道只有 {n} 个采样, 帧长度为 {}",
                        self.length
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed<'a>(channels: u16, length: usize, left: &'a [i32], right: Option<&'a [i32]>) -> PcmFrame<'a> {
        PcmFrame {
            channels,
            sample_rate: 44100,
            bits: 32,
            length,
            data: PcmData::Fixed {
                frac_bits: 28,
                left,
                right,
            },
        }
    }

    #[test]
    fn test_合法帧() {
        let l = [0i32; 4];
        let r = [0i32; 4];
        assert!(fixed(1, 4, &l, None).validate().is_ok());
        assert!(fixed(2, 4, &l, Some(&r)).validate().is_ok());
        // 数据可以比 length 长
        assert!(fixed(1, 3, &l, None).validate().is_ok());
    }

    #[test]
    fn test_非法帧() {
        let l = [0i32; 4];
        assert!(fixed(0, 4, &l, None).validate().is_err());
        assert!(fixed(3, 4, &l, Some(&l)).validate().is_err());
        assert!(fixed(2, 4, &l, None).validate().is_err());
        assert!(fixed(1, 5, &l, None).validate().is_err());
        assert!(fixed(2, 4, &l, Some(&l[..2])).validate().is_err());

        let f = [0.0f32; 2];
        let frame = PcmFrame {
            channels: 1,
            sample_rate: 0,
            bits: 32,
            length: 2,
            data: PcmData::Float {
                left: &f,
                right: None,
            },
        };
        assert!(matches!(frame.validate(), Err(MadflowError::InvalidFrame(_))));
    }
}
