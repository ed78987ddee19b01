//! 采样缩放.
//!
//! 把定点 (或浮点) 内部采样量化为 8/16/24 位输出采样, 并按目标字节序写出.
//!
//! 定点到 N 位的转换严格按以下顺序进行:
//! 1. 加舍入偏置 `1 << (frac_bits - N)`
//! 2. 限幅到 `[-2^frac_bits, 2^frac_bits - 1]`
//! 3. 算术右移 `frac_bits + 1 - N` 位
//!
//! 运算在 i64 中完成, 偏置不会溢出.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use madflow_core::{Endian, MadflowError, MadflowResult, SampleWidth};

/// 引擎定点采样的标准小数位数 (满幅为 `1 << 28`)
pub const FIXED_FRAC_BITS: u32 = 28;

/// 输出采样格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputFormat {
    /// 采样宽度
    pub width: SampleWidth,
    /// 字节序 (8 位无意义)
    pub endian: Endian,
}

impl OutputFormat {
    pub fn new(width: SampleWidth, endian: Endian) -> Self {
        Self { width, endian }
    }

    /// 每个采样的字节数
    pub fn bytes_per_sample(&self) -> usize {
        self.width.bytes_per_sample()
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.width {
            SampleWidth::U8 => write!(f, "{}", self.width),
            _ => write!(f, "{} {}", self.width, self.endian),
        }
    }
}

/// 采样缩放器
#[derive(Debug, Clone, Copy)]
pub struct SampleScaler {
    format: OutputFormat,
    frac_bits: u32,
}

impl SampleScaler {
    /// 按标准 28 位小数创建
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            frac_bits: FIXED_FRAC_BITS,
        }
    }

    /// 指定小数位数创建, 要求 `N < frac_bits <= 31`
    pub fn with_frac_bits(format: OutputFormat, frac_bits: u32) -> MadflowResult<Self> {
        let n = format.width.bits();
        if frac_bits <= n || frac_bits > 31 {
            return Err(MadflowError::InvalidArgument(format!(
                "小数位数 {frac_bits} 超出范围, {n} 位输出要求 ({n}, 31]"
            )));
        }
        Ok(Self { format, frac_bits })
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn frac_bits(&self) -> u32 {
        self.frac_bits
    }

    /// 定点采样量化为输出采样值 (有符号, 8 位时尚未加偏移)
    pub fn scale_fixed(&self, sample: i32) -> i32 {
        quantize(i64::from(sample), self.frac_bits, self.format.width.bits())
    }

    /// 浮点采样量化为输出采样值
    ///
    /// 先乘 `2^28` 映射到 28 位定点 (饱和, NaN 视为 0), 再走定点路径.
    pub fn scale_float(&self, sample: f32) -> i32 {
        let fixed = (sample * (1u32 << FIXED_FRAC_BITS) as f32) as i32;
        quantize(i64::from(fixed), FIXED_FRAC_BITS, self.format.width.bits())
    }

    /// 把量化后的采样值写入 `out` 开头
    ///
    /// `out` 至少要有 `bytes_per_sample()` 字节.
    pub fn write_sample(&self, out: &mut [u8], value: i32) {
        match (self.format.width, self.format.endian) {
            // 8 位输出为无符号偏移码
            (SampleWidth::U8, _) => out[0] = (value + 128) as u8,
            (SampleWidth::S16, Endian::Little) => LittleEndian::write_i16(out, value as i16),
            (SampleWidth::S16, Endian::Big) => BigEndian::write_i16(out, value as i16),
            (SampleWidth::S24, Endian::Little) => LittleEndian::write_i24(out, value),
            (SampleWidth::S24, Endian::Big) => BigEndian::write_i24(out, value),
        }
    }
}

fn quantize(sample: i64, frac_bits: u32, bits: u32) -> i32 {
    let one = 1i64 << frac_bits;
    // round
    let rounded = sample + (1i64 << (frac_bits - bits));
    // clip
    let clipped = rounded.clamp(-one, one - 1);
    // quantize
    (clipped >> (frac_bits + 1 - bits)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE: i32 = 1 << 28;

    fn scaler(width: SampleWidth, endian: Endian) -> SampleScaler {
        SampleScaler::new(OutputFormat::new(width, endian))
    }

    #[test]
    fn test_16位_典型值() {
        let s = scaler(SampleWidth::S16, Endian::Big);
        assert_eq!(s.scale_fixed(0), 0);
        assert_eq!(s.scale_fixed(ONE / 2), 0x4000);
        assert_eq!(s.scale_fixed(-ONE / 2), -0x4000);

        let mut out = [0u8; 2];
        s.write_sample(&mut out, s.scale_fixed(-ONE / 2));
        assert_eq!(out, [0xC0, 0x00]);
        s.write_sample(&mut out, s.scale_fixed(ONE / 2));
        assert_eq!(out, [0x40, 0x00]);
    }

    #[test]
    fn test_限幅边界() {
        let s = scaler(SampleWidth::S16, Endian::Little);
        assert_eq!(s.scale_fixed(ONE), s.scale_fixed(ONE - 1));
        assert_eq!(s.scale_fixed(ONE), 32767);
        assert_eq!(s.scale_fixed(-ONE - 1), s.scale_fixed(-ONE));
        assert_eq!(s.scale_fixed(-ONE), -32768);
        assert_eq!(s.scale_fixed(i32::MAX), 32767);
        assert_eq!(s.scale_fixed(i32::MIN), -32768);
    }

    #[test]
    fn test_16位往返无漂移() {
        let s = scaler(SampleWidth::S16, Endian::Little);
        for v in (-32768i32..=32767).step_by(97).chain([-32768, -1, 0, 1, 32767]) {
            let fixed = v << 13;
            let back = s.scale_fixed(fixed);
            assert!((back - v).abs() <= 1, "v={v} back={back}");
        }
    }

    #[test]
    fn test_8位无符号() {
        let s = scaler(SampleWidth::U8, Endian::Little);
        let mut out = [0u8; 1];
        s.write_sample(&mut out, s.scale_fixed(0));
        assert_eq!(out[0], 128);
        s.write_sample(&mut out, s.scale_fixed(ONE));
        assert_eq!(out[0], 255);
        s.write_sample(&mut out, s.scale_fixed(-ONE));
        assert_eq!(out[0], 0);
    }

    #[test]
    fn test_24位字节序() {
        let le = scaler(SampleWidth::S24, Endian::Little);
        let be = scaler(SampleWidth::S24, Endian::Big);
        let v = le.scale_fixed(ONE / 2);
        assert_eq!(v, 0x40_0000);
        let mut out = [0u8; 3];
        le.write_sample(&mut out, v);
        assert_eq!(out, [0x00, 0x00, 0x40]);
        be.write_sample(&mut out, v);
        assert_eq!(out, [0x40, 0x00, 0x00]);
        be.write_sample(&mut out, be.scale_fixed(-ONE));
        assert_eq!(out, [0x80, 0x00, 0x00]);
    }

    #[test]
    fn test_浮点输入() {
        let s = scaler(SampleWidth::S16, Endian::Little);
        assert_eq!(s.scale_float(0.5), 0x4000);
        assert_eq!(s.scale_float(-0.5), -0x4000);
        assert_eq!(s.scale_float(1.0), 32767);
        assert_eq!(s.scale_float(-1.0), -32768);
        assert_eq!(s.scale_float(1.0e9), 32767);
        assert_eq!(s.scale_float(f32::NAN), 0);
    }

    #[test]
    fn test_小数位数校验() {
        let fmt16 = OutputFormat::new(SampleWidth::S16, Endian::Little);
        assert!(SampleScaler::with_frac_bits(fmt16, 16).is_err());
        assert!(SampleScaler::with_frac_bits(fmt16, 32).is_err());
        assert!(SampleScaler::with_frac_bits(fmt16, 17).is_ok());
        assert!(SampleScaler::with_frac_bits(fmt16, 31).is_ok());

        let fmt24 = OutputFormat::new(SampleWidth::S24, Endian::Little);
        assert!(SampleScaler::with_frac_bits(fmt24, 24).is_err());

        // 15 位小数时, 满幅为 1 << 15
        let s = SampleScaler::with_frac_bits(OutputFormat::new(SampleWidth::U8, Endian::Little), 15)
            .unwrap();
        assert_eq!(s.scale_fixed(1 << 14), 64);
    }
}
