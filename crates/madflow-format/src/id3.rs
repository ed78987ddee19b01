//! ID3v2 标签头探测.
//!
//! 只解析标签起始的 10 字节头部, 用于计算需要跳过的字节数.
//! 标签内容 (帧) 不做解析.

use bitflags::bitflags;
use log::debug;
use madflow_core::MadflowResult;

use crate::io::IoContext;

/// ID3v2 头部长度
pub const ID3V2_HEADER_SIZE: usize = 10;
/// ID3v2.4 可选尾部长度
pub const ID3V2_FOOTER_SIZE: u64 = 10;

bitflags! {
    /// ID3v2 头部标志字节
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Id3Flags: u8 {
        /// 非同步化
        const UNSYNCHRONISATION = 0x80;
        /// 存在扩展头部
        const EXTENDED_HEADER   = 0x40;
        /// 实验性标签
        const EXPERIMENTAL      = 0x20;
        /// 存在尾部 (仅 v2.4)
        const FOOTER            = 0x10;
    }
}

/// ID3v2 标签头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Id3Header {
    /// 主版本号 (ID3v2.x 中的 x)
    pub major: u8,
    /// 修订号
    pub revision: u8,
    /// 标志
    pub flags: Id3Flags,
    /// 标签长度 (不含 10 字节头部)
    pub tag_len: u32,
}

impl Id3Header {
    /// 从前 10 字节解析, 不足 10 字节或缺少 "ID3" 标识时返回 None
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < ID3V2_HEADER_SIZE || &data[0..3] != b"ID3" {
            return None;
        }
        Some(Self {
            major: data[3],
            revision: data[4],
            flags: Id3Flags::from_bits_retain(data[5]),
            tag_len: synchsafe_u32(&data[6..10]),
        })
    }

    /// 从上下文当前位置读取并解析 (会消耗 10 字节)
    pub fn probe(io: &mut IoContext) -> MadflowResult<Option<Self>> {
        let mut header = [0u8; ID3V2_HEADER_SIZE];
        let n = io.read_up_to(&mut header)?;
        let parsed = Self::parse(&header[..n]);
        if let Some(h) = &parsed {
            debug!("检测到 {h}, 需跳过 {} 字节", h.skip_len());
        }
        Ok(parsed)
    }

    /// 需要跳过的总字节数: 10 + 标签长度
    pub fn skip_len(&self) -> u64 {
        ID3V2_HEADER_SIZE as u64 + u64::from(self.tag_len)
    }

    /// 考虑 v2.4 尾部后的跳过长度
    pub fn skip_len_with_footer(&self) -> u64 {
        if self.flags.contains(Id3Flags::FOOTER) {
            self.skip_len() + ID3V2_FOOTER_SIZE
        } else {
            self.skip_len()
        }
    }

    /// 版本字符串, 如 "2.3.0"
    pub fn version(&self) -> String {
        format!("2.{}.{}", self.major, self.revision)
    }
}

impl std::fmt::Display for Id3Header {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ID3v{} (长度 {})", self.version(), self.tag_len)
    }
}

/// 解析 4 字节 synchsafe 整数 (每字节只用低 7 位)
fn synchsafe_u32(b: &[u8]) -> u32 {
    u32::from(b[0] & 0x7F) << 21
        | u32::from(b[1] & 0x7F) << 14
        | u32::from(b[2] & 0x7F) << 7
        | u32::from(b[3] & 0x7F)
}

/// 便捷函数: 返回需要跳过的字节数, 不是 ID3v2 标签时返回 None
pub fn id3v2_skip_len(data: &[u8]) -> Option<u64> {
    Id3Header::parse(data).map(|h| h.skip_len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryBackend;

    #[test]
    fn test_标签长度_257() {
        let data = [0x49, 0x44, 0x33, 0x03, 0x00, 0x00, 0x00, 0x00, 0x02, 0x01];
        let h = Id3Header::parse(&data).unwrap();
        assert_eq!(h.tag_len, 257);
        assert_eq!(h.skip_len(), 267);
        assert_eq!(h.version(), "2.3.0");
        assert!(h.flags.is_empty());
        assert_eq!(id3v2_skip_len(&data), Some(267));
    }

    #[test]
    fn test_忽略高位() {
        // 每字节最高位不参与计算
        let data = *b"ID3\x04\x00\x00\xFF\xFF\xFF\xFF";
        let h = Id3Header::parse(&data).unwrap();
        assert_eq!(h.tag_len, 0x0FFF_FFFF);
    }

    #[test]
    fn test_标志与尾部() {
        let data = *b"ID3\x04\x00\x90\x00\x00\x00\x0A";
        let h = Id3Header::parse(&data).unwrap();
        assert!(h.flags.contains(Id3Flags::UNSYNCHRONISATION));
        assert!(h.flags.contains(Id3Flags::FOOTER));
        assert!(!h.flags.contains(Id3Flags::EXTENDED_HEADER));
        assert_eq!(h.skip_len(), 20);
        assert_eq!(h.skip_len_with_footer(), 30);
    }

    #[test]
    fn test_非标签或长度不足() {
        assert!(Id3Header::parse(b"ID3\x03\x00").is_none());
        assert!(Id3Header::parse(b"TAG\x03\x00\x00\x00\x00\x02\x01").is_none());
        assert!(Id3Header::parse(&[0xFF, 0xFB, 0x90, 0x04, 0, 0, 0, 0, 0, 0]).is_none());
        assert!(Id3Header::parse(&[]).is_none());
    }

    #[test]
    fn test_从上下文探测() {
        let mut data = b"ID3\x03\x00\x00\x00\x00\x00\x05".to_vec();
        data.extend_from_slice(&[0u8; 5]);
        let mut io = IoContext::new(Box::new(MemoryBackend::from_data(data)));
        let h = Id3Header::probe(&mut io).unwrap().unwrap();
        assert_eq!(h.skip_len(), 15);

        let mut io = IoContext::new(Box::new(MemoryBackend::from_data(b"ID".to_vec())));
        assert!(Id3Header::probe(&mut io).unwrap().is_none());
    }
}
