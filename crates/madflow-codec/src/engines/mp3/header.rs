//! MPEG 音频 Layer III 帧头解析

use madflow_core::{MadflowError, MadflowResult};

/// 帧头长度
pub const HEADER_SIZE: usize = 4;
/// CRC 字段长度
pub const CRC_SIZE: usize = 2;

/// MPEG 版本
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegVersion {
    Mpeg1,
    Mpeg2,
    Mpeg25,
}

/// 声道模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    Stereo,
    JointStereo,
    DualChannel,
    SingleChannel,
}

/// Layer III 帧头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub version: MpegVersion,
    pub mode: ChannelMode,
    /// 是否带 CRC
    pub has_crc: bool,
    /// 码率 (bps)
    pub bitrate: u32,
    /// 采样率 (Hz)
    pub sample_rate: u32,
    pub padding: bool,
    /// 帧大小 (字节, 含帧头)
    pub frame_size: usize,
    /// 侧边信息大小 (字节)
    pub side_info_size: usize,
}

impl FrameHeader {
    /// 解析 4 字节的帧头
    ///
    /// 只接受 Layer III, 拒绝保留值与自由码率.
    pub fn parse(header: u32) -> MadflowResult<Self> {
        // AAAAAAAA AAABBCCD EEEEFFGH IIJJKLMM
        // A: Sync (11 bits), B: Version, C: Layer, D: CRC (0 表示有 CRC)
        // E: Bitrate, F: Samplerate, G: Padding, H: Private
        // I: Channel Mode, J: Mode Extension, K/L: Copyright/Original, M: Emphasis

        if (header & 0xFFE0_0000) != 0xFFE0_0000 {
            return Err(MadflowError::InvalidData("无效同步字".into()));
        }

        let version = match (header >> 19) & 0x3 {
            3 => MpegVersion::Mpeg1,
            2 => MpegVersion::Mpeg2,
            0 => MpegVersion::Mpeg25,
            _ => return Err(MadflowError::InvalidData("保留的 MPEG 版本".into())),
        };

        if (header >> 17) & 0x3 != 1 {
            return Err(MadflowError::Unsupported("仅支持 Layer III".into()));
        }

        let has_crc = (header >> 16) & 0x1 == 0;

        let bitrate_idx = ((header >> 12) & 0xF) as usize;
        if bitrate_idx == 0 || bitrate_idx == 15 {
            return Err(MadflowError::InvalidData("无效码率索引".into()));
        }

        let samplerate_idx = ((header >> 10) & 0x3) as usize;
        if samplerate_idx == 3 {
            return Err(MadflowError::InvalidData("无效采样率索引".into()));
        }

        let padding = (header >> 9) & 0x1 == 1;

        let mode = match (header >> 6) & 0x3 {
            0 => ChannelMode::Stereo,
            1 => ChannelMode::JointStereo,
            2 => ChannelMode::DualChannel,
            _ => ChannelMode::SingleChannel,
        };

        let bitrate = lookup_bitrate(version, bitrate_idx) * 1000;
        let sample_rate = lookup_samplerate(version, samplerate_idx);

        // Layer III: 144 * bitrate / samplerate + padding (MPEG1)
        //            72 * bitrate / samplerate + padding (MPEG2/2.5)
        let coeff = if version == MpegVersion::Mpeg1 { 144 } else { 72 };
        let frame_size = (coeff * bitrate / sample_rate + u32::from(padding)) as usize;

        let mono = mode == ChannelMode::SingleChannel;
        let side_info_size = match (version, mono) {
            (MpegVersion::Mpeg1, true) => 17,
            (MpegVersion::Mpeg1, false) => 32,
            (_, true) => 9,
            (_, false) => 17,
        };

        Ok(Self {
            version,
            mode,
            has_crc,
            bitrate,
            sample_rate,
            padding,
            frame_size,
            side_info_size,
        })
    }

    /// 从字节切片开头解析
    pub fn parse_bytes(data: &[u8]) -> MadflowResult<Self> {
        if data.len() < HEADER_SIZE {
            return Err(MadflowError::InvalidData("帧头不足 4 字节".into()));
        }
        Self::parse(u32::from_be_bytes([data[0], data[1], data[2], data[3]]))
    }

    /// 声道数
    pub fn channels(&self) -> u16 {
        if self.mode == ChannelMode::SingleChannel { 1 } else { 2 }
    }

    /// 每帧每声道采样数
    pub fn samples_per_frame(&self) -> usize {
        if self.version == MpegVersion::Mpeg1 { 1152 } else { 576 }
    }

    /// CRC 覆盖的侧边信息在帧内的范围
    pub fn side_info_range(&self) -> std::ops::Range<usize> {
        let start = HEADER_SIZE + if self.has_crc { CRC_SIZE } else { 0 };
        start..start + self.side_info_size
    }
}

fn lookup_bitrate(version: MpegVersion, index: usize) -> u32 {
    // kbps
    const V1_L3: [u32; 16] = [
        0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 0,
    ];
    const V2_L3: [u32; 16] = [
        0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0,
    ];
    match version {
        MpegVersion::Mpeg1 => V1_L3[index],
        MpegVersion::Mpeg2 | MpegVersion::Mpeg25 => V2_L3[index],
    }
}

fn lookup_samplerate(version: MpegVersion, index: usize) -> u32 {
    match version {
        MpegVersion::Mpeg1 => [44100, 48000, 32000][index],
        MpegVersion::Mpeg2 => [22050, 24000, 16000][index],
        MpegVersion::Mpeg25 => [11025, 12000, 8000][index],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_解析_128k_立体声() {
        let h = FrameHeader::parse(0xFFFB_9004).unwrap();
        assert_eq!(h.version, MpegVersion::Mpeg1);
        assert_eq!(h.bitrate, 128_000);
        assert_eq!(h.sample_rate, 44100);
        assert_eq!(h.frame_size, 417);
        assert_eq!(h.channels(), 2);
        assert_eq!(h.side_info_size, 32);
        assert!(!h.has_crc);
        assert_eq!(h.side_info_range(), 4..36);
    }

    #[test]
    fn test_解析_单声道带_crc() {
        let h = FrameHeader::parse_bytes(&[0xFF, 0xFA, 0x92, 0xC4]).unwrap();
        assert!(h.has_crc);
        assert!(h.padding);
        assert_eq!(h.frame_size, 418);
        assert_eq!(h.channels(), 1);
        assert_eq!(h.side_info_range(), 6..23);
    }

    #[test]
    fn test_mpeg2_帧长() {
        // MPEG2, 64 kbps, 22050 Hz
        let h = FrameHeader::parse(0xFFF3_8004).unwrap();
        assert_eq!(h.version, MpegVersion::Mpeg2);
        assert_eq!(h.frame_size, 72 * 64_000 / 22050);
        assert_eq!(h.samples_per_frame(), 576);
    }

    #[test]
    fn test_拒绝无效帧头() {
        assert!(FrameHeader::parse(0x1234_5678).is_err());
        // Layer I
        assert!(FrameHeader::parse(0xFFFF_9004).is_err());
        // 码率索引 0 (自由码率)
        assert!(FrameHeader::parse(0xFFFB_0004).is_err());
        // 采样率索引 3
        assert!(FrameHeader::parse(0xFFFB_9C04).is_err());
        // 保留版本
        assert!(FrameHeader::parse(0xFFEB_9004).is_err());
        assert!(FrameHeader::parse_bytes(&[0xFF, 0xFB]).is_err());
    }
}
