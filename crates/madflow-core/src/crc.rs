//! CRC 校验和计算.
//!
//! MPEG 音频帧的可选 CRC-16 (多项式 0x8005, 初始值 0xFFFF).

/// CRC-16 查找表 (多项式 0x8005)
const CRC16_TABLE: [u16; 256] = {
    let mut table = [0u16; 256];
    let mut i = 0u16;
    while i < 256 {
        let mut crc = i << 8;
        let mut j = 0;
        while j < 8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x8005;
            } else {
                crc <<= 1;
            }
            j += 1;
        }
        table[i as usize] = crc;
        i += 1;
    }
    table
};

/// 以指定初始值累加计算 CRC-16
pub fn crc16_update(mut crc: u16, data: &[u8]) -> u16 {
    for &byte in data {
        crc = (crc << 8) ^ CRC16_TABLE[((crc >> 8) as u8 ^ byte) as usize];
    }
    crc
}

/// 计算 MPEG 音频帧 CRC
///
/// 校验范围为帧头第 3, 4 字节加上侧边信息.
pub fn crc16_mpa(header_tail: &[u8], side_info: &[u8]) -> u16 {
    let crc = crc16_update(0xFFFF, header_tail);
    crc16_update(crc, side_info)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 逐位实现, 用于对照查表结果
    fn crc16_bitwise(init: u16, data: &[u8]) -> u16 {
        let mut crc = init;
        for &byte in data {
            crc ^= u16::from(byte) << 8;
            for _ in 0..8 {
                crc = if crc & 0x8000 != 0 {
                    (crc << 1) ^ 0x8005
                } else {
                    crc << 1
                };
            }
        }
        crc
    }

    #[test]
    fn test_空数据保持初始值() {
        assert_eq!(crc16_update(0xFFFF, &[]), 0xFFFF);
        assert_eq!(crc16_update(0, &[]), 0);
    }

    #[test]
    fn test_查表与逐位一致() {
        let data = [0x90, 0x04, 0x12, 0x34, 0x56, 0x78, 0x9A];
        assert_eq!(crc16_update(0xFFFF, &data), crc16_bitwise(0xFFFF, &data));
    }

    #[test]
    fn test_分段累加() {
        let whole = crc16_update(0xFFFF, &[0x90, 0x04, 0x00, 0x00]);
        assert_eq!(crc16_mpa(&[0x90, 0x04], &[0x00, 0x00]), whole);
    }
}
