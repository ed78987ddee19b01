//! 有界输入源.
//!
//! 在任意字节源之上提供 "读满或读到 EOF" 语义: 一次 `fill` 调用会反复读取,
//! 把数据依次写入缓冲区未填充的部分, 直到缓冲区写满或某次读取返回 0 字节.

use log::{debug, trace};
use madflow_core::MadflowResult;

use crate::io::{FileBackend, IoBackend, StdinBackend};

/// 有界输入源
///
/// 底层读取错误直接向上传播, 不做任何重试.
pub struct BufferedSource {
    /// 底层字节源
    inner: Box<dyn IoBackend>,
    /// 是否已观察到 EOF
    eof: bool,
    /// 累计读出的字节数
    total_read: u64,
}

impl BufferedSource {
    /// 从字节源创建
    pub fn new(backend: Box<dyn IoBackend>) -> Self {
        Self {
            inner: backend,
            eof: false,
            total_read: 0,
        }
    }

    /// 打开文件作为输入
    pub fn open(path: &str) -> MadflowResult<Self> {
        Ok(Self::new(Box::new(FileBackend::open(path)?)))
    }

    /// 以标准输入作为输入
    pub fn stdin() -> Self {
        Self::new(Box::new(StdinBackend::new()))
    }

    /// 填充缓冲区
    ///
    /// 返回实际写入的字节数. 只有在字节源到达 EOF 时返回值才会小于
    /// `buf.len()`; 返回 0 表示没有更多数据.
    pub fn fill(&mut self, buf: &mut [u8]) -> MadflowResult<usize> {
        let mut bytes_read = 0;
        while bytes_read < buf.len() {
            let n = self.inner.read(&mut buf[bytes_read..])?;
            if n == 0 {
                if !self.eof {
                    debug!("输入源到达 EOF, 累计 {} 字节", self.total_read + bytes_read as u64);
                }
                self.eof = true;
                break;
            }
            bytes_read += n;
            trace!("输入源读取 {n} 字节, 本次已填充 {bytes_read}/{}", buf.len());
        }
        self.total_read += bytes_read as u64;
        Ok(bytes_read)
    }

    /// 丢弃指定数量的字节, 返回实际丢弃的数量 (遇到 EOF 时可能更少)
    pub fn discard(&mut self, count: u64) -> MadflowResult<u64> {
        let mut scratch = [0u8; 1024];
        let mut left = count;
        while left > 0 {
            let chunk = left.min(scratch.len() as u64) as usize;
            let n = self.fill(&mut scratch[..chunk])?;
            left -= n as u64;
            if n < chunk {
                break;
            }
        }
        Ok(count - left)
    }

    /// 是否已观察到 EOF
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// 累计读出的字节数
    pub fn total_read(&self) -> u64 {
        self.total_read
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryBackend;
    use std::io;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn source(len: usize, read_limit: Option<usize>) -> BufferedSource {
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        let mut backend = MemoryBackend::from_data(data);
        if let Some(limit) = read_limit {
            backend = backend.with_read_limit(limit);
        }
        BufferedSource::new(Box::new(backend))
    }

    #[test]
    fn test_填满缓冲区() {
        let mut src = source(100, None);
        let mut buf = [0u8; 40];
        assert_eq!(src.fill(&mut buf).unwrap(), 40);
        assert_eq!(buf[39], 39);
        assert!(!src.is_eof());
    }

    #[test]
    fn test_各容量与长度组合() {
        for capacity in [1usize, 7, 64, 1000] {
            for len in [0usize, 1, 63, 64, 65, 999, 4096] {
                for limit in [None, Some(1), Some(5)] {
                    let mut src = source(len, limit);
                    let mut buf = vec![0u8; capacity];
                    let mut remaining = len;
                    loop {
                        let n = src.fill(&mut buf).unwrap();
                        assert_eq!(n, capacity.min(remaining));
                        if n < capacity {
                            assert!(src.is_eof());
                        }
                        remaining -= n;
                        if n == 0 {
                            break;
                        }
                    }
                    assert_eq!(src.total_read(), len as u64);
                }
            }
        }
    }

    #[test]
    fn test_短读累加() {
        // 每次只返回 3 字节, 仍应一次 fill 读满
        let mut src = source(10, Some(3));
        let mut buf = [0u8; 8];
        assert_eq!(src.fill(&mut buf).unwrap(), 8);
        assert_eq!(&buf, &[0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(src.fill(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[8, 9]);
    }

    /// 记录读取次数的字节源, 到达末尾后继续返回 0
    struct CountingBackend {
        remaining: usize,
        reads: Arc<AtomicUsize>,
    }

    impl IoBackend for CountingBackend {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            let n = buf.len().min(self.remaining);
            self.remaining -= n;
            Ok(n)
        }
        fn write_all(&mut self, _buf: &[u8]) -> io::Result<()> {
            unreachable!()
        }
        fn seek(&mut self, _pos: io::SeekFrom) -> io::Result<u64> {
            unreachable!()
        }
        fn size(&self) -> Option<u64> {
            None
        }
        fn is_seekable(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_零字节读取即_eof_不重试() {
        let reads = Arc::new(AtomicUsize::new(0));
        let backend = CountingBackend {
            remaining: 5,
            reads: Arc::clone(&reads),
        };
        let mut src = BufferedSource::new(Box::new(backend));
        let mut buf = [0u8; 16];
        assert_eq!(src.fill(&mut buf).unwrap(), 5);
        // 一次读到 5 字节, 一次读到 0 字节
        assert_eq!(reads.load(Ordering::SeqCst), 2);
        assert!(src.is_eof());
        assert_eq!(src.fill(&mut buf).unwrap(), 0);
        assert_eq!(reads.load(Ordering::SeqCst), 3);
    }

    /// 读取即失败的字节源
    struct FailingBackend;

    impl IoBackend for FailingBackend {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Interrupted, "被中断"))
        }
        fn write_all(&mut self, _buf: &[u8]) -> io::Result<()> {
            unreachable!()
        }
        fn seek(&mut self, _pos: io::SeekFrom) -> io::Result<u64> {
            unreachable!()
        }
        fn size(&self) -> Option<u64> {
            None
        }
        fn is_seekable(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_读取错误直接传播() {
        let mut src = BufferedSource::new(Box::new(FailingBackend));
        let mut buf = [0u8; 4];
        assert!(src.fill(&mut buf).is_err());
        assert!(!src.is_eof());
    }

    #[test]
    fn test_丢弃字节() {
        let mut src = source(30, Some(4));
        assert_eq!(src.discard(20).unwrap(), 20);
        let mut buf = [0u8; 4];
        assert_eq!(src.fill(&mut buf).unwrap(), 4);
        assert_eq!(buf[0], 20);
        assert_eq!(src.discard(100).unwrap(), 6);
        assert!(src.is_eof());
    }
}
