//! 解码引擎实现模块.

#[cfg(feature = "symphonia-backend")]
pub mod mp3;
