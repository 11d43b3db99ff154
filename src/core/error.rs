use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("无法找到视频轨道")]
    NoVideoTrack,

    #[error("无法找到音频轨道")]
    NoAudioTrack,

    #[error("音频输出不支持 {0} 声道")]
    UnsupportedChannelCount(u16),

    #[error("提取器错误: {0}")]
    ExtractorError(String),

    #[error("解码器错误: {0}")]
    DecoderError(String),

    #[error("音频输出错误: {0}")]
    AudioError(String),

    #[error("暂停/释放握手超时：有 Actor 未到达集合点")]
    HandshakeTimeout,

    #[error("其他错误: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, PlayerError>;
