// 播放器核心模块

pub mod actor;
pub mod extractor;
pub mod decoder;
pub mod audio_output;
pub mod pipeline;

mod decode;
mod demux;
mod render;
mod stream;
mod sync;

pub use actor::{Actor, ActorHandle};
pub use audio_output::{AudioSink, AudioSinkProvider, CpalAudioOutput, CpalSinkProvider};
pub use decoder::{DecoderEvent, DecoderProvider, MediaDecoder, RenderTarget};
pub use extractor::{first_audio_track, first_video_track, ExtractorSupplier, MediaExtractor};
pub use pipeline::PlaybackPipeline;
