//! Audio timeline assembly and background music mixing
//!
//! Every clip of a run shares one [`AudioFormat`]; offsets and lengths are
//! counted in frames.

pub mod clip;
pub mod decode;
pub mod effects;
pub mod export;
pub mod mixer;
pub mod timeline;

pub use clip::{AudioClip, AudioFormat};
pub use decode::{decode_bytes, decode_file};
pub use effects::SoundEffectCatalog;
pub use export::write_wav;
pub use mixer::{BackgroundMusicMixer, MixWindowPolicy};
pub use timeline::{AudioTimeline, AudioTimelineBuilder};
