//! # Beholder
//!
//! Turns the last few weeks of papers on a set of watch terms into a narrated
//! podcast: papers are found on Semantic Scholar and acquired through a tiered
//! fallback chain, a dialogue script is generated from them, and the script is
//! synthesized into one timeline with sound effects and looping background
//! music.

pub mod acquisition;
pub mod audio;
pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod pipeline;
pub mod resilience;
pub mod script;
pub mod tts;

pub use acquisition::{AcquisitionOutcome, AcquisitionReport, PdfRenderer, TieredAcquisitionEngine};
pub use audio::{
    AudioClip, AudioFormat, AudioTimeline, AudioTimelineBuilder, BackgroundMusicMixer,
    MixWindowPolicy, SoundEffectCatalog,
};
pub use client::{Doi, RawPaper, SearchClient, SearchRequest};
pub use config::{Config, ConfigOverrides, Credentials};
pub use discovery::{Availability, DateAndAvailabilityFilter, DateWindow, PaperCandidate};
pub use error::{Error, Result};
pub use pipeline::{Pipeline, RunOptions, RunSummary};
pub use resilience::{CircuitBreaker, RetryConfig, RetryPolicy};
pub use script::{EffectId, ScriptGenerator, Turn};
pub use tts::{AudioEncoding, SpeechSynthesizer};
