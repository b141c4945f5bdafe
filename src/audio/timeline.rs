use super::{decode_bytes, AudioClip, AudioFormat, SoundEffectCatalog};
use crate::script::{EffectId, Turn};
use crate::tts::SpeechSynthesizer;
use crate::Result;
use tracing::{debug, info, instrument};

/// The assembled narration plus the offsets bounding the music window.
///
/// Offsets are frame positions into `clip`, each recorded at most once.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTimeline {
    pub clip: AudioClip,
    pub intro_end: Option<usize>,
    pub outro_start: Option<usize>,
}

impl AudioTimeline {
    #[must_use]
    pub const fn new(format: AudioFormat) -> Self {
        Self {
            clip: AudioClip::empty(format),
            intro_end: None,
            outro_start: None,
        }
    }

    #[must_use]
    pub fn frames(&self) -> usize {
        self.clip.frames()
    }
}

/// Sequences speech and sound effects for a script, in turn order
#[derive(Debug, Clone, Copy)]
pub struct AudioTimelineBuilder {
    format: AudioFormat,
    intro: EffectId,
    outro: EffectId,
}

impl AudioTimelineBuilder {
    #[must_use]
    pub const fn new(format: AudioFormat) -> Self {
        Self {
            format,
            intro: EffectId::Intro,
            outro: EffectId::Outro,
        }
    }

    #[must_use]
    pub const fn format(&self) -> AudioFormat {
        self.format
    }

    /// Synthesize every turn and splice its effects around it.
    ///
    /// Turns are synthesized one at a time; offsets are lengths of the buffer
    /// at the moment the intro was appended and before the outro is appended.
    #[instrument(skip_all, fields(turns = turns.len()))]
    pub async fn build(
        &self,
        turns: &[Turn],
        synthesizer: &dyn SpeechSynthesizer,
        catalog: &SoundEffectCatalog,
    ) -> Result<AudioTimeline> {
        let mut timeline = AudioTimeline::new(self.format);
        let extension = synthesizer.encoding().extension();

        for (index, turn) in turns.iter().enumerate() {
            self.push_before(&mut timeline, turn.sound_effect_before, catalog)?;

            debug!("Synthesizing turn {} ({})", index + 1, turn.speaker);
            let bytes = synthesizer.synthesize(&turn.text).await?;
            let speech = decode_bytes(bytes, extension, self.format)?;
            timeline.clip.append(&speech)?;

            self.push_after(&mut timeline, turn.sound_effect_after, catalog)?;
        }

        info!(
            "Timeline assembled: {:.1}s, intro_end={:?}, outro_start={:?}",
            timeline.clip.duration().as_secs_f64(),
            timeline.intro_end,
            timeline.outro_start
        );
        Ok(timeline)
    }

    fn push_before(
        &self,
        timeline: &mut AudioTimeline,
        effect: EffectId,
        catalog: &SoundEffectCatalog,
    ) -> Result<()> {
        let Some(clip) = catalog.clip(effect) else {
            return Ok(());
        };
        timeline.clip.append(clip)?;
        if effect == self.intro && timeline.intro_end.is_none() {
            timeline.intro_end = Some(timeline.frames());
        }
        Ok(())
    }

    fn push_after(
        &self,
        timeline: &mut AudioTimeline,
        effect: EffectId,
        catalog: &SoundEffectCatalog,
    ) -> Result<()> {
        let Some(clip) = catalog.clip(effect) else {
            return Ok(());
        };
        if effect == self.outro && timeline.outro_start.is_none() {
            timeline.outro_start = Some(timeline.frames());
        }
        timeline.clip.append(clip)?;
        Ok(())
    }
}
