use super::{decode_file, AudioClip, AudioFormat};
use crate::script::EffectId;
use crate::{Error, Result};
use std::path::Path;
use tracing::info;

/// Every sound effect clip, decoded once at startup
#[derive(Debug, Clone)]
pub struct SoundEffectCatalog {
    clips: [AudioClip; EffectId::CLIPS.len()],
}

impl SoundEffectCatalog {
    /// Decode each effect's file from `dir`; a missing file fails the load
    pub fn load(dir: &Path, format: AudioFormat) -> Result<Self> {
        let clips = EffectId::CLIPS
            .iter()
            .filter_map(|effect| effect.file_name())
            .map(|name| decode_file(&dir.join(name), format))
            .collect::<Result<Vec<_>>>()?;

        let catalog = Self::from_vec(clips)?;
        info!(
            "Loaded {} sound effects from {}",
            EffectId::CLIPS.len(),
            dir.display()
        );
        Ok(catalog)
    }

    /// Build from clips already in [`EffectId::CLIPS`] order
    #[must_use]
    pub const fn from_clips(clips: [AudioClip; EffectId::CLIPS.len()]) -> Self {
        Self { clips }
    }

    fn from_vec(clips: Vec<AudioClip>) -> Result<Self> {
        let count = clips.len();
        let clips = clips.try_into().map_err(|_| {
            Error::Audio(format!(
                "expected {} sound effects, decoded {count}",
                EffectId::CLIPS.len()
            ))
        })?;
        Ok(Self { clips })
    }

    /// Clip for `effect`, `None` for [`EffectId::Nothing`]
    #[must_use]
    pub fn clip(&self, effect: EffectId) -> Option<&AudioClip> {
        effect.clip_index().map(|index| &self.clips[index])
    }

    #[must_use]
    pub fn format(&self) -> AudioFormat {
        self.clips[0].format()
    }
}
