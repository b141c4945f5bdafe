use super::{AudioClip, AudioTimeline};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::{debug, info, warn};

/// What to do when the script never set an intro or outro offset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixWindowPolicy {
    /// Missing intro end is frame 0, missing outro start is the timeline end
    #[default]
    WholeTimeline,
    /// Leave the timeline without background music
    Skip,
    /// Fail the run
    Require,
}

/// Loops background music under the `[intro_end, outro_start)` window
#[derive(Debug, Clone, Copy)]
pub struct BackgroundMusicMixer {
    volume_offset_db: f32,
    policy: MixWindowPolicy,
}

impl BackgroundMusicMixer {
    #[must_use]
    pub const fn new(volume_offset_db: f32, policy: MixWindowPolicy) -> Self {
        Self {
            volume_offset_db,
            policy,
        }
    }

    /// Frame range the music covers, `None` when nothing should be mixed
    pub fn mix_window(&self, timeline: &AudioTimeline) -> Result<Option<Range<usize>>> {
        let frames = timeline.frames();
        let (start, end) = match (timeline.intro_end, timeline.outro_start) {
            (Some(start), Some(end)) => (start, end),
            (intro_end, outro_start) => match self.policy {
                MixWindowPolicy::WholeTimeline => {
                    debug!(
                        "Mix window incomplete (intro_end={:?}, outro_start={:?}), widening",
                        intro_end, outro_start
                    );
                    (intro_end.unwrap_or(0), outro_start.unwrap_or(frames))
                }
                MixWindowPolicy::Skip => {
                    warn!("Script has no intro/outro pair, skipping background music");
                    return Ok(None);
                }
                MixWindowPolicy::Require => {
                    return Err(Error::InvalidInput {
                        field: "timeline".to_string(),
                        reason: format!(
                            "mix window undefined (intro_end={intro_end:?}, outro_start={outro_start:?})"
                        ),
                    });
                }
            },
        };

        if start > end {
            return Err(Error::InvalidInput {
                field: "timeline".to_string(),
                reason: format!("intro ends at frame {start} after outro starts at {end}"),
            });
        }
        if end > frames {
            return Err(Error::InvalidInput {
                field: "timeline".to_string(),
                reason: format!("outro start {end} is past the timeline end {frames}"),
            });
        }

        Ok(Some(start..end))
    }

    /// Overlay the attenuated, looped `bgm` onto the mix window.
    ///
    /// Audio outside the window is copied through untouched and the result
    /// always has the timeline's length.
    pub fn mix(&self, timeline: &AudioTimeline, bgm: &AudioClip) -> Result<AudioClip> {
        let Some(window) = self.mix_window(timeline)? else {
            return Ok(timeline.clip.clone());
        };

        let mut bed = bgm.looped_to(window.len())?;
        bed.apply_gain_db(self.volume_offset_db);

        let mut middle = timeline.clip.slice(window.clone());
        middle.overlay(&bed)?;

        let mut mixed = timeline.clip.slice(0..window.start);
        mixed.append(&middle)?;
        mixed.append(&timeline.clip.slice(window.end..timeline.frames()))?;

        info!(
            "Mixed background music over frames {}..{} at {} dB",
            window.start, window.end, self.volume_offset_db
        );
        Ok(mixed)
    }
}

impl Default for BackgroundMusicMixer {
    fn default() -> Self {
        Self::new(-5.0, MixWindowPolicy::default())
    }
}
