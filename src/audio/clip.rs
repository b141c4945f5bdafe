use crate::{Error, Result};
use std::ops::Range;
use std::time::Duration;

/// Canonical sample rate and channel count shared by every clip of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFormat {
    #[must_use]
    pub const fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    #[must_use]
    pub const fn channel_count(self) -> usize {
        self.channels as usize
    }

    /// Number of whole frames lasting `duration`
    #[must_use]
    pub fn frames_for(self, duration: Duration) -> usize {
        (duration.as_secs_f64() * f64::from(self.sample_rate)).round() as usize
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::new(24_000, 1)
    }
}

/// Interleaved f32 PCM in `[-1.0, 1.0]`, addressed in frames
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    format: AudioFormat,
    samples: Vec<f32>,
}

impl AudioClip {
    /// Wrap interleaved samples; the length must be a whole number of frames
    pub fn from_samples(format: AudioFormat, samples: Vec<f32>) -> Result<Self> {
        if format.channels == 0 || samples.len() % format.channel_count() != 0 {
            return Err(Error::Audio(format!(
                "{} samples do not form whole {}-channel frames",
                samples.len(),
                format.channels
            )));
        }
        Ok(Self { format, samples })
    }

    #[must_use]
    pub const fn empty(format: AudioFormat) -> Self {
        Self {
            format,
            samples: Vec::new(),
        }
    }

    #[must_use]
    pub fn silence(format: AudioFormat, frames: usize) -> Self {
        Self {
            format,
            samples: vec![0.0; frames * format.channel_count()],
        }
    }

    #[must_use]
    pub const fn format(&self) -> AudioFormat {
        self.format
    }

    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    #[must_use]
    pub fn frames(&self) -> usize {
        self.samples.len() / self.format.channel_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / f64::from(self.format.sample_rate))
    }

    fn check_format(&self, other: &Self) -> Result<()> {
        if self.format == other.format {
            Ok(())
        } else {
            Err(Error::Audio(format!(
                "format mismatch: {:?} vs {:?}",
                self.format, other.format
            )))
        }
    }

    /// Append `other` to the end of this clip
    pub fn append(&mut self, other: &Self) -> Result<()> {
        self.check_format(other)?;
        self.samples.extend_from_slice(&other.samples);
        Ok(())
    }

    /// Copy of the frames in `range`, clamped to the clip
    #[must_use]
    pub fn slice(&self, range: Range<usize>) -> Self {
        let channels = self.format.channel_count();
        let end = range.end.min(self.frames());
        let start = range.start.min(end);
        Self {
            format: self.format,
            samples: self.samples[start * channels..end * channels].to_vec(),
        }
    }

    /// Repeat this clip end to end and cut it to exactly `frames` frames
    pub fn looped_to(&self, frames: usize) -> Result<Self> {
        if frames == 0 {
            return Ok(Self::empty(self.format));
        }
        if self.is_empty() {
            return Err(Error::Audio(
                "cannot loop an empty clip to a non-empty length".to_string(),
            ));
        }

        let wanted = frames * self.format.channel_count();
        let samples = self.samples.iter().copied().cycle().take(wanted).collect();
        Ok(Self {
            format: self.format,
            samples,
        })
    }

    /// Scale every sample by `10^(db/20)`
    pub fn apply_gain_db(&mut self, db: f32) {
        let factor = 10f32.powf(db / 20.0);
        for sample in &mut self.samples {
            *sample *= factor;
        }
    }

    /// Sum `other` into this clip from frame 0, saturating at full scale.
    ///
    /// Frames of `other` past the end of this clip are dropped.
    pub fn overlay(&mut self, other: &Self) -> Result<()> {
        self.check_format(other)?;
        for (sample, added) in self.samples.iter_mut().zip(&other.samples) {
            *sample = (*sample + added).clamp(-1.0, 1.0);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MONO: AudioFormat = AudioFormat::new(1_000, 1);

    fn clip(samples: &[f32]) -> AudioClip {
        AudioClip::from_samples(MONO, samples.to_vec()).unwrap()
    }

    #[test]
    fn test_partial_frames_are_rejected() {
        let stereo = AudioFormat::new(1_000, 2);
        assert!(AudioClip::from_samples(stereo, vec![0.0; 3]).is_err());
        assert_eq!(
            AudioClip::from_samples(stereo, vec![0.0; 4]).unwrap().frames(),
            2
        );
    }

    #[test]
    fn test_append_and_duration() {
        let mut a = AudioClip::silence(MONO, 500);
        a.append(&AudioClip::silence(MONO, 250)).unwrap();

        assert_eq!(a.frames(), 750);
        assert_eq!(a.duration(), Duration::from_millis(750));
        assert!(a.append(&AudioClip::empty(AudioFormat::new(8_000, 1))).is_err());
    }

    #[test]
    fn test_slice_is_clamped() {
        let c = clip(&[0.1, 0.2, 0.3, 0.4]);
        assert_eq!(c.slice(1..3).samples(), &[0.2, 0.3]);
        assert_eq!(c.slice(3..10).samples(), &[0.4]);
        assert!(c.slice(8..10).is_empty());
    }

    #[test]
    fn test_looped_to_tiles_and_truncates() {
        let c = clip(&[0.1, 0.2, 0.3]);
        assert_eq!(
            c.looped_to(7).unwrap().samples(),
            &[0.1, 0.2, 0.3, 0.1, 0.2, 0.3, 0.1]
        );
        assert!(c.looped_to(0).unwrap().is_empty());
        assert!(AudioClip::empty(MONO).looped_to(3).is_err());
        assert!(AudioClip::empty(MONO).looped_to(0).is_ok());
    }

    #[test]
    fn test_gain_db() {
        let mut c = clip(&[0.5, -0.5]);
        c.apply_gain_db(-20.0);
        assert!((c.samples()[0] - 0.05).abs() < 1e-6);
        assert!((c.samples()[1] + 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_overlay_saturates() {
        let mut base = clip(&[0.9, -0.9, 0.1]);
        base.overlay(&clip(&[0.5, -0.5])).unwrap();
        assert_eq!(base.samples(), &[1.0, -1.0, 0.1]);
    }

    #[test]
    fn test_frames_for_duration() {
        assert_eq!(MONO.frames_for(Duration::from_millis(1_500)), 1_500);
        assert_eq!(AudioFormat::default().frames_for(Duration::from_secs(2)), 48_000);
    }
}
