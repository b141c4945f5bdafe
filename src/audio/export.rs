use super::AudioClip;
use crate::Result;
use std::path::Path;
use tracing::info;

/// Write `clip` as 16-bit PCM WAV, clamping out-of-range samples
pub fn write_wav(path: &Path, clip: &AudioClip) -> Result<()> {
    let format = clip.format();
    let spec = hound::WavSpec {
        channels: format.channels,
        sample_rate: format.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for sample in clip.samples() {
        writer.write_sample((sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16)?;
    }
    writer.finalize()?;

    info!(
        "Exported {:.1}s of audio to {}",
        clip.duration().as_secs_f64(),
        path.display()
    );
    Ok(())
}
