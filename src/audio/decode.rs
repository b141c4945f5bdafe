//! Decoding of encoded audio into the run's canonical format
//!
//! Symphonia decodes MP3 and WAV, channels are folded or duplicated to the
//! target count, and rubato resamples when the source rate differs.

use super::{AudioClip, AudioFormat};
use crate::{Error, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use std::io::Cursor;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Decode an in-memory encoded clip, `extension` hints the container
pub fn decode_bytes(bytes: Vec<u8>, extension: &str, target: AudioFormat) -> Result<AudioClip> {
    decode_source(Box::new(Cursor::new(bytes)), Some(extension), target)
}

/// Decode an audio file from disk
pub fn decode_file(path: &Path, target: AudioFormat) -> Result<AudioClip> {
    debug!("Decoding {}", path.display());
    let file = std::fs::File::open(path).map_err(|e| {
        Error::Audio(format!("failed to open {}: {e}", path.display()))
    })?;
    let extension = path.extension().and_then(|ext| ext.to_str());
    decode_source(Box::new(file), extension, target)
}

fn decode_source(
    source: Box<dyn MediaSource>,
    extension: Option<&str>,
    target: AudioFormat,
) -> Result<AudioClip> {
    let mss = MediaSourceStream::new(source, Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = extension {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| Error::Audio(format!("failed to probe format: {e}")))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::Audio("no audio track found".to_string()))?;
    let track_id = track.id;
    let mut source_rate = track.codec_params.sample_rate;
    let mut source_channels = track.codec_params.channels.map(|c| c.count());

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| Error::Audio(format!("failed to create decoder: {e}")))?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(Error::Audio(format!("failed to read packet: {e}"))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                source_rate = Some(spec.rate);
                source_channels = Some(spec.channels.count());

                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buffer.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                warn!("Skipping undecodable packet: {}", e);
            }
            Err(e) => return Err(Error::Audio(format!("decode failed: {e}"))),
        }
    }

    let source_rate =
        source_rate.ok_or_else(|| Error::Audio("sample rate not found".to_string()))?;
    let source_channels =
        source_channels.ok_or_else(|| Error::Audio("channel count not found".to_string()))?;

    debug!(
        "Decoded {} frames at {}Hz ({} channels)",
        samples.len() / source_channels.max(1),
        source_rate,
        source_channels
    );

    let remixed = remix_channels(&samples, source_channels, target.channel_count());
    let resampled = resample(remixed, source_rate, target)?;
    AudioClip::from_samples(target, resampled)
}

/// Convert interleaved samples between channel counts.
///
/// Down to mono averages every channel; up from mono duplicates it; any
/// other change keeps the leading channels and pads with silence.
fn remix_channels(samples: &[f32], from: usize, to: usize) -> Vec<f32> {
    if from == to || from == 0 {
        return samples.to_vec();
    }

    let frames = samples.chunks_exact(from);
    match (from, to) {
        (_, 1) => frames
            .map(|frame| frame.iter().sum::<f32>() / from as f32)
            .collect(),
        (1, _) => frames
            .flat_map(|frame| std::iter::repeat(frame[0]).take(to))
            .collect(),
        _ => frames
            .flat_map(|frame| (0..to).map(move |ch| frame.get(ch).copied().unwrap_or(0.0)))
            .collect(),
    }
}

fn resample(samples: Vec<f32>, source_rate: u32, target: AudioFormat) -> Result<Vec<f32>> {
    let channels = target.channel_count();
    if source_rate == target.sample_rate || samples.is_empty() {
        return Ok(samples);
    }

    debug!(
        "Resampling from {}Hz to {}Hz",
        source_rate, target.sample_rate
    );

    let planar = deinterleave(&samples, channels);
    let input_frames = planar[0].len();
    let ratio = f64::from(target.sample_rate) / f64::from(source_rate);
    let expected_frames = (input_frames as f64 * ratio).round() as usize;

    let mut resampler =
        FastFixedIn::<f32>::new(ratio, 1.0, PolynomialDegree::Septic, input_frames, channels)
            .map_err(|e| Error::Audio(format!("failed to create resampler: {e}")))?;
    let delay = resampler.output_delay();

    let mut output = resampler
        .process(&planar, None)
        .map_err(|e| Error::Audio(format!("resampling failed: {e}")))?;
    // flush the samples still held back by the interpolation filter
    let tail = resampler
        .process_partial(None::<&[Vec<f32>]>, None)
        .map_err(|e| Error::Audio(format!("resampling failed: {e}")))?;

    for (channel, rest) in output.iter_mut().zip(tail) {
        channel.extend(rest);
        channel.drain(..delay.min(channel.len()));
        channel.resize(expected_frames, 0.0);
    }

    Ok(interleave(&output))
}

fn deinterleave(samples: &[f32], channels: usize) -> Vec<Vec<f32>> {
    let mut planar = vec![Vec::with_capacity(samples.len() / channels); channels];
    for frame in samples.chunks_exact(channels) {
        for (channel, sample) in planar.iter_mut().zip(frame) {
            channel.push(*sample);
        }
    }
    planar
}

fn interleave(planar: &[Vec<f32>]) -> Vec<f32> {
    let frames = planar.first().map_or(0, Vec::len);
    let mut interleaved = Vec::with_capacity(frames * planar.len());
    for frame in 0..frames {
        for channel in planar {
            interleaved.push(channel[frame]);
        }
    }
    interleaved
}
