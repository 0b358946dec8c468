//! File decoding with symphonia
//!
//! Every stem ends up as a stereo `ChannelBuffer` at the output device rate:
//! mono is duplicated to both sides, anything wider keeps its first two
//! channels, and a rate mismatch is resampled with rubato.

use std::fs::File;
use std::path::Path;

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::error::DecodeError;
use crate::types::{ChannelBuffer, StereoBuffer, StereoSample};

/// Decode `path` into a stereo buffer at `target_rate`
pub fn decode_file(path: &Path, target_rate: u32) -> Result<ChannelBuffer, DecodeError> {
    let (interleaved, source_rate, channels) = decode_interleaved(path)?;
    if interleaved.is_empty() {
        return Err(DecodeError::Empty(path.to_path_buf()));
    }

    let (left, right) = split_stereo(&interleaved, channels);
    let (left, right) = if source_rate != target_rate {
        log::debug!("Resampling {:?} from {} Hz to {} Hz", path, source_rate, target_rate);
        resample(left, right, source_rate, target_rate)?
    } else {
        (left, right)
    };

    let samples: Vec<StereoSample> = left
        .into_iter()
        .zip(right)
        .map(|(l, r)| StereoSample::new(l, r))
        .collect();
    if samples.is_empty() {
        return Err(DecodeError::Empty(path.to_path_buf()));
    }
    Ok(ChannelBuffer::new(StereoBuffer::from_vec(samples), target_rate))
}

/// Decode every packet of the first audio track: (interleaved, rate, channels)
fn decode_interleaved(path: &Path) -> Result<(Vec<f32>, u32, usize), DecodeError> {
    let file = File::open(path).map_err(|e| DecodeError::io(path, e))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| DecodeError::UnsupportedFormat(e.to_string()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| DecodeError::UnsupportedFormat("No audio track found".to_string()))?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| DecodeError::UnsupportedFormat("Unknown sample rate".to_string()))?;
    let mut channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(2);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| DecodeError::UnsupportedFormat(e.to_string()))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => {
                log::warn!("Error reading packet from {:?}: {}", path, e);
                break;
            }
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                log::warn!("Skipping undecodable packet in {:?}: {}", path, e);
                continue;
            }
            Err(e) => {
                log::warn!("Decoding {:?} stopped early: {}", path, e);
                break;
            }
        };

        if sample_buf.is_none() {
            let spec = *decoded.spec();
            channels = spec.channels.count();
            sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
        }
        if let Some(buf) = sample_buf.as_mut() {
            buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buf.samples());
        }
    }

    Ok((samples, sample_rate, channels.max(1)))
}

/// Planar left/right from interleaved samples
///
/// Mono is duplicated; extra channels beyond the first two are dropped.
fn split_stereo(interleaved: &[f32], channels: usize) -> (Vec<f32>, Vec<f32>) {
    let channels = channels.max(1);
    let frames = interleaved.len() / channels;
    let mut left = Vec::with_capacity(frames);
    let mut right = Vec::with_capacity(frames);
    for frame in interleaved.chunks_exact(channels) {
        left.push(frame[0]);
        right.push(if channels > 1 { frame[1] } else { frame[0] });
    }
    (left, right)
}

fn resample(left: Vec<f32>, right: Vec<f32>, from: u32, to: u32) -> Result<(Vec<f32>, Vec<f32>), DecodeError> {
    let frames = left.len();
    if frames == 0 || from == to || from == 0 || to == 0 {
        return Ok((left, right));
    }

    // Whole stem in one chunk: loading is offline, so latency doesn't matter
    let mut resampler = FastFixedIn::<f32>::new(to as f64 / from as f64, 1.0, PolynomialDegree::Septic, frames, 2)
        .map_err(|e| DecodeError::Resample(e.to_string()))?;
    let input = vec![left, right];
    let mut output = resampler
        .process(&input, None)
        .map_err(|e| DecodeError::Resample(e.to_string()))?;

    let right = output.pop().unwrap_or_default();
    let left = output.pop().unwrap_or_default();
    Ok((left, right))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_wav(path: &Path, channels: u16, sample_rate: u32, frames: &[Vec<i16>]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for frame in frames {
            for sample in frame {
                writer.write_sample(*sample).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_mono_is_duplicated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("click.wav");
        let frames: Vec<Vec<i16>> = (0..480).map(|_| vec![16384]).collect();
        write_wav(&path, 1, 48_000, &frames);

        let buffer = decode_file(&path, 48_000).unwrap();
        assert_eq!(buffer.frames(), 480);
        assert_eq!(buffer.sample_rate(), 48_000);
        let first = buffer.samples()[0];
        assert!((first.left - 0.5).abs() < 1e-3);
        assert_eq!(first.left, first.right);
    }

    #[test]
    fn test_stereo_keeps_sides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.wav");
        let frames: Vec<Vec<i16>> = (0..100).map(|_| vec![8192, -8192]).collect();
        write_wav(&path, 2, 44_100, &frames);

        let buffer = decode_file(&path, 44_100).unwrap();
        assert_eq!(buffer.frames(), 100);
        let frame = buffer.samples()[50];
        assert!((frame.left - 0.25).abs() < 1e-3);
        assert!((frame.right + 0.25).abs() < 1e-3);
    }

    #[test]
    fn test_resamples_to_target_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bass.wav");
        let frames: Vec<Vec<i16>> = (0..22_050).map(|i| vec![((i % 100) * 100) as i16]).collect();
        write_wav(&path, 1, 22_050, &frames);

        let buffer = decode_file(&path, 44_100).unwrap();
        assert_eq!(buffer.sample_rate(), 44_100);
        let expected = 44_100.0;
        let frames = buffer.frames() as f64;
        assert!(frames > expected * 0.95 && frames < expected * 1.05, "got {} frames", frames);
        assert!((buffer.duration_secs() - 1.0).abs() < 0.05);
    }

    #[test]
    fn test_split_stereo_folds_wide_input() {
        let (left, right) = split_stereo(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6], 3);
        assert_eq!(left, vec![0.1, 0.4]);
        assert_eq!(right, vec![0.2, 0.5]);
    }

    #[test]
    fn test_errors() {
        let missing = PathBuf::from("/definitely/not/here.wav");
        assert!(matches!(decode_file(&missing, 48_000), Err(DecodeError::Io { .. })));

        let dir = tempfile::tempdir().unwrap();
        let junk = dir.path().join("notes.wav");
        std::fs::write(&junk, b"this is not audio").unwrap();
        assert!(matches!(decode_file(&junk, 48_000), Err(DecodeError::UnsupportedFormat(_))));
    }
}
