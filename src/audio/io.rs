//! Audio file reading and writing.
//!
//! WAV output goes through hound; input decoding goes through symphonia so
//! the same entry point handles wav, mp3, and ogg/vorbis.

use anyhow::{anyhow, Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

#[derive(Debug, Default)]
pub struct AudioIo;

impl AudioIo {
    /// Decode an audio file into per-channel sample vectors and the file's
    /// native sample rate.
    ///
    /// Handles every container/codec the discovery allow-list admits (wav,
    /// mp3, ogg). Decoding errors are reported with enough context for the
    /// batch driver to name the offending file.
    pub fn read_audio(path: impl AsRef<Path>) -> Result<(Vec<Vec<f32>>, u32)> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open audio file: {}", path.display()))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .context("unsupported format or failed to probe container")?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| anyhow!("no supported audio track found"))?;
        let track_id = track.id;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .context("failed to create decoder for selected track")?;

        let mut sample_rate = track.codec_params.sample_rate;
        let mut channels: Option<usize> = None;
        let mut interleaved: Vec<f32> = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(_)) => break, // end of stream
                Err(SymphoniaError::ResetRequired) => {
                    return Err(anyhow!("chained streams are not supported"));
                }
                Err(err) => return Err(err).context("error reading next packet"),
            };
            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                // Skip over recoverable per-packet decode errors.
                Err(SymphoniaError::IoError(_)) | Err(SymphoniaError::DecodeError(_)) => continue,
                Err(err) => return Err(err).context("unrecoverable decode error"),
            };

            sample_rate.get_or_insert(decoded.spec().rate);
            channels.get_or_insert(decoded.spec().channels.count());

            let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
            buf.copy_interleaved_ref(decoded);
            interleaved.extend_from_slice(buf.samples());
        }

        let sample_rate =
            sample_rate.ok_or_else(|| anyhow!("could not determine input sample rate"))?;
        let channels = channels.ok_or_else(|| anyhow!("could not determine channel count"))?;
        if interleaved.is_empty() {
            return Ok((vec![Vec::new(); channels], sample_rate));
        }

        let frames = interleaved.len() / channels;
        let mut samples = vec![Vec::with_capacity(frames); channels];
        for frame in interleaved.chunks_exact(channels) {
            for (channel, &value) in samples.iter_mut().zip(frame.iter()) {
                channel.push(value);
            }
        }

        Ok((samples, sample_rate))
    }

    /// Write a mono waveform as a 16-bit PCM WAV file.
    pub fn write_wav(path: impl AsRef<Path>, samples: &[f32], sample_rate: u32) -> Result<()> {
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec)?;
        for &value in samples {
            let clamped = value.clamp(-1.0, 1.0);
            writer.write_sample((clamped * i16::MAX as f32).round() as i16)?;
        }
        writer.finalize()?;
        Ok(())
    }
}
