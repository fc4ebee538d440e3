//! Audio I/O for the CLI frontend.
//!
//! Handles reading raw interleaved little-endian `f32` PCM from stdin and
//! writing the same format to stdout.

use std::io::{self, ErrorKind, Read, Write};

use tracing::warn;

use crate::error::{ClipperError, Result};
use crate::DiodeClipper;

/// Buffer size for audio processing (in frames).
pub const BUFFER_SIZE: usize = 256;

const BYTES_PER_SAMPLE: usize = 4;

/// Linear gain applied around the clipper stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainStage {
    /// Multiplier applied before the clipper (drive)
    pub input: f32,
    /// Multiplier applied after the clipper (level)
    pub output: f32,
}

impl Default for GainStage {
    fn default() -> Self {
        Self {
            input: 1.0,
            output: 1.0,
        }
    }
}

impl GainStage {
    /// Build from decibel values.
    pub fn from_db(input_db: f32, output_db: f32) -> Self {
        Self {
            input: db_to_gain(input_db),
            output: db_to_gain(output_db),
        }
    }
}

/// Convert decibels to a linear amplitude factor.
pub fn db_to_gain(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

/// Interleaved audio reader.
///
/// Reads whole frames only; a partial frame at the end of a read is kept
/// and completed by the next one.
pub struct AudioInput<R> {
    reader: R,
    buffer: Vec<u8>,
    pending: usize,
    frame_bytes: usize,
}

impl<R: Read> AudioInput<R> {
    /// Create a new audio input reader for `channels`-wide frames.
    pub fn new(reader: R, channels: usize) -> Self {
        let frame_bytes = channels.max(1) * BYTES_PER_SAMPLE;
        Self {
            reader,
            buffer: vec![0u8; BUFFER_SIZE * frame_bytes],
            pending: 0,
            frame_bytes,
        }
    }

    /// Read a block of whole frames.
    /// Returns the number of samples written to `samples`, or 0 on EOF.
    pub fn read_block(&mut self, samples: &mut [f32]) -> Result<usize> {
        loop {
            let bytes_read = match self.reader.read(&mut self.buffer[self.pending..]) {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(ClipperError::AudioInputError {
                        message: e.to_string(),
                    })
                }
            };

            if bytes_read == 0 {
                if self.pending > 0 {
                    warn!(bytes = self.pending, "dropping incomplete trailing frame");
                    self.pending = 0;
                }
                return Ok(0);
            }

            let available = self.pending + bytes_read;
            let usable = available - available % self.frame_bytes;
            if usable == 0 {
                self.pending = available;
                continue;
            }

            let count = usable / BYTES_PER_SAMPLE;
            if samples.len() < count {
                return Err(ClipperError::AudioInputError {
                    message: format!("sample buffer holds {} samples, need {count}", samples.len()),
                });
            }
            for (sample, bytes) in samples
                .iter_mut()
                .zip(self.buffer[..usable].chunks_exact(BYTES_PER_SAMPLE))
            {
                *sample = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            }

            self.buffer.copy_within(usable..available, 0);
            self.pending = available - usable;
            return Ok(count);
        }
    }
}

/// Audio output writer.
pub struct AudioOutput<W> {
    writer: W,
    buffer: Vec<u8>,
}

impl<W: Write> AudioOutput<W> {
    /// Create a new audio output writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            buffer: Vec::with_capacity(BUFFER_SIZE * BYTES_PER_SAMPLE),
        }
    }

    /// Write a block of samples.
    pub fn write_block(&mut self, samples: &[f32]) -> Result<()> {
        self.buffer.clear();
        for sample in samples {
            self.buffer.extend_from_slice(&sample.to_le_bytes());
        }

        self.writer
            .write_all(&self.buffer)
            .map_err(|e| ClipperError::AudioOutputError {
                message: e.to_string(),
            })
    }

    /// Flush the output stream.
    pub fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| ClipperError::AudioOutputError {
                message: e.to_string(),
            })
    }
}

/// Stream interleaved audio from `reader` to `writer` through the clipper.
///
/// Returns the number of frames processed.
pub fn process_stream<R: Read, W: Write>(
    clipper: &mut DiodeClipper,
    gain: GainStage,
    reader: R,
    writer: W,
) -> Result<u64> {
    let channels = clipper.num_channels();
    if channels == 0 {
        return Err(ClipperError::invalid_configuration("clipper is not configured"));
    }

    let mut input = AudioInput::new(reader, channels);
    let mut output = AudioOutput::new(writer);
    let mut samples = vec![0.0f32; BUFFER_SIZE * channels];
    let mut frames = 0u64;

    loop {
        let samples_read = input.read_block(&mut samples)?;

        if samples_read == 0 {
            break;
        }

        let block = &mut samples[..samples_read];
        block.iter_mut().for_each(|s| *s *= gain.input);
        clipper.process_interleaved(block)?;
        block.iter_mut().for_each(|s| *s *= gain.output);

        output.write_block(block)?;
        frames += (samples_read / channels) as u64;
    }

    output.flush()?;
    Ok(frames)
}

/// Process audio from stdin to stdout using the given clipper.
pub fn process_audio(clipper: &mut DiodeClipper, gain: GainStage) -> Result<u64> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    process_stream(clipper, gain, stdin.lock(), io::BufWriter::new(stdout.lock()))
}
