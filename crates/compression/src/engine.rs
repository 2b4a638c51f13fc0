//! Block-streaming compression of files
//!
//! Input is read in fixed-size blocks and pushed through a zlib stream, so
//! peak memory is bounded by the block size regardless of file size. The zlib
//! trailer carries an Adler-32 checksum, which is how corrupt input is caught
//! on the way back.
//!
//! The boolean [`CompressionEngine::compress`] / [`CompressionEngine::decompress`]
//! entry points never propagate errors; the `try_*` variants return the cause.
//! Either way a partially written output file is removed before returning.

use flate2::write::ZlibEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use zpress_config::DEFAULT_BLOCK_SIZE;
use zpress_core::CompressionLevel;

/// Failure inside the engine
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to {operation} '{path}': {source}")]
    Io {
        path: PathBuf,
        operation: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("corrupt compressed stream: {0}")]
    Corrupt(String),

    #[error("compressed stream is truncated")]
    Truncated,
}

impl EngineError {
    fn io<'a>(
        path: &'a Path,
        operation: &'static str,
    ) -> impl FnOnce(io::Error) -> EngineError + 'a {
        move |source| EngineError::Io {
            path: path.to_path_buf(),
            operation,
            source,
        }
    }
}

/// Byte counts of one streaming pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSummary {
    pub bytes_read: u64,
    pub bytes_written: u64,
}

/// Stateless compress/decompress primitive
#[derive(Debug, Clone)]
pub struct CompressionEngine {
    block_size: usize,
}

impl Default for CompressionEngine {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_SIZE)
    }
}

impl CompressionEngine {
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size: block_size.max(1),
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Compress `input` into `output` at `level`; `false` on any failure
    pub fn compress(&self, input: &Path, output: &Path, level: CompressionLevel) -> bool {
        match self.try_compress(input, output, level) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(input = %input.display(), error = %e, "compression failed");
                false
            }
        }
    }

    /// Decompress `input` into `output`; `false` on any failure
    pub fn decompress(&self, input: &Path, output: &Path) -> bool {
        match self.try_decompress(input, output) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(input = %input.display(), error = %e, "decompression failed");
                false
            }
        }
    }

    pub fn try_compress(
        &self,
        input: &Path,
        output: &Path,
        level: CompressionLevel,
    ) -> Result<StreamSummary, EngineError> {
        let reader = File::open(input).map_err(EngineError::io(input, "open input"))?;
        let writer = File::create(output).map_err(EngineError::io(output, "create output"))?;

        let result = self.deflate_stream(reader, writer, level, input, output);
        if result.is_err() {
            remove_partial(output);
        }
        result
    }

    pub fn try_decompress(&self, input: &Path, output: &Path) -> Result<StreamSummary, EngineError> {
        let reader = File::open(input).map_err(EngineError::io(input, "open input"))?;
        let writer = File::create(output).map_err(EngineError::io(output, "create output"))?;

        let result = self.inflate_stream(reader, writer, input, output);
        if result.is_err() {
            remove_partial(output);
        }
        result
    }

    fn deflate_stream(
        &self,
        mut reader: File,
        writer: File,
        level: CompressionLevel,
        input: &Path,
        output: &Path,
    ) -> Result<StreamSummary, EngineError> {
        let mut encoder = ZlibEncoder::new(
            BufWriter::with_capacity(self.block_size, writer),
            Compression::new(level.value()),
        );
        let mut block = vec![0u8; self.block_size];

        loop {
            let n = match reader.read(&mut block) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(EngineError::io(input, "read input")(e)),
            };
            encoder
                .write_all(&block[..n])
                .map_err(EngineError::io(output, "write output"))?;
        }

        encoder.try_finish().map_err(EngineError::io(output, "finish output"))?;
        let summary = StreamSummary {
            bytes_read: encoder.total_in(),
            bytes_written: encoder.total_out(),
        };
        let mut writer = encoder
            .finish()
            .map_err(EngineError::io(output, "finish output"))?;
        writer.flush().map_err(EngineError::io(output, "flush output"))?;

        Ok(summary)
    }

    fn inflate_stream(
        &self,
        mut reader: File,
        writer: File,
        input: &Path,
        output: &Path,
    ) -> Result<StreamSummary, EngineError> {
        let mut writer = BufWriter::with_capacity(self.block_size, writer);
        let mut inflater = Decompress::new(true);
        let mut in_block = vec![0u8; self.block_size];
        let mut out_block = vec![0u8; self.block_size];
        let (mut start, mut end) = (0usize, 0usize);
        let mut eof = false;

        loop {
            if start == end && !eof {
                end = loop {
                    match reader.read(&mut in_block) {
                        Ok(n) => break n,
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(e) => return Err(EngineError::io(input, "read input")(e)),
                    }
                };
                start = 0;
                eof = end == 0;
            }

            let flush = if eof {
                FlushDecompress::Finish
            } else {
                FlushDecompress::None
            };
            let (in_before, out_before) = (inflater.total_in(), inflater.total_out());
            let status = inflater
                .decompress(&in_block[start..end], &mut out_block, flush)
                .map_err(|e| EngineError::Corrupt(e.to_string()))?;
            let consumed = (inflater.total_in() - in_before) as usize;
            let produced = (inflater.total_out() - out_before) as usize;
            start += consumed;

            writer
                .write_all(&out_block[..produced])
                .map_err(EngineError::io(output, "write output"))?;

            if status == Status::StreamEnd {
                if start < end || (!eof && has_more_input(&mut reader, &mut in_block, input)?) {
                    return Err(EngineError::Corrupt(
                        "trailing data after compressed stream".to_string(),
                    ));
                }
                break;
            }
            // no progress with nothing more to read means the stream was cut short
            if consumed == 0 && produced == 0 && (eof || start < end) {
                return Err(if eof {
                    EngineError::Truncated
                } else {
                    EngineError::Corrupt("decoder made no progress".to_string())
                });
            }
        }

        writer.flush().map_err(EngineError::io(output, "flush output"))?;

        Ok(StreamSummary {
            bytes_read: inflater.total_in(),
            bytes_written: inflater.total_out(),
        })
    }
}

fn has_more_input(reader: &mut File, buf: &mut [u8], input: &Path) -> Result<bool, EngineError> {
    loop {
        match reader.read(buf) {
            Ok(n) => return Ok(n > 0),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(EngineError::io(input, "read input")(e)),
        }
    }
}

/// Size of the file at `path` in bytes
pub fn size_of(path: &Path) -> io::Result<u64> {
    fs::metadata(path).map(|m| m.len())
}

fn remove_partial(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(
                "Failed to remove partial output {}: {}",
                path.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn roundtrip(engine: &CompressionEngine, data: &[u8], level: CompressionLevel) -> Vec<u8> {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("input.bin");
        let packed = temp_dir.path().join("input.bin.z");
        let unpacked = temp_dir.path().join("output.bin");
        fs::write(&input, data).unwrap();

        assert!(engine.compress(&input, &packed, level));
        assert!(engine.decompress(&packed, &unpacked));
        fs::read(&unpacked).unwrap()
    }

    fn text_payload(len: usize) -> Vec<u8> {
        b"the quick brown fox jumps over the lazy dog\n"
            .iter()
            .copied()
            .cycle()
            .take(len)
            .collect()
    }

    #[test]
    fn test_empty_file_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("empty.txt");
        let packed = temp_dir.path().join("empty.txt.z");
        let unpacked = temp_dir.path().join("empty.out");
        fs::write(&input, b"").unwrap();

        let engine = CompressionEngine::default();
        assert!(engine.compress(&input, &packed, CompressionLevel::MAX));
        assert!(size_of(&packed).unwrap() > 0);
        assert!(engine.decompress(&packed, &unpacked));
        assert_eq!(size_of(&unpacked).unwrap(), 0);
    }

    #[test]
    fn test_multi_block_roundtrip() {
        // small blocks force many iterations of both loops
        let engine = CompressionEngine::new(64);
        let data = text_payload(10_000);
        assert_eq!(roundtrip(&engine, &data, CompressionLevel::BALANCED), data);
    }

    #[test]
    fn test_every_level_roundtrips() {
        let engine = CompressionEngine::new(4096);
        let data = text_payload(50_000);
        for level in 0..=9 {
            let level = CompressionLevel::new(level).unwrap();
            assert_eq!(roundtrip(&engine, &data, level), data, "level {level}");
        }
    }

    #[test]
    fn test_max_level_not_larger_than_stored() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("input.txt");
        let stored = temp_dir.path().join("stored.z");
        let max = temp_dir.path().join("max.z");
        fs::write(&input, text_payload(100_000)).unwrap();

        let engine = CompressionEngine::default();
        assert!(engine.compress(&input, &stored, CompressionLevel::NONE));
        assert!(engine.compress(&input, &max, CompressionLevel::MAX));
        assert!(size_of(&max).unwrap() <= size_of(&stored).unwrap());
    }

    #[test]
    fn test_missing_input_fails_without_touching_output() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("out.z");
        fs::write(&output, b"keep me").unwrap();

        let engine = CompressionEngine::default();
        assert!(!engine.compress(&temp_dir.path().join("nope"), &output, CompressionLevel::FAST));
        assert_eq!(fs::read(&output).unwrap(), b"keep me");
    }

    #[test]
    fn test_unwritable_output_fails() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("input.txt");
        fs::write(&input, b"data").unwrap();

        let engine = CompressionEngine::default();
        let output = temp_dir.path().join("missing-dir").join("out.z");
        assert!(!engine.compress(&input, &output, CompressionLevel::FAST));
    }

    #[test]
    fn test_truncated_stream_fails_and_removes_output() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("input.txt");
        let packed = temp_dir.path().join("input.txt.z");
        let unpacked = temp_dir.path().join("output.txt");
        fs::write(&input, text_payload(200_000)).unwrap();

        let engine = CompressionEngine::new(1024);
        assert!(engine.compress(&input, &packed, CompressionLevel::MAX));

        let bytes = fs::read(&packed).unwrap();
        fs::write(&packed, &bytes[..bytes.len() / 2]).unwrap();

        let err = engine.try_decompress(&packed, &unpacked).unwrap_err();
        assert!(matches!(err, EngineError::Truncated | EngineError::Corrupt(_)));
        assert!(!unpacked.exists());
    }

    #[test]
    fn test_corrupt_checksum_fails() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("input.txt");
        let packed = temp_dir.path().join("input.txt.z");
        let unpacked = temp_dir.path().join("output.txt");
        fs::write(&input, text_payload(5_000)).unwrap();

        let engine = CompressionEngine::default();
        assert!(engine.compress(&input, &packed, CompressionLevel::NONE));

        // stored blocks: flipping a payload byte leaves the structure valid
        // but breaks the Adler-32 trailer
        let mut bytes = fs::read(&packed).unwrap();
        let middle = bytes.len() / 2;
        bytes[middle] ^= 0xFF;
        fs::write(&packed, &bytes).unwrap();

        assert!(!engine.decompress(&packed, &unpacked));
        assert!(!unpacked.exists());
    }

    #[test]
    fn test_garbage_input_fails() {
        let temp_dir = TempDir::new().unwrap();
        let packed = temp_dir.path().join("garbage.z");
        let unpacked = temp_dir.path().join("garbage.out");
        fs::write(&packed, b"definitely not a zlib stream").unwrap();

        assert!(!CompressionEngine::default().decompress(&packed, &unpacked));
        assert!(!unpacked.exists());
    }

    #[test]
    fn test_trailing_garbage_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("input.txt");
        let packed = temp_dir.path().join("input.txt.z");
        let unpacked = temp_dir.path().join("output.txt");
        fs::write(&input, text_payload(10_000)).unwrap();

        // tiny blocks so the garbage also arrives in a later read
        for block_size in [16, 64 * 1024] {
            let engine = CompressionEngine::new(block_size);
            assert!(engine.compress(&input, &packed, CompressionLevel::BALANCED));
            let mut bytes = fs::read(&packed).unwrap();
            bytes.extend_from_slice(b"appended junk");
            fs::write(&packed, &bytes).unwrap();

            let err = engine.try_decompress(&packed, &unpacked).unwrap_err();
            assert!(matches!(err, EngineError::Corrupt(_)), "block size {block_size}");
            assert!(!unpacked.exists());
        }
    }

    #[test]
    fn test_summary_counts_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("input.txt");
        let packed = temp_dir.path().join("input.txt.z");
        let data = text_payload(30_000);
        fs::write(&input, &data).unwrap();

        let summary = CompressionEngine::default()
            .try_compress(&input, &packed, CompressionLevel::BALANCED)
            .unwrap();
        assert_eq!(summary.bytes_read, data.len() as u64);
        assert_eq!(summary.bytes_written, size_of(&packed).unwrap());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_roundtrip_any_bytes(
            data in prop::collection::vec(any::<u8>(), 0..20_000),
            level in 0i64..=9,
        ) {
            let engine = CompressionEngine::new(1024);
            let level = CompressionLevel::new(level).unwrap();
            prop_assert_eq!(roundtrip(&engine, &data, level), data);
        }
    }
}
