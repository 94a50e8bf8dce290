//! Decoded frames, frame sources and temporary media files.
//! Decoding itself is delegated to an external `VideoDecoder`.

use crate::error::AgentError;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// One decoded frame. `index` is the position in its source stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub index: u64,
    pub width: u32,
    pub height: u32,
    /// Packed pixel data in the decoder's layout
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(index: u64, width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            index,
            width,
            height,
            data,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub total_frames: u64,
    pub fps: f64,
    pub duration_secs: f64,
}

impl VideoMetadata {
    pub fn new(total_frames: u64, fps: f64) -> Self {
        let duration_secs = if fps > 0.0 { total_frames as f64 / fps } else { 0.0 };
        Self {
            total_frames,
            fps,
            duration_secs,
        }
    }
}

/// Sequential frame reader for one video or stream.
pub trait VideoSource: Send {
    fn metadata(&self) -> VideoMetadata;
    /// Next frame, or None at end of stream
    fn next_frame(&mut self) -> Result<Option<Frame>, AgentError>;
}

/// Opens a media file for sequential reading.
pub trait VideoDecoder: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn VideoSource>, AgentError>;
}

/// Uploaded bytes written to disk for path-based decoders. The file is removed when this
/// value is dropped, on success and error paths alike.
pub struct TempMedia {
    file: NamedTempFile,
}

impl TempMedia {
    pub fn write(bytes: &[u8], suffix: &str) -> Result<Self, AgentError> {
        let mut file = tempfile::Builder::new()
            .prefix("dog-agent-")
            .suffix(suffix)
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl Drop for TempMedia {
    fn drop(&mut self) {
        tracing::debug!(path = %self.file.path().display(), "releasing temporary media");
    }
}

/// Frame-skip and max-frame bounds applied while reading a source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingPolicy {
    pub max_frames: usize,
    pub frame_skip: usize,
}

impl SamplingPolicy {
    /// Whether the frame at `position` (0-based, in read order) is analyzed
    pub fn samples(&self, position: u64) -> bool {
        position % self.frame_skip.max(1) as u64 == 0
    }

    pub fn exhausted(&self, processed: usize) -> bool {
        processed >= self.max_frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_media_is_removed_on_drop() {
        let media = TempMedia::write(b"not really an mp4", ".mp4").unwrap();
        let path = media.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("mp4"));
        assert_eq!(std::fs::read(&path).unwrap(), b"not really an mp4");
        drop(media);
        assert!(!path.exists());
    }

    #[test]
    fn sampling_stride_and_cap() {
        let p = SamplingPolicy {
            max_frames: 3,
            frame_skip: 2,
        };
        let picked: Vec<u64> = (0..10).filter(|i| p.samples(*i)).collect();
        assert_eq!(picked, vec![0, 2, 4, 6, 8]);
        assert!(!p.exhausted(2));
        assert!(p.exhausted(3));
    }

    #[test]
    fn duration_guards_zero_fps() {
        assert_eq!(VideoMetadata::new(100, 0.0).duration_secs, 0.0);
        assert_eq!(VideoMetadata::new(100, 25.0).duration_secs, 4.0);
    }
}
