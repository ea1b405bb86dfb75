//! Audio artifact encoding.
//!
//! Captured PCM is encoded into an uploadable Opus artifact via an ffmpeg
//! subprocess: samples are written to a temporary WAV, converted into the
//! negotiated container, and read back as bytes. Container negotiation prefers
//! Ogg and falls back to WebM when the ffmpeg build lacks an Ogg muxer; the
//! choice is made once per segment, at start-of-recording.

use anyhow::{anyhow, Result};
use hound::WavWriter;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Container/codec pair for an encoded recording segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEncoding {
    /// Ogg container, Opus codec (preferred)
    OggOpus,
    /// WebM container, Opus codec (fallback)
    WebmOpus,
}

impl AudioEncoding {
    /// File extension used for the uploaded artifact name.
    pub fn extension(&self) -> &'static str {
        match self {
            AudioEncoding::OggOpus => "ogg",
            AudioEncoding::WebmOpus => "webm",
        }
    }

    /// MIME type for the multipart file part.
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioEncoding::OggOpus => "audio/ogg",
            AudioEncoding::WebmOpus => "audio/webm",
        }
    }

    /// ffmpeg muxer name for the container.
    fn muxer(&self) -> &'static str {
        match self {
            AudioEncoding::OggOpus => "ogg",
            AudioEncoding::WebmOpus => "webm",
        }
    }
}

/// An encoded recording segment: opaque bytes plus the encoding they carry.
///
/// Owned by the recording controller until handed to the backend client for
/// upload, then discarded.
#[derive(Debug, Clone)]
pub struct AudioArtifact {
    pub bytes: Vec<u8>,
    pub encoding: AudioEncoding,
}

/// Capability interface for turning a segment's samples into an uploadable
/// artifact. The recording controller negotiates once per segment and encodes
/// on stop; tests substitute a fake so no ffmpeg is needed.
pub trait SegmentEncoder {
    /// Picks the encoding for a new segment: Ogg/Opus when available,
    /// WebM/Opus otherwise. Fixed for the whole segment.
    fn negotiate(&self) -> AudioEncoding;

    /// Encodes a segment's samples into an artifact.
    ///
    /// # Errors
    /// - If the artifact cannot be assembled
    fn encode(
        &self,
        samples: &[i16],
        sample_rate: u32,
        encoding: AudioEncoding,
    ) -> Result<AudioArtifact>;
}

/// Encodes PCM segments into Opus artifacts using ffmpeg.
pub struct ArtifactEncoder {
    ffmpeg_path: PathBuf,
    /// Container support probed once at construction; `negotiate` snapshots it
    /// per segment.
    preferred: AudioEncoding,
}

impl ArtifactEncoder {
    /// Locates ffmpeg and probes its container support.
    ///
    /// # Errors
    /// - If ffmpeg cannot be found on the system
    pub fn new() -> Result<Self> {
        let ffmpeg_path = find_ffmpeg()?;
        let preferred = probe_preferred_encoding(&ffmpeg_path);
        tracing::debug!(
            "Artifact encoder ready: ffmpeg={}, container={}",
            ffmpeg_path.display(),
            preferred.extension()
        );
        Ok(Self {
            ffmpeg_path,
            preferred,
        })
    }

    fn encode_via_ffmpeg(
        &self,
        samples: &[i16],
        sample_rate: u32,
        encoding: AudioEncoding,
        temp_wav: &Path,
        temp_out: &Path,
    ) -> Result<AudioArtifact> {
        save_wav(samples, sample_rate, temp_wav)?;

        let output = Command::new(&self.ffmpeg_path)
            .arg("-loglevel")
            .arg("error")
            .arg("-i")
            .arg(temp_wav)
            .arg("-acodec")
            .arg("libopus")
            .arg("-ac")
            .arg("1") // Force mono
            .arg("-f")
            .arg(encoding.muxer())
            .arg("-y") // Overwrite output
            .arg(temp_out)
            .output()?;

        if !output.status.success() {
            let error_msg = String::from_utf8_lossy(&output.stderr);
            tracing::error!("ffmpeg conversion failed: {}", error_msg);
            return Err(anyhow!("Audio encoding failed: {error_msg}"));
        }

        let bytes = std::fs::read(temp_out)?;
        tracing::debug!(
            "Segment encoded: {} bytes as {}",
            bytes.len(),
            encoding.extension()
        );
        Ok(AudioArtifact { bytes, encoding })
    }
}

impl SegmentEncoder for ArtifactEncoder {
    fn negotiate(&self) -> AudioEncoding {
        self.preferred
    }

    /// # Errors
    /// - If the temporary WAV cannot be written
    /// - If ffmpeg conversion fails
    fn encode(
        &self,
        samples: &[i16],
        sample_rate: u32,
        encoding: AudioEncoding,
    ) -> Result<AudioArtifact> {
        let temp_wav = temp_path("wav");
        let temp_out = temp_path(encoding.extension());

        let result = self.encode_via_ffmpeg(samples, sample_rate, encoding, &temp_wav, &temp_out);

        // Temporary files are cleaned up on success and failure alike.
        for path in [&temp_wav, &temp_out] {
            if let Err(e) = std::fs::remove_file(path) {
                if path.exists() {
                    tracing::debug!("Failed to remove temp file {}: {}", path.display(), e);
                }
            }
        }

        result
    }
}

/// Writes samples as an uncompressed mono PCM WAV intermediate file.
fn save_wav(samples: &[i16], sample_rate: u32, path: &Path) -> Result<()> {
    let wav_spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, wav_spec)?;

    for &sample in samples {
        writer.write_sample(sample)?;
    }

    writer.finalize()?;
    tracing::debug!("Temporary WAV created: {}", path.display());
    Ok(())
}

fn temp_path(extension: &str) -> PathBuf {
    std::env::temp_dir().join(format!("viva_{}.{extension}", std::process::id()))
}

/// Probes `ffmpeg -muxers` for Ogg support; falls back to WebM when the probe
/// fails or Ogg is absent.
fn probe_preferred_encoding(ffmpeg_path: &Path) -> AudioEncoding {
    let output = Command::new(ffmpeg_path)
        .arg("-hide_banner")
        .arg("-muxers")
        .output();

    match output {
        Ok(out) if out.status.success() => {
            let listing = String::from_utf8_lossy(&out.stdout);
            if muxer_listed(&listing, "ogg") {
                AudioEncoding::OggOpus
            } else {
                tracing::warn!("ffmpeg lacks an Ogg muxer, falling back to WebM/Opus");
                AudioEncoding::WebmOpus
            }
        }
        _ => {
            tracing::warn!("Could not probe ffmpeg muxers, falling back to WebM/Opus");
            AudioEncoding::WebmOpus
        }
    }
}

/// Parses `ffmpeg -muxers` output for a muxer name. Lines look like
/// `  E ogg             Ogg`.
fn muxer_listed(listing: &str, name: &str) -> bool {
    listing.lines().any(|line| {
        line.split_whitespace()
            .nth(1)
            .is_some_and(|muxer| muxer == name)
    })
}

/// Locates the ffmpeg binary on the system.
///
/// Checks common installation locations by platform before falling back to a
/// PATH search, so ffmpeg is found even under a limited PATH.
///
/// # Returns
/// The path to the ffmpeg binary, or an error if not found.
pub fn find_ffmpeg() -> Result<PathBuf> {
    let candidates = if cfg!(target_os = "macos") {
        vec![
            PathBuf::from("/opt/homebrew/bin/ffmpeg"),      // Apple Silicon Homebrew
            PathBuf::from("/usr/local/bin/ffmpeg"),         // Intel Homebrew or manual install
            PathBuf::from("/usr/bin/ffmpeg"),               // Direct system install
        ]
    } else if cfg!(target_os = "linux") {
        vec![
            PathBuf::from("/usr/bin/ffmpeg"),               // Standard Linux
            PathBuf::from("/usr/local/bin/ffmpeg"),         // Manual install
            PathBuf::from("/snap/bin/ffmpeg"),              // Snap installation
        ]
    } else if cfg!(target_os = "windows") {
        vec![
            PathBuf::from("C:\\ffmpeg\\bin\\ffmpeg.exe"),
            PathBuf::from("C:\\Program Files\\ffmpeg\\bin\\ffmpeg.exe"),
            PathBuf::from("C:\\Program Files (x86)\\ffmpeg\\bin\\ffmpeg.exe"),
        ]
    } else {
        vec![] // For other platforms, rely on PATH search
    };

    for path in candidates {
        if path.exists() {
            tracing::debug!("Found ffmpeg at: {}", path.display());
            return Ok(path);
        }
    }

    let ffmpeg_path = find_in_path("ffmpeg")?;
    tracing::debug!("Found ffmpeg in PATH at: {}", ffmpeg_path.display());
    Ok(ffmpeg_path)
}

/// Searches for a binary in the system PATH.
///
/// Uses `which` on Unix systems and `where` on Windows.
fn find_in_path(binary_name: &str) -> Result<PathBuf> {
    let search_cmd = if cfg!(target_os = "windows") {
        "where"
    } else {
        "which"
    };

    let output = std::process::Command::new(search_cmd)
        .arg(binary_name)
        .output()
        .map_err(|e| anyhow!("Failed to search PATH for {binary_name}: {e}"))?;

    if output.status.success() {
        let path_str = String::from_utf8_lossy(&output.stdout);
        let path = PathBuf::from(path_str.trim());
        if !path.as_os_str().is_empty() {
            return Ok(path);
        }
    }

    Err(anyhow!(
        "ffmpeg not found. Please install ffmpeg:\n\
         macOS: brew install ffmpeg\n\
         Linux: apt install ffmpeg (Debian/Ubuntu) or dnf install ffmpeg (Fedora)\n\
         Windows: Download from https://ffmpeg.org/download.html"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn muxer_listing_is_parsed_by_name_column() {
        let listing = "File formats:\n\
                       \x20 E mux        = muxing supported\n\
                       \x20 --\n\
                       \x20 E matroska        Matroska\n\
                       \x20 E ogg             Ogg\n\
                       \x20 E webm            WebM\n";
        assert!(muxer_listed(listing, "ogg"));
        assert!(muxer_listed(listing, "webm"));
        assert!(!muxer_listed(listing, "ogv"));
    }

    #[test]
    fn encoding_metadata_matches_upload_contract() {
        assert_eq!(AudioEncoding::OggOpus.extension(), "ogg");
        assert_eq!(AudioEncoding::WebmOpus.extension(), "webm");
        assert_eq!(AudioEncoding::OggOpus.mime_type(), "audio/ogg");
        assert_eq!(AudioEncoding::WebmOpus.mime_type(), "audio/webm");
    }

    #[test]
    fn test_find_ffmpeg() {
        // This test will succeed if ffmpeg is installed
        match find_ffmpeg() {
            Ok(path) => println!("Found ffmpeg at: {}", path.display()),
            Err(e) => println!("ffmpeg not found (expected on CI): {e}"),
        }
    }
}
