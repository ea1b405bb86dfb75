//! Microphone capture.
//!
//! Capture is expressed as a small capability trait so the recording
//! controller can be exercised in tests without a device; the production
//! implementation captures from a cpal input device at its native sample rate
//! and mixes multi-channel audio down to mono.

use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};

#[cfg(target_os = "linux")]
use std::fs::OpenOptions;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

/// Capability interface over a microphone: acquire the device, accumulate
/// samples, release the device. The device is an exclusive, revocable
/// resource; `stop` must release it on every path.
pub trait AudioCapture {
    /// Acquires the device and opens a capture segment.
    ///
    /// # Errors
    /// - If permission is denied or no input device exists
    fn start(&mut self) -> Result<()>;

    /// Releases the device and returns all samples accumulated during the
    /// segment. Idempotent: a second call returns an empty buffer.
    fn stop(&mut self) -> Vec<i16>;

    /// Returns a snapshot of the samples accumulated so far (for level
    /// metering while recording).
    fn samples(&self) -> Vec<i16>;

    /// The actual sample rate of the open (or most recent) segment.
    fn sample_rate(&self) -> u32;

    /// Whether a capture segment is currently open.
    fn is_active(&self) -> bool;
}

/// Captures mono i16 PCM from a cpal input device.
///
/// Multi-channel input is averaged down to mono in the stream callback. The
/// stream handle is the device lease: dropping it releases the microphone,
/// which also happens from `Drop` if a segment is still open.
pub struct CpalCapture {
    /// Actual recording sample rate from the device
    sample_rate: u32,
    /// Accumulated mono samples for the open segment
    samples: Arc<Mutex<Vec<i16>>>,
    /// Active input stream; `Some` exactly while a segment is open
    stream: Option<cpal::Stream>,
    /// Device name, numeric index, or "default"
    device_name: String,
}

impl CpalCapture {
    /// Creates a capture for the given device at the requested sample rate.
    /// The actual rate may differ based on device capabilities; query
    /// `sample_rate()` after `start()`.
    pub fn new(requested_sample_rate: u32, device_name: String) -> Self {
        Self {
            sample_rate: requested_sample_rate,
            samples: Arc::new(Mutex::new(Vec::new())),
            stream: None,
            device_name,
        }
    }

    /// Mixes incoming device frames down to mono and appends them.
    fn handle_audio_callback(data: &[i16], samples_arc: &Arc<Mutex<Vec<i16>>>, num_channels: usize) {
        let mut samples = samples_arc.lock().unwrap();

        match num_channels {
            1 => {
                samples.extend_from_slice(data);
            }
            2 => {
                for chunk in data.chunks_exact(2) {
                    let left = chunk[0] as i32;
                    let right = chunk[1] as i32;
                    samples.push(((left + right) / 2) as i16);
                }
            }
            _ => {
                for chunk in data.chunks_exact(num_channels) {
                    let sum: i32 = chunk.iter().map(|&s| s as i32).sum();
                    samples.push((sum / num_channels as i32) as i16);
                }
            }
        }
    }
}

impl AudioCapture for CpalCapture {
    fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Err(anyhow!("a capture segment is already open"));
        }

        // Get device while suppressing ALSA library warnings
        let device = suppress_alsa_warnings(|| {
            let host = cpal::default_host();

            if self.device_name == "default" {
                host.default_input_device()
                    .ok_or_else(|| anyhow!("No audio input device available"))
            } else {
                find_device_by_name(&host, &self.device_name)
            }
        })?;

        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown device".to_string());
        tracing::info!("Recording device: {}", device_name);

        let device_config = device.default_input_config()?;
        let device_sample_rate = device_config.sample_rate().0;
        let num_channels = device_config.channels() as usize;

        if device_sample_rate != self.sample_rate {
            tracing::warn!(
                "Requested sample rate {}Hz but device uses {}Hz. Recording at device rate.",
                self.sample_rate,
                device_sample_rate
            );
        }

        self.sample_rate = device_sample_rate;
        self.samples.lock().unwrap().clear();

        let samples_arc = Arc::clone(&self.samples);
        let callback_channels = num_channels;

        let stream = device.build_input_stream(
            &device_config.into(),
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                Self::handle_audio_callback(data, &samples_arc, callback_channels);
            },
            |err| {
                tracing::error!("Audio stream error: {}", err);
            },
            None,
        )?;

        stream.play()?;
        self.stream = Some(stream);

        tracing::debug!(
            "Capture segment opened: {}Hz, {} channels",
            device_sample_rate,
            num_channels
        );
        Ok(())
    }

    fn stop(&mut self) -> Vec<i16> {
        // Dropping the stream releases the microphone.
        self.stream = None;

        let samples = std::mem::take(&mut *self.samples.lock().unwrap());
        let duration_secs = samples.len() as f32 / self.sample_rate as f32;
        tracing::info!(
            "Capture segment closed: {:.2}s ({} samples at {}Hz)",
            duration_secs,
            samples.len(),
            self.sample_rate
        );
        samples
    }

    fn samples(&self) -> Vec<i16> {
        self.samples.lock().unwrap().clone()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn is_active(&self) -> bool {
        self.stream.is_some()
    }
}

impl Drop for CpalCapture {
    fn drop(&mut self) {
        if self.stream.is_some() {
            tracing::warn!("Capture dropped while a segment was open; releasing device");
            self.stream = None;
        }
    }
}

/// Finds an audio input device by name or numeric index.
///
/// # Errors
/// - If no device with the specified name/index is found
fn find_device_by_name(host: &cpal::Host, device_spec: &str) -> Result<cpal::Device> {
    // Try to parse as a numeric index first
    if let Ok(index) = device_spec.parse::<usize>() {
        let devices: Vec<_> = host
            .input_devices()
            .map_err(|e| anyhow!("Failed to enumerate devices: {e}"))?
            .collect();

        if index < devices.len() {
            return Ok(devices.into_iter().nth(index).unwrap());
        } else {
            return Err(anyhow!(
                "Device index {} is out of range (0-{})",
                index,
                devices.len().saturating_sub(1)
            ));
        }
    }

    let devices = host
        .input_devices()
        .map_err(|e| anyhow!("Failed to enumerate devices: {e}"))?;

    for device in devices {
        if let Ok(name) = device.name() {
            if name == device_spec {
                return Ok(device);
            }
        }
    }

    Err(anyhow!(
        "Audio input device '{device_spec}' not found. Use 'viva list-devices' to see available devices."
    ))
}

/// Temporarily redirects stderr to /dev/null to suppress ALSA library warnings on Linux.
/// On non-Linux platforms, this is a no-op since ALSA doesn't exist.
#[cfg(target_os = "linux")]
fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let dev_null = OpenOptions::new()
        .write(true)
        .open("/dev/null")
        .map_err(|e| anyhow!("Failed to open /dev/null: {e}"))?;

    let dev_null_fd = dev_null.as_raw_fd();

    let old_stderr = unsafe { libc::dup(libc::STDERR_FILENO) };
    if old_stderr == -1 {
        return Err(anyhow!("Failed to duplicate stderr"));
    }

    let redirect_result = unsafe { libc::dup2(dev_null_fd, libc::STDERR_FILENO) };
    if redirect_result == -1 {
        unsafe { libc::close(old_stderr) };
        return Err(anyhow!("Failed to redirect stderr"));
    }

    let result = f();

    unsafe {
        libc::dup2(old_stderr, libc::STDERR_FILENO);
        libc::close(old_stderr);
    }

    result
}

/// On non-Linux platforms, no stderr suppression is needed since ALSA doesn't exist.
#[cfg(not(target_os = "linux"))]
fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    f()
}
