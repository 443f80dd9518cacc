//! Scan progress notifications.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::net::types::FrameParameters;

/// Observer for a running acquisition.
///
/// Callbacks execute on the scanning thread and must return promptly; a
/// slow callback stalls the data socket.
pub trait ScanListener {
    /// The acquisition loop is about to issue its first START.
    fn scanning_started(&mut self, device: &str) {
        let _ = device;
    }

    /// A frame's parameters arrived and its data socket is open.
    /// `likely_total` is 3 for three-pass color scans, otherwise 1.
    fn frame_acquisition_started(
        &mut self,
        device: &str,
        parameters: &FrameParameters,
        frame_index: usize,
        likely_total: usize,
    ) {
        let _ = (device, parameters, frame_index, likely_total);
    }

    /// One record of frame data arrived. `expected_bytes` is `None` while
    /// the frame height is unknown.
    fn record_read(&mut self, device: &str, total_bytes_read: usize, expected_bytes: Option<usize>) {
        let _ = (device, total_bytes_read, expected_bytes);
    }

    /// The image was assembled.
    fn scanning_finished(&mut self, device: &str) {
        let _ = device;
    }
}

/// Listener that ignores every notification.
#[derive(Debug, Default)]
pub struct NullListener;

impl ScanListener for NullListener {}

/// Wrapper that drops `record_read` notifications arriving within a
/// per-device minimum interval. All other callbacks pass through.
pub struct RateLimitedListener<L> {
    inner: L,
    min_interval: Duration,
    last_notified: HashMap<String, Instant>,
}

impl<L: ScanListener> RateLimitedListener<L> {
    pub fn new(inner: L, min_interval: Duration) -> Self {
        Self {
            inner,
            min_interval,
            last_notified: HashMap::new(),
        }
    }

    pub fn into_inner(self) -> L {
        self.inner
    }
}

impl<L: ScanListener> ScanListener for RateLimitedListener<L> {
    fn scanning_started(&mut self, device: &str) {
        self.inner.scanning_started(device);
    }

    fn frame_acquisition_started(
        &mut self,
        device: &str,
        parameters: &FrameParameters,
        frame_index: usize,
        likely_total: usize,
    ) {
        self.inner
            .frame_acquisition_started(device, parameters, frame_index, likely_total);
    }

    fn record_read(&mut self, device: &str, total_bytes_read: usize, expected_bytes: Option<usize>) {
        let now = Instant::now();
        if let Some(last) = self.last_notified.get(device) {
            if now.duration_since(*last) < self.min_interval {
                return;
            }
        }
        self.last_notified.insert(device.to_string(), now);
        self.inner.record_read(device, total_bytes_read, expected_bytes);
    }

    fn scanning_finished(&mut self, device: &str) {
        // A final progress notification should never be suppressed for the
        // next scan of the same device.
        self.last_notified.remove(device);
        self.inner.scanning_finished(device);
    }
}
