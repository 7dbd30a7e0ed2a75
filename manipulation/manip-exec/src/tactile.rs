//! Latest-sample slot between the tactile sensor and the insertion loop.
//!
//! The sensor side publishes raw channel vectors as they arrive; the control
//! side only ever sees the most recent well-formed sample. Older samples are
//! overwritten, never queued. Malformed samples are dropped and counted, and
//! the previous sample stays current.
//!
//! There is exactly one [`TactileWriter`] and one [`TactileReader`] per slot.
//! Neither is `Clone`.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use manip_types::{Result, TactileSample};
use tracing::warn;

#[derive(Debug, Default)]
struct SlotState {
    latest: Option<TactileSample>,
    sequence: u64,
    faults: u64,
}

#[derive(Debug, Default)]
struct Slot {
    state: Mutex<SlotState>,
    updated: Condvar,
}

impl Slot {
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Creates a connected writer/reader pair.
///
/// # Example
///
/// ```
/// use manip_exec::tactile_channel;
/// use std::time::Duration;
///
/// let (writer, reader) = tactile_channel();
/// assert!(reader.latest().is_none());
///
/// let raw = [330.0, 240.0, 320.0, 240.0, 1.0, 0.0, 1.0, 480.0, 640.0];
/// assert!(writer.publish_raw(0.1, &raw));
/// assert!(!writer.publish_raw(0.2, &raw[..3]));
///
/// let (sequence, sample) = reader.wait_newer(0, Duration::from_millis(10)).unwrap();
/// assert_eq!(sequence, 1);
/// assert_eq!(sample.timestamp(), 0.1);
/// assert_eq!(writer.fault_count(), 1);
/// ```
#[must_use]
pub fn tactile_channel() -> (TactileWriter, TactileReader) {
    let slot = Arc::new(Slot::default());
    (
        TactileWriter {
            slot: Arc::clone(&slot),
        },
        TactileReader { slot },
    )
}

/// The sensor-facing half of a tactile slot.
#[derive(Debug)]
pub struct TactileWriter {
    slot: Arc<Slot>,
}

impl TactileWriter {
    /// Decodes and publishes a raw channel vector.
    ///
    /// Returns `false` if the vector was malformed and discarded.
    pub fn publish_raw(&self, timestamp: f64, raw: &[f64]) -> bool {
        match TactileSample::from_raw(timestamp, raw) {
            Ok(sample) => {
                self.publish(sample);
                true
            }
            Err(error) => {
                let mut state = self.slot.lock();
                state.faults += 1;
                warn!(timestamp, channels = raw.len(), %error, "Discarding malformed tactile sample");
                false
            }
        }
    }

    /// Publishes an already decoded sample.
    pub fn publish(&self, sample: TactileSample) {
        let mut state = self.slot.lock();
        state.latest = Some(sample);
        state.sequence += 1;
        drop(state);
        self.slot.updated.notify_all();
    }

    /// Number of malformed samples discarded so far.
    #[must_use]
    pub fn fault_count(&self) -> u64 {
        self.slot.lock().faults
    }
}

/// The control-facing half of a tactile slot.
#[derive(Debug)]
pub struct TactileReader {
    slot: Arc<Slot>,
}

impl TactileReader {
    /// Returns the most recent sample with its sequence number.
    #[must_use]
    pub fn latest(&self) -> Option<(u64, TactileSample)> {
        let state = self.slot.lock();
        state.latest.clone().map(|sample| (state.sequence, sample))
    }

    /// Waits up to `timeout` for a sample newer than sequence `after`.
    ///
    /// Returns `None` on timeout. A sample already newer than `after` is
    /// returned immediately.
    #[must_use]
    pub fn wait_newer(&self, after: u64, timeout: Duration) -> Option<(u64, TactileSample)> {
        let deadline = Instant::now() + timeout;
        let mut state = self.slot.lock();
        loop {
            if state.sequence > after {
                if let Some(sample) = &state.latest {
                    return Some((state.sequence, sample.clone()));
                }
            }
            let remaining = deadline.checked_duration_since(Instant::now())?;
            if remaining.is_zero() {
                return None;
            }
            state = self
                .slot
                .updated
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Number of malformed samples discarded so far.
    #[must_use]
    pub fn fault_count(&self) -> u64 {
        self.slot.lock().faults
    }
}

/// Control surface of a physical tactile sensor.
pub trait TactileSensor: Send + Sync {
    /// Re-zeroes the sensor's reference frame.
    ///
    /// # Errors
    ///
    /// Returns [`manip_types::ManipError::SensorFault`] if the sensor did not
    /// acknowledge.
    fn recalibrate(&self) -> Result<()>;
}
