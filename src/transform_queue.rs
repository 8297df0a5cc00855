//! Time-indexed pose queue.
//!
//! Pose ingress pushes stamped transforms as they arrive; point-cloud ingress
//! asks for the interpolated pose at the cloud's timestamp. A lookup succeeds
//! only when the timestamp is bracketed by two queue entries that are both
//! within the staleness window, so a stalled pose source never produces
//! extrapolated poses.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tracing::info;

use crate::transform::Transform;

/// Maximum distance (seconds) from either bracketing pose.
const MAX_POSE_AGE: f64 = 0.1;

/// A transform observed at a point in time (seconds).
#[derive(Clone, Copy, Debug)]
pub struct StampedTransform {
  pub stamp: f64,
  pub transform: Transform,
}

/// Queue of stamped transforms with interpolated lookup.
///
/// A static sensor-to-body offset is composed onto every returned pose.
pub struct TransformQueue {
  static_transform: Transform,
  entries: Mutex<VecDeque<StampedTransform>>,
}

impl TransformQueue {
  pub fn new(static_transform: Transform) -> Self {
    Self {
      static_transform,
      entries: Mutex::new(VecDeque::new()),
    }
  }

  /// Append a transform observation. Stamps are expected monotonic.
  pub fn push(&self, stamp: f64, transform: Transform) {
    self.entries.lock().push_back(StampedTransform { stamp, transform });
  }

  /// Number of queued observations.
  pub fn len(&self) -> usize {
    self.entries.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.lock().is_empty()
  }

  /// Interpolated pose at `stamp`, or `None` when the queue cannot bracket
  /// the timestamp with fresh enough observations. On success, observations
  /// older than `stamp` are dropped.
  pub fn lookup(&self, stamp: f64) -> Option<Transform> {
    let result = self.lookup_inner(stamp);
    if result.is_none() {
      info!(stamp, "no pose available for timestamp");
    }
    result
  }

  fn lookup_inner(&self, stamp: f64) -> Option<Transform> {
    let mut entries = self.entries.lock();

    let first = entries.front()?;
    if stamp < first.stamp {
      return None;
    }

    // Find the bracketing pair.
    let mut upper = None;
    for i in 1..entries.len() {
      if entries[i - 1].stamp < stamp && entries[i].stamp > stamp {
        upper = Some(i);
        break;
      }
    }
    let upper = upper?;
    let before = entries[upper - 1];
    let after = entries[upper];

    if before.stamp + MAX_POSE_AGE < stamp || after.stamp - MAX_POSE_AGE > stamp {
      return None;
    }

    let alpha = (stamp - before.stamp) / (after.stamp - before.stamp);
    let interpolated = Transform::interpolate(&before.transform, &after.transform, alpha);
    let result = interpolated.compose(&self.static_transform);

    while entries.front().is_some_and(|e| e.stamp < stamp) {
      entries.pop_front();
    }

    Some(result)
  }
}
