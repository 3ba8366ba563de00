//! Bundle of the position/duration mailboxes shared by UI and engine
//!
//! [`PositionDurationStore`] composes the mailboxes that carry the
//! user-visible time state (current/min/max position, window duration,
//! time format, precision, update-rate readout, zoom requests) plus the
//! plain window-anchor flag.
//!
//! The key rule lives in [`PositionDurationStore::rewindow`]: when the
//! duration changes, the anchored edge of the visible window stays
//! stationary. Anchored to the start, the start is held; anchored to the
//! end, `start_new = start_old + d_old - d_new` so the right edge is
//! fixed while the user drags a duration control.

use crate::sync::mailbox::{Side, ValueMailbox};
use crate::types::{AbsoluteTime, RelativeTime, TimeFormat, TimeWindow, WindowAnchor, ZoomRequest};
use std::sync::atomic::{AtomicBool, Ordering};

/// Mailboxes for position, duration and display readouts, plus the anchor
#[derive(Debug)]
pub struct PositionDurationStore {
    /// User-visible position: the anchored edge of the window
    pub position: ValueMailbox<AbsoluteTime>,
    /// Earliest known data time (engine readout)
    pub min_position: ValueMailbox<AbsoluteTime>,
    /// Latest known data time (engine readout)
    pub max_position: ValueMailbox<AbsoluteTime>,
    /// Window duration in seconds
    pub duration: ValueMailbox<RelativeTime>,
    /// Display format for time readouts
    pub time_format: ValueMailbox<TimeFormat>,
    /// Fractional-second digits for time readouts
    pub precision: ValueMailbox<usize>,
    /// Smoothed update-rate readout, preformatted for display
    pub update_rate: ValueMailbox<String>,
    /// Pending zoom request from the UI
    pub zoom: ValueMailbox<Option<ZoomRequest>>,
    /// Anchor flag: true when the window start is the visible position
    anchored_to_start: AtomicBool,
}

impl PositionDurationStore {
    /// Create a store with the given initial duration
    pub fn new(duration: RelativeTime) -> Self {
        Self {
            position: ValueMailbox::new(0.0),
            min_position: ValueMailbox::new(0.0),
            max_position: ValueMailbox::new(0.0),
            duration: ValueMailbox::new(duration),
            time_format: ValueMailbox::new(TimeFormat::default()),
            precision: ValueMailbox::new(3),
            update_rate: ValueMailbox::new(String::new()),
            zoom: ValueMailbox::new(None),
            anchored_to_start: AtomicBool::new(true),
        }
    }

    /// Which edge of the window the visible position tracks
    pub fn anchor(&self) -> WindowAnchor {
        if self.anchored_to_start.load(Ordering::Relaxed) {
            WindowAnchor::Start
        } else {
            WindowAnchor::End
        }
    }

    /// Set the anchor; chosen by the engine based on the active run mode
    pub fn set_anchor(&self, anchor: WindowAnchor) {
        self.anchored_to_start
            .store(anchor == WindowAnchor::Start, Ordering::Relaxed);
    }

    /// Absorb a duration change, keeping the anchored edge stationary
    pub fn rewindow(&self, window: TimeWindow, new_duration: RelativeTime) -> TimeWindow {
        match self.anchor() {
            WindowAnchor::Start => TimeWindow::new(window.start, new_duration),
            WindowAnchor::End => {
                TimeWindow::new(window.end() - new_duration.max(0.0), new_duration)
            }
        }
    }

    /// Engine-side publication of the window and known bounds
    ///
    /// The position readout carries the anchored edge so the UI's readout
    /// tracks what the user steers.
    pub fn publish(&self, window: TimeWindow, min: AbsoluteTime, max: AbsoluteTime) {
        self.position
            .set(window.position(self.anchor()), Side::Engine);
        self.min_position.set(min, Side::Engine);
        self.max_position.set(max, Side::Engine);
    }

    /// Format an absolute time using the current format and precision
    pub fn format_position(&self, t: AbsoluteTime, window_start: AbsoluteTime) -> String {
        let format = self.time_format.peek();
        let precision = self.precision.peek();
        format.format(t, window_start, precision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewindow_anchor_start() {
        let store = PositionDurationStore::new(10.0);
        store.set_anchor(WindowAnchor::Start);
        let w = store.rewindow(TimeWindow::new(100.0, 10.0), 4.0);
        assert_eq!(w.start, 100.0);
        assert_eq!(w.duration, 4.0);
    }

    #[test]
    fn test_rewindow_anchor_end_holds_right_edge() {
        let store = PositionDurationStore::new(10.0);
        store.set_anchor(WindowAnchor::End);
        let old = TimeWindow::new(100.0, 10.0);
        let w = store.rewindow(old, 4.0);
        // start_new = start_old + d_old - d_new
        assert_eq!(w.start, 106.0);
        assert_eq!(w.end(), old.end());

        // Growing the window also holds the right edge.
        let w = store.rewindow(old, 25.0);
        assert_eq!(w.start, 85.0);
        assert_eq!(w.end(), old.end());
    }

    #[test]
    fn test_publish_carries_anchored_edge() {
        let store = PositionDurationStore::new(10.0);
        let window = TimeWindow::new(50.0, 10.0);

        store.set_anchor(WindowAnchor::Start);
        store.publish(window, 0.0, 100.0);
        assert_eq!(store.position.get(Side::Ui), Some(50.0));

        store.set_anchor(WindowAnchor::End);
        store.publish(window, 0.0, 100.0);
        assert_eq!(store.position.get(Side::Ui), Some(60.0));
        assert_eq!(store.min_position.get(Side::Ui), Some(0.0));
        assert_eq!(store.max_position.get(Side::Ui), Some(100.0));
    }

    #[test]
    fn test_engine_does_not_see_own_publication() {
        let store = PositionDurationStore::new(10.0);
        store.publish(TimeWindow::new(1.0, 2.0), 0.0, 10.0);
        assert_eq!(store.position.get(Side::Engine), None);
    }

    #[test]
    fn test_zoom_request_round_trip() {
        let store = PositionDurationStore::new(10.0);
        store.zoom.set(Some(ZoomRequest::In), Side::Ui);
        assert_eq!(store.zoom.get(Side::Engine), Some(Some(ZoomRequest::In)));
        assert_eq!(store.zoom.get(Side::Engine), None);
    }
}
