//! Property tests for the cross-thread coordination primitives

use proptest::prelude::*;
use timescope::sync::{CommandQueue, PositionDurationStore, Side, ValueMailbox};
use timescope::types::{Speed, TimeWindow, WindowAnchor};

proptest! {
    #[test]
    fn speed_sequence_strictly_increases(steps in 1usize..40) {
        let mut speed = Speed::base();
        let mut previous = speed.factor();
        for _ in 0..steps {
            speed.intensify();
            prop_assert!([1, 2, 5].contains(&speed.mantissa));
            prop_assert!(speed.factor() > previous);
            previous = speed.factor();
        }
    }

    #[test]
    fn rewindow_end_anchor_holds_right_edge(
        start in -1e6f64..1e6,
        d_old in 0.0f64..1e4,
        d_new in 0.0f64..1e4,
    ) {
        let store = PositionDurationStore::new(d_old);
        store.set_anchor(WindowAnchor::End);
        let old = TimeWindow::new(start, d_old);
        let new = store.rewindow(old, d_new);
        prop_assert_eq!(new.duration, d_new);
        prop_assert!((new.end() - old.end()).abs() < 1e-6);
    }

    #[test]
    fn rewindow_start_anchor_holds_left_edge(
        start in -1e6f64..1e6,
        d_old in 0.0f64..1e4,
        d_new in 0.0f64..1e4,
    ) {
        let store = PositionDurationStore::new(d_old);
        store.set_anchor(WindowAnchor::Start);
        let new = store.rewindow(TimeWindow::new(start, d_old), d_new);
        prop_assert_eq!(new.start, start);
        prop_assert_eq!(new.duration, d_new);
    }

    #[test]
    fn mailbox_is_latest_wins(writes in prop::collection::vec(any::<i32>(), 1..20)) {
        let mailbox = ValueMailbox::new(0);
        for value in &writes {
            mailbox.set(*value, Side::Ui);
        }
        prop_assert_eq!(mailbox.get(Side::Engine), writes.last().copied());
        // A value is observed at most once.
        prop_assert_eq!(mailbox.get(Side::Engine), None);
    }

    #[test]
    fn command_queue_is_lossless_fifo(commands in prop::collection::vec(any::<u32>(), 0..50)) {
        let queue: CommandQueue<u32> = CommandQueue::new();
        for value in &commands {
            queue.push(*value);
        }
        let mut popped = Vec::new();
        while let Some(value) = queue.pop() {
            popped.push(value);
        }
        prop_assert_eq!(popped, commands);
    }

    #[test]
    fn engine_priority_mailbox_drops_late_ui_writes(
        engine_value in any::<i32>(),
        ui_values in prop::collection::vec(any::<i32>(), 1..10),
    ) {
        let mailbox = ValueMailbox::with_engine_priority(0);
        mailbox.set(engine_value, Side::Engine);
        // The engine's pending write survives any number of UI attempts.
        for value in &ui_values {
            mailbox.set(*value, Side::Ui);
        }
        prop_assert_eq!(mailbox.get(Side::Ui), Some(engine_value));
        // Once consumed, UI writes land normally again.
        mailbox.set(ui_values[0], Side::Ui);
        prop_assert_eq!(mailbox.get(Side::Engine), Some(ui_values[0]));
    }
}
