//! Process-wide realtime publish/subscribe channel.
//!
//! Replaces ambient global socket registries: a [`Realtime`] instance is
//! created on process init, handed to interested parties by injection, and
//! shuts down when the last clone is dropped.

use std::{
    collections::{BTreeSet, HashMap},
    sync::{Arc, RwLock},
};

use common::Money;
use tokio::sync::broadcast;

use crate::domain::event::{self, Seat};
#[cfg(doc)]
use crate::domain::{Booking, Event};

/// Capacity of one subscriber queue.
///
/// Subscribers lagging behind lose the oldest payloads, which is acceptable:
/// seat-map deltas are idempotent unions and clients re-read on demand.
const CHANNEL_CAPACITY: usize = 64;

/// Realtime publish/subscribe channel.
#[derive(Clone, Debug, Default)]
pub struct Realtime(Arc<Inner>);

/// Inner representation of a [`Realtime`] channel.
#[derive(Debug, Default)]
struct Inner {
    /// Per-[`Event`] senders of [`SeatsDelta`]s.
    seats: RwLock<HashMap<event::Id, broadcast::Sender<SeatsDelta>>>,

    /// Sender of [`DashboardEvent`]s.
    dashboard: RwLock<Option<broadcast::Sender<DashboardEvent>>>,
}

impl Realtime {
    /// Creates a new [`Realtime`] channel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes the provided [`SeatsDelta`] to all subscribers of its
    /// [`Event`].
    ///
    /// Delivered best-effort: no subscribers means no delivery, and no
    /// acknowledgment is awaited.
    #[expect(clippy::missing_panics_doc, reason = "lock cannot be poisoned")]
    pub fn publish_seats(&self, delta: SeatsDelta) {
        let mut seats = self.0.seats.write().expect("non-poisoned");
        if let Some(tx) = seats.get(&delta.event_id) {
            if tx.send(delta.clone()).is_err() || tx.receiver_count() == 0 {
                // The last subscriber is gone, so free the topic.
                _ = seats.remove(&delta.event_id);
            }
        }
    }

    /// Subscribes to [`SeatsDelta`]s of the [`Event`] with the provided ID.
    #[expect(clippy::missing_panics_doc, reason = "lock cannot be poisoned")]
    #[must_use]
    pub fn subscribe_seats(
        &self,
        event_id: event::Id,
    ) -> broadcast::Receiver<SeatsDelta> {
        self.0
            .seats
            .write()
            .expect("non-poisoned")
            .entry(event_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Publishes the provided [`DashboardEvent`] to all dashboard
    /// subscribers.
    #[expect(clippy::missing_panics_doc, reason = "lock cannot be poisoned")]
    pub fn publish_dashboard(&self, event: DashboardEvent) {
        let dashboard = self.0.dashboard.read().expect("non-poisoned");
        if let Some(tx) = dashboard.as_ref() {
            // Failing means no subscribers, which is fine.
            _ = tx.send(event);
        }
    }

    /// Subscribes to [`DashboardEvent`]s.
    #[expect(clippy::missing_panics_doc, reason = "lock cannot be poisoned")]
    #[must_use]
    pub fn subscribe_dashboard(&self) -> broadcast::Receiver<DashboardEvent> {
        self.0
            .dashboard
            .write()
            .expect("non-poisoned")
            .get_or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }
}

/// Delta of newly booked [`Seat`]s of one [`Event`].
#[derive(Clone, Debug)]
pub struct SeatsDelta {
    /// ID of the [`Event`] the [`Seat`]s belong to.
    pub event_id: event::Id,

    /// Newly booked [`Seat`]s with the [`Section`]s they belong to.
    ///
    /// [`Section`]: crate::domain::event::Section
    pub seats: Vec<(event::section::Id, Seat)>,
}

impl SeatsDelta {
    /// Applies this [`SeatsDelta`] to the provided subscriber-local view of
    /// booked [`Seat`]s.
    ///
    /// Pure set union: applying the same delta any number of times yields
    /// the same view, so redelivery is harmless.
    pub fn apply_to(&self, view: &mut BTreeSet<(event::section::Id, Seat)>) {
        for &(section_id, seat) in &self.seats {
            _ = view.insert((section_id, seat));
        }
    }
}

/// Global event of interest to dashboard subscribers.
#[derive(Clone, Copy, Debug)]
pub enum DashboardEvent {
    /// A new [`Booking`] was committed.
    NewBooking {
        /// ID of the booked [`Event`].
        event_id: event::Id,

        /// Total amount of the [`Booking`].
        amount: Money,
    },
}

#[cfg(test)]
mod spec {
    use std::collections::BTreeSet;

    use crate::domain::event;

    use super::{Realtime, SeatsDelta};

    fn delta(event_id: event::Id, seats: &[&str]) -> SeatsDelta {
        let section_id = event::section::Id::new();
        SeatsDelta {
            event_id,
            seats: seats
                .iter()
                .map(|s| (section_id, s.parse().unwrap()))
                .collect(),
        }
    }

    #[test]
    fn delta_application_is_idempotent() {
        let d = delta(event::Id::new(), &["A1", "A2"]);

        let mut once = BTreeSet::new();
        d.apply_to(&mut once);

        let mut twice = BTreeSet::new();
        d.apply_to(&mut twice);
        d.apply_to(&mut twice);

        assert_eq!(once, twice);
        assert_eq!(once.len(), 2);
    }

    #[tokio::test]
    async fn delivers_seats_deltas_to_event_subscribers() {
        let channel = Realtime::new();
        let event_id = event::Id::new();

        let mut event_rx = channel.subscribe_seats(event_id);
        let mut other_rx = channel.subscribe_seats(event::Id::new());

        channel.publish_seats(delta(event_id, &["B7"]));

        let received = event_rx.recv().await.unwrap();
        assert_eq!(received.event_id, event_id);
        assert_eq!(received.seats.len(), 1);

        assert!(other_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn publishing_without_subscribers_is_a_noop() {
        let channel = Realtime::new();

        // Neither publish may fail or panic.
        channel.publish_seats(delta(event::Id::new(), &["A1"]));
        channel.publish_dashboard(super::DashboardEvent::NewBooking {
            event_id: event::Id::new(),
            amount: common::Money::zero(common::money::Currency::Inr),
        });
    }
}
