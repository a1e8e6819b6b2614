//! [`Command`] for booking seats of an [`Event`].

use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted, Update},
    DateTime, Money, Multiplier,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        booking::{self, reservation, PaymentRef, Reservation, Ticket},
        event::{self, Seat},
        user, Booking, Event, User,
    },
    infra::{database, demand, payments, Database},
    read, task, Service,
};

use super::Command;

/// [`Command`] for booking seats of an [`Event`].
///
/// The single entry point turning a seat request into either a committed
/// [`Booking`] or a rejection, with no partial state ever observable.
#[derive(Clone, Debug)]
pub struct SubmitBooking {
    /// ID of the [`Event`] to book seats of.
    pub event_id: event::Id,

    /// ID of the [`User`] purchasing the seats.
    pub purchaser_id: user::Id,

    /// Requested seats: pairs of a [`Section`] ID and a [`Seat`] within it,
    /// in request order.
    ///
    /// [`Section`]: event::Section
    pub seats: Vec<(event::section::Id, Seat)>,

    /// Proof of a completed payment, if any.
    ///
    /// Without it the booking proceeds only while the payment gateway does
    /// not require one (trusted mode).
    pub payment: Option<payments::Proof>,
}

impl<Db> Command<SubmitBooking> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Event>, event::Id>>,
            Ok = Option<Event>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Select<By<Option<Event>, event::Id>>,
            Ok = Option<Event>,
            Err = Traced<database::Error>,
        > + Database<Insert<Booking>, Ok = (), Err = Traced<database::Error>>
        + Database<
            Insert<Vec<Reservation>>,
            Ok = reservation::Outcome,
            Err = Traced<database::Error>,
        > + Database<
            Update<By<read::event::SoldCount, (event::Id, u32)>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Booking;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: SubmitBooking,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let SubmitBooking {
            event_id,
            purchaser_id,
            seats,
            payment,
        } = cmd;

        if seats.is_empty() {
            return Err(tracerr::new!(E::NoSeatsRequested));
        }

        let event = self
            .database()
            .execute(Select(By::<Option<Event>, _>::new(event_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::EventNotExists(event_id))
            .map_err(tracerr::wrap!())?;

        // Payment verification is terminal: a failed (or missing, in
        // required mode) proof creates nothing.
        let payment_ref = match &payment {
            Some(proof) => {
                if !self.payments().verify(proof) {
                    return Err(tracerr::new!(E::PaymentRejected));
                }
                Some(
                    PaymentRef::new(proof.payment_id.clone())
                        .ok_or(E::PaymentRejected)
                        .map_err(tracerr::wrap!())?,
                )
            }
            None if self.payments().is_required() => {
                return Err(tracerr::new!(E::PaymentRejected));
            }
            None => None,
        };

        let purchaser = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(purchaser_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(purchaser_id))
            .map_err(tracerr::wrap!())?;

        // Any estimation failure falls back to the neutral multiplier: a
        // missing demand signal must never fail a booking.
        let multiplier = match self.demand().estimate(&event).await {
            Ok(m) => m,
            Err(demand::Error::Disabled) => Multiplier::default(),
            Err(e) => {
                log::warn!("demand estimation failed: {e}");
                Multiplier::default()
            }
        };

        // A lost seat race at commit time is retried once against fresh
        // state; a second loss surfaces to the caller.
        let mut booking = None;
        for attempt in 0.. {
            match self
                .try_commit(
                    event_id,
                    &purchaser,
                    &seats,
                    multiplier,
                    payment_ref.clone(),
                )
                .await?
            {
                Attempt::Committed(b) => {
                    booking = Some(b);
                    break;
                }
                Attempt::Raced { section_id, seat } if attempt == 0 => {
                    log::debug!(
                        "`Seat({seat})` of `Section(id: {section_id})` was \
                         reserved concurrently, retrying",
                    );
                }
                Attempt::Raced { seat, .. } => {
                    return Err(tracerr::new!(E::SeatUnavailable(seat)));
                }
            }
        }
        let booking =
            booking.expect("loop only breaks with a committed `Booking`");

        // The booking is durable at this point: all notification fan-out is
        // best-effort and cannot invalidate it anymore.
        let notify = task::NotifyBooking {
            booking: booking.clone(),
            event_title: event.title.clone(),
            purchaser_name: purchaser.name.clone(),
            purchaser_email: purchaser.email.clone(),
        };
        if self.notify(notify).is_err() {
            log::warn!(
                "notification worker is gone, skipping fan-out of \
                 `Booking(id: {})`",
                booking.id,
            );
        }

        Ok(booking)
    }
}

/// Outcome of a single commit attempt.
enum Attempt {
    /// The [`Booking`] is durably committed.
    Committed(Booking),

    /// A concurrent writer reserved the named [`Seat`] between validation
    /// and commit.
    Raced {
        /// ID of the [`Section`] the contended [`Seat`] belongs to.
        ///
        /// [`Section`]: event::Section
        section_id: event::section::Id,

        /// The contended [`Seat`].
        seat: Seat,
    },
}

impl<Db> Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Event>, event::Id>>,
            Ok = Option<Event>,
            Err = Traced<database::Error>,
        > + Database<Insert<Booking>, Ok = (), Err = Traced<database::Error>>
        + Database<
            Insert<Vec<Reservation>>,
            Ok = reservation::Outcome,
            Err = Traced<database::Error>,
        > + Database<
            Update<By<read::event::SoldCount, (event::Id, u32)>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    /// Validates the requested seats against fresh authoritative state and
    /// commits the whole batch, or nothing.
    ///
    /// Dropping the transaction without committing rolls every mutation
    /// back, so a failure halfway leaves no trace.
    async fn try_commit(
        &self,
        event_id: event::Id,
        purchaser: &User,
        seats: &[(event::section::Id, Seat)],
        multiplier: Multiplier,
        payment_ref: Option<PaymentRef>,
    ) -> Result<Attempt, Traced<ExecutionError>> {
        use ExecutionError as E;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Re-read immediately before mutating to shrink the race window:
        // state read outside of the transaction is not trusted here.
        let mut event = tx
            .execute(Select(By::<Option<Event>, _>::new(event_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::EventNotExists(event_id))
            .map_err(tracerr::wrap!())?;

        if !event.is_bookable(DateTime::now(), self.config().day_boundary) {
            return Err(tracerr::new!(E::BookingClosed(event_id)));
        }

        let booking_id = booking::Id::new();
        let mut tickets = Vec::with_capacity(seats.len());
        let mut reservations = Vec::with_capacity(seats.len());
        let mut total: Option<Money> = None;

        for &(section_id, seat) in seats {
            let section = event
                .section_mut(section_id)
                .ok_or(E::SectionNotInEvent(section_id))
                .map_err(tracerr::wrap!())?;

            // Also rejects a duplicate seat within this very request.
            section
                .reserve(seat)
                .map_err(|event::Unavailable(s)| {
                    tracerr::new!(E::SeatUnavailable(s))
                })?;

            let price = section.seat_price(multiplier);
            total = Some(match total {
                None => price,
                Some(t) => Money {
                    amount: t.amount + price.amount,
                    currency: t.currency,
                },
            });
            tickets.push(Ticket {
                section_id,
                section_name: section.name.clone(),
                seat,
                price,
            });
            reservations.push(Reservation {
                event_id,
                section_id,
                seat,
                booking_id,
            });
        }

        let booking = Booking {
            id: booking_id,
            event_id,
            purchaser_id: purchaser.id,
            tickets,
            total_amount: total.expect("request validated as non-empty"),
            multiplier,
            status: booking::Status::Confirmed,
            payment_ref,
            ticket_code: None,
            created_at: DateTime::now().coerce(),
        };

        tx.execute(Insert(booking.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        match tx
            .execute(Insert(reservations))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
        {
            reservation::Outcome::Applied => {}
            reservation::Outcome::Conflict { section_id, seat } => {
                // Transaction is dropped without a commit, rolling the
                // booking and any applied reservations back.
                return Ok(Attempt::Raced { section_id, seat });
            }
        }

        let batch_size = u32::try_from(seats.len())
            .expect("seat batch cannot exceed `u32`");
        tx.execute(Update(By::<read::event::SoldCount, _>::new((
            event_id, batch_size,
        ))))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))
        .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(Attempt::Committed(booking))
    }
}

/// Error of [`SubmitBooking`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Event`] with the provided ID is not accepting bookings anymore.
    #[display("`Event(id: {_0})` is not accepting bookings anymore")]
    BookingClosed(#[error(not(source))] event::Id),

    /// [`Event`] with the provided ID does not exist.
    #[display("`Event(id: {_0})` does not exist")]
    EventNotExists(#[error(not(source))] event::Id),

    /// No seats were requested.
    #[display("no seats requested")]
    NoSeatsRequested,

    /// Provided payment proof failed verification, or a required proof is
    /// missing.
    #[display("payment verification failed")]
    PaymentRejected,

    /// Requested [`Seat`] is already reserved, or lost its commit race.
    #[display("`Seat({_0})` is unavailable")]
    SeatUnavailable(#[error(not(source))] Seat),

    /// [`Section`] with the provided ID does not belong to the [`Event`].
    ///
    /// [`Section`]: event::Section
    #[display("`Section(id: {_0})` does not belong to the `Event`")]
    SectionNotInEvent(#[error(not(source))] event::section::Id),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use std::{
        collections::{BTreeSet, HashMap},
        sync::{Arc, Mutex},
        time::Duration,
    };

    use common::{
        money::Currency,
        operations::{By, Commit, Insert, Perform, Select, Transact, Update},
        DateTime, Money, Multiplier,
    };
    use hmac::{Hmac, Mac as _};
    use sha2::Sha256;
    use tracerr::Traced;

    use crate::{
        domain::{
            booking::{reservation, Reservation},
            event::{self, DayBoundary, Schedule, Seat, Section},
            user, Booking, Event, User,
        },
        infra::{channel::Realtime, database, demand, payments, Database},
        read, task, Command as _, Config, Service,
    };

    use super::{ExecutionError as E, SubmitBooking};

    /// In-memory [`Database`] emulating transactional visibility: staged
    /// writes become observable only on [`Commit`], and dropping a
    /// transaction discards them.
    #[derive(Clone, Debug, Default)]
    struct MockDb(Arc<Mutex<State>>);

    #[derive(Debug, Default)]
    struct State {
        event: Option<Event>,
        users: HashMap<user::Id, User>,
        bookings: Vec<Booking>,
        /// Reservation committed by another instance, invisible to reads
        /// until an insert conflict reveals it.
        hidden: Option<(event::section::Id, Seat)>,
        staged: Option<Staged>,
        reservation_inserts: u32,
        commits: u32,
    }

    #[derive(Debug, Default)]
    struct Staged {
        bookings: Vec<Booking>,
        reservations: Vec<Reservation>,
        sold_delta: u32,
    }

    impl MockDb {
        fn with_event(event: Event, purchaser: User) -> Self {
            let db = Self::default();
            {
                let mut state = db.0.lock().unwrap();
                state.event = Some(event);
                _ = state.users.insert(purchaser.id, purchaser);
            }
            db
        }

        fn state(&self) -> std::sync::MutexGuard<'_, State> {
            self.0.lock().unwrap()
        }
    }

    impl Database<Select<By<Option<Event>, event::Id>>> for MockDb {
        type Ok = Option<Event>;
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Select(by): Select<By<Option<Event>, event::Id>>,
        ) -> Result<Self::Ok, Self::Err> {
            let id = by.into_inner();
            Ok(self
                .state()
                .event
                .clone()
                .filter(|e| e.id == id))
        }
    }

    impl Database<Select<By<Option<User>, user::Id>>> for MockDb {
        type Ok = Option<User>;
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Select(by): Select<By<Option<User>, user::Id>>,
        ) -> Result<Self::Ok, Self::Err> {
            Ok(self.state().users.get(&by.into_inner()).cloned())
        }
    }

    impl Database<Transact> for MockDb {
        type Ok = Self;
        type Err = Traced<database::Error>;

        async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
            self.state().staged = Some(Staged::default());
            Ok(self.clone())
        }
    }

    impl Database<Insert<Booking>> for MockDb {
        type Ok = ();
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Insert(booking): Insert<Booking>,
        ) -> Result<Self::Ok, Self::Err> {
            self.state()
                .staged
                .as_mut()
                .expect("no transaction started")
                .bookings
                .push(booking);
            Ok(())
        }
    }

    impl Database<Insert<Vec<Reservation>>> for MockDb {
        type Ok = reservation::Outcome;
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Insert(reservations): Insert<Vec<Reservation>>,
        ) -> Result<Self::Ok, Self::Err> {
            let mut state = self.state();
            state.reservation_inserts += 1;

            for r in reservations {
                let committed = state
                    .event
                    .as_ref()
                    .and_then(|e| e.section(r.section_id))
                    .is_some_and(|s| s.booked.contains(&r.seat));
                let raced = state.hidden
                    == Some((r.section_id, r.seat));
                if committed || raced {
                    // The concurrent write becomes visible to later reads,
                    // as its transaction has committed.
                    if let Some((section_id, seat)) = state.hidden.take() {
                        let section = state
                            .event
                            .as_mut()
                            .and_then(|e| e.section_mut(section_id))
                            .expect("hidden reservation targets the event");
                        _ = section.booked.insert(seat);
                    }
                    return Ok(reservation::Outcome::Conflict {
                        section_id: r.section_id,
                        seat: r.seat,
                    });
                }
                state
                    .staged
                    .as_mut()
                    .expect("no transaction started")
                    .reservations
                    .push(r);
            }
            Ok(reservation::Outcome::Applied)
        }
    }

    impl Database<Update<By<read::event::SoldCount, (event::Id, u32)>>>
        for MockDb
    {
        type Ok = ();
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Update(by): Update<By<read::event::SoldCount, (event::Id, u32)>>,
        ) -> Result<Self::Ok, Self::Err> {
            let (_, delta) = by.into_inner();
            self.state()
                .staged
                .as_mut()
                .expect("no transaction started")
                .sold_delta += delta;
            Ok(())
        }
    }

    impl Database<Update<Booking>> for MockDb {
        type Ok = ();
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Update(booking): Update<Booking>,
        ) -> Result<Self::Ok, Self::Err> {
            let mut state = self.state();
            if let Some(b) =
                state.bookings.iter_mut().find(|b| b.id == booking.id)
            {
                *b = booking;
            }
            Ok(())
        }
    }

    impl Database<Commit> for MockDb {
        type Ok = ();
        type Err = Traced<database::Error>;

        async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
            let mut state = self.state();
            let staged =
                state.staged.take().expect("no transaction started");

            for r in staged.reservations {
                let section = state
                    .event
                    .as_mut()
                    .and_then(|e| e.section_mut(r.section_id))
                    .expect("reservation targets the event");
                _ = section.booked.insert(r.seat);
            }
            if let Some(event) = state.event.as_mut() {
                event.sold_count += staged.sold_delta;
            }
            state.bookings.extend(staged.bookings);
            state.commits += 1;
            Ok(())
        }
    }

    fn decimal(s: &str) -> rust_decimal::Decimal {
        s.parse().unwrap()
    }

    fn gold_section() -> Section {
        Section {
            id: event::section::Id::new(),
            name: "Gold".parse().unwrap(),
            rows: 5,
            cols: 10,
            base_price: Money {
                amount: decimal("500"),
                currency: Currency::Inr,
            },
            booked: BTreeSet::new(),
        }
    }

    fn upcoming_event(sections: Vec<Section>) -> Event {
        Event {
            id: event::Id::new(),
            title: "Rock A Blast".parse().unwrap(),
            description: None,
            category: event::Category::default(),
            location: "College Auditorium".parse().unwrap(),
            schedule: Schedule {
                date: time::OffsetDateTime::now_utc().date()
                    + time::Duration::days(30),
                time: Some(time::macros::time!(18:00)),
            },
            status: event::Status::Upcoming,
            sections,
            sold_count: 0,
            created_by: user::Id::new(),
            created_at: DateTime::now().coerce(),
        }
    }

    fn purchaser() -> User {
        User {
            id: user::Id::new(),
            name: "Jane".parse().unwrap(),
            email: Some("jane@example.com".parse().unwrap()),
            role: user::Role::Visitor,
            created_at: DateTime::now().coerce(),
        }
    }

    fn service(db: MockDb, payments: payments::Config) -> Service<MockDb> {
        let (notify_tx, mut notify_rx) =
            tokio::sync::mpsc::unbounded_channel();

        let svc = Service {
            config: Config {
                day_boundary: DayBoundary::StartOfDay,
                complete_elapsed_events:
                    task::complete_elapsed_events::Config {
                        interval: Duration::from_secs(60 * 60),
                    },
            },
            database: db,
            payments: payments::Gateway::new(payments),
            demand: demand::Estimator::new(&demand::Config {
                url: None,
                timeout: Duration::from_secs(1),
            })
            .unwrap(),
            channel: Realtime::new(),
            mailer: None,
            notify: notify_tx,
        };

        // Fan-out worker, as wired up by `Service::new`.
        let worker = svc.clone();
        drop(tokio::spawn(async move {
            while let Some(notify) = notify_rx.recv().await {
                _ = worker.execute(Perform(notify)).await;
            }
        }));

        svc
    }

    fn trusting_payments() -> payments::Config {
        payments::Config {
            key_secret: "test-secret".to_owned().into(),
            required: false,
        }
    }

    fn sign(secret: &str, order_id: &str, payment_id: &str) -> String {
        let mut mac =
            Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{order_id}|{payment_id}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn seat(s: &str) -> Seat {
        s.parse().unwrap()
    }

    fn request(
        event: &Event,
        purchaser: &User,
        seats: &[(event::section::Id, Seat)],
    ) -> SubmitBooking {
        SubmitBooking {
            event_id: event.id,
            purchaser_id: purchaser.id,
            seats: seats.to_vec(),
            payment: None,
        }
    }

    #[tokio::test]
    async fn books_seats_and_totals_their_prices() {
        let section = gold_section();
        let section_id = section.id;
        let event = upcoming_event(vec![section]);
        let event_id = event.id;
        let purchaser = purchaser();
        let db =
            MockDb::with_event(event.clone(), purchaser.clone());
        let svc = service(db.clone(), trusting_payments());

        let mut seats_rx = svc.channel().subscribe_seats(event_id);

        let booking = svc
            .execute(request(
                &event,
                &purchaser,
                &[(section_id, seat("A1")), (section_id, seat("A2"))],
            ))
            .await
            .unwrap();

        assert_eq!(booking.tickets.len(), 2);
        assert_eq!(booking.tickets[0].seat, seat("A1"));
        assert_eq!(booking.tickets[0].price.amount, decimal("500"));
        assert_eq!(booking.total_amount.amount, decimal("1000"));
        assert_eq!(booking.total_amount.currency, Currency::Inr);
        // The demand collaborator is disabled, so the neutral multiplier
        // must have been recorded.
        assert_eq!(booking.multiplier, Multiplier::default());

        {
            let state = db.state();
            let section = state
                .event
                .as_ref()
                .unwrap()
                .section(section_id)
                .unwrap();
            assert!(section.booked.contains(&seat("A1")));
            assert!(section.booked.contains(&seat("A2")));
            assert_eq!(state.event.as_ref().unwrap().sold_count, 2);
            assert_eq!(state.bookings.len(), 1);
            assert_eq!(state.commits, 1);
        }

        // Fan-out: the seat-map delta arrives after the commit.
        let delta = seats_rx.recv().await.unwrap();
        assert_eq!(delta.event_id, event_id);
        assert_eq!(
            delta.seats,
            vec![(section_id, seat("A1")), (section_id, seat("A2"))],
        );

        // Fan-out: the ticket code gets attached eventually.
        for _ in 0..100 {
            if db.state().bookings[0].ticket_code.is_some() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(db.state().bookings[0].ticket_code.is_some());
    }

    #[tokio::test]
    async fn rejects_taken_seat_with_no_partial_state() {
        let mut section = gold_section();
        let section_id = section.id;
        section.reserve(seat("A1")).unwrap();
        let event = upcoming_event(vec![section]);
        let purchaser = purchaser();
        let db = MockDb::with_event(event.clone(), purchaser.clone());
        let svc = service(db.clone(), trusting_payments());

        // `A3` is free, but the batch must be all-or-nothing.
        let err = svc
            .execute(request(
                &event,
                &purchaser,
                &[(section_id, seat("A3")), (section_id, seat("A1"))],
            ))
            .await
            .unwrap_err();

        assert!(
            matches!(err.as_ref(), E::SeatUnavailable(s) if *s == seat("A1")),
        );

        let state = db.state();
        let booked =
            &state.event.as_ref().unwrap().section(section_id).unwrap().booked;
        assert_eq!(booked.iter().copied().collect::<Vec<_>>(), [seat("A1")]);
        assert_eq!(state.event.as_ref().unwrap().sold_count, 0);
        assert!(state.bookings.is_empty());
        assert_eq!(state.commits, 0);
    }

    #[tokio::test]
    async fn rejects_duplicate_seat_within_one_request() {
        let section = gold_section();
        let section_id = section.id;
        let event = upcoming_event(vec![section]);
        let purchaser = purchaser();
        let db = MockDb::with_event(event.clone(), purchaser.clone());
        let svc = service(db.clone(), trusting_payments());

        let err = svc
            .execute(request(
                &event,
                &purchaser,
                &[(section_id, seat("A1")), (section_id, seat("A1"))],
            ))
            .await
            .unwrap_err();

        assert!(
            matches!(err.as_ref(), E::SeatUnavailable(s) if *s == seat("A1")),
        );
        assert_eq!(db.state().commits, 0);
    }

    #[tokio::test]
    async fn rejects_completed_and_elapsed_events() {
        let purchaser = purchaser();

        let mut completed = upcoming_event(vec![gold_section()]);
        completed.status = event::Status::Completed;
        let section_id = completed.sections[0].id;
        let db = MockDb::with_event(completed.clone(), purchaser.clone());
        let svc = service(db.clone(), trusting_payments());
        let err = svc
            .execute(request(
                &completed,
                &purchaser,
                &[(section_id, seat("A1"))],
            ))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), E::BookingClosed(_)));
        assert_eq!(db.state().commits, 0);

        // Still `UPCOMING` by status, but its start has already passed.
        let mut elapsed = upcoming_event(vec![gold_section()]);
        elapsed.schedule.date = time::OffsetDateTime::now_utc().date()
            - time::Duration::days(1);
        let section_id = elapsed.sections[0].id;
        let db = MockDb::with_event(elapsed.clone(), purchaser.clone());
        let svc = service(db.clone(), trusting_payments());
        let err = svc
            .execute(request(
                &elapsed,
                &purchaser,
                &[(section_id, seat("A1"))],
            ))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), E::BookingClosed(_)));
        assert_eq!(db.state().commits, 0);
    }

    #[tokio::test]
    async fn closing_boundary_for_timeless_events_is_configurable() {
        // Scheduled for today with no time-of-day at all.
        let section = gold_section();
        let section_id = section.id;
        let mut event = upcoming_event(vec![section]);
        event.schedule.date = time::OffsetDateTime::now_utc().date();
        event.schedule.time = None;
        let purchaser = purchaser();

        // Start-of-day boundary: the event is closed already.
        let db = MockDb::with_event(event.clone(), purchaser.clone());
        let svc = service(db.clone(), trusting_payments());
        let err = svc
            .execute(request(
                &event,
                &purchaser,
                &[(section_id, seat("A1"))],
            ))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), E::BookingClosed(_)));
        assert_eq!(db.state().commits, 0);

        // End-of-day boundary: the whole date is still bookable.
        let db = MockDb::with_event(event.clone(), purchaser.clone());
        let mut svc = service(db.clone(), trusting_payments());
        svc.config.day_boundary = DayBoundary::EndOfDay;
        let booking = svc
            .execute(request(
                &event,
                &purchaser,
                &[(section_id, seat("A1"))],
            ))
            .await
            .unwrap();
        assert_eq!(booking.tickets.len(), 1);
        assert_eq!(db.state().commits, 1);
    }

    #[tokio::test]
    async fn rejects_foreign_section_and_missing_event() {
        let event = upcoming_event(vec![gold_section()]);
        let purchaser = purchaser();
        let db = MockDb::with_event(event.clone(), purchaser.clone());
        let svc = service(db.clone(), trusting_payments());

        let foreign = event::section::Id::new();
        let err = svc
            .execute(request(&event, &purchaser, &[(foreign, seat("A1"))]))
            .await
            .unwrap_err();
        assert!(
            matches!(err.as_ref(), E::SectionNotInEvent(id) if *id == foreign),
        );

        let err = svc
            .execute(SubmitBooking {
                event_id: event::Id::new(),
                purchaser_id: purchaser.id,
                seats: vec![(foreign, seat("A1"))],
                payment: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), E::EventNotExists(_)));
    }

    #[tokio::test]
    async fn requires_and_verifies_payment_proof() {
        let section = gold_section();
        let section_id = section.id;
        let event = upcoming_event(vec![section]);
        let purchaser = purchaser();
        let strict = payments::Config {
            key_secret: "test-secret".to_owned().into(),
            required: true,
        };

        // Missing proof in required mode.
        let db = MockDb::with_event(event.clone(), purchaser.clone());
        let svc = service(db.clone(), strict.clone());
        let err = svc
            .execute(request(
                &event,
                &purchaser,
                &[(section_id, seat("A1"))],
            ))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), E::PaymentRejected));
        assert_eq!(db.state().commits, 0);

        // Tampered proof.
        let err = svc
            .execute(SubmitBooking {
                event_id: event.id,
                purchaser_id: purchaser.id,
                seats: vec![(section_id, seat("A1"))],
                payment: Some(payments::Proof {
                    order_id: "order_1".to_owned(),
                    payment_id: "pay_1".to_owned(),
                    signature: sign("wrong-secret", "order_1", "pay_1"),
                }),
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), E::PaymentRejected));
        assert_eq!(db.state().commits, 0);

        // Valid proof.
        let booking = svc
            .execute(SubmitBooking {
                event_id: event.id,
                purchaser_id: purchaser.id,
                seats: vec![(section_id, seat("A1"))],
                payment: Some(payments::Proof {
                    order_id: "order_1".to_owned(),
                    payment_id: "pay_1".to_owned(),
                    signature: sign("test-secret", "order_1", "pay_1"),
                }),
            })
            .await
            .unwrap();
        assert_eq!(
            booking.payment_ref.as_ref().map(AsRef::<str>::as_ref),
            Some("pay_1"),
        );
    }

    #[tokio::test]
    async fn retries_lost_commit_race_once_before_surfacing() {
        let section = gold_section();
        let section_id = section.id;
        let event = upcoming_event(vec![section]);
        let purchaser = purchaser();
        let db = MockDb::with_event(event.clone(), purchaser.clone());
        // A concurrent instance holds `A1`, invisible until commit time.
        db.state().hidden = Some((section_id, seat("A1")));
        let svc = service(db.clone(), trusting_payments());

        let err = svc
            .execute(request(
                &event,
                &purchaser,
                &[(section_id, seat("A1"))],
            ))
            .await
            .unwrap_err();

        assert!(
            matches!(err.as_ref(), E::SeatUnavailable(s) if *s == seat("A1")),
        );

        let state = db.state();
        // First attempt reached the insert and lost; the retry saw the
        // revealed reservation during validation and stopped there.
        assert_eq!(state.reservation_inserts, 1);
        assert_eq!(state.commits, 0);
        assert!(state.bookings.is_empty());
        assert_eq!(state.event.as_ref().unwrap().sold_count, 0);
    }

    #[tokio::test]
    async fn survives_a_race_on_seats_it_does_not_want() {
        let section = gold_section();
        let section_id = section.id;
        let event = upcoming_event(vec![section]);
        let purchaser = purchaser();
        let db = MockDb::with_event(event.clone(), purchaser.clone());
        db.state().hidden = Some((section_id, seat("B1")));
        let svc = service(db.clone(), trusting_payments());

        let booking = svc
            .execute(request(
                &event,
                &purchaser,
                &[(section_id, seat("A1"))],
            ))
            .await
            .unwrap();

        assert_eq!(booking.tickets.len(), 1);
        assert_eq!(db.state().commits, 1);
    }
}
