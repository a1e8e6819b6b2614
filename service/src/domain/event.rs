//! [`Event`] definitions.

use std::{collections::BTreeSet, fmt};

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf, Money, Multiplier};
use derive_more::{AsRef, Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::user;

/// Number of seat rows a [`Section`] grid can hold at most, bounded by the
/// `A`..`Z` row lettering.
pub const MAX_ROWS: u8 = 26;

/// Bookable event with a seating layout.
#[derive(Clone, Debug)]
pub struct Event {
    /// ID of this [`Event`].
    pub id: Id,

    /// [`Title`] of this [`Event`].
    pub title: Title,

    /// [`Description`] of this [`Event`], if any.
    pub description: Option<Description>,

    /// [`Category`] of this [`Event`].
    pub category: Category,

    /// [`Location`] this [`Event`] takes place at.
    pub location: Location,

    /// [`Schedule`] of this [`Event`].
    pub schedule: Schedule,

    /// Lifecycle [`Status`] of this [`Event`].
    pub status: Status,

    /// [`Section`]s of this [`Event`], in display order.
    pub sections: Vec<Section>,

    /// Total number of seats sold for this [`Event`].
    pub sold_count: u32,

    /// ID of the [`User`] who created this [`Event`].
    ///
    /// [`User`]: crate::domain::User
    pub created_by: user::Id,

    /// [`DateTime`] when this [`Event`] was created.
    pub created_at: CreationDateTime,
}

impl Event {
    /// Returns the [`Section`] of this [`Event`] with the provided ID, if any.
    #[must_use]
    pub fn section(&self, id: section::Id) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// Returns the [`Section`] of this [`Event`] with the provided ID for
    /// mutation, if any.
    #[must_use]
    pub fn section_mut(&mut self, id: section::Id) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.id == id)
    }

    /// Indicates whether this [`Event`] still accepts bookings at the `now`
    /// moment.
    ///
    /// An [`Event`] is bookable while its effective start is in the future
    /// and it has not been completed or cancelled.
    #[must_use]
    pub fn is_bookable(&self, now: DateTimeOf, boundary: DayBoundary) -> bool {
        !matches!(self.status, Status::Completed | Status::Cancelled)
            && now < self.schedule.start(boundary)
    }

    /// Returns the share of booked seats across all [`Section`] grids of this
    /// [`Event`], in `0.0..=1.0`.
    #[must_use]
    pub fn occupancy(&self) -> f64 {
        let total: u32 =
            self.sections.iter().map(Section::capacity).sum();
        if total == 0 {
            return 0.0;
        }
        let booked: u32 = self
            .sections
            .iter()
            .map(|s| {
                u32::try_from(s.booked.len())
                    .expect("booked set bounded by the grid")
            })
            .sum();
        f64::from(booked) / f64::from(total)
    }
}

/// ID of an [`Event`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Title of an [`Event`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct Title(String);

impl Title {
    /// Creates a new [`Title`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `title` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(title: impl Into<String>) -> Self {
        Self(title.into())
    }

    /// Creates a new [`Title`] if the given `title` is valid.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Option<Self> {
        let title = title.into();
        Self::check(&title).then_some(Self(title))
    }

    /// Checks whether the given `title` is a valid [`Title`].
    fn check(title: impl AsRef<str>) -> bool {
        let title = title.as_ref();
        title.trim() == title && !title.is_empty() && title.len() <= 256
    }
}

impl FromStr for Title {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Title`")
    }
}

/// Description of an [`Event`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct Description(String);

impl Description {
    /// Creates a new [`Description`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `description` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(description: impl Into<String>) -> Self {
        Self(description.into())
    }

    /// Creates a new [`Description`] if the given `description` is valid.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Option<Self> {
        let description = description.into();
        Self::check(&description).then_some(Self(description))
    }

    /// Checks whether the given `description` is a valid [`Description`].
    fn check(description: impl AsRef<str>) -> bool {
        let description = description.as_ref();
        !description.is_empty() && description.len() <= 4096
    }
}

impl FromStr for Description {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Description`")
    }
}

/// Category of an [`Event`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct Category(String);

impl Category {
    /// Creates a new [`Category`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `category` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(category: impl Into<String>) -> Self {
        Self(category.into())
    }

    /// Creates a new [`Category`] if the given `category` is valid.
    #[must_use]
    pub fn new(category: impl Into<String>) -> Option<Self> {
        let category = category.into();
        Self::check(&category).then_some(Self(category))
    }

    /// Checks whether the given `category` is a valid [`Category`].
    fn check(category: impl AsRef<str>) -> bool {
        let category = category.as_ref();
        category.trim() == category
            && !category.is_empty()
            && category.len() <= 128
    }
}

impl Default for Category {
    fn default() -> Self {
        Self("General".to_owned())
    }
}

impl FromStr for Category {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Category`")
    }
}

/// Location of an [`Event`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct Location(String);

impl Location {
    /// Creates a new [`Location`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `location` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    /// Creates a new [`Location`] if the given `location` is valid.
    #[must_use]
    pub fn new(location: impl Into<String>) -> Option<Self> {
        let location = location.into();
        Self::check(&location).then_some(Self(location))
    }

    /// Checks whether the given `location` is a valid [`Location`].
    fn check(location: impl AsRef<str>) -> bool {
        let location = location.as_ref();
        location.trim() == location
            && !location.is_empty()
            && location.len() <= 512
    }
}

impl FromStr for Location {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Location`")
    }
}

define_kind! {
    #[doc = "Lifecycle status of an [`Event`]."]
    enum Status {
        #[doc = "The [`Event`] is scheduled and has not started yet."]
        Upcoming = 1,

        #[doc = "The [`Event`] is currently in progress."]
        Ongoing = 2,

        #[doc = "The [`Event`] has passed its scheduled start."]
        Completed = 3,

        #[doc = "The [`Event`] was cancelled."]
        Cancelled = 4,
    }
}

/// Scheduled start of an [`Event`]: a date with an optional time-of-day.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Schedule {
    /// Date the [`Event`] starts at.
    pub date: time::Date,

    /// Time-of-day the [`Event`] starts at, if known.
    pub time: Option<time::Time>,
}

impl Schedule {
    /// Returns the effective start of this [`Schedule`].
    ///
    /// When the time-of-day is absent, the provided [`DayBoundary`] decides
    /// which moment of the date counts as the start.
    #[must_use]
    pub fn start(&self, boundary: DayBoundary) -> DateTimeOf {
        DateTimeOf::from_utc(self.date, self.time.unwrap_or(boundary.time()))
    }
}

/// Moment of a date an [`Event`] without a time-of-day is considered to
/// start at.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayBoundary {
    /// Midnight opening the date.
    #[default]
    StartOfDay,

    /// Last moment of the date.
    EndOfDay,
}

impl DayBoundary {
    /// Returns the time-of-day represented by this [`DayBoundary`].
    #[must_use]
    pub fn time(self) -> time::Time {
        match self {
            Self::StartOfDay => time::Time::MIDNIGHT,
            Self::EndOfDay => time::Time::MAX,
        }
    }
}

/// Seating block of an [`Event`] with its own grid and base price.
#[derive(Clone, Debug)]
pub struct Section {
    /// ID of this [`Section`].
    pub id: section::Id,

    /// Name of this [`Section`].
    pub name: section::Name,

    /// Number of seat rows in this [`Section`].
    ///
    /// Bounded by [`MAX_ROWS`].
    pub rows: u8,

    /// Number of seat columns in this [`Section`].
    pub cols: u16,

    /// Price a seat of this [`Section`] is sold for before demand
    /// adjustment.
    pub base_price: Money,

    /// [`Seat`]s of this [`Section`] already booked.
    pub booked: BTreeSet<Seat>,
}

impl Section {
    /// Returns the total number of seats in the grid of this [`Section`].
    #[must_use]
    pub fn capacity(&self) -> u32 {
        u32::from(self.rows) * u32::from(self.cols)
    }

    /// Indicates whether the provided [`Seat`] is within the grid of this
    /// [`Section`].
    #[must_use]
    pub fn contains(&self, seat: Seat) -> bool {
        seat.row < self.rows && seat.col >= 1 && seat.col <= self.cols
    }

    /// Indicates whether the provided [`Seat`] is within the grid of this
    /// [`Section`] and not booked yet.
    #[must_use]
    pub fn is_available(&self, seat: Seat) -> bool {
        self.contains(seat) && !self.booked.contains(&seat)
    }

    /// Marks the provided [`Seat`] of this [`Section`] as booked.
    ///
    /// # Errors
    ///
    /// Refuses with an [`Unavailable`] error if the [`Seat`] is outside the
    /// grid or is booked already, whatever the caller has validated before.
    pub fn reserve(&mut self, seat: Seat) -> Result<(), Unavailable> {
        if !self.is_available(seat) {
            return Err(Unavailable(seat));
        }
        _ = self.booked.insert(seat);
        Ok(())
    }

    /// Prices a seat of this [`Section`] with the provided demand
    /// [`Multiplier`] applied.
    ///
    /// Pure: performs no I/O and always returns the same price for the same
    /// inputs.
    #[must_use]
    pub fn seat_price(&self, multiplier: Multiplier) -> Money {
        self.base_price.scaled(multiplier)
    }
}

/// Error of reserving a [`Seat`] which cannot be booked.
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("`Seat({_0})` is unavailable")]
pub struct Unavailable(#[error(not(source))] pub Seat);

/// Single bookable slot within a [`Section`] grid, identified by its row
/// letter and 1-based column number (e.g. `A1`).
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Seat {
    /// 0-based row index, rendered as the `A`..`Z` letter.
    pub row: u8,

    /// 1-based column number.
    pub col: u16,
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { row, col } = self;
        write!(f, "{}{col}", char::from(b'A' + row))
    }
}

impl FromStr for Seat {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let letter = chars.next().ok_or("empty seat identifier")?;
        if !letter.is_ascii_uppercase() {
            return Err("invalid row letter");
        }
        #[expect(clippy::cast_possible_truncation, reason = "`A`..`Z` range")]
        let row = (letter as u32 - 'A' as u32) as u8;

        let col = chars.as_str();
        if col.is_empty() || col.starts_with('0') {
            return Err("invalid column number");
        }
        let col = col.parse().map_err(|_| "invalid column number")?;

        Ok(Self { row, col })
    }
}

pub mod section {
    //! [`Section`]-related definitions.

    use derive_more::{AsRef, Display, From, FromStr, Into};
    #[cfg(feature = "postgres")]
    use postgres_types::{FromSql, ToSql};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[cfg(doc)]
    use super::Section;

    /// ID of a [`Section`], unique within its `Event`.
    #[derive(
        Clone,
        Copy,
        Debug,
        Default,
        Deserialize,
        Display,
        Eq,
        From,
        FromStr,
        Hash,
        Into,
        Ord,
        PartialEq,
        PartialOrd,
        Serialize,
    )]
    #[cfg_attr(
        feature = "postgres",
        derive(ToSql, FromSql),
        postgres(transparent)
    )]
    pub struct Id(Uuid);

    impl Id {
        /// Creates a new random [`Id`].
        #[must_use]
        pub fn new() -> Self {
            Self(Uuid::new_v4())
        }
    }

    /// Name of a [`Section`] (e.g. `VIP`, `Gold`).
    #[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
    #[cfg_attr(
        feature = "postgres",
        derive(FromSql, ToSql),
        postgres(transparent)
    )]
    #[as_ref(forward)]
    pub struct Name(String);

    impl Name {
        /// Creates a new [`Name`].
        ///
        /// # Safety
        ///
        /// The caller must ensure that the given `name` matches the format.
        #[expect(unsafe_code, reason = "bypass")]
        #[must_use]
        pub unsafe fn new_unchecked(name: impl Into<String>) -> Self {
            Self(name.into())
        }

        /// Creates a new [`Name`] if the given `name` is valid.
        #[must_use]
        pub fn new(name: impl Into<String>) -> Option<Self> {
            let name = name.into();
            Self::check(&name).then_some(Self(name))
        }

        /// Checks whether the given `name` is a valid [`Name`].
        fn check(name: impl AsRef<str>) -> bool {
            let name = name.as_ref();
            name.trim() == name && !name.is_empty() && name.len() <= 128
        }
    }

    impl FromStr for Name {
        type Err = &'static str;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            Self::new(s).ok_or("invalid `section::Name`")
        }
    }
}

/// [`DateTime`] when an [`Event`] was created.
pub type CreationDateTime = DateTimeOf<(Event, unit::Creation)>;

#[cfg(test)]
mod spec {
    use std::collections::BTreeSet;

    use common::{money::Currency, Money, Multiplier};
    use time::macros::{date, time};

    use super::{DayBoundary, Schedule, Seat, Section};

    fn gold_section() -> Section {
        Section {
            id: super::section::Id::new(),
            name: "Gold".parse().unwrap(),
            rows: 5,
            cols: 10,
            base_price: Money {
                amount: "500".parse().unwrap(),
                currency: Currency::Inr,
            },
            booked: BTreeSet::new(),
        }
    }

    #[test]
    fn seat_parses_and_formats() {
        let seat: Seat = "A1".parse().unwrap();
        assert_eq!(seat, Seat { row: 0, col: 1 });
        assert_eq!(seat.to_string(), "A1");

        let seat: Seat = "Z42".parse().unwrap();
        assert_eq!(seat, Seat { row: 25, col: 42 });
        assert_eq!(seat.to_string(), "Z42");

        assert!("".parse::<Seat>().is_err());
        assert!("a1".parse::<Seat>().is_err());
        assert!("A".parse::<Seat>().is_err());
        assert!("A0".parse::<Seat>().is_err());
        assert!("A01".parse::<Seat>().is_err());
        assert!("1A".parse::<Seat>().is_err());
    }

    #[test]
    fn section_bounds_the_grid() {
        let section = gold_section();

        assert!(section.contains("A1".parse().unwrap()));
        assert!(section.contains("E10".parse().unwrap()));

        // Row `F` and column `11` are outside the `5 x 10` grid.
        assert!(!section.contains("F1".parse().unwrap()));
        assert!(!section.contains("A11".parse().unwrap()));
    }

    #[test]
    fn reserve_refuses_taken_and_out_of_grid_seats() {
        let mut section = gold_section();
        let seat: Seat = "A1".parse().unwrap();

        section.reserve(seat).unwrap();
        assert!(!section.is_available(seat));

        // Double reservation must be refused, not silently re-added.
        assert!(section.reserve(seat).is_err());
        assert_eq!(section.booked.len(), 1);

        assert!(section.reserve("F1".parse().unwrap()).is_err());
    }

    #[test]
    fn seat_price_applies_multiplier() {
        let section = gold_section();
        let m = Multiplier::new("1.25".parse().unwrap()).unwrap();

        assert_eq!(section.seat_price(m).amount, "625.00".parse().unwrap());
        assert_eq!(
            section.seat_price(Multiplier::default()).amount,
            "500.00".parse().unwrap(),
        );
    }

    #[test]
    fn schedule_start_uses_time_of_day_when_known() {
        let schedule = Schedule {
            date: date!(2025 - 06 - 01),
            time: Some(time!(18:30)),
        };

        let start = schedule.start(DayBoundary::StartOfDay);
        assert_eq!(start.to_rfc3339(), "2025-06-01T18:30:00Z");
    }

    #[test]
    fn schedule_start_falls_back_to_day_boundary() {
        let schedule = Schedule {
            date: date!(2025 - 06 - 01),
            time: None,
        };

        assert_eq!(
            schedule.start(DayBoundary::StartOfDay).to_rfc3339(),
            "2025-06-01T00:00:00Z",
        );
        assert!(
            schedule.start(DayBoundary::EndOfDay)
                > schedule.start(DayBoundary::StartOfDay),
        );
    }
}
