//! [`Event`]-related [`Database`] implementations.

use std::collections::BTreeSet;

use common::{
    operations::{By, Insert, Select, Update},
    Money,
};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tracerr::Traced;

use crate::{
    domain::{
        event::{self, DayBoundary, Schedule, Seat, Section},
        Event,
    },
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

impl<C> Database<Select<By<Option<Event>, event::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Event>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Event>, event::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: event::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, title, description, category, location, \
                   date, time, status, sold_count, \
                   created_by, created_at \
            FROM events \
            WHERE id = $1::UUID \
            LIMIT 1";
        let Some(row) =
            self.query_opt(SQL, &[&id]).await.map_err(tracerr::wrap!())?
        else {
            return Ok(None);
        };

        const SECTIONS_SQL: &str = "\
            SELECT id, name, num_rows, num_cols, \
                   base_price, base_price_currency \
            FROM sections \
            WHERE event_id = $1::UUID \
            ORDER BY ord ASC";
        let mut sections = self
            .query(SECTIONS_SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| Section {
                id: row.get("id"),
                name: row.get("name"),
                rows: u8::try_from(row.get::<_, i16>("num_rows"))
                    .expect("`num_rows` overflow"),
                cols: u16::try_from(row.get::<_, i32>("num_cols"))
                    .expect("`num_cols` overflow"),
                base_price: Money {
                    amount: row.get("base_price"),
                    currency: row.get("base_price_currency"),
                },
                booked: BTreeSet::new(),
            })
            .collect::<Vec<_>>();

        // The booked sets are the union of all reservation records.
        const SEATS_SQL: &str = "\
            SELECT section_id, seat \
            FROM seats \
            WHERE event_id = $1::UUID";
        for row in self
            .query(SEATS_SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
        {
            let section_id: event::section::Id = row.get("section_id");
            let seat = row
                .get::<_, String>("seat")
                .parse::<Seat>()
                .expect("malformed `Seat` in database");
            if let Some(section) =
                sections.iter_mut().find(|s| s.id == section_id)
            {
                _ = section.booked.insert(seat);
            }
        }

        Ok(Some(Event {
            id: row.get("id"),
            title: row.get("title"),
            description: row.get("description"),
            category: row.get("category"),
            location: row.get("location"),
            schedule: Schedule {
                date: row.get("date"),
                time: row.get("time"),
            },
            status: row.get("status"),
            sold_count: u32::try_from(row.get::<_, i32>("sold_count"))
                .expect("`sold_count` overflow"),
            created_by: row.get("created_by"),
            created_at: row.get("created_at"),
            sections,
        }))
    }
}

impl<C> Database<Insert<Event>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Event>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(event): Insert<Event>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(event)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Event>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(event): Update<Event>,
    ) -> Result<Self::Ok, Self::Err> {
        let Event {
            id,
            title,
            description,
            category,
            location,
            schedule: Schedule { date, time },
            status,
            sections,
            sold_count,
            created_by,
            created_at,
        } = event;

        let sold_count =
            i32::try_from(sold_count).expect("`sold_count` overflow");

        const SQL: &str = "\
            INSERT INTO events (\
                id, title, description, category, location, \
                date, time, status, sold_count, \
                created_by, created_at \
            ) VALUES (\
                $1::UUID, $2::VARCHAR, $3::VARCHAR, $4::VARCHAR, \
                $5::VARCHAR, \
                $6::DATE, $7::TIME, $8::INT2, $9::INT4, \
                $10::UUID, $11::TIMESTAMPTZ \
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET title = EXCLUDED.title, \
                description = EXCLUDED.description, \
                category = EXCLUDED.category, \
                location = EXCLUDED.location, \
                date = EXCLUDED.date, \
                time = EXCLUDED.time, \
                status = EXCLUDED.status, \
                sold_count = EXCLUDED.sold_count";
        self.exec(
            SQL,
            &[
                &id,
                &title,
                &description,
                &category,
                &location,
                &date,
                &time,
                &status,
                &sold_count,
                &created_by,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)?;

        // Booked seats are not written here: reservation records own them.
        const SECTION_SQL: &str = "\
            INSERT INTO sections (\
                id, event_id, ord, name, num_rows, num_cols, \
                base_price, base_price_currency \
            ) VALUES (\
                $1::UUID, $2::UUID, $3::INT4, $4::VARCHAR, \
                $5::INT2, $6::INT4, \
                $7::NUMERIC, $8::INT2 \
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET ord = EXCLUDED.ord, \
                name = EXCLUDED.name, \
                num_rows = EXCLUDED.num_rows, \
                num_cols = EXCLUDED.num_cols, \
                base_price = EXCLUDED.base_price, \
                base_price_currency = EXCLUDED.base_price_currency";
        for (ord, section) in sections.into_iter().enumerate() {
            let Section {
                id: section_id,
                name,
                rows,
                cols,
                base_price: Money { amount, currency },
                booked: _,
            } = section;

            let ord = i32::try_from(ord).expect("`ord` overflow");
            let rows = i16::from(rows);
            let cols = i32::from(cols);

            self.exec(
                SECTION_SQL,
                &[
                    &section_id,
                    &id,
                    &ord,
                    &name,
                    &rows,
                    &cols,
                    &amount,
                    &currency,
                ],
            )
            .await
            .map_err(tracerr::wrap!())
            .map(drop)?;
        }

        Ok(())
    }
}

impl<C> Database<Update<By<read::event::SoldCount, (event::Id, u32)>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(by): Update<By<read::event::SoldCount, (event::Id, u32)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (id, delta) = by.into_inner();
        let delta = i32::try_from(delta).expect("`sold_count` delta overflow");

        const SQL: &str = "\
            UPDATE events \
            SET sold_count = sold_count + $2::INT4 \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&id, &delta])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Update<By<read::event::Elapsed, DayBoundary>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = u64;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(by): Update<By<read::event::Elapsed, DayBoundary>>,
    ) -> Result<Self::Ok, Self::Err> {
        let boundary: DayBoundary = by.into_inner();
        let boundary = boundary.time();

        const SQL: &str = "\
            UPDATE events \
            SET status = $1::INT2 \
            WHERE status NOT IN ($1::INT2, $2::INT2) \
              AND (date + COALESCE(time, $3::TIME)) \
                  < (NOW() AT TIME ZONE 'UTC')";
        self.exec(
            SQL,
            &[
                &event::Status::Completed,
                &event::Status::Cancelled,
                &boundary,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C>
    Database<Select<By<read::event::list::Page, read::event::list::Selector>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = read::event::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::event::list::Page, read::event::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::event::list::Selector {
            arguments,
            filter: read::event::list::Filter { status },
        } = by.into_inner();

        let limit = i32::try_from(arguments.limit()).unwrap() + 1;

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![&limit];

        let cursor_idx = arguments.cursor().map(|c| {
            ps.push(c);
            ps.len()
        });
        let status_idx = status.as_ref().map(|s| {
            ps.push(s);
            ps.len()
        });

        let sql = format!(
            "SELECT id \
             FROM events \
             WHERE true \
                   {cursor} \
                   {status_filtering} \
             ORDER BY id {order} \
             LIMIT $1::INT4",
            cursor = cursor_idx.into_iter().format_with("", |idx, f| {
                let op = arguments.kind().operator();
                f(&format_args!("AND id {op} ${idx}::UUID"))
            }),
            status_filtering =
                status_idx.into_iter().format_with("", |idx, f| {
                    f(&format_args!("AND status = ${idx}::INT2"))
                }),
            order = arguments.kind().order().sql(),
        );
        let rows = self
            .query(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?;

        let has_more = rows.len() > arguments.limit();
        let edges = rows
            .into_iter()
            .take(arguments.limit())
            .map(|row| {
                let id: event::Id = row.get("id");
                (id, id)
            })
            .collect::<Vec<_>>();

        Ok(read::event::list::Page::new(&arguments, edges, has_more))
    }
}

impl<C> Database<Select<By<read::event::list::TotalCount, ()>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = read::event::list::TotalCount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(_): Select<By<read::event::list::TotalCount, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            SELECT COUNT(*)::INT4 \
            FROM events";
        self.query_opt(SQL, &[])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| row.expect("always exists").get::<_, i32>(0).into())
    }
}
