//! [`Booking`]-related [`Database`] implementations.

use common::{
    operations::{By, Insert, Select, Update},
    Money,
};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tracerr::Traced;

use crate::{
    domain::{
        booking::{self, reservation, Reservation, Ticket},
        event,
        Booking,
    },
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

impl<C> Database<Select<By<Option<Booking>, booking::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Booking>, booking::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: booking::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, event_id, purchaser_id, \
                   total_amount, total_amount_currency, \
                   multiplier, status, payment_ref, ticket_code, \
                   created_at \
            FROM bookings \
            WHERE id = $1::UUID \
            LIMIT 1";
        let Some(row) =
            self.query_opt(SQL, &[&id]).await.map_err(tracerr::wrap!())?
        else {
            return Ok(None);
        };

        const TICKETS_SQL: &str = "\
            SELECT section_id, section_name, seat, \
                   price, price_currency \
            FROM tickets \
            WHERE booking_id = $1::UUID \
            ORDER BY ord ASC";
        let tickets = self
            .query(TICKETS_SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| Ticket {
                section_id: row.get("section_id"),
                section_name: row.get("section_name"),
                seat: row
                    .get::<_, String>("seat")
                    .parse()
                    .expect("malformed `Seat` in database"),
                price: Money {
                    amount: row.get("price"),
                    currency: row.get("price_currency"),
                },
            })
            .collect();

        Ok(Some(Booking {
            id: row.get("id"),
            event_id: row.get("event_id"),
            purchaser_id: row.get("purchaser_id"),
            tickets,
            total_amount: Money {
                amount: row.get("total_amount"),
                currency: row.get("total_amount_currency"),
            },
            multiplier: row.get("multiplier"),
            status: row.get("status"),
            payment_ref: row.get("payment_ref"),
            ticket_code: row.get("ticket_code"),
            created_at: row.get("created_at"),
        }))
    }
}

impl<C> Database<Insert<Booking>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(booking): Insert<Booking>,
    ) -> Result<Self::Ok, Self::Err> {
        let Booking {
            id,
            event_id,
            purchaser_id,
            tickets,
            total_amount: Money { amount, currency },
            multiplier,
            status,
            payment_ref,
            ticket_code,
            created_at,
        } = booking;

        const SQL: &str = "\
            INSERT INTO bookings (\
                id, event_id, purchaser_id, \
                total_amount, total_amount_currency, \
                multiplier, status, payment_ref, ticket_code, \
                created_at \
            ) VALUES (\
                $1::UUID, $2::UUID, $3::UUID, \
                $4::NUMERIC, $5::INT2, \
                $6::NUMERIC, $7::INT2, $8::VARCHAR, $9::TEXT, \
                $10::TIMESTAMPTZ \
            )";
        self.exec(
            SQL,
            &[
                &id,
                &event_id,
                &purchaser_id,
                &amount,
                &currency,
                &multiplier,
                &status,
                &payment_ref,
                &ticket_code,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)?;

        const TICKET_SQL: &str = "\
            INSERT INTO tickets (\
                booking_id, ord, section_id, section_name, seat, \
                price, price_currency \
            ) VALUES (\
                $1::UUID, $2::INT4, $3::UUID, $4::VARCHAR, $5::VARCHAR, \
                $6::NUMERIC, $7::INT2 \
            )";
        for (ord, ticket) in tickets.into_iter().enumerate() {
            let Ticket {
                section_id,
                section_name,
                seat,
                price: Money { amount, currency },
            } = ticket;

            let ord = i32::try_from(ord).expect("`ord` overflow");
            let seat = seat.to_string();

            self.exec(
                TICKET_SQL,
                &[
                    &id,
                    &ord,
                    &section_id,
                    &section_name,
                    &seat,
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

impl<C> Database<Update<Booking>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(booking): Update<Booking>,
    ) -> Result<Self::Ok, Self::Err> {
        // Tickets are immutable once committed, so only the mutable columns
        // are written back.
        const SQL: &str = "\
            UPDATE bookings \
            SET status = $2::INT2, \
                payment_ref = $3::VARCHAR, \
                ticket_code = $4::TEXT \
            WHERE id = $1::UUID";
        self.exec(
            SQL,
            &[
                &booking.id,
                &booking.status,
                &booking.payment_ref,
                &booking.ticket_code,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Insert<Vec<Reservation>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = reservation::Outcome;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(reservations): Insert<Vec<Reservation>>,
    ) -> Result<Self::Ok, Self::Err> {
        // `ON CONFLICT DO NOTHING` keeps the insert conflict-free on the
        // `(event_id, section_id, seat)` primary key: an affected count of
        // zero means a concurrent writer won the seat, and the surrounding
        // transaction must be abandoned.
        const SQL: &str = "\
            INSERT INTO seats (\
                event_id, section_id, seat, booking_id, created_at \
            ) VALUES (\
                $1::UUID, $2::UUID, $3::VARCHAR, $4::UUID, NOW() \
            ) \
            ON CONFLICT (event_id, section_id, seat) DO NOTHING";
        for reservation in reservations {
            let Reservation {
                event_id,
                section_id,
                seat,
                booking_id,
            } = reservation;
            let seat_id = seat.to_string();

            let affected = self
                .exec(SQL, &[&event_id, &section_id, &seat_id, &booking_id])
                .await
                .map_err(tracerr::wrap!())?;
            if affected == 0 {
                return Ok(reservation::Outcome::Conflict {
                    section_id,
                    seat,
                });
            }
        }

        Ok(reservation::Outcome::Applied)
    }
}

impl<C>
    Database<
        Select<By<read::booking::list::Page, read::booking::list::Selector>>,
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = read::booking::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::booking::list::Page, read::booking::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::booking::list::Selector {
            arguments,
            filter: read::booking::list::Filter { purchaser_id },
        } = by.into_inner();

        let limit = i32::try_from(arguments.limit()).unwrap() + 1;

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![&limit, &purchaser_id];

        let cursor_idx = arguments.cursor().map(|c| {
            ps.push(c);
            ps.len()
        });

        let sql = format!(
            "SELECT id \
             FROM bookings \
             WHERE purchaser_id = $2::UUID \
                   {cursor} \
             ORDER BY id {order} \
             LIMIT $1::INT4",
            cursor = cursor_idx.into_iter().format_with("", |idx, f| {
                let op = arguments.kind().operator();
                f(&format_args!("AND id {op} ${idx}::UUID"))
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
                let id: booking::Id = row.get("id");
                (id, id)
            })
            .collect::<Vec<_>>();

        Ok(read::booking::list::Page::new(&arguments, edges, has_more))
    }
}

impl<C> Database<Select<By<read::booking::Revenue, event::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = read::booking::Revenue;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::booking::Revenue, event::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let event_id: event::Id = by.into_inner();

        // An `Event` is priced in a single currency, so `MIN` picks it.
        const SQL: &str = "\
            SELECT SUM(total_amount) AS total, \
                   MIN(total_amount_currency) AS currency \
            FROM bookings \
            WHERE event_id = $1::UUID \
              AND status = $2::INT2";
        let row = self
            .query_opt(SQL, &[&event_id, &booking::Status::Confirmed])
            .await
            .map_err(tracerr::wrap!())?
            .expect("always exists");

        Ok(read::booking::Revenue(
            row.get::<_, Option<_>>("total").map(|amount| Money {
                amount,
                currency: row.get("currency"),
            }),
        ))
    }
}
