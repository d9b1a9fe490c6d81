//! Time-driven status updates for films, showtimes, tickets and seat holds.

use crate::{
    core::{film::film_status_on, seats::release_expired_holds},
    entities::{
        Film, Invoice, Showtime, ShowtimeSeat, Ticket, film, invoice,
        sea_orm_active_enums::{InvoiceStatus, ShowtimeStatus, TicketStatus},
        showtime, showtime_seat, ticket,
    },
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::{QuerySelect, QueryTrait, Set, TransactionTrait, prelude::*};
use serde::Serialize;

/// How many rows each reconciliation step touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub films: usize,
    pub showtimes_started: u64,
    pub showtimes_finished: u64,
    pub tickets_expired: u64,
    pub holds_released: u64,
}

/// Brings every time-dependent status up to date with `now`.
pub async fn reconcile_statuses(db: &DatabaseConnection, now: DateTime<Utc>) -> Result<ReconcileReport> {
    let txn = db.begin().await?;
    let mut report = ReconcileReport::default();

    let today = now.date_naive();
    for film in Film::find().all(&txn).await? {
        let status = film_status_on(film.release_date, film.end_date, today);
        if status != film.status {
            let mut active: film::ActiveModel = film.into();
            active.status = Set(status);
            active.update(&txn).await?;
            report.films += 1;
        }
    }

    report.showtimes_finished = Showtime::update_many()
        .set(showtime::ActiveModel {
            status: Set(ShowtimeStatus::Finished),
            ..Default::default()
        })
        .filter(showtime::Column::Status.is_in([ShowtimeStatus::Scheduled, ShowtimeStatus::Ongoing]))
        .filter(showtime::Column::EndTime.lte(now))
        .exec(&txn)
        .await?
        .rows_affected;

    report.showtimes_started = Showtime::update_many()
        .set(showtime::ActiveModel {
            status: Set(ShowtimeStatus::Ongoing),
            ..Default::default()
        })
        .filter(showtime::Column::Status.eq(ShowtimeStatus::Scheduled))
        .filter(showtime::Column::StartTime.lte(now))
        .exec(&txn)
        .await?
        .rows_affected;

    let finished_seats = ShowtimeSeat::find()
        .select_only()
        .column(showtime_seat::Column::Id)
        .filter(
            showtime_seat::Column::ShowtimeId.in_subquery(
                Showtime::find()
                    .select_only()
                    .column(showtime::Column::Id)
                    .filter(showtime::Column::Status.eq(ShowtimeStatus::Finished))
                    .into_query(),
            ),
        )
        .into_query();
    // unpaid checkouts are left to the expiry sweep
    let paid_invoices = Invoice::find()
        .select_only()
        .column(invoice::Column::Id)
        .filter(invoice::Column::Status.eq(InvoiceStatus::Paid))
        .into_query();
    report.tickets_expired = Ticket::update_many()
        .set(ticket::ActiveModel {
            status: Set(TicketStatus::Expired),
            ..Default::default()
        })
        .filter(ticket::Column::Status.eq(TicketStatus::Unused))
        .filter(ticket::Column::ShowtimeSeatId.in_subquery(finished_seats))
        .filter(ticket::Column::InvoiceId.in_subquery(paid_invoices))
        .exec(&txn)
        .await?
        .rows_affected;

    report.holds_released = release_expired_holds(&txn, now).await?;

    txn.commit().await?;

    if report != ReconcileReport::default() {
        tracing::info!(
            films = report.films,
            showtimes_started = report.showtimes_started,
            showtimes_finished = report.showtimes_finished,
            tickets_expired = report.tickets_expired,
            holds_released = report.holds_released,
            "Statuses reconciled"
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        core::{
            seats::hold_seats,
            ticket::get_ticket,
            transaction::{PaymentNotification, PaymentOutcome, handle_payment_webhook},
        },
        entities::sea_orm_active_enums::{FilmStatus, SeatStatus},
        test_utils::*,
    };
    use chrono::Duration;

    #[tokio::test]
    async fn test_showtime_runs_through_its_statuses() -> Result<()> {
        let fixture = setup_showtime().await?;
        let start = fixture.showtime.start_time;

        let report = reconcile_statuses(&fixture.db, start - Duration::minutes(1)).await?;
        assert_eq!(report.showtimes_started, 0);

        let report = reconcile_statuses(&fixture.db, start + Duration::minutes(1)).await?;
        assert_eq!(report.showtimes_started, 1);
        let showtime = Showtime::find_by_id(fixture.showtime.id).one(&fixture.db).await?.unwrap();
        assert_eq!(showtime.status, ShowtimeStatus::Ongoing);

        let report = reconcile_statuses(&fixture.db, fixture.showtime.end_time).await?;
        assert_eq!(report.showtimes_finished, 1);
        let showtime = Showtime::find_by_id(fixture.showtime.id).one(&fixture.db).await?.unwrap();
        assert_eq!(showtime.status, ShowtimeStatus::Finished);
        Ok(())
    }

    #[tokio::test]
    async fn test_unused_tickets_expire_after_showtime() -> Result<()> {
        let fixture = setup_showtime().await?;
        let paid = create_test_invoice(&fixture, &fixture.seat_ids[..1]).await?;
        let unpaid =
            create_custom_invoice(&fixture, "bob", &fixture.seat_ids[1..2], &[], &[]).await?;
        handle_payment_webhook(
            &fixture.db,
            PaymentNotification {
                reference: paid.transaction.reference.clone(),
                status: PaymentOutcome::Success,
                amount: paid.transaction.amount,
                provider_transaction_id: None,
            },
            Utc::now(),
        )
        .await?;

        let report =
            reconcile_statuses(&fixture.db, fixture.showtime.end_time + Duration::minutes(1))
                .await?;
        assert_eq!(report.tickets_expired, 1);
        let ticket = get_ticket(&fixture.db, paid.tickets[0].id).await?;
        assert_eq!(ticket.status, TicketStatus::Expired);
        let ticket = get_ticket(&fixture.db, unpaid.tickets[0].id).await?;
        assert_eq!(ticket.status, TicketStatus::Unused);
        Ok(())
    }

    #[tokio::test]
    async fn test_cancelled_showtime_is_left_alone() -> Result<()> {
        let fixture = setup_showtime().await?;
        crate::core::showtime::cancel_showtime(&fixture.db, fixture.showtime.id).await?;

        let report =
            reconcile_statuses(&fixture.db, fixture.showtime.end_time + Duration::hours(1)).await?;
        assert_eq!(report.showtimes_finished, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_film_status_and_lapsed_holds() -> Result<()> {
        let fixture = setup_showtime().await?;
        let now = Utc::now();
        hold_seats(&fixture.db, fixture.showtime.id, &fixture.seat_ids[..1], "alice", 5, now)
            .await?;

        let mut film: film::ActiveModel = Film::find().one(&fixture.db).await?.unwrap().into();
        film.end_date = Set(Some(now.date_naive() - Duration::days(1)));
        film.update(&fixture.db).await?;

        let report = reconcile_statuses(&fixture.db, now + Duration::minutes(6)).await?;
        assert_eq!(report.films, 1);
        assert_eq!(report.holds_released, 1);

        let film = Film::find().one(&fixture.db).await?.unwrap();
        assert_eq!(film.status, FilmStatus::Ended);
        let seat = ShowtimeSeat::find_by_id(fixture.seat_ids[0]).one(&fixture.db).await?.unwrap();
        assert_eq!(seat.status, SeatStatus::Available);
        Ok(())
    }
}
