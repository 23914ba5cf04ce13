use async_trait::async_trait;
use sqlx::{Postgres, Transaction};

use super::{BookingStore, BookingTx, StoreError};
use crate::database::Database;
use crate::models::{Reservation, TheatreHall, Ticket};

const HALL_BY_PERFORMANCE: &str = r#"
    SELECT h.id, h.name, h.row, h.seats_in_row
    FROM performances p
    JOIN theatre_halls h ON h.id = p.theatre_hall_id
    WHERE p.id = $1
"#;

pub struct PgBookingTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl BookingStore for Database {
    type Tx = PgBookingTx;

    async fn begin(&self) -> Result<PgBookingTx, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(PgBookingTx { tx })
    }

    async fn find_hall(&self, performance_id: i64) -> Result<Option<TheatreHall>, StoreError> {
        let hall = sqlx::query_as::<_, TheatreHall>(HALL_BY_PERFORMANCE)
            .bind(performance_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(hall)
    }

    async fn tickets_sold(&self, performance_id: i64) -> Result<i64, StoreError> {
        let sold = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM tickets WHERE performance_id = $1"
        )
        .bind(performance_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(sold)
    }
}

#[async_trait]
impl BookingTx for PgBookingTx {
    async fn insert_reservation(&mut self, user_id: i64) -> Result<Reservation, StoreError> {
        let reservation = sqlx::query_as::<_, Reservation>(
            "INSERT INTO reservations (user_id)
             VALUES ($1)
             RETURNING id, user_id, created_at"
        )
        .bind(user_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(reservation)
    }

    async fn find_hall(&mut self, performance_id: i64) -> Result<Option<TheatreHall>, StoreError> {
        let hall = sqlx::query_as::<_, TheatreHall>(HALL_BY_PERFORMANCE)
            .bind(performance_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(hall)
    }

    async fn insert_ticket(
        &mut self,
        reservation_id: i64,
        performance_id: i64,
        row: i32,
        seat: i32,
    ) -> Result<Ticket, StoreError> {
        // Конкурентная вставка того же места ждёт коммита соседней транзакции
        // и получает unique violation по tickets_performance_row_seat_key
        let ticket = sqlx::query_as::<_, Ticket>(
            "INSERT INTO tickets (performance_id, reservation_id, row, seat)
             VALUES ($1, $2, $3, $4)
             RETURNING id, row, seat, performance_id, reservation_id"
        )
        .bind(performance_id)
        .bind(reservation_id)
        .bind(row)
        .bind(seat)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(ticket)
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
