//! Запросы каталога: жанры, актёры, спектакли, залы, показы и история резервов.
//!
//! Здесь только чтение и простое создание. Бронирование мест живёт в [`crate::booking`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use tracing::info;

use crate::booking::{availability, capacity};
use crate::models::{Actor, Genre, Performance, Play, TheatreHall};
use crate::storage::StoreError;

// Список спектакля: жанры и актёры отданы строками
const PLAY_LIST_SELECT: &str = r#"
    SELECT
        p.id,
        p.title,
        p.description,
        p.image,
        ARRAY(
            SELECT g.name::text FROM genres g
            JOIN play_genres pg ON pg.genre_id = g.id
            WHERE pg.play_id = p.id
            ORDER BY g.id
        ) AS genres,
        ARRAY(
            SELECT a.first_name || ' ' || a.last_name FROM actors a
            JOIN play_actors pa ON pa.actor_id = a.id
            WHERE pa.play_id = p.id
            ORDER BY a.id
        ) AS actors
    FROM plays p
"#;

const PERFORMANCE_LIST_SELECT: &str = r#"
    SELECT
        pf.id,
        pf.show_time,
        p.title AS play_title,
        h.name AS theatre_hall_name,
        h.row AS hall_row,
        h.seats_in_row AS hall_seats_in_row,
        (SELECT COUNT(*) FROM tickets t WHERE t.performance_id = pf.id) AS tickets_sold
    FROM performances pf
    JOIN plays p ON p.id = pf.play_id
    JOIN theatre_halls h ON h.id = pf.theatre_hall_id
"#;

#[derive(Debug, Clone, Default)]
pub struct PlayFilter {
    pub title: Option<String>,
    pub genres: Option<Vec<i64>>,
    pub actors: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Default)]
pub struct PerformanceFilter {
    pub date: Option<NaiveDate>,
    pub play: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PlayListItem {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub genres: Vec<String>,
    pub actors: Vec<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorView {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
}

impl From<Actor> for ActorView {
    fn from(actor: Actor) -> Self {
        ActorView {
            full_name: actor.full_name(),
            id: actor.id,
            first_name: actor.first_name,
            last_name: actor.last_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayDetail {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub genres: Vec<Genre>,
    pub actors: Vec<ActorView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TheatreHallView {
    pub id: i64,
    pub name: String,
    pub row: i32,
    pub seats_in_row: i32,
    pub capacity: i64,
}

impl From<TheatreHall> for TheatreHallView {
    fn from(hall: TheatreHall) -> Self {
        TheatreHallView {
            capacity: hall.capacity(),
            id: hall.id,
            name: hall.name,
            row: hall.row,
            seats_in_row: hall.seats_in_row,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct PerformanceRow {
    id: i64,
    show_time: DateTime<Utc>,
    play_title: String,
    theatre_hall_name: String,
    hall_row: i32,
    hall_seats_in_row: i32,
    tickets_sold: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceListItem {
    pub id: i64,
    pub show_time: DateTime<Utc>,
    pub play_title: String,
    pub theatre_hall_name: String,
    pub theatre_hall_capacity: i64,
    pub tickets_available: i64,
}

impl From<PerformanceRow> for PerformanceListItem {
    fn from(row: PerformanceRow) -> Self {
        let hall_capacity = capacity::from_dimensions(row.hall_row, row.hall_seats_in_row);
        PerformanceListItem {
            id: row.id,
            show_time: row.show_time,
            play_title: row.play_title,
            theatre_hall_name: row.theatre_hall_name,
            theatre_hall_capacity: hall_capacity,
            tickets_available: availability::remaining(hall_capacity, row.tickets_sold),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, FromRow)]
pub struct TakenPlace {
    pub row: i32,
    pub seat: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceDetail {
    pub id: i64,
    pub show_time: DateTime<Utc>,
    pub play: PlayListItem,
    pub theatre_hall: TheatreHallView,
    pub tickets_available: i64,
    pub taken_places: Vec<TakenPlace>,
}

/// Краткая карточка показа внутри билета.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSummary {
    pub id: i64,
    pub show_time: DateTime<Utc>,
    pub play_title: String,
    pub theatre_hall_name: String,
    pub theatre_hall_capacity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketView {
    pub id: i64,
    pub row: i32,
    pub seat: i32,
    pub performance: PerformanceSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReservationView {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub tickets: Vec<TicketView>,
}

#[derive(Debug, Clone, FromRow)]
struct TicketRow {
    id: i64,
    row: i32,
    seat: i32,
    reservation_id: i64,
    performance_id: i64,
    show_time: DateTime<Utc>,
    play_title: String,
    theatre_hall_name: String,
    hall_row: i32,
    hall_seats_in_row: i32,
}

#[derive(Debug, Clone, FromRow)]
struct ReservationRow {
    id: i64,
    created_at: DateTime<Utc>,
}

/// Клиент каталога поверх пула PostgreSQL
#[derive(Clone)]
pub struct CatalogClient {
    pool: PgPool,
}

impl CatalogClient {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // === Жанры и актёры ===

    pub async fn list_genres(&self) -> Result<Vec<Genre>, StoreError> {
        let genres = sqlx::query_as::<_, Genre>("SELECT id, name FROM genres ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(genres)
    }

    pub async fn create_genre(&self, name: &str) -> Result<Genre, StoreError> {
        let genre = sqlx::query_as::<_, Genre>(
            "INSERT INTO genres (name) VALUES ($1) RETURNING id, name"
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(genre)
    }

    pub async fn list_actors(&self) -> Result<Vec<ActorView>, StoreError> {
        let actors = sqlx::query_as::<_, Actor>(
            "SELECT id, first_name, last_name FROM actors ORDER BY id"
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(actors.into_iter().map(ActorView::from).collect())
    }

    pub async fn create_actor(&self, first_name: &str, last_name: &str) -> Result<ActorView, StoreError> {
        let actor = sqlx::query_as::<_, Actor>(
            "INSERT INTO actors (first_name, last_name)
             VALUES ($1, $2)
             RETURNING id, first_name, last_name"
        )
        .bind(first_name)
        .bind(last_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(actor.into())
    }

    // === Спектакли ===

    pub async fn list_plays(&self, filter: &PlayFilter) -> Result<Vec<PlayListItem>, StoreError> {
        // strpos вместо ILIKE: % и _ в запросе пользователя не работают как шаблон
        let sql = format!(
            "{PLAY_LIST_SELECT}
             WHERE ($1::text IS NULL OR strpos(lower(p.title), lower($1)) > 0)
               AND ($2::bigint[] IS NULL OR EXISTS (
                    SELECT 1 FROM play_genres pg WHERE pg.play_id = p.id AND pg.genre_id = ANY($2)))
               AND ($3::bigint[] IS NULL OR EXISTS (
                    SELECT 1 FROM play_actors pa WHERE pa.play_id = p.id AND pa.actor_id = ANY($3)))
             ORDER BY p.id"
        );

        let plays = sqlx::query_as::<_, PlayListItem>(&sql)
            .bind(filter.title.as_deref())
            .bind(filter.genres.as_deref())
            .bind(filter.actors.as_deref())
            .fetch_all(&self.pool)
            .await?;
        Ok(plays)
    }

    pub async fn get_play(&self, id: i64) -> Result<Option<Play>, StoreError> {
        let play = sqlx::query_as::<_, Play>(
            "SELECT id, title, description, image FROM plays WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(play)
    }

    pub async fn get_play_detail(&self, id: i64) -> Result<Option<PlayDetail>, StoreError> {
        let Some(play) = self.get_play(id).await? else {
            return Ok(None);
        };

        let genres = sqlx::query_as::<_, Genre>(
            "SELECT g.id, g.name FROM genres g
             JOIN play_genres pg ON pg.genre_id = g.id
             WHERE pg.play_id = $1
             ORDER BY g.id"
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let actors = sqlx::query_as::<_, Actor>(
            "SELECT a.id, a.first_name, a.last_name FROM actors a
             JOIN play_actors pa ON pa.actor_id = a.id
             WHERE pa.play_id = $1
             ORDER BY a.id"
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(PlayDetail {
            id: play.id,
            title: play.title,
            description: play.description,
            image: play.image,
            genres,
            actors: actors.into_iter().map(ActorView::from).collect(),
        }))
    }

    /// Создаёт спектакль вместе со связями. Несуществующий жанр или актёр
    /// даёт [`StoreError::ForeignKeyViolation`], и ничего не сохраняется.
    pub async fn create_play(
        &self,
        title: &str,
        description: &str,
        genres: &[i64],
        actors: &[i64],
    ) -> Result<PlayDetail, StoreError> {
        let mut tx = self.pool.begin().await?;

        let play_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO plays (title, description) VALUES ($1, $2) RETURNING id"
        )
        .bind(title)
        .bind(description)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO play_genres (play_id, genre_id)
             SELECT $1, UNNEST($2::bigint[])"
        )
        .bind(play_id)
        .bind(dedup(genres))
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO play_actors (play_id, actor_id)
             SELECT $1, UNNEST($2::bigint[])"
        )
        .bind(play_id)
        .bind(dedup(actors))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!("Play {} created", play_id);

        self.get_play_detail(play_id).await?.ok_or(StoreError::NotFound)
    }

    pub async fn set_play_image(&self, id: i64, image: &str) -> Result<Option<Play>, StoreError> {
        let play = sqlx::query_as::<_, Play>(
            "UPDATE plays SET image = $2 WHERE id = $1
             RETURNING id, title, description, image"
        )
        .bind(id)
        .bind(image)
        .fetch_optional(&self.pool)
        .await?;
        Ok(play)
    }

    // === Залы ===

    pub async fn list_theatre_halls(&self) -> Result<Vec<TheatreHallView>, StoreError> {
        let halls = sqlx::query_as::<_, TheatreHall>(
            "SELECT id, name, row, seats_in_row FROM theatre_halls ORDER BY id"
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(halls.into_iter().map(TheatreHallView::from).collect())
    }

    pub async fn create_theatre_hall(
        &self,
        name: &str,
        row: i32,
        seats_in_row: i32,
    ) -> Result<TheatreHallView, StoreError> {
        let hall = sqlx::query_as::<_, TheatreHall>(
            "INSERT INTO theatre_halls (name, row, seats_in_row)
             VALUES ($1, $2, $3)
             RETURNING id, name, row, seats_in_row"
        )
        .bind(name)
        .bind(row)
        .bind(seats_in_row)
        .fetch_one(&self.pool)
        .await?;
        Ok(hall.into())
    }

    // === Показы ===

    /// Показы с остатком мест. Остаток считается на каждый запрос и не кешируется.
    pub async fn list_performances(
        &self,
        filter: &PerformanceFilter,
    ) -> Result<Vec<PerformanceListItem>, StoreError> {
        let sql = format!(
            "{PERFORMANCE_LIST_SELECT}
             WHERE ($1::date IS NULL OR (pf.show_time AT TIME ZONE 'UTC')::date = $1)
               AND ($2::bigint IS NULL OR pf.play_id = $2)
             ORDER BY pf.show_time, pf.id"
        );

        let rows = sqlx::query_as::<_, PerformanceRow>(&sql)
            .bind(filter.date)
            .bind(filter.play)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(PerformanceListItem::from).collect())
    }

    pub async fn get_performance_detail(&self, id: i64) -> Result<Option<PerformanceDetail>, StoreError> {
        let performance = sqlx::query_as::<_, Performance>(
            "SELECT id, play_id, theatre_hall_id, show_time FROM performances WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(performance) = performance else {
            return Ok(None);
        };

        let play = sqlx::query_as::<_, PlayListItem>(&format!("{PLAY_LIST_SELECT} WHERE p.id = $1"))
            .bind(performance.play_id)
            .fetch_one(&self.pool)
            .await?;

        let hall = sqlx::query_as::<_, TheatreHall>(
            "SELECT id, name, row, seats_in_row FROM theatre_halls WHERE id = $1"
        )
        .bind(performance.theatre_hall_id)
        .fetch_one(&self.pool)
        .await?;

        let taken_places = sqlx::query_as::<_, TakenPlace>(
            "SELECT row, seat FROM tickets WHERE performance_id = $1 ORDER BY row, seat"
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(PerformanceDetail {
            id: performance.id,
            show_time: performance.show_time,
            play,
            tickets_available: availability::for_hall(&hall, taken_places.len() as i64),
            theatre_hall: hall.into(),
            taken_places,
        }))
    }

    pub async fn create_performance(
        &self,
        play_id: i64,
        theatre_hall_id: i64,
        show_time: DateTime<Utc>,
    ) -> Result<Performance, StoreError> {
        let performance = sqlx::query_as::<_, Performance>(
            "INSERT INTO performances (play_id, theatre_hall_id, show_time)
             VALUES ($1, $2, $3)
             RETURNING id, play_id, theatre_hall_id, show_time"
        )
        .bind(play_id)
        .bind(theatre_hall_id)
        .bind(show_time)
        .fetch_one(&self.pool)
        .await?;
        info!("Performance {} scheduled at {}", performance.id, performance.show_time);
        Ok(performance)
    }

    // === Резервы пользователя ===

    /// Страница резервов пользователя, новые первыми, и общее их количество.
    pub async fn list_reservations(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<(i64, Vec<ReservationView>), StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM reservations WHERE user_id = $1"
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let reservations = sqlx::query_as::<_, ReservationRow>(
            "SELECT id, created_at FROM reservations
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        if reservations.is_empty() {
            return Ok((count, Vec::new()));
        }

        let ids: Vec<i64> = reservations.iter().map(|r| r.id).collect();
        let tickets = sqlx::query_as::<_, TicketRow>(
            r#"
            SELECT
                t.id, t.row, t.seat, t.reservation_id,
                pf.id AS performance_id,
                pf.show_time,
                p.title AS play_title,
                h.name AS theatre_hall_name,
                h.row AS hall_row,
                h.seats_in_row AS hall_seats_in_row
            FROM tickets t
            JOIN performances pf ON pf.id = t.performance_id
            JOIN plays p ON p.id = pf.play_id
            JOIN theatre_halls h ON h.id = pf.theatre_hall_id
            WHERE t.reservation_id = ANY($1)
            ORDER BY t.id
            "#
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        Ok((count, group_tickets(reservations, tickets)))
    }
}

fn group_tickets(reservations: Vec<ReservationRow>, tickets: Vec<TicketRow>) -> Vec<ReservationView> {
    let mut by_reservation: HashMap<i64, Vec<TicketView>> = HashMap::new();
    for t in tickets {
        by_reservation.entry(t.reservation_id).or_default().push(TicketView {
            id: t.id,
            row: t.row,
            seat: t.seat,
            performance: PerformanceSummary {
                id: t.performance_id,
                show_time: t.show_time,
                play_title: t.play_title,
                theatre_hall_name: t.theatre_hall_name,
                theatre_hall_capacity: capacity::from_dimensions(t.hall_row, t.hall_seats_in_row),
            },
        });
    }

    reservations
        .into_iter()
        .map(|r| ReservationView {
            tickets: by_reservation.remove(&r.id).unwrap_or_default(),
            id: r.id,
            created_at: r.created_at,
        })
        .collect()
}

fn dedup(ids: &[i64]) -> Vec<i64> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket_row(id: i64, reservation_id: i64) -> TicketRow {
        TicketRow {
            id,
            row: 1,
            seat: id as i32,
            reservation_id,
            performance_id: 3,
            show_time: Utc::now(),
            play_title: "Hamlet".into(),
            theatre_hall_name: "Red".into(),
            hall_row: 2,
            hall_seats_in_row: 3,
        }
    }

    #[test]
    fn tickets_are_grouped_under_their_reservation_in_page_order() {
        let reservations = vec![
            ReservationRow { id: 20, created_at: Utc::now() },
            ReservationRow { id: 10, created_at: Utc::now() },
        ];
        let tickets = vec![ticket_row(1, 10), ticket_row(2, 20), ticket_row(3, 10)];

        let views = group_tickets(reservations, tickets);

        assert_eq!(views.iter().map(|v| v.id).collect::<Vec<_>>(), vec![20, 10]);
        assert_eq!(views[0].tickets.len(), 1);
        assert_eq!(views[1].tickets.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(views[1].tickets[0].performance.theatre_hall_capacity, 6);
    }

    #[test]
    fn performance_row_computes_availability() {
        let item = PerformanceListItem::from(PerformanceRow {
            id: 1,
            show_time: Utc::now(),
            play_title: "Hamlet".into(),
            theatre_hall_name: "Red".into(),
            hall_row: 2,
            hall_seats_in_row: 3,
            tickets_sold: 2,
        });
        assert_eq!(item.theatre_hall_capacity, 6);
        assert_eq!(item.tickets_available, 4);
    }

    #[test]
    fn hall_view_exposes_capacity() {
        let view = TheatreHallView::from(TheatreHall {
            id: 1,
            name: "Blue".into(),
            row: 5,
            seats_in_row: 10,
        });
        assert_eq!(view.capacity, 50);
    }

    #[test]
    fn dedup_sorts_and_removes_repeats() {
        assert_eq!(dedup(&[3, 1, 3, 2, 1]), vec![1, 2, 3]);
    }
}
