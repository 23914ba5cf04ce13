//! Остаток свободных мест на спектакль.
//!
//! Считается на каждый запрос и ничего не блокирует, поэтому при параллельных
//! бронированиях может показывать устаревшее значение. Решает только бронирование.

use super::capacity;
use super::reservation::BookingError;
use crate::models::TheatreHall;
use crate::storage::BookingStore;

/// Вместимость минус проданные билеты, не меньше нуля.
pub fn remaining(capacity: i64, tickets_sold: i64) -> i64 {
    (capacity - tickets_sold).max(0)
}

pub fn for_hall(hall: &TheatreHall, tickets_sold: i64) -> i64 {
    remaining(capacity::capacity(hall), tickets_sold)
}

pub async fn available<S: BookingStore>(store: &S, performance_id: i64) -> Result<i64, BookingError> {
    let hall = store
        .find_hall(performance_id)
        .await?
        .ok_or(BookingError::NotFound { performance: performance_id })?;
    let sold = store.tickets_sold(performance_id).await?;
    Ok(for_hall(&hall, sold))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryBookingStore;

    #[test]
    fn remaining_is_capacity_minus_sold() {
        assert_eq!(remaining(6, 0), 6);
        assert_eq!(remaining(6, 2), 4);
        assert_eq!(remaining(6, 6), 0);
    }

    #[test]
    fn zero_capacity_is_zero_not_error() {
        assert_eq!(remaining(0, 0), 0);
    }

    #[test]
    fn never_negative() {
        assert_eq!(remaining(2, 5), 0);
    }

    #[tokio::test]
    async fn empty_performance_is_fully_available() {
        let store = MemoryBookingStore::new();
        let hall = store.add_hall("Main", 5, 10);
        let performance = store.add_performance(hall.id);
        assert_eq!(available(&store, performance).await.unwrap(), 50);
    }

    #[tokio::test]
    async fn unknown_performance() {
        let store = MemoryBookingStore::new();
        let err = available(&store, 9).await.unwrap_err();
        assert!(matches!(err, BookingError::NotFound { performance: 9 }));
    }
}
