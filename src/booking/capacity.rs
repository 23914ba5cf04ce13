//! Вместимость зала.

use crate::models::TheatreHall;

/// Полное число мест в зале: ряды × места в ряду.
///
/// Считается в i64, чтобы произведение двух i32 не переполнялось.
/// Отрицательные размеры трактуются как нулевые.
pub fn capacity(hall: &TheatreHall) -> i64 {
    from_dimensions(hall.row, hall.seats_in_row)
}

pub fn from_dimensions(row: i32, seats_in_row: i32) -> i64 {
    i64::from(row.max(0)) * i64::from(seats_in_row.max(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn hall(row: i32, seats_in_row: i32) -> TheatreHall {
        TheatreHall { id: 1, name: "Main".into(), row, seats_in_row }
    }

    #[test]
    fn small_hall() {
        assert_eq!(capacity(&hall(2, 3)), 6);
        assert_eq!(capacity(&hall(5, 10)), 50);
    }

    #[test]
    fn degenerate_hall_has_zero_capacity() {
        assert_eq!(capacity(&hall(0, 10)), 0);
        assert_eq!(capacity(&hall(10, 0)), 0);
        assert_eq!(capacity(&hall(-3, 10)), 0);
    }

    #[test]
    fn huge_hall_does_not_overflow() {
        assert_eq!(
            capacity(&hall(i32::MAX, i32::MAX)),
            i64::from(i32::MAX) * i64::from(i32::MAX)
        );
    }

    proptest! {
        #[test]
        fn capacity_is_rows_times_seats(r in 1..=1_000i32, s in 1..=1_000i32) {
            prop_assert_eq!(capacity(&hall(r, s)), i64::from(r * s));
        }
    }
}
