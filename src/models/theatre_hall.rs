use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::booking::capacity;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct TheatreHall {
    pub id: i64,
    pub name: String,
    pub row: i32,
    pub seats_in_row: i32,
}

impl TheatreHall {
    pub fn capacity(&self) -> i64 {
        capacity::capacity(self)
    }
}
