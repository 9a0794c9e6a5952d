use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Вместимость не хранится в БД, всегда считается из rows * seats_in_row
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PlanetariumDome {
    pub id: i64,
    pub name: String,
    pub rows: i32,
    pub seats_in_row: i32,
}
