use crate::models::PlanetariumDome;

/// Сетка мест зала: источник границ для валидации и подсчёта свободных мест.
pub trait DomeCapacity {
    fn rows(&self) -> i32;
    fn seats_in_row(&self) -> i32;

    fn capacity(&self) -> i64 {
        i64::from(self.rows()) * i64::from(self.seats_in_row())
    }
}

impl DomeCapacity for PlanetariumDome {
    fn rows(&self) -> i32 {
        self.rows
    }

    fn seats_in_row(&self) -> i32 {
        self.seats_in_row
    }
}
