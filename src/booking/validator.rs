use serde::Serialize;
use std::fmt;

use super::capacity::DomeCapacity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatField {
    Row,
    Seat,
}

impl SeatField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatField::Row => "row",
            SeatField::Seat => "seat",
        }
    }

    // Атрибут зала, который ограничивает поле
    fn dome_attr(&self) -> &'static str {
        match self {
            SeatField::Row => "rows",
            SeatField::Seat => "seats_in_row",
        }
    }
}

/// Одно поле вне допустимого диапазона `(1, max)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: SeatField,
    pub value: i32,
    pub min: i32,
    pub max: i32,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} number must be in available range: (1, {}): ({}, {})",
            self.field.as_str(),
            self.field.dome_attr(),
            self.min,
            self.max
        )
    }
}

/// Все нарушения для одного запрошенного места. Никогда не пустой.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeatViolation {
    pub violations: Vec<FieldViolation>,
}

impl SeatViolation {
    pub fn get(&self, field: SeatField) -> Option<&FieldViolation> {
        self.violations.iter().find(|v| v.field == field)
    }
}

impl fmt::Display for SeatViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.violations.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join("; "))
    }
}

/// Проверяет место против границ зала. Ряд и кресло проверяются
/// независимо, так что одна ошибка может содержать оба поля.
pub fn validate_seat<D: DomeCapacity + ?Sized>(row: i32, seat: i32, dome: &D) -> Result<(), SeatViolation> {
    let violations: Vec<FieldViolation> = [
        (SeatField::Row, row, dome.rows()),
        (SeatField::Seat, seat, dome.seats_in_row()),
    ]
    .into_iter()
    .filter(|(_, value, max)| !(1..=*max).contains(value))
    .map(|(field, value, max)| FieldViolation { field, value, min: 1, max })
    .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(SeatViolation { violations })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PlanetariumDome;
    use proptest::prelude::*;

    fn dome(rows: i32, seats_in_row: i32) -> PlanetariumDome {
        PlanetariumDome { id: 1, name: "Main dome".into(), rows, seats_in_row }
    }

    #[test]
    fn accepts_corner_seats() {
        let d = dome(10, 15);
        assert!(validate_seat(1, 1, &d).is_ok());
        assert!(validate_seat(10, 15, &d).is_ok());
    }

    #[test]
    fn row_zero_reports_row_and_range() {
        let err = validate_seat(0, 5, &dome(10, 15)).unwrap_err();
        assert_eq!(err.violations.len(), 1);
        let row = err.get(SeatField::Row).unwrap();
        assert_eq!((row.value, row.min, row.max), (0, 1, 10));
        assert_eq!(row.to_string(), "row number must be in available range: (1, rows): (1, 10)");
    }

    #[test]
    fn reports_both_fields_at_once() {
        let err = validate_seat(11, 16, &dome(10, 15)).unwrap_err();
        assert_eq!(err.violations.len(), 2);
        assert_eq!(err.get(SeatField::Seat).unwrap().max, 15);
        assert!(err.to_string().contains("seat number must be in available range: (1, seats_in_row): (1, 15)"));
    }

    #[test]
    fn negative_values_are_not_clamped() {
        let err = validate_seat(-3, 2, &dome(4, 4)).unwrap_err();
        assert_eq!(err.get(SeatField::Row).unwrap().value, -3);
    }

    proptest! {
        #[test]
        fn valid_iff_within_bounds(
            rows in 1i32..60,
            seats in 1i32..60,
            r in -5i32..70,
            s in -5i32..70,
        ) {
            let expected = (1..=rows).contains(&r) && (1..=seats).contains(&s);
            prop_assert_eq!(validate_seat(r, s, &dome(rows, seats)).is_ok(), expected);
        }
    }
}
