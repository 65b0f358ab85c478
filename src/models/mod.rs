use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// A registered bus line with its start and end stops.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Bus {
    pub bus_id: i64,
    pub bus_no: String,
    pub bus_type: String,
    pub start_bus: String,
    pub end_bus: String,
}

/// A single scheduled trip time ("HH:MM") for a bus.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct BusTiming {
    pub timing_id: i64,
    pub bus_id: i64,
    pub trip_time: String,
}

/// A named boarding location, independent of any route.
///
/// Stop names are stored trimmed and lowercased; uniqueness is enforced on
/// the normalized form.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Stop {
    pub stop_id: i64,
    pub stop_name: String,
}

/// One row of the denormalized place-based departure listing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct PlaceDeparture {
    pub departure_id: i64,
    pub place_name: String,
    pub bus_no: String,
    pub bus_type: String,
    pub departure_time: String,
}

/// Canonical form for stop and place names: trimmed and lowercased.
///
/// Applied on every write and read path that matches names, so differently
/// cased inputs always compare equal.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Bus numbers keep their case but lose surrounding whitespace.
pub fn clean_bus_no(bus_no: &str) -> String {
    bus_no.trim().to_string()
}

/// Checks that a trip time is a zero-padded 24-hour "HH:MM" string.
///
/// The schedule relies on lexical ordering of these strings, which only
/// works when every value has this exact shape.
pub fn is_valid_trip_time(value: &str) -> bool {
    let Some((hours, minutes)) = value.split_once(':') else {
        return false;
    };
    if hours.len() != 2 || minutes.len() != 2 {
        return false;
    }
    if !hours.bytes().all(|b| b.is_ascii_digit()) || !minutes.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    match (hours.parse::<u32>(), minutes.parse::<u32>()) {
        (Ok(h), Ok(m)) => h < 24 && m < 60,
        _ => false,
    }
}

/// Current local wall-clock time as "HH:MM", the cutoff for upcoming trips.
pub fn now_hhmm() -> String {
    chrono::Local::now().format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_name("  Central  "), "central");
        assert_eq!(normalize_name("AIRPORT"), "airport");
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        for name in ["  Central  ", "Airport", "main STREET", ""] {
            let once = normalize_name(name);
            assert_eq!(normalize_name(&once), once);
        }
    }

    #[test]
    fn clean_bus_no_preserves_case() {
        assert_eq!(clean_bus_no("  12A "), "12A");
        assert_eq!(clean_bus_no("45b"), "45b");
    }

    #[test]
    fn valid_trip_times() {
        assert!(is_valid_trip_time("00:00"));
        assert!(is_valid_trip_time("08:30"));
        assert!(is_valid_trip_time("23:59"));
    }

    #[test]
    fn invalid_trip_times() {
        assert!(!is_valid_trip_time("8:00"));
        assert!(!is_valid_trip_time("24:00"));
        assert!(!is_valid_trip_time("08:60"));
        assert!(!is_valid_trip_time("08-30"));
        assert!(!is_valid_trip_time("+1:30"));
        assert!(!is_valid_trip_time(" 08:00"));
        assert!(!is_valid_trip_time(""));
        assert!(!is_valid_trip_time("morning"));
    }
}
