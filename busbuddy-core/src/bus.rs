use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FieldError;
use crate::validate;

pub const MIN_SEATS: i32 = 10;
pub const MAX_SEATS: i32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusType {
    #[serde(rename = "AC")]
    Ac,
    #[serde(rename = "Non-AC")]
    NonAc,
    Deluxe,
    #[serde(rename = "Semi-Deluxe")]
    SemiDeluxe,
    Sleeper,
}

impl BusType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusType::Ac => "AC",
            BusType::NonAc => "Non-AC",
            BusType::Deluxe => "Deluxe",
            BusType::SemiDeluxe => "Semi-Deluxe",
            BusType::Sleeper => "Sleeper",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AC" => Some(BusType::Ac),
            "Non-AC" => Some(BusType::NonAc),
            "Deluxe" => Some(BusType::Deluxe),
            "Semi-Deluxe" => Some(BusType::SemiDeluxe),
            "Sleeper" => Some(BusType::Sleeper),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusStatus {
    Active,
    Inactive,
    Maintenance,
}

impl BusStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusStatus::Active => "active",
            BusStatus::Inactive => "inactive",
            BusStatus::Maintenance => "maintenance",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(BusStatus::Active),
            "inactive" => Some(BusStatus::Inactive),
            "maintenance" => Some(BusStatus::Maintenance),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bus {
    pub id: Uuid,
    pub bus_number: String,
    pub bus_name: String,
    pub bus_type: BusType,
    pub total_seats: i32,
    pub available_seats: i32,
    pub amenities: Vec<String>,
    pub operator_id: Uuid,
    pub route_id: Uuid,
    pub price_per_seat: i64,
    pub status: BusStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bus {
    /// Percentage of seats sold, two decimal places.
    pub fn occupancy_rate(&self) -> f64 {
        if self.total_seats == 0 {
            return 0.0;
        }
        let rate = (self.total_seats - self.available_seats) as f64 / self.total_seats as f64 * 100.0;
        (rate * 100.0).round() / 100.0
    }

    /// `0 <= available_seats <= total_seats` must hold after every
    /// booking and cancellation.
    pub fn seats_invariant_holds(&self) -> bool {
        self.available_seats >= 0 && self.available_seats <= self.total_seats
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBusRequest {
    pub bus_number: String,
    pub bus_name: String,
    pub bus_type: String,
    pub total_seats: i32,
    #[serde(default)]
    pub amenities: Vec<String>,
    pub route_id: Uuid,
    pub price_per_seat: i64,
    #[serde(default)]
    pub status: Option<String>,
}

impl CreateBusRequest {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        let number = self.bus_number.trim();
        if number.len() < 3 || number.len() > 20 {
            errors.push(FieldError::new(
                "busNumber",
                "Bus number must be between 3 and 20 characters",
            ));
        } else if !validate::is_bus_number(number) {
            errors.push(FieldError::new(
                "busNumber",
                "Bus number can only contain uppercase letters, numbers, and hyphens",
            ));
        }

        validate::length_between(&mut errors, "busName", &self.bus_name, 2, 100, "Bus name");

        if BusType::parse(&self.bus_type).is_none() {
            errors.push(FieldError::new("busType", "Invalid bus type"));
        }
        if !(MIN_SEATS..=MAX_SEATS).contains(&self.total_seats) {
            errors.push(FieldError::new(
                "totalSeats",
                format!("Total seats must be between {} and {}", MIN_SEATS, MAX_SEATS),
            ));
        }
        if self.price_per_seat < 0 {
            errors.push(FieldError::new("pricePerSeat", "Price per seat must be a positive number"));
        }
        if let Some(status) = &self.status {
            if BusStatus::parse(status).is_none() {
                errors.push(FieldError::new("status", "Invalid bus status"));
            }
        }

        errors
    }
}

/// Admin bus edits; absent fields stay untouched. Seat counts are not
/// editable here once bookings exist against them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusUpdate {
    pub bus_name: Option<String>,
    pub bus_type: Option<String>,
    pub amenities: Option<Vec<String>>,
    pub route_id: Option<Uuid>,
    pub price_per_seat: Option<i64>,
    pub status: Option<String>,
}

impl BusUpdate {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if let Some(name) = &self.bus_name {
            validate::length_between(&mut errors, "busName", name, 2, 100, "Bus name");
        }
        if let Some(bus_type) = &self.bus_type {
            if BusType::parse(bus_type).is_none() {
                errors.push(FieldError::new("busType", "Invalid bus type"));
            }
        }
        if matches!(self.price_per_seat, Some(p) if p < 0) {
            errors.push(FieldError::new("pricePerSeat", "Price per seat must be a positive number"));
        }
        if let Some(status) = &self.status {
            if BusStatus::parse(status).is_none() {
                errors.push(FieldError::new("status", "Invalid bus status"));
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bus() -> Bus {
        Bus {
            id: Uuid::new_v4(),
            bus_number: "BA-2-KHA-1234".to_string(),
            bus_name: "Greenline Express".to_string(),
            bus_type: BusType::Deluxe,
            total_seats: 40,
            available_seats: 40,
            amenities: vec!["Wi-Fi".to_string()],
            operator_id: Uuid::new_v4(),
            route_id: Uuid::new_v4(),
            price_per_seat: 1200,
            status: BusStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn occupancy_rate_rounds_to_two_places() {
        let mut b = bus();
        b.total_seats = 36;
        b.available_seats = 29;
        // 7/36 = 19.4444...%
        assert_eq!(b.occupancy_rate(), 19.44);
    }

    #[test]
    fn empty_bus_has_zero_occupancy() {
        assert_eq!(bus().occupancy_rate(), 0.0);
    }

    #[test]
    fn seats_invariant() {
        let mut b = bus();
        assert!(b.seats_invariant_holds());
        b.available_seats = -1;
        assert!(!b.seats_invariant_holds());
        b.available_seats = 41;
        assert!(!b.seats_invariant_holds());
    }

    #[test]
    fn lowercase_bus_number_rejected() {
        let req = CreateBusRequest {
            bus_number: "ba-1234".to_string(),
            bus_name: "Test Bus".to_string(),
            bus_type: "AC".to_string(),
            total_seats: 40,
            amenities: Vec::new(),
            route_id: Uuid::new_v4(),
            price_per_seat: 500,
            status: None,
        };
        let errors = req.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "busNumber");
    }

    #[test]
    fn seat_count_bounds_enforced() {
        let mut req = CreateBusRequest {
            bus_number: "BA-1234".to_string(),
            bus_name: "Test Bus".to_string(),
            bus_type: "Sleeper".to_string(),
            total_seats: 9,
            amenities: Vec::new(),
            route_id: Uuid::new_v4(),
            price_per_seat: 500,
            status: None,
        };
        assert!(req.validate().iter().any(|e| e.field == "totalSeats"));
        req.total_seats = 61;
        assert!(req.validate().iter().any(|e| e.field == "totalSeats"));
        req.total_seats = 60;
        assert!(req.validate().is_empty());
    }
}
