use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FieldError;
use crate::validate;

// ============================================================================
// Rules & enums
// ============================================================================

/// Tunable booking policy, loaded from configuration. Defaults match the
/// published fare rules.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingRules {
    pub tax_rate: f64,
    pub refund_rate: f64,
    pub cancellation_cutoff_hours: i64,
    pub max_seats_per_booking: usize,
    pub advance_booking_days: i64,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            tax_rate: 0.05,
            refund_rate: 0.9,
            cancellation_cutoff_hours: 2,
            max_seats_per_booking: 6,
            advance_booking_days: 90,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" => Some(BookingStatus::Cancelled),
            "completed" => Some(BookingStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    DigitalWallet,
    BankTransfer,
    Upi,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::DigitalWallet => "digital_wallet",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Upi => "upi",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cash" => Some(PaymentMethod::Cash),
            "card" => Some(PaymentMethod::Card),
            "digital_wallet" => Some(PaymentMethod::DigitalWallet),
            "bank_transfer" => Some(PaymentMethod::BankTransfer),
            "upi" => Some(PaymentMethod::Upi),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "completed" => Some(PaymentStatus::Completed),
            "failed" => Some(PaymentStatus::Failed),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefundStatus {
    Pending,
    Processed,
    Rejected,
}

impl RefundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundStatus::Pending => "pending",
            RefundStatus::Processed => "processed",
            RefundStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RefundStatus::Pending),
            "processed" => Some(RefundStatus::Processed),
            "rejected" => Some(RefundStatus::Rejected),
            _ => None,
        }
    }
}

// ============================================================================
// Pricing
// ============================================================================

/// Fare breakdown in whole currency units. `total_amount` is always derived
/// from the other three, never trusted from input.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    pub base_price: i64,
    pub taxes: i64,
    pub discount: i64,
    pub total_amount: i64,
}

impl Pricing {
    /// Quote a fare for `seat_count` seats at `price_per_seat`.
    pub fn quote(price_per_seat: i64, seat_count: usize, rules: &BookingRules) -> Self {
        let base_price = price_per_seat * seat_count as i64;
        let taxes = (base_price as f64 * rules.tax_rate).round() as i64;
        Self {
            base_price,
            taxes,
            discount: 0,
            total_amount: base_price + taxes,
        }
    }

    /// Re-derive the total from the components.
    pub fn recompute_total(&mut self) {
        self.total_amount = self.base_price + self.taxes - self.discount;
    }
}

/// Amount credited back on a voluntary cancellation.
pub fn refund_amount(total_amount: i64, rules: &BookingRules) -> i64 {
    (total_amount as f64 * rules.refund_rate).round() as i64
}

// ============================================================================
// Cancellation window & seat conflicts
// ============================================================================

/// Departure is pinned to midnight UTC of the travel date, matching how
/// bookings store it.
pub fn departure_instant(travel_date: NaiveDate) -> DateTime<Utc> {
    travel_date.and_time(NaiveTime::MIN).and_utc()
}

/// A booking may be cancelled only while departure is more than the cutoff
/// away. Exactly at the cutoff counts as inside the window (rejected).
pub fn can_cancel(travel_date: NaiveDate, now: DateTime<Utc>, rules: &BookingRules) -> bool {
    departure_instant(travel_date) - now >= Duration::hours(rules.cancellation_cutoff_hours)
}

/// Requested seats that are already held by other live bookings for the
/// same bus and travel date.
pub fn seat_conflicts(requested: &[String], taken: &[String]) -> Vec<String> {
    requested
        .iter()
        .filter(|seat| taken.contains(seat))
        .cloned()
        .collect()
}

/// Human-facing booking code: "BB" + millisecond timestamp + short suffix.
pub fn generate_booking_ref(now: DateTime<Utc>) -> String {
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(5)
        .collect::<String>()
        .to_uppercase();
    format!("BB{}{}", now.timestamp_millis(), suffix)
}

// ============================================================================
// Records & requests
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassengerDetail {
    pub name: String,
    pub age: i32,
    pub gender: String,
    #[serde(default)]
    pub id_type: Option<String>,
    #[serde(default)]
    pub id_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactDetails {
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cancellation {
    pub cancelled_at: DateTime<Utc>,
    pub cancelled_by: Uuid,
    pub reason: String,
    pub refund_amount: i64,
    pub refund_status: RefundStatus,
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub processed_by: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub booking_ref: String,
    pub user_id: Uuid,
    pub bus_id: Uuid,
    pub route_id: Uuid,
    pub travel_date: NaiveDate,
    pub seat_numbers: Vec<String>,
    pub passenger_details: Vec<PassengerDetail>,
    pub contact_details: ContactDetails,
    pub pricing: Pricing,
    pub payment: PaymentInfo,
    pub status: BookingStatus,
    pub special_requests: Vec<String>,
    pub boarding_point: Option<String>,
    pub dropping_point: Option<String>,
    pub cancellation: Option<Cancellation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn total_passengers(&self) -> usize {
        self.seat_numbers.len()
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == BookingStatus::Cancelled
    }

    /// Completed journeys are frozen; nothing about them may change.
    pub fn is_mutable(&self) -> bool {
        self.status != BookingStatus::Completed
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub bus_id: Uuid,
    pub route_id: Uuid,
    pub travel_date: NaiveDate,
    pub seat_numbers: Vec<String>,
    pub passenger_details: Vec<PassengerDetail>,
    pub contact_details: ContactDetails,
    pub payment_method: String,
    #[serde(default)]
    pub special_requests: Vec<String>,
    #[serde(default)]
    pub boarding_point: Option<String>,
    #[serde(default)]
    pub dropping_point: Option<String>,
}

impl CreateBookingRequest {
    pub fn validate(&self, today: NaiveDate, rules: &BookingRules) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if self.travel_date < today {
            errors.push(FieldError::new("travelDate", "Travel date cannot be in the past"));
        } else if self.travel_date > today + Duration::days(rules.advance_booking_days) {
            errors.push(FieldError::new(
                "travelDate",
                format!("Cannot book more than {} days in advance", rules.advance_booking_days),
            ));
        }

        if self.seat_numbers.is_empty() || self.seat_numbers.len() > rules.max_seats_per_booking {
            errors.push(FieldError::new(
                "seatNumbers",
                format!("You can book between 1 and {} seats at a time", rules.max_seats_per_booking),
            ));
        }
        let mut seen = Vec::new();
        for seat in &self.seat_numbers {
            if seen.contains(&seat) {
                errors.push(FieldError::new("seatNumbers", "Duplicate seat numbers in request"));
                break;
            }
            seen.push(seat);
        }

        if self.passenger_details.len() != self.seat_numbers.len() {
            errors.push(FieldError::new(
                "passengerDetails",
                "Number of passenger details must match number of seats",
            ));
        }
        for (i, passenger) in self.passenger_details.iter().enumerate() {
            validate::length_between(
                &mut errors,
                &format!("passengerDetails[{}].name", i),
                &passenger.name,
                2,
                100,
                "Passenger name",
            );
            if !(1..=120).contains(&passenger.age) {
                errors.push(FieldError::new(
                    format!("passengerDetails[{}].age", i),
                    "Passenger age must be between 1 and 120",
                ));
            }
            if passenger.gender != "Male" && passenger.gender != "Female" {
                errors.push(FieldError::new(
                    format!("passengerDetails[{}].gender", i),
                    "Passenger gender must be Male or Female",
                ));
            }
        }

        if !validate::is_valid_phone(&self.contact_details.phone) {
            errors.push(FieldError::new("contactDetails.phone", "Please enter a valid phone number"));
        }
        if !validate::is_valid_email(&self.contact_details.email) {
            errors.push(FieldError::new("contactDetails.email", "Please enter a valid email"));
        }

        if PaymentMethod::parse(&self.payment_method).is_none() {
            errors.push(FieldError::new("paymentMethod", "Invalid payment method"));
        }

        for (i, request) in self.special_requests.iter().enumerate() {
            if request.chars().count() > 200 {
                errors.push(FieldError::new(
                    format!("specialRequests[{}]", i),
                    "Special request cannot exceed 200 characters",
                ));
            }
        }

        errors
    }
}

/// Post-booking edits are restricted to logistics fields; seats, dates,
/// and pricing are immutable after creation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingUpdate {
    pub contact_details: Option<ContactDetails>,
    pub special_requests: Option<Vec<String>>,
    pub boarding_point: Option<String>,
    pub dropping_point: Option<String>,
}

impl BookingUpdate {
    pub fn is_empty(&self) -> bool {
        self.contact_details.is_none()
            && self.special_requests.is_none()
            && self.boarding_point.is_none()
            && self.dropping_point.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelBookingRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> BookingRules {
        BookingRules::default()
    }

    #[test]
    fn two_seats_at_1200_quote() {
        let pricing = Pricing::quote(1200, 2, &rules());
        assert_eq!(pricing.base_price, 2400);
        assert_eq!(pricing.taxes, 120);
        assert_eq!(pricing.discount, 0);
        assert_eq!(pricing.total_amount, 2520);
    }

    #[test]
    fn total_is_rederived_from_components() {
        let mut pricing = Pricing {
            base_price: 2400,
            taxes: 120,
            discount: 100,
            total_amount: 999_999,
        };
        pricing.recompute_total();
        assert_eq!(pricing.total_amount, 2420);
    }

    #[test]
    fn tax_rounds_to_nearest_unit() {
        // 3 seats at 333 -> base 999, 5% = 49.95 -> 50
        let pricing = Pricing::quote(333, 3, &rules());
        assert_eq!(pricing.taxes, 50);
        assert_eq!(pricing.total_amount, 1049);
    }

    #[test]
    fn refund_is_ninety_percent_rounded() {
        assert_eq!(refund_amount(2520, &rules()), 2268);
        // 0.9 * 1049 = 944.1 -> 944
        assert_eq!(refund_amount(1049, &rules()), 944);
        // 0.9 * 1045 = 940.5 -> 941 (round half up)
        assert_eq!(refund_amount(1045, &rules()), 941);
    }

    #[test]
    fn cancellation_window_boundaries() {
        let travel = NaiveDate::from_ymd_opt(2024, 7, 10).unwrap();
        let departure = departure_instant(travel);

        // Three hours out: still cancellable.
        assert!(can_cancel(travel, departure - Duration::hours(3), &rules()));
        // Exactly two hours out: allowed (difference == cutoff).
        assert!(can_cancel(travel, departure - Duration::hours(2), &rules()));
        // 90 minutes out: too late.
        assert!(!can_cancel(travel, departure - Duration::minutes(90), &rules()));
        // After departure: definitely not.
        assert!(!can_cancel(travel, departure + Duration::hours(1), &rules()));
    }

    #[test]
    fn seat_conflicts_reported() {
        let requested = vec!["5".to_string(), "6".to_string()];
        let taken = vec!["5".to_string(), "12".to_string()];
        assert_eq!(seat_conflicts(&requested, &taken), vec!["5".to_string()]);
        assert!(seat_conflicts(&requested, &["1".to_string()]).is_empty());
    }

    #[test]
    fn booking_ref_shape() {
        let now = Utc::now();
        let r = generate_booking_ref(now);
        assert!(r.starts_with("BB"));
        assert!(r.len() > 15);
        assert_ne!(r, generate_booking_ref(now));
    }

    fn create_request(today: NaiveDate) -> CreateBookingRequest {
        CreateBookingRequest {
            bus_id: Uuid::new_v4(),
            route_id: Uuid::new_v4(),
            travel_date: today + Duration::days(7),
            seat_numbers: vec!["5".to_string(), "6".to_string()],
            passenger_details: vec![
                PassengerDetail {
                    name: "Hari Thapa".to_string(),
                    age: 35,
                    gender: "Male".to_string(),
                    id_type: None,
                    id_number: None,
                },
                PassengerDetail {
                    name: "Gita Thapa".to_string(),
                    age: 32,
                    gender: "Female".to_string(),
                    id_type: None,
                    id_number: None,
                },
            ],
            contact_details: ContactDetails {
                phone: "+9779812345678".to_string(),
                email: "hari@example.com".to_string(),
            },
            payment_method: "upi".to_string(),
            special_requests: Vec::new(),
            boarding_point: None,
            dropping_point: None,
        }
    }

    #[test]
    fn clean_booking_request_passes() {
        let today = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        assert!(create_request(today).validate(today, &rules()).is_empty());
    }

    #[test]
    fn past_travel_date_rejected() {
        let today = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let mut req = create_request(today);
        req.travel_date = today - Duration::days(1);
        let errors = req.validate(today, &rules());
        assert!(errors.iter().any(|e| e.field == "travelDate"));
    }

    #[test]
    fn ninety_day_advance_limit() {
        let today = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let mut req = create_request(today);
        req.travel_date = today + Duration::days(90);
        assert!(req.validate(today, &rules()).is_empty());
        req.travel_date = today + Duration::days(91);
        assert!(req.validate(today, &rules()).iter().any(|e| e.field == "travelDate"));
    }

    #[test]
    fn passenger_count_must_match_seats() {
        let today = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let mut req = create_request(today);
        req.passenger_details.pop();
        let errors = req.validate(today, &rules());
        assert!(errors.iter().any(|e| e.field == "passengerDetails"));
    }

    #[test]
    fn duplicate_seats_rejected() {
        let today = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let mut req = create_request(today);
        req.seat_numbers = vec!["5".to_string(), "5".to_string()];
        let errors = req.validate(today, &rules());
        assert!(errors.iter().any(|e| e.message.contains("Duplicate seat")));
    }

    #[test]
    fn seven_seats_rejected() {
        let today = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let mut req = create_request(today);
        req.seat_numbers = (1..=7).map(|n| n.to_string()).collect();
        req.passenger_details = (1..=7)
            .map(|n| PassengerDetail {
                name: format!("Passenger {}", n),
                age: 30,
                gender: "Male".to_string(),
                id_type: None,
                id_number: None,
            })
            .collect();
        let errors = req.validate(today, &rules());
        assert!(errors.iter().any(|e| e.field == "seatNumbers"));
    }
}
