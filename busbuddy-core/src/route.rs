use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FieldError;
use crate::validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteStatus {
    Active,
    Inactive,
    Suspended,
}

impl RouteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteStatus::Active => "active",
            RouteStatus::Inactive => "inactive",
            RouteStatus::Suspended => "suspended",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(RouteStatus::Active),
            "inactive" => Some(RouteStatus::Inactive),
            "suspended" => Some(RouteStatus::Suspended),
            _ => None,
        }
    }
}

/// Intermediate halt along a route. Times are wall-clock `HH:MM`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    pub name: String,
    #[serde(default)]
    pub arrival_time: Option<String>,
    #[serde(default)]
    pub departure_time: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: Uuid,
    pub route_name: String,
    pub origin: String,
    pub destination: String,
    pub distance_km: f64,
    pub estimated_duration_minutes: i32,
    pub stops: Vec<Stop>,
    pub base_price: i64,
    pub status: RouteStatus,
    pub popularity_score: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Route {
    pub fn formatted_name(&self) -> String {
        format!("{} → {}", self.origin, self.destination)
    }

    pub fn formatted_duration(&self) -> String {
        let hours = self.estimated_duration_minutes / 60;
        let minutes = self.estimated_duration_minutes % 60;
        if hours > 0 {
            format!("{}h {}m", hours, minutes)
        } else {
            format!("{}m", minutes)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRouteRequest {
    #[serde(default)]
    pub route_name: Option<String>,
    pub origin: String,
    pub destination: String,
    pub distance_km: f64,
    pub estimated_duration_minutes: i32,
    #[serde(default)]
    pub stops: Vec<Stop>,
    pub base_price: i64,
    #[serde(default)]
    pub status: Option<String>,
}

impl CreateRouteRequest {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        validate::length_between(&mut errors, "origin", &self.origin, 2, 50, "Origin");
        validate::length_between(&mut errors, "destination", &self.destination, 2, 50, "Destination");
        if let Some(name) = &self.route_name {
            validate::length_between(&mut errors, "routeName", name, 5, 100, "Route name");
        }
        if self.distance_km < 1.0 {
            errors.push(FieldError::new("distanceKm", "Distance must be at least 1 km"));
        }
        if self.estimated_duration_minutes < 30 {
            errors.push(FieldError::new(
                "estimatedDurationMinutes",
                "Estimated duration must be at least 30 minutes",
            ));
        }
        if self.base_price < 0 {
            errors.push(FieldError::new("basePrice", "Price cannot be negative"));
        }
        if let Some(status) = &self.status {
            if RouteStatus::parse(status).is_none() {
                errors.push(FieldError::new("status", "Invalid route status"));
            }
        }
        for (i, stop) in self.stops.iter().enumerate() {
            if stop.name.trim().is_empty() {
                errors.push(FieldError::new(format!("stops[{}].name", i), "Stop name is required"));
            }
            for (key, time) in [
                ("arrivalTime", &stop.arrival_time),
                ("departureTime", &stop.departure_time),
            ] {
                if let Some(t) = time {
                    if !validate::is_hh_mm(t) {
                        errors.push(FieldError::new(
                            format!("stops[{}].{}", i, key),
                            "Please provide time in HH:MM format",
                        ));
                    }
                }
            }
        }

        errors
    }

    /// "Kathmandu to Pokhara" when no explicit name was supplied.
    pub fn resolved_name(&self) -> String {
        match &self.route_name {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => format!("{} to {}", self.origin.trim(), self.destination.trim()),
        }
    }
}

/// Admin route edits; absent fields stay untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteUpdate {
    pub route_name: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub distance_km: Option<f64>,
    pub estimated_duration_minutes: Option<i32>,
    pub stops: Option<Vec<Stop>>,
    pub base_price: Option<i64>,
    pub status: Option<String>,
    pub popularity_score: Option<i32>,
}

impl RouteUpdate {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if let Some(name) = &self.route_name {
            validate::length_between(&mut errors, "routeName", name, 5, 100, "Route name");
        }
        if let Some(origin) = &self.origin {
            validate::length_between(&mut errors, "origin", origin, 2, 50, "Origin");
        }
        if let Some(destination) = &self.destination {
            validate::length_between(&mut errors, "destination", destination, 2, 50, "Destination");
        }
        if matches!(self.distance_km, Some(d) if d < 1.0) {
            errors.push(FieldError::new("distanceKm", "Distance must be at least 1 km"));
        }
        if matches!(self.estimated_duration_minutes, Some(d) if d < 30) {
            errors.push(FieldError::new(
                "estimatedDurationMinutes",
                "Estimated duration must be at least 30 minutes",
            ));
        }
        if matches!(self.base_price, Some(p) if p < 0) {
            errors.push(FieldError::new("basePrice", "Price cannot be negative"));
        }
        if let Some(status) = &self.status {
            if RouteStatus::parse(status).is_none() {
                errors.push(FieldError::new("status", "Invalid route status"));
            }
        }
        if matches!(self.popularity_score, Some(s) if !(0..=100).contains(&s)) {
            errors.push(FieldError::new("popularityScore", "Popularity score must be between 0 and 100"));
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route() -> Route {
        Route {
            id: Uuid::new_v4(),
            route_name: "Kathmandu to Pokhara".to_string(),
            origin: "Kathmandu".to_string(),
            destination: "Pokhara".to_string(),
            distance_km: 200.0,
            estimated_duration_minutes: 390,
            stops: Vec::new(),
            base_price: 1000,
            status: RouteStatus::Active,
            popularity_score: 80,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn formatted_fields() {
        let r = route();
        assert_eq!(r.formatted_name(), "Kathmandu → Pokhara");
        assert_eq!(r.formatted_duration(), "6h 30m");
    }

    #[test]
    fn short_duration_has_no_hours() {
        let mut r = route();
        r.estimated_duration_minutes = 45;
        assert_eq!(r.formatted_duration(), "45m");
    }

    #[test]
    fn name_defaults_from_endpoints() {
        let req = CreateRouteRequest {
            route_name: None,
            origin: "Kathmandu".to_string(),
            destination: "Pokhara".to_string(),
            distance_km: 200.0,
            estimated_duration_minutes: 390,
            stops: Vec::new(),
            base_price: 1000,
            status: None,
        };
        assert!(req.validate().is_empty());
        assert_eq!(req.resolved_name(), "Kathmandu to Pokhara");
    }

    #[test]
    fn bad_stop_time_rejected() {
        let req = CreateRouteRequest {
            route_name: None,
            origin: "Kathmandu".to_string(),
            destination: "Pokhara".to_string(),
            distance_km: 200.0,
            estimated_duration_minutes: 390,
            stops: vec![Stop {
                name: "Mugling".to_string(),
                arrival_time: Some("25:00".to_string()),
                departure_time: None,
            }],
            base_price: 1000,
            status: None,
        };
        let errors = req.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].field.contains("arrivalTime"));
    }
}
