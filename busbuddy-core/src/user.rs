use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FieldError;
use crate::validate;

pub const MIN_AGE_YEARS: i32 = 16;
pub const MAX_AGE_YEARS: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Passenger,
    Admin,
    Operator,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Passenger => "passenger",
            UserType::Admin => "admin",
            UserType::Operator => "operator",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "passenger" => Some(UserType::Passenger),
            "admin" => Some(UserType::Admin),
            "operator" => Some(UserType::Operator),
            _ => None,
        }
    }

    /// Admins and operators share the management surface.
    pub fn is_staff(&self) -> bool {
        matches!(self, UserType::Admin | UserType::Operator)
    }
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Male" => Some(Gender::Male),
            "Female" => Some(Gender::Female),
            "Other" => Some(Gender::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip_code: String,
    #[serde(default)]
    pub country: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub user_type: UserType,
    pub is_active: bool,
    pub is_verified: bool,
    pub address: Address,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Age in completed years on `today`, adjusting for whether the
    /// birthday has passed yet this year. A user turning 16 today is 16.
    pub fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> i32 {
        let mut age = today.year() - date_of_birth.year();
        if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
            age -= 1;
        }
        age
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub confirm_password: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub agree_to_terms: bool,
}

impl RegisterRequest {
    /// All registration checks at once; empty vec means the request is clean.
    pub fn validate(&self, today: NaiveDate) -> Vec<FieldError> {
        let mut errors = Vec::new();

        validate::length_between(&mut errors, "firstName", &self.first_name, 2, 50, "First name");
        validate::letters_and_spaces(&mut errors, "firstName", &self.first_name, "First name");
        validate::length_between(&mut errors, "lastName", &self.last_name, 2, 50, "Last name");
        validate::letters_and_spaces(&mut errors, "lastName", &self.last_name, "Last name");

        if !validate::is_valid_email(&self.email) {
            errors.push(FieldError::new("email", "Please provide a valid email address"));
        }
        if !validate::is_valid_phone(&self.phone) {
            errors.push(FieldError::new("phone", "Please provide a valid phone number"));
        }

        validate::check_password(&mut errors, "password", &self.password);
        if self.password != self.confirm_password {
            errors.push(FieldError::new("confirmPassword", "Passwords do not match"));
        }

        let age = User::age_on(self.date_of_birth, today);
        if age < MIN_AGE_YEARS {
            errors.push(FieldError::new(
                "dateOfBirth",
                format!("You must be at least {} years old to register", MIN_AGE_YEARS),
            ));
        } else if age > MAX_AGE_YEARS {
            errors.push(FieldError::new(
                "dateOfBirth",
                format!("Age must be between {} and {} years", MIN_AGE_YEARS, MAX_AGE_YEARS),
            ));
        }

        if Gender::parse(&self.gender).is_none() {
            errors.push(FieldError::new("gender", "Gender must be Male, Female, or Other"));
        }

        if !self.agree_to_terms {
            errors.push(FieldError::new(
                "agreeToTerms",
                "You must agree to the terms and conditions",
            ));
        }

        errors
    }

    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

/// Profile edits; anything absent stays untouched. Email and password
/// changes go through dedicated flows, never this one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub address: Option<Address>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if let Some(first) = &self.first_name {
            validate::length_between(&mut errors, "firstName", first, 2, 50, "First name");
        }
        if let Some(last) = &self.last_name {
            validate::length_between(&mut errors, "lastName", last, 2, 50, "Last name");
        }
        if let Some(phone) = &self.phone {
            if !validate::is_valid_phone(phone) {
                errors.push(FieldError::new("phone", "Please provide a valid phone number"));
            }
        }
        if let Some(gender) = &self.gender {
            if Gender::parse(gender).is_none() {
                errors.push(FieldError::new("gender", "Gender must be Male, Female, or Other"));
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RegisterRequest {
        RegisterRequest {
            first_name: "Sita".to_string(),
            last_name: "Sharma".to_string(),
            email: "sita@example.com".to_string(),
            phone: "+9779812345678".to_string(),
            password: "Secret1pass".to_string(),
            confirm_password: "Secret1pass".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1995, 6, 15).unwrap(),
            gender: "Female".to_string(),
            address: None,
            agree_to_terms: true,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[test]
    fn clean_registration_passes() {
        assert!(request().validate(today()).is_empty());
    }

    #[test]
    fn fifteen_year_old_rejected() {
        let mut req = request();
        req.date_of_birth = NaiveDate::from_ymd_opt(2009, 6, 16).unwrap();
        let errors = req.validate(today());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "dateOfBirth");
        assert!(errors[0].message.contains("at least 16 years old"));
    }

    #[test]
    fn sixteenth_birthday_today_accepted() {
        let mut req = request();
        req.date_of_birth = NaiveDate::from_ymd_opt(2008, 6, 15).unwrap();
        assert!(req.validate(today()).is_empty());
    }

    #[test]
    fn mismatched_passwords_flagged() {
        let mut req = request();
        req.confirm_password = "Different1".to_string();
        let errors = req.validate(today());
        assert!(errors.iter().any(|e| e.field == "confirmPassword"));
    }

    #[test]
    fn terms_must_be_agreed() {
        let mut req = request();
        req.agree_to_terms = false;
        let errors = req.validate(today());
        assert!(errors.iter().any(|e| e.field == "agreeToTerms"));
    }

    #[test]
    fn age_is_calendar_exact() {
        let dob = NaiveDate::from_ymd_opt(2008, 6, 16).unwrap();
        // Day before the birthday: still 15.
        assert_eq!(User::age_on(dob, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()), 15);
        // On the birthday: 16.
        assert_eq!(User::age_on(dob, NaiveDate::from_ymd_opt(2024, 6, 16).unwrap()), 16);
    }
}
