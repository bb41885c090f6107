//! Postal address domain types.
//!
//! Caller input ([`NewAddress`] or [`AddressUpdate`]) only becomes an
//! [`Address`] through [`AddressRules`], which trims text, fills the
//! default country and checks the postal code. Addresses read back from
//! storage or deserialized are taken as stored and are not revalidated.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::AddressId;
use crate::config::AddressSettings;

/// Postal code format used when no pattern is configured (six-digit PIN).
pub const DEFAULT_POSTAL_CODE_PATTERN: &str = r"^[0-9]{6}$";

/// Country filled in when the caller leaves it out.
pub const DEFAULT_COUNTRY: &str = "India";

/// Errors raised while validating address input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("invalid postal code: {0:?}")]
    InvalidPostalCode(String),

    #[error("invalid address label: {0:?}")]
    InvalidLabel(String),

    #[error("invalid postal code pattern: {0}")]
    InvalidPattern(String),

    #[error("invalid email address: {0:?}")]
    InvalidEmail(String),
}

/// Tag describing what an address is used for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressLabel {
    #[default]
    Home,
    Work,
    Billing,
    Shipping,
    Other,
}

impl AddressLabel {
    /// Returns the wire name of this label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Work => "work",
            Self::Billing => "billing",
            Self::Shipping => "shipping",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for AddressLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AddressLabel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "home" => Ok(Self::Home),
            "work" => Ok(Self::Work),
            "billing" => Ok(Self::Billing),
            "shipping" => Ok(Self::Shipping),
            "other" => Ok(Self::Other),
            other => Err(ValidationError::InvalidLabel(other.to_string())),
        }
    }
}

/// A postal address held in an address book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Identifier, unique within the owning book.
    pub id: AddressId,
    /// What the address is used for.
    pub label: AddressLabel,
    pub street: String,
    pub apartment: Option<String>,
    pub city: String,
    pub state: String,
    /// Postal code; input is checked against the configured pattern.
    pub zip: String,
    pub country: String,
    pub landmark: Option<String>,
    /// Whether this is the account's default address.
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw input for a new address, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewAddress {
    /// Label name; `home` when absent.
    pub label: Option<String>,
    pub street: String,
    pub apartment: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
    /// Country; the configured default when absent or blank.
    pub country: Option<String>,
    pub landmark: Option<String>,
    /// Requests that the new address become the default.
    pub is_default: bool,
}

impl NewAddress {
    /// Creates input with the required fields set.
    pub fn new(
        street: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        zip: impl Into<String>,
    ) -> Self {
        Self {
            street: street.into(),
            city: city.into(),
            state: state.into(),
            zip: zip.into(),
            ..Self::default()
        }
    }

    /// Sets the label name.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the apartment or unit.
    pub fn apartment(mut self, apartment: impl Into<String>) -> Self {
        self.apartment = Some(apartment.into());
        self
    }

    /// Sets the country.
    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// Sets a nearby landmark.
    pub fn landmark(mut self, landmark: impl Into<String>) -> Self {
        self.landmark = Some(landmark.into());
        self
    }

    /// Requests that the address become the default.
    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }
}

/// Partial changes to an existing address.
///
/// `None` leaves a field untouched. The optional text fields use a nested
/// option so they can be cleared: `Some(None)` removes the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressUpdate {
    pub label: Option<String>,
    pub street: Option<String>,
    pub apartment: Option<Option<String>>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
    pub landmark: Option<Option<String>>,
    /// Requested default flag; see `AddressBook::update` for how it is applied.
    pub is_default: Option<bool>,
}

impl AddressUpdate {
    /// Creates an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the label name.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the street.
    pub fn street(mut self, street: impl Into<String>) -> Self {
        self.street = Some(street.into());
        self
    }

    /// Sets the apartment.
    pub fn apartment(mut self, apartment: impl Into<String>) -> Self {
        self.apartment = Some(Some(apartment.into()));
        self
    }

    /// Removes the apartment.
    pub fn clear_apartment(mut self) -> Self {
        self.apartment = Some(None);
        self
    }

    /// Sets the city.
    pub fn city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    /// Sets the state.
    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Sets the postal code.
    pub fn zip(mut self, zip: impl Into<String>) -> Self {
        self.zip = Some(zip.into());
        self
    }

    /// Sets the country.
    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// Sets the landmark.
    pub fn landmark(mut self, landmark: impl Into<String>) -> Self {
        self.landmark = Some(Some(landmark.into()));
        self
    }

    /// Removes the landmark.
    pub fn clear_landmark(mut self) -> Self {
        self.landmark = Some(None);
        self
    }

    /// Sets the requested default flag.
    pub fn default_flag(mut self, is_default: bool) -> Self {
        self.is_default = Some(is_default);
        self
    }

    /// Returns true if this update has no changes.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Validation rules for address input.
#[derive(Debug, Clone)]
pub struct AddressRules {
    postal_code: Regex,
    default_country: String,
}

impl Default for AddressRules {
    fn default() -> Self {
        Self {
            postal_code: Regex::new(DEFAULT_POSTAL_CODE_PATTERN)
                .expect("default postal code pattern is valid"),
            default_country: DEFAULT_COUNTRY.to_string(),
        }
    }
}

impl AddressRules {
    /// Compiles rules from a postal code pattern and a default country.
    pub fn new(
        postal_code_pattern: &str,
        default_country: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let postal_code = Regex::new(postal_code_pattern)
            .map_err(|e| ValidationError::InvalidPattern(e.to_string()))?;
        let default_country = default_country.into().trim().to_string();
        if default_country.is_empty() {
            return Err(ValidationError::MissingField("country"));
        }

        Ok(Self {
            postal_code,
            default_country,
        })
    }

    /// Compiles rules from the address section of the settings.
    pub fn from_settings(settings: &AddressSettings) -> Result<Self, ValidationError> {
        Self::new(&settings.postal_code_pattern, settings.default_country.as_str())
    }

    /// Returns the country used when input leaves it out.
    pub fn default_country(&self) -> &str {
        &self.default_country
    }

    /// Validates new input and produces an address with a fresh id.
    ///
    /// The default flag is copied from the input as requested; the owning
    /// book decides the final value.
    pub fn build(&self, input: NewAddress, at: DateTime<Utc>) -> Result<Address, ValidationError> {
        let label = match input.label.as_deref().map(str::trim) {
            None | Some("") => AddressLabel::default(),
            Some(name) => name.parse()?,
        };
        let country = optional(input.country).unwrap_or_else(|| self.default_country.clone());

        let address = Address {
            id: AddressId::generate(),
            label,
            street: required("street", &input.street)?,
            apartment: optional(input.apartment),
            city: required("city", &input.city)?,
            state: required("state", &input.state)?,
            zip: required("zip", &input.zip)?,
            country,
            landmark: optional(input.landmark),
            is_default: input.is_default,
            created_at: at,
            updated_at: at,
        };

        self.check_postal_code(&address.zip)?;
        Ok(address)
    }

    /// Merges an update into a copy of `current` and validates the result.
    ///
    /// The id, creation time and default flag are carried over unchanged.
    pub fn apply(
        &self,
        current: &Address,
        update: &AddressUpdate,
        at: DateTime<Utc>,
    ) -> Result<Address, ValidationError> {
        let mut next = current.clone();

        if let Some(label) = &update.label {
            next.label = label.parse()?;
        }
        if let Some(street) = &update.street {
            next.street = required("street", street)?;
        }
        if let Some(apartment) = &update.apartment {
            next.apartment = optional(apartment.clone());
        }
        if let Some(city) = &update.city {
            next.city = required("city", city)?;
        }
        if let Some(state) = &update.state {
            next.state = required("state", state)?;
        }
        if let Some(zip) = &update.zip {
            next.zip = required("zip", zip)?;
            self.check_postal_code(&next.zip)?;
        }
        if let Some(country) = &update.country {
            next.country = required("country", country)?;
        }
        if let Some(landmark) = &update.landmark {
            next.landmark = optional(landmark.clone());
        }

        next.updated_at = at;
        Ok(next)
    }

    fn check_postal_code(&self, zip: &str) -> Result<(), ValidationError> {
        if self.postal_code.is_match(zip) {
            Ok(())
        } else {
            Err(ValidationError::InvalidPostalCode(zip.to_string()))
        }
    }
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(value.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn input() -> NewAddress {
        NewAddress::new("1 Main", "Bengaluru", "Karnataka", "560001")
    }

    #[test]
    fn build_applies_defaults() {
        let rules = AddressRules::default();
        let address = rules.build(input(), Utc::now()).unwrap();

        assert_eq!(address.label, AddressLabel::Home);
        assert_eq!(address.country, "India");
        assert!(address.apartment.is_none());
        assert!(!address.is_default);
        assert_eq!(address.created_at, address.updated_at);
    }

    #[test]
    fn build_trims_fields() {
        let rules = AddressRules::default();
        let address = rules
            .build(
                NewAddress::new("  1 Main  ", " Bengaluru", "Karnataka ", " 560001 ")
                    .apartment("   ")
                    .landmark(" Near the park ")
                    .country(" IN "),
                Utc::now(),
            )
            .unwrap();

        assert_eq!(address.street, "1 Main");
        assert_eq!(address.city, "Bengaluru");
        assert_eq!(address.zip, "560001");
        assert_eq!(address.country, "IN");
        assert_eq!(address.apartment, None);
        assert_eq!(address.landmark, Some("Near the park".to_string()));
    }

    #[test]
    fn build_rejects_missing_required_field() {
        let rules = AddressRules::default();
        let mut missing_city = input();
        missing_city.city = "   ".to_string();

        let err = rules.build(missing_city, Utc::now()).unwrap_err();
        assert_eq!(err, ValidationError::MissingField("city"));
    }

    #[test]
    fn build_rejects_bad_postal_code() {
        let rules = AddressRules::default();
        for zip in ["56001", "5600011", "56O001", "560 01"] {
            let mut bad = input();
            bad.zip = zip.to_string();
            assert!(matches!(
                rules.build(bad, Utc::now()),
                Err(ValidationError::InvalidPostalCode(_))
            ));
        }
    }

    #[test]
    fn build_rejects_unknown_label() {
        let rules = AddressRules::default();
        let err = rules.build(input().label("vacation"), Utc::now()).unwrap_err();
        assert_eq!(err, ValidationError::InvalidLabel("vacation".to_string()));
    }

    #[test]
    fn build_issues_distinct_ids() {
        let rules = AddressRules::default();
        let a = rules.build(input(), Utc::now()).unwrap();
        let b = rules.build(input(), Utc::now()).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn custom_pattern_and_country() {
        let rules = AddressRules::new(r"^[0-9]{5}$", "USA").unwrap();
        let address = rules
            .build(NewAddress::new("1 Main", "Austin", "TX", "73301"), Utc::now())
            .unwrap();
        assert_eq!(address.country, "USA");
        assert_eq!(rules.default_country(), "USA");

        assert!(rules.build(input(), Utc::now()).is_err());
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        assert!(matches!(
            AddressRules::new("([0-9]", "India"),
            Err(ValidationError::InvalidPattern(_))
        ));
    }

    #[test]
    fn apply_merges_and_clears() {
        let rules = AddressRules::default();
        let created = Utc::now();
        let current = rules
            .build(input().apartment("Flat 4").landmark("Temple"), created)
            .unwrap();

        let later = created + chrono::Duration::seconds(5);
        let update = AddressUpdate::new()
            .label("work")
            .city("Mysuru")
            .clear_apartment()
            .zip("570001");
        let next = rules.apply(&current, &update, later).unwrap();

        assert_eq!(next.id, current.id);
        assert_eq!(next.label, AddressLabel::Work);
        assert_eq!(next.city, "Mysuru");
        assert_eq!(next.street, "1 Main");
        assert_eq!(next.apartment, None);
        assert_eq!(next.landmark, Some("Temple".to_string()));
        assert_eq!(next.created_at, created);
        assert_eq!(next.updated_at, later);
    }

    #[test]
    fn apply_validates_merged_fields() {
        let rules = AddressRules::default();
        let current = rules.build(input(), Utc::now()).unwrap();

        assert!(matches!(
            rules.apply(&current, &AddressUpdate::new().zip("abc"), Utc::now()),
            Err(ValidationError::InvalidPostalCode(_))
        ));
        assert_eq!(
            rules.apply(&current, &AddressUpdate::new().country(" "), Utc::now()),
            Err(ValidationError::MissingField("country"))
        );
        assert!(matches!(
            rules.apply(&current, &AddressUpdate::new().label("HOME!"), Utc::now()),
            Err(ValidationError::InvalidLabel(_))
        ));
    }

    #[test]
    fn apply_leaves_default_flag_alone() {
        let rules = AddressRules::default();
        let mut current = rules.build(input(), Utc::now()).unwrap();
        current.is_default = true;

        let next = rules
            .apply(&current, &AddressUpdate::new().default_flag(false), Utc::now())
            .unwrap();
        assert!(next.is_default);
    }

    #[test]
    fn label_round_trips_through_str() {
        for label in [
            AddressLabel::Home,
            AddressLabel::Work,
            AddressLabel::Billing,
            AddressLabel::Shipping,
            AddressLabel::Other,
        ] {
            assert_eq!(label.as_str().parse::<AddressLabel>().unwrap(), label);
        }
        assert_eq!(serde_json::to_string(&AddressLabel::Billing).unwrap(), "\"billing\"");
    }

    #[test]
    fn update_is_empty() {
        assert!(AddressUpdate::new().is_empty());
        assert!(!AddressUpdate::new().default_flag(true).is_empty());
    }

    #[test]
    fn new_address_deserializes_with_defaults() {
        let json = r#"{"street":"1 Main","city":"X","state":"Y","zip":"560001"}"#;
        let input: NewAddress = serde_json::from_str(json).unwrap();
        assert!(input.label.is_none());
        assert!(input.country.is_none());
        assert!(!input.is_default);
    }
}
