//! Data models for Catch of the Day
//!
//! Defines the fish record, its key, the store identifier and the
//! field names used by edit forms. Field names match the remote tree
//! format so records round-trip through the realtime backend unchanged.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Whether a fish can currently be ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FishStatus {
    /// Fresh and on the menu
    #[default]
    Available,
    /// Sold out
    Unavailable,
}

impl FishStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FishStatus::Available => "available",
            FishStatus::Unavailable => "unavailable",
        }
    }

    /// Label shown to customers
    pub fn label(&self) -> &'static str {
        match self {
            FishStatus::Available => "Fresh!",
            FishStatus::Unavailable => "Sold out!",
        }
    }

    /// The other status (used by the toggle in edit forms)
    pub fn toggled(self) -> Self {
        match self {
            FishStatus::Available => FishStatus::Unavailable,
            FishStatus::Unavailable => FishStatus::Available,
        }
    }
}

impl fmt::Display for FishStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FishStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "available" | "fresh" | "fresh!" => Ok(FishStatus::Available),
            "unavailable" | "sold out" | "sold out!" | "soldout" => Ok(FishStatus::Unavailable),
            _ => Err(ValidationError::InvalidStatus {
                value: s.to_string(),
            }),
        }
    }
}

/// Key of a fish within a store's inventory
///
/// Generated keys look like `fish1718035200123` (prefix plus unix millis),
/// which keeps them sortable by creation time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FishKey(String);

/// Prefix for generated fish keys
pub const FISH_KEY_PREFIX: &str = "fish";

impl FishKey {
    /// Wrap an existing key (as read from the remote tree or the CLI)
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Build the key for a given timestamp in milliseconds
    pub fn from_millis(millis: i64) -> Self {
        Self(format!("{}{}", FISH_KEY_PREFIX, millis))
    }

    /// Generate a time-based key that `taken` reports as unused
    ///
    /// Two fish added within the same millisecond would collide, so the
    /// timestamp is bumped until the key is free.
    pub fn generate(taken: impl Fn(&FishKey) -> bool) -> Self {
        let mut millis = chrono::Utc::now().timestamp_millis();
        loop {
            let key = Self::from_millis(millis);
            if !taken(&key) {
                return key;
            }
            millis += 1;
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FishKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FishKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A fish on the menu
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fish {
    /// Display name
    pub name: String,
    /// Price per pound
    pub price: f64,
    /// Availability
    #[serde(default)]
    pub status: FishStatus,
    /// Description
    #[serde(default)]
    pub desc: String,
    /// Image URL
    #[serde(default)]
    pub image: String,
}

impl Fish {
    /// Create an available fish with no description or image
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            price,
            status: FishStatus::Available,
            desc: String::new(),
            image: String::new(),
        }
    }

    /// Builder-style status setter
    pub fn with_status(mut self, status: FishStatus) -> Self {
        self.status = status;
        self
    }

    /// Builder-style description setter
    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = desc.into();
        self
    }

    /// Builder-style image setter
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn is_available(&self) -> bool {
        self.status == FishStatus::Available
    }

    /// Build a fish from raw form input
    ///
    /// The price is coerced to a number and the status parsed; everything
    /// else is taken as typed.
    pub fn from_form(form: &FishForm) -> Result<Self, ValidationError> {
        Ok(Self {
            name: form.name.trim().to_string(),
            price: parse_price(&form.price)?,
            status: form.status.parse()?,
            desc: form.desc.clone(),
            image: form.image.trim().to_string(),
        })
    }

    /// Return a copy with one field overwritten from raw text
    pub fn with_field(&self, field: FishField, raw: &str) -> Result<Self, ValidationError> {
        let mut fish = self.clone();
        match field {
            FishField::Name => fish.name = raw.to_string(),
            FishField::Price => fish.price = parse_price(raw)?,
            FishField::Status => fish.status = raw.parse()?,
            FishField::Desc => fish.desc = raw.to_string(),
            FishField::Image => fish.image = raw.trim().to_string(),
        }
        Ok(fish)
    }

    /// Current value of a field as text (for pre-filling edit inputs)
    pub fn field_text(&self, field: FishField) -> String {
        match field {
            FishField::Name => self.name.clone(),
            FishField::Price => self.price.to_string(),
            FishField::Status => self.status.to_string(),
            FishField::Desc => self.desc.clone(),
            FishField::Image => self.image.clone(),
        }
    }
}

/// Raw, unvalidated input from an add-fish form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FishForm {
    pub name: String,
    pub price: String,
    pub status: String,
    pub desc: String,
    pub image: String,
}

/// Editable fields of a fish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FishField {
    Name,
    Price,
    Status,
    Desc,
    Image,
}

impl FishField {
    /// Fields in form order
    pub const ALL: [FishField; 5] = [
        FishField::Name,
        FishField::Price,
        FishField::Status,
        FishField::Desc,
        FishField::Image,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FishField::Name => "name",
            FishField::Price => "price",
            FishField::Status => "status",
            FishField::Desc => "desc",
            FishField::Image => "image",
        }
    }
}

impl FromStr for FishField {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(FishField::Name),
            "price" => Ok(FishField::Price),
            "status" => Ok(FishField::Status),
            "desc" | "description" => Ok(FishField::Desc),
            "image" | "img" => Ok(FishField::Image),
            _ => Err(ValidationError::UnknownField {
                name: s.to_string(),
            }),
        }
    }
}

/// Coerce price text to a number
///
/// Accepts an optional leading `$`. Anything that is not a finite number
/// is rejected.
pub fn parse_price(raw: &str) -> Result<f64, ValidationError> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix('$').unwrap_or(trimmed).trim();
    match digits.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ValidationError::InvalidPrice {
            value: raw.to_string(),
        }),
    }
}

/// Identifier of a store
///
/// Scopes both the remote inventory path and the local order key, so it
/// must be usable as a single path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StoreId(String);

const FORBIDDEN_STORE_CHARS: [char; 6] = ['/', '.', '#', '$', '[', ']'];

impl StoreId {
    /// Validate and wrap a store name
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(ValidationError::InvalidStoreId {
                value: raw.to_string(),
                reason: "must not be empty",
            });
        }
        if value.chars().any(|c| FORBIDDEN_STORE_CHARS.contains(&c)) {
            return Err(ValidationError::InvalidStoreId {
                value: raw.to_string(),
                reason: "must not contain '/', '.', '#', '$', '[' or ']'",
            });
        }
        if value.chars().any(char::is_control) {
            return Err(ValidationError::InvalidStoreId {
                value: raw.to_string(),
                reason: "must not contain control characters",
            });
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for StoreId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for StoreId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StoreId> for String {
    fn from(id: StoreId) -> Self {
        id.0
    }
}
