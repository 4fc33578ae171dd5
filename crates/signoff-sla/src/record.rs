use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SlaError;

/// Editable field of an SLA record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaField {
  Value,
  TechnicianName,
  TechnicianPhone,
}

impl SlaField {
  pub const ALL: [SlaField; 3] = [
    SlaField::Value,
    SlaField::TechnicianName,
    SlaField::TechnicianPhone,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      SlaField::Value => "value",
      SlaField::TechnicianName => "technician_name",
      SlaField::TechnicianPhone => "technician_phone",
    }
  }
}

impl fmt::Display for SlaField {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for SlaField {
  type Err = SlaError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.replace('-', "_").as_str() {
      "value" => Ok(SlaField::Value),
      "technician_name" => Ok(SlaField::TechnicianName),
      "technician_phone" => Ok(SlaField::TechnicianPhone),
      _ => Err(SlaError::UnknownField(s.to_string())),
    }
  }
}

/// Satisfaction rating shared by every SLA record of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
  pub const MIN: u8 = 1;
  pub const MAX: u8 = 5;

  pub fn new(value: u8) -> Result<Self, SlaError> {
    if (Self::MIN..=Self::MAX).contains(&value) {
      Ok(Self(value))
    } else {
      Err(SlaError::InvalidRating(value))
    }
  }

  pub fn get(self) -> u8 {
    self.0
  }
}

impl TryFrom<u8> for Rating {
  type Error = SlaError;

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Self::new(value)
  }
}

impl From<Rating> for u8 {
  fn from(rating: Rating) -> Self {
    rating.0
  }
}

impl fmt::Display for Rating {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// One SLA fulfillment record for a (request, vendor) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaRecord {
  pub sla_id: String,
  /// From vendor master data; never edited here.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub agreed_value: Option<String>,
  #[serde(default)]
  pub value: String,
  #[serde(default)]
  pub technician_name: String,
  #[serde(default)]
  pub technician_phone: String,
}

impl SlaRecord {
  pub fn new(sla_id: impl Into<String>, agreed_value: Option<String>) -> Self {
    Self {
      sla_id: sla_id.into(),
      agreed_value,
      ..Self::default()
    }
  }

  /// Complete iff every editable field is non-blank.
  pub fn is_complete(&self) -> bool {
    SlaField::ALL
      .iter()
      .all(|field| !self.get(*field).trim().is_empty())
  }

  pub fn get(&self, field: SlaField) -> &str {
    match field {
      SlaField::Value => &self.value,
      SlaField::TechnicianName => &self.technician_name,
      SlaField::TechnicianPhone => &self.technician_phone,
    }
  }

  /// Set a field, returning whether its content changed.
  pub fn set(&mut self, field: SlaField, value: &str) -> bool {
    let slot = match field {
      SlaField::Value => &mut self.value,
      SlaField::TechnicianName => &mut self.technician_name,
      SlaField::TechnicianPhone => &mut self.technician_phone,
    };
    if slot == value {
      return false;
    }
    *slot = value.to_string();
    true
  }

  /// Whether the editable fields match `other`.
  pub fn same_fields(&self, other: &SlaRecord) -> bool {
    SlaField::ALL
      .iter()
      .all(|field| self.get(*field) == other.get(*field))
  }
}
