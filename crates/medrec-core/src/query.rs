//! Stateless lookups and sorting over a collection snapshot.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::patient::Patient;

/// Fields a listing can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    Height,
    Weight,
    Bmi,
}

impl SortField {
    pub const ALL: [SortField; 3] = [Self::Height, Self::Weight, Self::Bmi];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Height => "height",
            Self::Weight => "weight",
            Self::Bmi => "bmi",
        }
    }

    /// Sort key for a patient; a value that is not a finite number counts as 0.
    pub fn key(&self, patient: &Patient) -> f64 {
        let value = match self {
            Self::Height => patient.attributes.height,
            Self::Weight => patient.attributes.weight,
            Self::Bmi => patient.bmi(),
        };
        if value.is_finite() { value } else { 0.0 }
    }
}

impl FromStr for SortField {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| CoreError::invalid_field(s))
    }
}

impl std::fmt::Display for SortField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ascending => "ascending",
            Self::Descending => "descending",
        }
    }
}

impl FromStr for SortOrder {
    type Err = CoreError;

    /// Accepts the long names, `asc`/`desc`, and the `acs` spelling older
    /// clients send.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ascending" | "asc" | "acs" => Ok(Self::Ascending),
            "descending" | "desc" => Ok(Self::Descending),
            other => Err(CoreError::invalid_direction(other)),
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable sort of a snapshot. Ties keep snapshot order in both directions.
pub fn sort_by<'a, I>(snapshot: I, field: SortField, order: SortOrder) -> Vec<Patient>
where
    I: IntoIterator<Item = &'a Patient>,
{
    let mut patients: Vec<Patient> = snapshot.into_iter().cloned().collect();
    patients.sort_by(|a, b| {
        let comparison = field.key(a).total_cmp(&field.key(b));
        match order {
            SortOrder::Ascending => comparison,
            SortOrder::Descending => comparison.reverse(),
        }
    });
    patients
}

pub fn find_by_id<'a, I>(snapshot: I, id: &str) -> Result<&'a Patient>
where
    I: IntoIterator<Item = &'a Patient>,
{
    snapshot
        .into_iter()
        .find(|patient| patient.id == id)
        .ok_or_else(|| CoreError::not_found(id))
}
