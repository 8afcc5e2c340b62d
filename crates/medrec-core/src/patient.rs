//! Patient record, its validation and the derived BMI / verdict values.
//!
//! Only the stored attributes live in [`PatientAttributes`]. BMI and verdict
//! are methods, so they can never drift from the height and weight they are
//! computed from, and any `bmi`/`verdict` keys in an input body are ignored.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

pub const MIN_AGE: u8 = 1;
pub const MAX_AGE: u8 = 99;

/// BMI at or above which a patient is no longer underweight.
pub const UNDERWEIGHT_BELOW: f64 = 18.5;
/// BMI at or above which a patient is obese.
pub const OBESE_FROM: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Other => "other",
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown gender '{other}'")),
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weight classification derived from BMI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Verdict {
    #[serde(rename = "underweight")]
    Underweight,
    #[serde(rename = "Normal")]
    Normal,
    #[serde(rename = "Obese")]
    Obese,
}

impl Verdict {
    pub fn from_bmi(bmi: f64) -> Self {
        if bmi < UNDERWEIGHT_BELOW {
            Self::Underweight
        } else if bmi < OBESE_FROM {
            Self::Normal
        } else {
            Self::Obese
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Underweight => "underweight",
            Self::Normal => "Normal",
            Self::Obese => "Obese",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored attributes of a patient: everything except the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientAttributes {
    pub name: String,
    pub city: String,
    pub age: u8,
    pub gender: Gender,
    /// Height in meters
    pub height: f64,
    /// Weight in kilograms
    pub weight: f64,
}

impl PatientAttributes {
    /// Body-mass index rounded to two decimals.
    pub fn bmi(&self) -> f64 {
        round2(self.weight / (self.height * self.height))
    }

    pub fn verdict(&self) -> Verdict {
        Verdict::from_bmi(self.bmi())
    }

    /// Range checks on already-typed attributes.
    pub fn check(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();
        if !(MIN_AGE..=MAX_AGE).contains(&self.age) {
            errors.push("age", age_range_reason());
        }
        if !is_positive(self.height) {
            errors.push("height", "must be greater than 0");
        }
        if !is_positive(self.weight) {
            errors.push("weight", "must be greater than 0");
        }
        if errors.is_empty() && !self.bmi().is_finite() {
            errors.push("height", "too small for the given weight");
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: String,
    #[serde(flatten)]
    pub attributes: PatientAttributes,
}

impl Patient {
    pub fn new(id: impl Into<String>, attributes: PatientAttributes) -> Self {
        Self {
            id: id.into(),
            attributes,
        }
    }

    pub fn bmi(&self) -> f64 {
        self.attributes.bmi()
    }

    pub fn verdict(&self) -> Verdict {
        self.attributes.verdict()
    }

    /// Serializable representation with the derived fields filled in.
    pub fn view(&self) -> PatientView<'_> {
        PatientView {
            id: &self.id,
            attributes: &self.attributes,
            bmi: self.bmi(),
            verdict: self.verdict(),
        }
    }
}

/// A patient as returned to API callers: stored fields plus `bmi` and `verdict`.
#[derive(Debug, Serialize)]
pub struct PatientView<'a> {
    pub id: &'a str,
    #[serde(flatten)]
    pub attributes: &'a PatientAttributes,
    pub bmi: f64,
    pub verdict: Verdict,
}

/// Validate a full patient body.
///
/// Every field is checked; the error lists each missing, mistyped or
/// out-of-range field rather than stopping at the first.
pub fn validate(input: &Value) -> Result<Patient, ValidationError> {
    let object = as_object(input)?;
    let mut errors = ValidationError::new();

    let id = required(object, "id", &mut errors, parse_id);
    let name = required(object, "name", &mut errors, parse_string);
    let city = required(object, "city", &mut errors, parse_string);
    let age = required(object, "age", &mut errors, parse_age);
    let gender = required(object, "gender", &mut errors, parse_gender);
    let height = required(object, "height", &mut errors, parse_positive);
    let weight = required(object, "weight", &mut errors, parse_positive);

    match (id, name, city, age, gender, height, weight) {
        (Some(id), Some(name), Some(city), Some(age), Some(gender), Some(height), Some(weight))
            if errors.is_empty() =>
        {
            let attributes = PatientAttributes {
                name,
                city,
                age,
                gender,
                height,
                weight,
            };
            attributes.check()?;
            Ok(Patient::new(id, attributes))
        }
        _ => Err(errors),
    }
}

/// Partial update: each present field replaces the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientPatch {
    pub name: Option<String>,
    pub city: Option<String>,
    pub age: Option<u8>,
    pub gender: Option<Gender>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
}

impl PatientPatch {
    /// Type-check a patch body. Absent and `null` fields are left unset;
    /// keys that are not stored fields (including `id`) are ignored.
    pub fn from_value(input: &Value) -> Result<Self, ValidationError> {
        let object = as_object(input)?;
        let mut errors = ValidationError::new();

        let patch = Self {
            name: optional(object, "name", &mut errors, parse_string),
            city: optional(object, "city", &mut errors, parse_string),
            age: optional(object, "age", &mut errors, parse_age),
            gender: optional(object, "gender", &mut errors, parse_gender),
            height: optional(object, "height", &mut errors, parse_positive),
            weight: optional(object, "weight", &mut errors, parse_positive),
        };

        if errors.is_empty() { Ok(patch) } else { Err(errors) }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Merge `patch` into `existing` and re-validate the result as a whole record.
pub fn apply_partial_update(
    existing: &Patient,
    patch: &PatientPatch,
) -> Result<Patient, ValidationError> {
    let mut attributes = existing.attributes.clone();
    if let Some(name) = &patch.name {
        attributes.name = name.clone();
    }
    if let Some(city) = &patch.city {
        attributes.city = city.clone();
    }
    if let Some(age) = patch.age {
        attributes.age = age;
    }
    if let Some(gender) = patch.gender {
        attributes.gender = gender;
    }
    if let Some(height) = patch.height {
        attributes.height = height;
    }
    if let Some(weight) = patch.weight {
        attributes.weight = weight;
    }

    attributes.check()?;
    Ok(Patient::new(existing.id.clone(), attributes))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn age_range_reason() -> String {
    format!("must be between {MIN_AGE} and {MAX_AGE}")
}

fn as_object(input: &Value) -> Result<&Map<String, Value>, ValidationError> {
    input
        .as_object()
        .ok_or_else(|| ValidationError::single("body", "must be a JSON object"))
}

fn required<T>(
    object: &Map<String, Value>,
    field: &str,
    errors: &mut ValidationError,
    parse: fn(&Value) -> Result<T, String>,
) -> Option<T> {
    match object.get(field) {
        None | Some(Value::Null) => {
            errors.push(field, "field required");
            None
        }
        Some(value) => parse_into(field, value, errors, parse),
    }
}

fn optional<T>(
    object: &Map<String, Value>,
    field: &str,
    errors: &mut ValidationError,
    parse: fn(&Value) -> Result<T, String>,
) -> Option<T> {
    match object.get(field) {
        None | Some(Value::Null) => None,
        Some(value) => parse_into(field, value, errors, parse),
    }
}

fn parse_into<T>(
    field: &str,
    value: &Value,
    errors: &mut ValidationError,
    parse: fn(&Value) -> Result<T, String>,
) -> Option<T> {
    match parse(value) {
        Ok(v) => Some(v),
        Err(reason) => {
            errors.push(field, reason);
            None
        }
    }
}

fn parse_string(value: &Value) -> Result<String, String> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| "must be a string".to_string())
}

fn parse_id(value: &Value) -> Result<String, String> {
    let id = parse_string(value)?;
    if id.trim().is_empty() {
        return Err("must not be empty".into());
    }
    Ok(id)
}

fn parse_age(value: &Value) -> Result<u8, String> {
    let age = value
        .as_i64()
        .or_else(|| value.as_u64().map(|v| i64::try_from(v).unwrap_or(i64::MAX)))
        .ok_or_else(|| "must be an integer".to_string())?;
    u8::try_from(age)
        .ok()
        .filter(|age| (MIN_AGE..=MAX_AGE).contains(age))
        .ok_or_else(age_range_reason)
}

fn parse_gender(value: &Value) -> Result<Gender, String> {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| "must be one of male, female, other".to_string())
}

fn parse_positive(value: &Value) -> Result<f64, String> {
    let number = value
        .as_f64()
        .ok_or_else(|| "must be a number".to_string())?;
    if is_positive(number) {
        Ok(number)
    } else {
        Err("must be greater than 0".into())
    }
}
