//! The full set of patients, held in memory for the span of one operation.
//!
//! A [`Collection`] is the unit of persistence: backends load and store it
//! whole. Its serialized form maps each id to the stored attributes; the id
//! is the key and derived fields are left out.

use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CoreError, Result};
use crate::patient::{Patient, PatientAttributes, PatientPatch, PatientView, apply_partial_update};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
    patients: IndexMap<String, Patient>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.patients.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Patient> {
        self.patients.get(id)
    }

    /// Patients in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Patient> {
        self.patients.values()
    }

    pub fn into_patients(self) -> Vec<Patient> {
        self.patients.into_values().collect()
    }

    /// Insert a new patient; fails if the id is taken.
    pub fn insert(&mut self, patient: Patient) -> Result<()> {
        if self.patients.contains_key(&patient.id) {
            return Err(CoreError::already_exists(patient.id));
        }
        self.patients.insert(patient.id.clone(), patient);
        Ok(())
    }

    /// Apply a partial update in place and return the merged record.
    pub fn update(&mut self, id: &str, patch: &PatientPatch) -> Result<&Patient> {
        let slot = self
            .patients
            .get_mut(id)
            .ok_or_else(|| CoreError::not_found(id))?;
        *slot = apply_partial_update(slot, patch)?;
        Ok(&*slot)
    }

    /// Remove a patient, keeping the order of the remaining entries.
    pub fn remove(&mut self, id: &str) -> Result<Patient> {
        self.patients
            .shift_remove(id)
            .ok_or_else(|| CoreError::not_found(id))
    }

    /// Serializable id -> patient mapping including derived fields.
    pub fn view(&self) -> CollectionView<'_> {
        CollectionView(self)
    }
}

impl FromIterator<Patient> for Collection {
    /// Later duplicates replace earlier ones.
    fn from_iter<I: IntoIterator<Item = Patient>>(iter: I) -> Self {
        Self {
            patients: iter.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }
}

impl Serialize for Collection {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.patients.len()))?;
        for (id, patient) in &self.patients {
            map.serialize_entry(id, &patient.attributes)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Collection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = IndexMap::<String, PatientAttributes>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .map(|(id, attributes)| Patient::new(id, attributes))
            .collect())
    }
}

/// API-facing form of a collection: `{ id: { ...stored, bmi, verdict } }`.
#[derive(Debug)]
pub struct CollectionView<'a>(&'a Collection);

impl Serialize for CollectionView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for patient in self.0.iter() {
            let view: PatientView<'_> = patient.view();
            map.serialize_entry(&patient.id, &view)?;
        }
        map.end()
    }
}
