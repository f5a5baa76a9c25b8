//! Serde adapters that write non-finite floats as `null` and read `null` back as NaN.
//!
//! `serde_json` already emits `null` for NaN/inf but refuses to deserialize
//! `null` into `f64`, which would make any exported degenerate fit unreadable.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

fn to_opt(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

fn from_opt(v: Option<f64>) -> f64 {
    v.unwrap_or(f64::NAN)
}

pub mod scalar {
    use super::*;

    pub fn serialize<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
        to_opt(*v).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Option::<f64>::deserialize(d).map(from_opt)
    }
}

pub mod vec {
    use super::*;

    pub fn serialize<S: Serializer>(v: &[f64], s: S) -> Result<S::Ok, S::Error> {
        let out: Vec<Option<f64>> = v.iter().copied().map(to_opt).collect();
        out.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<f64>, D::Error> {
        let raw = Vec::<Option<f64>>::deserialize(d)?;
        Ok(raw.into_iter().map(from_opt).collect())
    }
}

pub mod nested {
    use super::*;

    pub fn serialize<S: Serializer>(v: &[Vec<f64>], s: S) -> Result<S::Ok, S::Error> {
        let out: Vec<Vec<Option<f64>>> = v
            .iter()
            .map(|row| row.iter().copied().map(to_opt).collect())
            .collect();
        out.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Vec<f64>>, D::Error> {
        let raw = Vec::<Vec<Option<f64>>>::deserialize(d)?;
        Ok(raw
            .into_iter()
            .map(|row| row.into_iter().map(from_opt).collect())
            .collect())
    }
}
