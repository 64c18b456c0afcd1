//! Serde adapters for floats that may be non-finite.
//!
//! JSON has no NaN or infinity. Finite values travel as numbers; the others
//! travel as the strings `"NaN"`, `"inf"` and `"-inf"` and are parsed back.

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Wire label of a non-finite float, `None` for finite values.
pub fn label(value: f64) -> Option<&'static str> {
    if value.is_finite() {
        None
    } else if value.is_nan() {
        Some("NaN")
    } else if value.is_sign_positive() {
        Some("inf")
    } else {
        Some("-inf")
    }
}

/// Inverse of [`label`].
pub fn from_label(label: &str) -> Option<f64> {
    match label {
        "NaN" => Some(f64::NAN),
        "inf" => Some(f64::INFINITY),
        "-inf" => Some(f64::NEG_INFINITY),
        _ => None,
    }
}

struct Wire(f64);

impl Serialize for Wire {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match label(self.0) {
            Some(label) => serializer.serialize_str(label),
            None => serializer.serialize_f64(self.0),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Repr {
    Number(f64),
    Label(String),
}

impl Repr {
    fn into_f64<E: de::Error>(self) -> Result<f64, E> {
        match self {
            Repr::Number(value) => Ok(value),
            Repr::Label(label) => from_label(&label).ok_or_else(|| {
                E::invalid_value(de::Unexpected::Str(&label), &"a number, \"NaN\", \"inf\" or \"-inf\"")
            }),
        }
    }
}

/// `#[serde(with = "float::scalar")]` for a single `f64`.
pub mod scalar {
    use super::*;

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        Wire(*value).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Repr::deserialize(deserializer)?.into_f64()
    }
}

/// `#[serde(with = "float::seq")]` for a `Vec<f64>`.
pub mod seq {
    use super::*;

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(|v| Wire(*v)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        Vec::<Repr>::deserialize(deserializer)?
            .into_iter()
            .map(Repr::into_f64)
            .collect()
    }
}
