//! Conversion of environment output into wire-safe values.
//!
//! Rules:
//! - integer scalars become JSON integers, floating scalars JSON floats
//! - arrays of any dimensionality become flat row-major `f64` sequences
//! - maps and lists are normalized recursively
//! - values JSON cannot carry are stringified rather than dropped: opaque
//!   values become their `repr`, non-finite floats become `"NaN"`, `"inf"` or
//!   `"-inf"`
//!
//! Every function here is total.

use gymd_protocol::JsonMap;
use gymd_protocol::float::label;
use serde_json::{Number, Value};

use crate::env::{ArrayData, EnvValue, Info, NdArray, Scalar};

/// Flatten an array into row-major `f64` values.
///
/// Conversion from every supported element type is exact, except `int64`
/// magnitudes above 2^53.
pub fn flatten(array: &NdArray) -> Vec<f64> {
    match array.data() {
        ArrayData::F32(v) => v.iter().map(|x| f64::from(*x)).collect(),
        ArrayData::F64(v) => v.clone(),
        ArrayData::I64(v) => v.iter().map(|x| *x as f64).collect(),
        ArrayData::U8(v) => v.iter().map(|x| f64::from(*x)).collect(),
        ArrayData::Bool(v) => v.iter().map(|x| if *x { 1.0 } else { 0.0 }).collect(),
    }
}

/// Reward as a plain float. Non-finite rewards pass through and are labelled
/// on the wire.
pub fn reward(value: Scalar) -> f64 {
    value.to_f64()
}

/// Normalize a single scalar.
pub fn scalar(value: Scalar) -> Value {
    match value {
        Scalar::Bool(b) => Value::Bool(b),
        Scalar::I64(i) => Value::from(i),
        Scalar::U64(u) => Value::from(u),
        Scalar::F32(f) => float(f64::from(f)),
        Scalar::F64(f) => float(f),
    }
}

/// Normalize an arbitrary info value.
pub fn value(value: &EnvValue) -> Value {
    match value {
        EnvValue::Null => Value::Null,
        EnvValue::Bool(b) => Value::Bool(*b),
        EnvValue::Int(i) => Value::from(*i),
        EnvValue::UInt(u) => Value::from(*u),
        EnvValue::Float(f) => float(*f),
        EnvValue::Float32(f) => float(f64::from(*f)),
        EnvValue::Str(s) => Value::String(s.clone()),
        EnvValue::Array(array) => Value::Array(flatten(array).into_iter().map(float).collect()),
        EnvValue::List(items) => Value::Array(items.iter().map(self::value).collect()),
        EnvValue::Map(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), self::value(v)))
                .collect(),
        ),
        EnvValue::Opaque { repr, .. } => Value::String(repr.clone()),
    }
}

/// Normalize an `info` map.
pub fn info(info: &Info) -> JsonMap {
    info.iter().map(|(k, v)| (k.clone(), value(v))).collect()
}

fn float(f: f64) -> Value {
    match label(f) {
        Some(label) => Value::String(label.to_string()),
        None => Number::from_f64(f).map_or(Value::Null, Value::Number),
    }
}
