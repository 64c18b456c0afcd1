//! Environment-native values.
//!
//! Environments speak in typed scalars, n-dimensional arrays and loosely typed
//! `info` maps. These types model that output before it is normalized for the
//! wire (see [`crate::normalize`]).

use std::collections::BTreeMap;

use thiserror::Error;

/// Array data does not fit the declared shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("array has {len} elements but shape {shape:?} requires {expected}")]
pub struct ShapeError {
    pub shape: Vec<usize>,
    pub len: usize,
    pub expected: usize,
}

/// A typed numeric scalar as produced by an environment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Bool(bool),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
}

impl Scalar {
    /// Lossy conversion used for rewards.
    pub fn to_f64(self) -> f64 {
        match self {
            Scalar::Bool(b) => {
                if b {
                    1.0
                } else {
                    0.0
                }
            }
            Scalar::I64(v) => v as f64,
            Scalar::U64(v) => v as f64,
            Scalar::F32(v) => f64::from(v),
            Scalar::F64(v) => v,
        }
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::F64(v)
    }
}

impl From<f32> for Scalar {
    fn from(v: f32) -> Self {
        Scalar::F32(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::I64(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

/// Homogeneous element buffer of an [`NdArray`], stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    Bool(Vec<bool>),
}

impl ArrayData {
    pub fn len(&self) -> usize {
        match self {
            ArrayData::F32(v) => v.len(),
            ArrayData::F64(v) => v.len(),
            ArrayData::I64(v) => v.len(),
            ArrayData::U8(v) => v.len(),
            ArrayData::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element type name, numpy style.
    pub fn dtype(&self) -> &'static str {
        match self {
            ArrayData::F32(_) => "float32",
            ArrayData::F64(_) => "float64",
            ArrayData::I64(_) => "int64",
            ArrayData::U8(_) => "uint8",
            ArrayData::Bool(_) => "bool",
        }
    }
}

/// Number of elements described by `shape`, or `None` on overflow.
pub fn element_count(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, dim| acc.checked_mul(*dim))
}

/// N-dimensional numeric array with row-major storage.
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray {
    shape: Vec<usize>,
    data: ArrayData,
}

impl NdArray {
    /// Build an array, checking that `data` holds exactly `product(shape)` elements.
    /// An empty shape describes a 0-d array holding a single element.
    pub fn new(shape: Vec<usize>, data: ArrayData) -> Result<Self, ShapeError> {
        // An element count that overflows `usize` can never match.
        let expected = element_count(&shape).unwrap_or(usize::MAX);
        if data.len() != expected {
            return Err(ShapeError {
                len: data.len(),
                shape,
                expected,
            });
        }
        Ok(Self { shape, data })
    }

    /// 1-d `float32` array.
    pub fn vector(values: Vec<f32>) -> Self {
        Self {
            shape: vec![values.len()],
            data: ArrayData::F32(values),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    pub fn dtype(&self) -> &'static str {
        self.data.dtype()
    }
}

/// Loosely typed value found in `info` maps.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Float32(f32),
    Str(String),
    Array(NdArray),
    List(Vec<EnvValue>),
    Map(BTreeMap<String, EnvValue>),
    /// A value with no numeric or structural meaning on the wire, carried as
    /// its textual representation.
    Opaque { type_name: String, repr: String },
}

impl From<bool> for EnvValue {
    fn from(v: bool) -> Self {
        EnvValue::Bool(v)
    }
}

impl From<i64> for EnvValue {
    fn from(v: i64) -> Self {
        EnvValue::Int(v)
    }
}

impl From<u64> for EnvValue {
    fn from(v: u64) -> Self {
        EnvValue::UInt(v)
    }
}

impl From<f64> for EnvValue {
    fn from(v: f64) -> Self {
        EnvValue::Float(v)
    }
}

impl From<f32> for EnvValue {
    fn from(v: f32) -> Self {
        EnvValue::Float32(v)
    }
}

impl From<&str> for EnvValue {
    fn from(v: &str) -> Self {
        EnvValue::Str(v.to_string())
    }
}

impl From<String> for EnvValue {
    fn from(v: String) -> Self {
        EnvValue::Str(v)
    }
}

impl From<NdArray> for EnvValue {
    fn from(v: NdArray) -> Self {
        EnvValue::Array(v)
    }
}

impl From<Scalar> for EnvValue {
    fn from(v: Scalar) -> Self {
        match v {
            Scalar::Bool(b) => EnvValue::Bool(b),
            Scalar::I64(i) => EnvValue::Int(i),
            Scalar::U64(u) => EnvValue::UInt(u),
            Scalar::F32(f) => EnvValue::Float32(f),
            Scalar::F64(f) => EnvValue::Float(f),
        }
    }
}
