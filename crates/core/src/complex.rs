//! Complex payloads stored as serialized strings.
//!
//! Geometric and color values have no slot of their own; they are encoded as
//! JSON into the string slot of a value cell. An empty string decodes to the
//! payload's zero value.

use crate::error::{Error, Result};
use crate::types::TypeTag;
use alloc::string::{String, ToString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A payload that can be serialized into a string slot.
pub trait Complex: Serialize + DeserializeOwned + Default {
    /// The field type this payload belongs to.
    const TAG: TypeTag;

    /// Whether every component can be written as a JSON number.
    fn is_finite(&self) -> bool {
        true
    }
}

/// Encodes a payload into its string form.
///
/// Float payloads holding NaN or an infinity are rejected, since JSON has no
/// number for them and the payload would not decode again.
pub fn to_complex<T: Complex>(value: &T) -> Result<String> {
    if !value.is_finite() {
        return Err(Error::codec("non-finite float component"));
    }
    serde_json::to_string(value).map_err(|e| Error::codec(e.to_string()))
}

/// Decodes a payload from its string form.
pub fn from_complex<T: Complex>(payload: &str) -> Result<T> {
    if payload.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(payload).map_err(|e| Error::codec(e.to_string()))
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vector2Int {
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vector3Int {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// RGBA color with float channels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Vector2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Vector3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl Vector2Int {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Vector3Int {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl Color {
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

impl Complex for Vector2 {
    const TAG: TypeTag = TypeTag::Vector2;

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Complex for Vector3 {
    const TAG: TypeTag = TypeTag::Vector3;

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Complex for Vector2Int {
    const TAG: TypeTag = TypeTag::Vector2Int;
}

impl Complex for Vector3Int {
    const TAG: TypeTag = TypeTag::Vector3Int;
}

impl Complex for Color {
    const TAG: TypeTag = TypeTag::Color;

    fn is_finite(&self) -> bool {
        [self.r, self.g, self.b, self.a].iter().all(|c| c.is_finite())
    }
}
