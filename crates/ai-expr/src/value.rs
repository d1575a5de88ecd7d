use core::fmt;

use ai_core::Entity;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Element type of numeric values and vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ScalarKind {
    Int,
    Float,
}

/// Static type of an expression value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ValueType {
    Bool,
    Int,
    Float,
    Int2,
    Int3,
    Int4,
    Float2,
    Float3,
    Float4,
    Entity,
}

impl ValueType {
    /// Encoded width in bytes.
    pub const fn size(self) -> u32 {
        match self {
            ValueType::Bool => 1,
            ValueType::Int | ValueType::Float => 4,
            ValueType::Int2 | ValueType::Float2 => 8,
            ValueType::Int3 | ValueType::Float3 => 12,
            ValueType::Int4 | ValueType::Float4 => 16,
            ValueType::Entity => 8,
        }
    }

    /// Number of numeric lanes, or 0 for non-numeric types.
    pub const fn lanes(self) -> u8 {
        match self {
            ValueType::Int | ValueType::Float => 1,
            ValueType::Int2 | ValueType::Float2 => 2,
            ValueType::Int3 | ValueType::Float3 => 3,
            ValueType::Int4 | ValueType::Float4 => 4,
            ValueType::Bool | ValueType::Entity => 0,
        }
    }

    pub const fn scalar_kind(self) -> Option<ScalarKind> {
        match self {
            ValueType::Int | ValueType::Int2 | ValueType::Int3 | ValueType::Int4 => {
                Some(ScalarKind::Int)
            }
            ValueType::Float | ValueType::Float2 | ValueType::Float3 | ValueType::Float4 => {
                Some(ScalarKind::Float)
            }
            ValueType::Bool | ValueType::Entity => None,
        }
    }

    /// The numeric type with `lanes` lanes of `kind` (1 lane is the scalar itself).
    pub const fn numeric(kind: ScalarKind, lanes: u8) -> Option<ValueType> {
        match (kind, lanes) {
            (ScalarKind::Int, 1) => Some(ValueType::Int),
            (ScalarKind::Int, 2) => Some(ValueType::Int2),
            (ScalarKind::Int, 3) => Some(ValueType::Int3),
            (ScalarKind::Int, 4) => Some(ValueType::Int4),
            (ScalarKind::Float, 1) => Some(ValueType::Float),
            (ScalarKind::Float, 2) => Some(ValueType::Float2),
            (ScalarKind::Float, 3) => Some(ValueType::Float3),
            (ScalarKind::Float, 4) => Some(ValueType::Float4),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Int2 => "int2",
            ValueType::Int3 => "int3",
            ValueType::Int4 => "int4",
            ValueType::Float2 => "float2",
            ValueType::Float3 => "float3",
            ValueType::Float4 => "float4",
            ValueType::Entity => "entity",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed expression value. Encodes little-endian, lanes packed without padding.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Value {
    Bool(bool),
    Int(i32),
    Float(f32),
    Int2([i32; 2]),
    Int3([i32; 3]),
    Int4([i32; 4]),
    Float2([f32; 2]),
    Float3([f32; 3]),
    Float4([f32; 4]),
    Entity(Entity),
}

/// Encoded bytes of a [`Value`], without heap allocation.
#[derive(Debug, Clone, Copy)]
pub struct ValueBytes {
    buf: [u8; 16],
    len: u8,
}

impl ValueBytes {
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len as usize]
    }
}

/// Numeric lanes of a value, widened to four.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Lanes {
    Int([i32; 4], u8),
    Float([f32; 4], u8),
}

impl Lanes {
    pub(crate) fn count(&self) -> u8 {
        match self {
            Lanes::Int(_, n) | Lanes::Float(_, n) => *n,
        }
    }

    pub(crate) fn kind(&self) -> ScalarKind {
        match self {
            Lanes::Int(..) => ScalarKind::Int,
            Lanes::Float(..) => ScalarKind::Float,
        }
    }
}

fn pad<T: Copy + Default, const N: usize>(v: [T; N]) -> [T; 4] {
    let mut out = [T::default(); 4];
    out[..N].copy_from_slice(&v);
    out
}

impl Value {
    pub fn ty(&self) -> ValueType {
        match self {
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::Int2(_) => ValueType::Int2,
            Value::Int3(_) => ValueType::Int3,
            Value::Int4(_) => ValueType::Int4,
            Value::Float2(_) => ValueType::Float2,
            Value::Float3(_) => ValueType::Float3,
            Value::Float4(_) => ValueType::Float4,
            Value::Entity(_) => ValueType::Entity,
        }
    }

    /// The all-zero value of `ty`, i.e. what decoding zeroed bytes yields.
    pub fn zeroed(ty: ValueType) -> Value {
        match ty {
            ValueType::Bool => Value::Bool(false),
            ValueType::Entity => Value::Entity(Entity::NULL),
            numeric => {
                let kind = numeric.scalar_kind().unwrap_or(ScalarKind::Int);
                let lanes = match kind {
                    ScalarKind::Int => Lanes::Int([0; 4], numeric.lanes()),
                    ScalarKind::Float => Lanes::Float([0.0; 4], numeric.lanes()),
                };
                Value::from_lanes(lanes)
            }
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match *self {
            Value::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match *self {
            Value::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<Entity> {
        match *self {
            Value::Entity(e) => Some(e),
            _ => None,
        }
    }

    /// Decode `bytes` as `ty`. Returns `None` unless `bytes.len() == ty.size()`.
    pub fn from_bytes(ty: ValueType, bytes: &[u8]) -> Option<Value> {
        if bytes.len() != ty.size() as usize {
            return None;
        }
        let word = |i: usize| -> [u8; 4] {
            let mut w = [0u8; 4];
            w.copy_from_slice(&bytes[i * 4..i * 4 + 4]);
            w
        };
        let value = match ty {
            ValueType::Bool => Value::Bool(bytes[0] != 0),
            ValueType::Entity => {
                let mut w = [0u8; 8];
                w.copy_from_slice(bytes);
                Value::Entity(Entity(u64::from_le_bytes(w)))
            }
            numeric => {
                let n = numeric.lanes();
                let lanes = match numeric.scalar_kind() {
                    Some(ScalarKind::Float) => {
                        let mut out = [0.0f32; 4];
                        for (i, lane) in out.iter_mut().enumerate().take(n as usize) {
                            *lane = f32::from_le_bytes(word(i));
                        }
                        Lanes::Float(out, n)
                    }
                    _ => {
                        let mut out = [0i32; 4];
                        for (i, lane) in out.iter_mut().enumerate().take(n as usize) {
                            *lane = i32::from_le_bytes(word(i));
                        }
                        Lanes::Int(out, n)
                    }
                };
                Value::from_lanes(lanes)
            }
        };
        Some(value)
    }

    pub fn to_bytes(&self) -> ValueBytes {
        let mut buf = [0u8; 16];
        let len = self.ty().size() as u8;
        match *self {
            Value::Bool(b) => buf[0] = b as u8,
            Value::Entity(e) => buf[..8].copy_from_slice(&e.0.to_le_bytes()),
            _ => match self.lanes() {
                Some(Lanes::Int(v, n)) => {
                    for (i, lane) in v.iter().enumerate().take(n as usize) {
                        buf[i * 4..i * 4 + 4].copy_from_slice(&lane.to_le_bytes());
                    }
                }
                Some(Lanes::Float(v, n)) => {
                    for (i, lane) in v.iter().enumerate().take(n as usize) {
                        buf[i * 4..i * 4 + 4].copy_from_slice(&lane.to_le_bytes());
                    }
                }
                None => {}
            },
        }
        ValueBytes { buf, len }
    }

    pub(crate) fn lanes(&self) -> Option<Lanes> {
        Some(match *self {
            Value::Int(v) => Lanes::Int([v, 0, 0, 0], 1),
            Value::Int2(v) => Lanes::Int(pad(v), 2),
            Value::Int3(v) => Lanes::Int(pad(v), 3),
            Value::Int4(v) => Lanes::Int(v, 4),
            Value::Float(v) => Lanes::Float([v, 0.0, 0.0, 0.0], 1),
            Value::Float2(v) => Lanes::Float(pad(v), 2),
            Value::Float3(v) => Lanes::Float(pad(v), 3),
            Value::Float4(v) => Lanes::Float(v, 4),
            Value::Bool(_) | Value::Entity(_) => return None,
        })
    }

    /// Rebuild a value from lanes. Lane counts outside `1..=4` are clamped to that range.
    pub(crate) fn from_lanes(lanes: Lanes) -> Value {
        match lanes {
            Lanes::Int(v, n) => match n {
                0 | 1 => Value::Int(v[0]),
                2 => Value::Int2([v[0], v[1]]),
                3 => Value::Int3([v[0], v[1], v[2]]),
                _ => Value::Int4(v),
            },
            Lanes::Float(v, n) => match n {
                0 | 1 => Value::Float(v[0]),
                2 => Value::Float2([v[0], v[1]]),
                3 => Value::Float3([v[0], v[1], v[2]]),
                _ => Value::Float4(v),
            },
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value)
    }
}

impl From<[f32; 2]> for Value {
    fn from(value: [f32; 2]) -> Self {
        Value::Float2(value)
    }
}

impl From<[f32; 3]> for Value {
    fn from(value: [f32; 3]) -> Self {
        Value::Float3(value)
    }
}

impl From<Entity> for Value {
    fn from(value: Entity) -> Self {
        Value::Entity(value)
    }
}
