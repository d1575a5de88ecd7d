use ai_core::Entity;
use ai_expr::{Value, ValueType};

/// Item type a caller collects query results into.
pub trait QueryItem: Sized {
    /// Value type generators must produce for this item.
    const VALUE_TYPE: ValueType;

    fn from_value(value: Value) -> Option<Self>;
}

impl QueryItem for [f32; 2] {
    const VALUE_TYPE: ValueType = ValueType::Float2;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Float2(p) => Some(p),
            _ => None,
        }
    }
}

impl QueryItem for Entity {
    const VALUE_TYPE: ValueType = ValueType::Entity;

    fn from_value(value: Value) -> Option<Self> {
        value.as_entity()
    }
}
