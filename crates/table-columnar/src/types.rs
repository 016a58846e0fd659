use std::fmt;
use std::sync::Arc;

/// A single cell value as seen by grouping and aggregation.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(Arc<str>),
}

impl Value {
    pub fn text(s: &str) -> Self {
        Value::Text(Arc::<str>::from(s))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Value::Float(_))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Nothing",
            Value::Boolean(_) => "Boolean",
            Value::Integer(_) => "Integer",
            Value::Float(_) => "Float",
            Value::Text(_) => "Text",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Nothing"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::text(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Bit width of an integer column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IntegerType {
    Int8,
    Int16,
    Int32,
    Int64,
}

impl IntegerType {
    pub fn bits(self) -> u32 {
        match self {
            IntegerType::Int8 => 8,
            IntegerType::Int16 => 16,
            IntegerType::Int32 => 32,
            IntegerType::Int64 => 64,
        }
    }

    pub fn min_value(self) -> i64 {
        match self {
            IntegerType::Int8 => i8::MIN as i64,
            IntegerType::Int16 => i16::MIN as i64,
            IntegerType::Int32 => i32::MIN as i64,
            IntegerType::Int64 => i64::MIN,
        }
    }

    pub fn max_value(self) -> i64 {
        match self {
            IntegerType::Int8 => i8::MAX as i64,
            IntegerType::Int16 => i16::MAX as i64,
            IntegerType::Int32 => i32::MAX as i64,
            IntegerType::Int64 => i64::MAX,
        }
    }

    pub fn fits(self, value: i64) -> bool {
        (self.min_value()..=self.max_value()).contains(&value)
    }
}

impl fmt::Display for IntegerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Integer ({} bits)", self.bits())
    }
}

/// The concrete backing type of a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StorageType {
    Boolean,
    Integer(IntegerType),
    Float,
    Text,
    /// Values of any kind, stored as-is.
    Mixed,
}

impl StorageType {
    pub const INT_64: StorageType = StorageType::Integer(IntegerType::Int64);

    pub fn is_numeric(self) -> bool {
        matches!(self, StorageType::Integer(_) | StorageType::Float)
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageType::Boolean => f.write_str("Boolean"),
            StorageType::Integer(t) => write!(f, "{t}"),
            StorageType::Float => f.write_str("Float (64 bits)"),
            StorageType::Text => f.write_str("Text"),
            StorageType::Mixed => f.write_str("Mixed"),
        }
    }
}
