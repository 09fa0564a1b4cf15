//! Value types of expressions.
//!
//! Every expression node is tagged with the [`Type`] of the value it denotes.
//! Types are compared structurally: two independently built schemas with the
//! same name and fields describe the same type.

use std::fmt;
use std::sync::Arc;

use crate::error::{ExprError, Result};

/// A fixed-width integer type.
///
/// Values of this type are stored as bit patterns masked to `width` bits.
/// Arithmetic wraps modulo `2^width`; the sign only matters for comparisons
/// and casts.
///
/// # Invariants
///
/// - `1 <= width <= 64`
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct IntType {
    width: u8,
    signed: bool,
}

impl IntType {
    pub const I8: IntType = IntType { width: 8, signed: true };
    pub const U8: IntType = IntType { width: 8, signed: false };
    pub const I16: IntType = IntType { width: 16, signed: true };
    pub const U16: IntType = IntType { width: 16, signed: false };
    pub const I32: IntType = IntType { width: 32, signed: true };
    pub const U32: IntType = IntType { width: 32, signed: false };
    pub const I64: IntType = IntType { width: 64, signed: true };
    pub const U64: IntType = IntType { width: 64, signed: false };

    /// Creates an integer type of the given width.
    ///
    /// # Panics
    ///
    /// Panics if `width` is not in `1..=64`.
    pub fn new(width: u8, signed: bool) -> Self {
        assert!((1..=64).contains(&width), "Integer width must be in 1..=64");
        Self { width, signed }
    }

    pub const fn width(self) -> u8 {
        self.width
    }

    pub const fn is_signed(self) -> bool {
        self.signed
    }

    /// Mask selecting the `width` low bits.
    pub const fn mask(self) -> u64 {
        if self.width == 64 {
            u64::MAX
        } else {
            (1u64 << self.width) - 1
        }
    }

    /// Reduce an arbitrary integer to the bit pattern of this type (modulo `2^width`).
    pub fn wrap(self, value: i128) -> u64 {
        (value as u64) & self.mask()
    }

    /// Interpret a bit pattern of this type as a mathematical integer.
    pub fn interpret(self, bits: u64) -> i128 {
        let bits = bits & self.mask();
        if self.signed && (bits >> (self.width - 1)) & 1 == 1 {
            bits as i128 - (1i128 << self.width)
        } else {
            bits as i128
        }
    }

    /// Smallest representable value.
    pub fn min_value(self) -> i128 {
        if self.signed {
            -(1i128 << (self.width - 1))
        } else {
            0
        }
    }

    /// Largest representable value.
    pub fn max_value(self) -> i128 {
        if self.signed {
            (1i128 << (self.width - 1)) - 1
        } else {
            self.mask() as i128
        }
    }
}

impl fmt::Display for IntType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", if self.signed { "i" } else { "u" }, self.width)
    }
}

/// A named object field.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Field {
    pub name: String,
    pub ty: Type,
}

/// Explicit shape descriptor of an object type: a name and an ordered list of fields.
///
/// Field expressions address fields by position; the name is resolved once,
/// when the expression is built.
#[derive(Debug, Eq, PartialEq, Hash)]
pub struct ObjectSchema {
    name: String,
    fields: Vec<Field>,
}

impl ObjectSchema {
    /// Creates a schema, rejecting duplicate field names.
    pub fn new<S, I>(name: impl Into<String>, fields: I) -> Result<Arc<Self>>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, Type)>,
    {
        let name = name.into();
        let mut result: Vec<Field> = Vec::new();
        for (field, ty) in fields {
            let field = field.into();
            if result.iter().any(|f| f.name == field) {
                return Err(ExprError::DuplicateField { object: name, field });
            }
            result.push(Field { name: field, ty });
        }
        Ok(Arc::new(Self { name, fields: result }))
    }

    /// The two-field schema `Pair { item1, item2 }`.
    pub fn pair(first: Type, second: Type) -> Arc<Self> {
        Arc::new(Self {
            name: "Pair".to_string(),
            fields: vec![
                Field {
                    name: "item1".to_string(),
                    ty: first,
                },
                Field {
                    name: "item2".to_string(),
                    ty: second,
                },
            ],
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// The type of the value an expression denotes.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Type {
    Bool,
    Int(IntType),
    BigInt,
    Object(Arc<ObjectSchema>),
    List(Arc<Type>),
}

impl Type {
    pub fn int(ty: IntType) -> Self {
        Type::Int(ty)
    }

    pub fn object(schema: &Arc<ObjectSchema>) -> Self {
        Type::Object(Arc::clone(schema))
    }

    pub fn list(element: Type) -> Self {
        Type::List(Arc::new(element))
    }

    pub fn pair(first: Type, second: Type) -> Self {
        Type::Object(ObjectSchema::pair(first, second))
    }

    /// Integer types (fixed-width or unbounded) support arithmetic and ordering.
    pub fn is_integer(&self) -> bool {
        matches!(self, Type::Int(_) | Type::BigInt)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Type::Bool)
    }

    pub fn int_type(&self) -> Option<IntType> {
        match self {
            Type::Int(ty) => Some(*ty),
            _ => None,
        }
    }

    pub fn schema(&self) -> Option<&Arc<ObjectSchema>> {
        match self {
            Type::Object(schema) => Some(schema),
            _ => None,
        }
    }

    pub fn element(&self) -> Option<&Type> {
        match self {
            Type::List(element) => Some(element),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => write!(f, "bool"),
            Type::Int(ty) => write!(f, "{}", ty),
            Type::BigInt => write!(f, "bigint"),
            Type::Object(schema) => write!(f, "{}", schema.name()),
            Type::List(element) => write!(f, "[{}]", element),
        }
    }
}
