//! Concrete values produced by the interpreter.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

use crate::error::{ExprError, Result};
use crate::node::{ArithOp, CmpOp};
use crate::types::{IntType, ObjectSchema, Type};

/// A concrete value of some [`Type`].
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Value {
    Bool(bool),
    /// Fixed-width integer, stored as a bit pattern masked to the type width.
    Int { ty: IntType, bits: u64 },
    BigInt(BigInt),
    Object {
        schema: Arc<ObjectSchema>,
        fields: Vec<Value>,
    },
    List { element: Type, items: ListItems },
}

/// Items of a list value.
///
/// The storage is shared: cloning a list and taking its tail are O(1). A tail
/// is a view into the items of the list it was taken from.
#[derive(Debug, Clone)]
pub struct ListItems {
    items: Arc<[Value]>,
    start: usize,
}

impl ListItems {
    pub fn new(items: Vec<Value>) -> Self {
        Self {
            items: Arc::from(items),
            start: 0,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.items[self.start..]
    }

    /// The first item and a view of the remaining ones.
    pub fn split_first(&self) -> Option<(&Value, ListItems)> {
        let head = self.items.get(self.start)?;
        let tail = Self {
            items: Arc::clone(&self.items),
            start: self.start + 1,
        };
        Some((head, tail))
    }

    /// Identifies the view: equal keys mean the same storage and the same start.
    pub(crate) fn storage_key(&self) -> (usize, usize) {
        (Arc::as_ptr(&self.items).cast::<Value>() as usize, self.start)
    }
}

impl Deref for ListItems {
    type Target = [Value];

    fn deref(&self) -> &[Value] {
        self.as_slice()
    }
}

impl PartialEq for ListItems {
    fn eq(&self, other: &Self) -> bool {
        self.storage_key() == other.storage_key() || self.as_slice() == other.as_slice()
    }
}

impl Eq for ListItems {}

impl Hash for ListItems {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state);
    }
}

impl From<Vec<Value>> for ListItems {
    fn from(items: Vec<Value>) -> Self {
        Self::new(items)
    }
}

impl FromIterator<Value> for ListItems {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Value {
    pub fn bool(value: bool) -> Self {
        Value::Bool(value)
    }

    /// Integer of the given type; `value` is wrapped modulo `2^width`.
    pub fn int(ty: IntType, value: i128) -> Self {
        Value::Int {
            ty,
            bits: ty.wrap(value),
        }
    }

    pub fn i32(value: i32) -> Self {
        Value::int(IntType::I32, value as i128)
    }

    pub fn u32(value: u32) -> Self {
        Value::int(IntType::U32, value as i128)
    }

    pub fn i64(value: i64) -> Self {
        Value::int(IntType::I64, value as i128)
    }

    pub fn u8(value: u8) -> Self {
        Value::int(IntType::U8, value as i128)
    }

    pub fn big(value: impl Into<BigInt>) -> Self {
        Value::BigInt(value.into())
    }

    /// Builds an object value, checking field count and field types.
    pub fn object(schema: &Arc<ObjectSchema>, fields: Vec<Value>) -> Result<Self> {
        if schema.len() != fields.len() {
            return Err(ExprError::FieldCount {
                object: schema.name().to_string(),
                expected: schema.len(),
                found: fields.len(),
            });
        }
        for (field, value) in schema.fields().iter().zip(fields.iter()) {
            if value.ty() != field.ty {
                return Err(ExprError::mismatch("object", &field.ty, value.ty()));
            }
        }
        Ok(Value::Object {
            schema: Arc::clone(schema),
            fields,
        })
    }

    /// Builds a list value, checking element types.
    pub fn list(element: Type, items: Vec<Value>) -> Result<Self> {
        if let Some(bad) = items.iter().find(|v| v.ty() != element) {
            return Err(ExprError::mismatch("list", &element, bad.ty()));
        }
        Ok(Value::List {
            element,
            items: items.into(),
        })
    }

    /// The value a symbolic placeholder takes when no solver assignment is present.
    pub fn default_for(ty: &Type) -> Self {
        match ty {
            Type::Bool => Value::Bool(false),
            Type::Int(ty) => Value::Int { ty: *ty, bits: 0 },
            Type::BigInt => Value::BigInt(BigInt::zero()),
            Type::Object(schema) => Value::Object {
                schema: Arc::clone(schema),
                fields: schema.fields().iter().map(|f| Value::default_for(&f.ty)).collect(),
            },
            Type::List(element) => Value::List {
                element: (**element).clone(),
                items: ListItems::empty(),
            },
        }
    }

    /// The additive identity of an integer type.
    pub fn zero(ty: &Type) -> Option<Self> {
        match ty {
            Type::Int(ty) => Some(Value::int(*ty, 0)),
            Type::BigInt => Some(Value::BigInt(BigInt::zero())),
            _ => None,
        }
    }

    /// The multiplicative identity of an integer type.
    pub fn one(ty: &Type) -> Option<Self> {
        match ty {
            Type::Int(ty) => Some(Value::int(*ty, 1)),
            Type::BigInt => Some(Value::BigInt(BigInt::from(1))),
            _ => None,
        }
    }

    pub fn ty(&self) -> Type {
        match self {
            Value::Bool(_) => Type::Bool,
            Value::Int { ty, .. } => Type::Int(*ty),
            Value::BigInt(_) => Type::BigInt,
            Value::Object { schema, .. } => Type::Object(Arc::clone(schema)),
            Value::List { element, .. } => Type::list(element.clone()),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Mathematical value of an integer (fixed-width values are sign-interpreted).
    pub fn as_int(&self) -> Option<i128> {
        match self {
            Value::Int { ty, bits } => Some(ty.interpret(*bits)),
            Value::BigInt(value) => value.to_i128(),
            _ => None,
        }
    }

    pub fn as_big(&self) -> Option<BigInt> {
        match self {
            Value::Int { ty, bits } => Some(BigInt::from(ty.interpret(*bits))),
            Value::BigInt(value) => Some(value.clone()),
            _ => None,
        }
    }

    pub fn fields(&self) -> Option<&[Value]> {
        match self {
            Value::Object { fields, .. } => Some(fields),
            _ => None,
        }
    }

    pub fn items(&self) -> Option<&[Value]> {
        match self {
            Value::List { items, .. } => Some(items.as_slice()),
            _ => None,
        }
    }

    pub(crate) fn arith(op: ArithOp, lhs: &Value, rhs: &Value) -> Option<Value> {
        match (lhs, rhs) {
            (Value::Int { ty, bits: a }, Value::Int { ty: ty2, bits: b }) if ty == ty2 => {
                let (a, b) = (*a, *b);
                let bits = match op {
                    ArithOp::Add => a.wrapping_add(b),
                    ArithOp::Sub => a.wrapping_sub(b),
                    ArithOp::Mul => a.wrapping_mul(b),
                    ArithOp::BitAnd => a & b,
                    ArithOp::BitOr => a | b,
                    ArithOp::BitXor => a ^ b,
                };
                Some(Value::Int {
                    ty: *ty,
                    bits: bits & ty.mask(),
                })
            }
            (Value::BigInt(a), Value::BigInt(b)) => Some(Value::BigInt(match op {
                ArithOp::Add => a + b,
                ArithOp::Sub => a - b,
                ArithOp::Mul => a * b,
                ArithOp::BitAnd => a & b,
                ArithOp::BitOr => a | b,
                ArithOp::BitXor => a ^ b,
            })),
            _ => None,
        }
    }

    pub(crate) fn bit_not(&self) -> Option<Value> {
        match self {
            Value::Int { ty, bits } => Some(Value::Int {
                ty: *ty,
                bits: !bits & ty.mask(),
            }),
            Value::BigInt(value) => Some(Value::BigInt(!value.clone())),
            _ => None,
        }
    }

    pub(crate) fn compare(op: CmpOp, lhs: &Value, rhs: &Value) -> Option<bool> {
        let ordering = match (lhs, rhs) {
            (Value::Int { ty, bits: a }, Value::Int { ty: ty2, bits: b }) if ty == ty2 => {
                ty.interpret(*a).cmp(&ty.interpret(*b))
            }
            (Value::BigInt(a), Value::BigInt(b)) => a.cmp(b),
            _ => return None,
        };
        Some(match op {
            CmpOp::Lt => ordering == Ordering::Less,
            CmpOp::Leq => ordering != Ordering::Greater,
            CmpOp::Gt => ordering == Ordering::Greater,
            CmpOp::Geq => ordering != Ordering::Less,
        })
    }

    /// Convert an integer value to another integer type.
    ///
    /// Fixed-width sources are sign- or zero-extended according to their own
    /// signedness, then truncated to the target width.
    pub(crate) fn cast(&self, target: &Type) -> Option<Value> {
        match (self, target) {
            (Value::Int { ty, bits }, Type::Int(target)) => Some(Value::int(*target, ty.interpret(*bits))),
            (Value::Int { ty, bits }, Type::BigInt) => Some(Value::BigInt(BigInt::from(ty.interpret(*bits)))),
            (Value::BigInt(value), Type::Int(target)) => {
                let mask = BigInt::from(target.mask());
                let low = value & &mask;
                Some(Value::Int {
                    ty: *target,
                    bits: low.to_u64()?,
                })
            }
            (Value::BigInt(value), Type::BigInt) => Some(Value::BigInt(value.clone())),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int { ty, bits } => write!(f, "{}{}", ty.interpret(*bits), ty),
            Value::BigInt(value) => write!(f, "{}n", value),
            Value::Object { schema, fields } => {
                write!(f, "{}{{", schema.name())?;
                for (i, (field, value)) in schema.fields().iter().zip(fields).enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} = {}", field.name, value)?;
                }
                write!(f, "}}")
            }
            Value::List { items, .. } => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arith_wraps() {
        let a = Value::int(IntType::U8, 250);
        let b = Value::int(IntType::U8, 10);
        assert_eq!(Value::arith(ArithOp::Add, &a, &b), Some(Value::int(IntType::U8, 4)));
        assert_eq!(Value::arith(ArithOp::Sub, &b, &a), Some(Value::int(IntType::U8, 16)));

        let x = Value::int(IntType::I8, 127);
        let one = Value::int(IntType::I8, 1);
        let res = Value::arith(ArithOp::Add, &x, &one).unwrap();
        assert_eq!(res.as_int(), Some(-128));
    }

    #[test]
    fn test_arith_bigint_does_not_wrap() {
        let a = Value::big(u64::MAX);
        let b = Value::big(1);
        let res = Value::arith(ArithOp::Add, &a, &b).unwrap();
        assert_eq!(res.as_big(), Some(BigInt::from(u64::MAX) + 1));
    }

    #[test]
    fn test_compare_signedness() {
        let a = Value::int(IntType::I8, -1);
        let b = Value::int(IntType::I8, 1);
        assert_eq!(Value::compare(CmpOp::Lt, &a, &b), Some(true));

        // the same bit patterns as unsigned values: 255 > 1
        let a = Value::int(IntType::U8, 0xff);
        let b = Value::int(IntType::U8, 1);
        assert_eq!(Value::compare(CmpOp::Lt, &a, &b), Some(false));
        assert_eq!(Value::compare(CmpOp::Geq, &a, &b), Some(true));
    }

    #[test]
    fn test_compare_mismatched_types() {
        let a = Value::int(IntType::I8, 1);
        let b = Value::int(IntType::U8, 1);
        assert_eq!(Value::compare(CmpOp::Lt, &a, &b), None);
    }

    #[test]
    fn test_cast() {
        let x = Value::int(IntType::I8, -1);
        assert_eq!(x.cast(&Type::int(IntType::U16)), Some(Value::int(IntType::U16, 0xffff)));
        assert_eq!(x.cast(&Type::BigInt), Some(Value::big(-1)));
        let y = Value::int(IntType::U8, 0xff);
        assert_eq!(y.cast(&Type::int(IntType::I32)), Some(Value::i32(255)));
        let big = Value::big(-2);
        assert_eq!(big.cast(&Type::int(IntType::U8)), Some(Value::int(IntType::U8, 0xfe)));
        assert_eq!(Value::Bool(true).cast(&Type::BigInt), None);
    }

    #[test]
    fn test_bit_not() {
        let x = Value::int(IntType::U8, 0x0f);
        assert_eq!(x.bit_not(), Some(Value::int(IntType::U8, 0xf0)));
        assert_eq!(Value::big(5).bit_not(), Some(Value::big(-6)));
    }

    #[test]
    fn test_default_values() {
        let schema = ObjectSchema::new("P", [("a", Type::Bool), ("b", Type::int(IntType::U32))]).unwrap();
        let value = Value::default_for(&Type::object(&schema));
        assert_eq!(value.fields(), Some(&[Value::Bool(false), Value::u32(0)][..]));
        let list = Value::default_for(&Type::list(Type::Bool));
        assert_eq!(list.items(), Some(&[][..]));
    }

    #[test]
    fn test_list_checks_element_type() {
        assert!(Value::list(Type::Bool, vec![Value::Bool(true), Value::u32(1)]).is_err());
        assert!(Value::list(Type::Bool, vec![Value::Bool(true)]).is_ok());
    }

    #[test]
    fn test_list_tail_shares_storage() {
        let items = ListItems::new(vec![Value::u8(1), Value::u8(2), Value::u8(3)]);
        let (head, tail) = items.split_first().unwrap();
        assert_eq!(head, &Value::u8(1));
        assert_eq!(tail.as_slice(), &[Value::u8(2), Value::u8(3)][..]);
        assert_eq!(tail.storage_key().0, items.storage_key().0);

        // Equality is by content.
        assert_eq!(tail, ListItems::new(vec![Value::u8(2), Value::u8(3)]));
        let (_, tail) = tail.split_first().unwrap();
        let (_, tail) = tail.split_first().unwrap();
        assert!(tail.is_empty());
        assert_eq!(tail, ListItems::empty());
        assert!(tail.split_first().is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::i32(-3).to_string(), "-3i32");
        let list = Value::list(Type::int(IntType::U8), vec![Value::u8(1), Value::u8(2)]).unwrap();
        assert_eq!(list.to_string(), "[1u8, 2u8]");
    }
}
