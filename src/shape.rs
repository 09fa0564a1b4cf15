//! Binding host structs to object schemas.
//!
//! A [`Shape`] pairs an [`ObjectSchema`] with one getter and one setter per
//! field, so host values can be turned into object constants and
//! interpreted objects turned back into host values. Field order is the
//! order of the accessors.
//!
//! ```
//! use zen_rs::shape::{FieldAccessor, Shape};
//! use zen_rs::types::{IntType, Type};
//! use zen_rs::value::Value;
//!
//! #[derive(Default, Debug, PartialEq)]
//! struct Packet {
//!     port: u32,
//!     urgent: bool,
//! }
//!
//! let shape = Shape::new(
//!     "Packet",
//!     vec![
//!         FieldAccessor::new("port", Type::int(IntType::U32), |p: &Packet| Value::u32(p.port), |p, v| {
//!             p.port = v.as_int().unwrap_or_default() as u32
//!         }),
//!         FieldAccessor::new("urgent", Type::Bool, |p: &Packet| Value::Bool(p.urgent), |p, v| {
//!             p.urgent = v.as_bool().unwrap_or_default()
//!         }),
//!     ],
//! )
//! .unwrap();
//!
//! let packet = Packet { port: 80, urgent: true };
//! let value = shape.to_value(&packet).unwrap();
//! assert_eq!(shape.from_value(&value).unwrap(), packet);
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::{ExprError, Result};
use crate::node::{mk_arbitrary, mk_constant, Expr};
use crate::types::{ObjectSchema, Type};
use crate::value::Value;

pub struct FieldAccessor<T> {
    name: String,
    ty: Type,
    get: fn(&T) -> Value,
    set: fn(&mut T, Value),
}

impl<T> FieldAccessor<T> {
    pub fn new(name: impl Into<String>, ty: Type, get: fn(&T) -> Value, set: fn(&mut T, Value)) -> Self {
        Self {
            name: name.into(),
            ty,
            get,
            set,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }
}

pub struct Shape<T> {
    schema: Arc<ObjectSchema>,
    accessors: Vec<FieldAccessor<T>>,
}

impl<T> Shape<T> {
    pub fn new(name: impl Into<String>, accessors: Vec<FieldAccessor<T>>) -> Result<Self> {
        let schema = ObjectSchema::new(name, accessors.iter().map(|a| (a.name.clone(), a.ty.clone())))?;
        Ok(Self { schema, accessors })
    }

    pub fn schema(&self) -> &Arc<ObjectSchema> {
        &self.schema
    }

    pub fn ty(&self) -> Type {
        Type::object(&self.schema)
    }

    /// Convert a host value into an object value, checking each getter's result type.
    pub fn to_value(&self, host: &T) -> Result<Value> {
        let fields = self.accessors.iter().map(|a| (a.get)(host)).collect();
        Value::object(&self.schema, fields)
    }

    /// Object constant holding `host`.
    pub fn constant(&self, host: &T) -> Result<Expr> {
        Ok(mk_constant(self.to_value(host)?))
    }

    /// Fresh symbolic object of this shape.
    pub fn arbitrary(&self) -> Expr {
        mk_arbitrary(self.ty())
    }

    /// Rebuild a host value from an object value of this shape.
    pub fn from_value(&self, value: &Value) -> Result<T>
    where
        T: Default,
    {
        let ty = self.ty();
        let fields = match value {
            Value::Object { fields, .. } if value.ty() == ty => fields,
            _ => return Err(ExprError::mismatch("shape", &ty, value.ty())),
        };
        let mut host = T::default();
        for (accessor, field) in self.accessors.iter().zip(fields) {
            (accessor.set)(&mut host, field.clone());
        }
        Ok(host)
    }
}

impl<T> fmt::Debug for Shape<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shape").field("schema", &self.schema).finish()
    }
}
