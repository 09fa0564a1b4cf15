//! Object construction and field access.
//!
//! Fields are resolved by name against the [`ObjectSchema`] of the object
//! type once, when the node is built; the node itself stores the field index.

use std::sync::Arc;

use log::debug;

use crate::error::{ExprError, Result};
use crate::node::{check_type, intern, mk_constant, tables, Expr, ExprKind};
use crate::types::{ObjectSchema, Type};
use crate::value::Value;

fn schema_of(op: &'static str, obj: &Expr) -> Result<Arc<ObjectSchema>> {
    obj.ty()
        .schema()
        .cloned()
        .ok_or_else(|| ExprError::unsupported(op, obj.ty()))
}

fn field_index(schema: &ObjectSchema, name: &str) -> Result<usize> {
    schema.field_index(name).ok_or_else(|| ExprError::UnknownField {
        ty: schema.name().to_string(),
        field: name.to_string(),
    })
}

fn check_index(schema: &ObjectSchema, index: usize) -> Result<()> {
    if index < schema.len() {
        Ok(())
    } else {
        Err(ExprError::UnknownField {
            ty: schema.name().to_string(),
            field: format!("#{}", index),
        })
    }
}

/// Build an object of the given schema from field expressions in schema order.
pub fn mk_create_object(schema: &Arc<ObjectSchema>, fields: &[Expr]) -> Result<Expr> {
    debug!("mk_create_object(schema = {}, fields = {})", schema.name(), fields.len());
    if fields.len() != schema.len() {
        return Err(ExprError::FieldCount {
            object: schema.name().to_string(),
            expected: schema.len(),
            found: fields.len(),
        });
    }
    for (field, expr) in schema.fields().iter().zip(fields) {
        check_type("create", expr, &field.ty)?;
    }

    let ty = Type::object(schema);
    if fields.iter().all(Expr::is_constant) {
        debug!("create(const..) => const");
        let values = fields.iter().filter_map(|e| e.as_constant().cloned()).collect();
        return Ok(mk_constant(Value::object(schema, values)?));
    }

    let key = (ty.clone(), fields.iter().map(Expr::id).collect::<Vec<_>>());
    let fields = fields.to_vec();
    Ok(intern(&tables().create_object, key, ty, || ExprKind::CreateObject(fields)))
}

/// Read the field called `name`.
pub fn mk_get_field(obj: &Expr, name: &str) -> Result<Expr> {
    let schema = schema_of("get", obj)?;
    let index = field_index(&schema, name)?;
    mk_get_field_at(obj, index)
}

/// Read the field at position `index` of the schema.
pub fn mk_get_field_at(obj: &Expr, index: usize) -> Result<Expr> {
    debug!("mk_get_field_at(obj = {}, index = {})", obj.id(), index);
    let schema = schema_of("get", obj)?;
    check_index(&schema, index)?;

    match obj.kind() {
        ExprKind::Constant(Value::Object { fields, .. }) => {
            debug!("get(const, f) => const");
            return Ok(mk_constant(fields[index].clone()));
        }
        ExprKind::CreateObject(fields) => {
            debug!("get(create(..), f) => field");
            return Ok(fields[index].clone());
        }
        ExprKind::WithField(inner, i, value) => {
            if *i == index {
                debug!("get(with(O,f,V), f) => V");
                return Ok(value.clone());
            }
            debug!("get(with(O,g,V), f) => get(O,f)");
            return mk_get_field_at(inner, index);
        }
        _ => {}
    }

    let ty = schema.fields()[index].ty.clone();
    let obj = obj.clone();
    Ok(intern(&tables().get_field, (obj.id(), index), ty, || {
        ExprKind::GetField(obj, index)
    }))
}

/// Copy of `obj` with the field called `name` replaced by `value`.
pub fn mk_with_field(obj: &Expr, name: &str, value: &Expr) -> Result<Expr> {
    let schema = schema_of("with", obj)?;
    let index = field_index(&schema, name)?;
    mk_with_field_at(obj, index, value)
}

pub fn mk_with_field_at(obj: &Expr, index: usize, value: &Expr) -> Result<Expr> {
    debug!("mk_with_field_at(obj = {}, index = {}, value = {})", obj.id(), index, value.id());
    let schema = schema_of("with", obj)?;
    check_index(&schema, index)?;
    check_type("with", value, &schema.fields()[index].ty)?;

    match obj.kind() {
        ExprKind::CreateObject(fields) => {
            debug!("with(create(..), f, V) => create(..)");
            let mut fields = fields.clone();
            fields[index] = value.clone();
            return mk_create_object(&schema, &fields);
        }
        ExprKind::Constant(Value::Object { fields, .. }) if value.is_constant() => {
            debug!("with(const, f, const) => const");
            let mut fields = fields.clone();
            if let Some(v) = value.as_constant() {
                fields[index] = v.clone();
            }
            return Ok(mk_constant(Value::object(&schema, fields)?));
        }
        ExprKind::WithField(inner, i, _) if *i == index => {
            debug!("with(with(O,f,_), f, V) => with(O,f,V)");
            return mk_with_field_at(inner, index, value);
        }
        _ => {}
    }
    if let ExprKind::GetField(source, i) = value.kind() {
        if source == obj && *i == index {
            debug!("with(O, f, get(O,f)) => O");
            return Ok(obj.clone());
        }
    }

    let ty = obj.ty().clone();
    let (obj, value) = (obj.clone(), value.clone());
    Ok(intern(&tables().with_field, (obj.id(), index, value.id()), ty, || {
        ExprKind::WithField(obj, index, value)
    }))
}
