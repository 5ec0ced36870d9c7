use crate::layout::Step;
use crate::{ColumnType, Param};

use stowage_core::{Element, Error, Member, Object, Result, Value};

/// Appends the row values of `object` in layout column order.
pub(crate) fn object_values(object: &Object, null: bool, out: &mut Vec<Param>) {
    for member in object.members() {
        match member {
            Member::Field(field) => out.push(Param {
                value: if null {
                    Value::Null
                } else {
                    field.stored_value()
                },
                ty: ColumnType::from_meta(field.meta()),
            }),
            Member::Object(nested) => {
                let null = null || nested.is_null();
                if nested.is_nullable() {
                    out.push(presence(null));
                }
                object_values(nested, null, out)
            }
            Member::Group(group) if group.is_nullable() => out.push(Param {
                value: if null || group.is_null() {
                    Value::Null
                } else {
                    Value::I64(group.len() as i64)
                },
                ty: ColumnType::Integer,
            }),
            Member::Group(_) => {}
        }
    }
}

pub(crate) fn element_values(element: &Element, out: &mut Vec<Param>) {
    match element {
        Element::Object(object) => {
            if object.is_nullable() {
                out.push(presence(object.is_null()));
            }
            object_values(object, object.is_null(), out)
        }
        Element::Field(field) => out.push(Param {
            value: field.stored_value(),
            ty: ColumnType::from_meta(field.meta()),
        }),
    }
}

/// Value of a nullable object's presence column.
fn presence(null: bool) -> Param {
    Param {
        value: if null { Value::Null } else { Value::Bool(true) },
        ty: ColumnType::Boolean,
    }
}

/// Populates `object` from row values in layout column order.
pub(crate) fn read_object(object: &mut Object, values: &mut impl Iterator<Item = Value>) -> Result<()> {
    for member in object.members_mut() {
        match member {
            Member::Field(field) => field.load(next_value(values)?)?,
            Member::Object(nested) => read_nested(nested, values)?,
            Member::Group(group) if group.is_nullable() => {
                group.set_null(next_value(values)?.is_null());
            }
            Member::Group(_) => {}
        }
    }
    Ok(())
}

pub(crate) fn read_element(element: &mut Element, values: &mut impl Iterator<Item = Value>) -> Result<()> {
    match element {
        Element::Object(object) => read_nested(object, values)?,
        Element::Field(field) => field.load(next_value(values)?)?,
    }
    Ok(())
}

/// Reads a nested or element object, preceded by its presence column when
/// it is nullable.
fn read_nested(object: &mut Object, values: &mut impl Iterator<Item = Value>) -> Result<()> {
    let null = object.is_nullable() && next_value(values)?.is_null();
    read_object(object, values)?;
    if null {
        object.set_null(true);
    }
    Ok(())
}

fn next_value(values: &mut impl Iterator<Item = Value>) -> Result<Value> {
    values
        .next()
        .ok_or_else(|| Error::invalid_object("row has fewer columns than the layout"))
}

/// Elements stored in the table at `path`, with their index at each group level.
pub(crate) fn elements_at<'a>(
    object: &'a Object,
    path: &[Step],
    index: &mut Vec<usize>,
    out: &mut Vec<(Vec<usize>, &'a Element)>,
) {
    let Some((step, rest)) = path.split_first() else {
        return;
    };

    match step {
        Step::Object(name) => {
            if let Some(nested) = object.object(name).filter(|nested| !nested.is_null()) {
                elements_at(nested, rest, index, out);
            }
        }
        Step::Group(name) => {
            let Some(group) = object.group(name).filter(|group| !group.is_null()) else {
                return;
            };

            for (i, element) in group.iter().enumerate() {
                index.push(i);
                if rest.is_empty() {
                    out.push((index.clone(), element));
                } else if let Element::Object(nested) = element {
                    elements_at(nested, rest, index, out);
                }
                index.pop();
            }
        }
    }
}

/// The element a child row at `index` populates, appending it if the group
/// has not reached that position yet.
pub(crate) fn element_for_row<'a>(
    object: &'a mut Object,
    path: &[Step],
    index: &[usize],
) -> Result<&'a mut Element> {
    let Some((step, rest)) = path.split_first() else {
        return Err(Error::invalid_object("child row without a group path"));
    };

    match step {
        Step::Object(name) => element_for_row(object.expect_object_mut(name)?, rest, index),
        Step::Group(name) => {
            let group = object.expect_group_mut(name)?;
            let Some((&i, rest_index)) = index.split_first() else {
                return Err(Error::invalid_object(format!("missing index for group `{name}`")));
            };

            if rest.is_empty() {
                while group.len() <= i {
                    group.push();
                }
            }

            let element = group
                .get_mut(i)
                .ok_or_else(|| Error::invalid_object(format!("group `{name}` has no element {i}")))?;

            if rest.is_empty() {
                return Ok(element);
            }

            match element {
                Element::Object(nested) => element_for_row(nested, rest, rest_index),
                Element::Field(_) => Err(Error::invalid_object(format!(
                    "group `{name}` holds scalars, not objects"
                ))),
            }
        }
    }
}
