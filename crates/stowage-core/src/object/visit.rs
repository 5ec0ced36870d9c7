#![allow(unused_variables)]

use super::{Element, Field, Member, Object, RepeatedGroup};

/// Depth-first traversal over an object tree.
///
/// Every method defaults to walking into its children, so an implementation
/// only overrides the nodes it cares about.
pub trait Visit {
    fn visit_object(&mut self, node: &Object) {
        visit_object(self, node);
    }

    fn visit_member(&mut self, node: &Member) {
        visit_member(self, node);
    }

    fn visit_field(&mut self, node: &Field) {}

    fn visit_group(&mut self, node: &RepeatedGroup) {
        visit_group(self, node);
    }

    fn visit_element(&mut self, node: &Element) {
        visit_element(self, node);
    }
}

impl<V: Visit> Visit for &mut V {
    fn visit_object(&mut self, node: &Object) {
        Visit::visit_object(&mut **self, node);
    }

    fn visit_member(&mut self, node: &Member) {
        Visit::visit_member(&mut **self, node);
    }

    fn visit_field(&mut self, node: &Field) {
        Visit::visit_field(&mut **self, node);
    }

    fn visit_group(&mut self, node: &RepeatedGroup) {
        Visit::visit_group(&mut **self, node);
    }

    fn visit_element(&mut self, node: &Element) {
        Visit::visit_element(&mut **self, node);
    }
}

pub fn visit_object<V>(v: &mut V, node: &Object)
where
    V: Visit + ?Sized,
{
    for member in node.members() {
        v.visit_member(member);
    }
}

pub fn visit_member<V>(v: &mut V, node: &Member)
where
    V: Visit + ?Sized,
{
    match node {
        Member::Field(field) => v.visit_field(field),
        Member::Object(object) => v.visit_object(object),
        Member::Group(group) => v.visit_group(group),
    }
}

pub fn visit_group<V>(v: &mut V, node: &RepeatedGroup)
where
    V: Visit + ?Sized,
{
    for element in node {
        v.visit_element(element);
    }
}

pub fn visit_element<V>(v: &mut V, node: &Element)
where
    V: Visit + ?Sized,
{
    match node {
        Element::Object(object) => v.visit_object(object),
        Element::Field(field) => v.visit_field(field),
    }
}

/// Calls `f` for every field in the tree, group elements included.
pub fn for_each_field<'a, F>(node: &'a Object, f: F)
where
    F: FnMut(&'a Field),
{
    fn walk<'a>(node: &'a Object, f: &mut impl FnMut(&'a Field)) {
        for member in node.members() {
            match member {
                Member::Field(field) => f(field),
                Member::Object(object) => walk(object, f),
                Member::Group(group) => {
                    for element in group {
                        match element {
                            Element::Object(object) => walk(object, f),
                            Element::Field(field) => f(field),
                        }
                    }
                }
            }
        }
    }

    let mut f = f;
    walk(node, &mut f);
}

/// Calls `f` for each key field of the outermost object, in key-ordinal order.
pub fn for_each_key_field<'a, F>(node: &'a Object, mut f: F)
where
    F: FnMut(&'a Field),
{
    let mut keys = node
        .members()
        .iter()
        .filter_map(|member| match member {
            Member::Field(field) if field.is_key() => Some(field),
            _ => None,
        })
        .collect::<Vec<_>>();
    keys.sort_by_key(|field| field.key());

    for field in keys {
        f(field);
    }
}
