use super::{Field, Object};
use crate::{Error, Result, Value};

/// One entry of a [`RepeatedGroup`].
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Object(Object),
    Field(Field),
}

impl Element {
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Element::Object(object) => Some(object),
            Element::Field(_) => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut Object> {
        match self {
            Element::Object(object) => Some(object),
            Element::Field(_) => None,
        }
    }

    pub fn as_field(&self) -> Option<&Field> {
        match self {
            Element::Field(field) => Some(field),
            Element::Object(_) => None,
        }
    }

    pub fn as_field_mut(&mut self) -> Option<&mut Field> {
        match self {
            Element::Field(field) => Some(field),
            Element::Object(_) => None,
        }
    }

    pub fn is_modified(&self) -> bool {
        match self {
            Element::Object(object) => object.is_modified(),
            Element::Field(field) => field.is_modified(),
        }
    }

    fn clear(&mut self) {
        match self {
            Element::Object(object) => object.clear(),
            Element::Field(field) => field.clear(),
        }
    }

    fn clear_modified(&mut self) {
        match self {
            Element::Object(object) => object.clear_modified(),
            Element::Field(field) => field.set_modified(false),
        }
    }
}

/// An ordered sequence of objects or scalars sharing one member name.
#[derive(Debug, Clone, PartialEq)]
pub struct RepeatedGroup {
    name: String,
    template: Box<Element>,
    elements: Vec<Element>,
    nullable: bool,
    null: bool,
    modified: bool,
}

impl RepeatedGroup {
    pub(crate) fn new(name: String, template: Element, nullable: bool) -> RepeatedGroup {
        RepeatedGroup {
            name,
            template: Box::new(template),
            elements: vec![],
            nullable,
            null: false,
            modified: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The empty element every pushed entry starts from.
    pub fn template(&self) -> &Element {
        &self.template
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Element> {
        self.elements.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Element> {
        self.elements.iter_mut()
    }

    pub fn get(&self, index: usize) -> Option<&Element> {
        self.elements.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Element> {
        self.elements.get_mut(index)
    }

    /// Appends an empty element and returns it.
    pub fn push(&mut self) -> &mut Element {
        let mut element = (*self.template).clone();
        element.clear();
        self.null = false;
        self.modified = true;
        self.elements.push(element);
        let last = self.elements.len() - 1;
        &mut self.elements[last]
    }

    /// Appends an empty object element. Fails for scalar groups.
    pub fn push_object(&mut self) -> Result<&mut Object> {
        if self.template.as_object().is_none() {
            return Err(Error::invalid_object(format!(
                "group `{}` holds scalars, not objects",
                self.name
            )));
        }
        let name = self.name.clone();
        self.push().as_object_mut().ok_or_else(|| {
            Error::invalid_object(format!("group `{name}` holds scalars, not objects"))
        })
    }

    /// Appends a scalar element. Fails for object groups.
    pub fn push_value(&mut self, value: impl Into<Value>) -> Result<()> {
        let mut field = match &*self.template {
            Element::Field(field) => field.clone(),
            Element::Object(_) => {
                return Err(Error::invalid_object(format!(
                    "group `{}` holds objects, not scalars",
                    self.name
                )))
            }
        };
        field.clear();
        field.set(value)?;
        self.null = false;
        self.modified = true;
        self.elements.push(Element::Field(field));
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Option<Element> {
        if index >= self.elements.len() {
            return None;
        }
        self.modified = true;
        Some(self.elements.remove(index))
    }

    /// Removes every element and marks the group modified.
    pub fn clear(&mut self) {
        self.elements.clear();
        self.modified = true;
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_null(&self) -> bool {
        self.null
    }

    pub fn set_null(&mut self, null: bool) {
        if null {
            self.elements.clear();
        }
        self.null = null;
        self.modified = true;
    }

    pub fn is_modified(&self) -> bool {
        self.modified || self.elements.iter().any(Element::is_modified)
    }

    pub(crate) fn clear_modified(&mut self) {
        self.modified = false;
        for element in &mut self.elements {
            element.clear_modified();
        }
    }

    pub(crate) fn reset(&mut self) {
        self.elements.clear();
        self.null = false;
        self.modified = false;
    }
}

impl<'a> IntoIterator for &'a RepeatedGroup {
    type Item = &'a Element;
    type IntoIter = std::slice::Iter<'a, Element>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}
