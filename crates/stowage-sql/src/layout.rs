//! Table layout of an object type.
//!
//! The outermost object maps to one table. Nested objects are flattened into
//! the row that owns them, with `{object}_{field}` column names. Every repeated
//! group gets a child table named `{owner table}_{group}` keyed by the
//! outermost object's key columns (as `owner_{key}`) plus one `{group}_idx`
//! column per enclosing group level. Nullable groups also get an integer
//! column in the owning row holding the element count, NULL when the group
//! itself is null. Nullable nested objects get a boolean presence column
//! named after the object, NULL when the object is null.

use crate::ColumnType;

use stowage_core::{Element, Member, Object, RepeatedGroup};

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
    pub nullable: bool,
}

/// One navigation step from the outermost object toward a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Object(String),
    Group(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,

    /// Path from the outermost object to the group stored in this table.
    /// Empty for the outermost table.
    pub path: Vec<Step>,

    pub index_columns: Vec<String>,

    /// Data columns in read/write order.
    pub columns: Vec<Column>,
}

impl Table {
    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Number of enclosing group levels.
    pub fn depth(&self) -> usize {
        self.index_columns.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    tables: Vec<Table>,
    key_columns: Vec<Column>,
    version_column: Option<String>,
}

impl Layout {
    pub fn new(object: &Object) -> Layout {
        let key_columns = object
            .key_fields()
            .iter()
            .map(|field| Column {
                name: field.name().to_string(),
                ty: ColumnType::from_meta(field.meta()),
                nullable: false,
            })
            .collect();

        let mut layout = Layout {
            tables: vec![],
            key_columns,
            version_column: object.version_field().map(|field| field.name().to_string()),
        };
        layout.add_table(
            object.backend_name().to_string(),
            vec![],
            vec![],
            Source::Object(object),
        );
        layout
    }

    pub fn root(&self) -> &Table {
        &self.tables[0]
    }

    /// All tables, outermost first, children after their owner.
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Key columns of the outermost table, in key order.
    pub fn key_columns(&self) -> &[Column] {
        &self.key_columns
    }

    /// Key columns as they appear in child tables.
    pub fn owner_key_columns(&self) -> impl Iterator<Item = Column> + '_ {
        self.key_columns.iter().map(|column| Column {
            name: owner_key_name(&column.name),
            ty: column.ty,
            nullable: false,
        })
    }

    pub fn version_column(&self) -> Option<&str> {
        self.version_column.as_deref()
    }

    fn add_table(
        &mut self,
        name: String,
        path: Vec<Step>,
        index_columns: Vec<String>,
        source: Source<'_>,
    ) {
        let slot = self.tables.len();
        self.tables.push(Table {
            name: name.clone(),
            path: path.clone(),
            index_columns: index_columns.clone(),
            columns: vec![],
        });

        let mut columns = vec![];
        let mut groups = vec![];
        match source {
            Source::Object(object) => {
                flatten(object, "", false, &mut vec![], &mut columns, &mut groups)
            }
            Source::Element(Element::Object(object)) => {
                if object.is_nullable() {
                    columns.push(presence_column(object.name().to_string()));
                }
                flatten(object, "", object.is_nullable(), &mut vec![], &mut columns, &mut groups)
            }
            Source::Element(Element::Field(field)) => columns.push(Column {
                name: field.name().to_string(),
                ty: ColumnType::from_meta(field.meta()),
                nullable: field.meta().is_nullable(),
            }),
        }
        self.tables[slot].columns = columns;

        for nested in groups {
            let mut child_path = path.clone();
            child_path.extend(nested.path);
            child_path.push(Step::Group(nested.group.name().to_string()));

            let mut child_index = index_columns.clone();
            child_index.push(format!("{}_idx", nested.group.name()));

            self.add_table(
                format!("{name}_{}{}", nested.prefix, nested.group.name()),
                child_path,
                child_index,
                Source::Element(nested.group.template()),
            );
        }
    }
}

fn presence_column(name: String) -> Column {
    Column {
        name,
        ty: ColumnType::Boolean,
        nullable: true,
    }
}

pub(crate) fn owner_key_name(key: &str) -> String {
    format!("owner_{key}")
}

enum Source<'a> {
    Object(&'a Object),
    Element(&'a Element),
}

struct NestedGroup<'a> {
    path: Vec<Step>,
    prefix: String,
    group: &'a RepeatedGroup,
}

fn flatten<'a>(
    object: &'a Object,
    prefix: &str,
    nullable: bool,
    path: &mut Vec<Step>,
    columns: &mut Vec<Column>,
    groups: &mut Vec<NestedGroup<'a>>,
) {
    for member in object.members() {
        match member {
            Member::Field(field) => columns.push(Column {
                name: format!("{prefix}{}", field.name()),
                ty: ColumnType::from_meta(field.meta()),
                nullable: nullable || field.meta().is_nullable(),
            }),
            Member::Object(nested) => {
                if nested.is_nullable() {
                    columns.push(presence_column(format!("{prefix}{}", nested.name())));
                }
                path.push(Step::Object(nested.name().to_string()));
                flatten(
                    nested,
                    &format!("{prefix}{}_", nested.name()),
                    nullable || nested.is_nullable(),
                    path,
                    columns,
                    groups,
                );
                path.pop();
            }
            Member::Group(group) => {
                if group.is_nullable() {
                    columns.push(Column {
                        name: format!("{prefix}{}", group.name()),
                        ty: ColumnType::Integer,
                        nullable: true,
                    });
                }
                groups.push(NestedGroup {
                    path: path.clone(),
                    prefix: prefix.to_string(),
                    group,
                });
            }
        }
    }
}
