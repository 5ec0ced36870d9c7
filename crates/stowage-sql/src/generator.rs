use crate::layout::{self, Column, Layout, Table};
use crate::serializer::{And, Bind, Comma, Formatter, Ident, Qualified, ToSql};
use crate::{rows, ColumnType, Flavor, Param, Row, Statement, Target};

use stowage_core::driver::QueryOptions;
use stowage_core::object::visit::{self, Visit};
use stowage_core::{err, Field, Member, Object, Result, Value, Version};

use std::collections::VecDeque;

/// Statement family a generator pass produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Create,
    Drop,
    Insert,
    Update,
    Delete,
    Select,
}

/// Row selection for a query.
#[derive(Debug, Clone, Copy)]
pub enum Filter<'a> {
    /// Backend-native condition text; empty selects everything.
    Text(&'a str),
    /// Equality on every modified field plus every non-null key field.
    Example,
}

/// Turns an object into the statements of one pass.
///
/// A pass starts with [`begin`](Self::begin), which queues the statement for
/// the outermost table followed by one statement per child table and, when
/// writing, one per group element. The caller drains the queue with
/// [`next_statement`](Self::next_statement) until [`eof`](Self::eof).
#[derive(Debug)]
pub struct SqlGenerator {
    flavor: Flavor,
    schema: Option<String>,
    layout: Layout,
    queue: VecDeque<Statement>,
}

impl SqlGenerator {
    /// `schema` qualifies table names on dialects that have schemas.
    pub fn new(flavor: Flavor, schema: Option<&str>, object: &Object) -> SqlGenerator {
        SqlGenerator {
            flavor,
            schema: schema
                .filter(|schema| flavor.supports_schemas() && !schema.is_empty())
                .map(str::to_string),
            layout: Layout::new(object),
            queue: VecDeque::new(),
        }
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Queues the statements of `pass`, outermost table first.
    pub fn begin(&mut self, pass: Pass, object: &Object) -> Result<()> {
        self.queue.clear();
        let root = self.root_statement(pass, object)?;
        self.queue.push_back(root);
        self.queue_children(pass, object)
    }

    /// Queues only the child-table statements of `pass`.
    pub fn begin_children(&mut self, pass: Pass, object: &Object) -> Result<()> {
        self.queue.clear();
        self.queue_children(pass, object)
    }

    /// True when no statement of the current pass is pending.
    pub fn eof(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn next_statement(&mut self) -> Result<Statement> {
        self.queue
            .pop_front()
            .ok_or_else(|| err!("no statement pending"))
    }

    /// `CREATE SCHEMA` for a qualified layout, if one is needed.
    pub fn schema_statement(&self) -> Option<String> {
        let schema = self.schema.as_deref()?;
        let mut f = Formatter::new(self.flavor);
        fmt!(&mut f, "CREATE SCHEMA IF NOT EXISTS " Ident(schema));
        Some(f.finish().sql)
    }

    /// The statement of `pass` for the outermost table.
    pub fn root_statement(&self, pass: Pass, object: &Object) -> Result<Statement> {
        let table = self.layout.root();
        let mut f = Formatter::new(self.flavor);

        match pass {
            Pass::Create => {
                let keys = self.layout.key_columns().iter().map(|c| Ident(&c.name));
                fmt!(&mut f, "CREATE TABLE IF NOT EXISTS " self.table(table) " ("
                    Comma(table.columns.iter().map(|c| ColumnDef(self.flavor, c)))
                    ", PRIMARY KEY (" Comma(keys) "))");
                Ok(f.finish())
            }
            Pass::Drop => {
                fmt!(&mut f, "DROP TABLE IF EXISTS " self.table(table));
                Ok(f.finish())
            }
            Pass::Insert => {
                let mut values = vec![];
                rows::object_values(object, false, &mut values);
                if let Some(next) = object.next_version()? {
                    self.replace_version(&mut values, next);
                }

                fmt!(&mut f, "INSERT INTO " self.table(table) " ("
                    Comma(table.columns.iter().map(|c| Ident(&c.name)))
                    ") VALUES (" Comma(values.into_iter().map(Bind)) ")");
                Ok(f.finish())
            }
            Pass::Update => self.update_root(object),
            Pass::Delete => {
                fmt!(&mut f, "DELETE FROM " self.table(table) " WHERE " self.key_condition(object, false));
                if let Version::Existing(version) = object.version()? {
                    self.version_condition(&mut f, version);
                }
                Ok(f.finish())
            }
            Pass::Select => {
                fmt!(&mut f, "SELECT " Comma(table.columns.iter().map(|c| Ident(&c.name)))
                    " FROM " self.table(table) " WHERE " self.key_condition(object, false));
                let mut stmt = f.finish();
                stmt.columns = table.columns.iter().map(|c| c.ty).collect();
                stmt.target = Target::Table(0);
                Ok(stmt)
            }
        }
    }

    /// Reads the version a fallback update stored.
    pub fn version_statement(&self, object: &Object) -> Result<Statement> {
        let column = self
            .layout
            .version_column()
            .ok_or_else(|| err!("{} has no version field", object.type_name()))?;

        let mut f = Formatter::new(self.flavor);
        fmt!(&mut f, "SELECT " Ident(column) " FROM " self.table(self.layout.root())
            " WHERE " self.key_condition(object, false));
        let mut stmt = f.finish();
        stmt.columns = vec![ColumnType::BigInt];
        stmt.target = Target::Scalar;
        Ok(stmt)
    }

    /// Selects outermost rows for a cursor, or counts them.
    pub fn query_statement(
        &self,
        object: &Object,
        filter: Filter<'_>,
        options: &QueryOptions,
    ) -> Result<Statement> {
        let table = self.layout.root();
        let mut f = Formatter::new(self.flavor);

        let select = |f: &mut Formatter| {
            fmt!(f, " FROM " self.table(table));
            self.filter_condition(f, object, filter);
        };

        if options.count_only {
            if options.skip > 0 || options.limit.is_some() {
                fmt!(&mut f, "SELECT COUNT(*) FROM (SELECT 1");
                select(&mut f);
                self.limit(&mut f, options);
                fmt!(&mut f, ") AS counted");
            } else {
                fmt!(&mut f, "SELECT COUNT(*)");
                select(&mut f);
            }

            let mut stmt = f.finish();
            stmt.columns = vec![ColumnType::BigInt];
            stmt.target = Target::Scalar;
            return Ok(stmt);
        }

        fmt!(&mut f, "SELECT " Comma(table.columns.iter().map(|c| Ident(&c.name))));
        select(&mut f);
        if !self.layout.key_columns().is_empty() {
            fmt!(&mut f, " ORDER BY " Comma(self.layout.key_columns().iter().map(|c| Ident(&c.name))));
        }
        self.limit(&mut f, options);

        let mut stmt = f.finish();
        stmt.columns = table.columns.iter().map(|c| c.ty).collect();
        stmt.target = Target::Table(0);
        Ok(stmt)
    }

    /// Populates `object` from a row returned by a statement of this generator.
    pub fn read_row(&self, object: &mut Object, target: Target, row: Row) -> Result<()> {
        let Target::Table(index) = target else {
            return Err(err!("statement does not return object rows"));
        };
        let table = self
            .layout
            .tables()
            .get(index)
            .ok_or_else(|| err!("no table {index} in layout"))?;

        let mut values = row.into_iter();
        if table.is_root() {
            rows::read_object(object, &mut values)?;
            return Ok(());
        }

        let mut position = Vec::with_capacity(table.depth());
        for column in &table.index_columns {
            let value = values
                .next()
                .ok_or_else(|| err!("row is missing index column `{column}`"))?;
            let index = value
                .as_u64()
                .and_then(|index| usize::try_from(index).ok())
                .ok_or_else(|| err!("invalid value {value} in index column `{column}`"))?;
            position.push(index);
        }

        let element = rows::element_for_row(object, &table.path, &position)?;
        rows::read_element(element, &mut values)
    }

    fn queue_children(&mut self, pass: Pass, object: &Object) -> Result<()> {
        let mut queue = VecDeque::new();

        for (index, table) in self.layout.tables().iter().enumerate().skip(1) {
            match pass {
                Pass::Create => queue.push_back(self.create_child(table)),
                Pass::Drop => {
                    let mut f = Formatter::new(self.flavor);
                    fmt!(&mut f, "DROP TABLE IF EXISTS " self.table(table));
                    queue.push_back(f.finish());
                }
                Pass::Delete => queue.push_back(self.delete_children(table, object)),
                Pass::Select => queue.push_back(self.select_children(index, table, object)),
                Pass::Insert | Pass::Update => {
                    queue.push_back(self.delete_children(table, object));

                    let mut elements = vec![];
                    rows::elements_at(object, &table.path, &mut vec![], &mut elements);
                    for (position, element) in elements {
                        let mut f = Formatter::new(self.flavor);
                        let mut values = self.owner_keys(object);
                        values.extend(position.iter().map(|i| Param {
                            value: Value::I64(*i as i64),
                            ty: ColumnType::Integer,
                        }));
                        rows::element_values(element, &mut values);

                        let columns = self
                            .layout
                            .owner_key_columns()
                            .map(|c| c.name)
                            .chain(table.index_columns.iter().cloned())
                            .chain(table.columns.iter().map(|c| c.name.clone()))
                            .collect::<Vec<_>>();

                        fmt!(&mut f, "INSERT INTO " self.table(table) " ("
                            Comma(columns.iter().map(Ident)) ") VALUES ("
                            Comma(values.into_iter().map(Bind)) ")");
                        queue.push_back(f.finish());
                    }
                }
            }
        }

        self.queue.extend(queue);
        Ok(())
    }

    fn create_child(&self, table: &Table) -> Statement {
        let owner_keys = self.layout.owner_key_columns().collect::<Vec<_>>();
        let index_columns = table
            .index_columns
            .iter()
            .map(|name| Column {
                name: name.clone(),
                ty: ColumnType::Integer,
                nullable: false,
            })
            .collect::<Vec<_>>();

        let defs = owner_keys
            .iter()
            .chain(index_columns.iter())
            .chain(table.columns.iter())
            .map(|c| ColumnDef(self.flavor, c));
        let primary = owner_keys
            .iter()
            .chain(index_columns.iter())
            .map(|c| Ident(&c.name));

        let mut f = Formatter::new(self.flavor);
        fmt!(&mut f, "CREATE TABLE IF NOT EXISTS " self.table(table) " (" Comma(defs)
            ", PRIMARY KEY (" Comma(primary) "))");
        f.finish()
    }

    fn delete_children(&self, table: &Table, object: &Object) -> Statement {
        let mut f = Formatter::new(self.flavor);
        fmt!(&mut f, "DELETE FROM " self.table(table) " WHERE " self.key_condition(object, true));
        f.finish()
    }

    fn select_children(&self, index: usize, table: &Table, object: &Object) -> Statement {
        let columns = table
            .index_columns
            .iter()
            .cloned()
            .chain(table.columns.iter().map(|c| c.name.clone()))
            .collect::<Vec<_>>();

        let mut f = Formatter::new(self.flavor);
        fmt!(&mut f, "SELECT " Comma(columns.iter().map(Ident)) " FROM " self.table(table)
            " WHERE " self.key_condition(object, true)
            " ORDER BY " Comma(table.index_columns.iter().map(Ident)));

        let mut stmt = f.finish();
        stmt.columns = table
            .index_columns
            .iter()
            .map(|_| ColumnType::Integer)
            .chain(table.columns.iter().map(|c| c.ty))
            .collect();
        stmt.target = Target::Table(index);
        stmt
    }

    fn update_root(&self, object: &Object) -> Result<Statement> {
        let table = self.layout.root();
        let version_column = self.layout.version_column();
        let is_key = |name: &str| self.layout.key_columns().iter().any(|c| c.name == name);

        let mut values = vec![];
        rows::object_values(object, false, &mut values);

        let mut assignments = table
            .columns
            .iter()
            .zip(values)
            .filter(|(c, _)| !is_key(&c.name) && Some(c.name.as_str()) != version_column)
            .map(|(c, value)| Assignment::Value(&c.name, value))
            .collect::<Vec<_>>();

        let version = object.version()?;
        match (version_column, version) {
            (Some(column), Version::Existing(_)) => {
                let next = object
                    .next_version()?
                    .ok_or_else(|| err!("{} has no version field", object.type_name()))?;
                assignments.push(Assignment::Value(
                    column,
                    Param {
                        value: Value::I64(next),
                        ty: ColumnType::BigInt,
                    },
                ));
            }
            (Some(column), _) => assignments.push(Assignment::Increment(column)),
            (None, _) => {}
        }

        if assignments.is_empty() {
            let key = self
                .layout
                .key_columns()
                .first()
                .ok_or_else(|| err!("{} has no key fields", object.type_name()))?;
            assignments.push(Assignment::Same(&key.name));
        }

        let mut f = Formatter::new(self.flavor);
        fmt!(&mut f, "UPDATE " self.table(table) " SET " Comma(assignments)
            " WHERE " self.key_condition(object, false));
        if let Version::Existing(current) = version {
            self.version_condition(&mut f, current);
        }
        Ok(f.finish())
    }

    fn table<'a>(&'a self, table: &'a Table) -> Qualified<'a> {
        Qualified(self.schema.as_deref(), &table.name)
    }

    fn owner_keys(&self, object: &Object) -> Vec<Param> {
        object
            .key_fields()
            .iter()
            .map(|field| Param {
                value: field.stored_value(),
                ty: ColumnType::from_meta(field.meta()),
            })
            .collect()
    }

    fn key_condition(&self, object: &Object, owner: bool) -> KeyCondition {
        let names = self
            .layout
            .key_columns()
            .iter()
            .map(|c| {
                if owner {
                    layout::owner_key_name(&c.name)
                } else {
                    c.name.clone()
                }
            })
            .collect();
        KeyCondition(names, self.owner_keys(object))
    }

    fn version_condition(&self, f: &mut Formatter, version: i64) {
        if let Some(column) = self.layout.version_column() {
            fmt!(f, " AND " Ident(column) " = " Bind(Param {
                value: Value::I64(version),
                ty: ColumnType::BigInt,
            }));
        }
    }

    fn replace_version(&self, values: &mut [Param], next: i64) {
        let Some(column) = self.layout.version_column() else {
            return;
        };
        let position = self
            .layout
            .root()
            .columns
            .iter()
            .position(|c| c.name == column);
        if let Some(param) = position.and_then(|i| values.get_mut(i)) {
            param.value = Value::I64(next);
        }
    }

    fn filter_condition(&self, f: &mut Formatter, object: &Object, filter: Filter<'_>) {
        match filter {
            Filter::Text(text) if text.trim().is_empty() => {}
            Filter::Text(text) => fmt!(f, " WHERE (" text ")"),
            Filter::Example => {
                let example = object.visit(Example::default());
                if !example.terms.is_empty() {
                    fmt!(f, " WHERE " And(example.terms));
                }
            }
        }
    }

    fn limit(&self, f: &mut Formatter, options: &QueryOptions) {
        match (options.limit, options.skip, self.flavor) {
            (Some(limit), _, _) => fmt!(f, " LIMIT " limit.to_string()),
            (None, skip, Flavor::Sqlite) if skip > 0 => fmt!(f, " LIMIT -1"),
            _ => {}
        }
        if options.skip > 0 {
            fmt!(f, " OFFSET " options.skip.to_string());
        }
    }
}

struct ColumnDef<'a>(Flavor, &'a Column);

impl ToSql for ColumnDef<'_> {
    fn to_sql(self, f: &mut Formatter) {
        fmt!(f, Ident(&self.1.name) " " self.1.ty.sql_name(self.0));
        if !self.1.nullable {
            fmt!(f, " NOT NULL");
        }
    }
}

enum Assignment<'a> {
    Value(&'a str, Param),
    Increment(&'a str),
    Same(&'a str),
}

impl ToSql for Assignment<'_> {
    fn to_sql(self, f: &mut Formatter) {
        match self {
            Assignment::Value(name, param) => fmt!(f, Ident(name) " = " Bind(param)),
            Assignment::Increment(name) => fmt!(f, Ident(name) " = " Ident(name) " + 1"),
            Assignment::Same(name) => fmt!(f, Ident(name) " = " Ident(name)),
        }
    }
}

struct KeyCondition(Vec<String>, Vec<Param>);

impl ToSql for KeyCondition {
    fn to_sql(self, f: &mut Formatter) {
        let terms = self
            .0
            .into_iter()
            .zip(self.1)
            .map(|(name, param)| Equals(name, param));
        fmt!(f, And(terms));
    }
}

struct Equals(String, Param);

impl ToSql for Equals {
    fn to_sql(self, f: &mut Formatter) {
        if self.1.value.is_null() {
            fmt!(f, Ident(&self.0) " IS NULL");
        } else {
            fmt!(f, Ident(&self.0) " = " Bind(self.1));
        }
    }
}

/// Collects the query-by-example terms of the outermost row.
#[derive(Default)]
struct Example {
    prefix: Vec<String>,
    terms: Vec<Equals>,
}

impl Visit for Example {
    fn visit_member(&mut self, node: &Member) {
        match node {
            Member::Field(field) => self.visit_field(field),
            Member::Object(object) => {
                self.prefix.push(format!("{}_", object.name()));
                visit::visit_object(self, object);
                self.prefix.pop();
            }
            // Groups live in child tables.
            Member::Group(_) => {}
        }
    }

    fn visit_field(&mut self, node: &Field) {
        if node.is_modified() || (node.is_key() && !node.is_null()) {
            self.terms.push(Equals(
                format!("{}{}", self.prefix.concat(), node.name()),
                Param {
                    value: node.value().clone(),
                    ty: ColumnType::from_meta(node.meta()),
                },
            ));
        }
    }
}
