use std::sync::Arc;

use smol_str::SmolStr;

use crate::{
    dialect::Family,
    error::{Error, Result},
    fragment::Fragment,
    ident::{BASE_ALIASES, IntoIdent, SUBJECT_ALIASES, check_reserved, pick_alias},
    insert::{self, OnConflict},
    join::{self, JoinClause, JoinType},
    paginate::Paginator,
    settings::Settings,
    value::Value,
};

#[derive(Debug, Clone)]
pub(crate) enum Condition {
    Expression(Value),
    Pairs(Value),
}

impl Condition {
    fn parse(value: Value, what: &'static str, pairs: bool) -> Result<Self> {
        match value {
            Value::Str(_) | Value::Fragment(_) => Ok(Condition::Expression(value)),
            Value::Map(_) if pairs => Ok(Condition::Pairs(value)),
            other => Err(Error::usage(format!(
                "{what} must be a string, a fragment{}; got {}",
                if pairs { " or a map" } else { "" },
                other.type_name()
            ))),
        }
    }

    pub(crate) fn push(&self, fragment: &mut Fragment, qualifier: Option<&str>) {
        let (open, close, value) = match self {
            Condition::Expression(value) => ("(", ")", value),
            Condition::Pairs(value) => ("{", "&", value),
        };
        if let Some(qualifier) = qualifier {
            fragment.push_param(qualifier).push_sql(".");
        }
        fragment.push_sql(open).push_param(value.clone()).push_sql(close);
    }
}

pub(crate) fn push_ident(fragment: &mut Fragment, name: &str) {
    fragment.push_sql("\"").push_param(name).push_sql("\"");
}

pub(crate) fn push_table(fragment: &mut Fragment, table: &str, alias: Option<&str>) {
    push_ident(fragment, table);
    if let Some(alias) = alias {
        fragment.push_sql(" AS ");
        push_ident(fragment, alias);
    }
}

pub(crate) fn push_conjunction(fragment: &mut Fragment, first: &mut bool) {
    fragment.push_sql(if std::mem::take(first) { " WHERE " } else { " AND " });
}

fn push_items(fragment: &mut Fragment, items: &[SmolStr], qualifier: Option<&str>) {
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            fragment.push_sql(", ");
        }
        if let Some(qualifier) = qualifier {
            fragment.push_param(qualifier).push_sql(".");
        }
        fragment.push_param(item.clone());
    }
}

fn collect<I, S>(items: I) -> Vec<SmolStr>
where
    I: IntoIterator<Item = S>,
    S: Into<SmolStr>,
{
    items.into_iter().map(Into::into).collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Select {
    pub columns: Vec<SmolStr>,
    pub distinct: bool,
    pub order_by: Vec<SmolStr>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Select {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        self.columns = collect(columns);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn order_by<I, S>(mut self, order_by: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        self.order_by = collect(order_by);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn page(mut self, current_page: u64, per_page: u64) -> Self {
        let paginator = Paginator::page(current_page, per_page);
        self.limit = paginator.maybe_limit;
        self.offset = paginator.maybe_offset;
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) struct GroupBy {
    columns: Vec<SmolStr>,
    having: Option<Condition>,
}

#[derive(Debug, Clone)]
pub(crate) enum Operation {
    Select(Select),
    Insert { rows: Value, conflict: OnConflict },
    InsertFrom { columns: Vec<SmolStr>, source: Fragment },
    Update(Value),
    Delete,
    Truncate,
}

impl Operation {
    fn name(&self) -> &'static str {
        match self {
            Operation::Select(_) => "SELECT",
            Operation::Insert { .. } => "INSERT",
            Operation::InsertFrom { .. } => "INSERT ... SELECT",
            Operation::Update(_) => "UPDATE",
            Operation::Delete => "DELETE",
            Operation::Truncate => "TRUNCATE",
        }
    }
}

impl Settings {
    pub fn table<T: IntoIdent>(&self, name: T) -> Result<Builder> {
        Builder::new(self.clone(), name)
    }
}

/// Single-table statement builder. Calls go in SQL order: joins, conditions,
/// `GROUP BY`, then one staged operation.
#[derive(Debug, Clone)]
pub struct Builder {
    settings: Arc<Settings>,
    pub(crate) table: SmolStr,
    pub(crate) joins: Vec<JoinClause>,
    wheres: Vec<Condition>,
    group: Option<GroupBy>,
    op: Option<Operation>,
}

impl Builder {
    pub fn new<T: IntoIdent>(settings: impl Into<Arc<Settings>>, name: T) -> Result<Self> {
        let settings = settings.into();
        let name = name.into_ident();
        check_reserved(name.as_str())?;
        if name.is_empty() {
            return Err(Error::usage("table name is empty"));
        }
        let table = SmolStr::new(settings.map_table(name.as_str()));
        Ok(Self {
            settings,
            table,
            joins: Vec::new(),
            wheres: Vec::new(),
            group: None,
            op: None,
        })
    }

    #[inline]
    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn base_alias(&self) -> Result<Option<&'static str>> {
        if self.joins.is_empty() {
            return Ok(None);
        }
        pick_alias(&BASE_ALIASES, |alias| self.is_joined(alias)).map(Some)
    }

    pub(crate) fn subject_alias(&self, base: &str) -> Result<&'static str> {
        pick_alias(&SUBJECT_ALIASES, |alias| alias == base || self.is_joined(alias))
    }

    pub(crate) fn split_joins(&self) -> Result<(&JoinClause, &[JoinClause])> {
        self.joins
            .split_first()
            .ok_or_else(|| Error::usage("statement has no join"))
    }

    fn is_joined(&self, name: &str) -> bool {
        self.joins.iter().any(|join| join.name() == name)
    }

    fn check_unstaged(&self) -> Result<()> {
        match self.op {
            Some(ref op) => Err(Error::usage(format!(
                "{} is staged; build it before changing the statement",
                op.name()
            ))),
            None => Ok(()),
        }
    }

    fn add_join<T, A>(&mut self, ty: JoinType, table: T, alias: A, on: Value) -> Result<&mut Self>
    where
        T: IntoIdent,
        A: IntoIdent,
    {
        self.check_unstaged()?;
        if !self.wheres.is_empty() || self.group.is_some() {
            return Err(Error::usage("joins must come before WHERE and GROUP BY"));
        }
        let table = table.into_ident();
        let alias = alias.into_ident();
        check_reserved(table.as_str())?;
        check_reserved(alias.as_str())?;
        if table.is_empty() {
            return Err(Error::usage("joined table name is empty"));
        }
        let clause = JoinClause {
            ty,
            table: SmolStr::new(self.settings.map_table(table.as_str())),
            alias: (!alias.is_empty()).then(|| alias.into_inner()),
            on: Condition::parse(on, "join condition", false)?,
        };
        if self.is_joined(clause.name()) {
            return Err(Error::usage(format!("{:?} is already joined", clause.name())));
        }
        self.joins.push(clause);
        Ok(self)
    }

    pub fn join<T, A>(&mut self, table: T, alias: A, on: impl Into<Value>) -> Result<&mut Self>
    where
        T: IntoIdent,
        A: IntoIdent,
    {
        self.add_join(JoinType::Inner, table, alias, on.into())
    }

    pub fn left_join<T, A>(&mut self, table: T, alias: A, on: impl Into<Value>) -> Result<&mut Self>
    where
        T: IntoIdent,
        A: IntoIdent,
    {
        self.add_join(JoinType::Left, table, alias, on.into())
    }

    pub fn where_clause(&mut self, condition: impl Into<Value>) -> Result<&mut Self> {
        self.check_unstaged()?;
        if self.group.is_some() {
            return Err(Error::usage("WHERE must come before GROUP BY"));
        }
        self.wheres
            .push(Condition::parse(condition.into(), "where condition", true)?);
        Ok(self)
    }

    pub fn group_by<I, S>(&mut self, columns: I, having: Option<Value>) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        self.check_unstaged()?;
        if self.group.is_some() {
            return Err(Error::usage("GROUP BY is already set"));
        }
        let columns = collect(columns);
        if columns.is_empty() {
            return Err(Error::usage("GROUP BY needs at least one column"));
        }
        let having = having
            .map(|having| Condition::parse(having, "having condition", true))
            .transpose()?;
        self.group = Some(GroupBy { columns, having });
        Ok(self)
    }

    fn stage(&mut self, op: Operation) -> Result<&mut Self> {
        self.check_unstaged()?;
        match op {
            Operation::Select(_) => {}
            Operation::Update(_) | Operation::Delete => {
                if self.group.is_some() {
                    return Err(Error::usage(format!("{} does not take GROUP BY", op.name())));
                }
            }
            Operation::Insert { .. } | Operation::InsertFrom { .. } | Operation::Truncate => {
                if !self.joins.is_empty() || !self.wheres.is_empty() || self.group.is_some() {
                    return Err(Error::usage(format!(
                        "{} does not take joins, WHERE or GROUP BY",
                        op.name()
                    )));
                }
            }
        }
        self.op = Some(op);
        Ok(self)
    }

    pub fn select(&mut self, select: Select) -> Result<&mut Self> {
        self.stage(Operation::Select(select))
    }

    pub fn insert(&mut self, rows: impl Into<Value>, conflict: OnConflict) -> Result<&mut Self> {
        self.stage(Operation::Insert {
            rows: rows.into(),
            conflict,
        })
    }

    pub fn insert_from<I, S>(&mut self, columns: I, source: Fragment) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        self.stage(Operation::InsertFrom {
            columns: collect(columns),
            source,
        })
    }

    pub fn update(&mut self, set: impl Into<Value>) -> Result<&mut Self> {
        self.stage(Operation::Update(set.into()))
    }

    pub fn delete(&mut self) -> Result<&mut Self> {
        self.stage(Operation::Delete)
    }

    pub fn truncate(&mut self) -> Result<&mut Self> {
        self.stage(Operation::Truncate)
    }

    /// Materialize the staged operation. It is unstaged only when the build
    /// succeeds.
    pub fn build(&mut self) -> Result<Fragment> {
        let Some(op) = self.op.as_ref() else {
            return Err(Error::usage("no operation staged"));
        };
        let fragment = match op {
            Operation::Select(select) => self.select_fragment(select)?,
            Operation::Insert { rows, conflict } => insert::insert(self, rows, conflict)?,
            Operation::InsertFrom { columns, source } => insert::insert_from(self, columns, source)?,
            Operation::Update(set) => join::update(self, set)?,
            Operation::Delete => join::delete(self)?,
            Operation::Truncate => self.truncate_fragment(),
        };
        tracing::debug!(
            table = %self.table,
            operation = op.name(),
            joins = self.joins.len(),
            dialect = %self.settings.dialect(),
            "built statement"
        );
        self.op = None;
        Ok(fragment)
    }

    pub fn to_sql(&mut self) -> Result<String> {
        self.build()?.to_sql()
    }

    pub(crate) fn push_wheres(&self, fragment: &mut Fragment, base: Option<&str>, first: &mut bool) {
        for condition in &self.wheres {
            push_conjunction(fragment, first);
            condition.push(fragment, base);
        }
    }

    fn select_fragment(&self, select: &Select) -> Result<Fragment> {
        let base = self.base_alias()?;
        let mut fragment = Fragment::empty(Arc::clone(&self.settings));
        fragment.push_sql(if select.distinct {
            "SELECT DISTINCT "
        } else {
            "SELECT "
        });
        if select.columns.is_empty() {
            fragment.push_sql("*");
        } else {
            push_items(&mut fragment, &select.columns, base);
        }
        fragment.push_sql(" FROM ");
        push_table(&mut fragment, &self.table, base);
        join::push_joins(&mut fragment, &self.joins);
        self.push_wheres(&mut fragment, base, &mut true);

        if let Some(ref group) = self.group {
            fragment.push_sql(" GROUP BY ");
            push_items(&mut fragment, &group.columns, base);
            if let Some(ref having) = group.having {
                fragment.push_sql(" HAVING ");
                having.push(&mut fragment, base);
            }
        }

        let ordered = !select.order_by.is_empty();
        if ordered {
            fragment.push_sql(" ORDER BY ");
            push_items(&mut fragment, &select.order_by, base);
        }
        Paginator::new(select.limit, select.offset).push(&mut fragment, self.settings.dialect(), ordered)?;
        Ok(fragment)
    }

    fn truncate_fragment(&self) -> Fragment {
        let mut fragment = Fragment::empty(Arc::clone(&self.settings));
        fragment.push_sql(match self.settings.family() {
            Family::Sqlite => "DELETE FROM ",
            _ => "TRUNCATE TABLE ",
        });
        push_table(&mut fragment, &self.table, None);
        fragment
    }
}
