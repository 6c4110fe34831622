use std::sync::Arc;

use smol_str::SmolStr;

use crate::{
    builder::{Builder, push_ident, push_table},
    dialect::Family,
    error::{Error, Result},
    fragment::Fragment,
    value::Value,
};

/// What an `INSERT` does when a row collides with a unique key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OnConflict {
    #[default]
    Fail,
    DoNothing,
    DoUpdate {
        target: Vec<SmolStr>,
        columns: Vec<SmolStr>,
    },
}

impl OnConflict {
    pub fn do_update<T, C, S1, S2>(target: T, columns: C) -> Self
    where
        T: IntoIterator<Item = S1>,
        C: IntoIterator<Item = S2>,
        S1: Into<SmolStr>,
        S2: Into<SmolStr>,
    {
        OnConflict::DoUpdate {
            target: target.into_iter().map(Into::into).collect(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

fn first_row_columns(rows: &Value) -> Vec<SmolStr> {
    let row = match rows {
        Value::List(items) => items.first(),
        map @ Value::Map(_) => Some(map),
        _ => None,
    };
    match row {
        Some(Value::Map(map)) => map.keys().cloned().collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn insert(builder: &Builder, rows: &Value, conflict: &OnConflict) -> Result<Fragment> {
    let settings = builder.settings();
    let dialect = settings.dialect();
    let mut fragment = Fragment::empty(Arc::clone(settings));
    fragment.push_sql("INSERT INTO ");
    push_table(&mut fragment, &builder.table, None);
    fragment.push_sql(" <").push_param(rows.clone()).push_sql(">");

    let (target, columns) = match conflict {
        OnConflict::Fail => return Ok(fragment),
        _ if dialect.family() == Family::MsSql => {
            return Err(Error::unsupported(
                "ON CONFLICT",
                dialect,
                "write a MERGE statement with mssql_only",
            ));
        }
        OnConflict::DoNothing => {
            if dialect.family() == Family::MySql {
                let Some(first) = first_row_columns(rows).into_iter().next() else {
                    return Err(Error::EmptyRows);
                };
                fragment.push_sql(" ON DUPLICATE KEY UPDATE ");
                push_ident(&mut fragment, &first);
                fragment.push_sql("=");
                push_ident(&mut fragment, &first);
            } else {
                fragment.push_sql(" ON CONFLICT DO NOTHING");
            }
            return Ok(fragment);
        }
        OnConflict::DoUpdate { target, columns } => (target, columns),
    };

    if target.is_empty() {
        if dialect.family() != Family::MySql {
            return Err(Error::usage("ON CONFLICT DO UPDATE needs a conflict target"));
        }
        if !dialect.is_only() {
            return Err(Error::unsupported(
                "ON DUPLICATE KEY UPDATE without a conflict target",
                dialect,
                "pass the target columns or use mysql_only",
            ));
        }
    }
    let columns = if columns.is_empty() {
        first_row_columns(rows)
            .into_iter()
            .filter(|column| !target.contains(column))
            .collect()
    } else {
        columns.clone()
    };
    if columns.is_empty() {
        return Err(Error::usage("ON CONFLICT DO UPDATE has no column to update"));
    }

    if dialect.family() == Family::MySql {
        fragment.push_sql(" ON DUPLICATE KEY UPDATE ");
        for (index, column) in columns.iter().enumerate() {
            if index > 0 {
                fragment.push_sql(", ");
            }
            push_ident(&mut fragment, column);
            fragment.push_sql("=VALUES(");
            push_ident(&mut fragment, column);
            fragment.push_sql(")");
        }
    } else {
        fragment
            .push_sql(" ON CONFLICT (\"")
            .push_param(Value::list(target.iter().cloned()))
            .push_sql("\"+) DO UPDATE SET ");
        for (index, column) in columns.iter().enumerate() {
            if index > 0 {
                fragment.push_sql(", ");
            }
            push_ident(&mut fragment, column);
            fragment.push_sql("=excluded.");
            push_ident(&mut fragment, column);
        }
    }
    Ok(fragment)
}

pub(crate) fn insert_from(builder: &Builder, columns: &[SmolStr], source: &Fragment) -> Result<Fragment> {
    let mut fragment = Fragment::empty(Arc::clone(builder.settings()));
    fragment.push_sql("INSERT INTO ");
    push_table(&mut fragment, &builder.table, None);
    if !columns.is_empty() {
        fragment
            .push_sql(" (\"")
            .push_param(Value::list(columns.iter().cloned()))
            .push_sql("\"+)");
    }
    fragment.push_sql(" ").push_param(source.clone());
    Ok(fragment)
}
