use std::sync::Arc;

use smol_str::SmolStr;

use crate::{
    builder::{Builder, Condition, push_conjunction, push_ident, push_table},
    dialect::Family,
    error::Result,
    fragment::Fragment,
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JoinType {
    Inner,
    Left,
}

impl JoinType {
    fn keyword(self) -> &'static str {
        match self {
            JoinType::Inner => " JOIN ",
            JoinType::Left => " LEFT JOIN ",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct JoinClause {
    pub(crate) ty: JoinType,
    pub(crate) table: SmolStr,
    pub(crate) alias: Option<SmolStr>,
    pub(crate) on: Condition,
}

impl JoinClause {
    pub(crate) fn name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }

    fn push_source(&self, fragment: &mut Fragment) {
        push_table(fragment, &self.table, self.alias.as_deref());
    }

    fn push(&self, fragment: &mut Fragment) {
        fragment.push_sql(self.ty.keyword());
        self.push_source(fragment);
        fragment.push_sql(" ON ");
        self.on.push(fragment, None);
    }
}

pub(crate) fn push_joins(fragment: &mut Fragment, joins: &[JoinClause]) {
    for join in joins {
        join.push(fragment);
    }
}

fn push_row_identity(fragment: &mut Fragment, family: Family, subject: &str, base: &str) {
    let column = match family {
        Family::Postgres => ".ctid",
        _ => ".rowid",
    };
    push_ident(fragment, subject);
    fragment.push_sql(column).push_sql(" = ");
    push_ident(fragment, base);
    fragment.push_sql(column);
}

pub(crate) fn update(builder: &Builder, set: &Value) -> Result<Fragment> {
    let settings = builder.settings();
    let mut fragment = Fragment::empty(Arc::clone(settings));
    let mut first = true;

    let Some(base) = builder.base_alias()? else {
        fragment.push_sql("UPDATE ");
        push_table(&mut fragment, &builder.table, None);
        fragment.push_sql(" SET {").push_param(set.clone()).push_sql("}");
        builder.push_wheres(&mut fragment, None, &mut first);
        return Ok(fragment);
    };

    match settings.family() {
        Family::MySql => {
            fragment.push_sql("UPDATE ");
            push_table(&mut fragment, &builder.table, Some(base));
            push_joins(&mut fragment, &builder.joins);
            fragment
                .push_sql(" SET ")
                .push_param(base)
                .push_sql(".{")
                .push_param(set.clone())
                .push_sql("}");
        }
        Family::MsSql => {
            fragment.push_sql("UPDATE ");
            push_ident(&mut fragment, base);
            fragment
                .push_sql(" SET ")
                .push_param(base)
                .push_sql(".{")
                .push_param(set.clone())
                .push_sql("} FROM ");
            push_table(&mut fragment, &builder.table, Some(base));
            push_joins(&mut fragment, &builder.joins);
        }
        family @ (Family::Postgres | Family::Sqlite) => {
            let (head, tail) = builder.split_joins()?;
            if head.ty == JoinType::Left {
                let subject = builder.subject_alias(base)?;
                fragment.push_sql("UPDATE ");
                push_table(&mut fragment, &builder.table, Some(subject));
                fragment.push_sql(" SET {").push_param(set.clone()).push_sql("} FROM ");
                push_table(&mut fragment, &builder.table, Some(base));
                push_joins(&mut fragment, &builder.joins);
                push_conjunction(&mut fragment, &mut first);
                push_row_identity(&mut fragment, family, subject, base);
            } else {
                fragment.push_sql("UPDATE ");
                push_table(&mut fragment, &builder.table, Some(base));
                fragment.push_sql(" SET {").push_param(set.clone()).push_sql("} FROM ");
                head.push_source(&mut fragment);
                push_joins(&mut fragment, tail);
                push_conjunction(&mut fragment, &mut first);
                head.on.push(&mut fragment, None);
            }
        }
    }
    builder.push_wheres(&mut fragment, Some(base), &mut first);
    Ok(fragment)
}

pub(crate) fn delete(builder: &Builder) -> Result<Fragment> {
    let settings = builder.settings();
    let mut fragment = Fragment::empty(Arc::clone(settings));
    let mut first = true;

    let Some(base) = builder.base_alias()? else {
        fragment.push_sql("DELETE FROM ");
        push_table(&mut fragment, &builder.table, None);
        builder.push_wheres(&mut fragment, None, &mut first);
        return Ok(fragment);
    };

    match settings.family() {
        Family::MySql | Family::MsSql => {
            fragment.push_sql("DELETE ");
            push_ident(&mut fragment, base);
            fragment.push_sql(" FROM ");
            push_table(&mut fragment, &builder.table, Some(base));
            push_joins(&mut fragment, &builder.joins);
            builder.push_wheres(&mut fragment, Some(base), &mut first);
        }
        Family::Postgres => {
            let (head, tail) = builder.split_joins()?;
            if head.ty == JoinType::Left {
                let subject = builder.subject_alias(base)?;
                fragment.push_sql("DELETE FROM ");
                push_table(&mut fragment, &builder.table, Some(subject));
                fragment.push_sql(" USING ");
                push_table(&mut fragment, &builder.table, Some(base));
                push_joins(&mut fragment, &builder.joins);
                push_conjunction(&mut fragment, &mut first);
                push_row_identity(&mut fragment, Family::Postgres, subject, base);
            } else {
                fragment.push_sql("DELETE FROM ");
                push_table(&mut fragment, &builder.table, Some(base));
                fragment.push_sql(" USING ");
                head.push_source(&mut fragment);
                push_joins(&mut fragment, tail);
                push_conjunction(&mut fragment, &mut first);
                head.on.push(&mut fragment, None);
            }
            builder.push_wheres(&mut fragment, Some(base), &mut first);
        }
        Family::Sqlite => {
            fragment.push_sql("DELETE FROM ");
            push_table(&mut fragment, &builder.table, None);
            fragment.push_sql(" WHERE rowid IN (SELECT ");
            push_ident(&mut fragment, base);
            fragment.push_sql(".rowid FROM ");
            push_table(&mut fragment, &builder.table, Some(base));
            push_joins(&mut fragment, &builder.joins);
            builder.push_wheres(&mut fragment, Some(base), &mut first);
            fragment.push_sql(")");
        }
    }
    Ok(fragment)
}
