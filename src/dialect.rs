use std::fmt;

use crate::{error::Result, quote, value::Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    MySql,
    Postgres,
    Sqlite,
    MsSql,
}

/// A target family plus its mode; the `*Only` variants unlock family specific syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    MySql,
    MySqlOnly,
    Postgres,
    PostgresOnly,
    Sqlite,
    SqliteOnly,
    MsSql,
    MsSqlOnly,
}

impl Dialect {
    pub const ALL: [Dialect; 8] = [
        Dialect::MySql,
        Dialect::MySqlOnly,
        Dialect::Postgres,
        Dialect::PostgresOnly,
        Dialect::Sqlite,
        Dialect::SqliteOnly,
        Dialect::MsSql,
        Dialect::MsSqlOnly,
    ];

    #[inline]
    pub fn family(self) -> Family {
        match self {
            Dialect::MySql | Dialect::MySqlOnly => Family::MySql,
            Dialect::Postgres | Dialect::PostgresOnly => Family::Postgres,
            Dialect::Sqlite | Dialect::SqliteOnly => Family::Sqlite,
            Dialect::MsSql | Dialect::MsSqlOnly => Family::MsSql,
        }
    }

    #[inline]
    pub fn is_only(self) -> bool {
        matches!(
            self,
            Dialect::MySqlOnly | Dialect::PostgresOnly | Dialect::SqliteOnly | Dialect::MsSqlOnly
        )
    }

    pub fn only(self) -> Dialect {
        match self.family() {
            Family::MySql => Dialect::MySqlOnly,
            Family::Postgres => Dialect::PostgresOnly,
            Family::Sqlite => Dialect::SqliteOnly,
            Family::MsSql => Dialect::MsSqlOnly,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Dialect::MySql => "mysql",
            Dialect::MySqlOnly => "mysql_only",
            Dialect::Postgres => "postgres",
            Dialect::PostgresOnly => "postgres_only",
            Dialect::Sqlite => "sqlite",
            Dialect::SqliteOnly => "sqlite_only",
            Dialect::MsSql => "mssql",
            Dialect::MsSqlOnly => "mssql_only",
        }
    }

    #[inline]
    pub fn backslash_escapes(self) -> bool {
        matches!(self.family(), Family::MySql)
    }

    #[inline]
    pub fn ident_quote(self) -> u8 {
        match self.family() {
            Family::MySql => b'`',
            Family::Postgres | Family::Sqlite | Family::MsSql => b'"',
        }
    }

    pub fn quote(self, value: &Value) -> Result<String> {
        quote::quote(
            value,
            !self.backslash_escapes(),
            matches!(self.family(), Family::MsSql),
        )
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub trait HasDialect {
    const DIALECT: Dialect;
}

macro_rules! marker {
    ($($name:ident => $dialect:ident),+ $(,)?) => {
        $(
            pub struct $name;

            impl HasDialect for $name {
                const DIALECT: Dialect = Dialect::$dialect;
            }
        )+
    };
}

marker! {
    MySql => MySql,
    MySqlOnly => MySqlOnly,
    Postgres => Postgres,
    PostgresOnly => PostgresOnly,
    Sqlite => Sqlite,
    SqliteOnly => SqliteOnly,
    MsSql => MsSql,
    MsSqlOnly => MsSqlOnly,
}

#[cfg(feature = "postgres")]
impl HasDialect for sqlx::Postgres {
    const DIALECT: Dialect = Dialect::Postgres;
}

#[cfg(feature = "mysql")]
impl HasDialect for sqlx::MySql {
    const DIALECT: Dialect = Dialect::MySql;
}

#[cfg(feature = "sqlite")]
impl HasDialect for sqlx::Sqlite {
    const DIALECT: Dialect = Dialect::Sqlite;
}
