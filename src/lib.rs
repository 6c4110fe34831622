mod dialect;
mod error;
mod fragment;
mod ident;
mod quote;
mod raw;
mod render;
mod settings;
mod value;
mod words;
mod writer;

mod builder;
mod insert;
mod join;
mod paginate;

pub use smol_str::SmolStr;

pub use dialect::{Dialect, Family, HasDialect};
pub use error::{Error, Result};
pub use fragment::{Fragment, RenderOptions};
pub use ident::{BASE_ALIASES, Ident, IntoIdent, SUBJECT_ALIASES};
pub use quote::quote;
pub use raw::{SafeMode, sanitize};
pub use render::MAX_SINK_PARAMS;
pub use settings::{DEFAULT_INLINE_LIMIT, Settings, TableMapper};
pub use value::{Map, Value};
pub use words::{DEFAULT_FUNCTIONS, DEFAULT_IDENTS, WordList};
pub use writer::Serializer;

pub use builder::{Builder, Select};
pub use insert::OnConflict;
pub use paginate::Paginator;

/// Marker types usable with [`Fragment::of`].
pub mod dialects {
    pub use crate::dialect::{
        MsSql, MsSqlOnly, MySql, MySqlOnly, Postgres, PostgresOnly, Sqlite, SqliteOnly,
    };
}

macro_rules! factory {
    ($($name:ident => $dialect:ident),+ $(,)?) => {
        $(
            pub fn $name<C, S>(chunks: C, params: Vec<Value>) -> Result<Fragment>
            where
                C: IntoIterator<Item = S>,
                S: Into<SmolStr>,
            {
                Fragment::new(Settings::shared(Dialect::$dialect), chunks, params)
            }
        )+
    };
}

factory! {
    mysql => MySql,
    mysql_only => MySqlOnly,
    postgres => Postgres,
    postgres_only => PostgresOnly,
    sqlite => Sqlite,
    sqlite_only => SqliteOnly,
    mssql => MsSql,
    mssql_only => MsSqlOnly,
}
