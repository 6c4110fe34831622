use std::{
    borrow::Cow,
    fmt,
    sync::{Arc, LazyLock},
};

use crate::{
    dialect::{Dialect, Family},
    words::{DEFAULT_FUNCTION_LIST, DEFAULT_IDENT_LIST, WordList},
};

pub const DEFAULT_INLINE_LIMIT: usize = 1024;

pub type TableMapper = Arc<dyn Fn(&str) -> String + Send + Sync>;

static SHARED: LazyLock<[Arc<Settings>; 8]> =
    LazyLock::new(|| Dialect::ALL.map(|dialect| Arc::new(Settings::new(dialect))));

/// Per-dialect rendering policy shared by every fragment built with it.
#[derive(Clone)]
pub struct Settings {
    dialect: Dialect,
    idents: Arc<WordList>,
    functions: Arc<WordList>,
    always_quote: bool,
    no_backslash_escapes: bool,
    inline_limit: usize,
    table_mapper: Option<TableMapper>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("dialect", &self.dialect)
            .field("idents", &self.idents.definition())
            .field("functions", &self.functions.definition())
            .field("always_quote", &self.always_quote)
            .field("no_backslash_escapes", &self.no_backslash_escapes)
            .field("inline_limit", &self.inline_limit)
            .field("table_mapper", &self.table_mapper.is_some())
            .finish()
    }
}

impl Settings {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            idents: Arc::clone(&DEFAULT_IDENT_LIST),
            functions: Arc::clone(&DEFAULT_FUNCTION_LIST),
            always_quote: false,
            no_backslash_escapes: !dialect.backslash_escapes(),
            inline_limit: DEFAULT_INLINE_LIMIT,
            table_mapper: None,
        }
    }

    pub fn shared(dialect: Dialect) -> Arc<Settings> {
        Arc::clone(&SHARED[dialect as usize])
    }

    pub fn with_words(
        dialect: Dialect,
        idents_def: Option<&str>,
        functions_def: Option<&str>,
    ) -> Self {
        let mut settings = Self::new(dialect);
        if let Some(def) = idents_def {
            settings.idents = Arc::new(WordList::parse(def));
        }
        if let Some(def) = functions_def {
            settings.functions = Arc::new(WordList::parse(def));
        }
        settings
    }

    pub fn always_quote(mut self, value: bool) -> Self {
        self.always_quote = value;
        self
    }

    pub fn no_backslash_escapes(mut self, value: bool) -> Self {
        if self.dialect.backslash_escapes() {
            self.no_backslash_escapes = value;
        }
        self
    }

    pub fn inline_limit(mut self, limit: usize) -> Self {
        self.inline_limit = limit;
        self
    }

    pub fn table_mapper<F>(mut self, mapper: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.table_mapper = Some(Arc::new(mapper));
        self
    }

    #[inline]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    #[inline]
    pub fn family(&self) -> Family {
        self.dialect.family()
    }

    #[inline]
    pub fn idents(&self) -> &WordList {
        &self.idents
    }

    #[inline]
    pub fn functions(&self) -> &WordList {
        &self.functions
    }

    #[inline]
    pub fn is_always_quote(&self) -> bool {
        self.always_quote
    }

    #[inline]
    pub fn get_inline_limit(&self) -> usize {
        self.inline_limit
    }

    #[inline]
    pub fn uses_backslash_escapes(&self) -> bool {
        !self.no_backslash_escapes
    }

    #[inline]
    pub fn ident_quote(&self) -> u8 {
        self.dialect.ident_quote()
    }

    #[inline]
    pub(crate) fn is_mssql(&self) -> bool {
        matches!(self.family(), Family::MsSql)
    }

    pub(crate) fn identity_literal(&self, identity: bool) -> &'static str {
        match (self.is_mssql(), identity) {
            (true, true) => "1=1",
            (true, false) => "1=0",
            (false, true) => "TRUE",
            (false, false) => "FALSE",
        }
    }

    pub(crate) fn max_list_depth(&self) -> usize {
        match (self.family(), self.dialect.is_only()) {
            (Family::MsSql, _) => 1,
            (_, false) => 1,
            (_, true) => 2,
        }
    }

    pub(crate) fn map_table<'a>(&self, name: &'a str) -> Cow<'a, str> {
        match self.table_mapper {
            Some(ref mapper) => Cow::Owned(mapper(name)),
            None => Cow::Borrowed(name),
        }
    }
}

impl From<Dialect> for Settings {
    fn from(dialect: Dialect) -> Self {
        Settings::new(dialect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_shared() {
        let a = Settings::new(Dialect::MySql);
        let b = Settings::new(Dialect::Postgres);
        assert!(Arc::ptr_eq(&a.idents, &b.idents));
        assert!(Arc::ptr_eq(&a.functions, &b.functions));
        assert!(a.uses_backslash_escapes());
        assert!(!b.uses_backslash_escapes());
        assert_eq!(b'`', a.ident_quote());
        assert_eq!(b'"', Settings::new(Dialect::MsSql).ident_quote());
    }

    #[test]
    fn test_custom_words() {
        let settings = Settings::with_words(Dialect::Sqlite, Some("!drop"), None);
        assert_eq!("!DROP", settings.idents().definition());
        assert!(settings.functions().allows(b"count"));
        assert!(!Arc::ptr_eq(&settings.idents, &Settings::new(Dialect::Sqlite).idents));
    }

    #[test]
    fn test_backslash_override_only_for_mysql() {
        let settings = Settings::new(Dialect::MySqlOnly).no_backslash_escapes(true);
        assert!(!settings.uses_backslash_escapes());
        let settings = Settings::new(Dialect::Postgres).no_backslash_escapes(false);
        assert!(!settings.uses_backslash_escapes());
    }

    #[test]
    fn test_table_mapper() {
        let settings = Settings::new(Dialect::Postgres).table_mapper(|name| format!("app_{name}"));
        assert_eq!("app_users", settings.map_table("users"));
        assert_eq!("users", Settings::new(Dialect::Postgres).map_table("users"));
    }

    #[test]
    fn test_shared_per_dialect() {
        for dialect in Dialect::ALL {
            let a = Settings::shared(dialect);
            assert_eq!(dialect, a.dialect());
            assert!(Arc::ptr_eq(&a, &Settings::shared(dialect)));
        }
    }

    #[test]
    fn test_identity_literals() {
        assert_eq!("TRUE", Settings::new(Dialect::Sqlite).identity_literal(true));
        assert_eq!("1=0", Settings::new(Dialect::MsSqlOnly).identity_literal(false));
    }
}
