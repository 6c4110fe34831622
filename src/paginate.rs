use crate::{
    dialect::{Dialect, Family},
    error::{Error, Result},
    fragment::Fragment,
};

// Largest row count MySQL accepts, used for an offset without a limit.
const MYSQL_NO_LIMIT: u64 = u64::MAX;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Paginator {
    pub maybe_limit: Option<u64>,
    pub maybe_offset: Option<u64>,
}

impl Paginator {
    pub fn new(maybe_limit: Option<u64>, maybe_offset: Option<u64>) -> Self {
        Self {
            maybe_limit,
            maybe_offset,
        }
    }

    pub fn page(current_page: u64, per_page: u64) -> Self {
        Self {
            maybe_limit: Some(per_page),
            maybe_offset: Some(current_page.saturating_mul(per_page)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.maybe_limit.is_none() && self.maybe_offset.is_none()
    }

    pub(crate) fn push(&self, fragment: &mut Fragment, dialect: Dialect, ordered: bool) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        let family = dialect.family();
        if !ordered {
            if !dialect.is_only() {
                return Err(Error::unsupported(
                    "LIMIT/OFFSET without ORDER BY",
                    dialect,
                    format!("add an ORDER BY or use {}", dialect.only()),
                ));
            }
            if family == Family::MsSql {
                fragment.push_sql(" ORDER BY (SELECT NULL)");
            }
        }

        let clause = match (family, self.maybe_limit, self.maybe_offset) {
            (Family::MsSql, limit, offset) => {
                let mut clause = format!(" OFFSET {} ROWS", offset.unwrap_or(0));
                if let Some(limit) = limit {
                    clause.push_str(&format!(" FETCH FIRST {limit} ROWS ONLY"));
                }
                clause
            }
            (_, Some(limit), Some(offset)) => format!(" LIMIT {limit} OFFSET {offset}"),
            (_, Some(limit), None) => format!(" LIMIT {limit}"),
            (Family::MySql, None, Some(offset)) => format!(" LIMIT {MYSQL_NO_LIMIT} OFFSET {offset}"),
            (Family::Sqlite, None, Some(offset)) => format!(" LIMIT -1 OFFSET {offset}"),
            (Family::Postgres, None, Some(offset)) => format!(" OFFSET {offset}"),
            (_, None, None) => String::new(),
        };
        fragment.push_sql(&clause);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::Settings;

    use super::*;

    fn clause(dialect: Dialect, ordered: bool, limit: Option<u64>, offset: Option<u64>) -> Result<String> {
        let mut fragment = Fragment::empty(Settings::shared(dialect));
        Paginator::new(limit, offset).push(&mut fragment, dialect, ordered)?;
        fragment.to_sql()
    }

    #[test]
    fn test_limit_offset() {
        assert_eq!(" LIMIT 10 OFFSET 20", clause(Dialect::MySql, true, Some(10), Some(20)).unwrap());
        assert_eq!(" LIMIT 10", clause(Dialect::Postgres, true, Some(10), None).unwrap());
        assert_eq!(" OFFSET 5", clause(Dialect::Postgres, true, None, Some(5)).unwrap());
        assert_eq!(" LIMIT -1 OFFSET 5", clause(Dialect::Sqlite, true, None, Some(5)).unwrap());
        assert_eq!(
            " LIMIT 18446744073709551615 OFFSET 5",
            clause(Dialect::MySql, true, None, Some(5)).unwrap()
        );
        assert_eq!("", clause(Dialect::MsSql, false, None, None).unwrap());
    }

    #[test]
    fn test_mssql_fetch() {
        assert_eq!(
            " OFFSET 20 ROWS FETCH FIRST 10 ROWS ONLY",
            clause(Dialect::MsSql, true, Some(10), Some(20)).unwrap()
        );
        assert_eq!(" OFFSET 0 ROWS FETCH FIRST 3 ROWS ONLY", clause(Dialect::MsSql, true, Some(3), None).unwrap());
        assert_eq!(" OFFSET 4 ROWS", clause(Dialect::MsSql, true, None, Some(4)).unwrap());
    }

    #[test]
    fn test_unordered() {
        for dialect in [Dialect::MySql, Dialect::Postgres, Dialect::Sqlite, Dialect::MsSql] {
            let err = clause(dialect, false, Some(1), None).unwrap_err();
            match err {
                Error::Unsupported { hatch, .. } => assert!(hatch.contains(dialect.only().name()), "{hatch}"),
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(" LIMIT 1", clause(Dialect::PostgresOnly, false, Some(1), None).unwrap());
        assert_eq!(
            " ORDER BY (SELECT NULL) OFFSET 0 ROWS FETCH FIRST 1 ROWS ONLY",
            clause(Dialect::MsSqlOnly, false, Some(1), None).unwrap()
        );
    }

    #[test]
    fn test_page() {
        assert_eq!(Paginator::new(Some(15), Some(30)), Paginator::page(2, 15));
        assert!(Paginator::default().is_empty());
    }
}
