use std::{borrow::Cow, fmt::Write};

use smol_str::SmolStr;

use crate::{
    dialect::Family,
    error::{Error, Result},
    fragment::{Fragment, check_embeddable},
    ident::write_name,
    quote::quote_into,
    raw::{SafeMode, sanitize_in_place},
    settings::Settings,
    value::Value,
    writer::Serializer,
};

pub const MAX_SINK_PARAMS: usize = 65535;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    None,
    Skip(usize),
    Replace(usize, u8),
}

fn not_iterable(context: &'static str, expected: &'static str, found: &Value) -> Error {
    Error::NotIterable {
        context,
        expected,
        found: found.type_name(),
    }
}

pub(crate) struct Renderer<'a> {
    settings: &'a Settings,
    ser: &'a mut Serializer,
    sink: Option<&'a mut Vec<Value>>,
    // Qualifier captured by `${name}.` for the next parameter only.
    captured: Option<SmolStr>,
    pending: Pending,
    // Last byte of the chunk just written.
    opener: Option<u8>,
}

impl<'a> Renderer<'a> {
    pub(crate) fn new(
        settings: &'a Settings,
        ser: &'a mut Serializer,
        sink: Option<&'a mut Vec<Value>>,
    ) -> Self {
        Self {
            settings,
            ser,
            sink,
            captured: None,
            pending: Pending::None,
            opener: None,
        }
    }

    pub(crate) fn render(&mut self, fragment: &Fragment, inherited: Option<&str>) -> Result<()> {
        let chunks = fragment.chunks();
        let Some((first, rest)) = chunks.split_first() else {
            return Ok(());
        };
        self.write_chunk(first);
        for (index, (param, next)) in fragment.params().iter().zip(rest).enumerate() {
            self.param(index, param, next.as_bytes(), inherited)?;
            self.write_chunk(next);
        }
        Ok(())
    }

    fn write_chunk(&mut self, chunk: &str) {
        let bytes = chunk.as_bytes();
        let rest = match std::mem::replace(&mut self.pending, Pending::None) {
            Pending::None => bytes,
            Pending::Skip(n) => &bytes[n.min(bytes.len())..],
            Pending::Replace(n, byte) => {
                self.ser.push(byte);
                &bytes[n.min(bytes.len())..]
            }
        };
        self.ser.extend(rest);
        self.opener = rest.last().copied();
    }

    fn param(&mut self, index: usize, value: &Value, next: &[u8], inherited: Option<&str>) -> Result<()> {
        let captured = self.captured.take();
        let qualifier = captured.as_deref().or(inherited);
        let close = next.first().copied();
        let expect = |open: u8, ok: bool| -> Result<()> {
            if ok {
                return Ok(());
            }
            Err(Error::Enclosure {
                index,
                open: open as char,
                close: close.map(char::from),
            })
        };

        match self.opener {
            Some(b'\'') => {
                expect(b'\'', close == Some(b'\''))?;
                self.ser.pop_back();
                self.value(value, qualifier)?;
                self.pending = Pending::Skip(1);
            }
            Some(b'[') => {
                expect(b'[', close == Some(b']'))?;
                self.ser.poke_back(1, b'(');
                self.list(value, 1)?;
                self.pending = Pending::Replace(1, b')');
            }
            Some(b'<') => {
                expect(b'<', close == Some(b'>'))?;
                self.ser.pop_back();
                self.rows(value)?;
                self.pending = Pending::Skip(1);
            }
            Some(open @ (b'`' | b'"')) => {
                expect(open, close == Some(open))?;
                self.ser.pop_back();
                let skip = match next.get(1).copied() {
                    Some(modifier @ (b'*' | b'+' | b',')) => {
                        self.names(value, qualifier, modifier, next)?
                    }
                    _ => {
                        self.name(value, qualifier)?;
                        1
                    }
                };
                self.pending = Pending::Skip(skip);
            }
            Some(b'{') => {
                let closer = match close {
                    Some(closer @ (b'}' | b'&' | b'|')) => closer,
                    _ => return expect(b'{', false),
                };
                self.ser.pop_back();
                self.pairs(value, qualifier, closer)?;
                self.pending = Pending::Skip(1);
            }
            Some(b'(') => {
                expect(b'(', close == Some(b')'))?;
                self.expression(value, qualifier)?;
            }
            _ if close == Some(b'.') => {
                let Value::Str(name) = value else {
                    return Err(Error::Stringify(value.type_name()));
                };
                self.captured = Some(name.clone());
                self.pending = Pending::Skip(1);
            }
            _ => self.bare(value, qualifier)?,
        }
        Ok(())
    }

    fn nested(&mut self, fragment: &Fragment, qualifier: Option<&str>) -> Result<()> {
        check_embeddable(self.settings, fragment.settings())?;
        let captured = self.captured.take();
        let result = self.render(fragment, qualifier);
        self.captured = captured;
        self.pending = Pending::None;
        result
    }

    fn value(&mut self, value: &Value, qualifier: Option<&str>) -> Result<()> {
        let long = match value {
            Value::Fragment(fragment) => return self.nested(fragment, qualifier),
            Value::Str(s) => s.len() > self.settings.get_inline_limit(),
            Value::Bytes(bytes) => bytes.len() > self.settings.get_inline_limit(),
            _ => false,
        };
        if long && self.externalize(value) {
            return Ok(());
        }
        self.quote(value)
    }

    fn quote(&mut self, value: &Value) -> Result<()> {
        quote_into(
            self.ser,
            value,
            !self.settings.uses_backslash_escapes(),
            self.settings.is_mssql(),
        )
    }

    fn externalize(&mut self, value: &Value) -> bool {
        let Some(sink) = self.sink.as_deref_mut() else {
            return false;
        };
        if sink.len() >= MAX_SINK_PARAMS {
            tracing::debug!(len = sink.len(), "parameter sink full, inlining value");
            return false;
        }
        sink.push(value.clone());
        let position = sink.len();
        match self.settings.family() {
            Family::MySql | Family::Sqlite => self.ser.push(b'?'),
            Family::Postgres => {
                let _ = write!(self.ser, "${position}");
            }
            Family::MsSql => {
                let _ = write!(self.ser, "@p{position}");
            }
        }
        tracing::debug!(position, kind = value.type_name(), "externalized value");
        true
    }

    fn list(&mut self, value: &Value, depth: usize) -> Result<()> {
        let Value::List(items) = value else {
            return Err(not_iterable("list", "a list", value));
        };
        if depth > self.settings.max_list_depth() {
            return Err(Error::ListDepth {
                depth,
                dialect: self.settings.dialect(),
            });
        }
        if items.is_empty() {
            self.ser.push_str("NULL");
            return Ok(());
        }
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.ser.push_str(", ");
            }
            if let Value::List(_) = item {
                self.ser.push(b'(');
                self.list(item, depth + 1)?;
                self.ser.push(b')');
            } else {
                self.value(item, None)?;
            }
        }
        Ok(())
    }

    fn rows(&mut self, value: &Value) -> Result<()> {
        let rows = match value {
            Value::List(rows) => rows.as_slice(),
            Value::Map(_) => std::slice::from_ref(value),
            _ => return Err(not_iterable("row-set", "a list of maps", value)),
        };
        let Some(first) = rows.first() else {
            return Err(Error::EmptyRows);
        };
        let Value::Map(columns) = first else {
            return Err(not_iterable("row-set", "a list of maps", first));
        };

        let quote = self.settings.ident_quote();
        self.ser.push(b'(');
        for (i, column) in columns.keys().enumerate() {
            if i > 0 {
                self.ser.push_str(", ");
            }
            write_name(self.ser, None, column, quote);
        }
        self.ser.push_str(") VALUES ");

        let missing = match self.settings.family() {
            Family::Sqlite => "NULL",
            _ => "DEFAULT",
        };
        for (index, row) in rows.iter().enumerate() {
            let Value::Map(row) = row else {
                return Err(not_iterable("row-set", "a list of maps", row));
            };
            if let Some(extra) = row.keys().find(|key| !columns.contains_key(*key)) {
                return Err(Error::RowShape {
                    row: index,
                    column: extra.to_string(),
                });
            }
            if index > 0 {
                self.ser.push_str(",\n");
            }
            self.ser.push(b'(');
            for (i, column) in columns.keys().enumerate() {
                if i > 0 {
                    self.ser.push_str(", ");
                }
                match row.get(column) {
                    Some(value) => self.value(value, None)?,
                    None => self.ser.push_str(missing),
                }
            }
            self.ser.push(b')');
        }
        Ok(())
    }

    fn name(&mut self, value: &Value, qualifier: Option<&str>) -> Result<()> {
        let name: Cow<'_, str> = match value {
            Value::Str(s) => Cow::Borrowed(s.as_str()),
            Value::Int(i) => Cow::Owned(i.to_string()),
            Value::UInt(u) => Cow::Owned(u.to_string()),
            _ => return Err(Error::Stringify(value.type_name())),
        };
        write_name(self.ser, qualifier, &name, self.settings.ident_quote());
        Ok(())
    }

    fn names(
        &mut self,
        value: &Value,
        qualifier: Option<&str>,
        modifier: u8,
        next: &[u8],
    ) -> Result<usize> {
        const CONTEXT: &str = "identifier list";
        let names: Vec<&str> = match value {
            Value::Str(s) => vec![s.as_str()],
            Value::Map(map) => map.keys().map(SmolStr::as_str).collect(),
            Value::List(items) => items
                .iter()
                .map(|item| item.as_str().ok_or_else(|| not_iterable(CONTEXT, "names", item)))
                .collect::<Result<_>>()?,
            _ => return Err(not_iterable(CONTEXT, "a list of names", value)),
        };

        if names.is_empty() {
            return match modifier {
                b'*' => {
                    write_name(self.ser, qualifier, "*", self.settings.ident_quote());
                    Ok(2)
                }
                b'+' => Err(Error::NotIterable {
                    context: CONTEXT,
                    expected: "at least one name",
                    found: "empty list",
                }),
                // drop the comma and one following space
                _ => Ok(if next.get(2) == Some(&b' ') { 3 } else { 2 }),
            };
        }

        let quote = self.settings.ident_quote();
        for (i, name) in names.iter().enumerate() {
            if i > 0 {
                self.ser.push_str(", ");
            }
            write_name(self.ser, qualifier, name, quote);
        }
        // a trailing comma stays in the chunk
        Ok(if modifier == b',' { 1 } else { 2 })
    }

    fn pairs(&mut self, value: &Value, qualifier: Option<&str>, closer: u8) -> Result<()> {
        let Value::Map(map) = value else {
            return Err(not_iterable("key/value set", "a map", value));
        };
        let quote = self.settings.ident_quote();

        if closer == b'}' {
            if map.is_empty() {
                return Err(Error::EmptySet);
            }
            for (i, (key, value)) in map.iter().enumerate() {
                if i > 0 {
                    self.ser.push_str(", ");
                }
                write_name(self.ser, qualifier, key, quote);
                self.ser.push(b'=');
                self.value(value, None)?;
            }
            return Ok(());
        }

        let conjunction = closer == b'&';
        if map.is_empty() {
            self.ser
                .push_str(self.settings.identity_literal(conjunction));
            return Ok(());
        }
        let joiner = if conjunction { " AND " } else { " OR " };
        self.ser.push(b'(');
        for (i, (key, value)) in map.iter().enumerate() {
            if i > 0 {
                self.ser.push_str(joiner);
            }
            write_name(self.ser, qualifier, key, quote);
            match value {
                Value::Null => self.ser.push_str(" IS NULL"),
                Value::List(_) => {
                    self.ser.push_str(" IN (");
                    self.list(value, 1)?;
                    self.ser.push(b')');
                }
                _ => {
                    self.ser.push(b'=');
                    self.value(value, None)?;
                }
            }
        }
        self.ser.push(b')');
        Ok(())
    }

    fn expression(&mut self, value: &Value, qualifier: Option<&str>) -> Result<()> {
        let start = self.ser.len();
        match value {
            Value::Fragment(fragment) => {
                self.nested(fragment, qualifier)?;
                if qualifier.is_some() {
                    sanitize_in_place(self.ser, start, qualifier, self.settings, SafeMode::Nested)?;
                }
                Ok(())
            }
            Value::Str(text) => {
                self.ser.push_str(text);
                sanitize_in_place(self.ser, start, qualifier, self.settings, SafeMode::Expression)
            }
            _ => {
                self.quote(value)?;
                sanitize_in_place(self.ser, start, qualifier, self.settings, SafeMode::Expression)
            }
        }
    }

    fn bare(&mut self, value: &Value, qualifier: Option<&str>) -> Result<()> {
        match value {
            Value::Fragment(fragment) => self.nested(fragment, qualifier),
            Value::Str(text) => {
                let start = self.ser.len();
                self.ser.push_str(text);
                sanitize_in_place(self.ser, start, qualifier, self.settings, SafeMode::Chunk)
            }
            _ => self.quote(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        Dialect, RenderOptions, map, mssql, mssql_only, mysql, params, postgres, postgres_only,
        sqlite, Value,
    };

    use super::*;

    #[test]
    fn test_value_context() {
        let sql = mysql(["'", "'"], params!["A'B"]).unwrap().to_sql().unwrap();
        assert_eq!("'A''B'", sql);
        let sql = mysql(["SELECT '", "'"], params![vec![1u8, 2, 3, 4]]).unwrap();
        assert_eq!("SELECT x'01020304'", sql.to_sql().unwrap());
        let sql = mssql(["SELECT '", "'"], params![vec![1u8, 2, 3, 4]]).unwrap();
        assert_eq!("SELECT 0x01020304", sql.to_sql().unwrap());
        let sql = postgres(["a='", "' AND b='", "'"], params![Value::Null, true]).unwrap();
        assert_eq!("a=NULL AND b=TRUE", sql.to_sql().unwrap());
    }

    #[test]
    fn test_list_context() {
        let sql = postgres(["id IN [", "]"], params![[1, 2, 3]]).unwrap();
        assert_eq!("id IN (1, 2, 3)", sql.to_sql().unwrap());
        let sql = postgres(["id IN [", "]"], params![Vec::<i64>::new()]).unwrap();
        assert_eq!("id IN (NULL)", sql.to_sql().unwrap());
        let sql = mysql(["x IN [", "]"], params![["a", "b'c"]]).unwrap();
        assert_eq!("x IN ('a', 'b''c')", sql.to_sql().unwrap());

        let pairs = Value::list([Value::from([1, 2]), Value::from([3, 4])]);
        let sql = postgres_only(["(a, b) IN [", "]"], params![pairs.clone()]).unwrap();
        assert_eq!("(a, b) IN ((1, 2), (3, 4))", sql.to_sql().unwrap());
        let err = postgres(["x IN [", "]"], params![pairs.clone()]).unwrap().to_sql().unwrap_err();
        assert!(matches!(err, Error::ListDepth { depth: 2, .. }));
        let err = mssql_only(["x IN [", "]"], params![pairs]).unwrap().to_sql().unwrap_err();
        assert_eq!("list nesting depth 2 is not supported by mssql_only", err.to_string());

        let err = postgres(["x IN [", "]"], params![1]).unwrap().to_sql().unwrap_err();
        assert_eq!("list parameter requires a list, got number", err.to_string());
    }

    #[test]
    fn test_row_set_context() {
        let rows = vec![map! { "a" => 1, "b" => "x" }, map! { "a" => 2 }];
        let sql = mysql(["INSERT INTO t <", ">"], params![rows.clone()]).unwrap();
        assert_eq!(
            "INSERT INTO t (`a`, `b`) VALUES (1, 'x'),\n(2, DEFAULT)",
            sql.to_sql().unwrap()
        );
        let sql = sqlite(["INSERT INTO t <", ">"], params![rows]).unwrap();
        assert_eq!(
            "INSERT INTO t (\"a\", \"b\") VALUES (1, 'x'),\n(2, NULL)",
            sql.to_sql().unwrap()
        );
        let sql = postgres(["INSERT INTO t <", ">"], params![map! { "a" => 1 }]).unwrap();
        assert_eq!(r#"INSERT INTO t ("a") VALUES (1)"#, sql.to_sql().unwrap());

        let extra = vec![map! { "a" => 1 }, map! { "a" => 2, "z" => 3 }];
        let err = postgres(["<", ">"], params![extra]).unwrap().to_sql().unwrap_err();
        assert_eq!(
            r#"row #1 has column "z" which is not present in the first row"#,
            err.to_string()
        );
        let err = postgres(["<", ">"], params![Vec::<Value>::new()]).unwrap().to_sql().unwrap_err();
        assert_eq!("row-set parameter has 0 rows", err.to_string());
    }

    #[test]
    fn test_identifier_context() {
        let sql = postgres(["SELECT \"", "\" FROM t"], params!["na\"me"]).unwrap();
        assert_eq!(r#"SELECT "na""me" FROM t"#, sql.to_sql().unwrap());
        let sql = mysql(["SELECT \"", "\" FROM t"], params!["name"]).unwrap();
        assert_eq!("SELECT `name` FROM t", sql.to_sql().unwrap());
        let sql = postgres(["SELECT `", "` FROM t"], params!["s.t"]).unwrap();
        assert_eq!(r#"SELECT "s"."t" FROM t"#, sql.to_sql().unwrap());
        let err = postgres(["SELECT \"", "` FROM t"], params!["a"]).unwrap().to_sql().unwrap_err();
        assert_eq!(
            "inappropriately quoted/enclosed parameter #0: opened with `\"` but followed by Some('`')",
            err.to_string()
        );
    }

    #[test]
    fn test_name_lists() {
        let sql = postgres(["SELECT \"", "\"* FROM t"], params![["a", "b"]]).unwrap();
        assert_eq!(r#"SELECT "a", "b" FROM t"#, sql.to_sql().unwrap());
        let sql = postgres(["SELECT \"", "\"* FROM t"], params![Vec::<&str>::new()]).unwrap();
        assert_eq!("SELECT * FROM t", sql.to_sql().unwrap());
        let sql = postgres(["SELECT \"", "\", id FROM t"], params![["a"]]).unwrap();
        assert_eq!(r#"SELECT "a", id FROM t"#, sql.to_sql().unwrap());
        let sql = postgres(["SELECT \"", "\", id FROM t"], params![Vec::<&str>::new()]).unwrap();
        assert_eq!("SELECT id FROM t", sql.to_sql().unwrap());
        let sql = postgres(["INSERT INTO t (\"", "\"+)"], params![map! { "x" => 1, "y" => 2 }]).unwrap();
        assert_eq!(r#"INSERT INTO t ("x", "y")"#, sql.to_sql().unwrap());
        let err = postgres(["(\"", "\"+)"], params![Vec::<&str>::new()]).unwrap().to_sql();
        assert!(matches!(err, Err(Error::NotIterable { .. })));
    }

    #[test]
    fn test_qualifier_capture() {
        let sql = postgres(["SELECT ", ".\"", "\" FROM t AS u"], params!["u", "name"]).unwrap();
        assert_eq!(r#"SELECT "u"."name" FROM t AS u"#, sql.to_sql().unwrap());
        let sql = postgres(["SELECT ", ".\"", "\"*"], params!["u", Vec::<&str>::new()]).unwrap();
        assert_eq!(r#"SELECT "u".*"#, sql.to_sql().unwrap());
        let sql = mysql(["SET ", ".{", "}"], params!["u", map! { "a" => 1 }]).unwrap();
        assert_eq!("SET `u`.`a`=1", sql.to_sql().unwrap());
        // the qualifier only applies to the next parameter
        let sql = postgres(["", ".\"", "\" = \"", "\""], params!["u", "a", "b"]).unwrap();
        assert_eq!(r#""u"."a" = "b""#, sql.to_sql().unwrap());
    }

    #[test]
    fn test_key_value_sets() {
        let set = map! { "a" => 1, "b" => "x" };
        let sql = postgres(["UPDATE t SET {", "}"], params![set]).unwrap();
        assert_eq!(r#"UPDATE t SET "a"=1, "b"='x'"#, sql.to_sql().unwrap());
        let err = postgres(["UPDATE t SET {", "}"], params![map! {}]).unwrap().to_sql().unwrap_err();
        assert_eq!("key/value set parameter is empty", err.to_string());

        let cond = map! { "a" => 1, "b" => Value::Null, "c" => [1, 2] };
        let sql = postgres(["SELECT * FROM t WHERE {", "&"], params![cond.clone()]).unwrap();
        assert_eq!(
            r#"SELECT * FROM t WHERE ("a"=1 AND "b" IS NULL AND "c" IN (1, 2))"#,
            sql.to_sql().unwrap()
        );
        let sql = mssql(["WHERE {", "|"], params![cond]).unwrap();
        assert_eq!(
            r#"WHERE ("a"=1 OR "b" IS NULL OR "c" IN (1, 2))"#,
            sql.to_sql().unwrap()
        );

        let empty = map! {};
        let sql = postgres(["WHERE {", "& AND {", "|"], params![empty.clone(), empty.clone()]);
        assert_eq!("WHERE TRUE AND FALSE", sql.unwrap().to_sql().unwrap());
        let sql = mssql(["WHERE {", "& AND {", "|"], params![empty.clone(), empty]);
        assert_eq!("WHERE 1=1 AND 1=0", sql.unwrap().to_sql().unwrap());

        let err = postgres(["{", ")"], params![map! { "a" => 1 }]).unwrap().to_sql().unwrap_err();
        assert!(matches!(err, Error::Enclosure { index: 0, open: '{', close: Some(')') }));
    }

    #[test]
    fn test_safe_expression() {
        let sql = postgres(["SELECT * FROM t WHERE (", ")"], params!["price > 5 AND sleep(1)"]);
        assert_eq!(
            r#"SELECT * FROM t WHERE ("price" > 5 AND "sleep"(1))"#,
            sql.unwrap().to_sql().unwrap()
        );
        for attack in ["1); DROP TABLE t; --", "a, b", "x /* y */", "?"] {
            let err = postgres(["WHERE (", ")"], params![attack]).unwrap().to_sql().unwrap_err();
            assert!(err.is_unsafe(), "{attack:?}");
        }
        let sql = postgres(["LIMIT (", ")"], params![10]).unwrap();
        assert_eq!("LIMIT (10)", sql.to_sql().unwrap());
    }

    #[test]
    fn test_nested_fragments() {
        let inner = postgres(["price > '", "'"], params![5]).unwrap();
        let sql = postgres(["SELECT * FROM t WHERE ", ".(", ")"], params!["t", inner.clone()]);
        assert_eq!(
            r#"SELECT * FROM t WHERE ("t"."price" > 5)"#,
            sql.unwrap().to_sql().unwrap()
        );
        let sql = postgres(["SELECT * FROM t WHERE (", ")"], params![inner.clone()]).unwrap();
        assert_eq!("SELECT * FROM t WHERE (price > 5)", sql.to_sql().unwrap());
        let sql = postgres(["SELECT * FROM t WHERE ", ""], params![inner.clone()]).unwrap();
        assert_eq!("SELECT * FROM t WHERE price > 5", sql.to_sql().unwrap());

        // inner placeholders inherit the qualifier
        let inner = postgres(["\"", "\" = 1"], params!["id"]).unwrap();
        let sql = postgres(["", ".(", ")"], params!["b", inner]).unwrap();
        assert_eq!(r#"("b"."id" = 1)"#, sql.to_sql().unwrap());
    }

    #[test]
    fn test_cross_dialect_nesting() {
        let portable = postgres(["\"", "\" = '", "'"], params!["a", r"x\y"]).unwrap();
        let sql = mysql(["WHERE (", ")"], params![portable]).unwrap();
        assert_eq!(r"WHERE (`a` = 'x\\y')", sql.to_sql().unwrap());
        let only = postgres_only(["a"], params![]).unwrap();
        let err = mysql(["WHERE (", ")"], params![only]).unwrap().to_sql().unwrap_err();
        assert_eq!(
            "embedding a postgres_only fragment is not supported by mysql; build the fragment with mysql",
            err.to_string()
        );
    }

    #[test]
    fn test_bare_chunks() {
        let sql = mysql(["SELECT ", " FROM t"], params!["a, b"]).unwrap();
        assert_eq!("SELECT `a`, `b` FROM t", sql.to_sql().unwrap());
        let sql = mysql(["LIMIT ", ""], params![10]).unwrap();
        assert_eq!("LIMIT 10", sql.to_sql().unwrap());
        let err = mysql(["SELECT ", ""], params!["1; DROP TABLE t"]).unwrap().to_sql().unwrap_err();
        assert!(err.is_unsafe());
    }

    #[test]
    fn test_enclosure() {
        let err = mysql(["'", ""], params!["x"]).unwrap().to_sql().unwrap_err();
        assert!(matches!(err, Error::Enclosure { index: 0, open: '\'', close: None }));
        let err = mysql(["a = '", "' AND b IN [", ")"], params![1, [2]]).unwrap().to_sql().unwrap_err();
        assert!(matches!(err, Error::Enclosure { index: 1, open: '[', close: Some(')') }));
    }

    fn externalized(dialect: Dialect, values: Vec<Value>) -> (String, usize) {
        let settings = Settings::new(dialect).inline_limit(4);
        let fragment = Fragment::new(settings, ["a='", "' AND b='", "'"], values).unwrap();
        let mut sink = Vec::new();
        let bytes = fragment
            .to_bytes(Some(&mut sink), RenderOptions::default())
            .unwrap();
        (String::from_utf8(bytes).unwrap(), sink.len())
    }

    #[test]
    fn test_externalize_boundary() {
        let (sql, n) = externalized(Dialect::Postgres, params!["abcd", "abcde"]);
        assert_eq!("a='abcd' AND b=$1", sql);
        assert_eq!(1, n);
        let (sql, _) = externalized(Dialect::MySql, params!["abcde", vec![0u8; 5]]);
        assert_eq!("a=? AND b=?", sql);
        let (sql, _) = externalized(Dialect::MsSqlOnly, params!["abcde", "abcdef"]);
        assert_eq!("a=@p1 AND b=@p2", sql);

        let fragment = postgres(["'", "'"], params!["x".repeat(2000)]).unwrap();
        assert_eq!(2002, fragment.to_sql().unwrap().len());
    }

    #[test]
    fn test_externalize_sink_full() {
        let settings = Settings::new(Dialect::Sqlite).inline_limit(0);
        let fragment = Fragment::new(settings, ["x='", "'"], params!["v"]).unwrap();
        let mut sink = vec![Value::Null; MAX_SINK_PARAMS];
        let bytes = fragment
            .to_bytes(Some(&mut sink), RenderOptions::default())
            .unwrap();
        assert_eq!(b"x='v'".to_vec(), bytes);
        assert_eq!(MAX_SINK_PARAMS, sink.len());
    }

    #[test]
    fn test_externalized_nested_placeholders_revalidate() {
        let settings = Settings::new(Dialect::Postgres).inline_limit(1);
        let inner = Fragment::new(settings.clone(), ["name = '", "'"], params!["long"]).unwrap();
        let outer = Fragment::new(settings, ["", ".(", ")"], params!["u", inner]).unwrap();
        let mut sink = Vec::new();
        let bytes = outer
            .to_bytes(Some(&mut sink), RenderOptions::default())
            .unwrap();
        assert_eq!(r#"("u"."name" = $1)"#, String::from_utf8(bytes).unwrap());
        assert_eq!(1, sink.len());
    }
}
