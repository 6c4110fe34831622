use crate::{
    error::{Error, Result},
    settings::Settings,
    writer::Serializer,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafeMode {
    Expression,
    Chunk,
    Nested,
}

#[derive(Debug)]
enum EditKind {
    Quote,
    QualifyQuote,
    Delete(usize),
    Replace(usize, Vec<u8>),
}

#[derive(Debug)]
struct Edit {
    at: usize,
    kind: EditKind,
}

impl Edit {
    fn removed(&self) -> usize {
        match self.kind {
            EditKind::Quote | EditKind::QualifyQuote => 0,
            EditKind::Delete(n) | EditKind::Replace(n, _) => n,
        }
    }

    fn inserted(&self, prefix: &[u8]) -> usize {
        match &self.kind {
            EditKind::Quote => 1,
            EditKind::QualifyQuote => prefix.len() + 1,
            EditKind::Delete(_) => 0,
            EditKind::Replace(_, bytes) => bytes.len(),
        }
    }
}

/// Validate `text` as an unquoted SQL fragment and rewrite it for the target
/// dialect.
pub fn sanitize(
    text: &str,
    qualifier: Option<&str>,
    settings: &Settings,
    mode: SafeMode,
) -> Result<String> {
    let mut ser = Serializer::with_buffer(text.as_bytes().to_vec());
    sanitize_in_place(&mut ser, 0, qualifier, settings, mode)?;
    ser.into_string()
}

pub(crate) fn sanitize_in_place(
    ser: &mut Serializer,
    start: usize,
    qualifier: Option<&str>,
    settings: &Settings,
    mode: SafeMode,
) -> Result<()> {
    let prefix = match qualifier {
        Some(name) if !name.is_empty() => {
            let mut prefix = Serializer::with_capacity(name.len() + 3);
            prefix.push_qualified(name, settings.ident_quote());
            prefix.push(b'.');
            prefix.into_bytes()
        }
        _ => Vec::new(),
    };

    let edits = Scanner {
        src: ser.tail(start),
        pos: 0,
        settings,
        mode,
        qualify: !prefix.is_empty(),
        edits: Vec::new(),
    }
    .scan()?;

    if !edits.is_empty() {
        apply(ser, start, &edits, settings.ident_quote(), &prefix);
    }
    Ok(())
}

struct Span {
    src: usize,
    dst: usize,
    len: usize,
}

fn apply(ser: &mut Serializer, start: usize, edits: &[Edit], quote: u8, prefix: &[u8]) {
    let old_len = ser.len() - start;
    let new_len = edits
        .iter()
        .fold(old_len, |len, edit| len + edit.inserted(prefix) - edit.removed());
    if new_len > old_len {
        ser.ensure_room(new_len - old_len);
    }

    let buf = ser.buffer_mut();
    if new_len > old_len {
        buf.resize(start + new_len, 0);
    }

    let mut spans = Vec::with_capacity(edits.len() + 1);
    let mut inserts = Vec::with_capacity(edits.len());
    let (mut src, mut dst) = (0, 0);
    for edit in edits {
        let len = edit.at - src;
        spans.push(Span { src, dst, len });
        dst += len;
        inserts.push((dst, edit));
        dst += edit.inserted(prefix);
        src = edit.at + edit.removed();
    }
    spans.push(Span {
        src,
        dst,
        len: old_len - src,
    });

    // left moving spans front to back, right moving spans back to front
    for span in spans.iter().filter(|s| s.dst < s.src && s.len > 0) {
        buf.copy_within(start + span.src..start + span.src + span.len, start + span.dst);
    }
    for span in spans.iter().rev().filter(|s| s.dst > s.src && s.len > 0) {
        buf.copy_within(start + span.src..start + span.src + span.len, start + span.dst);
    }

    for (dst, edit) in inserts {
        let at = start + dst;
        match &edit.kind {
            EditKind::Quote => buf[at] = quote,
            EditKind::QualifyQuote => {
                buf[at..at + prefix.len()].copy_from_slice(prefix);
                buf[at + prefix.len()] = quote;
            }
            EditKind::Delete(_) => {}
            EditKind::Replace(_, bytes) => buf[at..at + bytes.len()].copy_from_slice(bytes),
        }
    }
    buf.truncate(start + new_len);
}

#[inline]
fn is_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r' | 0x0c)
}

#[inline]
fn is_word_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_' || byte >= 0x80
}

#[inline]
fn is_word(byte: u8) -> bool {
    is_word_start(byte) || byte.is_ascii_digit()
}

struct Scanner<'a> {
    src: &'a [u8],
    pos: usize,
    settings: &'a Settings,
    mode: SafeMode,
    qualify: bool,
    edits: Vec<Edit>,
}

impl Scanner<'_> {
    fn reject(&self, reason: impl Into<std::borrow::Cow<'static, str>>) -> Error {
        Error::unsafe_fragment(self.src, reason)
    }

    #[inline]
    fn peek(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn digits_from(&self, mut pos: usize) -> usize {
        while self.src.get(pos).is_some_and(u8::is_ascii_digit) {
            pos += 1;
        }
        pos
    }

    fn scan(mut self) -> Result<Vec<Edit>> {
        let mut depth = 0usize;
        let mut after_as = false;

        while let Some(byte) = self.peek(0) {
            match byte {
                _ if is_space(byte) => {
                    self.pos += 1;
                    continue;
                }
                _ if is_word_start(byte) => {
                    after_as = self.word(after_as)?;
                    continue;
                }
                b'\'' => self.string_literal()?,
                b'"' | b'`' => self.quoted_ident(byte)?,
                b'0'..=b'9' => self.number()?,
                b'(' => {
                    depth += 1;
                    self.pos += 1;
                }
                b')' => {
                    if depth == 0 {
                        return Err(self.reject("unbalanced parentheses"));
                    }
                    depth -= 1;
                    self.pos += 1;
                }
                b',' => {
                    if depth == 0 && self.mode == SafeMode::Expression {
                        return Err(self.reject("top-level comma in expression"));
                    }
                    self.pos += 1;
                }
                b'-' if self.peek(1) == Some(b'-') => return Err(self.reject("comment")),
                b'/' if self.peek(1) == Some(b'*') => return Err(self.reject("comment")),
                b'?' if self.mode == SafeMode::Nested => self.pos += 1,
                b'$' if self.mode == SafeMode::Nested
                    && self.peek(1).is_some_and(|b| b.is_ascii_digit()) =>
                {
                    self.pos = self.digits_from(self.pos + 1);
                }
                b'@' if self.mode == SafeMode::Nested
                    && matches!(self.peek(1), Some(b'p' | b'P'))
                    && self.peek(2).is_some_and(|b| b.is_ascii_digit()) =>
                {
                    self.pos = self.digits_from(self.pos + 2);
                }
                b'?' => return Err(self.reject("bind placeholder")),
                0 | b';' | b'@' | b'$' | b'#' | b':' | b'[' | b']' | b'{' | b'}' => {
                    return Err(self.reject(format!("character {:?} is not allowed", byte as char)));
                }
                _ => self.pos += 1,
            }
            after_as = false;
        }

        if depth != 0 {
            return Err(self.reject("unbalanced parentheses"));
        }
        Ok(self.edits)
    }

    fn quote_word(&mut self, start: usize, end: usize, qualify: bool) {
        let kind = if qualify {
            EditKind::QualifyQuote
        } else {
            EditKind::Quote
        };
        self.edits.push(Edit { at: start, kind });
        self.edits.push(Edit {
            at: end,
            kind: EditKind::Quote,
        });
    }

    fn word(&mut self, after_as: bool) -> Result<bool> {
        let src = self.src;
        let start = self.pos;
        let mut end = start;
        while end < src.len() && is_word(src[end]) {
            end += 1;
        }
        self.pos = end;

        let word = &src[start..end];
        let next = src.get(end).copied();

        // a prefix glued to a string changes how the server lexes it
        if next == Some(b'\'') {
            return match word {
                b"x" | b"X" => self.hex_literal(start).map(|_| false),
                b"n" | b"N" => Ok(false),
                b"b" | b"B" => self.bit_literal(start).map(|_| false),
                _ => Err(self.reject("unsupported string literal prefix")),
            };
        }
        if matches!(word, b"u" | b"U")
            && next == Some(b'&')
            && matches!(src.get(end + 1), Some(b'\'' | b'"'))
        {
            return Err(self.reject("unicode escape literal"));
        }
        if word == b"AS" || word == b"as" {
            return Ok(true);
        }

        let settings = self.settings;
        let allowed = settings.idents().allows(word);
        let mut paren = end;
        while paren < src.len() && is_space(src[paren]) {
            paren += 1;
        }
        let call = src.get(paren) == Some(&b'(');

        // alias definition
        if after_as && !call {
            if settings.is_always_quote() {
                self.quote_word(start, end, false);
            }
            return Ok(false);
        }

        let dot_before = start > 0 && src[start - 1] == b'.';
        if dot_before || next == Some(b'.') {
            if settings.is_always_quote() || !allowed {
                self.quote_word(start, end, false);
            }
            return Ok(false);
        }

        if allowed {
            return Ok(false);
        }

        if call {
            if settings.functions().allows(word) {
                if paren > end {
                    self.edits.push(Edit {
                        at: end,
                        kind: EditKind::Delete(paren - end),
                    });
                }
            } else {
                self.quote_word(start, end, false);
            }
            return Ok(false);
        }

        self.quote_word(start, end, self.qualify);
        Ok(false)
    }

    fn string_literal(&mut self) -> Result<()> {
        let src = self.src;
        let backslash = self.settings.uses_backslash_escapes();
        let mut pos = self.pos + 1;
        loop {
            match src.get(pos) {
                None => return Err(self.reject("unterminated string literal")),
                Some(0) => return Err(self.reject("NUL inside string literal")),
                Some(b'\'') => {
                    if src.get(pos + 1) == Some(&b'\'') {
                        pos += 2;
                        continue;
                    }
                    self.pos = pos + 1;
                    return Ok(());
                }
                Some(b'\\') if backslash => {
                    match src.get(pos + 1) {
                        None => return Err(self.reject("unterminated string literal")),
                        Some(0) => return Err(self.reject("NUL inside string literal")),
                        Some(b'\'') => self.edits.push(Edit {
                            at: pos,
                            kind: EditKind::Replace(2, b"''".to_vec()),
                        }),
                        Some(_) => {}
                    }
                    pos += 2;
                }
                Some(_) => pos += 1,
            }
        }
    }

    fn quoted_ident(&mut self, open: u8) -> Result<()> {
        let src = self.src;
        let target = self.settings.ident_quote();
        let start = self.pos;
        let mut name = Vec::new();
        let mut pos = start + 1;
        loop {
            match src.get(pos) {
                None => return Err(self.reject("unterminated quoted identifier")),
                Some(0) => return Err(self.reject("NUL inside quoted identifier")),
                Some(&byte) if byte == open => {
                    if src.get(pos + 1) == Some(&open) {
                        name.push(open);
                        pos += 2;
                        continue;
                    }
                    pos += 1;
                    break;
                }
                Some(&byte) => {
                    name.push(byte);
                    pos += 1;
                }
            }
        }
        if name.is_empty() {
            return Err(self.reject("empty quoted identifier"));
        }
        self.pos = pos;

        let mut quoted = Vec::with_capacity(name.len() + 2);
        quoted.push(target);
        for byte in name {
            quoted.push(byte);
            if byte == target {
                quoted.push(byte);
            }
        }
        quoted.push(target);

        if quoted != src[start..pos] {
            self.edits.push(Edit {
                at: start,
                kind: EditKind::Replace(pos - start, quoted),
            });
        }
        Ok(())
    }

    fn hex_literal(&mut self, start: usize) -> Result<()> {
        let src = self.src;
        let digits_start = start + 2;
        let mut pos = digits_start;
        while src.get(pos).is_some_and(u8::is_ascii_hexdigit) {
            pos += 1;
        }
        if src.get(pos) != Some(&b'\'') || (pos - digits_start) % 2 != 0 {
            return Err(self.reject("malformed hex literal"));
        }
        self.pos = pos + 1;

        if self.settings.is_mssql() {
            let mut bytes = Vec::with_capacity(pos - digits_start + 2);
            bytes.extend_from_slice(b"0x");
            bytes.extend_from_slice(&src[digits_start..pos]);
            self.edits.push(Edit {
                at: start,
                kind: EditKind::Replace(self.pos - start, bytes),
            });
        }
        Ok(())
    }

    fn bit_literal(&mut self, start: usize) -> Result<()> {
        let src = self.src;
        let mut pos = start + 2;
        while matches!(src.get(pos), Some(b'0' | b'1')) {
            pos += 1;
        }
        if src.get(pos) != Some(&b'\'') {
            return Err(self.reject("malformed bit literal"));
        }
        self.pos = pos + 1;
        Ok(())
    }

    fn number(&mut self) -> Result<()> {
        let src = self.src;
        let mut pos = self.pos;
        if src[pos] == b'0' && matches!(src.get(pos + 1), Some(b'x' | b'X')) {
            pos += 2;
            while src.get(pos).is_some_and(u8::is_ascii_hexdigit) {
                pos += 1;
            }
        } else {
            pos = self.digits_from(pos);
            if src.get(pos) == Some(&b'.') {
                pos = self.digits_from(pos + 1);
            }
            if matches!(src.get(pos), Some(b'e' | b'E')) {
                let mut exp = pos + 1;
                if matches!(src.get(exp), Some(b'+' | b'-')) {
                    exp += 1;
                }
                if src.get(exp).is_some_and(u8::is_ascii_digit) {
                    pos = self.digits_from(exp);
                }
            }
        }
        if src.get(pos).is_some_and(|b| is_word(*b)) {
            return Err(self.reject("malformed number"));
        }
        self.pos = pos;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::dialect::Dialect;

    use super::*;

    fn pg(text: &str, qualifier: Option<&str>) -> String {
        let settings = Settings::new(Dialect::Postgres);
        sanitize(text, qualifier, &settings, SafeMode::Chunk).unwrap()
    }

    fn rejects(text: &str, mode: SafeMode) -> bool {
        let settings = Settings::new(Dialect::MySql);
        matches!(
            sanitize(text, None, &settings, mode),
            Err(Error::Unsafe { .. })
        )
    }

    #[test]
    fn test_quote_and_qualify() {
        assert_eq!(r#""price" * 2"#, pg("price * 2", None));
        assert_eq!(r#""t"."price" * 2"#, pg("price * 2", Some("t")));
        assert_eq!(r#""s"."t"."price""#, pg("price", Some("s.t")));
        let settings = Settings::new(Dialect::MySql);
        assert_eq!(
            "`price`",
            sanitize("price", None, &settings, SafeMode::Expression).unwrap()
        );
    }

    #[test]
    fn test_keywords_stay_bare() {
        assert_eq!(
            r#""t"."a" IS NOT NULL AND "t"."b" IN (1, 2)"#,
            pg("a IS NOT NULL AND b IN (1, 2)", Some("t"))
        );
        assert_eq!(
            r#"CASE WHEN "x" > 1 THEN 'y' ELSE NULL END"#,
            pg("CASE WHEN x > 1 THEN 'y' ELSE NULL END", None)
        );
    }

    #[test]
    fn test_function_allow_list() {
        assert_eq!(r#"count("id") + "sleep"(1)"#, pg("count (id) + sleep(1)", None));
        assert_eq!(r#""sleep" (1)"#, pg("sleep (1)", Some("t")));
        assert_eq!(r#"COALESCE("t"."a", 0)"#, pg("COALESCE(a, 0)", Some("t")));
    }

    #[test]
    fn test_as_alias() {
        assert_eq!(r#"CAST("t"."x" AS INT)"#, pg("CAST(x AS INT)", Some("t")));
        assert_eq!(r#""t"."total" AS sum_total"#, pg("total AS sum_total", Some("t")));
        let settings = Settings::new(Dialect::Postgres).always_quote(true);
        assert_eq!(
            r#""total" AS "sum_total""#,
            sanitize("total AS sum_total", None, &settings, SafeMode::Chunk).unwrap()
        );
        // only the exact two letter token counts
        assert_eq!(r#""t"."x" As "t"."y""#, pg("x As y", Some("t")));
    }

    #[test]
    fn test_dotted_names() {
        assert_eq!(r#""u"."name" = "t"."id""#, pg("u.name = id", Some("t")));
        assert_eq!(r#""u".*"#, pg("u.*", Some("t")));
        let settings = Settings::new(Dialect::Postgres).always_quote(true);
        assert_eq!(
            r#""u"."desc""#,
            sanitize("u.desc", None, &settings, SafeMode::Chunk).unwrap()
        );
    }

    #[test]
    fn test_quoted_identifiers() {
        assert_eq!(r#""a`b" + "c""#, pg("`a``b` + \"c\"", Some("t")));
        let settings = Settings::new(Dialect::MySql);
        assert_eq!(
            "`x\"y`.`z`",
            sanitize(r#""x""y"."z""#, None, &settings, SafeMode::Chunk).unwrap()
        );
    }

    #[test]
    fn test_string_literals() {
        let mysql = Settings::new(Dialect::MySql);
        assert_eq!(
            r"'it''s \\ fine'",
            sanitize(r"'it\'s \\ fine'", None, &mysql, SafeMode::Chunk).unwrap()
        );
        assert_eq!(r"'a\' || 'b'", pg(r"'a\' || 'b'", None));
        assert_eq!("N'x'", pg("N'x'", None));
    }

    #[test]
    fn test_hex_literals() {
        let mssql = Settings::new(Dialect::MsSql);
        assert_eq!(
            r#"0x0aFF + "t"."price""#,
            sanitize("x'0aFF' + price", Some("t"), &mssql, SafeMode::Chunk).unwrap()
        );
        assert_eq!("x'0aff'", pg("x'0aff'", None));
        assert!(rejects("x'0a0'", SafeMode::Chunk));
        assert!(rejects("x'zz'", SafeMode::Chunk));
    }

    #[test]
    fn test_rejects() {
        for text in [
            "1; drop table t",
            "a -- c",
            "a /* c */",
            "@@version",
            "$1",
            "a::int",
            "[a]",
            "{a}",
            "#a",
            "a ? b",
            "(a",
            "a)",
            "'abc",
            "\"abc",
            "`abc",
            "a\0",
            "'a\0'",
            "1union",
            "``",
        ] {
            assert!(rejects(text, SafeMode::Chunk), "{text:?} was accepted");
        }
    }

    #[test]
    fn test_string_prefixes() {
        let blacklist = Settings::with_words(Dialect::Postgres, Some("!drop"), None);
        let defaults = Settings::new(Dialect::Postgres);
        for text in [
            r"E'\' || '; DROP TABLE t; --'",
            r"x AS E'\' || '; DROP TABLE t; --'",
            "e'abc'",
            "U&'d\\0061t'",
            "u&\"d\\0061t\"",
            "_utf8'abc'",
            "b'012'",
        ] {
            for settings in [&blacklist, &defaults] {
                let result = sanitize(text, None, settings, SafeMode::Chunk);
                assert!(matches!(result, Err(Error::Unsafe { .. })), "{text:?} gave {result:?}");
            }
        }
        assert_eq!("B'0101' | b''", pg("B'0101' | b''", None));
        assert_eq!(r#""u" & "v""#, pg("u & v", None));
    }

    #[test]
    fn test_call_after_as() {
        assert_eq!(r#"1 AS "pg_sleep"(5)"#, pg("1 AS pg_sleep(5)", None));
        assert_eq!(r#"1 AS "pg_sleep" (5)"#, pg("1 AS pg_sleep (5)", Some("t")));
        assert_eq!(r#""t"."a" AS count("t"."b")"#, pg("a AS count (b)", Some("t")));
        assert_eq!("1 AS pg_sleep", pg("1 AS pg_sleep", None));
    }

    #[test]
    fn test_top_level_comma() {
        assert!(rejects("a, b", SafeMode::Expression));
        assert!(!rejects("f(a, b)", SafeMode::Expression));
        assert!(!rejects("a, b", SafeMode::Chunk));
    }

    #[test]
    fn test_nested_placeholders() {
        let settings = Settings::new(Dialect::Postgres);
        assert_eq!(
            r#""a" = ? AND "b" = $2 AND "c" = @p3"#,
            sanitize("a = ? AND b = $2 AND c = @p3", None, &settings, SafeMode::Nested).unwrap()
        );
        assert!(sanitize("@x", None, &settings, SafeMode::Nested).is_err());
        assert!(sanitize("$x", None, &settings, SafeMode::Nested).is_err());
    }

    #[test]
    fn test_custom_word_lists() {
        let settings = Settings::with_words(Dialect::Postgres, Some("!drop"), None);
        assert_eq!(
            r#"select "drop", x"#,
            sanitize("select drop, x", None, &settings, SafeMode::Chunk).unwrap()
        );
        let settings = Settings::with_words(Dialect::Postgres, None, Some("!sleep"));
        assert_eq!(
            r#""sleep"(1) + pg_sleep(2)"#,
            sanitize("sleep(1) + pg_sleep(2)", None, &settings, SafeMode::Chunk).unwrap()
        );
    }

    #[test]
    fn test_in_place_after_prefix() {
        let settings = Settings::new(Dialect::MsSql);
        let mut ser = Serializer::new();
        ser.push_str("WHERE ");
        let start = ser.len();
        ser.push_str("x'00' = blob AND  count (n) > 1");
        sanitize_in_place(&mut ser, start, Some("b"), &settings, SafeMode::Chunk).unwrap();
        assert_eq!(
            r#"WHERE 0x00 = "b"."blob" AND  count("b"."n") > 1"#,
            ser.into_string().unwrap()
        );
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "price * 2",
            "count (id) + sleep (1)",
            "CAST(x AS INT)",
            "u.name = `id`",
            "'it''s' || x'0a'",
            r#""a""b" AS c"#,
            "CASE WHEN a IN (1, 2) THEN 1.5e3 ELSE 0x1F END",
        ];
        for dialect in Dialect::ALL {
            for always_quote in [false, true] {
                let settings = Settings::new(dialect).always_quote(always_quote);
                for qualifier in [None, Some("t")] {
                    for text in inputs {
                        let once = sanitize(text, qualifier, &settings, SafeMode::Chunk).unwrap();
                        let twice = sanitize(&once, qualifier, &settings, SafeMode::Chunk).unwrap();
                        assert_eq!(once, twice, "{dialect} {text:?}");
                    }
                }
            }
        }
    }
}
