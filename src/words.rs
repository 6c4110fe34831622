use std::{
    collections::HashMap,
    sync::{Arc, LazyLock},
};

use smol_str::SmolStr;

pub const DEFAULT_IDENTS: &str = "\
    AND ANY ALL AS ASC BETWEEN BINARY BOTH BY CASE COLLATE CURRENT_DATE \
    CURRENT_TIME CURRENT_TIMESTAMP DESC DISTINCT DIV ELSE END ESCAPE EXISTS \
    FALSE FIRST FOLLOWING FROM GLOB ILIKE IN INTERVAL IS LAST LEADING LIKE MOD \
    NOT NULL NULLS OR ORDER OVER PARTITION PRECEDING RANGE REGEXP ROWS SIMILAR \
    SOME THEN TO TRAILING TRUE UNBOUNDED UNKNOWN WHEN XOR CURRENT ROW";

pub const DEFAULT_FUNCTIONS: &str = "\
    ABS AVG CAST CEIL CEILING CHAR_LENGTH COALESCE CONCAT COUNT DATE DENSE_RANK \
    EXTRACT FLOOR GREATEST IFNULL ISNULL JSON_EXTRACT LEAST LEFT LENGTH LOWER LTRIM \
    MAX MIN NULLIF POWER RANK REPLACE RIGHT ROUND ROW_NUMBER RTRIM SIGN SQRT SUBSTR \
    SUBSTRING SUM TRIM UPPER";

pub(crate) static DEFAULT_IDENT_LIST: LazyLock<Arc<WordList>> =
    LazyLock::new(|| Arc::new(WordList::parse(DEFAULT_IDENTS)));

pub(crate) static DEFAULT_FUNCTION_LIST: LazyLock<Arc<WordList>> =
    LazyLock::new(|| Arc::new(WordList::parse(DEFAULT_FUNCTIONS)));

/// A case-insensitive whitelist or blacklist of words.
#[derive(Debug, Clone, Default)]
pub struct WordList {
    blacklist: bool,
    words: Vec<SmolStr>,
    index: HashMap<u32, Vec<u32>>,
}

#[inline]
fn bucket_key(word: &[u8]) -> u32 {
    let len = word.len();
    let first = word.first().map_or(0, u8::to_ascii_uppercase);
    let second = word.get(1).map_or(0, u8::to_ascii_uppercase);
    let last = word.last().map_or(0, u8::to_ascii_uppercase);
    u32::from_le_bytes([first, second, last, len.min(255) as u8])
}

impl WordList {
    pub fn parse(definition: &str) -> Self {
        let trimmed = definition.trim_start();
        let (blacklist, body) = match trimmed.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let mut words: Vec<SmolStr> = body
            .split_whitespace()
            .map(|w| SmolStr::new(w.to_ascii_uppercase()))
            .collect();
        words.sort_unstable();
        words.dedup();

        let mut index: HashMap<u32, Vec<u32>> = HashMap::with_capacity(words.len());
        for (i, word) in words.iter().enumerate() {
            index
                .entry(bucket_key(word.as_bytes()))
                .or_default()
                .push(i as u32);
        }

        Self {
            blacklist,
            words,
            index,
        }
    }

    #[inline]
    pub fn is_blacklist(&self) -> bool {
        self.blacklist
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn contains(&self, word: &[u8]) -> bool {
        let Some(bucket) = self.index.get(&bucket_key(word)) else {
            return false;
        };
        bucket
            .iter()
            .any(|&i| self.words[i as usize].as_bytes().eq_ignore_ascii_case(word))
    }

    #[inline]
    pub fn allows(&self, word: &[u8]) -> bool {
        self.contains(word) != self.blacklist
    }

    pub fn definition(&self) -> String {
        let mut out = String::with_capacity(self.words.iter().map(|w| w.len() + 1).sum::<usize>() + 1);
        if self.blacklist {
            out.push('!');
        }
        for (i, word) in self.words.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(word);
        }
        out
    }
}
