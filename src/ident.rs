use std::{borrow::Cow, fmt, sync::Arc};

use smol_str::SmolStr;

use crate::{
    error::{Error, Result},
    writer::Serializer,
};

pub const BASE_ALIASES: [&str; 4] = ["b", "base", "base_table", "_base_table"];

pub const SUBJECT_ALIASES: [&str; 4] = ["subj", "subject", "subj_table", "_subj_table"];

#[derive(Debug, Default, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ident(SmolStr);

pub trait IntoIdent {
    fn into_ident(self) -> Ident;
}

impl IntoIdent for Ident {
    fn into_ident(self) -> Ident {
        self
    }
}

impl IntoIdent for &str {
    #[inline]
    fn into_ident(self) -> Ident {
        Ident::new(self)
    }
}

impl IntoIdent for &String {
    #[inline]
    fn into_ident(self) -> Ident {
        Ident::new(self)
    }
}

impl IntoIdent for String {
    #[inline(always)]
    fn into_ident(self) -> Ident {
        Ident::new(self)
    }
}

impl IntoIdent for Box<str> {
    #[inline]
    fn into_ident(self) -> Ident {
        Ident::new(self)
    }
}

impl IntoIdent for Arc<str> {
    #[inline]
    fn into_ident(self) -> Ident {
        Ident::new(self)
    }
}

impl<'a> IntoIdent for Cow<'a, str> {
    #[inline]
    fn into_ident(self) -> Ident {
        Ident::new(self)
    }
}

impl IntoIdent for SmolStr {
    #[inline(always)]
    fn into_ident(self) -> Ident {
        Ident::new(self)
    }
}

impl Ident {
    #[inline]
    pub fn new<T>(value: T) -> Self
    where
        T: Into<SmolStr>,
    {
        Self(value.into())
    }

    #[inline]
    pub fn new_static(value: &'static str) -> Self {
        Self(SmolStr::new_static(value))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_reserved(&self) -> bool {
        is_reserved(self.as_str())
    }

    pub(crate) fn into_inner(self) -> SmolStr {
        self.0
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn is_reserved(name: &str) -> bool {
    name == BASE_ALIASES[3] || name == SUBJECT_ALIASES[3]
}

pub(crate) fn check_reserved(name: &str) -> Result<()> {
    if is_reserved(name) {
        return Err(Error::ReservedAlias(name.to_owned()));
    }
    Ok(())
}

pub(crate) fn pick_alias(
    chain: &[&'static str; 4],
    taken: impl Fn(&str) -> bool,
) -> Result<&'static str> {
    chain
        .iter()
        .copied()
        .find(|alias| !taken(alias))
        .ok_or_else(|| Error::usage(format!("no free alias left in {chain:?}")))
}

pub(crate) fn write_name(ser: &mut Serializer, qualifier: Option<&str>, name: &str, quote: u8) {
    if let Some(qualifier) = qualifier.filter(|q| !q.is_empty()) {
        ser.push_qualified(qualifier, quote);
        ser.push(b'.');
    }
    ser.push_qualified(name, quote);
}
