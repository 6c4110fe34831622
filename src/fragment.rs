use std::{borrow::Cow, sync::Arc};

use smol_str::SmolStr;

use crate::{
    dialect::{Dialect, HasDialect},
    error::{Error, Result},
    quote,
    render::Renderer,
    settings::Settings,
    value::Value,
    writer::Serializer,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    pub no_backslash_escapes: Option<bool>,
}

/// A SQL template: literal chunks interleaved with runtime values.
#[derive(Debug, Clone)]
pub struct Fragment {
    settings: Arc<Settings>,
    chunks: Vec<SmolStr>,
    params: Vec<Value>,
    size_hint: usize,
}

impl Fragment {
    pub fn new<C, S>(settings: impl Into<Arc<Settings>>, chunks: C, params: Vec<Value>) -> Result<Self>
    where
        C: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        let chunks: Vec<SmolStr> = chunks.into_iter().map(Into::into).collect();
        if chunks.len() != params.len() + 1 {
            return Err(Error::ChunkCount {
                chunks: chunks.len(),
                params: params.len(),
            });
        }
        let size_hint = chunks.iter().map(|c| c.len()).sum::<usize>()
            + params.iter().map(quote::estimate).sum::<usize>();
        Ok(Self {
            settings: settings.into(),
            chunks,
            params,
            size_hint,
        })
    }

    pub fn of<D, C, S>(chunks: C, params: Vec<Value>) -> Result<Self>
    where
        D: HasDialect,
        C: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        Self::new(Settings::shared(D::DIALECT), chunks, params)
    }

    pub fn empty(settings: impl Into<Arc<Settings>>) -> Self {
        Self {
            settings: settings.into(),
            chunks: vec![SmolStr::default()],
            params: Vec::new(),
            size_hint: 0,
        }
    }

    #[inline]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[inline]
    pub fn dialect(&self) -> Dialect {
        self.settings.dialect()
    }

    pub fn chunks(&self) -> &[SmolStr] {
        &self.chunks
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    #[inline]
    pub fn size_hint(&self) -> usize {
        self.size_hint
    }

    pub fn push_sql(&mut self, sql: &str) -> &mut Self {
        if sql.is_empty() {
            return self;
        }
        if let Some(last) = self.chunks.last_mut() {
            let mut joined = String::with_capacity(last.len() + sql.len());
            joined.push_str(last);
            joined.push_str(sql);
            *last = joined.into();
        }
        self.size_hint += sql.len();
        self
    }

    pub fn push_param(&mut self, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        self.size_hint += quote::estimate(&value);
        self.params.push(value);
        self.chunks.push(SmolStr::default());
        self
    }

    pub fn concat(&mut self, other: Fragment) -> Result<&mut Self> {
        check_embeddable(&self.settings, &other.settings)?;
        let mut chunks = other.chunks.into_iter();
        if let Some(first) = chunks.next() {
            self.push_sql(&first);
        }
        self.chunks.extend(chunks);
        self.params.extend(other.params);
        self.size_hint += other.size_hint;
        Ok(self)
    }

    pub fn to_sql(&self) -> Result<String> {
        let mut ser = Serializer::with_capacity(self.size_hint);
        self.render_into(&mut ser, None, RenderOptions::default())?;
        ser.into_string()
    }

    pub fn to_bytes(&self, sink: Option<&mut Vec<Value>>, options: RenderOptions) -> Result<Vec<u8>> {
        let mut ser = Serializer::with_capacity(self.size_hint);
        self.render_into(&mut ser, sink, options)?;
        Ok(ser.into_bytes())
    }

    pub fn render_into(
        &self,
        ser: &mut Serializer,
        sink: Option<&mut Vec<Value>>,
        options: RenderOptions,
    ) -> Result<()> {
        let settings = match options.no_backslash_escapes {
            Some(value) if value == self.settings.uses_backslash_escapes() => {
                Cow::Owned((*self.settings).clone().no_backslash_escapes(value))
            }
            _ => Cow::Borrowed(&*self.settings),
        };

        let start = ser.len();
        ser.ensure_room(self.size_hint);
        let result = Renderer::new(&settings, ser, sink).render(self, None);
        match result {
            Ok(()) => {
                tracing::trace!(
                    dialect = %settings.dialect(),
                    len = ser.len() - start,
                    "rendered fragment"
                );
                Ok(())
            }
            Err(err) => {
                ser.truncate(start);
                Err(err)
            }
        }
    }
}

pub(crate) fn check_embeddable(parent: &Settings, child: &Settings) -> Result<()> {
    let dialect = child.dialect();
    if dialect.is_only() && dialect.family() != parent.family() {
        return Err(Error::unsupported(
            format!("embedding a {dialect} fragment"),
            parent.dialect(),
            format!("build the fragment with {}", parent.dialect()),
        ));
    }
    Ok(())
}
