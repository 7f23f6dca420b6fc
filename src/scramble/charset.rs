use super::glyphs::DEFAULT_GLYPHS;
use super::random::RandomSource;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::trace;

static DEFAULT_CHARSET: Lazy<Charset> = Lazy::new(|| Charset::new(DEFAULT_GLYPHS.iter().copied()));

/// An ordered sequence of substitute glyphs a position may show while scrambled.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Charset(Vec<char>);

impl Charset {
    pub fn new<I: IntoIterator<Item = char>>(glyphs: I) -> Self {
        Self(glyphs.into_iter().collect())
    }

    /// The built in glitch palette.
    pub fn builtin() -> Self {
        DEFAULT_CHARSET.clone()
    }

    pub fn glyphs(&self) -> &[char] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, glyph: char) -> bool {
        self.0.contains(&glyph)
    }

    /// Draw a glyph uniformly, weighted by how many times it appears.
    pub fn draw(&self, random: &mut dyn RandomSource) -> Option<char> {
        if self.0.is_empty() {
            return None;
        }
        Some(self.0[random.next_index(self.0.len())])
    }
}

impl From<&str> for Charset {
    fn from(text: &str) -> Self {
        Self::new(text.chars())
    }
}

/// The value held by a named shared variable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Variable {
    /// A charset string.
    Text(String),

    /// A prebuilt per character mapping, each value being a literal charset.
    Mapping(HashMap<char, String>),
}

/// The scope a variable is declared in. Page scope shadows process scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Page,
    Process,
}

/// A read only registry of named variables used for charset and mapping indirection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VariableRegistry {
    page: HashMap<String, Variable>,
    process: HashMap<String, Variable>,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, scope: Scope, name: impl Into<String>, value: Variable) -> Self {
        self.insert(scope, name, value);
        self
    }

    pub fn insert(&mut self, scope: Scope, name: impl Into<String>, value: Variable) {
        let variables = match scope {
            Scope::Page => &mut self.page,
            Scope::Process => &mut self.process,
        };
        variables.insert(name.into(), value);
    }

    /// Look a variable up, consulting the page scope before the process scope.
    pub fn lookup(&self, name: &str) -> Option<&Variable> {
        self.page.get(name).or_else(|| self.process.get(name))
    }

    /// Look up a variable and return it only if it holds a string.
    pub fn lookup_text(&self, name: &str) -> Option<&str> {
        match self.lookup(name)? {
            Variable::Text(text) => Some(text),
            Variable::Mapping(_) => None,
        }
    }
}

/// A reference to a charset, classified by how it should be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Reference<'a> {
    /// `$name`: strictly a variable lookup.
    Variable { name: &'a str, raw: &'a str },

    /// Either a variable name or a literal glyph string.
    Bare(&'a str),
}

impl<'a> Reference<'a> {
    pub(crate) fn parse(reference: &'a str) -> Option<Self> {
        if reference.is_empty() {
            return None;
        }
        match reference.strip_prefix('$') {
            Some(name) => Some(Self::Variable { name, raw: reference }),
            None => Some(Self::Bare(reference)),
        }
    }
}

/// Resolves charset references against a variable registry.
///
/// Resolution never fails: a reference that can't be found is used as a literal charset.
#[derive(Debug, Clone, Copy)]
pub struct CharsetResolver<'a> {
    registry: &'a VariableRegistry,
}

impl<'a> CharsetResolver<'a> {
    pub fn new(registry: &'a VariableRegistry) -> Self {
        Self { registry }
    }

    /// Resolve a reference, using `default` when it is absent or empty.
    pub fn resolve(&self, reference: Option<&str>, default: &Charset) -> Charset {
        let Some(reference) = reference.and_then(Reference::parse) else {
            return default.clone();
        };
        let resolved = match reference {
            Reference::Variable { name, raw } => match self.registry.lookup_text(name) {
                Some(text) => text,
                None => {
                    trace!("charset variable '{name}' not found, using '{raw}' literally");
                    raw
                }
            },
            Reference::Bare(token) => self.registry.lookup_text(token).unwrap_or(token),
        };
        if resolved.is_empty() {
            return default.clone();
        }
        Charset::from(resolved)
    }
}
