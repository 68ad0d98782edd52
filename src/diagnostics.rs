//! Accumulated diagnostics for schema and value compilation.
//!
//! The core (catalog, value compiler) produces messages without source locations; the
//! grammar front end attaches a [`Span`] before pushing them here. A compilation is
//! considered failed when [`Diagnostics::has_errors`] is true, even though individual
//! productions recovered with placeholders.

use std::fmt;

/// Category of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Duplicate or incompatible name binding.
    DefinitionConflict,
    /// Unknown name, or a name bound to the wrong kind of declaration.
    TypeResolution,
    /// Value or sub-range outside a numeric type's bounds, or an incompatible modifier.
    RangeViolation,
    /// Too few or too many literal values for the expected structure.
    DepthImbalance,
    /// Literal of the wrong kind for the expected type.
    LiteralKind,
    /// Fixed string/blob literal whose length differs from the declared size.
    LengthMismatch,
    /// Wire read past the end of the buffer.
    ReadPastEnd,
    /// Grammar error from the front end.
    Syntax,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::DefinitionConflict => "definition-conflict",
            ErrorKind::TypeResolution => "type-resolution",
            ErrorKind::RangeViolation => "range-violation",
            ErrorKind::DepthImbalance => "depth-imbalance",
            ErrorKind::LiteralKind => "literal-kind",
            ErrorKind::LengthMismatch => "length-mismatch",
            ErrorKind::ReadPastEnd => "read-past-end",
            ErrorKind::Syntax => "syntax",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 1-based line and column in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Option<Span>,
}

impl Diagnostic {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Diagnostic {
            kind,
            message: message.into(),
            span: None,
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.span {
            Some(s) => write!(f, "{}:{}: {}", s.line, s.column, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Collection of diagnostics from one compilation pass.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, d: Diagnostic) {
        tracing::debug!(kind = %d.kind, message = %d.message, "diagnostic");
        self.0.push(d);
    }

    pub fn error(&mut self, kind: ErrorKind, message: impl Into<String>, span: Option<Span>) {
        self.push(Diagnostic {
            kind,
            message: message.into(),
            span,
        });
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn has_errors(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.0
    }

    pub fn count_of(&self, kind: ErrorKind) -> usize {
        self.0.iter().filter(|d| d.kind == kind).count()
    }

    pub fn first_of(&self, kind: ErrorKind) -> Option<&Diagnostic> {
        self.0.iter().find(|d| d.kind == kind)
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", d)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<T: IntoIterator<Item = Diagnostic>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
