//! Parse DC source with PEST and drive the catalog and the value compiler.
//!
//! The tree walk turns declarations into [`Module`] calls and value literals into
//! [`ValueCompiler`] events. Semantic errors are recorded with their line and column and
//! parsing continues; a grammar error stops the file.

use crate::compiler::{CompileError, Composite, Literal, ValueCompiler};
use crate::diagnostics::{Diagnostic, Diagnostics, ErrorKind, Span};
use crate::module::{Import, Module, RecordBuilder, SchemaError};
use crate::range::{ArrayRange, Number, NumericRange};
use crate::types::{Field, Method, NumericKind, Parameter, Type, TypeRef};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser as PestParser;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(PestParser)]
#[grammar = "grammar.pest"]
struct DcParser;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Parse(Diagnostics),
}

/// Parse one DC file into a new catalog.
pub fn parse_dcfile(source: &str) -> Result<Module, Diagnostics> {
    let mut module = Module::new();
    let diags = parse_dcfile_into(&mut module, source);
    if diags.has_errors() {
        return Err(diags);
    }
    Ok(module)
}

/// Parse a DC file into an existing catalog, so several files can share one.
pub fn parse_dcfile_into(module: &mut Module, source: &str) -> Diagnostics {
    let pair = match DcParser::parse(Rule::dcfile, source) {
        Ok(mut pairs) => match pairs.next() {
            Some(p) => p,
            None => return Diagnostics::new(),
        },
        Err(e) => return syntax_error(&e),
    };
    let mut b = Builder {
        module,
        diags: Diagnostics::new(),
    };
    for decl in pair.into_inner() {
        match decl.as_rule() {
            Rule::plain_import | Rule::from_import => b.build_import(decl),
            Rule::keyword_decl => b.build_keywords(decl),
            Rule::typedef_decl => b.build_typedef(decl),
            Rule::struct_decl => b.build_struct(decl),
            Rule::class_decl => b.build_class(decl),
            _ => {}
        }
    }
    tracing::debug!(errors = b.diags.len(), "dc file parsed");
    b.diags
}

/// Read and parse a DC file from disk.
pub fn read_dcfile(path: impl AsRef<Path>) -> Result<Module, LoadError> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_dcfile(&source).map_err(LoadError::Parse)
}

/// Compile a value literal against `ty` into its wire encoding.
pub fn parse_value(ty: &TypeRef, source: &str) -> Result<Vec<u8>, Diagnostics> {
    let pair = match DcParser::parse(Rule::value_input, source) {
        Ok(mut pairs) => pairs.next(),
        Err(e) => return Err(syntax_error(&e)),
    };
    let mut diags = Diagnostics::new();
    let Some(value) = pair.and_then(|p| p.into_inner().next()) else {
        return Err(diags);
    };
    match compile_value(ty, value, &mut diags) {
        Some(bytes) => Ok(bytes),
        None => Err(diags),
    }
}

/// Parse a type expression (`uint16(0-100)/10`, `string(8)`, `Point[]`, ...) against the
/// names declared in `module`.
pub fn parse_type(module: &mut Module, source: &str) -> Result<TypeRef, Diagnostics> {
    let pair = match DcParser::parse(Rule::type_input, source) {
        Ok(mut pairs) => pairs.next(),
        Err(e) => return Err(syntax_error(&e)),
    };
    let mut b = Builder {
        module,
        diags: Diagnostics::new(),
    };
    let ty = pair
        .and_then(|p| p.into_inner().next())
        .and_then(|t| b.build_type(t));
    match ty {
        Some(ty) if !b.diags.has_errors() => Ok(ty),
        _ => Err(b.diags),
    }
}

fn syntax_error(e: &pest::error::Error<Rule>) -> Diagnostics {
    let (line, column) = match e.line_col {
        pest::error::LineColLocation::Pos(p) => p,
        pest::error::LineColLocation::Span(start, _) => start,
    };
    let message = match &e.variant {
        pest::error::ErrorVariant::ParsingError { positives, .. } if !positives.is_empty() => {
            let expected: Vec<String> = positives.iter().map(|r| format!("{:?}", r)).collect();
            format!("expected {}", expected.join(", "))
        }
        pest::error::ErrorVariant::ParsingError { .. } => "unexpected input".to_string(),
        pest::error::ErrorVariant::CustomError { message } => message.clone(),
    };
    let mut diags = Diagnostics::new();
    diags.error(ErrorKind::Syntax, message, Some(Span { line, column }));
    diags
}

fn span_of(pair: &Pair<Rule>) -> Span {
    let (line, column) = pair.as_span().start_pos().line_col();
    Span { line, column }
}

fn end_of(pair: &Pair<Rule>) -> Span {
    let (line, column) = pair.as_span().end_pos().line_col();
    Span { line, column }
}

// ==================== Values ====================

/// Run a value literal through a fresh compiler. `None` if anything was reported.
fn compile_value(ty: &TypeRef, pair: Pair<Rule>, diags: &mut Diagnostics) -> Option<Vec<u8>> {
    let before = diags.len();
    let end = end_of(&pair);
    let mut c = ValueCompiler::new(ty);
    drive_value(&mut c, pair, diags);
    match c.finish() {
        Ok(bytes) if diags.len() == before => Some(bytes),
        Ok(_) => None,
        Err(e) => {
            diags.push(Diagnostic::new(e.kind(), e.to_string()).at(end));
            None
        }
    }
}

fn report(diags: &mut Diagnostics, result: Result<(), CompileError>, span: Span) {
    if let Err(e) = result {
        diags.push(Diagnostic::new(e.kind(), e.to_string()).at(span));
    }
}

fn drive_value(c: &mut ValueCompiler, pair: Pair<Rule>, diags: &mut Diagnostics) {
    let kind = match pair.as_rule() {
        Rule::array_value => Composite::Array,
        Rule::struct_value => Composite::Struct,
        Rule::method_value => Composite::Method,
        _ => {
            let span = span_of(&pair);
            let lit = literal(&pair, diags);
            report(diags, c.pop_and_pack_scalar(&lit), span);
            return;
        }
    };

    report(diags, c.open_composite(kind), span_of(&pair));
    let end = end_of(&pair);
    for child in pair.into_inner() {
        if child.as_rule() == Rule::expansion {
            let span = span_of(&child);
            let mut it = child.into_inner();
            let (Some(lit_pair), Some(count_pair)) = (it.next(), it.next()) else {
                continue;
            };
            let lit = literal(&lit_pair, diags);
            let count = match parse_uint(count_pair.as_str()).map(u32::try_from) {
                Some(Ok(n)) => n,
                _ => {
                    diags.error(
                        ErrorKind::RangeViolation,
                        "Array expansion count is out of range.",
                        Some(span_of(&count_pair)),
                    );
                    1
                }
            };
            report(diags, c.expand(&lit, count), span);
        } else {
            drive_value(c, child, diags);
            c.finish_child();
        }
    }
    report(diags, c.close_composite(), end);
}

/// Convert a literal token. Malformed numbers are reported and replaced by zero.
fn literal(pair: &Pair<Rule>, diags: &mut Diagnostics) -> Literal {
    let text = pair.as_str();
    let bad = |diags: &mut Diagnostics, kind, msg: &str| {
        diags.error(kind, msg, Some(span_of(pair)));
        Literal::Uint(0)
    };
    match pair.as_rule() {
        Rule::uint_lit => match parse_uint(text) {
            Some(u) => Literal::Uint(u),
            None => bad(diags, ErrorKind::RangeViolation, "Number out of range."),
        },
        Rule::signed_lit => match text.parse::<i64>() {
            Ok(i) => Literal::Int(i),
            Err(_) => bad(diags, ErrorKind::RangeViolation, "Number out of range."),
        },
        Rule::real_lit => match text.parse::<f64>() {
            Ok(f) if f.is_finite() => Literal::Real(f),
            _ => bad(diags, ErrorKind::RangeViolation, "Number out of range."),
        },
        Rule::string_lit | Rule::char_lit => Literal::String(unescape(&text[1..text.len() - 1])),
        Rule::hex_lit => {
            let digits: String = text[1..text.len() - 1]
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            match hex::decode(&digits) {
                Ok(bytes) => Literal::Hex(bytes),
                Err(_) => bad(diags, ErrorKind::LiteralKind, "Hex value must have an even number of digits."),
            }
        }
        _ => bad(diags, ErrorKind::Syntax, "Unexpected token in value."),
    }
}

fn parse_uint(text: &str) -> Option<u64> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

/// Resolve `\n \t \r \0 \\ \" \' \xNN`; any other escaped character stands for itself.
fn unescape(s: &str) -> Vec<u8> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        i += 1;
        if b != b'\\' || i >= bytes.len() {
            out.push(b);
            continue;
        }
        let e = bytes[i];
        i += 1;
        match e {
            b'n' => out.push(b'\n'),
            b't' => out.push(b'\t'),
            b'r' => out.push(b'\r'),
            b'0' => out.push(0),
            b'x' => {
                let code = s
                    .get(i..i + 2)
                    .and_then(|h| u8::from_str_radix(h, 16).ok());
                match code {
                    Some(v) => {
                        out.push(v);
                        i += 2;
                    }
                    None => out.push(b'x'),
                }
            }
            other => out.push(other),
        }
    }
    out
}

// ==================== Declarations ====================

struct Builder<'m> {
    module: &'m mut Module,
    diags: Diagnostics,
}

impl Builder<'_> {
    fn schema_error(&mut self, e: SchemaError, span: Span) {
        self.diags.push(Diagnostic::new(e.kind(), e.to_string()).at(span));
    }

    fn build_import(&mut self, pair: Pair<Rule>) {
        let mut module = String::new();
        let mut symbols = Vec::new();
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::module_path => module = inner.as_str().to_string(),
                Rule::import_symbol | Rule::import_all => symbols.push(inner.as_str().to_string()),
                _ => {}
            }
        }
        self.module.add_import(Import { module, symbols });
    }

    fn build_keywords(&mut self, pair: Pair<Rule>) {
        for inner in pair.into_inner() {
            if inner.as_rule() == Rule::ident {
                self.module.add_keyword(inner.as_str());
            }
        }
    }

    fn build_typedef(&mut self, pair: Pair<Rule>) {
        let span = span_of(&pair);
        let mut ty = None;
        let mut name = String::new();
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::nonmethod_type => ty = self.build_type(inner),
                Rule::ident => name = inner.as_str().to_string(),
                Rule::type_array => ty = ty.and_then(|t| self.apply_array(t, inner)),
                _ => {}
            }
        }
        if let Some(ty) = ty {
            if let Err(e) = self.module.add_typedef(&name, &ty) {
                self.schema_error(e, span);
            }
        }
    }

    fn build_struct(&mut self, pair: Pair<Rule>) {
        let span = span_of(&pair);
        let mut inner = pair.into_inner();
        let Some(name) = inner.next() else {
            return;
        };
        let mut builder = self.module.begin_record(name.as_str());
        for field in inner {
            let field_span = span_of(&field);
            let built = match field.as_rule() {
                Rule::method_sig => self.build_method_field(field),
                Rule::parameter => self.build_param(field).map(|p| {
                    let mut f = Field::new(p.name(), p.ty().clone());
                    if p.has_default_value() {
                        f.set_default_value(p.default_value().into_owned());
                    }
                    f
                }),
                _ => None,
            };
            if let Some(f) = built {
                if let Err(e) = self.module.add_field(&mut builder, f) {
                    self.schema_error(e, field_span);
                }
            }
        }
        if let Err(e) = self.module.seal_record(builder) {
            self.schema_error(e, span);
        }
    }

    fn build_class(&mut self, pair: Pair<Rule>) {
        let span = span_of(&pair);
        let mut inner = pair.into_inner();
        let Some(name) = inner.next() else {
            return;
        };
        let mut builder = self.module.begin_class(name.as_str());
        for item in inner {
            let item_span = span_of(&item);
            match item.as_rule() {
                Rule::parent_list => {
                    for parent in item.into_inner() {
                        let parent_span = span_of(&parent);
                        if let Err(e) = self.module.add_parent(&mut builder, parent.as_str()) {
                            self.schema_error(e, parent_span);
                        }
                    }
                }
                Rule::molecular_field => self.build_molecular(&mut builder, item),
                Rule::method_field | Rule::named_field => {
                    let mut parts = item.into_inner();
                    let field = match parts.next() {
                        Some(sig) if sig.as_rule() == Rule::method_sig => {
                            let field = self.build_method_field(sig);
                            match parts.peek() {
                                Some(d) if d.as_rule() == Rule::default_value => {
                                    parts.next();
                                    field.map(|f| self.with_default(f, d))
                                }
                                _ => field,
                            }
                        }
                        Some(first) => self.build_named_field(first, &mut parts),
                        None => None,
                    };
                    let Some(mut field) = field else {
                        continue;
                    };
                    for kw in parts.filter(|p| p.as_rule() == Rule::keyword_list) {
                        for k in kw.into_inner() {
                            field.add_keyword(k.as_str());
                        }
                    }
                    if let Err(e) = self.module.add_field(&mut builder, field) {
                        self.schema_error(e, item_span);
                    }
                }
                _ => {}
            }
        }
        if let Err(e) = self.module.seal_class(builder) {
            self.schema_error(e, span);
        }
    }

    fn build_molecular(&mut self, builder: &mut RecordBuilder, pair: Pair<Rule>) {
        let span = span_of(&pair);
        let names: Vec<&str> = pair.into_inner().map(|p| p.as_str()).collect();
        let Some((name, components)) = names.split_first() else {
            return;
        };
        if let Err(e) = self.module.add_molecular(builder, name, components) {
            self.schema_error(e, span);
        }
    }

    /// Named class field: type, optional name, array suffixes, optional default. The
    /// trailing keyword list is left in `rest`.
    fn build_named_field<'i>(
        &mut self,
        ty_pair: Pair<'i, Rule>,
        rest: &mut pest::iterators::Pairs<'i, Rule>,
    ) -> Option<Field> {
        let mut ty = self.build_type(ty_pair);
        let mut name = String::new();
        let mut default = None;
        while let Some(p) = rest.peek() {
            match p.as_rule() {
                Rule::ident => name = p.as_str().to_string(),
                Rule::type_array => ty = ty.and_then(|t| self.apply_array(t, p)),
                Rule::default_value => default = Some(p),
                _ => break,
            }
            rest.next();
        }
        let field = Field::new(name, ty?);
        Some(match default {
            Some(d) => self.with_default(field, d),
            None => field,
        })
    }

    /// Pack `pair` as the default of `field`; a value that fails to compile is reported
    /// and leaves the field without one.
    fn with_default(&mut self, mut field: Field, pair: Pair<Rule>) -> Field {
        let ty = field.ty().clone();
        if let Some(packed) = self.build_default(&ty, pair) {
            field.set_default_value(packed);
        }
        field
    }

    fn build_method_field(&mut self, pair: Pair<Rule>) -> Option<Field> {
        let mut inner = pair.into_inner();
        let name = inner.next()?.as_str().to_string();
        let mut method = Method::new();
        for param in inner {
            let span = span_of(&param);
            if let Some(p) = self.build_param(param) {
                if let Err(e) = method.add_parameter(p) {
                    self.schema_error(e, span);
                }
            }
        }
        Some(Field::new(name, Arc::new(Type::Method(method))))
    }

    fn build_param(&mut self, pair: Pair<Rule>) -> Option<Parameter> {
        let mut ty = None;
        let mut name = String::new();
        let mut default = None;
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::nonmethod_type => ty = self.build_type(inner),
                Rule::ident => name = inner.as_str().to_string(),
                Rule::type_array => ty = ty.and_then(|t| self.apply_array(t, inner)),
                Rule::default_value => default = Some(inner),
                _ => {}
            }
        }
        let ty = ty?;
        let mut param = Parameter::new(name, ty.clone());
        if let Some(packed) = default.and_then(|d| self.build_default(&ty, d)) {
            param.set_default_value(packed);
        }
        Some(param)
    }

    fn build_default(&mut self, ty: &TypeRef, pair: Pair<Rule>) -> Option<Vec<u8>> {
        let value = pair.into_inner().next()?;
        compile_value(ty, value, &mut self.diags)
    }

    // ---------- types ----------

    fn build_type(&mut self, pair: Pair<Rule>) -> Option<TypeRef> {
        let mut inner = pair.into_inner();
        let atom = inner.next()?;
        let span = span_of(&atom);
        let mut ty = match atom.as_rule() {
            Rule::numeric_type => self.build_numeric(atom)?,
            Rule::builtin_array => self.build_builtin(atom)?,
            Rule::defined_type => match self.module.resolve_type_by_name(atom.as_str()) {
                Ok(t) => t,
                Err(e) => {
                    self.schema_error(e, span);
                    return None;
                }
            },
            _ => return None,
        };
        for suffix in inner {
            ty = self.apply_array(ty, suffix)?;
        }
        Some(ty)
    }

    fn build_numeric(&mut self, pair: Pair<Rule>) -> Option<TypeRef> {
        let mut inner = pair.into_inner();
        let token = inner.next()?;
        let kind = NumericKind::from_name(token.as_str())?;
        let mut n = self.module.declare_numeric(kind);
        for modifier in inner {
            let span = span_of(&modifier);
            let result = match modifier.as_rule() {
                Rule::numeric_range => {
                    let bounds: Vec<Number> = modifier
                        .into_inner()
                        .filter_map(|b| self.range_bound(b))
                        .collect();
                    match bounds.as_slice() {
                        [single] => n.set_range(NumericRange::single(*single)),
                        [min, max] => n.set_range(NumericRange::new(*min, *max)),
                        _ => continue,
                    }
                }
                Rule::modulus => {
                    let m = modifier.into_inner().next().and_then(|p| {
                        let text = p.as_str();
                        parse_uint(text)
                            .map(|u| u as f64)
                            .or_else(|| text.parse().ok())
                    });
                    match m {
                        Some(m) => n.set_modulus(m),
                        None => continue,
                    }
                }
                Rule::divisor => {
                    let d = modifier
                        .into_inner()
                        .next()
                        .and_then(|p| parse_uint(p.as_str()))
                        .and_then(|d| u32::try_from(d).ok());
                    match d {
                        Some(d) => n.set_divisor(d),
                        None => {
                            self.diags.error(
                                ErrorKind::RangeViolation,
                                "Invalid divisor for type.",
                                Some(span),
                            );
                            continue;
                        }
                    }
                }
                _ => continue,
            };
            if let Err(e) = result {
                self.schema_error(e, span);
            }
        }
        Some(Arc::new(Type::Numeric(n)))
    }

    fn range_bound(&mut self, pair: Pair<Rule>) -> Option<Number> {
        let bound = pair.into_inner().next()?;
        let span = span_of(&bound);
        let text = bound.as_str();
        let number = match bound.as_rule() {
            Rule::char_lit => match unescape(&text[1..text.len() - 1]).as_slice() {
                [c] => Some(Number::Uint(u64::from(*c))),
                _ => {
                    self.diags
                        .error(ErrorKind::LengthMismatch, "Single character required.", Some(span));
                    return None;
                }
            },
            Rule::uint_lit => parse_uint(text).map(Number::Uint),
            Rule::signed_lit => text.parse().ok().map(Number::Int),
            Rule::real_lit => text.parse().ok().map(Number::Float),
            _ => None,
        };
        if number.is_none() {
            self.diags
                .error(ErrorKind::RangeViolation, "Number out of range.", Some(span));
        }
        number
    }

    fn build_builtin(&mut self, pair: Pair<Rule>) -> Option<TypeRef> {
        let mut inner = pair.into_inner();
        let token = inner.next()?;
        let element = match token.as_str() {
            "string" => Type::numeric(NumericKind::Char),
            _ => Type::numeric(NumericKind::Uint8),
        };
        let range = match inner.next() {
            Some(r) => Some(self.size_range(r)?),
            None => None,
        };
        self.declare_container(element, range, span_of(&token))
    }

    fn apply_array(&mut self, element: TypeRef, pair: Pair<Rule>) -> Option<TypeRef> {
        let span = span_of(&pair);
        let range = match pair.into_inner().next() {
            Some(r) => Some(self.size_range(r)?),
            None => None,
        };
        self.declare_container(element, range, span)
    }

    fn declare_container(
        &mut self,
        element: TypeRef,
        range: Option<ArrayRange>,
        span: Span,
    ) -> Option<TypeRef> {
        match self.module.declare_container(element, range) {
            Ok(t) => Some(t),
            Err(e) => {
                self.schema_error(e, span);
                None
            }
        }
    }

    fn size_range(&mut self, pair: Pair<Rule>) -> Option<ArrayRange> {
        let span = span_of(&pair);
        let bounds: Vec<Option<u64>> = pair.into_inner().map(|p| parse_uint(p.as_str())).collect();
        match bounds.as_slice() {
            [Some(n)] => Some(ArrayRange::exact(*n)),
            [Some(lo), Some(hi)] => Some(ArrayRange::new(*lo, *hi)),
            _ => {
                self.diags
                    .error(ErrorKind::RangeViolation, "Number out of range.", Some(span));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescape_sequences() {
        assert_eq!(unescape(r#"a\n\"\\\x41"#), b"a\n\"\\A".to_vec());
        assert_eq!(unescape(r"\q"), b"q".to_vec());
    }

    #[test]
    fn uint_literals_accept_hex() {
        assert_eq!(parse_uint("0x1F"), Some(31));
        assert_eq!(parse_uint("42"), Some(42));
        assert_eq!(parse_uint("99999999999999999999"), None);
    }

    #[test]
    fn syntax_error_has_position() {
        let err = parse_dcfile("dclass A {\n  uint8 x\n}").unwrap_err();
        let d = err.first_of(ErrorKind::Syntax).unwrap();
        assert!(d.span.is_some());
    }
}
