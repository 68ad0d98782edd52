//! Schema type model: the closed set of declarable types.
//!
//! Every type reports a [`Subtype`] tag, a fixed encoded size (`0` = variable, needs a size
//! tag when it is a container) and an optional alias. The subtype is derived once, when the
//! type is constructed; consumers match on it and never re-derive it.
//!
//! Types are shared as [`TypeRef`] (`Arc<Type>`) and are immutable once built, so a finished
//! [`Module`](crate::module::Module) can be read from any number of threads.

use crate::module::SchemaError;
use crate::range::{ArrayRange, NumericRange, RawRange};
use indexmap::IndexSet;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub type TypeRef = Arc<Type>;

/// Scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericKind {
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    Char,
}

impl NumericKind {
    pub fn from_name(s: &str) -> Option<Self> {
        Some(match s {
            "int8" => NumericKind::Int8,
            "int16" => NumericKind::Int16,
            "int32" => NumericKind::Int32,
            "int64" => NumericKind::Int64,
            "uint8" => NumericKind::Uint8,
            "uint16" => NumericKind::Uint16,
            "uint32" => NumericKind::Uint32,
            "uint64" => NumericKind::Uint64,
            "float32" => NumericKind::Float32,
            "float64" => NumericKind::Float64,
            "char" => NumericKind::Char,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        self.subtype().name()
    }

    pub fn size(&self) -> usize {
        match self {
            NumericKind::Int8 | NumericKind::Uint8 | NumericKind::Char => 1,
            NumericKind::Int16 | NumericKind::Uint16 => 2,
            NumericKind::Int32 | NumericKind::Uint32 | NumericKind::Float32 => 4,
            NumericKind::Int64 | NumericKind::Uint64 | NumericKind::Float64 => 8,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, NumericKind::Float32 | NumericKind::Float64)
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            NumericKind::Int8 | NumericKind::Int16 | NumericKind::Int32 | NumericKind::Int64
        )
    }

    /// Inclusive native bounds of an integer kind; `None` for floats.
    pub fn int_bounds(&self) -> Option<(i128, i128)> {
        Some(match self {
            NumericKind::Int8 => (i8::MIN.into(), i8::MAX.into()),
            NumericKind::Int16 => (i16::MIN.into(), i16::MAX.into()),
            NumericKind::Int32 => (i32::MIN.into(), i32::MAX.into()),
            NumericKind::Int64 => (i64::MIN.into(), i64::MAX.into()),
            NumericKind::Uint8 | NumericKind::Char => (0, u8::MAX.into()),
            NumericKind::Uint16 => (0, u16::MAX.into()),
            NumericKind::Uint32 => (0, u32::MAX.into()),
            NumericKind::Uint64 => (0, u64::MAX.into()),
            NumericKind::Float32 | NumericKind::Float64 => return None,
        })
    }

    pub fn subtype(&self) -> Subtype {
        match self {
            NumericKind::Int8 => Subtype::Int8,
            NumericKind::Int16 => Subtype::Int16,
            NumericKind::Int32 => Subtype::Int32,
            NumericKind::Int64 => Subtype::Int64,
            NumericKind::Uint8 => Subtype::Uint8,
            NumericKind::Uint16 => Subtype::Uint16,
            NumericKind::Uint32 => Subtype::Uint32,
            NumericKind::Uint64 => Subtype::Uint64,
            NumericKind::Float32 => Subtype::Float32,
            NumericKind::Float64 => Subtype::Float64,
            NumericKind::Char => Subtype::Char,
        }
    }
}

/// Structural tag of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subtype {
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    Char,
    /// Fixed-length array.
    Array,
    /// Variable-length array.
    VarArray,
    String,
    VarString,
    Blob,
    VarBlob,
    Struct,
    Method,
}

impl Subtype {
    pub fn name(&self) -> &'static str {
        match self {
            Subtype::Int8 => "int8",
            Subtype::Int16 => "int16",
            Subtype::Int32 => "int32",
            Subtype::Int64 => "int64",
            Subtype::Uint8 => "uint8",
            Subtype::Uint16 => "uint16",
            Subtype::Uint32 => "uint32",
            Subtype::Uint64 => "uint64",
            Subtype::Float32 => "float32",
            Subtype::Float64 => "float64",
            Subtype::Char => "char",
            Subtype::Array => "array",
            Subtype::VarArray => "vararray",
            Subtype::String => "string",
            Subtype::VarString => "varstring",
            Subtype::Blob => "blob",
            Subtype::VarBlob => "varblob",
            Subtype::Struct => "struct",
            Subtype::Method => "method",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Subtype::Int8
                | Subtype::Int16
                | Subtype::Int32
                | Subtype::Int64
                | Subtype::Uint8
                | Subtype::Uint16
                | Subtype::Uint32
                | Subtype::Uint64
                | Subtype::Float32
                | Subtype::Float64
                | Subtype::Char
        )
    }
}

impl fmt::Display for Subtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ==================== Numeric ====================

/// A scalar type with optional range, modulus and divisor.
///
/// Range and modulus are kept in logical units as declared; [`NumericType::raw_range`] and
/// [`NumericType::raw_modulus`] give them scaled by the divisor. Every setter re-validates
/// the whole combination so an incompatible one fails while the schema is being built.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericType {
    kind: NumericKind,
    divisor: u32,
    range: Option<NumericRange>,
    modulus: Option<f64>,
    alias: Option<String>,
}

/// Modulus scaled by the divisor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawModulus {
    Integer(i128),
    Float(f64),
}

impl NumericType {
    pub fn new(kind: NumericKind) -> Self {
        NumericType {
            kind,
            divisor: 1,
            range: None,
            modulus: None,
            alias: None,
        }
    }

    pub fn kind(&self) -> NumericKind {
        self.kind
    }

    pub fn divisor(&self) -> u32 {
        self.divisor
    }

    pub fn range(&self) -> Option<&NumericRange> {
        self.range.as_ref()
    }

    pub fn modulus(&self) -> Option<f64> {
        self.modulus
    }

    pub fn has_range(&self) -> bool {
        self.range.is_some()
    }

    pub fn has_modulus(&self) -> bool {
        self.modulus.is_some()
    }

    pub fn set_range(&mut self, range: NumericRange) -> Result<(), SchemaError> {
        self.check(self.divisor, Some(range), self.modulus)
            .map_err(|reason| SchemaError::InvalidRange {
                ty: self.kind.name().to_string(),
                reason,
            })?;
        self.range = Some(range);
        Ok(())
    }

    pub fn set_modulus(&mut self, modulus: f64) -> Result<(), SchemaError> {
        self.check(self.divisor, self.range, Some(modulus))
            .map_err(|reason| SchemaError::InvalidModulus {
                ty: self.kind.name().to_string(),
                reason,
            })?;
        self.modulus = Some(modulus);
        Ok(())
    }

    pub fn set_divisor(&mut self, divisor: u32) -> Result<(), SchemaError> {
        self.check(divisor, self.range, self.modulus)
            .map_err(|reason| SchemaError::InvalidDivisor {
                ty: self.kind.name().to_string(),
                reason,
            })?;
        self.divisor = divisor;
        Ok(())
    }

    /// Range in stored (divisor-scaled) units.
    pub fn raw_range(&self) -> Option<RawRange> {
        let r = self.range?;
        if self.kind.is_float() {
            let (min, max) = r.scaled_float(self.divisor);
            Some(RawRange::Float { min, max })
        } else {
            let (min, max) = r.scaled_integer(self.divisor)?;
            Some(RawRange::Integer { min, max })
        }
    }

    pub fn raw_modulus(&self) -> Option<RawModulus> {
        let m = self.modulus? * f64::from(self.divisor);
        if self.kind.is_float() {
            Some(RawModulus::Float(m))
        } else {
            Some(RawModulus::Integer(m as i128))
        }
    }

    fn check(
        &self,
        divisor: u32,
        range: Option<NumericRange>,
        modulus: Option<f64>,
    ) -> Result<(), String> {
        if divisor == 0 {
            return Err("divisor must be greater than zero".to_string());
        }
        if self.kind == NumericKind::Char && (divisor != 1 || modulus.is_some()) {
            return Err("char does not accept a divisor or modulus".to_string());
        }

        let raw_modulus = match modulus {
            None => None,
            Some(m) => {
                if !m.is_finite() || m <= 0.0 {
                    return Err(format!("modulus {} must be a positive number", m));
                }
                let raw = m * f64::from(divisor);
                if let Some((_, kind_max)) = self.kind.int_bounds() {
                    if raw.fract() != 0.0 {
                        return Err(format!(
                            "modulus {} does not scale to a whole number with divisor {}",
                            m, divisor
                        ));
                    }
                    if raw - 1.0 > kind_max as f64 {
                        return Err(format!(
                            "modulus {} exceeds the limits of type '{}'",
                            m,
                            self.kind.name()
                        ));
                    }
                } else if self.kind == NumericKind::Float32 && (raw as f32).is_infinite() {
                    return Err(format!("modulus {} exceeds the limits of type 'float32'", m));
                }
                Some(raw)
            }
        };

        if let Some(r) = range {
            let (lo, hi) = match self.kind.int_bounds() {
                Some((kind_min, kind_max)) => {
                    let (lo, hi) = r
                        .scaled_integer(divisor)
                        .ok_or_else(|| format!("range ({}) overflows when scaled", r))?;
                    if lo < kind_min || hi > kind_max {
                        return Err(format!(
                            "range ({}) exceeds the limits of type '{}'",
                            r,
                            self.kind.name()
                        ));
                    }
                    (lo as f64, hi as f64)
                }
                None => {
                    let (lo, hi) = r.scaled_float(divisor);
                    if lo.is_nan() || hi.is_nan() {
                        return Err("range bounds must be numbers".to_string());
                    }
                    if self.kind == NumericKind::Float32
                        && ((lo as f32).is_infinite() || (hi as f32).is_infinite())
                    {
                        return Err(format!("range ({}) exceeds the limits of type 'float32'", r));
                    }
                    (lo, hi)
                }
            };
            if lo > hi {
                return Err(format!("range ({}) has a minimum greater than its maximum", r));
            }
            if let Some(m) = raw_modulus {
                if lo < 0.0 || hi >= m {
                    return Err(format!(
                        "range ({}) must lie within [0, modulus) when a modulus is set",
                        r
                    ));
                }
            }
        }
        Ok(())
    }
}

// ==================== Array ====================

/// Homogeneous repetition of an element type.
///
/// Canonicalization happens here: a fixed count over a fixed-size element is an `Array`,
/// anything else a `VarArray`; `char` elements turn those into `String`/`VarString` and
/// `uint8` elements into `Blob`/`VarBlob`.
#[derive(Debug, Clone)]
pub struct ArrayType {
    element: TypeRef,
    range: Option<ArrayRange>,
    array_size: u64,
    subtype: Subtype,
    size: usize,
    alias: Option<String>,
}

impl ArrayType {
    pub fn new(element: TypeRef, range: Option<ArrayRange>) -> Self {
        let array_size = match range {
            Some(r) if r.is_fixed() => r.min,
            _ => 0,
        };

        let fixed = if element.has_fixed_size() && array_size > 0 {
            usize::try_from(array_size)
                .ok()
                .and_then(|n| n.checked_mul(element.fixed_size()))
        } else {
            None
        };

        let (subtype, size) = match (element.subtype(), fixed) {
            (Subtype::Char, Some(n)) => (Subtype::String, n),
            (Subtype::Char, None) => (Subtype::VarString, 0),
            (Subtype::Uint8, Some(n)) => (Subtype::Blob, n),
            (Subtype::Uint8, None) => (Subtype::VarBlob, 0),
            (_, Some(n)) => (Subtype::Array, n),
            (_, None) => (Subtype::VarArray, 0),
        };

        ArrayType {
            element,
            range,
            array_size,
            subtype,
            size,
            alias: None,
        }
    }

    pub fn element(&self) -> &TypeRef {
        &self.element
    }

    pub fn range(&self) -> Option<&ArrayRange> {
        self.range.as_ref()
    }

    pub fn has_range(&self) -> bool {
        self.range.is_some()
    }

    /// Element-count bounds; unbounded if none was declared.
    pub fn count_range(&self) -> ArrayRange {
        self.range.unwrap_or(ArrayRange::UNBOUNDED)
    }

    /// Declared fixed element count, or `0` for a ranged/unbounded array.
    pub fn array_size(&self) -> u64 {
        self.array_size
    }

    pub fn is_string(&self) -> bool {
        matches!(self.subtype, Subtype::String | Subtype::VarString)
    }

    pub fn is_blob(&self) -> bool {
        matches!(self.subtype, Subtype::Blob | Subtype::VarBlob)
    }
}

// ==================== Fields ====================

/// A named (or unnamed) member of a struct or class.
///
/// Fields are built and configured (keywords, default) before being added to their owner;
/// after that they are shared as `Arc<Field>` and no longer change.
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    ty: TypeRef,
    id: u32,
    default: Option<Vec<u8>>,
    keywords: IndexSet<String>,
    molecular: Option<Vec<Arc<Field>>>,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Field {
            name: name.into(),
            ty,
            id: 0,
            default: None,
            keywords: IndexSet::new(),
            molecular: None,
        }
    }

    pub fn unnamed(ty: TypeRef) -> Self {
        Field::new(String::new(), ty)
    }

    /// Molecular field over sibling atomic fields. Its type is a struct of the
    /// components, used for layout only.
    pub(crate) fn molecular(name: impl Into<String>, components: Vec<Arc<Field>>) -> Self {
        let name = name.into();
        let keywords = components
            .first()
            .map(|f| f.keywords.clone())
            .unwrap_or_default();
        let layout = Struct::from_fields(name.clone(), components.clone());
        Field {
            name,
            ty: Arc::new(Type::Struct(layout)),
            id: 0,
            default: None,
            keywords,
            molecular: Some(components),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    /// Module-wide id assigned when the field was added to its owner.
    pub fn id(&self) -> u32 {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    pub fn with_default(mut self, packed: Vec<u8>) -> Self {
        self.default = Some(packed);
        self
    }

    pub fn set_default_value(&mut self, packed: Vec<u8>) {
        self.default = Some(packed);
    }

    pub fn has_default_value(&self) -> bool {
        self.default.is_some()
    }

    /// Pre-packed default: the declared one, else the type's canonical default.
    pub fn default_value(&self) -> Cow<'_, [u8]> {
        match &self.default {
            Some(d) => Cow::Borrowed(d.as_slice()),
            None => Cow::Owned(crate::wire::pack_default(&self.ty)),
        }
    }

    /// Returns false if the keyword was already present.
    pub fn add_keyword(&mut self, keyword: impl Into<String>) -> bool {
        self.keywords.insert(keyword.into())
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(String::as_str)
    }

    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.keywords.contains(keyword)
    }

    pub fn has_matching_keywords(&self, other: &Field) -> bool {
        self.keywords == other.keywords
    }

    pub fn is_molecular(&self) -> bool {
        self.molecular.is_some()
    }

    /// Atomic fields of a molecular field (empty for an atomic field).
    pub fn components(&self) -> &[Arc<Field>] {
        self.molecular.as_deref().unwrap_or(&[])
    }
}

// ==================== Struct / Class ====================

/// Ordered, name-unique sequence of fields.
#[derive(Debug, Clone)]
pub struct Struct {
    name: String,
    fields: Vec<Arc<Field>>,
    by_name: HashMap<String, usize>,
    size: usize,
}

impl Struct {
    pub(crate) fn from_fields(name: impl Into<String>, fields: Vec<Arc<Field>>) -> Self {
        let by_name = fields
            .iter()
            .enumerate()
            .filter(|(_, f)| !f.name().is_empty())
            .map(|(i, f)| (f.name().to_string(), i))
            .collect();
        let mut s = Struct {
            name: name.into(),
            fields,
            by_name,
            size: 0,
        };
        s.size = composite_size(s.layout().map(|f| f.ty()));
        s
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// All fields in declaration order, molecular ones included.
    pub fn fields(&self) -> &[Arc<Field>] {
        &self.fields
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn field(&self, index: usize) -> Option<&Arc<Field>> {
        self.fields.get(index)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Arc<Field>> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }

    /// Fields that occupy bytes on the wire, in encoding order (molecular fields skipped).
    pub fn layout(&self) -> impl Iterator<Item = &Arc<Field>> + '_ {
        self.fields.iter().filter(|f| !f.is_molecular())
    }

    pub fn layout_len(&self) -> usize {
        self.layout().count()
    }
}

/// A struct with class parents and an optional constructor.
///
/// Parents do not override: their fields become visible through the class (inherited
/// fields first), and the class may not redeclare an inherited name.
#[derive(Debug, Clone)]
pub struct Class {
    record: Struct,
    id: u32,
    parents: Vec<TypeRef>,
    constructor: Option<Arc<Field>>,
    num_inherited: usize,
}

impl Class {
    pub(crate) fn new(
        record: Struct,
        id: u32,
        parents: Vec<TypeRef>,
        constructor: Option<Arc<Field>>,
        num_inherited: usize,
    ) -> Self {
        Class {
            record,
            id,
            parents,
            constructor,
            num_inherited,
        }
    }

    pub fn name(&self) -> &str {
        self.record.name()
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn record(&self) -> &Struct {
        &self.record
    }

    pub fn parents(&self) -> &[TypeRef] {
        &self.parents
    }

    pub fn constructor(&self) -> Option<&Arc<Field>> {
        self.constructor.as_ref()
    }

    /// Fields declared by this class itself.
    pub fn own_fields(&self) -> &[Arc<Field>] {
        &self.record.fields()[self.num_inherited..]
    }

    pub fn inherited_fields(&self) -> &[Arc<Field>] {
        &self.record.fields()[..self.num_inherited]
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Arc<Field>> {
        match &self.constructor {
            Some(c) if c.name() == name => Some(c),
            _ => self.record.field_by_name(name),
        }
    }
}

// ==================== Method ====================

#[derive(Debug, Clone)]
pub struct Parameter {
    name: String,
    ty: TypeRef,
    default: Option<Vec<u8>>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Parameter {
            name: name.into(),
            ty,
            default: None,
        }
    }

    pub fn unnamed(ty: TypeRef) -> Self {
        Parameter::new(String::new(), ty)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    pub fn with_default(mut self, packed: Vec<u8>) -> Self {
        self.default = Some(packed);
        self
    }

    pub fn set_default_value(&mut self, packed: Vec<u8>) {
        self.default = Some(packed);
    }

    pub fn has_default_value(&self) -> bool {
        self.default.is_some()
    }

    pub fn default_value(&self) -> Cow<'_, [u8]> {
        match &self.default {
            Some(d) => Cow::Borrowed(d.as_slice()),
            None => Cow::Owned(crate::wire::pack_default(&self.ty)),
        }
    }
}

/// Remote-call signature: ordered parameters.
#[derive(Debug, Clone, Default)]
pub struct Method {
    params: Vec<Parameter>,
    by_name: HashMap<String, usize>,
    size: usize,
    alias: Option<String>,
}

impl Method {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails if a non-empty parameter name is already used.
    pub fn add_parameter(&mut self, param: Parameter) -> Result<(), SchemaError> {
        if !param.name().is_empty() {
            if self.by_name.contains_key(param.name()) {
                return Err(SchemaError::DuplicateParameter(param.name().to_string()));
            }
            self.by_name
                .insert(param.name().to_string(), self.params.len());
        }
        self.params.push(param);
        self.size = composite_size(self.params.iter().map(|p| p.ty()));
        Ok(())
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.params
    }

    pub fn num_parameters(&self) -> usize {
        self.params.len()
    }

    pub fn parameter(&self, index: usize) -> Option<&Parameter> {
        self.params.get(index)
    }

    pub fn parameter_by_name(&self, name: &str) -> Option<&Parameter> {
        self.by_name.get(name).map(|&i| &self.params[i])
    }
}

/// Fixed size of a concatenation: the sum if every part is fixed, else 0.
fn composite_size<'a>(parts: impl Iterator<Item = &'a TypeRef>) -> usize {
    let mut total = 0usize;
    for ty in parts {
        if !ty.has_fixed_size() {
            return 0;
        }
        total = match total.checked_add(ty.fixed_size()) {
            Some(t) => t,
            None => return 0,
        };
    }
    total
}

// ==================== Type ====================

#[derive(Debug, Clone)]
pub enum Type {
    Numeric(NumericType),
    Array(ArrayType),
    Struct(Struct),
    Class(Class),
    Method(Method),
}

impl Type {
    pub fn numeric(kind: NumericKind) -> TypeRef {
        Arc::new(Type::Numeric(NumericType::new(kind)))
    }

    pub fn subtype(&self) -> Subtype {
        match self {
            Type::Numeric(n) => n.kind.subtype(),
            Type::Array(a) => a.subtype,
            Type::Struct(_) | Type::Class(_) => Subtype::Struct,
            Type::Method(_) => Subtype::Method,
        }
    }

    /// Encoded size in bytes, or `0` when it depends on the value.
    pub fn fixed_size(&self) -> usize {
        match self {
            Type::Numeric(n) => n.kind.size(),
            Type::Array(a) => a.size,
            Type::Struct(s) => s.size,
            Type::Class(c) => c.record.size,
            Type::Method(m) => m.size,
        }
    }

    pub fn has_fixed_size(&self) -> bool {
        self.fixed_size() != 0
    }

    pub fn alias(&self) -> Option<&str> {
        match self {
            Type::Numeric(n) => n.alias.as_deref(),
            Type::Array(a) => a.alias.as_deref(),
            Type::Method(m) => m.alias.as_deref(),
            Type::Struct(_) | Type::Class(_) => None,
        }
    }

    /// Copy of this type carrying `alias`. Structs and classes are named, not aliased.
    pub fn with_alias(&self, alias: impl Into<String>) -> Type {
        let alias = Some(alias.into());
        match self {
            Type::Numeric(n) => Type::Numeric(NumericType { alias, ..n.clone() }),
            Type::Array(a) => Type::Array(ArrayType { alias, ..a.clone() }),
            Type::Method(m) => Type::Method(Method { alias, ..m.clone() }),
            Type::Struct(_) | Type::Class(_) => self.clone(),
        }
    }

    /// Name used in diagnostics: alias, struct/class name, or subtype.
    pub fn display_name(&self) -> String {
        match self {
            Type::Struct(s) => format!("struct {}", s.name()),
            Type::Class(c) => format!("dclass {}", c.name()),
            _ => match self.alias() {
                Some(a) => a.to_string(),
                None => self.subtype().name().to_string(),
            },
        }
    }

    pub fn as_numeric(&self) -> Option<&NumericType> {
        match self {
            Type::Numeric(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayType> {
        match self {
            Type::Array(a) => Some(a),
            _ => None,
        }
    }

    /// The record part of a struct or class.
    pub fn as_struct(&self) -> Option<&Struct> {
        match self {
            Type::Struct(s) => Some(s),
            Type::Class(c) => Some(&c.record),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&Class> {
        match self {
            Type::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_method(&self) -> Option<&Method> {
        match self {
            Type::Method(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_method(&self) -> bool {
        matches!(self, Type::Method(_))
    }
}

impl From<NumericType> for Type {
    fn from(n: NumericType) -> Self {
        Type::Numeric(n)
    }
}

impl From<ArrayType> for Type {
    fn from(a: ArrayType) -> Self {
        Type::Array(a)
    }
}

impl From<Method> for Type {
    fn from(m: Method) -> Self {
        Type::Method(m)
    }
}
