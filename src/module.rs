//! Schema Catalog: owns declared classes, structs, typedefs and keywords, and resolves
//! names to types.
//!
//! Records are built through a [`RecordBuilder`] returned by [`Module::begin_record`] or
//! [`Module::begin_class`] and become visible only when sealed. Every rule violation is a
//! [`SchemaError`]; the caller decides whether to stop or record it and continue.

use crate::diagnostics::ErrorKind;
use crate::range::ArrayRange;
use crate::types::{ArrayType, Class, Field, NumericKind, NumericType, Struct, Subtype, Type, TypeRef};
use indexmap::{IndexMap, IndexSet};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, OnceLock};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("Cannot add '{new}' to module because {existing} was already declared with that name.")]
    Conflict { new: String, existing: String },
    #[error("Type '{0}' has not been declared.")]
    NotFound(String),
    #[error("'dclass {0}' has not been declared.")]
    ClassNotFound(String),
    #[error("class cannot inherit from struct type '{0}'.")]
    InheritFromStruct(String),
    #[error("class cannot inherit from non-class type '{0}'.")]
    InheritFromNonClass(String),
    #[error("Invalid range for type '{ty}': {reason}.")]
    InvalidRange { ty: String, reason: String },
    #[error("Invalid modulus for type '{ty}': {reason}.")]
    InvalidModulus { ty: String, reason: String },
    #[error("Invalid divisor for type '{ty}': {reason}.")]
    InvalidDivisor { ty: String, reason: String },
    #[error("Invalid array range ({0}), minimum exceeds maximum.")]
    InvalidArrayRange(String),
    #[error("Cannot use a method type here.")]
    MethodElement,
    #[error("Cannot add field '{field}', a field with that name already exists in '{owner}'.")]
    DuplicateField { field: String, owner: String },
    #[error("The constructor must be the first field in the class.")]
    ConstructorNotFirst,
    #[error("Cannot use a molecular field as a constructor.")]
    MolecularConstructor,
    #[error("A constructor can't be defined in a struct.")]
    ConstructorInStruct,
    #[error("A method can't be defined in a struct.")]
    MethodInStruct,
    #[error("An unnamed field can't be defined in a class.")]
    UnnamedClassField,
    #[error("Keyword '{0}' has not been declared.")]
    UndeclaredKeyword(String),
    #[error("Field '{0}' not defined in current class.")]
    UnknownComponent(String),
    #[error("Cannot add molecular '{0}' to a molecular field.")]
    NestedMolecular(String),
    #[error("Mismatched keywords in molecular between {first} and {other}.")]
    MismatchedKeywords { first: String, other: String },
    #[error("Cannot add parameter '{0}', a parameter with that name is already used in this method.")]
    DuplicateParameter(String),
}

impl SchemaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SchemaError::Conflict { .. }
            | SchemaError::DuplicateField { .. }
            | SchemaError::DuplicateParameter(_)
            | SchemaError::ConstructorNotFirst
            | SchemaError::MolecularConstructor
            | SchemaError::ConstructorInStruct
            | SchemaError::MethodInStruct
            | SchemaError::UnnamedClassField
            | SchemaError::NestedMolecular(_)
            | SchemaError::MismatchedKeywords { .. } => ErrorKind::DefinitionConflict,
            SchemaError::NotFound(_)
            | SchemaError::ClassNotFound(_)
            | SchemaError::InheritFromStruct(_)
            | SchemaError::InheritFromNonClass(_)
            | SchemaError::MethodElement
            | SchemaError::UndeclaredKeyword(_)
            | SchemaError::UnknownComponent(_) => ErrorKind::TypeResolution,
            SchemaError::InvalidRange { .. }
            | SchemaError::InvalidModulus { .. }
            | SchemaError::InvalidDivisor { .. }
            | SchemaError::InvalidArrayRange(_) => ErrorKind::RangeViolation,
        }
    }
}

/// What a top-level name is bound to.
#[derive(Debug, Clone)]
pub enum Binding {
    Class(TypeRef),
    Struct(TypeRef),
    Typedef(TypeRef),
}

impl Binding {
    pub fn ty(&self) -> &TypeRef {
        match self {
            Binding::Class(t) | Binding::Struct(t) | Binding::Typedef(t) => t,
        }
    }

    fn describe(&self, name: &str) -> String {
        match self {
            Binding::Class(_) => format!("'dclass {}'", name),
            Binding::Struct(_) => format!("'struct {}'", name),
            Binding::Typedef(_) => format!("'typedef {}'", name),
        }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Binding::Class(_) => "class",
            Binding::Struct(_) => "struct",
            Binding::Typedef(_) => "typedef",
        })
    }
}

/// `import` / `from ... import` record, kept for the embedding application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub module: String,
    pub symbols: Vec<String>,
}

/// Record under construction.
#[derive(Debug)]
pub struct RecordBuilder {
    name: String,
    is_class: bool,
    parents: Vec<TypeRef>,
    fields: Vec<Arc<Field>>,
    num_inherited: usize,
    constructor: Option<Arc<Field>>,
}

impl RecordBuilder {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_class(&self) -> bool {
        self.is_class
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Arc<Field>> {
        if let Some(c) = self.constructor.as_ref().filter(|c| c.name() == name) {
            return Some(c);
        }
        self.fields.iter().find(|f| !f.name().is_empty() && f.name() == name)
    }

    fn owner(&self) -> String {
        if self.is_class {
            format!("dclass {}", self.name)
        } else {
            format!("struct {}", self.name)
        }
    }

    fn has_own_fields(&self) -> bool {
        self.fields.len() > self.num_inherited || self.constructor.is_some()
    }
}

#[derive(Debug, Default)]
pub struct Module {
    classes: Vec<TypeRef>,
    structs: Vec<TypeRef>,
    typedefs: IndexMap<String, TypeRef>,
    bindings: HashMap<String, Binding>,
    keywords: IndexSet<String>,
    imports: Vec<Import>,
    fields: Vec<Arc<Field>>,
    next_field_id: u32,
    string_type: OnceLock<TypeRef>,
    blob_type: OnceLock<TypeRef>,
    interned: HashMap<(Subtype, Option<ArrayRange>), TypeRef>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    // ---------- type construction ----------

    pub fn declare_numeric(&self, kind: NumericKind) -> NumericType {
        NumericType::new(kind)
    }

    /// Array of `element` with an optional element-count range. Plain `char` and `uint8`
    /// element arrays are interned so equal declarations share one type.
    pub fn declare_container(
        &mut self,
        element: TypeRef,
        range: Option<ArrayRange>,
    ) -> Result<TypeRef, SchemaError> {
        if element.is_method() {
            return Err(SchemaError::MethodElement);
        }
        if let Some(r) = range {
            if !r.is_valid() {
                return Err(SchemaError::InvalidArrayRange(format!("{}-{}", r.min, r.max)));
            }
        }

        let plain = element
            .as_numeric()
            .filter(|n| n.divisor() == 1 && !n.has_range() && !n.has_modulus())
            .filter(|_| element.alias().is_none())
            .map(|n| n.kind())
            .filter(|k| matches!(k, NumericKind::Char | NumericKind::Uint8));

        let Some(kind) = plain else {
            return Ok(Arc::new(Type::Array(ArrayType::new(element, range))));
        };
        if range.is_none() {
            return Ok(match kind {
                NumericKind::Char => self.string_type(),
                _ => self.blob_type(),
            });
        }
        let key = (kind.subtype(), range);
        if let Some(t) = self.interned.get(&key) {
            return Ok(t.clone());
        }
        let alias = match kind {
            NumericKind::Char => "string",
            _ => "blob",
        };
        let ty = Arc::new(Type::Array(ArrayType::new(element, range)).with_alias(alias));
        self.interned.insert(key, ty.clone());
        Ok(ty)
    }

    /// Canonical unbounded `string` (array of char), created once per catalog.
    pub fn string_type(&self) -> TypeRef {
        self.string_type
            .get_or_init(|| {
                let ty = ArrayType::new(Type::numeric(NumericKind::Char), None);
                Arc::new(Type::Array(ty).with_alias("string"))
            })
            .clone()
    }

    /// Canonical unbounded `blob` (array of uint8), created once per catalog.
    pub fn blob_type(&self) -> TypeRef {
        self.blob_type
            .get_or_init(|| {
                let ty = ArrayType::new(Type::numeric(NumericKind::Uint8), None);
                Arc::new(Type::Array(ty).with_alias("blob"))
            })
            .clone()
    }

    // ---------- records ----------

    pub fn begin_record(&self, name: impl Into<String>) -> RecordBuilder {
        RecordBuilder {
            name: name.into(),
            is_class: false,
            parents: Vec::new(),
            fields: Vec::new(),
            num_inherited: 0,
            constructor: None,
        }
    }

    pub fn begin_class(&self, name: impl Into<String>) -> RecordBuilder {
        RecordBuilder {
            is_class: true,
            ..self.begin_record(name)
        }
    }

    /// Resolve `name` as a class usable as a parent.
    pub fn resolve_class(&self, name: &str) -> Result<TypeRef, SchemaError> {
        match self.bindings.get(name) {
            Some(Binding::Class(t)) => Ok(t.clone()),
            Some(Binding::Struct(_)) => Err(SchemaError::InheritFromStruct(name.to_string())),
            Some(Binding::Typedef(_)) => Err(SchemaError::InheritFromNonClass(name.to_string())),
            None => Err(SchemaError::ClassNotFound(name.to_string())),
        }
    }

    /// Add a parent class. Its fields become visible through the builder; a name already
    /// provided by an earlier parent is skipped.
    pub fn add_parent(&self, builder: &mut RecordBuilder, name: &str) -> Result<(), SchemaError> {
        let parent = self.resolve_class(name)?;
        if let Some(class) = parent.as_class() {
            for f in class.record().fields() {
                if builder.field_by_name(f.name()).is_none() {
                    builder.fields.insert(builder.num_inherited, f.clone());
                    builder.num_inherited += 1;
                }
            }
        }
        builder.parents.push(parent);
        Ok(())
    }

    /// Add an atomic field, assigning it the next module-wide field id.
    pub fn add_field(
        &mut self,
        builder: &mut RecordBuilder,
        mut field: Field,
    ) -> Result<Arc<Field>, SchemaError> {
        if builder.is_class && field.name().is_empty() {
            return Err(SchemaError::UnnamedClassField);
        }
        if !field.name().is_empty() && builder.field_by_name(field.name()).is_some() {
            return Err(SchemaError::DuplicateField {
                field: field.name().to_string(),
                owner: builder.owner(),
            });
        }
        if let Some(kw) = field.keywords().find(|k| !self.has_keyword(k)) {
            return Err(SchemaError::UndeclaredKeyword(kw.to_string()));
        }

        let is_constructor = field.name() == builder.name;
        if !builder.is_class {
            if is_constructor {
                return Err(SchemaError::ConstructorInStruct);
            }
            if field.ty().is_method() {
                return Err(SchemaError::MethodInStruct);
            }
        } else if is_constructor && builder.has_own_fields() {
            return Err(SchemaError::ConstructorNotFirst);
        }

        field.set_id(self.next_field_id);
        self.next_field_id += 1;
        let field = Arc::new(field);
        self.fields.push(field.clone());
        tracing::debug!(owner = %builder.name, field = field.name(), id = field.id(), "field added");

        if builder.is_class && is_constructor {
            builder.constructor = Some(field.clone());
        } else {
            builder.fields.push(field.clone());
        }
        Ok(field)
    }

    /// Add a molecular field over already-declared fields of a class.
    pub fn add_molecular(
        &mut self,
        builder: &mut RecordBuilder,
        name: &str,
        components: &[&str],
    ) -> Result<Arc<Field>, SchemaError> {
        if name == builder.name {
            return Err(SchemaError::MolecularConstructor);
        }
        if builder.field_by_name(name).is_some() {
            return Err(SchemaError::DuplicateField {
                field: name.to_string(),
                owner: builder.owner(),
            });
        }
        let mut atoms: Vec<Arc<Field>> = Vec::with_capacity(components.len());
        for &c in components {
            let f = builder
                .field_by_name(c)
                .ok_or_else(|| SchemaError::UnknownComponent(c.to_string()))?
                .clone();
            if f.is_molecular() {
                return Err(SchemaError::NestedMolecular(c.to_string()));
            }
            if let Some(first) = atoms.first() {
                if !first.has_matching_keywords(&f) {
                    return Err(SchemaError::MismatchedKeywords {
                        first: first.name().to_string(),
                        other: f.name().to_string(),
                    });
                }
            }
            atoms.push(f);
        }

        let mut field = Field::molecular(name, atoms);
        field.set_id(self.next_field_id);
        self.next_field_id += 1;
        let field = Arc::new(field);
        self.fields.push(field.clone());
        builder.fields.push(field.clone());
        tracing::debug!(owner = %builder.name, field = name, "molecular field added");
        Ok(field)
    }

    pub fn seal_record(&mut self, builder: RecordBuilder) -> Result<TypeRef, SchemaError> {
        let new = format!("struct {}", builder.name);
        self.check_free(&builder.name, &new)?;
        let ty = Arc::new(Type::Struct(Struct::from_fields(builder.name.clone(), builder.fields)));
        self.structs.push(ty.clone());
        self.bindings
            .insert(builder.name.clone(), Binding::Struct(ty.clone()));
        tracing::debug!(name = %builder.name, size = ty.fixed_size(), "struct added");
        Ok(ty)
    }

    pub fn seal_class(&mut self, builder: RecordBuilder) -> Result<TypeRef, SchemaError> {
        let new = format!("dclass {}", builder.name);
        self.check_free(&builder.name, &new)?;
        let id = self.classes.len() as u32;
        let record = Struct::from_fields(builder.name.clone(), builder.fields);
        let class = Class::new(
            record,
            id,
            builder.parents,
            builder.constructor,
            builder.num_inherited,
        );
        let ty = Arc::new(Type::Class(class));
        self.classes.push(ty.clone());
        self.bindings
            .insert(builder.name.clone(), Binding::Class(ty.clone()));
        tracing::debug!(name = %builder.name, id, "class added");
        Ok(ty)
    }

    /// Bind `name` to a copy of `ty` carrying the alias. Typedefs of structs and classes
    /// share the record itself.
    pub fn add_typedef(&mut self, name: &str, ty: &TypeRef) -> Result<TypeRef, SchemaError> {
        self.check_free(name, &format!("typedef {}", name))?;
        let aliased = match ty.as_ref() {
            Type::Struct(_) | Type::Class(_) => ty.clone(),
            other => Arc::new(other.with_alias(name)),
        };
        self.typedefs.insert(name.to_string(), aliased.clone());
        self.bindings
            .insert(name.to_string(), Binding::Typedef(aliased.clone()));
        tracing::debug!(name, subtype = %aliased.subtype(), "typedef added");
        Ok(aliased)
    }

    fn check_free(&self, name: &str, new: &str) -> Result<(), SchemaError> {
        match self.bindings.get(name) {
            Some(existing) => Err(SchemaError::Conflict {
                new: new.to_string(),
                existing: existing.describe(name),
            }),
            None => Ok(()),
        }
    }

    // ---------- keywords / imports ----------

    /// Returns false if the keyword was already declared.
    pub fn add_keyword(&mut self, keyword: impl Into<String>) -> bool {
        self.keywords.insert(keyword.into())
    }

    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.keywords.contains(keyword)
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(String::as_str)
    }

    pub fn add_import(&mut self, import: Import) {
        self.imports.push(import);
    }

    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    // ---------- lookup ----------

    pub fn binding(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    /// Resolve a class, struct or typedef name.
    pub fn resolve_type_by_name(&self, name: &str) -> Result<TypeRef, SchemaError> {
        self.bindings
            .get(name)
            .map(|b| b.ty().clone())
            .ok_or_else(|| SchemaError::NotFound(name.to_string()))
    }

    pub fn classes(&self) -> &[TypeRef] {
        &self.classes
    }

    pub fn structs(&self) -> &[TypeRef] {
        &self.structs
    }

    pub fn typedefs(&self) -> impl Iterator<Item = (&str, &TypeRef)> {
        self.typedefs.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn class_by_id(&self, id: u32) -> Option<&Class> {
        self.classes.get(id as usize).and_then(|t| t.as_class())
    }

    pub fn class_by_name(&self, name: &str) -> Option<&Class> {
        match self.bindings.get(name) {
            Some(Binding::Class(t)) => t.as_class(),
            _ => None,
        }
    }

    pub fn struct_by_name(&self, name: &str) -> Option<&Struct> {
        match self.bindings.get(name) {
            Some(Binding::Struct(t)) => t.as_struct(),
            _ => None,
        }
    }

    pub fn field_by_id(&self, id: u32) -> Option<&Arc<Field>> {
        self.fields.get(id as usize)
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    /// Names bound at the top level of the catalog.
    pub fn names(&self) -> HashSet<&str> {
        self.bindings.keys().map(String::as_str).collect()
    }
}
