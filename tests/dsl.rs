//! Schema language tests: declarations, catalog lookups and schema diagnostics.

use dcfile::{
    parse_dcfile, parse_dcfile_into, parse_type, read_dcfile, ErrorKind, Import, LoadError,
    Module, NumericKind, Subtype,
};
use std::io::Write;
use std::sync::Arc;

const AVATAR: &str = r#"
keyword broadcast;
keyword ram;
keyword db;

typedef uint16(0-360)/10 heading;

struct Point {
  int16 x;
  int16 y;
};

dclass Avatar {
  setName(string name) broadcast ram;
  setPos(Point p, heading h) broadcast ram;
  setPath(Point path[]) ram;
  setPosName : setPos, setName;
};

dclass Player : Avatar {
  uint32 score = 10 db;
};
"#;

fn errors(src: &str) -> dcfile::Diagnostics {
    match parse_dcfile(src) {
        Ok(_) => panic!("expected errors for:\n{}", src),
        Err(d) => d,
    }
}

// ==================== Syntax: valid files ====================

#[test]
fn parse_empty_file() {
    let m = parse_dcfile("").expect("parse");
    assert!(m.classes().is_empty());
    assert!(m.structs().is_empty());
}

#[test]
fn parse_comments_everywhere() {
    let src = r#"
// leading comment
struct S { /* inline */ uint8 a; // trailing
  /* multi
     line */
  uint8 b;
};
"#;
    let m = parse_dcfile(src).expect("parse");
    assert_eq!(m.struct_by_name("S").expect("S").num_fields(), 2);
}

#[test]
fn parse_full_schema() {
    let m = parse_dcfile(AVATAR).expect("parse");
    assert_eq!(m.classes().len(), 2);
    assert_eq!(m.structs().len(), 1);
    assert!(m.has_keyword("broadcast"));
    assert_eq!(m.keywords().collect::<Vec<_>>(), vec!["broadcast", "ram", "db"]);

    let avatar = m.class_by_name("Avatar").expect("Avatar");
    let names: Vec<&str> = avatar.record().fields().iter().map(|f| f.name()).collect();
    assert_eq!(names, vec!["setName", "setPos", "setPath", "setPosName"]);

    let set_pos = avatar.field_by_name("setPos").expect("setPos");
    assert!(set_pos.has_keyword("broadcast"));
    let method = set_pos.ty().as_method().expect("method");
    assert_eq!(method.num_parameters(), 2);
    assert_eq!(method.parameter(1).map(|p| p.name()), Some("h"));
    assert_eq!(method.parameter(1).and_then(|p| p.ty().alias()), Some("heading"));
    assert_eq!(set_pos.ty().fixed_size(), 6);
}

#[test]
fn struct_parameter_becomes_variable_array() {
    let m = parse_dcfile(AVATAR).expect("parse");
    let avatar = m.class_by_name("Avatar").expect("Avatar");
    let path = avatar.field_by_name("setPath").expect("setPath");
    let param = &path.ty().as_method().expect("method").parameters()[0];
    assert_eq!(param.ty().subtype(), Subtype::VarArray);
    let arr = param.ty().as_array().expect("array");
    assert_eq!(arr.element().display_name(), "struct Point");
    assert!(!param.ty().has_fixed_size());
}

#[test]
fn molecular_field_groups_components() {
    let m = parse_dcfile(AVATAR).expect("parse");
    let avatar = m.class_by_name("Avatar").expect("Avatar");
    let mol = avatar.field_by_name("setPosName").expect("molecular");
    assert!(mol.is_molecular());
    let parts: Vec<&str> = mol.components().iter().map(|f| f.name()).collect();
    assert_eq!(parts, vec!["setPos", "setName"]);
    assert!(mol.has_keyword("ram"));
    // Molecular fields are not part of the record layout.
    assert_eq!(avatar.record().layout_len(), 3);
}

#[test]
fn inherited_fields_come_first() {
    let m = parse_dcfile(AVATAR).expect("parse");
    let player = m.class_by_name("Player").expect("Player");
    assert_eq!(player.parents().len(), 1);
    assert_eq!(player.inherited_fields().len(), 4);
    assert_eq!(player.own_fields().len(), 1);
    assert_eq!(player.own_fields()[0].name(), "score");
    let first = player.record().fields()[0].name();
    assert_eq!(first, "setName");
    // Inherited fields are shared with the parent, not copied.
    let a = m.class_by_name("Avatar").and_then(|c| c.field_by_name("setName"));
    let p = player.field_by_name("setName");
    assert!(Arc::ptr_eq(a.expect("a"), p.expect("p")));
}

#[test]
fn earlier_parent_wins_on_shared_name() {
    let src = r#"
dclass A { uint8 x; };
dclass B { uint16 x; uint8 y; };
dclass C : A, B { uint8 z; };
"#;
    let m = parse_dcfile(src).expect("parse");
    let c = m.class_by_name("C").expect("C");
    let names: Vec<&str> = c.record().fields().iter().map(|f| f.name()).collect();
    assert_eq!(names, vec!["x", "y", "z"]);
    assert_eq!(c.field_by_name("x").expect("x").ty().subtype(), Subtype::Uint8);
}

#[test]
fn class_and_field_ids() {
    let src = r#"
struct S { uint8 a; };
dclass A { uint8 b; uint8 c; };
dclass B { uint8 d; };
"#;
    let m = parse_dcfile(src).expect("parse");
    assert_eq!(m.class_by_name("A").expect("A").id(), 0);
    assert_eq!(m.class_by_name("B").expect("B").id(), 1);
    assert_eq!(m.class_by_id(1).map(|c| c.name()), Some("B"));
    assert_eq!(m.num_fields(), 4);
    let ids: Vec<u32> = ["b", "c"]
        .iter()
        .filter_map(|n| m.class_by_name("A").and_then(|c| c.field_by_name(n)))
        .map(|f| f.id())
        .collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(m.field_by_id(3).map(|f| f.name()), Some("d"));
}

#[test]
fn constructor_is_kept_apart() {
    let src = r#"
dclass Door {
  Door(uint8 state);
  setState(uint8 state);
};
"#;
    let m = parse_dcfile(src).expect("parse");
    let door = m.class_by_name("Door").expect("Door");
    let ctor = door.constructor().expect("constructor");
    assert!(ctor.ty().is_method());
    assert_eq!(door.record().num_fields(), 1);
}

#[test]
fn imports_are_recorded() {
    let src = r#"
import views.common;
from game.views import Avatar/AI/OV, Door
from util import *
"#;
    let m = parse_dcfile(src).expect("parse");
    assert_eq!(
        m.imports(),
        &[
            Import { module: "views.common".into(), symbols: vec![] },
            Import {
                module: "game.views".into(),
                symbols: vec!["Avatar/AI/OV".into(), "Door".into()],
            },
            Import { module: "util".into(), symbols: vec!["*".into()] },
        ]
    );
}

#[test]
fn typedef_resolves_with_alias() {
    let src = r#"
typedef int8(-10-10) small;
typedef small pair[2];
struct S { small a; pair b; };
"#;
    let m = parse_dcfile(src).expect("parse");
    let s = m.struct_by_name("S").expect("S");
    let a = s.field_by_name("a").expect("a");
    assert_eq!(a.ty().alias(), Some("small"));
    assert!(a.ty().as_numeric().expect("numeric").has_range());
    let b = s.field_by_name("b").expect("b");
    assert_eq!(b.ty().alias(), Some("pair"));
    assert_eq!(b.ty().fixed_size(), 2);
    assert_eq!(s.field_by_name("b").expect("b").ty().display_name(), "pair");
}

#[test]
fn string_and_char_arrays_share_one_type() {
    let src = r#"
struct S {
  string a;
  char b[];
  blob c;
  uint8 d[];
  uint8 e[4];
  blob(4) f;
};
"#;
    let m = parse_dcfile(src).expect("parse");
    let s = m.struct_by_name("S").expect("S");
    let ty = |n: &str| s.field_by_name(n).expect("field").ty().clone();
    assert!(Arc::ptr_eq(&ty("a"), &ty("b")));
    assert!(Arc::ptr_eq(&ty("c"), &ty("d")));
    assert!(Arc::ptr_eq(&ty("e"), &ty("f")));
    assert!(Arc::ptr_eq(&ty("a"), &m.string_type()));
    assert_eq!(ty("e").subtype(), Subtype::Blob);
    assert_eq!(ty("a").subtype(), Subtype::VarString);
}

#[test]
fn field_name_array_suffix() {
    let m = parse_dcfile("struct S { uint16 grid[2][3]; };").expect("parse");
    let grid = m.struct_by_name("S").and_then(|s| s.field_by_name("grid")).expect("grid");
    assert_eq!(grid.ty().subtype(), Subtype::Array);
    assert_eq!(grid.ty().fixed_size(), 12);
}

#[test]
fn default_values_are_packed() {
    let src = r#"
struct S {
  uint8 a = 5;
  uint16 b;
  int8(3-9) c;
  string d = "hi";
};
"#;
    let m = parse_dcfile(src).expect("parse");
    let s = m.struct_by_name("S").expect("S");
    let default = |n: &str| s.field_by_name(n).expect("field").default_value().into_owned();
    assert!(s.field_by_name("a").expect("a").has_default_value());
    assert_eq!(default("a"), vec![5]);
    assert!(!s.field_by_name("b").expect("b").has_default_value());
    assert_eq!(default("b"), vec![0, 0]);
    assert_eq!(default("c"), vec![3]);
    assert_eq!(default("d"), vec![2, 0, b'h', b'i']);
}

#[test]
fn method_parameter_defaults() {
    let src = "dclass A { set(uint8 a = 7, uint16 b); };";
    let m = parse_dcfile(src).expect("parse");
    let set = m.class_by_name("A").and_then(|c| c.field_by_name("set")).expect("set");
    let method = set.ty().as_method().expect("method");
    assert_eq!(method.parameter_by_name("a").expect("a").default_value().into_owned(), vec![7]);
    assert_eq!(set.default_value().into_owned(), vec![7, 0, 0]);
}

#[test]
fn method_field_default_value() {
    let src = r#"
keyword broadcast;
dclass A {
  setPos(int16 x, int16 y) = (1, -2) broadcast;
  setName(string name) = ("bob");
};
"#;
    let m = parse_dcfile(src).expect("parse");
    let a = m.class_by_name("A").expect("A");
    let set_pos = a.field_by_name("setPos").expect("setPos");
    assert!(set_pos.has_default_value());
    assert!(set_pos.has_keyword("broadcast"));
    assert_eq!(set_pos.default_value().into_owned(), vec![1, 0, 0xFE, 0xFF]);
    let set_name = a.field_by_name("setName").expect("setName");
    assert_eq!(set_name.default_value().into_owned(), vec![3, 0, b'b', b'o', b'b']);

    let d = errors("dclass A { setPos(int16 x, int16 y) = (1); };");
    assert_eq!(d.count_of(ErrorKind::DepthImbalance), 1, "{}", d);
}

#[test]
fn numeric_modifiers_and_char_bounds() {
    let src = r#"
typedef uint8('a'-'z') lower;
typedef int32%360 angle;
typedef float64(0-1.5) ratio;
typedef uint32/1000 millis;
"#;
    let m = parse_dcfile(src).expect("parse");
    let ty = |n: &str| m.resolve_type_by_name(n).expect("typedef");
    let lower = ty("lower");
    assert_eq!(
        lower.as_numeric().and_then(|n| n.range()).map(|r| r.to_string()),
        Some("97-122".to_string())
    );
    assert_eq!(ty("angle").as_numeric().and_then(|n| n.modulus()), Some(360.0));
    assert_eq!(ty("millis").as_numeric().map(|n| n.divisor()), Some(1000));
    assert_eq!(ty("ratio").as_numeric().map(|n| n.kind()), Some(NumericKind::Float64));
}

#[test]
fn files_share_one_module() {
    let mut m = Module::new();
    let first = parse_dcfile_into(&mut m, "struct Point { int16 x; int16 y; };");
    assert!(first.is_empty());
    let second = parse_dcfile_into(&mut m, "dclass Mover { move(Point to); };");
    assert!(second.is_empty(), "{}", second);
    let ty = parse_type(&mut m, "Point[2]").expect("type");
    assert_eq!(ty.fixed_size(), 8);
}

#[test]
fn read_dcfile_from_disk() {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    file.write_all(AVATAR.as_bytes()).expect("write");
    let m = read_dcfile(file.path()).expect("load");
    assert!(m.class_by_name("Player").is_some());
}

#[test]
fn read_dcfile_missing_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = read_dcfile(dir.path().join("missing.dc")).unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }));
}

// ==================== Syntax errors ====================

#[test]
fn syntax_error_reports_line() {
    let d = errors("struct S {\n  uint8 a;\n  uint8 b c;\n};");
    assert_eq!(d.len(), 1);
    let first = d.first_of(ErrorKind::Syntax).expect("syntax");
    assert_eq!(first.span.map(|s| s.line), Some(3));
}

#[test]
fn reserved_word_is_not_a_name() {
    let d = errors("struct uint8 { int8 a; };");
    assert_eq!(d.count_of(ErrorKind::Syntax), 1);
}

#[test]
fn read_dcfile_reports_parse_errors() {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    file.write_all(b"dclass A { uint8; };").expect("write");
    match read_dcfile(file.path()) {
        Err(LoadError::Parse(d)) => assert_eq!(d.len(), 1),
        other => panic!("unexpected: {:?}", other.map(|_| ())),
    }
}

// ==================== Schema errors ====================

#[test]
fn duplicate_field_has_position() {
    let d = errors("struct S {\n  uint8 a;\n  uint8 a;\n};");
    let e = d.first_of(ErrorKind::DefinitionConflict).expect("conflict");
    assert_eq!(
        e.message,
        "Cannot add field 'a', a field with that name already exists in 'struct S'."
    );
    let span = e.span.expect("span");
    assert_eq!((span.line, span.column), (3, 3));
}

#[test]
fn redeclared_inherited_field() {
    let d = errors("dclass A { uint8 x; };\ndclass B : A { uint8 x; };");
    assert_eq!(d.count_of(ErrorKind::DefinitionConflict), 1);
}

#[test]
fn name_conflict_between_declarations() {
    let d = errors("struct P { uint8 a; };\ndclass P { uint8 b; };");
    assert_eq!(
        d.first_of(ErrorKind::DefinitionConflict).map(|e| e.message.as_str()),
        Some("Cannot add 'dclass P' to module because 'struct P' was already declared with that name.")
    );
}

#[test]
fn undeclared_type_and_parent() {
    let d = errors("struct S { Missing m; };\ndclass C : Nope { uint8 a; };");
    assert_eq!(d.count_of(ErrorKind::TypeResolution), 2);
    let messages: Vec<&str> = d.iter().map(|e| e.message.as_str()).collect();
    assert!(messages.contains(&"Type 'Missing' has not been declared."));
    assert!(messages.contains(&"'dclass Nope' has not been declared."));
}

#[test]
fn inherit_from_struct_rejected() {
    let d = errors("struct S { uint8 a; };\ndclass C : S { uint8 b; };");
    assert_eq!(
        d.iter().next().map(|e| e.message.as_str()),
        Some("class cannot inherit from struct type 'S'.")
    );
}

#[test]
fn undeclared_keyword_rejected() {
    let d = errors("dclass A { uint8 x ram; };");
    assert_eq!(
        d.iter().next().map(|e| e.message.as_str()),
        Some("Keyword 'ram' has not been declared.")
    );
}

#[test]
fn molecular_keywords_must_match() {
    let src = r#"
keyword ram;
keyword db;
dclass A {
  setX(uint8 x) ram;
  setY(uint8 y) db;
  setXY : setX, setY;
};
"#;
    let d = errors(src);
    assert_eq!(
        d.iter().next().map(|e| e.message.as_str()),
        Some("Mismatched keywords in molecular between setX and setY.")
    );
}

#[test]
fn molecular_unknown_component() {
    let d = errors("dclass A { setX(uint8 x); both : setX, setZ; };");
    assert_eq!(
        d.iter().next().map(|e| e.message.as_str()),
        Some("Field 'setZ' not defined in current class.")
    );
}

#[test]
fn constructor_must_be_first() {
    let d = errors("dclass D { uint8 a; D(uint8 x); };");
    assert_eq!(
        d.iter().next().map(|e| e.message.as_str()),
        Some("The constructor must be the first field in the class.")
    );
}

#[test]
fn struct_rejects_methods() {
    let d = errors("struct S { uint8 a; move(uint8 x); };");
    assert_eq!(
        d.iter().next().map(|e| e.message.as_str()),
        Some("A method can't be defined in a struct.")
    );
}

#[test]
fn unnamed_class_field_rejected() {
    let d = errors("dclass A { uint8; };");
    assert_eq!(
        d.iter().next().map(|e| e.message.as_str()),
        Some("An unnamed field can't be defined in a class.")
    );
}

#[test]
fn unnamed_struct_field_allowed() {
    let m = parse_dcfile("struct S { uint8; uint16; };").expect("parse");
    assert_eq!(m.struct_by_name("S").expect("S").layout_len(), 2);
}

#[test]
fn duplicate_parameter_rejected() {
    let d = errors("dclass A { set(uint8 x, uint16 x); };");
    assert_eq!(d.count_of(ErrorKind::DefinitionConflict), 1);
}

#[test]
fn bad_numeric_modifiers() {
    let src = r#"
typedef uint8(0-300) big;
typedef int8%200 wide;
typedef uint8(9-3) inverted;
typedef uint8/0 nothing;
"#;
    let d = errors(src);
    assert_eq!(d.len(), 4, "{}", d);
    assert_eq!(d.count_of(ErrorKind::RangeViolation), 4);
}

#[test]
fn bad_array_range() {
    let d = errors("struct S { uint16 a[5-2]; };");
    assert_eq!(
        d.iter().next().map(|e| e.message.as_str()),
        Some("Invalid array range (5-2), minimum exceeds maximum.")
    );
}

#[test]
fn errors_accumulate_across_declarations() {
    let src = r#"
dclass A { uint8 x ram; };
struct B { Nope n; };
struct B { uint8 y; };
"#;
    let d = errors(src);
    assert_eq!(d.len(), 3, "{}", d);
}

#[test]
fn bad_default_value_reported() {
    let d = errors("struct S { uint8 a = 300; };");
    assert_eq!(d.count_of(ErrorKind::RangeViolation), 1);
}
