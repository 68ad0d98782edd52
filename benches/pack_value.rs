//! Benchmark: compile value literals against a parsed schema, decode the packed bytes,
//! and re-encode the decoded values. Parsing the schema itself is measured separately.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dcfile::{encode_value, parse_dcfile, parse_type, parse_value, Module, TypeRef, WireReader};

const SCHEMA: &str = r#"
keyword broadcast;
keyword ram;

typedef uint16(0-3600)/10 heading;

struct Point {
  int16 x;
  int16 y;
  heading h;
};

struct Waypoint {
  string name;
  Point pos;
  uint8 flags[4];
};

dclass Avatar {
  setName(string name) broadcast ram;
  setPath(Waypoint path[]) ram;
  setStats(uint32 stats[8]) broadcast;
};
"#;

const PATH_VALUE: &str = r#"[
  {"start", {1, 2, 90.5}, [1, 2, 3, 4]},
  {"middle", {-10, 20, 180}, [0 * 4]},
  {"end", {300, -400, 359.9}, [255, 0, 255, 0]}
]"#;

fn path_type(module: &mut Module) -> TypeRef {
    parse_type(module, "Waypoint[]").expect("type")
}

fn bench_pack_value(c: &mut Criterion) {
    let mut module = parse_dcfile(SCHEMA).expect("schema");
    let path = path_type(&mut module);
    let stats = parse_type(&mut module, "uint32[8]").expect("type");
    let packed = parse_value(&path, PATH_VALUE).expect("value");
    let decoded = WireReader::new(&packed).read_value(&path).expect("decode");

    c.bench_function("parse_schema", |b| {
        b.iter(|| parse_dcfile(black_box(SCHEMA)).map(|m| m.num_fields()))
    });

    c.bench_function("pack_waypoints", |b| {
        b.iter(|| parse_value(&path, black_box(PATH_VALUE)).map(|v| v.len()))
    });

    c.bench_function("pack_expanded_array", |b| {
        b.iter(|| parse_value(&stats, black_box("[7 * 8]")).map(|v| v.len()))
    });

    c.bench_function("decode_waypoints", |b| {
        b.iter(|| {
            let mut reader = WireReader::new(black_box(&packed));
            reader.read_value(&path).map(|_| reader.tell())
        })
    });

    c.bench_function("encode_decoded_waypoints", |b| {
        b.iter(|| encode_value(&path, black_box(&decoded)).map(|v| v.len()))
    });
}

criterion_group!(benches, bench_pack_value);
criterion_main!(benches);
