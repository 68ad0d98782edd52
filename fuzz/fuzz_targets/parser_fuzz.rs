//! Parser fuzz target: feed arbitrary bytes to the DC file parser.
//! The parser must not panic; it returns a module or accumulated diagnostics.
//! Build with: cargo fuzz run parser_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let s = match std::str::from_utf8(data) {
        Ok(x) => x,
        Err(_) => return,
    };
    if let Ok(mut module) = dcfile::parse_dcfile(s) {
        // Values against every declared struct must not panic either.
        let structs: Vec<_> = module.structs().to_vec();
        for ty in structs {
            let _ = dcfile::parse_value(&ty, "{}");
        }
        let _ = dcfile::parse_type(&mut module, "uint8[]");
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run parser_fuzz");
}
