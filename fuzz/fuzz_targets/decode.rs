#![no_main]
use extid_rs::{Codec, Registry};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let registry = Registry::new();
    registry.register("test", b"random-key-16byt").unwrap();
    let _ = Codec::new(&registry).decode(&String::from_utf8_lossy(data));
});
