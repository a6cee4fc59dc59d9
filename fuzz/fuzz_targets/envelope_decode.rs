#![no_main]

use libfuzzer_sys::fuzz_target;
use precedence_codec::envelope::{decode_record, derive_chain, extract_after};

fuzz_target!(|data: &[u8]| {
    let split = data.first().map(|b| *b as usize).unwrap_or(0).min(data.len());
    let (key, value) = data.split_at(split);
    let _ = derive_chain(data);
    let _ = extract_after(data);
    let _ = decode_record(Some(key), value);
    let _ = decode_record(None, value);
});
