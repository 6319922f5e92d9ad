#![no_main]

use citadel_age::{Header, ParseOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok((header, rest)) = Header::parse(data) else {
        return;
    };

    // Anything accepted re-encodes to exactly the bytes consumed.
    let consumed = &data[..data.len() - rest.len()];
    assert_eq!(header.encode(), consumed);

    let mut reader = data;
    let streamed = Header::read(&mut reader, ParseOptions::default()).unwrap();
    assert_eq!(streamed, header);
    assert_eq!(reader, rest);
});
