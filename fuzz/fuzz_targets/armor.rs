#![no_main]

use citadel_age::armor;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = armor::decode(text);
    }
    let encoded = armor::encode(data);
    assert_eq!(armor::decode(&encoded).unwrap(), data);
});
