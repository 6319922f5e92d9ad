#![no_main]

use std::io::Read;

use citadel_age::{Decrypter, Encrypter};
use libfuzzer_sys::fuzz_target;
use once_cell::sync::Lazy;

const IDENTITY: &str = "AGE-SECRET-KEY-1RKH0DGHQ0FU6VLXX2VW6Y3W2TKK7KR4J36N9SNDXK75JHCJ3N6JQNZJF5J";
const RECIPIENT: &str = "age1tgyuvdlmpejqsdf847hevurz9szk7vf3j7ytfyqecgzvphvu2d8qrtaxl6";

static DECRYPTER: Lazy<Decrypter> = Lazy::new(|| {
    let mut d = Decrypter::new();
    d.add_identity(IDENTITY).unwrap();
    d
});

// A valid file to splice fuzz input into, so mutations reach the payload.
static TEMPLATE: Lazy<Vec<u8>> = Lazy::new(|| {
    let mut e = Encrypter::new();
    e.add_recipient(RECIPIENT).unwrap();
    e.encrypt(b"fuzz template").unwrap()
});

fuzz_target!(|data: &[u8]| {
    let buffered = DECRYPTER.decrypt(data);

    let mut streamed = Vec::new();
    let streaming = DECRYPTER
        .decrypt_from(data)
        .map_err(|_| ())
        .and_then(|mut r| r.read_to_end(&mut streamed).map_err(|_| ()));
    assert_eq!(buffered.is_ok(), streaming.is_ok());
    if let Ok(pt) = buffered {
        assert_eq!(pt, streamed);
    }

    if let Some((&at, patch)) = data.split_first() {
        let mut file = TEMPLATE.clone();
        let at = at as usize % file.len();
        let end = (at + patch.len()).min(file.len());
        file[at..end].copy_from_slice(&patch[..end - at]);
        let _ = DECRYPTER.decrypt(&file);
    }
});
