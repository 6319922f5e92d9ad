//! Known Answer tests (header codec, key schedule, interoperable files)

use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::{alphabet, Engine};

use citadel_age::primitives::derive;
use citadel_age::recipients::X25519Recipient;
use citadel_age::{
    ciphertext_size, identity_to_recipient, inspect, ConfigError, Decrypter, Error, FormatError,
    Header,
};

const HEADER_VECTOR: &[u8] = b"age-encryption.org/v1
-> X25519 abc
0OrTkKHpE7klNLd0k+9Uam5hkQkzMxaqKcIPRIO1sNE
--- gxhoSa5BciRDt8lOpYNcx4EYtKpS0CJ06F3ZwN82VaM
this is the payload";

const PASSPHRASE: &str = "light-original-energy-average-wish-blind-vendor-pencil-illness-scorpion";
const PASSPHRASE_FILE: &str = "YWdlLWVuY3J5cHRpb24ub3JnL3YxCi0+IHNjcnlwdCB4Y2lkcXJQdmwwZzRROEZ5eXU4dHNnIDgKNnM2Ylp2Vlg2b0NBSVp2QkxCZEhJbEJrYUcreWRIZHVHWVpBaUJkUy9ZMAotLS0gZ280TkNGT05VTDEwZW5WRjVPMnkxem05eWQwdkM0S09hSU1nV05aYW5QSQom4WH7RYXsjlDm3HNKCe9gY2IfCjTY/2t6PF4bzUkeWZWkE7kd";

const IDENTITY: &str = "AGE-SECRET-KEY-1L27NYJDYRNDSCCELNZE8C6JTSH22TLQJVPGD7289KDLMZA5HWN6SZPEHGF";
const IDENTITY_FILE: &str = "YWdlLWVuY3J5cHRpb24ub3JnL3YxCi0+IFgyNTUxOSBOb280UHUyVWZwTllzY3Z5OU1tTjlscHV1Smt4Nng0MEZkdGZoQzd1dVFZCmk0VUNvVmoxbEhHalV0bVR2MHFyRGl0YzNtMXdoY1oyVUtvWDU3MUQwR1EKLS0tIGJ1RTZSYmR6ZlNHSk5tSGl3U2hqR1FFUDF4eEdjSGZtbXlYQUN4SnM4RDAKyqdZXpg65sTtmakjxLONtEgaSwXeS8t+7jAWvlleVEFO4/9QIQ";

fn file(b64: &str) -> Vec<u8> {
    // Vectors may be unpadded (as in the reference test suite).
    const LENIENT: GeneralPurpose = GeneralPurpose::new(
        &alphabet::STANDARD,
        GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
    );
    LENIENT.decode(b64).unwrap()
}

#[test]
fn test_header_vector() {
    let (header, rest) = Header::parse(HEADER_VECTOR).unwrap();
    assert_eq!(header.stanzas().len(), 1);
    assert_eq!(header.stanzas()[0].args(), ["X25519", "abc"]);
    assert_eq!(
        hex::encode(header.stanzas()[0].body()),
        "d0ead390a1e913b92534b77493ef546a6e619109333316aa29c20f4483b5b0d1"
    );
    assert_eq!(
        hex::encode(header.mac()),
        "83186849ae41722443b7c94ea5835cc78118b4aa52d02274e85dd9c0df3655a3"
    );
    assert_eq!(rest, b"this is the payload");
    assert_eq!(header.encode(), &HEADER_VECTOR[..HEADER_VECTOR.len() - rest.len()]);
}

#[test]
fn test_header_vector_streaming() {
    let mut reader = HEADER_VECTOR;
    let header = Header::read(&mut reader, Default::default()).unwrap();
    assert_eq!(header.stanzas()[0].tag(), "X25519");
    assert_eq!(reader, b"this is the payload");
}

#[test]
fn test_hkdf_vectors() {
    let salt = b"saltsaltsaltsaltsaltsaltsaltsalt";
    assert_eq!(
        hex::encode(derive(b"secret", Some(&salt[..]), "info").unwrap()),
        "b3bae2c60b0fffa7c7eb7af6560f6419b027feb579f42674c7b6ef6fbca64d7d"
    );
    assert_eq!(
        hex::encode(derive(b"secret", None, "info").unwrap()),
        "7e11a191fa879919dcf4e336e0d736091bee42c78d4ccb86214290a677884a7a"
    );
}

#[test]
fn test_decrypt_passphrase_file() {
    let mut d = Decrypter::new();
    d.add_passphrase(PASSPHRASE);
    assert_eq!(d.decrypt_to_string(file(PASSPHRASE_FILE)).unwrap(), "test\n");
}

#[test]
fn test_decrypt_passphrase_file_wrong_passphrase() {
    let mut d = Decrypter::new();
    d.add_passphrase("not it");
    assert!(matches!(d.decrypt(file(PASSPHRASE_FILE)), Err(Error::NoMatch)));
}

#[test]
fn test_decrypt_x25519_file() {
    let mut d = Decrypter::new();
    d.add_identity(IDENTITY).unwrap();
    assert_eq!(d.decrypt_to_string(file(IDENTITY_FILE)).unwrap(), "test\n");
}

#[test]
fn test_decrypt_x25519_file_streaming() {
    use std::io::Read;

    let mut d = Decrypter::new();
    d.add_identity(IDENTITY).unwrap();
    let ct = file(IDENTITY_FILE);
    let mut out = String::new();
    d.decrypt_from(ct.as_slice())
        .unwrap()
        .read_to_string(&mut out)
        .unwrap();
    assert_eq!(out, "test\n");
}

#[test]
fn test_inspect_vectors() {
    let info = inspect(&file(IDENTITY_FILE)).unwrap();
    assert_eq!(info.stanza_types, ["X25519"]);
    assert_eq!(info.plaintext_bytes, 5);
    assert_eq!(info.payload_bytes as u64, 16 + ciphertext_size(5));

    let info = inspect(&file(PASSPHRASE_FILE)).unwrap();
    assert_eq!(info.stanza_types, ["scrypt"]);
    assert!(!info.post_quantum);
}

#[test]
fn test_identity_to_recipient() {
    assert_eq!(
        identity_to_recipient(
            "AGE-SECRET-KEY-1RKH0DGHQ0FU6VLXX2VW6Y3W2TKK7KR4J36N9SNDXK75JHCJ3N6JQNZJF5J"
        )
        .unwrap(),
        "age1tgyuvdlmpejqsdf847hevurz9szk7vf3j7ytfyqecgzvphvu2d8qrtaxl6"
    );
}

#[test]
fn test_recipient_strings() {
    for ok in [
        "age1tgyuvdlmpejqsdf847hevurz9szk7vf3j7ytfyqecgzvphvu2d8qrtaxl6",
        "age12wv74vxhhp9kg29j2wzm50c9p4urn7py0t4tzdgz6m0pcqjzmu9qqpzjqn",
    ] {
        let r: X25519Recipient = ok.parse().unwrap();
        assert_eq!(r.to_string(), ok);
    }

    for bad in [
        "age1tgyuvdlmpejqsdf847hevurz9szk7vf3j7ytfyqecgzvphvu2d8qrtaxl",
        "AGE1TGYUVDLMPEJQSDF847HEVURZ9SZK7VF3J7YTFYQECGZVPHVU2D8QRTAXL6",
        "ag1tgyuvdlmpejqsdf847hevurz9szk7vf3j7ytfyqecgzvphvu2d8qrtaxl6",
        "age1tgyuvdlmpejqsdf847hevurz9szk7vf3j7ytfyqecgzvphvu2d8qrtaxl7",
    ] {
        assert!(
            matches!(
                bad.parse::<X25519Recipient>(),
                Err(Error::Config(ConfigError::InvalidRecipient))
            ),
            "{bad} should be rejected"
        );
    }
}

#[test]
fn test_truncated_vector_is_format_error() {
    let ct = file(IDENTITY_FILE);
    let (header, _) = Header::parse(&ct).unwrap();
    let header_len = header.encode().len();

    let mut d = Decrypter::new();
    d.add_identity(IDENTITY).unwrap();
    assert!(matches!(
        d.decrypt(&ct[..header_len + 8]),
        Err(Error::Format(FormatError::MissingNonce))
    ));
    assert!(matches!(d.decrypt(&ct[..header_len + 16 + 10]), Err(Error::Decryption)));
}
