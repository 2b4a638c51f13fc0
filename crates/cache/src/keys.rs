//! Reversible mapping between cache keys and backing file names
//!
//! ASCII letters, digits and `-` are kept; every other byte becomes `_XX`
//! with two uppercase hex digits. Distinct keys therefore never share a file,
//! and the index can be rebuilt from the directory listing alone.

use std::fmt::Write;

const EMPTY_KEY_NAME: &str = "_";

fn is_plain(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'-'
}

/// File name a key is stored under
pub fn file_name_for(key: &str) -> String {
    if key.is_empty() {
        return EMPTY_KEY_NAME.to_string();
    }
    let mut name = String::with_capacity(key.len());
    for byte in key.bytes() {
        if is_plain(byte) {
            name.push(byte as char);
        } else {
            let _ = write!(name, "_{byte:02X}");
        }
    }
    name
}

/// Key a file name was produced from, `None` for names this cache never writes
pub fn key_for(name: &str) -> Option<String> {
    if name == EMPTY_KEY_NAME {
        return Some(String::new());
    }
    let bytes = name.as_bytes();
    let mut key = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                let hex = name.get(i + 1..i + 3)?;
                let byte = u8::from_str_radix(hex, 16).ok()?;
                key.push(byte);
                i += 3;
            }
            b if is_plain(b) => {
                key.push(b);
                i += 1;
            }
            _ => return None,
        }
    }
    let key = String::from_utf8(key).ok()?;
    // reject lowercase hex and escaped plain bytes so the mapping stays one to one
    (file_name_for(&key) == name).then_some(key)
}
