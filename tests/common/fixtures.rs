//! Byte payloads with real file signatures.

#![allow(dead_code)]

pub fn png_bytes() -> Vec<u8> {
    let mut bytes = vec![
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, b'I', b'H', b'D',
        b'R', 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00,
    ];
    bytes.resize(2048, 0);
    bytes
}

pub fn jpeg_bytes() -> Vec<u8> {
    let mut bytes = vec![
        0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01, 0x01, 0x00,
    ];
    bytes.resize(4096, 0);
    bytes
}

pub fn mp4_bytes() -> Vec<u8> {
    let mut bytes = vec![
        0x00, 0x00, 0x00, 0x18, b'f', b't', b'y', b'p', b'i', b's', b'o', b'm', 0x00, 0x00, 0x02,
        0x00, b'i', b's', b'o', b'm', b'i', b's', b'o', b'2', 0x00, 0x00, 0x00, 0x08, b'f', b'r',
        b'e', b'e',
    ];
    bytes.resize(8192, 0);
    bytes
}

pub fn text_bytes() -> Vec<u8> {
    b"this is a plain text file, not a meme\n".to_vec()
}
