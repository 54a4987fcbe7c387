#![no_main]

use fatoora::crypto::qr::{QrPayload, decode_tlv};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = decode_tlv(data);
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(payload) = QrPayload::decode(s) {
            let _ = payload.encode();
        }
    }
});
