#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(header) = embedload::npy::parse_header(data) {
        assert!(header.data_offset <= data.len());
        let _ = embedload::decode(data);
    }
});
