#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Decoders must reject garbage without panicking
    if let Some(postings) = ranklab::utils::decode_postings(data) {
        assert!(postings.windows(2).all(|w| w[0].doc_id < w[1].doc_id));
    }
    let _ = ranklab::utils::decode_vector(data);
    let _ = ranklab::utils::decode_varint(data);
});
