// src/naver/encoding.rs
use encoding_rs::EUC_KR;

/// Decodes a listing page body from EUC-KR.
/// Malformed sequences become U+FFFD; the decode itself never fails.
pub fn decode_euc_kr(bytes: &[u8]) -> String {
    let (text, had_errors) = EUC_KR.decode_without_bom_handling(bytes);
    if had_errors {
        tracing::warn!("EUC-KR payload contained malformed sequences ({} bytes)", bytes.len());
    }
    text.into_owned()
}
