//! Decoder for the 880 parallel-script block

use crate::models::CjkInfo;

use super::subfield::FIELD_DELIMITER;

/// Decode `"100 山田太郎 // 24500 書名"` style text. Each piece is a field
/// number prefix, a space, then the value; unknown prefixes are dropped.
pub fn decode_cjk(text: &str) -> CjkInfo {
    let mut info = CjkInfo::default();
    for piece in text.split(FIELD_DELIMITER) {
        let (field, value) = piece.split_once(' ').unwrap_or((piece, ""));
        let value = Some(value.to_string());
        if field.starts_with('1') {
            info.author = value;
        } else if field.starts_with("245") {
            info.title = value;
        } else if field.starts_with("260") {
            info.imprint = value;
        } else if field.starts_with("600") {
            info.author600 = value;
        }
    }
    info
}
