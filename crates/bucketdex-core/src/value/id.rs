use crate::value::Value;
use ulid::Ulid;

/// Column-name suffix marking identifier columns.
pub const ID_COLUMN_SUFFIX: &str = "_id";

/// Byte length of a binary-encoded identifier.
pub const ID_BINARY_LEN: usize = 16;

/// Character length of an identifier's canonical text form.
pub const ID_TEXT_LEN: usize = 26;

#[must_use]
pub fn is_id_column(column: &str) -> bool {
    column.ends_with(ID_COLUMN_SUFFIX)
}

/// Recognize an identifier and return it in canonical form.
///
/// - `Value::Ulid` is always an identifier, whatever the column.
/// - Under a `*_id` column, a 16-byte blob (binary encoding) or a 26-char
///   text (either case) that decodes cleanly is an identifier.
/// - Anything else is not, and is hashed and compared as-is.
#[must_use]
pub fn canonical_id(column: &str, value: &Value) -> Option<Ulid> {
    match value {
        Value::Ulid(id) => Some(*id),
        Value::Blob(bytes) if is_id_column(column) => {
            let raw = <[u8; ID_BINARY_LEN]>::try_from(bytes.as_slice()).ok()?;

            Some(Ulid::from_bytes(raw))
        }
        Value::Text(text) if is_id_column(column) && text.len() == ID_TEXT_LEN => {
            Ulid::from_string(text).ok()
        }
        _ => None,
    }
}
