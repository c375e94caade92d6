use vfs::{Error, Result};

/// Packs `name` into a zero-padded fixed-width field.
pub fn encode_name<const N: usize>(name: &str) -> Result<[u8; N]> {
    let bytes = name.as_bytes();
    if bytes.len() > N {
        return Err(Error::NameTooLong(name.to_owned()));
    }

    let mut field = [0; N];
    field[..bytes.len()].copy_from_slice(bytes);
    Ok(field)
}

/// Reads a fixed-width field up to the first NUL.
pub fn decode_name(field: &[u8]) -> String {
    let len = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..len]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_and_full_width() {
        let field: [u8; 4] = encode_name("ab").unwrap();
        assert_eq!(field, *b"ab\0\0");
        assert_eq!(decode_name(&field), "ab");

        let field: [u8; 4] = encode_name("abcd").unwrap();
        assert_eq!(decode_name(&field), "abcd");

        assert!(matches!(encode_name::<4>("abcde"), Err(Error::NameTooLong(_))));
    }
}
