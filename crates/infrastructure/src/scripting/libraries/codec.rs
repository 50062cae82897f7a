//! Base64 and text codecs shared by `btoa`/`atob` and `CryptoJS.enc`.

use base64::Engine as _;
use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

use super::LibraryError;

/// Decoder accepting input with or without trailing `=`.
const FORGIVING: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Standard padded base64.
#[must_use]
pub fn base64_encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes base64 after stripping ASCII whitespace; padding is optional.
///
/// # Errors
///
/// Returns [`LibraryError::InvalidBase64`] for characters outside the
/// alphabet or an impossible length.
pub fn base64_decode(input: &str) -> Result<Vec<u8>, LibraryError> {
    let compact: String = input
        .chars()
        .filter(|c| !matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0c'))
        .collect();
    FORGIVING
        .decode(compact.as_bytes())
        .map_err(|e| LibraryError::InvalidBase64(e.to_string()))
}

/// Browser `btoa`: every character must fit in one byte.
///
/// # Errors
///
/// Returns [`LibraryError::InvalidCharacter`] for characters above U+00FF.
pub fn btoa(input: &str) -> Result<String, LibraryError> {
    let bytes = input
        .chars()
        .map(|c| u8::try_from(u32::from(c)).map_err(|_| LibraryError::InvalidCharacter(c)))
        .collect::<Result<Vec<u8>, _>>()?;
    Ok(base64_encode(&bytes))
}

/// Browser `atob`: decoded bytes map one-to-one onto U+0000..U+00FF.
///
/// # Errors
///
/// Returns [`LibraryError::InvalidBase64`] when the input is not base64.
pub fn atob(input: &str) -> Result<String, LibraryError> {
    Ok(base64_decode(input)?.into_iter().map(char::from).collect())
}

/// Decodes bytes as UTF-8.
///
/// # Errors
///
/// Returns [`LibraryError::MalformedUtf8`] for invalid sequences.
pub fn utf8_decode(bytes: Vec<u8>) -> Result<String, LibraryError> {
    String::from_utf8(bytes).map_err(|_| LibraryError::MalformedUtf8)
}

/// Parses hex produced by script code.
///
/// # Errors
///
/// Returns [`LibraryError::InvalidHex`] for odd lengths or non-hex digits.
pub fn from_hex(input: &str) -> Result<Vec<u8>, LibraryError> {
    hex::decode(input).map_err(|e| LibraryError::InvalidHex(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_btoa_atob() {
        assert_eq!(btoa("myAppCode:myAppSecret").unwrap(), "bXlBcHBDb2RlOm15QXBwU2VjcmV0");
        assert_eq!(atob("bXlBcHBDb2RlOm15QXBwU2VjcmV0").unwrap(), "myAppCode:myAppSecret");
        assert_eq!(btoa("\u{e9}").unwrap(), "6Q==");
        assert_eq!(atob("6Q==").unwrap(), "\u{e9}");
    }

    #[test]
    fn test_btoa_rejects_wide_characters() {
        assert!(matches!(btoa("\u{263a}"), Err(LibraryError::InvalidCharacter('\u{263a}'))));
    }

    #[test]
    fn test_atob_is_forgiving() {
        assert_eq!(atob("aGVs bG8").unwrap(), "hello");
        assert_eq!(atob("aGVsbG8=\n").unwrap(), "hello");
        assert!(atob("a").is_err());
        assert!(atob("a*b=").is_err());
    }

    #[test]
    fn test_round_trip_printable_ascii() {
        let printable: String = (0x20u8..0x7f).map(char::from).collect();
        assert_eq!(atob(&btoa(&printable).unwrap()).unwrap(), printable);
    }

    #[test]
    fn test_utf8_decode() {
        assert_eq!(utf8_decode(vec![0x68, 0x69]).unwrap(), "hi");
        assert!(matches!(utf8_decode(vec![0xff, 0xfe]), Err(LibraryError::MalformedUtf8)));
    }
}
