//! Library provisioning for the script sandbox.
//!
//! Every library is a JavaScript factory evaluated fresh in each sandbox and
//! called with a private host object. The heavy lifting (hashing, AES,
//! base64, calendar maths) happens in the native functions below; the
//! factories only shape their results into the familiar APIs.

pub mod cipher;
pub mod codec;
pub mod date;
pub mod digest;

use boa_engine::{Context, JsError, JsResult, JsValue};
use thiserror::Error;

use self::cipher::{AesCipher, Mode, Padding};
use self::date::{Unit, Zone};
use self::digest::HashAlgorithm;
use super::convert::{bool_arg, js_str, length_arg, number_arg, string_arg, type_error};

/// Errors raised by library natives; surfaced to scripts as exceptions.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// Unknown hash algorithm.
    #[error("unsupported hash algorithm: {0}")]
    UnknownAlgorithm(String),

    /// Unknown block mode.
    #[error("unsupported cipher mode: {0}")]
    UnknownMode(String),

    /// Unknown padding scheme.
    #[error("unsupported padding: {0}")]
    UnknownPadding(String),

    /// Key rejected by the primitive.
    #[error("{0}")]
    InvalidKey(String),

    /// Unpadded input to a chaining mode.
    #[error("data length {0} is not a multiple of the block size")]
    Unaligned(usize),

    /// Bad hex from script code.
    #[error("invalid hex data: {0}")]
    InvalidHex(String),

    /// Bad base64.
    #[error("invalid base64 data: {0}")]
    InvalidBase64(String),

    /// A `btoa` input character does not fit in one byte.
    #[error("invalid character {0:?}: only Latin-1 characters can be encoded")]
    InvalidCharacter(char),

    /// Bytes are not UTF-8.
    #[error("Malformed UTF-8 data")]
    MalformedUtf8,

    /// Unknown calendar unit.
    #[error("unsupported time unit: {0}")]
    UnknownUnit(String),
}

impl From<LibraryError> for JsError {
    fn from(error: LibraryError) -> Self {
        type_error(error.to_string())
    }
}

/// Factory sources in provisioning order.
pub(crate) const CRYPTO_JS: &str = include_str!("js/crypto-js.js");
pub(crate) const LODASH: &str = include_str!("js/lodash.js");
pub(crate) const MOMENT: &str = include_str!("js/moment.js");
pub(crate) const EXPECT: &str = include_str!("js/expect.js");

/// Signature of a host native that needs no bridge state.
pub(crate) type HostFn = fn(&JsValue, &[JsValue], &mut Context) -> JsResult<JsValue>;

/// Natives shared by every library factory.
pub(crate) const NATIVES: &[(&str, usize, HostFn)] = &[
    ("digest", 2, digest),
    ("hmac", 3, hmac),
    ("cipher", 6, cipher),
    ("evpKdf", 4, evp_kdf),
    ("randomHex", 1, random_hex),
    ("utf8Encode", 1, utf8_encode),
    ("utf8Decode", 1, utf8_decode),
    ("base64Encode", 1, base64_encode),
    ("base64Decode", 1, base64_decode),
    ("btoa", 1, btoa),
    ("atob", 1, atob),
    ("dateNow", 0, date_now),
    ("dateFields", 2, date_fields),
    ("dateFromFields", 8, date_from_fields),
    ("dateParse", 3, date_parse),
    ("dateFormat", 3, date_format),
    ("dateAdd", 4, date_add),
    ("dateStartOf", 3, date_start_of),
    ("dateDiff", 5, date_diff),
];

fn hex_arg(args: &[JsValue], index: usize, ctx: &mut Context) -> JsResult<Vec<u8>> {
    Ok(codec::from_hex(&string_arg(args, index, ctx)?)?)
}

fn digest(_: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let algorithm: HashAlgorithm = string_arg(args, 0, ctx)?.parse()?;
    let data = hex_arg(args, 1, ctx)?;
    Ok(js_str(&hex::encode(algorithm.digest(&data))))
}

fn hmac(_: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let algorithm: HashAlgorithm = string_arg(args, 0, ctx)?.parse()?;
    let key = hex_arg(args, 1, ctx)?;
    let data = hex_arg(args, 2, ctx)?;
    Ok(js_str(&hex::encode(algorithm.hmac(&key, &data)?)))
}

/// `cipher(op, mode, padding, keyHex, ivHex, dataHex)`; decryption failures yield `null`.
fn cipher(_: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let operation = string_arg(args, 0, ctx)?;
    let mode: Mode = string_arg(args, 1, ctx)?.parse()?;
    let padding: Padding = string_arg(args, 2, ctx)?.parse()?;
    let key = hex_arg(args, 3, ctx)?;
    let iv = hex_arg(args, 4, ctx)?;
    let data = hex_arg(args, 5, ctx)?;

    let aes = AesCipher::new(&key, &iv, mode, padding)?;
    match operation.as_str() {
        "encrypt" => Ok(js_str(&hex::encode(aes.encrypt(&data)?))),
        "decrypt" => Ok(aes
            .decrypt(&data)
            .map_or_else(JsValue::null, |plain| js_str(&hex::encode(plain)))),
        other => Err(type_error(format!("unknown cipher operation: {other}"))),
    }
}

fn evp_kdf(_: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let password = hex_arg(args, 0, ctx)?;
    let salt = hex_arg(args, 1, ctx)?;
    let key_len = length_arg(args, 2, ctx)?;
    let iv_len = length_arg(args, 3, ctx)?;
    let derived = digest::evp_bytes_to_key(&password, &salt, key_len, iv_len);
    Ok(js_str(&hex::encode(derived)))
}

fn random_hex(_: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let len = length_arg(args, 0, ctx)?;
    if len > 1 << 20 {
        return Err(type_error(format!("refusing to generate {len} random bytes")));
    }
    Ok(js_str(&hex::encode(digest::random_bytes(len))))
}

fn utf8_encode(_: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    Ok(js_str(&hex::encode(string_arg(args, 0, ctx)?)))
}

fn utf8_decode(_: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let bytes = hex_arg(args, 0, ctx)?;
    Ok(js_str(&codec::utf8_decode(bytes)?))
}

fn base64_encode(_: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    Ok(js_str(&codec::base64_encode(&hex_arg(args, 0, ctx)?)))
}

fn base64_decode(_: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let bytes = codec::base64_decode(&string_arg(args, 0, ctx)?)?;
    Ok(js_str(&hex::encode(bytes)))
}

/// Returns `null` for out-of-range characters so the caller can raise a
/// DOM-style `InvalidCharacterError`.
fn btoa(_: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    Ok(codec::btoa(&string_arg(args, 0, ctx)?)
        .map_or_else(|_| JsValue::null(), |encoded| js_str(&encoded)))
}

/// Returns `null` for malformed input, like [`btoa`].
fn atob(_: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    Ok(codec::atob(&string_arg(args, 0, ctx)?)
        .map_or_else(|_| JsValue::null(), |decoded| js_str(&decoded)))
}

#[allow(clippy::cast_precision_loss)]
fn millis_value(millis: Option<i64>) -> JsValue {
    let millis = millis.filter(|ms| (-date::MAX_INSTANT_MILLIS..=date::MAX_INSTANT_MILLIS).contains(ms));
    JsValue::from(millis.map_or(f64::NAN, |ms| ms as f64))
}

fn millis_arg(args: &[JsValue], index: usize, ctx: &mut Context) -> JsResult<Option<i64>> {
    Ok(date::instant(number_arg(args, index, ctx)?))
}

fn zone_arg(args: &[JsValue], index: usize) -> Zone {
    Zone::from_utc_flag(bool_arg(args, index))
}

fn date_now(_: &JsValue, _: &[JsValue], _: &mut Context) -> JsResult<JsValue> {
    Ok(millis_value(Some(date::now_millis())))
}

/// JSON array of broken-down fields, or `null` for an invalid instant.
fn date_fields(_: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let zone = zone_arg(args, 1);
    let fields = millis_arg(args, 0, ctx)?.and_then(|ms| date::fields(ms, zone));
    Ok(fields.map_or_else(JsValue::null, |f| {
        js_str(&serde_json::Value::from(f.to_vec()).to_string())
    }))
}

fn date_from_fields(_: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let mut parts = [0i64; 7];
    for (index, part) in parts.iter_mut().enumerate() {
        match millis_arg(args, index, ctx)? {
            Some(value) => *part = value,
            None => return Ok(millis_value(None)),
        }
    }
    Ok(millis_value(date::from_fields(parts, zone_arg(args, 7))))
}

fn date_parse(_: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let input = string_arg(args, 0, ctx)?;
    let format = string_arg(args, 1, ctx)?;
    let format = (!format.is_empty()).then_some(format.as_str());
    Ok(millis_value(date::parse(&input, format, zone_arg(args, 2))))
}

fn date_format(_: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let zone = zone_arg(args, 1);
    let pattern = string_arg(args, 2, ctx)?;
    let rendered = millis_arg(args, 0, ctx)?.and_then(|ms| date::format(ms, zone, &pattern));
    Ok(js_str(rendered.as_deref().unwrap_or("Invalid date")))
}

fn date_add(_: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let zone = zone_arg(args, 1);
    let unit: Unit = string_arg(args, 2, ctx)?.parse()?;
    let amount = number_arg(args, 3, ctx)?;
    let millis = millis_arg(args, 0, ctx)?;
    Ok(millis_value(millis.and_then(|ms| date::add(ms, zone, unit, amount))))
}

fn date_start_of(_: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let zone = zone_arg(args, 1);
    let unit: Unit = string_arg(args, 2, ctx)?.parse()?;
    let millis = millis_arg(args, 0, ctx)?;
    Ok(millis_value(millis.and_then(|ms| date::start_of(ms, zone, unit))))
}

/// `dateDiff(a, b, utc, unit, precise)`.
fn date_diff(_: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let zone = zone_arg(args, 2);
    let unit: Unit = string_arg(args, 3, ctx)?.parse()?;
    let precise = bool_arg(args, 4);
    let a = millis_arg(args, 0, ctx)?;
    let b = millis_arg(args, 1, ctx)?;
    let value = match (a, b) {
        (Some(a), Some(b)) => date::diff(a, b, zone, unit, precise),
        _ => None,
    };
    Ok(JsValue::from(value.unwrap_or(f64::NAN)))
}
