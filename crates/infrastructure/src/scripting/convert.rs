//! Value conversion between host natives and script values.
//!
//! Natives only exchange strings, numbers and booleans with script code.
//! Structured data crosses as JSON text and bytes cross as hex.

use boa_engine::{Context, JsError, JsNativeError, JsResult, JsString, JsValue, js_string};

/// Reads argument `index` as a string; missing arguments read as empty.
pub(crate) fn string_arg(args: &[JsValue], index: usize, ctx: &mut Context) -> JsResult<String> {
    match args.get(index) {
        Some(value) if !value.is_undefined() => {
            Ok(value.to_string(ctx)?.to_std_string_escaped())
        }
        _ => Ok(String::new()),
    }
}

/// Reads argument `index` as a number; missing arguments read as `NaN`.
pub(crate) fn number_arg(args: &[JsValue], index: usize, ctx: &mut Context) -> JsResult<f64> {
    match args.get(index) {
        Some(value) => value.to_number(ctx),
        None => Ok(f64::NAN),
    }
}

/// Reads argument `index` as a non-negative length.
pub(crate) fn length_arg(args: &[JsValue], index: usize, ctx: &mut Context) -> JsResult<usize> {
    let value = number_arg(args, index, ctx)?;
    if value.is_finite() && value >= 0.0 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(value as usize)
    } else {
        Err(type_error(format!("invalid length: {value}")))
    }
}

/// Reads argument `index` with JavaScript truthiness.
pub(crate) fn bool_arg(args: &[JsValue], index: usize) -> bool {
    args.get(index).is_some_and(JsValue::to_boolean)
}

/// Wraps a Rust string as a script string.
pub(crate) fn js_str(value: &str) -> JsValue {
    JsValue::from(JsString::from(value))
}

/// Wraps an optional string; `None` becomes `undefined`.
pub(crate) fn js_opt(value: Option<&str>) -> JsValue {
    value.map_or_else(JsValue::undefined, js_str)
}

/// Builds a `TypeError`.
pub(crate) fn type_error(message: impl Into<String>) -> JsError {
    JsNativeError::typ().with_message(message.into()).into()
}

/// Builds a plain `Error`.
pub(crate) fn plain_error(message: impl Into<String>) -> JsError {
    JsNativeError::error().with_message(message.into()).into()
}

/// Renders a script exception the way a user expects to read it.
///
/// Thrown strings are used as-is, thrown error objects render as
/// `name: message`, and engine errors use their own display.
pub(crate) fn describe_error(error: &JsError, ctx: &mut Context) -> String {
    if let Some(value) = error.as_opaque() {
        if let Some(text) = value.as_string() {
            return text.to_std_string_escaped();
        }
        if let Some(object) = value.as_object() {
            let name = object
                .get(js_string!("name"), ctx)
                .ok()
                .filter(|v| !v.is_undefined())
                .and_then(|v| v.to_string(ctx).ok())
                .map(|s| s.to_std_string_escaped());
            let message = object
                .get(js_string!("message"), ctx)
                .ok()
                .filter(|v| !v.is_undefined())
                .and_then(|v| v.to_string(ctx).ok())
                .map(|s| s.to_std_string_escaped());
            return match (name, message) {
                (Some(name), Some(message)) if !message.is_empty() => format!("{name}: {message}"),
                (Some(name), _) => name,
                (None, Some(message)) => message,
                (None, None) => value
                    .to_string(ctx)
                    .map_or_else(|_| error.to_string(), |s| s.to_std_string_escaped()),
            };
        }
        return value
            .to_string(ctx)
            .map_or_else(|_| error.to_string(), |s| s.to_std_string_escaped());
    }
    error
        .as_native()
        .map_or_else(|| error.to_string(), ToString::to_string)
}
