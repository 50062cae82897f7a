//! Host state shared between the sandbox and the natives behind `pm`.
//!
//! The variable store and the prepared request are moved into a
//! [`BridgeState`] for the duration of one script run and moved back out
//! afterwards. Natives borrow the state only for the span of one call and
//! never while script code runs.

use boa_engine::object::ObjectInitializer;
use boa_engine::{Context, JsObject, JsResult, JsString, JsValue, NativeFunction};
use boa_gc::{Finalize, Gc, GcRefCell, Trace};
use courier_application::{ExecutionInfo, VariableResolver};
use courier_domain::cookie::{Cookie, parse_set_cookie_headers};
use courier_domain::environment::{VariableScope, VariableStore};
use courier_domain::error::SyncError;
use courier_domain::request::{Header, PreparedRequest};
use courier_domain::response::HttpResponse;
use courier_domain::run::IterationData;
use courier_domain::scripting::{ConsoleLevel, ConsoleLine, ScriptPhase};
use courier_domain::testing::TestResult;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use super::convert::{bool_arg, js_opt, js_str, plain_error, string_arg, type_error};
use super::libraries;

/// Message raised when a script reads a body parked in temporary storage.
pub const BODY_NOT_AVAILABLE: &str = "response body is not available in script context";

/// Shared handle passed as the capture of every bridge native.
pub(crate) type Bridge = Gc<GcRefCell<BridgeState>>;

type BridgeFn = fn(&JsValue, &[JsValue], &Bridge, &mut Context) -> JsResult<JsValue>;

/// Everything one script run can read or change.
#[derive(Trace, Finalize)]
pub(crate) struct BridgeState {
    #[unsafe_ignore_trace]
    pub(crate) variables: VariableStore,
    #[unsafe_ignore_trace]
    pub(crate) request: PreparedRequest,
    #[unsafe_ignore_trace]
    response: Option<HttpResponse>,
    #[unsafe_ignore_trace]
    data: IterationData,
    #[unsafe_ignore_trace]
    info: Value,
    #[unsafe_ignore_trace]
    cookies: Vec<Cookie>,
    #[unsafe_ignore_trace]
    pub(crate) console: Vec<ConsoleLine>,
    #[unsafe_ignore_trace]
    pub(crate) tests: Vec<TestResult>,
    #[unsafe_ignore_trace]
    pub(crate) warnings: Vec<String>,
    echo_console: bool,
    /// Set once the script body has returned and only promise jobs remain.
    pub(crate) draining: bool,
}

impl BridgeState {
    /// Builds the state for one run; cookies are parsed from the response up front.
    pub(crate) fn new(
        phase: ScriptPhase,
        variables: VariableStore,
        request: PreparedRequest,
        response: Option<HttpResponse>,
        data: IterationData,
        info: &ExecutionInfo,
        echo_console: bool,
    ) -> Self {
        let (cookies, skipped) = response.as_ref().map_or_else(
            || (Vec::new(), Vec::new()),
            |r| parse_set_cookie_headers(r.set_cookie_lines()),
        );
        let warnings = skipped
            .into_iter()
            .map(|err| {
                warn!(error = %err, "skipping malformed Set-Cookie header");
                format!("skipped cookie: {err}")
            })
            .collect();

        Self {
            variables,
            request,
            response,
            data,
            info: json!({
                "eventName": phase.event_name(),
                "iteration": info.iteration,
                "iterationCount": info.iteration_count,
                "requestName": info.request_name,
                "requestId": info.request_id.to_string(),
            }),
            cookies,
            console: Vec::new(),
            tests: Vec::new(),
            warnings,
            echo_console,
            draining: false,
        }
    }

    fn sync_query(&mut self, values: Vec<Option<String>>) -> Result<usize, SyncError> {
        let values = values
            .into_iter()
            .enumerate()
            .map(|(index, value)| value.ok_or(SyncError::MissingValue(index)))
            .collect::<Result<Vec<_>, _>>()?;
        self.request.query.assign_values(values)
    }

    fn push_console(&mut self, level: ConsoleLevel, message: &str) {
        for line in message.lines() {
            if self.echo_console {
                debug!(target: "courier::console", level = ?level, "{line}");
            }
            self.console.push(ConsoleLine::new(level, line));
        }
        if message.is_empty() {
            self.console.push(ConsoleLine::new(level, ""));
        }
    }
}

/// Builds the private host object handed to the library and `pm` factories.
pub(crate) fn host_object(ctx: &mut Context, bridge: &Bridge) -> JsObject {
    let mut host = ObjectInitializer::new(ctx);
    for &(name, length, function) in BRIDGE_NATIVES {
        host.function(
            NativeFunction::from_copy_closure_with_captures(function, bridge.clone()),
            JsString::from(name),
            length,
        );
    }
    for &(name, length, function) in libraries::NATIVES {
        host.function(NativeFunction::from_fn_ptr(function), JsString::from(name), length);
    }
    host.build()
}

const BRIDGE_NATIVES: &[(&str, usize, BridgeFn)] = &[
    ("envGet", 1, env_get),
    ("envSet", 2, env_set),
    ("envHas", 1, env_has),
    ("envUnset", 1, env_unset),
    ("envObject", 0, env_object),
    ("varGet", 1, var_get),
    ("varSet", 2, var_set),
    ("varHas", 1, var_has),
    ("varUnset", 1, var_unset),
    ("varObject", 0, var_object),
    ("varReplace", 1, var_replace),
    ("dataGet", 1, data_get),
    ("dataHas", 1, data_has),
    ("dataObject", 0, data_object),
    ("info", 0, info),
    ("requestMethod", 0, request_method),
    ("requestUrl", 0, request_url),
    ("querySnapshot", 0, query_snapshot),
    ("querySync", 1, query_sync),
    ("headerAdd", 2, header_add),
    ("headerGet", 1, header_get),
    ("headerHas", 1, header_has),
    ("headerObject", 0, header_object),
    ("responseMeta", 0, response_meta),
    ("responseText", 0, response_text),
    ("cookieList", 0, cookie_list),
    ("recordTest", 3, record_test),
    ("draining", 0, draining),
    ("console", 2, console),
];

fn json_text(value: &impl serde::Serialize) -> JsResult<JsValue> {
    serde_json::to_string(value)
        .map(|text| js_str(&text))
        .map_err(|e| type_error(e.to_string()))
}

fn env_get(_: &JsValue, args: &[JsValue], bridge: &Bridge, ctx: &mut Context) -> JsResult<JsValue> {
    let name = string_arg(args, 0, ctx)?;
    let state = bridge.borrow();
    Ok(js_opt(state.variables.get_in(VariableScope::Environment, &name)))
}

fn env_set(_: &JsValue, args: &[JsValue], bridge: &Bridge, ctx: &mut Context) -> JsResult<JsValue> {
    let name = string_arg(args, 0, ctx)?;
    let value = string_arg(args, 1, ctx)?;
    bridge
        .borrow_mut()
        .variables
        .set(VariableScope::Environment, name, value);
    Ok(JsValue::undefined())
}

fn env_has(_: &JsValue, args: &[JsValue], bridge: &Bridge, ctx: &mut Context) -> JsResult<JsValue> {
    let name = string_arg(args, 0, ctx)?;
    let state = bridge.borrow();
    Ok(JsValue::from(
        state.variables.get_in(VariableScope::Environment, &name).is_some(),
    ))
}

fn env_unset(_: &JsValue, args: &[JsValue], bridge: &Bridge, ctx: &mut Context) -> JsResult<JsValue> {
    let name = string_arg(args, 0, ctx)?;
    bridge
        .borrow_mut()
        .variables
        .unset(VariableScope::Environment, &name);
    Ok(JsValue::undefined())
}

fn env_object(_: &JsValue, _: &[JsValue], bridge: &Bridge, _: &mut Context) -> JsResult<JsValue> {
    json_text(bridge.borrow().variables.environment())
}

fn var_get(_: &JsValue, args: &[JsValue], bridge: &Bridge, ctx: &mut Context) -> JsResult<JsValue> {
    let name = string_arg(args, 0, ctx)?;
    let state = bridge.borrow();
    Ok(js_opt(state.variables.get(&name)))
}

fn var_set(_: &JsValue, args: &[JsValue], bridge: &Bridge, ctx: &mut Context) -> JsResult<JsValue> {
    let name = string_arg(args, 0, ctx)?;
    let value = string_arg(args, 1, ctx)?;
    bridge
        .borrow_mut()
        .variables
        .set(VariableScope::Temporary, name, value);
    Ok(JsValue::undefined())
}

fn var_has(_: &JsValue, args: &[JsValue], bridge: &Bridge, ctx: &mut Context) -> JsResult<JsValue> {
    let name = string_arg(args, 0, ctx)?;
    Ok(JsValue::from(bridge.borrow().variables.get(&name).is_some()))
}

fn var_unset(_: &JsValue, args: &[JsValue], bridge: &Bridge, ctx: &mut Context) -> JsResult<JsValue> {
    let name = string_arg(args, 0, ctx)?;
    bridge
        .borrow_mut()
        .variables
        .unset(VariableScope::Temporary, &name);
    Ok(JsValue::undefined())
}

fn var_object(_: &JsValue, _: &[JsValue], bridge: &Bridge, _: &mut Context) -> JsResult<JsValue> {
    json_text(&bridge.borrow().variables.merged())
}

/// `pm.variables.replaceIn`: one interpolation pass over the current scopes.
fn var_replace(_: &JsValue, args: &[JsValue], bridge: &Bridge, ctx: &mut Context) -> JsResult<JsValue> {
    let template = string_arg(args, 0, ctx)?;
    let state = bridge.borrow();
    let result = VariableResolver::new(&state.variables).resolve(&template);
    Ok(js_str(&result.resolved))
}

fn data_get(_: &JsValue, args: &[JsValue], bridge: &Bridge, ctx: &mut Context) -> JsResult<JsValue> {
    let name = string_arg(args, 0, ctx)?;
    let state = bridge.borrow();
    Ok(js_opt(state.data.get(&name).map(String::as_str)))
}

fn data_has(_: &JsValue, args: &[JsValue], bridge: &Bridge, ctx: &mut Context) -> JsResult<JsValue> {
    let name = string_arg(args, 0, ctx)?;
    Ok(JsValue::from(bridge.borrow().data.contains_key(&name)))
}

fn data_object(_: &JsValue, _: &[JsValue], bridge: &Bridge, _: &mut Context) -> JsResult<JsValue> {
    json_text(&bridge.borrow().data)
}

fn info(_: &JsValue, _: &[JsValue], bridge: &Bridge, _: &mut Context) -> JsResult<JsValue> {
    json_text(&bridge.borrow().info)
}

fn request_method(_: &JsValue, _: &[JsValue], bridge: &Bridge, _: &mut Context) -> JsResult<JsValue> {
    Ok(js_str(bridge.borrow().request.method.as_str()))
}

fn request_url(_: &JsValue, _: &[JsValue], bridge: &Bridge, _: &mut Context) -> JsResult<JsValue> {
    Ok(js_str(&bridge.borrow().request.url_string()))
}

/// JSON array of `{key, value, disabled}` in native order.
fn query_snapshot(_: &JsValue, _: &[JsValue], bridge: &Bridge, _: &mut Context) -> JsResult<JsValue> {
    let state = bridge.borrow();
    let entries: Vec<Value> = state
        .request
        .query
        .all()
        .iter()
        .map(|p| json!({ "key": p.key, "value": p.value, "disabled": !p.enabled }))
        .collect();
    json_text(&entries)
}

/// Takes a JSON array of values (`null` marks an entry without a value).
///
/// A snapshot whose shape no longer matches is left unapplied and reported
/// as a warning; returns whether the values were written.
fn query_sync(_: &JsValue, args: &[JsValue], bridge: &Bridge, ctx: &mut Context) -> JsResult<JsValue> {
    let raw = string_arg(args, 0, ctx)?;
    let values: Vec<Option<String>> =
        serde_json::from_str(&raw).map_err(|e| type_error(e.to_string()))?;

    let mut state = bridge.borrow_mut();
    match state.sync_query(values) {
        Ok(changed) => {
            debug!(changed, "query snapshot synced");
            Ok(JsValue::from(true))
        }
        Err(err) => {
            warn!(error = %err, "query sync skipped");
            state.warnings.push(format!("query sync skipped: {err}"));
            Ok(JsValue::from(false))
        }
    }
}

fn header_add(_: &JsValue, args: &[JsValue], bridge: &Bridge, ctx: &mut Context) -> JsResult<JsValue> {
    let key = string_arg(args, 0, ctx)?;
    let value = string_arg(args, 1, ctx)?;
    if key.is_empty() {
        return Err(type_error("header key must not be empty"));
    }
    bridge.borrow_mut().request.headers.add(Header::new(key, value));
    Ok(JsValue::undefined())
}

fn header_get(_: &JsValue, args: &[JsValue], bridge: &Bridge, ctx: &mut Context) -> JsResult<JsValue> {
    let name = string_arg(args, 0, ctx)?;
    let state = bridge.borrow();
    Ok(js_opt(state.request.headers.get(&name)))
}

fn header_has(_: &JsValue, args: &[JsValue], bridge: &Bridge, ctx: &mut Context) -> JsResult<JsValue> {
    let name = string_arg(args, 0, ctx)?;
    Ok(JsValue::from(bridge.borrow().request.headers.has(&name)))
}

fn header_object(_: &JsValue, _: &[JsValue], bridge: &Bridge, _: &mut Context) -> JsResult<JsValue> {
    let state = bridge.borrow();
    let mut headers = Map::new();
    for header in state.request.headers.enabled() {
        headers
            .entry(header.key.clone())
            .or_insert_with(|| Value::String(header.value.clone()));
    }
    json_text(&headers)
}

/// Status, timing and header lines as JSON text; `null` before dispatch.
fn response_meta(_: &JsValue, _: &[JsValue], bridge: &Bridge, _: &mut Context) -> JsResult<JsValue> {
    let state = bridge.borrow();
    let Some(response) = state.response.as_ref() else {
        return Ok(JsValue::null());
    };
    json_text(&json!({
        "code": response.status.as_u16(),
        "status": response.status_text,
        "responseTime": response.elapsed_ms(),
        "responseSize": response.body.size(),
        "headers": response.headers,
    }))
}

fn response_text(_: &JsValue, _: &[JsValue], bridge: &Bridge, _: &mut Context) -> JsResult<JsValue> {
    let state = bridge.borrow();
    let response = state
        .response
        .as_ref()
        .ok_or_else(|| plain_error("no response is available before the request is sent"))?;
    response
        .body
        .text()
        .map(js_str)
        .ok_or_else(|| plain_error(BODY_NOT_AVAILABLE))
}

fn cookie_list(_: &JsValue, _: &[JsValue], bridge: &Bridge, _: &mut Context) -> JsResult<JsValue> {
    json_text(&bridge.borrow().cookies)
}

/// `recordTest(name, passed, message)`.
fn record_test(_: &JsValue, args: &[JsValue], bridge: &Bridge, ctx: &mut Context) -> JsResult<JsValue> {
    let name = string_arg(args, 0, ctx)?;
    let passed = bool_arg(args, 1);
    let message = string_arg(args, 2, ctx)?;
    let result = if passed {
        TestResult::pass(name)
    } else {
        TestResult::fail(name, message)
    };
    debug!(test = %result.name, passed = result.passed, "test recorded");
    bridge.borrow_mut().tests.push(result);
    Ok(JsValue::undefined())
}

fn draining(_: &JsValue, _: &[JsValue], bridge: &Bridge, _: &mut Context) -> JsResult<JsValue> {
    Ok(JsValue::from(bridge.borrow().draining))
}

/// `console(level, message)`; multi-line messages become one entry per line.
fn console(_: &JsValue, args: &[JsValue], bridge: &Bridge, ctx: &mut Context) -> JsResult<JsValue> {
    let level = ConsoleLevel::from_method(&string_arg(args, 0, ctx)?);
    let message = string_arg(args, 1, ctx)?;
    bridge.borrow_mut().push_console(level, &message);
    Ok(JsValue::undefined())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use courier_domain::request::QueryParam;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn info() -> ExecutionInfo {
        ExecutionInfo {
            request_id: Uuid::nil(),
            request_name: "Login".to_string(),
            iteration: 0,
            iteration_count: 1,
        }
    }

    fn state_with_query() -> BridgeState {
        let mut request = PreparedRequest::default();
        request.query.add(QueryParam::new("username", "testuser"));
        request.query.add(QueryParam::new("password", "secret"));
        BridgeState::new(
            ScriptPhase::PreRequest,
            VariableStore::new(),
            request,
            None,
            IterationData::new(),
            &info(),
            false,
        )
    }

    #[test]
    fn test_sync_query_writes_values_by_position() {
        let mut state = state_with_query();
        let changed = state
            .sync_query(vec![Some("testuser".into()), Some("c2VjcmV0".into())])
            .unwrap();

        assert_eq!(changed, 1);
        assert_eq!(state.request.query.get("password"), Some("c2VjcmV0"));
    }

    #[test]
    fn test_sync_query_accepts_unchanged_values() {
        let mut state = state_with_query();
        let changed = state
            .sync_query(vec![Some("testuser".into()), Some("secret".into())])
            .unwrap();

        assert_eq!(changed, 0);
    }

    #[test]
    fn test_sync_query_rejects_missing_value() {
        let mut state = state_with_query();
        let err = state
            .sync_query(vec![Some("x".into()), None])
            .unwrap_err();

        assert_eq!(err, SyncError::MissingValue(1));
        assert_eq!(state.request.query.get("username"), Some("testuser"));
    }

    #[test]
    fn test_sync_query_rejects_length_change() {
        let mut state = state_with_query();
        let err = state.sync_query(vec![Some("x".into())]).unwrap_err();

        assert!(matches!(err, SyncError::LengthMismatch { snapshot: 1, native: 2 }));
    }

    #[test]
    fn test_malformed_cookies_become_warnings() {
        let response = HttpResponse::new(200, "")
            .with_header("Set-Cookie", "session=abc; Path=/")
            .with_header("Set-Cookie", "no-separator");
        let state = BridgeState::new(
            ScriptPhase::PostResponse,
            VariableStore::new(),
            PreparedRequest::default(),
            Some(response),
            IterationData::new(),
            &info(),
            false,
        );

        assert_eq!(state.cookies.len(), 1);
        assert_eq!(state.cookies[0].name, "session");
        assert_eq!(state.warnings.len(), 1);
        assert!(state.warnings[0].starts_with("skipped cookie"));
        assert_eq!(state.info["eventName"], "test");
    }

    #[test]
    fn test_console_splits_lines() {
        let mut state = state_with_query();
        state.push_console(ConsoleLevel::Info, "first\nsecond");
        state.push_console(ConsoleLevel::Log, "");

        let lines: Vec<&str> = state.console.iter().map(|l| l.message.as_str()).collect();
        assert_eq!(lines, vec!["first", "second", ""]);
        assert_eq!(state.console[0].level, ConsoleLevel::Info);
    }
}
