//! End-to-end tests for request execution through the boa script engine.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::{Arc, Mutex};

use courier_application::{
    CancellationToken, CollectionRunner, DispatchError, ExecuteRequest, RequestDispatcher,
    RunOptions, RunPosition,
};
use courier_domain::environment::{VariableMap, VariableScope, VariableStore};
use courier_domain::request::{PreparedRequest, RequestSpec};
use courier_domain::response::{HttpResponse, ResponseBody};
use courier_domain::run::{RequestExecution, RequestStatus, RunPlan};
use courier_infrastructure::{BODY_NOT_AVAILABLE, BoaScriptEngine};
use pretty_assertions::assert_eq;

/// Returns a canned response and records every request it is given.
struct RecordingDispatcher {
    response: HttpResponse,
    sent: Mutex<Vec<PreparedRequest>>,
}

impl RecordingDispatcher {
    fn new(response: HttpResponse) -> Arc<Self> {
        Arc::new(Self {
            response,
            sent: Mutex::new(Vec::new()),
        })
    }

    fn sent(&self) -> Vec<PreparedRequest> {
        self.sent.lock().unwrap().clone()
    }
}

impl RequestDispatcher for RecordingDispatcher {
    async fn dispatch(&self, request: &PreparedRequest) -> Result<HttpResponse, DispatchError> {
        self.sent.lock().unwrap().push(request.clone());
        Ok(self.response.clone())
    }
}

fn executor(
    dispatcher: &Arc<RecordingDispatcher>,
) -> ExecuteRequest<RecordingDispatcher, BoaScriptEngine> {
    ExecuteRequest::new(Arc::clone(dispatcher), Arc::new(BoaScriptEngine::default()))
}

fn login_environment() -> VariableStore {
    let mut environment = VariableMap::new();
    environment.insert("secret_key".to_string(), "1234567890123456".to_string());
    environment.insert("app_code".to_string(), "myAppCode".to_string());
    environment.insert("app_secret".to_string(), "myAppSecret".to_string());
    VariableStore::with_environment(environment)
}

fn login_spec() -> RequestSpec {
    RequestSpec::get("Login", "https://api.example.com/login")
        .with_query("username", "testuser")
        .with_query("password", "mypassword123")
}

async fn run_once(spec: &RequestSpec, response: HttpResponse) -> (RequestExecution, Vec<PreparedRequest>) {
    let dispatcher = RecordingDispatcher::new(response);
    let mut variables = login_environment();
    let execution = executor(&dispatcher)
        .execute(spec, &mut variables, RunPosition::single())
        .await;
    (execution, dispatcher.sent())
}

fn console(execution: &RequestExecution) -> Vec<&str> {
    execution.console.iter().map(|line| line.message.as_str()).collect()
}

const ENCRYPTION_SCRIPT: &str = r"
var key = CryptoJS.enc.Utf8.parse(pm.environment.get('secret_key'));
var params = pm.request.url.query.all();
for (var i = 0; i < params.length; i++) {
  if (params[i].key === 'password') {
    var encrypted = CryptoJS.AES.encrypt(params[i].value, key, {
      mode: CryptoJS.mode.ECB,
      padding: CryptoJS.pad.Pkcs7
    });
    params[i].value = encodeURIComponent(encrypted.toString());
  }
}
pm.request.url.query.sync();

var credentials = btoa(pm.environment.get('app_code') + ':' + pm.environment.get('app_secret'));
pm.request.headers.add({ key: 'Authorization', value: 'Basic ' + credentials });
";

#[tokio::test]
async fn test_encryption_script_rewrites_request() {
    let spec = login_spec().with_pre_request(ENCRYPTION_SCRIPT);
    let (execution, sent) = run_once(&spec, HttpResponse::new(200, "{}")).await;

    assert_eq!(execution.status, RequestStatus::Passed);
    assert_eq!(sent.len(), 1);
    let request = &sent[0];

    let password = request.query.get("password").unwrap();
    assert!(!password.is_empty());
    assert_ne!(password, "mypassword123");
    assert!(password.ends_with("%3D%3D"), "not percent-encoded: {password}");
    assert!(!password.contains(['+', '/', '=']));
    assert_eq!(request.query.get("username"), Some("testuser"));

    let authorization: Vec<_> = request
        .headers
        .all()
        .iter()
        .filter(|h| h.key == "Authorization")
        .collect();
    assert_eq!(authorization.len(), 1);
    assert_eq!(authorization[0].value, "Basic bXlBcHBDb2RlOm15QXBwU2VjcmV0");
    assert_eq!(request.headers.len(), 1);
}

#[tokio::test]
async fn test_encrypted_password_decrypts_with_same_key() {
    let script = format!(
        "{ENCRYPTION_SCRIPT}
var sent = decodeURIComponent(pm.request.url.query.get('password'));
var plain = CryptoJS.AES.decrypt(sent, key, {{ mode: CryptoJS.mode.ECB, padding: CryptoJS.pad.Pkcs7 }});
console.log(plain.toString(CryptoJS.enc.Utf8));"
    );
    let spec = login_spec().with_pre_request(script);
    let (execution, _) = run_once(&spec, HttpResponse::new(200, "")).await;

    assert_eq!(console(&execution), vec!["mypassword123"]);
}

#[tokio::test]
async fn test_query_changes_need_sync() {
    let spec = login_spec().with_pre_request(
        "var params = pm.request.url.query.all(); params[1].value = 'changed';",
    );
    let (_, sent) = run_once(&spec, HttpResponse::new(200, "")).await;
    assert_eq!(sent[0].query.get("password"), Some("mypassword123"));

    let spec = login_spec().with_pre_request(
        "var params = pm.request.url.query.all(); params[1].value = 'changed'; pm.request.url.query.sync();",
    );
    let (_, sent) = run_once(&spec, HttpResponse::new(200, "")).await;
    assert_eq!(sent[0].query.get("password"), Some("changed"));
}

#[tokio::test]
async fn test_sync_coerces_non_string_values() {
    let spec = login_spec().with_pre_request(
        "var params = pm.request.url.query.all(); params[1].value = 12345;\n\
         console.log(pm.request.url.query.sync());",
    );
    let (execution, sent) = run_once(&spec, HttpResponse::new(200, "")).await;

    assert_eq!(console(&execution), vec!["true"]);
    assert!(execution.warnings.is_empty());
    assert_eq!(sent[0].query.get("password"), Some("12345"));
}

#[tokio::test]
async fn test_sync_of_cleared_value_is_skipped() {
    let spec = login_spec().with_pre_request(
        "var params = pm.request.url.query.all(); params[0].value = 'x'; params[1].value = null;\n\
         console.log(pm.request.url.query.sync());",
    );
    let (execution, sent) = run_once(&spec, HttpResponse::new(200, "")).await;

    assert_eq!(console(&execution), vec!["false"]);
    assert_eq!(sent[0].query.get("username"), Some("testuser"));
    assert_eq!(
        execution.warnings,
        vec!["query sync skipped: query snapshot entry 1 has no value".to_string()]
    );
}

#[tokio::test]
async fn test_sync_after_shape_change_is_skipped_with_warning() {
    let spec = login_spec().with_pre_request(
        "var params = pm.request.url.query.all(); params.push({key: 'extra', value: 'x'}); \
         params[0].value = 'other'; pm.request.url.query.sync();",
    );
    let (execution, sent) = run_once(&spec, HttpResponse::new(200, "")).await;

    assert_eq!(execution.status, RequestStatus::Passed);
    assert_eq!(sent[0].query.get("username"), Some("testuser"));
    assert_eq!(sent[0].query.len(), 2);
    assert_eq!(execution.warnings.len(), 1);
    assert!(execution.warnings[0].starts_with("query sync skipped"));
}

#[tokio::test]
async fn test_cookie_lookups_agree_and_first_wins() {
    let response = HttpResponse::new(200, "")
        .with_header("Set-Cookie", "SID=first; Path=/; HttpOnly")
        .with_header("Set-Cookie", "=broken")
        .with_header("Set-Cookie", "SID=second")
        .with_header("Set-Cookie", "theme=dark");
    let spec = login_spec().with_post_response(
        "pm.test('lookups agree', function () {\n\
           ['SID', 'theme', 'missing'].forEach(function (name) {\n\
             pm.expect(pm.cookies.get(name)).to.eql(pm.getResponseCookie(name));\n\
           });\n\
         });\n\
         console.log(pm.cookies.get('SID').value, pm.cookies.get('SID').httpOnly, pm.cookies.all().length);\n\
         console.log(pm.cookies.has('theme'), pm.cookies.has('missing'), pm.cookies.get('missing'));",
    );
    let (execution, _) = run_once(&spec, response).await;

    assert_eq!(execution.status, RequestStatus::Passed);
    assert_eq!(console(&execution), vec!["first true 3", "true false null"]);
    assert_eq!(execution.warnings.len(), 1);
    assert!(execution.warnings[0].starts_with("skipped cookie"));
}

#[tokio::test]
async fn test_syntax_error_blocks_dispatch() {
    let spec = login_spec().with_pre_request("pm.environment.set('a', ;");
    let (execution, sent) = run_once(&spec, HttpResponse::new(200, "")).await;

    assert!(sent.is_empty());
    assert!(matches!(execution.status, RequestStatus::PreScriptFailed(_)));
    assert!(execution.response.is_none());
}

#[tokio::test]
async fn test_pre_script_runtime_error_blocks_dispatch() {
    let spec = login_spec().with_pre_request("null.value;");
    let (execution, sent) = run_once(&spec, HttpResponse::new(200, "")).await;

    assert!(sent.is_empty());
    assert!(matches!(execution.status, RequestStatus::PreScriptFailed(_)));
    assert_eq!(execution.tests.len(), 1);
    assert!(!execution.tests[0].passed);
}

#[tokio::test]
async fn test_post_script_runtime_error_keeps_request_sent() {
    let spec = login_spec().with_post_response("throw new Error('late failure');");
    let (execution, sent) = run_once(&spec, HttpResponse::new(200, "")).await;

    assert_eq!(sent.len(), 1);
    assert_eq!(execution.status, RequestStatus::AssertionFailed);
    assert!(execution.status.was_sent());
    assert_eq!(execution.tests[0].name, "Post-response script");
    assert_eq!(execution.tests[0].message.as_deref(), Some("Error: late failure"));
}

#[tokio::test]
async fn test_post_script_syntax_error_is_reported_after_send() {
    let spec = login_spec().with_post_response("pm.test('x', function () {");
    let (execution, sent) = run_once(&spec, HttpResponse::new(200, "")).await;

    assert_eq!(sent.len(), 1);
    assert!(matches!(execution.status, RequestStatus::PostScriptFailed(_)));
    assert!(execution.response.is_some());
}

#[tokio::test]
async fn test_failing_assertion_marks_request_failed() {
    let spec = login_spec().with_post_response(
        "pm.test('is created', function () { pm.response.to.have.status(201); });\n\
         pm.test('has body', function () { pm.expect(pm.response.json().id).to.equal(7); });",
    );
    let (execution, _) = run_once(&spec, HttpResponse::new(200, "{\"id\": 7}")).await;

    assert_eq!(execution.status, RequestStatus::AssertionFailed);
    let results: Vec<(&str, bool)> = execution
        .tests
        .iter()
        .map(|t| (t.name.as_str(), t.passed))
        .collect();
    assert_eq!(results, vec![("is created", false), ("has body", true)]);
}

#[tokio::test]
async fn test_stored_body_is_not_readable() {
    let response = HttpResponse {
        body: ResponseBody::Stored {
            path: std::env::temp_dir().join("courier-body-unused.bin"),
            size: 10_000_000,
        },
        ..HttpResponse::new(200, "")
    };
    let spec = login_spec().with_post_response(
        "console.log(pm.response.responseSize);\n\
         try { pm.response.text(); } catch (e) { console.log(e.message); }",
    );
    let (execution, _) = run_once(&spec, response).await;

    assert_eq!(console(&execution), vec!["10000000", BODY_NOT_AVAILABLE]);
}

#[tokio::test]
async fn test_script_variable_writes_reach_later_requests() {
    let dispatcher = RecordingDispatcher::new(HttpResponse::new(200, "{\"token\": \"t-1\"}"));
    let use_case = executor(&dispatcher);
    let mut variables = login_environment();

    let spec = login_spec().with_post_response(
        "pm.environment.set('token', pm.response.json().token); pm.variables.set('scratch', 'x');",
    );
    use_case.execute(&spec, &mut variables, RunPosition::single()).await;

    assert_eq!(variables.get_in(VariableScope::Environment, "token"), Some("t-1"));
    assert_eq!(variables.get_in(VariableScope::Temporary, "scratch"), Some("x"));

    let follow_up = RequestSpec::get("Profile", "https://api.example.com/me")
        .with_header("Authorization", "Bearer {{token}}");
    use_case.execute(&follow_up, &mut variables, RunPosition::single()).await;
    assert_eq!(dispatcher.sent()[1].headers.get("Authorization"), Some("Bearer t-1"));
}

fn data_row(user: &str) -> VariableMap {
    let mut row = VariableMap::new();
    row.insert("user".to_string(), user.to_string());
    row
}

#[tokio::test]
async fn test_batch_iterations_are_isolated() {
    let dispatcher = RecordingDispatcher::new(HttpResponse::new(200, ""));
    let runner = CollectionRunner::new(executor(&dispatcher));
    let plan = RunPlan {
        name: "Users".to_string(),
        requests: vec![
            RequestSpec::get("User", "https://api.example.com/users/{{user}}").with_pre_request(
                "console.log(pm.variables.get('user'), pm.variables.has('leftover'), pm.iterationData.get('user'));\n\
                 pm.variables.set('leftover', pm.variables.get('user'));\n\
                 pm.environment.set('last_user', pm.variables.get('user'));",
            ),
        ],
    };
    let options = RunOptions::default().with_data(vec![data_row("alice"), data_row("bob")]);

    let outcome = runner
        .run(&plan, VariableStore::new(), &options, &CancellationToken::new())
        .await;

    let executions = &outcome.report.executions;
    assert_eq!(executions.len(), 2);
    assert_eq!(console(&executions[0]), vec!["alice false alice"]);
    assert_eq!(console(&executions[1]), vec!["bob false bob"]);
    let urls: Vec<String> = dispatcher.sent().iter().map(PreparedRequest::url_string).collect();
    assert_eq!(
        urls,
        vec![
            "https://api.example.com/users/alice",
            "https://api.example.com/users/bob",
        ]
    );
    assert_eq!(
        outcome.variables.get_in(VariableScope::Environment, "last_user"),
        Some("bob")
    );
}

#[tokio::test]
async fn test_library_overrides_do_not_leak_between_scripts() {
    let dispatcher = RecordingDispatcher::new(HttpResponse::new(200, ""));
    let runner = CollectionRunner::new(executor(&dispatcher));
    let plan = RunPlan {
        name: "Clock".to_string(),
        requests: vec![
            RequestSpec::get("Frozen", "https://api.example.com/a").with_pre_request(
                "moment.now = function () { return 0; }; console.log(moment.utc().year());",
            ),
            RequestSpec::get("Live", "https://api.example.com/b")
                .with_pre_request("console.log(moment.utc().year() > 2000);"),
        ],
    };

    let outcome = runner
        .run(&plan, VariableStore::new(), &RunOptions::default(), &CancellationToken::new())
        .await;

    assert_eq!(console(&outcome.report.executions[0]), vec!["1970"]);
    assert_eq!(console(&outcome.report.executions[1]), vec!["true"]);
}

#[tokio::test]
async fn test_cancelled_run_sends_nothing() {
    let dispatcher = RecordingDispatcher::new(HttpResponse::new(200, ""));
    let runner = CollectionRunner::new(executor(&dispatcher));
    let plan = RunPlan {
        name: "Cancelled".to_string(),
        requests: vec![login_spec()],
    };
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = runner
        .run(&plan, VariableStore::new(), &RunOptions::default(), &cancel)
        .await;

    assert!(outcome.report.cancelled);
    assert!(dispatcher.sent().is_empty());
}

async fn script_console(source: &str) -> Vec<String> {
    let spec = login_spec().with_pre_request(source);
    let (execution, _) = run_once(&spec, HttpResponse::new(200, "")).await;
    assert_eq!(execution.status, RequestStatus::Passed, "{:?}", execution.tests);
    execution.console.into_iter().map(|line| line.message).collect()
}

#[tokio::test]
async fn test_base64_globals() {
    let lines = script_console(
        "console.log(btoa('myAppCode:myAppSecret'));\n\
         console.log(atob('bXlBcHBDb2RlOm15QXBwU2VjcmV0'));\n\
         try { btoa('\\u263a'); } catch (e) { console.log(e.name); }\n\
         try { atob('a'); } catch (e) { console.log(e.name); }",
    )
    .await;

    assert_eq!(
        lines,
        vec![
            "bXlBcHBDb2RlOm15QXBwU2VjcmV0",
            "myAppCode:myAppSecret",
            "InvalidCharacterError",
            "InvalidCharacterError",
        ]
    );
}

#[tokio::test]
async fn test_aes_round_trips_for_every_key_size() {
    let lines = script_console(
        "[16, 24, 32].forEach(function (size) {\n\
           var key = CryptoJS.enc.Utf8.parse('k'.repeat(size));\n\
           var iv = CryptoJS.enc.Hex.parse('000102030405060708090a0b0c0d0e0f');\n\
           var cfg = { iv: iv, mode: CryptoJS.mode.CBC, padding: CryptoJS.pad.Pkcs7 };\n\
           var sealed = CryptoJS.AES.encrypt('attack at dawn', key, cfg).toString();\n\
           console.log(size, CryptoJS.AES.decrypt(sealed, key, cfg).toString(CryptoJS.enc.Utf8));\n\
         });\n\
         var salted = CryptoJS.AES.encrypt('secret', 'passphrase').toString();\n\
         console.log(salted.indexOf('U2FsdGVkX1') === 0, CryptoJS.AES.decrypt(salted, 'passphrase').toString(CryptoJS.enc.Utf8));",
    )
    .await;

    assert_eq!(
        lines,
        vec![
            "16 attack at dawn",
            "24 attack at dawn",
            "32 attack at dawn",
            "true secret",
        ]
    );
}

#[tokio::test]
async fn test_hashes_match_known_digests() {
    let lines = script_console(
        "console.log(CryptoJS.MD5('abc').toString());\n\
         console.log(CryptoJS.SHA1('abc').toString());\n\
         console.log(CryptoJS.SHA256('abc').toString(CryptoJS.enc.Hex));\n\
         console.log(CryptoJS.HmacSHA256('message', 'key').toString(CryptoJS.enc.Base64));",
    )
    .await;

    assert_eq!(
        lines,
        vec![
            "900150983cd24fb0d6963f7d28e17f72",
            "a9993e364706816aba3e25717850c26c9cd0d89d",
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
            "bp7ym3X//Ft6uuUn1Y/a2y/kLnIZARl2kXNDBl9Y7Uo=",
        ]
    );
}

#[tokio::test]
async fn test_require_returns_the_same_instances() {
    let lines = script_console(
        "console.log(require('crypto-js') === CryptoJS, require('lodash') === _, require('moment') === moment);\n\
         try { require('fs'); } catch (e) { console.log(e.message); }",
    )
    .await;

    assert_eq!(lines, vec!["true true true", "Cannot find module 'fs'"]);
}

#[tokio::test]
async fn test_lodash_helpers() {
    let lines = script_console(
        "var users = [{name: 'b', age: 30, team: 'x'}, {name: 'a', age: 25, team: 'y'}, {name: 'c', age: 30, team: 'x'}];\n\
         console.log(_.get({a: {b: [1, 2]}}, 'a.b[1]'), _.get({}, 'a.b', 'none'));\n\
         console.log(_.map(_.sortBy(users, ['age', 'name']), 'name').join(','));\n\
         console.log(_.find(users, {age: 30}).name, _.filter(users, ['team', 'x']).length);\n\
         console.log(JSON.stringify(_.pick(users[0], ['name', 'age'])), _.uniq([1, 1, 2]).length);\n\
         console.log(Object.keys(_.groupBy(users, 'team')).join(','), _.isEmpty({}), _.includes([NaN], NaN));\n\
         console.log(JSON.stringify(_.pick({a: {b: 1, c: 2}, d: [5, 6]}, 'a.b', 'd[1]', 'x.y')));",
    )
    .await;

    assert_eq!(
        lines,
        vec![
            "2 none",
            "a,b,c",
            "b 2",
            "{\"name\":\"b\",\"age\":30} 2",
            "x,y true true",
            "{\"a\":{\"b\":1},\"d\":[null,6]}",
        ]
    );
}

#[tokio::test]
async fn test_moment_helpers() {
    let lines = script_console(
        "var start = moment.utc('2024-01-15T10:30:00Z');\n\
         console.log(start.clone().add(1, 'days').format('YYYY-MM-DD'));\n\
         console.log(start.clone().startOf('month').toISOString());\n\
         console.log(moment.utc('2024-03-01T00:00:00Z').diff(start, 'days'));\n\
         console.log(start.isBefore(moment.utc('2024-01-16T00:00:00Z')), moment('garbage').isValid());\n\
         console.log(start.unix(), moment.unix(0).utc().format('YYYY'));",
    )
    .await;

    assert_eq!(
        lines,
        vec![
            "2024-01-16",
            "2024-01-01T00:00:00.000Z",
            "45",
            "true false",
            "1705314600 1970",
        ]
    );
}

#[tokio::test]
async fn test_expect_chains() {
    let spec = login_spec().with_post_response(
        "pm.test('chains', function () {\n\
           var body = pm.response.json();\n\
           pm.expect(body).to.have.property('items').with.lengthOf(2);\n\
           pm.expect(body.items).to.deep.include({id: 2});\n\
           pm.expect(body.name).to.be.a('string').and.match(/^cou/);\n\
           pm.expect(body.count).to.be.above(1).and.below(3);\n\
           pm.expect(body.missing).to.not.exist;\n\
           pm.expect([1, 2]).to.eql([1, 2]);\n\
         });\n\
         pm.test('negation', function () { pm.expect(1).to.not.equal(1); });",
    );
    let response = HttpResponse::new(
        200,
        r#"{"name": "courier", "count": 2, "items": [{"id": 1}, {"id": 2}]}"#,
    );
    let (execution, _) = run_once(&spec, response).await;

    assert!(execution.tests[0].passed, "{:?}", execution.tests[0].message);
    assert!(!execution.tests[1].passed);
    assert_eq!(
        execution.tests[1].message.as_deref(),
        Some("AssertionError: expected 1 to not equal 1")
    );
}

#[tokio::test]
async fn test_replace_in_resolves_both_scopes() {
    let lines = script_console(
        "pm.variables.set('path', 'users');\n\
         console.log(pm.variables.replaceIn('{{app_code}}/{{path}}/{{nope}}'));",
    )
    .await;

    assert_eq!(lines, vec!["myAppCode/users/{{nope}}"]);
}
