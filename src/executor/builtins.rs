// The restricted namespace exposed to generated scripts.
//
// This is a completeness allow-list for self-contained scripts, not a
// security boundary: scripts still run in the host process with live
// credentials in scope, and the http builtin gives them network access.
// See DESIGN.md for the isolation trade-off.

use std::time::Duration;

use boa_engine::object::ObjectInitializer;
use boa_engine::object::FunctionObjectBuilder;
use boa_engine::property::Attribute;
use boa_engine::{js_string, Context, JsNativeError, JsResult, JsValue, NativeFunction, Source};
use serde_json::{json, Value as JsonValue};

use super::host;

/// Engine globals generated code may keep. Everything else is deleted from
/// the context before user code runs.
const ALLOWED_GLOBALS: [&str; 31] = [
    "globalThis",
    "undefined",
    "NaN",
    "Infinity",
    "JSON",
    "Math",
    "String",
    "Number",
    "Boolean",
    "Array",
    "Object",
    "Promise",
    "RegExp",
    "Date",
    "Map",
    "Set",
    "Symbol",
    "Error",
    "TypeError",
    "RangeError",
    "SyntaxError",
    "ReferenceError",
    "EvalError",
    "URIError",
    "parseInt",
    "parseFloat",
    "isNaN",
    "isFinite",
    "encodeURIComponent",
    "decodeURIComponent",
    "escape",
];

/// Host bindings layered on top of the engine globals.
const HOST_GLOBALS: [&str; 4] = ["console", "http", "sleep", "ATTACHED_FILES"];

/// Default per-request timeout for the http builtin when the script does not
/// pass one; always clamped to the remaining execution deadline.
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(120);

const SLEEP_CHUNK: Duration = Duration::from_millis(25);

/// Register the restricted namespace into a fresh context and strip every
/// global outside the allow-list.
pub fn register(context: &mut Context, attached_file_ids: Option<&[i64]>) -> JsResult<()> {
    register_console(context)?;
    register_http(context)?;
    register_sleep(context)?;
    register_attached_files(context, attached_file_ids)?;
    strip_globals(context)?;
    Ok(())
}

fn register_console(context: &mut Context) -> JsResult<()> {
    let mut initializer = ObjectInitializer::new(context);
    initializer
        .function(NativeFunction::from_fn_ptr(console_stdout), js_string!("log"), 1)
        .function(NativeFunction::from_fn_ptr(console_stdout), js_string!("info"), 1)
        .function(NativeFunction::from_fn_ptr(console_stdout), js_string!("debug"), 1)
        .function(NativeFunction::from_fn_ptr(console_stderr), js_string!("warn"), 1)
        .function(NativeFunction::from_fn_ptr(console_stderr), js_string!("error"), 1);
    let console = initializer.build();

    context.register_global_property(js_string!("console"), console, Attribute::all())?;
    Ok(())
}

fn register_http(context: &mut Context) -> JsResult<()> {
    let mut initializer = ObjectInitializer::new(context);
    initializer.function(NativeFunction::from_fn_ptr(http_request), js_string!("request"), 3);
    let http = initializer.build();

    context.register_global_property(js_string!("http"), http, Attribute::all())?;
    Ok(())
}

fn register_sleep(context: &mut Context) -> JsResult<()> {
    let sleep = FunctionObjectBuilder::new(context.realm(), NativeFunction::from_fn_ptr(sleep_ms))
        .name(js_string!("sleep"))
        .length(1)
        .constructor(false)
        .build();
    context.register_global_property(js_string!("sleep"), sleep, Attribute::all())?;
    Ok(())
}

fn register_attached_files(
    context: &mut Context,
    attached_file_ids: Option<&[i64]>,
) -> JsResult<()> {
    // Single canonical channel for attached-file integration. Order matters:
    // scripts index into this array positionally.
    let Some(ids) = attached_file_ids else {
        return Ok(());
    };
    let value = JsValue::from_json(&json!(ids), context)?;
    context.register_global_property(js_string!("ATTACHED_FILES"), value, Attribute::all())?;
    Ok(())
}

fn strip_globals(context: &mut Context) -> JsResult<()> {
    let allowed = ALLOWED_GLOBALS
        .iter()
        .chain(HOST_GLOBALS.iter())
        .map(|name| format!("\"{name}\""))
        .collect::<Vec<_>>()
        .join(",");

    let strip = format!(
        r#"
(function() {{
    var allowed = new Set([{allowed}]);
    var names = Object.getOwnPropertyNames(globalThis);
    for (var i = 0; i < names.length; i++) {{
        var key = names[i];
        if (!allowed.has(key)) {{
            try {{ delete globalThis[key]; }} catch (e) {{ globalThis[key] = undefined; }}
        }}
    }}
}})();
"#
    );

    context.eval(Source::from_bytes(&strip))?;
    Ok(())
}

fn deadline_check() -> JsResult<()> {
    if host::deadline_exceeded() {
        return Err(JsNativeError::error()
            .with_message("execution deadline exceeded")
            .into());
    }
    Ok(())
}

fn format_args(args: &[JsValue]) -> String {
    args.iter()
        .map(|arg| match arg.as_string() {
            Some(s) => s.to_std_string_escaped(),
            None => arg.display().to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn console_stdout(_this: &JsValue, args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    host::append_stdout(&format_args(args));
    Ok(JsValue::undefined())
}

fn console_stderr(_this: &JsValue, args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    host::append_stderr(&format_args(args));
    Ok(JsValue::undefined())
}

/// Blocking sleep in small chunks so a run that has passed its deadline
/// unwinds promptly instead of blocking the engine thread for the full
/// requested duration.
fn sleep_ms(_this: &JsValue, args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    let ms = args.get(0).and_then(|v| v.as_number()).unwrap_or(0.0);
    if !ms.is_finite() || ms < 0.0 {
        return Err(JsNativeError::range()
            .with_message("sleep(ms) requires a non-negative duration")
            .into());
    }

    let mut left = Duration::from_millis(ms as u64);
    while !left.is_zero() {
        deadline_check()?;
        let chunk = left.min(SLEEP_CHUNK);
        std::thread::sleep(chunk);
        left -= chunk;
    }
    deadline_check()?;
    Ok(JsValue::undefined())
}

/// `http.request(method, url, options)` with options
/// `{headers, body, json, timeoutMs}`. Returns `{status, body, json}`.
///
/// Synchronous under the hood (the engine runs on a blocking thread), so
/// `await http.request(...)` settles immediately.
fn http_request(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    deadline_check()?;

    let method = args
        .get(0)
        .and_then(|v| v.as_string())
        .map(|s| s.to_std_string_escaped())
        .unwrap_or_else(|| "GET".to_string());
    let url = args
        .get(1)
        .and_then(|v| v.as_string())
        .map(|s| s.to_std_string_escaped())
        .ok_or_else(|| JsNativeError::typ().with_message("http.request requires a url string"))?;

    let options = match args.get(2) {
        Some(v) if !v.is_null_or_undefined() => v.to_json(context)?,
        _ => json!({}),
    };

    let timeout = options
        .get("timeoutMs")
        .and_then(JsonValue::as_u64)
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_HTTP_TIMEOUT);
    // Never let a single request outlive the execution budget.
    let timeout = match host::remaining_time() {
        Some(remaining) => timeout.min(remaining),
        None => timeout,
    };

    let mut request = ureq::request(&method, &url).timeout(timeout);
    if let Some(headers) = options.get("headers").and_then(JsonValue::as_object) {
        for (name, value) in headers {
            match value.as_str() {
                Some(s) => request = request.set(name, s),
                None => request = request.set(name, &value.to_string()),
            }
        }
    }

    let response = if let Some(body) = options.get("json").filter(|v| !v.is_null()) {
        request.send_json(body.clone())
    } else if let Some(body) = options.get("body").and_then(JsonValue::as_str) {
        request.send_string(body)
    } else {
        request.call()
    };

    let response = match response {
        Ok(response) => response,
        // Non-2xx responses are data, not host failures; scripts branch on
        // the status themselves.
        Err(ureq::Error::Status(_, response)) => response,
        Err(e) => {
            return Err(JsNativeError::error()
                .with_message(format!("http request failed: {e}"))
                .into())
        }
    };

    let status = response.status();
    let body = response.into_string().map_err(|e| {
        JsNativeError::error().with_message(format!("failed to read response body: {e}"))
    })?;
    let parsed = serde_json::from_str::<JsonValue>(&body).unwrap_or(JsonValue::Null);

    let payload = json!({
        "status": status,
        "body": body,
        "json": parsed,
    });
    JsValue::from_json(&payload, context)
}
