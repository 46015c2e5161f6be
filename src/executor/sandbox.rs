// Script host: compiles and runs one generated script in a fresh engine
// context with the restricted namespace.
//
// The engine is synchronous, so this whole module runs inside
// `spawn_blocking`. The caller owns the outer timeout; the deadline passed
// in here lets the builtins unwind the thread shortly after it fires.

use std::time::Instant;

use boa_engine::builtins::promise::PromiseState;
use boa_engine::object::builtins::JsPromise;
use boa_engine::{js_string, Context, JsError, JsString, JsValue, Script, Source};

use crate::config::{
    Config, ANTHROPIC_KEY_PLACEHOLDER, LIGHTON_BASE_URL_PLACEHOLDER, LIGHTON_KEY_PLACEHOLDER,
};
use crate::error::SandboxError;
use crate::validator::ENTRY_POINT;

use super::{builtins, host};

/// Backstop for pure-script busy loops that never call a builtin; those
/// cannot observe the deadline, so the engine's own limit bounds them.
const LOOP_ITERATION_LIMIT: u64 = 500_000_000;

/// Substitute the documented placeholder assignments with the configured
/// values on a private copy of the source.
///
/// Deliberately an exact find/replace over the full assignment text, never a
/// template-interpolation pass: only the literal `const NAME = "placeholder"`
/// form is rewritten, so a placeholder name mentioned anywhere else (for
/// example inside a string documenting the pattern) is left alone.
pub fn inject_credentials(source: &str, config: &Config) -> String {
    source
        .replace(
            &format!("const LIGHTON_API_KEY = \"{LIGHTON_KEY_PLACEHOLDER}\""),
            &format!("const LIGHTON_API_KEY = \"{}\"", config.lighton_api_key),
        )
        .replace(
            &format!("const ANTHROPIC_API_KEY = \"{ANTHROPIC_KEY_PLACEHOLDER}\""),
            &format!("const ANTHROPIC_API_KEY = \"{}\"", config.anthropic_api_key),
        )
        .replace(
            &format!("const LIGHTON_BASE_URL = \"{LIGHTON_BASE_URL_PLACEHOLDER}\""),
            &format!("const LIGHTON_BASE_URL = \"{}\"", config.lighton_base_url),
        )
}

/// Run one script to completion. On failure the captured stderr buffer is
/// folded into the error message so callers get actionable diagnostics
/// without server-side log access.
pub fn run_script(
    source: &str,
    user_input: &str,
    attached_file_ids: Option<&[i64]>,
    deadline: Instant,
) -> Result<String, SandboxError> {
    let guard = host::HostGuard::install(deadline);
    let result = execute_script(source, user_input, attached_file_ids);
    let (stdout, stderr) = guard.finish();

    if !stdout.is_empty() {
        tracing::debug!(bytes = stdout.len(), "script stdout captured");
    }

    match result {
        Ok(text) => Ok(text),
        // Compile failures happen before any user code runs; there is no
        // output to attach.
        Err(e @ SandboxError::Compile(_)) => Err(e),
        Err(e) if stderr.is_empty() => Err(e),
        Err(SandboxError::Script(message)) => Err(SandboxError::Script(format!(
            "{message}. Stderr: {}",
            stderr.trim_end()
        ))),
        // Top-level code may have written stderr before a missing entry
        // point or an unsettled promise surfaced; carry it along too.
        Err(e) => Err(SandboxError::Script(format!(
            "{e}. Stderr: {}",
            stderr.trim_end()
        ))),
    }
}

fn execute_script(
    source: &str,
    user_input: &str,
    attached_file_ids: Option<&[i64]>,
) -> Result<String, SandboxError> {
    let mut context = Context::default();
    context
        .runtime_limits_mut()
        .set_loop_iteration_limit(LOOP_ITERATION_LIMIT);

    builtins::register(&mut context, attached_file_ids)
        .map_err(|e| SandboxError::Internal(format!("failed to register builtins: {e}")))?;

    let script = Script::parse(Source::from_bytes(source), None, &mut context)
        .map_err(|e| SandboxError::Compile(e.to_string()))?;

    // Runs all top-level definitions; no workflow logic fires yet.
    script
        .evaluate(&mut context)
        .map_err(|e| script_error(&e))?;

    // Defensive re-check: the validator should have caught a missing entry
    // point, but the engine does not trust that gate blindly.
    let entry = context
        .global_object()
        .get(js_string!(ENTRY_POINT), &mut context)
        .map_err(|e| script_error(&e))?;
    let Some(entry) = entry.as_callable() else {
        return Err(SandboxError::EntryPointNotFound);
    };

    let input = JsValue::from(JsString::from(user_input));
    let value = entry
        .call(&JsValue::undefined(), &[input], &mut context)
        .map_err(|e| script_error(&e))?;

    let settled = settle(value, &mut context)?;
    value_to_text(&settled, &mut context)
}

/// Drain the job queue and read the settled state of the entry point's
/// promise. Synchronous return values pass straight through.
fn settle(value: JsValue, context: &mut Context) -> Result<JsValue, SandboxError> {
    let promise = match value.as_object() {
        Some(object) => JsPromise::from_object(object.clone()).ok(),
        None => None,
    };
    let Some(promise) = promise else {
        return Ok(value);
    };

    context.run_jobs();

    match promise.state() {
        PromiseState::Fulfilled(settled) => Ok(settled),
        PromiseState::Rejected(reason) => Err(script_error(&JsError::from_opaque(reason))),
        PromiseState::Pending => Err(SandboxError::PromiseUnsettled),
    }
}

fn value_to_text(value: &JsValue, context: &mut Context) -> Result<String, SandboxError> {
    if value.is_null_or_undefined() {
        return Ok(String::new());
    }
    if let Some(s) = value.as_string() {
        return Ok(s.to_std_string_escaped());
    }
    value
        .to_string(context)
        .map(|s| s.to_std_string_escaped())
        .map_err(|e| script_error(&e))
}

fn script_error(error: &JsError) -> SandboxError {
    SandboxError::Script(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_secret() -> Config {
        Config {
            lighton_api_key: "sk-lighton-real".to_string(),
            anthropic_api_key: "sk-anthropic-real".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn injects_placeholder_assignments() {
        let source = r#"
const LIGHTON_API_KEY = "your_api_key_here";
const ANTHROPIC_API_KEY = "your_anthropic_api_key_here";
const LIGHTON_BASE_URL = "https://api.lighton.ai";
"#;
        let injected = inject_credentials(source, &config_with_secret());
        assert!(injected.contains("const LIGHTON_API_KEY = \"sk-lighton-real\""));
        assert!(injected.contains("const ANTHROPIC_API_KEY = \"sk-anthropic-real\""));
        assert!(injected.contains("const LIGHTON_BASE_URL = \"https://paradigm.lighton.ai\""));
        assert!(!injected.contains("your_api_key_here"));
    }

    #[test]
    fn leaves_unrelated_placeholder_mentions_alone() {
        // The placeholder name inside a plain string must survive; only the
        // exact assignment form is rewritten.
        let source = r#"
const LIGHTON_API_KEY = "your_api_key_here";
const NOTE = "replace LIGHTON_API_KEY with your_api_key_here before running standalone";
"#;
        let injected = inject_credentials(source, &config_with_secret());
        assert!(injected.contains("const LIGHTON_API_KEY = \"sk-lighton-real\""));
        assert!(injected
            .contains("replace LIGHTON_API_KEY with your_api_key_here before running standalone"));
    }

    #[test]
    fn injection_without_placeholders_is_identity() {
        let source = "async function execute_workflow(u) { return u; }";
        assert_eq!(inject_credentials(source, &config_with_secret()), source);
    }

    #[test]
    fn runs_simple_entry_point() {
        let source = r#"async function execute_workflow(userInput) { return "ok:" + userInput; }"#;
        let deadline = Instant::now() + std::time::Duration::from_secs(5);
        let result = run_script(source, "42", None, deadline).unwrap();
        assert_eq!(result, "ok:42");
    }

    #[test]
    fn missing_entry_point_is_detected() {
        let source = "const x = 1;";
        let deadline = Instant::now() + std::time::Duration::from_secs(5);
        let err = run_script(source, "x", None, deadline).unwrap_err();
        assert!(matches!(err, SandboxError::EntryPointNotFound));
    }

    #[test]
    fn entry_point_error_includes_stderr() {
        let source = r#"
async function execute_workflow(userInput) {
    console.error("diagnostic detail");
    throw new Error("boom");
}
"#;
        let deadline = Instant::now() + std::time::Duration::from_secs(5);
        let err = run_script(source, "x", None, deadline).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("boom"), "{message}");
        assert!(message.contains("diagnostic detail"), "{message}");
    }

    #[test]
    fn missing_entry_point_error_includes_stderr() {
        // Top-level output written before the lookup fails must survive
        // into the error message.
        let source = r#"console.error("setup hint before failure");"#;
        let deadline = Instant::now() + std::time::Duration::from_secs(5);
        let err = run_script(source, "x", None, deadline).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("execute_workflow function not found"), "{message}");
        assert!(message.contains("setup hint before failure"), "{message}");
    }

    #[test]
    fn undefined_return_becomes_empty_text() {
        let source = "async function execute_workflow(userInput) { }";
        let deadline = Instant::now() + std::time::Duration::from_secs(5);
        let result = run_script(source, "x", None, deadline).unwrap();
        assert_eq!(result, "");
    }

    #[test]
    fn attached_files_visible_in_order() {
        let source = r#"
async function execute_workflow(userInput) {
    return JSON.stringify(ATTACHED_FILES);
}
"#;
        let deadline = Instant::now() + std::time::Duration::from_secs(5);
        let result = run_script(source, "x", Some(&[7, 9]), deadline).unwrap();
        assert_eq!(result, "[7,9]");
    }

    #[test]
    fn filesystem_style_globals_are_stripped() {
        let source = r#"
async function execute_workflow(userInput) {
    return typeof eval;
}
"#;
        let deadline = Instant::now() + std::time::Duration::from_secs(5);
        let result = run_script(source, "x", None, deadline).unwrap();
        assert_eq!(result, "undefined");
    }
}
