//! Static pre-execution checks for generated workflow scripts.
//!
//! The generator runs this before accepting code (feeding failures back into
//! its retry prompt); the executor trusts that gate but still re-checks the
//! entry point at run time. Checks are heuristic completeness checks, not a
//! security review.

use boa_engine::{Context, Script, Source};

/// Name of the single required callable in generated source.
pub const ENTRY_POINT: &str = "execute_workflow";

/// Capabilities every useful workflow script is expected to reference:
/// the asynchronous primitive and the HTTP client builtin.
const REQUIRED_CAPABILITIES: [&str; 2] = ["await", "http.request"];

#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub valid: bool,
    pub error: Option<String>,
}

impl Validation {
    fn ok() -> Self {
        Self { valid: true, error: None }
    }

    fn fail(error: String) -> Self {
        Self { valid: false, error: Some(error) }
    }
}

/// Validate generated source. Deterministic: the same source always yields
/// the same verdict.
pub fn validate_source(source: &str) -> Validation {
    // Parse only; top-level code must not run during validation.
    let mut context = Context::default();
    if let Err(e) = Script::parse(Source::from_bytes(source), None, &mut context) {
        return Validation::fail(format!("Syntax error: {e}"));
    }

    if !source.contains(&format!("function {ENTRY_POINT}(")) {
        return Validation::fail(format!("Missing {ENTRY_POINT} function"));
    }

    if !source.contains(&format!("async function {ENTRY_POINT}(")) {
        return Validation::fail(format!("{ENTRY_POINT} must be async"));
    }

    for capability in REQUIRED_CAPABILITIES {
        if !source.contains(capability) {
            return Validation::fail(format!("Missing required capability: {capability}"));
        }
    }

    Validation::ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
async function execute_workflow(userInput) {
    const response = await http.request("GET", "https://example.com/search");
    return response.body;
}
"#;

    #[test]
    fn accepts_complete_script() {
        let verdict = validate_source(VALID);
        assert!(verdict.valid, "{:?}", verdict.error);
    }

    #[test]
    fn rejects_syntax_error() {
        let verdict = validate_source("async function execute_workflow( {");
        assert!(!verdict.valid);
        assert!(verdict.error.unwrap().contains("Syntax error"));
    }

    #[test]
    fn rejects_missing_entry_point() {
        let verdict = validate_source("async function other() { await http.request(); }");
        assert!(!verdict.valid);
        assert!(verdict.error.unwrap().contains("execute_workflow"));
    }

    #[test]
    fn rejects_synchronous_entry_point() {
        let source = r#"
function execute_workflow(userInput) { return userInput; }
async function helper() { await http.request("GET", "u"); }
"#;
        let verdict = validate_source(source);
        assert!(!verdict.valid);
        assert!(verdict.error.unwrap().contains("must be async"));
    }

    #[test]
    fn rejects_missing_http_capability() {
        let source = r#"
async function execute_workflow(userInput) {
    await sleep(1);
    return userInput;
}
"#;
        let verdict = validate_source(source);
        assert!(!verdict.valid);
        assert!(verdict.error.unwrap().contains("http.request"));
    }

    #[test]
    fn verdict_is_idempotent() {
        for source in [VALID, "not even ( javascript", "async function f() {}"] {
            assert_eq!(validate_source(source), validate_source(source));
        }
    }
}
