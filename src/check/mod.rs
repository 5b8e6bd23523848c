//! Expression result expectations
//!
//! An [`ExprExpect`] describes what evaluating one expression should produce:
//! a type name, a rendered value and/or summary string, and optionally the
//! names and values of the result's children. DAP renders both scalar values
//! and container summaries into the single `result` string, so `value` and
//! `summary` are kept as separate fields for scenario readability but both
//! assert on that string.

use serde::Deserialize;

use crate::common::{Error, Result};
use crate::dap::{EvaluateResponseBody, Variable};

/// Expectations for one expression evaluation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExprExpect {
    /// Expected type name (exact match)
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    /// Expected rendered value (exact match)
    pub value: Option<String>,
    /// Expected summary string (exact match)
    pub summary: Option<String>,
    /// Expected children of the result
    #[serde(default)]
    pub children: Vec<ValueCheck>,
}

/// Expectation for one child in a variables tree
#[derive(Debug, Clone, Deserialize)]
pub struct ValueCheck {
    /// Child name to look up
    pub name: String,
    /// Expected rendered value (exact match)
    pub value: Option<String>,
    /// Expected type name (exact match)
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    /// Nested children, checked recursively
    #[serde(default)]
    pub children: Vec<ValueCheck>,
}

/// Check the evaluate response against the expectation
///
/// Children are not checked here; they need further `variables` requests and
/// are traversed by the session.
pub fn match_result(
    expression: &str,
    expect: &ExprExpect,
    result: &EvaluateResponseBody,
) -> Result<()> {
    if let Some(expected_type) = &expect.type_name {
        let actual = result.type_name.as_deref().unwrap_or("");
        if actual != expected_type {
            return Err(Error::check(
                expression,
                format!("expected type '{}', got '{}'", expected_type, actual),
            ));
        }
    }

    if let Some(expected_value) = &expect.value {
        if &result.result != expected_value {
            return Err(Error::check(
                expression,
                format!("expected value '{}', got '{}'", expected_value, result.result),
            ));
        }
    }

    if let Some(expected_summary) = &expect.summary {
        if &result.result != expected_summary {
            return Err(Error::check(
                expression,
                format!(
                    "expected summary '{}', got '{}'",
                    expected_summary, result.result
                ),
            ));
        }
    }

    if !expect.children.is_empty() && result.variables_reference == 0 {
        return Err(Error::check(
            expression,
            format!(
                "expected {} child(ren), but the result has none",
                expect.children.len()
            ),
        ));
    }

    Ok(())
}

/// Find the variable a [`ValueCheck`] names and check its value and type
///
/// `path` is the dotted access path used in failure messages, e.g. `s.pointer`.
pub fn match_child<'a>(
    path: &str,
    check: &ValueCheck,
    variables: &'a [Variable],
) -> Result<&'a Variable> {
    let var = variables.iter().find(|v| v.name == check.name).ok_or_else(|| {
        let available: Vec<&str> = variables.iter().map(|v| v.name.as_str()).collect();
        Error::check(
            path,
            format!("child '{}' not found. Available: {:?}", check.name, available),
        )
    })?;

    if let Some(expected_value) = &check.value {
        if &var.value != expected_value {
            return Err(Error::check(
                path,
                format!(
                    "child '{}': expected value '{}', got '{}'",
                    check.name, expected_value, var.value
                ),
            ));
        }
    }

    if let Some(expected_type) = &check.type_name {
        let actual = var.type_name.as_deref().unwrap_or("");
        if actual != expected_type {
            return Err(Error::check(
                path,
                format!(
                    "child '{}': expected type '{}', got '{}'",
                    check.name, expected_type, actual
                ),
            ));
        }
    }

    if !check.children.is_empty() && var.variables_reference == 0 {
        return Err(Error::check(
            path,
            format!("child '{}' has no children to check", check.name),
        ));
    }

    Ok(var)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval_result(result: &str, type_name: &str, var_ref: i64) -> EvaluateResponseBody {
        EvaluateResponseBody {
            result: result.to_string(),
            type_name: Some(type_name.to_string()),
            variables_reference: var_ref,
        }
    }

    #[test]
    fn test_match_result_type_and_value() {
        let expect = ExprExpect {
            type_name: Some("element_type".to_string()),
            value: Some("3".to_string()),
            ..Default::default()
        };

        match_result("*s", &expect, &eval_result("3", "element_type", 0)).unwrap();
    }

    #[test]
    fn test_match_result_type_mismatch() {
        let expect = ExprExpect {
            type_name: Some("element_type".to_string()),
            ..Default::default()
        };

        let err = match_result("*s", &expect, &eval_result("3", "int", 0)).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("*s"), "missing expression in: {}", msg);
        assert!(msg.contains("element_type"), "missing expected type in: {}", msg);
        assert!(msg.contains("int"), "missing actual type in: {}", msg);
    }

    #[test]
    fn test_match_result_summary() {
        let expect = ExprExpect {
            summary: Some("3 strong=1 weak=0".to_string()),
            ..Default::default()
        };

        match_result(
            "s",
            &expect,
            &eval_result("3 strong=1 weak=0", "std::shared_ptr<int>", 17),
        )
        .unwrap();

        let err = match_result(
            "s",
            &expect,
            &eval_result("nullptr", "std::shared_ptr<int>", 17),
        )
        .unwrap_err();
        assert!(err.to_string().contains("summary"));
    }

    #[test]
    fn test_match_result_children_require_reference() {
        let expect = ExprExpect {
            children: vec![ValueCheck {
                name: "pointer".to_string(),
                value: None,
                type_name: None,
                children: vec![],
            }],
            ..Default::default()
        };

        // variablesReference 0 means no structured children
        let err = match_result("s", &expect, &eval_result("3", "std::shared_ptr<int>", 0))
            .unwrap_err();
        assert!(err.to_string().contains("child"));
    }

    #[test]
    fn test_match_child_by_name() {
        let variables = vec![
            Variable {
                name: "__ptr_".to_string(),
                value: "0x1000".to_string(),
                type_name: Some("int *".to_string()),
                variables_reference: 0,
            },
            Variable {
                name: "pointer".to_string(),
                value: "0x1000".to_string(),
                type_name: Some("int *".to_string()),
                variables_reference: 0,
            },
        ];

        let check = ValueCheck {
            name: "pointer".to_string(),
            value: None,
            type_name: Some("int *".to_string()),
            children: vec![],
        };

        let var = match_child("s", &check, &variables).unwrap();
        assert_eq!(var.name, "pointer");
    }

    #[test]
    fn test_match_child_missing_lists_available() {
        let variables = vec![Variable {
            name: "pointer".to_string(),
            value: "0x1000".to_string(),
            type_name: None,
            variables_reference: 0,
        }];

        let check = ValueCheck {
            name: "deleter".to_string(),
            value: None,
            type_name: None,
            children: vec![],
        };

        let err = match_child("s", &check, &variables).unwrap_err();
        assert!(err.to_string().contains("pointer"));
    }
}
