//! Natural-language filter resolution.
//!
//! The resolver is an external model; its output is treated as untrusted
//! text and revalidated here before it becomes a [`FilterSpec`].

use crate::error::ResolveError;
use crate::filter::FilterSpec;
use async_trait::async_trait;
use serde_json::Value;

/// Turns free text into a filter.
#[async_trait]
pub trait FilterResolver: Send + Sync {
    async fn resolve(&self, query: &str) -> Result<FilterSpec, ResolveError>;
}

/// Parses a model completion such as
/// ```text
/// {"attribute": "height", "operator": ">", "value": 100}
/// ```
/// optionally wrapped in a Markdown code fence.
pub fn parse_completion(text: &str) -> Result<FilterSpec, ResolveError> {
    let body = strip_code_fence(text.trim());
    let parsed: Value =
        serde_json::from_str(body).map_err(|e| ResolveError::MalformedOutput(e.to_string()))?;
    let Value::Object(fields) = parsed else {
        return Err(ResolveError::MalformedOutput("expected a JSON object".into()));
    };

    let attribute = fields
        .get("attribute")
        .ok_or(ResolveError::MissingKey("attribute"))?;
    let operator = fields
        .get("operator")
        .ok_or(ResolveError::MissingKey("operator"))?;
    let value = fields.get("value").ok_or(ResolveError::MissingKey("value"))?;

    let (Some(attribute), Some(operator)) = (attribute.as_str(), operator.as_str()) else {
        return Err(ResolveError::MalformedOutput(
            "'attribute' and 'operator' must be strings".into(),
        ));
    };
    Ok(FilterSpec::parse(attribute, operator, value)?)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FilterError;
    use crate::filter::{Attribute, FilterValue, Operator};

    #[test]
    fn parses_plain_and_fenced_json() {
        let spec = parse_completion(r#" {"attribute": "height", "operator": ">", "value": 100} "#).unwrap();
        assert_eq!(spec.attribute, Attribute::Height);
        assert_eq!(spec.operator, Operator::Gt);
        assert_eq!(spec.value, FilterValue::Number(100.0));

        let fenced = "```json\n{\"attribute\": \"land_use_designation\", \"operator\": \"contains\", \"value\": \"resid\"}\n```";
        let spec = parse_completion(fenced).unwrap();
        assert_eq!(spec.value, FilterValue::Text("resid".into()));
    }

    #[test]
    fn reports_structured_failures() {
        assert!(matches!(parse_completion("height > 100"), Err(ResolveError::MalformedOutput(_))));
        assert!(matches!(parse_completion("[1, 2]"), Err(ResolveError::MalformedOutput(_))));
        assert!(matches!(
            parse_completion(r#"{"attribute": "height", "value": 3}"#),
            Err(ResolveError::MissingKey("operator"))
        ));
        assert!(matches!(
            parse_completion(r#"{"attribute": "colour", "operator": "=", "value": "red"}"#),
            Err(ResolveError::InvalidFilter(FilterError::UnknownAttribute(_)))
        ));
        assert!(matches!(
            parse_completion(r#"{"attribute": "height", "operator": "~", "value": 3}"#),
            Err(ResolveError::InvalidFilter(FilterError::UnknownOperator(_)))
        ));
        assert!(matches!(
            parse_completion(r#"{"attribute": "height", "operator": "=", "value": "tall"}"#),
            Err(ResolveError::InvalidFilter(FilterError::InvalidFilterValue { .. }))
        ));
    }
}
