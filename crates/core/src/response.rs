use crate::error::PipelineError;
use crate::models::StructuredAnswer;
use tracing::error;

const FENCE_OPEN: &str = "```json";
const FENCE_CLOSE: &str = "```";

/// Returns the body of the first fenced block labelled `json`, or the whole
/// trimmed text when there is none. An unclosed fence runs to the end.
pub fn extract_json_payload(raw: &str) -> &str {
    let Some(start) = raw.find(FENCE_OPEN) else {
        return raw.trim();
    };

    let body = &raw[start + FENCE_OPEN.len()..];
    let end = body.find(FENCE_CLOSE).unwrap_or(body.len());
    body[..end].trim()
}

pub fn parse_answer(raw: &str) -> Result<StructuredAnswer, PipelineError> {
    let payload = extract_json_payload(raw);
    serde_json::from_str(payload).map_err(|source| {
        error!(%source, raw_response = raw, "failed to parse model response");
        PipelineError::ResponseParse {
            raw: raw.to_string(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Justification;

    const BARE: &str = r#"{
  "decision": "rejected",
  "amount": 0,
  "justification": [
    {
      "finding": "Policy is two months old; the waiting period is three months.",
      "clause_text": "Knee surgery is covered up to $5000 after a 3-month waiting period."
    }
  ]
}"#;

    fn expected() -> StructuredAnswer {
        StructuredAnswer {
            decision: "rejected".to_string(),
            amount: 0,
            justification: vec![Justification {
                finding: "Policy is two months old; the waiting period is three months."
                    .to_string(),
                clause_text: "Knee surgery is covered up to $5000 after a 3-month waiting period."
                    .to_string(),
            }],
        }
    }

    #[test]
    fn bare_json_is_parsed() {
        assert_eq!(parse_answer(BARE).unwrap(), expected());
    }

    #[test]
    fn fenced_json_matches_bare_json() {
        let fenced = format!("Here is the decision:\n```json\n{BARE}\n```\nLet me know.");
        assert_eq!(parse_answer(&fenced).unwrap(), parse_answer(BARE).unwrap());
    }

    #[test]
    fn unclosed_fence_runs_to_end() {
        let fenced = format!("```json\n{BARE}");
        assert_eq!(extract_json_payload(&fenced), BARE);
    }

    #[test]
    fn extra_keys_are_ignored() {
        let raw = r#"{"decision": "approved", "amount": 5000, "justification": [], "confidence": 0.9}"#;
        let answer = parse_answer(raw).unwrap();
        assert_eq!(answer.decision, "approved");
        assert_eq!(answer.amount, 5000);
    }

    #[test]
    fn whole_float_and_numeric_string_amounts_are_accepted() {
        for raw in [
            r#"{"decision": "approved", "amount": 5000.0, "justification": []}"#,
            r#"{"decision": "approved", "amount": "5000", "justification": []}"#,
            r#"{"decision": "approved", "amount": " 5000.0 ", "justification": []}"#,
        ] {
            assert_eq!(parse_answer(raw).unwrap().amount, 5000, "{raw}");
        }
    }

    #[test]
    fn fractional_or_non_numeric_amounts_are_rejected() {
        for raw in [
            r#"{"decision": "approved", "amount": 5000.5, "justification": []}"#,
            r#"{"decision": "approved", "amount": "about 5000", "justification": []}"#,
            r#"{"decision": "approved", "amount": null, "justification": []}"#,
        ] {
            assert!(
                matches!(parse_answer(raw), Err(PipelineError::ResponseParse { .. })),
                "{raw}"
            );
        }
    }

    #[test]
    fn truncated_json_reports_raw_text() {
        let raw = r#"{"decision": "rejected", "amount": 0, "justifica"#;
        match parse_answer(raw) {
            Err(PipelineError::ResponseParse { raw: reported, .. }) => assert_eq!(reported, raw),
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn missing_required_key_is_a_parse_error() {
        let raw = r#"{"decision": "rejected", "justification": []}"#;
        assert!(matches!(
            parse_answer(raw),
            Err(PipelineError::ResponseParse { .. })
        ));
    }
}
