use crate::models::{Alternative, TokenRecord};

/// Strip the JSON quoting artifacts a schema-constrained response leaves on token text.
///
/// Removes any mix of leading/trailing `"` and whitespace, so `"male"`, `"male` and
/// ` male"` all normalize to `male`. Interior characters are untouched.
pub fn normalize_token_text(text: &str) -> &str {
    text.trim_matches(|c: char| c == '"' || c.is_whitespace())
}

/// Find every token whose normalized text equals the predicted label, in emission order.
///
/// Comparison is exact and case-sensitive after normalization. A label split across
/// several tokens may match more than once.
pub fn match_predicted_tokens<'a>(
    tokens: &'a [TokenRecord],
    predicted_label: &str,
) -> Vec<&'a TokenRecord> {
    tokens
        .iter()
        .filter(|token| normalize_token_text(&token.text) == predicted_label)
        .collect()
}

/// Sum the log-probabilities of the matched span.
///
/// Returns `None` when the predicted label was never found among the tokens.
pub fn aggregate_logprob(matched: &[&TokenRecord]) -> Option<f64> {
    if matched.is_empty() {
        return None;
    }
    Some(matched.iter().map(|token| token.logprob).sum())
}

/// Alternatives of the first matched token.
///
/// Only the first position carries the branching decision between classes; later tokens in
/// the span are forced continuations.
pub fn first_alternatives<'a>(matched: &[&'a TokenRecord]) -> &'a [Alternative] {
    matched
        .first()
        .copied()
        .map(|token| token.alternatives.as_slice())
        .unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json_tokens() -> Vec<TokenRecord> {
        vec![
            TokenRecord::new("{\"", -0.0001),
            TokenRecord::new("gender", 0.0),
            TokenRecord::new("\":\"", -0.0002),
            TokenRecord::new("male", -0.12).with_alternatives(vec![
                Alternative::new("male", -0.12),
                Alternative::new("female", -2.2),
            ]),
            TokenRecord::new("\"}", 0.0),
        ]
    }

    #[test]
    fn test_normalize_token_text() {
        assert_eq!(normalize_token_text("\"male\""), "male");
        assert_eq!(normalize_token_text("\"male"), "male");
        assert_eq!(normalize_token_text("male\""), "male");
        assert_eq!(normalize_token_text(" \" male \" "), "male");
        assert_eq!(normalize_token_text("\""), "");
        assert_eq!(normalize_token_text("fe\"male"), "fe\"male");
    }

    #[test]
    fn test_normalize_is_case_preserving() {
        assert_eq!(normalize_token_text("\"Male\""), "Male");
    }

    #[test]
    fn test_match_single_token() {
        let tokens = json_tokens();
        let matched = match_predicted_tokens(&tokens, "male");

        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].logprob, -0.12);
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let tokens = json_tokens();
        assert!(match_predicted_tokens(&tokens, "Male").is_empty());
    }

    #[test]
    fn test_match_preserves_order_over_multiple_tokens() {
        let tokens = vec![
            TokenRecord::new("\"male", -0.01),
            TokenRecord::new("other", -0.5),
            TokenRecord::new("male\"", -0.02),
        ];
        let matched = match_predicted_tokens(&tokens, "male");

        assert_eq!(matched.len(), 2);
        assert_eq!(matched[0].text, "\"male");
        assert_eq!(matched[1].text, "male\"");
    }

    #[test]
    fn test_aggregate_empty_is_none() {
        assert_eq!(aggregate_logprob(&[]), None);
    }

    #[test]
    fn test_aggregate_sums_span() {
        let quote = TokenRecord::new("\"", -0.01);
        let word = TokenRecord::new("male\"", -0.02);
        let total = aggregate_logprob(&[&quote, &word]).unwrap();

        assert!((total - (-0.03)).abs() < 1e-12);
    }

    #[test]
    fn test_first_alternatives_uses_first_match_only() {
        let first = TokenRecord::new("\"male", -0.01)
            .with_alternatives(vec![Alternative::new("\"female", -3.0)]);
        let second =
            TokenRecord::new("male\"", -0.02).with_alternatives(vec![Alternative::new("x", -9.0)]);

        let alternatives = first_alternatives(&[&first, &second]);
        assert_eq!(alternatives, &[Alternative::new("\"female", -3.0)]);
    }

    #[test]
    fn test_first_alternatives_empty_when_unmatched() {
        assert!(first_alternatives(&[]).is_empty());
    }
}
