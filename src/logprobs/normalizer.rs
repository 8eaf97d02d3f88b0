use tracing::warn;

use super::normalize_token_text;
use crate::models::{Alternative, ClassLogprobMap, ClassProbabilityMap};

/// Collect log-probabilities for known classes from a position's top-K alternatives.
///
/// Alternative text is normalized the same way as emitted tokens. When a class shows up more
/// than once, the later occurrence overwrites the earlier one.
pub fn extract_class_logprobs(
    alternatives: &[Alternative],
    known_classes: &[String],
) -> ClassLogprobMap {
    let mut class_logprobs = ClassLogprobMap::new();

    for alternative in alternatives {
        let clean = normalize_token_text(&alternative.text);
        if known_classes.iter().any(|class| class == clean) {
            class_logprobs.insert(clean.to_string(), alternative.logprob);
        }
    }

    class_logprobs
}

/// Softmax over class log-probabilities, shifted by the maximum for numerical stability.
///
/// Returns `None` for an empty map, or when no entry is usable: a NaN or `+inf` anywhere, or
/// every entry `-inf`. Entries at `-inf` alongside finite ones get probability 0.
pub fn normalize(class_logprobs: &ClassLogprobMap) -> Option<ClassProbabilityMap> {
    if class_logprobs.is_empty() {
        return None;
    }

    if let Some((class, logprob)) = class_logprobs
        .iter()
        .find(|(_, logprob)| logprob.is_nan() || **logprob == f64::INFINITY)
    {
        warn!("Cannot normalize class {}: log-probability {}", class, logprob);
        return None;
    }

    let max = class_logprobs
        .values()
        .copied()
        .filter(|logprob| logprob.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        warn!("Cannot normalize: every class log-probability is -inf");
        return None;
    }

    let exps: Vec<(&String, f64)> = class_logprobs
        .iter()
        .map(|(class, logprob)| (class, (logprob - max).exp()))
        .collect();
    let total: f64 = exps.iter().map(|(_, e)| e).sum();

    Some(
        exps.into_iter()
            .map(|(class, e)| (class.clone(), e / total))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn classes(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    fn map(entries: &[(&str, f64)]) -> ClassLogprobMap {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_extract_strips_quotes() {
        let alternatives = vec![
            Alternative::new("\"male\"", -0.05),
            Alternative::new("female", -3.2),
        ];
        let result = extract_class_logprobs(&alternatives, &classes(&["male", "female"]));

        assert_eq!(result, map(&[("male", -0.05), ("female", -3.2)]));
    }

    #[test]
    fn test_extract_ignores_unknown_tokens() {
        let alternatives = vec![
            Alternative::new("m", -1.0),
            Alternative::new("Male", -1.5),
            Alternative::new("\"", -4.0),
        ];
        let result = extract_class_logprobs(&alternatives, &classes(&["male", "female"]));

        assert!(result.is_empty());
    }

    #[test]
    fn test_extract_later_duplicate_wins() {
        let alternatives = vec![
            Alternative::new("male", -0.1),
            Alternative::new("female", -2.0),
            Alternative::new("\"male", -4.5),
        ];
        let result = extract_class_logprobs(&alternatives, &classes(&["male", "female"]));

        assert_eq!(result["male"], -4.5);
        assert_eq!(result["female"], -2.0);
    }

    #[test]
    fn test_normalize_empty_is_none() {
        assert_eq!(normalize(&ClassLogprobMap::new()), None);
    }

    #[test]
    fn test_normalize_single_class_is_certain() {
        let result = normalize(&map(&[("male", -0.1)])).unwrap();
        assert_eq!(result, map(&[("male", 1.0)]));
    }

    #[test]
    fn test_normalize_two_classes() {
        let result = normalize(&map(&[("male", -0.2), ("female", -1.8)])).unwrap();

        assert!((result["male"] - 0.832_018).abs() < 1e-6);
        assert!((result["female"] - 0.167_982).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_handles_very_negative_logprobs() {
        let result = normalize(&map(&[("a", -1000.0), ("b", -1001.0)])).unwrap();

        assert!(result["a"].is_finite());
        assert!((result["a"] + result["b"] - 1.0).abs() < 1e-9);
        assert!(result["a"] > result["b"]);
    }

    #[test]
    fn test_normalize_neg_infinity_gets_zero() {
        let result = normalize(&map(&[("male", -0.3), ("female", f64::NEG_INFINITY)])).unwrap();

        assert_eq!(result["male"], 1.0);
        assert_eq!(result["female"], 0.0);
    }

    #[test]
    fn test_normalize_rejects_unusable_input() {
        assert_eq!(normalize(&map(&[("male", f64::NAN)])), None);
        assert_eq!(normalize(&map(&[("male", f64::INFINITY), ("female", -1.0)])), None);
        assert_eq!(normalize(&map(&[("male", f64::NEG_INFINITY)])), None);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let input = map(&[("a", -0.7), ("b", -1.3), ("c", -2.9)]);
        let first = normalize(&input).unwrap();
        let second = normalize(&input).unwrap();

        for (class, p) in &first {
            assert_eq!(p.to_bits(), second[class].to_bits());
        }
    }

    fn class_logprobs_strategy() -> impl Strategy<Value = ClassLogprobMap> {
        prop::collection::btree_map("[a-z]{1,8}", -50.0f64..=0.0, 1..8)
    }

    proptest! {
        #[test]
        fn normalized_probabilities_sum_to_one(input in class_logprobs_strategy()) {
            let result = normalize(&input).unwrap();
            let total: f64 = result.values().sum();

            prop_assert!((total - 1.0).abs() < 1e-9);
            prop_assert_eq!(result.len(), input.len());
            for p in result.values() {
                prop_assert!(*p > 0.0 && *p <= 1.0);
            }
        }

        #[test]
        fn unique_max_gets_highest_probability(input in class_logprobs_strategy()) {
            let (top_class, top_logprob) = input
                .iter()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(k, v)| (k.clone(), *v))
                .unwrap();
            prop_assume!(input
                .iter()
                .all(|(k, v)| *k == top_class || top_logprob - v > 1e-9));

            let result = normalize(&input).unwrap();
            for (class, p) in &result {
                if *class != top_class {
                    prop_assert!(result[&top_class] > *p);
                }
            }
        }
    }
}
