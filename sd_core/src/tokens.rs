//! Token budget estimation shared by every prompt-composing crate
//! (planner, writer, extractor, plot). No tokenizer dependency — a
//! word-count heuristic is all the budgets in §4.4/§4.5 need, and it
//! keeps this crate free of a model-specific vocabulary file.

/// Rough token estimate: English prose averages ~0.75 words per token, so
/// a word count is scaled by `4/3`. Never under-counts an empty string.
pub fn estimate_tokens(text: &str) -> usize {
    let words = text.split_whitespace().count();
    (words * 4).div_ceil(3)
}

/// Truncate `text` to approximately `budget` tokens, cutting on a
/// whitespace boundary so no word is split in half.
pub fn truncate_to_budget(text: &str, budget: usize) -> String {
    if estimate_tokens(text) <= budget {
        return text.to_string();
    }
    let max_words = (budget * 3) / 4;
    text.split_whitespace().take(max_words.max(1)).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_zero_tokens() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn estimate_scales_with_word_count() {
        let short = estimate_tokens("one two three");
        let long = estimate_tokens(&"word ".repeat(30));
        assert!(long > short);
    }

    #[test]
    fn truncate_respects_budget_and_word_boundaries() {
        let text = "alpha beta gamma delta epsilon zeta eta theta";
        let truncated = truncate_to_budget(text, 4);
        assert!(estimate_tokens(&truncated) <= 4);
        assert!(!truncated.ends_with(' '));
    }

    #[test]
    fn truncate_is_a_no_op_under_budget() {
        let text = "short text";
        assert_eq!(truncate_to_budget(text, 100), text);
    }
}
