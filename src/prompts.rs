//! Prompt construction for course generation.
//!
//! The prompt is one user turn: a fixed instruction block describing the
//! JSON schema, followed by the caller's parameters and the (truncated)
//! source text. It is a pure function of its inputs so the exact bytes sent
//! to the model can be asserted in tests.

/// Default number of source characters passed to the model.
pub const DEFAULT_SOURCE_CHAR_BUDGET: usize = 25_000;

/// Instruction block. `{n_units}` is replaced with the requested unit count.
pub const COURSE_INSTRUCTION: &str = r#"You are PersonalLearn, an adaptive AI. Detect the language. Output ONLY valid JSON.
JSON structure:
{
  "title": "String",
  "level": "String",
  "description": "String",
  "language": "fr" or "en",
  "units": [
    {
      "title": "String",
      "content": "String (Detailed, comprehensive educational content adapted to the level. Must be long enough to study.)",
      "objectives": ["String", "String"],
      "quiz_questions": [
        {
          "question": "String",
          "choices": ["A","B","C","D"],
          "correct_choice": 0,
          "explanation": "String"
        }
      ]
    }
  ]
}
Constraints:
- EXACTLY {n_units} units.
- Each quiz question has EXACTLY 4 choices; correct_choice is the 0-based index of the right one.
- Content must be physically adapted (simplified or deepened) based on 'level'."#;

/// Cut `text` to at most `max_chars` Unicode scalar values.
///
/// Returns the input unchanged when it already fits.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Build the generation prompt with the default source budget.
pub fn build_prompt(source_text: &str, title: &str, level: &str, unit_count: usize) -> String {
    build_prompt_with_budget(
        source_text,
        title,
        level,
        unit_count,
        DEFAULT_SOURCE_CHAR_BUDGET,
    )
}

/// Build the generation prompt, keeping only the first `char_budget`
/// characters of `source_text`.
pub fn build_prompt_with_budget(
    source_text: &str,
    title: &str,
    level: &str,
    unit_count: usize,
    char_budget: usize,
) -> String {
    let instruction = COURSE_INSTRUCTION.replace("{n_units}", &unit_count.to_string());
    let source = truncate_chars(source_text, char_budget);

    format!(
        "{instruction}\n\nTitle: {title}\nLevel: {level}\nUnits: {unit_count}\nContent:\n{source}\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_is_deterministic() {
        let a = build_prompt("Some text", "Biology", "Beginner", 10);
        let b = build_prompt("Some text", "Biology", "Beginner", 10);
        assert_eq!(a, b);
    }

    #[test]
    fn prompt_embeds_parameters() {
        let p = build_prompt("Mitochondria are organelles.", "Biology", "Advanced", 4);
        assert!(p.starts_with("You are PersonalLearn"));
        assert!(p.contains("EXACTLY 4 units."));
        assert!(p.contains("Title: Biology\n"));
        assert!(p.contains("Level: Advanced\n"));
        assert!(p.contains("Units: 4\n"));
        assert!(p.ends_with("Content:\nMitochondria are organelles.\n"));
        assert!(!p.contains("{n_units}"));
    }

    #[test]
    fn source_is_truncated_to_budget() {
        let source = "a".repeat(DEFAULT_SOURCE_CHAR_BUDGET + 500);
        let p = build_prompt(&source, "T", "Beginner", 10);
        let embedded = p.rsplit("Content:\n").next().unwrap().trim_end_matches('\n');
        assert_eq!(embedded.len(), DEFAULT_SOURCE_CHAR_BUDGET);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("héllo", 10), "héllo");
        assert_eq!(truncate_chars("", 3), "");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn short_source_is_untouched() {
        let p = build_prompt_with_budget("abcdef", "T", "L", 1, 3);
        assert!(p.ends_with("Content:\nabc\n"));
    }
}
