//! Stage prompt templates and rendering helpers.
//!
//! Templates use `{key}` placeholders; `{{`/`}}` escape literal braces.

use crate::store::Passage;

/// Sentinel that should never appear in real templates.
const ESCAPE_SENTINEL: &str = "\x00LBRACE\x00";
/// Sentinel for escaped closing brace.
const ESCAPE_SENTINEL_CLOSE: &str = "\x00RBRACE\x00";

pub const PLAN_SYSTEM: &str =
    "You are a planning assistant. Decide whether a question needs information \
     retrieved from a knowledge base before it can be answered well.";

pub const PLAN_PROMPT: &str = "\
Does answering the following question require retrieving reference material \
about renewable energy, climate change, or sustainability?

Question: {question}

Respond with exactly one word: YES or NO. Questions about facts, definitions, \
or comparisons need retrieval; greetings and questions about the assistant \
itself do not.";

pub const ANSWER_SYSTEM: &str =
    "You are a helpful assistant that provides accurate and comprehensive answers.";

pub const ANSWER_GROUNDED_PROMPT: &str = "\
Based on the following context, answer the question comprehensively. If the \
context does not contain relevant information, say so clearly.

{context}

Question: {question}

Provide a detailed, accurate, well-structured answer:";

pub const ANSWER_UNGROUNDED_PROMPT: &str = "\
Answer the following question based on your general knowledge:

Question: {question}

Provide a helpful and accurate answer:";

pub const REFLECT_SYSTEM: &str =
    "You are an evaluation assistant that judges whether an answer actually \
     addresses the question it was given.";

pub const REFLECT_PROMPT: &str = "\
Judge whether the answer below is relevant to the question.

Question: {question}

Answer: {answer}

{context}

Respond with exactly one label: RELEVANT or NOT_RELEVANT.";

/// Render a template, substituting `{key}` placeholders from `vars`.
///
/// Use `{{` for a literal `{` and `}}` for a literal `}`.
///
/// # Example
///
/// ```
/// use rag_agent::prompts::render;
///
/// let out = render("Hello {name}", &[("name", "Alice")]);
/// assert_eq!(out, "Hello Alice");
/// ```
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    // Pass 1: protect escaped braces
    let mut rendered = template.replace("{{", ESCAPE_SENTINEL);
    rendered = rendered.replace("}}", ESCAPE_SENTINEL_CLOSE);

    // Pass 2: substitute placeholders
    for (key, value) in vars {
        let placeholder = format!("{{{}}}", key);
        rendered = rendered.replace(&placeholder, value);
    }

    // Pass 3: restore escaped braces
    rendered = rendered.replace(ESCAPE_SENTINEL, "{");
    rendered = rendered.replace(ESCAPE_SENTINEL_CLOSE, "}");
    rendered
}

/// Wrap text in a labeled section for structured prompts.
pub fn section(label: &str, content: &str) -> String {
    format!("## {}\n{}", label, content)
}

/// Create a numbered list from items (1-indexed).
pub fn numbered_list(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i + 1, item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format retrieved passages as a context block for the answer/reflect
/// prompts. Empty input yields a placeholder line rather than an empty
/// section.
pub fn passage_block(passages: &[Passage]) -> String {
    if passages.is_empty() {
        return section("Context", "(no reference material was retrieved)");
    }
    let body = passages
        .iter()
        .map(|p| format!("Source: {}\nContent: {}", p.source_id, p.text))
        .collect::<Vec<_>>()
        .join("\n\n");
    section("Context", &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_basic() {
        let result = render("Question: {question}", &[("question", "Why solar?")]);
        assert_eq!(result, "Question: Why solar?");
    }

    #[test]
    fn test_render_multiple_vars() {
        let result = render(
            "Q: {question}\nA: {answer}",
            &[("question", "why"), ("answer", "because")],
        );
        assert_eq!(result, "Q: why\nA: because");
    }

    #[test]
    fn test_render_escaped_braces() {
        let result = render("JSON: {{\"key\": \"val\"}} for {name}", &[("name", "x")]);
        assert_eq!(result, "JSON: {\"key\": \"val\"} for x");
    }

    #[test]
    fn test_section() {
        assert_eq!(section("Context", "body"), "## Context\nbody");
    }

    #[test]
    fn test_numbered_list() {
        let items = vec!["First".to_string(), "Second".to_string()];
        assert_eq!(numbered_list(&items), "1. First\n2. Second");
    }

    #[test]
    fn test_passage_block() {
        let passages = vec![
            Passage {
                text: "Solar panels convert sunlight.".into(),
                source_id: "energy-basics".into(),
                score: 0.9,
            },
            Passage {
                text: "Wind turbines harvest kinetic energy.".into(),
                source_id: "wind-overview".into(),
                score: 0.4,
            },
        ];
        let block = passage_block(&passages);
        assert!(block.starts_with("## Context\n"));
        assert!(block.contains("Source: energy-basics"));
        assert!(block.contains("Content: Wind turbines harvest kinetic energy."));
    }

    #[test]
    fn test_passage_block_empty() {
        let block = passage_block(&[]);
        assert!(block.contains("no reference material"));
    }

    #[test]
    fn test_plan_prompt_renders() {
        let prompt = render(PLAN_PROMPT, &[("question", "What is geothermal energy?")]);
        assert!(prompt.contains("Question: What is geothermal energy?"));
        assert!(prompt.contains("YES or NO"));
    }
}
