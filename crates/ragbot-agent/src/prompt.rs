//! Prompt template.

/// Closing instruction appended to every prompt.
pub const INSTRUCTION: &str =
    "Answer strictly based on the context Do not make anything up by yourself.";

/// Join retrieved texts in store order, one per line.
pub fn build_context(sources: &[String]) -> String {
    sources.join("\n")
}

/// `Context: …\n\nQuestion: …\n\n<instruction>`
pub fn build_prompt(context: &str, question: &str) -> String {
    format!("Context: {context}\n\nQuestion: {question}\n\n{INSTRUCTION}")
}
