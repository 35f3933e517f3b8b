use crate::QueryMatch;

/// Joins the matched chunk texts, in store order, with blank lines.
pub fn build_context(matches: &[QueryMatch]) -> String {
    matches
        .iter()
        .map(QueryMatch::text)
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_user_prompt(context: &str, question: &str) -> String {
    format!("Context:\n{context}\n\nQuestion:\n{question}")
}
