use crate::models::SearchHit;

const INSTRUCTIONS: &str = "\
You are an expert insurance claims processor. Your task is to evaluate a user's query based ONLY on the provided policy clauses.
Do not use any external knowledge.
Provide your response in a structured JSON format with the following keys: \"decision\", \"amount\", and \"justification\".
The justification list should contain objects, each with a \"finding\" and \"clause_text\" key.
If an amount is not applicable, set it to 0.";

/// Renders the retrieved clauses as CONTEXT and the question as QUERY.
pub fn build_prompt(hits: &[SearchHit], question: &str) -> String {
    let context = hits
        .iter()
        .map(|hit| hit.chunk.text.trim())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "{INSTRUCTIONS}\n\nCONTEXT (Policy Clauses):\n{context}\n\nQUERY:\n{}\n\nJSON RESPONSE:\n",
        question.trim()
    )
}
