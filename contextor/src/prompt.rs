//! Fixed instructions for the rewrite and answer calls.

/// Answer returned when the document does not support one.
pub const REFUSAL: &str = "I could not find the answer in the provided document.";

pub const DEFAULT_PERSONA: &str = "Competitive Programming, Data Structure & Algorithm Expert";

/// System instruction for turning a follow-up into a standalone question.
pub const REWRITE_SYSTEM: &str = "You are a query rewriting expert. Based on the chat history, \
rephrase the user question into a complete standalone question that can be understood \
without the previous messages. Only output the rewritten question.";

/// System instruction for the grounded answer.
///
/// # Example
/// ```
/// use contextor::prompt::{answer_system, REFUSAL};
/// let s = answer_system("Graph Theory Tutor", "BFS visits nodes level by level.");
/// assert!(s.starts_with("You are a Graph Theory Tutor."));
/// assert!(s.contains(REFUSAL));
/// ```
pub fn answer_system(persona: &str, context: &str) -> String {
    format!(
        "You are a {persona}.\n\
         Answer based ONLY on the provided context.\n\n\
         Context:\n{context}\n\n\
         If the answer is not in the context, say \"{REFUSAL}\"\n\
         Keep your answers clear, concise, and educational."
    )
}
