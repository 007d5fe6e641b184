//! Prompt templates for grounded answer generation

use crate::types::RankedChunk;

/// Prompt builder for multi-hop queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the context block from fused chunks, in rank order
    pub fn build_context(chunks: &[RankedChunk]) -> String {
        let mut context = String::new();

        for (i, ranked) in chunks.iter().enumerate() {
            context.push_str(&format!(
                "[{}] {} ({})\n\nContent:\n{}\n\n---\n\n",
                i + 1,
                ranked.chunk.document_name(),
                ranked.chunk.category(),
                ranked.chunk.text
            ));
        }

        context
    }

    /// System instruction shared by every backend
    pub fn system_instruction() -> &'static str {
        "You are an assistant that answers questions about supervision transcripts and the \
         policies that govern them. Use ONLY the provided context. When a transcript and a \
         policy both bear on the question, connect them explicitly. If the context does not \
         contain the answer, say so plainly."
    }

    /// Build the user prompt for one query
    pub fn build_rag_prompt(question: &str, context: &str) -> String {
        format!(
            r#"GROUNDING RULES:
1. ONLY use information that is EXPLICITLY stated in the CONTEXT below
2. If the answer is not in the context: respond with "This information is not available in the provided documents."
3. Cite passages by their number and document name, e.g. [1] Session notes.txt
4. Keep transcript evidence and policy requirements distinct, then relate them

CONTEXT FROM DOCUMENTS:
{context}

QUESTION: {question}

Provide a grounded answer using ONLY the document content above:"#,
            context = context,
            question = question
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, Chunk};

    #[test]
    fn test_build_context_lists_chunks_in_order() {
        let chunks = vec![
            RankedChunk::new(
                Chunk::new("a", "Nathan discussed stress.", "d1", "Nathan session.txt", Category::Transcript, 0),
                0.9,
            ),
            RankedChunk::new(
                Chunk::new("b", "Staff may request support.", "d2", "Wellbeing.pdf", Category::Policy, 3),
                0.8,
            ),
        ];

        let context = PromptBuilder::build_context(&chunks);
        let first = context.find("[1] Nathan session.txt (transcript)").unwrap();
        let second = context.find("[2] Wellbeing.pdf (policy)").unwrap();
        assert!(first < second);
        assert!(context.contains("Staff may request support."));
    }

    #[test]
    fn test_build_rag_prompt() {
        let prompt = PromptBuilder::build_rag_prompt("What is the policy?", "CTX");
        assert!(prompt.contains("QUESTION: What is the policy?"));
        assert!(prompt.contains("CTX"));
    }
}
