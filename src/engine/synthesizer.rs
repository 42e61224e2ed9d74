//! Response synthesis
//!
//! Tree-summarize: retrieved chunk texts are packed into context batches,
//! each batch is summarized against the query, and the summaries are packed
//! and summarized again until a single context remains. The final answer is
//! then generated from that context in one (streamed) call.

use super::error::EngineError;
use rig::agent::Agent;
use rig::completion::{CompletionModel, Prompt};
use tracing::{debug, instrument};

/// Character budget per packed context batch
pub const PACK_BUDGET: usize = 12_000;

/// Separator between texts inside a packed batch
const PACK_SEPARATOR: &str = "\n\n---\n\n";

/// Greedily pack texts into batches of at most `budget` characters.
///
/// A single text longer than the budget becomes its own batch rather than
/// being split.
pub fn pack_texts(texts: &[String], budget: usize) -> Vec<String> {
    let mut packs = Vec::new();
    let mut current = String::new();
    for text in texts {
        if text.is_empty() {
            continue;
        }
        if current.is_empty() {
            current.push_str(text);
        } else if current.len() + PACK_SEPARATOR.len() + text.len() <= budget {
            current.push_str(PACK_SEPARATOR);
            current.push_str(text);
        } else {
            packs.push(std::mem::take(&mut current));
            current.push_str(text);
        }
    }
    if !current.is_empty() {
        packs.push(current);
    }
    packs
}

/// Prompt asking the model to condense one context batch toward the query.
fn summarize_prompt(context: &str, query: &str) -> String {
    format!(
        "Context information is below.\n\
         ---------------------\n\
         {}\n\
         ---------------------\n\
         Given the context information and not prior knowledge, write a detailed \
         summary of everything relevant to the following query.\n\
         Query: {}\n\
         Summary:",
        context, query
    )
}

/// Prompt for the final answer over the reduced context.
pub fn answer_prompt(context: &str, query: &str) -> String {
    format!(
        "Context information from multiple sources is below.\n\
         ---------------------\n\
         {}\n\
         ---------------------\n\
         Given the information from multiple sources and not prior knowledge, \
         answer the query.\n\
         Query: {}\n\
         Answer:",
        context, query
    )
}

/// Reduce retrieved texts to a single context by recursive summarization.
///
/// With zero or one pack no model call is made; the packed text itself is the
/// context.
#[instrument(skip(agent, texts, query), fields(texts = texts.len()))]
pub async fn tree_reduce<M>(
    agent: &Agent<M>,
    mut texts: Vec<String>,
    query: &str,
) -> Result<String, EngineError>
where
    M: CompletionModel,
{
    loop {
        let mut packs = pack_texts(&texts, PACK_BUDGET);
        match packs.len() {
            0 => return Ok(String::new()),
            1 => return Ok(packs.remove(0)),
            n => {
                debug!("Summarizing {} context batches", n);
                let mut summaries = Vec::with_capacity(n);
                for pack in packs {
                    let prompt = summarize_prompt(&pack, query);
                    let summary = agent.prompt(prompt.as_str()).await?;
                    summaries.push(summary);
                }
                texts = summaries;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mock_model::MockCompletionModel;
    use rig::agent::AgentBuilder;

    #[test]
    fn test_pack_all_fit_in_one() {
        let texts = vec!["aaa".to_string(), "bbb".to_string()];
        let packs = pack_texts(&texts, 100);
        assert_eq!(packs.len(), 1);
        assert!(packs[0].contains("aaa"));
        assert!(packs[0].contains("bbb"));
    }

    #[test]
    fn test_pack_splits_on_budget() {
        let texts = vec!["a".repeat(60), "b".repeat(60), "c".repeat(60)];
        let packs = pack_texts(&texts, 100);
        assert_eq!(packs.len(), 3);
    }

    #[test]
    fn test_oversized_text_is_its_own_pack() {
        let texts = vec!["x".repeat(500), "y".to_string()];
        let packs = pack_texts(&texts, 100);
        assert_eq!(packs.len(), 2);
        assert_eq!(packs[0].len(), 500);
    }

    #[test]
    fn test_pack_skips_empty_texts() {
        let texts = vec![String::new(), "a".to_string()];
        let packs = pack_texts(&texts, 100);
        assert_eq!(packs, vec!["a".to_string()]);
    }

    #[test]
    fn test_prompts_embed_query_and_context() {
        let prompt = answer_prompt("the context", "the query");
        assert!(prompt.contains("the context"));
        assert!(prompt.contains("Query: the query"));
    }

    #[tokio::test]
    async fn test_tree_reduce_single_pack_makes_no_call() {
        // The mock would answer "" for any call; a single pack must come back
        // verbatim instead.
        let agent = AgentBuilder::new(MockCompletionModel::new()).build();
        let texts = vec!["only context".to_string()];
        let context = tree_reduce(&agent, texts, "q").await.unwrap();
        assert_eq!(context, "only context");
    }

    #[tokio::test]
    async fn test_tree_reduce_empty_input() {
        let agent = AgentBuilder::new(MockCompletionModel::new()).build();
        let context = tree_reduce(&agent, Vec::new(), "q").await.unwrap();
        assert_eq!(context, "");
    }

    #[tokio::test]
    async fn test_tree_reduce_collapses_batches() {
        let model = MockCompletionModel::new();
        model.set_text_response("summary").await;
        let agent = AgentBuilder::new(model).build();

        // Three oversized texts force one summarize round, after which the
        // identical summaries pack into a single context.
        let texts = vec![
            "a".repeat(PACK_BUDGET + 1),
            "b".repeat(PACK_BUDGET + 1),
            "c".repeat(PACK_BUDGET + 1),
        ];
        let context = tree_reduce(&agent, texts, "q").await.unwrap();
        assert!(context.contains("summary"));
        assert!(context.len() < PACK_BUDGET);
    }
}
