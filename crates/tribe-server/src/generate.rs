//! Retrieval-augmented reply generation.
//!
//! The flow for one reply:
//! 1. Embed the user's message.
//! 2. Query the vector index for the character's closest knowledge
//!    passages, filtered by character id.
//! 3. Keep only passages above the similarity threshold.
//! 4. Ask the chat model to answer in persona, with the passages inlined
//!    into the system prompt.
//!
//! Retrieval is best-effort: when the vector index is unconfigured or
//! fails, generation proceeds on the persona prompt alone.

use serde::Deserialize;
use serde_json::json;
use tribe_shared::characters::Character;

use crate::config::ServerConfig;
use crate::error::ServerError;

const EMBEDDING_MODEL: &str = "text-embedding-ada-002";
const CHAT_MODEL: &str = "gpt-4-1106-preview";
const TOP_K: usize = 3;
const SCORE_THRESHOLD: f64 = 0.75;
const TEMPERATURE: f64 = 0.9;
const MAX_TOKENS: u32 = 150;

const FALLBACK_REPLY: &str = "I'm sorry, I don't have a response for that right now.";

/// Generate one in-persona reply to `message`.
pub async fn chat_response(
    http: &reqwest::Client,
    config: &ServerConfig,
    character: &Character,
    message: &str,
) -> Result<String, ServerError> {
    let api_key = config
        .openai_api_key
        .as_deref()
        .ok_or(ServerError::NotConfigured("OPENAI_API_KEY"))?;

    let passages = match retrieve_context(http, config, character.id, message).await {
        Ok(passages) => passages,
        Err(e) => {
            tracing::warn!(character = character.id, error = %e, "retrieval failed, generating without context");
            Vec::new()
        }
    };
    tracing::debug!(
        character = character.id,
        passages = passages.len(),
        "retrieved context"
    );

    let system_prompt = build_system_prompt(character, &passages);

    let body = json!({
        "model": CHAT_MODEL,
        "temperature": TEMPERATURE,
        "max_tokens": MAX_TOKENS,
        "messages": [
            { "role": "system", "content": system_prompt },
            { "role": "user", "content": message },
        ],
    });

    let response = http
        .post(format!("{}/chat/completions", config.openai_base_url))
        .bearer_auth(api_key)
        .json(&body)
        .send()
        .await
        .map_err(|e| ServerError::Upstream(e.to_string()))?
        .error_for_status()
        .map_err(|e| ServerError::Upstream(e.to_string()))?;

    let completion: ChatCompletion = response
        .json()
        .await
        .map_err(|e| ServerError::Upstream(e.to_string()))?;

    let reply = completion
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .filter(|content| !content.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_REPLY.to_string());

    Ok(reply)
}

/// The system prompt: persona first, then retrieved reference material.
fn build_system_prompt(character: &Character, passages: &[String]) -> String {
    if passages.is_empty() {
        return character.prompt.to_string();
    }

    let mut prompt = String::from(character.prompt);
    prompt.push_str(
        "\n\nUse the following reference material from your actual \
         statements where it is relevant:\n",
    );
    for passage in passages {
        prompt.push_str("\n- ");
        prompt.push_str(passage);
    }
    prompt
}

/// Embed the message and query the vector index for the character's
/// closest passages above the similarity threshold.
async fn retrieve_context(
    http: &reqwest::Client,
    config: &ServerConfig,
    character_id: &str,
    message: &str,
) -> Result<Vec<String>, ServerError> {
    let (Some(index_url), Some(index_key)) =
        (&config.vector_index_url, &config.vector_api_key)
    else {
        return Ok(Vec::new());
    };
    let api_key = config
        .openai_api_key
        .as_deref()
        .ok_or(ServerError::NotConfigured("OPENAI_API_KEY"))?;

    let embedding = embed(http, config, api_key, message).await?;

    let body = json!({
        "vector": embedding,
        "topK": TOP_K,
        "includeMetadata": true,
        "filter": { "character_id": { "$eq": character_id } },
    });

    let response = http
        .post(format!("{index_url}/query"))
        .header("Api-Key", index_key)
        .json(&body)
        .send()
        .await
        .map_err(|e| ServerError::Upstream(e.to_string()))?
        .error_for_status()
        .map_err(|e| ServerError::Upstream(e.to_string()))?;

    let results: QueryResults = response
        .json()
        .await
        .map_err(|e| ServerError::Upstream(e.to_string()))?;

    Ok(select_passages(results.matches))
}

/// Passages that clear the similarity threshold, in match order.
fn select_passages(matches: Vec<QueryMatch>) -> Vec<String> {
    matches
        .into_iter()
        .filter(|m| m.score > SCORE_THRESHOLD)
        .filter_map(|m| m.metadata.and_then(|meta| meta.text))
        .collect()
}

async fn embed(
    http: &reqwest::Client,
    config: &ServerConfig,
    api_key: &str,
    input: &str,
) -> Result<Vec<f64>, ServerError> {
    let body = json!({
        "model": EMBEDDING_MODEL,
        "input": input,
    });

    let response = http
        .post(format!("{}/embeddings", config.openai_base_url))
        .bearer_auth(api_key)
        .json(&body)
        .send()
        .await
        .map_err(|e| ServerError::Upstream(e.to_string()))?
        .error_for_status()
        .map_err(|e| ServerError::Upstream(e.to_string()))?;

    let payload: EmbeddingResponse = response
        .json()
        .await
        .map_err(|e| ServerError::Upstream(e.to_string()))?;

    payload
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .ok_or_else(|| ServerError::Upstream("embedding response was empty".into()))
}

// ─── Upstream wire types ───

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f64>,
}

#[derive(Deserialize)]
struct QueryResults {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    score: f64,
    metadata: Option<MatchMetadata>,
}

#[derive(Debug, Deserialize)]
struct MatchMetadata {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tribe_shared::characters;

    fn query_match(score: f64, text: Option<&str>) -> QueryMatch {
        QueryMatch {
            score,
            metadata: text.map(|t| MatchMetadata {
                text: Some(t.to_string()),
            }),
        }
    }

    #[test]
    fn low_scores_are_dropped() {
        let passages = select_passages(vec![
            query_match(0.9, Some("keep me")),
            query_match(0.75, Some("exactly at the threshold")),
            query_match(0.5, Some("drop me")),
        ]);
        assert_eq!(passages, vec!["keep me".to_string()]);
    }

    #[test]
    fn missing_metadata_is_skipped() {
        let passages = select_passages(vec![
            query_match(0.9, None),
            QueryMatch {
                score: 0.9,
                metadata: Some(MatchMetadata { text: None }),
            },
            query_match(0.8, Some("has text")),
        ]);
        assert_eq!(passages, vec!["has text".to_string()]);
    }

    #[test]
    fn prompt_includes_passages() {
        let character = characters::find("joker").unwrap();

        let bare = build_system_prompt(character, &[]);
        assert_eq!(bare, character.prompt);

        let augmented =
            build_system_prompt(character, &["Why so serious?".to_string()]);
        assert!(augmented.starts_with(character.prompt));
        assert!(augmented.contains("- Why so serious?"));
    }
}
