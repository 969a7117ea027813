use std::time::Duration;

use async_trait::async_trait;
use c3d_core::{ObjectProposal, ScenePlan, ScenePlanner};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const PROMPT_WORDS: usize = 30;
const DEFAULT_NOT_SCENE_HINT: &str =
    "That doesn't look like a scene. Try describing a place, for example \"a cozy beach at sunset\".";

const CLASSIFY_RULES: &str = "You decide whether a message describes a scene that could be built in 3D \
(a place, environment or setting with physical objects). Reply with exactly SCENE if it does. \
Otherwise reply with NOT_SCENE: followed by one short sentence suggesting how to describe a scene instead.";

const PLANNING_RULES: &str = "You are a helpful scene planning assistant for 3D content creation. \
Always suggest objects in singular form (e.g. 'Palm Tree' instead of 'Palm Trees'). \
Always format object names with proper capitalization and spaces (e.g. 'Coffee Table' not 'coffee_table'). \
Focus only on suggesting appropriate objects for the scene.";

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: String,
}

/// Scene planner backed by an OpenAI-compatible chat endpoint.
pub struct AgentPlanner {
    client: reqwest::Client,
    url: String,
    model: String,
    num_objects: usize,
}

impl AgentPlanner {
    pub fn new(client: reqwest::Client, base_url: &str, model: &str, num_objects: usize) -> Self {
        Self {
            client,
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.to_string(),
            num_objects,
        }
    }

    async fn chat(&self, system: &str, user: &str) -> Result<String, AppError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.2,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::BackendError(format!("HTTP {}: {}", status, body)));
        }

        let reply: ChatResponse = response.json().await?;
        reply
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AppError::BackendError("empty chat completion".to_string()))
    }

    async fn plan(&self, scene: &str) -> Result<ScenePlan, AppError> {
        let verdict = self.chat(CLASSIFY_RULES, scene).await?;
        if let Some(hint) = parse_classification(&verdict) {
            return Ok(ScenePlan::NotScene { hint });
        }

        let listing = self.chat(PLANNING_RULES, &object_request(scene, self.num_objects)).await?;
        let names = parse_numbered_list(&listing, self.num_objects);
        info!("Planner suggested {} objects", names.len());

        let rules = prompt_rules();
        let mut proposals = Vec::with_capacity(names.len());
        for name in names {
            let reply = self
                .chat(&rules, &format!("Generate visual prompt suitable for 2D image generation for: {name}"))
                .await?;
            let prompt = parse_visual_prompt(&reply, &name);
            debug!("{}: {}", name, prompt);
            proposals.push(ObjectProposal::new(name, prompt));
        }

        Ok(ScenePlan::Scene(proposals))
    }
}

#[async_trait]
impl ScenePlanner for AgentPlanner {
    async fn propose(&self, scene_text: &str) -> c3d_core::Result<ScenePlan> {
        self.plan(scene_text)
            .await
            .map_err(|e| c3d_core::Error::Planner(e.to_string()))
    }
}

fn object_request(scene: &str, count: usize) -> String {
    format!(
        "Based on this scene description: \"{scene}\"\n\n\
         Please suggest exactly {count} objects that would be appropriate for this scene.\n\n\
         Format your response as:\n\
         Suggested objects:\n\
         1. object_name\n\
         2. object_name\n\
         ...\n\
         {count}. object_name"
    )
}

fn prompt_rules() -> String {
    format!(
        "Create a detailed, visually rich prompt for a text-to-image model describing one object. \
         Focus only on the physical and visual characteristics of the object. \
         The prompt must specify a plain background (e.g. 'on a white background'). \
         Keep the prompt to {PROMPT_WORDS} words or less. \
         Answer in exactly this format with no extra notes or formatting:\n\
         Object: <name>\nPrompt: <prompt>"
    )
}

/// `None` means the text is a scene; otherwise the hint to show.
fn parse_classification(reply: &str) -> Option<String> {
    let reply = reply.trim();
    let rest = reply.strip_prefix("NOT_SCENE")?;
    let hint = rest.trim_start_matches(':').trim();
    Some(if hint.is_empty() {
        DEFAULT_NOT_SCENE_HINT.to_string()
    } else {
        hint.to_string()
    })
}

/// Names from lines shaped like `12. Coffee Table`, in order, at most `limit`.
fn parse_numbered_list(reply: &str, limit: usize) -> Vec<String> {
    reply
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let digits = line.find(|c: char| !c.is_ascii_digit())?;
            if digits == 0 {
                return None;
            }
            let name = line[digits..].strip_prefix('.')?.trim().trim_matches('*').trim();
            (!name.is_empty()).then(|| name.to_string())
        })
        .take(limit)
        .collect()
}

fn parse_visual_prompt(reply: &str, name: &str) -> String {
    if reply.contains("Object:") && reply.contains("Prompt:") {
        if let Some((_, prompt)) = reply.rsplit_once("Prompt:") {
            let prompt = prompt.trim();
            if !prompt.is_empty() {
                return prompt.to_string();
            }
        }
    }
    format!("{name}, detailed 2D image on white background")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(parse_classification("SCENE"), None);
        assert_eq!(parse_classification("  SCENE\n"), None);
        assert_eq!(
            parse_classification("NOT_SCENE: Try describing a room."),
            Some("Try describing a room.".to_string())
        );
        assert_eq!(parse_classification("NOT_SCENE"), Some(DEFAULT_NOT_SCENE_HINT.to_string()));
    }

    #[test]
    fn test_numbered_list() {
        let reply = "Suggested objects:\n1. Beach Chair\n2. **Palm Tree**\n  3. Umbrella\n\nScene arrangement: chairs by the water\n4.\n";
        assert_eq!(parse_numbered_list(reply, 20), vec!["Beach Chair", "Palm Tree", "Umbrella"]);
        assert_eq!(parse_numbered_list(reply, 2), vec!["Beach Chair", "Palm Tree"]);
        assert!(parse_numbered_list("no list here", 20).is_empty());
    }

    #[test]
    fn test_visual_prompt() {
        let reply = "Object: Beach Chair\nPrompt: A comfortable beach chair with colorful fabric, on a white background";
        assert_eq!(
            parse_visual_prompt(reply, "Beach Chair"),
            "A comfortable beach chair with colorful fabric, on a white background"
        );
        assert_eq!(
            parse_visual_prompt("A nice chair", "Beach Chair"),
            "Beach Chair, detailed 2D image on white background"
        );
    }

    #[test]
    fn test_chat_request_shape() {
        let request = ChatRequest {
            model: "meta/llama-3.1-8b-instruct",
            messages: [
                ChatMessage {
                    role: "system",
                    content: CLASSIFY_RULES,
                },
                ChatMessage {
                    role: "user",
                    content: "a beach",
                },
            ],
            temperature: 0.2,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][1]["content"], "a beach");
        assert_eq!(json["model"], "meta/llama-3.1-8b-instruct");
    }
}
