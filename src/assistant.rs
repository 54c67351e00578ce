use axum::{Json, debug_handler, extract::State, http::StatusCode, response::{IntoResponse, Response}};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::AppJson;

const GENERATE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

const FALLBACK_REPLY: &str = "Sorry, I couldn't understand that. Please use the options in the menu: Home, Find Item, Report Item, or Chat.";

const PERSONA: &str = "You are Unno, the friendly assistant of UniBazaar, a campus marketplace. \
You help users find items, report lost or found items, and answer general questions about UniBazaar. \
Be polite, concise and helpful. If you don't know something, point the user to Home, Find Item, Report Item or Chat. \
Add a blank line after the first sentence.";

/// Keyword routes checked before the remote service, first match wins.
const CANNED: &[(&[&str], &str)] = &[
    (
        &["lost", "missing"],
        "I'm sorry to hear that!\n\nYou can report your lost item in the **Report Item** section. Would you like me to take you there?",
    ),
    (
        &["buy", "purchase"],
        "You can browse items in the **Find Item** section.\n\nOnce you find what you need, you can connect with the seller through our chat feature.",
    ),
    (
        &["support", "contact"],
        "No worries!\n\nYou can use the **Chat** option in the menu, and our team will assist you.",
    ),
    (
        &["what is unibazaar", "about unibazaar"],
        "UniBazaar is your campus marketplace where you can buy, sell, and report lost or found items.\n\nThink of it as a digital bazaar for students.",
    ),
];

pub fn canned_reply(message: &str) -> Option<&'static str> {
    let message = message.trim().to_lowercase();
    CANNED
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|keyword| message.contains(keyword)))
        .map(|(_, reply)| *reply)
}

/// Text-in, text-out helper behind `/chat`.
#[derive(Clone)]
pub struct Assistant {
    http_client: reqwest::Client,
    api_key: Option<String>,
}

impl Assistant {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_key,
        }
    }

    pub async fn reply(&self, message: &str) -> Result<String, reqwest::Error> {
        if let Some(reply) = canned_reply(message) {
            return Ok(reply.to_owned());
        }
        let Some(api_key) = &self.api_key else {
            return Ok(FALLBACK_REPLY.to_owned());
        };

        let prompt = format!("{PERSONA}\n\nUser message: \"{}\"", message.trim());
        let body: serde_json::Value = self
            .http_client
            .post(GENERATE_URL)
            .header("x-goog-api-key", api_key)
            .json(&json!({ "contents": [{ "parts": [{ "text": prompt }] }] }))
            .send()
            .await?
            .json()
            .await?;

        Ok(body
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(|text| text.as_str())
            .unwrap_or(FALLBACK_REPLY)
            .to_owned())
    }
}

#[derive(Deserialize)]
pub(crate) struct ChatRequest {
    #[serde(default)]
    message: String,
}

#[derive(Serialize)]
struct ChatResponse {
    response: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn chat(
    State(assistant): State<Assistant>,
    AppJson(ChatRequest { message }): AppJson<ChatRequest>,
) -> Response {
    match assistant.reply(&message).await {
        Ok(response) => Json(ChatResponse { response }).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "assistant request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ChatResponse { response: "Server error.".to_owned() }),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_by_keyword() {
        assert!(canned_reply("I LOST my wallet").unwrap().contains("Report Item"));
        assert!(canned_reply("how do I purchase a book").unwrap().contains("Find Item"));
        assert!(canned_reply("contact someone").unwrap().contains("Chat"));
        assert!(canned_reply("  What is UniBazaar?").unwrap().starts_with("UniBazaar is"));
        assert!(canned_reply("hello there").is_none());
    }

    #[test]
    fn earlier_routes_win() {
        // "missing" beats "buy"
        assert!(canned_reply("missing item, want to buy a new one").unwrap().contains("Report Item"));
    }

    #[tokio::test]
    async fn without_a_key_unknown_questions_get_the_fallback() {
        let assistant = Assistant::new(None);
        assert_eq!(assistant.reply("tell me a joke").await.unwrap(), FALLBACK_REPLY);
    }
}
