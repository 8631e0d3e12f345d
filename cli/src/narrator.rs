//! Streaming client for an OpenAI-compatible chat completions endpoint.

use std::io::{BufRead, BufReader};
use std::thread;

use engine::narration::{
    self, NarrationError, NarrationRequest, NarrationSink, NarrationStream, Narrator, Speaker,
};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const MODEL: &str = "gpt-4o-mini";
const TEMPERATURE: f32 = 0.8;
const MAX_TOKENS: u32 = 400;

const SYSTEM_PROMPT: &str = "אתה מנהל משחק הרפתקאות טקסט. {scenario}

תפקידך:
• כתוב תמיד בעברית בלבד
• תן תשובות יצירתיות ומעניינות שממשיכות את העלילה
• שמור על אווירת המשחק והתרחיש הספציפי
• היה תמציתי - 2-4 משפטים תיאוריים

ניהול פריטים:
כאשר השחקן מוצא, מקבל או אוסף פריט, ציין זאת בפורמט זה:
[קיבלת: emoji שם_פריט]

דוגמאות לפריטים:
[קיבלת: 🗝️ מפתח_זהב]
[קיבלת: 🍞 לחם_טרי]
[קיבלת: ⚔️ חרב_קסומה]
[קיבלת: 🧪 שיקוי_ריפוי] (פריט מרפא)

ניהול קרבות:
כאשר השחקן נתקל באויב או מצב של קרב, השתמש בפורמט זה:
[COMBAT: שם_האויב:emoji:בריאות]

דוגמאות לקרבות:
[COMBAT: זומבי רעב:🧟:20]
[COMBAT: שומר מכושף:⚔️:30]
[COMBAT: דרקון שחור:🐉:50]

הערות חשובות:
- השתמש בסמן COMBAT רק כאשר מדובר בקרב פיזי אמיתי
- לא כל עימות צריך להיות קרב - השתמש בשיקול דעת
- הקרב יהיה אינטראקטיבי, אז אל תתאר את תוצאת הקרב
- לאחר קרב, השחקן יספר לך מה קרה והמשך את הסיפור בהתאם

פורמט חובה לכל תשובה:
1. תיאור המצב/תגובה (2-4 משפטים)
2. אזכור פריטים חדשים (אם יש) בפורמט [קיבלת: emoji שם]
3. אזכור קרבות (אם יש) בפורמט [COMBAT: שם:emoji:בריאות]
4. שורה ריקה
5. \"מה תרצה לעשות?\" או \"אפשרויות:\"
6. 2-3 פעולות מוצעות כנקודות עם אמוג'י רלוונטי

דוגמה:
אתה נכנס לחדר גדול. קירות האבן מכוסים בטחב ירוק זוהר. על השולחן מוצא אתה ספר עתיק.
[קיבלת: 📖 ספר_הקסמים]

מה תרצה לעשות?
📚 לקרוא בספר
🚪 לחפש דלת יציאה
🔍 לבדוק את הקירות הזוהרים";

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: &'static str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Default, Deserialize)]
struct Delta {
    content: Option<String>,
}

pub fn system_prompt(scenario_context: &str) -> String {
    SYSTEM_PROMPT.replace("{scenario}", scenario_context)
}

fn build_body(request: &NarrationRequest) -> ChatCompletionRequest {
    let mut messages = Vec::with_capacity(request.history.len() + 1);
    if !request.scenario_context.is_empty() {
        messages.push(ChatMessage {
            role: "system",
            content: system_prompt(&request.scenario_context),
        });
    }
    messages.extend(request.history.iter().map(|turn| ChatMessage {
        role: match turn.speaker {
            Speaker::Player => "user",
            Speaker::Narrator => "assistant",
        },
        content: turn.text.clone(),
    }));

    ChatCompletionRequest {
        model: MODEL,
        messages,
        temperature: TEMPERATURE,
        max_tokens: MAX_TOKENS,
        stream: true,
    }
}

#[derive(Clone)]
pub struct OpenAiNarrator {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiNarrator {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Reads `OPENAI_API_KEY` and, optionally, `OPENAI_BASE_URL`.
    pub fn from_env() -> Result<Self, NarrationError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(NarrationError::MissingCredentials)?;
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Ok(Self::new(api_key, base_url))
    }
}

impl Narrator for OpenAiNarrator {
    fn narrate(&self, request: NarrationRequest) -> NarrationStream {
        let (sink, stream) = narration::channel();
        let client = self.clone();
        let body = build_body(&request);
        thread::spawn(move || client.stream_completion(&body, sink));
        stream
    }
}

impl OpenAiNarrator {
    fn stream_completion(&self, body: &ChatCompletionRequest, sink: NarrationSink) {
        let url = format!("{}/chat/completions", self.base_url);
        let response = match self.client.post(&url).bearer_auth(&self.api_key).json(body).send() {
            Ok(response) => response,
            Err(e) => return sink.fail(transport_error(&e)),
        };

        match response.status() {
            StatusCode::UNAUTHORIZED => return sink.fail(NarrationError::Auth),
            StatusCode::TOO_MANY_REQUESTS => return sink.fail(NarrationError::RateLimit),
            status if !status.is_success() => {
                return sink.fail(NarrationError::Generic(format!("HTTP {status}")));
            }
            _ => {}
        }

        for line in BufReader::new(response).lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => return sink.fail(NarrationError::Network(e.to_string())),
            };
            let Some(data) = line.strip_prefix("data:").map(str::trim) else {
                continue;
            };
            if data == "[DONE]" {
                break;
            }
            let chunk: StreamChunk = match serde_json::from_str(data) {
                Ok(chunk) => chunk,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable stream event");
                    continue;
                }
            };
            let text: String = chunk
                .choices
                .into_iter()
                .filter_map(|choice| choice.delta.content)
                .collect();
            if !text.is_empty() && !sink.chunk(text) {
                debug!("narration abandoned by the engine");
                return;
            }
        }
        sink.finish();
    }
}

fn transport_error(e: &reqwest::Error) -> NarrationError {
    if e.is_connect() || e.is_timeout() || e.is_request() {
        NarrationError::Network(e.to_string())
    } else {
        NarrationError::Generic(e.to_string())
    }
}
