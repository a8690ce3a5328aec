use anyhow::Result;
use lumina_contracts::attachment::Attachment;
use lumina_contracts::chat::{ChatMessage, ChatTranscript};
use lumina_contracts::events::{EventWriter, SessionEvent};
use lumina_contracts::settings::GenerationSettings;
use tracing::{info, warn};

use crate::adapter::{GenerationApi, GenerationOutput, ImageAdapter};

pub const EMPTY_RESULT_MESSAGE: &str = "Failed to generate content.";
pub const ERROR_MESSAGE: &str =
    "Sorry, I encountered an error generating that image. Please try again.";

/// Message-sending flow over an [`ImageAdapter`].
///
/// Owns the transcript. `send` takes `&mut self`, so a session never has more
/// than one request outstanding.
pub struct ChatSession<A: GenerationApi> {
    adapter: ImageAdapter<A>,
    transcript: ChatTranscript,
    events: Option<EventWriter>,
    last_error: Option<String>,
}

impl<A: GenerationApi> ChatSession<A> {
    /// Fails only if the `session_started` row cannot be written.
    pub fn new(adapter: ImageAdapter<A>, events: Option<EventWriter>) -> Result<Self> {
        if let Some(events) = events.as_ref() {
            events.record(&SessionEvent::SessionStarted {
                provider: adapter.api().name(),
                model: adapter.model(),
            })?;
        }
        info!(provider = adapter.api().name(), model = adapter.model(), "chat session started");
        Ok(Self {
            adapter,
            transcript: ChatTranscript::new(),
            events,
            last_error: None,
        })
    }

    pub fn adapter(&self) -> &ImageAdapter<A> {
        &self.adapter
    }

    pub fn transcript(&self) -> &ChatTranscript {
        &self.transcript
    }

    /// Error text of the most recent failed send, cleared by the next send.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Sends one prompt and appends the user and assistant messages.
    ///
    /// Returns `None` without contacting the API when there is neither text
    /// nor an attachment. Upstream failures become an assistant message, and
    /// event-log failures are logged, so every send ends with a reply.
    pub fn send(
        &mut self,
        prompt: &str,
        settings: &GenerationSettings,
        attachment: Option<Attachment>,
    ) -> Option<&ChatMessage> {
        if prompt.trim().is_empty() && attachment.is_none() {
            return None;
        }
        self.last_error = None;

        let snapshot = settings.clone();
        self.append(ChatMessage::user(prompt, snapshot.clone(), attachment.clone()));

        let reply = match self.adapter.generate(prompt, &snapshot, attachment.as_ref()) {
            Ok(output) => {
                if output.is_empty() {
                    warn!("generation returned neither image nor text");
                }
                let content = assistant_content(&output, &snapshot);
                ChatMessage::assistant(content, output.image_url, Some(snapshot))
            }
            Err(err) => {
                let detail = format!("{err:#}");
                self.log_event(&SessionEvent::GenerationFailed { error: &detail });
                self.last_error = Some(detail);
                ChatMessage::assistant(ERROR_MESSAGE, None, None)
            }
        };
        Some(self.append(reply))
    }

    fn append(&mut self, message: ChatMessage) -> &ChatMessage {
        let message = self.transcript.push(message);
        if let Some(events) = self.events.as_ref() {
            if let Err(err) = events.record(&SessionEvent::MessageAppended(message)) {
                warn!(error = %format!("{err:#}"), "failed to record chat message");
            }
        }
        message
    }

    fn log_event(&self, event: &SessionEvent<'_>) {
        if let Some(events) = self.events.as_ref() {
            if let Err(err) = events.record(event) {
                warn!(error = %format!("{err:#}"), "failed to record session event");
            }
        }
    }
}

fn assistant_content(output: &GenerationOutput, settings: &GenerationSettings) -> String {
    if let Some(text) = output.text.as_ref() {
        return text.clone();
    }
    if output.image_url.is_some() {
        return format!(
            "Generated a {} image in {} style.",
            settings.resolution, settings.style
        );
    }
    EMPTY_RESULT_MESSAGE.to_string()
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Mutex;

    use anyhow::bail;
    use lumina_contracts::chat::Role;
    use lumina_contracts::settings::{AspectRatio, ImageResolution};
    use serde_json::Value;

    use super::*;
    use crate::errors::UpstreamError;
    use crate::wire::{Candidate, Content, GenerateContentRequest, GenerateContentResponse, Part};

    struct ScriptedApi {
        replies: Mutex<Vec<Result<Vec<Part>>>>,
        requests: Mutex<Vec<GenerateContentRequest>>,
    }

    impl ScriptedApi {
        fn new(replies: Vec<Result<Vec<Part>>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn request_count(&self) -> usize {
            self.requests.lock().map(|requests| requests.len()).unwrap_or(0)
        }
    }

    impl GenerationApi for ScriptedApi {
        fn name(&self) -> &str {
            "scripted"
        }

        fn generate_content(
            &self,
            _model: &str,
            request: &GenerateContentRequest,
        ) -> Result<GenerateContentResponse> {
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(request.clone());
            }
            let next = match self.replies.lock() {
                Ok(mut replies) if !replies.is_empty() => replies.remove(0),
                _ => bail!("no scripted reply left"),
            };
            let parts = next?;
            Ok(GenerateContentResponse {
                candidates: vec![Candidate {
                    content: Some(Content { role: None, parts }),
                    finish_reason: None,
                }],
            })
        }
    }

    fn session(replies: Vec<Result<Vec<Part>>>) -> anyhow::Result<ChatSession<ScriptedApi>> {
        ChatSession::new(ImageAdapter::new(ScriptedApi::new(replies), "test-model"), None)
    }

    fn settings() -> GenerationSettings {
        GenerationSettings {
            aspect_ratio: AspectRatio::Square,
            resolution: ImageResolution::Res8K,
            style: "cyberpunk".to_string(),
        }
    }

    #[test]
    fn blank_prompt_without_attachment_is_not_sent() -> anyhow::Result<()> {
        let mut session = session(Vec::new())?;
        assert!(session.send("   ", &settings(), None).is_none());
        assert!(session.transcript().is_empty());
        assert_eq!(session.adapter().api().request_count(), 0);
        Ok(())
    }

    #[test]
    fn image_without_text_gets_summary_content() -> anyhow::Result<()> {
        let mut session = session(vec![Ok(vec![Part::inline("image/png", "AAAA")])])?;
        let reply = session
            .send("neon alley", &settings(), None)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("expected a reply"))?;

        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.content, "Generated a 8K image in cyberpunk style.");
        assert_eq!(reply.image_url.as_deref(), Some("data:image/png;base64,AAAA"));
        assert_eq!(reply.settings, Some(settings()));

        let messages = session.transcript().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "neon alley");
        assert_eq!(messages[0].settings, Some(settings()));
        Ok(())
    }

    #[test]
    fn response_text_is_used_as_content() -> anyhow::Result<()> {
        let mut session = session(vec![Ok(vec![
            Part::text("Here you go."),
            Part::inline("image/jpeg", "BBBB"),
        ])])?;
        let reply = session.send("neon alley", &settings(), None).cloned();
        assert_eq!(reply.map(|message| message.content), Some("Here you go.".to_string()));
        Ok(())
    }

    #[test]
    fn empty_response_produces_explicit_failure_message() -> anyhow::Result<()> {
        let mut session = session(vec![Ok(Vec::new())])?;
        let reply = session.send("neon alley", &settings(), None).cloned();
        let reply = reply.ok_or_else(|| anyhow::anyhow!("expected a reply"))?;
        assert_eq!(reply.content, EMPTY_RESULT_MESSAGE);
        assert!(reply.image_url.is_none());
        assert!(session.last_error().is_none());
        Ok(())
    }

    #[test]
    fn upstream_failure_becomes_error_message() -> anyhow::Result<()> {
        let failure = UpstreamError::Status {
            provider: "Gemini",
            code: 503,
            body: "overloaded".to_string(),
        };
        let mut session = session(vec![Err(failure.into()), Ok(vec![Part::text("ok")])])?;

        let reply = session.send("neon alley", &settings(), None).cloned();
        let reply = reply.ok_or_else(|| anyhow::anyhow!("expected a reply"))?;
        assert_eq!(reply.content, ERROR_MESSAGE);
        assert!(reply.settings.is_none());
        assert_eq!(
            session.last_error(),
            Some("Gemini request failed (503): overloaded")
        );

        session.send("again", &settings(), None);
        assert!(session.last_error().is_none());
        assert_eq!(session.transcript().len(), 4);
        assert_eq!(session.adapter().api().request_count(), 2);
        Ok(())
    }

    #[test]
    fn attachment_only_message_is_sent_and_recorded() -> anyhow::Result<()> {
        let mut session = session(vec![Ok(vec![Part::inline("image/png", "CCCC")])])?;
        let attachment = Attachment::new("data:image/png;base64,REF=", "image/png");
        session.send("", &settings(), Some(attachment.clone()));

        let user = &session.transcript().messages()[0];
        assert_eq!(user.attachment.as_ref(), Some(&attachment));
        let requests = session
            .adapter()
            .api()
            .requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default();
        let inline = requests[0].contents[0].parts[0].inline_data.clone();
        assert_eq!(inline.map(|inline| inline.data), Some("REF=".to_string()));
        Ok(())
    }

    #[test]
    fn events_record_session_messages_and_failures() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        let api = ScriptedApi::new(vec![
            Ok(vec![Part::inline("image/png", "AAAA")]),
            Err(anyhow::anyhow!("connection reset")),
        ]);
        let mut session = ChatSession::new(
            ImageAdapter::new(api, "test-model"),
            Some(EventWriter::new(&path, "session-1")),
        )?;
        session.send("first", &settings(), None);
        session.send("second", &settings(), None);

        let rows: Vec<Value> = fs::read_to_string(&path)?
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();
        let types: Vec<&str> = rows
            .iter()
            .filter_map(|row| row.get("type").and_then(Value::as_str))
            .collect();
        assert_eq!(
            types,
            vec![
                "session_started",
                "message_appended",
                "message_appended",
                "message_appended",
                "generation_failed",
                "message_appended",
            ]
        );
        assert_eq!(rows[0]["model"], Value::String("test-model".to_string()));
        assert_eq!(rows[1]["role"], Value::String("user".to_string()));
        assert_eq!(rows[2]["imageUrl"], Value::String("data:image/png;base64,AAAA".to_string()));
        assert_eq!(rows[4]["error"], Value::String("connection reset".to_string()));
        assert!(rows.iter().all(|row| row["session_id"] == "session-1"));
        Ok(())
    }

    #[test]
    fn event_log_failure_keeps_generated_reply() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        let api = ScriptedApi::new(vec![Ok(vec![Part::inline("image/png", "AAAA")])]);
        let mut session = ChatSession::new(
            ImageAdapter::new(api, "test-model"),
            Some(EventWriter::new(&path, "session-1")),
        )?;
        fs::remove_file(&path)?;
        fs::create_dir(&path)?;

        let reply = session
            .send("neon alley", &settings(), None)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("expected a reply"))?;

        assert_eq!(reply.image_url.as_deref(), Some("data:image/png;base64,AAAA"));
        assert_eq!(session.transcript().len(), 2);
        assert!(session.last_error().is_none());
        Ok(())
    }
}
