use crate::answering::{AnsweringService, TurnRequest};
use crate::error::TransportError;
use crate::lesson::Section;
use async_trait::async_trait;

/// A simulated answering service.
///
/// Makes no network calls. Replies follow the `SECTION_ID` / `SECTION_CONTENT`
/// format using the lesson's own text, which is enough to drive a full session
/// locally without a backend.
pub struct OfflineTutor {
    sections: Vec<Section>,
}

impl OfflineTutor {
    pub fn new(sections: Vec<Section>) -> Self {
        Self { sections }
    }
}

#[async_trait]
impl AnsweringService for OfflineTutor {
    async fn answer(&self, request: &TurnRequest) -> Result<String, TransportError> {
        let section = request
            .section_id
            .as_deref()
            .and_then(|id| self.sections.iter().find(|s| s.id == id));

        let Some(section) = section else {
            return Ok(format!(
                "I don't have a lesson loaded, but here is what you said: {}",
                request.user_message
            ));
        };

        let body = if request.silent {
            format!("{}\n\n{}", section.title, section.content)
        } else {
            format!(
                "You asked: \"{}\". Let's look at {} again.\n\n{}",
                request.user_message, section.title, section.content
            )
        };
        Ok(format!("SECTION_ID: {}\nSECTION_CONTENT: {}", section.id, body))
    }
}
