use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Content,
    Activity,
    Mnemonic,
    Script,
}

// One addressable unit of lesson content. `id` is the key the answering
// service echoes back in `SECTION_ID`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: SectionKind,
    pub content: String,
    #[serde(default)]
    pub narration: String,
}

impl Section {
    pub fn new(id: &str, title: &str, kind: SectionKind, content: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            kind,
            content: content.to_string(),
            narration: String::new(),
        }
    }

    pub fn with_narration(mut self, narration: &str) -> Self {
        self.narration = narration.to_string();
        self
    }

    /// What gets read aloud when the section is narrated.
    pub fn narration_text(&self) -> &str {
        if self.narration.trim().is_empty() {
            &self.content
        } else {
            &self.narration
        }
    }
}

/// Ordered lesson sections plus the learner's position in them.
///
/// Moves never wrap; every method reports whether the index actually changed
/// so the caller can cancel playback and request a render.
#[derive(Debug, Clone)]
pub struct LessonNavigator {
    sections: Vec<Section>,
    index: usize,
}

impl LessonNavigator {
    pub fn new(sections: Vec<Section>) -> Self {
        Self { sections, index: 0 }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn current_section(&self) -> Option<&Section> {
        self.sections.get(self.index)
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current_section().map(|s| s.id.as_str())
    }

    pub fn next(&mut self) -> bool {
        if self.index + 1 < self.sections.len() {
            self.index += 1;
            true
        } else {
            false
        }
    }

    pub fn previous(&mut self) -> bool {
        if self.index > 0 && !self.sections.is_empty() {
            self.index -= 1;
            true
        } else {
            false
        }
    }

    pub fn jump(&mut self, index: usize) -> bool {
        if index >= self.sections.len() {
            tracing::warn!("Ignoring jump to section {index} of {}", self.sections.len());
            return false;
        }
        if index == self.index {
            return false;
        }
        self.index = index;
        true
    }
}
