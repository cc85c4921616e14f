use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tutor_core::lesson::Section;

/// A lesson as loaded from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Lesson {
    pub title: Option<String>,
    pub sections: Vec<Section>,
}

// A lesson file is either a bare array of sections or an object with a title.
#[derive(Deserialize)]
#[serde(untagged)]
enum LessonFile {
    Sections(Vec<Section>),
    Titled {
        #[serde(default)]
        title: Option<String>,
        sections: Vec<Section>,
    },
}

pub fn load_lesson(path: &Path) -> Result<Lesson> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read lesson file: {}", path.display()))?;
    parse_lesson(&raw).with_context(|| format!("Invalid lesson file: {}", path.display()))
}

pub fn parse_lesson(raw: &str) -> Result<Lesson> {
    let file: LessonFile =
        serde_json::from_str(raw).context("Lesson must be an array of sections or {title, sections}")?;
    let lesson = match file {
        LessonFile::Sections(sections) => Lesson {
            title: None,
            sections,
        },
        LessonFile::Titled { title, sections } => Lesson { title, sections },
    };

    let mut seen = HashSet::new();
    for (index, section) in lesson.sections.iter().enumerate() {
        if section.id.trim().is_empty() {
            bail!("Section {} has an empty id", index + 1);
        }
        if !seen.insert(section.id.as_str()) {
            bail!("Duplicate section id: {}", section.id);
        }
    }
    if lesson.sections.is_empty() {
        tracing::warn!("Lesson has no sections");
    }

    Ok(lesson)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;
    use tutor_core::lesson::SectionKind;

    #[test]
    fn test_load_titled_lesson() -> Result<()> {
        // 1. Arrange: Write a lesson file with a title and two sections.
        let dir = tempdir()?;
        let path = dir.path().join("light.json");
        let mut file = File::create(&path)?;
        writeln!(
            file,
            r#"{{
                "title": "Light",
                "sections": [
                    {{"id": "s1", "title": "What is light", "type": "content", "content": "Light is energy."}},
                    {{"id": "s2", "title": "Try it", "type": "activity", "content": "Use a prism.", "narration": "Grab a prism."}}
                ]
            }}"#
        )?;

        // 2. Act
        let lesson = load_lesson(&path)?;

        // 3. Assert
        assert_eq!(lesson.title.as_deref(), Some("Light"));
        assert_eq!(lesson.sections.len(), 2);
        assert_eq!(lesson.sections[0].kind, SectionKind::Content);
        assert_eq!(lesson.sections[0].narration, "");
        assert_eq!(lesson.sections[1].narration_text(), "Grab a prism.");
        Ok(())
    }

    #[test]
    fn test_load_bare_array() -> Result<()> {
        let lesson = parse_lesson(
            r#"[{"id": "m1", "title": "Colours", "type": "mnemonic", "content": "ROY G BIV"}]"#,
        )?;

        assert_eq!(lesson.title, None);
        assert_eq!(lesson.sections[0].id, "m1");
        assert_eq!(lesson.sections[0].kind, SectionKind::Mnemonic);
        Ok(())
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let err = parse_lesson(
            r#"[
                {"id": "s1", "title": "A", "type": "content", "content": "a"},
                {"id": "s1", "title": "B", "type": "script", "content": "b"}
            ]"#,
        )
        .unwrap_err();

        assert!(err.to_string().contains("Duplicate section id: s1"));
    }

    #[test]
    fn test_rejects_empty_id() {
        let err = parse_lesson(r#"[{"id": " ", "title": "A", "type": "content", "content": "a"}]"#)
            .unwrap_err();

        assert!(err.to_string().contains("empty id"));
    }

    #[test]
    fn test_rejects_unknown_section_type() {
        let result =
            parse_lesson(r#"[{"id": "s1", "title": "A", "type": "quiz", "content": "a"}]"#);

        assert!(result.is_err());
    }

    #[test]
    fn test_accepts_empty_lesson() -> Result<()> {
        let lesson = parse_lesson("[]")?;
        assert!(lesson.sections.is_empty());
        Ok(())
    }

    #[test]
    fn test_load_from_nonexistent_file() {
        // Arrange: Path to a file that does not exist.
        let path = Path::new("nonexistent_lesson_for_testing.json");

        // Act
        let result = load_lesson(path);

        // Assert
        assert!(result.is_err());
    }
}
