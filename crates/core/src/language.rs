use serde::{Deserialize, Serialize};

/// The closed set of languages the tutor can speak and recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Locale {
    #[serde(rename = "en")]
    English,
    #[serde(rename = "hi")]
    Hindi,
    #[serde(rename = "ta")]
    Tamil,
    #[serde(rename = "te")]
    Telugu,
    #[serde(rename = "kn")]
    Kannada,
    #[serde(rename = "ml")]
    Malayalam,
    #[serde(rename = "mr")]
    Marathi,
    #[serde(rename = "bn")]
    Bengali,
    #[serde(rename = "gu")]
    Gujarati,
    #[serde(rename = "pa")]
    Punjabi,
    #[serde(rename = "es")]
    Spanish,
    #[serde(rename = "fr")]
    French,
}

/// Used whenever a caller hands us a code we don't recognize.
pub const FALLBACK_LOCALE: Locale = Locale::English;

pub const ALL_LOCALES: [Locale; 12] = [
    Locale::English,
    Locale::Hindi,
    Locale::Tamil,
    Locale::Telugu,
    Locale::Kannada,
    Locale::Malayalam,
    Locale::Marathi,
    Locale::Bengali,
    Locale::Gujarati,
    Locale::Punjabi,
    Locale::Spanish,
    Locale::French,
];

impl Locale {
    /// Short code sent to the answering service ("en", "hi", ...).
    pub fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Hindi => "hi",
            Self::Tamil => "ta",
            Self::Telugu => "te",
            Self::Kannada => "kn",
            Self::Malayalam => "ml",
            Self::Marathi => "mr",
            Self::Bengali => "bn",
            Self::Gujarati => "gu",
            Self::Punjabi => "pa",
            Self::Spanish => "es",
            Self::French => "fr",
        }
    }

    /// Full tag handed to the speech engines.
    pub fn speech_tag(&self) -> &'static str {
        match self {
            Self::English => "en-US",
            Self::Hindi => "hi-IN",
            Self::Tamil => "ta-IN",
            Self::Telugu => "te-IN",
            Self::Kannada => "kn-IN",
            Self::Malayalam => "ml-IN",
            Self::Marathi => "mr-IN",
            Self::Bengali => "bn-IN",
            Self::Gujarati => "gu-IN",
            Self::Punjabi => "pa-IN",
            Self::Spanish => "es-ES",
            Self::French => "fr-FR",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Hindi => "Hindi",
            Self::Tamil => "Tamil",
            Self::Telugu => "Telugu",
            Self::Kannada => "Kannada",
            Self::Malayalam => "Malayalam",
            Self::Marathi => "Marathi",
            Self::Bengali => "Bengali",
            Self::Gujarati => "Gujarati",
            Self::Punjabi => "Punjabi",
            Self::Spanish => "Spanish",
            Self::French => "French",
        }
    }

    /// Accepts a bare code or a region-qualified tag (`hi`, `hi-IN`, `HI_in`).
    pub fn from_code(code: &str) -> Option<Self> {
        let primary = code
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        ALL_LOCALES
            .into_iter()
            .find(|locale| locale.code() == primary)
    }

    /// Like [`Locale::from_code`], but never fails.
    pub fn resolve(code: &str) -> Self {
        Self::from_code(code).unwrap_or_else(|| {
            tracing::debug!("Unrecognized language code {:?}, using fallback", code);
            FALLBACK_LOCALE
        })
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

// Checked in order; the first hit wins.
const LANGUAGE_KEYWORDS: &[(Locale, &[&str])] = &[
    (Locale::Hindi, &["hindi", "हिंदी", "हिन्दी"]),
    (Locale::Tamil, &["tamil", "தமிழ்"]),
    (Locale::Telugu, &["telugu", "తెలుగు"]),
    (Locale::Kannada, &["kannada", "ಕನ್ನಡ"]),
    (Locale::Malayalam, &["malayalam", "മലയാളം"]),
    (Locale::Marathi, &["marathi", "मराठी"]),
    (Locale::Bengali, &["bengali", "bangla", "বাংলা"]),
    (Locale::Gujarati, &["gujarati", "ગુજરાતી"]),
    (Locale::Punjabi, &["punjabi", "ਪੰਜਾਬੀ"]),
    (Locale::Spanish, &["spanish", "español", "espanol"]),
    (Locale::French, &["french", "français", "francais"]),
    (Locale::English, &["english", "अंग्रेज़ी", "अंग्रेजी"]),
];

/// Looks for a language name in free text.
pub fn detect(text: &str) -> Option<Locale> {
    let lowered = text.to_lowercase();
    LANGUAGE_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| lowered.contains(keyword)))
        .map(|(locale, _)| *locale)
}
