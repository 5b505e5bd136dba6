//! SSML request bodies for the upstream TTS service.
//!
//! Every caller-supplied value is XML-escaped before it is embedded, so a
//! reply or voice name cannot inject markup into the document.

/// Default `styledegree` (intensity) applied to the speaking style.
pub const DEFAULT_STYLE_DEGREE: f32 = 1.0;

/// Language used when it cannot be derived from the voice name.
const DEFAULT_LANG: &str = "en-US";

/// What to say, and how.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    /// Voice identifier, e.g. `en-US-GuyNeural`.
    pub voice_name: String,
    /// Speaking style, e.g. `cheerful`. Empty means the voice's default.
    pub style: String,
    /// Style intensity.
    pub style_degree: f32,
    pub text: String,
}

impl SpeechRequest {
    pub fn new(
        voice_name: impl Into<String>,
        style: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            voice_name: voice_name.into(),
            style: style.into(),
            style_degree: DEFAULT_STYLE_DEGREE,
            text: text.into(),
        }
    }

    pub fn with_style_degree(mut self, style_degree: f32) -> Self {
        self.style_degree = style_degree;
        self
    }

    /// Language tag derived from the voice name (`en-US-GuyNeural` -> `en-US`).
    pub fn lang(&self) -> String {
        let mut parts = self.voice_name.splitn(3, '-');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(lang), Some(region), Some(_))
                if is_alpha(lang, 2..=3) && is_alpha(region, 2..=2) =>
            {
                format!("{lang}-{region}")
            }
            _ => DEFAULT_LANG.to_string(),
        }
    }

    /// Render the SSML document.
    pub fn to_ssml(&self) -> String {
        let text = escape_xml(&self.text);
        let body = if self.style.trim().is_empty() {
            text
        } else {
            format!(
                "<mstts:express-as style=\"{}\" styledegree=\"{}\">{text}</mstts:express-as>",
                escape_xml(self.style.trim()),
                self.style_degree,
            )
        };

        format!(
            "<speak version=\"1.0\" xmlns=\"http://www.w3.org/2001/10/synthesis\" \
             xmlns:mstts=\"https://www.w3.org/2001/mstts\" xml:lang=\"{lang}\">\
             <voice name=\"{voice}\">{body}</voice></speak>",
            lang = escape_xml(&self.lang()),
            voice = escape_xml(&self.voice_name),
        )
    }
}

/// Escape the five XML special characters.
pub fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn is_alpha(part: &str, len: std::ops::RangeInclusive<usize>) -> bool {
    len.contains(&part.len()) && part.chars().all(|c| c.is_ascii_alphabetic())
}
