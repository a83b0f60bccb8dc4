//! Language code helpers

/// Display names for the language codes seen in media files
const LANGUAGE_NAMES: &[(&str, &str)] = &[
    ("en", "English"),
    ("eng", "English"),
    ("ar", "Arabic"),
    ("ara", "Arabic"),
    ("fr", "French"),
    ("fre", "French"),
    ("fra", "French"),
    ("de", "German"),
    ("deu", "German"),
    ("ger", "German"),
    ("es", "Spanish"),
    ("spa", "Spanish"),
    ("it", "Italian"),
    ("ita", "Italian"),
    ("pt", "Portuguese"),
    ("por", "Portuguese"),
    ("ru", "Russian"),
    ("rus", "Russian"),
    ("ja", "Japanese"),
    ("jpn", "Japanese"),
    ("ko", "Korean"),
    ("kor", "Korean"),
    ("zh", "Chinese"),
    ("zho", "Chinese"),
    ("chi", "Chinese"),
    ("hi", "Hindi"),
    ("hin", "Hindi"),
    ("bn", "Bengali"),
    ("ben", "Bengali"),
    ("id", "Indonesian"),
    ("ind", "Indonesian"),
    ("pl", "Polish"),
    ("pol", "Polish"),
];

/// Display name for a language code, if known
pub fn language_name(code: &str) -> Option<&'static str> {
    let code = code.trim().to_lowercase();
    LANGUAGE_NAMES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

/// Convert a 3-letter language code to its 2-letter (RFC5646) form
pub fn to_rfc5646(lang: &str) -> &str {
    match lang {
        "eng" => "en",
        "ara" => "ar",
        "fre" | "fra" => "fr",
        "ger" | "deu" => "de",
        "spa" => "es",
        "ita" => "it",
        "jpn" => "ja",
        "kor" => "ko",
        "chi" | "zho" => "zh",
        "rus" => "ru",
        "por" => "pt",
        "hin" => "hi",
        "ben" => "bn",
        "ind" => "id",
        "pol" => "pl",
        _ => lang,
    }
}

/// True when two codes name the same language ("en" vs "eng")
pub fn same_language(a: &str, b: &str) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    !a.is_empty() && to_rfc5646(&a) == to_rfc5646(&b)
}

/// Label for a track that carries no usable name.
///
/// Prefers the language's display name, then a meaningful title, then the
/// upper-cased code, then `fallback`.
pub fn display_name(language: &str, title: Option<&str>, fallback: &str) -> String {
    if let Some(name) = language_name(language) {
        return name.to_string();
    }

    if let Some(title) = title.map(str::trim) {
        if title.len() > 2 && !title.starts_with(fallback) {
            return title.to_string();
        }
    }

    let code = language.trim();
    if !code.is_empty() {
        return code.to_uppercase();
    }

    fallback.to_string()
}
