//! Text helpers shared by narration, media search and the text fallback.

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can",
    "had", "her", "was", "one", "our", "out", "has", "him", "his", "how",
    "its", "may", "new", "now", "old", "see", "two", "way", "who", "did",
    "get", "let", "say", "she", "too", "use", "with", "that", "this",
    "from", "they", "will", "would", "there", "their", "what", "about",
    "which", "when", "your", "have", "more", "been", "were", "into", "than",
    "them", "then", "some", "these", "those", "also", "just", "very",
];

const MIN_KEYWORD_CHARS: usize = 3;
const MAX_KEYWORDS: usize = 4;
const MAX_PHRASE_CHARS: usize = 24;

/// Narration for a scene lacking explicit text, built from whatever
/// title, subtitle, points and items it carries.
pub fn derive_narration(
    title: Option<&str>,
    subtitle: Option<&str>,
    points: &[String],
    items: &[String],
) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    for part in [title, subtitle].into_iter().flatten() {
        let trimmed = part.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed.to_string());
        }
    }
    for list in [points, items] {
        let joined = join_non_empty(list, ", ");
        if !joined.is_empty() {
            parts.push(joined);
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(". "))
    }
}

/// Up to a few significant words from `text`, joined as one search phrase.
pub fn keyword_phrase(text: &str) -> Option<String> {
    let mut keywords: Vec<String> = Vec::new();
    for token in text.split(|c: char| !c.is_alphanumeric()) {
        let token = token.to_lowercase();
        if token.chars().count() < MIN_KEYWORD_CHARS
            || STOP_WORDS.contains(&token.as_str())
            || token.chars().all(|c| c.is_ascii_digit())
            || keywords.contains(&token)
        {
            continue;
        }
        keywords.push(token);
        if keywords.len() == MAX_KEYWORDS {
            break;
        }
    }

    if keywords.is_empty() {
        None
    } else {
        Some(keywords.join(" "))
    }
}

/// Ranked, de-duplicated search phrases: explicit query, then title, then
/// keywords pulled from the narration.
pub fn search_phrases(
    image_query: Option<&str>,
    title: Option<&str>,
    text: Option<&str>,
) -> Vec<String> {
    let keywords = text.and_then(keyword_phrase);
    let mut phrases: Vec<String> = Vec::new();
    for candidate in [image_query, title, keywords.as_deref()]
        .into_iter()
        .flatten()
    {
        let candidate = candidate.trim();
        if candidate.is_empty()
            || phrases.iter().any(|p| p.eq_ignore_ascii_case(candidate))
        {
            continue;
        }
        phrases.push(candidate.to_string());
    }
    phrases
}

/// Short display phrases: sentences split on punctuation, long sentences
/// further split on whitespace.
pub fn short_phrases(text: &str) -> Vec<String> {
    let mut phrases = Vec::new();
    for sentence in text.split(|c: char| {
        matches!(
            c,
            '.' | '!' | '?' | ',' | ';' | ':' | '\n' | '。' | '！' | '？'
                | '，' | '、' | '；' | '：'
        )
    }) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }
        if sentence.chars().count() <= MAX_PHRASE_CHARS {
            phrases.push(sentence.to_string());
        } else {
            phrases.extend(sentence.split_whitespace().map(String::from));
        }
    }
    phrases
}

/// Non-empty word list for the text-only fallback scene.
pub fn fallback_words(
    title: Option<&str>,
    subtitle: Option<&str>,
    text: Option<&str>,
    limit: usize,
    placeholder: &str,
) -> Vec<String> {
    let mut words: Vec<String> = Vec::new();
    let sources = [title, subtitle, text].into_iter().flatten();
    for phrase in sources.flat_map(short_phrases) {
        if !words.contains(&phrase) {
            words.push(phrase);
        }
    }
    words.truncate(limit.max(1));

    if words.is_empty() {
        let placeholder = placeholder.trim();
        words.push(if placeholder.is_empty() {
            "...".to_string()
        } else {
            placeholder.to_string()
        });
    }
    words
}

fn join_non_empty(values: &[String], sep: &str) -> String {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narration_joins_available_fields() {
        let points = vec!["fast".to_string(), "safe".to_string()];
        let text =
            derive_narration(Some("Rust"), None, &points, &[]).unwrap();
        assert_eq!(text, "Rust. fast, safe");
    }

    #[test]
    fn narration_is_absent_without_content() {
        assert_eq!(derive_narration(None, Some("  "), &[], &[]), None);
    }

    #[test]
    fn keywords_skip_short_and_stop_words() {
        let phrase =
            keyword_phrase("The ocean and the sky at dawn are calm").unwrap();
        assert_eq!(phrase, "ocean sky dawn calm");
    }

    #[test]
    fn phrases_are_ranked_and_deduplicated() {
        let phrases = search_phrases(
            Some("city lights"),
            Some("City Lights"),
            Some("Neon streets glow tonight"),
        );
        assert_eq!(phrases, vec!["city lights", "neon streets glow tonight"]);
    }

    #[test]
    fn fallback_words_are_never_empty() {
        assert_eq!(
            fallback_words(None, None, Some("hello"), 6, "x"),
            vec!["hello"]
        );
        assert_eq!(fallback_words(None, None, None, 6, "Scene"), vec!["Scene"]);
        assert_eq!(fallback_words(None, None, None, 6, ""), vec!["..."]);
    }

    #[test]
    fn fallback_words_split_sentences() {
        let words = fallback_words(
            Some("Intro"),
            None,
            Some("First point. Second point, third"),
            3,
            "",
        );
        assert_eq!(words, vec!["Intro", "First point", "Second point"]);
    }
}
