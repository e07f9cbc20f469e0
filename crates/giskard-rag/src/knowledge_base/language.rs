//! Dominant-language detection for a knowledge base.
//!
//! Detection runs once at construction over a small random sample of
//! documents. Undetected or unmapped languages count as English, and the
//! majority vote decides (alphabetically first code on ties).

use std::collections::BTreeMap;

use whatlang::Lang;

/// Fallback language when detection is inconclusive.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Detect the ISO 639-1 code of a text snippet, if recognizable.
#[must_use]
pub fn detect_language(text: &str) -> Option<&'static str> {
    let info = whatlang::detect(text)?;
    iso_639_1(info.lang())
}

/// Majority vote over per-snippet detections.
///
/// Snippets that fail detection vote for [`DEFAULT_LANGUAGE`]. Ties resolve
/// to the alphabetically first code, matching a sorted-unique argmax.
#[must_use]
pub fn majority_language<'a>(detections: impl IntoIterator<Item = Option<&'a str>>) -> String {
    let mut votes: BTreeMap<&str, usize> = BTreeMap::new();
    for detection in detections {
        *votes.entry(detection.unwrap_or(DEFAULT_LANGUAGE)).or_insert(0) += 1;
    }

    let mut best = DEFAULT_LANGUAGE;
    let mut best_count = 0usize;
    for (lang, count) in votes {
        if count > best_count {
            best = lang;
            best_count = count;
        }
    }
    best.to_string()
}

/// Map whatlang's ISO 639-3 codes onto the 639-1 codes the prompts use.
fn iso_639_1(lang: Lang) -> Option<&'static str> {
    Some(match lang {
        Lang::Eng => "en",
        Lang::Fra => "fr",
        Lang::Deu => "de",
        Lang::Spa => "es",
        Lang::Por => "pt",
        Lang::Ita => "it",
        Lang::Nld => "nl",
        Lang::Rus => "ru",
        Lang::Cmn => "zh",
        Lang::Jpn => "ja",
        Lang::Kor => "ko",
        Lang::Ara => "ar",
        Lang::Hin => "hi",
        Lang::Pol => "pl",
        Lang::Swe => "sv",
        Lang::Dan => "da",
        Lang::Fin => "fi",
        Lang::Tur => "tr",
        Lang::Ukr => "uk",
        Lang::Ces => "cs",
        Lang::Ron => "ro",
        Lang::Ell => "el",
        Lang::Heb => "he",
        Lang::Vie => "vi",
        Lang::Tha => "th",
        Lang::Ind => "id",
        _ => return None,
    })
}
