use super::PageFacts;
use super::rules::{
    self, IDEAL_META_DESCRIPTION_CHARS, IDEAL_TITLE_CHARS, SHORT_CONTENT_WORDS, friendliness,
    google, quality,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scores {
    pub seo_friendliness: u8,
    pub content_quality: u8,
    pub google_terms: u8,
    pub google_terms_issues: Vec<String>,
    pub overall: u8,
}

pub fn score(facts: &PageFacts) -> Scores {
    let seo_friendliness = seo_friendliness(facts);
    let content_quality = content_quality(facts);
    let (google_terms, google_terms_issues) = google_terms(facts);
    Scores {
        seo_friendliness,
        content_quality,
        google_terms,
        google_terms_issues,
        overall: overall(seo_friendliness, content_quality, google_terms),
    }
}

pub fn overall(seo_friendliness: u8, content_quality: u8, google_terms: u8) -> u8 {
    let sum = [seo_friendliness, content_quality, google_terms]
        .into_iter()
        .map(|score| f64::from(score.min(100)))
        .sum::<f64>();
    (sum / 3.0).round() as u8
}

fn clamp_score(score: i32) -> u8 {
    score.clamp(0, 100) as u8
}

fn title_chars(facts: &PageFacts) -> Option<usize> {
    facts.title.as_deref().map(|t| t.chars().count())
}

fn meta_chars(facts: &PageFacts) -> Option<usize> {
    facts.meta_description.as_deref().map(|m| m.chars().count())
}

pub fn seo_friendliness(facts: &PageFacts) -> u8 {
    let mut score = 0;

    score += match title_chars(facts) {
        Some(len) if IDEAL_TITLE_CHARS.contains(&len) => friendliness::IDEAL_TITLE,
        Some(_) => friendliness::ANY_TITLE,
        None => 0,
    };
    score += match meta_chars(facts) {
        Some(len) if IDEAL_META_DESCRIPTION_CHARS.contains(&len) => friendliness::IDEAL_META,
        Some(_) => friendliness::ANY_META,
        None => 0,
    };
    score += match facts.headings.h1 {
        0 => 0,
        1 => friendliness::SINGLE_H1,
        _ => friendliness::MULTIPLE_H1,
    };
    score += match facts.headings.h2 {
        0 => 0,
        1 => friendliness::ONE_H2,
        _ => friendliness::SEVERAL_H2,
    };
    if facts.has_viewport_meta {
        score += friendliness::VIEWPORT;
    }
    score += if facts.word_count >= friendliness::LONG_CONTENT_WORDS {
        friendliness::LONG_CONTENT
    } else if facts.word_count >= SHORT_CONTENT_WORDS {
        friendliness::MEDIUM_CONTENT
    } else {
        friendliness::SHORT_CONTENT
    };
    if facts.images_missing_alt == 0 {
        score += friendliness::ALL_ALT;
    } else if facts.images_missing_alt < friendliness::FEW_MISSING_ALT_BELOW {
        score += friendliness::FEW_MISSING_ALT;
    }
    if facts.duplicate_percentage < friendliness::LOW_DUPLICATE_BELOW {
        score += friendliness::LOW_DUPLICATE;
    } else if facts.duplicate_percentage < friendliness::SOME_DUPLICATE_BELOW {
        score += friendliness::SOME_DUPLICATE;
    }

    clamp_score(score)
}

pub fn content_quality(facts: &PageFacts) -> u8 {
    let mut score = if facts.word_count >= quality::RICH_CONTENT_WORDS {
        quality::RICH_CONTENT
    } else if facts.word_count >= quality::LONG_CONTENT_WORDS {
        quality::LONG_CONTENT
    } else if facts.word_count >= SHORT_CONTENT_WORDS {
        quality::MEDIUM_CONTENT
    } else {
        quality::SHORT_CONTENT
    };

    if facts.headings.h1 == 1 {
        score += quality::SINGLE_H1;
    }
    score += match facts.headings.h2 {
        0 => 0,
        1 => quality::ONE_H2,
        _ => quality::SEVERAL_H2,
    };
    score += quality::DUPLICATE_TIERS
        .iter()
        .find(|(below, _)| facts.duplicate_percentage < *below)
        .map(|(_, points)| *points)
        .unwrap_or(0);
    score += if facts.images_missing_alt == 0 {
        quality::ALL_ALT
    } else {
        quality::MISSING_ALT_TIERS
            .iter()
            .find(|(below, _)| facts.images_missing_alt < *below)
            .map(|(_, points)| *points)
            .unwrap_or(0)
    };
    if !facts.top_keywords.is_empty() {
        score += quality::HAS_KEYWORDS;
    }

    clamp_score(score)
}

/// Starts from a perfect score and deducts per problem, recording each one.
pub fn google_terms(facts: &PageFacts) -> (u8, Vec<String>) {
    let mut score = google::START;
    let mut issues = Vec::new();

    if facts.title.is_none() {
        score -= google::MISSING_TITLE;
        issues.push("Missing page title".to_string());
    }
    if facts.meta_description.is_none() {
        score -= google::MISSING_META_DESCRIPTION;
        issues.push("Missing meta description".to_string());
    }
    if facts.headings.h1 == 0 {
        score -= google::MISSING_H1;
        issues.push("Missing H1 heading".to_string());
    }
    if facts.images_missing_alt > 0 {
        let missing = i32::try_from(facts.images_missing_alt).unwrap_or(i32::MAX);
        score -= missing
            .saturating_mul(google::PER_MISSING_ALT)
            .min(google::MAX_MISSING_ALT);
        issues.push(format!("{} images without alt text", facts.images_missing_alt));
    }
    if facts.word_count < rules::SHORT_CONTENT_WORDS {
        score -= google::SHORT_CONTENT;
        issues.push(format!("Content too short ({} words)", facts.word_count));
    }
    if facts.duplicate_percentage > google::HIGH_DUPLICATE_ABOVE {
        score -= google::HIGH_DUPLICATE;
        issues.push(format!(
            "High duplicate content ({:.1}%)",
            facts.duplicate_percentage
        ));
    }
    if !facts.has_viewport_meta {
        score -= google::MISSING_VIEWPORT;
        issues.push("Missing viewport meta tag".to_string());
    }

    (clamp_score(score), issues)
}
