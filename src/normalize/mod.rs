//! Pure text normalization applied between extraction and storage.

mod clubs;
mod league;
mod title;

pub use clubs::extract_club_tags;
pub use league::determine_league;
pub use title::clean_title;

use crate::models::{Candidate, NewNews};

/// Turns a raw candidate into a storable record.
///
/// `fixed_league` wins over the rubric-derived league when the source page
/// already belongs to a single league. Returns `None` when the cleaned title
/// is empty.
pub fn normalize(
    candidate: Candidate,
    fixed_league: Option<&str>,
    scraped_at: &str,
) -> Option<NewNews> {
    let title = clean_title(&candidate.title);
    if title.is_empty() {
        return None;
    }

    let club_tags = extract_club_tags(&title);
    let league = match fixed_league {
        Some(league) => Some(league.to_string()),
        None => Some(determine_league(&candidate.rubric)),
    }
    .filter(|l| !l.is_empty());

    Some(NewNews {
        title,
        link: candidate.link,
        rubric: non_empty(candidate.rubric),
        date: non_empty(candidate.date),
        image_url: non_empty(candidate.image_url),
        club_tags,
        league,
        scraped_at: scraped_at.to_string(),
    })
}

fn non_empty(value: String) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
