//! Slug derivation for practices.

use crate::crypto::generate_suffix;
use crate::store::PracticeRepository;
use crate::ActionError;

/// Maximum length of the base slug before any collision suffix.
pub const SLUG_MAX: usize = 50;

const MAX_ATTEMPTS: usize = 5;

/// Derives the base slug: lowercase, non-alphanumeric runs collapsed to
/// single hyphens, leading/trailing hyphens trimmed, capped at [`SLUG_MAX`].
/// A name with no usable characters falls back to `practice-XXXXXXXX`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_hyphen = true; // suppress a leading hyphen
    for c in name.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            last_hyphen = false;
        } else if !last_hyphen {
            slug.push('-');
            last_hyphen = true;
        }
        if slug.len() >= SLUG_MAX {
            break;
        }
    }
    let slug = slug.trim_matches('-').to_owned();
    if slug.is_empty() {
        format!("practice-{}", generate_suffix(8))
    } else {
        slug
    }
}

/// Produces a slug not currently present in the practice table.
///
/// Tries the base slug, then up to five candidates with growing random
/// suffixes, then gives up probing and returns the base with a longer
/// suffix. Bounded, so it never recurses or loops on pathological collision
/// streaks.
pub async fn generate_unique_slug<P>(practices: &P, name: &str) -> Result<String, ActionError>
where
    P: PracticeRepository + ?Sized,
{
    let base = slugify(name);
    let mut candidate = base.clone();

    for attempt in 0..MAX_ATTEMPTS {
        if practices.find_by_slug(&candidate).await?.is_none() {
            return Ok(candidate);
        }
        candidate = format!("{base}-{}", generate_suffix(4 + attempt));
    }

    Ok(format!("{base}-{}", generate_suffix(6)))
}
