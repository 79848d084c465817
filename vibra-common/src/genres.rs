//! Electronic genre catalog
//!
//! Families and sub-genres offered as style tags when composing a request.

/// Genre families with their sub-genres, in display order
pub const ELECTRONIC_GENRES: &[(&str, &[&str])] = &[
    (
        "House",
        &["Deep House", "Tech House", "Progressive House", "Electro House", "Future House", "Tropical House"],
    ),
    (
        "Techno",
        &["Minimal Techno", "Detroit Techno", "Industrial Techno", "Melodic Techno", "Hard Techno"],
    ),
    (
        "Trance",
        &["Uplifting Trance", "Progressive Trance", "Psytrance", "Vocal Trance", "Tech Trance"],
    ),
    ("Dubstep", &["Melodic Dubstep", "Riddim", "Brostep", "Chillstep", "Future Bass"]),
    ("Drum & Bass", &["Liquid DnB", "Neurofunk", "Jump Up", "Jungle", "Breakbeat"]),
    ("Ambient", &["Ambient Techno", "Dark Ambient", "Drone", "Chillout", "Downtempo"]),
    ("EDM", &["Big Room", "Electro Pop", "Festival EDM", "Hardstyle", "UK Garage"]),
];

/// Sub-genres of one family (case-insensitive family name)
pub fn subgenres(family: &str) -> Option<&'static [&'static str]> {
    ELECTRONIC_GENRES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(family))
        .map(|(_, styles)| *styles)
}

/// Canonical spelling of a known sub-genre, if any
pub fn find_style(style: &str) -> Option<&'static str> {
    ELECTRONIC_GENRES
        .iter()
        .flat_map(|(_, styles)| styles.iter())
        .find(|known| known.eq_ignore_ascii_case(style.trim()))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subgenres_lookup() {
        assert_eq!(subgenres("techno").map(|s| s.len()), Some(5));
        assert!(subgenres("polka").is_none());
    }

    #[test]
    fn test_find_style_canonicalizes() {
        assert_eq!(find_style(" liquid dnb "), Some("Liquid DnB"));
        assert_eq!(find_style("Vaporwave"), None);
    }
}
