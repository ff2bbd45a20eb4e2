//! Structured titles from directory names.

use once_cell::sync::Lazy;
use regex::Regex;

const PLATFORMS: &str = r"PC|Windows|Linux|Mac|macOS|PS[2-5]|PlayStation[\s._-]*[2-5]?|Xbox(?:[\s._-]*(?:One|360|Series[\s._-]*[XS]))?|Switch|Nintendo|GOG|Steam";

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("title parser regex should compile")
}

static YEAR_PAREN: Lazy<Regex> = Lazy::new(|| compile(r"\((\d{4})\)"));
static YEAR_BRACKET: Lazy<Regex> = Lazy::new(|| compile(r"\[(\d{4})\]"));
static YEAR_INLINE: Lazy<Regex> = Lazy::new(|| compile(r"(?:^|[\s._-])(\d{4})(?:[\s._-]|$)"));

static TITLE_YEAR_PAREN: Lazy<Regex> = Lazy::new(|| compile(r"^(.+?)[\s._-]*\((\d{4})\)"));
static TITLE_YEAR_BRACKET: Lazy<Regex> = Lazy::new(|| compile(r"^(.+?)[\s._-]*\[(\d{4})\]"));
static TITLE_YEAR_DOTTED: Lazy<Regex> = Lazy::new(|| compile(r"^(.+?)[\s._-]+(\d{4})[\s._-]"));

static TV_SXXEXX: Lazy<Regex> =
    Lazy::new(|| compile(r"(?i)^(.+?)[\s._-]+S(\d{1,2})E(\d{1,2})"));
static TV_NXNN: Lazy<Regex> = Lazy::new(|| compile(r"(?i)^(.+?)[\s._-]+(\d{1,2})x(\d{2,3})"));
static TV_SEASON: Lazy<Regex> = Lazy::new(|| {
    compile(r"(?i)^(.+?)[\s._-]+(?:Season|S)[\s._-]*(\d{1,2})(?:[\s._-]+Episode[\s._-]*(\d{1,3}))?")
});
static TV_COMPLETE: Lazy<Regex> = Lazy::new(|| compile(r"(?i)^(.+?)[\s._-]+Complete"));

static MUSIC_DASH: Lazy<Regex> =
    Lazy::new(|| compile(r"^(.+?)\s*-\s*(.+?)(?:\s*\((\d{4})\)\s*)?$"));
static MUSIC_SLASH: Lazy<Regex> = Lazy::new(|| compile(r"^([^/]+)/([^/]+)$"));

static PLATFORM: Lazy<Regex> = Lazy::new(|| compile(&format!(r"(?i)\b(?:{PLATFORMS})\b")));
static PLATFORM_TAG: Lazy<Regex> =
    Lazy::new(|| compile(&format!(r"(?i)\s*[\(\[](?:{PLATFORMS})[\)\]]\s*")));
static VERSION: Lazy<Regex> =
    Lazy::new(|| compile(r"(?:^|[\s._-])v?(\d+(?:\.\d+)+)(?:[\s._-]|$)"));

static SEPARATORS: Lazy<Regex> = Lazy::new(|| compile(r"[._]+"));
static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| compile(r"\s{2,}"));

static QUALITY: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("2160p", r"(?i)2160p"),
        ("4K", r"(?i)\b4K\b"),
        ("1080p", r"(?i)1080p"),
        ("720p", r"(?i)720p"),
        ("480p", r"(?i)480p"),
        ("BluRay", r"(?i)(?:Blu[\s._-]?Ray|BDRip|BRRip)"),
        ("WEB-DL", r"(?i)(?:WEB[\s._-]*DL|WEBRip)"),
        ("HDRip", r"(?i)HDRip"),
        ("DVDRip", r"(?i)DVD[\s._-]?Rip"),
        ("REMUX", r"(?i)REMUX"),
        ("HDR", r"(?i)\bHDR(?:10)?\b"),
        ("DTS", r"(?i)\bDTS\b"),
        ("Atmos", r"(?i)\bAtmos\b"),
    ]
    .into_iter()
    .map(|(label, pattern)| (label, compile(pattern)))
    .collect()
});

/// Fields recovered from a name. Which ones are set depends on the parser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTitle {
    pub title: String,
    pub year: Option<i32>,
    pub quality_hints: Vec<&'static str>,
    pub season: Option<i32>,
    pub episode: Option<i32>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub platform: Option<String>,
    pub version: Option<String>,
}

fn plausible_year(raw: &str) -> Option<i32> {
    raw.parse::<i32>()
        .ok()
        .filter(|year| (1900..=2099).contains(year))
}

fn number(raw: Option<regex::Match<'_>>) -> Option<i32> {
    raw.and_then(|m| m.as_str().parse().ok())
}

/// Title and year from `Title (Year)`, `Title [Year]` or `Title.Year.tags`.
fn title_with_year(name: &str) -> Option<(String, Option<i32>)> {
    [&*TITLE_YEAR_PAREN, &*TITLE_YEAR_BRACKET, &*TITLE_YEAR_DOTTED]
        .into_iter()
        .find_map(|pattern| pattern.captures(name))
        .map(|caps| (clean_title(&caps[1]), plausible_year(&caps[2])))
}

/// Dots and underscores become spaces, quality tags and trailing
/// punctuation are dropped, whitespace is collapsed.
pub fn clean_title(raw: &str) -> String {
    let mut title = SEPARATORS.replace_all(raw, " ").trim().to_string();
    for (_, pattern) in QUALITY.iter() {
        title = pattern.replace_all(&title, "").into_owned();
    }
    let title = title.trim_end_matches(|c: char| " -._[](){}|".contains(c));
    MULTI_SPACE.replace_all(title, " ").trim().to_string()
}

/// First year in 1900..=2099, preferring `(Year)`, then `[Year]`, then a
/// separator-delimited year.
pub fn extract_year(name: &str) -> Option<i32> {
    [&*YEAR_PAREN, &*YEAR_BRACKET, &*YEAR_INLINE]
        .into_iter()
        .find_map(|pattern| pattern.captures(name).and_then(|caps| plausible_year(&caps[1])))
}

pub fn quality_hints(name: &str) -> Vec<&'static str> {
    QUALITY
        .iter()
        .filter(|(_, pattern)| pattern.is_match(name))
        .map(|(label, _)| *label)
        .collect()
}

pub fn parse_movie_title(name: &str) -> ParsedTitle {
    let (title, year) =
        title_with_year(name).unwrap_or_else(|| (clean_title(name), extract_year(name)));
    ParsedTitle {
        title,
        year,
        quality_hints: quality_hints(name),
        ..ParsedTitle::default()
    }
}

/// Show name plus season and episode from `S01E02`, `1x02`, `Season 1
/// [Episode 2]` or a `Complete` suffix.
pub fn parse_tv_show(name: &str) -> ParsedTitle {
    let mut parsed = ParsedTitle {
        quality_hints: quality_hints(name),
        ..ParsedTitle::default()
    };

    if let Some(caps) = TV_SXXEXX.captures(name).or_else(|| TV_NXNN.captures(name)) {
        parsed.title = clean_title(&caps[1]);
        parsed.season = number(caps.get(2));
        parsed.episode = number(caps.get(3));
    } else if let Some(caps) = TV_SEASON.captures(name) {
        parsed.title = clean_title(&caps[1]);
        parsed.season = number(caps.get(2));
        parsed.episode = number(caps.get(3));
    } else if let Some(caps) = TV_COMPLETE.captures(name) {
        parsed.title = clean_title(&caps[1]);
    } else {
        parsed.title = clean_title(name);
    }
    parsed
}

/// `Artist - Album (Year)` or `Artist/Album`; the album becomes the title.
pub fn parse_music_album(name: &str) -> ParsedTitle {
    if let Some(caps) = MUSIC_DASH.captures(name) {
        let album = YEAR_PAREN.replace_all(&caps[2], "").trim().to_string();
        return ParsedTitle {
            title: album.clone(),
            year: caps.get(3).and_then(|m| plausible_year(m.as_str())),
            artist: Some(caps[1].trim().to_string()),
            album: Some(album),
            ..ParsedTitle::default()
        };
    }
    if let Some(caps) = MUSIC_SLASH.captures(name) {
        let album = caps[2].trim().to_string();
        return ParsedTitle {
            title: album.clone(),
            year: extract_year(name),
            artist: Some(caps[1].trim().to_string()),
            album: Some(album),
            ..ParsedTitle::default()
        };
    }
    ParsedTitle {
        title: clean_title(name),
        year: extract_year(name),
        ..ParsedTitle::default()
    }
}

/// Title, year and platform; a `(PC)` or `[Switch]` tag is removed from the
/// title.
pub fn parse_game_title(name: &str) -> ParsedTitle {
    let platform = PLATFORM.find(name).map(|m| m.as_str().to_string());
    let untagged = PLATFORM_TAG.replace_all(name, " ");
    let untagged = untagged.trim();

    let (title, year) = title_with_year(untagged)
        .unwrap_or_else(|| (clean_title(untagged), extract_year(untagged)));
    ParsedTitle {
        title,
        year,
        platform,
        ..ParsedTitle::default()
    }
}

/// Product name with any version number stripped into `version`.
pub fn parse_software_title(name: &str) -> ParsedTitle {
    let version = VERSION.captures(name).map(|caps| caps[1].to_string());
    let platform = PLATFORM.find(name).map(|m| m.as_str().to_string());

    let (title, year) = match TITLE_YEAR_PAREN.captures(name) {
        Some(caps) => (clean_title(&caps[1]), plausible_year(&caps[2])),
        None => {
            let stripped = version
                .as_deref()
                .and_then(|version| {
                    Regex::new(&format!(
                        r"(?:^|[\s._-])v?{}(?:[\s._-]|$)",
                        regex::escape(version)
                    ))
                    .ok()
                })
                .map(|pattern| pattern.replace_all(name, " ").into_owned())
                .unwrap_or_else(|| name.to_string());
            (clean_title(&stripped), extract_year(name))
        }
    };

    ParsedTitle {
        title,
        year,
        platform,
        version,
        ..ParsedTitle::default()
    }
}

/// Whether `name` carries a platform keyword such as `PS4` or `Steam`.
pub fn mentions_platform(name: &str) -> bool {
    PLATFORM.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movie_titles_with_year_variants() {
        let parsed = parse_movie_title("The Matrix (1999)");
        assert_eq!(parsed.title, "The Matrix");
        assert_eq!(parsed.year, Some(1999));
        assert!(parsed.quality_hints.is_empty());

        let parsed = parse_movie_title("The Matrix [1999]");
        assert_eq!(parsed.title, "The Matrix");
        assert_eq!(parsed.year, Some(1999));

        let parsed = parse_movie_title("The.Matrix.1999.1080p.BluRay");
        assert_eq!(parsed.title, "The Matrix");
        assert_eq!(parsed.year, Some(1999));
        assert_eq!(parsed.quality_hints, vec!["1080p", "BluRay"]);
    }

    #[test]
    fn movie_without_year() {
        let parsed = parse_movie_title("Home_Videos");
        assert_eq!(parsed.title, "Home Videos");
        assert_eq!(parsed.year, None);
    }

    #[test]
    fn year_outside_range_is_ignored() {
        assert_eq!(extract_year("Expedition (1850)"), None);
        assert_eq!(extract_year("Dune (2021)"), Some(2021));
        assert_eq!(extract_year("Dune [2021]"), Some(2021));
        assert_eq!(extract_year("Dune.2021.2160p"), Some(2021));
    }

    #[test]
    fn tv_episode_patterns() {
        let parsed = parse_tv_show("Breaking.Bad.S01E02");
        assert_eq!(parsed.title, "Breaking Bad");
        assert_eq!((parsed.season, parsed.episode), (Some(1), Some(2)));

        let parsed = parse_tv_show("The Office 2x05");
        assert_eq!(parsed.title, "The Office");
        assert_eq!((parsed.season, parsed.episode), (Some(2), Some(5)));
    }

    #[test]
    fn tv_season_and_complete_patterns() {
        let parsed = parse_tv_show("Breaking Bad - Season 1");
        assert_eq!(parsed.title, "Breaking Bad");
        assert_eq!((parsed.season, parsed.episode), (Some(1), None));

        let parsed = parse_tv_show("Firefly Complete");
        assert_eq!(parsed.title, "Firefly");
        assert_eq!(parsed.season, None);
    }

    #[test]
    fn music_album_patterns() {
        let parsed = parse_music_album("Pink Floyd - The Wall (1979)");
        assert_eq!(parsed.artist.as_deref(), Some("Pink Floyd"));
        assert_eq!(parsed.title, "The Wall");
        assert_eq!(parsed.year, Some(1979));

        let parsed = parse_music_album("Pink Floyd/Animals");
        assert_eq!(parsed.artist.as_deref(), Some("Pink Floyd"));
        assert_eq!(parsed.album.as_deref(), Some("Animals"));
    }

    #[test]
    fn game_platform_tag_is_stripped() {
        let parsed = parse_game_title("Half-Life 2 (PC)");
        assert_eq!(parsed.title, "Half-Life 2");
        assert_eq!(parsed.platform.as_deref(), Some("PC"));
        assert!(mentions_platform("Zelda [Switch]"));
        assert!(!mentions_platform("Quarterly Reports"));
    }

    #[test]
    fn software_version_is_split_from_title() {
        let parsed = parse_software_title("VLC 3.0.20");
        assert_eq!(parsed.title, "VLC");
        assert_eq!(parsed.version.as_deref(), Some("3.0.20"));

        let parsed = parse_software_title("Ubuntu 24.04");
        assert_eq!(parsed.title, "Ubuntu");
        assert_eq!(parsed.version.as_deref(), Some("24.04"));
    }

    #[test]
    fn clean_title_collapses_separators_and_tags() {
        assert_eq!(clean_title("The.Dark_Knight"), "The Dark Knight");
        assert_eq!(clean_title("Heat 1080p"), "Heat");
    }
}
