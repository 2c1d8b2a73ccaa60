//! NBA team vocabulary.
//!
//! Every upstream speaks a different dialect: ESPN uses its own
//! abbreviations ("GS", "NY", "UTAH"), The Odds API uses full names
//! ("Golden State Warriors"), DraftKings mixes city shorthands
//! ("LA Clippers") and PrizePicks mostly matches ESPN.  Everything is
//! normalized onto the canonical three-letter abbreviations the frontend
//! expects, and game identifiers are composed from those.

use chrono::NaiveDate;

pub struct TeamInfo {
    pub abbr: &'static str,
    pub city: &'static str,
    pub nickname: &'static str,
}

pub const TEAMS: &[TeamInfo] = &[
    TeamInfo { abbr: "ATL", city: "Atlanta", nickname: "Hawks" },
    TeamInfo { abbr: "BOS", city: "Boston", nickname: "Celtics" },
    TeamInfo { abbr: "BKN", city: "Brooklyn", nickname: "Nets" },
    TeamInfo { abbr: "CHA", city: "Charlotte", nickname: "Hornets" },
    TeamInfo { abbr: "CHI", city: "Chicago", nickname: "Bulls" },
    TeamInfo { abbr: "CLE", city: "Cleveland", nickname: "Cavaliers" },
    TeamInfo { abbr: "DAL", city: "Dallas", nickname: "Mavericks" },
    TeamInfo { abbr: "DEN", city: "Denver", nickname: "Nuggets" },
    TeamInfo { abbr: "DET", city: "Detroit", nickname: "Pistons" },
    TeamInfo { abbr: "GSW", city: "Golden State", nickname: "Warriors" },
    TeamInfo { abbr: "HOU", city: "Houston", nickname: "Rockets" },
    TeamInfo { abbr: "IND", city: "Indiana", nickname: "Pacers" },
    TeamInfo { abbr: "LAC", city: "LA", nickname: "Clippers" },
    TeamInfo { abbr: "LAL", city: "Los Angeles", nickname: "Lakers" },
    TeamInfo { abbr: "MEM", city: "Memphis", nickname: "Grizzlies" },
    TeamInfo { abbr: "MIA", city: "Miami", nickname: "Heat" },
    TeamInfo { abbr: "MIL", city: "Milwaukee", nickname: "Bucks" },
    TeamInfo { abbr: "MIN", city: "Minnesota", nickname: "Timberwolves" },
    TeamInfo { abbr: "NOP", city: "New Orleans", nickname: "Pelicans" },
    TeamInfo { abbr: "NYK", city: "New York", nickname: "Knicks" },
    TeamInfo { abbr: "OKC", city: "Oklahoma City", nickname: "Thunder" },
    TeamInfo { abbr: "ORL", city: "Orlando", nickname: "Magic" },
    TeamInfo { abbr: "PHI", city: "Philadelphia", nickname: "76ers" },
    TeamInfo { abbr: "PHX", city: "Phoenix", nickname: "Suns" },
    TeamInfo { abbr: "POR", city: "Portland", nickname: "Trail Blazers" },
    TeamInfo { abbr: "SAC", city: "Sacramento", nickname: "Kings" },
    TeamInfo { abbr: "SAS", city: "San Antonio", nickname: "Spurs" },
    TeamInfo { abbr: "TOR", city: "Toronto", nickname: "Raptors" },
    TeamInfo { abbr: "UTA", city: "Utah", nickname: "Jazz" },
    TeamInfo { abbr: "WAS", city: "Washington", nickname: "Wizards" },
];

/// Upstream abbreviation variants that do not match the canonical set.
/// Mostly ESPN, which shortens a handful of markets.
const ABBR_ALIASES: &[(&str, &str)] = &[
    ("GS", "GSW"),
    ("SA", "SAS"),
    ("NY", "NYK"),
    ("NO", "NOP"),
    ("NOR", "NOP"),
    ("UTAH", "UTA"),
    ("UTH", "UTA"),
    ("WSH", "WAS"),
    ("PHO", "PHX"),
    ("BRK", "BKN"),
    ("SAN", "SAS"),
    ("GOL", "GSW"),
];

/// Nickname variants seen in sportsbook copy.
const NICKNAME_ALIASES: &[(&str, &str)] = &[
    ("sixers", "PHI"),
    ("blazers", "POR"),
    ("wolves", "MIN"),
    ("cavs", "CLE"),
    ("mavs", "DAL"),
];

fn normalize(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn team(abbr: &str) -> Option<&'static TeamInfo> {
    let upper = abbr.trim().to_uppercase();
    TEAMS.iter().find(|t| t.abbr == upper)
}

/// Full display name, e.g. "Boston Celtics".
pub fn full_name(abbr: &str) -> Option<String> {
    team(abbr).map(|t| format!("{} {}", t.city, t.nickname))
}

pub fn nickname(abbr: &str) -> Option<&'static str> {
    team(abbr).map(|t| t.nickname)
}

/// Resolve any upstream team string (abbreviation, full name, nickname,
/// sportsbook shorthand) to the canonical abbreviation.
pub fn canonical_abbr(input: &str) -> Option<&'static str> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Abbreviation path: short all-caps-ish tokens.
    if trimmed.len() <= 4 && !trimmed.contains(' ') {
        let upper = trimmed.to_uppercase();
        if let Some(t) = TEAMS.iter().find(|t| t.abbr == upper) {
            return Some(t.abbr);
        }
        if let Some((_, canonical)) = ABBR_ALIASES.iter().find(|(a, _)| *a == upper) {
            return Some(canonical);
        }
    }

    let norm = normalize(trimmed);
    if norm.is_empty() {
        return None;
    }

    // Nickname is unique across the league, so a contained nickname token
    // decides the team regardless of how the city was written.
    for t in TEAMS {
        let nick = normalize(t.nickname);
        if norm == nick || norm.contains(&nick) {
            return Some(t.abbr);
        }
    }
    for (alias, abbr) in NICKNAME_ALIASES {
        if norm.contains(alias) {
            return Some(abbr);
        }
    }

    // City alone, except the shared Los Angeles market.
    for t in TEAMS {
        let city = normalize(t.city);
        if norm == city && !city.starts_with("l") {
            return Some(t.abbr);
        }
    }

    None
}

/// Game identifier as the frontend knows it: `home-away`, lowercased.
pub fn game_id(home_abbr: &str, away_abbr: &str) -> String {
    format!(
        "{}-{}",
        home_abbr.to_lowercase(),
        away_abbr.to_lowercase()
    )
}

/// Date-suffixed identifier for disambiguating repeated matchups; picks
/// saved with either form settle against the scoreboard id.
#[allow(dead_code)]
pub fn game_id_on(home_abbr: &str, away_abbr: &str, date: NaiveDate) -> String {
    format!(
        "{}-{}",
        game_id(home_abbr, away_abbr),
        date.format("%Y%m%d")
    )
}
