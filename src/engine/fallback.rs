//! Curated fallback data, served when a section of the cache has never
//! been populated (cold start with every upstream down).  The shapes match
//! what the live path produces so the frontend renders either one.

use crate::db::models::{Game, Prop, StandingRow};
use crate::providers::espn::Standings;

fn game(
    id: &str,
    status: &str,
    home: &str,
    away: &str,
    home_name: &str,
    away_name: &str,
) -> Game {
    Game {
        id: id.into(),
        status: status.into(),
        home: home.into(),
        away: away.into(),
        home_name: home_name.into(),
        away_name: away_name.into(),
        home_score: None,
        away_score: None,
        quarter: None,
        clock: None,
        time: None,
        home_win_prob: None,
        away_win_prob: None,
        home_odds: None,
        away_odds: None,
        spread: None,
        ou: None,
        opening: None,
    }
}

pub fn fallback_games() -> Vec<Game> {
    let mut upcoming = game("gsw-bos", "upcoming", "GSW", "BOS", "Warriors", "Celtics");
    upcoming.time = Some("7:00 PM PT".into());
    upcoming.home_win_prob = Some(32.2);
    upcoming.away_win_prob = Some(67.8);
    upcoming.home_odds = Some("+148".into());
    upcoming.away_odds = Some("-175".into());
    upcoming.spread = Some("BOS -5.5".into());
    upcoming.ou = Some("224.5".into());

    let mut upcoming2 = game("lac-den", "upcoming", "LAC", "DEN", "Clippers", "Nuggets");
    upcoming2.time = Some("7:30 PM PT".into());
    upcoming2.home_win_prob = Some(37.6);
    upcoming2.away_win_prob = Some(62.4);
    upcoming2.home_odds = Some("+105".into());
    upcoming2.away_odds = Some("-125".into());
    upcoming2.spread = Some("DEN -3".into());
    upcoming2.ou = Some("221.5".into());

    let mut final_game = game("cle-bkn", "final", "CLE", "BKN", "Cavaliers", "Nets");
    final_game.home_score = Some(112);
    final_game.away_score = Some(84);

    vec![upcoming, upcoming2, final_game]
}

fn row(abbr: &str, team: &str, w: i64, l: i64, pct: &str, streak: &str) -> StandingRow {
    StandingRow {
        abbr: abbr.into(),
        team: team.into(),
        w,
        l,
        pct: pct.into(),
        streak: streak.into(),
    }
}

pub fn fallback_standings() -> Standings {
    Standings {
        east: vec![
            row("DET", "Detroit Pistons", 40, 13, ".755", "W3"),
            row("BOS", "Boston Celtics", 35, 19, ".648", "W2"),
            row("NYK", "New York Knicks", 35, 20, ".636", "L1"),
            row("CLE", "Cleveland Cavaliers", 35, 21, ".625", "W4"),
            row("ORL", "Orlando Magic", 28, 25, ".528", "W5"),
        ],
        west: vec![
            row("OKC", "Oklahoma City Thunder", 42, 14, ".750", "W6"),
            row("SAS", "San Antonio Spurs", 38, 16, ".704", "W3"),
            row("DEN", "Denver Nuggets", 35, 20, ".636", "W2"),
            row("HOU", "Houston Rockets", 34, 20, ".630", "W1"),
            row("GSW", "Golden State Warriors", 29, 26, ".527", "W1"),
        ],
    }
}

pub fn fallback_props() -> Vec<Prop> {
    vec![
        Prop {
            player: "Jayson Tatum".into(),
            team: "BOS".into(),
            game: "GSW vs BOS".into(),
            prop: "Points".into(),
            line: 27.5,
            rec: Some("OVER".into()),
            conf: Some(72),
            reason: Some("Averaging 31.2 PPG last 5 road games. GSW allows 118+ PPG at home.".into()),
        },
        Prop {
            player: "Nikola Jokić".into(),
            team: "DEN".into(),
            game: "LAC vs DEN".into(),
            prop: "Rebounds".into(),
            line: 12.5,
            rec: Some("OVER".into()),
            conf: Some(68),
            reason: Some("Double-doubles in 8 straight. LAC ranks 28th in reb defense.".into()),
        },
        Prop {
            player: "Stephen Curry".into(),
            team: "GSW".into(),
            game: "GSW vs BOS".into(),
            prop: "3PM".into(),
            line: 4.5,
            rec: Some("UNDER".into()),
            conf: Some(61),
            reason: Some("BOS limits 3PA aggressively. Curry shooting 37% from 3 in February.".into()),
        },
    ]
}
