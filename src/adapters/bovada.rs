use super::{
    group_by_side, BookmakerAdapter, EventFilter, ExtractIssue, Extraction, RawPayload, Selection,
    StatusPolicy,
};
use crate::error::AdapterError;
use crate::event::{parse_spread, BetRecord, BetType, Event, Polarity};
use crate::taxonomy::{classify_bovada, default_bovada_rules, BovadaLabelRule};
use chrono::{DateTime, FixedOffset, Utc};
use serde_json::Value;

/// Bovada sport listing (JSON) adapter.
#[derive(Debug, Clone)]
pub struct BovadaAdapter {
    rules: Vec<BovadaLabelRule>,
    status_policy: StatusPolicy,
    period: String,
    offset: FixedOffset,
}

impl BovadaAdapter {
    pub const WEBSITE: &'static str = "bovada";

    /// `offset` is the local offset used to turn start times into event dates.
    pub fn new(offset: FixedOffset) -> Self {
        Self {
            rules: default_bovada_rules(),
            status_policy: StatusPolicy::open("O"),
            period: "Game".to_string(),
            offset,
        }
    }

    pub fn with_rules(mut self, rules: Vec<BovadaLabelRule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_status_policy(mut self, policy: StatusPolicy) -> Self {
        self.status_policy = policy;
        self
    }

    fn extract_event(&self, raw: &Value, competition: &str, out: &mut Extraction) {
        let event = match self.parse_event(raw, competition) {
            Ok(Some(event)) => event,
            // in play
            Ok(None) => return,
            Err(reason) => {
                out.issues.push(ExtractIssue::MalformedEvent {
                    event_id: raw.get("id").and_then(value_text),
                    reason,
                });
                return;
            }
        };

        let display_groups = raw
            .get("displayGroups")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for group in display_groups {
            let group_name = group.get("description").and_then(Value::as_str).unwrap_or_default();
            let Some(markets) = group.get("markets").and_then(Value::as_array) else {
                continue;
            };

            for market in markets {
                if let Err(reason) = self.extract_market(&event, group_name, market, out) {
                    out.issues.push(ExtractIssue::MalformedMarket {
                        event_id: event.event_id.clone(),
                        market: market_name(group_name, market),
                        reason,
                    });
                }
            }
        }

        out.events.push(event);
    }

    /// `Ok(None)` for live events.
    fn parse_event(&self, raw: &Value, competition: &str) -> Result<Option<Event>, String> {
        let event_id = raw
            .get("id")
            .and_then(value_text)
            .ok_or_else(|| "event has no id".to_string())?;

        let live_flags = [
            raw.get("live").and_then(Value::as_bool),
            raw.pointer("/displayGroups/0/markets/0/period/live")
                .and_then(Value::as_bool),
        ];
        if live_flags.iter().all(Option::is_none) {
            return Err("event carries no live flag".to_string());
        }
        if live_flags.contains(&Some(true)) {
            return Ok(None);
        }

        let start_ms = raw
            .get("startTime")
            .and_then(Value::as_i64)
            .ok_or_else(|| "event has no startTime".to_string())?;
        let event_date = DateTime::<Utc>::from_timestamp_millis(start_ms)
            .ok_or_else(|| format!("startTime {} out of range", start_ms))?
            .with_timezone(&self.offset)
            .date_naive();

        let mut home_team = None;
        let mut away_team = None;
        for competitor in raw
            .get("competitors")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
        {
            let name = competitor.get("name").and_then(value_text);
            if competitor.get("home").and_then(Value::as_bool) == Some(true) {
                home_team = name;
            } else {
                away_team = name;
            }
        }
        let (Some(away_team), Some(home_team)) = (away_team, home_team) else {
            return Err("event is missing its home or away competitor".to_string());
        };

        Ok(Some(Event::new(event_id, event_date, competition, away_team, home_team)))
    }

    fn extract_market(
        &self,
        event: &Event,
        group_name: &str,
        market: &Value,
        out: &mut Extraction,
    ) -> Result<(), String> {
        if market.pointer("/period/description").and_then(Value::as_str) != Some(self.period.as_str()) {
            return Ok(());
        }
        let description_key = market.get("descriptionKey").and_then(Value::as_str).unwrap_or_default();
        let description = market.get("description").and_then(Value::as_str).unwrap_or_default();
        let Some(bet_type) = classify_bovada(&self.rules, group_name, description_key, description) else {
            return Ok(());
        };

        let outcomes = market
            .get("outcomes")
            .and_then(Value::as_array)
            .ok_or_else(|| "market has no outcomes".to_string())?;
        if let Some(nameless) = outcomes.iter().position(|o| o.get("description").and_then(Value::as_str).is_none()) {
            return Err(format!("outcome {} has no description", nameless));
        }

        let sides = group_by_side(outcomes.iter(), |o| {
            (
                o.get("description").and_then(Value::as_str).unwrap_or_default().to_lowercase(),
                o.pointer("/price/handicap").and_then(value_text).map(|text| line_key(&text)),
            )
        });

        let mut records = Vec::new();
        let mut duplicates = Vec::new();
        for ((side, _), candidates) in &sides {
            match self
                .status_policy
                .select(candidates.as_slice(), |o| o.get("status").and_then(Value::as_str))
            {
                Selection::Keep(outcome) => records.push(self.build_record(event, bet_type, outcome)?),
                Selection::Closed => {}
                Selection::Ambiguous { candidates } => duplicates.push(ExtractIssue::AmbiguousDuplicate {
                    event_id: event.event_id.clone(),
                    bet_type,
                    side: side.clone(),
                    candidates,
                }),
            }
        }

        out.records.extend(records);
        out.issues.extend(duplicates);
        Ok(())
    }

    fn build_record(
        &self,
        event: &Event,
        bet_type: BetType,
        outcome: &Value,
    ) -> Result<BetRecord, String> {
        let family = bet_type.family();
        let side = outcome.get("description").and_then(Value::as_str).unwrap_or_default();
        let price = outcome
            .get("price")
            .filter(|p| p.is_object())
            .ok_or_else(|| format!("outcome '{}' has no price", side))?;

        let mut record = BetRecord::new(Self::WEBSITE, event.event_id.clone(), bet_type);
        record.decimal_line = Some(
            price
                .get("decimal")
                .and_then(value_text)
                .ok_or_else(|| format!("outcome '{}' has no decimal price", side))?,
        );
        record.american_line = price.get("american").and_then(value_text);
        record.fractional_line = price.get("fractional").and_then(value_text);

        if family.has_team {
            if !event.has_team(side) {
                return Err(format!("outcome '{}' is not one of the event's competitors", side));
            }
            record.team = Some(side.to_string());
        }
        if family.has_handicap {
            let text = price
                .get("handicap")
                .and_then(value_text)
                .ok_or_else(|| format!("outcome '{}' has no handicap", side))?;
            record.handicap_spread =
                Some(parse_spread(&text).ok_or_else(|| format!("handicap '{}' is not numeric", text))?);
        }
        if family.has_polarity {
            record.over_under =
                Some(Polarity::parse(side).ok_or_else(|| format!("'{}' is not an over/under side", side))?);
        }

        Ok(record)
    }
}

impl BookmakerAdapter for BovadaAdapter {
    fn website(&self) -> &str {
        Self::WEBSITE
    }

    fn extract(&self, payload: &RawPayload, filter: &EventFilter) -> Result<Extraction, AdapterError> {
        let RawPayload::Json(document) = payload else {
            return Err(AdapterError::WrongPayloadKind {
                website: Self::WEBSITE.to_string(),
                expected: "json",
                found: payload.kind(),
            });
        };
        let groups = document.as_array().ok_or_else(|| AdapterError::InvalidPayload {
            website: Self::WEBSITE.to_string(),
            reason: "top level is not an array of competition groups".to_string(),
        })?;

        let wanted_link = format!("/{}/{}", filter.sport, filter.competition);
        let mut out = Extraction::new(Self::WEBSITE);

        for group in groups {
            let Some(link) = group.pointer("/path/0/link").and_then(Value::as_str) else {
                continue;
            };
            if !link.eq_ignore_ascii_case(&wanted_link) {
                continue;
            }
            let competition = link.rsplit('/').next().unwrap_or_default();
            let Some(events) = group.get("events").and_then(Value::as_array) else {
                out.issues.push(ExtractIssue::MalformedEvent {
                    event_id: None,
                    reason: format!("competition group {} has no events list", link),
                });
                continue;
            };

            for raw_event in events {
                self.extract_event(raw_event, competition, &mut out);
            }
        }

        Ok(out)
    }
}

fn market_name(group_name: &str, market: &Value) -> String {
    let description = market.get("description").and_then(Value::as_str).unwrap_or("?");
    format!("{}/{}", group_name, description)
}

/// Same line, same key: "+3.5", "3.5" and "3.50" are one side.
fn line_key(text: &str) -> String {
    parse_spread(text)
        .map(|line| line.normalize().to_string())
        .unwrap_or_else(|| text.to_string())
}

/// Bovada mixes strings and numbers for ids and prices.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use serde_json::json;

    // 2024-01-01T19:00:00Z
    const START_MS: i64 = 1_704_135_600_000;

    fn adapter() -> BovadaAdapter {
        BovadaAdapter::new(FixedOffset::east_opt(0).unwrap())
    }

    fn filter() -> EventFilter {
        EventFilter::new("basketball", "nba")
    }

    fn outcome(description: &str, status: &str, decimal: &str, handicap: Option<&str>) -> Value {
        let mut price = json!({ "american": "+100", "decimal": decimal, "fractional": "1/1" });
        if let Some(h) = handicap {
            price["handicap"] = json!(h);
        }
        json!({ "description": description, "status": status, "price": price })
    }

    fn market(key: &str, description: &str, outcomes: Vec<Value>) -> Value {
        json!({
            "descriptionKey": key,
            "description": description,
            "period": { "description": "Game", "live": false },
            "outcomes": outcomes,
        })
    }

    fn event(id: &str, live: bool, markets: Vec<Value>) -> Value {
        let mut markets = markets;
        if let Some(first) = markets.first_mut() {
            first["period"]["live"] = json!(live);
        }
        json!({
            "id": id,
            "startTime": START_MS,
            "competitors": [
                { "name": "Boston Celtics", "home": false },
                { "name": "Los Angeles Lakers", "home": true },
            ],
            "displayGroups": [
                { "description": "Game Lines", "markets": markets },
            ],
        })
    }

    fn listing(link: &str, events: Vec<Value>) -> RawPayload {
        RawPayload::Json(json!([{ "path": [{ "link": link }], "events": events }]))
    }

    fn game_lines() -> Vec<Value> {
        vec![
            market(
                "Head To Head",
                "Moneyline",
                vec![
                    outcome("Boston Celtics", "O", "2.10", None),
                    outcome("Los Angeles Lakers", "O", "1.80", None),
                ],
            ),
            market(
                "Main Dynamic Asian Runline",
                "Runline",
                vec![
                    outcome("Boston Celtics", "O", "1.91", Some("+3.5")),
                    outcome("Los Angeles Lakers", "O", "1.91", Some("-3.5")),
                ],
            ),
            market(
                "Main Dynamic Over/Under",
                "Total",
                vec![
                    outcome("Over", "O", "1.95", Some("221.5")),
                    outcome("Under", "O", "1.87", Some("221.5")),
                ],
            ),
        ]
    }

    #[test]
    fn test_extracts_event_and_all_families() {
        let out = adapter().extract(&listing("/basketball/nba", vec![event("100", false, game_lines())]), &filter()).unwrap();

        assert_eq!(out.events.len(), 1);
        let ev = &out.events[0];
        assert_eq!(ev.event_id, "100");
        assert_eq!(ev.event_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(ev.competition, "nba");
        assert_eq!(ev.away_team, "Boston Celtics");
        assert_eq!(ev.home_team, "Los Angeles Lakers");

        assert_eq!(out.records.len(), 6);
        assert!(out.issues.is_empty(), "{:?}", out.issues);
        for bet_type in BetType::ALL {
            assert_eq!(out.records.iter().filter(|r| r.bet_type == bet_type).count(), 2);
        }

        let under = out
            .records
            .iter()
            .find(|r| r.over_under == Some(Polarity::Under))
            .unwrap();
        assert_eq!(under.team, None);
        assert_eq!(under.handicap_spread, Some(Decimal::new(2215, 1)));
        assert_eq!(under.decimal_line.as_deref(), Some("1.87"));

        let moneyline = out.records.iter().find(|r| r.bet_type == BetType::Moneyline).unwrap();
        assert_eq!(moneyline.handicap_spread, None);
        assert_eq!(moneyline.over_under, None);
    }

    #[test]
    fn test_two_sided_markets_map_to_event_teams() {
        let out = adapter().extract(&listing("/basketball/nba", vec![event("100", false, game_lines())]), &filter()).unwrap();
        let ev = &out.events[0];

        let spread_for = |team: &str| {
            out.records
                .iter()
                .find(|r| r.bet_type == BetType::Handicap && r.team.as_deref() == Some(team))
                .and_then(|r| r.handicap_spread)
        };
        assert_eq!(spread_for(&ev.away_team), Some(Decimal::new(35, 1)));
        assert_eq!(spread_for(&ev.home_team), Some(Decimal::new(-35, 1)));
    }

    #[test]
    fn test_unrecognised_markets_are_dropped() {
        let mut markets = game_lines();
        markets.push(market("Player Points", "Points", vec![outcome("Over", "O", "1.9", Some("25.5"))]));
        let mut first_half = market(
            "Head To Head",
            "Moneyline",
            vec![outcome("Boston Celtics", "O", "2.5", None)],
        );
        first_half["period"]["description"] = json!("First Half");
        markets.push(first_half);

        let out = adapter().extract(&listing("/basketball/nba", vec![event("100", false, markets)]), &filter()).unwrap();
        assert_eq!(out.records.len(), 6);
        assert!(out.issues.is_empty());
    }

    #[test]
    fn test_live_event_is_excluded_entirely() {
        let payload = listing(
            "/basketball/nba",
            vec![event("100", true, game_lines()), event("200", false, game_lines())],
        );
        let out = adapter().extract(&payload, &filter()).unwrap();

        assert_eq!(out.events.len(), 1);
        assert_eq!(out.events[0].event_id, "200");
        assert!(out.records.iter().all(|r| r.event_id == "200"));
    }

    #[test]
    fn test_top_level_live_flag_is_honoured() {
        let mut live = event("100", false, game_lines());
        live["live"] = json!(true);
        let out = adapter().extract(&listing("/basketball/nba", vec![live]), &filter()).unwrap();
        assert!(out.events.is_empty());
        assert!(out.records.is_empty());
    }

    #[test]
    fn test_other_competitions_are_ignored() {
        let payload = RawPayload::Json(json!([
            { "path": [{ "link": "/basketball/wnba" }], "events": [event("1", false, game_lines())] },
            { "path": [{ "link": "/football/nfl" }], "events": [event("2", false, game_lines())] },
            { "path": [{ "link": "/basketball/nba" }], "events": [event("3", false, game_lines())] },
        ]));
        let out = adapter().extract(&payload, &filter()).unwrap();
        assert_eq!(out.events.len(), 1);
        assert_eq!(out.events[0].event_id, "3");
    }

    #[test]
    fn test_open_status_wins_over_settled_duplicates() {
        let totals = market(
            "Main Dynamic Over/Under",
            "Total",
            vec![
                outcome("Over", "S", "1.50", Some("221.5")),
                outcome("Over", "O", "1.95", Some("221.5")),
                outcome("Under", "O", "1.87", Some("221.5")),
                outcome("Under", "S", "2.40", Some("221.5")),
            ],
        );
        let out = adapter().extract(&listing("/basketball/nba", vec![event("100", false, vec![totals])]), &filter()).unwrap();

        assert_eq!(out.records.len(), 2);
        let prices: Vec<_> = out.records.iter().map(|r| r.decimal_line.clone().unwrap()).collect();
        assert_eq!(prices, vec!["1.95", "1.87"]);
        assert!(out.issues.is_empty());
    }

    #[test]
    fn test_handicap_duplicates_group_by_line_value() {
        let spread = market(
            "Main Dynamic Asian Handicap",
            "Point Spread",
            vec![
                outcome("Boston Celtics", "S", "1.70", Some("+3.5")),
                outcome("Boston Celtics", "O", "1.91", Some("3.5")),
                outcome("Los Angeles Lakers", "O", "1.91", Some("-3.50")),
                outcome("Los Angeles Lakers", "S", "2.20", Some("-3.5")),
            ],
        );
        let out = adapter().extract(&listing("/basketball/nba", vec![event("100", false, vec![spread])]), &filter()).unwrap();

        assert!(out.issues.is_empty(), "{:?}", out.issues);
        assert_eq!(out.records.len(), 2);
        let quotes: Vec<_> = out
            .records
            .iter()
            .map(|r| (r.team.clone().unwrap(), r.handicap_spread.unwrap(), r.decimal_line.clone().unwrap()))
            .collect();
        assert_eq!(
            quotes,
            vec![
                ("Boston Celtics".to_string(), Decimal::new(35, 1), "1.91".to_string()),
                ("Los Angeles Lakers".to_string(), Decimal::new(-35, 1), "1.91".to_string()),
            ]
        );
    }

    #[test]
    fn test_alternate_lines_stay_separate_sides() {
        let spread = market(
            "Main Dynamic Asian Handicap",
            "Point Spread",
            vec![
                outcome("Boston Celtics", "O", "1.91", Some("+3.5")),
                outcome("Boston Celtics", "O", "2.05", Some("+2.5")),
            ],
        );
        let out = adapter().extract(&listing("/basketball/nba", vec![event("100", false, vec![spread])]), &filter()).unwrap();

        assert!(out.issues.is_empty(), "{:?}", out.issues);
        assert_eq!(out.records.len(), 2);
    }

    #[test]
    fn test_duplicates_without_open_status_are_reported() {
        let totals = market(
            "Main Dynamic Over/Under",
            "Total",
            vec![
                outcome("Over", "S", "1.50", Some("221.5")),
                outcome("Over", "S", "1.95", Some("221.5")),
                outcome("Under", "O", "1.87", Some("221.5")),
            ],
        );
        let out = adapter().extract(&listing("/basketball/nba", vec![event("100", false, vec![totals])]), &filter()).unwrap();

        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].over_under, Some(Polarity::Under));
        assert_eq!(
            out.issues,
            vec![ExtractIssue::AmbiguousDuplicate {
                event_id: "100".to_string(),
                bet_type: BetType::OverUnder,
                side: "over".to_string(),
                candidates: 2,
            }]
        );
    }

    #[test]
    fn test_malformed_market_does_not_abort_event() {
        let mut markets = game_lines();
        markets[0]["outcomes"][1]
            .as_object_mut()
            .unwrap()
            .remove("price");

        let out = adapter().extract(&listing("/basketball/nba", vec![event("100", false, markets)]), &filter()).unwrap();

        assert_eq!(out.events.len(), 1);
        assert_eq!(out.records.len(), 4);
        assert!(out.records.iter().all(|r| r.bet_type != BetType::Moneyline));
        assert!(matches!(
            &out.issues[..],
            [ExtractIssue::MalformedMarket { market, .. }] if market == "Game Lines/Moneyline"
        ));
    }

    #[test]
    fn test_unknown_team_in_two_sided_market_is_malformed() {
        let markets = vec![market(
            "Head To Head",
            "Moneyline",
            vec![
                outcome("Celtics", "O", "2.10", None),
                outcome("Los Angeles Lakers", "O", "1.80", None),
            ],
        )];
        let out = adapter().extract(&listing("/basketball/nba", vec![event("100", false, markets)]), &filter()).unwrap();
        assert!(out.records.is_empty());
        assert_eq!(out.issues.len(), 1);
    }

    #[test]
    fn test_malformed_event_is_isolated() {
        let mut broken = event("100", false, game_lines());
        broken.as_object_mut().unwrap().remove("competitors");
        let payload = listing("/basketball/nba", vec![broken, event("200", false, game_lines())]);

        let out = adapter().extract(&payload, &filter()).unwrap();
        assert_eq!(out.events.len(), 1);
        assert_eq!(out.records.len(), 6);
        assert!(matches!(
            &out.issues[..],
            [ExtractIssue::MalformedEvent { event_id: Some(id), .. }] if id == "100"
        ));
    }

    #[test]
    fn test_unreadable_payloads_are_fatal() {
        let html = RawPayload::Html {
            listing: String::new(),
            event_pages: Default::default(),
        };
        assert!(matches!(
            adapter().extract(&html, &filter()),
            Err(AdapterError::WrongPayloadKind { .. })
        ));
        assert!(matches!(
            adapter().extract(&RawPayload::Json(json!({"events": []})), &filter()),
            Err(AdapterError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn test_event_date_uses_configured_offset() {
        // 19:00Z is already the next day in UTC+8
        let adapter = BovadaAdapter::new(FixedOffset::east_opt(8 * 3600).unwrap());
        let out = adapter.extract(&listing("/basketball/nba", vec![event("100", false, game_lines())]), &filter()).unwrap();
        assert_eq!(out.events[0].event_date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }
}
