use super::{BookmakerAdapter, EventFilter, ExtractIssue, Extraction, RawPayload};
use crate::error::AdapterError;
use crate::event::{parse_spread, BetRecord, Event, Polarity};
use crate::taxonomy::{default_betfair_rules, BetfairMarketRule};
use chrono::{Duration, NaiveDate};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

/// A listing row worth fetching a detail page for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLink {
    pub event_id: String,
    pub href: String,
}

#[derive(Debug, Clone)]
struct PageSelectors {
    row: Selector,
    countdown: Selector,
    runner_links: Selector,
    runner_name: Selector,
    runner_price: Selector,
    runner_handicap: Selector,
}

impl PageSelectors {
    fn new() -> Result<Self, AdapterError> {
        Ok(Self {
            row: selector("li.com-coupon-line-new-layout")?,
            countdown: selector("span.date.ui-countdown")?,
            runner_links: selector("div.avb-col.avb-col-runners a[href]")?,
            runner_name: selector("span.runner-name")?,
            runner_price: selector("span.ui-runner-price")?,
            runner_handicap: selector("span.ui-runner-handicap")?,
        })
    }
}

/// Betfair sportsbook (HTML) adapter.
///
/// The coupon page lists the events; each event's detail page holds the
/// markets. Rows without a countdown are in play and skipped.
#[derive(Debug, Clone)]
pub struct BetfairAdapter {
    markets: Vec<(BetfairMarketRule, Selector)>,
    selectors: PageSelectors,
    today: NaiveDate,
}

impl BetfairAdapter {
    pub const WEBSITE: &'static str = "betfair";

    /// `today` anchors the coupon's relative dates ("Today", "Tomorrow").
    pub fn new(today: NaiveDate) -> Result<Self, AdapterError> {
        Self::with_markets(today, default_betfair_rules())
    }

    pub fn with_markets(today: NaiveDate, rules: Vec<BetfairMarketRule>) -> Result<Self, AdapterError> {
        let markets = rules
            .into_iter()
            .map(|rule| {
                let css = format!(r#"div[class*="{}-"]"#, rule.marker);
                let compiled = Selector::parse(&css).map_err(|e| AdapterError::Selector {
                    marker: rule.marker.clone(),
                    reason: format!("{:?}", e),
                })?;
                Ok((rule, compiled))
            })
            .collect::<Result<Vec<_>, AdapterError>>()?;

        Ok(Self {
            markets,
            selectors: PageSelectors::new()?,
            today,
        })
    }

    /// Detail pages the retrieval client should fetch: non-live rows inside
    /// the filter.
    pub fn event_links(&self, listing: &str, filter: &EventFilter) -> Vec<EventLink> {
        self.listing_rows(listing, filter)
            .into_iter()
            .filter_map(|row| row.ok())
            .map(|(event, href)| EventLink {
                event_id: event.event_id,
                href,
            })
            .collect()
    }

    fn listing_rows(&self, listing: &str, filter: &EventFilter) -> Vec<Result<(Event, String), ExtractIssue>> {
        let document = Html::parse_document(listing);
        document
            .select(&self.selectors.row)
            .filter_map(|row| self.parse_row(row, filter))
            .collect()
    }

    /// `None` for rows that are in play or outside the filter.
    fn parse_row(&self, row: ElementRef<'_>, filter: &EventFilter) -> Option<Result<(Event, String), ExtractIssue>> {
        let countdown = row.select(&self.selectors.countdown).next()?;
        let event_date = if text_of(countdown).contains("Tomorrow") {
            self.today + Duration::days(1)
        } else {
            self.today
        };

        let link = row.select(&self.selectors.runner_links).find(|a| {
            a.value()
                .attr("data-competition")
                .map_or(false, |c| filter.matches_competition(c))
        })?;
        let anchor = link.value();
        let competition = anchor.attr("data-competition").unwrap_or_default().trim();
        let href = anchor.attr("href").unwrap_or_default();

        let event_id = href
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|id| !id.is_empty())
            .map(str::to_string);
        let Some(event_id) = event_id else {
            return Some(Err(ExtractIssue::MalformedEvent {
                event_id: None,
                reason: format!("cannot read an event id from href '{}'", href),
            }));
        };

        let teams = anchor.attr("data-event").and_then(|label| {
            let (away, home) = label.split_once('@')?;
            let (away, home) = (away.trim(), home.trim());
            (!away.is_empty() && !home.is_empty()).then(|| (away.to_string(), home.to_string()))
        });
        let Some((away_team, home_team)) = teams else {
            return Some(Err(ExtractIssue::MalformedEvent {
                event_id: Some(event_id),
                reason: "data-event is not of the form 'Away @ Home'".to_string(),
            }));
        };

        let event = Event::new(event_id, event_date, competition, away_team, home_team);
        Some(Ok((event, href.to_string())))
    }

    fn extract_page(&self, event: &Event, page: &str, out: &mut Extraction) {
        let document = Html::parse_document(page);
        for (rule, market_selector) in &self.markets {
            let Some(market) = document.select(market_selector).next() else {
                continue;
            };
            match self.parse_market(event, rule, market) {
                Ok(records) => out.records.extend(records),
                Err(reason) => out.issues.push(ExtractIssue::MalformedMarket {
                    event_id: event.event_id.clone(),
                    market: rule.marker.clone(),
                    reason,
                }),
            }
        }
    }

    fn parse_market(
        &self,
        event: &Event,
        rule: &BetfairMarketRule,
        market: ElementRef<'_>,
    ) -> Result<Vec<BetRecord>, String> {
        let family = rule.bet_type.family();
        let names: Vec<String> = market.select(&self.selectors.runner_name).map(text_of).collect();
        let prices: Vec<String> = market.select(&self.selectors.runner_price).map(text_of).collect();
        let handicaps: Vec<String> = market.select(&self.selectors.runner_handicap).map(text_of).collect();

        if names.len() < 2 || prices.len() < 2 {
            return Err(format!(
                "expected two runners, found {} names and {} prices",
                names.len(),
                prices.len()
            ));
        }
        if family.has_handicap && handicaps.len() < 2 {
            return Err(format!("expected two handicaps, found {}", handicaps.len()));
        }

        let mut records = Vec::with_capacity(2);
        // position 0 is the away runner, 1 the home runner
        for position in 0..2 {
            let decimal = decimal_price(&prices[position])
                .ok_or_else(|| format!("price '{}' is not numeric", prices[position]))?;
            let mut record = BetRecord::new(Self::WEBSITE, event.event_id.clone(), rule.bet_type)
                .with_decimal(decimal);

            if family.has_team {
                record.team = event.team_at(position).map(str::to_string);
            }
            if family.has_handicap {
                let text = &handicaps[position];
                record.handicap_spread = Some(
                    handicap_line(text)
                        .and_then(parse_spread)
                        .ok_or_else(|| format!("handicap '{}' is not numeric", text))?,
                );
            }
            if family.has_polarity {
                let name = &names[position];
                record.over_under = Some(
                    Polarity::parse(name).ok_or_else(|| format!("'{}' is not an over/under side", name))?,
                );
            }
            records.push(record);
        }

        Ok(records)
    }
}

impl BookmakerAdapter for BetfairAdapter {
    fn website(&self) -> &str {
        Self::WEBSITE
    }

    fn extract(&self, payload: &RawPayload, filter: &EventFilter) -> Result<Extraction, AdapterError> {
        let RawPayload::Html { listing, event_pages } = payload else {
            return Err(AdapterError::WrongPayloadKind {
                website: Self::WEBSITE.to_string(),
                expected: "html",
                found: payload.kind(),
            });
        };
        if listing.trim().is_empty() {
            return Err(AdapterError::InvalidPayload {
                website: Self::WEBSITE.to_string(),
                reason: "coupon page is empty".to_string(),
            });
        }

        let mut out = Extraction::new(Self::WEBSITE);
        for row in self.listing_rows(listing, filter) {
            match row {
                Ok((event, _)) => {
                    if let Some(page) = event_pages.get(&event.event_id) {
                        self.extract_page(&event, page, &mut out);
                    }
                    out.events.push(event);
                }
                Err(issue) => out.issues.push(issue),
            }
        }

        Ok(out)
    }
}

fn selector(css: &str) -> Result<Selector, AdapterError> {
    Selector::parse(css).map_err(|e| AdapterError::Selector {
        marker: css.to_string(),
        reason: format!("{:?}", e),
    })
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// A decimal price that is the whole text node ("\n 2.10 "). Fractional
/// ("11/10") or suspended ("SUSP") prices are rejected, never reinterpreted.
fn decimal_price(text: &str) -> Option<&str> {
    static PRICE: OnceLock<Option<Regex>> = OnceLock::new();
    whole_token(&PRICE, r"^\s*(\d+(?:\.\d+)?)\s*$", text)
}

/// A signed line that is the whole text node, optionally parenthesized
/// ("(+3.5)", "221.5").
fn handicap_line(text: &str) -> Option<&str> {
    static LINE: OnceLock<Option<Regex>> = OnceLock::new();
    whole_token(&LINE, r"^\s*\(?\s*([-+]?\d+(?:\.\d+)?)\s*\)?\s*$", text)
}

fn whole_token<'t>(cell: &OnceLock<Option<Regex>>, pattern: &str, text: &'t str) -> Option<&'t str> {
    cell.get_or_init(|| Regex::new(pattern).ok())
        .as_ref()?
        .captures(text)?
        .get(1)
        .map(|m| m.as_str())
}
