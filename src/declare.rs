use std::fmt;

use chrono::{DateTime, Local, NaiveDate};

/// A snapshot of the tracked instrument, fresh on every poll.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub symbol: String,
    /// The tracked price or rate. Change detection looks at this field only.
    pub value: f64,
    pub observed_at: DateTime<Local>,
    /// Extra fields some providers return; display only.
    pub detail: Option<QuoteDetail>,
}

impl Quote {
    pub fn new(symbol: impl Into<String>, value: f64) -> Self {
        Quote {
            symbol: symbol.into(),
            value,
            observed_at: Local::now(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: QuoteDetail) -> Self {
        self.detail = Some(detail);
        self
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} @ {}",
            self.symbol,
            self.value,
            self.observed_at.format("%F %X")
        )?;

        if let Some(d) = &self.detail {
            write!(
                f,
                " (open {} high {} low {} prev {} chg {} / {}%)",
                d.open, d.high, d.low, d.previous_close, d.change, d.change_percent
            )?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuoteDetail {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub volume: i64,
    pub latest_trading_day: Option<NaiveDate>,
    pub previous_close: f64,
    pub change: f64,
    pub change_percent: f64,
}

/// Which way the value moved between two polls.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    /// Only produced by a forced cycle; a scheduled one never reports an unchanged value.
    Flat,
}

impl Direction {
    pub fn between(previous: f64, current: f64) -> Self {
        if current > previous {
            Direction::Up
        } else if current < previous {
            Direction::Down
        } else {
            Direction::Flat
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            Direction::Up => "↗",
            Direction::Down => "↘",
            Direction::Flat => "→",
        }
    }

    pub fn word(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Flat => "unchanged",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_between() {
        assert_eq!(Direction::between(100.0, 101.5), Direction::Up);
        assert_eq!(Direction::between(100.0, 99.99), Direction::Down);
        assert_eq!(Direction::between(100.0, 100.0), Direction::Flat);
        assert_eq!(Direction::Up.glyph(), "↗");
        assert_eq!(Direction::Down.word(), "down");
    }

    #[test]
    fn test_quote_display() {
        let q = Quote::new("^BVSP", 128431.2);
        assert!(q.to_string().starts_with("^BVSP 128431.2 @ "));
    }
}
