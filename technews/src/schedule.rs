//! Five-field cron expressions (minute hour day-of-month month day-of-week).

use chrono::{DateTime, Datelike, Duration, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use common::{Config, ConfigError};
use std::fmt;
use std::str::FromStr;

const MONTH_NAMES: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];
const DAY_NAMES: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

/// How far ahead `next_after` searches before giving up.
const SEARCH_DAYS: i64 = 5 * 366;

/// Parsed schedule. Each field is a bitmask of allowed values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    source: String,
    minutes: u64,
    hours: u64,
    days_of_month: u64,
    months: u64,
    days_of_week: u64,
    dom_restricted: bool,
    dow_restricted: bool,
}

struct FieldSpec {
    name: &'static str,
    min: u32,
    max: u32,
    names: &'static [&'static str],
    /// value of the first entry in `names`
    names_base: u32,
}

const MINUTE: FieldSpec = FieldSpec {
    name: "minute",
    min: 0,
    max: 59,
    names: &[],
    names_base: 0,
};
const HOUR: FieldSpec = FieldSpec {
    name: "hour",
    min: 0,
    max: 23,
    names: &[],
    names_base: 0,
};
const DAY_OF_MONTH: FieldSpec = FieldSpec {
    name: "day-of-month",
    min: 1,
    max: 31,
    names: &[],
    names_base: 0,
};
const MONTH: FieldSpec = FieldSpec {
    name: "month",
    min: 1,
    max: 12,
    names: &MONTH_NAMES,
    names_base: 1,
};
// 7 is accepted as an alias for Sunday and folded into 0.
const DAY_OF_WEEK: FieldSpec = FieldSpec {
    name: "day-of-week",
    min: 0,
    max: 7,
    names: &DAY_NAMES,
    names_base: 0,
};

impl CronSchedule {
    pub fn parse(expr: &str) -> Result<Self, ConfigError> {
        let source = expr.trim();
        let expanded = match source.to_ascii_lowercase().as_str() {
            "@yearly" | "@annually" => "0 0 1 1 *",
            "@monthly" => "0 0 1 * *",
            "@weekly" => "0 0 * * 0",
            "@daily" | "@midnight" => "0 0 * * *",
            "@hourly" => "0 * * * *",
            other if other.starts_with('@') => {
                return Err(invalid(format!("unknown descriptor {:?}", source)));
            }
            _ => source,
        };

        let fields: Vec<&str> = expanded.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(invalid(format!(
                "expected 5 fields, found {} in {:?}",
                fields.len(),
                source
            )));
        }

        let mut days_of_week = parse_field(fields[4], &DAY_OF_WEEK)?;
        if days_of_week & (1 << 7) != 0 {
            days_of_week = (days_of_week | 1) & !(1 << 7);
        }

        Ok(Self {
            source: source.to_string(),
            minutes: parse_field(fields[0], &MINUTE)?,
            hours: parse_field(fields[1], &HOUR)?,
            days_of_month: parse_field(fields[2], &DAY_OF_MONTH)?,
            months: parse_field(fields[3], &MONTH)?,
            days_of_week,
            dom_restricted: !is_wildcard(fields[2]),
            dow_restricted: !is_wildcard(fields[4]),
        })
    }

    /// Parse the configured schedule. Done at startup so a bad expression is
    /// reported with the other configuration errors.
    pub fn from_config(cfg: &Config) -> Result<Self, ConfigError> {
        Self::parse(&cfg.cron_schedule)
    }

    /// First firing time strictly after `after`, in the same time zone.
    pub fn next_after<Tz: TimeZone>(&self, after: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let tz = after.timezone();
        let local = after.naive_local();
        let start = NaiveDateTime::new(
            local.date(),
            NaiveTime::from_hms_opt(local.hour(), local.minute(), 0)?,
        ) + Duration::minutes(1);

        let mut date = start.date();
        let last = date + Duration::days(SEARCH_DAYS);

        while date <= last {
            if self.matches_day(date.month(), date.day(), date.weekday().num_days_from_sunday()) {
                let first_day = date == start.date();
                let first_hour = if first_day { start.hour() } else { 0 };

                for hour in first_hour..24 {
                    if !has(self.hours, hour) {
                        continue;
                    }
                    let first_minute = if first_day && hour == first_hour {
                        start.minute()
                    } else {
                        0
                    };
                    for minute in first_minute..60 {
                        if !has(self.minutes, minute) {
                            continue;
                        }
                        let candidate = date.and_hms_opt(hour, minute, 0)?;
                        // Skips local times that fall into a DST gap.
                        if let Some(fire) = tz.from_local_datetime(&candidate).earliest() {
                            if fire > *after {
                                return Some(fire);
                            }
                        }
                    }
                }
            }
            date = date.succ_opt()?;
        }

        None
    }

    fn matches_day(&self, month: u32, day: u32, weekday: u32) -> bool {
        if !has(self.months, month) {
            return false;
        }
        let dom = has(self.days_of_month, day);
        let dow = has(self.days_of_week, weekday);
        // Classic cron: when both day fields are restricted, either may match.
        if self.dom_restricted && self.dow_restricted {
            dom || dow
        } else {
            dom && dow
        }
    }
}

impl FromStr for CronSchedule {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn has(mask: u64, value: u32) -> bool {
    mask & (1u64 << value) != 0
}

fn is_wildcard(field: &str) -> bool {
    field == "*" || field == "?"
}

fn invalid(reason: String) -> ConfigError {
    ConfigError::Invalid {
        key: "CRON_SCHEDULE",
        reason,
    }
}

fn parse_field(field: &str, spec: &FieldSpec) -> Result<u64, ConfigError> {
    let mut mask = 0u64;
    for item in field.split(',') {
        mask |= parse_item(item, spec)?;
    }
    Ok(mask)
}

fn parse_item(item: &str, spec: &FieldSpec) -> Result<u64, ConfigError> {
    let (range, step) = match item.split_once('/') {
        Some((range, step)) => {
            let step: u32 = step.parse().map_err(|_| {
                invalid(format!("bad step {:?} in {} field", step, spec.name))
            })?;
            if step == 0 {
                return Err(invalid(format!("zero step in {} field", spec.name)));
            }
            (range, Some(step))
        }
        None => (item, None),
    };

    let (start, end) = if is_wildcard(range) {
        (spec.min, spec.max)
    } else if let Some((lo, hi)) = range.split_once('-') {
        (parse_value(lo, spec)?, parse_value(hi, spec)?)
    } else {
        let value = parse_value(range, spec)?;
        // "5/15" runs from 5 to the end of the range
        (value, if step.is_some() { spec.max } else { value })
    };

    if start > end {
        return Err(invalid(format!(
            "range {}-{} is reversed in {} field",
            start, end, spec.name
        )));
    }

    let step = step.unwrap_or(1);
    let mut mask = 0u64;
    let mut value = start;
    while value <= end {
        mask |= 1u64 << value;
        value += step;
    }
    Ok(mask)
}

fn parse_value(raw: &str, spec: &FieldSpec) -> Result<u32, ConfigError> {
    let lower = raw.to_ascii_lowercase();
    let value = match spec.names.iter().position(|n| *n == lower) {
        Some(idx) => idx as u32 + spec.names_base,
        None => raw
            .parse::<u32>()
            .map_err(|_| invalid(format!("bad value {:?} in {} field", raw, spec.name)))?,
    };

    if value < spec.min || value > spec.max {
        return Err(invalid(format!(
            "{} out of range {}-{} in {} field",
            value, spec.min, spec.max, spec.name
        )));
    }
    Ok(value)
}
