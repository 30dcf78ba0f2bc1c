// Delivery schedule decisions.
//
// Preference forms store the frequency as Czech phrases: "Jednou denně",
// "Každý den", or day entries like "Středa v 12:00", comma-separated. The
// cron machinery that fires tasks lives outside this repo; this module only
// answers "is a digest due in this hour" for a parsed preference.

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};

/// Hour used when a preference names no time.
const DEFAULT_HOUR: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Daily { hour: u32 },
    Weekly { day: Weekday, hour: u32 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    slots: Vec<Slot>,
}

impl Schedule {
    /// Parse a frequency preference. Unrecognized entries are ignored; an
    /// unparseable preference yields an empty schedule that is never due.
    pub fn parse(preference: &str) -> Self {
        let slots = preference
            .split(',')
            .filter_map(|entry| parse_entry(entry.trim()))
            .collect();
        Self { slots }
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether any slot matches the given local civil time's day and hour.
    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        self.slots.iter().any(|slot| match slot {
            Slot::Daily { hour } => now.hour() == *hour,
            Slot::Weekly { day, hour } => now.weekday() == *day && now.hour() == *hour,
        })
    }
}

fn parse_entry(entry: &str) -> Option<Slot> {
    if entry.is_empty() {
        return None;
    }
    if entry.contains("Jednou denně") || entry.contains("Každý den") {
        return Some(Slot::Daily { hour: DEFAULT_HOUR });
    }

    match entry.split_once(" v ") {
        Some((day, time)) => {
            let day = czech_weekday(day.trim())?;
            let hour: u32 = time.trim().split(':').next()?.parse().ok()?;
            (hour < 24).then_some(Slot::Weekly { day, hour })
        }
        None => czech_weekday(entry).map(|day| Slot::Weekly {
            day,
            hour: DEFAULT_HOUR,
        }),
    }
}

fn czech_weekday(name: &str) -> Option<Weekday> {
    match name {
        "Pondělí" => Some(Weekday::Mon),
        "Úterý" => Some(Weekday::Tue),
        "Středa" => Some(Weekday::Wed),
        "Čtvrtek" => Some(Weekday::Thu),
        "Pátek" => Some(Weekday::Fri),
        "Sobota" => Some(Weekday::Sat),
        "Neděle" => Some(Weekday::Sun),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn daily_preference_is_due_at_noon_only() {
        let schedule = Schedule::parse("Jednou denně");
        assert!(schedule.is_due(at(2026, 8, 5, 12)));
        assert!(!schedule.is_due(at(2026, 8, 5, 13)));
        // any weekday works
        assert!(schedule.is_due(at(2026, 8, 9, 12)));
    }

    #[test]
    fn specific_day_and_time() {
        // 2026-08-05 is a Wednesday
        let schedule = Schedule::parse("Středa v 10:00");
        assert!(schedule.is_due(at(2026, 8, 5, 10)));
        assert!(!schedule.is_due(at(2026, 8, 5, 12)));
        assert!(!schedule.is_due(at(2026, 8, 6, 10)));
    }

    #[test]
    fn comma_separated_entries_combine() {
        let schedule = Schedule::parse("Pondělí v 10:00, Středa v 12:00");
        assert!(schedule.is_due(at(2026, 8, 3, 10))); // Monday
        assert!(schedule.is_due(at(2026, 8, 5, 12))); // Wednesday
        assert!(!schedule.is_due(at(2026, 8, 3, 12)));
    }

    #[test]
    fn bare_day_name_defaults_to_noon() {
        let schedule = Schedule::parse("Pátek");
        assert!(schedule.is_due(at(2026, 8, 7, 12)));
        assert!(!schedule.is_due(at(2026, 8, 7, 9)));
    }

    #[test]
    fn unknown_entries_are_ignored() {
        let schedule = Schedule::parse("kdykoliv, Středa v 12:00");
        assert!(schedule.is_due(at(2026, 8, 5, 12)));

        let empty = Schedule::parse("kdykoliv");
        assert!(empty.is_empty());
        assert!(!empty.is_due(at(2026, 8, 5, 12)));
    }

    #[test]
    fn out_of_range_hour_is_rejected() {
        assert!(Schedule::parse("Středa v 25:00").is_empty());
    }
}
