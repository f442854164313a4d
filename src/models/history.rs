use chrono::{Local, NaiveDate};

use super::pomodoro::Pomodoro;

/// Chronological, append-only log of sessions that left the slot via finish.
///
/// Entries keep the order they were appended in. Nothing here reorders,
/// deduplicates or edits an entry in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    pomodoros: Vec<Pomodoro>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, pomodoro: Pomodoro) {
        self.pomodoros.push(pomodoro);
    }

    pub fn len(&self) -> usize {
        self.pomodoros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pomodoros.is_empty()
    }

    pub fn entries(&self) -> &[Pomodoro] {
        &self.pomodoros
    }

    pub fn latest(&self) -> Option<&Pomodoro> {
        self.pomodoros.last()
    }

    /// The last `limit` entries in original order.
    ///
    /// A `limit` of zero or less means no limit, as does a limit at least as
    /// long as the log.
    pub fn window(&self, limit: i64) -> &[Pomodoro] {
        let len = self.pomodoros.len();
        if limit > 0 && (limit as u64) < len as u64 {
            &self.pomodoros[len - limit as usize..]
        } else {
            &self.pomodoros
        }
    }

    /// Number of entries whose start falls on `date` in the local calendar.
    pub fn date_count(&self, date: NaiveDate) -> usize {
        self.pomodoros
            .iter()
            .filter(|p| p.start_time.with_timezone(&Local).date_naive() == date)
            .count()
    }
}

impl From<Vec<Pomodoro>> for History {
    fn from(pomodoros: Vec<Pomodoro>) -> Self {
        Self { pomodoros }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn local_noon(y: i32, m: u32, d: u32) -> chrono::DateTime<Utc> {
        Local
            .with_ymd_and_hms(y, m, d, 12, 0, 0)
            .single()
            .expect("unambiguous local noon")
            .with_timezone(&Utc)
    }

    fn entry(description: &str, start: chrono::DateTime<Utc>) -> Pomodoro {
        Pomodoro::new(start, Duration::minutes(25), description, vec![])
    }

    fn history_of(n: usize) -> History {
        let start = local_noon(2024, 3, 10);
        (0..n)
            .map(|i| entry(&format!("p{i}"), start + Duration::minutes(30 * i as i64)))
            .collect::<Vec<_>>()
            .into()
    }

    fn descriptions(entries: &[Pomodoro]) -> Vec<&str> {
        entries.iter().map(|p| p.description.as_str()).collect()
    }

    #[test]
    fn window_returns_tail_in_order() {
        let h = history_of(5);
        assert_eq!(descriptions(h.window(2)), vec!["p3", "p4"]);
    }

    #[test]
    fn window_without_limit_returns_everything() {
        let h = history_of(3);
        assert_eq!(h.window(0).len(), 3);
        assert_eq!(h.window(-1).len(), 3);
        assert_eq!(descriptions(h.window(3)), vec!["p0", "p1", "p2"]);
        assert_eq!(h.window(10).len(), 3);
    }

    #[test]
    fn window_of_empty_log_is_empty() {
        assert!(History::new().window(4).is_empty());
    }

    #[test]
    fn date_count_only_counts_matching_day() {
        let mut h = History::new();
        h.append(entry("yesterday", local_noon(2024, 3, 9)));
        h.append(entry("today-1", local_noon(2024, 3, 10)));
        h.append(entry("today-2", local_noon(2024, 3, 10) + Duration::hours(2)));

        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(h.date_count(today), 2);
        assert_eq!(h.date_count(yesterday), 1);

        h.append(entry("today-3", local_noon(2024, 3, 10)));
        assert_eq!(h.date_count(today), 3);
        assert_eq!(h.date_count(yesterday), 1);
    }

    #[test]
    fn latest_is_last_appended() {
        let mut h = History::new();
        assert!(h.latest().is_none());
        h.append(entry("late", local_noon(2024, 3, 10)));
        h.append(entry("early", local_noon(2024, 3, 1)));
        assert_eq!(h.latest().unwrap().description, "early");
    }
}
