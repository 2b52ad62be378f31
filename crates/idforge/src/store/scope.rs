use chrono::{Datelike, Local, NaiveDate};

/// Arguments passed to the counter script: `(tag, year, day)`.
///
/// Counters are keyed by all three, so every tag restarts on each new day and
/// no single key grows without bound. The key is recomputed on every attempt
/// from the current local date.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScopeKey {
    tag: String,
    year: String,
    day: String,
}

impl ScopeKey {
    /// Builds the scope for `date`: a two-digit year and the unpadded day of
    /// the year (1-366).
    ///
    /// # Example
    /// ```
    /// use chrono::NaiveDate;
    /// use idforge::ScopeKey;
    ///
    /// let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
    /// let scope = ScopeKey::new("orders", date);
    /// assert_eq!(scope.year(), "26");
    /// assert_eq!(scope.day(), "5");
    /// assert_eq!(scope.counter_key(), "orders265");
    /// ```
    pub fn new(tag: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            tag: tag.into(),
            year: format!("{:02}", date.year().rem_euclid(100)),
            day: date.ordinal().to_string(),
        }
    }

    /// Builds the scope for today's local calendar date.
    pub fn today(tag: impl Into<String>) -> Self {
        Self::new(tag, Local::now().date_naive())
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn year(&self) -> &str {
        &self.year
    }

    pub fn day(&self) -> &str {
        &self.day
    }

    /// The three arguments in script order.
    pub fn args(&self) -> [&str; 3] {
        [&self.tag, &self.year, &self.day]
    }

    /// The store key the script increments: `tag ++ year ++ day`.
    pub fn counter_key(&self) -> String {
        self.args().concat()
    }
}
