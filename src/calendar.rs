use time::{macros::time, Date, OffsetDateTime, UtcOffset};

/// Local wall clock of the cafeteria. "Today" is the local calendar day,
/// i.e. `[00:00:00.000, 23:59:59.999]` in the configured offset.
#[derive(Debug, Clone, Copy)]
pub struct Calendar {
    offset: UtcOffset,
}

impl Calendar {
    pub fn new(offset: UtcOffset) -> Self {
        Self { offset }
    }

    pub fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.offset)
    }

    pub fn today(&self) -> Date {
        self.now().date()
    }

    pub fn day_of(&self, at: OffsetDateTime) -> Date {
        at.to_offset(self.offset).date()
    }

    pub fn end_of_day(&self, day: Date) -> OffsetDateTime {
        day.with_time(time!(23:59:59.999)).assume_offset(self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn end_of_day_follows_offset() {
        let cal = Calendar::new(UtcOffset::from_hms(5, 30, 0).unwrap());
        let day = date!(2024 - 06 - 01);
        assert_eq!(cal.end_of_day(day), datetime!(2024-06-01 18:29:59.999 UTC));
    }

    #[test]
    fn late_utc_evening_is_next_local_day() {
        let cal = Calendar::new(UtcOffset::from_hms(5, 30, 0).unwrap());
        assert_eq!(cal.day_of(datetime!(2024-06-01 20:00 UTC)), date!(2024 - 06 - 02));
    }
}
