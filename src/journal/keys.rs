//! Identity keys used for deduplication and conflict lookup.

use super::types::{Relationship, ScheduleItem};

/// Case-insensitive, trimmed person name.
pub fn relationship_key(r: &Relationship) -> String {
    normalize(&r.name)
}

/// Case-insensitive, trimmed task text.
pub fn schedule_key(s: &ScheduleItem) -> String {
    normalize(&s.task)
}

/// Normalize free text the same way the keys do. Used for purge-by-name input.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn relationship_key_ignores_case_and_padding() {
        let a = Relationship::new("John");
        let b = Relationship::new("  jOHN ").with_role("Colleague");
        assert_eq!(relationship_key(&a), "john");
        assert_eq!(relationship_key(&a), relationship_key(&b));
    }

    #[test]
    fn schedule_key_ignores_time_and_date() {
        let a = ScheduleItem::new("Team Meeting", NaiveTime::from_hms_opt(11, 0, 0), None);
        let b = ScheduleItem::new("team meeting ", NaiveTime::from_hms_opt(14, 0, 0), None);
        assert_eq!(schedule_key(&a), schedule_key(&b));
    }

    #[test]
    fn keys_handle_non_ascii() {
        assert_eq!(relationship_key(&Relationship::new("ÉMILE")), "émile");
    }
}
