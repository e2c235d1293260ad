//! Post-processing of listed records.

use std::collections::HashSet;

use leadflow_airtable::Record;

/// Drops records whose id was already seen, keeping the first occurrence.
///
/// Listings are not deduplicated across pages, so a record that moves
/// between pages mid-listing can show up twice. Returns the number of
/// records dropped.
pub(crate) fn dedup_by_id(records: &mut Vec<Record>) -> usize {
    let before = records.len();
    let mut seen = HashSet::with_capacity(before);
    records.retain(|record| seen.insert(record.id.clone()));
    before - records.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_first_occurrence() {
        let mut records = vec![
            Record::new("recA").with_field("Address", "first"),
            Record::new("recB"),
            Record::new("recA").with_field("Address", "second"),
        ];

        assert_eq!(dedup_by_id(&mut records), 1);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "recA");
        assert_eq!(
            records[0].field("Address").and_then(|v| v.as_str()),
            Some("first")
        );
        assert_eq!(records[1].id, "recB");
    }

    #[test]
    fn test_unique_records_untouched() {
        let mut records = vec![Record::new("recA"), Record::new("recB")];
        assert_eq!(dedup_by_id(&mut records), 0);
        assert_eq!(records.len(), 2);
    }
}
