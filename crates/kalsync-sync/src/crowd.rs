//! The ordered snapshot of entries this tool created ("crowd").
//!
//! Entries are kept in a `Vec` sorted ascending by start time. Lookups use an
//! iterative binary search on the start time followed by a content comparison,
//! and insertions keep the order so later feed entries are checked against
//! earlier insertions of the same run.

use std::cmp::Ordering;

use kalsync_core::CalendarEntry;

/// Where a candidate entry belongs in the crowd.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// A content-equal entry already exists at this index.
    Duplicate(usize),
    /// No equal entry exists; inserting at this index keeps the order.
    Insert(usize),
    /// The crowd is empty, so there is nothing to compare against.
    NoReference,
}

/// Array-backed list of entries ordered by start time.
#[derive(Debug, Clone, Default)]
pub struct Crowd {
    entries: Vec<CalendarEntry>,
    probes: usize,
}

impl Crowd {
    /// Creates an empty crowd.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a crowd from entries in any order.
    ///
    /// The sort is stable, so entries sharing a start time keep their
    /// relative order.
    pub fn from_entries(mut entries: Vec<CalendarEntry>) -> Self {
        entries.sort_by_key(|e| e.start_millis);
        Self { entries, probes: 0 }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entries in start order.
    pub fn entries(&self) -> &[CalendarEntry] {
        &self.entries
    }

    /// Consumes the crowd, returning the entries in start order.
    pub fn into_entries(self) -> Vec<CalendarEntry> {
        self.entries
    }

    /// Number of midpoint probes made by the last [`locate`](Self::locate).
    pub fn probe_count(&self) -> usize {
        self.probes
    }

    /// Finds where `candidate` belongs.
    ///
    /// Candidates starting before the first or after the last entry are
    /// placed at that boundary without probing. On a start-time match every
    /// neighbour with the same start is compared, so a content-equal entry is
    /// always found; an unequal entry with the same start is placed after
    /// that run.
    pub fn locate(&mut self, candidate: &CalendarEntry) -> Placement {
        self.probes = 0;

        let (Some(first), Some(last)) = (self.entries.first(), self.entries.last()) else {
            return Placement::NoReference;
        };
        let start = candidate.start_millis;
        if start < first.start_millis {
            return Placement::Insert(0);
        }
        if start > last.start_millis {
            return Placement::Insert(self.entries.len());
        }

        let (mut low, mut high) = (0, self.entries.len());
        while low < high {
            let mid = low + (high - low) / 2;
            self.probes += 1;
            match self.entries[mid].start_millis.cmp(&start) {
                Ordering::Less => low = mid + 1,
                Ordering::Greater => high = mid,
                Ordering::Equal => return self.scan_equal_starts(mid, candidate),
            }
        }
        Placement::Insert(low)
    }

    /// Compares `candidate` against the run of entries sharing its start time.
    fn scan_equal_starts(&self, hit: usize, candidate: &CalendarEntry) -> Placement {
        let start = candidate.start_millis;
        let mut first = hit;
        while first > 0 && self.entries[first - 1].start_millis == start {
            first -= 1;
        }

        let mut end = hit;
        while end < self.entries.len() && self.entries[end].start_millis == start {
            end += 1;
        }

        match (first..end).find(|&i| self.entries[i].content_eq(candidate)) {
            Some(idx) => Placement::Duplicate(idx),
            None => Placement::Insert(end),
        }
    }

    /// Inserts `entry` at `index`, as returned by [`locate`](Self::locate).
    ///
    /// An index past the end appends.
    pub fn insert_at(&mut self, index: usize, entry: CalendarEntry) {
        let index = index.min(self.entries.len());
        self.entries.insert(index, entry);
    }

    /// Adds `entry` unless a content-equal entry exists; returns true if added.
    pub fn merge(&mut self, entry: CalendarEntry) -> bool {
        match self.locate(&entry) {
            Placement::Duplicate(_) => false,
            Placement::Insert(idx) => {
                self.insert_at(idx, entry);
                true
            }
            Placement::NoReference => {
                self.entries.push(entry);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, start: i64) -> CalendarEntry {
        CalendarEntry::new(title, start, start + 3_600_000)
    }

    fn crowd_of(starts: &[i64]) -> Crowd {
        Crowd::from_entries(
            starts
                .iter()
                .map(|s| entry(&format!("e{}", s), *s))
                .collect(),
        )
    }

    fn is_sorted(crowd: &Crowd) -> bool {
        crowd
            .entries()
            .windows(2)
            .all(|w| w[0].start_millis <= w[1].start_millis)
    }

    #[test]
    fn empty_crowd_has_no_reference() {
        let mut crowd = Crowd::new();
        assert_eq!(crowd.locate(&entry("a", 10)), Placement::NoReference);
        assert_eq!(crowd.probe_count(), 0);
    }

    #[test]
    fn from_entries_sorts() {
        let crowd = crowd_of(&[30, 10, 20]);
        let starts: Vec<i64> = crowd.entries().iter().map(|e| e.start_millis).collect();
        assert_eq!(starts, vec![10, 20, 30]);
    }

    #[test]
    fn earlier_than_all_inserts_at_front_without_probing() {
        let mut crowd = crowd_of(&[10, 20, 30, 40, 50]);
        assert_eq!(crowd.locate(&entry("early", 5)), Placement::Insert(0));
        assert_eq!(crowd.probe_count(), 0);
    }

    #[test]
    fn later_than_all_appends_without_probing() {
        let mut crowd = crowd_of(&[10, 20, 30]);
        assert_eq!(crowd.locate(&entry("late", 99)), Placement::Insert(3));
        assert_eq!(crowd.probe_count(), 0);
    }

    #[test]
    fn finds_duplicate() {
        let mut crowd = crowd_of(&[10, 20, 30, 40, 50, 60, 70]);
        assert_eq!(crowd.locate(&entry("e60", 60)), Placement::Duplicate(5));
        assert!(crowd.probe_count() > 0);
        assert!(crowd.probe_count() <= 3);
    }

    #[test]
    fn gap_inside_range_gives_sorted_position() {
        let mut crowd = crowd_of(&[10, 20, 30, 40]);
        assert_eq!(crowd.locate(&entry("mid", 25)), Placement::Insert(2));
        assert_eq!(crowd.locate(&entry("mid", 11)), Placement::Insert(1));
    }

    #[test]
    fn same_start_different_content_is_inserted_after_run() {
        let mut crowd = crowd_of(&[10, 20, 30]);
        crowd.insert_at(2, entry("other", 20));

        assert_eq!(crowd.locate(&entry("third", 20)), Placement::Insert(3));
    }

    #[test]
    fn duplicate_found_anywhere_in_equal_run() {
        let mut crowd = Crowd::from_entries(vec![
            entry("a", 10),
            entry("b", 20),
            entry("c", 20),
            entry("d", 20),
            entry("e", 20),
            entry("f", 30),
        ]);

        assert_eq!(crowd.locate(&entry("b", 20)), Placement::Duplicate(1));
        assert_eq!(crowd.locate(&entry("e", 20)), Placement::Duplicate(4));
    }

    #[test]
    fn content_mismatch_on_end_is_not_duplicate() {
        let mut crowd = crowd_of(&[10, 20]);
        let longer = CalendarEntry::new("e20", 20, 20 + 7_200_000);
        assert_eq!(crowd.locate(&longer), Placement::Insert(2));
    }

    #[test]
    fn merge_keeps_order_and_skips_duplicates() {
        let mut crowd = Crowd::new();
        for start in [50, 10, 40, 20, 30, 10] {
            crowd.merge(entry(&format!("e{}", start), start));
        }

        assert_eq!(crowd.len(), 5);
        assert!(is_sorted(&crowd));
        assert!(!crowd.merge(entry("e30", 30)));
    }

    #[test]
    fn insert_at_clamps_index() {
        let mut crowd = crowd_of(&[10]);
        crowd.insert_at(10, entry("tail", 20));
        assert_eq!(crowd.entries()[1].title, "tail");
    }
}
