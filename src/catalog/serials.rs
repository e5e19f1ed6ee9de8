//! Serial-number inventory stored as a newline-delimited text blob.
//!
//! A serial is a trimmed, non-empty line. Stock is the number of serials, so
//! blank lines never count. Every write goes through [`join`], which means a
//! stored blob holds one serial per line with no blank lines and no padding.

use std::collections::HashSet;

/// Serials in the blob, in stored order.
pub fn list(blob: &str) -> Vec<&str> {
    blob.lines().map(str::trim).filter(|s| !s.is_empty()).collect()
}

pub fn count(blob: &str) -> i64 {
    list(blob).len() as i64
}

/// Splits every input element on newlines and keeps the non-blank trimmed pieces.
pub fn split<S: AsRef<str>>(items: &[S]) -> Vec<String> {
    items
        .iter()
        .flat_map(|item| list(item.as_ref()))
        .map(str::to_owned)
        .collect()
}

pub fn join<S: AsRef<str>>(serials: &[S]) -> String {
    serials
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Canonical blob for a full replacement, duplicates dropped.
pub fn normalize<S: AsRef<str>>(items: &[S]) -> String {
    append("", items)
}

/// Appends `items` to `blob`, skipping serials already present and repeats inside the batch.
pub fn append<S: AsRef<str>>(blob: &str, items: &[S]) -> String {
    let mut kept: Vec<String> = Vec::new();
    let mut seen = HashSet::new();
    for serial in list(blob).into_iter().map(str::to_owned).chain(split(items)) {
        if seen.insert(serial.clone()) {
            kept.push(serial);
        }
    }
    join(&kept)
}

/// Drops every line equal (after trimming) to one of `items`.
pub fn remove<S: AsRef<str>>(blob: &str, items: &[S]) -> String {
    let doomed: HashSet<String> = split(items).into_iter().collect();
    let kept: Vec<&str> = list(blob)
        .into_iter()
        .filter(|s| !doomed.contains(*s))
        .collect();
    join(&kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_ignores_blank_lines_and_whitespace() {
        assert_eq!(count(""), 0);
        assert_eq!(count("\n\n   \n"), 0);
        assert_eq!(count("A1\n\nB2\n  \nC3\n"), 3);
        assert_eq!(count("  A1  \r\nB2\r\n"), 2);
    }

    #[test]
    fn list_trims_each_serial() {
        assert_eq!(list(" A1 \r\n\nB2"), vec!["A1", "B2"]);
    }

    #[test]
    fn array_elements_are_split_on_newlines() {
        let items = ["A1\nB2", "  C3 ", ""];
        assert_eq!(split(&items), vec!["A1", "B2", "C3"]);
    }

    #[test]
    fn normalize_produces_canonical_blob() {
        assert_eq!(normalize(&["A1\n\n B2 \n", "A1", "C3"]), "A1\nB2\nC3");
        assert_eq!(normalize::<&str>(&[]), "");
    }

    #[test]
    fn append_skips_known_and_repeated_serials() {
        let blob = append("A1\nB2", &["B2", "C3", "C3", "D4"]);
        assert_eq!(blob, "A1\nB2\nC3\nD4");
        assert_eq!(append("", &["X"]), "X");
        assert_eq!(append("\n\nA1\n", &["\n"]), "A1");
    }

    #[test]
    fn remove_drops_every_matching_line() {
        assert_eq!(remove("A1\nB2\n B2 \nC3", &["B2"]), "A1\nC3");
        assert_eq!(remove("A1\nB2", &["Z9"]), "A1\nB2");
        assert_eq!(remove("", &["A1"]), "");
    }

    #[test]
    fn add_then_remove_restores_stock() {
        let start = "A1\n\nB2\n";
        let before = count(start);
        let added = append(start, &["NEW-1\nNEW-2"]);
        assert_eq!(count(&added), before + 2);
        let removed = remove(&added, &["NEW-1", "NEW-2"]);
        assert_eq!(count(&removed), before);
        assert_eq!(removed, "A1\nB2");
    }
}
