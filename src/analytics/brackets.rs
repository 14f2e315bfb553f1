//! Age-bracket count aggregation.

use crate::models::{AggregatedBracketCount, Binding};

/// Numeric sort key of a bracket label: its first run of digits, or 0.
pub fn bracket_sort_key(label: &str) -> u64 {
    let digits: String = label
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

/// Sum `n` per `bracket` across all rows, ordered by the label's embedded number.
///
/// Rows without a bracket are skipped. An unparseable `n` counts as zero.
/// Labels with equal keys keep first-seen order.
pub fn aggregate_brackets<'a, I>(rows: I) -> Vec<AggregatedBracketCount>
where
    I: IntoIterator<Item = &'a Binding>,
{
    let mut counts: Vec<AggregatedBracketCount> = Vec::new();

    for row in rows {
        let Some(Some(bracket)) = row.get("bracket") else {
            continue;
        };
        let n = row
            .get("n")
            .and_then(|v| v.as_deref())
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(0);

        match counts.iter_mut().find(|c| &c.bracket == bracket) {
            Some(existing) => existing.n += n,
            None => counts.push(AggregatedBracketCount {
                bracket: bracket.clone(),
                n,
            }),
        }
    }

    counts.sort_by_key(|c| bracket_sort_key(&c.bracket));
    counts
}
