//! Grouping of records into frequency tables, peaks and bucket means.

use std::collections::HashMap;
use std::hash::Hash;

use chrono::{DateTime, Timelike, Utc};
use mindcare_schema::{BucketAverage, PatternTable, Peak};

/// Count records by one key each.
pub fn group_by<R, K, F>(records: &[R], key_fn: F) -> PatternTable<K>
where
    K: Eq + Hash + Clone,
    F: Fn(&R) -> K,
{
    records.iter().map(|r| (key_fn(r), 1)).collect()
}

/// Count records that carry any number of keys. A record contributes once per
/// key it yields.
pub fn group_by_many<R, K, I, F>(records: &[R], keys_fn: F) -> PatternTable<K>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = K>,
    F: Fn(&R) -> I,
{
    records
        .iter()
        .flat_map(|r| keys_fn(r).into_iter().map(|k| (k, 1)))
        .collect()
}

/// Busiest bucket. On a tie the first-seen key wins; an empty table has no peak.
pub fn peak<K: Eq + Hash + Clone>(table: &PatternTable<K>) -> Option<Peak<K>> {
    let mut best: Option<(&K, usize)> = None;
    for (key, count) in table.iter() {
        match best {
            Some((_, top)) if count <= top => {}
            _ => best = Some((key, count)),
        }
    }
    best.map(|(key, count)| Peak {
        key: key.clone(),
        count,
    })
}

/// Highest counts first; equal counts keep first-seen order.
pub fn top_n<K: Eq + Hash + Clone>(table: &PatternTable<K>, n: usize) -> Vec<Peak<K>> {
    let mut peaks: Vec<Peak<K>> = table
        .iter()
        .map(|(key, count)| Peak {
            key: key.clone(),
            count,
        })
        .collect();
    peaks.sort_by(|a, b| b.count.cmp(&a.count));
    peaks.truncate(n);
    peaks
}

/// Case-insensitive substring mentions. Each text counts at most once per
/// keyword; keywords never mentioned are absent from the table.
pub fn count_keywords<S: AsRef<str>>(texts: &[S], keywords: &[&str]) -> PatternTable<String> {
    let mut table = PatternTable::new();
    for text in texts {
        let lowered = text.as_ref().to_lowercase();
        for keyword in keywords {
            if lowered.contains(&keyword.to_lowercase()) {
                table.increment(keyword.to_string());
            }
        }
    }
    table
}

/// Mean of `value_fn` per bucket, buckets in first-seen order.
pub fn average_by<R, K, F, V>(records: &[R], key_fn: F, value_fn: V) -> Vec<BucketAverage>
where
    K: Eq + Hash + Clone + ToString,
    F: Fn(&R) -> K,
    V: Fn(&R) -> f64,
{
    average_by_many(records, |r| std::iter::once(key_fn(r)), value_fn)
}

/// Like [`average_by`] for records that land in several buckets.
pub fn average_by_many<R, K, I, F, V>(records: &[R], keys_fn: F, value_fn: V) -> Vec<BucketAverage>
where
    K: Eq + Hash + Clone + ToString,
    I: IntoIterator<Item = K>,
    F: Fn(&R) -> I,
    V: Fn(&R) -> f64,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut buckets: Vec<(K, f64, usize)> = Vec::new();
    for record in records {
        let value = value_fn(record);
        for key in keys_fn(record) {
            let pos = *index.entry(key.clone()).or_insert_with(|| {
                buckets.push((key, 0.0, 0));
                buckets.len() - 1
            });
            buckets[pos].1 += value;
            buckets[pos].2 += 1;
        }
    }
    buckets
        .into_iter()
        .map(|(key, sum, count)| BucketAverage {
            key: key.to_string(),
            mean: sum / count as f64,
            count,
        })
        .collect()
}

/// `numerator / denominator`, zero when the denominator is zero.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Share of `whole` as a percentage, zero when `whole` is zero.
pub fn percentage(part: usize, whole: usize) -> f64 {
    ratio(part as f64, whole as f64) * 100.0
}

pub fn hour_of_day(ts: &DateTime<Utc>) -> u32 {
    ts.hour()
}

/// English weekday name, e.g. `Monday`.
pub fn weekday_name(ts: &DateTime<Utc>) -> String {
    ts.format("%A").to_string()
}

pub fn day_of(ts: &DateTime<Utc>) -> chrono::NaiveDate {
    ts.date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn peak_of_empty_table_is_none() {
        let table: PatternTable<String> = PatternTable::new();
        assert!(peak(&table).is_none());
    }

    #[test]
    fn peak_prefers_first_seen_on_tie() {
        let words = ["calm", "tired", "tired", "calm", "happy"];
        let table = group_by(&words, |w| w.to_string());
        let top = peak(&table).unwrap();
        assert_eq!(top.key, "calm");
        assert_eq!(top.count, 2);
    }

    #[test]
    fn group_by_many_counts_each_key() {
        let logs = vec![vec!["walk", "read"], vec!["walk"], vec![]];
        let table = group_by_many(&logs, |l| l.iter().map(|s| s.to_string()).collect::<Vec<_>>());
        assert_eq!(table.get(&"walk".to_string()), 2);
        assert_eq!(table.get(&"read".to_string()), 1);
        assert_eq!(table.total(), 3);
    }

    #[test]
    fn top_n_is_stable_for_equal_counts() {
        let table: PatternTable<String> = vec![
            ("stress".to_string(), 1),
            ("feel".to_string(), 3),
            ("help".to_string(), 1),
            ("mood".to_string(), 2),
        ]
        .into_iter()
        .collect();
        let keys: Vec<_> = top_n(&table, 3).into_iter().map(|p| p.key).collect();
        assert_eq!(keys, vec!["feel", "mood", "stress"]);
    }

    #[test]
    fn keywords_count_once_per_text_ignoring_case() {
        let texts = [
            "Stress and more STRESS",
            "I feel better",
            "nothing here",
            "feeling stressed",
        ];
        let table = count_keywords(&texts, &["stress", "feel", "therapy"]);
        assert_eq!(table.get(&"stress".to_string()), 2);
        assert_eq!(table.get(&"feel".to_string()), 2);
        assert_eq!(table.get(&"therapy".to_string()), 0);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn average_by_groups_means() {
        let rows = [("mon", 4.0), ("tue", 6.0), ("mon", 8.0)];
        let avgs = average_by(&rows, |r| r.0, |r| r.1);
        assert_eq!(avgs.len(), 2);
        assert_eq!(avgs[0].key, "mon");
        assert_eq!(avgs[0].mean, 6.0);
        assert_eq!(avgs[0].count, 2);
        assert_eq!(avgs[1].mean, 6.0);
    }

    #[test]
    fn average_by_many_spreads_value_over_keys() {
        let rows = [(vec!["a", "b"], 2.0), (vec!["b"], 4.0)];
        let avgs = average_by_many(&rows, |r| r.0.clone(), |r| r.1);
        assert_eq!(avgs[0].key, "a");
        assert_eq!(avgs[0].mean, 2.0);
        assert_eq!(avgs[1].key, "b");
        assert_eq!(avgs[1].mean, 3.0);
    }

    #[test]
    fn ratios_guard_zero_denominator() {
        assert_eq!(ratio(3.0, 0.0), 0.0);
        assert_eq!(ratio(3.0, 4.0), 0.75);
        assert_eq!(percentage(1, 0), 0.0);
        assert_eq!(percentage(1, 4), 25.0);
    }

    #[test]
    fn calendar_keys() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 6, 14, 30, 0).unwrap();
        assert_eq!(hour_of_day(&ts), 14);
        assert_eq!(weekday_name(&ts), "Monday");
        assert_eq!(day_of(&ts).to_string(), "2024-05-06");
    }
}
