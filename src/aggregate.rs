//! Key/value parsing and two-level aggregation helpers.
//!
//! Every kernel source this crate reads is made of `Key:   value kB` lines. The
//! helpers here turn such lines into typed values and fold them into
//! [`CategoryMap`]s keyed by the region classifier's category key.

use ahash::AHashMap as HashMap;
use std::collections::BTreeMap;

/// Field name to accumulated value, in kilobytes unless stated otherwise.
pub type FieldMap = HashMap<String, u64>;

/// Category key (`"<PageClass>#<SubCategory>"`) to its fields.
///
/// Ordered so that reports built from it are stable between runs.
pub type CategoryMap = BTreeMap<String, FieldMap>;

/// Field whose value is subtracted, not added, by [`sum_fields`].
pub const MAPPED_FIELD: &str = "Mapped";

/// Splits a `key: value` line on the first colon.
///
/// The value is parsed from its leading decimal digits; any tail such as ` kB`
/// is ignored and a value without digits reads as zero. Returns `None` when the
/// line has no colon.
pub fn parse_key_value(line: &str) -> Option<(&str, u64)> {
    let (key, rest) = line.split_once(':')?;
    Some((key.trim(), parse_leading_u64(rest)))
}

/// Like [`parse_key_value`], but keys outside `allowed` yield a zero value.
///
/// The key itself is still returned so callers can keep a placeholder entry
/// without it contributing to totals.
pub fn parse_key_value_filtered<'a>(line: &'a str, allowed: &[&str]) -> Option<(&'a str, u64)> {
    let (key, value) = parse_key_value(line)?;
    if allowed.contains(&key) {
        Some((key, value))
    } else {
        Some((key, 0))
    }
}

/// Best-effort unsigned parse of the leading digits of `s` (after whitespace).
pub fn parse_leading_u64(s: &str) -> u64 {
    let s = s.trim_start();
    let end = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    if end == 0 {
        return 0;
    }
    // Saturate like strtoull on overflow.
    s[..end].parse().unwrap_or(u64::MAX)
}

/// Adds `value` to `field` inside `category`, creating either level on demand.
pub fn accumulate_into_group(category: &str, field: &str, value: u64, groups: &mut CategoryMap) {
    let fields = match groups.get_mut(category) {
        Some(fields) => fields,
        None => groups.entry(category.to_string()).or_default(),
    };
    accumulate_field(fields, field, value);
}

/// Adds `value` to `field` in a flat map.
pub fn accumulate_field(fields: &mut FieldMap, field: &str, value: u64) {
    match fields.get_mut(field) {
        Some(existing) => *existing = existing.saturating_add(value),
        None => {
            fields.insert(field.to_string(), value);
        }
    }
}

/// Merges every category of `other` into `into`.
pub fn merge_groups(into: &mut CategoryMap, other: CategoryMap) {
    for (category, fields) in other {
        for (field, value) in fields {
            accumulate_into_group(&category, &field, value, into);
        }
    }
}

/// Sums `fields` of a category across every category in `groups`.
pub fn sum_across_groups(groups: &CategoryMap, fields: &[&str]) -> u64 {
    groups
        .values()
        .flat_map(|values| fields.iter().filter_map(move |f| values.get(*f)))
        .fold(0u64, |acc, v| acc.saturating_add(*v))
}

/// Sums the named fields of a flat map. Missing fields count as zero.
///
/// `Mapped` is subtracted instead of added, so `Buffers + Cached - Mapped`
/// is expressed as `sum_fields(map, &["Buffers", "Cached", "Mapped"])`. The
/// result saturates at zero.
pub fn sum_fields(values: &FieldMap, fields: &[&str]) -> u64 {
    let mut added: u64 = 0;
    let mut subtracted: u64 = 0;
    for field in fields {
        let value = values.get(*field).copied().unwrap_or(0);
        if *field == MAPPED_FIELD {
            subtracted = subtracted.saturating_add(value);
        } else {
            added = added.saturating_add(value);
        }
    }
    added.saturating_sub(subtracted)
}

/// Clamps a requested worker count to the available hardware concurrency.
///
/// Falls back to one worker when the concurrency cannot be determined.
pub fn max_worker_count(requested: usize) -> usize {
    let hardware = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    requested.min(hardware).max(1)
}
