use crate::columns::Field;
use crate::models::{Record, SourceKind};

pub fn search<'a, I>(records: I, query: &str) -> Vec<&'a Record>
where
    I: IntoIterator<Item = &'a Record>,
{
    if query.is_empty() {
        return records.into_iter().collect();
    }
    let needle = query.to_lowercase();
    records
        .into_iter()
        .filter(|record| matches_any(record, record.kind.searchable_fields(), &needle))
        .collect()
}

pub fn partition_by_status<'a, I>(records: I, status: &str) -> Vec<&'a Record>
where
    I: IntoIterator<Item = &'a Record>,
{
    records
        .into_iter()
        .filter(|record| status_is(record, status))
        .collect()
}

pub fn search_by_id<'a, I>(records: I, query: &str) -> Vec<&'a Record>
where
    I: IntoIterator<Item = &'a Record>,
{
    let needle = query.trim().to_lowercase();
    records
        .into_iter()
        .filter(|record| !record.id.is_empty())
        .filter(|record| needle.is_empty() || record.id.to_lowercase().contains(&needle))
        .collect()
}

pub fn status_is(record: &Record, status: &str) -> bool {
    field_equals(record, Field::Status, status)
}

pub fn field_equals(record: &Record, field: Field, value: &str) -> bool {
    record.columns().index_of(field).is_some()
        && record.field(field).trim().to_lowercase() == value.trim().to_lowercase()
}

pub fn count_where<'a, I>(records: I, field: Field, value: &str) -> usize
where
    I: IntoIterator<Item = &'a Record>,
{
    records
        .into_iter()
        .filter(|record| field_equals(record, field, value))
        .count()
}

pub fn count_containing<'a, I>(records: I, field: Field, needle: &str) -> usize
where
    I: IntoIterator<Item = &'a Record>,
{
    let needle = needle.to_lowercase();
    records
        .into_iter()
        .filter(|record| record.columns().index_of(field).is_some())
        .filter(|record| record.field(field).to_lowercase().contains(&needle))
        .count()
}

pub fn high_priority_pending<'a, I>(records: I, limit: usize) -> Vec<&'a Record>
where
    I: IntoIterator<Item = &'a Record>,
{
    records
        .into_iter()
        .filter(|record| record.kind == SourceKind::Tasks)
        .filter(|record| field_equals(record, Field::Priority, "High"))
        .filter(|record| status_is(record, "New") || status_is(record, "Pending"))
        .take(limit)
        .collect()
}

fn matches_any(record: &Record, fields: &[Field], needle: &str) -> bool {
    fields.iter().any(|field| {
        record.columns().index_of(*field).is_some()
            && record.field(*field).to_lowercase().contains(needle)
    })
}
