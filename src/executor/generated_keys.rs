//! Generated-keys request resolution.

use crate::{
    error::DmlError,
    row::ColumnIndex,
    session::Session,
    strutil,
    table::TableDescriptor,
};

/// How the caller asked for generated keys: every column the planner
/// considers "interesting" (identity, primary key, non-constant default),
/// an explicit list of 1-based column positions, or an explicit list of
/// column names.
#[derive(Clone, Debug)]
pub enum GeneratedKeysRequest {
    All,
    Indexes(Vec<usize>),
    Names(Vec<String>),
}

/// Resolve a request into zero-based column indexes. An index outside
/// `[1, columnCount]` or a name that cannot be matched (even after
/// case-folding per the session's `database_to_upper`/`database_to_lower`
/// setting, then a last-resort case-insensitive match) is a
/// `ColumnNotFound`. An empty resolution (including `Indexes(vec![])` and
/// `Names(vec![])`) is not an error — the caller turns it into a `Noop`
/// collector with an empty result.
pub fn resolve_generated_keys(
    session: &dyn Session,
    table: &TableDescriptor,
    request: &GeneratedKeysRequest,
) -> Result<Vec<ColumnIndex>, DmlError> {
    match request {
        GeneratedKeysRequest::All => Ok(table.interesting_columns()),
        GeneratedKeysRequest::Indexes(indexes) => indexes
            .iter()
            .map(|&i| resolve_index(table, i))
            .collect(),
        GeneratedKeysRequest::Names(names) => names
            .iter()
            .map(|name| resolve_name(session, table, name))
            .collect(),
    }
}

fn resolve_index(table: &TableDescriptor, one_based: usize) -> Result<ColumnIndex, DmlError> {
    if one_based == 0 || one_based > table.column_count() {
        return Err(DmlError::column_not_found(format!(
            "generated-keys column index {one_based} out of range [1, {}]",
            table.column_count()
        )));
    }
    Ok(one_based - 1)
}

fn resolve_name(
    session: &dyn Session,
    table: &TableDescriptor,
    name: &str,
) -> Result<ColumnIndex, DmlError> {
    if let Some(col) = table.column_by_name(name) {
        return Ok(col.ordinal);
    }

    if session.database_to_upper() {
        let upper = strutil::to_upper_english(name);
        if let Some(col) = table.column_by_name(&upper) {
            return Ok(col.ordinal);
        }
    } else if session.database_to_lower() {
        let lower = strutil::to_lower_english(name);
        if let Some(col) = table.column_by_name(&lower) {
            return Ok(col.ordinal);
        }
    }

    table
        .columns
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(name))
        .map(|c| c.ordinal)
        .ok_or_else(|| DmlError::column_not_found(format!("no column named {name}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{session::BasicSession, table::ColumnDescriptor};

    fn table() -> TableDescriptor {
        TableDescriptor::new(
            "t",
            vec![
                ColumnDescriptor {
                    name: "ID".into(),
                    ordinal: 0,
                    not_null: true,
                    is_identity: true,
                    has_default: false,
                    default_is_constant: false,
                },
                ColumnDescriptor {
                    name: "NAME".into(),
                    ordinal: 1,
                    not_null: false,
                    is_identity: false,
                    has_default: false,
                    default_is_constant: false,
                },
            ],
        )
    }

    #[test]
    fn all_resolves_to_interesting_columns() {
        let session = BasicSession::new();
        let table = table();
        let resolved = resolve_generated_keys(&session, &table, &GeneratedKeysRequest::All).unwrap();
        assert_eq!(resolved, vec![0]);
    }

    #[test]
    fn indexes_are_one_based_and_out_of_range_is_column_not_found() {
        let session = BasicSession::new();
        let table = table();
        let resolved =
            resolve_generated_keys(&session, &table, &GeneratedKeysRequest::Indexes(vec![1, 2])).unwrap();
        assert_eq!(resolved, vec![0, 1]);

        let err =
            resolve_generated_keys(&session, &table, &GeneratedKeysRequest::Indexes(vec![3])).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::ColumnNotFound);
    }

    #[test]
    fn names_fall_back_to_case_insensitive_match() {
        let session = BasicSession::new();
        let table = table();
        let resolved = resolve_generated_keys(
            &session,
            &table,
            &GeneratedKeysRequest::Names(vec!["id".into(), "name".into()]),
        )
        .unwrap();
        assert_eq!(resolved, vec![0, 1]);
    }

    #[test]
    fn unresolvable_name_is_column_not_found() {
        let session = BasicSession::new();
        let table = table();
        let err = resolve_generated_keys(
            &session,
            &table,
            &GeneratedKeysRequest::Names(vec!["nope".into()]),
        )
        .unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::ColumnNotFound);
    }
}
