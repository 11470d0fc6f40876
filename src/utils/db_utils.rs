use chrono::NaiveDate;
use serde_json::Value;
use sqlx::{Executor, MySql};

use crate::error::AppError;

/// SQL bindable value
#[derive(Debug, PartialEq)]
pub enum SqlValue {
    String(String),
    U64(u64),
    Date(NaiveDate),
    Null,
}

/// Column accepted by a partial update and how its JSON value is read.
#[derive(Debug, Clone, Copy)]
pub enum ColumnKind {
    Text,
    OptionalText,
    OptionalId,
    OptionalDate,
}

#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
    /// Columns touched, in SET order.
    pub columns: Vec<String>,
}

/// Builds a dynamic `UPDATE` from a JSON object.
///
/// Only keys listed in `allowed` become columns, so the statement never
/// contains caller-chosen identifiers. Keys are emitted in sorted order.
pub fn build_update_sql(
    table: &str,
    payload: &Value,
    allowed: &[(&str, ColumnKind)],
    id_column: &str,
    id_value: u64,
) -> Result<SqlUpdate, AppError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| AppError::Validation("Payload must be a JSON object".into()))?;

    if obj.is_empty() {
        return Err(AppError::Validation("No fields provided for update".into()));
    }

    let mut keys: Vec<&String> = obj.keys().collect();
    keys.sort();

    let mut columns = Vec::with_capacity(keys.len());
    let mut values = Vec::with_capacity(keys.len() + 1);

    for key in keys {
        let kind = allowed
            .iter()
            .find(|(name, _)| *name == key.as_str())
            .map(|(_, kind)| *kind)
            .ok_or_else(|| AppError::Validation(format!("Field '{key}' cannot be updated")))?;

        values.push(convert(key, &obj[key.as_str()], kind)?);
        columns.push(key.clone());
    }

    let set_clause = columns
        .iter()
        .map(|c| format!("{c} = ?"))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!("UPDATE {table} SET {set_clause} WHERE {id_column} = ?");
    values.push(SqlValue::U64(id_value));

    Ok(SqlUpdate {
        sql,
        values,
        columns,
    })
}

fn convert(key: &str, value: &Value, kind: ColumnKind) -> Result<SqlValue, AppError> {
    let bad = |expected: &str| AppError::Validation(format!("Field '{key}' must be {expected}"));

    match (kind, value) {
        (ColumnKind::OptionalText | ColumnKind::OptionalId | ColumnKind::OptionalDate, Value::Null) => {
            Ok(SqlValue::Null)
        }
        (ColumnKind::Text | ColumnKind::OptionalText, Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Err(bad("a non-empty string"));
            }
            Ok(SqlValue::String(s.to_string()))
        }
        (ColumnKind::Text | ColumnKind::OptionalText, _) => Err(bad("a string")),
        (ColumnKind::OptionalId, Value::Number(n)) => n
            .as_u64()
            .filter(|id| *id > 0)
            .map(SqlValue::U64)
            .ok_or_else(|| bad("a positive integer")),
        (ColumnKind::OptionalId, _) => Err(bad("a positive integer")),
        (ColumnKind::OptionalDate, Value::String(s)) => {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(SqlValue::Date)
                .map_err(|_| bad("a date (YYYY-MM-DD)"))
        }
        (ColumnKind::OptionalDate, _) => Err(bad("a date (YYYY-MM-DD)")),
    }
}

/// Executes the update on a pool or inside a transaction.
pub async fn execute_update<'e, E>(executor: E, update: &'e SqlUpdate) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = MySql>,
{
    let mut query = sqlx::query(&update.sql);

    for value in &update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v.clone()),
            SqlValue::U64(v) => query.bind(*v),
            SqlValue::Date(v) => query.bind(*v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(executor).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const EMPLOYEE_COLUMNS: &[(&str, ColumnKind)] = &[
        ("name", ColumnKind::Text),
        ("department_id", ColumnKind::OptionalId),
        ("hire_date", ColumnKind::OptionalDate),
    ];

    #[test]
    fn builds_sorted_set_clause() {
        let update = build_update_sql(
            "employees",
            &json!({"name": " Ana ", "department_id": 3, "hire_date": "2024-01-15"}),
            EMPLOYEE_COLUMNS,
            "id",
            12,
        )
        .unwrap();

        assert_eq!(
            update.sql,
            "UPDATE employees SET department_id = ?, hire_date = ?, name = ? WHERE id = ?"
        );
        assert_eq!(
            update.values,
            vec![
                SqlValue::U64(3),
                SqlValue::Date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()),
                SqlValue::String("Ana".into()),
                SqlValue::U64(12),
            ]
        );
    }

    #[test]
    fn rejects_unknown_columns() {
        let err = build_update_sql(
            "employees",
            &json!({"name": "Ana", "id = 1; DROP TABLE employees; --": 1}),
            EMPLOYEE_COLUMNS,
            "id",
            1,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn nulls_only_for_optional_columns() {
        let ok = build_update_sql("employees", &json!({"hire_date": null}), EMPLOYEE_COLUMNS, "id", 1)
            .unwrap();
        assert_eq!(ok.values[0], SqlValue::Null);

        assert!(build_update_sql("employees", &json!({"name": null}), EMPLOYEE_COLUMNS, "id", 1).is_err());
    }

    #[test]
    fn rejects_empty_and_mistyped_payloads() {
        assert!(build_update_sql("employees", &json!({}), EMPLOYEE_COLUMNS, "id", 1).is_err());
        assert!(build_update_sql("employees", &json!([1, 2]), EMPLOYEE_COLUMNS, "id", 1).is_err());
        assert!(
            build_update_sql("employees", &json!({"department_id": "3"}), EMPLOYEE_COLUMNS, "id", 1)
                .is_err()
        );
        assert!(
            build_update_sql("employees", &json!({"hire_date": "15/01/2024"}), EMPLOYEE_COLUMNS, "id", 1)
                .is_err()
        );
    }
}
