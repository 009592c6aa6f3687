/// A table the maintenance commands can read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Table {
    /// Model name used on the command line
    pub model: &'static str,
    pub name: &'static str,
    pub order_by: &'static str,
    pub columns: &'static [&'static str],
}

/// Every table, parents before children
pub const TABLES: &[Table] = &[
    Table {
        model: "user",
        name: "users",
        order_by: "username",
        columns: &[
            "id", "username", "first_name", "last_name", "email", "is_staff", "is_active",
            "created_at",
        ],
    },
    Table {
        model: "role",
        name: "roles",
        order_by: "name",
        columns: &["id", "name"],
    },
    Table {
        model: "userrole",
        name: "user_roles",
        order_by: "role_id, user_id",
        columns: &["role_id", "user_id"],
    },
    Table {
        model: "category",
        name: "categories",
        order_by: "name",
        columns: &["id", "name", "description", "created_at", "updated_at"],
    },
    Table {
        model: "course",
        name: "courses",
        order_by: "created_at, id",
        columns: &[
            "id", "category_id", "teacher_id", "title", "description", "price", "level",
            "start_date", "end_date", "is_published", "image_key", "image_url", "created_at",
            "updated_at",
        ],
    },
    Table {
        model: "coursehistory",
        name: "course_history",
        order_by: "history_id",
        columns: &[
            "history_id", "course_id", "revision", "history_type", "history_date",
            "history_user_id", "category_id", "teacher_id", "title", "description", "price",
            "level", "start_date", "end_date", "is_published", "image_url",
        ],
    },
    Table {
        model: "enrollment",
        name: "enrollments",
        order_by: "enrolled_at, id",
        columns: &["id", "user_id", "course_id", "enrolled_at", "status"],
    },
    Table {
        model: "actionlog",
        name: "action_logs",
        order_by: "action_time, id",
        columns: &["id", "user_id", "action", "entity", "entity_id", "action_time"],
    },
];

/// Case-insensitive model lookup
pub fn find_table(model: &str) -> Option<&'static Table> {
    let model = model.trim().to_lowercase();
    TABLES.iter().find(|t| t.model == model)
}

/// Rows as JSON objects keyed by column name, in `order_by` order
pub async fn fetch_rows(
    pool: &sqlx::PgPool,
    table: &Table,
) -> Result<Vec<serde_json::Map<String, serde_json::Value>>, sqlx::Error> {
    // Table and column names come from the fixed list above, never from input
    let query = format!(
        "SELECT to_jsonb(t) FROM {} t ORDER BY {}",
        table.name, table.order_by
    );
    let rows: Vec<serde_json::Value> = sqlx::query_scalar(&query).fetch_all(pool).await?;

    Ok(rows
        .into_iter()
        .filter_map(|row| match row {
            serde_json::Value::Object(map) => Some(map),
            _ => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_table_ignores_case() {
        assert_eq!(find_table("Course").map(|t| t.name), Some("courses"));
        assert_eq!(find_table(" ENROLLMENT ").map(|t| t.name), Some("enrollments"));
        assert!(find_table("ticket").is_none());
    }

    #[test]
    fn test_model_names_are_unique() {
        for (i, table) in TABLES.iter().enumerate() {
            assert!(
                TABLES[i + 1..].iter().all(|other| other.model != table.model),
                "duplicate model {}",
                table.model
            );
        }
    }
}
