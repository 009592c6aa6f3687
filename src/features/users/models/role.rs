use sqlx::FromRow;
use uuid::Uuid;

/// Database model for role (with member usernames aggregated)
#[derive(Debug, Clone, FromRow)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub members: Vec<String>,
}
