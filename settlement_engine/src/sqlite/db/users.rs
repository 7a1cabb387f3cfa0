use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewUser, User, UserId},
    traits::StoreError,
};

pub async fn insert_user(user: NewUser, conn: &mut SqliteConnection) -> Result<User, StoreError> {
    let user: User = sqlx::query_as(
        r#"
            INSERT INTO users (id, name, email, created_at) VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(user.id)
    .bind(user.name)
    .bind(user.email)
    .bind(chrono::Utc::now())
    .fetch_one(conn)
    .await?;
    debug!("🗃️ User {} created", user.id);
    Ok(user)
}

pub async fn fetch_user(id: &UserId, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(id.as_str()).fetch_optional(conn).await
}

/// The `email` column is declared `COLLATE NOCASE`, so this lookup ignores case.
pub async fn fetch_user_by_email(email: &str, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE email = $1").bind(email.trim()).fetch_optional(conn).await
}

pub async fn fetch_user_for_customer_ref(
    customer_ref: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT users.* FROM users
            JOIN customer_links ON customer_links.user_id = users.id
            WHERE customer_links.customer_ref = $1
        "#,
    )
    .bind(customer_ref)
    .fetch_optional(conn)
    .await
}

/// Links the provider customer reference to the user. Returns `true` if a new link was created, and `false` if the
/// reference was already linked (to this or any other user).
pub async fn link_customer_ref(
    customer_ref: &str,
    user_id: &UserId,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO customer_links (customer_ref, user_id, created_at) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
    )
    .bind(customer_ref)
    .bind(user_id.as_str())
    .bind(chrono::Utc::now())
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}
