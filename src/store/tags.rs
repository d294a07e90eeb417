// server_tags table: free-form key/value pairs

use sqlx::{Row, SqliteConnection};

use super::StoreError;
use crate::models::Tag;

pub async fn insert_tag(
    conn: &mut SqliteConnection,
    server_id: i64,
    tag: &Tag,
) -> Result<(), StoreError> {
    sqlx::query("INSERT INTO server_tags (server_id, tag_name, tag_value) VALUES ($1, $2, $3)")
        .bind(server_id)
        .bind(&tag.name)
        .bind(&tag.value)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn tags_for_server(
    conn: &mut SqliteConnection,
    server_id: i64,
) -> Result<Vec<Tag>, StoreError> {
    let rows = sqlx::query(
        "SELECT tag_name, tag_value FROM server_tags WHERE server_id = $1 ORDER BY id",
    )
    .bind(server_id)
    .fetch_all(&mut *conn)
    .await?;
    rows.iter()
        .map(|row| -> Result<Tag, StoreError> {
            Ok(Tag {
                name: row.try_get("tag_name")?,
                value: row.try_get("tag_value")?,
            })
        })
        .collect()
}
