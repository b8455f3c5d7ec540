/// Row shape of `users`, as read during login.
#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub id: u64,
    pub username: String,
    pub password: String,
    pub role: String,
    pub is_active: bool,
}
