pub mod password;
pub mod session;

use rusqlite::{params, OptionalExtension};

use crate::db::models::{Role, User};
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

/// Create a new account. The first user ever registered becomes the
/// administrator; the decision happens inside the same transaction as the
/// insert so two racing registrations cannot both claim the role.
pub fn register(pool: &DbPool, email: &str, password: &str, name: &str) -> AppResult<User> {
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    let taken: bool = tx.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE email = ?1",
        params![email],
        |row| row.get(0),
    )?;
    if taken {
        return Err(AppError::DuplicateEmail);
    }

    let existing: i64 = tx.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
    let role = if existing == 0 {
        Role::Admin
    } else {
        Role::Member
    };

    let hash = password::hash_password(password)?;
    tx.execute(
        "INSERT INTO users (email, password_hash, name, role) VALUES (?1, ?2, ?3, ?4)",
        params![email, hash, name, role.as_str()],
    )?;
    let id = tx.last_insert_rowid();
    let created_at: String = tx.query_row(
        "SELECT created_at FROM users WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    tx.commit()?;

    Ok(User {
        id,
        email: email.to_string(),
        name: name.to_string(),
        role,
        created_at,
    })
}

/// Check credentials. Does not create a session; callers do that on success.
pub fn login(pool: &DbPool, email: &str, password: &str) -> AppResult<User> {
    let conn = pool.get()?;
    let row = conn
        .query_row(
            "SELECT id, password_hash, name, role, created_at FROM users WHERE email = ?1",
            params![email],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        )
        .optional()?;

    let (id, hash, name, role, created_at) = row.ok_or(AppError::UnknownEmail)?;
    if !password::verify_password(password, &hash) {
        return Err(AppError::BadPassword);
    }

    Ok(User {
        id,
        email: email.to_string(),
        name,
        role: Role::from_db(&role),
        created_at,
    })
}

/// All registered users in registration order. Used by the broadcast page
/// and the mail batch.
pub fn list_users(pool: &DbPool) -> AppResult<Vec<User>> {
    let conn = pool.get()?;
    let mut stmt =
        conn.prepare("SELECT id, email, name, role, created_at FROM users ORDER BY id")?;
    let users = stmt
        .query_map([], |row| {
            Ok(User {
                id: row.get(0)?,
                email: row.get(1)?,
                name: row.get(2)?,
                role: Role::from_db(&row.get::<_, String>(3)?),
                created_at: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}
