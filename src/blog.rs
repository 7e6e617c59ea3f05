//! Content service: posts and comments, mapped directly to store queries.
//!
//! Posts are created, edited, and deleted by the administrator; comments are
//! append-only and exist only as long as their parent post does.

use rusqlite::{params, OptionalExtension};

use crate::db::models::{Comment, Post};
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

/// Fields common to creating and editing a post.
#[derive(Debug, Clone)]
pub struct PostFields {
    pub title: String,
    pub subtitle: String,
    pub body: String,
    pub img_url: String,
}

const SELECT_POST: &str =
    "SELECT p.id, p.title, p.subtitle, p.body, p.date, p.img_url, p.author_id, u.name \
     FROM posts p JOIN users u ON u.id = p.author_id";

fn post_from_row(row: &rusqlite::Row<'_>) -> Result<Post, rusqlite::Error> {
    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        subtitle: row.get(2)?,
        body: row.get(3)?,
        date: row.get(4)?,
        img_url: row.get(5)?,
        author_id: row.get(6)?,
        author_name: row.get(7)?,
    })
}

/// All posts in insertion order.
pub fn list_posts(pool: &DbPool) -> AppResult<Vec<Post>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!("{SELECT_POST} ORDER BY p.id"))?;
    let posts = stmt
        .query_map([], post_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}

/// A single post, or None when the id has no match.
pub fn get_post(pool: &DbPool, id: i64) -> AppResult<Option<Post>> {
    let conn = pool.get()?;
    let post = conn
        .query_row(
            &format!("{SELECT_POST} WHERE p.id = ?1"),
            params![id],
            post_from_row,
        )
        .optional()?;
    Ok(post)
}

/// Create a post, stamping the display date ("April 05, 2024") from the
/// current local date.
pub fn create_post(pool: &DbPool, fields: &PostFields, author_id: i64) -> AppResult<Post> {
    let conn = pool.get()?;

    let taken: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM posts WHERE title = ?1",
        params![fields.title],
        |row| row.get(0),
    )?;
    if taken {
        return Err(AppError::DuplicateTitle);
    }

    let date = chrono::Local::now().format("%B %d, %Y").to_string();
    conn.execute(
        "INSERT INTO posts (title, subtitle, body, date, img_url, author_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            fields.title,
            fields.subtitle,
            fields.body,
            date,
            fields.img_url,
            author_id
        ],
    )?;
    let id = conn.last_insert_rowid();
    drop(conn);

    get_post(pool, id)?.ok_or(AppError::NotFound)
}

/// In-place update of an existing post. The display date is kept as stamped
/// at creation.
pub fn update_post(pool: &DbPool, id: i64, fields: &PostFields) -> AppResult<()> {
    let conn = pool.get()?;

    // A different post already holding the new title is a collision
    let taken: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM posts WHERE title = ?1 AND id != ?2",
        params![fields.title, id],
        |row| row.get(0),
    )?;
    if taken {
        return Err(AppError::DuplicateTitle);
    }

    let updated = conn.execute(
        "UPDATE posts SET title = ?1, subtitle = ?2, body = ?3, img_url = ?4 WHERE id = ?5",
        params![fields.title, fields.subtitle, fields.body, fields.img_url, id],
    )?;
    if updated == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// Delete a post. Its comments go with it via the FK cascade.
pub fn delete_post(pool: &DbPool, id: i64) -> AppResult<()> {
    let conn = pool.get()?;
    let deleted = conn.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// Append a comment to a post.
pub fn add_comment(pool: &DbPool, post_id: i64, author_id: i64, text: &str) -> AppResult<Comment> {
    let conn = pool.get()?;

    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM posts WHERE id = ?1",
        params![post_id],
        |row| row.get(0),
    )?;
    if !exists {
        return Err(AppError::PostNotFound);
    }

    conn.execute(
        "INSERT INTO comments (body, author_id, post_id) VALUES (?1, ?2, ?3)",
        params![text, author_id, post_id],
    )?;
    let id = conn.last_insert_rowid();

    conn.query_row(
        "SELECT c.id, c.post_id, c.author_id, u.name, c.body, c.created_at
         FROM comments c JOIN users u ON u.id = c.author_id
         WHERE c.id = ?1",
        params![id],
        comment_from_row,
    )
    .map_err(AppError::from)
}

/// Comments on a post in insertion order, with author names.
pub fn list_comments(pool: &DbPool, post_id: i64) -> AppResult<Vec<Comment>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT c.id, c.post_id, c.author_id, u.name, c.body, c.created_at
         FROM comments c JOIN users u ON u.id = c.author_id
         WHERE c.post_id = ?1 ORDER BY c.id",
    )?;
    let comments = stmt
        .query_map(params![post_id], comment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(comments)
}

fn comment_from_row(row: &rusqlite::Row<'_>) -> Result<Comment, rusqlite::Error> {
    Ok(Comment {
        id: row.get(0)?,
        post_id: row.get(1)?,
        author_id: row.get(2)?,
        author_name: row.get(3)?,
        body: row.get(4)?,
        created_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth;
    use crate::db;
    use crate::db::models::User;
    use crate::state::DbPool;

    fn setup() -> (DbPool, User) {
        let pool = db::test_pool();
        let admin = auth::register(&pool, "admin@x.com", "pw", "Admin").unwrap();
        (pool, admin)
    }

    fn fields(title: &str) -> PostFields {
        PostFields {
            title: title.to_string(),
            subtitle: "sub".to_string(),
            body: "<p>body</p>".to_string(),
            img_url: "http://example.com/img.png".to_string(),
        }
    }

    #[test]
    fn created_post_appears_in_listing() {
        let (pool, admin) = setup();
        let post = create_post(&pool, &fields("Hello World"), admin.id).unwrap();
        assert_eq!(post.author_name, "Admin");

        let posts = list_posts(&pool).unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "Hello World");
    }

    #[test]
    fn listing_is_in_insertion_order() {
        let (pool, admin) = setup();
        create_post(&pool, &fields("First"), admin.id).unwrap();
        create_post(&pool, &fields("Second"), admin.id).unwrap();
        create_post(&pool, &fields("Third"), admin.id).unwrap();

        let titles: Vec<String> = list_posts(&pool)
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["First", "Second", "Third"]);
    }

    #[test]
    fn post_date_is_full_month_day_year() {
        let (pool, admin) = setup();
        let post = create_post(&pool, &fields("Dated"), admin.id).unwrap();
        let expected = chrono::Local::now().format("%B %d, %Y").to_string();
        assert_eq!(post.date, expected);
    }

    #[test]
    fn duplicate_title_is_rejected_and_store_unchanged() {
        let (pool, admin) = setup();
        create_post(&pool, &fields("Hello World"), admin.id).unwrap();
        let err = create_post(&pool, &fields("Hello World"), admin.id).unwrap_err();
        assert!(matches!(err, AppError::DuplicateTitle));
        assert_eq!(list_posts(&pool).unwrap().len(), 1);
    }

    #[test]
    fn get_post_tolerates_missing_id() {
        let (pool, _) = setup();
        assert!(get_post(&pool, 42).unwrap().is_none());
    }

    #[test]
    fn update_post_edits_in_place() {
        let (pool, admin) = setup();
        let post = create_post(&pool, &fields("Before"), admin.id).unwrap();

        let mut edited = fields("After");
        edited.body = "<p>edited</p>".to_string();
        update_post(&pool, post.id, &edited).unwrap();

        // Same id, new fields, original date preserved
        let reloaded = get_post(&pool, post.id).unwrap().unwrap();
        assert_eq!(reloaded.title, "After");
        assert_eq!(reloaded.body, "<p>edited</p>");
        assert_eq!(reloaded.date, post.date);
        assert_eq!(list_posts(&pool).unwrap().len(), 1);
    }

    #[test]
    fn update_post_keeps_own_title() {
        let (pool, admin) = setup();
        let post = create_post(&pool, &fields("Same Title"), admin.id).unwrap();
        // Re-saving without renaming must not collide with itself
        update_post(&pool, post.id, &fields("Same Title")).unwrap();
    }

    #[test]
    fn update_post_rejects_title_of_another_post() {
        let (pool, admin) = setup();
        create_post(&pool, &fields("One"), admin.id).unwrap();
        let two = create_post(&pool, &fields("Two"), admin.id).unwrap();
        let err = update_post(&pool, two.id, &fields("One")).unwrap_err();
        assert!(matches!(err, AppError::DuplicateTitle));
    }

    #[test]
    fn update_missing_post_is_not_found() {
        let (pool, _) = setup();
        let err = update_post(&pool, 42, &fields("Ghost")).unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[test]
    fn delete_post_cascades_to_comments() {
        let (pool, admin) = setup();
        let commenter = auth::register(&pool, "b@x.com", "pw", "B").unwrap();
        let post = create_post(&pool, &fields("Doomed"), admin.id).unwrap();
        add_comment(&pool, post.id, commenter.id, "Nice post").unwrap();

        delete_post(&pool, post.id).unwrap();

        assert!(list_posts(&pool).unwrap().is_empty());
        let conn = pool.get().unwrap();
        let orphans: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM comments WHERE post_id = ?1",
                params![post.id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn comment_on_missing_post_fails_and_stores_nothing() {
        let (pool, admin) = setup();
        let err = add_comment(&pool, 42, admin.id, "hello?").unwrap_err();
        assert!(matches!(err, AppError::PostNotFound));

        let conn = pool.get().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM comments", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn comments_list_in_insertion_order_with_authors() {
        let (pool, admin) = setup();
        let b = auth::register(&pool, "b@x.com", "pw", "B").unwrap();
        let post = create_post(&pool, &fields("Talked About"), admin.id).unwrap();
        add_comment(&pool, post.id, b.id, "first").unwrap();
        add_comment(&pool, post.id, admin.id, "second").unwrap();

        let comments = list_comments(&pool, post.id).unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].body, "first");
        assert_eq!(comments[0].author_name, "B");
        assert_eq!(comments[1].body, "second");
        assert_eq!(comments[1].author_name, "Admin");
    }
}
