use crate::Database;
use crate::models::{NewUser, PostRow, UserRow};
use anyhow::Result;
use rusqlite::{Connection, ErrorCode, Row, TransactionBehavior};
use threadline_types::models::{PostId, UserId, now_millis};

pub(crate) const USER_COLUMNS: &str = "id, username, email, password, created_at, updated_at";
pub(crate) const POST_COLUMNS: &str = "id, title, text, points, creator_id, created_at, updated_at";

impl Database {
    // -- Users --

    /// Insert a user, reporting unique-constraint collisions instead of
    /// failing.
    pub fn create_user(&self, username: &str, email: &str, password_hash: &str) -> Result<NewUser> {
        self.with_conn_mut(|conn| {
            let now = now_millis();
            let inserted = conn.execute(
                "INSERT INTO user (username, email, password, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                rusqlite::params![username, email, password_hash, now],
            );

            match inserted {
                Ok(_) => {
                    let id = conn.last_insert_rowid();
                    let user = query_user(conn, "id = ?1", id)?
                        .ok_or_else(|| anyhow::anyhow!("User {} vanished after insert", id))?;
                    Ok(NewUser::Created(user))
                }
                Err(rusqlite::Error::SqliteFailure(e, Some(msg)))
                    if e.code == ErrorCode::ConstraintViolation =>
                {
                    if msg.contains("user.email") {
                        Ok(NewUser::EmailTaken)
                    } else if msg.contains("user.username") {
                        Ok(NewUser::UsernameTaken)
                    } else {
                        Err(anyhow::anyhow!("Constraint violation creating user: {}", msg))
                    }
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username = ?1", username))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email = ?1", email))
    }

    pub fn get_user_by_id(&self, id: UserId) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", id))
    }

    pub fn update_password(&self, id: UserId, password_hash: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE user SET password = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![password_hash, now_millis(), id],
            )?;
            Ok(changed == 1)
        })
    }

    // -- Posts --

    pub fn create_post(&self, creator_id: UserId, title: &str, text: &str) -> Result<PostRow> {
        self.create_post_at(creator_id, title, text, now_millis())
    }

    /// Insert a post with an explicit creation time (seeding, imports).
    pub fn create_post_at(
        &self,
        creator_id: UserId,
        title: &str,
        text: &str,
        created_at: i64,
    ) -> Result<PostRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO post (title, text, points, creator_id, created_at, updated_at)
                 VALUES (?1, ?2, 0, ?3, ?4, ?4)",
                rusqlite::params![title, text, creator_id, created_at],
            )?;
            let id = conn.last_insert_rowid();
            query_post(conn, id)?.ok_or_else(|| anyhow::anyhow!("Post {} vanished after insert", id))
        })
    }

    pub fn get_post(&self, id: PostId) -> Result<Option<PostRow>> {
        self.with_conn(|conn| query_post(conn, id))
    }

    /// Update title and text of a post owned by `creator_id`. Returns `None`
    /// when the post does not exist or belongs to someone else.
    pub fn update_post(
        &self,
        id: PostId,
        creator_id: UserId,
        title: &str,
        text: &str,
    ) -> Result<Option<PostRow>> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE post SET title = ?1, text = ?2, updated_at = ?3
                 WHERE id = ?4 AND creator_id = ?5",
                rusqlite::params![title, text, now_millis(), id, creator_id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_post(conn, id)
        })
    }

    /// Delete a post owned by `creator_id`; its votes go with it.
    pub fn delete_post(&self, id: PostId, creator_id: UserId) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "DELETE FROM post WHERE id = ?1 AND creator_id = ?2",
                rusqlite::params![id, creator_id],
            )?;
            Ok(changed == 1)
        })
    }

    // -- Password reset tokens --

    pub fn insert_reset_token(&self, token: &str, user_id: UserId, expires_at: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "DELETE FROM password_reset WHERE expires_at <= ?1",
                [now_millis()],
            )?;
            conn.execute(
                "INSERT INTO password_reset (token, user_id, expires_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![token, user_id, expires_at],
            )?;
            Ok(())
        })
    }

    /// Consume a reset token. A token is usable once; expired tokens are
    /// deleted and reported as absent.
    pub fn take_reset_token(&self, token: &str, now: i64) -> Result<Option<UserId>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let found: Option<(UserId, i64)> = tx
                .query_row(
                    "SELECT user_id, expires_at FROM password_reset WHERE token = ?1",
                    [token],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            if found.is_some() {
                tx.execute("DELETE FROM password_reset WHERE token = ?1", [token])?;
            }
            tx.commit()?;

            Ok(found.and_then(|(user_id, expires_at)| (expires_at > now).then_some(user_id)))
        })
    }
}

fn query_user<P: rusqlite::ToSql>(
    conn: &Connection,
    predicate: &str,
    param: P,
) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM user WHERE {}", USER_COLUMNS, predicate);
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([param], |row| user_from_row(row, 0))
        .optional()?;

    Ok(row)
}

fn query_post(conn: &Connection, id: PostId) -> Result<Option<PostRow>> {
    let sql = format!("SELECT {} FROM post WHERE id = ?1", POST_COLUMNS);
    let row = conn.query_row(&sql, [id], post_from_row).optional()?;
    Ok(row)
}

/// Map `USER_COLUMNS` starting at column `start`.
pub(crate) fn user_from_row(row: &Row<'_>, start: usize) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(start)?,
        username: row.get(start + 1)?,
        email: row.get(start + 2)?,
        password: row.get(start + 3)?,
        created_at: row.get(start + 4)?,
        updated_at: row.get(start + 5)?,
    })
}

/// Map the leading `POST_COLUMNS` of a row.
pub(crate) fn post_from_row(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        title: row.get(1)?,
        text: row.get(2)?,
        points: row.get(3)?,
        creator_id: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(db: &Database, name: &str) -> UserRow {
        match db.create_user(name, &format!("{}@example.com", name), "hash").unwrap() {
            NewUser::Created(user) => user,
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn duplicate_username_and_email_are_reported() {
        let db = Database::open_in_memory().unwrap();
        user(&db, "alice");

        assert!(matches!(
            db.create_user("alice", "other@example.com", "hash").unwrap(),
            NewUser::UsernameTaken
        ));
        assert!(matches!(
            db.create_user("alice2", "alice@example.com", "hash").unwrap(),
            NewUser::EmailTaken
        ));
    }

    #[test]
    fn users_are_found_by_name_email_and_id() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");

        assert_eq!(db.get_user_by_username("alice").unwrap().unwrap().id, alice.id);
        assert_eq!(db.get_user_by_email("alice@example.com").unwrap().unwrap().id, alice.id);
        assert_eq!(db.get_user_by_id(alice.id).unwrap().unwrap().username, "alice");
        assert!(db.get_user_by_username("bob").unwrap().is_none());
    }

    #[test]
    fn only_the_creator_can_update_or_delete() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");
        let post = db.create_post(alice.id, "title", "text").unwrap();
        assert_eq!(post.points, 0);

        assert!(db.update_post(post.id, bob.id, "hijacked", "x").unwrap().is_none());
        let updated = db.update_post(post.id, alice.id, "new title", "new text").unwrap().unwrap();
        assert_eq!(updated.title, "new title");
        assert_eq!(updated.text, "new text");

        assert!(!db.delete_post(post.id, bob.id).unwrap());
        assert!(db.delete_post(post.id, alice.id).unwrap());
        assert!(db.get_post(post.id).unwrap().is_none());
    }

    #[test]
    fn reset_tokens_are_single_use_and_expire() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let now = now_millis();

        db.insert_reset_token("fresh", alice.id, now + 60_000).unwrap();
        db.insert_reset_token("stale", alice.id, now + 10).unwrap();

        assert_eq!(db.take_reset_token("fresh", now).unwrap(), Some(alice.id));
        assert_eq!(db.take_reset_token("fresh", now).unwrap(), None);
        assert_eq!(db.take_reset_token("stale", now + 20).unwrap(), None);
        assert_eq!(db.take_reset_token("unknown", now).unwrap(), None);
    }
}
