//! Vote ledger: one vote per (user, post), with `post.points` kept equal to
//! the sum of that post's votes. This is the only code that writes `points`.

use anyhow::{Result, anyhow, bail};
use rusqlite::TransactionBehavior;
use tracing::debug;

use threadline_types::models::{PostId, UserId, VoteValue};

use crate::Database;
use crate::queries::OptionalExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// First vote by this user on this post.
    Inserted,
    /// The user flipped their vote; points moved by twice the value.
    Changed,
    /// Same vote as before; nothing was written.
    Unchanged,
}

impl Database {
    /// Record `user_id`'s vote on `post_id` and adjust the post's points in
    /// the same transaction.
    ///
    /// The transaction is `IMMEDIATE` so the write lock is held from the
    /// existence check through the points update; concurrent votes on the
    /// same pair serialize instead of both applying a delta.
    pub fn cast_vote(&self, post_id: PostId, user_id: UserId, value: VoteValue) -> Result<VoteOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let existing: Option<i64> = tx
                .query_row(
                    "SELECT value FROM vote WHERE user_id = ?1 AND post_id = ?2",
                    rusqlite::params![user_id, post_id],
                    |row| row.get(0),
                )
                .optional()?;

            let (outcome, delta) = match existing {
                None => {
                    tx.execute(
                        "INSERT INTO vote (user_id, post_id, value) VALUES (?1, ?2, ?3)",
                        rusqlite::params![user_id, post_id, value.as_i64()],
                    )?;
                    (VoteOutcome::Inserted, value.as_i64())
                }
                Some(stored) => {
                    let previous = VoteValue::from_stored(stored).ok_or_else(|| {
                        anyhow!("Corrupt vote value {} for user {} on post {}", stored, user_id, post_id)
                    })?;
                    if previous == value {
                        return Ok(VoteOutcome::Unchanged);
                    }
                    tx.execute(
                        "UPDATE vote SET value = ?1 WHERE user_id = ?2 AND post_id = ?3",
                        rusqlite::params![value.as_i64(), user_id, post_id],
                    )?;
                    (VoteOutcome::Changed, 2 * value.as_i64())
                }
            };

            let updated = tx.execute(
                "UPDATE post SET points = points + ?1 WHERE id = ?2",
                rusqlite::params![delta, post_id],
            )?;
            if updated != 1 {
                bail!("Post {} not found while applying vote", post_id);
            }

            tx.commit()?;
            debug!(post_id, user_id, delta, "vote applied");
            Ok(outcome)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;
    use std::sync::Arc;

    fn user(db: &Database, name: &str) -> UserId {
        match db.create_user(name, &format!("{}@example.com", name), "hash").unwrap() {
            NewUser::Created(user) => user.id,
            other => panic!("unexpected {:?}", other),
        }
    }

    fn points(db: &Database, post_id: PostId) -> i64 {
        db.get_post(post_id).unwrap().unwrap().points
    }

    fn vote_sum(db: &Database, post_id: PostId) -> i64 {
        db.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COALESCE(SUM(value), 0) FROM vote WHERE post_id = ?1",
                [post_id],
                |row| row.get(0),
            )?)
        })
        .unwrap()
    }

    #[test]
    fn first_vote_inserts_and_moves_points_by_one() {
        let db = Database::open_in_memory().unwrap();
        let author = user(&db, "author");
        let voter = user(&db, "voter");
        let post = db.create_post(author, "t", "x").unwrap();

        assert_eq!(db.cast_vote(post.id, voter, VoteValue::Down).unwrap(), VoteOutcome::Inserted);
        assert_eq!(points(&db, post.id), -1);
    }

    #[test]
    fn repeated_vote_is_a_noop() {
        let db = Database::open_in_memory().unwrap();
        let author = user(&db, "author");
        let voter = user(&db, "voter");
        let post = db.create_post(author, "t", "x").unwrap();

        db.cast_vote(post.id, voter, VoteValue::Up).unwrap();
        assert_eq!(db.cast_vote(post.id, voter, VoteValue::Up).unwrap(), VoteOutcome::Unchanged);
        assert_eq!(points(&db, post.id), 1);
    }

    #[test]
    fn flipping_a_vote_swings_by_two() {
        let db = Database::open_in_memory().unwrap();
        let author = user(&db, "author");
        let voter = user(&db, "voter");
        let post = db.create_post(author, "t", "x").unwrap();

        db.cast_vote(post.id, voter, VoteValue::Up).unwrap();
        assert_eq!(db.cast_vote(post.id, voter, VoteValue::Down).unwrap(), VoteOutcome::Changed);
        assert_eq!(points(&db, post.id), -1);
        assert_eq!(db.cast_vote(post.id, voter, VoteValue::Up).unwrap(), VoteOutcome::Changed);
        assert_eq!(points(&db, post.id), 1);
    }

    #[test]
    fn three_user_scenario() {
        let db = Database::open_in_memory().unwrap();
        let a = user(&db, "a");
        let b = user(&db, "b");
        let c = user(&db, "c");
        let post = db.create_post(a, "p", "x").unwrap();
        assert_eq!(points(&db, post.id), 0);

        db.cast_vote(post.id, b, VoteValue::normalize(1)).unwrap();
        assert_eq!(points(&db, post.id), 1);
        db.cast_vote(post.id, b, VoteValue::normalize(-1)).unwrap();
        assert_eq!(points(&db, post.id), -1);
        db.cast_vote(post.id, c, VoteValue::normalize(1)).unwrap();
        assert_eq!(points(&db, post.id), 0);
    }

    #[test]
    fn points_match_vote_sum_after_mixed_sequence() {
        let db = Database::open_in_memory().unwrap();
        let author = user(&db, "author");
        let voters: Vec<UserId> = (0..5).map(|i| user(&db, &format!("voter{}", i))).collect();
        let post = db.create_post(author, "t", "x").unwrap();

        let raw_votes = [1, -1, 7, -1, 0, -1, 1, 1, -3, -1, -1, 2];
        for (i, raw) in raw_votes.iter().enumerate() {
            let voter = voters[i % voters.len()];
            db.cast_vote(post.id, voter, VoteValue::normalize(*raw)).unwrap();
            assert_eq!(points(&db, post.id), vote_sum(&db, post.id));
        }
    }

    #[test]
    fn vote_on_missing_post_fails_without_side_effects() {
        let db = Database::open_in_memory().unwrap();
        let voter = user(&db, "voter");

        assert!(db.cast_vote(9999, voter, VoteValue::Up).is_err());
        let count: i64 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM vote", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn concurrent_votes_keep_points_consistent() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let author = user(&db, "author");
        let voters: Vec<UserId> = (0..8).map(|i| user(&db, &format!("voter{}", i))).collect();
        let post = db.create_post(author, "t", "x").unwrap();

        let handles: Vec<_> = voters
            .iter()
            .enumerate()
            .map(|(i, &voter)| {
                let db = Arc::clone(&db);
                std::thread::spawn(move || {
                    for round in 0..10 {
                        let raw = if (i + round) % 3 == 0 { -1 } else { 1 };
                        db.cast_vote(post.id, voter, VoteValue::normalize(raw)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(points(&db, post.id), vote_sum(&db, post.id));
    }
}
