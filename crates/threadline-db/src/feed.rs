//! Reverse-chronological post feed with keyset pagination on `created_at`.
//!
//! Posts sharing a `created_at` value can straddle a page boundary: the next
//! page starts strictly older than the cursor, so same-millisecond siblings
//! of the last post are skipped. There is no id tiebreak.

use std::collections::HashMap;

use anyhow::Result;
use rusqlite::Connection;
use tracing::warn;

use threadline_types::cursor::Cursor;
use threadline_types::models::{PostId, UserId, VoteValue};

use crate::Database;
use crate::models::{FeedPage, PostRow, PostView, UserRow};
use crate::queries::{OptionalExt, POST_COLUMNS, USER_COLUMNS, post_from_row, user_from_row};

/// Upper bound on posts per page, whatever the client asks for.
pub const MAX_PAGE_SIZE: i64 = 50;

impl Database {
    /// One page of the feed, newest first, annotated with `viewer`'s votes.
    ///
    /// Fetches one row beyond the page size to learn whether another page
    /// exists. The page and the vote lookup share one read transaction.
    pub fn list_posts(
        &self,
        limit: i64,
        cursor: Option<Cursor>,
        viewer: Option<UserId>,
    ) -> Result<FeedPage> {
        let limit = limit.clamp(0, MAX_PAGE_SIZE);

        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;

            let sql = format!(
                "SELECT {}, {}
                 FROM post p
                 JOIN user u ON u.id = p.creator_id
                 WHERE (?2 IS NULL OR p.created_at < ?2)
                 ORDER BY p.created_at DESC
                 LIMIT ?1",
                prefixed(POST_COLUMNS, "p"),
                prefixed(USER_COLUMNS, "u")
            );
            let mut stmt = tx.prepare(&sql)?;
            let mut rows = stmt
                .query_map(
                    rusqlite::params![limit + 1, cursor.map(Cursor::millis)],
                    post_with_creator,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            drop(stmt);

            let has_more = rows.len() as i64 > limit;
            rows.truncate(limit as usize);

            let votes = match viewer {
                Some(user_id) => {
                    let ids: Vec<PostId> = rows.iter().map(|(post, _)| post.id).collect();
                    query_votes(&tx, user_id, &ids)?
                }
                None => HashMap::new(),
            };
            tx.commit()?;

            let posts = rows
                .into_iter()
                .map(|(post, creator)| PostView {
                    vote_status: votes.get(&post.id).copied(),
                    post,
                    creator,
                })
                .collect();

            Ok(FeedPage { posts, has_more })
        })
    }

    /// A single post with its creator and `viewer`'s vote, if any.
    pub fn get_post_view(&self, id: PostId, viewer: Option<UserId>) -> Result<Option<PostView>> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;

            let sql = format!(
                "SELECT {}, {}
                 FROM post p
                 JOIN user u ON u.id = p.creator_id
                 WHERE p.id = ?1",
                prefixed(POST_COLUMNS, "p"),
                prefixed(USER_COLUMNS, "u")
            );
            let found = tx.query_row(&sql, [id], post_with_creator).optional()?;

            let Some((post, creator)) = found else {
                return Ok(None);
            };

            let vote_status = match viewer {
                Some(user_id) => query_votes(&tx, user_id, &[post.id])?.remove(&post.id),
                None => None,
            };
            tx.commit()?;

            Ok(Some(PostView {
                post,
                creator,
                vote_status,
            }))
        })
    }
}

fn prefixed(columns: &str, alias: &str) -> String {
    columns
        .split(", ")
        .map(|c| format!("{}.{}", alias, c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `POST_COLUMNS` followed by the creator's `USER_COLUMNS`.
fn post_with_creator(row: &rusqlite::Row<'_>) -> rusqlite::Result<(PostRow, UserRow)> {
    Ok((post_from_row(row)?, user_from_row(row, 7)?))
}

fn query_votes(
    conn: &Connection,
    user_id: UserId,
    post_ids: &[PostId],
) -> Result<HashMap<PostId, VoteValue>> {
    if post_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders: Vec<String> = (2..=post_ids.len() + 1).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT post_id, value FROM vote WHERE user_id = ?1 AND post_id IN ({})",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let params = std::iter::once(user_id).chain(post_ids.iter().copied());
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params), |row| {
            Ok((row.get::<_, PostId>(0)?, row.get::<_, i64>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut votes = HashMap::with_capacity(rows.len());
    for (post_id, value) in rows {
        match VoteValue::from_stored(value) {
            Some(vote) => {
                votes.insert(post_id, vote);
            }
            None => warn!("Corrupt vote value {} on post {}", value, post_id),
        }
    }
    Ok(votes)
}
