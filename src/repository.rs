use crate::{
    error::AppError,
    models::{Comment, Follow, FollowListEntry, Like, NewUser, Post, Role, User},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// PostFilter
///
/// Already-resolved listing parameters: pagination turned into `skip`/`limit`, the author
/// scope decided by the service, and dates widened to full-day instants.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub skip: i64,
    pub limit: i64,
    pub search: Option<String>,
    pub author_id: Option<i64>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations, so the services never see
/// the concrete store. Every method reports failures as `AppError`; absence is expressed with
/// `Option` or a `bool` "row affected" flag rather than an error.
///
/// **Send + Sync + async_trait** are required to share the trait object (`Arc<dyn Repository>`)
/// across Axum's asynchronous task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn create_user(&self, user: NewUser) -> Result<User, AppError>;
    async fn get_user(&self, id: i64) -> Result<Option<User>, AppError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
    async fn list_users(&self) -> Result<Vec<User>, AppError>;
    async fn set_user_role(&self, id: i64, role: Role) -> Result<Option<User>, AppError>;

    // --- Posts ---
    async fn create_post(&self, author_id: i64, title: &str, content: &str)
    -> Result<Post, AppError>;
    async fn get_post(&self, id: i64) -> Result<Option<Post>, AppError>;
    /// Returns the total number of matching posts together with the requested page.
    async fn list_posts(&self, filter: PostFilter) -> Result<(i64, Vec<Post>), AppError>;
    async fn update_post(&self, id: i64, title: &str, content: &str)
    -> Result<Option<Post>, AppError>;
    /// Removes the post; its comments and likes go with it in the same statement.
    async fn delete_post(&self, id: i64) -> Result<bool, AppError>;

    // --- Comments ---
    async fn create_comment(&self, post_id: i64, author_id: i64, content: &str)
    -> Result<Comment, AppError>;
    async fn get_comment(&self, id: i64) -> Result<Option<Comment>, AppError>;
    async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>, AppError>;
    async fn update_comment(&self, id: i64, content: &str) -> Result<Option<Comment>, AppError>;
    async fn delete_comment(&self, id: i64) -> Result<bool, AppError>;

    // --- Likes ---
    async fn get_like(&self, post_id: i64, user_id: i64) -> Result<Option<Like>, AppError>;
    async fn create_like(&self, post_id: i64, user_id: i64) -> Result<Like, AppError>;
    async fn delete_like(&self, post_id: i64, user_id: i64) -> Result<bool, AppError>;
    async fn count_likes(&self, post_id: i64) -> Result<i64, AppError>;
    /// Like totals keyed by post id. Posts without likes are absent from the map.
    async fn count_likes_for_posts(&self, post_ids: &[i64]) -> Result<HashMap<i64, i64>, AppError>;
    /// The subset of `post_ids` that `user_id` has liked.
    async fn posts_liked_by(&self, post_ids: &[i64], user_id: i64)
    -> Result<HashSet<i64>, AppError>;

    // --- Follows ---
    async fn get_follow(&self, follower_id: i64, followed_id: i64)
    -> Result<Option<Follow>, AppError>;
    async fn create_follow(&self, follower_id: i64, followed_id: i64) -> Result<Follow, AppError>;
    async fn delete_follow(&self, follower_id: i64, followed_id: i64) -> Result<bool, AppError>;
    async fn list_followers(&self, user_id: i64) -> Result<Vec<FollowListEntry>, AppError>;
    async fn list_following(&self, user_id: i64) -> Result<Vec<FollowListEntry>, AppError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, username, email, hashed_password, role, created_at";

const POST_SELECT: &str = r#"
    SELECT p.id, p.title, p.content, p.author_id, p.created_at, p.updated_at,
           u.username AS author_username, u.email AS author_email
    FROM posts p
    JOIN users u ON u.id = p.author_id
"#;

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.content, c.author_id, c.post_id, c.created_at, c.updated_at,
           u.username AS author_username, u.email AS author_email
    FROM comments c
    JOIN users u ON u.id = c.author_id
"#;

/// Escapes `ILIKE` metacharacters so a search term is matched literally.
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Appends the `WHERE` clause shared by the count and the page queries of `list_posts`.
fn push_post_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, filter: &'a PostFilter) {
    builder.push(" WHERE 1 = 1");

    if let Some(author_id) = filter.author_id {
        builder.push(" AND p.author_id = ");
        builder.push_bind(author_id);
    }

    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", escape_like(search));
        builder.push(" AND (p.title ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR p.content ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }

    if let Some(from) = filter.created_from {
        builder.push(" AND p.created_at >= ");
        builder.push_bind(from);
    }

    if let Some(to) = filter.created_to {
        builder.push(" AND p.created_at <= ");
        builder.push_bind(to);
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let sql = format!(
            "INSERT INTO users (username, email, hashed_password, role) VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        );
        let created = sqlx::query_as::<_, User>(&sql)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.hashed_password)
            .bind(user.role.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let sql = format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?)
    }

    async fn set_user_role(&self, id: i64, role: Role) -> Result<Option<User>, AppError> {
        let sql = format!("UPDATE users SET role = $1 WHERE id = $2 RETURNING {}", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(role.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// create_post
    ///
    /// Inserts and joins the author in one round trip through a CTE.
    async fn create_post(
        &self,
        author_id: i64,
        title: &str,
        content: &str,
    ) -> Result<Post, AppError> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            WITH inserted AS (
                INSERT INTO posts (title, content, author_id) VALUES ($1, $2, $3)
                RETURNING id, title, content, author_id, created_at, updated_at
            )
            SELECT i.id, i.title, i.content, i.author_id, i.created_at, i.updated_at,
                   u.username AS author_username, u.email AS author_email
            FROM inserted i JOIN users u ON u.id = i.author_id
            "#,
        )
        .bind(title)
        .bind(content)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(post)
    }

    async fn get_post(&self, id: i64) -> Result<Option<Post>, AppError> {
        let sql = format!("{} WHERE p.id = $1", POST_SELECT);
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// list_posts
    ///
    /// Builds the filters with `QueryBuilder` so every user-supplied value is a bound
    /// parameter. The count and the page share the same `WHERE` clause.
    async fn list_posts(&self, filter: PostFilter) -> Result<(i64, Vec<Post>), AppError> {
        let mut count_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM posts p");
        push_post_filters(&mut count_builder, &filter);
        let total = count_builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut page_builder: QueryBuilder<Postgres> = QueryBuilder::new(POST_SELECT);
        push_post_filters(&mut page_builder, &filter);
        page_builder.push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ");
        page_builder.push_bind(filter.limit);
        page_builder.push(" OFFSET ");
        page_builder.push_bind(filter.skip);

        let posts = page_builder
            .build_query_as::<Post>()
            .fetch_all(&self.pool)
            .await?;

        Ok((total, posts))
    }

    async fn update_post(
        &self,
        id: i64,
        title: &str,
        content: &str,
    ) -> Result<Option<Post>, AppError> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            WITH updated AS (
                UPDATE posts SET title = $2, content = $3, updated_at = NOW()
                WHERE id = $1
                RETURNING id, title, content, author_id, created_at, updated_at
            )
            SELECT d.id, d.title, d.content, d.author_id, d.created_at, d.updated_at,
                   u.username AS author_username, u.email AS author_email
            FROM updated d JOIN users u ON u.id = d.author_id
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?;
        Ok(post)
    }

    /// delete_post
    ///
    /// `comments.post_id` and `likes.post_id` are `ON DELETE CASCADE`, so dependent rows are
    /// removed atomically with the post.
    async fn delete_post(&self, id: i64) -> Result<bool, AppError> {
        let res = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn create_comment(
        &self,
        post_id: i64,
        author_id: i64,
        content: &str,
    ) -> Result<Comment, AppError> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            WITH inserted AS (
                INSERT INTO comments (content, author_id, post_id) VALUES ($1, $2, $3)
                RETURNING id, content, author_id, post_id, created_at, updated_at
            )
            SELECT i.id, i.content, i.author_id, i.post_id, i.created_at, i.updated_at,
                   u.username AS author_username, u.email AS author_email
            FROM inserted i JOIN users u ON u.id = i.author_id
            "#,
        )
        .bind(content)
        .bind(author_id)
        .bind(post_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn get_comment(&self, id: i64) -> Result<Option<Comment>, AppError> {
        let sql = format!("{} WHERE c.id = $1", COMMENT_SELECT);
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>, AppError> {
        let sql = format!(
            "{} WHERE c.post_id = $1 ORDER BY c.created_at ASC, c.id ASC",
            COMMENT_SELECT
        );
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_comment(&self, id: i64, content: &str) -> Result<Option<Comment>, AppError> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            WITH updated AS (
                UPDATE comments SET content = $2, updated_at = NOW()
                WHERE id = $1
                RETURNING id, content, author_id, post_id, created_at, updated_at
            )
            SELECT d.id, d.content, d.author_id, d.post_id, d.created_at, d.updated_at,
                   u.username AS author_username, u.email AS author_email
            FROM updated d JOIN users u ON u.id = d.author_id
            "#,
        )
        .bind(id)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn delete_comment(&self, id: i64) -> Result<bool, AppError> {
        let res = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn get_like(&self, post_id: i64, user_id: i64) -> Result<Option<Like>, AppError> {
        Ok(sqlx::query_as::<_, Like>(
            "SELECT id, user_id, post_id, created_at FROM likes WHERE post_id = $1 AND user_id = $2",
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// create_like
    ///
    /// A plain insert: a concurrent duplicate trips `unique_like` and surfaces as `Conflict`
    /// through `From<sqlx::Error>`.
    async fn create_like(&self, post_id: i64, user_id: i64) -> Result<Like, AppError> {
        Ok(sqlx::query_as::<_, Like>(
            "INSERT INTO likes (user_id, post_id) VALUES ($1, $2) RETURNING id, user_id, post_id, created_at",
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn delete_like(&self, post_id: i64, user_id: i64) -> Result<bool, AppError> {
        let res = sqlx::query("DELETE FROM likes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn count_likes(&self, post_id: i64) -> Result<i64, AppError> {
        Ok(
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM likes WHERE post_id = $1")
                .bind(post_id)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn count_likes_for_posts(&self, post_ids: &[i64]) -> Result<HashMap<i64, i64>, AppError> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, (i64, i64)>(
            "SELECT post_id, COUNT(*) FROM likes WHERE post_id = ANY($1) GROUP BY post_id",
        )
        .bind(post_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    async fn posts_liked_by(
        &self,
        post_ids: &[i64],
        user_id: i64,
    ) -> Result<HashSet<i64>, AppError> {
        if post_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let rows = sqlx::query_scalar::<_, i64>(
            "SELECT post_id FROM likes WHERE post_id = ANY($1) AND user_id = $2",
        )
        .bind(post_ids)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    async fn get_follow(
        &self,
        follower_id: i64,
        followed_id: i64,
    ) -> Result<Option<Follow>, AppError> {
        Ok(sqlx::query_as::<_, Follow>(
            "SELECT id, follower_id, followed_id, created_at FROM follows WHERE follower_id = $1 AND followed_id = $2",
        )
        .bind(follower_id)
        .bind(followed_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_follow(&self, follower_id: i64, followed_id: i64) -> Result<Follow, AppError> {
        Ok(sqlx::query_as::<_, Follow>(
            "INSERT INTO follows (follower_id, followed_id) VALUES ($1, $2) RETURNING id, follower_id, followed_id, created_at",
        )
        .bind(follower_id)
        .bind(followed_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn delete_follow(&self, follower_id: i64, followed_id: i64) -> Result<bool, AppError> {
        let res = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followed_id = $2")
            .bind(follower_id)
            .bind(followed_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn list_followers(&self, user_id: i64) -> Result<Vec<FollowListEntry>, AppError> {
        Ok(sqlx::query_as::<_, FollowListEntry>(
            r#"
            SELECT u.id AS user_id, u.username, u.email, f.created_at AS followed_at
            FROM follows f JOIN users u ON u.id = f.follower_id
            WHERE f.followed_id = $1
            ORDER BY f.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_following(&self, user_id: i64) -> Result<Vec<FollowListEntry>, AppError> {
        Ok(sqlx::query_as::<_, FollowListEntry>(
            r#"
            SELECT u.id AS user_id, u.username, u.email, f.created_at AS followed_at
            FROM follows f JOIN users u ON u.id = f.followed_id
            WHERE f.follower_id = $1
            ORDER BY f.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }
}
