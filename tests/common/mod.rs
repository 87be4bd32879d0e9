#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use devcommunity_api::{
    AppConfig, AppState,
    auth::{self, AuthUser},
    error::AppError,
    models::{Comment, Follow, FollowListEntry, Like, NewUser, Post, Role, User},
    repository::{PostFilter, Repository, RepositoryState},
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Password every seeded user gets.
pub const PASSWORD: &str = "password123";

/// Lowest work factor bcrypt accepts. Keeps the suite fast.
pub const TEST_BCRYPT_COST: u32 = 4;

// --- IN-MEMORY REPOSITORY ---

// Stand-in for Postgres. Mirrors the constraints the migrations declare: unique email and
// username, one like per (user, post), one follow per pair, and cascading deletes from posts.

struct PostRow {
    id: i64,
    title: String,
    content: String,
    author_id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

struct CommentRow {
    id: i64,
    content: String,
    author_id: i64,
    post_id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Default)]
struct Store {
    next_id: i64,
    users: Vec<User>,
    posts: Vec<PostRow>,
    comments: Vec<CommentRow>,
    likes: Vec<Like>,
    follows: Vec<Follow>,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn user(&self, id: i64) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    fn post_view(&self, row: &PostRow) -> Post {
        let author = self.user(row.author_id);
        Post {
            id: row.id,
            title: row.title.clone(),
            content: row.content.clone(),
            author_id: row.author_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            author_username: author.map(|u| u.username.clone()).unwrap_or_default(),
            author_email: author.map(|u| u.email.clone()).unwrap_or_default(),
        }
    }

    fn comment_view(&self, row: &CommentRow) -> Comment {
        let author = self.user(row.author_id);
        Comment {
            id: row.id,
            content: row.content.clone(),
            author_id: row.author_id,
            post_id: row.post_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            author_username: author.map(|u| u.username.clone()).unwrap_or_default(),
            author_email: author.map(|u| u.email.clone()).unwrap_or_default(),
        }
    }

    fn follow_entry(&self, other_id: i64, followed_at: DateTime<Utc>) -> Option<FollowListEntry> {
        self.user(other_id).map(|u| FollowListEntry {
            user_id: u.id,
            username: u.username.clone(),
            email: u.email.clone(),
            followed_at,
        })
    }
}

fn conflict() -> AppError {
    AppError::Conflict("Resource already exists".to_string())
}

fn missing_reference() -> AppError {
    AppError::NotFound("Referenced resource not found".to_string())
}

#[derive(Default)]
pub struct InMemoryRepository {
    store: Mutex<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backdates a post so date-range filters can be exercised.
    pub fn set_post_created_at(&self, post_id: i64, at: DateTime<Utc>) {
        let mut store = self.store.lock().unwrap();
        if let Some(row) = store.posts.iter_mut().find(|p| p.id == post_id) {
            row.created_at = at;
        }
    }

    pub fn comment_count(&self) -> usize {
        self.store.lock().unwrap().comments.len()
    }

    pub fn like_count(&self) -> usize {
        self.store.lock().unwrap().likes.len()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut store = self.store.lock().unwrap();
        if store
            .users
            .iter()
            .any(|u| u.email == user.email || u.username == user.username)
        {
            return Err(conflict());
        }
        let created = User {
            id: store.next_id(),
            username: user.username,
            email: user.email,
            hashed_password: user.hashed_password,
            role: user.role,
            created_at: Utc::now(),
        };
        store.users.push(created.clone());
        Ok(created)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.store.lock().unwrap().user(id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let store = self.store.lock().unwrap();
        Ok(store.users.iter().find(|u| u.email == email).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let store = self.store.lock().unwrap();
        Ok(store.users.iter().find(|u| u.username == username).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        Ok(self.store.lock().unwrap().users.clone())
    }

    async fn set_user_role(&self, id: i64, role: Role) -> Result<Option<User>, AppError> {
        let mut store = self.store.lock().unwrap();
        Ok(store.users.iter_mut().find(|u| u.id == id).map(|u| {
            u.role = role;
            u.clone()
        }))
    }

    async fn create_post(&self, author_id: i64, title: &str, content: &str) -> Result<Post, AppError> {
        let mut store = self.store.lock().unwrap();
        if store.user(author_id).is_none() {
            return Err(missing_reference());
        }
        let now = Utc::now();
        let row = PostRow {
            id: store.next_id(),
            title: title.to_string(),
            content: content.to_string(),
            author_id,
            created_at: now,
            updated_at: now,
        };
        let post = store.post_view(&row);
        store.posts.push(row);
        Ok(post)
    }

    async fn get_post(&self, id: i64) -> Result<Option<Post>, AppError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .posts
            .iter()
            .find(|p| p.id == id)
            .map(|row| store.post_view(row)))
    }

    async fn list_posts(&self, filter: PostFilter) -> Result<(i64, Vec<Post>), AppError> {
        let store = self.store.lock().unwrap();
        let needle = filter.search.as_deref().map(str::to_lowercase);

        let mut matching: Vec<&PostRow> = store
            .posts
            .iter()
            .filter(|p| filter.author_id.is_none_or(|id| p.author_id == id))
            .filter(|p| {
                needle.as_deref().is_none_or(|n| {
                    p.title.to_lowercase().contains(n) || p.content.to_lowercase().contains(n)
                })
            })
            .filter(|p| filter.created_from.is_none_or(|from| p.created_at >= from))
            .filter(|p| filter.created_to.is_none_or(|to| p.created_at <= to))
            .collect();

        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(filter.skip.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .map(|row| store.post_view(row))
            .collect();
        Ok((total, page))
    }

    async fn update_post(&self, id: i64, title: &str, content: &str) -> Result<Option<Post>, AppError> {
        let mut store = self.store.lock().unwrap();
        let Some(row) = store.posts.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        row.title = title.to_string();
        row.content = content.to_string();
        row.updated_at = Utc::now();
        let store = &*store;
        Ok(store
            .posts
            .iter()
            .find(|p| p.id == id)
            .map(|row| store.post_view(row)))
    }

    async fn delete_post(&self, id: i64) -> Result<bool, AppError> {
        let mut store = self.store.lock().unwrap();
        let before = store.posts.len();
        store.posts.retain(|p| p.id != id);
        if store.posts.len() == before {
            return Ok(false);
        }
        store.comments.retain(|c| c.post_id != id);
        store.likes.retain(|l| l.post_id != id);
        Ok(true)
    }

    async fn create_comment(&self, post_id: i64, author_id: i64, content: &str) -> Result<Comment, AppError> {
        let mut store = self.store.lock().unwrap();
        if store.user(author_id).is_none() || !store.posts.iter().any(|p| p.id == post_id) {
            return Err(missing_reference());
        }
        let now = Utc::now();
        let row = CommentRow {
            id: store.next_id(),
            content: content.to_string(),
            author_id,
            post_id,
            created_at: now,
            updated_at: now,
        };
        let comment = store.comment_view(&row);
        store.comments.push(row);
        Ok(comment)
    }

    async fn get_comment(&self, id: i64) -> Result<Option<Comment>, AppError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .comments
            .iter()
            .find(|c| c.id == id)
            .map(|row| store.comment_view(row)))
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>, AppError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .map(|row| store.comment_view(row))
            .collect())
    }

    async fn update_comment(&self, id: i64, content: &str) -> Result<Option<Comment>, AppError> {
        let mut store = self.store.lock().unwrap();
        let Some(row) = store.comments.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        row.content = content.to_string();
        row.updated_at = Utc::now();
        let store = &*store;
        Ok(store
            .comments
            .iter()
            .find(|c| c.id == id)
            .map(|row| store.comment_view(row)))
    }

    async fn delete_comment(&self, id: i64) -> Result<bool, AppError> {
        let mut store = self.store.lock().unwrap();
        let before = store.comments.len();
        store.comments.retain(|c| c.id != id);
        Ok(store.comments.len() < before)
    }

    async fn get_like(&self, post_id: i64, user_id: i64) -> Result<Option<Like>, AppError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .likes
            .iter()
            .find(|l| l.post_id == post_id && l.user_id == user_id)
            .cloned())
    }

    async fn create_like(&self, post_id: i64, user_id: i64) -> Result<Like, AppError> {
        let mut store = self.store.lock().unwrap();
        if store
            .likes
            .iter()
            .any(|l| l.post_id == post_id && l.user_id == user_id)
        {
            return Err(conflict());
        }
        if store.user(user_id).is_none() || !store.posts.iter().any(|p| p.id == post_id) {
            return Err(missing_reference());
        }
        let like = Like {
            id: store.next_id(),
            user_id,
            post_id,
            created_at: Utc::now(),
        };
        store.likes.push(like.clone());
        Ok(like)
    }

    async fn delete_like(&self, post_id: i64, user_id: i64) -> Result<bool, AppError> {
        let mut store = self.store.lock().unwrap();
        let before = store.likes.len();
        store
            .likes
            .retain(|l| !(l.post_id == post_id && l.user_id == user_id));
        Ok(store.likes.len() < before)
    }

    async fn count_likes(&self, post_id: i64) -> Result<i64, AppError> {
        let store = self.store.lock().unwrap();
        Ok(store.likes.iter().filter(|l| l.post_id == post_id).count() as i64)
    }

    async fn count_likes_for_posts(&self, post_ids: &[i64]) -> Result<HashMap<i64, i64>, AppError> {
        let store = self.store.lock().unwrap();
        let mut counts = HashMap::new();
        for like in store.likes.iter().filter(|l| post_ids.contains(&l.post_id)) {
            *counts.entry(like.post_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn posts_liked_by(&self, post_ids: &[i64], user_id: i64) -> Result<HashSet<i64>, AppError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .likes
            .iter()
            .filter(|l| l.user_id == user_id && post_ids.contains(&l.post_id))
            .map(|l| l.post_id)
            .collect())
    }

    async fn get_follow(&self, follower_id: i64, followed_id: i64) -> Result<Option<Follow>, AppError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .follows
            .iter()
            .find(|f| f.follower_id == follower_id && f.followed_id == followed_id)
            .cloned())
    }

    async fn create_follow(&self, follower_id: i64, followed_id: i64) -> Result<Follow, AppError> {
        let mut store = self.store.lock().unwrap();
        if store
            .follows
            .iter()
            .any(|f| f.follower_id == follower_id && f.followed_id == followed_id)
        {
            return Err(conflict());
        }
        if store.user(follower_id).is_none() || store.user(followed_id).is_none() {
            return Err(missing_reference());
        }
        let follow = Follow {
            id: store.next_id(),
            follower_id,
            followed_id,
            created_at: Utc::now(),
        };
        store.follows.push(follow.clone());
        Ok(follow)
    }

    async fn delete_follow(&self, follower_id: i64, followed_id: i64) -> Result<bool, AppError> {
        let mut store = self.store.lock().unwrap();
        let before = store.follows.len();
        store
            .follows
            .retain(|f| !(f.follower_id == follower_id && f.followed_id == followed_id));
        Ok(store.follows.len() < before)
    }

    async fn list_followers(&self, user_id: i64) -> Result<Vec<FollowListEntry>, AppError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .follows
            .iter()
            .rev()
            .filter(|f| f.followed_id == user_id)
            .filter_map(|f| store.follow_entry(f.follower_id, f.created_at))
            .collect())
    }

    async fn list_following(&self, user_id: i64) -> Result<Vec<FollowListEntry>, AppError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .follows
            .iter()
            .rev()
            .filter(|f| f.follower_id == user_id)
            .filter_map(|f| store.follow_entry(f.followed_id, f.created_at))
            .collect())
    }
}

// --- FIXTURES ---

pub fn test_config() -> AppConfig {
    AppConfig {
        bcrypt_cost: TEST_BCRYPT_COST,
        ..AppConfig::default()
    }
}

pub fn test_state(repo: Arc<InMemoryRepository>) -> AppState {
    AppState::new(repo as RepositoryState, test_config())
}

/// Inserts a user directly, bypassing registration, with `PASSWORD` as password.
pub async fn seed_user(repo: &InMemoryRepository, username: &str, role: Role) -> User {
    let hashed_password =
        auth::hash_password(PASSWORD, TEST_BCRYPT_COST).expect("hashing should succeed");
    repo.create_user(NewUser {
        username: username.to_string(),
        email: format!("{}@example.com", username),
        hashed_password,
        role,
    })
    .await
    .expect("seeding a user should succeed")
}

pub fn as_auth(user: &User) -> AuthUser {
    AuthUser::from(user.clone())
}

/// `Authorization` header value for `user`, signed with the state's keys.
pub fn bearer(state: &AppState, user: &User) -> String {
    let token = state.tokens.issue(user).expect("token should be issued");
    format!("Bearer {}", token)
}
