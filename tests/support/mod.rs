//! In-memory fakes shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use koktail::application::capacity::CapacityEnforcer;
use koktail::application::content::ContentService;
use koktail::application::landing::{LandingLimits, LandingService};
use koktail::application::membership::MembershipService;
use koktail::application::messages::MessagesService;
use koktail::application::plans::PlansService;
use koktail::application::repos::{
    ContentRepo, CreateCommentParams, CreateGalleryItemParams, CreateMessageParams,
    CreatePlanParams, CreateUserParams, HealthRepo, MembershipMutation, MessagesRepo, PlansRepo,
    RepoError, UsersRepo,
};
use koktail::application::users::UsersService;
use koktail::cache::{CacheBackend, CacheConfig, CacheError, CacheStore, MemoryBackend};
use koktail::domain::activities::{ActivityRegistry, MembershipRecord};
use koktail::domain::entities::{
    CommentRecord, EveningPlanRecord, GalleryItemRecord, RelayMessageRecord, UserRecord,
};
use koktail::infra::http::HttpState;
use serde_json::Value;
use time::OffsetDateTime;
use tokio::sync::{Mutex, Notify};
use uuid::Uuid;

/// One process-local document store standing in for Postgres.
#[derive(Default)]
pub struct InMemoryStore {
    users: Mutex<Vec<UserRecord>>,
    comments: Mutex<Vec<CommentRecord>>,
    gallery: Mutex<Vec<GalleryItemRecord>>,
    plans: Mutex<Vec<EveningPlanRecord>>,
    messages: Mutex<Vec<RelayMessageRecord>>,
    failing_updates: Mutex<HashSet<Uuid>>,
    fail_list_users: AtomicBool,
    fail_content_reads: AtomicBool,
    pause_next_comment_load: AtomicBool,
    comment_load_paused: Notify,
    comment_load_release: Notify,
    pub list_users_calls: AtomicUsize,
    pub content_loads: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Insert a user whose `activities` array holds the given raw JSON elements.
    pub async fn seed_user(&self, name: &str, activities: Vec<Value>) -> Uuid {
        let id = Uuid::new_v4();
        let activities = activities
            .into_iter()
            .map(MembershipRecord::from_value)
            .collect();
        self.users.lock().await.push(UserRecord {
            id,
            name: name.to_string(),
            contact: None,
            activities,
            created_at: OffsetDateTime::now_utc(),
        });
        id
    }

    pub async fn activities_of(&self, id: Uuid) -> Vec<MembershipRecord> {
        self.users
            .lock()
            .await
            .iter()
            .find(|user| user.id == id)
            .map(|user| user.activities.clone())
            .unwrap_or_default()
    }

    pub async fn fail_updates_for(&self, id: Uuid) {
        self.failing_updates.lock().await.insert(id);
    }

    pub fn fail_list_users(&self, fail: bool) {
        self.fail_list_users.store(fail, Ordering::SeqCst);
    }

    pub fn fail_content_reads(&self, fail: bool) {
        self.fail_content_reads.store(fail, Ordering::SeqCst);
    }

    /// The next comment load snapshots the comments, then waits for
    /// [`Self::release_comment_load`] before returning them.
    pub fn pause_next_comment_load(&self) {
        self.pause_next_comment_load.store(true, Ordering::SeqCst);
    }

    pub async fn comment_load_paused(&self) {
        self.comment_load_paused.notified().await;
    }

    pub fn release_comment_load(&self) {
        self.comment_load_release.notify_one();
    }

    pub async fn seed_plan(&self, author_id: Uuid, text: &str, expires_at: OffsetDateTime) {
        self.plans.lock().await.push(EveningPlanRecord {
            id: Uuid::new_v4(),
            author_id,
            text: text.to_string(),
            created_at: OffsetDateTime::now_utc(),
            expires_at,
        });
    }
}

#[async_trait]
impl UsersRepo for InMemoryStore {
    async fn list_users(&self) -> Result<Vec<UserRecord>, RepoError> {
        self.list_users_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list_users.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("connection refused"));
        }
        Ok(self.users.lock().await.clone())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        Ok(self
            .users
            .lock()
            .await
            .iter()
            .find(|user| user.id == id)
            .cloned())
    }

    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let user = UserRecord {
            id: Uuid::new_v4(),
            name: params.name,
            contact: params.contact,
            activities: Vec::new(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.users.lock().await.push(user.clone());
        Ok(user)
    }

    async fn update_membership(
        &self,
        user_id: Uuid,
        mutation: MembershipMutation,
    ) -> Result<bool, RepoError> {
        // Let concurrent callers interleave the way separate requests would.
        tokio::task::yield_now().await;
        if self.failing_updates.lock().await.contains(&user_id) {
            return Err(RepoError::from_persistence("write conflict"));
        }
        let mut users = self.users.lock().await;
        let user = users
            .iter_mut()
            .find(|user| user.id == user_id)
            .ok_or(RepoError::NotFound)?;
        Ok(mutation.apply(&mut user.activities))
    }
}

#[async_trait]
impl ContentRepo for InMemoryStore {
    async fn list_recent_comments(&self, limit: u32) -> Result<Vec<CommentRecord>, RepoError> {
        self.content_loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_content_reads.load(Ordering::SeqCst) {
            return Err(RepoError::Timeout);
        }
        let snapshot: Vec<CommentRecord> = {
            let comments = self.comments.lock().await;
            comments.iter().rev().take(limit as usize).cloned().collect()
        };
        if self.pause_next_comment_load.swap(false, Ordering::SeqCst) {
            self.comment_load_paused.notify_one();
            self.comment_load_release.notified().await;
        }
        Ok(snapshot)
    }

    async fn find_gallery_item(&self, id: Uuid) -> Result<Option<GalleryItemRecord>, RepoError> {
        let gallery = self.gallery.lock().await;
        Ok(gallery.iter().find(|item| item.id == id).cloned())
    }

    async fn list_recent_gallery_items(
        &self,
        limit: u32,
    ) -> Result<Vec<GalleryItemRecord>, RepoError> {
        if self.fail_content_reads.load(Ordering::SeqCst) {
            return Err(RepoError::Timeout);
        }
        let gallery = self.gallery.lock().await;
        Ok(gallery.iter().rev().take(limit as usize).cloned().collect())
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let comment = CommentRecord {
            id: Uuid::new_v4(),
            author: params.author,
            body: params.body,
            created_at: OffsetDateTime::now_utc(),
        };
        self.comments.lock().await.push(comment.clone());
        Ok(comment)
    }

    async fn create_gallery_item(
        &self,
        params: CreateGalleryItemParams,
    ) -> Result<GalleryItemRecord, RepoError> {
        let item = GalleryItemRecord {
            id: Uuid::new_v4(),
            owner_id: params.owner_id,
            title: params.title,
            file_name: params.file_name,
            content_type: params.content_type,
            created_at: OffsetDateTime::now_utc(),
        };
        self.gallery.lock().await.push(item.clone());
        Ok(item)
    }

    async fn delete_gallery_item(&self, id: Uuid) -> Result<Option<GalleryItemRecord>, RepoError> {
        let mut gallery = self.gallery.lock().await;
        let position = gallery.iter().position(|item| item.id == id);
        Ok(position.map(|index| gallery.remove(index)))
    }
}

#[async_trait]
impl PlansRepo for InMemoryStore {
    async fn list_active_plans(
        &self,
        now: OffsetDateTime,
    ) -> Result<Vec<EveningPlanRecord>, RepoError> {
        let plans = self.plans.lock().await;
        Ok(plans
            .iter()
            .rev()
            .filter(|plan| plan.expires_at > now)
            .cloned()
            .collect())
    }

    async fn list_completed_plans(
        &self,
        now: OffsetDateTime,
        limit: u32,
    ) -> Result<Vec<EveningPlanRecord>, RepoError> {
        let mut completed: Vec<EveningPlanRecord> = self
            .plans
            .lock()
            .await
            .iter()
            .filter(|plan| plan.expires_at <= now)
            .cloned()
            .collect();
        completed.sort_by(|a, b| b.expires_at.cmp(&a.expires_at));
        completed.truncate(limit as usize);
        Ok(completed)
    }

    async fn create_plan(&self, params: CreatePlanParams) -> Result<EveningPlanRecord, RepoError> {
        let plan = EveningPlanRecord {
            id: Uuid::new_v4(),
            author_id: params.author_id,
            text: params.text,
            created_at: OffsetDateTime::now_utc(),
            expires_at: params.expires_at,
        };
        self.plans.lock().await.push(plan.clone());
        Ok(plan)
    }
}

#[async_trait]
impl MessagesRepo for InMemoryStore {
    async fn create_message(
        &self,
        params: CreateMessageParams,
    ) -> Result<RelayMessageRecord, RepoError> {
        let message = RelayMessageRecord {
            id: Uuid::new_v4(),
            gallery_item_id: params.gallery_item_id,
            owner_id: params.owner_id,
            body: params.body,
            reply: None,
            created_at: OffsetDateTime::now_utc(),
            replied_at: None,
        };
        self.messages.lock().await.push(message.clone());
        Ok(message)
    }

    async fn find_message(&self, id: Uuid) -> Result<Option<RelayMessageRecord>, RepoError> {
        let messages = self.messages.lock().await;
        Ok(messages.iter().find(|message| message.id == id).cloned())
    }

    async fn list_messages_for_owner(
        &self,
        owner_id: Uuid,
        limit: u32,
    ) -> Result<Vec<RelayMessageRecord>, RepoError> {
        let messages = self.messages.lock().await;
        Ok(messages
            .iter()
            .rev()
            .filter(|message| message.owner_id == owner_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn record_reply(
        &self,
        id: Uuid,
        owner_id: Uuid,
        reply: String,
    ) -> Result<Option<RelayMessageRecord>, RepoError> {
        let mut messages = self.messages.lock().await;
        let Some(message) = messages
            .iter_mut()
            .find(|message| message.id == id && message.owner_id == owner_id)
        else {
            return Ok(None);
        };
        if message.is_answered() {
            return Ok(None);
        }
        message.reply = Some(reply);
        message.replied_at = Some(OffsetDateTime::now_utc());
        Ok(Some(message.clone()))
    }
}

#[async_trait]
impl HealthRepo for InMemoryStore {
    async fn health_check(&self) -> Result<(), RepoError> {
        if self.fail_list_users.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("connection refused"));
        }
        Ok(())
    }
}

/// Memory backend that counts deletes and can be switched into failure mode.
pub struct RecordingBackend {
    inner: MemoryBackend,
    pub deletes: AtomicUsize,
    broken: AtomicBool,
}

impl RecordingBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryBackend::new(&CacheConfig::default()),
            deletes: AtomicUsize::new(0),
            broken: AtomicBool::new(false),
        })
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn break_backend(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), CacheError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(CacheError::unavailable("backend switched off"));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheBackend for RecordingBackend {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.check()?;
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.delete(key).await
    }
}

/// Every service wired against one store and one cache.
pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub backend: Arc<RecordingBackend>,
    pub cache: CacheStore,
    pub registry: Arc<ActivityRegistry>,
    pub enforcer: CapacityEnforcer,
    pub membership: MembershipService,
    pub content: ContentService,
    pub landing: LandingService,
    pub plans: PlansService,
    pub users: UsersService,
    pub messages: MessagesService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_registry(ActivityRegistry::default())
    }

    pub fn with_registry(registry: ActivityRegistry) -> Self {
        let store = InMemoryStore::new();
        let backend = RecordingBackend::new();
        let cache = CacheStore::new(backend.clone(), &CacheConfig::default());
        let registry = Arc::new(registry);

        let users_repo: Arc<dyn UsersRepo> = store.clone();
        let content_repo: Arc<dyn ContentRepo> = store.clone();
        let plans_repo: Arc<dyn PlansRepo> = store.clone();
        let messages_repo: Arc<dyn MessagesRepo> = store.clone();

        let membership =
            MembershipService::new(users_repo.clone(), registry.clone(), cache.clone());
        let enforcer = CapacityEnforcer::new(users_repo.clone(), membership.clone(), cache.clone());
        let content = ContentService::new(content_repo.clone(), users_repo.clone(), cache.clone());
        let landing = LandingService::new(
            enforcer.clone(),
            content_repo.clone(),
            plans_repo.clone(),
            registry.clone(),
            cache.clone(),
            LandingLimits::default(),
        );
        let plans = PlansService::new(plans_repo, users_repo.clone(), time::Duration::hours(12));
        let messages = MessagesService::new(messages_repo, content_repo, users_repo.clone());
        let users = UsersService::new(users_repo);

        Self {
            store,
            backend,
            cache,
            registry,
            enforcer,
            membership,
            content,
            landing,
            plans,
            users,
            messages,
        }
    }

    pub fn http_state(&self) -> HttpState {
        HttpState {
            landing: Arc::new(self.landing.clone()),
            membership: Arc::new(self.membership.clone()),
            users: Arc::new(self.users.clone()),
            content: Arc::new(self.content.clone()),
            plans: Arc::new(self.plans.clone()),
            messages: Arc::new(self.messages.clone()),
            health: self.store.clone(),
        }
    }
}
