// src/db/omnibridge_repo.rs

// Canais, mensagens e notificações do OmniBridge.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        pagination::{paginate, Page, PageRequest, SortOrder},
    },
    db::{
        like_pattern,
        memory::{contains_ci, sort_rows, table, Table},
    },
    models::omnibridge::{Channel, Message, MessageFilters, Notification, NotificationFilters},
};

#[async_trait]
pub trait ChannelRepository: Send + Sync {
    async fn create(&self, channel: &Channel) -> Result<Channel, AppError>;
    async fn update(&self, channel: &Channel) -> Result<Channel, AppError>;
    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Channel>, AppError>;
    async fn list(&self, tenant_id: Uuid) -> Result<Vec<Channel>, AppError>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn create(&self, message: &Message) -> Result<Message, AppError>;
    async fn update(&self, message: &Message) -> Result<Message, AppError>;
    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Message>, AppError>;
    async fn find_with_filters(
        &self,
        tenant_id: Uuid,
        filters: &MessageFilters,
        page: &PageRequest,
    ) -> Result<Page<Message>, AppError>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: &Notification) -> Result<Notification, AppError>;
    async fn find_with_filters(
        &self,
        tenant_id: Uuid,
        filters: &NotificationFilters,
        page: &PageRequest,
    ) -> Result<Page<Notification>, AppError>;
}

const MESSAGE_SORTABLE: [&str; 3] = ["receivedAt", "createdAt", "priority"];

fn message_sort_column(page: &PageRequest) -> &'static str {
    match page.sort_key(&MESSAGE_SORTABLE, "receivedAt") {
        "createdAt" => "created_at",
        "priority" => "priority",
        _ => "received_at",
    }
}

// =========================================================================
//  POSTGRES
// =========================================================================

#[derive(Clone)]
pub struct PgChannelRepository {
    pool: PgPool,
}

impl PgChannelRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChannelRepository for PgChannelRepository {
    async fn create(&self, c: &Channel) -> Result<Channel, AppError> {
        sqlx::query_as::<_, Channel>(
            r#"
            INSERT INTO channels (id, tenant_id, channel_type, name, description, is_enabled, config, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(c.id)
        .bind(c.tenant_id)
        .bind(c.channel_type)
        .bind(&c.name)
        .bind(&c.description)
        .bind(c.is_enabled)
        .bind(&c.config)
        .bind(c.created_at)
        .bind(c.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "Já existe um canal com este nome."))
    }

    async fn update(&self, c: &Channel) -> Result<Channel, AppError> {
        sqlx::query_as::<_, Channel>(
            r#"
            UPDATE channels SET name = $3, description = $4, is_enabled = $5, config = $6, updated_at = $7
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(c.tenant_id)
        .bind(c.id)
        .bind(&c.name)
        .bind(&c.description)
        .bind(c.is_enabled)
        .bind(&c.config)
        .bind(c.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Canal não encontrado.".into()))
    }

    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Channel>, AppError> {
        let channel = sqlx::query_as::<_, Channel>("SELECT * FROM channels WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(channel)
    }

    async fn list(&self, tenant_id: Uuid) -> Result<Vec<Channel>, AppError> {
        let channels = sqlx::query_as::<_, Channel>(
            "SELECT * FROM channels WHERE tenant_id = $1 ORDER BY created_at ASC",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(channels)
    }
}

#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_message_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: &MessageFilters) {
    if let Some(status) = filters.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(channel_type) = filters.channel_type {
        qb.push(" AND channel_type = ").push_bind(channel_type);
    }
    if let Some(direction) = filters.direction {
        qb.push(" AND direction = ").push_bind(direction);
    }
    if let Some(priority) = filters.priority {
        qb.push(" AND priority = ").push_bind(priority);
    }
    if let Some(starred) = filters.is_starred {
        qb.push(" AND is_starred = ").push_bind(starred);
    }
    if let Some(tag) = &filters.tag {
        qb.push(" AND ").push_bind(tag.clone()).push(" = ANY(tags)");
    }
    if let Some(search) = filters.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = like_pattern(search);
        qb.push(" AND (subject ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR content ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR from_address ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn create(&self, m: &Message) -> Result<Message, AppError> {
        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (
                id, tenant_id, channel_id, channel_type, direction, from_address, from_name, to_address,
                subject, content, priority, status, tags, is_starred, assigned_to, parent_id, ticket_id,
                metadata, received_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)
            RETURNING *
            "#,
        )
        .bind(m.id)
        .bind(m.tenant_id)
        .bind(m.channel_id)
        .bind(m.channel_type)
        .bind(m.direction)
        .bind(&m.from_address)
        .bind(&m.from_name)
        .bind(&m.to_address)
        .bind(&m.subject)
        .bind(&m.content)
        .bind(m.priority)
        .bind(m.status)
        .bind(&m.tags)
        .bind(m.is_starred)
        .bind(&m.assigned_to)
        .bind(m.parent_id)
        .bind(m.ticket_id)
        .bind(&m.metadata)
        .bind(m.received_at)
        .bind(m.created_at)
        .bind(m.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(message)
    }

    async fn update(&self, m: &Message) -> Result<Message, AppError> {
        sqlx::query_as::<_, Message>(
            r#"
            UPDATE messages SET
                priority = $3, status = $4, tags = $5, is_starred = $6, assigned_to = $7,
                ticket_id = $8, metadata = $9, updated_at = $10
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(m.tenant_id)
        .bind(m.id)
        .bind(m.priority)
        .bind(m.status)
        .bind(&m.tags)
        .bind(m.is_starred)
        .bind(&m.assigned_to)
        .bind(m.ticket_id)
        .bind(&m.metadata)
        .bind(m.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Mensagem não encontrada.".into()))
    }

    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Message>, AppError> {
        let message = sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(message)
    }

    async fn find_with_filters(
        &self,
        tenant_id: Uuid,
        filters: &MessageFilters,
        page: &PageRequest,
    ) -> Result<Page<Message>, AppError> {
        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM messages WHERE tenant_id = ");
        count_qb.push_bind(tenant_id);
        push_message_filters(&mut count_qb, filters);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::new("SELECT * FROM messages WHERE tenant_id = ");
        qb.push_bind(tenant_id);
        push_message_filters(&mut qb, filters);
        qb.push(format!(
            " ORDER BY {} {}, id ASC",
            message_sort_column(page),
            page.order_or(SortOrder::Desc).as_sql()
        ));
        qb.push(" LIMIT ").push_bind(page.limit as i64);
        qb.push(" OFFSET ").push_bind(page.offset() as i64);

        let items = qb.build_query_as::<Message>().fetch_all(&self.pool).await?;
        Ok(Page {
            items,
            total: total as u64,
            page: page.page,
            limit: page.limit,
        })
    }
}

#[derive(Clone)]
pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_notification_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: &NotificationFilters) {
    if let Some(recipient) = &filters.recipient {
        qb.push(" AND recipient = ").push_bind(recipient.clone());
    }
    if let Some(is_read) = filters.is_read {
        qb.push(" AND is_read = ").push_bind(is_read);
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn create(&self, n: &Notification) -> Result<Notification, AppError> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (id, tenant_id, recipient, title, message, rule_id, message_id, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(n.id)
        .bind(n.tenant_id)
        .bind(&n.recipient)
        .bind(&n.title)
        .bind(&n.message)
        .bind(n.rule_id)
        .bind(n.message_id)
        .bind(n.is_read)
        .bind(n.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(notification)
    }

    async fn find_with_filters(
        &self,
        tenant_id: Uuid,
        filters: &NotificationFilters,
        page: &PageRequest,
    ) -> Result<Page<Notification>, AppError> {
        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM notifications WHERE tenant_id = ");
        count_qb.push_bind(tenant_id);
        push_notification_filters(&mut count_qb, filters);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::new("SELECT * FROM notifications WHERE tenant_id = ");
        qb.push_bind(tenant_id);
        push_notification_filters(&mut qb, filters);
        qb.push(" ORDER BY created_at DESC, id ASC LIMIT ")
            .push_bind(page.limit as i64);
        qb.push(" OFFSET ").push_bind(page.offset() as i64);

        let items = qb.build_query_as::<Notification>().fetch_all(&self.pool).await?;
        Ok(Page {
            items,
            total: total as u64,
            page: page.page,
            limit: page.limit,
        })
    }
}

// =========================================================================
//  MEMÓRIA
// =========================================================================

#[derive(Clone, Default)]
pub struct InMemoryChannelRepository {
    channels: Table<Channel>,
}

impl InMemoryChannelRepository {
    pub fn new() -> Self {
        Self { channels: table() }
    }
}

#[async_trait]
impl ChannelRepository for InMemoryChannelRepository {
    async fn create(&self, channel: &Channel) -> Result<Channel, AppError> {
        let mut rows = self.channels.write().await;
        let duplicated = rows
            .values()
            .any(|c| c.tenant_id == channel.tenant_id && c.name == channel.name);
        if duplicated {
            return Err(AppError::Conflict("Já existe um canal com este nome.".into()));
        }
        rows.insert(channel.id, channel.clone());
        Ok(channel.clone())
    }

    async fn update(&self, channel: &Channel) -> Result<Channel, AppError> {
        let mut rows = self.channels.write().await;
        match rows.get_mut(&channel.id) {
            Some(existing) if existing.tenant_id == channel.tenant_id => {
                *existing = channel.clone();
                Ok(channel.clone())
            }
            _ => Err(AppError::NotFound("Canal não encontrado.".into())),
        }
    }

    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Channel>, AppError> {
        let rows = self.channels.read().await;
        Ok(rows.get(&id).filter(|c| c.tenant_id == tenant_id).cloned())
    }

    async fn list(&self, tenant_id: Uuid) -> Result<Vec<Channel>, AppError> {
        let rows = self.channels.read().await;
        let mut items: Vec<Channel> = rows.values().filter(|c| c.tenant_id == tenant_id).cloned().collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(items)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryMessageRepository {
    messages: Table<Message>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self { messages: table() }
    }
}

fn message_matches(m: &Message, filters: &MessageFilters) -> bool {
    if let Some(search) = filters.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let needle = search.to_lowercase();
        let hit = contains_ci(m.subject.as_deref(), &needle)
            || m.content.to_lowercase().contains(&needle)
            || m.from_address.to_lowercase().contains(&needle);
        if !hit {
            return false;
        }
    }
    filters.status.is_none_or(|s| m.status == s)
        && filters.channel_type.is_none_or(|c| m.channel_type == c)
        && filters.direction.is_none_or(|d| m.direction == d)
        && filters.priority.is_none_or(|p| m.priority == p)
        && filters.is_starred.is_none_or(|s| m.is_starred == s)
        && filters.tag.as_deref().is_none_or(|t| m.tags.iter().any(|tag| tag == t))
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn create(&self, message: &Message) -> Result<Message, AppError> {
        self.messages.write().await.insert(message.id, message.clone());
        Ok(message.clone())
    }

    async fn update(&self, message: &Message) -> Result<Message, AppError> {
        let mut rows = self.messages.write().await;
        match rows.get_mut(&message.id) {
            Some(existing) if existing.tenant_id == message.tenant_id => {
                *existing = message.clone();
                Ok(message.clone())
            }
            _ => Err(AppError::NotFound("Mensagem não encontrada.".into())),
        }
    }

    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Message>, AppError> {
        let rows = self.messages.read().await;
        Ok(rows.get(&id).filter(|m| m.tenant_id == tenant_id).cloned())
    }

    async fn find_with_filters(
        &self,
        tenant_id: Uuid,
        filters: &MessageFilters,
        page: &PageRequest,
    ) -> Result<Page<Message>, AppError> {
        let rows = self.messages.read().await;
        let mut items: Vec<Message> = rows
            .values()
            .filter(|m| m.tenant_id == tenant_id && message_matches(m, filters))
            .cloned()
            .collect();
        drop(rows);

        let column = message_sort_column(page);
        sort_rows(
            &mut items,
            page.order_or(SortOrder::Desc),
            |a, b| match column {
                "created_at" => a.created_at.cmp(&b.created_at),
                "priority" => a.priority.cmp(&b.priority),
                _ => a.received_at.cmp(&b.received_at),
            },
            |a, b| a.id.cmp(&b.id),
        );
        Ok(paginate(items, page))
    }
}

#[derive(Clone, Default)]
pub struct InMemoryNotificationRepository {
    notifications: Arc<RwLock<Vec<Notification>>>,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn create(&self, notification: &Notification) -> Result<Notification, AppError> {
        self.notifications.write().await.push(notification.clone());
        Ok(notification.clone())
    }

    async fn find_with_filters(
        &self,
        tenant_id: Uuid,
        filters: &NotificationFilters,
        page: &PageRequest,
    ) -> Result<Page<Notification>, AppError> {
        let rows = self.notifications.read().await;
        // Mais recentes primeiro
        let items: Vec<Notification> = rows
            .iter()
            .rev()
            .filter(|n| {
                n.tenant_id == tenant_id
                    && filters.recipient.as_deref().is_none_or(|r| n.recipient == r)
                    && filters.is_read.is_none_or(|read| n.is_read == read)
            })
            .cloned()
            .collect();
        Ok(paginate(items, page))
    }
}
