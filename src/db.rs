// src/db.rs

use sqlx::PgPool;
use std::sync::Arc;

pub mod memory;

pub mod company_repo;
pub use company_repo::{CompanyRepository, InMemoryCompanyRepository, PgCompanyRepository};
pub mod customer_repo;
pub use customer_repo::{CustomerRepository, InMemoryCustomerRepository, PgCustomerRepository};
pub mod ticket_repo;
pub use ticket_repo::{InMemoryTicketRepository, PgTicketRepository, TicketRepository};
pub mod catalog_repo;
pub use catalog_repo::{CatalogRepository, InMemoryCatalogRepository, PgCatalogRepository};
pub mod automation_repo;
pub use automation_repo::{
    AutomationRuleRepository, InMemoryAutomationRuleRepository, PgAutomationRuleRepository,
};
pub mod omnibridge_repo;
pub use omnibridge_repo::{
    ChannelRepository, InMemoryChannelRepository, InMemoryMessageRepository,
    InMemoryNotificationRepository, MessageRepository, NotificationRepository, PgChannelRepository,
    PgMessageRepository, PgNotificationRepository,
};
pub mod template_repo;
pub use template_repo::{InMemoryTemplateRepository, PgTemplateRepository, TemplateRepository};

/// `%termo%` para buscas com ILIKE.
pub fn like_pattern(search: &str) -> String {
    format!("%{}%", search.trim())
}

/// Conjunto de repositórios usado para montar os services.
#[derive(Clone)]
pub struct Repositories {
    pub companies: Arc<dyn CompanyRepository>,
    pub customers: Arc<dyn CustomerRepository>,
    pub tickets: Arc<dyn TicketRepository>,
    pub catalog: Arc<dyn CatalogRepository>,
    pub rules: Arc<dyn AutomationRuleRepository>,
    pub channels: Arc<dyn ChannelRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub templates: Arc<dyn TemplateRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            companies: Arc::new(PgCompanyRepository::new(pool.clone())),
            customers: Arc::new(PgCustomerRepository::new(pool.clone())),
            tickets: Arc::new(PgTicketRepository::new(pool.clone())),
            catalog: Arc::new(PgCatalogRepository::new(pool.clone())),
            rules: Arc::new(PgAutomationRuleRepository::new(pool.clone())),
            channels: Arc::new(PgChannelRepository::new(pool.clone())),
            messages: Arc::new(PgMessageRepository::new(pool.clone())),
            notifications: Arc::new(PgNotificationRepository::new(pool.clone())),
            templates: Arc::new(PgTemplateRepository::new(pool)),
        }
    }

    /// Sem banco: usado em testes e quando DATABASE_URL não está definido.
    pub fn in_memory() -> Self {
        Self {
            companies: Arc::new(InMemoryCompanyRepository::new()),
            customers: Arc::new(InMemoryCustomerRepository::new()),
            tickets: Arc::new(InMemoryTicketRepository::new()),
            catalog: Arc::new(InMemoryCatalogRepository::new()),
            rules: Arc::new(InMemoryAutomationRuleRepository::new()),
            channels: Arc::new(InMemoryChannelRepository::new()),
            messages: Arc::new(InMemoryMessageRepository::new()),
            notifications: Arc::new(InMemoryNotificationRepository::new()),
            templates: Arc::new(InMemoryTemplateRepository::new()),
        }
    }
}
