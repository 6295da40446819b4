// src/config.rs

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::{env, sync::Arc, time::Duration};

use crate::{
    db::Repositories,
    services::{
        automation_service::RuleService,
        catalog_service::CatalogService,
        company_service::CompanyService,
        crm_service::{CustomerService, TicketService},
        dispatch::Dispatcher,
        omnibridge_service::{ChannelService, MessageService, NotificationService},
        outbound::LoggingTransport,
        responder::CannedResponder,
        rule_engine::RuleEngine,
        template_service::TemplateService,
    },
};

/// Variáveis de ambiente lidas na inicialização.
#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub run_migrations: bool,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} possui um valor inválido: {}", key, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;
        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty());

        Ok(Self {
            jwt_secret,
            database_url,
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:3000".to_string())?,
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", 5)?,
            acquire_timeout: Duration::from_secs(env_or("DATABASE_ACQUIRE_TIMEOUT_SECS", 3)?),
            run_migrations: env_or("RUN_MIGRATIONS", true)?,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub jwt_secret: String,

    pub companies: CompanyService,
    pub customers: CustomerService,
    pub tickets: TicketService,
    pub catalog: CatalogService,
    pub templates: TemplateService,

    // OmniBridge
    pub rules: RuleService,
    pub channels: ChannelService,
    pub messages: MessageService,
    pub notifications: NotificationService,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let repos = match &config.database_url {
            Some(url) => {
                let db_pool = PgPoolOptions::new()
                    .max_connections(config.max_connections)
                    .acquire_timeout(config.acquire_timeout)
                    .connect(url)
                    .await
                    .context("Falha ao conectar ao banco de dados")?;
                tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

                if config.run_migrations {
                    sqlx::migrate!()
                        .run(&db_pool)
                        .await
                        .context("Falha ao rodar as migrações do banco de dados")?;
                    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");
                }
                Repositories::postgres(db_pool)
            }
            None => {
                tracing::warn!("DATABASE_URL não definida: usando repositórios em memória.");
                Repositories::in_memory()
            }
        };

        Ok(Self::from_repositories(repos, config.jwt_secret.clone()))
    }

    /// Estado sem banco de dados (usado nos testes de integração).
    pub fn in_memory(jwt_secret: impl Into<String>) -> Self {
        Self::from_repositories(Repositories::in_memory(), jwt_secret.into())
    }

    // --- Monta o gráfico de dependências ---
    pub fn from_repositories(repos: Repositories, jwt_secret: String) -> Self {
        let templates = TemplateService::new(repos.templates.clone());
        let tickets = TicketService::new(
            repos.tickets.clone(),
            repos.companies.clone(),
            repos.customers.clone(),
        );

        let dispatcher = Dispatcher::new(
            repos.messages.clone(),
            repos.notifications.clone(),
            tickets.clone(),
            templates.clone(),
            Arc::new(CannedResponder),
            Arc::new(LoggingTransport),
        );
        let engine = RuleEngine::new(repos.rules.clone(), Arc::new(dispatcher.clone()));
        let channels = ChannelService::new(repos.channels.clone());

        let companies = CompanyService::new(
            repos.companies.clone(),
            repos.customers.clone(),
            repos.tickets.clone(),
        )
        .with_onboarding(Arc::new(templates.clone()));

        Self {
            jwt_secret,
            companies,
            customers: CustomerService::new(repos.customers.clone(), repos.companies.clone()),
            tickets,
            catalog: CatalogService::new(repos.catalog.clone()),
            rules: RuleService::new(repos.rules.clone()),
            messages: MessageService::new(
                repos.messages.clone(),
                channels.clone(),
                engine,
                dispatcher,
                templates.clone(),
            ),
            channels,
            notifications: NotificationService::new(repos.notifications.clone()),
            templates,
        }
    }
}
