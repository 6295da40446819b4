// src/services/company_service.rs

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        br_documents::only_digits,
        error::{AppError, FieldError},
        pagination::{Page, PageRequest},
        validation::trim_opt,
    },
    db::{CompanyRepository, CustomerRepository, TicketRepository},
    models::company::{
        BulkDeleteCompanies, BulkFailure, BulkResult, BulkUpdateCompanies, Company, CompanyCustomer,
        CompanyFilters, CompanyStatistics, CreateCompany, LinkCustomer, LinkedCustomer, UpdateCompany,
    },
    validators::company::validate_company,
};

/// Executado quando o tenant cadastra a sua primeira empresa.
#[async_trait]
pub trait CompanyOnboarding: Send + Sync {
    async fn on_first_company(&self, tenant_id: Uuid) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct CompanyService {
    companies: Arc<dyn CompanyRepository>,
    customers: Arc<dyn CustomerRepository>,
    tickets: Arc<dyn TicketRepository>,
    onboarding: Option<Arc<dyn CompanyOnboarding>>,
}

// --- Normalização ---

fn digits_opt(value: Option<String>) -> Option<String> {
    trim_opt(value).map(|v| only_digits(&v))
}

fn lower_opt(value: Option<String>) -> Option<String> {
    trim_opt(value).map(|v| v.to_lowercase())
}

fn upper_opt(value: Option<String>) -> Option<String> {
    trim_opt(value).map(|v| v.to_uppercase())
}

/// Campo presente no payload substitui o atual; string vazia limpa o campo.
fn patch(field: &mut Option<String>, value: Option<String>, normalize: fn(Option<String>) -> Option<String>) {
    if value.is_some() {
        *field = normalize(value);
    }
}

/// Mensagem única para relatórios de operações em lote.
fn failure_message(err: &AppError) -> String {
    match err {
        AppError::Validation(errors) => errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join("; "),
        other => other.to_string(),
    }
}

impl CompanyService {
    pub fn new(
        companies: Arc<dyn CompanyRepository>,
        customers: Arc<dyn CustomerRepository>,
        tickets: Arc<dyn TicketRepository>,
    ) -> Self {
        Self {
            companies,
            customers,
            tickets,
            onboarding: None,
        }
    }

    pub fn with_onboarding(mut self, hook: Arc<dyn CompanyOnboarding>) -> Self {
        self.onboarding = Some(hook);
        self
    }

    // =========================================================================
    //  CRUD
    // =========================================================================

    pub async fn create(
        &self,
        tenant_id: Uuid,
        actor: Option<Uuid>,
        payload: CreateCompany,
    ) -> Result<Company, AppError> {
        payload.validate()?;

        let now = Utc::now();
        let company = Company {
            id: Uuid::new_v4(),
            tenant_id,
            name: payload.name.trim().to_string(),
            display_name: trim_opt(payload.display_name),
            description: trim_opt(payload.description),
            cnpj: digits_opt(payload.cnpj),
            industry: trim_opt(payload.industry),
            size: payload.size.unwrap_or_default(),
            status: payload.status.unwrap_or_default(),
            subscription_tier: payload.subscription_tier.unwrap_or_default(),
            email: lower_opt(payload.email),
            phone: digits_opt(payload.phone),
            website: trim_opt(payload.website),
            address: trim_opt(payload.address),
            address_number: trim_opt(payload.address_number),
            complement: trim_opt(payload.complement),
            neighborhood: trim_opt(payload.neighborhood),
            city: trim_opt(payload.city),
            state: upper_opt(payload.state),
            zip_code: digits_opt(payload.zip_code),
            country: trim_opt(payload.country).unwrap_or_else(|| "Brasil".to_string()),
            is_active: true,
            created_by: actor,
            updated_by: actor,
            created_at: now,
            updated_at: now,
        };

        validate_company(&company).into_result()?;

        if let Some(cnpj) = &company.cnpj {
            if self.companies.cnpj_exists(tenant_id, cnpj, None).await? {
                return Err(AppError::Conflict("Já existe uma empresa com este CNPJ.".into()));
            }
        }

        let is_first = self.companies.count(tenant_id).await? == 0;
        let created = self.companies.create(&company).await?;
        tracing::info!("Empresa criada: {} ({}) no tenant {}", created.name, created.id, tenant_id);

        if is_first {
            self.run_onboarding(tenant_id).await;
        }

        Ok(created)
    }

    // Falhas aqui nunca desfazem a criação da empresa
    async fn run_onboarding(&self, tenant_id: Uuid) {
        if let Some(hook) = &self.onboarding {
            if let Err(e) = hook.on_first_company(tenant_id).await {
                tracing::warn!("Falha no onboarding do tenant {}: {}", tenant_id, e);
            }
        }
    }

    pub async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Company, AppError> {
        self.companies
            .find_by_id(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Empresa não encontrada.".into()))
    }

    pub async fn list(
        &self,
        tenant_id: Uuid,
        filters: &CompanyFilters,
        page: &PageRequest,
    ) -> Result<Page<Company>, AppError> {
        self.companies.find_with_filters(tenant_id, filters, page).await
    }

    pub async fn search(&self, tenant_id: Uuid, query: &str, page: &PageRequest) -> Result<Page<Company>, AppError> {
        if query.trim().is_empty() {
            return Err(AppError::validation("q", "Informe o termo de busca."));
        }
        let filters = CompanyFilters {
            search: Some(query.trim().to_string()),
            ..Default::default()
        };
        self.companies.find_with_filters(tenant_id, &filters, page).await
    }

    pub async fn statistics(&self, tenant_id: Uuid) -> Result<CompanyStatistics, AppError> {
        self.companies.statistics(tenant_id).await
    }

    /// Aplica as alterações numa cópia e valida tudo, sem gravar.
    fn prepare_update(
        &self,
        mut company: Company,
        changes: UpdateCompany,
        actor: Option<Uuid>,
    ) -> Result<Company, AppError> {
        // CNPJ é fixado na criação, inclusive quando ficou vazio
        if changes.cnpj.is_some() {
            let requested = digits_opt(changes.cnpj);
            if requested != company.cnpj {
                return Err(AppError::BusinessRule(
                    "O CNPJ não pode ser alterado após o cadastro.".into(),
                ));
            }
        }

        if let Some(next) = changes.status {
            if next != company.status && !company.status.can_transition_to(next) {
                return Err(AppError::BusinessRule(format!(
                    "Transição de status inválida: {} -> {}.",
                    company.status.as_str(),
                    next.as_str()
                )));
            }
            company.status = next;
        }

        if let Some(name) = changes.name {
            company.name = name.trim().to_string();
        }
        patch(&mut company.display_name, changes.display_name, trim_opt);
        patch(&mut company.description, changes.description, trim_opt);
        patch(&mut company.industry, changes.industry, trim_opt);
        patch(&mut company.email, changes.email, lower_opt);
        patch(&mut company.phone, changes.phone, digits_opt);
        patch(&mut company.website, changes.website, trim_opt);
        patch(&mut company.address, changes.address, trim_opt);
        patch(&mut company.address_number, changes.address_number, trim_opt);
        patch(&mut company.complement, changes.complement, trim_opt);
        patch(&mut company.neighborhood, changes.neighborhood, trim_opt);
        patch(&mut company.city, changes.city, trim_opt);
        patch(&mut company.state, changes.state, upper_opt);
        patch(&mut company.zip_code, changes.zip_code, digits_opt);
        if let Some(size) = changes.size {
            company.size = size;
        }
        if let Some(tier) = changes.subscription_tier {
            company.subscription_tier = tier;
        }
        if let Some(country) = trim_opt(changes.country) {
            company.country = country;
        }

        validate_company(&company).into_result()?;

        company.updated_by = actor;
        company.updated_at = Utc::now();
        Ok(company)
    }

    pub async fn update(
        &self,
        tenant_id: Uuid,
        actor: Option<Uuid>,
        id: Uuid,
        changes: UpdateCompany,
    ) -> Result<Company, AppError> {
        let existing = self.find_by_id(tenant_id, id).await?;
        let candidate = self.prepare_update(existing, changes, actor)?;
        let updated = self.companies.update(&candidate).await?;
        tracing::info!("Empresa atualizada: {}", updated.id);
        Ok(updated)
    }

    async fn ensure_deletable(&self, company: &Company) -> Result<(), AppError> {
        if !company.is_active {
            return Err(AppError::BusinessRule("A empresa já está inativa.".into()));
        }
        let customers = self
            .companies
            .count_active_customers(company.tenant_id, company.id)
            .await?;
        if customers > 0 {
            return Err(AppError::BusinessRule(format!(
                "A empresa possui {customers} cliente(s) ativo(s) vinculado(s)."
            )));
        }
        let tickets = self
            .tickets
            .count_active_by_company(company.tenant_id, company.id)
            .await?;
        if tickets > 0 {
            return Err(AppError::BusinessRule(format!(
                "A empresa possui {tickets} ticket(s) em aberto."
            )));
        }
        if company.has_active_premium_subscription() {
            return Err(AppError::BusinessRule(
                "A empresa possui uma assinatura premium ativa.".into(),
            ));
        }
        Ok(())
    }

    fn deactivated(mut company: Company, actor: Option<Uuid>) -> Company {
        company.is_active = false;
        company.updated_by = actor;
        company.updated_at = Utc::now();
        company
    }

    /// Exclusão lógica (`isActive = false`).
    pub async fn delete(&self, tenant_id: Uuid, actor: Option<Uuid>, id: Uuid) -> Result<Company, AppError> {
        let company = self.find_by_id(tenant_id, id).await?;
        self.ensure_deletable(&company).await?;
        let deleted = self
            .companies
            .update(&Self::deactivated(company, actor))
            .await?;
        tracing::info!("Empresa excluída: {}", deleted.id);
        Ok(deleted)
    }

    pub async fn restore(&self, tenant_id: Uuid, actor: Option<Uuid>, id: Uuid) -> Result<Company, AppError> {
        let mut company = self.find_by_id(tenant_id, id).await?;
        if company.is_active {
            return Err(AppError::BusinessRule(
                "Apenas empresas inativas podem ser restauradas.".into(),
            ));
        }
        company.is_active = true;
        company.updated_by = actor;
        company.updated_at = Utc::now();
        let restored = self.companies.update(&company).await?;
        tracing::info!("Empresa restaurada: {}", restored.id);
        Ok(restored)
    }

    // =========================================================================
    //  LOTE
    //  1) valida todos os itens; qualquer falha -> 400 e nada é gravado
    //  2) grava item a item; falhas tardias são reportadas por item
    // =========================================================================

    pub async fn bulk_update(
        &self,
        tenant_id: Uuid,
        actor: Option<Uuid>,
        payload: BulkUpdateCompanies,
    ) -> Result<BulkResult<Company>, AppError> {
        if payload.items.is_empty() {
            return Err(AppError::validation("items", "Informe ao menos um item."));
        }

        let mut candidates = Vec::with_capacity(payload.items.len());
        let mut errors = Vec::new();
        for item in payload.items {
            match self.companies.find_by_id(tenant_id, item.id).await? {
                None => errors.push(FieldError::new(item.id.to_string(), "Empresa não encontrada.")),
                Some(existing) => match self.prepare_update(existing, item.changes, actor) {
                    Ok(candidate) => candidates.push(candidate),
                    Err(e) => errors.push(FieldError::new(item.id.to_string(), failure_message(&e))),
                },
            }
        }
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        Ok(self.persist_all(candidates).await)
    }

    pub async fn bulk_delete(
        &self,
        tenant_id: Uuid,
        actor: Option<Uuid>,
        payload: BulkDeleteCompanies,
    ) -> Result<BulkResult<Company>, AppError> {
        if payload.ids.is_empty() {
            return Err(AppError::validation("ids", "Informe ao menos um id."));
        }

        let mut candidates = Vec::with_capacity(payload.ids.len());
        let mut errors = Vec::new();
        for id in payload.ids {
            match self.companies.find_by_id(tenant_id, id).await? {
                None => errors.push(FieldError::new(id.to_string(), "Empresa não encontrada.")),
                Some(company) => match self.ensure_deletable(&company).await {
                    Ok(()) => candidates.push(Self::deactivated(company, actor)),
                    Err(e) => errors.push(FieldError::new(id.to_string(), failure_message(&e))),
                },
            }
        }
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        Ok(self.persist_all(candidates).await)
    }

    async fn persist_all(&self, candidates: Vec<Company>) -> BulkResult<Company> {
        let mut result = BulkResult {
            updated: Vec::new(),
            failed: Vec::new(),
        };
        for candidate in candidates {
            match self.companies.update(&candidate).await {
                Ok(saved) => result.updated.push(saved),
                Err(e) => {
                    tracing::warn!("Falha ao gravar empresa {} em lote: {}", candidate.id, e);
                    result.failed.push(BulkFailure {
                        id: candidate.id,
                        message: e.to_string(),
                    });
                }
            }
        }
        result
    }

    // =========================================================================
    //  CLIENTES VINCULADOS
    // =========================================================================

    pub async fn link_customer(
        &self,
        tenant_id: Uuid,
        company_id: Uuid,
        payload: LinkCustomer,
    ) -> Result<CompanyCustomer, AppError> {
        let company = self.find_by_id(tenant_id, company_id).await?;
        if !company.is_active {
            return Err(AppError::BusinessRule("A empresa está inativa.".into()));
        }
        let customer = self
            .customers
            .find_by_id(tenant_id, payload.customer_id)
            .await?
            .filter(|c| c.is_active)
            .ok_or_else(|| AppError::NotFound("Cliente não encontrado.".into()))?;

        let existing = self
            .companies
            .find_customer_link(tenant_id, company_id, customer.id)
            .await?;
        if existing.is_some_and(|l| l.is_active) {
            return Err(AppError::Conflict("O cliente já está vinculado a esta empresa.".into()));
        }

        let link = CompanyCustomer {
            company_id,
            customer_id: customer.id,
            tenant_id,
            role: trim_opt(payload.role),
            is_primary: payload.is_primary,
            is_active: true,
            created_at: Utc::now(),
        };
        self.companies.link_customer(&link).await
    }

    pub async fn unlink_customer(&self, tenant_id: Uuid, company_id: Uuid, customer_id: Uuid) -> Result<(), AppError> {
        self.find_by_id(tenant_id, company_id).await?;
        if !self
            .companies
            .unlink_customer(tenant_id, company_id, customer_id)
            .await?
        {
            return Err(AppError::NotFound("Vínculo não encontrado.".into()));
        }
        Ok(())
    }

    pub async fn list_customers(&self, tenant_id: Uuid, company_id: Uuid) -> Result<Vec<LinkedCustomer>, AppError> {
        self.find_by_id(tenant_id, company_id).await?;
        let links = self.companies.list_customer_links(tenant_id, company_id).await?;

        let mut result = Vec::with_capacity(links.len());
        for link in links {
            if let Some(customer) = self.customers.find_by_id(tenant_id, link.customer_id).await? {
                result.push(LinkedCustomer {
                    customer,
                    role: link.role,
                    is_primary: link.is_primary,
                    linked_at: link.created_at,
                });
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::pagination::PageRequest;
    use crate::db::{InMemoryCompanyRepository, InMemoryCustomerRepository, InMemoryTicketRepository};
    use crate::models::company::{BulkUpdateItem, CompanyStatus, SubscriptionTier};
    use crate::models::crm::{Customer, Ticket, TicketPriority, TicketStatus};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixture {
        service: CompanyService,
        customers: Arc<InMemoryCustomerRepository>,
        tickets: Arc<InMemoryTicketRepository>,
        tenant: Uuid,
    }

    fn fixture() -> Fixture {
        let customers = Arc::new(InMemoryCustomerRepository::new());
        let tickets = Arc::new(InMemoryTicketRepository::new());
        let service = CompanyService::new(
            Arc::new(InMemoryCompanyRepository::new()),
            customers.clone(),
            tickets.clone(),
        );
        Fixture {
            service,
            customers,
            tickets,
            tenant: Uuid::new_v4(),
        }
    }

    fn payload(name: &str, cnpj: Option<&str>) -> CreateCompany {
        CreateCompany {
            name: name.into(),
            cnpj: cnpj.map(str::to_string),
            ..Default::default()
        }
    }

    async fn customer(f: &Fixture) -> Customer {
        let now = Utc::now();
        let c = Customer {
            id: Uuid::new_v4(),
            tenant_id: f.tenant,
            first_name: "Maria".into(),
            last_name: None,
            email: None,
            phone: None,
            cpf: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        f.customers.create(&c).await.unwrap()
    }

    #[tokio::test]
    async fn normalizes_and_rejects_duplicated_cnpj() {
        let f = fixture();
        let mut p = payload("Padaria Central", Some("11.222.333/0001-81"));
        p.email = Some(" Contato@Padaria.COM ".into());
        p.state = Some("sp".into());
        p.zip_code = Some("01310-100".into());
        let created = f.service.create(f.tenant, None, p).await.unwrap();
        assert_eq!(created.cnpj.as_deref(), Some("11222333000181"));
        assert_eq!(created.email.as_deref(), Some("contato@padaria.com"));
        assert_eq!(created.state.as_deref(), Some("SP"));
        assert_eq!(created.zip_code.as_deref(), Some("01310100"));

        let err = f
            .service
            .create(f.tenant, None, payload("Outra", Some("11222333000181")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let page = f
            .service
            .list(f.tenant, &CompanyFilters::default(), &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn invalid_cnpj_is_a_validation_error() {
        let f = fixture();
        let err = f
            .service
            .create(f.tenant, None, payload("Padaria", Some("11222333000182")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref e) if e[0].field == "cnpj"));
    }

    #[tokio::test]
    async fn cnpj_is_immutable_but_same_value_is_accepted() {
        let f = fixture();
        let c = f
            .service
            .create(f.tenant, None, payload("Padaria", Some("11222333000181")))
            .await
            .unwrap();

        let same = UpdateCompany {
            cnpj: Some("11.222.333/0001-81".into()),
            name: Some("Padaria Nova".into()),
            ..Default::default()
        };
        let updated = f.service.update(f.tenant, None, c.id, same).await.unwrap();
        assert_eq!(updated.name, "Padaria Nova");

        let other = UpdateCompany {
            cnpj: Some("11444777000161".into()),
            ..Default::default()
        };
        let err = f.service.update(f.tenant, None, c.id, other).await.unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
    }

    #[tokio::test]
    async fn cnpj_cannot_be_added_after_creation() {
        let f = fixture();
        let c = f
            .service
            .create(f.tenant, None, payload("Padaria", None))
            .await
            .unwrap();

        let add = UpdateCompany {
            cnpj: Some("11.222.333/0001-81".into()),
            ..Default::default()
        };
        let err = f.service.update(f.tenant, None, c.id, add).await.unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));

        let stored = f.service.find_by_id(f.tenant, c.id).await.unwrap();
        assert_eq!(stored.cnpj, None);
    }

    #[tokio::test]
    async fn suspended_company_cannot_become_inactive() {
        let f = fixture();
        let mut p = payload("Padaria", None);
        p.status = Some(CompanyStatus::Suspended);
        let c = f.service.create(f.tenant, None, p).await.unwrap();

        let to_inactive = UpdateCompany {
            status: Some(CompanyStatus::Inactive),
            ..Default::default()
        };
        let err = f.service.update(f.tenant, None, c.id, to_inactive).await.unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));

        let to_active = UpdateCompany {
            status: Some(CompanyStatus::Active),
            ..Default::default()
        };
        let ok = f.service.update(f.tenant, None, c.id, to_active).await.unwrap();
        assert_eq!(ok.status, CompanyStatus::Active);
    }

    #[tokio::test]
    async fn delete_is_blocked_by_customers_and_tickets() {
        let f = fixture();
        let c = f.service.create(f.tenant, None, payload("Padaria", None)).await.unwrap();
        let cust = customer(&f).await;
        f.service
            .link_customer(
                f.tenant,
                c.id,
                LinkCustomer {
                    customer_id: cust.id,
                    role: None,
                    is_primary: true,
                },
            )
            .await
            .unwrap();

        let err = f.service.delete(f.tenant, None, c.id).await.unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
        assert!(f.service.find_by_id(f.tenant, c.id).await.unwrap().is_active);

        f.service.unlink_customer(f.tenant, c.id, cust.id).await.unwrap();
        let now = Utc::now();
        f.tickets
            .create(&Ticket {
                id: Uuid::new_v4(),
                tenant_id: f.tenant,
                subject: "Problema".into(),
                description: None,
                status: TicketStatus::InProgress,
                priority: TicketPriority::High,
                company_id: Some(c.id),
                customer_id: None,
                assigned_to: None,
                source_message_id: None,
                tags: vec![],
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        let err = f.service.delete(f.tenant, None, c.id).await.unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
        assert!(f.service.find_by_id(f.tenant, c.id).await.unwrap().is_active);
    }

    #[tokio::test]
    async fn premium_blocks_delete_and_restore_needs_inactive() {
        let f = fixture();
        let mut p = payload("Premium", None);
        p.subscription_tier = Some(SubscriptionTier::Enterprise);
        let premium = f.service.create(f.tenant, None, p).await.unwrap();
        assert!(matches!(
            f.service.delete(f.tenant, None, premium.id).await,
            Err(AppError::BusinessRule(_))
        ));

        let basic = f.service.create(f.tenant, None, payload("Básica", None)).await.unwrap();
        assert!(matches!(
            f.service.restore(f.tenant, None, basic.id).await,
            Err(AppError::BusinessRule(_))
        ));
        let deleted = f.service.delete(f.tenant, None, basic.id).await.unwrap();
        assert!(!deleted.is_active);
        let restored = f.service.restore(f.tenant, None, basic.id).await.unwrap();
        assert!(restored.is_active);
    }

    #[tokio::test]
    async fn bulk_update_is_all_or_nothing_at_validation() {
        let f = fixture();
        let a = f.service.create(f.tenant, None, payload("Empresa A", None)).await.unwrap();
        let b = f.service.create(f.tenant, None, payload("Empresa B", None)).await.unwrap();

        let bad = BulkUpdateCompanies {
            items: vec![
                BulkUpdateItem {
                    id: a.id,
                    changes: UpdateCompany {
                        name: Some("A renomeada".into()),
                        ..Default::default()
                    },
                },
                BulkUpdateItem {
                    id: b.id,
                    changes: UpdateCompany {
                        email: Some("invalido".into()),
                        ..Default::default()
                    },
                },
            ],
        };
        let err = f.service.bulk_update(f.tenant, None, bad).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref e) if e.len() == 1 && e[0].field == b.id.to_string()));
        assert_eq!(f.service.find_by_id(f.tenant, a.id).await.unwrap().name, "Empresa A");

        let good = BulkUpdateCompanies {
            items: vec![BulkUpdateItem {
                id: a.id,
                changes: UpdateCompany {
                    name: Some("A renomeada".into()),
                    ..Default::default()
                },
            }],
        };
        let result = f.service.bulk_update(f.tenant, None, good).await.unwrap();
        assert_eq!(result.updated.len(), 1);
        assert!(result.failed.is_empty());
    }

    struct CountingHook {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CompanyOnboarding for CountingHook {
        async fn on_first_company(&self, _tenant_id: Uuid) -> Result<(), AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::Internal(anyhow::anyhow!("serviço de templates fora do ar")))
        }
    }

    #[tokio::test]
    async fn onboarding_runs_once_and_its_failure_is_swallowed() {
        let f = fixture();
        let hook = Arc::new(CountingHook {
            calls: AtomicUsize::new(0),
        });
        let service = f.service.clone().with_onboarding(hook.clone());

        service.create(f.tenant, None, payload("Primeira", None)).await.unwrap();
        service.create(f.tenant, None, payload("Segunda", None)).await.unwrap();
        assert_eq!(hook.calls.load(Ordering::SeqCst), 1);
    }
}
