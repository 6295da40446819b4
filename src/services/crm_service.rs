// src/services/crm_service.rs

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        br_documents::only_digits,
        error::AppError,
        pagination::{Page, PageRequest},
        validation::trim_opt,
    },
    db::{CompanyRepository, CustomerRepository, TicketRepository},
    models::{
        automation::CreateTicketParams,
        crm::{
            CreateCustomer, CreateTicket, Customer, CustomerFilters, Ticket, TicketFilters,
            TicketPriority, TicketStatus, UpdateCustomer,
        },
        omnibridge::{Message, MessagePriority},
    },
    validators::crm::validate_customer,
};

// =============================================================================
//  CLIENTES
// =============================================================================

#[derive(Clone)]
pub struct CustomerService {
    customers: Arc<dyn CustomerRepository>,
    companies: Arc<dyn CompanyRepository>,
}

fn normalize_customer(customer: &mut Customer) {
    customer.first_name = customer.first_name.trim().to_string();
    customer.last_name = trim_opt(customer.last_name.take());
    customer.email = trim_opt(customer.email.take()).map(|e| e.to_lowercase());
    customer.phone = trim_opt(customer.phone.take()).map(|p| only_digits(&p));
    customer.cpf = trim_opt(customer.cpf.take()).map(|c| only_digits(&c));
}

impl CustomerService {
    pub fn new(customers: Arc<dyn CustomerRepository>, companies: Arc<dyn CompanyRepository>) -> Self {
        Self { customers, companies }
    }

    async fn ensure_unique_email(&self, customer: &Customer, exclude_id: Option<Uuid>) -> Result<(), AppError> {
        if let Some(email) = &customer.email {
            if self
                .customers
                .email_exists(customer.tenant_id, email, exclude_id)
                .await?
            {
                return Err(AppError::Conflict("Já existe um cliente com este e-mail.".into()));
            }
        }
        Ok(())
    }

    pub async fn create(&self, tenant_id: Uuid, payload: CreateCustomer) -> Result<Customer, AppError> {
        payload.validate()?;

        let now = Utc::now();
        let mut customer = Customer {
            id: Uuid::new_v4(),
            tenant_id,
            first_name: payload.first_name,
            last_name: payload.last_name,
            email: payload.email,
            phone: payload.phone,
            cpf: payload.cpf,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        normalize_customer(&mut customer);
        validate_customer(&customer).into_result()?;
        self.ensure_unique_email(&customer, None).await?;

        let created = self.customers.create(&customer).await?;
        tracing::info!("Cliente criado: {} ({})", created.full_name(), created.id);
        Ok(created)
    }

    pub async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Customer, AppError> {
        self.customers
            .find_by_id(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Cliente não encontrado.".into()))
    }

    pub async fn list(
        &self,
        tenant_id: Uuid,
        filters: &CustomerFilters,
        page: &PageRequest,
    ) -> Result<Page<Customer>, AppError> {
        self.customers.find_with_filters(tenant_id, filters, page).await
    }

    pub async fn update(&self, tenant_id: Uuid, id: Uuid, changes: UpdateCustomer) -> Result<Customer, AppError> {
        let mut customer = self.find_by_id(tenant_id, id).await?;

        if let Some(first_name) = changes.first_name {
            customer.first_name = first_name;
        }
        if changes.last_name.is_some() {
            customer.last_name = changes.last_name;
        }
        if changes.email.is_some() {
            customer.email = changes.email;
        }
        if changes.phone.is_some() {
            customer.phone = changes.phone;
        }
        if changes.cpf.is_some() {
            customer.cpf = changes.cpf;
        }
        normalize_customer(&mut customer);
        validate_customer(&customer).into_result()?;
        self.ensure_unique_email(&customer, Some(id)).await?;

        customer.updated_at = Utc::now();
        self.customers.update(&customer).await
    }

    /// Exclusão lógica. Os vínculos com empresas também são desativados.
    pub async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<Customer, AppError> {
        let mut customer = self.find_by_id(tenant_id, id).await?;
        if !customer.is_active {
            return Err(AppError::BusinessRule("O cliente já está inativo.".into()));
        }
        customer.is_active = false;
        customer.updated_at = Utc::now();
        let deleted = self.customers.update(&customer).await?;
        self.companies
            .deactivate_links_for_customer(tenant_id, id)
            .await?;
        tracing::info!("Cliente excluído: {}", id);
        Ok(deleted)
    }
}

// =============================================================================
//  TICKETS
// =============================================================================

#[derive(Clone)]
pub struct TicketService {
    tickets: Arc<dyn TicketRepository>,
    companies: Arc<dyn CompanyRepository>,
    customers: Arc<dyn CustomerRepository>,
}

fn priority_from_message(priority: MessagePriority) -> TicketPriority {
    match priority {
        MessagePriority::Low => TicketPriority::Low,
        MessagePriority::Normal => TicketPriority::Medium,
        MessagePriority::High => TicketPriority::High,
        MessagePriority::Urgent => TicketPriority::Urgent,
    }
}

/// Assunto derivado da mensagem: assunto original ou início do conteúdo.
fn subject_from_message(message: &Message) -> String {
    let candidate = message
        .subject
        .as_deref()
        .map(str::trim)
        .filter(|s| s.chars().count() >= 3)
        .map(str::to_string)
        .unwrap_or_else(|| message.content.trim().chars().take(80).collect());

    if candidate.chars().count() < 3 {
        format!("Mensagem de {}", message.from_address)
    } else {
        candidate.chars().take(255).collect()
    }
}

impl TicketService {
    pub fn new(
        tickets: Arc<dyn TicketRepository>,
        companies: Arc<dyn CompanyRepository>,
        customers: Arc<dyn CustomerRepository>,
    ) -> Self {
        Self {
            tickets,
            companies,
            customers,
        }
    }

    pub async fn create(&self, tenant_id: Uuid, payload: CreateTicket) -> Result<Ticket, AppError> {
        payload.validate()?;

        if let Some(company_id) = payload.company_id {
            if self.companies.find_by_id(tenant_id, company_id).await?.is_none() {
                return Err(AppError::validation("companyId", "Empresa não encontrada."));
            }
        }
        if let Some(customer_id) = payload.customer_id {
            if self.customers.find_by_id(tenant_id, customer_id).await?.is_none() {
                return Err(AppError::validation("customerId", "Cliente não encontrado."));
            }
        }

        let now = Utc::now();
        let ticket = Ticket {
            id: Uuid::new_v4(),
            tenant_id,
            subject: payload.subject.trim().to_string(),
            description: trim_opt(payload.description),
            status: TicketStatus::Open,
            priority: payload.priority.unwrap_or_default(),
            company_id: payload.company_id,
            customer_id: payload.customer_id,
            assigned_to: trim_opt(payload.assigned_to),
            source_message_id: payload.source_message_id,
            tags: payload.tags,
            created_at: now,
            updated_at: now,
        };
        let created = self.tickets.create(&ticket).await?;
        tracing::info!("Ticket criado: {} ({})", created.subject, created.id);
        Ok(created)
    }

    /// Usado pela ação `create_ticket` das regras de automação.
    pub async fn create_from_message(&self, message: &Message, params: &CreateTicketParams) -> Result<Ticket, AppError> {
        let subject = params
            .subject
            .as_deref()
            .map(str::trim)
            .filter(|s| s.chars().count() >= 3)
            .map(str::to_string)
            .unwrap_or_else(|| subject_from_message(message));

        let payload = CreateTicket {
            subject,
            description: Some(message.content.clone()),
            priority: Some(
                params
                    .priority
                    .unwrap_or_else(|| priority_from_message(message.priority)),
            ),
            company_id: None,
            customer_id: None,
            assigned_to: params.assign_to.clone(),
            source_message_id: Some(message.id),
            tags: message.tags.clone(),
        };
        self.create(message.tenant_id, payload).await
    }

    pub async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Ticket, AppError> {
        self.tickets
            .find_by_id(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Ticket não encontrado.".into()))
    }

    pub async fn list(
        &self,
        tenant_id: Uuid,
        filters: &TicketFilters,
        page: &PageRequest,
    ) -> Result<Page<Ticket>, AppError> {
        self.tickets.find_with_filters(tenant_id, filters, page).await
    }

    pub async fn update_status(&self, tenant_id: Uuid, id: Uuid, status: TicketStatus) -> Result<Ticket, AppError> {
        let mut ticket = self.find_by_id(tenant_id, id).await?;
        ticket.status = status;
        ticket.updated_at = Utc::now();
        self.tickets.update(&ticket).await
    }
}
