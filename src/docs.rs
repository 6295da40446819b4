// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::common;
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Companies ---
        handlers::companies::create_company,
        handlers::companies::list_companies,
        handlers::companies::search_companies,
        handlers::companies::company_statistics,
        handlers::companies::get_company,
        handlers::companies::update_company,
        handlers::companies::delete_company,
        handlers::companies::restore_company,
        handlers::companies::bulk_update_companies,
        handlers::companies::bulk_delete_companies,
        handlers::companies::list_company_customers,
        handlers::companies::link_company_customer,
        handlers::companies::unlink_company_customer,

        // --- CRM ---
        handlers::crm::create_customer,
        handlers::crm::list_customers,
        handlers::crm::get_customer,
        handlers::crm::update_customer,
        handlers::crm::delete_customer,
        handlers::crm::create_ticket,
        handlers::crm::list_tickets,
        handlers::crm::get_ticket,
        handlers::crm::update_ticket_status,

        // --- CATALOG ---
        handlers::catalog::create_item,
        handlers::catalog::list_items,
        handlers::catalog::search_items,
        handlers::catalog::item_statistics,
        handlers::catalog::get_item,
        handlers::catalog::update_item,
        handlers::catalog::delete_item,
        handlers::catalog::update_stock,
        handlers::catalog::list_stock_movements,
        handlers::catalog::update_price,
        handlers::catalog::list_price_history,
        handlers::catalog::add_item_tags,
        handlers::catalog::remove_item_tags,

        // --- OMNIBRIDGE ---
        handlers::omnibridge::list_rules,
        handlers::omnibridge::create_rule,
        handlers::omnibridge::get_rule,
        handlers::omnibridge::update_rule,
        handlers::omnibridge::delete_rule,
        handlers::omnibridge::toggle_rule,
        handlers::omnibridge::test_rule,
        handlers::omnibridge::list_channels,
        handlers::omnibridge::create_channel,
        handlers::omnibridge::toggle_channel,
        handlers::omnibridge::list_messages,
        handlers::omnibridge::get_message,
        handlers::omnibridge::process_message,
        handlers::omnibridge::send_message,
        handlers::omnibridge::reply_message,
        handlers::omnibridge::forward_message,
        handlers::omnibridge::archive_message,
        handlers::omnibridge::read_message,
        handlers::omnibridge::star_message,
        handlers::omnibridge::list_notifications,

        // --- Templates ---
        handlers::templates::list_templates,
        handlers::templates::create_template,
        handlers::templates::get_template,
        handlers::templates::update_template,
        handlers::templates::delete_template,
        handlers::templates::install_template,
        handlers::templates::toggle_template,
        handlers::templates::render_template,
    ),
    components(
        schemas(
            // --- Comum ---
            common::error::FieldError,
            common::pagination::SortOrder,
            common::response::PaginationMeta,

            // --- Companies ---
            models::company::CompanySize,
            models::company::CompanyStatus,
            models::company::SubscriptionTier,
            models::company::Company,
            models::company::CreateCompany,
            models::company::UpdateCompany,
            models::company::BulkUpdateItem,
            models::company::BulkUpdateCompanies,
            models::company::BulkDeleteCompanies,
            models::company::BulkFailure,
            models::company::CompanyStatistics,
            models::company::CompanyCustomer,
            models::company::LinkCustomer,
            models::company::LinkedCustomer,

            // --- CRM ---
            models::crm::Customer,
            models::crm::CreateCustomer,
            models::crm::UpdateCustomer,
            models::crm::TicketStatus,
            models::crm::TicketPriority,
            models::crm::Ticket,
            models::crm::CreateTicket,
            models::crm::UpdateTicketStatus,

            // --- Catalog ---
            models::catalog::ItemType,
            models::catalog::MaterialService,
            models::catalog::CreateMaterialService,
            models::catalog::UpdateMaterialService,
            models::catalog::CatalogStatistics,
            models::catalog::StockOperation,
            models::catalog::StockMovement,
            models::catalog::UpdateStock,
            models::catalog::PriceHistory,
            models::catalog::UpdatePrice,
            models::catalog::TagsPayload,

            // --- Automação ---
            models::automation::ConditionLogic,
            models::automation::Trigger,
            models::automation::Action,
            models::automation::ActionKind,
            models::automation::ExecutionStats,
            models::automation::RuleMetadata,
            models::automation::AutomationRule,
            models::automation::CreateAutomationRule,
            models::automation::UpdateAutomationRule,
            models::automation::TestRuleRequest,
            models::automation::RuleTestResult,
            models::automation::EvaluationReport,
            models::automation::ProcessedMessage,

            // --- Canais e mensagens ---
            models::omnibridge::ChannelType,
            models::omnibridge::MessageDirection,
            models::omnibridge::MessagePriority,
            models::omnibridge::MessageStatus,
            models::omnibridge::Channel,
            models::omnibridge::CreateChannel,
            models::omnibridge::Message,
            models::omnibridge::InboundMessage,
            models::omnibridge::SendMessage,
            models::omnibridge::ReplyMessage,
            models::omnibridge::ForwardMessage,
            models::omnibridge::Notification,

            // --- Templates ---
            models::template::VariableType,
            models::template::TemplateVariable,
            models::template::MessageTemplate,
            models::template::CreateTemplate,
            models::template::UpdateTemplate,
            models::template::RenderTemplateRequest,
            models::template::RenderedTemplate,
        )
    ),
    tags(
        (name = "Companies", description = "Cadastro de Empresas"),
        (name = "CRM", description = "Clientes e Tickets"),
        (name = "Catalog", description = "Materiais e Serviços"),
        (name = "OmniBridge", description = "Regras de Automação, Canais e Mensagens"),
        (name = "Templates", description = "Templates de Mensagem")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
