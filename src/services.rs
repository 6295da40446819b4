// src/services.rs

pub mod automation_service;
pub mod catalog_service;
pub mod company_service;
pub mod crm_service;
pub mod template_service;

// OmniBridge: avaliação de regras e efeitos das ações
pub mod dispatch;
pub mod omnibridge_service;
pub mod outbound;
pub mod responder;
pub mod rule_engine;
pub mod rule_matcher;
