// src/validators.rs

// Validação de domínio: funções puras, uma por entidade.
// Nenhuma delas consulta outras entidades (unicidade etc. fica nos services).

pub mod automation;
pub mod catalog;
pub mod company;
pub mod crm;
pub mod template;
