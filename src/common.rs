pub mod br_documents;
pub mod error;
pub mod pagination;
pub mod response;
pub mod validation;
