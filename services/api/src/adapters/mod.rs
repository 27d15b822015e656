pub mod db;
pub mod improve_llm;

pub use db::DbAdapter;
pub use improve_llm::OpenAiImproveAdapter;
