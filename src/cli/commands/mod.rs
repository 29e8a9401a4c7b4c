mod chunk;
mod config;
mod documents;
mod interactive;
mod search;

pub use chunk::ChunkArgs;
pub use config::ConfigCommand;
pub use documents::{LoadedDocuments, build_index, load_documents, read_document, resolve_chunker};
pub use interactive::{InteractiveArgs, ReplCommand};
pub use search::SearchArgs;

pub use chunk::handle_chunk;
pub use config::handle_config;
pub use interactive::handle_interactive;
pub use search::handle_search;
