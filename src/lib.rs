pub mod cipher;
pub mod context;
pub mod doc;
pub mod extract;
pub mod shell;

pub use cipher::Keystream;
pub use context::ShellContext;
pub use doc::{DocumentAdapter, JsonDocumentAdapter};
pub use extract::{ExtractOptions, ExtractSummary, Extractor};
pub use shell::{detect, Registry, ShellError, ShellKind};
