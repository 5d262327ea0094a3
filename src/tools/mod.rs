pub mod calculator;
pub mod code_executor;
pub mod factory;
pub mod file_handler;
pub mod registry;
pub mod traits;
pub mod web_search;

pub use calculator::CalculatorTool;
pub use code_executor::CodeExecutorTool;
pub use factory::build_registry;
pub use file_handler::{DEFAULT_MAX_FILE_SIZE, FileHandlerTool};
pub use registry::ToolRegistry;
pub use traits::{Tool, ToolFuture, ToolInputs, ToolSpec};
pub use web_search::{DEFAULT_SEARCH_ENDPOINT, WebSearchTool};
