//! The tool layer: the [Tool] trait, the runtime handed to every
//! execution, and the built-in tool set.

mod tool;
pub use tool::*;

mod runtime;
pub use runtime::*;

mod error;
pub use error::*;

mod store;
pub use store::*;

mod sandbox;
pub use sandbox::*;

pub mod fs;
pub use fs::{EditFileTool, GlobTool, GrepTool, LsTool, ReadFileTool, WriteFileTool};

mod write_todos;
pub use write_todos::WriteTodosTool;

mod task;
pub use task::TaskTool;

mod execute;
pub use execute::ExecuteTool;

mod web;
pub use web::{
    FetchUrlTool, HtmlConverter, HttpRequestTool, SearchResult, WebSearchProvider, WebSearchTool,
};

mod tool_wrapper;
pub use tool_wrapper::ToolWithDescription;
