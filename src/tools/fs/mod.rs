//! Filesystem tools: thin typed carriers over the backend contract.

mod ls;
pub use ls::LsTool;

mod read_file;
pub use read_file::ReadFileTool;

mod write_file;
pub use write_file::WriteFileTool;

mod edit_file;
pub use edit_file::EditFileTool;

mod glob;
pub use glob::GlobTool;

mod grep;
pub use grep::GrepTool;
