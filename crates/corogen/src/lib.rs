pub mod ast;
pub mod ast_json;
mod c_emit;
pub mod compile;
pub mod diagnostics;
pub mod language;
pub mod status;
