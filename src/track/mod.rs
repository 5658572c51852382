mod filename;
mod process;

pub use filename::{Action, Category, canonicalize, categorize, contains_non_ascii, fold_to_ascii};
pub use process::{ItemContext, process_item};
