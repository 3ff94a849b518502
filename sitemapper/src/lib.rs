// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

pub use handlers::{expand_project_dir, open_or_create_session, parse_sort_arg, parse_sort_args};
