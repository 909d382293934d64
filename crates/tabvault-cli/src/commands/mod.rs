pub mod config;
pub mod get;
pub mod list;
pub mod status;

pub use get::get_tab;
pub use list::list_tabs;
pub use status::show_status;
