mod config;
mod login;
mod logout;
mod provision;
mod request;
mod status;

pub use config::run_config;
pub use login::run_login;
pub use logout::run_logout;
pub use provision::run_provision;
pub use request::{run_request, RequestArgs};
pub use status::run_status;
