use rocket::Route;

mod admin;
pub mod auth;
mod ballot;
mod common;
mod polls;
mod voters;

pub use common::{poll_by_id, voter_by_token, Now};

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(admin::routes());
    routes.extend(auth::routes());
    routes.extend(polls::routes());
    routes.extend(voters::routes());
    routes.extend(ballot::routes());
    routes
}
