use axum::{
    routing::{get, post, put},
    Router,
};
use registry::AppRegistry;

use crate::handler::user::{
    register_user, show_current_user, show_user_list, update_current_user, update_user_block,
    update_user_role,
};

pub fn build_user_routers() -> Router<AppRegistry> {
    let user_routers = Router::new()
        .route("/", post(register_user))
        .route("/", get(show_user_list))
        .route("/me", get(show_current_user))
        .route("/me", put(update_current_user))
        .route("/:user_id/role", put(update_user_role))
        .route("/:user_id/block", put(update_user_block));

    Router::new().nest("/users", user_routers)
}
