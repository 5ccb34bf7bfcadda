//! API routes

pub mod community;
pub mod contact;
pub mod gen_ai;
pub mod github;
pub mod health;
pub mod posts;
pub mod resources;
pub mod teams;
pub mod users;

use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};

use crate::{auth::require_auth, state::AppState};

/// Create all API routes
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_api_routes = Router::new()
        .route("/healthcheck", get(health::healthcheck))
        .route("/users/register", post(users::register))
        .route("/users/login", post(users::login))
        .route("/users/refresh-token", post(users::refresh_token))
        // Contact inbox overview (public in the observed surface)
        .route("/contact/all", get(contact::get_all_contacts));

    // Protected routes (session middleware applied below)
    let protected_api_routes = Router::new()
        // Account routes
        .route("/users/logout", post(users::logout))
        .route("/users/change-password", post(users::change_password))
        .route("/users/current-user", get(users::current_user))
        .route("/users/update-account", patch(users::update_account))
        .route("/users/update-socials", patch(users::update_socials))
        .route(
            "/users/profile-picture",
            post(users::upload_profile_picture).delete(users::delete_profile_picture),
        )
        .route(
            "/users/cover-picture",
            post(users::upload_cover_picture).delete(users::delete_cover_picture),
        )
        // Team routes
        .route("/teams", get(teams::get_teams))
        .route("/teams/create-team", post(teams::create_team))
        .route("/teams/join", post(teams::join_team))
        .route("/teams/manage-members", post(teams::manage_members))
        .route("/teams/add-repo", post(teams::add_github_repo))
        .route("/teams/repo", delete(teams::delete_github_repo))
        .route(
            "/teams/:team_id",
            get(teams::get_team_details).delete(teams::delete_team),
        )
        .route("/teams/:team_id/leave", post(teams::leave_team))
        // Post routes
        .route("/posts/create-post", post(posts::create_post))
        .route("/posts/getpostbyteams/:team_id", get(posts::get_posts_by_team))
        .route(
            "/posts/:post_id",
            get(posts::get_post_details)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/posts/:post_id/like", post(posts::like_post))
        .route("/posts/:post_id/unlike", post(posts::unlike_post))
        // Resource routes
        .route("/resources/upload", post(resources::upload_resource))
        .route(
            "/resources/:id",
            get(resources::get_resources).delete(resources::delete_resource),
        )
        .route(
            "/resources/:id/:filetype",
            get(resources::get_resources_by_type),
        )
        // Community routes
        .route("/community", get(community::get_posts))
        .route("/community/create", post(community::create_post))
        .route(
            "/community/:post_id",
            get(community::get_post_details).delete(community::delete_post),
        )
        .route("/community/:post_id/like", post(community::like_post))
        .route("/community/:post_id/unlike", post(community::unlike_post))
        .route("/community/:post_id/comment", post(community::add_comment))
        // Contact routes
        .route("/contact/create", post(contact::create_contact))
        .route("/contact", get(contact::get_contacts))
        .route(
            "/contact/update/:contact_id",
            post(contact::update_contact_status),
        )
        // GitHub insight routes
        .route("/github/commits", get(github::fetch_commits))
        .route("/github/pullRequests", get(github::fetch_pull_requests))
        .route("/github/repoStats", get(github::fetch_repo_stats))
        // Generative-text routes
        .route("/genAI/gen-response", post(gen_ai::generate_response))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(public_api_routes)
                .merge(protected_api_routes),
        )
        .with_state(state)
}
