use axum::{
    routing::{delete, get, post, put},
    Router,
};
use registry::AppRegistry;

use crate::handler::{
    event::{
        delete_event, register_event, show_attendee_emails, show_attendee_list, show_event,
        show_event_list, show_event_spots, show_engaged_event_list, show_past_event_list,
        show_sponsored_event_list, update_event,
    },
    registration::{
        force_remove_registration, leave_waitlist, register_for_event, show_registration_status,
        show_waitlist, withdraw_registration,
    },
};

pub fn build_event_routers() -> Router<AppRegistry> {
    let event_routers = Router::new()
        .route("/", post(register_event))
        .route("/", get(show_event_list))
        .route("/sponsored", get(show_sponsored_event_list))
        .route("/past", get(show_past_event_list))
        .route("/engaged", get(show_engaged_event_list))
        .route("/:event_id", get(show_event))
        .route("/:event_id", put(update_event))
        .route("/:event_id", delete(delete_event))
        .route("/:event_id/spots", get(show_event_spots))
        .route("/:event_id/attendees", get(show_attendee_list))
        .route("/:event_id/attendees/emails", get(show_attendee_emails))
        .route("/:event_id/registration", post(register_for_event))
        .route("/:event_id/registration", delete(withdraw_registration))
        .route("/:event_id/registration/status", get(show_registration_status))
        .route("/:event_id/waitlist", get(show_waitlist))
        .route("/:event_id/waitlist", delete(leave_waitlist))
        .route(
            "/:event_id/registrations/:user_id",
            delete(force_remove_registration),
        );

    Router::new().nest("/events", event_routers)
}
