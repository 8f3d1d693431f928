mod activities;
mod content;
mod landing;
mod messages;
mod plans;
mod users;

pub use activities::{join_activity, leave_activity, set_activity_limit};
pub use content::{create_comment, create_gallery_item, delete_gallery_item};
pub use landing::landing;
pub use messages::{get_message, list_inbox, reply_to_message, send_message};
pub use plans::{create_plan, list_plans};
pub use users::{create_user, get_user};
