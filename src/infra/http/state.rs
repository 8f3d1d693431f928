use std::sync::Arc;

use crate::application::content::ContentService;
use crate::application::landing::LandingService;
use crate::application::membership::MembershipService;
use crate::application::messages::MessagesService;
use crate::application::plans::PlansService;
use crate::application::repos::HealthRepo;
use crate::application::users::UsersService;

#[derive(Clone)]
pub struct HttpState {
    pub landing: Arc<LandingService>,
    pub membership: Arc<MembershipService>,
    pub users: Arc<UsersService>,
    pub content: Arc<ContentService>,
    pub messages: Arc<MessagesService>,
    pub plans: Arc<PlansService>,
    pub health: Arc<dyn HealthRepo>,
}
