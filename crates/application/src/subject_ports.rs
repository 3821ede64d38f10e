mod owners;
mod profiles;

pub use owners::OwnerRepository;
pub use profiles::{UpdateUserProfileInput, UserProfileRepository};
