pub mod channel;
pub mod notification;
pub mod user;

pub use channel::{Channel, Message, NewChannel, NewMessage};
pub use notification::{NewNotification, Notification};
pub use user::{NewUser, User, UserFilter, UserPatch};
