// handlers/protected/users - account administration, admin role required
//
// GET/POST   /api/users
// GET        /api/users/stats
// GET/PATCH/DELETE /api/users/:id
// PUT        /api/users/:id/status, /api/users/:id/role
// POST       /api/users/bulk/status, /api/users/bulk/role

pub mod bulk;
pub mod collection;
pub mod record;

pub use bulk::{role as bulk_role, status as bulk_status};
pub use collection::{get as users_get, post as users_post, stats as users_stats};
pub use record::{
    delete as user_delete, get as user_get, patch as user_patch, role as user_role, status as user_status,
};
