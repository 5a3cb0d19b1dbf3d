// Server-side counterparts of the application's pages: the home listing and
// the resume detail view, plus the registry of open detail views.

pub mod detail;
pub mod handlers;
pub mod home;
pub mod sessions;
