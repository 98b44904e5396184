pub mod files;
pub mod helpers;
pub mod share;
pub mod users;

use fileshare_auth::FileShareService;

/// Global context passed to all commands
pub struct Context {
    pub json_output: bool,
    pub acting_as: Option<String>,
    pub service: FileShareService,
}
