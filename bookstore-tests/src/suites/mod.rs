pub mod add_book;
pub mod delete_book;
pub mod get_user;
pub mod replace_book;

pub const ACCOUNT_KEY: &str = "account_01";
pub const GIT_POCKET_GUIDE: &str = "9781449325862";
pub const DESIGNING_WEB_APIS: &str = "9781449337711";
/// An isbn that does not exist in the store catalogue.
pub const UNKNOWN_ISBN: &str = "9781449325762";
pub const BAD_TOKEN: &str = "abcd";
pub const BAD_USER_ID: &str = "abcd";
