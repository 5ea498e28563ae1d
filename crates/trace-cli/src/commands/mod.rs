pub mod append;
pub mod dispatch;
pub mod explain;
pub mod list;
pub mod schema;
pub mod show;
pub mod users;
pub mod verify;

#[cfg(test)]
pub mod test_support;
