pub const TOP_LEVEL_DOMAIN: &str = "org";
pub const AUTHOR: &str = "skypoll";
pub const APP_NAME: &str = "skypoll";

pub const UNIX_SOCKET_FILE_NAME: &str = "skypoll.sock";

pub const SERVER_CONFIG_FILE_NAME: &str = "server.toml";
pub const CLIENT_CONFIG_FILE_NAME: &str = "client.toml";
