pub const APP_NAME: &str = "Bones";

// Hydrus client API
pub const HYDRUS_ACCESS_KEY_HEADER: &str = "Hydrus-Client-API-Access-Key";
pub const SEARCH_FILES_PATH: &str = "/get_files/search_files";
pub const FILE_METADATA_PATH: &str = "/get_files/file_metadata";

// Matrix
pub const MSGTYPE_TEXT: &str = "m.text";
pub const MSGTYPE_IMAGE: &str = "m.image";
pub const ROOM_MESSAGE_EVENT: &str = "m.room.message";
pub const MXC_SCHEME: &str = "mxc://";

// Tags: lowercase ascii, digits, ':', '.', space and the three Nordic vowels
pub const TAG_EXTRA_CHARS: &[char] = &[':', '.', ' ', 'æ', 'ø', 'å'];
pub const TAG_PATTERN: &str = "`([a-z0-9:. æøå]*)`";
