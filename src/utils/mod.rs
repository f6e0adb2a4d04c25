pub mod colors;
pub mod id;
pub mod palm_id;
pub mod path;
pub mod table;
pub mod time;
