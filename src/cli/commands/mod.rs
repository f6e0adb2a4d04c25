pub mod activity;
pub mod attendance;
pub mod init;
pub mod log;
pub mod palms;
pub mod queue;
pub mod status;
pub mod sync;
pub mod watch;
