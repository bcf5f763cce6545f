pub(crate) mod config;
pub(crate) mod scrub_player;
